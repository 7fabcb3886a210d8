use actix_web::http::header::{ContentType, ALLOW};
use actix_web::HttpResponse;

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .content_type(ContentType::plaintext())
        .insert_header((ALLOW, "POST, OPTIONS"))
        .body("Method Not Allowed")
}
