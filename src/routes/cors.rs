use crate::startup::AllowedOrigin;
use actix_web::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use actix_web::{web, HttpResponse};

/// Answer a browser's CORS preflight. The request itself is not inspected.
pub async fn preflight(allowed_origin: web::Data<AllowedOrigin>) -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, allowed_origin.0.as_str()))
        .insert_header((ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"))
        .insert_header((ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"))
        .finish()
}
