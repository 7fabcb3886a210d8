mod contact_email;
mod contact_message;
mod contact_name;
mod contact_submission;
mod turnstile_token;

pub use contact_email::ContactEmail;
pub use contact_message::ContactMessage;
pub use contact_name::ContactName;
pub use contact_submission::{ContactSubmission, SubmissionError};
pub use turnstile_token::TurnstileToken;
