pub use contact::{error_chain_fmt, submit_contact, ContactError};
pub use cors::preflight;
pub use method_not_allowed::method_not_allowed;

mod contact;
mod cors;
mod method_not_allowed;
