mod sanitizer;
mod service;

pub use sanitizer::sanitize;
pub use service::{ContentService, MIN_CONTENT_LEN};
