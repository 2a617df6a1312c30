pub mod cancel;
pub mod document;
pub mod error;
pub mod layout;
pub mod time;
pub mod video;

pub use error::{CaptureError, Result};
