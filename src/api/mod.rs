pub mod document;
pub mod error;
pub mod video;

pub use document::{compose_pdf_from_files, extract_score_pdf, render_regions_pdf};
pub use error::CaptureApiError;
pub use video::{extract_regions, preview_frame, save_captures, DEFAULT_PREVIEW_QUALITY};
