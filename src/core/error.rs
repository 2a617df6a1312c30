use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("region of interest is empty ({width}x{height})")]
    EmptyRoi { width: u32, height: u32 },
    #[error("no content found ({captures} captures, none with a usable region)")]
    NoContentFound { captures: usize },
    #[error("document has no placed images")]
    EmptyDocument,
    #[error("document writer error: {0}")]
    Document(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid time value: {0}")]
    InvalidTime(String),
    #[error("run cancelled")]
    Cancelled,
}

impl CaptureError {
    /// Frame-level anomalies are absorbed by the run loop; everything else aborts it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CaptureError::EmptyRoi { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::SourceUnavailable(_) => "SourceUnavailable",
            CaptureError::EmptyRoi { .. } => "EmptyRoi",
            CaptureError::NoContentFound { .. } => "NoContentFound",
            CaptureError::EmptyDocument => "EmptyDocument",
            CaptureError::Document(_) | CaptureError::Pdf(_) => "DocumentError",
            CaptureError::Image(_) | CaptureError::Io(_) => "IoError",
            CaptureError::Config(_) | CaptureError::InvalidConfig(_) => "InvalidConfig",
            CaptureError::InvalidTime(_) => "InvalidTime",
            CaptureError::Cancelled => "Cancelled",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            CaptureError::SourceUnavailable(_) => "check the video path or network source",
            CaptureError::EmptyRoi { .. } => "widen the x/y crop percentages",
            CaptureError::NoContentFound { .. } | CaptureError::EmptyDocument => {
                "adjust the change threshold or the capture region"
            }
            CaptureError::InvalidConfig(_) | CaptureError::Config(_) => "fix the configuration values",
            CaptureError::InvalidTime(_) => "use seconds, mm:ss or hh:mm:ss",
            CaptureError::Cancelled => "the run was cancelled or hit its deadline",
            _ => "retry; see logs for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_empty_roi_is_recoverable() {
        assert!(CaptureError::EmptyRoi { width: 0, height: 10 }.is_recoverable());
        assert!(!CaptureError::SourceUnavailable("x".into()).is_recoverable());
        assert!(!CaptureError::NoContentFound { captures: 0 }.is_recoverable());
        assert!(!CaptureError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_hints_distinguish_source_and_content() {
        let source = CaptureError::SourceUnavailable("gone".into());
        let empty = CaptureError::NoContentFound { captures: 3 };
        assert_ne!(source.hint(), empty.hint());
        assert_eq!(empty.kind(), "NoContentFound");
        assert!(empty.to_string().contains("3 captures"));
    }
}
