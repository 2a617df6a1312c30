use serde::{Deserialize, Serialize};

use crate::core::error::CaptureError;

/// 面向调用方的错误：可序列化，保留错误类型与处理建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureApiError {
    pub error_type: String,
    pub message: String,
    pub hint: String,
}

impl From<CaptureError> for CaptureApiError {
    fn from(e: CaptureError) -> Self {
        Self {
            error_type: e.kind().to_string(),
            message: e.to_string(),
            hint: e.hint().to_string(),
        }
    }
}

impl std::fmt::Display for CaptureApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.error_type, self.message, self.hint)
    }
}

impl std::error::Error for CaptureApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_capture_error() {
        let err = CaptureApiError::from(CaptureError::NoContentFound { captures: 2 });
        assert_eq!(err.error_type, "NoContentFound");
        assert!(err.to_string().starts_with("[NoContentFound]"));

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"error_type\":\"NoContentFound\""));
    }
}
