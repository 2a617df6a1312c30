use regex::Regex;

use super::error::{CaptureError, Result};

/// 解析时间：`"75"`、`"75.5"`、`"mm:ss"` 或 `"hh:mm:ss"`，空白返回 `None`
pub fn parse_time(value: Option<&str>) -> Result<Option<f64>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let clock = Regex::new(r"^(?:(\d+):)?(\d+):(\d+(?:\.\d+)?)$")
        .map_err(|e| CaptureError::InvalidTime(format!("time pattern: {}", e)))?;

    if let Some(caps) = clock.captures(raw) {
        let hours = caps
            .get(1)
            .map(|m| m.as_str().parse::<f64>())
            .transpose()
            .map_err(|_| CaptureError::InvalidTime(raw.to_string()))?
            .unwrap_or(0.0);
        let minutes: f64 = caps[2]
            .parse()
            .map_err(|_| CaptureError::InvalidTime(raw.to_string()))?;
        let seconds: f64 = caps[3]
            .parse()
            .map_err(|_| CaptureError::InvalidTime(raw.to_string()))?;
        return Ok(Some(hours * 3600.0 + minutes * 60.0 + seconds));
    }

    match raw.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(secs)),
        _ => Err(CaptureError::InvalidTime(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_seconds() {
        assert_eq!(parse_time(Some("13")).unwrap(), Some(13.0));
        assert_eq!(parse_time(Some(" 7.5 ")).unwrap(), Some(7.5));
    }

    #[test]
    fn test_parse_clock_forms() {
        assert_eq!(parse_time(Some("1:40")).unwrap(), Some(100.0));
        assert_eq!(parse_time(Some("01:02:03")).unwrap(), Some(3723.0));
    }

    #[test]
    fn test_blank_is_absent() {
        assert_eq!(parse_time(None).unwrap(), None);
        assert_eq!(parse_time(Some("   ")).unwrap(), None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            parse_time(Some("1:2:3:4")),
            Err(CaptureError::InvalidTime(_))
        ));
        assert!(parse_time(Some("abc")).is_err());
        assert!(parse_time(Some("-3")).is_err());
    }
}
