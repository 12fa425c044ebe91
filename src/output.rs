//! Rendering of skill results for stdout.

use crate::error::{Result, SkillError};
use serde_json::{json, Value};

/// Successful result of a skill.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillOutput {
    /// Printed as pretty JSON.
    Json(Value),
    /// Printed as-is.
    Text(String),
}

/// What to print and how to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub stdout: String,
    pub exit_code: u8,
}

/// Render the outcome of an invocation. Exactly one payload per call.
pub fn render(result: &Result<SkillOutput>) -> Rendered {
    match result {
        Ok(SkillOutput::Json(value)) => Rendered {
            stdout: format!("{:#}", value),
            exit_code: 0,
        },
        Ok(SkillOutput::Text(text)) => Rendered {
            stdout: text.clone(),
            exit_code: 0,
        },
        Err(err) => render_error(err),
    }
}

/// Render a failure as `{"success": false, "error": CODE, "message": ...}`.
pub fn render_error(err: &SkillError) -> Rendered {
    let payload = json!({
        "success": false,
        "error": err.code().as_str(),
        "message": err.to_string(),
    });
    Rendered {
        stdout: format!("{:#}", payload),
        exit_code: 1,
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_json() {
        let rendered = render(&Ok(SkillOutput::Json(json!({"success": true}))));
        assert_eq!(rendered.exit_code, 0);
        let parsed: Value = serde_json::from_str(&rendered.stdout).unwrap();
        assert_eq!(parsed, json!({"success": true}));
    }

    #[test]
    fn test_render_text_is_verbatim() {
        let rendered = render(&Ok(SkillOutput::Text("hello world".to_string())));
        assert_eq!(rendered.stdout, "hello world");
        assert_eq!(rendered.exit_code, 0);
    }

    #[test]
    fn test_render_error() {
        let rendered = render(&Err(SkillError::VideoNotFound("m-1".to_string())));
        assert_eq!(rendered.exit_code, 1);
        let parsed: Value = serde_json::from_str(&rendered.stdout).unwrap();
        assert_eq!(
            parsed,
            json!({
                "success": false,
                "error": "VIDEO_NOT_FOUND",
                "message": "Video 'm-1' not found"
            })
        );
    }

    #[test]
    fn test_render_error_escapes_message() {
        let err = SkillError::Unknown(r#"bad "query" \ here"#.to_string());
        let rendered = render_error(&err);
        let parsed: Value = serde_json::from_str(&rendered.stdout).unwrap();
        assert_eq!(parsed["error"], "UNKNOWN_ERROR");
        assert_eq!(parsed["message"], err.to_string());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345_678, 1), 12.3);
        assert_eq!(round_to(0.876_54, 3), 0.877);
        assert_eq!(round_to(3.0, 1), 3.0);
    }
}
