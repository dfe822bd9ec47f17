use clipcat_core::errors::{ClipcatError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("clip", "clip_0001")
        .with_context("reason", "example")
}

#[test]
fn configuration_error_surface() {
    let err = ClipcatError::Configuration(sample_info("empty-pool", "no clips"));
    assert_eq!(err.info().code, "empty-pool");
    assert!(err.info().context.contains_key("clip"));
    assert!(err.is_configuration());
}

#[test]
fn serde_error_surface() {
    let err = ClipcatError::Serde(sample_info("json_deserialize", "bad payload"));
    assert_eq!(err.info().code, "json_deserialize");
    assert!(!err.is_configuration());
}

#[test]
fn display_includes_context_and_hint() {
    let err = ClipcatError::Configuration(
        ErrorInfo::new("duration-window", "minimum exceeds maximum")
            .with_context("min", "60")
            .with_context("max", "20")
            .with_hint("swap the bounds"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("configuration error: minimum exceeds maximum"));
    assert!(rendered.contains("max=20, min=60"));
    assert!(rendered.ends_with("hint: swap the bounds"));
}

#[test]
fn errors_round_trip_json() {
    let err = ClipcatError::config("zero-concats", "total_concats must be positive");
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Configuration\""));
    let decoded: ClipcatError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
