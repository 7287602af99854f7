// Version information for captiongen

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-blip-captioning";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Captioning features in this version
pub const FEATURES: &[&str] = &[
    "blip-onnx",
    "upload-form",
    "url-form",
    "caption-sessions",
    "json-caption-api",
    "hub-download",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("captiongen {} ({})", VERSION_NUMBER, VERSION)
}
