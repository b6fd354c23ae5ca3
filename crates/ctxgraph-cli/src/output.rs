//! Output formatting utilities

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Plain,
        }
    }
}

/// Render `data` as JSON, or fall back to the caller's plain rendering.
pub fn emit<T: Serialize>(data: &T, format: OutputFormat, plain: impl FnOnce() -> String) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Plain => println!("{}", plain()),
    }
}
