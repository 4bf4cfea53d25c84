use anyhow::Result;
use async_trait::async_trait;

/// Literal used for any field the phone validation service leaves out
pub const UNKNOWN: &str = "Sconosciuto";

/// One system + user prompt pair sent to the completion service
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Sampling temperature, 0.0..=1.0
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(system_prompt: &str, user_prompt: impl Into<String>, temperature: f64) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.into(),
            temperature: temperature.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const SQUARE_1024: ImageSize = ImageSize {
        width: 1024,
        height: 1024,
    };
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the phone validation service knows about a number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub country: String,
    pub carrier: String,
    pub line_type: String,
}

impl ValidationResult {
    /// Build a result, replacing absent or blank fields with [`UNKNOWN`]
    pub fn new(country: Option<String>, carrier: Option<String>, line_type: Option<String>) -> Self {
        fn or_unknown(value: Option<String>) -> String {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        }

        Self {
            country: or_unknown(country),
            carrier: or_unknown(carrier),
            line_type: or_unknown(line_type),
        }
    }

    pub fn is_voip(&self) -> bool {
        self.line_type.eq_ignore_ascii_case("voip")
    }
}

#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the URL of the generated image
    async fn generate_image(&self, prompt: &str, size: ImageSize) -> Result<String>;
}

#[async_trait]
pub trait PhoneValidator: Send + Sync {
    async fn validate_phone(&self, number: &str) -> Result<ValidationResult>;
}
