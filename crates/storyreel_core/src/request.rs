//! Generation request sent to the inference service.

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// A single non-streaming generation call.
///
/// `model` is optional: when unset the driver substitutes its active model.
///
/// # Examples
///
/// ```
/// use storyreel_core::GenerateRequest;
///
/// let request = GenerateRequest::new("You are terse.", "Say hi")
///     .with_temperature(0.4)
///     .with_max_tokens(64);
///
/// assert_eq!(request.temperature, 0.4);
/// assert!(request.model.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(prefix = "with_")]
pub struct GenerateRequest {
    /// Model identifier; `None` means "whatever the driver has selected"
    #[setters(strip_option)]
    pub model: Option<String>,
    /// System instruction
    #[setters(into)]
    pub system: String,
    /// User prompt
    #[setters(into)]
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Base64-encoded images attached to the prompt
    pub images: Vec<String>,
}

impl GenerateRequest {
    /// Create a request with default sampling options.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1024,
            images: Vec::new(),
        }
    }
}
