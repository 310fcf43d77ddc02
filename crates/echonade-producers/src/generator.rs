//! External artifact services
//!
//! Poster images come from a [`ContentGenerator`], business permits from a
//! [`PermitIssuer`]. The bundled implementations need no network.

use async_trait::async_trait;
use chrono::Utc;
use echonade_types::JobId;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct GenerationError(pub String);

/// Turns a prompt into a hosted image URL
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Issues a business permit and returns its URL
#[async_trait]
pub trait PermitIssuer: Send + Sync {
    async fn issue(&self, job_id: JobId) -> Result<String, GenerationError>;
}

/// Permit URLs of the form `<base>/<unix-millis>`
#[derive(Debug, Clone)]
pub struct TimestampPermitIssuer {
    base_url: String,
}

impl TimestampPermitIssuer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for TimestampPermitIssuer {
    fn default() -> Self {
        Self::new("https://business-permits.example.com")
    }
}

#[async_trait]
impl PermitIssuer for TimestampPermitIssuer {
    async fn issue(&self, _job_id: JobId) -> Result<String, GenerationError> {
        Ok(format!("{}/{}", self.base_url, Utc::now().timestamp_millis()))
    }
}

/// Deterministic stand-in for an image model: the URL is derived from the
/// SHA-256 of the prompt, so equal prompts give equal images
#[derive(Debug, Clone)]
pub struct DigestImageGenerator {
    base_url: String,
}

impl DigestImageGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for DigestImageGenerator {
    fn default() -> Self {
        Self::new("https://posters.example.com")
    }
}

#[async_trait]
impl ContentGenerator for DigestImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError("prompt is empty".to_string()));
        }
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Ok(format!("{}/{}.png", self.base_url, &digest[..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_url_shape() {
        let url = TimestampPermitIssuer::default().issue(JobId::new(1)).await.unwrap();
        let millis = url
            .strip_prefix("https://business-permits.example.com/")
            .unwrap();
        assert!(millis.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn test_image_urls_are_deterministic() {
        let generator = DigestImageGenerator::new("https://img.example.com/");
        let a = generator.generate("a lemonade stand at dawn").await.unwrap();
        let b = generator.generate("a lemonade stand at dawn").await.unwrap();
        let c = generator.generate("a lemon tree").await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("https://img.example.com/") && a.ends_with(".png"));
        assert!(generator.generate(" ").await.is_err());
    }
}
