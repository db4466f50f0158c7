//! Rules documents: download and text extraction.

use std::io::Write;
use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::error::ResolveError;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExtractionError> for ResolveError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Io(io) => ResolveError::Io(io),
            other => ResolveError::Document(other.to_string()),
        }
    }
}

/// Turns document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: &[u8]) -> Result<String, ExtractionError>;
}

/// Fetches a rules document by URL.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResolveError>;
}

/// Extracts PDF text with poppler's `pdftotext`.
#[derive(Debug, Clone, Default)]
pub struct PdfToTextExtractor;

impl PdfToTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn run(document: &[u8]) -> Result<String, ExtractionError> {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        file.write_all(document)?;
        file.flush()?;

        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(file.path())
            .arg("-") // Output to stdout
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(ExtractionError::ExtractionFailed(format!(
                "pdftotext failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ExtractionError::ToolNotFound("pdftotext (install poppler-utils)".to_string()),
            ),
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }
}

#[async_trait]
impl TextExtractor for PdfToTextExtractor {
    async fn extract_text(&self, document: &[u8]) -> Result<String, ExtractionError> {
        if !document.starts_with(b"%PDF") {
            // Some federation links serve plain text or HTML rules.
            return Ok(String::from_utf8_lossy(document).to_string());
        }
        let document = document.to_vec();
        tokio::task::spawn_blocking(move || Self::run(&document))
            .await
            .map_err(|e| ExtractionError::ExtractionFailed(format!("extraction task: {}", e)))?
    }
}

/// Downloads documents over HTTP.
pub struct HttpDocumentSource {
    client: reqwest::Client,
}

impl HttpDocumentSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::Other(e.into()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResolveError> {
        debug!("Fetching rules document {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ResolveError::Network {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }
        if !status.is_success() {
            return Err(ResolveError::Document(format!("HTTP {} for {}", status, url)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_pdf_bytes_pass_through() {
        let text = PdfToTextExtractor::new()
            .extract_text("Inscriptions sur tournoi.club.fr".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "Inscriptions sur tournoi.club.fr");
    }

    #[test]
    fn extraction_errors_are_structural() {
        let err: ResolveError = ExtractionError::ToolNotFound("pdftotext".into()).into();
        assert_eq!(err.kind(), crate::error::ErrorKind::Structural);
    }
}
