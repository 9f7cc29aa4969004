//! OCR engine selection is explicitly out of scope (spec §1 Non-goals);
//! this trait is the seam the worker runtime calls through, the same
//! shape as [`pipeline_llm::LlmBackend`] for the LLM provider. Only a
//! plain-text pass-through is provided here — PDF/image extraction is
//! left to whatever real engine gets plugged in at deployment time.

use async_trait::async_trait;

use crate::error::WorkerError;

#[async_trait]
pub trait OcrClient: Send + Sync {
    async fn extract_text(&self, file_content: &[u8], file_type: &str) -> Result<String, WorkerError>;
}

pub struct PlainTextOcr;

#[async_trait]
impl OcrClient for PlainTextOcr {
    async fn extract_text(&self, file_content: &[u8], file_type: &str) -> Result<String, WorkerError> {
        if file_type != "text/plain" {
            return Err(WorkerError::UnsupportedFileType(file_type.to_string()));
        }
        Ok(String::from_utf8_lossy(file_content).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_plain_text() {
        let ocr = PlainTextOcr;
        let text = ocr.extract_text(b"Diagnose: Morbus Parkinson.", "text/plain").await.unwrap();
        assert_eq!(text, "Diagnose: Morbus Parkinson.");
    }

    #[tokio::test]
    async fn rejects_non_text_file_types() {
        let ocr = PlainTextOcr;
        let err = ocr.extract_text(b"%PDF-1.4", "application/pdf").await.unwrap_err();
        assert!(matches!(err, WorkerError::UnsupportedFileType(_)));
    }
}
