//! Word conversion guard
//!
//! At most one conversion runs at a time. Whatever the outcome, `finish`
//! re-enables the trigger, and only a successful response yields a document
//! to download.

use crate::api::ConvertedDocument;
use thiserror::Error;

/// Why a conversion was not started
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertRefusal {
    #[error("Please enter Markdown content first")]
    EmptyDocument,

    #[error("A conversion is already running")]
    Busy,
}

#[derive(Debug, Default)]
pub struct ConversionState {
    busy: bool,
}

impl ConversionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the trigger for `content`
    pub fn try_begin(&mut self, content: &str) -> Result<(), ConvertRefusal> {
        if self.busy {
            return Err(ConvertRefusal::Busy);
        }
        if content.trim().is_empty() {
            return Err(ConvertRefusal::EmptyDocument);
        }
        self.busy = true;
        Ok(())
    }

    /// Release the trigger and pick out the document to download, if any
    pub fn finish<E>(&mut self, result: Result<ConvertedDocument, E>) -> Result<ConvertedDocument, E> {
        self.busy = false;
        result
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn document() -> ConvertedDocument {
        ConvertedDocument {
            download_id: "abc".into(),
            filename: "document.docx".into(),
        }
    }

    #[test]
    fn test_empty_document_refused_without_claiming() {
        let mut conversion = ConversionState::new();
        assert_eq!(conversion.try_begin("  \n"), Err(ConvertRefusal::EmptyDocument));
        assert!(!conversion.is_busy());
    }

    #[test]
    fn test_second_trigger_refused_while_busy() {
        let mut conversion = ConversionState::new();
        conversion.try_begin("# Doc").unwrap();
        assert_eq!(conversion.try_begin("# Doc"), Err(ConvertRefusal::Busy));
    }

    #[test]
    fn test_success_yields_one_download_and_restores() {
        let mut conversion = ConversionState::new();
        conversion.try_begin("# Doc").unwrap();
        let downloads: Vec<_> = conversion
            .finish::<ApiError>(Ok(document()))
            .into_iter()
            .collect();
        assert_eq!(downloads, vec![document()]);
        assert!(!conversion.is_busy());
    }

    #[test]
    fn test_failure_restores_without_download() {
        let mut conversion = ConversionState::new();
        conversion.try_begin("# Doc").unwrap();
        let result = conversion.finish(Err(ApiError::Service {
            message: "boom".into(),
            suggestions: Vec::new(),
        }));
        assert!(result.is_err());
        assert!(!conversion.is_busy());
        assert!(conversion.try_begin("# Doc").is_ok());
    }
}
