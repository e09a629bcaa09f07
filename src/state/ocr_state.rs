//! Formula recognition session
//!
//! ```text
//! Idle -> AwaitingImage -> ImageLoaded -> Recognizing -> ResultShown
//!   ^__________________________ close ___________________________|
//! ```
//!
//! Selecting a new image from `ImageLoaded` or `ResultShown` starts over at
//! `ImageLoaded`. Closing bumps the request and load generations so a
//! recognition or image load still in flight is discarded when it returns.

use crate::api::Recognition;
use crate::error::ApiError;
use crate::ocr::CandidateImage;

/// Generation stamp of one recognition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionTicket(u64);

/// Generation stamp of one image load (file pick, paste or drop)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTicket(u64);

/// Result of a recognition request as shown in the dialog
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Recognized(Recognition),
    Failed {
        message: String,
        suggestions: Vec<String>,
    },
}

impl RecognitionOutcome {
    pub fn from_result(result: Result<Recognition, ApiError>) -> Self {
        match result {
            Ok(recognition) => RecognitionOutcome::Recognized(recognition),
            Err(ApiError::Service {
                message,
                suggestions,
            }) => RecognitionOutcome::Failed {
                message,
                suggestions,
            },
            Err(e) => RecognitionOutcome::Failed {
                message: format!("Recognition failed: {}", e),
                suggestions: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OcrPhase {
    Idle,
    AwaitingImage,
    ImageLoaded,
    Recognizing,
    ResultShown(RecognitionOutcome),
}

#[derive(Debug)]
pub struct OcrState {
    phase: OcrPhase,
    image: Option<CandidateImage>,
    generation: u64,
    load_generation: u64,
}

impl OcrState {
    pub fn new() -> Self {
        Self {
            phase: OcrPhase::Idle,
            image: None,
            generation: 0,
            load_generation: 0,
        }
    }

    /// Open the dialog with a fresh session
    pub fn open(&mut self) {
        if self.phase == OcrPhase::Idle {
            log::debug!("formula recognition opened");
            self.phase = OcrPhase::AwaitingImage;
            self.image = None;
        }
    }

    /// Close the dialog and forget the session
    pub fn close(&mut self) {
        if self.phase != OcrPhase::Idle {
            log::debug!("formula recognition closed");
        }
        self.phase = OcrPhase::Idle;
        self.image = None;
        self.generation += 1;
        self.load_generation += 1;
    }

    pub fn is_open(&self) -> bool {
        self.phase != OcrPhase::Idle
    }

    /// Start acquiring an image, opening the dialog if needed. The ticket
    /// goes stale when the dialog closes or a newer load starts.
    pub fn begin_image_load(&mut self) -> ImageTicket {
        self.open();
        self.load_generation += 1;
        ImageTicket(self.load_generation)
    }

    /// Offer an acquired image. Returns `None` for a stale load, which is
    /// dropped without touching the session. A rejected image leaves the
    /// session as it was and hands the error back for an alert.
    pub fn accept_image<E: std::fmt::Display>(
        &mut self,
        ticket: ImageTicket,
        candidate: Result<CandidateImage, E>,
    ) -> Option<Result<(), E>> {
        if ticket.0 != self.load_generation || !self.is_open() {
            log::debug!("dropping stale image load");
            return None;
        }
        if self.phase == OcrPhase::Recognizing {
            // the outstanding request belongs to the old image
            self.generation += 1;
        }
        match candidate {
            Ok(image) => {
                log::info!("formula image selected: {:?}", image);
                self.image = Some(image);
                self.phase = OcrPhase::ImageLoaded;
                Some(Ok(()))
            }
            Err(e) => {
                log::warn!("formula image rejected: {}", e);
                if self.image.is_none() {
                    self.phase = OcrPhase::AwaitingImage;
                }
                Some(Err(e))
            }
        }
    }

    /// Whether the recognize action is available
    pub fn can_recognize(&self) -> bool {
        self.image.is_some()
            && matches!(self.phase, OcrPhase::ImageLoaded | OcrPhase::ResultShown(_))
    }

    /// Enter `Recognizing`, yielding the image to submit
    pub fn begin_recognition(&mut self) -> Option<(RecognitionTicket, CandidateImage)> {
        if !self.can_recognize() {
            return None;
        }
        let image = self.image.clone()?;
        self.generation += 1;
        self.phase = OcrPhase::Recognizing;
        Some((RecognitionTicket(self.generation), image))
    }

    /// Apply a recognition result. Returns false when it was stale.
    pub fn complete(&mut self, ticket: RecognitionTicket, outcome: RecognitionOutcome) -> bool {
        if ticket.0 != self.generation || self.phase != OcrPhase::Recognizing {
            log::debug!("dropping stale recognition result");
            return false;
        }
        self.phase = OcrPhase::ResultShown(outcome);
        true
    }

    /// LaTeX ready for insertion, if the last recognition succeeded
    pub fn recognized_latex(&self) -> Option<&str> {
        match &self.phase {
            OcrPhase::ResultShown(RecognitionOutcome::Recognized(r)) if !r.latex.trim().is_empty() => {
                Some(&r.latex)
            }
            _ => None,
        }
    }

    pub fn phase(&self) -> &OcrPhase {
        &self.phase
    }

    pub fn image(&self) -> Option<&CandidateImage> {
        self.image.as_ref()
    }
}

impl Default for OcrState {
    fn default() -> Self {
        Self::new()
    }
}
