//! Root application state container
//!
//! One `AppState` is built at startup and owned by the application. Each
//! concern keeps its own state struct; the handlers in `app` borrow the
//! parts they need.

use super::{
    AlertLevel, AlertState, ConversionState, EditorState, LayoutState, OcrState, PreviewState,
    RenderTicket,
};
use crate::config::Config;
use crate::error::{EditorError, EditorResult};
use crate::preview::MathEngine;
use chrono::{DateTime, Local};

/// A destructive or intrusive action waiting for the user to confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirm {
    /// Clear a non-blank document
    ClearDocument,
    /// Open formula recognition with the image found on the clipboard
    RecognizePastedImage,
}

impl PendingConfirm {
    pub fn title(&self) -> &'static str {
        match self {
            PendingConfirm::ClearDocument => "Clear document?",
            PendingConfirm::RecognizePastedImage => "Recognize formula?",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            PendingConfirm::ClearDocument => {
                "The editor content will be removed. This cannot be undone."
            }
            PendingConfirm::RecognizePastedImage => {
                "The clipboard contains an image. Open formula recognition with it?"
            }
        }
    }

    pub fn confirm_label(&self) -> &'static str {
        match self {
            PendingConfirm::ClearDocument => "Clear",
            PendingConfirm::RecognizePastedImage => "Recognize",
        }
    }
}

/// Root application state
#[derive(Debug)]
pub struct AppState {
    /// Loaded configuration
    pub config: Config,

    /// The Markdown buffer
    pub editor: EditorState,

    /// Rendered preview snapshot
    pub preview: PreviewState,

    /// Split view and fullscreen
    pub layout: LayoutState,

    /// Transient notifications
    pub alerts: AlertState,

    /// Formula recognition session
    pub ocr: OcrState,

    /// Word conversion guard
    pub conversion: ConversionState,

    /// Math typesetting engine
    pub math: MathEngine,

    /// Confirmation dialog, if one is open
    pub pending_confirm: Option<PendingConfirm>,

    /// Whether a document upload is running
    pub uploading: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            editor: EditorState::new(),
            preview: PreviewState::new(),
            layout: LayoutState::new(config.ui.default_split_percent),
            alerts: AlertState::new(),
            ocr: OcrState::new(),
            conversion: ConversionState::new(),
            math: MathEngine::new(config.math.ready_timeout()),
            pending_confirm: None,
            uploading: false,
            config,
        }
    }

    /// Run the settled-edit sequence: start a render, recompute counters and
    /// stamp the update time. Returns the ticket when a request is needed.
    pub fn apply_update(&mut self, now: DateTime<Local>) -> Option<RenderTicket> {
        let ticket = self.preview.begin(&self.editor.text());
        self.editor.refresh_stats();
        self.editor.touch(now);
        ticket
    }

    /// Replace the buffer and update everything immediately
    pub fn replace_document(&mut self, text: &str, now: DateTime<Local>) -> Option<RenderTicket> {
        self.editor.replace(text);
        self.apply_update(now)
    }

    /// Insert the recognized formula at the caret and close recognition
    pub fn insert_recognized_formula(
        &mut self,
        now: DateTime<Local>,
    ) -> EditorResult<Option<RenderTicket>> {
        let latex = self
            .ocr
            .recognized_latex()
            .ok_or(EditorError::NothingToInsert)?
            .to_string();
        self.editor.insert_formula(&latex)?;
        self.ocr.close();
        self.alerts.show(AlertLevel::Success, "Formula inserted");
        Ok(self.apply_update(now))
    }

    /// Ask before clearing unless there is nothing to lose
    pub fn request_clear(&mut self) -> bool {
        if self.editor.is_blank() {
            return false;
        }
        self.pending_confirm = Some(PendingConfirm::ClearDocument);
        true
    }

    /// Any request the busy indicator should reflect
    pub fn is_busy(&self) -> bool {
        self.uploading || self.conversion.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ConfidenceTier, Recognition};
    use crate::config::MAX_IMAGE_SIZE;
    use crate::error::ImageError;
    use crate::ocr::CandidateImage;
    use crate::state::{PreviewView, RecognitionOutcome};
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn state() -> AppState {
        AppState::new(Config::default())
    }

    #[test]
    fn test_update_on_empty_buffer() {
        let mut app = state();
        assert!(app.apply_update(Local::now()).is_none());
        assert_eq!(app.preview.view(), &PreviewView::Placeholder);
        assert_eq!(app.editor.stats().line_count, 1);
        assert!(app.editor.last_updated().is_some());
    }

    #[test]
    fn test_replace_document_requests_render() {
        let mut app = state();
        assert!(app.replace_document("# Title\ntext", Local::now()).is_some());
        assert_eq!(app.editor.stats().line_count, 2);
    }

    /// Drive a recognition session to a successful result
    fn recognize(app: &mut AppState, latex: &str) {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        let candidate = CandidateImage::validate(None, "image/png", png, MAX_IMAGE_SIZE).unwrap();
        let load = app.ocr.begin_image_load();
        app.ocr
            .accept_image::<ImageError>(load, Ok(candidate))
            .unwrap()
            .unwrap();
        let (ticket, _) = app.ocr.begin_recognition().unwrap();
        app.ocr.complete(
            ticket,
            RecognitionOutcome::Recognized(Recognition {
                method: "ocr".into(),
                confidence: ConfidenceTier::Medium,
                confidence_score: None,
                latex: latex.into(),
            }),
        );
    }

    #[test]
    fn test_insert_recognized_formula() {
        let mut app = state();
        app.replace_document("A  B", Local::now());
        app.editor.set_caret(2);
        recognize(&mut app, "E=mc^2");

        let render = app.insert_recognized_formula(Local::now()).unwrap();
        assert!(render.is_some());
        assert_eq!(app.editor.text(), "A $$E=mc^2$$ B");
        assert!(!app.ocr.is_open());
        assert_eq!(app.editor.stats().char_count, "A $$E=mc^2$$ B".len());
    }

    #[test]
    fn test_second_insert_lands_after_first() {
        let mut app = state();
        app.replace_document("公式：结束", Local::now());
        app.editor.set_caret_from_cursor(0, "公式".len());

        recognize(&mut app, "a");
        app.insert_recognized_formula(Local::now()).unwrap();
        recognize(&mut app, "b");
        app.insert_recognized_formula(Local::now()).unwrap();

        assert_eq!(app.editor.text(), "公式$$a$$$$b$$：结束");
    }

    #[test]
    fn test_insert_without_result_fails() {
        let mut app = state();
        assert!(matches!(
            app.insert_recognized_formula(Local::now()),
            Err(EditorError::NothingToInsert)
        ));
    }

    #[test]
    fn test_clear_asks_only_when_needed() {
        let mut app = state();
        assert!(!app.request_clear());
        assert!(app.pending_confirm.is_none());
        app.replace_document("text", Local::now());
        assert!(app.request_clear());
        assert_eq!(app.pending_confirm, Some(PendingConfirm::ClearDocument));
    }
}
