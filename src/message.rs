//! Application message types
//!
//! Defines all messages that can be sent to the application's update function.
//! Messages are organized by category for clear handling and routing.

use crate::api::ConvertedDocument;
use crate::ocr::CandidateImage;
use crate::preview::MathTypesetter;
use crate::state::{
    AlertId, DebounceTicket, ImageTicket, Panel, RecognitionOutcome, RecognitionTicket,
    RenderTicket,
};
use cosmic::widget::text_editor;
use std::path::PathBuf;
use std::sync::Arc;

/// Main application message enum
#[derive(Debug, Clone)]
pub enum Message {
    /// Buffer edits and debounce timers
    Editor(EditorMessage),

    /// Preview rendering and math typesetting
    Preview(PreviewMessage),

    /// Word conversion
    Convert(ConvertMessage),

    /// Formula recognition
    Ocr(OcrMessage),

    /// Split view and fullscreen
    Layout(LayoutMessage),

    /// Transient notifications
    Alert(AlertMessage),

    /// Document upload, drop and clear
    File(FileMessage),

    /// Confirmation dialog
    Dialog(DialogMessage),

    /// System/window events
    System(SystemMessage),

    /// Surface actions (for menu bar support)
    Surface(cosmic::surface::Action),

    /// No-op message (for subscriptions that don't need action)
    None,
}

/// Editor-related messages
#[derive(Debug, Clone)]
pub enum EditorMessage {
    /// Text editor action from iced's text_editor widget
    Action(text_editor::Action),

    /// The quiet period after an edit has passed
    Settled(DebounceTicket),
}

/// Preview-related messages
#[derive(Debug, Clone)]
pub enum PreviewMessage {
    /// Render service answered
    Rendered {
        ticket: RenderTicket,
        result: Result<String, String>,
    },

    /// Try typesetting again once the math engine may be ready
    RetryTypeset(RenderTicket),

    /// The math engine finished building
    EngineLoaded(Result<Arc<dyn MathTypesetter>, String>),

    /// Readiness poll tick
    PollEngine,
}

/// Conversion-related messages
#[derive(Debug, Clone)]
pub enum ConvertMessage {
    /// Convert the buffer to Word
    Start,

    /// Conversion service answered
    Finished(Result<ConvertedDocument, String>),

    /// The generated document was downloaded
    Saved(Result<PathBuf, String>),
}

/// Formula recognition messages
#[derive(Debug, Clone)]
pub enum OcrMessage {
    /// Open the recognition dialog
    Open,

    /// Close the dialog and reset the session
    Close,

    /// Show the native image picker
    PickImage,

    /// Picker closed
    ImagePicked(Option<PathBuf>),

    /// Read the image currently on the clipboard
    PasteImage,

    /// An acquired image, validated or rejected
    ImageLoaded {
        ticket: ImageTicket,
        result: Result<CandidateImage, String>,
    },

    /// Submit the image for recognition
    Recognize,

    /// Recognition service answered
    Recognized {
        ticket: RecognitionTicket,
        outcome: RecognitionOutcome,
    },

    /// Insert the recognized formula at the caret
    Insert,
}

/// Layout-related messages
#[derive(Debug, Clone)]
pub enum LayoutMessage {
    /// Pointer pressed on the divider
    StartResize,

    /// Pointer moved to this window X coordinate
    PointerMoved(f32),

    /// Pointer released
    StopResize,

    /// Toggle fullscreen on a panel
    ToggleFullscreen(Panel),

    /// Leave fullscreen
    ExitFullscreen,
}

/// Alert-related messages
#[derive(Debug, Clone)]
pub enum AlertMessage {
    /// Auto-dismiss timer fired
    Expire(AlertId),

    /// Dismissed by the user
    Dismiss,
}

/// File-related messages
#[derive(Debug, Clone)]
pub enum FileMessage {
    /// Show the document picker and upload the selection
    Open,

    /// Picker closed
    Picked(Option<PathBuf>),

    /// Upload service answered
    Uploaded(Result<String, String>),

    /// A file was dropped on the window
    Dropped(PathBuf),

    /// A dropped Markdown file was read locally
    LocalLoaded(Result<String, String>),

    /// Clear the document (asks first)
    Clear,
}

/// Dialog-related messages
#[derive(Debug, Clone)]
pub enum DialogMessage {
    /// Confirm the pending action
    Confirm,

    /// Dismiss the pending action
    Cancel,
}

/// System/window event messages
#[derive(Debug, Clone)]
pub enum SystemMessage {
    /// Ctrl+V reached the window without a focused text input
    UnhandledPaste,

    /// Clipboard check after an unhandled paste
    ClipboardChecked { has_image: bool },

    /// Escape pressed
    Escape,

    /// Window size changed
    WindowResized { width: f32, height: f32 },
}
