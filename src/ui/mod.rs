//! UI module for Cosmic Md2Word
//!
//! Contains all user interface components including:
//! - Main window layout with the split editor/preview panes
//! - Preview rendering of the block model
//! - Status bar and alert strip
//! - Confirmation and formula recognition dialogs

mod dialogs;
mod main_window;
mod preview_pane;
mod status_bar;
mod toast;

use crate::message::Message;
use crate::state::AppState;
use cosmic::widget::text_editor;
use cosmic::Element;

pub use dialogs::{confirm_dialog, ocr_dialog};

/// Build the main application view
pub fn view<'a>(state: &'a AppState, content: &'a text_editor::Content) -> Element<'a, Message> {
    main_window::view(state, content)
}
