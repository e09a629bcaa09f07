//! State management module for Cosmic Md2Word
//!
//! This module contains all application state types organized by concern:
//! - `app_state`: Root application state container
//! - `editor_state`: Markdown buffer, caret and debounce generations
//! - `preview_state`: Rendered preview snapshot with stale-response guard
//! - `layout_state`: Split view, resize drag and fullscreen
//! - `alert_state`: Single transient notification
//! - `ocr_state`: Formula recognition session
//! - `conversion_state`: Word conversion guard

mod alert_state;
mod app_state;
mod conversion_state;
mod editor_state;
mod layout_state;
mod ocr_state;
mod preview_state;

pub use alert_state::*;
pub use app_state::*;
pub use conversion_state::*;
pub use editor_state::*;
pub use layout_state::*;
pub use ocr_state::*;
pub use preview_state::*;
