//! Status bar UI component
//!
//! Displays document counters, the time of the last settled update, the
//! math engine status, any request in flight and the backend address.

use cosmic::iced::Length;
use cosmic::widget::{container, horizontal_space, text, Row};
use cosmic::Element;

use crate::message::Message;
use crate::preview::MathEngineStatus;
use crate::state::{AppState, DocumentStats};

/// Information to display in the status bar
#[derive(Debug, Clone)]
pub struct StatusBarInfo {
    /// Counters as of the last settled update
    pub stats: DocumentStats,
    /// "Last updated: HH:MM:SS", empty before the first update
    pub last_updated: String,
    /// Math renderer readiness
    pub math_status: MathEngineStatus,
    /// Label of the request in flight, if any
    pub busy: Option<&'static str>,
    /// Backend base URL
    pub server: String,
}

impl StatusBarInfo {
    /// Format document statistics
    pub fn stats_display(&self) -> String {
        self.stats.to_string()
    }
}

/// Build StatusBarInfo from the application state
pub fn build_status_info(state: &AppState) -> StatusBarInfo {
    let busy = if state.conversion.is_busy() {
        Some("Converting...")
    } else if state.uploading {
        Some("Uploading...")
    } else if state.preview.is_loading() {
        Some("Rendering...")
    } else {
        None
    };

    StatusBarInfo {
        stats: state.editor.stats(),
        last_updated: state.editor.last_updated_display(),
        math_status: state.math.status(),
        busy,
        server: state.config.server.base_url.clone(),
    }
}

/// Status bar widget
pub struct StatusBar;

impl StatusBar {
    /// Create the status bar view
    pub fn view<'a>(info: StatusBarInfo) -> Element<'a, Message> {
        let mut status_row: Row<'a, Message> = Row::new().spacing(16);

        // Left section: document counters
        status_row = status_row.push(text(info.stats_display()).size(12));

        if !info.last_updated.is_empty() {
            status_row = status_row.push(text(info.last_updated).size(12));
        }

        if let Some(busy) = info.busy {
            status_row = status_row.push(text(busy).size(12));
        }

        // Spacer
        status_row = status_row.push(horizontal_space());

        // Right section: engine and backend
        status_row = status_row.push(text(info.math_status.display_name()).size(12));
        status_row = status_row.push(text(info.server).size(12));

        container(status_row)
            .width(Length::Fill)
            .padding([4, 12])
            .into()
    }
}
