//! Alert strip shown above the status bar

use crate::message::{AlertMessage, Message};
use crate::state::{Alert, AlertLevel};
use cosmic::iced::{Alignment, Length};
use cosmic::widget::{button, container, horizontal_space, icon, text, Row};
use cosmic::Element;

use super::preview_pane::ERROR_COLOR;

/// Build the alert strip for the displayed alert
pub fn view(alert: &Alert) -> Element<'_, Message> {
    let mut message = text(alert.message.as_str()).size(13);
    if alert.level == AlertLevel::Error {
        message = message.class(cosmic::theme::Text::Color(ERROR_COLOR));
    }

    let dismiss = button::icon(icon::from_name("window-close-symbolic"))
        .on_press(Message::Alert(AlertMessage::Dismiss))
        .padding(4);

    let content = Row::new()
        .spacing(8)
        .align_y(Alignment::Center)
        .push(icon::from_name(alert.level.icon_name()).size(16).icon())
        .push(message)
        .push(horizontal_space())
        .push(dismiss);

    container(content)
        .width(Length::Fill)
        .padding([6, 12])
        .class(cosmic::theme::Container::Card)
        .into()
}
