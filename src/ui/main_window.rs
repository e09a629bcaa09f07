//! Main window layout and composition
//!
//! Toolbar on top, the editor and preview panes side by side with a drag
//! handle between them, then the alert strip and the status bar.

use crate::message::{
    ConvertMessage, EditorMessage, FileMessage, LayoutMessage, Message, OcrMessage,
};
use crate::state::{AppState, Panel};
use crate::ui::preview_pane;
use crate::ui::status_bar::{build_status_info, StatusBar};
use crate::ui::toast;
use cosmic::iced::{Alignment, Length};
use cosmic::widget::{
    button, container, divider, horizontal_space, icon, mouse_area, text, text_editor, tooltip,
    Column, Row,
};
use cosmic::Element;

/// Width of the drag handle between the panes
const RESIZER_WIDTH: f32 = 8.0;

/// Build the main window view
pub fn view<'a>(state: &'a AppState, content: &'a text_editor::Content) -> Element<'a, Message> {
    let visibility = state.layout.visibility();
    let (editor_portion, preview_portion) = state.layout.portions();

    let width = |portion: u16| {
        if state.layout.fullscreen().is_some() {
            Length::Fill
        } else {
            Length::FillPortion(portion)
        }
    };

    let mut panes = Row::new().height(Length::Fill);

    if visibility.editor {
        panes = panes.push(
            container(build_editor_pane(state, content))
                .width(width(editor_portion))
                .height(Length::Fill),
        );
    }

    if visibility.resizer {
        panes = panes.push(build_resizer());
    }

    if visibility.preview {
        panes = panes.push(
            container(build_preview_pane(state))
                .width(width(preview_portion))
                .height(Length::Fill),
        );
    }

    let mut column = Column::new().push(build_toolbar(state)).push(panes);

    if let Some(alert) = state.alerts.current() {
        column = column.push(toast::view(alert));
    }

    column = column.push(StatusBar::view(build_status_info(state)));

    container(column)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Build the action toolbar
fn build_toolbar(state: &AppState) -> Element<'_, Message> {
    let converting = state.conversion.is_busy();
    let convert_label = if converting {
        "Converting..."
    } else {
        "Convert to Word"
    };

    let row = Row::new()
        .spacing(8)
        .align_y(Alignment::Center)
        .push(
            button::standard("Open")
                .on_press_maybe((!state.uploading).then_some(Message::File(FileMessage::Open))),
        )
        .push(
            button::suggested(convert_label)
                .on_press_maybe((!converting).then_some(Message::Convert(ConvertMessage::Start))),
        )
        .push(button::standard("Recognize Formula").on_press(Message::Ocr(OcrMessage::Open)))
        .push(horizontal_space())
        .push(button::destructive("Clear").on_press(Message::File(FileMessage::Clear)));

    container(row).width(Length::Fill).padding([6, 12]).into()
}

/// Pane title with its fullscreen toggle
fn build_pane_header<'a>(state: &'a AppState, panel: Panel, title: &'a str) -> Element<'a, Message> {
    let label = state.layout.toggle_label(panel);
    let toggle = tooltip(
        button::icon(icon::from_name(label.icon))
            .on_press(Message::Layout(LayoutMessage::ToggleFullscreen(panel)))
            .padding(4),
        text(label.tooltip),
        tooltip::Position::Bottom,
    );

    let mut row = Row::new()
        .spacing(8)
        .align_y(Alignment::Center)
        .push(text(title).size(14).font(cosmic::font::bold()));

    if panel == Panel::Preview && state.preview.is_loading() {
        row = row.push(text("Rendering...").size(12));
    }

    container(row.push(horizontal_space()).push(toggle))
        .width(Length::Fill)
        .padding([4, 8])
        .into()
}

fn build_editor_pane<'a>(state: &'a AppState, content: &'a text_editor::Content) -> Element<'a, Message> {
    let editor = text_editor(content)
        .placeholder("Type Markdown here...")
        .on_action(|action| Message::Editor(EditorMessage::Action(action)))
        .font(cosmic::font::mono())
        .height(Length::Fill)
        .padding(10);

    Column::new()
        .push(build_pane_header(state, Panel::Editor, "Markdown"))
        .push(container(editor).height(Length::Fill).padding(8))
        .into()
}

fn build_preview_pane(state: &AppState) -> Element<'_, Message> {
    Column::new()
        .push(build_pane_header(state, Panel::Preview, "Preview"))
        .push(
            container(preview_pane::view(state.preview.view()))
                .width(Length::Fill)
                .height(Length::Fill)
                .class(cosmic::theme::Container::Card),
        )
        .into()
}

/// Drag handle between the panes
fn build_resizer<'a>() -> Element<'a, Message> {
    mouse_area(
        container(divider::vertical::default())
            .width(Length::Fixed(RESIZER_WIDTH))
            .height(Length::Fill)
            .center_x(Length::Fixed(RESIZER_WIDTH)),
    )
    .on_press(Message::Layout(LayoutMessage::StartResize))
    .into()
}
