//! Modal dialogs: confirmation prompts and formula recognition

use crate::message::{DialogMessage, Message, OcrMessage};
use crate::state::{AppState, OcrPhase, PendingConfirm, RecognitionOutcome};
use cosmic::iced::Length;
use cosmic::widget::{self, button, image, text, Column, Row};
use cosmic::Element;

use super::preview_pane::ERROR_COLOR;

/// Largest edge of the image preview inside the dialog
const PREVIEW_MAX_EDGE: f32 = 320.0;

/// Build the confirmation dialog for a pending action
pub fn confirm_dialog<'a>(pending: PendingConfirm) -> Element<'a, Message> {
    let confirm = match pending {
        PendingConfirm::ClearDocument => button::destructive(pending.confirm_label()),
        PendingConfirm::RecognizePastedImage => button::suggested(pending.confirm_label()),
    }
    .on_press(Message::Dialog(DialogMessage::Confirm));

    widget::dialog()
        .title(pending.title())
        .body(pending.body())
        .primary_action(confirm)
        .secondary_action(
            button::standard("Cancel").on_press(Message::Dialog(DialogMessage::Cancel)),
        )
        .into()
}

/// Build the formula recognition dialog
pub fn ocr_dialog<'a>(state: &'a AppState, preview: Option<&image::Handle>) -> Element<'a, Message> {
    let ocr = &state.ocr;

    let sources = Row::new()
        .spacing(8)
        .push(button::standard("Choose Image...").on_press(Message::Ocr(OcrMessage::PickImage)))
        .push(button::standard("Paste Image").on_press(Message::Ocr(OcrMessage::PasteImage)));

    let mut control = Column::new().spacing(12).push(sources);

    match (ocr.image(), preview) {
        (Some(candidate), handle) => {
            if let Some(handle) = handle {
                let (width, height) = candidate.dimensions();
                let scale = (PREVIEW_MAX_EDGE / width.max(height).max(1) as f32).min(1.0);
                control = control.push(
                    widget::image(handle.clone())
                        .width(Length::Fixed(width as f32 * scale))
                        .height(Length::Fixed(height as f32 * scale)),
                );
            }
            control = control.push(text(candidate.info_line()).size(12));
        }
        (None, _) => {
            control = control.push(
                text("Choose an image file, drop one on the window, or paste from the clipboard.")
                    .size(13),
            );
        }
    }

    match ocr.phase() {
        OcrPhase::Recognizing => {
            control = control.push(text("Recognizing formula...").size(13));
        }
        OcrPhase::ResultShown(outcome) => {
            control = control.push(view_outcome(state, outcome));
        }
        OcrPhase::Idle | OcrPhase::AwaitingImage | OcrPhase::ImageLoaded => {}
    }

    let primary = if ocr.recognized_latex().is_some() {
        button::suggested("Insert").on_press(Message::Ocr(OcrMessage::Insert))
    } else {
        button::suggested("Recognize")
            .on_press_maybe(ocr.can_recognize().then_some(Message::Ocr(OcrMessage::Recognize)))
    };

    widget::dialog()
        .title("Recognize Formula")
        .control(control)
        .primary_action(primary)
        .secondary_action(button::standard("Close").on_press(Message::Ocr(OcrMessage::Close)))
        .into()
}

fn view_outcome<'a>(state: &'a AppState, outcome: &'a RecognitionOutcome) -> Element<'a, Message> {
    match outcome {
        RecognitionOutcome::Recognized(recognition) => {
            let mut summary = format!(
                "{} · {}",
                recognition.method,
                recognition.confidence.display_name()
            );
            if let Some(score) = recognition.confidence_score {
                summary.push_str(&format!(" ({:.2})", score));
            }

            let typeset = state
                .math
                .typesetter()
                .map(|engine| engine.typeset(&recognition.latex));
            let rendered: Element<'a, Message> = match typeset {
                Some(Ok(formula)) => text(formula).size(20).into(),
                Some(Err(e)) => text(format!("Cannot preview formula: {}", e))
                    .size(12)
                    .class(cosmic::theme::Text::Color(ERROR_COLOR))
                    .into(),
                None => text(state.math.status().display_name()).size(12).into(),
            };

            Column::new()
                .spacing(6)
                .push(text(summary).size(13))
                .push(text("LaTeX").size(12).font(cosmic::font::bold()))
                .push(
                    text(recognition.latex.as_str())
                        .font(cosmic::font::mono())
                        .size(13),
                )
                .push(text("Preview").size(12).font(cosmic::font::bold()))
                .push(rendered)
                .into()
        }

        RecognitionOutcome::Failed {
            message,
            suggestions,
        } => {
            let mut column = Column::new().spacing(4).push(
                text(message.as_str())
                    .size(13)
                    .class(cosmic::theme::Text::Color(ERROR_COLOR)),
            );
            if !suggestions.is_empty() {
                column = column.push(text("Suggestions").size(12).font(cosmic::font::bold()));
                column = suggestions.iter().fold(column, |column, s| {
                    column.push(text(format!("•  {}", s)).size(12))
                });
            }
            column.into()
        }
    }
}
