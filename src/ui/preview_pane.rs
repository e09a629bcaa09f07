//! Preview pane
//!
//! Draws the block model of the last rendered snapshot. Runs without math are
//! one text widget. Runs with math are laid out as a wrapping row so each
//! region can carry its own tooltip: the LaTeX source when it typeset, the
//! error when it did not. A failed region shows its raw source in the error
//! color where it sits.

use crate::message::Message;
use crate::preview::{HighlightedLine, Inline, MathId, PreviewBlock, PreviewDocument};
use crate::state::{PreviewView, PLACEHOLDER_TEXT};
use cosmic::iced::{Alignment, Color, Length};
use cosmic::widget::{container, divider, flex_row, scrollable, text, tooltip, Column, Row};
use cosmic::Element;

/// Color for inline error text
pub const ERROR_COLOR: Color = Color {
    r: 0.86,
    g: 0.21,
    b: 0.27,
    a: 1.0,
};

const BODY_SIZE: u16 = 14;

/// Build the preview body for the current view
pub fn view(preview: &PreviewView) -> Element<'_, Message> {
    match preview {
        PreviewView::Placeholder => container(text(PLACEHOLDER_TEXT).size(14))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into(),

        PreviewView::Failed(message) => container(error_text(format!("Preview failed: {}", message)))
            .width(Length::Fill)
            .padding(16)
            .into(),

        PreviewView::Rendered(doc) => {
            scrollable(view_blocks(doc, doc.blocks(), 10).padding(16))
                .height(Length::Fill)
                .into()
        }
    }
}

fn error_text<'a>(message: impl Into<String>) -> Element<'a, Message> {
    text(message.into())
        .size(12)
        .class(cosmic::theme::Text::Color(ERROR_COLOR))
        .into()
}

/// How one math region is drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathDisplay {
    pub text: String,
    /// Kind of formula and its LaTeX source, or the error when typesetting failed
    pub tooltip: String,
    pub failed: bool,
}

/// Typeset form of a region, or its delimited source while untypeset or failed
pub fn math_display(doc: &PreviewDocument, id: MathId) -> Option<MathDisplay> {
    let region = doc.math(id)?;
    let (source, kind) = if region.display {
        (format!("$${}$$", region.latex), "Display formula")
    } else {
        (format!("${}$", region.latex), "Inline formula")
    };
    let about = format!(
        "{}, converted to an editable Word equation\n{}",
        kind, region.latex
    );
    Some(match doc.typeset_for(id) {
        Some(Ok(rendered)) => MathDisplay {
            text: rendered.clone(),
            tooltip: about,
            failed: false,
        },
        Some(Err(e)) => MathDisplay {
            text: source,
            tooltip: format!("Check the LaTeX syntax. {}", e),
            failed: true,
        },
        None => MathDisplay {
            text: source,
            tooltip: about,
            failed: false,
        },
    })
}

/// Inline text with math regions shown as source
pub fn plain_text(doc: &PreviewDocument, inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(s) | Inline::Strong(s) | Inline::Emphasis(s) | Inline::Code(s) => {
                out.push_str(s)
            }
            Inline::Math(id) => out.extend(math_display(doc, *id).map(|m| m.text)),
        }
    }
    out
}

fn view_math<'a>(display: MathDisplay, size: u16) -> Element<'a, Message> {
    let label = text(display.text).size(size);
    let label = if display.failed {
        label
            .font(cosmic::font::mono())
            .class(cosmic::theme::Text::Color(ERROR_COLOR))
    } else {
        label
    };
    tooltip(label, text(display.tooltip).size(12), tooltip::Position::Top).into()
}

fn view_inlines<'a>(
    doc: &'a PreviewDocument,
    inlines: &'a [Inline],
    size: u16,
    bold: bool,
) -> Element<'a, Message> {
    let font = if bold {
        cosmic::font::bold()
    } else {
        cosmic::font::default()
    };
    if !inlines.iter().any(|i| matches!(i, Inline::Math(_))) {
        return text(plain_text(doc, inlines)).size(size).font(font).into();
    }

    let mut pieces: Vec<Element<'a, Message>> = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Text(s) | Inline::Strong(s) | Inline::Emphasis(s) | Inline::Code(s) => {
                pieces.extend(s.split_whitespace().map(|word| -> Element<'a, Message> {
                    text(word).size(size).font(font).into()
                }));
            }
            Inline::Math(id) => pieces.extend(math_display(doc, *id).map(|m| view_math(m, size))),
        }
    }
    flex_row(pieces).column_spacing(4).row_spacing(2).into()
}

fn heading_size(level: u8) -> u16 {
    match level {
        1 => 28,
        2 => 24,
        3 => 20,
        4 => 18,
        _ => 16,
    }
}

fn view_blocks<'a>(
    doc: &'a PreviewDocument,
    blocks: &'a [PreviewBlock],
    spacing: u16,
) -> Column<'a, Message> {
    blocks
        .iter()
        .fold(Column::new().spacing(spacing), |column, block| {
            column.push(view_block(doc, block))
        })
}

fn view_block<'a>(doc: &'a PreviewDocument, block: &'a PreviewBlock) -> Element<'a, Message> {
    match block {
        PreviewBlock::Heading { level, content } => {
            view_inlines(doc, content, heading_size(*level), true)
        }

        PreviewBlock::Paragraph(content) => view_inlines(doc, content, BODY_SIZE, false),

        PreviewBlock::List {
            ordered,
            start,
            items,
        } => items
            .iter()
            .enumerate()
            .fold(Column::new().spacing(4), |column, (i, item)| {
                let marker = if *ordered {
                    format!("{}.", *start as usize + i)
                } else {
                    "•".to_string()
                };
                column.push(
                    Row::new()
                        .spacing(8)
                        .push(text(marker).size(BODY_SIZE))
                        .push(view_blocks(doc, item, 4)),
                )
            })
            .into(),

        PreviewBlock::Quote(inner) => container(view_blocks(doc, inner, 6))
            .padding([4, 12])
            .width(Length::Fill)
            .class(cosmic::theme::Container::Card)
            .into(),

        PreviewBlock::TableRow(cells) => cells
            .iter()
            .fold(Row::new().spacing(16), |row, cell| {
                row.push(
                    container(view_inlines(doc, cell, BODY_SIZE, false))
                        .width(Length::FillPortion(1)),
                )
            })
            .into(),

        PreviewBlock::Code {
            source,
            highlighted,
            ..
        } => {
            let body: Element<'a, Message> = match highlighted {
                Some(lines) => view_highlighted(lines),
                None => text(source.as_str()).font(cosmic::font::mono()).size(13).into(),
            };
            container(body)
                .padding(10)
                .width(Length::Fill)
                .class(cosmic::theme::Container::Card)
                .into()
        }

        PreviewBlock::DisplayMath(id) => {
            let Some(display) = math_display(doc, *id) else {
                return Column::new().into();
            };
            let error = display.failed.then(|| display.tooltip.clone());
            let formula = container(view_math(display, 20))
                .width(Length::Fill)
                .center_x(Length::Fill);
            match error {
                Some(message) => Column::new()
                    .spacing(2)
                    .push(formula)
                    .push(error_text(message))
                    .into(),
                None => formula.into(),
            }
        }

        PreviewBlock::Rule => divider::horizontal::default().into(),
    }
}

fn view_highlighted(lines: &[HighlightedLine]) -> Element<'_, Message> {
    lines
        .iter()
        .fold(Column::new(), |column, line| {
            let row = line.iter().fold(
                Row::new().align_y(Alignment::Start),
                |row, span| {
                    let [r, g, b] = span.color;
                    row.push(
                        text(span.text.trim_end_matches('\n'))
                            .font(cosmic::font::mono())
                            .size(13)
                            .class(cosmic::theme::Text::Color(Color::from_rgb8(r, g, b))),
                    )
                },
            );
            column.push(row)
        })
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::UnicodeTypesetter;

    #[test]
    fn test_typeset_region_shows_source_in_tooltip() {
        let mut doc = PreviewDocument::from_html("<p>Area <strong>is</strong> $\\pi r^2$</p>");
        doc.typeset(&UnicodeTypesetter::new());
        let display = math_display(&doc, MathId(0)).unwrap();
        assert_eq!(display.text, "πr²");
        assert!(display.tooltip.starts_with("Inline formula"));
        assert!(display.tooltip.ends_with("\n\\pi r^2"));
        assert!(!display.failed);

        let PreviewBlock::Paragraph(content) = &doc.blocks()[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(plain_text(&doc, content), "Area is πr²");
    }

    #[test]
    fn test_failed_region_keeps_source_and_error() {
        let mut doc = PreviewDocument::from_html("<p>bad $\\frac{a}{b$ then $x$</p>");
        doc.typeset(&UnicodeTypesetter::new());

        let failed = math_display(&doc, MathId(0)).unwrap();
        assert!(failed.failed);
        assert_eq!(failed.text, "$\\frac{a}{b$");
        assert!(failed.tooltip.contains("Invalid formula"));

        let fine = math_display(&doc, MathId(1)).unwrap();
        assert!(!fine.failed);
        assert_eq!(fine.text, "x");
    }

    #[test]
    fn test_untypeset_display_math_shows_delimited_source() {
        let doc = PreviewDocument::from_html("<p>$$x$$</p>");
        let display = math_display(&doc, MathId(0)).unwrap();
        assert_eq!(display.text, "$$x$$");
        assert!(display.tooltip.starts_with("Display formula"));
        assert!(display.tooltip.ends_with("\nx"));
        assert!(!display.failed);
        assert_eq!(math_display(&doc, MathId(1)), None);
    }
}
