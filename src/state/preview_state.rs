//! Preview snapshot and render bookkeeping
//!
//! Every render request carries a [`RenderTicket`]. A response is applied
//! only if its ticket is still the newest one handed out, so a slow reply
//! can never overwrite a newer preview.

use crate::preview::{CodeHighlighter, MathTypesetter, PreviewDocument, TypesetReport};

/// Text shown when there is nothing to preview
pub const PLACEHOLDER_TEXT: &str = "Start typing Markdown on the left to see the preview here.";

/// Generation stamp of one render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket(u64);

/// What the preview pane shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewView {
    Placeholder,
    Rendered(PreviewDocument),
    Failed(String),
}

#[derive(Debug)]
pub struct PreviewState {
    view: PreviewView,
    generation: u64,
    in_flight: bool,
}

impl PreviewState {
    pub fn new() -> Self {
        Self {
            view: PreviewView::Placeholder,
            generation: 0,
            in_flight: false,
        }
    }

    /// Start a render. Blank content shows the placeholder right away and
    /// needs no request; any request still in flight becomes stale.
    pub fn begin(&mut self, content: &str) -> Option<RenderTicket> {
        self.generation += 1;
        if content.trim().is_empty() {
            self.view = PreviewView::Placeholder;
            self.in_flight = false;
            return None;
        }
        self.in_flight = true;
        Some(RenderTicket(self.generation))
    }

    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Apply a render response. Returns false when the response was stale.
    pub fn complete(&mut self, ticket: RenderTicket, result: Result<String, String>) -> bool {
        if !self.is_current(ticket) {
            log::debug!(
                "dropping stale preview response {} (current {})",
                ticket.0,
                self.generation
            );
            return false;
        }
        self.in_flight = false;
        self.view = match result {
            Ok(html) => PreviewView::Rendered(PreviewDocument::from_html(&html)),
            Err(message) => {
                log::error!("preview failed: {}", message);
                PreviewView::Failed(message)
            }
        };
        true
    }

    /// Highlight the code blocks of the current document
    pub fn highlight(&mut self, highlighter: &CodeHighlighter) {
        if let PreviewView::Rendered(doc) = &mut self.view {
            doc.highlight(highlighter);
        }
    }

    /// Typeset the math of the current document
    pub fn typeset(&mut self, engine: &dyn MathTypesetter) -> Option<TypesetReport> {
        match &mut self.view {
            PreviewView::Rendered(doc) => Some(doc.typeset(engine)),
            _ => None,
        }
    }

    /// Whether the current document has math still waiting for the engine
    pub fn needs_typeset(&self) -> bool {
        matches!(&self.view, PreviewView::Rendered(doc) if !doc.is_typeset())
    }

    /// Ticket of the snapshot now on screen, for scheduling a typeset retry
    pub fn current_ticket(&self) -> RenderTicket {
        RenderTicket(self.generation)
    }

    pub fn view(&self) -> &PreviewView {
        &self.view
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::UnicodeTypesetter;

    #[test]
    fn test_blank_content_shows_placeholder_without_request() {
        let mut preview = PreviewState::new();
        for content in ["", "   ", "\n\t\n"] {
            assert!(preview.begin(content).is_none());
            assert_eq!(preview.view(), &PreviewView::Placeholder);
            assert!(!preview.is_loading());
        }
    }

    #[test]
    fn test_response_applied() {
        let mut preview = PreviewState::new();
        let ticket = preview.begin("# Hi").unwrap();
        assert!(preview.is_loading());
        assert!(preview.complete(ticket, Ok("<h1>Hi</h1>".into())));
        assert!(matches!(preview.view(), PreviewView::Rendered(_)));
        assert!(!preview.is_loading());
    }

    #[test]
    fn test_stale_response_dropped() {
        let mut preview = PreviewState::new();
        let old = preview.begin("old").unwrap();
        let new = preview.begin("new").unwrap();
        assert!(preview.complete(new, Ok("<p>new</p>".into())));
        assert!(!preview.complete(old, Ok("<p>old</p>".into())));
        match preview.view() {
            PreviewView::Rendered(doc) => assert_eq!(doc, &PreviewDocument::from_html("<p>new</p>")),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn test_clearing_invalidates_pending_render() {
        let mut preview = PreviewState::new();
        let pending = preview.begin("text").unwrap();
        assert!(preview.begin("").is_none());
        assert!(!preview.complete(pending, Ok("<p>text</p>".into())));
        assert_eq!(preview.view(), &PreviewView::Placeholder);
    }

    #[test]
    fn test_failure_is_shown_in_place() {
        let mut preview = PreviewState::new();
        let ticket = preview.begin("x").unwrap();
        preview.complete(ticket, Err("server down".into()));
        assert_eq!(preview.view(), &PreviewView::Failed("server down".into()));
    }

    #[test]
    fn test_typeset_only_when_rendered() {
        let mut preview = PreviewState::new();
        assert!(preview.typeset(&UnicodeTypesetter::new()).is_none());
        let ticket = preview.begin("$x$").unwrap();
        preview.complete(ticket, Ok("<p>$x$</p>".into()));
        assert!(preview.needs_typeset());
        let report = preview.typeset(&UnicodeTypesetter::new()).unwrap();
        assert_eq!(report.rendered, 1);
        assert!(!preview.needs_typeset());
    }
}
