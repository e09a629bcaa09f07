//! Document buffer and change propagation
//!
//! The buffer is the single source of truth for the Markdown text. Changes
//! are debounced by generation: every edit hands out a new
//! [`DebounceTicket`] and only the most recent ticket is allowed to settle.

use crate::error::{EditorError, EditorResult};
use chrono::{DateTime, Local};

/// Token identifying one scheduled debounce timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket(u64);

/// Character and line counters shown in the status bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub char_count: usize,
    pub line_count: usize,
}

impl DocumentStats {
    /// Count characters and `\n`-separated lines. An empty text has one line.
    pub fn of(text: &str) -> Self {
        Self {
            char_count: text.chars().count(),
            line_count: text.split('\n').count(),
        }
    }
}

impl Default for DocumentStats {
    fn default() -> Self {
        Self::of("")
    }
}

impl std::fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Characters: {} | Lines: {}", self.char_count, self.line_count)
    }
}

/// Editor state for the single open document
#[derive(Debug)]
pub struct EditorState {
    /// Document content as a rope
    buffer: ropey::Rope,

    /// Caret as a character offset into the buffer
    caret: usize,

    /// Latest handed-out debounce generation
    generation: u64,

    /// Counters as of the last settled update
    stats: DocumentStats,

    /// Wall-clock time of the last settled update
    last_updated: Option<DateTime<Local>>,
}

impl EditorState {
    pub fn new() -> Self {
        Self {
            buffer: ropey::Rope::new(),
            caret: 0,
            generation: 0,
            stats: DocumentStats::default(),
            last_updated: None,
        }
    }

    pub fn with_text(text: &str) -> Self {
        let mut state = Self::new();
        state.buffer = ropey::Rope::from_str(text);
        state.refresh_stats();
        state
    }

    /// Record a change coming from the editor widget and schedule an update
    pub fn on_change(&mut self, text: &str) -> DebounceTicket {
        self.buffer = ropey::Rope::from_str(text);
        self.caret = self.caret.min(self.buffer.len_chars());
        self.next_ticket()
    }

    /// Whether a ticket is still the latest one
    pub fn is_current(&self, ticket: DebounceTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Replace the whole buffer (file load, clear). Any pending debounce is
    /// superseded; callers refresh the preview directly.
    pub fn replace(&mut self, text: &str) {
        self.buffer = ropey::Rope::from_str(text);
        self.caret = 0;
        self.next_ticket();
    }

    /// Splice `$$latex$$` at the caret, returning the caret after the formula
    pub fn insert_formula(&mut self, latex: &str) -> EditorResult<usize> {
        if latex.trim().is_empty() {
            return Err(EditorError::NothingToInsert);
        }
        let snippet = formula_snippet(latex);
        self.buffer.insert(self.caret, &snippet);
        self.caret += snippet.chars().count();
        self.next_ticket();
        Ok(self.caret)
    }

    /// Move the caret, clamped to the buffer
    pub fn set_caret(&mut self, char_index: usize) {
        self.caret = char_index.min(self.buffer.len_chars());
    }

    /// Move the caret to a widget cursor, given as a line index and a byte
    /// offset within that line. Offsets past the line end or inside a
    /// multi-byte character land on the nearest valid position.
    pub fn set_caret_from_cursor(&mut self, line: usize, byte_column: usize) {
        let Some(slice) = self.buffer.get_line(line) else {
            self.set_caret(self.buffer.len_chars());
            return;
        };
        let mut chars = slice.len_chars();
        while chars > 0 && matches!(slice.char(chars - 1), '\n' | '\r') {
            chars -= 1;
        }
        let max_byte = slice.char_to_byte(chars);
        let column = slice
            .try_byte_to_char(byte_column.min(max_byte))
            .unwrap_or(chars);
        self.set_caret(self.buffer.line_to_char(line) + column);
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// True for an empty or whitespace-only buffer
    pub fn is_blank(&self) -> bool {
        self.buffer.chars().all(char::is_whitespace)
    }

    pub fn refresh_stats(&mut self) {
        self.stats = DocumentStats::of(&self.text());
    }

    pub fn stats(&self) -> DocumentStats {
        self.stats
    }

    /// Stamp the "last updated" time
    pub fn touch(&mut self, now: DateTime<Local>) {
        self.last_updated = Some(now);
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    /// "Last updated" text for the status bar
    pub fn last_updated_display(&self) -> String {
        match self.last_updated {
            Some(time) => format!("Last updated: {}", time.format("%H:%M:%S")),
            None => String::new(),
        }
    }

    fn next_ticket(&mut self) -> DebounceTicket {
        self.generation += 1;
        DebounceTicket(self.generation)
    }
}

/// Text inserted for a recognized formula
pub fn formula_snippet(latex: &str) -> String {
    format!("$${}$$", latex)
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_has_one_line() {
        let stats = DocumentStats::of("");
        assert_eq!(stats.char_count, 0);
        assert_eq!(stats.line_count, 1);
    }

    #[test]
    fn test_trailing_newline_counts_as_line() {
        let stats = DocumentStats::of("a\nb\n");
        assert_eq!(stats.line_count, 3);
        assert_eq!(stats.char_count, 4);
    }

    #[test]
    fn test_stats_count_chars_not_bytes() {
        assert_eq!(DocumentStats::of("公式 α").char_count, 4);
    }

    #[test]
    fn test_only_last_of_many_edits_settles() {
        let mut editor = EditorState::new();
        let tickets: Vec<_> = (0..25)
            .map(|i| editor.on_change(&"x".repeat(i + 1)))
            .collect();
        let settled: Vec<_> = tickets.iter().filter(|t| editor.is_current(**t)).collect();
        assert_eq!(settled.len(), 1);
        assert_eq!(*settled[0], *tickets.last().unwrap());
    }

    #[test]
    fn test_replace_supersedes_pending_edit() {
        let mut editor = EditorState::new();
        let ticket = editor.on_change("draft");
        editor.replace("loaded");
        assert!(!editor.is_current(ticket));
        assert_eq!(editor.text(), "loaded");
        assert_eq!(editor.caret(), 0);
    }

    #[test]
    fn test_insert_formula_at_caret() {
        let mut editor = EditorState::with_text("a = b");
        editor.set_caret(4);
        let caret = editor.insert_formula("\\frac{1}{2}").unwrap();
        assert_eq!(editor.text(), "a = $$\\frac{1}{2}$$b");
        assert_eq!(caret, 4 + "$$\\frac{1}{2}$$".len());
    }

    #[test]
    fn test_insert_formula_respects_multibyte_caret() {
        let mut editor = EditorState::with_text("公式：结束");
        editor.set_caret(3);
        editor.insert_formula("x^2").unwrap();
        assert_eq!(editor.text(), "公式：$$x^2$$结束");
    }

    #[test]
    fn test_cursor_byte_column_maps_to_char_caret() {
        let mut editor = EditorState::with_text("公式：结束");
        // after the second ideograph: two chars, six bytes
        editor.set_caret_from_cursor(0, 6);
        assert_eq!(editor.caret(), 2);
        editor.insert_formula("x").unwrap();
        assert_eq!(editor.text(), "公式$$x$$：结束");
    }

    #[test]
    fn test_cursor_on_later_line_and_past_end() {
        let mut editor = EditorState::with_text("αβ\nγδ\n");
        editor.set_caret_from_cursor(1, 2);
        assert_eq!(editor.caret(), 4);
        editor.set_caret_from_cursor(0, 99);
        assert_eq!(editor.caret(), 2);
        editor.set_caret_from_cursor(7, 0);
        assert_eq!(editor.caret(), 6);
    }

    #[test]
    fn test_consecutive_insertions_follow_each_other() {
        let mut editor = EditorState::with_text("a b");
        editor.set_caret_from_cursor(0, 2);
        editor.insert_formula("x").unwrap();
        editor.insert_formula("y").unwrap();
        assert_eq!(editor.text(), "a $$x$$$$y$$b");
        assert_eq!(editor.caret(), 2 + 2 * formula_snippet("x").chars().count());
    }

    #[test]
    fn test_insert_formula_at_every_position() {
        let text = "ab\ncd";
        for p in 0..=text.chars().count() {
            let mut editor = EditorState::with_text(text);
            editor.set_caret(p);
            editor.insert_formula("L").unwrap();
            let expected = format!("{}$$L$${}", &text[..p], &text[p..]);
            assert_eq!(editor.text(), expected);
        }
    }

    #[test]
    fn test_insert_empty_formula_rejected() {
        let mut editor = EditorState::with_text("abc");
        assert!(matches!(
            editor.insert_formula("  "),
            Err(EditorError::NothingToInsert)
        ));
        assert_eq!(editor.text(), "abc");
    }

    #[test]
    fn test_caret_is_clamped() {
        let mut editor = EditorState::with_text("abc");
        editor.set_caret(99);
        assert_eq!(editor.caret(), 3);
    }

    #[test]
    fn test_blank_detection() {
        assert!(EditorState::with_text(" \n\t ").is_blank());
        assert!(!EditorState::with_text(" x ").is_blank());
    }
}
