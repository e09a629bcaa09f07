//! Preview rendering: HTML to blocks, code highlighting and math typesetting

mod document;
mod highlight;
mod markup;
mod math;

pub use document::{Inline, MathId, MathRegion, PreviewBlock, PreviewDocument, TypesetReport};
pub use highlight::{CodeHighlighter, HighlightSpan, HighlightedLine};
pub use math::{MathEngine, MathEngineStatus, MathTypesetter, UnicodeTypesetter};
