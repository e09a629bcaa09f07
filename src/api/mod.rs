//! Backend service access
//!
//! Thin async client over the render (`/api/preview`), upload, conversion,
//! download and formula recognition endpoints.

mod client;
mod payload;

pub use client::{ApiClient, FORMULA_UPLOAD_NAME};
pub use payload::{ConfidenceTier, ConvertedDocument, Recognition};
