//! Formula image acquisition: files, drops and the clipboard

mod candidate;
pub mod clipboard;

pub use candidate::{CandidateImage, PASTED_IMAGE_NAME};
