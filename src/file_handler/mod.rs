//! File handler module for Cosmic Md2Word
//!
//! Handles local file system operations:
//! - Reading dropped or picked Markdown documents
//! - Saving converted Word documents to the download directory

pub mod io;

pub use io::*;
