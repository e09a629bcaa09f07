//! Error types for Cosmic Md2Word
//!
//! Errors are grouped by where they surface: local validation, the backend
//! services, the clipboard, configuration and math typesetting. None of them
//! is fatal to the session; each maps to a transient alert via `user_message`.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// Backend request errors
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Image acquisition and validation errors
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Clipboard errors
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    /// Local file errors
    #[error(transparent)]
    File(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Editor operation errors
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Generic unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Errors talking to the render / convert / OCR services
#[derive(Error, Debug)]
pub enum ApiError {
    /// The configured base URL cannot be joined with an endpoint path
    #[error("Invalid server URL: {0}")]
    InvalidBaseUrl(String),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The service reported `success: false`
    #[error("{message}")]
    Service {
        message: String,
        suggestions: Vec<String>,
    },
}

/// Image acquisition errors
#[derive(Error, Debug)]
pub enum ImageError {
    /// MIME type does not start with `image/`
    #[error("Not an image: {mime}")]
    NotAnImage { mime: String },

    /// Image exceeds the configured maximum size
    #[error("Image too large ({size} bytes, max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// No image data was supplied
    #[error("No image selected")]
    Empty,

    /// Could not read the image file
    #[error("Could not read image: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be decoded as an image
    #[error("Could not decode image: {0}")]
    Decode(String),

    /// The image could not be re-encoded as PNG
    #[error("Could not encode image: {0}")]
    Encode(String),
}

/// Local document and download file errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Not a Markdown or plain text document
    #[error("Unsupported file type: {path}")]
    Unsupported { path: PathBuf },

    /// File is too large to load
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    TooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing file
    #[error("Could not write file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Clipboard related errors
#[derive(Error, Debug, Clone)]
pub enum ClipboardError {
    /// Could not access clipboard
    #[error("Could not access clipboard: {0}")]
    AccessDenied(String),

    /// Clipboard is empty
    #[error("Clipboard is empty")]
    Empty,

    /// Clipboard content is not an image
    #[error("Clipboard does not contain an image")]
    NotImage,
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading configuration
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Editor operation errors
#[derive(Error, Debug)]
pub enum EditorError {
    /// Nothing to insert
    #[error("No recognized formula to insert")]
    NothingToInsert,
}

/// Typesetting failure for a single formula region
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// The LaTeX parser rejected the formula
    #[error("Invalid formula: {0}")]
    Parse(String),

    /// The parsed formula could not be laid out
    #[error("Could not lay out formula: {0}")]
    Render(String),

    /// Empty formula body
    #[error("Empty formula")]
    Empty,
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for backend requests
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for image operations
pub type ImageResult<T> = Result<T, ImageError>;

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

impl ImageError {
    /// Create a user-friendly error message suitable for an alert
    pub fn user_message(&self) -> String {
        match self {
            ImageError::NotAnImage { .. } => {
                "Please choose an image file (PNG, JPG, JPEG, ...).".to_string()
            }
            ImageError::TooLarge { max, .. } => format!(
                "The image is too large. Please choose an image under {} MB.",
                max / (1024 * 1024)
            ),
            ImageError::Empty => "No file selected.".to_string(),
            ImageError::Read { .. } | ImageError::Decode(_) => {
                "Could not read the image file.".to_string()
            }
            ImageError::Encode(e) => format!("Could not prepare the image: {}", e),
        }
    }
}

impl FileError {
    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        let name = |path: &PathBuf| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        };
        match self {
            FileError::NotFound(path) => format!("File not found: {}", name(path)),
            FileError::Unsupported { path } => format!(
                "{} is not a Markdown file. Drop a .md, .markdown or .txt file.",
                name(path)
            ),
            FileError::TooLarge { path, max_size, .. } => format!(
                "{} is too large (maximum {} MB).",
                name(path),
                max_size / (1024 * 1024)
            ),
            FileError::ReadError { path, source } => {
                format!("Could not read {}: {}", name(path), source)
            }
            FileError::WriteError { path, source } => {
                format!("Could not save {}: {}", name(path), source)
            }
        }
    }
}

impl ClipboardError {
    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ClipboardError::AccessDenied(_) => {
                "Could not access the clipboard. Another application may be using it.".to_string()
            }
            ClipboardError::Empty => "The clipboard is empty.".to_string(),
            ClipboardError::NotImage => "The clipboard does not contain an image.".to_string(),
        }
    }
}

impl AppError {
    /// Message shown in the alert area
    pub fn user_message(&self) -> String {
        match self {
            AppError::Image(e) => e.user_message(),
            AppError::Clipboard(e) => e.user_message(),
            AppError::File(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_error_display() {
        let err = ImageError::TooLarge {
            size: 11,
            max: 10,
        };
        assert!(err.to_string().contains("11 bytes"));
    }

    #[test]
    fn test_too_large_user_message_in_megabytes() {
        let err = ImageError::TooLarge {
            size: 10 * 1024 * 1024 + 1,
            max: 10 * 1024 * 1024,
        };
        assert!(err.user_message().contains("10 MB"));
    }

    #[test]
    fn test_service_error_displays_service_message() {
        let err = ApiError::Service {
            message: "no formula found".to_string(),
            suggestions: vec!["crop the image".to_string()],
        };
        assert_eq!(err.to_string(), "no formula found");
    }

    #[test]
    fn test_app_error_from_image_error() {
        let app_err: AppError = ImageError::Empty.into();
        assert!(matches!(app_err, AppError::Image(_)));
        assert_eq!(app_err.user_message(), "No file selected.");
    }
}
