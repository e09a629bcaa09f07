//! Clipboard image access
//!
//! arboard's `Clipboard` is not `Send` on every platform, so a handle is
//! opened per read on a blocking thread.

use super::candidate::CandidateImage;
use crate::error::{AppError, AppResult, ClipboardError};
use arboard::Clipboard;

/// Read an image from the system clipboard
pub fn read_image(max_bytes: u64) -> AppResult<CandidateImage> {
    let mut clipboard =
        Clipboard::new().map_err(|e| ClipboardError::AccessDenied(e.to_string()))?;
    let data = clipboard.get_image().map_err(map_error)?;
    log::debug!("clipboard image {}x{}", data.width, data.height);
    let image = CandidateImage::from_rgba(
        data.width as u32,
        data.height as u32,
        data.bytes.into_owned(),
        max_bytes,
    )?;
    Ok(image)
}

/// Whether the clipboard currently offers an image
pub fn has_image() -> bool {
    Clipboard::new()
        .and_then(|mut clipboard| clipboard.get_image())
        .is_ok()
}

/// Blocking clipboard read moved off the UI thread
pub async fn read_image_async(max_bytes: u64) -> AppResult<CandidateImage> {
    tokio::task::spawn_blocking(move || read_image(max_bytes))
        .await
        .map_err(|e| AppError::Unexpected(e.to_string()))?
}

fn map_error(error: arboard::Error) -> ClipboardError {
    match error {
        arboard::Error::ContentNotAvailable => ClipboardError::NotImage,
        arboard::Error::ConversionFailure => ClipboardError::NotImage,
        other => ClipboardError::AccessDenied(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_content_maps_to_not_image() {
        assert!(matches!(
            map_error(arboard::Error::ContentNotAvailable),
            ClipboardError::NotImage
        ));
        assert!(matches!(
            map_error(arboard::Error::ClipboardOccupied),
            ClipboardError::AccessDenied(_)
        ));
    }
}
