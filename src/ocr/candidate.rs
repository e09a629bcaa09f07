//! Candidate images for formula recognition
//!
//! An image can come from the file picker, a drag-and-drop or the clipboard.
//! Whatever the source, it is validated the same way before it is accepted:
//! the MIME type must be `image/*`, the payload must be within the size
//! limit and it must decode.

use crate::error::{ImageError, ImageResult};
use image::{ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Name shown for images that did not come from a file
pub const PASTED_IMAGE_NAME: &str = "Pasted image";

/// A validated image waiting to be recognized
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateImage {
    name: Option<String>,
    mime: String,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl CandidateImage {
    /// Validate raw bytes with their declared MIME type
    pub fn validate(
        name: Option<String>,
        mime: &str,
        bytes: Vec<u8>,
        max_bytes: u64,
    ) -> ImageResult<Self> {
        check_mime(mime)?;
        check_size(bytes.len() as u64, max_bytes)?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let (width, height) = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(Self {
            name,
            mime: mime.to_string(),
            bytes,
            width,
            height,
        })
    }

    /// Read and validate an image file. The type is guessed from the
    /// extension and the size checked before the file is read.
    pub async fn from_path(path: &Path, max_bytes: u64) -> ImageResult<Self> {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        check_mime(mime.essence_str())?;

        let read_err = |source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(read_err)?;
        check_size(metadata.len(), max_bytes)?;
        let bytes = tokio::fs::read(path).await.map_err(read_err)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Self::validate(name, mime.essence_str(), bytes, max_bytes)
    }

    /// Wrap raw RGBA pixels (clipboard images) as a PNG candidate
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>, max_bytes: u64) -> ImageResult<Self> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }
        let pixels = RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| ImageError::Decode("pixel buffer does not match dimensions".into()))?;
        let mut png = Vec::new();
        pixels
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Self::validate(None, "image/png", png, max_bytes)
    }

    /// Rasterize to PNG at the image's natural size
    pub fn to_png(&self) -> ImageResult<Vec<u8>> {
        let decoded =
            image::load_from_memory(&self.bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let mut png = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Ok(png)
    }

    /// Decoded RGBA pixels for on-screen display
    pub fn to_rgba(&self) -> ImageResult<(u32, u32, Vec<u8>)> {
        let decoded =
            image::load_from_memory(&self.bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        Ok((rgba.width(), rgba.height(), rgba.into_raw()))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(PASTED_IMAGE_NAME)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Size in kilobytes with two decimals
    pub fn size_kb(&self) -> String {
        format!("{:.2} KB", self.bytes.len() as f64 / 1024.0)
    }

    /// One-line summary for the recognition dialog
    pub fn info_line(&self) -> String {
        format!(
            "{} · {} · {} · {}×{}",
            self.display_name(),
            self.size_kb(),
            self.mime,
            self.width,
            self.height
        )
    }
}

impl std::fmt::Debug for CandidateImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateImage")
            .field("name", &self.display_name())
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn check_mime(mime: &str) -> ImageResult<()> {
    if mime.starts_with("image/") {
        Ok(())
    } else {
        Err(ImageError::NotAnImage {
            mime: mime.to_string(),
        })
    }
}

fn check_size(size: u64, max: u64) -> ImageResult<()> {
    if size > max {
        Err(ImageError::TooLarge { size, max })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_IMAGE_SIZE;
    use crate::state::{OcrPhase, OcrState};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_accepts_png() {
        let candidate =
            CandidateImage::validate(Some("eq.png".into()), "image/png", png(40, 12), MAX_IMAGE_SIZE)
                .unwrap();
        assert_eq!(candidate.dimensions(), (40, 12));
        assert_eq!(candidate.display_name(), "eq.png");
        assert!(candidate.info_line().contains("image/png"));
        assert!(candidate.info_line().contains("40×12"));
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let err = CandidateImage::validate(None, "text/plain", b"hello".to_vec(), MAX_IMAGE_SIZE)
            .unwrap_err();
        assert!(matches!(err, ImageError::NotAnImage { .. }));
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        assert!(check_size(MAX_IMAGE_SIZE, MAX_IMAGE_SIZE).is_ok());
        assert!(matches!(
            check_size(MAX_IMAGE_SIZE + 1, MAX_IMAGE_SIZE),
            Err(ImageError::TooLarge { .. })
        ));
    }

    /// A real PNG padded with trailing bytes to exactly `len`
    fn padded_png(len: u64) -> Vec<u8> {
        let mut bytes = png(8, 8);
        bytes.resize(len as usize, 0);
        bytes
    }

    #[test]
    fn test_image_of_exactly_the_limit_is_accepted() {
        let candidate =
            CandidateImage::validate(None, "image/png", padded_png(MAX_IMAGE_SIZE), MAX_IMAGE_SIZE)
                .unwrap();
        assert_eq!(candidate.dimensions(), (8, 8));

        let mut ocr = OcrState::new();
        let ticket = ocr.begin_image_load();
        assert!(ocr.accept_image(ticket, Ok::<_, ImageError>(candidate)).is_some_and(|r| r.is_ok()));
        assert_eq!(ocr.phase(), &OcrPhase::ImageLoaded);
    }

    #[test]
    fn test_image_one_byte_over_the_limit_is_rejected() {
        let result =
            CandidateImage::validate(None, "image/png", padded_png(MAX_IMAGE_SIZE + 1), MAX_IMAGE_SIZE);
        assert!(matches!(
            result,
            Err(ImageError::TooLarge { size, max }) if size == MAX_IMAGE_SIZE + 1 && max == MAX_IMAGE_SIZE
        ));

        let mut ocr = OcrState::new();
        let ticket = ocr.begin_image_load();
        let err = ocr.accept_image(ticket, result).unwrap().unwrap_err();
        assert!(err.user_message().contains("10 MB"));
        assert_eq!(ocr.phase(), &OcrPhase::AwaitingImage);
        assert!(ocr.image().is_none());
    }

    #[test]
    fn test_wrong_mime_rejected_even_with_image_bytes() {
        let result = CandidateImage::validate(Some("eq.png".into()), "text/plain", png(4, 4), MAX_IMAGE_SIZE);
        assert!(matches!(result, Err(ImageError::NotAnImage { .. })));

        let mut ocr = OcrState::new();
        let ticket = ocr.begin_image_load();
        assert!(ocr.accept_image(ticket, result).is_some_and(|r| r.is_err()));
        assert!(!ocr.can_recognize());
    }

    #[test]
    fn test_oversized_payload_rejected_before_decode() {
        let err = CandidateImage::validate(None, "image/png", vec![0u8; 2048], 1024).unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { size: 2048, max: 1024 }));
    }

    #[test]
    fn test_garbage_bytes_fail_decode() {
        let err = CandidateImage::validate(None, "image/png", vec![1, 2, 3, 4], MAX_IMAGE_SIZE)
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_rgba_becomes_png() {
        let rgba = vec![255u8; 3 * 2 * 4];
        let candidate = CandidateImage::from_rgba(3, 2, rgba, MAX_IMAGE_SIZE).unwrap();
        assert_eq!(candidate.mime(), "image/png");
        assert_eq!(candidate.display_name(), PASTED_IMAGE_NAME);
        let png = candidate.to_png().unwrap();
        let reread = image::load_from_memory(&png).unwrap();
        assert_eq!((reread.width(), reread.height()), (3, 2));
    }

    #[test]
    fn test_rgba_size_mismatch() {
        assert!(matches!(
            CandidateImage::from_rgba(3, 2, vec![0; 5], MAX_IMAGE_SIZE),
            Err(ImageError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_from_path_rejects_text_file_by_extension() {
        let err = CandidateImage::from_path(Path::new("/tmp/notes.txt"), MAX_IMAGE_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::NotAnImage { .. }));
    }

    #[tokio::test]
    async fn test_from_path_reads_png() {
        let path = std::env::temp_dir().join(format!("md2word-{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, png(8, 8)).await.unwrap();
        let candidate = CandidateImage::from_path(&path, MAX_IMAGE_SIZE).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(candidate.mime(), "image/png");
        assert_eq!(candidate.dimensions(), (8, 8));
        assert!(candidate.display_name().starts_with("md2word-"));
    }
}
