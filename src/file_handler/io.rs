//! File I/O for local documents and converted downloads
//!
//! Provides:
//! - Markdown reading with UTF-8 / UTF-16 encoding detection
//! - Raw reads for document upload
//! - Atomic, collision-free saving of downloaded Word files

use crate::error::{FileError, FileResult};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Maximum document size allowed (10 MB)
pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024;

/// Extensions accepted as Markdown documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Fallback name when the server sends an unusable filename
pub const FALLBACK_DOWNLOAD_NAME: &str = "document.docx";

/// Detected encoding of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileEncoding {
    /// UTF-8 without BOM
    #[default]
    Utf8,
    /// UTF-8 with BOM
    Utf8Bom,
    /// UTF-16 Little Endian with BOM
    Utf16Le,
    /// UTF-16 Big Endian with BOM
    Utf16Be,
    /// Unknown/binary (lossy UTF-8 conversion used)
    Unknown,
}

/// Whether the path names a Markdown or plain text document
pub fn is_document_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_ascii_lowercase();
            DOCUMENT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Detect file encoding from raw bytes
fn detect_encoding(bytes: &[u8]) -> FileEncoding {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => FileEncoding::Utf8Bom,
        [0xFF, 0xFE, ..] => FileEncoding::Utf16Le,
        [0xFE, 0xFF, ..] => FileEncoding::Utf16Be,
        _ if std::str::from_utf8(bytes).is_ok() => FileEncoding::Utf8,
        _ => FileEncoding::Unknown,
    }
}

/// Decode bytes to a string; the flag reports lossy conversion
fn decode_content(bytes: &[u8], encoding: FileEncoding) -> (String, bool) {
    match encoding {
        FileEncoding::Utf8 => decode_utf8(bytes),
        FileEncoding::Utf8Bom => decode_utf8(&bytes[3..]),
        FileEncoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes),
        FileEncoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes),
        FileEncoding::Unknown => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

fn decode_utf8(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> (String, bool) {
    let mut lossy = false;
    let units = bytes.chunks_exact(2).map(|chunk| unit([chunk[0], chunk[1]]));
    let result = char::decode_utf16(units)
        .map(|r| {
            r.unwrap_or_else(|_| {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            })
        })
        .collect();
    (result, lossy)
}

async fn read_limited(path: &Path) -> FileResult<Vec<u8>> {
    let path_buf = path.to_path_buf();
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(path_buf.clone())
        } else {
            FileError::ReadError {
                path: path_buf.clone(),
                source: e,
            }
        }
    })?;

    let size = metadata.len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(FileError::TooLarge {
            path: path_buf,
            size,
            max_size: MAX_DOCUMENT_SIZE,
        });
    }

    tokio::fs::read(path).await.map_err(|e| FileError::ReadError {
        path: path_buf,
        source: e,
    })
}

/// Read a local Markdown document with encoding detection
pub async fn read_document(path: impl AsRef<Path>) -> FileResult<String> {
    let path = path.as_ref();
    if !is_document_path(path) {
        return Err(FileError::Unsupported {
            path: path.to_path_buf(),
        });
    }

    let bytes = read_limited(path).await?;
    let encoding = detect_encoding(&bytes);
    let (content, lossy) = decode_content(&bytes, encoding);
    if lossy {
        log::warn!("{} decoded lossily as {:?}", path.display(), encoding);
    }
    log::debug!("read {} ({} bytes, {:?})", path.display(), bytes.len(), encoding);
    Ok(content)
}

/// Read a document's name and raw bytes for the upload endpoint
pub async fn read_for_upload(path: impl AsRef<Path>) -> FileResult<(String, Vec<u8>)> {
    let path = path.as_ref();
    if !is_document_path(path) {
        return Err(FileError::Unsupported {
            path: path.to_path_buf(),
        });
    }
    let bytes = read_limited(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.md".to_string());
    Ok((name, bytes))
}

/// Reduce a server-supplied filename to a bare file name
pub fn sanitize_file_name(name: &str) -> String {
    let candidate = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        FALLBACK_DOWNLOAD_NAME.to_string()
    } else {
        candidate.to_string()
    }
}

/// First free path for `name` in `dir`: `name`, then `stem (1).ext`, ...
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Write bytes to a file using atomic write
///
/// The file is either fully written or absent; the content goes to a
/// hidden temp file in the same directory first and is then renamed.
pub async fn write_file_atomic(path: impl AsRef<Path>, content: &[u8]) -> FileResult<()> {
    let path = path.as_ref();
    let path_buf = path.to_path_buf();

    let parent = path.parent().unwrap_or(Path::new("."));
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    let temp_path = parent.join(format!(".{}.{}.tmp", filename, timestamp));

    let write_result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        file.sync_all().await?;
        Ok::<(), std::io::Error>(())
    }
    .await;

    if let Err(e) = write_result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(FileError::WriteError {
            path: path_buf,
            source: e,
        });
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(FileError::WriteError {
            path: path_buf,
            source: e,
        });
    }

    Ok(())
}

/// Save a downloaded document into `dir`, never overwriting an existing file
pub async fn save_download(dir: &Path, server_name: &str, bytes: &[u8]) -> FileResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| FileError::WriteError {
            path: dir.to_path_buf(),
            source: e,
        })?;
    let target = unique_path(dir, &sanitize_file_name(server_name));
    write_file_atomic(&target, bytes).await?;
    log::info!("saved {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("md2word-io-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_document_extensions() {
        assert!(is_document_path(Path::new("notes.md")));
        assert!(is_document_path(Path::new("/a/b/README.MARKDOWN")));
        assert!(is_document_path(Path::new("plain.txt")));
        assert!(!is_document_path(Path::new("formula.png")));
        assert!(!is_document_path(Path::new("Makefile")));
    }

    #[test]
    fn test_detect_encoding() {
        assert_eq!(detect_encoding(b"# Title"), FileEncoding::Utf8);
        assert_eq!(detect_encoding(&[0xEF, 0xBB, 0xBF, b'a']), FileEncoding::Utf8Bom);
        assert_eq!(detect_encoding(&[0xFF, 0xFE, b'a', 0]), FileEncoding::Utf16Le);
        assert_eq!(detect_encoding(&[0xFE, 0xFF, 0, b'a']), FileEncoding::Utf16Be);
        assert_eq!(detect_encoding(&[0xC3, 0x28]), FileEncoding::Unknown);
    }

    #[test]
    fn test_decode_utf16() {
        let bytes = [0xFF, 0xFE, b'#', 0, b' ', 0, b'x', 0];
        let (text, lossy) = decode_content(&bytes, detect_encoding(&bytes));
        assert_eq!(text, "# x");
        assert!(!lossy);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.docx"), "report.docx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\tmp\\a.docx"), "a.docx");
        assert_eq!(sanitize_file_name(""), FALLBACK_DOWNLOAD_NAME);
        assert_eq!(sanitize_file_name("dir/"), FALLBACK_DOWNLOAD_NAME);
        assert_eq!(sanitize_file_name(".."), FALLBACK_DOWNLOAD_NAME);
    }

    #[test]
    fn test_unique_path_skips_existing() {
        let dir = scratch_dir();
        assert_eq!(unique_path(&dir, "doc.docx"), dir.join("doc.docx"));
        std::fs::write(dir.join("doc.docx"), b"x").unwrap();
        std::fs::write(dir.join("doc (1).docx"), b"x").unwrap();
        assert_eq!(unique_path(&dir, "doc.docx"), dir.join("doc (2).docx"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_read_document() {
        let dir = scratch_dir();
        let path = dir.join("note.md");
        tokio::fs::write(&path, "\u{FEFF}# Hello\n$x^2$").await.unwrap();
        assert_eq!(read_document(&path).await.unwrap(), "# Hello\n$x^2$");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_read_document_rejects_other_types() {
        let err = read_document("/tmp/picture.png").await.unwrap_err();
        assert!(matches!(err, FileError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_read_document_missing() {
        let path = std::env::temp_dir().join(format!("{}.md", uuid::Uuid::new_v4()));
        let err = read_document(&path).await.unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_for_upload_keeps_name() {
        let dir = scratch_dir();
        let path = dir.join("chapter.markdown");
        tokio::fs::write(&path, b"text").await.unwrap();
        let (name, bytes) = read_for_upload(&path).await.unwrap();
        assert_eq!(name, "chapter.markdown");
        assert_eq!(bytes, b"text");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_save_download_never_overwrites() {
        let dir = scratch_dir().join("downloads");
        let first = save_download(&dir, "out.docx", b"one").await.unwrap();
        let second = save_download(&dir, "../out.docx", b"two").await.unwrap();
        assert_eq!(first, dir.join("out.docx"));
        assert_eq!(second, dir.join("out (1).docx"));
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"one");
        assert_eq!(tokio::fs::read(&second).await.unwrap(), b"two");
        std::fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }
}
