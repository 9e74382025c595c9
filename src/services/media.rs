//! Media storage for post images
//!
//! Uploads are checked against the extension allow-list, then decoded
//! with the `image` crate, then written below `<root>/posts/`.

use crate::config::MediaConfig;
use image::ImageFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory under the media root that post images are written to
pub const POSTS_DIR: &str = "posts";

const SUFFIX_LEN: usize = 7;

const MAX_NAME_ATTEMPTS: usize = 8;

/// Why an upload was refused. The messages are shown as form field errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("File extension “{ext}” is not allowed. Allowed extensions are: {allowed}.")]
    ExtensionNotAllowed { ext: String, allowed: String },

    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage,

    #[error("The submitted file is empty.")]
    Empty,

    #[error("Ensure this file is no larger than {max_bytes} bytes.")]
    TooLarge { max_bytes: u64 },

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

pub struct MediaStore {
    root: PathBuf,
    max_file_size: u64,
    allowed_extensions: Vec<String>,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            max_file_size: config.max_file_size,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Check an upload without touching the disk.
    pub fn validate_image(&self, filename: &str, data: &[u8]) -> Result<ImageFormat, ImageError> {
        let ext = extension(filename);
        if !self.allowed_extensions.iter().any(|e| *e == ext) {
            return Err(ImageError::ExtensionNotAllowed {
                ext,
                allowed: self.allowed_extensions.join(", "),
            });
        }
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() as u64 > self.max_file_size {
            return Err(ImageError::TooLarge {
                max_bytes: self.max_file_size,
            });
        }
        decode(data)
    }

    /// Validate and persist an upload. Returns its name relative to the
    /// media root, e.g. `posts/cat.gif`.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<String, ImageError> {
        if let Err(e) = self.validate_image(filename, data) {
            tracing::warn!(filename, "Rejected image upload: {}", e);
            return Err(e);
        }

        let dir = self.root.join(POSTS_DIR);
        fs::create_dir_all(&dir).await?;

        let base = sanitize_filename(filename);
        let mut candidate = base.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&candidate))
                .await
            {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;
                    let name = format!("{}/{}", POSTS_DIR, candidate);
                    tracing::info!(name = %name, size = data.len(), "Stored image");
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = with_random_suffix(&base);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ImageError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free name for {}", base),
        )))
    }
}

/// Detect the format from the content and decode the whole image, so a
/// valid header over a corrupt body is refused too.
fn decode(data: &[u8]) -> Result<ImageFormat, ImageError> {
    let format = image::guess_format(data).map_err(|_| ImageError::InvalidImage)?;
    match image::load_from_memory_with_format(data, format) {
        Ok(_) => Ok(format),
        Err(e) => {
            tracing::debug!(?format, "Image failed to decode: {}", e);
            Err(ImageError::InvalidImage)
        }
    }
}

/// Lower-cased extension of `filename`, empty when it has none.
fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Reduce a client-supplied name to a safe single path component.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = last
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() || !cleaned.contains(|c: char| c.is_ascii_alphanumeric()) {
        let ext: String = extension(filename)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        return if ext.is_empty() {
            "image".to_string()
        } else {
            format!("image.{}", ext)
        };
    }
    cleaned.to_string()
}

fn with_random_suffix(name: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string();
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}

#[cfg(test)]
pub(crate) mod samples {
    /// Smallest valid GIF: one transparent pixel.
    pub const GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
    ];
}

#[cfg(test)]
mod tests {
    use super::samples::GIF;
    use super::*;
    use proptest::prelude::*;

    fn store(root: &Path) -> MediaStore {
        MediaStore::new(&MediaConfig {
            root: root.to_path_buf(),
            ..MediaConfig::default()
        })
    }

    #[test]
    fn test_valid_gif_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let format = store(dir.path()).validate_image("small.gif", GIF).unwrap();
        assert_eq!(format, ImageFormat::Gif);
    }

    #[test]
    fn test_gif_header_with_garbage_body_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .validate_image("broken.gif", b"GIF89a this is not really an image at all")
            .unwrap_err();
        assert!(matches!(err, ImageError::InvalidImage));
        assert_eq!(
            err.to_string(),
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
        );
    }

    #[test]
    fn test_truncated_images_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.validate_image("cut.gif", &GIF[..20]),
            Err(ImageError::InvalidImage)
        ));
        assert!(matches!(
            store.validate_image("cut.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Err(ImageError::InvalidImage)
        ));
        assert!(matches!(
            store.validate_image("cut.jpg", &[0xFF, 0xD8, 0xFF, 0xE0]),
            Err(ImageError::InvalidImage)
        ));
    }

    #[test]
    fn test_txt_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .validate_image("notes.txt", b"plain text")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File extension “txt” is not allowed. Allowed extensions are: jpg, jpeg, png, gif, bmp, webp."
        );
    }

    #[test]
    fn test_disguised_text_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .validate_image("fake.gif", b"definitely not a gif")
            .unwrap_err();
        assert!(matches!(err, ImageError::InvalidImage));
    }

    #[test]
    fn test_empty_and_oversize_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut small = store(dir.path());
        assert!(matches!(small.validate_image("a.gif", b""), Err(ImageError::Empty)));

        small.max_file_size = 10;
        assert!(matches!(
            small.validate_image("a.gif", GIF),
            Err(ImageError::TooLarge { max_bytes: 10 })
        ));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(dir.path()).validate_image("SMALL.GIF", GIF).is_ok());
    }

    #[tokio::test]
    async fn test_save_gif_and_avoid_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let first = store.save("small.gif", GIF).await.unwrap();
        assert_eq!(first, "posts/small.gif");
        assert_eq!(std::fs::read(dir.path().join(&first)).unwrap(), GIF);

        let second = store.save("small.gif", GIF).await.unwrap();
        assert_ne!(second, first);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));
        assert!(dir.path().join(&second).exists());
    }

    #[tokio::test]
    async fn test_rejected_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert!(store.save("evil.txt", b"text").await.is_err());
        assert!(!dir.path().join(POSTS_DIR).exists());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("cat.gif"), "cat.gif");
        assert_eq!(sanitize_filename("../../etc/passwd.gif"), "passwd.gif");
        assert_eq!(sanitize_filename("C:\\Users\\me\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename(".hidden.jpg"), "hidden.jpg");
        assert_eq!(sanitize_filename("котик.gif"), "_____.gif");
        assert_eq!(sanitize_filename("..."), "image");
    }

    proptest! {
        #[test]
        fn sanitized_name_is_one_safe_component(name in ".{0,40}") {
            let clean = sanitize_filename(&name);
            prop_assert!(!clean.is_empty());
            prop_assert!(!clean.starts_with('.'));
            prop_assert!(!clean.contains('/'));
            prop_assert!(!clean.contains('\\'));
            prop_assert!(clean.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')));
        }
    }
}
