#![cfg(feature = "web")]
#![cfg(not(tarpaulin_include))]

use crate::error::{Result, SweeperError};
use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;
use uuid::Uuid;

lazy_static! {
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|\x00-\x1f]+"#).unwrap();
}

/// Public URL prefix under which stored images are served
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Strip path components and characters that are unsafe in file names
///
/// # Examples
/// ```
/// use sweeper::uploads::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_file_name("C:\\data\\q1?.csv"), "q1_.csv");
/// assert_eq!(sanitize_file_name(""), "upload");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_NAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Store an uploaded post image and return its public reference
///
/// The bytes must be a PNG, JPEG, GIF or WebP image; the stored file gets a
/// random name with the extension of the detected format.
///
/// # Errors
/// * `Image` when the bytes are not a supported image
/// * `Io` when the file cannot be written
pub fn save_image(uploads_dir: &Path, bytes: &[u8]) -> Result<String> {
    let format = image::guess_format(bytes)
        .map_err(|_| SweeperError::Image("file is not a recognised image".to_string()))?;

    let extension = match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        other => {
            return Err(SweeperError::Image(format!(
                "unsupported image format {:?}",
                other
            )));
        }
    };

    fs::create_dir_all(uploads_dir)?;
    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    fs::write(uploads_dir.join(&file_name), bytes)?;

    Ok(format!("{}/{}", UPLOADS_ROUTE, file_name))
}
