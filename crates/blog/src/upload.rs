//! Rules for uploaded images.

use uuid::Uuid;

use crate::{Error, Result};

/// Default maximum image size, 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Leading bytes of a file needed to recognise its image format.
pub const IMAGE_HEADER_LEN: usize = 32;

const MIB: f64 = 1024.0 * 1024.0;
const NOT_AN_IMAGE: &str =
    "Carica un'immagine valida. Il file caricato non è un'immagine o è un'immagine danneggiata.";

/// Rejects images larger than `max` bytes with a message quoting both sizes in MB.
#[allow(clippy::cast_precision_loss)]
pub fn check_image_size(size: u64, max: u64) -> Result<()> {
    if size <= max {
        return Ok(());
    }
    let max_mb = max as f64 / MIB;
    let max_mb = if max_mb.fract() == 0.0 {
        format!("{max_mb:.0}")
    } else {
        format!("{max_mb:.2}")
    };
    Err(Error::validation(
        "image",
        format!(
            "L'immagine è troppo grande. La dimensione massima consentita è {max_mb}MB. \
             Dimensione attuale: {:.2}MB",
            size as f64 / MIB
        ),
    ))
}

/// File extension for an accepted image content type.
///
/// Only JPEG, PNG, GIF and WebP are accepted.
pub fn image_extension(content_type: &str) -> Result<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok("jpg"),
        "image/png" | "image/apng" => Ok("png"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        _ => Err(Error::validation("image", NOT_AN_IMAGE)),
    }
}

/// Extension of the image format recognised from the leading bytes of a file.
///
/// The declared content type of an upload is not trusted: a file whose contents are
/// not JPEG, PNG, GIF or WebP is rejected whatever it claims to be.
pub fn detect_image(head: &[u8]) -> Result<&'static str> {
    let kind = infer::get(head).ok_or_else(|| Error::validation("image", NOT_AN_IMAGE))?;
    image_extension(kind.mime_type())
}

/// A fresh media-relative path for an image in `dir`, e.g. `recipes/<uuid>.jpg`.
#[must_use]
pub fn image_path(dir: &str, extension: &str) -> String {
    format!("{dir}/{}.{extension}", Uuid::new_v4().simple())
}
