//! URL slugs derived from titles.

/// Slug used when a title has no usable characters.
pub const FALLBACK_SLUG: &str = "recipe";

/// Maximum slug length in characters, suffix included.
pub const MAX_SLUG_LEN: usize = 255;

fn fold(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ß' => "ss",
        _ => return None,
    })
}

/// Turns a title into a slug.
///
/// Accented Latin letters are folded to ASCII, everything is lower-cased, and each
/// run of other characters becomes a single `-`. Leading and trailing dashes are
/// dropped. Returns [`FALLBACK_SLUG`] when nothing is left.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    let mut buf = [0; 4];
    for c in title.chars() {
        let part = if c.is_ascii_alphanumeric() {
            &*c.to_ascii_lowercase().encode_utf8(&mut buf)
        } else if let Some(folded) = fold(c) {
            folded
        } else {
            pending_dash = true;
            continue;
        };
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push_str(part);
    }
    truncate(&mut slug, MAX_SLUG_LEN);
    if slug.is_empty() {
        FALLBACK_SLUG.to_owned()
    } else {
        slug
    }
}

/// Returns `base` suffixed with `-n`, shortening `base` so the result fits [`MAX_SLUG_LEN`].
#[must_use]
pub fn with_suffix(base: &str, n: u32) -> String {
    let suffix = format!("-{n}");
    let mut slug = base.to_owned();
    truncate(&mut slug, MAX_SLUG_LEN - suffix.len());
    slug.push_str(&suffix);
    slug
}

// Slugs are ASCII, so byte length equals character count.
fn truncate(slug: &mut String, max: usize) {
    if slug.len() > max {
        slug.truncate(max);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
}
