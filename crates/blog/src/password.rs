//! Password hashing and strength rules.

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::{Error, Result};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "passw0rd", "abc12345", "11111111", "00000000",
    "admin123", "letmein1", "trustno1", "superman", "starwars", "dragon12",
    "monkey12", "computer", "internet", "whatever", "benvenuto", "ciaociao",
    "juventus", "napoli123", "forzainter", "forzamilan", "amoremio", "cagliari",
    "sardegna", "ricette123",
];

/// Hashes `password` with Argon2id and a random salt, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks `password` against a PHC string. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// Rejects weak passwords with a localized message on the `password` field.
///
/// `attributes` are user attributes (email, name) the password must not resemble: a
/// similarity ratio of 0.7 or more to an attribute, or to one of its words, is rejected.
pub fn validate_strength(password: &str, attributes: &[&str]) -> Result<()> {
    let reject = |message: &'static str| -> Result<()> {
        Err(Error::validation("password", message))
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        return reject("Questa password è troppo corta. Deve contenere almeno 8 caratteri.");
    }
    let lowered = password.to_lowercase();
    if is_similar(&lowered, attributes) {
        return reject("La password è troppo simile alle informazioni personali.");
    }
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return reject("Questa password è troppo comune.");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return reject("Questa password è interamente numerica.");
    }
    Ok(())
}

/// Similarity ratio from which a password counts as too close to a user attribute.
const MAX_SIMILARITY: f64 = 0.7;

/// Compares the password with each attribute and each of its word parts.
fn is_similar(password: &str, attributes: &[&str]) -> bool {
    let password: Vec<char> = password.chars().collect();
    attributes
        .iter()
        .map(|attr| attr.trim().to_lowercase())
        .filter(|attr| !attr.is_empty())
        .flat_map(|attr| {
            let parts: Vec<String> = attr
                .split(|c: char| !c.is_alphanumeric())
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect();
            parts.into_iter().chain([attr])
        })
        .any(|value| {
            let value: Vec<char> = value.chars().collect();
            similarity(&password, &value) >= MAX_SIMILARITY
        })
}

/// Ratcliff/Obershelp ratio: twice the matched characters over the total length.
#[allow(clippy::cast_precision_loss)]
fn similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * matching_chars(a, b)) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_common_run(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

/// Start in `a`, start in `b` and length of the longest run both contain.
fn longest_common_run(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                current[j + 1] = previous[j] + 1;
                if current[j + 1] > best.2 {
                    best = (i + 1 - current[j + 1], j + 1 - current[j + 1], current[j + 1]);
                }
            }
        }
        previous = current;
    }
    best
}
