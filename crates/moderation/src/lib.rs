//! Deny-list content filter for user-submitted text.
//!
//! Text is matched, case-insensitively, against four fixed groups of patterns:
//! profanity, explicit terms, insults, and evasion spellings where the letters of a
//! word are separated by symbols (`c.a.z.z.o`). The first three groups only match
//! whole words; the evasion group matches anywhere.
//!
//! There is no scoring and no context: a single match rejects the text.
//!
//! # Example
//!
//! ```
//! use ricette_moderation::{Field, contains_inappropriate_content, validate_field};
//!
//! assert!(!contains_inappropriate_content("Impastare la semola con acqua tiepida."));
//! assert!(contains_inappropriate_content("che c.a.z.z.o di ricetta"));
//!
//! let err = validate_field(Field::Title, "Pane stronzo").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Il titolo contiene espressioni non consentite. Modifica il testo e riprova."
//! );
//! ```

use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

mod field;
pub use field::{Field, Rejection, validate_all, validate_field};

/// The pattern group a piece of text was rejected by.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Group {
    /// Explicit profanity.
    Profanity,
    /// Sexually explicit terms.
    Explicit,
    /// Insults.
    Insult,
    /// Blocked words spelled with symbols between the letters.
    Evasion,
}

impl Group {
    /// Stable lowercase name, used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profanity => "profanity",
            Self::Explicit => "explicit",
            Self::Insult => "insult",
            Self::Evasion => "evasion",
        }
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text matched one of the blocked pattern groups.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
#[error("text matched the {group} pattern group")]
pub struct Violation {
    /// The group that matched first.
    pub group: Group,
}

const PROFANITY: &str = concat!(
    r"(?i)\b(",
    r"cazz[aoi]*|cazzat[aie]*|",
    r"stronz[aoi]*|",
    r"merd[aoi]*|",
    r"vaffan\s*c\W*l[o]*|",
    r"fancul[oai]*|affancul[oai]*|",
    r"puttan[aie]*|",
    r"troi[aie]*|",
    r"bastard[aoi]*|",
    r"coglion[aie]*|",
    r"minchi[aie]*|",
    r"testa\s*di\s*cazz[oai]*",
    r")\b",
);

const EXPLICIT: &str = concat!(
    r"(?i)\b(",
    r"figa|fica|",
    r"cul[oai]*|",
    r"pen[eis]*|",
    r"sbor+r[aie]*|",
    r"scop[aoi]*|",
    r"incul[aoi]*|",
    r"seg[ahe]*",
    r")\b",
);

const INSULT: &str = concat!(
    r"(?i)\b(",
    r"idiot[aie]*|",
    r"deficient[eis]*|",
    r"cretin[aoi]*|",
    r"imbecill[eis]*|",
    r"fallit[oai]*|",
    r"ritardat[oai]*",
    r")\b",
);

const EVASION: &str = concat!(
    r"(?i)(",
    r"c[\W_]*a[\W_]*z[\W_]*z[\W_]*o|",
    r"s[\W_]*t[\W_]*r[\W_]*o[\W_]*n[\W_]*z[\W_]*o|",
    r"v[\W_]*a[\W_]*f[\W_]*f[\W_]*a[\W_]*n[\W_]*c[\W_]*u[\W_]*l[\W_]*o",
    r")",
);

static PATTERNS: LazyLock<[(Group, Regex); 4]> = LazyLock::new(|| {
    [
        (Group::Profanity, Regex::new(PROFANITY).expect("invalid profanity regex")),
        (Group::Explicit, Regex::new(EXPLICIT).expect("invalid explicit regex")),
        (Group::Insult, Regex::new(INSULT).expect("invalid insult regex")),
        (Group::Evasion, Regex::new(EVASION).expect("invalid evasion regex")),
    ]
});

/// Returns the first pattern group matching `text`, if any.
///
/// Empty and whitespace-only text never matches.
#[must_use]
pub fn find_violation(text: &str) -> Option<Group> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(group, _)| *group)
}

/// Returns `true` if the text contains any blocked expression.
#[inline]
#[must_use]
pub fn contains_inappropriate_content(text: &str) -> bool {
    find_violation(text).is_some()
}

/// Checks the text, returning the matching group as an error.
#[inline]
pub fn check(text: &str) -> Result<(), Violation> {
    match find_violation(text) {
        Some(group) => Err(Violation { group }),
        None => Ok(()),
    }
}
