use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::{Group, find_violation};

/// A user-facing text field, used to pick the message shown on rejection.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Field {
    /// Recipe title.
    Title,
    /// Recipe description.
    Description,
    /// Recipe ingredients, checked as a list.
    Ingredients,
    /// Recipe instructions, checked as a list.
    Instructions,
    /// Free-text description attached to a report.
    ReportDescription,
    /// Any other text.
    Content,
}

impl Field {
    /// Wire name of the field, as it appears in request bodies.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Ingredients => "ingredients",
            Self::Instructions => "instructions",
            Self::ReportDescription => "description",
            Self::Content => "content",
        }
    }

    /// Localized message returned to the client when the field is rejected.
    #[must_use]
    pub fn rejection_message(self) -> &'static str {
        match self {
            Self::Title => {
                "Il titolo contiene espressioni non consentite. Modifica il testo e riprova."
            }
            Self::Description => {
                "La descrizione contiene espressioni non consentite. Modifica il testo e riprova."
            }
            Self::Ingredients => "Uno o più ingredienti contengono espressioni non consentite.",
            Self::Instructions => "Una o più istruzioni contengono espressioni non consentite.",
            Self::ReportDescription => {
                "La descrizione della segnalazione contiene espressioni non consentite."
            }
            Self::Content => {
                "Il testo contiene espressioni non consentite. Modifica il contenuto e riprova."
            }
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field was rejected by the filter.
///
/// `Display` renders the localized message for the field.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
#[error("{}", field.rejection_message())]
pub struct Rejection {
    /// The rejected field.
    pub field: Field,
    /// The pattern group that matched.
    pub group: Group,
}

/// Checks a single field value.
pub fn validate_field(field: Field, text: &str) -> Result<(), Rejection> {
    match find_violation(text) {
        Some(group) => Err(Rejection { field, group }),
        None => Ok(()),
    }
}

/// Checks every entry of a list field, stopping at the first rejected entry.
pub fn validate_all<'a, I>(field: Field, texts: I) -> Result<(), Rejection>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .try_for_each(|text| validate_field(field, text))
}
