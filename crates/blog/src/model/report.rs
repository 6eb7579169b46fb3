use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::{AuthorColumns, UserProfile};

/// Why a recipe was reported.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    /// Inappropriate content.
    #[default]
    InappropriateContent,
    /// Spam.
    Spam,
    /// Copyright violation.
    Copyright,
    /// Anything else.
    Other,
}

impl ReportReason {
    /// Storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InappropriateContent => "inappropriate_content",
            Self::Spam => "spam",
            Self::Copyright => "copyright",
            Self::Other => "other",
        }
    }

    /// Localized label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InappropriateContent => "Contenuto Inappropriato",
            Self::Spam => "Spam",
            Self::Copyright => "Violazione Copyright",
            Self::Other => "Altro",
        }
    }
}

impl TryFrom<String> for ReportReason {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "inappropriate_content" => Ok(Self::InappropriateContent),
            "spam" => Ok(Self::Spam),
            "copyright" => Ok(Self::Copyright),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown report reason {value:?}")),
        }
    }
}

/// Body of a report request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewReport {
    /// Reason, `inappropriate_content` when omitted.
    pub reason: ReportReason,
    /// Optional free text.
    pub description: String,
}

#[derive(Clone, Debug, FromRow)]
pub(crate) struct ReportRow {
    pub(crate) id: i64,
    pub(crate) recipe_id: i64,
    pub(crate) recipe_title: String,
    #[sqlx(try_from = "String")]
    pub(crate) reason: ReportReason,
    pub(crate) description: String,
    pub(crate) created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub(crate) reporter: AuthorColumns,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            user: row.reporter.into(),
            recipe: row.recipe_id,
            recipe_title: row.recipe_title,
            reason: row.reason,
            reason_label: row.reason.label(),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// A stored report.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Primary key.
    pub id: i64,
    /// Reporter.
    pub user: UserProfile,
    /// Reported recipe id.
    pub recipe: i64,
    /// Reported recipe title.
    pub recipe_title: String,
    /// Reason.
    pub reason: ReportReason,
    /// Localized reason.
    pub reason_label: &'static str,
    /// Free text, possibly empty.
    pub description: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_defaults_to_inappropriate_content() {
        let report: NewReport = serde_json::from_str("{}").unwrap();
        assert_eq!(report.reason, ReportReason::InappropriateContent);
        assert!(report.description.is_empty());

        let report: NewReport = serde_json::from_str(r#"{"reason":"spam"}"#).unwrap();
        assert_eq!(report.reason, ReportReason::Spam);
        assert!(serde_json::from_str::<NewReport>(r#"{"reason":"boring"}"#).is_err());
    }

    #[test]
    fn test_reason_storage_names_round_trip() {
        for reason in [
            ReportReason::InappropriateContent,
            ReportReason::Spam,
            ReportReason::Copyright,
            ReportReason::Other,
        ] {
            assert_eq!(ReportReason::try_from(reason.as_str().to_owned()), Ok(reason));
        }
    }
}
