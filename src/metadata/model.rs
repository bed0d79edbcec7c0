//! Artefact data model shared by the stores and the lifecycle manager

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::binary::PayloadRef;

/// Prefix stamped onto location ids the resolver could not match.
pub const UNRESOLVED_LOCATION_PREFIX: &str = "NoMatch";

/// Timestamp layout used when dates are persisted as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Surrogate artefact id, assigned by the metadata store on first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtefactId(pub i64);

impl fmt::Display for ArtefactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtefactId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ArtefactId)
            .map_err(|_| format!("Invalid artefact id: {}", s))
    }
}

/// Canonical location stamped onto an artefact.
///
/// Unresolved locations keep the raw provenance id so they stay searchable;
/// they are persisted as `NoMatch<provenance id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocationId {
    Resolved(String),
    Unresolved { provenance_id: String },
}

impl LocationId {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LocationId::Resolved(_))
    }

    /// Text form written to the metadata store.
    pub fn as_stored(&self) -> String {
        match self {
            LocationId::Resolved(id) => id.clone(),
            LocationId::Unresolved { provenance_id } => {
                format!("{}{}", UNRESOLVED_LOCATION_PREFIX, provenance_id)
            }
        }
    }
}

impl From<String> for LocationId {
    fn from(stored: String) -> Self {
        match stored.strip_prefix(UNRESOLVED_LOCATION_PREFIX) {
            Some(provenance_id) => LocationId::Unresolved {
                provenance_id: provenance_id.to_string(),
            },
            None => LocationId::Resolved(stored),
        }
    }
}

impl From<&str> for LocationId {
    fn from(stored: &str) -> Self {
        LocationId::from(stored.to_string())
    }
}

impl From<LocationId> for String {
    fn from(location: LocationId) -> Self {
        location.as_stored()
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_stored())
    }
}

/// Visibility tier, ordered from least to most restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    Public,
    Private,
    Classified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtefactType {
    List,
    GeneralPublication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    English,
    Welsh,
    Bilingual,
}

/// Court list types accepted for publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListType {
    CivilDailyCauseList,
    FamilyDailyCauseList,
    CivilAndFamilyDailyCauseList,
    CopDailyCauseList,
    CrownDailyList,
    CrownFirmList,
    CrownWarnedList,
    MagistratesPublicList,
    MagistratesStandardList,
    SjpPublicList,
    SjpPressList,
    IacDailyList,
    CareStandardsList,
    EtDailyList,
    SscsDailyList,
}

impl ListType {
    /// SJP press lists are rendered to a spreadsheet as well as a PDF.
    pub fn has_spreadsheet(&self) -> bool {
        matches!(self, ListType::SjpPressList)
    }
}

/// Renders a unit enum variant through its serde name.
fn enum_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

/// Parses a unit enum variant from its serde name, ignoring case.
fn parse_enum_name<T: DeserializeOwned>(kind: &str, s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_ascii_uppercase()))
        .map_err(|_| format!("Unknown {}: {}", kind, s))
}

macro_rules! serde_named_enum {
    ($ty:ty, $kind:expr) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&enum_name(self))
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_enum_name($kind, s)
            }
        }
    };
}

serde_named_enum!(Sensitivity, "sensitivity");
serde_named_enum!(ArtefactType, "artefact type");
serde_named_enum!(Language, "language");
serde_named_enum!(ListType, "list type");

/// Search field name mapped to the values matched in the payload.
pub type SearchIndex = BTreeMap<String, Vec<String>>;

/// Logical identity an incoming submission is matched against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub location_id: LocationId,
    pub content_date: NaiveDateTime,
    pub language: Language,
    pub list_type: ListType,
    pub provenance: String,
}

/// Incoming artefact metadata before location stamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtefactSubmission {
    pub source_artefact_id: Option<String>,
    pub provenance: String,
    /// Location id as known to the provenance, resolved on submission.
    pub provenance_location_id: String,
    pub content_date: NaiveDateTime,
    pub language: Language,
    pub list_type: ListType,
    pub artefact_type: ArtefactType,
    pub sensitivity: Sensitivity,
    pub display_from: NaiveDateTime,
    pub display_to: Option<NaiveDateTime>,
    pub is_flat_file: bool,
}

impl ArtefactSubmission {
    /// Checks the display window and applies the general publication default.
    pub fn normalise(mut self) -> Result<Self, String> {
        if self.provenance.trim().is_empty() {
            return Err("provenance must not be empty".to_string());
        }
        if self.provenance_location_id.trim().is_empty() {
            return Err("location id must not be empty".to_string());
        }
        if let Some(display_to) = self.display_to {
            if display_to < self.display_from {
                return Err(format!(
                    "display to ({}) is before display from ({})",
                    display_to, self.display_from
                ));
            }
        } else if self.artefact_type == ArtefactType::GeneralPublication {
            self.display_to = Some(self.display_from);
        }
        Ok(self)
    }
}

/// One persisted artefact row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artefact {
    /// `None` until the metadata store has persisted the row.
    pub id: Option<ArtefactId>,
    pub source_artefact_id: Option<String>,
    pub provenance: String,
    pub location_id: LocationId,
    pub content_date: NaiveDateTime,
    pub language: Language,
    pub list_type: ListType,
    pub artefact_type: ArtefactType,
    pub sensitivity: Sensitivity,
    pub display_from: NaiveDateTime,
    pub display_to: Option<NaiveDateTime>,
    pub last_received: NaiveDateTime,
    pub payload: PayloadRef,
    pub payload_size: u64,
    pub search: SearchIndex,
    pub superseded_count: u32,
    pub is_flat_file: bool,
    pub archived: bool,
}

impl Artefact {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            location_id: self.location_id.clone(),
            content_date: self.content_date,
            language: self.language,
            list_type: self.list_type,
            provenance: self.provenance.clone(),
        }
    }

    /// Rendered PDF/Excel files exist only for structured lists at a resolved location.
    pub fn has_derived_files(&self) -> bool {
        self.artefact_type == ArtefactType::List && !self.is_flat_file && self.location_id.is_resolved()
    }

    /// Whether `now` falls inside the display window. A missing `display_to` is open-ended.
    pub fn is_displayable_at(&self, now: NaiveDateTime) -> bool {
        self.display_from <= now && self.display_to.map_or(true, |to| now <= to)
    }
}
