//! Persisted records: people, family trees and family events.
//!
//! These are the shapes stored in the document store. Field names serialize
//! in camelCase to stay compatible with existing documents, and the
//! relationship label keeps its Vietnamese wire form ("Con trai của", ...).
//!
//! Nothing in this module validates the relationship graph. Links may dangle,
//! point at their own record, or form cycles; [`crate::forest`] tolerates all
//! of that.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GiaphaError, Result};

// ── Gender ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Display label used in the generation table ("Nam" / "Nữ").
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Nam",
            Gender::Female => "Nữ",
        }
    }
}

// ── RelationshipType ────────────────────────────────────────────────────────

/// How a person relates to the member named by `relatedMemberId`.
///
/// Unknown labels are kept verbatim in [`RelationshipType::Unrecognized`] and
/// classify as neither child nor spouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipType {
    SonOf,
    DaughterOf,
    WifeOf,
    HusbandOf,
    Other,
    Unrecognized(String),
}

impl RelationshipType {
    /// Parse a relationship label. Accepts the Vietnamese labels and their
    /// English equivalents (case-insensitive). Returns `None` for a blank label.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return None;
        }
        let kind = match trimmed.to_lowercase().as_str() {
            "con trai của" | "son of" => RelationshipType::SonOf,
            "con gái của" | "daughter of" => RelationshipType::DaughterOf,
            "vợ của" | "wife of" => RelationshipType::WifeOf,
            "chồng của" | "husband of" => RelationshipType::HusbandOf,
            "khác" | "other" => RelationshipType::Other,
            _ => RelationshipType::Unrecognized(trimmed.to_string()),
        };
        Some(kind)
    }

    /// The label written to persisted documents.
    pub fn label(&self) -> &str {
        match self {
            RelationshipType::SonOf => "Con trai của",
            RelationshipType::DaughterOf => "Con gái của",
            RelationshipType::WifeOf => "Vợ của",
            RelationshipType::HusbandOf => "Chồng của",
            RelationshipType::Other => "Khác",
            RelationshipType::Unrecognized(label) => label,
        }
    }

    pub fn is_child(&self) -> bool {
        matches!(self, RelationshipType::SonOf | RelationshipType::DaughterOf)
    }

    pub fn is_spouse(&self) -> bool {
        matches!(self, RelationshipType::WifeOf | RelationshipType::HusbandOf)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RelationshipType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// `""`, whitespace and `null` all mean "no relationship".
fn de_relationship<'de, D>(deserializer: D) -> std::result::Result<Option<RelationshipType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(RelationshipType::from_label))
}

/// Blank strings are stored by older documents where a value was cleared.
fn de_blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// Generation numbers arrive either as JSON numbers or as numeric strings
/// (form inputs are saved unconverted).
fn de_generation<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u32),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("invalid generation '{s}'"))),
    }
}

fn default_generation() -> u32 {
    1
}

// ── Person ──────────────────────────────────────────────────────────────────

/// One member of a family tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    /// Generation ("Đời"). Edited by hand, so it may disagree with the links.
    #[serde(default = "default_generation", deserialize_with = "de_generation")]
    pub generation: u32,
    pub full_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, deserialize_with = "de_blank_as_none", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    /// Absent for living members.
    #[serde(default, deserialize_with = "de_blank_as_none", skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grave_location: Option<String>,
    /// Free-text description such as "Con trai của Cao Văn Nam".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<String>,
    #[serde(default, deserialize_with = "de_relationship", skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    #[serde(default, deserialize_with = "de_blank_as_none", skip_serializing_if = "Option::is_none")]
    pub related_member_id: Option<String>,
}

impl Person {
    /// A generation-1 male member with no relationship.
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            generation: 1,
            full_name: full_name.into(),
            gender: Gender::Male,
            birth_date: None,
            death_date: None,
            biography: None,
            image_url: None,
            grave_location: None,
            relationships: None,
            relationship_type: None,
            related_member_id: None,
        }
    }

    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    /// Link this person to `related_id` with the given relationship.
    pub fn related(mut self, kind: RelationshipType, related_id: impl Into<String>) -> Self {
        self.relationship_type = Some(kind);
        self.related_member_id = Some(related_id.into());
        self
    }

    pub fn with_dates(mut self, birth: Option<&str>, death: Option<&str>) -> Self {
        self.birth_date = birth.map(str::to_string);
        self.death_date = death.map(str::to_string);
        self
    }

    /// Declared as someone's son or daughter.
    pub fn is_child(&self) -> bool {
        self.relationship_type
            .as_ref()
            .is_some_and(RelationshipType::is_child)
    }

    /// Declared as someone's wife or husband.
    pub fn is_spouse(&self) -> bool {
        self.relationship_type
            .as_ref()
            .is_some_and(RelationshipType::is_spouse)
    }

    pub fn is_alive(&self) -> bool {
        self.death_date.is_none()
    }
}

// ── FamilyTree ──────────────────────────────────────────────────────────────

/// A named family tree: an ordered list of members plus cover decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTree {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_text: Option<String>,
}

impl FamilyTree {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: Vec::new(),
            cover_image: None,
            cover_text: None,
        }
    }

    pub fn member(&self, id: &str) -> Option<&Person> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Replace the member with the same id in place, or append a new one.
    ///
    /// When the member has a child/spouse link but no free-text
    /// `relationships`, the description is filled in from the related
    /// member's name.
    pub fn upsert_member(&mut self, mut person: Person) {
        if person.relationships.is_none() {
            person.relationships = crate::roster::describe_relationship(&person, &self.members);
        }
        match self.members.iter_mut().find(|m| m.id == person.id) {
            Some(existing) => *existing = person,
            None => self.members.push(person),
        }
    }

    /// Remove a member. Links from other members are left dangling.
    pub fn remove_member(&mut self, id: &str) -> Result<Person> {
        let pos = self
            .members
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| GiaphaError::MemberNotFound(id.to_string()))?;
        Ok(self.members.remove(pos))
    }

    pub fn set_cover_text(&mut self, text: impl Into<String>) {
        self.cover_text = Some(text.into());
    }

    /// Cover images are stored inline as data URLs.
    pub fn set_cover_image(&mut self, data_url: impl Into<String>) {
        self.cover_image = Some(data_url.into());
    }
}

/// A fresh identifier for a new member or event.
pub fn new_member_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── FamilyEvent ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    Once,
    #[default]
    Yearly,
}

/// A remembrance day, anniversary or other dated family occasion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyEvent {
    pub id: String,
    pub tree_id: String,
    pub name: String,
    /// ISO date (YYYY-MM-DD).
    #[serde(default, deserialize_with = "de_blank_as_none", skip_serializing_if = "Option::is_none")]
    pub solar_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunar_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunar_month: Option<u32>,
    #[serde(default)]
    pub notify_enabled: bool,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl FamilyEvent {
    /// A yearly, notify-enabled event without dates.
    pub fn new(
        id: impl Into<String>,
        tree_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tree_id: tree_id.into(),
            name: name.into(),
            solar_date: None,
            lunar_day: None,
            lunar_month: None,
            notify_enabled: true,
            repeat: Repeat::Yearly,
            note: None,
            created_at: None,
        }
    }

    pub fn with_solar_date(mut self, date: NaiveDate) -> Self {
        self.solar_date = Some(date.format("%Y-%m-%d").to_string());
        self
    }

    pub fn with_lunar(mut self, day: u32, month: u32) -> Self {
        self.lunar_day = Some(day);
        self.lunar_month = Some(month);
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_notify(mut self, enabled: bool) -> Self {
        self.notify_enabled = enabled;
        self
    }

    /// The solar date, if present and parseable.
    pub fn solar(&self) -> Option<NaiveDate> {
        self.solar_date
            .as_deref()
            .and_then(|s| parse_iso_date(s).ok())
    }
}

// ── Dates ───────────────────────────────────────────────────────────────────

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`). A trailing time part
/// (`2024-02-10T00:00:00Z`) is ignored.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| GiaphaError::InvalidDate(format!("'{}': {}", s, e)))
}

// ── Tests ───────────────────────────────────────────────────────────────────
