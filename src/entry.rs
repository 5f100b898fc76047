//! The immutable provenance record and the builder used to assemble one.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// An `(entity, field)` pair naming one attribute on either side of a
/// transformation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub entity: String,
    pub field: String,
}

impl Field {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// `Entity.Field`, the form matched by [`LineageTracker::glob`](crate::LineageTracker::glob).
    pub fn path(&self) -> String {
        format!("{}.{}", self.entity, self.field)
    }
}

/// One record describing how a single target field's value was derived from a
/// single source field.
///
/// Entries are created through [`EntryBuilder`] and never change afterwards.
/// Deserializing goes through the same checks as [`EntryBuilder::build`].
/// Their identity is their position in the tracker's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEntry")]
pub struct LineageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_system: Option<String>,
    source_entity: String,
    source_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_validated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_description: Option<String>,
    transformation_rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_system: Option<String>,
    target_entity: String,
    target_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_validated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_reference_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    classification: Option<i64>,
}

/// Wire form of [`LineageEntry`], before validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    source_system: Option<String>,
    source_entity: String,
    source_field: String,
    #[serde(default)]
    source_validated: Option<bool>,
    #[serde(default)]
    source_description: Option<String>,
    transformation_rule: String,
    #[serde(default)]
    target_system: Option<String>,
    target_entity: String,
    target_field: String,
    #[serde(default)]
    target_validated: Option<bool>,
    #[serde(default)]
    target_description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    model_reference_url: Option<String>,
    #[serde(default)]
    classification: Option<i64>,
}

impl TryFrom<RawEntry> for LineageEntry {
    type Error = EntryError;

    fn try_from(raw: RawEntry) -> Result<Self, EntryError> {
        let entry = Self {
            source_system: raw.source_system,
            source_entity: raw.source_entity,
            source_field: raw.source_field,
            source_validated: raw.source_validated,
            source_description: raw.source_description,
            transformation_rule: raw.transformation_rule,
            target_system: raw.target_system,
            target_entity: raw.target_entity,
            target_field: raw.target_field,
            target_validated: raw.target_validated,
            target_description: raw.target_description,
            tags: raw.tags,
            model_reference_url: raw.model_reference_url,
            classification: raw.classification,
        };

        entry.validate()?;
        Ok(entry)
    }
}

impl LineageEntry {
    /// Starts a new entry from its mandatory attributes.
    pub fn builder(source: Field, rule: impl Into<String>, target: Field) -> EntryBuilder {
        EntryBuilder::new(source, rule, target)
    }

    pub fn source_system(&self) -> Option<&str> {
        self.source_system.as_deref()
    }

    pub fn source_entity(&self) -> &str {
        &self.source_entity
    }

    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn source_validated(&self) -> Option<bool> {
        self.source_validated
    }

    pub fn source_description(&self) -> Option<&str> {
        self.source_description.as_deref()
    }

    pub fn transformation_rule(&self) -> &str {
        &self.transformation_rule
    }

    pub fn target_system(&self) -> Option<&str> {
        self.target_system.as_deref()
    }

    pub fn target_entity(&self) -> &str {
        &self.target_entity
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    pub fn target_validated(&self) -> Option<bool> {
        self.target_validated
    }

    pub fn target_description(&self) -> Option<&str> {
        self.target_description.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn model_reference_url(&self) -> Option<&str> {
        self.model_reference_url.as_deref()
    }

    pub fn classification(&self) -> Option<i64> {
        self.classification
    }

    pub fn source(&self) -> Field {
        Field::new(&self.source_entity, &self.source_field)
    }

    pub fn target(&self) -> Field {
        Field::new(&self.target_entity, &self.target_field)
    }

    /// Checks the attributes every entry must carry.
    fn validate(&self) -> Result<(), EntryError> {
        let required = [
            ("sourceEntity", &self.source_entity),
            ("sourceField", &self.source_field),
            ("transformationRule", &self.transformation_rule),
            ("targetEntity", &self.target_entity),
            ("targetField", &self.target_field),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(EntryError(name));
            }
        }

        Ok(())
    }
}

impl Display for LineageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(system) = &self.source_system {
            write!(f, "{system}.")?;
        }
        write!(
            f,
            "{}.{} → ({}) → ",
            self.source_entity, self.source_field, self.transformation_rule
        )?;
        if let Some(system) = &self.target_system {
            write!(f, "{system}.")?;
        }
        write!(f, "{}.{}", self.target_entity, self.target_field)
    }
}

/// Builder for [`LineageEntry`].
///
/// Every optional attribute stays absent unless its setter is called.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    entry: LineageEntry,
}

impl EntryBuilder {
    fn new(source: Field, rule: impl Into<String>, target: Field) -> Self {
        Self {
            entry: LineageEntry {
                source_system: None,
                source_entity: source.entity,
                source_field: source.field,
                source_validated: None,
                source_description: None,
                transformation_rule: rule.into(),
                target_system: None,
                target_entity: target.entity,
                target_field: target.field,
                target_validated: None,
                target_description: None,
                tags: Vec::new(),
                model_reference_url: None,
                classification: None,
            },
        }
    }

    pub fn source_system(mut self, system: impl Into<String>) -> Self {
        self.entry.source_system = Some(system.into());
        self
    }

    pub fn source_validated(mut self, validated: bool) -> Self {
        self.entry.source_validated = Some(validated);
        self
    }

    pub fn source_description(mut self, description: impl Into<String>) -> Self {
        self.entry.source_description = Some(description.into());
        self
    }

    pub fn target_system(mut self, system: impl Into<String>) -> Self {
        self.entry.target_system = Some(system.into());
        self
    }

    pub fn target_validated(mut self, validated: bool) -> Self {
        self.entry.target_validated = Some(validated);
        self
    }

    pub fn target_description(mut self, description: impl Into<String>) -> Self {
        self.entry.target_description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.entry.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn model_reference_url(mut self, url: impl Into<String>) -> Self {
        self.entry.model_reference_url = Some(url.into());
        self
    }

    pub fn classification(mut self, classification: i64) -> Self {
        self.entry.classification = Some(classification);
        self
    }

    /// Finalizes the entry, rejecting empty mandatory attributes.
    pub fn build(self) -> Result<LineageEntry, EntryError> {
        self.entry.validate()?;
        Ok(self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryBuilder {
        LineageEntry::builder(
            Field::new("PocoX", "Id"),
            "Concatenation with PocoY.Code",
            Field::new("PocoA", "Bk"),
        )
    }

    #[test]
    fn test_optional_fields_absent_by_default() {
        let entry = sample().build().unwrap();

        assert_eq!(entry.source_system(), None);
        assert_eq!(entry.source_validated(), None);
        assert_eq!(entry.target_description(), None);
        assert!(entry.tags().is_empty());
        assert_eq!(entry.classification(), None);
    }

    #[test]
    fn test_empty_required_field_rejected() {
        let err = LineageEntry::builder(Field::new("PocoX", ""), "rule", Field::new("PocoA", "Bk"))
            .build()
            .unwrap_err();
        assert_eq!(err, EntryError("sourceField"));

        let err = LineageEntry::builder(Field::new("PocoX", "Id"), " ", Field::new("PocoA", "Bk"))
            .build()
            .unwrap_err();
        assert_eq!(err, EntryError("transformationRule"));
    }

    #[test]
    fn test_display() {
        let entry = sample()
            .source_system("Progress")
            .target_system("FCDM")
            .build()
            .unwrap();

        assert_eq!(
            entry.to_string(),
            "Progress.PocoX.Id → (Concatenation with PocoY.Code) → FCDM.PocoA.Bk"
        );

        let bare = sample().build().unwrap();
        assert_eq!(
            bare.to_string(),
            "PocoX.Id → (Concatenation with PocoY.Code) → PocoA.Bk"
        );
    }

    #[test]
    fn test_json_shape() {
        let entry = sample()
            .source_validated(true)
            .tags(["pii", "key"])
            .classification(3)
            .build()
            .unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sourceEntity"], "PocoX");
        assert_eq!(json["sourceValidated"], true);
        assert_eq!(json["tags"], serde_json::json!(["pii", "key"]));
        assert_eq!(json["classification"], 3);
        assert!(json.get("sourceSystem").is_none());
        assert!(json.get("modelReferenceUrl").is_none());
    }

    #[test]
    fn test_null_optionals_deserialize_as_absent() {
        let json = r#"{
            "sourceSystem": null,
            "sourceEntity": "PocoY",
            "sourceField": "PocoYDate",
            "transformationRule": "Direct mapping",
            "targetEntity": "PocoA",
            "targetField": "Date",
            "classification": null
        }"#;

        let entry: LineageEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.source_system(), None);
        assert_eq!(entry.classification(), None);
        assert_eq!(entry.target(), Field::new("PocoA", "Date"));
    }

    #[test]
    fn test_deserialize_rejects_empty_required_field() {
        let json = r#"{
            "sourceEntity": "",
            "sourceField": "Id",
            "transformationRule": "",
            "targetEntity": "PocoA",
            "targetField": "Bk"
        }"#;

        let err = serde_json::from_str::<LineageEntry>(json).unwrap_err();
        assert!(err.to_string().contains("sourceEntity"));

        let missing = r#"{"sourceEntity": "PocoX", "sourceField": "Id"}"#;
        assert!(serde_json::from_str::<LineageEntry>(missing).is_err());
    }
}
