use super::field::FieldDescriptor;
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Field types the cluster treats as one `string` family across versions.
pub const TEXTUAL_TYPES: [&str; 3] = ["string", "keyword", "text"];

/// The `match_mapping_type` predicate of a dynamic template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMappingType {
    /// `"*"` (or `"any"`): every detected type.
    Any,
    /// `"string"`: any member of [`TEXTUAL_TYPES`].
    Textual,
    Exact(String),
}

impl MatchMappingType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "*" | "any" => MatchMappingType::Any,
            "string" => MatchMappingType::Textual,
            other => MatchMappingType::Exact(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MatchMappingType::Any => "*",
            MatchMappingType::Textual => "string",
            MatchMappingType::Exact(t) => t.as_str(),
        }
    }

    /// Whether a live field of `field_type` satisfies this rule.
    pub fn accepts(&self, field_type: &str) -> bool {
        match self {
            MatchMappingType::Any => true,
            MatchMappingType::Textual => TEXTUAL_TYPES.contains(&field_type),
            MatchMappingType::Exact(t) => t == field_type,
        }
    }
}

impl Serialize for MatchMappingType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MatchMappingType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MatchMappingType::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPattern {
    Simple,
    Regex,
}

/// Body of one dynamic template rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicTemplate {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_pattern: Option<MatchPattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmatch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_match: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_unmatch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_mapping_type: Option<MatchMappingType>,

    #[serde(default)]
    pub mapping: FieldDescriptor,
}

impl DynamicTemplate {
    pub fn match_is_regex(&self) -> bool {
        self.match_pattern == Some(MatchPattern::Regex)
    }
}

/// A dynamic template together with its name.
///
/// On the wire each entry of `dynamic_templates` is a single-key object
/// `{"<name>": {...rule...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTemplate {
    pub name: String,
    pub template: DynamicTemplate,
}

impl NamedTemplate {
    pub fn new(name: &str, template: DynamicTemplate) -> Self {
        Self {
            name: name.to_string(),
            template,
        }
    }
}

impl Serialize for NamedTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.template)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for NamedTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = IndexMap::<String, DynamicTemplate>::deserialize(deserializer)?;
        if entries.len() != 1 {
            return Err(de::Error::custom(format!(
                "dynamic template entry must have exactly one name, found {}",
                entries.len()
            )));
        }
        let (name, template) = entries
            .into_iter()
            .next()
            .ok_or_else(|| de::Error::custom("empty dynamic template entry"))?;
        Ok(NamedTemplate { name, template })
    }
}
