//! In-memory model of an index schema: type sections with their field
//! mappings and dynamic templates, plus the analysis settings.
//!
//! The same types describe both the declared schema and the live one read
//! back from the cluster. Anything the reconciler does not compare is kept
//! verbatim in `extra` maps so declared bodies can be sent unchanged.

pub mod field;
pub mod live;
pub mod template;

pub use field::{flatten, normalize_index, FieldAttrs, FieldDescriptor, IndexFlag};
pub use template::{DynamicTemplate, MatchMappingType, MatchPattern, NamedTemplate, TEXTUAL_TYPES};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name used for the single section of a typeless mapping.
pub const DEFAULT_TYPE: &str = "_doc";

/// One named group of field mappings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSection {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, FieldDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_templates: Vec<NamedTemplate>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TypeSection {
    pub fn template(&self, name: &str) -> Option<&NamedTemplate> {
        self.dynamic_templates.iter().find(|t| t.name == name)
    }
}

fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// A named analysis chain. Filter order is significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerDescriptor {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub analyzer_type: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub char_filter: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub filter: Vec<String>,

    /// Parameters of built-in analyzers (`stopwords`, `max_token_length`, ...).
    /// Sent with the analyzer but not compared against the live one.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalyzerDescriptor {
    pub fn custom(char_filter: &[&str], tokenizer: &str, filter: &[&str]) -> Self {
        Self {
            analyzer_type: Some("custom".to_string()),
            char_filter: char_filter.iter().map(|s| s.to_string()).collect(),
            tokenizer: Some(tokenizer.to_string()),
            filter: filter.iter().map(|s| s.to_string()).collect(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub analyzer: IndexMap<String, AnalyzerDescriptor>,

    /// Tokenizer, filter and char_filter definitions.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.analyzer.is_empty() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Analysis::is_empty")]
    pub analysis: Analysis,

    /// Shard counts and every other index setting; used at creation only.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn analyzers(&self) -> &IndexMap<String, AnalyzerDescriptor> {
        &self.analysis.analyzer
    }

    pub fn is_empty(&self) -> bool {
        self.analysis.is_empty() && self.extra.is_empty()
    }
}

/// A complete index schema: settings plus mappings by type section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,

    #[serde(default)]
    pub mappings: IndexMap<String, TypeSection>,
}

impl IndexSchema {
    pub fn section(&self, type_name: &str) -> Option<&TypeSection> {
        self.mappings.get(type_name)
    }

    pub fn section_mut(&mut self, type_name: &str) -> Option<&mut TypeSection> {
        self.mappings.get_mut(type_name)
    }

    /// Declare a field, replacing any previous declaration of the same name.
    /// The section is created if needed.
    pub fn add_field(&mut self, type_name: &str, field: &str, descriptor: FieldDescriptor) {
        self.mappings
            .entry(type_name.to_string())
            .or_default()
            .properties
            .insert(field.to_string(), descriptor);
    }

    pub fn add_analyzer(&mut self, name: &str, analyzer: AnalyzerDescriptor) {
        self.settings
            .analysis
            .analyzer
            .insert(name.to_string(), analyzer);
    }

    /// Body for creating the index from this schema.
    pub fn to_body(&self) -> crate::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
