use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `index` mapping parameter.
///
/// Current clusters answer with a boolean. Legacy clusters used a three-state
/// string (`"no"`, `"not_analyzed"`, `"analyzed"`); both shapes are accepted
/// and collapsed to one boolean by [`IndexFlag::is_indexed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexFlag {
    Bool(bool),
    Legacy(String),
}

impl IndexFlag {
    pub fn is_indexed(&self, field_type: Option<&str>) -> bool {
        match self {
            IndexFlag::Bool(b) => *b,
            // legacy `string` fields only count as indexed when analyzed
            IndexFlag::Legacy(v) if field_type == Some("string") => v == "analyzed",
            IndexFlag::Legacy(v) => v != "no",
        }
    }
}

/// Normalized index flag; an absent flag means the cluster default (indexed).
pub fn normalize_index(flag: Option<&IndexFlag>, field_type: Option<&str>) -> bool {
    flag.map_or(true, |f| f.is_indexed(field_type))
}

/// Attributes shared by every kind of field.
///
/// Mapping parameters the reconciler does not compare (`format`, `dynamic`,
/// `doc_values`, ...) are kept in `extra` so a declared field can be sent to
/// the cluster exactly as it was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttrs {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexFlag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_in_all: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldAttrs {
    pub fn typed(field_type: &str) -> Self {
        Self {
            field_type: Some(field_type.to_string()),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    pub fn is_indexed(&self) -> bool {
        normalize_index(self.index.as_ref(), self.field_type.as_deref())
    }

    pub fn includes_in_all(&self) -> bool {
        self.include_in_all.unwrap_or(false)
    }
}

/// One field of a mapping, declared or live.
///
/// A field is either a plain leaf, an object with nested `properties`, or a
/// multi-field with parallel representations under `fields`. A field carrying
/// both `properties` and `fields` is rejected when parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub enum FieldDescriptor {
    Simple(FieldAttrs),
    Container {
        attrs: FieldAttrs,
        properties: IndexMap<String, FieldDescriptor>,
    },
    MultiField {
        attrs: FieldAttrs,
        fields: IndexMap<String, FieldDescriptor>,
    },
}

impl Default for FieldDescriptor {
    fn default() -> Self {
        FieldDescriptor::Simple(FieldAttrs::default())
    }
}

impl FieldDescriptor {
    /// Leaf field of the given type.
    pub fn typed(field_type: &str) -> Self {
        FieldDescriptor::Simple(FieldAttrs::typed(field_type))
    }

    /// Opaque `{"enabled": false}` field.
    pub fn disabled() -> Self {
        FieldDescriptor::Simple(FieldAttrs {
            enabled: Some(false),
            ..FieldAttrs::default()
        })
    }

    pub fn object(properties: IndexMap<String, FieldDescriptor>) -> Self {
        FieldDescriptor::Container {
            attrs: FieldAttrs::default(),
            properties,
        }
    }

    pub fn multi(attrs: FieldAttrs, fields: IndexMap<String, FieldDescriptor>) -> Self {
        FieldDescriptor::MultiField { attrs, fields }
    }

    pub fn with_analyzer(mut self, analyzer: &str) -> Self {
        self.attrs_mut().analyzer = Some(analyzer.to_string());
        self
    }

    pub fn attrs(&self) -> &FieldAttrs {
        match self {
            FieldDescriptor::Simple(attrs)
            | FieldDescriptor::Container { attrs, .. }
            | FieldDescriptor::MultiField { attrs, .. } => attrs,
        }
    }

    pub fn attrs_mut(&mut self) -> &mut FieldAttrs {
        match self {
            FieldDescriptor::Simple(attrs)
            | FieldDescriptor::Container { attrs, .. }
            | FieldDescriptor::MultiField { attrs, .. } => attrs,
        }
    }

    pub fn field_type(&self) -> Option<&str> {
        self.attrs().field_type.as_deref()
    }

    /// Type used for comparison. An explicit `"object"` is what the cluster
    /// means by leaving the type out, whether or not children are known yet.
    pub fn effective_type(&self) -> Option<&str> {
        match self.field_type() {
            Some("object") | None => None,
            other => other,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.attrs().is_enabled()
    }

    pub fn properties(&self) -> Option<&IndexMap<String, FieldDescriptor>> {
        match self {
            FieldDescriptor::Container { properties, .. } => Some(properties),
            _ => None,
        }
    }

    pub fn multi_fields(&self) -> Option<&IndexMap<String, FieldDescriptor>> {
        match self {
            FieldDescriptor::MultiField { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Project a field tree onto its typed leaves, keyed by dotted path.
///
/// A field with a `type` contributes `prefix` itself; object properties are
/// walked with `prefix.child`. Output order follows declaration order.
pub fn flatten<'a>(prefix: &str, descriptor: &'a FieldDescriptor) -> IndexMap<String, &'a FieldDescriptor> {
    let mut out = IndexMap::new();
    flatten_into(prefix, descriptor, &mut out);
    out
}

fn flatten_into<'a>(
    prefix: &str,
    descriptor: &'a FieldDescriptor,
    out: &mut IndexMap<String, &'a FieldDescriptor>,
) {
    if descriptor.field_type().is_some() {
        out.insert(prefix.to_string(), descriptor);
    }
    if let Some(properties) = descriptor.properties() {
        for (name, child) in properties {
            flatten_into(&format!("{}.{}", prefix, name), child, out);
        }
    }
}

/// Wire shape of a field: every member optional, as the cluster sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawField {
    #[serde(flatten)]
    attrs: FieldAttrs,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<IndexMap<String, FieldDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<IndexMap<String, FieldDescriptor>>,
}

impl TryFrom<RawField> for FieldDescriptor {
    type Error = String;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        match (raw.properties, raw.fields) {
            (Some(_), Some(_)) => Err(
                "a field cannot declare both `properties` and `fields`".to_string(),
            ),
            (Some(properties), None) => Ok(FieldDescriptor::Container {
                attrs: raw.attrs,
                properties,
            }),
            (None, Some(fields)) => Ok(FieldDescriptor::MultiField {
                attrs: raw.attrs,
                fields,
            }),
            (None, None) => Ok(FieldDescriptor::Simple(raw.attrs)),
        }
    }
}

impl From<FieldDescriptor> for RawField {
    fn from(descriptor: FieldDescriptor) -> Self {
        match descriptor {
            FieldDescriptor::Simple(attrs) => RawField {
                attrs,
                properties: None,
                fields: None,
            },
            FieldDescriptor::Container { attrs, properties } => RawField {
                attrs,
                properties: Some(properties),
                fields: None,
            },
            FieldDescriptor::MultiField { attrs, fields } => RawField {
                attrs,
                properties: None,
                fields: Some(fields),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> FieldDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_variants() {
        assert!(matches!(
            parse(json!({"type": "keyword"})),
            FieldDescriptor::Simple(_)
        ));
        assert!(matches!(
            parse(json!({"properties": {"a": {"type": "long"}}})),
            FieldDescriptor::Container { .. }
        ));
        assert!(matches!(
            parse(json!({"type": "text", "fields": {"raw": {"type": "keyword"}}})),
            FieldDescriptor::MultiField { .. }
        ));
    }

    #[test]
    fn test_rejects_properties_and_fields_together() {
        let err = serde_json::from_value::<FieldDescriptor>(json!({
            "properties": {"a": {"type": "long"}},
            "fields": {"raw": {"type": "keyword"}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_unknown_parameters_survive_roundtrip() {
        let original = json!({"type": "date", "format": "dateOptionalTime", "doc_values": false});
        let field = parse(original.clone());
        assert_eq!(
            field.attrs().extra.get("format"),
            Some(&json!("dateOptionalTime"))
        );
        assert_eq!(serde_json::to_value(&field).unwrap(), original);
    }

    #[test]
    fn test_index_flag_normalization() {
        assert!(normalize_index(None, Some("text")));
        assert!(!normalize_index(Some(&IndexFlag::Bool(false)), Some("text")));
        assert!(normalize_index(
            Some(&IndexFlag::Legacy("analyzed".into())),
            Some("string")
        ));
        assert!(!normalize_index(
            Some(&IndexFlag::Legacy("not_analyzed".into())),
            Some("string")
        ));
        assert!(normalize_index(
            Some(&IndexFlag::Legacy("not_analyzed".into())),
            Some("long")
        ));
        assert!(!normalize_index(
            Some(&IndexFlag::Legacy("no".into())),
            Some("long")
        ));
    }

    #[test]
    fn test_flatten_nested_properties() {
        let manager = parse(json!({
            "properties": {
                "age":  { "type": "integer" },
                "name": {
                    "properties": {
                        "first": { "type": "text" },
                        "last":  { "type": "text" }
                    }
                }
            }
        }));

        let flat = flatten("manager", &manager);
        let paths: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["manager.age", "manager.name.first", "manager.name.last"]);
        assert_eq!(flat["manager.age"], &FieldDescriptor::typed("integer"));
        assert_eq!(flat["manager.name.first"], &FieldDescriptor::typed("text"));
    }

    #[test]
    fn test_flatten_typed_leaf_and_typeless_leaf() {
        let leaf = FieldDescriptor::typed("keyword");
        let flat = flatten("color", &leaf);
        assert_eq!(flat.len(), 1);
        assert!(flat.contains_key("color"));

        assert!(flatten("raw", &FieldDescriptor::disabled()).is_empty());
    }

    #[test]
    fn test_flatten_includes_typed_containers() {
        let nested = parse(json!({
            "type": "nested",
            "properties": {"sku": {"type": "keyword"}}
        }));
        let flat = flatten("variants", &nested);
        let paths: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["variants", "variants.sku"]);
    }

    #[test]
    fn test_effective_type_treats_object_as_untyped() {
        let explicit = parse(json!({"type": "object", "properties": {}}));
        let implicit = parse(json!({"properties": {}}));
        assert_eq!(explicit.effective_type(), None);
        assert_eq!(implicit.effective_type(), None);
        assert_eq!(FieldDescriptor::typed("object").effective_type(), None);
        assert_eq!(FieldDescriptor::typed("nested").effective_type(), Some("nested"));
    }

    #[test]
    fn test_builders_match_parsed_shapes() {
        let mut children = IndexMap::new();
        children.insert("age".to_string(), FieldDescriptor::typed("long"));
        assert_eq!(
            FieldDescriptor::object(children),
            parse(json!({"properties": {"age": {"type": "long"}}}))
        );

        let mut fields = IndexMap::new();
        fields.insert("raw".to_string(), FieldDescriptor::typed("keyword"));
        let title = FieldDescriptor::multi(FieldAttrs::typed("text"), fields).with_analyzer("english");
        assert_eq!(
            title,
            parse(json!({
                "type": "text",
                "analyzer": "english",
                "fields": {"raw": {"type": "keyword"}}
            }))
        );
    }
}
