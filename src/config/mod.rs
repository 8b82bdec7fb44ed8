//! Panel configuration
//!
//! This module handles the configuration object the host hands to a panel
//! and reads back for persistence:
//! - [`PanelConfig`] - the persisted `{dataSource, titleColName, barParts}` object
//! - [`BarPart`] - one segment of the risk bar chart
//! - [`DataSourceRef`] - a data source by name, or an inline definition
//! - [`PanelSettings`](settings::PanelSettings) - per-deployment adapter settings (TOML)
//!
//! # JSON Shape
//!
//! ```json
//! {
//!   "dataSource": "DS-1",
//!   "titleColName": "title",
//!   "barParts": [{ "label": "Risk", "value": 10 }]
//! }
//! ```
//!
//! Every field is optional. Hosts may hand over arbitrary JSON, so
//! [`PanelConfig::from_value_lenient`] parses each field on its own and drops
//! malformed ones instead of rejecting the whole object.

pub mod settings;

pub use settings::*;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// JSON key of the data-source field
pub const DATA_SOURCE_KEY: &str = "dataSource";

/// JSON key of the title-column field
pub const TITLE_COL_NAME_KEY: &str = "titleColName";

/// JSON key of the bar-parts field
pub const BAR_PARTS_KEY: &str = "barParts";

// ==================== Bar Parts ====================

/// One segment of the risk bar chart.
///
/// The host's object is kept as sent. Only `label` and `value` are read, and
/// every key (colors, column bindings) is written back unchanged, so integer
/// values stay integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarPart(Map<String, Value>);

impl BarPart {
    pub fn new(label: impl Into<String>, value: impl Into<Number>) -> Self {
        let mut fields = Map::new();
        fields.insert("label".to_string(), Value::String(label.into()));
        fields.insert("value".to_string(), Value::Number(value.into()));
        Self(fields)
    }

    /// Attach an extra key carried through to the renderer.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.0.get("label").and_then(Value::as_str)
    }

    pub fn value(&self) -> Option<&Number> {
        self.0.get("value").and_then(Value::as_number)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Data-set column this part reads, falling back to its label
    pub fn column(&self) -> Option<&str> {
        self.get("colName").and_then(Value::as_str).or_else(|| self.label())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for BarPart {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Built-in bar parts used until the host configures its own.
///
/// One part per column of the risk review data set, with equal weight.
pub fn default_bar_parts() -> Vec<BarPart> {
    [
        ("Current", "cur"),
        ("Increase", "plus"),
        ("Residual", "ost"),
        ("Risk", "risk"),
        ("Fact", "fact"),
    ]
    .into_iter()
    .map(|(label, column)| BarPart::new(label, 20).with_extra("colName", column))
    .collect()
}

// ==================== Data Source Reference ====================

/// Inline data-source definition, created in the registry on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceDefinition {
    /// Source type understood by the registry (e.g. `OTL`)
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// Type-specific keys such as the query text
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a data source held in the panel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataSourceRef {
    /// A source already known to the registry
    Name(String),
    /// A source the panel asks the registry to create
    Definition(DataSourceDefinition),
}

impl DataSourceRef {
    pub fn name(&self) -> &str {
        match self {
            DataSourceRef::Name(name) => name,
            DataSourceRef::Definition(def) => &def.name,
        }
    }

    pub fn definition(&self) -> Option<&DataSourceDefinition> {
        match self {
            DataSourceRef::Name(_) => None,
            DataSourceRef::Definition(def) => Some(def),
        }
    }

    fn is_blank(&self) -> bool {
        self.name().is_empty()
    }
}

impl From<&str> for DataSourceRef {
    fn from(name: &str) -> Self {
        DataSourceRef::Name(name.to_string())
    }
}

impl From<String> for DataSourceRef {
    fn from(name: String) -> Self {
        DataSourceRef::Name(name)
    }
}

// ==================== Panel Config ====================

/// Configuration object exchanged with the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_col_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_parts: Option<Vec<BarPart>>,
}

impl PanelConfig {
    pub fn with_data_source(mut self, data_source: impl Into<DataSourceRef>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }

    pub fn with_title_col_name(mut self, name: impl Into<String>) -> Self {
        self.title_col_name = Some(name.into());
        self
    }

    pub fn with_bar_parts(mut self, parts: Vec<BarPart>) -> Self {
        self.bar_parts = Some(parts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data_source.is_none() && self.title_col_name.is_none() && self.bar_parts.is_none()
    }

    /// Drop empty-string values; the host uses them to mean "not set".
    pub fn normalized(mut self) -> Self {
        if self.data_source.as_ref().is_some_and(DataSourceRef::is_blank) {
            self.data_source = None;
        }
        if self.title_col_name.as_deref() == Some("") {
            self.title_col_name = None;
        }
        self
    }

    /// Keep only the fields tracked by `schema`. The data source is always kept.
    pub fn restricted_to(mut self, schema: &FieldSchema) -> Self {
        if !schema.title_column && self.title_col_name.take().is_some() {
            tracing::debug!(field = TITLE_COL_NAME_KEY, "Ignoring untracked field");
        }
        if !schema.bar_parts && self.bar_parts.take().is_some() {
            tracing::debug!(field = BAR_PARTS_KEY, "Ignoring untracked field");
        }
        self
    }

    /// Parse host JSON field by field.
    ///
    /// Unknown keys are ignored, `null` counts as absent, and a field that
    /// fails to parse is logged and treated as absent.
    pub fn from_value_lenient(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::warn!(kind = %json_kind(value), "Ignoring non-object panel configuration");
            return Self::default();
        };

        Self {
            data_source: lenient_field(object, DATA_SOURCE_KEY),
            title_col_name: lenient_field(object, TITLE_COL_NAME_KEY),
            bar_parts: lenient_field(object, BAR_PARTS_KEY),
        }
    }

    /// Serialize to the JSON object persisted by the host.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn lenient_field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = object.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(field = key, error = %e, "Ignoring malformed configuration field");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_default_bar_parts() {
        let parts = default_bar_parts();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0].label(), Some("Current"));
        assert_eq!(parts[0].column(), Some("cur"));
        let total: u64 = parts.iter().filter_map(|p| p.value()?.as_u64()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_empty_config_serializes_to_empty_object() {
        let value = PanelConfig::default().to_value().unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_config_json_shape() {
        let config = PanelConfig::default()
            .with_data_source("DS-1")
            .with_title_col_name("title")
            .with_bar_parts(vec![BarPart::new("Risk", 10)]);

        assert_eq!(
            config.to_value().unwrap(),
            json!({
                "dataSource": "DS-1",
                "titleColName": "title",
                "barParts": [{"label": "Risk", "value": 10}]
            })
        );
    }

    #[test]
    fn test_bar_part_keeps_extra_keys() {
        let raw = json!({"label": "Risk", "value": 10, "color": "#f00"});
        let part: BarPart = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(part.get("color"), Some(&json!("#f00")));
        assert_eq!(serde_json::to_value(&part).unwrap(), raw);
    }

    #[test]
    fn test_bar_parts_keep_exact_numbers() {
        let raw = json!({
            "barParts": [
                {"label": "Risk", "value": 10},
                {"label": "Large", "value": 9007199254740993u64},
                {"label": "Half", "value": 0.5}
            ]
        });
        let config = PanelConfig::from_value_lenient(&raw);

        let parts = config.bar_parts.as_ref().unwrap();
        assert_eq!(parts[1].value().and_then(Number::as_u64), Some(9007199254740993));
        assert_eq!(config.to_value().unwrap(), raw);
    }

    #[test]
    fn test_bar_part_without_value_is_kept() {
        let raw = json!({"barParts": [{"label": "Risk", "colName": "risk"}]});
        let config = PanelConfig::from_value_lenient(&raw);

        let parts = config.bar_parts.as_ref().unwrap();
        assert_eq!(parts[0].value(), None);
        assert_eq!(parts[0].column(), Some("risk"));
        assert_eq!(config.to_value().unwrap(), raw);
    }

    #[test]
    fn test_data_source_definition_parses() {
        let raw = json!({
            "dataSource": {"type": "OTL", "name": "DS-1", "original_otl": "| makeresults"}
        });
        let config: PanelConfig = serde_json::from_value(raw.clone()).unwrap();
        let source = config.data_source.as_ref().unwrap();

        assert_eq!(source.name(), "DS-1");
        let def = source.definition().unwrap();
        assert_eq!(def.kind, "OTL");
        assert_eq!(def.extra.get("original_otl"), Some(&json!("| makeresults")));
        assert_eq!(config.to_value().unwrap(), raw);
    }

    #[test]
    fn test_lenient_parse_drops_malformed_fields() {
        let raw = json!({
            "dataSource": "DS-1",
            "titleColName": 42,
            "barParts": [{"label": "Risk"}, 7],
            "somethingElse": true
        });
        let config = PanelConfig::from_value_lenient(&raw);

        assert_eq!(config.data_source, Some(DataSourceRef::from("DS-1")));
        assert!(config.title_col_name.is_none());
        assert!(config.bar_parts.is_none());
    }

    #[test]
    fn test_lenient_parse_treats_null_as_absent() {
        let config = PanelConfig::from_value_lenient(&json!({"dataSource": null}));
        assert!(config.is_empty());
    }

    #[test]
    fn test_lenient_parse_non_object() {
        assert!(PanelConfig::from_value_lenient(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_normalized_drops_empty_strings() {
        let config = PanelConfig::default()
            .with_data_source("")
            .with_title_col_name("")
            .with_bar_parts(Vec::new())
            .normalized();

        assert!(config.data_source.is_none());
        assert!(config.title_col_name.is_none());
        assert_eq!(config.bar_parts, Some(Vec::new()));
    }

    #[test]
    fn test_restricted_to_schema() {
        let config = PanelConfig::default()
            .with_data_source("DS-1")
            .with_title_col_name("title")
            .with_bar_parts(default_bar_parts())
            .restricted_to(&FieldSchema::data_source_only());

        assert_eq!(config, PanelConfig::default().with_data_source("DS-1"));
    }

    fn arb_config() -> impl Strategy<Value = PanelConfig> {
        let name = "[A-Za-z0-9-]{1,12}";
        let part = ("[a-z]{1,8}", any::<i64>()).prop_map(|(l, v)| BarPart::new(l, v));
        (
            proptest::option::of(name),
            proptest::option::of(name),
            proptest::option::of(proptest::collection::vec(part, 0..4)),
        )
            .prop_map(|(ds, title, parts)| PanelConfig {
                data_source: ds.map(DataSourceRef::Name),
                title_col_name: title,
                bar_parts: parts,
            })
    }

    proptest! {
        #[test]
        fn test_lenient_parse_inverts_serialization(config in arb_config()) {
            let value = config.to_value().unwrap();
            prop_assert_eq!(PanelConfig::from_value_lenient(&value), config);
        }

        #[test]
        fn test_absent_fields_stay_absent_in_json(config in arb_config()) {
            let value = config.to_value().unwrap();
            let object = value.as_object().unwrap();
            let has = |key: &str| object.contains_key(key);
            prop_assert_eq!(has(DATA_SOURCE_KEY), config.data_source.is_some());
            prop_assert_eq!(has(TITLE_COL_NAME_KEY), config.title_col_name.is_some());
            prop_assert_eq!(has(BAR_PARTS_KEY), config.bar_parts.is_some());
        }
    }
}
