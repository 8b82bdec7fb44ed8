//! Sample risk review data set.
//!
//! The panel ships with one demo data source, `DS-1`: five risk categories
//! with their increase (`plus`), residual (`ost`), current (`cur`), risk and
//! fact figures. [`sample_data_source`] is the OTL definition a host would
//! execute; [`sample_records`] is the result it produces.

use crate::config::DataSourceDefinition;
use crate::types::{Record, RecordSet};
use serde_json::{json, Map};

/// Name of the demo data source
pub const SAMPLE_DATA_SOURCE: &str = "DS-1";

const SAMPLE_OTL: &str = r#"
| makeresults count=1
| eval title="Комплаенс риски",  plus=0, ost=0, cur=-60, risk=0, fact=0
| append [ | makeresults count=1 | eval title="Производственно-технологические риски",  plus=5, ost=0, cur=-50, risk=0, fact=5 ]
| append [ | makeresults count=1 | eval title="Финансовые риски",  plus=15, ost=0, cur=-40, risk=0, fact=15 ]
| append [ | makeresults count=1 | eval title="Технические и ресурсные риски",  plus=20, ost=0, cur=-70, risk=0, fact=20 ]
| append [ | makeresults count=1 | eval title="Коммерческие риски",  plus=0, ost=0, cur=-100, risk=-50, fact=-60 ]
"#;

/// OTL definition of the demo data source.
pub fn sample_data_source() -> DataSourceDefinition {
    let mut extra = Map::new();
    extra.insert("original_otl".to_string(), json!(SAMPLE_OTL.trim()));
    DataSourceDefinition {
        kind: "OTL".to_string(),
        name: SAMPLE_DATA_SOURCE.to_string(),
        extra,
    }
}

/// Rows produced by [`sample_data_source`].
pub fn sample_records() -> RecordSet {
    [
        ("Комплаенс риски", 0, 0, -60, 0, 0),
        ("Производственно-технологические риски", 5, 0, -50, 0, 5),
        ("Финансовые риски", 15, 0, -40, 0, 15),
        ("Технические и ресурсные риски", 20, 0, -70, 0, 20),
        ("Коммерческие риски", 0, 0, -100, -50, -60),
    ]
    .into_iter()
    .map(|(title, plus, ost, cur, risk, fact)| {
        let row = json!({
            "title": title,
            "plus": plus,
            "ost": ost,
            "cur": cur,
            "risk": risk,
            "fact": fact,
        });
        match row {
            serde_json::Value::Object(map) => map,
            _ => Record::new(),
        }
    })
    .collect()
}
