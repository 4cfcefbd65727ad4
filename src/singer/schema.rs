use serde::Serialize;
use serde_json::{Map, Value};

/// Pattern for dates like `1.7.2019` or `01.07.2019`; the leading `$` branch
/// admits the empty string.
const GERMAN_DATE_OR_EMPTY: &str = r"$|(\d{1,2}\.\d{1,2}\.\d{4})";

/// Declaration of a single string column in the stream schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub pattern: Option<&'static str>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl FieldSpec {
    const fn string(name: &'static str) -> Self {
        Self {
            name,
            pattern: None,
            min_length: None,
            max_length: None,
        }
    }

    const fn pattern(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern: Some(pattern),
            min_length: None,
            max_length: None,
        }
    }

    const fn fixed_length(self, len: usize) -> Self {
        Self {
            min_length: Some(len),
            max_length: Some(len),
            ..self
        }
    }
}

/// JSON-schema rendering of a [`FieldSpec`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Property {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<usize>,
}

impl From<&FieldSpec> for Property {
    fn from(field: &FieldSpec) -> Self {
        Self {
            kind: "string",
            pattern: field.pattern,
            min_length: field.min_length,
            max_length: field.max_length,
        }
    }
}

/// Columns of the OeKB export, in export order.
///
/// This is a fixed declaration; it is never inferred from the fetched header.
pub const MELDEFONDS_FIELDS: &[FieldSpec] = &[
    FieldSpec::pattern("ISIN", "[A-Z]{2}[A-Z0-9]{9}[0-9]").fixed_length(12),
    FieldSpec::string("Bezeichnung"),
    FieldSpec::string("Steuerlicher Vertreter"),
    FieldSpec::pattern("KEst-Meldefonds seit", GERMAN_DATE_OR_EMPTY),
    FieldSpec::string("Absichtserklärung"),
    FieldSpec::string("Art gemäß FMV 2015"),
    FieldSpec::string("Fondsstatus"),
    FieldSpec::string("Ertragsverwendung"),
    FieldSpec::string("Währung"),
    FieldSpec::pattern("Fondsende", GERMAN_DATE_OR_EMPTY),
];

/// Renders a field list as `{"properties": {...}}`, keeping declaration order.
pub fn schema_json(fields: &[FieldSpec]) -> serde_json::Result<Value> {
    let mut properties = Map::new();
    for field in fields {
        properties.insert(
            field.name.to_string(),
            serde_json::to_value(Property::from(field))?,
        );
    }

    let mut schema = Map::new();
    schema.insert("properties".to_string(), Value::Object(properties));
    Ok(Value::Object(schema))
}
