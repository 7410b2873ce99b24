use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, de};
use strum_macros::{EnumString, IntoStaticStr};

/// Column type as reported by BigQuery.
///
/// `Record` and `Struct` are the legacy and Standard SQL spellings of the same
/// nested type. Type names not listed here are kept in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FieldType {
    String,
    Bytes,
    Integer,
    Int64,
    Float,
    Float64,
    Numeric,
    Bignumeric,
    Boolean,
    Bool,
    Timestamp,
    Date,
    Time,
    Datetime,
    Geography,
    Json,
    Interval,
    Range,
    Record,
    Struct,
    #[strum(default)]
    Other(String),
}

impl FieldType {
    pub fn from_name(name: &str) -> Self {
        name.parse()
            .unwrap_or_else(|_| FieldType::Other(name.to_owned()))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, FieldType::Record | FieldType::Struct)
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Other(name) => write!(f, "{}", name),
            known => write!(f, "{}", <&'static str>::from(known)),
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldType::from_name(&raw))
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display, EnumString, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl<'de> Deserialize<'de> for FieldMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<FieldMode>()
            .map_err(|_| de::Error::custom(format!("unknown field mode `{}`", raw)))
    }
}

/// A column of a table schema, in BigQuery's JSON representation.
///
/// Only records carry `fields`; any other key (`description`, `policyTags`, ...)
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub mode: FieldMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType, mode: FieldMode) -> Self {
        Self {
            name: name.to_owned(),
            field_type,
            mode,
            fields: vec![],
        }
    }

    pub fn record(name: &str, mode: FieldMode, fields: Vec<Field>) -> Self {
        Self {
            name: name.to_owned(),
            field_type: FieldType::Record,
            mode,
            fields,
        }
    }

    pub fn is_record(&self) -> bool {
        self.field_type.is_record()
    }

    pub fn is_repeated(&self) -> bool {
        self.mode == FieldMode::Repeated
    }
}
