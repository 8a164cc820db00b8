//! The serialized database dump and its type-preserving value encoding.
//!
//! Scalars pass through as native JSON, timestamps travel as ISO-8601 text
//! (which is how the database layer stores them), and binary payloads are
//! wrapped in an explicit tagged object `{"kind": "buffer", "value":
//! "<base64>"}`. The tag is an explicit variant rather than shape-sniffing,
//! so a legitimately nested JSON value in a text column can never be
//! mistaken for binary data.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One column value, preserving the storage class it had in the database.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl ColumnValue {
    /// Text columns must be valid UTF-8; invalid bytes abort the dump
    /// rather than being rewritten by a lossy conversion.
    pub fn from_sql_ref(value: ValueRef<'_>) -> anyhow::Result<Self> {
        Ok(match value {
            ValueRef::Null => ColumnValue::Null,
            ValueRef::Integer(i) => ColumnValue::Integer(i),
            ValueRef::Real(f) => ColumnValue::Real(f),
            ValueRef::Text(t) => ColumnValue::Text(
                std::str::from_utf8(t)
                    .map_err(|e| anyhow::anyhow!("text column is not valid UTF-8: {e}"))?
                    .to_owned(),
            ),
            ValueRef::Blob(b) => ColumnValue::Binary(b.to_vec()),
        })
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Owned(Value::Null),
            ColumnValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            ColumnValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            ColumnValue::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
            ColumnValue::Binary(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl Serialize for ColumnValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnValue::Null => serializer.serialize_unit(),
            ColumnValue::Integer(i) => serializer.serialize_i64(*i),
            ColumnValue::Real(f) => serializer.serialize_f64(*f),
            ColumnValue::Text(t) => serializer.serialize_str(t),
            ColumnValue::Binary(b) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("kind", "buffer")?;
                map.serialize_entry("value", &BASE64.encode(b))?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ColumnValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnValueVisitor;

        impl<'de> Visitor<'de> for ColumnValueVisitor {
            type Value = ColumnValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("null, a scalar, or a tagged buffer object")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ColumnValue::Null)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                // SQLite stores booleans as integers.
                Ok(ColumnValue::Integer(v as i64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ColumnValue::Integer(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(ColumnValue::Integer)
                    .map_err(|_| de::Error::custom(format!("integer {v} out of range")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(ColumnValue::Real(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(ColumnValue::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(ColumnValue::Text(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut kind: Option<String> = None;
                let mut value: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "kind" => kind = Some(map.next_value()?),
                        "value" => value = Some(map.next_value()?),
                        other => {
                            return Err(de::Error::unknown_field(other, &["kind", "value"]));
                        }
                    }
                }
                match kind.as_deref() {
                    Some("buffer") => {
                        let encoded =
                            value.ok_or_else(|| de::Error::missing_field("value"))?;
                        BASE64
                            .decode(encoded.as_bytes())
                            .map(ColumnValue::Binary)
                            .map_err(|e| de::Error::custom(format!("invalid base64: {e}")))
                    }
                    Some(other) => Err(de::Error::custom(format!("unknown value kind {other:?}"))),
                    None => Err(de::Error::missing_field("kind")),
                }
            }
        }

        deserializer.deserialize_any(ColumnValueVisitor)
    }
}

pub type DumpRow = BTreeMap<String, ColumnValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDump {
    pub name: String,
    pub row_count: usize,
    pub rows: Vec<DumpRow>,
}

/// The full point-in-time dump embedded in every archive as `database.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDump {
    pub exported_at: DateTime<Utc>,
    pub tables: Vec<TableDump>,
}

impl DatabaseDump {
    /// Per-table row counts, recorded in the metadata descriptor for
    /// cross-checking against the dump.
    pub fn table_counts(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .map(|t| (t.name.clone(), t.row_count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_pass_through() {
        assert_eq!(serde_json::to_value(ColumnValue::Null).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(ColumnValue::Integer(42)).unwrap(), json!(42));
        assert_eq!(serde_json::to_value(ColumnValue::Real(1.5)).unwrap(), json!(1.5));
        assert_eq!(
            serde_json::to_value(ColumnValue::Text("hello".into())).unwrap(),
            json!("hello")
        );
    }

    #[test]
    fn binary_encodes_as_tagged_buffer() {
        let value = ColumnValue::Binary(vec![0x00, 0x9f, 0x92, 0x96]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({ "kind": "buffer", "value": "AJ+Slg==" })
        );
    }

    #[test]
    fn binary_round_trip_is_byte_exact() {
        let original: Vec<u8> = (0..=255).collect();
        let encoded = serde_json::to_string(&ColumnValue::Binary(original.clone())).unwrap();
        let decoded: ColumnValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ColumnValue::Binary(original));
    }

    #[test]
    fn scalar_round_trips() {
        for value in [
            ColumnValue::Null,
            ColumnValue::Integer(-7),
            ColumnValue::Real(2.25),
            ColumnValue::Text("2025-06-01T10:30:00+00:00".into()),
        ] {
            let encoded = serde_json::to_string(&value).unwrap();
            let decoded: ColumnValue = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn untagged_object_is_rejected() {
        let result = serde_json::from_value::<ColumnValue>(json!({ "nested": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let result =
            serde_json::from_value::<ColumnValue>(json!({ "kind": "stream", "value": "AA==" }));
        assert!(result.is_err());
    }

    #[test]
    fn table_counts_match_rows() {
        let dump = DatabaseDump {
            exported_at: chrono::Utc::now(),
            tables: vec![
                TableDump {
                    name: "users".into(),
                    row_count: 2,
                    rows: vec![DumpRow::new(), DumpRow::new()],
                },
                TableDump {
                    name: "events".into(),
                    row_count: 0,
                    rows: vec![],
                },
            ],
        };
        let counts = dump.table_counts();
        assert_eq!(counts["users"], 2);
        assert_eq!(counts["events"], 0);
    }
}
