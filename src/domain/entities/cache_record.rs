use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const CONTENT_FIELD: &str = "content";
const TIMESTAMP_FIELD: &str = "timestamp";

/// Key of a cached extraction: the base name of the source file, without its extension.
///
/// `./data/1706.03762.pdf` and `/tmp/1706.03762.pdf` share the key `1706.03762`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_path(path: &Path) -> Self {
        match path.file_stem() {
            Some(stem) => Self(stem.to_string_lossy().into_owned()),
            None => Self(path.to_string_lossy().into_owned()),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Extracted text of one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub content: String,
    /// Epoch milliseconds at which the record was written
    pub timestamp: i64,
}

impl CacheRecord {
    pub fn new(content: String) -> Self {
        Self {
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Checks the shape of a JSON value read from the cache file.
    ///
    /// `timestamp` accepts any finite JSON number, truncated to whole milliseconds.
    pub fn validate(value: &JsonValue) -> RecordValidation {
        let Some(fields) = value.as_object() else {
            return RecordValidation::Invalid(InvalidRecordReason::NotAnObject);
        };

        let content = match fields.get(CONTENT_FIELD) {
            None => {
                return RecordValidation::Invalid(InvalidRecordReason::MissingField(CONTENT_FIELD))
            }
            Some(JsonValue::String(content)) => content.clone(),
            Some(_) => {
                return RecordValidation::Invalid(InvalidRecordReason::WrongFieldType(CONTENT_FIELD))
            }
        };

        let timestamp = match fields.get(TIMESTAMP_FIELD) {
            None => {
                return RecordValidation::Invalid(InvalidRecordReason::MissingField(TIMESTAMP_FIELD))
            }
            Some(JsonValue::Number(number)) => match number.as_i64() {
                Some(timestamp) => timestamp,
                None => match number.as_f64() {
                    Some(timestamp) if timestamp.is_finite() => timestamp as i64,
                    _ => {
                        return RecordValidation::Invalid(InvalidRecordReason::WrongFieldType(
                            TIMESTAMP_FIELD,
                        ))
                    }
                },
            },
            Some(_) => {
                return RecordValidation::Invalid(InvalidRecordReason::WrongFieldType(
                    TIMESTAMP_FIELD,
                ))
            }
        };

        RecordValidation::Valid(CacheRecord { content, timestamp })
    }
}

/// Result of checking one raw cache entry
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValidation {
    Valid(CacheRecord),
    Invalid(InvalidRecordReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRecordReason {
    NotAnObject,
    MissingField(&'static str),
    WrongFieldType(&'static str),
}

impl std::fmt::Display for InvalidRecordReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidRecordReason::NotAnObject => write!(f, "entry is not an object"),
            InvalidRecordReason::MissingField(field) => write!(f, "missing field `{}`", field),
            InvalidRecordReason::WrongFieldType(field) => {
                write!(f, "field `{}` has the wrong type", field)
            }
        }
    }
}

/// In-memory view of the cache file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cache(HashMap<CacheKey, CacheRecord>);

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheRecord> {
        self.0.get(key)
    }

    /// Inserts or overwrites the record of `key`
    pub fn insert(&mut self, key: CacheKey, record: CacheRecord) -> Option<CacheRecord> {
        self.0.insert(key, record)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &CacheRecord)> {
        self.0.iter()
    }
}

impl FromIterator<(CacheKey, CacheRecord)> for Cache {
    fn from_iter<I: IntoIterator<Item = (CacheKey, CacheRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
