//! Conversion of caller-supplied values documents into the archive values format.

use crate::error::ConversionError;

/// Converts structured-text values documents into raw archive values.
pub trait ValuesConverter: Send + Sync + 'static {
    /// Convert an incoming document into the raw values text stored in archives.
    fn convert(&self, document: &[u8]) -> Result<String, ConversionError>;

    /// Render stored raw values back into the incoming document format.
    fn render(&self, raw: &str) -> Result<Vec<u8>, ConversionError>;

    /// Name of the incoming document format.
    fn source_format(&self) -> &'static str;
}

/// Accepts JSON objects and stores them as TOML.
///
/// TOML has no null, so documents containing `null` anywhere are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonToTomlConverter;

impl JsonToTomlConverter {
    pub fn new() -> Self {
        Self
    }

    fn error(reason: impl std::fmt::Display) -> ConversionError {
        ConversionError {
            from: "json",
            reason: reason.to_string(),
        }
    }
}

impl ValuesConverter for JsonToTomlConverter {
    fn convert(&self, document: &[u8]) -> Result<String, ConversionError> {
        let value: serde_json::Value = serde_json::from_slice(document).map_err(Self::error)?;
        if !value.is_object() {
            return Err(Self::error("values document must be a JSON object"));
        }
        let table = match toml::Value::try_from(value).map_err(Self::error)? {
            toml::Value::Table(table) => table,
            other => {
                return Err(Self::error(format!("expected a table, got {}", other.type_str())));
            }
        };
        toml::to_string(&table).map_err(Self::error)
    }

    fn render(&self, raw: &str) -> Result<Vec<u8>, ConversionError> {
        let table: toml::Table = toml::from_str(raw).map_err(|e| ConversionError {
            from: "toml",
            reason: e.to_string(),
        })?;
        serde_json::to_vec(&table).map_err(Self::error)
    }

    fn source_format(&self) -> &'static str {
        "json"
    }
}
