use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;

use crate::error::{Result, ScriptlocError};

/// An exported script file: a JSON object with one field holding the script blob.
///
/// Every other field is carried through untouched, in its original order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDocument {
    fields: Map<String, Value>,
}

impl ScriptDocument {
    pub fn from_json(content: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ScriptlocError::MalformedInput(
                "document is not a JSON object".to_string(),
            )),
        }
    }

    pub async fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ScriptlocError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path).await?;
        Self::from_json(&content).map_err(|e| match e {
            ScriptlocError::MalformedInput(msg) => {
                ScriptlocError::MalformedInput(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// The script blob stored in `field`
    pub fn text(&self, field: &str) -> Result<&str> {
        match self.fields.get(field) {
            Some(Value::String(text)) => Ok(text),
            Some(_) => Err(ScriptlocError::MalformedInput(format!(
                "field \"{}\" is not a string",
                field
            ))),
            None => Err(ScriptlocError::MalformedInput(format!(
                "field \"{}\" is missing",
                field
            ))),
        }
    }

    pub fn set_text(&mut self, field: &str, text: String) {
        self.fields.insert(field.to_string(), Value::String(text));
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// Write as pretty JSON, creating parent directories as needed
    pub async fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}
