//! Options accepted by the documentation backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocError;

/// Options for [`crate::render_markdown`], decoded from `--doc_opt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocOptions {
    /// Page title. Defaults to the document name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Write an HTML page instead of Markdown.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub html: bool,
}

impl DocOptions {
    /// Decodes options from a generator options map.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, DocError> {
        Ok(serde_json::from_value(Value::Object(map.clone()))?)
    }
}
