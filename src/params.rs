use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, error};

use crate::error::{EvalError, Result};

/// A single hyperparameter value. `null`, `~` and empty values are `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<ParamValue>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => f.write_str(v),
            ParamValue::Null => f.write_str("null"),
            ParamValue::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Hyperparameters grouped by pipeline stage, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    sections: IndexMap<String, IndexMap<String, ParamValue>>,
}

impl Params {
    #[cfg(test)]
    pub fn section(&self, name: &str) -> Option<&IndexMap<String, ParamValue>> {
        self.sections.get(name)
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(|s| s.len()).sum()
    }

    /// `{section}_{key}` pairs, the naming used by the tracking session.
    pub fn flatten(&self) -> Vec<(String, ParamValue)> {
        self.sections
            .iter()
            .flat_map(|(section, values)| {
                values
                    .iter()
                    .map(move |(key, value)| (format!("{}_{}", section, key), value.clone()))
            })
            .collect()
    }
}

impl FromIterator<(String, IndexMap<String, ParamValue>)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, IndexMap<String, ParamValue>)>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

pub fn parse_params(path: &Path, content: &str) -> Result<Params> {
    if content.trim().is_empty() {
        return Err(EvalError::parse(path, "document is empty"));
    }
    serde_yaml::from_str(content).map_err(|e| EvalError::parse(path, e))
}

pub fn load_params(path: &Path) -> Result<Params> {
    let result = std::fs::read_to_string(path)
        .map_err(|e| EvalError::from_read("params file", path, e))
        .and_then(|content| parse_params(path, &content));

    match &result {
        Ok(params) => debug!(
            path = %path.display(),
            params = params.len(),
            "Parameters loaded"
        ),
        Err(e @ EvalError::NotFound { .. }) => error!("Error: {}", e),
        Err(e @ EvalError::Parse { .. }) => error!("Error parsing YAML file: {}", e),
        Err(e) => error!("An unexpected error occurred while loading parameters: {}", e),
    }
    result
}
