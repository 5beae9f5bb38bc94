use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, ToolError};

/// Environment values an integration declared as required, captured once
/// before any network call is made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    values: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Reads the required variables from the process environment.
    pub fn from_env(required: &[&str]) -> Result<Self> {
        Self::from_lookup(required, |name| std::env::var(name).ok())
    }

    /// Reads the required variables through `lookup`.
    ///
    /// Fails on the first variable that is absent or empty.
    pub fn from_lookup<F>(required: &[&str], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = BTreeMap::new();
        for name in required {
            match lookup(name) {
                Some(value) if !value.is_empty() => {
                    values.insert((*name).to_string(), value);
                }
                _ => return Err(ToolError::MissingVariable((*name).to_string())),
            }
        }
        debug!(variables = values.len(), "configuration loaded");
        Ok(Self { values })
    }

    /// Returns a variable captured at load time.
    pub fn get(&self, name: &str) -> Result<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ToolError::MissingVariable(name.to_string()))
    }

    /// Returns a base URL variable without its trailing slash.
    pub fn base_url(&self, name: &str) -> Result<&str> {
        Ok(self.get(name)?.trim_end_matches('/'))
    }
}

/// Loads `.env` from the working directory when one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable environment file"),
    }
}
