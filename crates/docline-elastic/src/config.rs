//! Elasticsearch connection configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// `[elastic]` section: where to search and what to match.
///
/// Credentials may reference environment variables as `${NAME}` so secrets
/// stay out of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    /// Cluster base URL
    pub url: String,
    /// Index name or pattern
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    /// Base request body, e.g. `{"query": {...}}`
    pub query: Option<Value>,
    /// File holding the base request body; wins over `query`
    pub query_file: Option<PathBuf>,
    /// Hits per page
    pub page_size: usize,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "rta_claim_headers-*".to_string(),
            username: None,
            password: None,
            api_key: None,
            query: None,
            query_file: None,
            page_size: 1000,
        }
    }
}

/// Resolved credentials
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

impl ElasticConfig {
    /// Credentials after `${VAR}` expansion. An API key takes precedence
    /// over basic auth.
    pub fn auth(&self) -> Result<Auth> {
        if let Some(key) = &self.api_key {
            return Ok(Auth::ApiKey(expand_env(key).context("elastic.api_key")?));
        }
        match (&self.username, &self.password) {
            (Some(user), password) => Ok(Auth::Basic {
                username: expand_env(user).context("elastic.username")?,
                password: match password {
                    Some(p) => expand_env(p).context("elastic.password")?,
                    None => String::new(),
                },
            }),
            (None, Some(_)) => anyhow::bail!("elastic.password set without elastic.username"),
            (None, None) => Ok(Auth::None),
        }
    }

    /// Base request body: `query_file`, then inline `query`, then match-all.
    pub fn base_query(&self) -> Result<Value> {
        let body = match (&self.query_file, &self.query) {
            (Some(path), _) => load_query(path)?,
            (None, Some(inline)) => inline.clone(),
            (None, None) => serde_json::json!({"query": {"match_all": {}}}),
        };
        anyhow::ensure!(
            body.is_object(),
            "base query must be a JSON object, got: {body}"
        );
        Ok(body)
    }
}

/// Read a JSON request body from disk
pub fn load_query(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read query file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in query file {}", path.display()))
}

/// Replace every `${NAME}` with the value of environment variable `NAME`.
///
/// A reference to an unset variable is an error; text without `${` passes
/// through untouched.
pub fn expand_env(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("unterminated ${{ in '{input}'"))?;
        let name = &after[..end];
        anyhow::ensure!(!name.is_empty(), "empty variable name in '{input}'");
        let value = std::env::var(name)
            .with_context(|| format!("environment variable {name} is not set"))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
