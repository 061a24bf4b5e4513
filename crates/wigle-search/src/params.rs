//! Search parameters as sent on the wire

use std::fmt;

use wigle_core::Query;

use crate::category::Category;

/// A parameter name the target endpoint does not understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownParameter {
    pub name: String,
    pub endpoint: String,
}

impl fmt::Display for UnknownParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown parameter '{}' for {} search",
            self.name, self.endpoint
        )
    }
}

impl std::error::Error for UnknownParameter {}

/// Ordered name/value pairs. Blank values never make it in, so every
/// pair here is transmitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParameters {
    pairs: Query,
}

impl SearchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters for `category`, rejecting names outside its
    /// vocabulary and dropping blank values.
    pub fn for_category<I, K, V>(category: Category, pairs: I) -> Result<Self, UnknownParameter>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            if !category.accepts(&key) {
                return Err(UnknownParameter {
                    name: key,
                    endpoint: category.to_string(),
                });
            }
            params.set(key, value);
        }
        Ok(params)
    }

    /// Build parameters without vocabulary checks, dropping blank values.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.set(key, value);
        }
        params
    }

    /// Set `key`, replacing an earlier value in place. A blank value
    /// removes the key instead.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            self.pairs.retain(|(k, _)| *k != key);
            return;
        }
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.pairs.push((key, value.to_string())),
        }
    }

    /// Set `key` to `value` exactly as given, replacing an earlier value in
    /// place. Opaque server tokens such as the page cursor go through here.
    pub fn set_verbatim(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_query(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Parse one `name=value` assignment (clap value parser).
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
