use std::{
    collections::BTreeMap,
    fmt::Display,
    str::FromStr,
};

use errors::ErrorMetadata;
use imbl::OrdMap;
use serde::{
    Deserialize,
    Serialize,
};

pub const SETTING_NUMBER_OF_SHARDS: &str = "index.number_of_shards";
pub const SETTING_NUMBER_OF_REPLICAS: &str = "index.number_of_replicas";
pub const SETTING_INDEX_HIDDEN: &str = "index.hidden";
pub const SETTING_VERSION_CREATED: &str = "index.version.created";

/// Immutable string key/value bag. Cloning is cheap, and every "mutation"
/// returns a new bag that shares structure with the old one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Settings(OrdMap<String, String>);

impl Settings {
    pub fn empty() -> Self {
        Self(OrdMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| &v[..])
    }

    pub fn get_as<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(v) => Ok(Some(v)),
            Err(e) => anyhow::bail!(ErrorMetadata::bad_request(
                "InvalidSetting",
                format!("failed to parse value [{raw}] for setting [{key}]: {e}"),
            )),
        }
    }

    /// Booleans are strict: only `true` and `false` parse.
    pub fn get_bool(&self, key: &str, default: bool) -> anyhow::Result<bool> {
        Ok(self.get_as(key)?.unwrap_or(default))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.0.remove(key);
        self
    }

    /// Layer `other` over `self`. Keys present in both take `other`'s value.
    pub fn merge(&self, other: &Settings) -> Settings {
        let mut merged = self.0.clone();
        for (k, v) in other.0.iter() {
            merged.insert(k.clone(), v.clone());
        }
        Self(merged)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (&k[..], &v[..]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for Settings {
    fn from(value: BTreeMap<String, String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Settings> for BTreeMap<String, String> {
    fn from(value: Settings) -> Self {
        value.0.into_iter().collect()
    }
}
