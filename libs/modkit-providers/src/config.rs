//! Hierarchical configuration with colon-separated section paths.
//!
//! A [`Configuration`] is an immutable tree assembled from ordered layers
//! (in-memory JSON, YAML files, environment variables). Later layers override
//! earlier ones. Two rules make layering behave like a key/value store rather
//! than a plain JSON merge:
//!
//! - Keys are matched case-insensitively. An overriding key lands on the
//!   casing that was seen first, so `clientid` from the environment replaces
//!   `ClientId` from a YAML file.
//! - Objects whose keys are exactly `"0".."n-1"` are treated as arrays. This is
//!   what `Instances__0__ClientId` style environment variables produce.
//!
//! Sections are looked up with [`Configuration::get_section`], which never
//! fails: a missing section is reported through [`ConfigSection::exists`].
//! [`ConfigSection::bind`] applies the same rules when deserializing:
//!
//! - Struct fields match keys case-insensitively (`clientid` binds `ClientId`).
//! - Sequences accept index-keyed objects, compacted in index order.
//! - String fields accept numbers and booleans by their text.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Separator between section path segments.
pub const KEY_DELIMITER: char = ':';

/// Configuration error for typed section access.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("configuration section '{path}' not found")]
    SectionNotFound { path: String },
    #[error("configuration section '{path}' cannot be bound: {source}")]
    InvalidSection {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load configuration layer: {source}")]
    Load {
        #[source]
        source: Box<figment::Error>,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(source: figment::Error) -> Self {
        ConfigError::Load {
            source: Box::new(source),
        }
    }
}

/// Immutable, layered configuration tree.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    root: Value,
}

impl Configuration {
    /// Start assembling a configuration from layers.
    #[must_use]
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Build a configuration from a single in-memory tree.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let mut root = Value::Object(Map::new());
        merge(&mut root, value);
        Self { root }
    }

    /// The whole tree.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up the section at `path` (e.g. `Cirreum:Authentication:Providers:Github`).
    ///
    /// Segments are matched case-insensitively and array elements are addressed
    /// by index. The returned section may not exist.
    #[must_use]
    pub fn get_section(&self, path: &str) -> ConfigSection {
        ConfigSection {
            path: path.to_owned(),
            value: lookup(&self.root, path).cloned(),
        }
    }
}

/// Ordered set of configuration layers.
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    root: Value,
}

impl ConfigurationBuilder {
    /// Merge an in-memory tree.
    #[must_use]
    pub fn add_value(mut self, value: Value) -> Self {
        merge(&mut self.root, value);
        self
    }

    /// Merge a YAML file. A missing file contributes nothing.
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if the file exists but cannot be parsed.
    pub fn add_yaml_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let layer: Value = Figment::from(Yaml::file(path.as_ref())).extract()?;
        Ok(self.add_value(layer))
    }

    /// Merge environment variables starting with `prefix`, using `__` as the
    /// nesting separator (`APP_Cirreum__Authentication__Providers__Github__Instances__0__ClientId`).
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if the environment cannot be represented as a tree.
    pub fn add_env(self, prefix: &str) -> Result<Self, ConfigError> {
        let layer: Value = Figment::from(Env::prefixed(prefix).split("__")).extract()?;
        Ok(self.add_value(layer))
    }

    #[must_use]
    pub fn build(self) -> Configuration {
        Configuration::from_value(self.root)
    }
}

/// A view over one node of a [`Configuration`].
#[derive(Debug, Clone)]
pub struct ConfigSection {
    path: String,
    value: Option<Value>,
}

impl ConfigSection {
    /// Full path of this section.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    #[must_use]
    pub fn key(&self) -> &str {
        self.path
            .rsplit(KEY_DELIMITER)
            .next()
            .unwrap_or(self.path.as_str())
    }

    /// Raw value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// A section exists when it holds a scalar or a non-empty object/array.
    #[must_use]
    pub fn exists(&self) -> bool {
        match &self.value {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Child section relative to this one.
    #[must_use]
    pub fn get_section(&self, key: &str) -> ConfigSection {
        let path = if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}{KEY_DELIMITER}{key}", self.path)
        };
        ConfigSection {
            value: self.value.as_ref().and_then(|v| lookup(v, key)).cloned(),
            path,
        }
    }

    /// Deserialize this section into `T`.
    ///
    /// # Errors
    /// Returns `ConfigError::SectionNotFound` if the section does not exist, or
    /// `ConfigError::InvalidSection` if its shape does not match `T`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let value = match &self.value {
            Some(value) if self.exists() => value,
            _ => {
                return Err(ConfigError::SectionNotFound {
                    path: self.path.clone(),
                });
            }
        };
        <T as Deserialize>::deserialize(CaseInsensitive(value)).map_err(|source| {
            ConfigError::InvalidSection {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split(KEY_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                .map(|(_, v)| v),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn merge(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.keys().find(|k| k.eq_ignore_ascii_case(&key)).cloned() {
                    Some(existing) => {
                        if let Some(slot) = dst.get_mut(&existing) {
                            merge(slot, value);
                        }
                    }
                    None => {
                        dst.insert(key, normalize(value));
                    }
                }
            }
        }
        (Value::Array(dst), Value::Object(src)) if is_index_map(&src) => {
            // Indices past the end are appended in order, never padded.
            for (index, value) in by_index(src) {
                match dst.get_mut(index) {
                    Some(slot) => merge(slot, value),
                    None => dst.push(normalize(value)),
                }
            }
        }
        (slot, overlay) => *slot = normalize(overlay),
    }
}

fn is_index_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok())
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) if is_dense_index_map(&map) => {
            Value::Array(by_index(map).into_iter().map(|(_, v)| normalize(v)).collect())
        }
        Value::Object(map) => {
            let mut out = Value::Object(Map::new());
            for (k, v) in map {
                merge(&mut out, Value::Object(Map::from_iter([(k, v)])));
            }
            out
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

fn is_dense_index_map(map: &Map<String, Value>) -> bool {
    is_index_map(map) && (0..map.len()).all(|i| map.contains_key(&i.to_string()))
}

fn by_index(map: Map<String, Value>) -> Vec<(usize, Value)> {
    let mut entries: Vec<(usize, Value)> = map
        .into_iter()
        .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
        .collect();
    entries.sort_by_key(|(i, _)| *i);
    entries
}

/// Deserializer over a borrowed tree that binds the way lookups resolve.
struct CaseInsensitive<'de>(&'de Value);

impl<'de> Deserializer<'de> for CaseInsensitive<'de> {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Entries::new(map, &[])),
            Value::Array(items) => visitor.visit_seq(Items::new(items.iter().collect())),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => other.deserialize_string(visitor),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) if is_index_map(map) => {
                let mut entries: Vec<(usize, &'de Value)> = map
                    .iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                entries.sort_by_key(|(i, _)| *i);
                visitor.visit_seq(Items::new(entries.into_iter().map(|(_, v)| v).collect()))
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Entries::new(map, fields)),
            other => other.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char bytes byte_buf
        unit unit_struct tuple tuple_struct map identifier ignored_any
    }
}

/// Object entries with keys rewritten to the matching struct field name.
struct Entries<'de> {
    iter: serde_json::map::Iter<'de>,
    fields: &'static [&'static str],
    value: Option<&'de Value>,
}

impl<'de> Entries<'de> {
    fn new(map: &'de Map<String, Value>, fields: &'static [&'static str]) -> Self {
        Self {
            iter: map.iter(),
            fields,
            value: None,
        }
    }
}

impl<'de> MapAccess<'de> for Entries<'de> {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        let Some((key, value)) = self.iter.next() else {
            return Ok(None);
        };
        self.value = Some(value);
        let key: &'de str = self
            .fields
            .iter()
            .find(|field| field.eq_ignore_ascii_case(key))
            .map_or(key.as_str(), |field| *field);
        seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self.value.take().ok_or_else(|| {
            <serde_json::Error as de::Error>::custom("value requested before key")
        })?;
        seed.deserialize(CaseInsensitive(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct Items<'de>(std::vec::IntoIter<&'de Value>);

impl<'de> Items<'de> {
    fn new(items: Vec<&'de Value>) -> Self {
        Self(items.into_iter())
    }
}

impl<'de> SeqAccess<'de> for Items<'de> {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        self.0
            .next()
            .map(|value| seed.deserialize(CaseInsensitive(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}
