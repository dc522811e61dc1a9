use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use bindery::{AppBuilder, Bind, Lifetime, ScopedFallback, Settings, StdError};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};

/// JSON configuration split into named sections.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub(crate) configs: BTreeMap<String, serde_json::Value>,
}

/// A typed configuration section stored under [`ConfigSection::key`].
pub trait ConfigSection: DeserializeOwned {
    fn key() -> &'static str;
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserializes section `name`; a missing section reads as `null`.
    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(
            self.configs
                .get(name.as_ref())
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        )?)
    }

    pub fn section<T>(&self) -> Result<T, StdError>
    where
        T: ConfigSection,
    {
        self.get(T::key())
    }

    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.configs.contains_key(name.as_ref())
    }

    pub fn set<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), StdError>
    where
        T: Serialize,
    {
        self.configs
            .insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Builder form of [`Config::set`].
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be represented as JSON.
    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Serialize,
    {
        let name = name.into();
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| panic!("Cannot serialize config {name:?}: {err}"));
        self.configs.insert(name, value);
        self
    }

    /// Deep merges `other` into this config.
    ///
    /// Objects are merged key by key, arrays are concatenated and any other
    /// value is replaced.
    pub fn merge_from(&mut self, other: Self) {
        for (key, value) in other.configs {
            let entry = self.configs.entry(key);
            merge_json_from(entry.or_insert(serde_json::Value::Null), value);
        }
    }

    pub fn parse<T>(text: T) -> Result<Self, StdError>
    where
        T: AsRef<str>,
    {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(text)
    }

    /// Returns `true` when the config has no sections.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Number of top-level sections.
    pub fn len(&self) -> usize {
        self.configs.len()
    }
}

fn merge_json_from(lhs: &mut serde_json::Value, rhs: serde_json::Value) {
    match lhs {
        serde_json::Value::Object(l) => match rhs {
            serde_json::Value::Object(r) => {
                for (key, value) in r {
                    let entry = l.entry(key);
                    merge_json_from(entry.or_insert(serde_json::Value::Null), value);
                }
            }
            _ => *lhs = rhs,
        },
        serde_json::Value::Array(l) => match rhs {
            serde_json::Value::Array(r) => {
                l.extend(r);
            }
            _ => *lhs = rhs,
        },
        _ => *lhs = rhs,
    }
}

/// Container settings read from the `kernel` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(
        default,
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub default_lifetime: Lifetime,
    #[serde(
        default,
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub scoped_fallback: ScopedFallback,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            default_lifetime: Lifetime::default(),
            scoped_fallback: ScopedFallback::default(),
            max_depth: default_max_depth(),
        }
    }
}

impl ConfigSection for KernelConfig {
    fn key() -> &'static str {
        "kernel"
    }
}

impl From<KernelConfig> for Settings {
    fn from(config: KernelConfig) -> Self {
        Settings {
            default_lifetime: config.default_lifetime,
            scoped_fallback: config.scoped_fallback,
            max_depth: config.max_depth,
        }
    }
}

fn default_max_depth() -> usize {
    Settings::default().max_depth
}

fn serialize_display<T, S>(v: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    serializer.collect_str(v)
}

fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: Deserializer<'de>,
{
    use serde::de::Error;
    String::deserialize(deserializer).and_then(|v| T::from_str(&v).map_err(Error::custom))
}

/// Configuration helpers for [`AppBuilder`].
pub trait ConfigureExt {
    /// Applies the `kernel` section of the [`Config`] component to the
    /// builder settings. Does nothing without a `Config` or a `kernel` section.
    fn configure_kernel(&mut self) -> Result<&mut Self, StdError>;

    /// Binds section `T` of the [`Config`] component as a singleton so that
    /// services can receive it as `Arc<T>`.
    fn bind_config_section<T>(&mut self) -> Result<&mut Self, StdError>
    where
        T: ConfigSection + Send + Sync + 'static;
}

impl ConfigureExt for AppBuilder {
    fn configure_kernel(&mut self) -> Result<&mut Self, StdError> {
        let Some(config) = self.get_component_ref::<Config>() else {
            return Ok(self);
        };
        let Some(kernel) = config.get::<Option<KernelConfig>>(KernelConfig::key())? else {
            return Ok(self);
        };
        tracing::debug!(
            default_lifetime = %kernel.default_lifetime,
            scoped_fallback = %kernel.scoped_fallback,
            max_depth = kernel.max_depth,
            "Configuring kernel"
        );
        Ok(self.with_settings(kernel.into()))
    }

    fn bind_config_section<T>(&mut self) -> Result<&mut Self, StdError>
    where
        T: ConfigSection + Send + Sync + 'static,
    {
        let section = self
            .get_component_ref::<Config>()
            .ok_or("Missing component: Config")?
            .section::<T>()
            .map_err(|err| format!("Invalid config section {:?}: {err}", T::key()))?;
        Ok(self.add_binding(Bind::<T>::to_constant(Arc::new(section))))
    }
}
