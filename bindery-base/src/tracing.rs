use std::str::FromStr as _;

use bindery::{AppBuilder, StdError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::{Config, ConfigSection};

/// Process-wide tracing subscriber configured from the `tracing` section.
///
/// Stored as an app component once installed.
#[derive(Clone, Debug)]
pub struct Tracing {
    level: tracing::Level,
    directives: Vec<String>,
}

impl Tracing {
    /// Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a
    /// formatting layer.
    ///
    /// Does nothing when tracing is already set up for this builder or when
    /// the [`Config`] component has no `tracing` section. If another global
    /// subscriber is installed it is kept and a warning is logged.
    pub fn build(app: &mut AppBuilder) -> Result<(), StdError> {
        if app.has_component::<Tracing>() {
            return Ok(());
        }
        let config = match app.get_component_ref::<Config>() {
            Some(config) => config.get::<Option<TracingConfig>>(TracingConfig::key())?,
            None => None,
        };
        let Some(config) = config else {
            return Ok(());
        };
        let filter = new_env_filter(&config.directives, config.level)?;
        if let Err(err) = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::Layer::default())
            .try_init()
        {
            tracing::warn!("Cannot install tracing subscriber: {err}");
        }
        app.add_component(Self {
            level: config.level,
            directives: config.directives,
        });
        Ok(())
    }

    pub fn level(&self) -> tracing::Level {
        self.level
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(
        serialize_with = "serialize_level",
        deserialize_with = "deserialize_level",
        default = "default_level"
    )]
    pub level: tracing::Level,
    /// Extra filter directives such as `"bindery=trace"`.
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directives: Default::default(),
        }
    }
}

impl ConfigSection for TracingConfig {
    fn key() -> &'static str {
        "tracing"
    }
}

/// Builds the filter: every directive plus `level` as the default.
pub fn new_env_filter(directives: &[String], level: tracing::Level) -> Result<EnvFilter, StdError> {
    let mut filter = EnvFilter::default();
    for directive in directives {
        let directive: Directive = directive
            .parse()
            .map_err(|err| format!("Invalid tracing directive {directive:?}: {err}"))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter.add_directive(level.into()))
}

fn serialize_level<S>(v: &tracing::Level, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(v.as_str())
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<tracing::Level, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    String::deserialize(deserializer)
        .and_then(|v| tracing::Level::from_str(&v).map_err(|v| Error::custom(format!("{v}"))))
}

fn default_level() -> tracing::Level {
    tracing::Level::INFO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config() {
        let config = Config::parse(r#"{"tracing": {"level": "warn", "directives": ["bindery=trace"]}}"#)
            .unwrap()
            .section::<TracingConfig>()
            .unwrap();
        assert_eq!(config.level, tracing::Level::WARN);
        assert_eq!(config.directives, vec!["bindery=trace".to_string()]);

        let config = Config::parse(r#"{"tracing": {}}"#)
            .unwrap()
            .section::<TracingConfig>()
            .unwrap();
        assert_eq!(config.level, tracing::Level::INFO);
    }

    #[test]
    fn test_invalid_level() {
        let config = Config::parse(r#"{"tracing": {"level": "loud"}}"#).unwrap();
        assert!(config.section::<TracingConfig>().is_err());
    }

    #[test]
    fn test_new_env_filter() {
        assert!(new_env_filter(&["bindery=trace".into()], tracing::Level::INFO).is_ok());
        assert!(new_env_filter(&["bindery=loudest".into()], tracing::Level::INFO).is_err());
    }
}
