//! # bindery-base
//!
//! Ambient services for bindery applications: JSON configuration with typed
//! sections, container settings read from configuration, tracing setup, and
//! modules that group registrations.
//!
//! ## Configuration Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bindery::{App, Lifetime, Resolver};
//! use bindery_base::{Config, ConfigSection, ConfigureExt};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct DatabaseConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl ConfigSection for DatabaseConfig {
//!     fn key() -> &'static str {
//!         "database"
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = Config::parse(r#"{
//!     "kernel": {"default_lifetime": "singleton"},
//!     "database": {"host": "localhost", "port": 5432}
//! }"#)?;
//!
//! let app = App::builder()
//!     .add_component(config)
//!     .configure_kernel()?
//!     .bind_config_section::<DatabaseConfig>()?
//!     .build()
//!     .await?;
//!
//! assert_eq!(app.settings().default_lifetime, Lifetime::Singleton);
//! let database: Arc<DatabaseConfig> = app.get()?;
//! println!("Database: {}:{}", database.host, database.port);
//! # Ok(())
//! # }
//! ```

mod config;
mod module;
mod tracing;

pub use config::*;
pub use module::*;
pub use tracing::*;
