//! # bindery
//!
//! A dependency injection container with explicit registrations, service
//! lifetimes, scopes and method interception.
//!
//! ## Core Concepts
//!
//! - **App / AppBuilder**: the container and its composition root
//! - **Bind**: a registration keyed by type and optional name, with a
//!   [`Lifetime`] (transient, singleton, scoped, per thread), conditions and
//!   activation hooks
//! - **Resolver**: `get`, `get_named`, `try_get`, `get_all` on the app, a
//!   [`Scope`] or an activation [`Context`]
//! - **Injectable**: constructor injection, usually derived
//! - **Interception**: proxies that route calls through an ordered chain of
//!   [`Interceptor`]s before reaching the real service
//! - **Plugin / Service**: asynchronous initialization while the app is built
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use bindery::{App, Bind, Injectable, Resolver};
//!
//! trait Store: Send + Sync {
//!     fn load(&self, key: &str) -> Option<String>;
//! }
//!
//! #[derive(Default)]
//! struct MemoryStore;
//!
//! impl Store for MemoryStore {
//!     fn load(&self, key: &str) -> Option<String> {
//!         Some(format!("value of {key}"))
//!     }
//! }
//!
//! #[derive(Injectable)]
//! struct Handler {
//!     store: Arc<dyn Store>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let app = App::builder()
//!         .add_binding(
//!             Bind::<dyn Store>::to_factory(|_| Ok(Arc::new(MemoryStore) as Arc<dyn Store>))
//!                 .singleton(),
//!         )
//!         .add_binding(Bind::<Handler>::to_self())
//!         .build()
//!         .await?;
//!
//!     let handler = app.get::<Handler>()?;
//!     assert_eq!(handler.store.load("a").as_deref(), Some("value of a"));
//!     Ok(())
//! }
//! ```
//!
//! ## Interception
//!
//! ```rust
//! use std::sync::Arc;
//! use bindery::{App, Bind, LoggingInterceptor, Resolver, interceptable};
//!
//! #[interceptable]
//! pub trait Calculator: Send + Sync {
//!     fn add(&self, a: i32, b: i32) -> i32;
//! }
//!
//! struct Simple;
//!
//! impl Calculator for Simple {
//!     fn add(&self, a: i32, b: i32) -> i32 {
//!         a + b
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let app = App::builder()
//!         .add_binding(
//!             Bind::<dyn Calculator>::to_factory(|_| Ok(Arc::new(Simple) as Arc<dyn Calculator>))
//!                 .intercept_with(LoggingInterceptor::new()),
//!         )
//!         .build()
//!         .await?;
//!
//!     assert_eq!(app.get::<dyn Calculator>()?.add(2, 3), 5);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros` (default): `#[derive(Injectable)]`, `#[injectable]` with
//!   `#[factory]`, and `#[interceptable]`

mod app;
mod binding;
mod error;
mod injectable;
mod intercept;
mod key;
mod lifetime;
mod resolve;
mod scope;
mod service;

pub use app::*;
pub use binding::{Bind, Instance, Metadata};
pub use error::*;
pub use injectable::*;
pub use intercept::*;
pub use key::*;
pub use lifetime::*;
pub use resolve::*;
pub use scope::*;
pub use service::*;

#[cfg(feature = "macros")]
pub use bindery_macros::*;
