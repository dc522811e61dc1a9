//! Method interception.
//!
//! A proxy implements a contract by routing each member call through an
//! [`InterceptorChain`]: an ordered list of [`Interceptor`]s that ends in the
//! real target. Each interceptor receives the [`Invocation`], may inspect or
//! rewrite its [`Arguments`] and return value, and either forwards the call
//! with [`Invocation::proceed`] or short-circuits it.
//!
//! Proxies are generated at compile time by `#[interceptable]`, or written by
//! hand against the same API (see [`Interceptable`]). Bindings attach advice
//! with [`Bind::intercept_with`](crate::Bind::intercept_with).

mod arguments;
mod chain;
mod interceptors;
mod invocation;
mod member;
mod proxy;

pub use arguments::*;
pub use chain::*;
pub use interceptors::*;
pub use invocation::*;
pub use member::*;
pub use proxy::*;
