use crate::{Context, StdError};

/// A type that can be constructed by the container.
///
/// Implementations pull their dependencies out of the activation
/// [`Context`]. With the `macros` feature, `#[derive(Injectable)]` and
/// `#[injectable]` write the implementation from the struct fields or from a
/// `#[factory]` constructor.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use bindery::{App, Bind, Context, Injectable, Resolver, StdError};
///
/// struct Settings {
///     retries: u32,
/// }
///
/// struct Client {
///     settings: Arc<Settings>,
/// }
///
/// impl Injectable for Client {
///     fn inject(ctx: &Context<'_>) -> Result<Self, StdError> {
///         Ok(Self {
///             settings: ctx.get::<Settings>()?,
///         })
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let app = App::builder()
///     .add_binding(Bind::to_constant(Arc::new(Settings { retries: 3 })))
///     .add_binding(Bind::<Client>::to_self())
///     .build()
///     .await?;
///
/// assert_eq!(app.get::<Client>()?.settings.retries, 3);
/// # Ok(())
/// # }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    fn inject(ctx: &Context<'_>) -> Result<Self, StdError>;
}
