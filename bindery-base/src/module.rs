use std::any::type_name;

use bindery::{AppBuilder, Dependencies, Plugin, StdError};

/// A named bundle of registrations.
///
/// Modules are loaded as plugins, so a module can rely on registrations and
/// components of the modules it lists in [`Module::dependencies`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use bindery::{App, AppBuilder, Bind, Resolver, StdError};
/// use bindery_base::{LoadModuleExt, Module};
///
/// struct GreetingModule;
///
/// impl Module for GreetingModule {
///     fn load(&self, app: &mut AppBuilder) -> Result<(), StdError> {
///         app.add_binding(Bind::<String>::to_constant(Arc::new("Hello".into())));
///         Ok(())
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let app = App::builder().load_module(GreetingModule).build().await?;
/// assert_eq!(app.get::<String>()?.as_str(), "Hello");
/// # Ok(())
/// # }
/// ```
pub trait Module: Send + Sync + 'static {
    fn load(&self, app: &mut AppBuilder) -> Result<(), StdError>;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new()
    }

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

struct ModulePlugin<M>(M);

impl<M> Plugin for ModulePlugin<M>
where
    M: Module,
{
    async fn build(&self, app: &mut AppBuilder) -> Result<(), StdError> {
        tracing::debug!(module = self.0.name(), "Loading module");
        self.0
            .load(app)
            .map_err(|err| format!("Cannot load module {}: {err}", self.0.name()).into())
    }

    fn dependencies(&self) -> Dependencies {
        self.0.dependencies()
    }
}

/// Module loading methods for [`AppBuilder`].
pub trait LoadModuleExt {
    fn load_module<M>(&mut self, module: M) -> &mut Self
    where
        M: Module;

    fn has_module<M>(&self) -> bool
    where
        M: Module;
}

impl LoadModuleExt for AppBuilder {
    /// # Panics
    ///
    /// Panics if a module of the same type has already been loaded.
    fn load_module<M>(&mut self, module: M) -> &mut Self
    where
        M: Module,
    {
        self.add_plugin(ModulePlugin(module))
    }

    fn has_module<M>(&self) -> bool
    where
        M: Module,
    {
        self.has_plugin::<ModulePlugin<M>>()
    }
}

/// Module dependency declarations for [`Dependencies`].
pub trait ModuleDependencyExt {
    fn module<M>(self) -> Self
    where
        M: Module;
}

impl ModuleDependencyExt for Dependencies {
    fn module<M>(self) -> Self
    where
        M: Module,
    {
        self.plugin::<ModulePlugin<M>>()
    }
}
