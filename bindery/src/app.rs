use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet, hash_map};
use std::mem::take;
use std::sync::Arc;

use async_trait::async_trait;

use crate::binding::Binding;
use crate::resolve::InstanceCache;
use crate::{AppError, Bind, Scope, ServiceKey, Settings, StdError};

/// The built container: components, bindings and cached instances.
///
/// Components are eagerly supplied values retrieved by type. Bindings are
/// resolved on demand through the [`Resolver`](crate::Resolver) operations.
/// Dropping the app deactivates its singleton and per-thread instances, most
/// recently activated first. Per-thread instances are also deactivated when
/// their thread exits.
///
/// # Examples
///
/// ```rust
/// use bindery::{App, Service, StdError, AddServiceExt as _};
/// use std::sync::Arc;
///
/// struct MyService;
///
/// impl Service for MyService {
///     type Handle = Arc<Self>;
///
///     async fn build(_app: &bindery::AppBuilder) -> Result<Self::Handle, StdError> {
///         Ok(Arc::new(Self))
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = App::builder()
///     .add_service::<MyService>()
///     .build()
///     .await?;
///
/// let service = app.get_component::<Arc<MyService>>().unwrap();
/// # Ok(())
/// # }
/// ```
pub struct App {
    components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pub(crate) bindings: HashMap<TypeId, Vec<Arc<Binding>>>,
    pub(crate) settings: Settings,
    pub(crate) instances: Arc<InstanceCache>,
}

impl App {
    /// Creates a new application builder, the composition root.
    pub fn builder() -> AppBuilder {
        AppBuilder {
            components: HashMap::new(),
            plugins: HashMap::new(),
            pending_plugins: Vec::new(),
            bindings: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Retrieves a clone of the component of type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use bindery::App;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let app = App::builder()
    ///     .add_component("Hello, World!".to_string())
    ///     .build()
    ///     .await?;
    ///
    /// let message = app.get_component::<String>().unwrap();
    /// assert_eq!(message, "Hello, World!");
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_component<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.get_component_ref().cloned()
    }

    pub fn has_component<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.components.contains_key(&type_id)
    }

    pub fn get_component_ref<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.components
            .get(&type_id)
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Opens a scope owning [`Lifetime::Scoped`](crate::Lifetime::Scoped) instances.
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of cached singleton and per-thread instances.
    pub fn cached_instances(&self) -> usize {
        self.instances.len()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.instances.deactivate();
    }
}

/// Builder for an [`App`]: the composition root where components, plugins,
/// services and bindings are declared.
///
/// Plugins run during [`build`](AppBuilder::build) in dependency order and
/// may register anything else, including further plugins.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use bindery::{App, Bind, Resolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let app = App::builder()
///     .add_component("config_value".to_string())
///     .add_binding(Bind::<u32>::to_factory(|ctx| {
///         let value = ctx.get_component_ref::<String>().ok_or("missing config")?;
///         Ok(Arc::new(value.len() as u32))
///     }))
///     .build()
///     .await?;
///
/// assert_eq!(*app.get::<u32>()?, 12);
/// # Ok(())
/// # }
/// ```
pub struct AppBuilder {
    components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    plugins: HashMap<TypeId, Box<dyn DynPlugin>>,
    pending_plugins: Vec<TypeId>,
    bindings: Vec<Binding>,
    settings: Settings,
}

impl AppBuilder {
    /// Adds a plugin to the application builder.
    ///
    /// Plugins are initialized during the build process in dependency order.
    ///
    /// # Panics
    ///
    /// Panics if a plugin of the same type has already been added.
    pub fn add_plugin<T>(&mut self, plugin: T) -> &mut Self
    where
        T: Plugin + 'static,
    {
        let type_id = TypeId::of::<T>();
        match self.plugins.entry(type_id) {
            hash_map::Entry::Occupied(_) => panic!("Plugin {} already added", plugin.name()),
            hash_map::Entry::Vacant(v) => {
                v.insert(Box::new(plugin));
                self.pending_plugins.push(type_id);
            }
        };
        self
    }

    pub fn has_plugin<T>(&self) -> bool
    where
        T: Plugin + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.plugins.contains_key(&type_id)
    }

    /// Adds a component directly to the application builder.
    ///
    /// # Panics
    ///
    /// Panics if a component of the same type has already been added.
    pub fn add_component<T>(&mut self, component: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        match self.components.entry(type_id) {
            hash_map::Entry::Occupied(_) => panic!("Component {} already added", type_name::<T>()),
            hash_map::Entry::Vacant(v) => {
                v.insert(Box::new(component));
            }
        };
        self
    }

    pub fn get_component<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.get_component_ref().cloned()
    }

    pub fn has_component<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.components.contains_key(&type_id)
    }

    pub fn get_component_ref<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.components
            .get(&type_id)
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_component_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        self.components
            .get_mut(&type_id)
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Registers a binding. Several bindings may share a key; they are then
    /// told apart by their conditions or resolved together with
    /// [`get_all`](crate::Resolver::get_all).
    pub fn add_binding<T>(&mut self, bind: Bind<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.bindings.push(bind.into_binding());
        self
    }

    /// Replaces every binding with the key of `bind`.
    pub fn rebind<T>(&mut self, bind: Bind<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = bind.key();
        self.remove_bindings(&key);
        self.add_binding(bind)
    }

    /// Removes the unnamed bindings of `T`.
    pub fn unbind<T>(&mut self) -> &mut Self
    where
        T: ?Sized + 'static,
    {
        self.remove_bindings(&ServiceKey::of::<T>());
        self
    }

    /// Removes the bindings of `T` called `name`.
    pub fn unbind_named<T>(&mut self, name: &str) -> &mut Self
    where
        T: ?Sized + 'static,
    {
        self.remove_bindings(&ServiceKey::named::<T>(name.to_owned()));
        self
    }

    pub fn has_binding<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        let key = ServiceKey::of::<T>();
        self.bindings.iter().any(|v| v.key == key)
    }

    pub fn has_named_binding<T>(&self, name: &str) -> bool
    where
        T: ?Sized + 'static,
    {
        let key = ServiceKey::named::<T>(name.to_owned());
        self.bindings.iter().any(|v| v.key == key)
    }

    fn remove_bindings(&mut self, key: &ServiceKey) {
        self.bindings.retain(|v| &v.key != key);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn with_settings(&mut self, settings: Settings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub async fn build(&mut self) -> Result<App, AppError> {
        let mut graph = HashMap::new();
        let mut used = HashMap::new();
        while !self.pending_plugins.is_empty() {
            let mut order = Vec::new();
            let pending_plugins = take(&mut self.pending_plugins);
            for type_id in &pending_plugins {
                let plugin = &self.plugins[type_id];
                graph.insert(*type_id, plugin.dependencies().plugins);
            }
            let mut ready_plugins = HashSet::new();
            for type_id in pending_plugins {
                if used.contains_key(&type_id) {
                    ready_plugins.insert(type_id);
                    continue;
                }
                if topological_sort(type_id, &graph, &mut order, &mut used)? {
                    ready_plugins.insert(type_id);
                    continue;
                }
                self.pending_plugins.push(type_id);
            }
            if order.is_empty() {
                return Err(AppError::MissingDependency);
            }
            for type_id in order {
                assert!(ready_plugins.remove(&type_id));
                // Safety: mutable AppBuilder never mutably references current plugin.
                let plugin =
                    unsafe { &*(self.plugins[&type_id].as_ref() as *const dyn DynPlugin) };
                tracing::trace!(plugin = plugin.name(), "Building plugin");
                plugin.build(self).await.map_err(AppError::PluginError)?;
            }
            assert!(ready_plugins.is_empty());
        }
        // Drop plugins.
        take(&mut self.plugins);
        let mut bindings: HashMap<TypeId, Vec<Arc<Binding>>> = HashMap::new();
        let binding_count = self.bindings.len();
        for mut binding in take(&mut self.bindings) {
            binding
                .lifetime
                .get_or_insert(self.settings.default_lifetime);
            bindings
                .entry(binding.key.type_id())
                .or_default()
                .push(Arc::new(binding));
        }
        tracing::debug!(
            components = self.components.len(),
            bindings = binding_count,
            "App built"
        );
        Ok(App {
            components: take(&mut self.components),
            bindings,
            settings: self.settings.clone(),
            instances: Arc::default(),
        })
    }
}

enum DependencyStatus {
    Pending,
    Ready,
}

fn topological_sort(
    type_id: TypeId,
    graph: &HashMap<TypeId, HashSet<TypeId>>,
    order: &mut Vec<TypeId>,
    used: &mut HashMap<TypeId, DependencyStatus>,
) -> Result<bool, AppError> {
    let dependencies = match graph.get(&type_id) {
        Some(v) => v,
        None => return Ok(false),
    };
    used.insert(type_id, DependencyStatus::Pending);
    for dep_type_id in dependencies {
        match used.get(dep_type_id) {
            Some(DependencyStatus::Pending) => return Err(AppError::CircularDependency),
            Some(DependencyStatus::Ready) => continue,
            None => {}
        }
        if !topological_sort(*dep_type_id, graph, order, used)? {
            used.remove(&type_id);
            return Ok(false);
        }
    }
    used.insert(type_id, DependencyStatus::Ready);
    order.push(type_id);
    Ok(true)
}

/// Plugins and services a plugin must be built after.
///
/// # Examples
///
/// ```rust
/// use bindery::{Dependencies, Plugin, StdError};
///
/// struct StoragePlugin;
/// struct ApiPlugin;
///
/// impl Plugin for StoragePlugin {
///     async fn build(&self, _app: &mut bindery::AppBuilder) -> Result<(), StdError> {
///         Ok(())
///     }
/// }
///
/// impl Plugin for ApiPlugin {
///     async fn build(&self, _app: &mut bindery::AppBuilder) -> Result<(), StdError> {
///         Ok(())
///     }
///
///     fn dependencies(&self) -> Dependencies {
///         Dependencies::new().plugin::<StoragePlugin>()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Dependencies {
    plugins: HashSet<TypeId>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self {
            plugins: HashSet::new(),
        }
    }

    pub fn plugin<T>(mut self) -> Self
    where
        T: Plugin + 'static,
    {
        self.plugins.insert(TypeId::of::<T>());
        self
    }

    pub fn merge(mut self, other: Dependencies) -> Self {
        self.plugins.extend(other.plugins);
        self
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::new()
    }
}

/// Asynchronous initializer run once while the app is built.
pub trait Plugin: Send + Sync {
    fn build(&self, app: &mut AppBuilder) -> impl Future<Output = Result<(), StdError>> + Send;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new()
    }
}

#[async_trait]
trait DynPlugin: Send + Sync {
    async fn build(&self, app: &mut AppBuilder) -> Result<(), StdError>;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new()
    }

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T> DynPlugin for T
where
    T: Plugin,
{
    async fn build(&self, app: &mut AppBuilder) -> Result<(), StdError> {
        T::build(self, app).await
    }

    fn dependencies(&self) -> Dependencies {
        T::dependencies(self)
    }

    fn name(&self) -> &'static str {
        type_name::<T>()
    }
}
