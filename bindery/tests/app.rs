use std::any::type_name;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bindery::{
    AddServiceExt as _, App, AppBuilder, AppError, Bind, Dependencies, Lifetime, Plugin,
    ResolveError, Resolver as _, ScopedFallback, Service, ServiceDependencyExt as _, Settings,
    StdError,
};

struct PluginA;

impl Plugin for PluginA {
    async fn build(&self, _app: &mut AppBuilder) -> Result<(), StdError> {
        Ok(())
    }
}

struct PluginB;

impl Plugin for PluginB {
    async fn build(&self, _app: &mut AppBuilder) -> Result<(), StdError> {
        Ok(())
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().plugin::<PluginA>()
    }
}

struct PluginC;

impl Plugin for PluginC {
    async fn build(&self, app: &mut AppBuilder) -> Result<(), StdError> {
        app.add_plugin(PluginA);
        Ok(())
    }
}

#[tokio::test]
async fn test_plugins() {
    App::builder()
        .add_plugin(PluginB)
        .add_plugin(PluginC)
        .build()
        .await
        .unwrap();
}

#[tokio::test]
#[should_panic]
async fn test_plugins_duplicates() {
    App::builder()
        .add_plugin(PluginA)
        .add_plugin(PluginB)
        .add_plugin(PluginC)
        .build()
        .await
        .unwrap();
}

struct CyclePluginA;

impl Plugin for CyclePluginA {
    async fn build(&self, _app: &mut AppBuilder) -> Result<(), StdError> {
        Ok(())
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().plugin::<CyclePluginC>()
    }
}

struct CyclePluginB;

impl Plugin for CyclePluginB {
    async fn build(&self, _app: &mut AppBuilder) -> Result<(), StdError> {
        Ok(())
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().plugin::<CyclePluginA>()
    }
}

struct CyclePluginC;

impl Plugin for CyclePluginC {
    async fn build(&self, _app: &mut AppBuilder) -> Result<(), StdError> {
        Ok(())
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().plugin::<CyclePluginB>()
    }
}

#[tokio::test]
async fn test_plugins_circular() {
    assert!(matches!(
        App::builder()
            .add_plugin(CyclePluginA)
            .add_plugin(CyclePluginB)
            .add_plugin(CyclePluginC)
            .build()
            .await,
        Err(AppError::CircularDependency),
    ));
}

#[tokio::test]
async fn test_plugins_missing() {
    assert!(matches!(
        App::builder().add_plugin(CyclePluginA).build().await,
        Err(AppError::MissingDependency)
    ));
}

struct BadPlugin;

impl Plugin for BadPlugin {
    async fn build(&self, _app: &mut AppBuilder) -> Result<(), StdError> {
        Err("Bad plugin".into())
    }
}

#[tokio::test]
async fn test_plugins_bad() {
    assert!(matches!(
        App::builder().add_plugin(BadPlugin).build().await,
        Err(AppError::PluginError(_))
    ));
}

struct ServiceA {}

impl Service for ServiceA {
    type Handle = Arc<Self>;

    async fn build(_app: &AppBuilder) -> Result<Arc<Self>, StdError> {
        Ok(Arc::new(Self {}))
    }
}

struct ServiceB {
    service_a: Arc<ServiceA>,
}

impl Service for ServiceB {
    type Handle = Arc<Self>;

    async fn build(app: &AppBuilder) -> Result<Arc<Self>, StdError> {
        let service_a = app
            .get_component()
            .ok_or(format!("Missing dependency: {}", type_name::<ServiceA>()))?;
        Ok(Arc::new(Self { service_a }))
    }

    fn dependencies() -> Dependencies {
        Dependencies::new().service::<ServiceA>()
    }
}

#[tokio::test]
async fn test_services() {
    App::builder()
        .add_service::<ServiceB>()
        .add_service::<ServiceA>()
        .build()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_services_bad() {
    assert!(matches!(
        App::builder().add_service::<ServiceB>().build().await,
        Err(AppError::MissingDependency)
    ));
}

#[tokio::test]
async fn test_service_handle_is_component() {
    let app = App::builder()
        .add_service::<ServiceB>()
        .add_service::<ServiceA>()
        .build()
        .await
        .unwrap();
    let service_b = app.get_component::<Arc<ServiceB>>().unwrap();
    let service_a = app.get_component::<Arc<ServiceA>>().unwrap();
    assert!(Arc::ptr_eq(&service_b.service_a, &service_a));
}

struct Greeting(String);

struct GreetingPlugin;

impl Plugin for GreetingPlugin {
    async fn build(&self, app: &mut AppBuilder) -> Result<(), StdError> {
        let service_a = app
            .get_component::<Arc<ServiceA>>()
            .ok_or(format!("Missing dependency: {}", type_name::<ServiceA>()))?;
        app.add_binding(Bind::<Greeting>::to_factory(move |_| {
            let _ = &service_a;
            Ok(Arc::new(Greeting("Hello".into())))
        }));
        Ok(())
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().service::<ServiceA>()
    }
}

#[tokio::test]
async fn test_plugin_bindings() {
    let app = App::builder()
        .add_plugin(GreetingPlugin)
        .add_service::<ServiceA>()
        .build()
        .await
        .unwrap();
    assert_eq!(app.get::<Greeting>().unwrap().0, "Hello");
}

#[tokio::test]
async fn test_rebind_and_unbind() {
    let mut builder = App::builder();
    builder
        .add_binding(Bind::<u32>::to_constant(Arc::new(1)))
        .add_binding(Bind::<u32>::to_constant(Arc::new(2)).named("two"))
        .rebind(Bind::<u32>::to_constant(Arc::new(10)));
    assert!(builder.has_binding::<u32>());
    assert!(builder.has_named_binding::<u32>("two"));
    builder.unbind_named::<u32>("two");
    assert!(!builder.has_named_binding::<u32>("two"));
    let app = builder.build().await.unwrap();
    assert_eq!(*app.get::<u32>().unwrap(), 10);
    assert_eq!(app.get_all::<u32>().unwrap().len(), 1);

    let mut builder = App::builder();
    builder
        .add_binding(Bind::<u32>::to_constant(Arc::new(1)))
        .unbind::<u32>();
    assert!(!builder.has_binding::<u32>());
    let app = builder.build().await.unwrap();
    assert!(matches!(app.get::<u32>(), Err(ResolveError::NotBound(_))));
}

#[tokio::test]
async fn test_settings() {
    let app = App::builder()
        .with_settings(Settings {
            default_lifetime: Lifetime::Singleton,
            scoped_fallback: ScopedFallback::Transient,
            max_depth: 8,
        })
        .add_binding(Bind::<Mutex<u32>>::to_factory(|_| Ok(Arc::new(Mutex::new(0)))))
        .build()
        .await
        .unwrap();
    assert_eq!(app.settings().max_depth, 8);
    let a = app.get::<Mutex<u32>>().unwrap();
    let b = app.get::<Mutex<u32>>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(app.cached_instances(), 1);
}

#[tokio::test]
async fn test_app_drop_deactivates_in_reverse_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = App::builder()
        .add_binding(
            Bind::<u8>::to_constant(Arc::new(1)).on_deactivation({
                let log = log.clone();
                move |v| log.lock().unwrap().push(format!("u8 {v}"))
            }),
        )
        .add_binding(
            Bind::<u16>::to_factory(|ctx| Ok(Arc::new(u16::from(*ctx.get::<u8>()?) + 1)))
                .singleton()
                .on_deactivation({
                    let log = log.clone();
                    move |v| log.lock().unwrap().push(format!("u16 {v}"))
                }),
        )
        .build()
        .await
        .unwrap();
    assert_eq!(*app.get::<u16>().unwrap(), 2);
    assert!(log.lock().unwrap().is_empty());
    drop(app);
    assert_eq!(*log.lock().unwrap(), vec!["u16 2".to_string(), "u8 1".to_string()]);
}

#[tokio::test]
async fn test_transient_is_not_deactivated() {
    let counter = Arc::new(AtomicUsize::new(0));
    let app = App::builder()
        .add_binding(
            Bind::<u8>::to_factory(|_| Ok(Arc::new(1))).on_deactivation({
                let counter = counter.clone();
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        )
        .build()
        .await
        .unwrap();
    app.get::<u8>().unwrap();
    app.get::<u8>().unwrap();
    assert_eq!(app.cached_instances(), 0);
    drop(app);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
