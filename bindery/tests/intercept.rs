use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bindery::{
    Advice, App, Bind, Direction, Interceptable, Interceptor, Invocation, InvocationError,
    LoggingInterceptor, MemberKind, Resolver as _, intercept_after, intercept_before,
    intercept_replace, interceptable, interceptor_fn, proxy,
};

#[derive(Debug, thiserror::Error)]
enum CalcError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

#[interceptable]
pub trait Calculator: Send + Sync {
    fn add(&self, a: i32, b: i32) -> i32;

    fn describe(&self, label: &str, values: &[i32]) -> String;

    fn accumulate(&self, total: &mut i64, value: i64);

    fn split(&self, value: i32, #[out] remainder: &mut i32) -> i32;

    fn divide(&self, a: i32, b: i32) -> Result<i32, CalcError>;

    #[member(getter)]
    fn get_precision(&self) -> u8;

    #[member(setter)]
    fn set_precision(&self, value: u8);

    #[member(add)]
    fn add_listener(&self, name: String);

    #[member(remove, name = "listener")]
    fn unsubscribe(&self, name: String);
}

#[derive(Default)]
struct BasicCalculator {
    calls: AtomicUsize,
    precision: Mutex<u8>,
    listeners: Mutex<Vec<String>>,
}

impl Calculator for BasicCalculator {
    fn add(&self, a: i32, b: i32) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        a + b
    }

    fn describe(&self, label: &str, values: &[i32]) -> String {
        format!("{label}: {values:?}")
    }

    fn accumulate(&self, total: &mut i64, value: i64) {
        *total += value;
    }

    fn split(&self, value: i32, remainder: &mut i32) -> i32 {
        *remainder = value % 10;
        value / 10
    }

    fn divide(&self, a: i32, b: i32) -> Result<i32, CalcError> {
        if b == 0 {
            return Err(CalcError::DivisionByZero);
        }
        Ok(a / b)
    }

    fn get_precision(&self) -> u8 {
        *self.precision.lock().unwrap()
    }

    fn set_precision(&self, value: u8) {
        *self.precision.lock().unwrap() = value;
    }

    fn add_listener(&self, name: String) {
        self.listeners.lock().unwrap().push(name);
    }

    fn unsubscribe(&self, name: String) {
        self.listeners.lock().unwrap().retain(|v| v != &name);
    }
}

/// Records `<label>:<member>` before and after each call.
#[derive(Clone)]
struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Interceptor for Recorder {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        let name = invocation.member().name();
        self.log
            .lock()
            .unwrap()
            .push(format!("{} before {name}", self.label));
        invocation.proceed()?;
        self.log
            .lock()
            .unwrap()
            .push(format!("{} after {name}", self.label));
        Ok(())
    }
}

fn calculator(advice: impl IntoIterator<Item = Advice>) -> (Arc<dyn Calculator>, Arc<BasicCalculator>) {
    let target = Arc::new(BasicCalculator::default());
    let proxy = proxy(target.clone() as Arc<dyn Calculator>, advice);
    (proxy, target)
}

#[test]
fn test_members() {
    let members = <dyn Calculator as Interceptable>::members();
    assert_eq!(members.len(), 9);

    let add = &members[0];
    assert_eq!(add.contract(), "Calculator");
    assert_eq!(add.name(), "add");
    assert_eq!(add.kind(), MemberKind::Method);
    assert_eq!(add.return_type(), Some("i32"));
    assert_eq!(add.parameters().len(), 2);
    assert_eq!(add.parameter("b").unwrap().0, 1);
    assert_eq!(add.to_string(), "Calculator::add");

    let accumulate = &members[2];
    assert_eq!(accumulate.return_type(), None);
    assert_eq!(accumulate.parameters()[0].direction(), Direction::Ref);
    assert_eq!(accumulate.parameters()[1].direction(), Direction::In);
    assert_eq!(members[3].parameters()[1].direction(), Direction::Out);
    assert_eq!(members[3].parameters()[1].name(), "remainder");

    assert_eq!(members[5].kind(), MemberKind::Getter);
    assert_eq!(members[5].property(), Some("precision"));
    assert_eq!(members[6].kind(), MemberKind::Setter);
    assert_eq!(members[6].property(), Some("precision"));
    assert_eq!(members[7].kind(), MemberKind::EventAdd);
    assert_eq!(members[7].property(), Some("listener"));
    assert_eq!(members[8].kind(), MemberKind::EventRemove);
    assert_eq!(members[8].property(), Some("listener"));
    assert_eq!(members[0].property(), None);
}

#[test]
fn test_without_advice() {
    let target = Arc::new(BasicCalculator::default()) as Arc<dyn Calculator>;
    let same = proxy(target.clone(), []);
    assert!(Arc::ptr_eq(&target, &same));
}

#[test]
fn test_forwarding() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (calc, target) = calculator([Advice::new(Recorder {
        label: "r",
        log: log.clone(),
    })]);
    assert_eq!(calc.add(2, 3), 5);
    assert_eq!(calc.describe("values", &[1, 2]), "values: [1, 2]");
    calc.set_precision(3);
    assert_eq!(calc.get_precision(), 3);
    calc.add_listener("a".into());
    calc.add_listener("b".into());
    calc.unsubscribe("a".into());
    assert_eq!(*target.listeners.lock().unwrap(), vec!["b".to_string()]);
    assert_eq!(target.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        log.lock().unwrap()[..4],
        [
            "r before add".to_string(),
            "r after add".to_string(),
            "r before describe".to_string(),
            "r after describe".to_string(),
        ]
    );
}

#[test]
fn test_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = |label| Recorder {
        label,
        log: log.clone(),
    };
    let (calc, _) = calculator([
        Advice::new(recorder("outer")).order(-1),
        Advice::new(recorder("last")).order(5),
        Advice::new(recorder("first")),
        Advice::new(recorder("second")),
    ]);
    calc.add(1, 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "outer before add",
            "first before add",
            "second before add",
            "last before add",
            "last after add",
            "second after add",
            "first after add",
            "outer after add",
        ]
    );
}

#[test]
fn test_short_circuit() {
    let (calc, target) = calculator([Advice::new(interceptor_fn(|inv| {
        inv.set_return_value(42);
        Ok(())
    }))
    .only(["add"])]);
    assert_eq!(calc.add(1, 2), 42);
    assert_eq!(target.calls.load(Ordering::SeqCst), 0);
    assert_eq!(calc.divide(9, 3).unwrap(), 3);
}

#[test]
#[should_panic(expected = "Calculator::add")]
fn test_missing_return_value_panics() {
    let (calc, _) = calculator([Advice::new(interceptor_fn(|_| Ok(())))]);
    calc.add(1, 2);
}

#[test]
fn test_rewrite_arguments_and_result() {
    let (calc, _) = calculator([
        Advice::new(intercept_before(|inv| {
            if let Ok(a) = inv.arguments_mut().get_mut::<i32>(0) {
                *a *= 10;
            }
        }))
        .only(["add"]),
        Advice::new(intercept_after(|inv| {
            if let Some(value) = inv.return_value_mut::<i32>() {
                *value += 1;
            }
        }))
        .only(["add"]),
    ]);
    assert_eq!(calc.add(1, 2), 13);
}

#[test]
fn test_ref_and_out_arguments() {
    let (calc, _) = calculator([Advice::new(intercept_after(|inv| {
        if inv.member().name() == "accumulate"
            && let Ok(total) = inv.arguments_mut().get_mut::<i64>(0)
        {
            *total *= 2;
        }
    }))]);
    let mut total = 5;
    calc.accumulate(&mut total, 10);
    assert_eq!(total, 30);

    let mut remainder = 0;
    assert_eq!(calc.split(47, &mut remainder), 4);
    assert_eq!(remainder, 7);
}

#[test]
fn test_out_argument_set_by_interceptor() {
    let (calc, _) = calculator([Advice::new(interceptor_fn(|inv| {
        inv.arguments_mut().set(1, 99)?;
        inv.set_return_value(0);
        Ok(())
    }))
    .only(["split"])]);
    let mut remainder = 0;
    assert_eq!(calc.split(47, &mut remainder), 0);
    assert_eq!(remainder, 99);
}

#[interceptable]
pub trait Buffer: Send + Sync {
    fn fill(&self, buf: &mut Vec<u8>) -> Result<usize, CalcError>;

    fn parse(&self, text: &str) -> Result<u32, String>;
}

struct ByteBuffer;

impl Buffer for ByteBuffer {
    fn fill(&self, buf: &mut Vec<u8>) -> Result<usize, CalcError> {
        buf.push(0);
        Ok(buf.len())
    }

    fn parse(&self, text: &str) -> Result<u32, String> {
        text.parse().map_err(|_| format!("Invalid number: {text}"))
    }
}

fn deny() -> Advice {
    Advice::new(interceptor_fn(|_| {
        Err(InvocationError::Interceptor("denied".into()))
    }))
}

#[test]
fn test_ref_argument_restored_on_failure() {
    let buffer = proxy(Arc::new(ByteBuffer) as Arc<dyn Buffer>, [deny()]);
    let mut buf = vec![1, 2, 3];
    let err = buffer.fill(&mut buf).unwrap_err();
    assert_eq!(err.to_string(), "Interceptor failed: denied");
    assert_eq!(buf, vec![1, 2, 3]);

    let (calc, _) = calculator([deny()]);
    let mut total = 5;
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        calc.accumulate(&mut total, 10);
    }));
    assert!(result.is_err());
    assert_eq!(total, 5);
}

#[test]
fn test_ref_argument_failure_after_proceed() {
    let buffer = proxy(
        Arc::new(ByteBuffer) as Arc<dyn Buffer>,
        [Advice::new(interceptor_fn(|inv| {
            inv.proceed()?;
            Err(InvocationError::Interceptor("rejected".into()))
        }))],
    );
    let mut buf = vec![1];
    assert!(buffer.fill(&mut buf).is_err());
    assert_eq!(buf, vec![1, 0]);
}

#[test]
fn test_result_without_conversion() {
    let buffer = proxy(
        Arc::new(ByteBuffer) as Arc<dyn Buffer>,
        [Advice::new(intercept_before(|_| {}))],
    );
    assert_eq!(buffer.parse("12"), Ok(12));
    assert_eq!(buffer.parse("x"), Err("Invalid number: x".to_string()));
}

#[test]
#[should_panic(expected = "Buffer::parse: Interceptor failed: denied")]
fn test_result_without_conversion_panics() {
    let buffer = proxy(Arc::new(ByteBuffer) as Arc<dyn Buffer>, [deny()]);
    let _ = buffer.parse("12");
}

#[test]
fn test_result_methods() {
    let (calc, _) = calculator([Advice::new(LoggingInterceptor::new())]);
    assert_eq!(calc.divide(10, 2).unwrap(), 5);
    assert!(matches!(calc.divide(1, 0), Err(CalcError::DivisionByZero)));

    let (calc, _) = calculator([Advice::new(interceptor_fn(|_| {
        Err(InvocationError::Interceptor("denied".into()))
    }))
    .only(["divide"])]);
    match calc.divide(10, 2) {
        Err(CalcError::Invocation(err)) => assert_eq!(err.to_string(), "Interceptor failed: denied"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_kind_selectors() {
    let hits = Arc::new(AtomicUsize::new(0));
    let (calc, _) = calculator([Advice::new(intercept_before({
        let hits = hits.clone();
        move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }))
    .kinds([MemberKind::Getter, MemberKind::Setter])]);
    calc.set_precision(2);
    calc.get_precision();
    calc.add(1, 1);
    calc.add_listener("x".into());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_when_selector() {
    let hits = Arc::new(AtomicUsize::new(0));
    let (calc, _) = calculator([Advice::new(intercept_before({
        let hits = hits.clone();
        move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }))
    .when(|m| m.kind().is_event())]);
    calc.add_listener("x".into());
    calc.unsubscribe("x".into());
    calc.set_precision(1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_replace() {
    let (calc, target) = calculator([Advice::new(intercept_replace(|inv| {
        let a = inv.arguments().get::<i32>(0)?;
        let b = inv.arguments().get::<i32>(1)?;
        Ok(a * b)
    }))
    .only(["add"])]);
    assert_eq!(calc.add(3, 4), 12);
    assert_eq!(target.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_proceed_twice() {
    let (calc, target) = calculator([Advice::new(interceptor_fn(|inv| {
        let a = *inv.arguments().get::<i32>(0)?;
        let b = *inv.arguments().get::<i32>(1)?;
        inv.proceed()?;
        let first = inv.take_return_value::<i32>()?;
        inv.arguments_mut().set(0, a)?;
        inv.arguments_mut().set(1, b)?;
        inv.proceed()?;
        let second = inv.take_return_value::<i32>()?;
        inv.set_return_value(first + second);
        Ok(())
    }))
    .only(["add"])]);
    assert_eq!(calc.add(2, 3), 10);
    assert_eq!(target.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_binding_interception() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let deactivated = Arc::new(AtomicUsize::new(0));
    let app = App::builder()
        .add_binding(
            Bind::<dyn Calculator>::to_factory(|_| {
                Ok(Arc::new(BasicCalculator::default()) as Arc<dyn Calculator>)
            })
            .singleton()
            .intercept_with(Recorder {
                label: "binding",
                log: log.clone(),
            })
            .intercept(Advice::new(LoggingInterceptor::new()).only(["add"]))
            .on_deactivation({
                let deactivated = deactivated.clone();
                move |calc| {
                    assert_eq!(calc.add(1, 1), 2);
                    deactivated.fetch_add(1, Ordering::SeqCst);
                }
            }),
        )
        .build()
        .await
        .unwrap();
    let a = app.get::<dyn Calculator>().unwrap();
    let b = app.get::<dyn Calculator>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.add(20, 22), 42);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["binding before add", "binding after add"]
    );
    drop(app);
    assert_eq!(deactivated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_activation_hook_sees_target() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = App::builder()
        .add_binding(
            Bind::<dyn Calculator>::to_factory(|_| {
                Ok(Arc::new(BasicCalculator::default()) as Arc<dyn Calculator>)
            })
            .on_activation(|_, calc| {
                calc.set_precision(4);
                Ok(())
            })
            .intercept_with(Recorder {
                label: "r",
                log: log.clone(),
            }),
        )
        .build()
        .await
        .unwrap();
    let calc = app.get::<dyn Calculator>().unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(calc.get_precision(), 4);
    assert_eq!(*log.lock().unwrap(), vec!["r before get_precision", "r after get_precision"]);
}
