//! 注册表解析顺序的集成测试

#![allow(clippy::uninlined_format_args)]

use futures::future;
use instancer::{
    args, implements, Args, Argument, BoxError, Constructible, Constructor, ConstructorSelection,
    Registry, RegistryConfig, RegistryError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 测试用的抽象
trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

/// 默认实现，带两个构造函数
#[derive(Debug)]
struct FormalGreeter {
    name: String,
    times: i32,
    via: &'static str,
}

impl Greeter for FormalGreeter {
    fn greet(&self) -> String {
        format!("Good day, {} x{}", self.name, self.times)
    }
}

impl Constructible for FormalGreeter {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new(|(): ()| FormalGreeter {
                name: "guest".to_string(),
                times: 1,
                via: "()",
            }),
            Constructor::new(|(name, times): (String, i32)| FormalGreeter {
                name,
                times,
                via: "(String, i32)",
            }),
        ]
    }
}

implements!(FormalGreeter => dyn Greeter);

/// 测试替身
struct FakeGreeter(&'static str);

impl Greeter for FakeGreeter {
    fn greet(&self) -> String {
        self.0.to_string()
    }
}

implements!(FakeGreeter => dyn Greeter);

fn fake(text: &'static str) -> Arc<dyn Greeter> {
    Arc::new(FakeGreeter(text))
}

/// 只有带参构造函数的类型
struct Connection {
    url: String,
}

impl Constructible for Connection {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|(url,): (String,)| Connection { url })]
    }
}

fn greet(registry: &Registry, args: Args) -> String {
    registry
        .create_as::<dyn Greeter, FormalGreeter>(args)
        .unwrap()
        .greet()
}

#[test]
fn test_empty_registry_uses_parameterless_constructor() {
    let registry = Registry::new();

    let greeter = registry
        .create_as::<dyn Greeter, FormalGreeter>(args![])
        .unwrap();
    assert_eq!(greeter.greet(), "Good day, guest x1");

    let concrete = registry.create::<FormalGreeter>(args![]).unwrap();
    assert_eq!(concrete.via, "()");
}

#[test]
fn test_missing_parameterless_constructor_fails() {
    let registry = Registry::new();

    let result = registry.create::<Connection>(args![]);
    assert!(matches!(
        result,
        Err(RegistryError::NoMatchingConstructor { .. })
    ));

    let conn = registry.create::<Connection>(args!["db://local"]).unwrap();
    assert_eq!(conn.url, "db://local");
}

#[test]
fn test_one_shot_queue_is_fifo_then_falls_through() {
    let registry = Registry::new();

    registry.set_one(fake("first"));
    registry.set_one(fake("second"));

    assert_eq!(greet(&registry, args![]), "first");
    assert_eq!(greet(&registry, args![]), "second");
    assert_eq!(greet(&registry, args![]), "Good day, guest x1");
}

#[test]
fn test_persistent_stub_is_returned_every_time() {
    let registry = Registry::new();
    let stub = fake("stub");
    registry.set_always(stub.clone());

    for _ in 0..5 {
        let resolved = registry
            .create_as::<dyn Greeter, FormalGreeter>(args![])
            .unwrap();
        assert!(Arc::ptr_eq(&resolved, &stub));
    }
    assert_eq!(registry.pending::<dyn Greeter>(), 0);
}

#[test]
fn test_queue_precedes_factory() {
    let registry = Registry::new();

    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    registry.set_one(fake("queued"));

    assert_eq!(greet(&registry, args![]), "queued");
    assert_eq!(greet(&registry, args![]), "factory");
    assert_eq!(greet(&registry, args![]), "factory");
}

#[test]
fn test_stub_precedes_factory_regardless_of_order() {
    let registry = Registry::new();

    registry.set_always(fake("stub"));
    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));

    assert_eq!(greet(&registry, args![]), "stub");
}

#[test]
fn test_latest_factory_wins() {
    let registry = Registry::new();
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));

    let counter = first_calls.clone();
    registry.set_factory::<dyn Greeter, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(fake("f1"))
    });
    let counter = second_calls.clone();
    registry.set_factory::<dyn Greeter, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(fake("f2"))
    });

    assert_eq!(greet(&registry, args![]), "f2");
    assert_eq!(greet(&registry, args![]), "f2");
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_latest_stub_wins() {
    let registry = Registry::new();

    registry.set_always(fake("old"));
    registry.set_always(fake("new"));

    assert_eq!(greet(&registry, args![]), "new");
}

#[test]
fn test_clear_factory_only_removes_factory() {
    let registry = Registry::new();

    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    registry.set_one(fake("queued"));
    registry.set_always(fake("stub"));
    registry.set_always(Arc::new(Connection {
        url: "stubbed".to_string(),
    }));

    registry.clear_factory::<dyn Greeter>();

    assert!(!registry.has_custom_factory::<dyn Greeter>());
    assert_eq!(registry.pending::<dyn Greeter>(), 1);
    assert!(registry.has_stub::<dyn Greeter>());
    assert_eq!(greet(&registry, args![]), "queued");
    assert_eq!(greet(&registry, args![]), "stub");
    assert_eq!(registry.create::<Connection>(args![]).unwrap().url, "stubbed");
}

#[test]
fn test_clear_all_resets_to_empty() {
    let registry = Registry::new();

    registry.set_one(fake("queued"));
    registry.set_always(fake("stub"));
    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    registry.set_one(Arc::new(Connection {
        url: "queued".to_string(),
    }));

    registry.clear_all();

    assert!(registry.is_empty());
    assert!(!registry.has_custom_factory::<dyn Greeter>());
    assert!(!registry.has_stub::<dyn Greeter>());
    assert_eq!(registry.pending::<dyn Greeter>(), 0);
    assert_eq!(greet(&registry, args![]), "Good day, guest x1");
    assert!(registry.create::<Connection>(args![]).is_err());
}

#[test]
fn test_clear_removes_every_tier_for_one_abstraction() {
    let registry = Registry::new();

    registry.set_one(fake("queued"));
    registry.set_always(fake("stub"));
    registry.set_always(Arc::new(Connection {
        url: "kept".to_string(),
    }));

    registry.clear::<dyn Greeter>();

    assert_eq!(greet(&registry, args![]), "Good day, guest x1");
    assert_eq!(registry.create::<Connection>(args![]).unwrap().url, "kept");
}

#[test]
fn test_has_custom_factory_lifecycle() {
    let registry = Registry::new();
    assert!(!registry.has_custom_factory::<dyn Greeter>());

    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    assert!(registry.has_custom_factory::<dyn Greeter>());

    registry.clear_factory::<dyn Greeter>();
    assert!(!registry.has_custom_factory::<dyn Greeter>());

    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    registry.clear_all();
    assert!(!registry.has_custom_factory::<dyn Greeter>());
}

#[test]
fn test_factory_receives_arguments_in_order() {
    let registry = Registry::new();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    registry.set_factory::<dyn Greeter, _>(move |args: Args| {
        let mut sink = sink.lock().unwrap();
        sink.push(format!("{:?}", args));
        let name = *args.value::<&str>(0).ok_or("missing name")?;
        let times = *args.value::<i32>(1).ok_or("missing times")?;
        sink.push(format!("{}:{}", name, times));
        Ok(fake("factory"))
    });

    registry
        .create_as::<dyn Greeter, FormalGreeter>(args!["x", 42])
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec!["Args(&str, i32)".to_string(), "x:42".to_string()]);
}

#[test]
fn test_default_tier_selects_constructor_by_signature() {
    let registry = Registry::new();

    let greeter = registry.create::<FormalGreeter>(args!["x", 42]).unwrap();
    assert_eq!(greeter.via, "(String, i32)");
    assert_eq!(greeter.name, "x");
    assert_eq!(greeter.times, 42);

    let greeter = registry
        .create_as::<dyn Greeter, FormalGreeter>(args![String::from("y"), 3i16])
        .unwrap();
    assert_eq!(greeter.greet(), "Good day, y x3");

    let result = registry.create::<FormalGreeter>(args![42, "x"]);
    assert!(matches!(
        result,
        Err(RegistryError::NoMatchingConstructor { .. })
    ));
}

#[test]
fn test_abstraction_without_concrete_type() {
    let registry = Registry::new();

    let result = registry.create_abstract::<dyn Greeter>(args![]);
    assert!(matches!(
        result,
        Err(RegistryError::UnconstructibleAbstraction { .. })
    ));

    registry.set_always(fake("stub"));
    let greeter = registry.create_abstract::<dyn Greeter>(args![]).unwrap();
    assert_eq!(greeter.greet(), "stub");
}

#[test]
fn test_overrides_do_not_cross_identities() {
    let registry = Registry::new();

    registry.set_always(fake("abstract stub"));

    // 具体类型与其实现的 trait 是不同的抽象标识
    let concrete = registry.create::<FormalGreeter>(args![]).unwrap();
    assert_eq!(concrete.via, "()");

    registry.set_one(Arc::new(FormalGreeter {
        name: "queued".to_string(),
        times: 9,
        via: "test",
    }));
    assert_eq!(greet(&registry, args![]), "abstract stub");
    assert_eq!(registry.create::<FormalGreeter>(args![]).unwrap().via, "test");
}

#[test]
fn test_factory_error_propagates_unchanged() {
    let registry = Registry::new();

    registry.set_factory::<dyn Greeter, _>(|_| {
        Err::<Arc<dyn Greeter>, BoxError>(anyhow::anyhow!("backend unavailable").into())
    });

    let err = registry
        .create_as::<dyn Greeter, FormalGreeter>(args![])
        .err()
        .unwrap();
    assert!(matches!(err, RegistryError::Factory(_)));
    assert_eq!(err.to_string(), "backend unavailable");
}

#[test]
fn test_registration_type_mismatch_fails_fast() {
    let registry = Registry::new();

    let err = registry
        .try_set_one::<dyn Greeter>(Argument::new("not a greeter"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::TypeMismatch { actual: "&str", .. }));

    // 未给出具体类型时只接受 `Arc<dyn Greeter>`
    let err = registry
        .try_set_always::<dyn Greeter>(Argument::new(Arc::new(FakeGreeter("concrete arc"))))
        .unwrap_err();
    assert!(matches!(err, RegistryError::TypeMismatch { .. }));
    assert!(err.to_string().contains("does not hold"));
    assert!(registry.is_empty());

    registry
        .try_set_always::<dyn Greeter>(Argument::new(fake("erased")))
        .unwrap();
    assert_eq!(greet(&registry, args![]), "erased");
}

#[test]
fn test_erased_concrete_instance_is_upcast() {
    let registry = Registry::new();

    registry
        .try_set_always_as::<dyn Greeter, FakeGreeter>(Argument::new(Arc::new(FakeGreeter(
            "concrete arc",
        ))))
        .unwrap();
    assert_eq!(greet(&registry, args![]), "concrete arc");

    registry
        .try_set_one_as::<dyn Greeter, FakeGreeter>(Argument::new(FakeGreeter("owned")))
        .unwrap();
    assert_eq!(greet(&registry, args![]), "owned");
    assert_eq!(greet(&registry, args![]), "concrete arc");

    registry
        .try_set_one_as::<dyn Greeter, FakeGreeter>(Argument::new(fake("already erased")))
        .unwrap();
    assert_eq!(greet(&registry, args![]), "already erased");

    let err = registry
        .try_set_one_as::<dyn Greeter, FakeGreeter>(Argument::new(42i32))
        .unwrap_err();
    assert!(matches!(err, RegistryError::TypeMismatch { actual: "i32", .. }));
    assert_eq!(registry.pending::<dyn Greeter>(), 0);
}

#[test]
fn test_user_type_parameter_selects_constructor() {
    #[derive(Debug, Clone, PartialEq)]
    struct Endpoint(String);

    instancer::impl_from_arg!(Endpoint);

    struct Client {
        endpoint: Endpoint,
        retries: u32,
    }

    impl Constructible for Client {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new(|(endpoint,): (Endpoint,)| Client {
                    endpoint,
                    retries: 0,
                }),
                Constructor::new(|(endpoint, retries): (Endpoint, u32)| Client {
                    endpoint,
                    retries,
                }),
            ]
        }
    }

    let registry = Registry::new();
    let client = registry
        .create::<Client>(args![Endpoint("db:5432".to_string())])
        .unwrap();
    assert_eq!(client.endpoint, Endpoint("db:5432".to_string()));
    assert_eq!(client.retries, 0);

    let client = registry
        .create::<Client>(args![Endpoint("cache".to_string()), 3u8])
        .unwrap();
    assert_eq!(client.retries, 3);

    let result = registry.create::<Client>(args!["db:5432"]);
    assert!(matches!(
        result,
        Err(RegistryError::NoMatchingConstructor { .. })
    ));
}

#[test]
fn test_clear_queue_falls_through_to_stub() {
    let registry = Registry::new();

    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    registry.set_always(fake("stub"));
    registry.set_one(fake("queued-1"));
    registry.set_one(fake("queued-2"));

    registry.clear_queue::<dyn Greeter>();
    assert_eq!(registry.pending::<dyn Greeter>(), 0);
    assert!(registry.has_stub::<dyn Greeter>());
    assert!(registry.has_custom_factory::<dyn Greeter>());
    assert_eq!(greet(&registry, args![]), "stub");

    registry.clear_always::<dyn Greeter>();
    assert_eq!(greet(&registry, args![]), "factory");
}

#[test]
fn test_unique_selection_reports_ambiguity() {
    struct Amount(i64);

    impl Constructible for Amount {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new(|(value,): (i64,)| Amount(value)),
                Constructor::new(|(value,): (i32,)| Amount(value.into())),
            ]
        }
    }

    let registry = Registry::new();
    assert_eq!(registry.create::<Amount>(args![7i32]).unwrap().0, 7);

    registry.reconfigure(RegistryConfig {
        constructor_selection: ConstructorSelection::Unique,
        ..RegistryConfig::default()
    });
    let result = registry.create::<Amount>(args![7i32]);
    assert!(matches!(
        result,
        Err(RegistryError::AmbiguousConstructor { matches: 2, .. })
    ));
    assert_eq!(registry.create::<Amount>(args![7i64]).unwrap().0, 7);
}

#[test]
fn test_stats_track_tiers() {
    let registry = Registry::new();

    registry.set_one(fake("queued"));
    greet(&registry, args![]);
    registry.set_always(fake("stub"));
    greet(&registry, args![]);
    registry.clear_always::<dyn Greeter>();
    registry.set_factory::<dyn Greeter, _>(|_| Ok(fake("factory")));
    greet(&registry, args![]);
    registry.clear_factory::<dyn Greeter>();
    greet(&registry, args![]);

    let stats = registry.stats();
    assert_eq!(stats.total(), 4);
    assert_eq!(stats.queue_hits, 1);
    assert_eq!(stats.stub_hits, 1);
    assert_eq!(stats.factory_hits, 1);
    assert_eq!(stats.constructed, 1);
    assert_eq!(stats.overridden(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queue_consumption() {
    let registry = Registry::new();
    for i in 0..50 {
        registry.set_one(Arc::new(FormalGreeter {
            name: format!("queued-{}", i),
            times: i,
            via: "queue",
        }));
    }

    // 并发解析
    let mut handles = vec![];
    for _ in 0..100 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.create::<FormalGreeter>(args![]).unwrap()
        }));
    }

    let results = future::join_all(handles).await;

    let mut queued: Vec<i32> = results
        .iter()
        .map(|r| r.as_ref().unwrap())
        .filter(|g| g.via == "queue")
        .map(|g| g.times)
        .collect();
    queued.sort_unstable();

    // 每个排队实例恰好被取出一次
    assert_eq!(queued, (0..50).collect::<Vec<_>>());
    assert_eq!(registry.pending::<FormalGreeter>(), 0);
    assert_eq!(registry.stats().constructed, 50);
}
