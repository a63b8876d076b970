//! 实例解析注册表
//!
//! 调用方用 `create` 代替直接构造对象，测试代码可以在不改变调用结构的前提下
//! 替换构造结果。每个抽象（trait 对象或具体类型）有三层覆盖，按固定顺序检查：
//! - 一次性队列：先进先出，每次解析消费一个实例
//! - 持久替身：每次解析都返回同一个实例，直到被清除
//! - 自定义工厂：每次解析都以调用参数重新调用
//!
//! 都未命中时进入默认构造层，按参数选择 [`Constructible`] 类型的构造函数。

pub mod args;
pub mod construct;
pub mod global;
mod stats;

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use self::args::{Args, Argument};
use self::construct::{Constructible, Upcast};
use self::stats::InnerStats;
use crate::config::{ConstructorSelection, RegistryConfig};
use crate::errors::{BoxError, RegistryError};

pub use self::stats::RegistryStats;

/// 解析层级，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// 一次性队列
    Queue,
    /// 持久替身
    Stub,
    /// 自定义工厂
    Factory,
    /// 默认构造
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Queue => "queue",
            Tier::Stub => "stub",
            Tier::Factory => "factory",
            Tier::Default => "default",
        };
        f.write_str(name)
    }
}

type FactoryFn<T> = dyn Fn(Args) -> Result<Arc<T>, BoxError> + Send + Sync;

/// 类型擦除的槽位内容：`Arc<T>` 或 `Arc<FactoryFn<T>>`
type Erased = Box<dyn Any + Send + Sync>;

/// 单个抽象的全部覆盖状态
struct Overrides {
    type_name: &'static str,
    queue: VecDeque<Erased>,
    stub: Option<Erased>,
    factory: Option<Erased>,
}

impl Overrides {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            queue: VecDeque::new(),
            stub: None,
            factory: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.stub.is_none() && self.factory.is_none()
    }
}

enum Hit<T: ?Sized> {
    Queued(Arc<T>),
    Stub(Arc<T>),
    Factory(Arc<FactoryFn<T>>),
}

enum Interception<T: ?Sized> {
    Resolved(Arc<T>, Tier),
    Fallthrough(Args),
}

fn cast_failed<T: ?Sized>() -> RegistryError {
    RegistryError::TypeCastFailed {
        expected: type_name::<T>(),
    }
}

/// 实例解析注册表
///
/// 克隆得到的注册表共享同一份状态。
#[derive(Clone)]
pub struct Registry {
    /// 按抽象标识保存的覆盖状态；同一抽象的检查与出队在同一把分片锁内完成
    entries: Arc<DashMap<TypeId, Overrides>>,
    config: Arc<RwLock<RegistryConfig>>,
    stats: Arc<InnerStats>,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config: Arc::new(RwLock::new(config)),
            stats: Arc::new(InnerStats::default()),
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config.read().clone()
    }

    /// 替换配置，已注册的覆盖不受影响
    pub fn reconfigure(&self, config: RegistryConfig) {
        tracing::debug!(?config, "Registry reconfigured");
        *self.config.write() = config;
    }

    fn entry<T: ?Sized + 'static>(&self) -> RefMut<'_, TypeId, Overrides> {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Overrides::new(type_name::<T>()))
    }

    fn with_existing<T: ?Sized + 'static>(&self, update: impl FnOnce(&mut Overrides)) {
        if let Some(mut entry) = self.entries.get_mut(&TypeId::of::<T>()) {
            update(entry.value_mut());
        }
    }

    fn inspect<T: ?Sized + 'static, R>(&self, read: impl FnOnce(&Overrides) -> R) -> Option<R> {
        self.entries.get(&TypeId::of::<T>()).map(|entry| read(entry.value()))
    }

    /// 追加到 `T` 的一次性队列尾部
    pub fn set_one<T: ?Sized + Send + Sync + 'static>(&self, instance: Arc<T>) {
        let mut entry = self.entry::<T>();
        entry.queue.push_back(Box::new(instance));
        tracing::debug!(
            abstraction = entry.type_name,
            pending = entry.queue.len(),
            "One-shot override queued"
        );
    }

    /// 设置 `T` 的持久替身，覆盖之前的替身
    pub fn set_always<T: ?Sized + Send + Sync + 'static>(&self, instance: Arc<T>) {
        let mut entry = self.entry::<T>();
        entry.stub = Some(Box::new(instance));
        tracing::debug!(abstraction = entry.type_name, "Persistent stub set");
    }

    /// 设置 `T` 的自定义工厂，覆盖之前的工厂
    ///
    /// 工厂按顺序收到 `create` 的参数，结果不会被缓存。
    pub fn set_factory<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Args) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let factory: Arc<FactoryFn<T>> = Arc::new(factory);
        let mut entry = self.entry::<T>();
        entry.factory = Some(Box::new(factory));
        tracing::debug!(abstraction = entry.type_name, "Custom factory set");
    }

    /// 以类型擦除的参数追加一次性覆盖；参数必须持有 `Arc<T>`
    pub fn try_set_one<T: ?Sized + Send + Sync + 'static>(
        &self,
        instance: Argument,
    ) -> Result<(), RegistryError> {
        let instance = Self::typed_instance::<T>(instance)?;
        self.set_one(instance);
        Ok(())
    }

    /// 以类型擦除的参数设置持久替身；参数必须持有 `Arc<T>`
    pub fn try_set_always<T: ?Sized + Send + Sync + 'static>(
        &self,
        instance: Argument,
    ) -> Result<(), RegistryError> {
        let instance = Self::typed_instance::<T>(instance)?;
        self.set_always(instance);
        Ok(())
    }

    /// 同 [`Registry::try_set_one`]，另外接受具体类型 `C` 的实例（`C` 或 `Arc<C>`）并向上转换为 `T`
    pub fn try_set_one_as<T, C>(&self, instance: Argument) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Upcast<T> + Send + Sync + 'static,
    {
        let instance = Self::upcast_instance::<T, C>(instance)?;
        self.set_one(instance);
        Ok(())
    }

    /// 同 [`Registry::try_set_always`]，另外接受具体类型 `C` 的实例（`C` 或 `Arc<C>`）并向上转换为 `T`
    pub fn try_set_always_as<T, C>(&self, instance: Argument) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Upcast<T> + Send + Sync + 'static,
    {
        let instance = Self::upcast_instance::<T, C>(instance)?;
        self.set_always(instance);
        Ok(())
    }

    fn typed_instance<T: ?Sized + Send + Sync + 'static>(
        instance: Argument,
    ) -> Result<Arc<T>, RegistryError> {
        let actual = instance.type_name();
        instance
            .downcast::<Arc<T>>()
            .map_err(|_| RegistryError::TypeMismatch {
                expected: type_name::<Arc<T>>(),
                actual,
            })
    }

    fn upcast_instance<T, C>(instance: Argument) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Upcast<T> + Send + Sync + 'static,
    {
        let actual = instance.type_name();
        let instance = match instance.downcast::<Arc<T>>() {
            Ok(instance) => return Ok(instance),
            Err(instance) => instance,
        };
        let instance = match instance.downcast::<Arc<C>>() {
            Ok(concrete) => return Ok(<C as Upcast<T>>::upcast(concrete)),
            Err(instance) => instance,
        };
        instance
            .downcast::<C>()
            .map(|concrete| <C as Upcast<T>>::upcast(Arc::new(concrete)))
            .map_err(|_| RegistryError::TypeMismatch {
                expected: type_name::<C>(),
                actual,
            })
    }

    pub fn has_custom_factory<T: ?Sized + 'static>(&self) -> bool {
        self.inspect::<T, _>(|entry| entry.factory.is_some())
            .unwrap_or(false)
    }

    pub fn has_stub<T: ?Sized + 'static>(&self) -> bool {
        self.inspect::<T, _>(|entry| entry.stub.is_some())
            .unwrap_or(false)
    }

    /// `T` 的一次性队列中尚未消费的实例数
    pub fn pending<T: ?Sized + 'static>(&self) -> usize {
        self.inspect::<T, _>(|entry| entry.queue.len())
            .unwrap_or(0)
    }

    /// 只移除 `T` 的自定义工厂
    pub fn clear_factory<T: ?Sized + 'static>(&self) {
        self.with_existing::<T>(|entry| entry.factory = None);
        tracing::debug!(abstraction = type_name::<T>(), "Custom factory cleared");
    }

    /// 只移除 `T` 的持久替身
    pub fn clear_always<T: ?Sized + 'static>(&self) {
        self.with_existing::<T>(|entry| entry.stub = None);
        tracing::debug!(abstraction = type_name::<T>(), "Persistent stub cleared");
    }

    /// 清空 `T` 的一次性队列
    pub fn clear_queue<T: ?Sized + 'static>(&self) {
        self.with_existing::<T>(|entry| entry.queue.clear());
        tracing::debug!(abstraction = type_name::<T>(), "One-shot queue cleared");
    }

    /// 移除 `T` 的全部覆盖
    pub fn clear<T: ?Sized + 'static>(&self) {
        self.entries.remove(&TypeId::of::<T>());
        tracing::debug!(abstraction = type_name::<T>(), "Overrides cleared");
    }

    /// 移除所有抽象的全部覆盖，回到初始的空状态
    ///
    /// 统计信息与配置保持不变，见 [`Registry::reset_stats`]。
    pub fn clear_all(&self) {
        self.entries.clear();
        tracing::debug!("All overrides cleared");
    }

    /// 没有任何抽象持有生效的覆盖
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|entry| entry.is_empty())
    }

    /// 解析可直接构造的类型 `T`
    pub fn create<T: Constructible>(&self, args: Args) -> Result<Arc<T>, RegistryError> {
        self.resolve_with::<T, _>(args, |args, selection| {
            construct::construct::<T>(args, selection).map(Arc::new)
        })
    }

    /// 解析抽象 `T`，默认构造层实例化具体类型 `C`
    pub fn create_as<T, C>(&self, args: Args) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Constructible + Upcast<T>,
    {
        self.resolve_with::<T, _>(args, |args, selection| {
            let concrete = construct::construct::<C>(args, selection)?;
            Ok(<C as Upcast<T>>::upcast(Arc::new(concrete)))
        })
    }

    /// 解析没有具体类型的抽象 `T`；未被覆盖拦截时失败
    pub fn create_abstract<T: ?Sized + Send + Sync + 'static>(
        &self,
        args: Args,
    ) -> Result<Arc<T>, RegistryError> {
        self.resolve_with::<T, _>(args, |_, _| {
            Err(RegistryError::UnconstructibleAbstraction {
                type_name: type_name::<T>(),
            })
        })
    }

    fn resolve_with<T, F>(&self, args: Args, fallback: F) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(Args, ConstructorSelection) -> Result<Arc<T>, RegistryError>,
    {
        let outcome = match self.intercept::<T>(args) {
            Ok(Interception::Resolved(instance, tier)) => Ok((instance, tier)),
            Ok(Interception::Fallthrough(args)) => {
                let selection = self.config.read().constructor_selection;
                fallback(args, selection).map(|instance| (instance, Tier::Default))
            }
            Err(err) => Err(err),
        };

        let record_stats = self.config.read().record_stats;
        match outcome {
            Ok((instance, tier)) => {
                if record_stats {
                    self.stats.record(tier);
                }
                tracing::trace!(abstraction = type_name::<T>(), %tier, "Instance resolved");
                Ok(instance)
            }
            Err(err) => {
                if record_stats {
                    self.stats.record_failure();
                }
                tracing::debug!(abstraction = type_name::<T>(), error = %err, "Resolution failed");
                Err(err)
            }
        }
    }

    /// 按 队列 -> 替身 -> 工厂 的顺序检查覆盖层
    fn intercept<T: ?Sized + Send + Sync + 'static>(
        &self,
        args: Args,
    ) -> Result<Interception<T>, RegistryError> {
        // 分片锁只在取出命中项期间持有，工厂在锁外调用
        let hit = match self.entries.get_mut(&TypeId::of::<T>()) {
            Some(mut entry) => {
                if let Some(queued) = entry.queue.pop_front() {
                    let instance = queued.downcast::<Arc<T>>().map_err(|_| cast_failed::<T>())?;
                    Some(Hit::Queued(*instance))
                } else if let Some(stub) = &entry.stub {
                    let instance = stub
                        .downcast_ref::<Arc<T>>()
                        .cloned()
                        .ok_or_else(cast_failed::<T>)?;
                    Some(Hit::Stub(instance))
                } else if let Some(factory) = &entry.factory {
                    let factory = factory
                        .downcast_ref::<Arc<FactoryFn<T>>>()
                        .cloned()
                        .ok_or_else(cast_failed::<T>)?;
                    Some(Hit::Factory(factory))
                } else {
                    None
                }
            }
            None => None,
        };

        match hit {
            Some(Hit::Queued(instance)) => Ok(Interception::Resolved(instance, Tier::Queue)),
            Some(Hit::Stub(instance)) => Ok(Interception::Resolved(instance, Tier::Stub)),
            Some(Hit::Factory(factory)) => {
                let instance = (*factory)(args).map_err(RegistryError::Factory)?;
                Ok(Interception::Resolved(instance, Tier::Factory))
            }
            None => Ok(Interception::Fallthrough(args)),
        }
    }

    /// 获取解析统计信息
    pub fn stats(&self) -> RegistryStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abstractions: Vec<&'static str> =
            self.entries.iter().map(|entry| entry.type_name).collect();
        f.debug_struct("Registry")
            .field("abstractions", &abstractions)
            .field("config", &*self.config.read())
            .finish()
    }
}
