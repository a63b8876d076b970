//! 进程级注册表
//!
//! 全局实例就是一个普通的 [`Registry`]，以下自由函数一一委托给它的同名方法。
//! 测试之间用 [`clear_all`] 复位；需要隔离时应显式创建并传递 `Registry`。

use std::sync::Arc;

use super::args::Args;
use super::construct::{Constructible, Upcast};
use super::Registry;
use crate::config::RegistryConfig;
use crate::errors::{BoxError, RegistryError};

lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: Registry = Registry::new();
}

/// 获取全局注册表
pub fn global() -> &'static Registry {
    &GLOBAL_REGISTRY
}

pub fn configure(config: RegistryConfig) {
    global().reconfigure(config);
}

pub fn set_one<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) {
    global().set_one(instance);
}

pub fn set_always<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) {
    global().set_always(instance);
}

pub fn set_factory<T, F>(factory: F)
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(Args) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
{
    global().set_factory::<T, F>(factory);
}

pub fn has_custom_factory<T: ?Sized + 'static>() -> bool {
    global().has_custom_factory::<T>()
}

pub fn clear_factory<T: ?Sized + 'static>() {
    global().clear_factory::<T>();
}

pub fn clear<T: ?Sized + 'static>() {
    global().clear::<T>();
}

pub fn clear_all() {
    global().clear_all();
}

pub fn create<T: Constructible>(args: Args) -> Result<Arc<T>, RegistryError> {
    global().create::<T>(args)
}

pub fn create_as<T, C>(args: Args) -> Result<Arc<T>, RegistryError>
where
    T: ?Sized + Send + Sync + 'static,
    C: Constructible + Upcast<T>,
{
    global().create_as::<T, C>(args)
}

pub fn create_abstract<T: ?Sized + Send + Sync + 'static>(
    args: Args,
) -> Result<Arc<T>, RegistryError> {
    global().create_abstract::<T>(args)
}
