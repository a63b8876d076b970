//! 构造参数
//!
//! `Args` 是一次 `create` 调用携带的有序参数列表。参数以类型擦除的形式保存，
//! 同时记录其运行时类型名称，用于构造函数匹配与错误信息。

use std::any::Any;
use std::fmt;

/// 单个类型擦除的参数
pub struct Argument {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Argument {
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<V>(),
        }
    }

    /// 参数的运行时类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<V: Any>(&self) -> bool {
        self.value.is::<V>()
    }

    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref::<V>()
    }

    /// 取出参数值；类型不符时原样返回
    pub fn downcast<V: Any>(self) -> Result<V, Self> {
        let type_name = self.type_name;
        match self.value.downcast::<V>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { value, type_name }),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Argument<{}>", self.type_name)
    }
}

/// 有序参数列表
#[derive(Default)]
pub struct Args {
    items: Vec<Argument>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个参数
    pub fn push<V: Any + Send + Sync>(&mut self, value: V) {
        self.items.push(Argument::new(value));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按位置借用参数值
    pub fn value<V: Any>(&self, index: usize) -> Option<&V> {
        self.items.get(index).and_then(Argument::downcast_ref::<V>)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.items.iter()
    }

    /// 各参数的运行时类型名称，按顺序
    pub fn type_names(&self) -> Vec<&'static str> {
        self.items.iter().map(Argument::type_name).collect()
    }
}

impl IntoIterator for Args {
    type Item = Argument;
    type IntoIter = std::vec::IntoIter<Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Args({})", self.type_names().join(", "))
    }
}

/// 构建参数列表
///
/// ```
/// use instancer::args;
///
/// let args = args!["name", 42];
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.value::<i32>(1), Some(&42));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::registry::args::Args::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut args = $crate::registry::args::Args::new();
        $(args.push($value);)+
        args
    }};
}
