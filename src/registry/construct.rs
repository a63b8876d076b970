//! 默认构造层
//!
//! Rust 没有运行时反射，因此默认构造通过能力 trait 表达：
//! 类型实现 [`Constructible`]，声明一组带参数签名的 [`Constructor`]。
//! 解析时按参数个数和运行时类型选择构造函数。

use std::any::Any;
use std::sync::Arc;

use super::args::{Args, Argument};
use crate::config::ConstructorSelection;
use crate::errors::{BoxError, RegistryError};

/// 可以从单个参数中取出的参数类型
///
/// `accepts` 判断参数的运行时类型是否可赋值给该参数类型。
/// 自定义类型使用 [`impl_from_arg!`](crate::impl_from_arg) 声明精确匹配。
pub trait FromArg: Sized + 'static {
    fn accepts(arg: &Argument) -> bool;

    fn from_arg(arg: Argument) -> Option<Self>;

    fn param_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// 为类型实现精确匹配的 [`FromArg`]
///
/// ```
/// use instancer::impl_from_arg;
///
/// #[derive(Debug, Clone)]
/// pub struct Endpoint(String);
///
/// impl_from_arg!(Endpoint);
/// ```
#[macro_export]
macro_rules! impl_from_arg {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::registry::construct::FromArg for $ty {
                fn accepts(arg: &$crate::registry::args::Argument) -> bool {
                    arg.is::<$ty>()
                }

                fn from_arg(arg: $crate::registry::args::Argument) -> Option<Self> {
                    arg.downcast::<$ty>().ok()
                }
            }
        )+
    };
}

// 精确类型，外加可无损转换的来源类型
macro_rules! widening_from_arg {
    ($($target:ident => [$($source:ident),*]);+ $(;)?) => {
        $(
            impl FromArg for $target {
                fn accepts(arg: &Argument) -> bool {
                    arg.is::<$target>() $(|| arg.is::<$source>())*
                }

                fn from_arg(arg: Argument) -> Option<Self> {
                    let arg = match arg.downcast::<$target>() {
                        Ok(value) => return Some(value),
                        Err(arg) => arg,
                    };
                    $(
                        let arg = match arg.downcast::<$source>() {
                            Ok(value) => return Some(<$target>::from(value)),
                            Err(arg) => arg,
                        };
                    )*
                    drop(arg);
                    None
                }
            }
        )+
    };
}

widening_from_arg! {
    i8 => [];
    i16 => [i8, u8];
    i32 => [i8, i16, u8, u16];
    i64 => [i8, i16, i32, u8, u16, u32];
    i128 => [i8, i16, i32, i64, u8, u16, u32, u64];
    isize => [i8, i16, u8];
    u8 => [];
    u16 => [u8];
    u32 => [u8, u16];
    u64 => [u8, u16, u32];
    u128 => [u8, u16, u32, u64];
    usize => [u8, u16];
    f32 => [i8, i16, u8, u16];
    f64 => [f32, i8, i16, i32, u8, u16, u32];
    bool => [];
    char => [];
}

impl_from_arg!(
    &'static str,
    std::path::PathBuf,
    std::time::Duration,
);

impl FromArg for String {
    fn accepts(arg: &Argument) -> bool {
        arg.is::<String>() || arg.is::<&'static str>()
    }

    fn from_arg(arg: Argument) -> Option<Self> {
        match arg.downcast::<String>() {
            Ok(value) => Some(value),
            Err(arg) => arg.downcast::<&'static str>().ok().map(str::to_owned),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromArg for Arc<T> {
    fn accepts(arg: &Argument) -> bool {
        arg.is::<Arc<T>>()
    }

    fn from_arg(arg: Argument) -> Option<Self> {
        arg.downcast::<Arc<T>>().ok()
    }
}

impl<T: Any + Send + Sync> FromArg for Vec<T> {
    fn accepts(arg: &Argument) -> bool {
        arg.is::<Vec<T>>()
    }

    fn from_arg(arg: Argument) -> Option<Self> {
        arg.downcast::<Vec<T>>().ok()
    }
}

/// 构造函数的参数元组
pub trait Params: Sized + 'static {
    /// 参数类型名称，按顺序
    fn signature() -> Vec<&'static str>;

    /// 参数个数与每个参数的类型是否都匹配
    fn matches(args: &Args) -> bool;

    fn extract(args: Args) -> Option<Self>;
}

impl Params for () {
    fn signature() -> Vec<&'static str> {
        Vec::new()
    }

    fn matches(args: &Args) -> bool {
        args.is_empty()
    }

    fn extract(args: Args) -> Option<Self> {
        args.is_empty().then_some(())
    }
}

macro_rules! tuple_params {
    ($($name:ident),+) => {
        impl<$($name: FromArg),+> Params for ($($name,)+) {
            fn signature() -> Vec<&'static str> {
                vec![$($name::param_name()),+]
            }

            fn matches(args: &Args) -> bool {
                let mut iter = args.iter();
                $(
                    if !iter.next().is_some_and(|arg| $name::accepts(arg)) {
                        return false;
                    }
                )+
                iter.next().is_none()
            }

            fn extract(args: Args) -> Option<Self> {
                let mut iter = args.into_iter();
                let params = ($($name::from_arg(iter.next()?)?,)+);
                iter.next().is_none().then_some(params)
            }
        }
    };
}

tuple_params!(A);
tuple_params!(A, B);
tuple_params!(A, B, C);
tuple_params!(A, B, C, D);
tuple_params!(A, B, C, D, E);
tuple_params!(A, B, C, D, E, F);

type BuildFn<T> = dyn Fn(Args) -> Result<T, BoxError> + Send + Sync;

/// 带参数签名的构造函数
pub struct Constructor<T> {
    signature: Vec<&'static str>,
    matches: fn(&Args) -> bool,
    build: Box<BuildFn<T>>,
}

impl<T: 'static> Constructor<T> {
    /// 由参数元组上的闭包创建构造函数
    ///
    /// ```
    /// use instancer::Constructor;
    ///
    /// struct Person { name: String, age: i32 }
    ///
    /// let ctor = Constructor::new(|(name, age): (String, i32)| Person { name, age });
    /// assert_eq!(ctor.arity(), 2);
    /// ```
    pub fn new<P, F>(f: F) -> Self
    where
        P: Params,
        F: Fn(P) -> T + Send + Sync + 'static,
    {
        Self::fallible(move |params: P| Ok(f(params)))
    }

    /// 可能失败的构造函数
    pub fn fallible<P, F>(f: F) -> Self
    where
        P: Params,
        F: Fn(P) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            signature: P::signature(),
            matches: P::matches,
            build: Box::new(move |args: Args| {
                let arity = args.len();
                let params = P::extract(args).ok_or_else(|| {
                    format!("{} arguments do not fit parameters {:?}", arity, P::signature())
                })?;
                f(params)
            }),
        }
    }

    pub fn arity(&self) -> usize {
        self.signature.len()
    }

    /// 形如 `(alloc::string::String, i32)` 的签名
    pub fn signature(&self) -> String {
        format!("({})", self.signature.join(", "))
    }

    /// 参数个数相等且每个参数都可赋值
    pub fn accepts(&self, args: &Args) -> bool {
        self.arity() == args.len() && (self.matches)(args)
    }

    pub fn invoke(&self, args: Args) -> Result<T, BoxError> {
        (self.build)(args)
    }
}

impl<T: Default + 'static> Constructor<T> {
    /// 以 `T::default()` 作为无参构造函数
    pub fn default_ctor() -> Self {
        Self::new(|(): ()| T::default())
    }
}

impl<T> std::fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constructor({})", self.signature.join(", "))
    }
}

/// 可由默认构造层直接实例化的具体类型
pub trait Constructible: Sized + Send + Sync + 'static {
    /// 按声明顺序列出的构造函数
    fn constructors() -> Vec<Constructor<Self>>;
}

/// 具体实例到抽象的转换
///
/// 每个具体类型都可以转换为自身；到 trait 对象的转换用 [`implements!`](crate::implements) 声明。
pub trait Upcast<T: ?Sized> {
    fn upcast(self: Arc<Self>) -> Arc<T>;
}

impl<T: Send + Sync + 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// 声明具体类型实现了哪些抽象
///
/// ```
/// use instancer::implements;
///
/// trait Greeter: Send + Sync {}
/// struct English;
/// impl Greeter for English {}
///
/// implements!(English => dyn Greeter);
/// ```
#[macro_export]
macro_rules! implements {
    ($concrete:ty => $($abstraction:ty),+ $(,)?) => {
        $(
            impl $crate::registry::construct::Upcast<$abstraction> for $concrete {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$abstraction> {
                    self
                }
            }
        )+
    };
}

/// 按参数选择构造函数并实例化
pub(crate) fn construct<T: Constructible>(
    args: Args,
    selection: ConstructorSelection,
) -> Result<T, RegistryError> {
    let type_name = std::any::type_name::<T>();
    let constructors = T::constructors();

    let mut matching = constructors.iter().filter(|ctor| ctor.accepts(&args));
    let Some(chosen) = matching.next() else {
        return Err(RegistryError::NoMatchingConstructor {
            type_name,
            arguments: args.type_names(),
            candidates: constructors.iter().map(Constructor::signature).collect(),
        });
    };

    if selection == ConstructorSelection::Unique {
        let extra = matching.count();
        if extra > 0 {
            return Err(RegistryError::AmbiguousConstructor {
                type_name,
                arguments: args.type_names(),
                matches: extra + 1,
            });
        }
    }

    chosen
        .invoke(args)
        .map_err(|source| RegistryError::Construction { type_name, source })
}
