use thiserror::Error;

/// 工厂与构造函数使用的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 注册表解析过程中的错误
#[derive(Debug, Error)]
pub enum RegistryError {
    /// 具体类型没有接受所给参数的构造函数
    #[error(
        "No constructor of {type_name} accepts ({}); available: [{}]",
        .arguments.join(", "),
        .candidates.join("; ")
    )]
    NoMatchingConstructor {
        type_name: &'static str,
        arguments: Vec<&'static str>,
        candidates: Vec<String>,
    },

    /// 要求唯一匹配时有多个构造函数匹配
    #[error(
        "Ambiguous construction of {type_name} with ({}): {} constructors match",
        .arguments.join(", "),
        .matches
    )]
    AmbiguousConstructor {
        type_name: &'static str,
        arguments: Vec<&'static str>,
        matches: usize,
    },

    /// 请求纯抽象且没有任何覆盖拦截
    #[error("Cannot construct abstraction {type_name}: no override registered and no concrete type supplied")]
    UnconstructibleAbstraction { type_name: &'static str },

    /// 自定义工厂失败；显示内容与来源均为工厂自身的错误
    #[error(transparent)]
    Factory(BoxError),

    /// 可失败的构造函数返回错误
    #[error("Constructor of {type_name} failed: {source}")]
    Construction {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    /// 类型擦除的覆盖参数没有持有所需的实例类型
    #[error("Argument of type {actual} does not hold an instance of {expected}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// 覆盖槽中保存的值与抽象的实例类型不符
    #[error("Type cast failed: expected {expected}")]
    TypeCastFailed { expected: &'static str },
}

impl RegistryError {
    /// 错误是否来自用户代码（工厂或构造函数体），而非注册表自身的解析规则
    pub fn is_user_failure(&self) -> bool {
        matches!(
            self,
            RegistryError::Factory(_) | RegistryError::Construction { .. }
        )
    }
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
