//! 组件注册器错误类型定义
//!
//! 本模块定义了注册器中使用的所有错误类型。

use thiserror::Error;

/// 组件注册器核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 注册错误 ====================

    /// 候选对象不是组件（缺少组件标记）
    #[error("不是组件: '{0}'")]
    NotAComponent(String),

    /// 生命周期管理器拒绝了注册
    #[error("组件注册失败: '{component}' - {reason}")]
    RegistrationFailed {
        component: String,
        reason: String,
    },

    /// 回调钩子收到了类型不符的目标或服务实例
    #[error("回调钩子 '{hook}' 类型不匹配: 期望 {expected}")]
    HookTypeMismatch {
        hook: String,
        expected: String,
    },

    /// 实例的运行时类型与其描述不符
    #[error("实例类型与描述不符: '{0}'")]
    InstanceTypeMismatch(String),

    /// 注册表中找不到组件
    #[error("组件未找到: {0}")]
    ComponentNotFound(String),

    /// 无效的组件描述
    #[error("无效的组件描述: {0}")]
    InvalidDescriptor(String),

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 注册器操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 错误码常量
pub mod error_code {
    // 组件错误 (COMPONENT-xxx)
    pub const COMPONENT_NOT_MARKED: &str = "COMPONENT-001";
    pub const COMPONENT_REGISTRATION_FAILED: &str = "COMPONENT-002";
    pub const COMPONENT_HOOK_MISMATCH: &str = "COMPONENT-003";
    pub const COMPONENT_NOT_FOUND: &str = "COMPONENT-004";
    pub const COMPONENT_INSTANCE_MISMATCH: &str = "COMPONENT-005";

    // 描述错误 (DESCRIPTOR-xxx)
    pub const DESCRIPTOR_INVALID: &str = "DESCRIPTOR-001";
    pub const DESCRIPTOR_FORMAT_ERROR: &str = "DESCRIPTOR-002";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 核心错误 (CORE-xxx)
    pub const CORE_INIT_FAILED: &str = "CORE-001";
    pub const CORE_IO_ERROR: &str = "CORE-002";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::NotAComponent(_) => error_code::COMPONENT_NOT_MARKED,
            CoreError::RegistrationFailed { .. } => error_code::COMPONENT_REGISTRATION_FAILED,
            CoreError::HookTypeMismatch { .. } => error_code::COMPONENT_HOOK_MISMATCH,
            CoreError::ComponentNotFound(_) => error_code::COMPONENT_NOT_FOUND,
            CoreError::InstanceTypeMismatch(_) => error_code::COMPONENT_INSTANCE_MISMATCH,
            CoreError::InvalidDescriptor(_) => error_code::DESCRIPTOR_INVALID,
            CoreError::Json(_) | CoreError::Yaml(_) => error_code::DESCRIPTOR_FORMAT_ERROR,
            CoreError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            CoreError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            CoreError::Io(_) => error_code::CORE_IO_ERROR,
            _ => "UNKNOWN",
        }
    }

    /// 是否由生命周期管理器在提交阶段产生
    pub fn is_external(&self) -> bool {
        matches!(self, CoreError::RegistrationFailed { .. })
    }
}
