//! 注册器配置
//!
//! 定义注册器的配置结构和加载逻辑。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{CoreError, Result};

/// 支持的日志级别
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// 支持的轮转策略
const ROTATIONS: &[&str] = &["minutely", "hourly", "daily", "never"];

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 注册行为设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrarSettings {
    /// 以 info 级别输出注册计划摘要（默认 debug）
    #[serde(default)]
    pub log_plans: bool,
}

/// 注册器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrarConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 注册行为设置
    #[serde(default)]
    pub registrar: RegistrarSettings,
}

impl RegistrarConfig {
    /// 创建配置构建器
    pub fn builder() -> RegistrarConfigBuilder {
        RegistrarConfigBuilder::new()
    }

    /// 从文件加载配置
    ///
    /// 扩展名为 `.json` 时按 JSON 解析，否则按 YAML 解析。加载后会做一次验证。
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CoreError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
        })?;

        let mut config: RegistrarConfig =
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                serde_json::from_str(&content)?
            } else {
                serde_yaml::from_str(&content)?
            };

        config.validate()?;
        config.config_path = Some(path);
        Ok(config)
    }

    /// 合并另一个配置（用于覆盖）
    pub fn merge(&mut self, other: RegistrarConfig) {
        // 只覆盖非默认值的配置
        if other.logging.level != default_log_level() {
            self.logging.level = other.logging.level;
        }
        if other.logging.file_output {
            self.logging.file_output = true;
            self.logging.log_dir = other.logging.log_dir;
        }
        if other.logging.json_format {
            self.logging.json_format = true;
        }
        if other.logging.rotation != default_rotation() {
            self.logging.rotation = other.logging.rotation;
        }
        if other.registrar.log_plans {
            self.registrar.log_plans = true;
        }
        if other.config_path.is_some() {
            self.config_path = other.config_path;
        }
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(CoreError::InvalidConfigValue {
                key: "logging.level".to_string(),
                reason: format!("未知的日志级别 '{}'", self.logging.level),
            });
        }

        let rotation = self.logging.rotation.to_lowercase();
        if !ROTATIONS.contains(&rotation.as_str()) {
            return Err(CoreError::InvalidConfigValue {
                key: "logging.rotation".to_string(),
                reason: format!("未知的轮转策略 '{}'", self.logging.rotation),
            });
        }

        if self.logging.file_output && self.logging.log_dir.is_none() {
            return Err(CoreError::InvalidConfigValue {
                key: "logging.log_dir".to_string(),
                reason: "启用文件日志时必须指定目录".to_string(),
            });
        }

        Ok(())
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct RegistrarConfigBuilder {
    config: RegistrarConfig,
}

impl RegistrarConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: RegistrarConfig::default(),
        }
    }

    /// 设置配置文件路径
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_path = Some(path.into());
        self
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 设置日志轮转策略
    pub fn rotation(mut self, rotation: impl Into<String>) -> Self {
        self.config.logging.rotation = rotation.into();
        self
    }

    /// 以 info 级别输出注册计划
    pub fn log_plans(mut self) -> Self {
        self.config.registrar.log_plans = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> RegistrarConfig {
        self.config
    }
}
