//! 日志系统模块
//!
//! 基于 tracing 生态：
//!
//! - 控制台输出（pretty 或 JSON）
//! - 文件输出（非阻塞，按时间轮转）
//! - 按 `RUST_LOG` 或配置的级别过滤
//!
//! # 示例
//!
//! ```rust,no_run
//! use chips_registrar::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//!
//! let config = LoggerConfig::builder()
//!     .level("debug")
//!     .json_format(true)
//!     .file_output("./logs")
//!     .rotation(RotationStrategy::Hourly)
//!     .build();
//!
//! let _guard = Logger::init(config).unwrap();
//!
//! tracing::info!(component = "app::Dashboard", "组件已提交");
//! ```

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::LogConfig;
use crate::utils::{CoreError, Result};

/// 默认日志文件名前缀
pub const DEFAULT_FILE_PREFIX: &str = "chips-registrar";

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转
    Never,
    /// 每分钟（主要用于测试）
    Minutely,
    /// 每小时
    Hourly,
    /// 每天
    #[default]
    Daily,
}

impl RotationStrategy {
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Minutely => Rotation::MINUTELY,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }
}

impl FromStr for RotationStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "never" | "none" => Ok(RotationStrategy::Never),
            "minutely" | "minute" => Ok(RotationStrategy::Minutely),
            "hourly" | "hour" => Ok(RotationStrategy::Hourly),
            "daily" | "day" => Ok(RotationStrategy::Daily),
            other => Err(CoreError::InvalidConfigValue {
                key: "logging.rotation".to_string(),
                reason: format!("未知的轮转策略 '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RotationStrategy::Never => "never",
            RotationStrategy::Minutely => "minutely",
            RotationStrategy::Hourly => "hourly",
            RotationStrategy::Daily => "daily",
        };
        f.write_str(name)
    }
}

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别
    pub level: String,

    /// 是否使用 JSON 格式输出
    pub json_format: bool,

    /// 是否输出到控制台
    pub console_output: bool,

    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,

    /// 日志文件名前缀
    pub file_prefix: String,

    /// 日志轮转策略
    pub rotation: RotationStrategy,

    /// 是否显示目标模块
    pub show_target: bool,

    /// 是否显示文件名和行号
    pub show_file_line: bool,

    /// 额外的过滤指令（EnvFilter 格式），例如 "chips_registrar::registrar=debug"
    pub filter_directives: Option<String>,

    /// 是否启用 ANSI 颜色（仅控制台 pretty 输出）
    pub ansi_colors: bool,

    /// span 关闭时输出耗时（register 的 span 覆盖一次完整注册）
    pub span_timing: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
            span_timing: false,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// 从 [`LogConfig`] 创建
    ///
    /// 未知的轮转策略回退为默认值；`file_output` 为 false 时忽略 `log_dir`。
    pub fn from_log_config(log_config: &LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: log_config.rotation.parse().unwrap_or_default(),
            ..Default::default()
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_timing {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn rotation(mut self, strategy: RotationStrategy) -> Self {
        self.config.rotation = strategy;
        self
    }

    pub fn show_target(mut self, enable: bool) -> Self {
        self.config.show_target = enable;
        self
    }

    pub fn show_file_line(mut self, enable: bool) -> Self {
        self.config.show_file_line = enable;
        self
    }

    /// 追加过滤指令，逗号分隔
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    pub fn span_timing(mut self, enable: bool) -> Self {
        self.config.span_timing = enable;
        self
    }

    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

/// 日志系统守卫
///
/// 持有非阻塞写入器的 WorkerGuard，丢弃时刷新挂起的日志。
#[must_use = "丢弃守卫会立即停止非阻塞写入"]
pub struct LogGuard {
    _console_guard: Option<WorkerGuard>,
    _file_guard: Option<WorkerGuard>,
}

impl LogGuard {
    fn empty() -> Self {
        Self {
            _console_guard: None,
            _file_guard: None,
        }
    }

    /// 是否持有任何写入器
    pub fn is_active(&self) -> bool {
        self._console_guard.is_some() || self._file_guard.is_some()
    }
}

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// 日志系统
pub struct Logger;

impl Logger {
    /// 初始化全局日志
    ///
    /// # Errors
    ///
    /// - 已初始化过时返回 `InitFailed`
    /// - 过滤指令无效时返回 `InvalidConfigValue`
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        if LOGGER_INITIALIZED.get().is_some() {
            return Err(CoreError::InitFailed(
                "日志系统已初始化，不能重复初始化".to_string(),
            ));
        }

        let env_filter = Self::create_env_filter(&config)?;

        let guard = if config.json_format {
            Self::init_json_logger(&config, env_filter)?
        } else {
            Self::init_pretty_logger(&config, env_filter)?
        };

        let _ = LOGGER_INITIALIZED.set(());
        Ok(guard)
    }

    /// 初始化全局日志，失败时返回空守卫
    ///
    /// 适用于测试等可能多次初始化的场景。
    pub fn try_init(config: LoggerConfig) -> LogGuard {
        Self::init(config).unwrap_or_else(|_| LogGuard::empty())
    }

    /// 使用默认配置初始化
    pub fn init_default() -> Result<LogGuard> {
        Self::init(LoggerConfig::default())
    }

    /// 由 [`LogConfig`] 初始化
    pub fn init_from(log_config: &LogConfig) -> Result<LogGuard> {
        Self::init(LoggerConfig::from_log_config(log_config))
    }

    /// `RUST_LOG` 优先，否则使用配置级别，再追加额外指令
    fn create_env_filter(config: &LoggerConfig) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

        if let Some(directives) = &config.filter_directives {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed = directive.parse().map_err(|e| CoreError::InvalidConfigValue {
                    key: "logging.filter_directives".to_string(),
                    reason: format!("'{}': {}", directive, e),
                })?;
                filter = filter.add_directive(parsed);
            }
        }

        Ok(filter)
    }

    fn file_writer(
        config: &LoggerConfig,
    ) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
        config.file_output.as_ref().map(|log_dir| {
            let appender = RollingFileAppender::new(
                config.rotation.to_rotation(),
                log_dir,
                format!("{}.log", config.file_prefix),
            );
            tracing_appender::non_blocking(appender)
        })
    }

    fn init_json_logger(config: &LoggerConfig, env_filter: EnvFilter) -> Result<LogGuard> {
        let mut guard = LogGuard::empty();

        let console_layer = if config.console_output {
            let (writer, console_guard) = tracing_appender::non_blocking(io::stdout());
            guard._console_guard = Some(console_guard);
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(config.show_target)
                    .with_file(config.show_file_line)
                    .with_line_number(config.show_file_line)
                    .with_span_events(config.span_events())
                    .with_ansi(false),
            )
        } else {
            None
        };

        let file_layer = Self::file_writer(config).map(|(writer, file_guard)| {
            guard._file_guard = Some(file_guard);
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(config.show_target)
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_span_events(config.span_events())
                .with_ansi(false)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| CoreError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        Ok(guard)
    }

    fn init_pretty_logger(config: &LoggerConfig, env_filter: EnvFilter) -> Result<LogGuard> {
        let mut guard = LogGuard::empty();

        let console_layer = if config.console_output {
            let (writer, console_guard) = tracing_appender::non_blocking(io::stdout());
            guard._console_guard = Some(console_guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(config.show_target)
                    .with_file(config.show_file_line)
                    .with_line_number(config.show_file_line)
                    .with_span_events(config.span_events())
                    .with_ansi(config.ansi_colors),
            )
        } else {
            None
        };

        // 文件不使用 ANSI
        let file_layer = Self::file_writer(config).map(|(writer, file_guard)| {
            guard._file_guard = Some(file_guard);
            fmt::layer()
                .with_writer(writer)
                .with_target(config.show_target)
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_span_events(config.span_events())
                .with_ansi(false)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| CoreError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        Ok(guard)
    }
}

/// 注册 span 上记录的字段名称
pub mod fields {
    /// 组件类型
    pub const COMPONENT: &str = "component";
    /// 实现目标类别（type / instance）
    pub const IMPLEMENTATION: &str = "implementation";
    /// 发布的能力
    pub const PUBLISHED: &str = "published";
    /// 必需依赖数
    pub const REQUIRED: &str = "required";
    /// 追踪依赖数
    pub const TRACKED: &str = "tracked";
}
