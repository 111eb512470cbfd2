//! 核心模块
//!
//! 包含注册器配置。

pub mod config;

pub use config::{LogConfig, RegistrarConfig, RegistrarConfigBuilder, RegistrarSettings};
