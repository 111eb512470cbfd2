//! # Chips Registrar - 薯片组件注册器
//!
//! 把组件类型的元数据翻译为依赖注入注册计划，并提交给外部的生命周期管理器：
//!
//! - **组件元数据**: 组件标记、发布的能力、服务字段（必需依赖）、追踪声明（可选依赖）
//! - **注册翻译**: 纯函数 [`build_plan`]，相同输入总是得到相同计划
//! - **提交**: 通过 [`LifecycleManager`] 的构建器接口，错误原样返回
//! - **清单文件**: 用 YAML 描述不在编译期实现 [`Described`] 的组件
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chips_registrar::{ComponentRegistrar, ComponentRegistry, Described, TypeDescriptor};
//!
//! struct Logger;
//! struct Dashboard;
//!
//! impl Described for Dashboard {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::builder::<Dashboard>()
//!             .component()
//!             .service::<Logger>("logger")
//!             .build()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> chips_registrar::Result<()> {
//!     let registry = Arc::new(ComponentRegistry::new());
//!     let registrar = ComponentRegistrar::new(registry.clone());
//!
//!     registrar.register(Dashboard::descriptor()).await?;
//!     assert_eq!(registry.len().await, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `component` - 组件元数据与清单解析
//! - `registrar` - 注册计划、翻译、管理器接口与内存注册表
//! - `core` - 配置
//! - `utils` - 错误类型与日志

#![warn(rustdoc::missing_crate_level_docs)]

pub mod component;
pub mod core;
pub mod registrar;
pub mod utils;

// 重导出常用类型，方便使用
pub use component::{
    CallbackHooks, Candidate, CapabilityId, ComponentInstance, ComponentManifest, ComponentMarker,
    ComponentType, Described, DescriptorParser, FieldDescriptor, Implementation,
    RequiredDependency, ServiceRef, TrackedDependency, TrackedSet, TypeDescriptor,
    TypeDescriptorBuilder,
};

pub use registrar::{
    build_plan, ComponentRegistrar, ComponentRegistry, DependencyEntry, DependencySpec,
    LifecycleManager, PlanSummary, RegisteredComponent, RegistrationBuilder, RegistrationPlan,
    RegistryStats,
};

pub use utils::{error_code, CoreError, Result};
pub use utils::logger::{fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use core::config::{LogConfig, RegistrarConfig, RegistrarConfigBuilder, RegistrarSettings};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
