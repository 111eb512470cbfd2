//! 注册模块
//!
//! - [`manager`] - 生命周期管理器接口
//! - [`plan`] - 注册计划
//! - [`translator`] - 元数据到注册计划的翻译与提交
//! - [`registry`] - 内存中的生命周期管理器实现

pub mod manager;
pub mod plan;
pub mod registry;
pub mod translator;

pub use manager::{DependencySpec, LifecycleManager, RegistrationBuilder};
pub use plan::{CallbackNames, DependencyEntry, DependencySummary, PlanSummary, RegistrationPlan};
pub use registry::{
    ComponentRegistry, PendingDependency, PendingRegistration, RegisteredComponent,
    RegisteredDependency, RegistryStats,
};
pub use translator::{build_plan, ComponentRegistrar};
