//! 生命周期管理器接口
//!
//! 注册器只通过这组 trait 与外部生命周期管理器交互。管理器负责实例化、
//! 依赖解析、启停顺序以及追踪钩子的调用。

use async_trait::async_trait;

use crate::component::{CallbackHooks, CapabilityId, Implementation};
use crate::utils::Result;

/// 依赖描述
///
/// 描述一条依赖边。
pub trait DependencySpec: Send {
    /// 设置依赖的能力
    fn set_capability(&mut self, capability: &CapabilityId);

    /// 设置是否为必需依赖
    fn set_mandatory(&mut self, mandatory: bool);

    /// 设置 add/remove 钩子（仅对可选依赖有意义）
    ///
    /// `hooks` 为组件作者提供的函数引用；为 None 时管理器按名称查找。
    fn set_callback_hooks(&mut self, add: &str, remove: &str, hooks: Option<CallbackHooks>);
}

/// 注册构建器
///
/// 由管理器创建，提交前不产生任何效果。
pub trait RegistrationBuilder: Send {
    /// 对应的依赖描述类型
    type Dependency: DependencySpec;

    /// 设置实现目标
    fn set_implementation(&mut self, implementation: Implementation);

    /// 设置对外发布的能力
    fn set_published_capabilities(&mut self, capabilities: &[CapabilityId]);

    /// 添加依赖
    fn add_dependency(&mut self, dependency: Self::Dependency);
}

/// 生命周期管理器
#[async_trait]
pub trait LifecycleManager: Send + Sync {
    /// 注册构建器类型
    type Builder: RegistrationBuilder + 'static;

    /// 获取一个新的、未提交的注册构建器
    fn create_registration_builder(&self) -> Self::Builder;

    /// 获取一个新的依赖描述
    fn create_dependency_spec(&self) -> <Self::Builder as RegistrationBuilder>::Dependency;

    /// 提交注册
    ///
    /// 失败时返回的错误会原样传递给 `register` 的调用者。
    async fn submit(&self, builder: Self::Builder) -> Result<()>;
}
