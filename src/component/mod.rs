//! 组件元数据模块
//!
//! 描述一个组件所需的全部词汇：
//! - 能力标识
//! - 类型描述与能力描述协议
//! - 必需依赖与追踪依赖
//! - 注册候选与实现目标
//! - 清单文件解析

pub mod candidate;
pub mod capability;
pub mod dependency;
pub mod descriptor;
pub mod parser;

// 重导出常用类型
pub use candidate::{Candidate, ComponentInstance, ComponentType, Implementation};
pub use capability::CapabilityId;
pub use dependency::{
    CallbackHooks, HookFn, RequiredDependency, ServiceRef, TrackedDependency, TrackedSet,
    ADD_HOOK_PREFIX, REMOVE_HOOK_PREFIX,
};
pub use descriptor::{
    ComponentMarker, Described, Factory, FieldDescriptor, TypeDescriptor, TypeDescriptorBuilder,
};
pub use parser::{ComponentManifest, ComponentSection, DescriptorParser};
