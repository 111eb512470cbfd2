//! 注册候选与实现目标
//!
//! 候选可以是一个类型描述（由管理器实例化），也可以是一个已构造的实例
//! （管理器只负责注入依赖）。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::capability::CapabilityId;
use super::dependency::ServiceRef;
use super::descriptor::{Described, Factory, TypeDescriptor};

/// 待实例化的组件类型
#[derive(Clone)]
pub struct ComponentType {
    id: CapabilityId,
    factory: Option<Factory>,
}

impl ComponentType {
    /// 从类型描述提取
    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Self {
        Self {
            id: descriptor.self_type().clone(),
            factory: descriptor.factory().cloned(),
        }
    }

    pub fn id(&self) -> &CapabilityId {
        &self.id
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// 使用工厂构造实例，没有工厂时返回 None
    pub fn instantiate(&self) -> Option<ServiceRef> {
        self.factory.as_ref().map(|factory| factory())
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("id", &self.id)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// 已构造的组件实例
#[derive(Clone)]
pub struct ComponentInstance {
    id: CapabilityId,
    instance: ServiceRef,
}

impl ComponentInstance {
    pub fn new(id: CapabilityId, instance: ServiceRef) -> Self {
        Self { id, instance }
    }

    /// 实例的运行时类型
    pub fn id(&self) -> &CapabilityId {
        &self.id
    }

    pub fn instance(&self) -> &ServiceRef {
        &self.instance
    }

    /// 向下转型为具体类型
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    /// 是否与给定引用指向同一个对象
    pub fn is_same(&self, other: &ServiceRef) -> bool {
        same_object(&self.instance, other)
    }
}

// 只比较数据指针，忽略 vtable
fn same_object(a: &ServiceRef, b: &ServiceRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl PartialEq for ComponentInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && same_object(&self.instance, &other.instance)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("ptr", &Arc::as_ptr(&self.instance))
            .finish()
    }
}

/// 实现目标
#[derive(Debug, Clone, PartialEq)]
pub enum Implementation {
    /// 由管理器实例化的类型
    Type(ComponentType),
    /// 已构造的实例，保持同一性
    Instance(ComponentInstance),
}

impl Implementation {
    /// 组件类型标识
    pub fn component_id(&self) -> &CapabilityId {
        match self {
            Implementation::Type(t) => t.id(),
            Implementation::Instance(i) => i.id(),
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, Implementation::Instance(_))
    }

    pub fn as_instance(&self) -> Option<&ComponentInstance> {
        match self {
            Implementation::Instance(i) => Some(i),
            Implementation::Type(_) => None,
        }
    }

    /// 类别名称，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            Implementation::Type(_) => "type",
            Implementation::Instance(_) => "instance",
        }
    }
}

/// 注册候选
#[derive(Clone)]
pub enum Candidate {
    /// 裸类型描述
    Type(TypeDescriptor),
    /// 活动实例及其运行时类型描述
    Instance {
        descriptor: TypeDescriptor,
        instance: ServiceRef,
    },
}

impl Candidate {
    /// 类型候选
    pub fn of<T: Described>() -> Self {
        Candidate::Type(T::descriptor())
    }

    /// 实例候选
    pub fn instance<T: Described>(instance: Arc<T>) -> Self {
        Candidate::Instance {
            descriptor: T::descriptor(),
            instance,
        }
    }

    pub fn from_descriptor(descriptor: TypeDescriptor) -> Self {
        Candidate::Type(descriptor)
    }

    /// 用任意描述（例如清单文件）搭配一个已构造的实例
    ///
    /// 描述记录了运行时类型时，翻译阶段会校验实例类型。
    pub fn from_instance(descriptor: TypeDescriptor, instance: ServiceRef) -> Self {
        Candidate::Instance {
            descriptor,
            instance,
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        match self {
            Candidate::Type(descriptor) => descriptor,
            Candidate::Instance { descriptor, .. } => descriptor,
        }
    }

    /// 候选名称，用于错误信息与日志
    pub fn name(&self) -> String {
        match self {
            Candidate::Type(descriptor) => descriptor.self_type().to_string(),
            Candidate::Instance { descriptor, instance } => {
                format!("{}@{:p}", descriptor.self_type(), Arc::as_ptr(instance))
            }
        }
    }

    /// 分类候选
    ///
    /// 裸类型返回 `(描述, None)`；实例返回 `(运行时类型描述, Some(实例))`。
    pub fn classify(self) -> (TypeDescriptor, Option<ServiceRef>) {
        match self {
            Candidate::Type(descriptor) => (descriptor, None),
            Candidate::Instance {
                descriptor,
                instance,
            } => (descriptor, Some(instance)),
        }
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Candidate").field(&self.name()).finish()
    }
}

impl From<TypeDescriptor> for Candidate {
    fn from(descriptor: TypeDescriptor) -> Self {
        Candidate::Type(descriptor)
    }
}

impl<T: Described> From<Arc<T>> for Candidate {
    fn from(instance: Arc<T>) -> Self {
        Candidate::instance(instance)
    }
}
