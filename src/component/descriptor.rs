//! 组件类型描述
//!
//! 每个组件类型提供一份可查询的描述对象，代替运行时反射：
//! 是否为组件、发布的能力集合、必需依赖（服务字段）和追踪依赖。
//!
//! # 示例
//!
//! ```rust
//! use chips_registrar::{CapabilityId, Described, TypeDescriptor};
//!
//! trait EntryPoint {}
//! struct Logger;
//!
//! struct Dashboard;
//!
//! impl Described for Dashboard {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::builder::<Dashboard>()
//!             .provides::<dyn EntryPoint>()
//!             .service::<Logger>("logger")
//!             .track::<String>()
//!             .build()
//!     }
//! }
//!
//! let descriptor = Dashboard::descriptor();
//! assert!(descriptor.is_component());
//! assert_eq!(descriptor.resolve_capability_set(), vec![CapabilityId::of::<dyn EntryPoint>()]);
//! assert_eq!(descriptor.resolve_required_dependencies().len(), 1);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capability::CapabilityId;
use super::dependency::{
    CallbackHooks, RequiredDependency, ServiceRef, TrackedDependency, TrackedSet,
};

/// 组件工厂：由生命周期管理器在需要时构造实例
pub type Factory = Arc<dyn Fn() -> ServiceRef + Send + Sync>;

/// 能力描述协议
///
/// 组件类型实现此 trait 以提供自己的类型描述。
pub trait Described: Any + Send + Sync {
    /// 返回该类型的描述
    fn descriptor() -> TypeDescriptor;
}

/// 字段描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// 字段名
    pub name: String,

    /// 字段声明类型
    #[serde(rename = "type")]
    pub declared_type: CapabilityId,

    /// 是否标记为必需服务
    #[serde(default)]
    pub service: bool,
}

impl FieldDescriptor {
    /// 普通字段
    pub fn plain(name: impl Into<String>, declared_type: CapabilityId) -> Self {
        Self {
            name: name.into(),
            declared_type,
            service: false,
        }
    }

    /// 标记为服务的字段
    pub fn service(name: impl Into<String>, declared_type: CapabilityId) -> Self {
        Self {
            name: name.into(),
            declared_type,
            service: true,
        }
    }
}

/// 组件标记
///
/// 带有此标记的类型才是组件。`provides` 为空时发布类型自身。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMarker {
    provides: Vec<CapabilityId>,
}

impl ComponentMarker {
    /// 不声明显式能力的标记
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明显式能力的标记（重复项只保留第一次出现）
    pub fn providing<I>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        let mut marker = Self::new();
        for capability in capabilities {
            marker.add(capability);
        }
        marker
    }

    /// 追加能力，已存在时返回 false
    pub fn add(&mut self, capability: CapabilityId) -> bool {
        if self.provides.contains(&capability) {
            return false;
        }
        self.provides.push(capability);
        true
    }

    /// 显式声明的能力
    pub fn provides(&self) -> &[CapabilityId] {
        &self.provides
    }
}

/// 类型描述
#[derive(Clone)]
pub struct TypeDescriptor {
    self_type: CapabilityId,
    runtime_type: Option<TypeId>,
    marker: Option<ComponentMarker>,
    fields: Vec<FieldDescriptor>,
    tracked: TrackedSet,
    factory: Option<Factory>,
}

impl TypeDescriptor {
    /// 为 Rust 类型创建描述构建器
    pub fn builder<T: ?Sized + 'static>() -> TypeDescriptorBuilder {
        let mut builder = TypeDescriptorBuilder::new(CapabilityId::of::<T>());
        builder.descriptor.runtime_type = Some(TypeId::of::<T>());
        builder
    }

    /// 按名称创建描述构建器
    ///
    /// 这样的描述不记录运行时类型，搭配实例时不做类型校验。
    pub fn builder_named(self_type: impl Into<CapabilityId>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(self_type.into())
    }

    /// 类型自身的标识
    pub fn self_type(&self) -> &CapabilityId {
        &self.self_type
    }

    /// 描述所对应的 Rust 类型（按名称构造的描述为 None）
    pub fn runtime_type(&self) -> Option<TypeId> {
        self.runtime_type
    }

    /// 实例是否属于此描述的类型
    ///
    /// 没有记录运行时类型时总是返回 true。
    pub fn accepts_instance(&self, instance: &ServiceRef) -> bool {
        let instance: &dyn Any = &**instance;
        self.runtime_type
            .map_or(true, |expected| instance.type_id() == expected)
    }

    pub fn marker(&self) -> Option<&ComponentMarker> {
        self.marker.as_ref()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    /// 是否带有组件标记
    pub fn is_component(&self) -> bool {
        self.marker.is_some()
    }

    /// 解析发布的能力集合
    ///
    /// 显式声明为空时返回只含类型自身的集合；没有组件标记时返回空集合。
    pub fn resolve_capability_set(&self) -> Vec<CapabilityId> {
        match &self.marker {
            None => Vec::new(),
            Some(marker) if marker.provides().is_empty() => vec![self.self_type.clone()],
            Some(marker) => marker.provides().to_vec(),
        }
    }

    /// 解析必需依赖
    ///
    /// 每个服务字段产生一项，按字段声明顺序。
    pub fn resolve_required_dependencies(&self) -> Vec<RequiredDependency> {
        self.fields
            .iter()
            .filter(|field| field.service)
            .map(|field| RequiredDependency::new(field.declared_type.clone()))
            .collect()
    }

    /// 解析追踪依赖（已去重）
    pub fn resolve_tracked_dependencies(&self) -> TrackedSet {
        self.tracked.clone()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("self_type", &self.self_type)
            .field("runtime_type", &self.runtime_type)
            .field("marker", &self.marker)
            .field("fields", &self.fields)
            .field("tracked", &self.tracked)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// 类型描述构建器
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    fn new(self_type: CapabilityId) -> Self {
        Self {
            descriptor: TypeDescriptor {
                self_type,
                runtime_type: None,
                marker: None,
                fields: Vec::new(),
                tracked: TrackedSet::new(),
                factory: None,
            },
        }
    }

    /// 标记为组件（不声明显式能力）
    pub fn component(mut self) -> Self {
        self.descriptor.marker.get_or_insert_with(ComponentMarker::new);
        self
    }

    /// 使用给定的组件标记，与已有标记合并
    pub fn marker(mut self, marker: ComponentMarker) -> Self {
        let existing = self
            .descriptor
            .marker
            .get_or_insert_with(ComponentMarker::new);
        for capability in marker.provides {
            existing.add(capability);
        }
        self
    }

    /// 标记为组件并发布能力 `T`
    pub fn provides<T: ?Sized + 'static>(self) -> Self {
        self.provides_named(CapabilityId::of::<T>())
    }

    /// 标记为组件并按名称发布能力
    pub fn provides_named(mut self, capability: impl Into<CapabilityId>) -> Self {
        self.descriptor
            .marker
            .get_or_insert_with(ComponentMarker::new)
            .add(capability.into());
        self
    }

    /// 声明普通字段
    pub fn field<T: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.field_descriptor(FieldDescriptor::plain(name, CapabilityId::of::<T>()))
    }

    /// 声明服务字段（必需依赖）
    pub fn service<T: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.field_descriptor(FieldDescriptor::service(name, CapabilityId::of::<T>()))
    }

    pub fn field_descriptor(mut self, field: FieldDescriptor) -> Self {
        self.descriptor.fields.push(field);
        self
    }

    /// 追踪能力 `T`（单个声明）
    pub fn track<T: ?Sized + 'static>(self) -> Self {
        self.track_named(CapabilityId::of::<T>())
    }

    /// 按名称追踪能力
    pub fn track_named(mut self, capability: impl Into<CapabilityId>) -> Self {
        self.descriptor
            .tracked
            .insert(TrackedDependency::new(capability.into()));
        self
    }

    /// 追踪一组能力（重复声明）
    pub fn track_all<I>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<CapabilityId>,
    {
        self.descriptor.tracked.extend(
            capabilities
                .into_iter()
                .map(|capability| TrackedDependency::new(capability.into())),
        );
        self
    }

    /// 追踪能力 `S`，并提供回调函数
    ///
    /// `C` 为实现目标的类型，通常就是被描述的组件本身。
    pub fn track_with<C, S, A, R>(mut self, add: A, remove: R) -> Self
    where
        C: Any + Send + Sync,
        S: Any + Send + Sync,
        A: Fn(&C, Arc<S>) + Send + Sync + 'static,
        R: Fn(&C, Arc<S>) + Send + Sync + 'static,
    {
        let dependency = TrackedDependency::new(CapabilityId::of::<S>())
            .with_hooks(CallbackHooks::typed::<C, S, A, R>(add, remove));
        self.descriptor.tracked.insert(dependency);
        self
    }

    /// 设置实例工厂
    pub fn factory<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.descriptor.factory = Some(Arc::new(move || -> ServiceRef { Arc::new(factory()) }));
        self
    }

    /// 构建描述
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    trait EntryPoint {}
    trait Dash {}
    struct Logger;
    struct Plain;

    #[derive(Default)]
    struct Collector {
        strings: Mutex<Vec<String>>,
    }

    #[test]
    fn test_unmarked_type_is_not_component() {
        let descriptor = TypeDescriptor::builder::<Plain>()
            .service::<Logger>("logger")
            .build();

        assert!(!descriptor.is_component());
        assert!(descriptor.resolve_capability_set().is_empty());
    }

    #[test]
    fn test_capability_set_defaults_to_self() {
        let descriptor = TypeDescriptor::builder::<Collector>().component().build();

        assert!(descriptor.is_component());
        assert_eq!(
            descriptor.resolve_capability_set(),
            vec![CapabilityId::of::<Collector>()]
        );
    }

    #[test]
    fn test_explicit_capabilities_keep_order() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .provides::<dyn EntryPoint>()
            .provides::<dyn Dash>()
            .provides::<dyn EntryPoint>()
            .build();

        assert_eq!(
            descriptor.resolve_capability_set(),
            vec![CapabilityId::of::<dyn EntryPoint>(), CapabilityId::of::<dyn Dash>()]
        );
    }

    #[test]
    fn test_component_then_provides() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .component()
            .provides::<dyn Dash>()
            .build();

        assert_eq!(
            descriptor.resolve_capability_set(),
            vec![CapabilityId::of::<dyn Dash>()]
        );
    }

    #[test]
    fn test_required_dependencies_from_service_fields() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .component()
            .service::<Logger>("logger")
            .field::<String>("name")
            .service::<dyn Dash>("dash")
            .build();

        let required = descriptor.resolve_required_dependencies();
        assert_eq!(
            required,
            vec![
                RequiredDependency::new(CapabilityId::of::<Logger>()),
                RequiredDependency::new(CapabilityId::of::<dyn Dash>()),
            ]
        );
    }

    #[test]
    fn test_tracked_forms_merge() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .component()
            .track::<String>()
            .track_all([CapabilityId::of::<String>(), CapabilityId::of::<i32>()])
            .build();

        let tracked = descriptor.resolve_tracked_dependencies();
        assert_eq!(tracked.len(), 2);
        assert!(tracked.contains(&CapabilityId::of::<String>()));
        assert!(tracked.contains(&CapabilityId::of::<i32>()));
    }

    #[test]
    fn test_track_with_registers_hooks() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .component()
            .track_with::<Collector, String, _, _>(
                |c, s| c.strings.lock().unwrap().push(s.to_string()),
                |c, s| c.strings.lock().unwrap().retain(|x| x != s.as_str()),
            )
            .build();

        let tracked = descriptor.resolve_tracked_dependencies();
        let dep = tracked.get(&CapabilityId::of::<String>()).unwrap();
        let hooks = dep.hooks().unwrap();

        let collector = Collector::default();
        hooks.on_added(&collector, Arc::new("x".to_string())).unwrap();
        assert_eq!(*collector.strings.lock().unwrap(), vec!["x"]);
        hooks.on_removed(&collector, Arc::new("x".to_string())).unwrap();
        assert!(collector.strings.lock().unwrap().is_empty());
    }

    #[test]
    fn test_factory_builds_instances() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .component()
            .factory(Collector::default)
            .build();

        let factory = descriptor.factory().unwrap();
        let instance = factory();
        assert!(instance.downcast_ref::<Collector>().is_some());
    }

    #[test]
    fn test_marker_providing_dedups() {
        let marker = ComponentMarker::providing([
            CapabilityId::named("a::A"),
            CapabilityId::named("b::B"),
            CapabilityId::named("a::A"),
        ]);
        assert_eq!(marker.provides().len(), 2);
    }

    #[test]
    fn test_builder_accepts_marker() {
        let descriptor = TypeDescriptor::builder::<Collector>()
            .provides::<dyn Dash>()
            .marker(ComponentMarker::providing([
                CapabilityId::of::<dyn EntryPoint>(),
                CapabilityId::of::<dyn Dash>(),
            ]))
            .build();

        assert_eq!(
            descriptor.resolve_capability_set(),
            vec![CapabilityId::of::<dyn Dash>(), CapabilityId::of::<dyn EntryPoint>()]
        );

        let unmarked = TypeDescriptor::builder::<Plain>()
            .marker(ComponentMarker::new())
            .build();
        assert!(unmarked.is_component());
        assert_eq!(unmarked.resolve_capability_set(), vec![CapabilityId::of::<Plain>()]);
    }

    #[test]
    fn test_runtime_type_checks_instances() {
        let descriptor = TypeDescriptor::builder::<Collector>().component().build();
        assert_eq!(descriptor.runtime_type(), Some(TypeId::of::<Collector>()));

        let collector: ServiceRef = Arc::new(Collector::default());
        let plain: ServiceRef = Arc::new(Plain);
        assert!(descriptor.accepts_instance(&collector));
        assert!(!descriptor.accepts_instance(&plain));

        // 按名称构造的描述不校验
        let named = TypeDescriptor::builder_named("app::Collector").component().build();
        assert!(named.runtime_type().is_none());
        assert!(named.accepts_instance(&plain));
    }
}
