//! 内存组件注册表
//!
//! [`LifecycleManager`] 的进程内实现：接收注册器提交的构建器，校验后存储。
//! 不负责实例化与依赖解析，主要用于嵌入式场景、诊断和测试。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::component::{CallbackHooks, CapabilityId, Implementation};
use crate::registrar::manager::{DependencySpec, LifecycleManager, RegistrationBuilder};
use crate::utils::{CoreError, Result};

/// 尚未提交的依赖描述
#[derive(Debug, Clone, Default)]
pub struct PendingDependency {
    capability: Option<CapabilityId>,
    mandatory: bool,
    callbacks: Option<(String, String)>,
    hooks: Option<CallbackHooks>,
}

impl DependencySpec for PendingDependency {
    fn set_capability(&mut self, capability: &CapabilityId) {
        self.capability = Some(capability.clone());
    }

    fn set_mandatory(&mut self, mandatory: bool) {
        self.mandatory = mandatory;
    }

    fn set_callback_hooks(&mut self, add: &str, remove: &str, hooks: Option<CallbackHooks>) {
        self.callbacks = Some((add.to_string(), remove.to_string()));
        self.hooks = hooks;
    }
}

/// 尚未提交的注册
#[derive(Debug, Default)]
pub struct PendingRegistration {
    implementation: Option<Implementation>,
    capabilities: Vec<CapabilityId>,
    dependencies: Vec<PendingDependency>,
}

impl RegistrationBuilder for PendingRegistration {
    type Dependency = PendingDependency;

    fn set_implementation(&mut self, implementation: Implementation) {
        self.implementation = Some(implementation);
    }

    fn set_published_capabilities(&mut self, capabilities: &[CapabilityId]) {
        self.capabilities = capabilities.to_vec();
    }

    fn add_dependency(&mut self, dependency: PendingDependency) {
        self.dependencies.push(dependency);
    }
}

/// 已注册的依赖
#[derive(Debug, Clone)]
pub struct RegisteredDependency {
    /// 依赖的能力
    pub capability: CapabilityId,
    /// 是否必需
    pub mandatory: bool,
    /// 添加钩子名
    pub add_method: Option<String>,
    /// 移除钩子名
    pub remove_method: Option<String>,
    /// 回调函数
    pub hooks: Option<CallbackHooks>,
}

/// 已注册的组件
#[derive(Debug, Clone)]
pub struct RegisteredComponent {
    /// 注册 ID
    pub id: Uuid,
    /// 提交顺序
    pub sequence: u64,
    /// 实现目标
    pub implementation: Implementation,
    /// 发布的能力
    pub capabilities: Vec<CapabilityId>,
    /// 依赖
    pub dependencies: Vec<RegisteredDependency>,
    /// 注册时间
    pub registered_at: DateTime<Utc>,
}

impl RegisteredComponent {
    /// 是否发布了给定能力
    pub fn provides(&self, capability: &CapabilityId) -> bool {
        self.capabilities.contains(capability)
    }

    /// 必需依赖
    pub fn required(&self) -> impl Iterator<Item = &RegisteredDependency> {
        self.dependencies.iter().filter(|d| d.mandatory)
    }

    /// 追踪依赖
    pub fn tracked(&self) -> impl Iterator<Item = &RegisteredDependency> {
        self.dependencies.iter().filter(|d| !d.mandatory)
    }
}

/// 注册表统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// 创建的构建器数量
    pub builders_created: u64,
    /// 提交次数（含被拒绝的）
    pub submitted: u64,
    /// 被拒绝的提交
    pub rejected: u64,
    /// 当前注册的组件数
    pub registered: usize,
}

#[derive(Debug, Default)]
struct Counters {
    builders_created: AtomicU64,
    submitted: AtomicU64,
    rejected: AtomicU64,
    sequence: AtomicU64,
}

/// 内存组件注册表
///
/// 克隆后共享同一份状态。
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    /// registration_id -> RegisteredComponent
    components: Arc<RwLock<HashMap<Uuid, RegisteredComponent>>>,
    counters: Arc<Counters>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已注册的组件
    pub async fn get(&self, id: &Uuid) -> Option<RegisteredComponent> {
        let components = self.components.read().await;
        components.get(id).cloned()
    }

    /// 按提交顺序列出所有组件
    pub async fn list(&self) -> Vec<RegisteredComponent> {
        let components = self.components.read().await;
        let mut list: Vec<_> = components.values().cloned().collect();
        list.sort_by_key(|c| c.sequence);
        list
    }

    /// 发布了给定能力的组件，按提交顺序
    pub async fn providers_of(&self, capability: &CapabilityId) -> Vec<RegisteredComponent> {
        let components = self.components.read().await;
        let mut providers: Vec<_> = components
            .values()
            .filter(|c| c.provides(capability))
            .cloned()
            .collect();
        providers.sort_by_key(|c| c.sequence);
        providers
    }

    pub async fn len(&self) -> usize {
        self.components.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.components.read().await.is_empty()
    }

    /// 取消注册
    ///
    /// # Errors
    ///
    /// 注册 ID 不存在时返回 [`CoreError::ComponentNotFound`]。
    pub async fn unregister(&self, id: &Uuid) -> Result<RegisteredComponent> {
        let mut components = self.components.write().await;
        let removed = components
            .remove(id)
            .ok_or_else(|| CoreError::ComponentNotFound(id.to_string()))?;

        tracing::debug!(
            registration_id = %id,
            component = %removed.implementation.component_id(),
            "组件已取消注册"
        );
        Ok(removed)
    }

    /// 清空注册表
    pub async fn clear(&self) {
        self.components.write().await.clear();
    }

    /// 统计信息
    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            builders_created: self.counters.builders_created.load(Ordering::Relaxed),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            registered: self.len().await,
        }
    }

    /// 校验并转换构建器，失败时返回 (组件名, 原因)
    fn accept(pending: PendingRegistration) -> std::result::Result<Accepted, (String, String)> {
        let implementation = pending
            .implementation
            .ok_or_else(|| ("<unknown>".to_string(), "未设置实现目标".to_string()))?;
        let component = implementation.component_id().to_string();

        if pending.capabilities.is_empty() {
            return Err((component, "没有发布任何能力".to_string()));
        }

        let mut dependencies = Vec::with_capacity(pending.dependencies.len());
        for (index, dependency) in pending.dependencies.into_iter().enumerate() {
            let capability = dependency
                .capability
                .ok_or_else(|| (component.clone(), format!("第 {} 个依赖未设置能力", index + 1)))?;

            if dependency.mandatory && dependency.callbacks.is_some() {
                return Err((
                    component.clone(),
                    format!("必需依赖 '{}' 不能带回调", capability),
                ));
            }

            let (add_method, remove_method) = match dependency.callbacks {
                Some((add, remove)) => (Some(add), Some(remove)),
                None => (None, None),
            };

            dependencies.push(RegisteredDependency {
                capability,
                mandatory: dependency.mandatory,
                add_method,
                remove_method,
                hooks: dependency.hooks,
            });
        }

        Ok(Accepted {
            implementation,
            capabilities: pending.capabilities,
            dependencies,
        })
    }
}

struct Accepted {
    implementation: Implementation,
    capabilities: Vec<CapabilityId>,
    dependencies: Vec<RegisteredDependency>,
}

#[async_trait]
impl LifecycleManager for ComponentRegistry {
    type Builder = PendingRegistration;

    fn create_registration_builder(&self) -> PendingRegistration {
        self.counters.builders_created.fetch_add(1, Ordering::Relaxed);
        PendingRegistration::default()
    }

    fn create_dependency_spec(&self) -> PendingDependency {
        PendingDependency::default()
    }

    async fn submit(&self, builder: PendingRegistration) -> Result<()> {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let reject = |component: String, reason: String| {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            CoreError::RegistrationFailed { component, reason }
        };

        let Accepted {
            implementation,
            capabilities,
            dependencies,
        } = Self::accept(builder).map_err(|(component, reason)| reject(component, reason))?;

        let mut components = self.components.write().await;

        // 同一实例只能注册一次
        if let Implementation::Instance(instance) = &implementation {
            let duplicate = components.values().any(|existing| {
                existing
                    .implementation
                    .as_instance()
                    .is_some_and(|other| other.is_same(instance.instance()))
            });
            if duplicate {
                return Err(reject(
                    implementation.component_id().to_string(),
                    "该实例已注册".to_string(),
                ));
            }
        }

        let id = Uuid::new_v4();
        let component = RegisteredComponent {
            id,
            sequence: self.counters.sequence.fetch_add(1, Ordering::SeqCst),
            implementation,
            capabilities,
            dependencies,
            registered_at: Utc::now(),
        };

        tracing::debug!(
            registration_id = %id,
            component = %component.implementation.component_id(),
            "组件已登记"
        );
        components.insert(id, component);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentInstance, ComponentType, ServiceRef, TypeDescriptor};

    struct Widget;

    fn type_builder(registry: &ComponentRegistry) -> PendingRegistration {
        let descriptor = TypeDescriptor::builder::<Widget>().component().build();
        let mut builder = registry.create_registration_builder();
        builder.set_implementation(Implementation::Type(ComponentType::from_descriptor(
            &descriptor,
        )));
        builder.set_published_capabilities(&[CapabilityId::of::<Widget>()]);
        builder
    }

    fn instance_builder(registry: &ComponentRegistry, instance: ServiceRef) -> PendingRegistration {
        let mut builder = registry.create_registration_builder();
        builder.set_implementation(Implementation::Instance(ComponentInstance::new(
            CapabilityId::of::<Widget>(),
            instance,
        )));
        builder.set_published_capabilities(&[CapabilityId::of::<Widget>()]);
        builder
    }

    #[tokio::test]
    async fn test_submit_and_list() {
        let registry = ComponentRegistry::new();
        registry.submit(type_builder(&registry)).await.unwrap();
        registry.submit(type_builder(&registry)).await.unwrap();

        let list = registry.list().await;
        assert_eq!(list.len(), 2);
        assert!(list[0].sequence < list[1].sequence);
        assert!(list[0].provides(&CapabilityId::of::<Widget>()));
    }

    #[tokio::test]
    async fn test_submit_records_dependencies() {
        let registry = ComponentRegistry::new();
        let mut builder = type_builder(&registry);

        let mut required = registry.create_dependency_spec();
        required.set_capability(&CapabilityId::named("app::Logger"));
        required.set_mandatory(true);
        builder.add_dependency(required);

        let mut tracked = registry.create_dependency_spec();
        tracked.set_capability(&CapabilityId::named("app::Plugin"));
        tracked.set_mandatory(false);
        tracked.set_callback_hooks("addPlugin", "removePlugin", None);
        builder.add_dependency(tracked);

        registry.submit(builder).await.unwrap();

        let component = registry.list().await.remove(0);
        assert_eq!(component.required().count(), 1);
        let tracked: Vec<_> = component.tracked().collect();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].add_method.as_deref(), Some("addPlugin"));
        assert_eq!(tracked[0].remove_method.as_deref(), Some("removePlugin"));
    }

    #[tokio::test]
    async fn test_reject_missing_implementation() {
        let registry = ComponentRegistry::new();
        let builder = registry.create_registration_builder();

        let err = registry.submit(builder).await.unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("未设置实现目标"));
        assert_eq!(registry.stats().await.rejected, 1);
    }

    #[tokio::test]
    async fn test_reject_mandatory_with_callbacks() {
        let registry = ComponentRegistry::new();
        let mut builder = type_builder(&registry);

        let mut dependency = registry.create_dependency_spec();
        dependency.set_capability(&CapabilityId::named("app::Logger"));
        dependency.set_mandatory(true);
        dependency.set_callback_hooks("addLogger", "removeLogger", None);
        builder.add_dependency(dependency);

        let err = registry.submit(builder).await.unwrap_err();
        assert!(err.to_string().contains("不能带回调"));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reject_dependency_without_capability() {
        let registry = ComponentRegistry::new();
        let mut builder = type_builder(&registry);
        builder.add_dependency(registry.create_dependency_spec());

        let err = registry.submit(builder).await.unwrap_err();
        assert!(err.to_string().contains("未设置能力"));
    }

    #[tokio::test]
    async fn test_reject_duplicate_instance() {
        let registry = ComponentRegistry::new();
        let widget: ServiceRef = Arc::new(Widget);

        registry
            .submit(instance_builder(&registry, widget.clone()))
            .await
            .unwrap();
        let err = registry
            .submit(instance_builder(&registry, widget))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("该实例已注册"));

        // 不同实例可以注册
        registry
            .submit(instance_builder(&registry, Arc::new(Widget)))
            .await
            .unwrap();
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = ComponentRegistry::new();
        registry.submit(type_builder(&registry)).await.unwrap();

        let id = registry.list().await[0].id;
        let removed = registry.unregister(&id).await.unwrap();
        assert_eq!(removed.id, id);
        assert!(registry.get(&id).await.is_none());

        let err = registry.unregister(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::ComponentNotFound(_)));
    }

    #[tokio::test]
    async fn test_providers_of() {
        let registry = ComponentRegistry::new();
        registry.submit(type_builder(&registry)).await.unwrap();

        assert_eq!(registry.providers_of(&CapabilityId::of::<Widget>()).await.len(), 1);
        assert!(registry
            .providers_of(&CapabilityId::named("app::Missing"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let registry = ComponentRegistry::new();
        registry.submit(type_builder(&registry)).await.unwrap();
        let _ = registry.submit(registry.create_registration_builder()).await;

        let stats = registry.stats().await;
        assert_eq!(stats.builders_created, 2);
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.registered, 1);

        registry.clear().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_registry_clone_shares_state() {
        let registry = ComponentRegistry::new();
        let clone = registry.clone();
        clone.submit(type_builder(&clone)).await.unwrap();
        assert_eq!(registry.len().await, 1);
    }
}
