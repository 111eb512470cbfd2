//! 组件注册器
//!
//! 把一个候选（类型或实例）的组件元数据翻译为注册计划，再通过
//! [`LifecycleManager`] 的构建器接口提交。翻译是纯函数，提交是唯一的副作用。

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::component::{Candidate, ComponentInstance, ComponentType, Implementation};
use crate::core::config::RegistrarSettings;
use crate::registrar::manager::{DependencySpec, LifecycleManager, RegistrationBuilder};
use crate::registrar::plan::{DependencyEntry, RegistrationPlan};
use crate::utils::logger::fields;
use crate::utils::{CoreError, Result};

/// 把候选翻译为注册计划
///
/// 不访问管理器，不产生副作用；相同输入总是得到相等的计划。
///
/// # Errors
///
/// - 候选的类型没有组件标记时返回 [`CoreError::NotAComponent`]
/// - 实例的运行时类型与描述记录的类型不符时返回 [`CoreError::InstanceTypeMismatch`]
pub fn build_plan(candidate: impl Into<Candidate>) -> Result<RegistrationPlan> {
    let candidate = candidate.into();
    let name = candidate.name();
    let (descriptor, instance) = candidate.classify();

    if !descriptor.is_component() {
        return Err(CoreError::NotAComponent(name));
    }

    let implementation = match instance {
        Some(instance) if !descriptor.accepts_instance(&instance) => {
            return Err(CoreError::InstanceTypeMismatch(name));
        }
        Some(instance) => Implementation::Instance(ComponentInstance::new(
            descriptor.self_type().clone(),
            instance,
        )),
        None => Implementation::Type(ComponentType::from_descriptor(&descriptor)),
    };

    let required_entries = descriptor
        .resolve_required_dependencies()
        .iter()
        .map(DependencyEntry::required)
        .collect();

    let tracked_entries = descriptor
        .resolve_tracked_dependencies()
        .iter()
        .map(DependencyEntry::tracked)
        .collect();

    Ok(RegistrationPlan {
        implementation,
        published_capabilities: descriptor.resolve_capability_set(),
        required_entries,
        tracked_entries,
    })
}

/// 组件注册器
///
/// 注册器本身无状态（只持有管理器句柄和设置），可以在多个任务间共享。
pub struct ComponentRegistrar<M: LifecycleManager> {
    manager: Arc<M>,
    settings: RegistrarSettings,
}

impl<M: LifecycleManager> ComponentRegistrar<M> {
    /// 使用默认设置创建注册器
    pub fn new(manager: Arc<M>) -> Self {
        Self::with_settings(manager, RegistrarSettings::default())
    }

    pub fn with_settings(manager: Arc<M>, settings: RegistrarSettings) -> Self {
        Self { manager, settings }
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    pub fn settings(&self) -> &RegistrarSettings {
        &self.settings
    }

    /// 注册一个组件
    ///
    /// 先翻译为注册计划，再提交给生命周期管理器。
    ///
    /// # Errors
    ///
    /// - 候选不是组件或实例与描述不符时返回翻译错误，管理器不会被调用
    /// - 管理器拒绝提交时，原样返回管理器的错误
    #[instrument(
        skip_all,
        fields(
            component = tracing::field::Empty,
            implementation = tracing::field::Empty,
            published = tracing::field::Empty,
            required = tracing::field::Empty,
            tracked = tracing::field::Empty,
        )
    )]
    pub async fn register(&self, candidate: impl Into<Candidate>) -> Result<()> {
        let candidate = candidate.into();
        let span = tracing::Span::current();
        span.record(fields::COMPONENT, candidate.name().as_str());

        let plan = match build_plan(candidate) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(
                    error_code = e.error_code(),
                    error_msg = %e,
                    "拒绝注册"
                );
                return Err(e);
            }
        };

        let summary = plan.summary();
        span.record(fields::IMPLEMENTATION, summary.implementation.as_str());
        span.record(fields::PUBLISHED, tracing::field::debug(&summary.published));
        span.record(fields::REQUIRED, plan.required_entries.len() as u64);
        span.record(fields::TRACKED, plan.tracked_entries.len() as u64);
        if self.settings.log_plans {
            info!("注册计划");
        } else {
            debug!("注册计划");
        }

        let start = Instant::now();
        match self.submit(plan).await {
            Ok(()) => {
                info!(
                    duration_us = start.elapsed().as_micros() as u64,
                    "组件已提交"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    error_code = e.error_code(),
                    error_msg = %e,
                    "管理器拒绝注册"
                );
                Err(e)
            }
        }
    }

    /// 按顺序注册一组组件，遇到第一个错误即停止
    ///
    /// 返回成功注册的数量。已成功提交的组件不会回滚。
    pub async fn register_all<I>(&self, candidates: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Candidate>,
    {
        let mut count = 0;
        for candidate in candidates {
            self.register(candidate).await?;
            count += 1;
        }
        Ok(count)
    }

    /// 把注册计划写入一个新的构建器并提交
    ///
    /// 每次调用都创建新的构建器，从不复用。
    pub async fn submit(&self, plan: RegistrationPlan) -> Result<()> {
        let mut builder = self.manager.create_registration_builder();
        builder.set_implementation(plan.implementation);
        builder.set_published_capabilities(&plan.published_capabilities);

        for entry in plan.required_entries.into_iter().chain(plan.tracked_entries) {
            let mut spec = self.manager.create_dependency_spec();
            spec.set_capability(&entry.capability);
            spec.set_mandatory(entry.mandatory);
            if let Some(callbacks) = entry.callbacks {
                spec.set_callback_hooks(&callbacks.add, &callbacks.remove, callbacks.hooks);
            }
            builder.add_dependency(spec);
        }

        self.manager.submit(builder).await
    }
}

impl<M: LifecycleManager> Clone for ComponentRegistrar<M> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            settings: self.settings.clone(),
        }
    }
}

impl<M: LifecycleManager> std::fmt::Debug for ComponentRegistrar<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistrar")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{CallbackHooks, CapabilityId, Described, TypeDescriptor};
    use async_trait::async_trait;
    use std::sync::Mutex;

    trait EntryPoint {}
    struct DashManager;
    struct Database;

    struct FakeComponent;

    impl Described for FakeComponent {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<FakeComponent>()
                .provides::<dyn EntryPoint>()
                .service::<DashManager>("dash_manager")
                .service::<Database>("database")
                .field::<String>("title")
                .track::<String>()
                .track_all([CapabilityId::of::<String>(), CapabilityId::of::<i32>()])
                .build()
        }
    }

    struct NotMarked;

    impl Described for NotMarked {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<NotMarked>()
                .service::<DashManager>("dash_manager")
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct RecordedDependency {
        capability: Option<CapabilityId>,
        mandatory: Option<bool>,
        hooks: Option<(String, String)>,
    }

    impl DependencySpec for RecordedDependency {
        fn set_capability(&mut self, capability: &CapabilityId) {
            self.capability = Some(capability.clone());
        }

        fn set_mandatory(&mut self, mandatory: bool) {
            self.mandatory = Some(mandatory);
        }

        fn set_callback_hooks(&mut self, add: &str, remove: &str, _hooks: Option<CallbackHooks>) {
            self.hooks = Some((add.to_string(), remove.to_string()));
        }
    }

    #[derive(Debug, Default)]
    struct RecordedBuilder {
        implementation: Option<Implementation>,
        published: Vec<CapabilityId>,
        dependencies: Vec<RecordedDependency>,
    }

    impl RegistrationBuilder for RecordedBuilder {
        type Dependency = RecordedDependency;

        fn set_implementation(&mut self, implementation: Implementation) {
            self.implementation = Some(implementation);
        }

        fn set_published_capabilities(&mut self, capabilities: &[CapabilityId]) {
            self.published = capabilities.to_vec();
        }

        fn add_dependency(&mut self, dependency: RecordedDependency) {
            self.dependencies.push(dependency);
        }
    }

    #[derive(Default)]
    struct RecordingManager {
        submitted: Mutex<Vec<RecordedBuilder>>,
        reject: bool,
    }

    #[async_trait]
    impl LifecycleManager for RecordingManager {
        type Builder = RecordedBuilder;

        fn create_registration_builder(&self) -> RecordedBuilder {
            RecordedBuilder::default()
        }

        fn create_dependency_spec(&self) -> RecordedDependency {
            RecordedDependency::default()
        }

        async fn submit(&self, builder: RecordedBuilder) -> Result<()> {
            if self.reject {
                return Err(CoreError::RegistrationFailed {
                    component: "fake".to_string(),
                    reason: "rejected".to_string(),
                });
            }
            self.submitted.lock().unwrap().push(builder);
            Ok(())
        }
    }

    #[test]
    fn test_build_plan_for_type() {
        let plan = build_plan(Candidate::of::<FakeComponent>()).unwrap();

        assert!(!plan.implementation.is_instance());
        assert_eq!(plan.component(), &CapabilityId::of::<FakeComponent>());
        assert_eq!(
            plan.published_capabilities,
            vec![CapabilityId::of::<dyn EntryPoint>()]
        );
        assert_eq!(plan.required_entries.len(), 2);
        assert!(plan.required_entries.iter().all(|e| e.mandatory));
        assert_eq!(plan.tracked_entries.len(), 2);
        assert!(plan.tracked_entries.iter().all(|e| !e.mandatory));
    }

    #[test]
    fn test_build_plan_not_a_component() {
        let err = build_plan(Candidate::of::<NotMarked>()).unwrap_err();
        match err {
            CoreError::NotAComponent(name) => assert!(name.contains("NotMarked")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_build_plan_rejects_mismatched_instance() {
        let candidate = Candidate::from_instance(FakeComponent::descriptor(), Arc::new(NotMarked));
        let err = build_plan(candidate).unwrap_err();
        match err {
            CoreError::InstanceTypeMismatch(name) => assert!(name.contains("FakeComponent")),
            other => panic!("unexpected error: {:?}", other),
        }

        let matching = Candidate::from_instance(FakeComponent::descriptor(), Arc::new(FakeComponent));
        assert!(build_plan(matching).unwrap().implementation.is_instance());
    }

    #[test]
    fn test_build_plan_is_deterministic() {
        let a = build_plan(Candidate::of::<FakeComponent>()).unwrap();
        let b = build_plan(Candidate::of::<FakeComponent>()).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_submit_writes_builder() {
        let manager = Arc::new(RecordingManager::default());
        let registrar = ComponentRegistrar::new(manager.clone());

        registrar.register(Candidate::of::<FakeComponent>()).await.unwrap();

        let submitted = manager.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let builder = &submitted[0];
        assert_eq!(builder.published, vec![CapabilityId::of::<dyn EntryPoint>()]);
        assert_eq!(builder.dependencies.len(), 4);

        let required = &builder.dependencies[0];
        assert_eq!(required.capability, Some(CapabilityId::of::<DashManager>()));
        assert_eq!(required.mandatory, Some(true));
        assert!(required.hooks.is_none());

        let tracked = &builder.dependencies[3];
        assert_eq!(tracked.capability, Some(CapabilityId::of::<i32>()));
        assert_eq!(tracked.mandatory, Some(false));
        assert_eq!(
            tracked.hooks,
            Some(("addi32".to_string(), "removei32".to_string()))
        );
    }

    #[tokio::test]
    async fn test_not_a_component_skips_manager() {
        let manager = Arc::new(RecordingManager::default());
        let registrar = ComponentRegistrar::new(manager.clone());

        let err = registrar.register(Candidate::of::<NotMarked>()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotAComponent(_)));
        assert!(manager.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_instance_skips_manager() {
        let manager = Arc::new(RecordingManager::default());
        let registrar = ComponentRegistrar::new(manager.clone());

        let candidate = Candidate::from_instance(FakeComponent::descriptor(), Arc::new(NotMarked));
        let err = registrar.register(candidate).await.unwrap_err();
        assert_eq!(err.error_code(), "COMPONENT-005");
        assert!(manager.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manager_error_propagates() {
        let manager = Arc::new(RecordingManager {
            reject: true,
            ..Default::default()
        });
        let registrar = ComponentRegistrar::new(manager);

        let err = registrar.register(Candidate::of::<FakeComponent>()).await.unwrap_err();
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn test_register_all_stops_at_first_error() {
        let manager = Arc::new(RecordingManager::default());
        let registrar = ComponentRegistrar::new(manager.clone());

        let err = registrar
            .register_all(vec![
                Candidate::of::<FakeComponent>(),
                Candidate::of::<NotMarked>(),
                Candidate::of::<FakeComponent>(),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotAComponent(_)));
        assert_eq!(manager.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_all_counts() {
        let manager = Arc::new(RecordingManager::default());
        let registrar = ComponentRegistrar::new(manager);

        let count = registrar
            .register_all([Candidate::of::<FakeComponent>(), Candidate::of::<FakeComponent>()])
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
