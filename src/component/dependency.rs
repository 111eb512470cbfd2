//! 组件依赖声明
//!
//! - [`RequiredDependency`] - 必需依赖：启动前必须恰好有一个提供者
//! - [`TrackedDependency`] - 追踪依赖：可选、动态、多实例，通过 add/remove 钩子通知
//! - [`TrackedSet`] - 按能力去重的追踪依赖集合
//! - [`CallbackHooks`] - 组件作者在构造描述时提供的回调函数对

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capability::CapabilityId;
use crate::utils::{CoreError, Result};

/// 添加钩子名称前缀
pub const ADD_HOOK_PREFIX: &str = "add";

/// 移除钩子名称前缀
pub const REMOVE_HOOK_PREFIX: &str = "remove";

/// 服务或组件实例的共享引用
pub type ServiceRef = Arc<dyn Any + Send + Sync>;

/// 类型擦除后的回调函数
///
/// 参数依次为实现目标与服务实例。
pub type HookFn = Arc<dyn Fn(&(dyn Any + Send + Sync), ServiceRef) -> Result<()> + Send + Sync>;

/// 必需依赖
///
/// 每个标记为服务的字段对应一个，键为字段的声明类型。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredDependency {
    /// 依赖的能力
    pub capability: CapabilityId,
}

impl RequiredDependency {
    pub fn new(capability: CapabilityId) -> Self {
        Self { capability }
    }
}

/// 回调钩子表项
///
/// 一对函数引用，提供者出现时调用 `add`，消失时调用 `remove`。
#[derive(Clone)]
pub struct CallbackHooks {
    add: HookFn,
    remove: HookFn,
}

impl CallbackHooks {
    /// 由类型擦除的函数创建
    pub fn new(add: HookFn, remove: HookFn) -> Self {
        Self { add, remove }
    }

    /// 由强类型函数创建
    ///
    /// 调用时会把目标向下转型为 `C`、把服务向下转型为 `S`，
    /// 转型失败返回 [`CoreError::HookTypeMismatch`]。
    pub fn typed<C, S, A, R>(add: A, remove: R) -> Self
    where
        C: Any + Send + Sync,
        S: Any + Send + Sync,
        A: Fn(&C, Arc<S>) + Send + Sync + 'static,
        R: Fn(&C, Arc<S>) + Send + Sync + 'static,
    {
        Self {
            add: erase_hook(ADD_HOOK_PREFIX, add),
            remove: erase_hook(REMOVE_HOOK_PREFIX, remove),
        }
    }

    /// 通知目标：出现了一个新的提供者
    pub fn on_added(&self, target: &(dyn Any + Send + Sync), service: ServiceRef) -> Result<()> {
        (self.add)(target, service)
    }

    /// 通知目标：一个提供者已消失
    pub fn on_removed(&self, target: &(dyn Any + Send + Sync), service: ServiceRef) -> Result<()> {
        (self.remove)(target, service)
    }
}

impl fmt::Debug for CallbackHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHooks").finish_non_exhaustive()
    }
}

fn erase_hook<C, S, F>(prefix: &'static str, hook: F) -> HookFn
where
    C: Any + Send + Sync,
    S: Any + Send + Sync,
    F: Fn(&C, Arc<S>) + Send + Sync + 'static,
{
    Arc::new(
        move |target: &(dyn Any + Send + Sync), service: ServiceRef| -> Result<()> {
            let hook_name = hook_name(prefix, &CapabilityId::of::<S>());
            let target = target
                .downcast_ref::<C>()
                .ok_or_else(|| CoreError::HookTypeMismatch {
                    hook: hook_name.clone(),
                    expected: std::any::type_name::<C>().to_string(),
                })?;
            let service = service
                .downcast::<S>()
                .map_err(|_| CoreError::HookTypeMismatch {
                    hook: hook_name,
                    expected: std::any::type_name::<S>().to_string(),
                })?;
            hook(target, service);
            Ok(())
        },
    )
}

fn hook_name(prefix: &str, capability: &CapabilityId) -> String {
    format!("{}{}", prefix, capability.simple_name())
}

/// 追踪依赖
///
/// 可选（组件可以在没有提供者时启动）且动态（启动后提供者可增可减）。
/// 钩子名称固定为 `"add" + 简单名称` 与 `"remove" + 简单名称`。
#[derive(Clone)]
pub struct TrackedDependency {
    capability: CapabilityId,
    add_method: String,
    remove_method: String,
    hooks: Option<CallbackHooks>,
}

impl TrackedDependency {
    /// 创建追踪依赖并计算钩子名称
    ///
    /// ```rust
    /// use chips_registrar::{CapabilityId, TrackedDependency};
    ///
    /// let dep = TrackedDependency::new(CapabilityId::of::<String>());
    /// assert_eq!(dep.add_method(), "addString");
    /// assert_eq!(dep.remove_method(), "removeString");
    /// ```
    pub fn new(capability: CapabilityId) -> Self {
        Self {
            add_method: hook_name(ADD_HOOK_PREFIX, &capability),
            remove_method: hook_name(REMOVE_HOOK_PREFIX, &capability),
            capability,
            hooks: None,
        }
    }

    /// 附加回调函数
    pub fn with_hooks(mut self, hooks: CallbackHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn capability(&self) -> &CapabilityId {
        &self.capability
    }

    pub fn add_method(&self) -> &str {
        &self.add_method
    }

    pub fn remove_method(&self) -> &str {
        &self.remove_method
    }

    pub fn hooks(&self) -> Option<&CallbackHooks> {
        self.hooks.as_ref()
    }
}

// 函数引用不参与比较
impl PartialEq for TrackedDependency {
    fn eq(&self, other: &Self) -> bool {
        self.capability == other.capability
            && self.add_method == other.add_method
            && self.remove_method == other.remove_method
    }
}

impl Eq for TrackedDependency {}

impl fmt::Debug for TrackedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedDependency")
            .field("capability", &self.capability)
            .field("add_method", &self.add_method)
            .field("remove_method", &self.remove_method)
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

/// 追踪依赖集合
///
/// 按能力去重，保留首次声明的顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSet {
    entries: Vec<TrackedDependency>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入追踪依赖
    ///
    /// 能力已存在时不新增条目；若已有条目没有回调函数而新条目有，则补上回调。
    /// 返回是否新增了条目。
    pub fn insert(&mut self, dependency: TrackedDependency) -> bool {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|d| d.capability == dependency.capability)
        {
            if existing.hooks.is_none() {
                existing.hooks = dependency.hooks;
            }
            return false;
        }
        self.entries.push(dependency);
        true
    }

    pub fn contains(&self, capability: &CapabilityId) -> bool {
        self.get(capability).is_some()
    }

    pub fn get(&self, capability: &CapabilityId) -> Option<&TrackedDependency> {
        self.entries.iter().find(|d| &d.capability == capability)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedDependency> {
        self.entries.iter()
    }
}

impl Extend<TrackedDependency> for TrackedSet {
    fn extend<I: IntoIterator<Item = TrackedDependency>>(&mut self, iter: I) {
        for dependency in iter {
            self.insert(dependency);
        }
    }
}

impl FromIterator<TrackedDependency> for TrackedSet {
    fn from_iter<I: IntoIterator<Item = TrackedDependency>>(iter: I) -> Self {
        let mut set = TrackedSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a TrackedSet {
    type Item = &'a TrackedDependency;
    type IntoIter = std::slice::Iter<'a, TrackedDependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for TrackedSet {
    type Item = TrackedDependency;
    type IntoIter = std::vec::IntoIter<TrackedDependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
