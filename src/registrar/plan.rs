//! 注册计划
//!
//! 翻译结果：交给生命周期管理器的完整注册说明。每次翻译都重新构造，不缓存。

use serde::{Deserialize, Serialize};

use crate::component::{
    CallbackHooks, CapabilityId, Implementation, RequiredDependency, TrackedDependency,
};

/// 追踪依赖的回调
#[derive(Debug, Clone)]
pub struct CallbackNames {
    /// 添加钩子名
    pub add: String,
    /// 移除钩子名
    pub remove: String,
    /// 组件作者提供的函数引用
    pub hooks: Option<CallbackHooks>,
}

// 函数引用不参与比较
impl PartialEq for CallbackNames {
    fn eq(&self, other: &Self) -> bool {
        self.add == other.add && self.remove == other.remove
    }
}

/// 计划中的一条依赖
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEntry {
    /// 依赖的能力
    pub capability: CapabilityId,
    /// 是否必需
    pub mandatory: bool,
    /// 回调（只有追踪依赖才有）
    pub callbacks: Option<CallbackNames>,
}

impl DependencyEntry {
    /// 必需依赖项
    pub fn required(dependency: &RequiredDependency) -> Self {
        Self {
            capability: dependency.capability.clone(),
            mandatory: true,
            callbacks: None,
        }
    }

    /// 追踪依赖项：可选，带 add/remove 钩子
    pub fn tracked(dependency: &TrackedDependency) -> Self {
        Self {
            capability: dependency.capability().clone(),
            mandatory: false,
            callbacks: Some(CallbackNames {
                add: dependency.add_method().to_string(),
                remove: dependency.remove_method().to_string(),
                hooks: dependency.hooks().cloned(),
            }),
        }
    }
}

/// 注册计划
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationPlan {
    /// 实现目标
    pub implementation: Implementation,
    /// 发布的能力
    pub published_capabilities: Vec<CapabilityId>,
    /// 必需依赖
    pub required_entries: Vec<DependencyEntry>,
    /// 追踪依赖
    pub tracked_entries: Vec<DependencyEntry>,
}

impl RegistrationPlan {
    /// 组件类型标识
    pub fn component(&self) -> &CapabilityId {
        self.implementation.component_id()
    }

    /// 全部依赖：先必需，后追踪
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.required_entries.iter().chain(self.tracked_entries.iter())
    }

    /// 可序列化的摘要，用于日志与诊断
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            component: self.component().to_string(),
            implementation: self.implementation.kind().to_string(),
            published: self
                .published_capabilities
                .iter()
                .map(|c| c.to_string())
                .collect(),
            dependencies: self
                .dependencies()
                .map(|entry| DependencySummary {
                    capability: entry.capability.to_string(),
                    mandatory: entry.mandatory,
                    add: entry.callbacks.as_ref().map(|c| c.add.clone()),
                    remove: entry.callbacks.as_ref().map(|c| c.remove.clone()),
                })
                .collect(),
        }
    }
}

/// 注册计划摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub component: String,
    pub implementation: String,
    pub published: Vec<String>,
    pub dependencies: Vec<DependencySummary>,
}

/// 依赖摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySummary {
    pub capability: String,
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentType, TypeDescriptor};

    struct Sample;
    struct Logger;

    fn sample_plan() -> RegistrationPlan {
        let descriptor = TypeDescriptor::builder::<Sample>().component().build();
        RegistrationPlan {
            implementation: Implementation::Type(ComponentType::from_descriptor(&descriptor)),
            published_capabilities: vec![CapabilityId::of::<Sample>()],
            required_entries: vec![DependencyEntry::required(&RequiredDependency::new(
                CapabilityId::of::<Logger>(),
            ))],
            tracked_entries: vec![DependencyEntry::tracked(&TrackedDependency::new(
                CapabilityId::of::<String>(),
            ))],
        }
    }

    #[test]
    fn test_entry_kinds() {
        let plan = sample_plan();
        assert!(plan.required_entries[0].mandatory);
        assert!(plan.required_entries[0].callbacks.is_none());

        let tracked = &plan.tracked_entries[0];
        assert!(!tracked.mandatory);
        let callbacks = tracked.callbacks.as_ref().unwrap();
        assert_eq!(callbacks.add, "addString");
        assert_eq!(callbacks.remove, "removeString");
    }

    #[test]
    fn test_dependencies_order() {
        let plan = sample_plan();
        let caps: Vec<_> = plan.dependencies().map(|d| d.capability.simple_name()).collect();
        assert_eq!(caps, vec!["Logger", "String"]);
    }

    #[test]
    fn test_summary_json() {
        let summary = sample_plan().summary();
        assert_eq!(summary.implementation, "type");
        assert_eq!(summary.dependencies.len(), 2);

        let json = serde_json::to_value(&summary).unwrap();
        // 必需依赖没有钩子字段
        assert!(json["dependencies"][0].get("add").is_none());
        assert_eq!(json["dependencies"][1]["add"], "addString");
        assert_eq!(json["dependencies"][1]["mandatory"], false);
    }
}
