//! 组件清单解析器
//!
//! 负责从 YAML 清单文件解析组件类型描述，适用于不在编译期实现
//! [`Described`](super::Described) 的组件。
//!
//! ```yaml
//! type: "app::FakeComponent"
//! component:
//!   provides:
//!     - "app::EntryPoint"
//! fields:
//!   - name: dash_manager
//!     type: "app::DashManager"
//!     service: true
//! callback: "alloc::string::String"
//! callbacks:
//!   - "i32"
//! ```
//!
//! `component: {}` 表示带组件标记但不声明显式能力；省略 `component` 表示不是组件。

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::capability::CapabilityId;
use super::descriptor::{ComponentMarker, FieldDescriptor, TypeDescriptor};
use crate::utils::{CoreError, Result};

/// 组件标记段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSection {
    /// 显式发布的能力
    #[serde(default)]
    pub provides: Vec<CapabilityId>,
}

/// 组件清单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentManifest {
    /// 类型名
    #[serde(rename = "type")]
    pub type_name: CapabilityId,

    /// 组件标记
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentSection>,

    /// 字段声明
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// 单个追踪声明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<CapabilityId>,

    /// 重复追踪声明
    #[serde(default)]
    pub callbacks: Vec<CapabilityId>,
}

impl ComponentManifest {
    /// 转换为类型描述
    ///
    /// 单个与重复两种追踪声明在这里合并去重。
    pub fn into_descriptor(self) -> TypeDescriptor {
        let mut builder = TypeDescriptor::builder_named(self.type_name);

        if let Some(section) = self.component {
            builder = builder.marker(ComponentMarker::providing(section.provides));
        }

        for field in self.fields {
            builder = builder.field_descriptor(field);
        }

        builder
            .track_all(self.callback)
            .track_all(self.callbacks)
            .build()
    }
}

/// 组件清单解析器
#[derive(Debug, Clone, Default)]
pub struct DescriptorParser;

impl DescriptorParser {
    pub fn new() -> Self {
        Self
    }

    /// 从文件解析类型描述
    ///
    /// # Errors
    ///
    /// - 文件不存在或无法读取时返回 IO 错误
    /// - 内容不是合法 YAML 时返回 YAML 错误
    /// - 验证失败时返回 `InvalidDescriptor` 错误
    pub async fn parse_file(path: &Path) -> Result<TypeDescriptor> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_string(&content)
    }

    /// 从文件同步解析类型描述
    pub fn parse_file_sync(path: &Path) -> Result<TypeDescriptor> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_string(&content)
    }

    /// 从字符串解析类型描述
    pub fn parse_string(content: &str) -> Result<TypeDescriptor> {
        let manifest = Self::parse_manifest(content)?;
        Ok(manifest.into_descriptor())
    }

    /// 解析并验证清单，不转换为描述
    pub fn parse_manifest(content: &str) -> Result<ComponentManifest> {
        let manifest: ComponentManifest = serde_yaml::from_str(content)?;
        Self::validate(&manifest)?;
        Ok(manifest)
    }

    /// 验证组件清单
    ///
    /// 收集所有问题后一次性返回：
    /// - 类型名不能为空
    /// - 显式能力不能为空、不能重复
    /// - 字段名与字段类型不能为空，字段名不能重复
    /// - 追踪声明的能力不能为空
    pub fn validate(manifest: &ComponentManifest) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if manifest.type_name.is_empty() {
            errors.push("类型名不能为空".to_string());
        }

        if let Some(section) = &manifest.component {
            let mut seen = HashSet::new();
            for (index, capability) in section.provides.iter().enumerate() {
                if capability.is_empty() {
                    errors.push(format!("第 {} 个发布能力不能为空", index + 1));
                } else if !seen.insert(capability) {
                    errors.push(format!("发布能力重复: '{}'", capability));
                }
            }
        }

        let mut field_names = HashSet::new();
        for (index, field) in manifest.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                errors.push(format!("第 {} 个字段的名称不能为空", index + 1));
            } else if !field_names.insert(field.name.as_str()) {
                errors.push(format!("字段名重复: '{}'", field.name));
            }

            if field.declared_type.is_empty() {
                errors.push(format!("字段 '{}' 的类型不能为空", field.name));
            }
        }

        if manifest.callback.as_ref().is_some_and(|c| c.is_empty()) {
            errors.push("callback 的能力不能为空".to_string());
        }
        for (index, capability) in manifest.callbacks.iter().enumerate() {
            if capability.is_empty() {
                errors.push(format!("第 {} 个 callbacks 能力不能为空", index + 1));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidDescriptor(errors.join("; ")))
        }
    }
}
