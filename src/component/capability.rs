//! 能力标识
//!
//! 组件以能力（接口或类型名）对外发布自己，也以能力声明依赖。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 单元类型的简单名称
const UNIT_NAME: &str = "Unit";

/// 能力标识
///
/// 对应一个接口或类型的完整路径名，例如 `alloc::string::String`
/// 或 `dyn app::EntryPoint`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(String);

impl CapabilityId {
    /// 由 Rust 类型构造能力标识
    ///
    /// 支持 `dyn Trait`、基本类型与泛型类型。
    ///
    /// ```rust
    /// use chips_registrar::CapabilityId;
    ///
    /// let id = CapabilityId::of::<String>();
    /// assert_eq!(id.simple_name(), "String");
    /// ```
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    /// 由名称构造能力标识（清单文件使用）
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// 完整名称
    pub fn name(&self) -> &str {
        &self.0
    }

    /// 简单名称
    ///
    /// 取最后一段路径，去掉泛型参数以及 `dyn`/引用前缀：
    /// `alloc::vec::Vec<u8>` → `Vec`，`dyn app::EntryPoint` → `EntryPoint`。
    ///
    /// 切片、数组与元组取第一个元素的类型：`&[u8]` → `u8`，
    /// `[alloc::string::String; 2]` → `String`，`(u8, String)` → `u8`。
    /// 单元类型 `()` 记为 `Unit`。
    pub fn simple_name(&self) -> &str {
        let base = self.0.split('<').next().unwrap_or(&self.0);

        let mut base = base.trim();
        loop {
            let stripped = base.trim_start_matches(&['&', '(', '['][..]).trim_start();
            let stripped = stripped
                .strip_prefix("mut ")
                .or_else(|| stripped.strip_prefix("dyn "))
                .unwrap_or(stripped);
            if stripped == base {
                break;
            }
            base = stripped;
        }

        // `dyn Trait + Send` 只取主 trait；数组长度与其余元组元素丢弃
        let end = base
            .find(&[';', ',', ')', ']', '+'][..])
            .unwrap_or(base.len());
        let base = base[..end].trim();

        match base.rsplit("::").next() {
            Some(name) if !name.is_empty() => name,
            _ => UNIT_NAME,
        }
    }

    /// 是否为空标识
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityId {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for CapabilityId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
