//! 类型分组
//!
//! 将值或静态类型归入一个小的封闭集合，用于筛选属性可用的操作。

use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 类型分组（仅作分类标签，无顺序含义）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TypeGroup {
    #[default]
    Default,
    Boolean,
    Number,
    Text,
    Date,
    Enum,
    Collection,
    Element,
    Criterion,
}

impl TypeGroup {
    pub const ALL: [TypeGroup; 9] = [
        TypeGroup::Default,
        TypeGroup::Boolean,
        TypeGroup::Number,
        TypeGroup::Text,
        TypeGroup::Date,
        TypeGroup::Enum,
        TypeGroup::Collection,
        TypeGroup::Element,
        TypeGroup::Criterion,
    ];

    /// 运行时值的分组（空值归为 Default）
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => TypeGroup::Default,
            Value::Bool(_) => TypeGroup::Boolean,
            Value::Integer(_) | Value::Float(_) => TypeGroup::Number,
            Value::Text(_) => TypeGroup::Text,
            Value::Date(_) => TypeGroup::Date,
            Value::Enum(_) => TypeGroup::Enum,
            Value::List(_) => TypeGroup::Collection,
            Value::Object(_) => TypeGroup::Element,
        }
    }

    /// 内置基础类型名称的分组，非基础类型返回 `None`
    pub fn of_primitive(type_name: &str) -> Option<Self> {
        match type_name {
            "Boolean" => Some(TypeGroup::Boolean),
            "Integer" | "Number" => Some(TypeGroup::Number),
            "Text" => Some(TypeGroup::Text),
            "Date" => Some(TypeGroup::Date),
            "Criterion" => Some(TypeGroup::Criterion),
            name if name.starts_with("List<") => Some(TypeGroup::Collection),
            _ => None,
        }
    }
}

impl fmt::Display for TypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
