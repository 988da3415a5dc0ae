//! 运行时值模型
//!
//! 文档中的对象、属性解析结果以及参数在执行时统一表示为 `Value`。
//! 对象通过 `Arc` 共享，构造后不再修改。

use crate::core::catalog::TypeCatalog;
use crate::core::error::OperationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 枚举值（名称 + 数值）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 结构化对象（如标签、程序、模块）
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: String,
    members: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: BTreeMap::new(),
        }
    }

    /// 添加成员（构造期使用）
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 对象的 `Name` 成员（若为文本）
    pub fn name(&self) -> Option<&str> {
        match self.members.get("Name") {
            Some(Value::Text(name)) => Some(name),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

/// 松散类型的运行时值
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(DateTime<Utc>),
    Enum(EnumValue),
    List(Vec<Value>),
    Object(Arc<Object>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 值的类型名称（对象返回其自身类型）
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Number",
            Value::Text(_) => "Text",
            Value::Date(_) => "Date",
            Value::Enum(_) => "Enum",
            Value::List(_) => "List",
            Value::Object(object) => object.type_name(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 文本按字符计数，集合按元素计数
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// 访问单个路径段
    ///
    /// 对象返回同名成员；集合支持 `Count`，文本支持 `Length`；其余一律为空。
    pub fn member(&self, name: &str) -> Value {
        match self {
            Value::Object(object) => object.member(name).cloned().unwrap_or_default(),
            Value::List(items) if name == "Count" => Value::Integer(items.len() as i64),
            Value::Text(s) if name == "Length" => Value::Integer(s.chars().count() as i64),
            _ => Value::Null,
        }
    }

    /// 宽松相等：数字跨整数/浮点比较，文本可与数字、布尔、日期、枚举互相解析
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bool(b), Value::Text(s)) | (Value::Text(s), Value::Bool(b)) => {
                s.trim()
                    .to_ascii_lowercase()
                    .parse::<bool>()
                    .map(|p| p == *b)
                    .unwrap_or(false)
            }
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::Integer(_) | Value::Float(_), Value::Text(s)) => {
                s.trim().parse::<f64>().ok() == self.as_f64()
            }
            (Value::Text(s), Value::Integer(_) | Value::Float(_)) => {
                s.trim().parse::<f64>().ok() == other.as_f64()
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Date(d), Value::Text(s)) | (Value::Text(s), Value::Date(d)) => {
                parse_date(s).map(|p| p == *d).unwrap_or(false)
            }
            (Value::Enum(a), Value::Enum(b)) => a.name.eq_ignore_ascii_case(&b.name),
            (Value::Enum(e), Value::Text(s)) | (Value::Text(s), Value::Enum(e)) => {
                e.name.eq_ignore_ascii_case(s.trim())
            }
            (Value::Enum(e), Value::Integer(i)) | (Value::Integer(i), Value::Enum(e)) => {
                e.value == *i
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }

    /// 有序比较
    ///
    /// 输入必须是可排序类型，否则返回 `NotComparable`；参数按输入类型解析。
    pub fn compare(&self, other: &Value) -> Result<Ordering, OperationError> {
        let incompatible = || OperationError::Incompatible {
            input: self.type_name().to_string(),
            argument: other.type_name().to_string(),
        };

        match self {
            Value::Null | Value::List(_) | Value::Object(_) => {
                return Err(OperationError::NotComparable(self.type_name().to_string()))
            }
            _ => {}
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => self
                .as_f64()
                .zip(other.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b))
                .ok_or_else(incompatible),
            (Value::Integer(_) | Value::Float(_), Value::Text(s)) => {
                let parsed = s.trim().parse::<f64>().map_err(|_| incompatible())?;
                self.as_f64()
                    .and_then(|a| a.partial_cmp(&parsed))
                    .ok_or_else(incompatible)
            }
            (Value::Text(a), Value::Text(b)) => Ok(a.as_str().cmp(b.as_str())),
            (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
            (Value::Date(a), Value::Text(s)) => {
                parse_date(s).map(|b| a.cmp(&b)).ok_or_else(incompatible)
            }
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Enum(a), Value::Enum(b)) => Ok(a.value.cmp(&b.value)),
            (Value::Enum(a), Value::Integer(b)) => Ok(a.value.cmp(b)),
            _ => Err(incompatible()),
        }
    }

    /// 从JSON构建值（不借助类型目录）
    ///
    /// 对象类型名取 `$type` 字段，缺省使用 `type_hint`；字符串一律保留为文本。
    pub fn from_json(json: &serde_json::Value, type_hint: &str) -> Value {
        Value::from_json_typed(json, type_hint, &TypeCatalog::new())
    }

    /// 按类型目录从JSON构建值
    ///
    /// `type_name` 是该位置的静态类型：成员类型为 `Date` 时才把 RFC3339 字符串解析为日期，
    /// `List<T>` 的元素以 `T` 为类型，对象成员的类型取自目录，`$type` 字段优先。
    pub fn from_json_typed(json: &serde_json::Value, type_name: &str, catalog: &TypeCatalog) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) if type_name == "Date" => match parse_date(s) {
                Some(date) => Value::Date(date),
                None => Value::Text(s.clone()),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                let item_type = list_item_type(type_name).unwrap_or(DEFAULT_TYPE);
                Value::List(
                    items
                        .iter()
                        .map(|item| Value::from_json_typed(item, item_type, catalog))
                        .collect(),
                )
            }
            serde_json::Value::Object(map) => {
                let type_name = map
                    .get("$type")
                    .and_then(|t| t.as_str())
                    .unwrap_or(type_name);
                let mut object = Object::new(type_name);
                for (key, member) in map.iter().filter(|(k, _)| k.as_str() != "$type") {
                    let member_type = catalog
                        .member_type(type_name, key)
                        .unwrap_or_else(|| DEFAULT_TYPE.to_string());
                    object = object.with(
                        key.clone(),
                        Value::from_json_typed(member, &member_type, catalog),
                    );
                }
                object.into_value()
            }
        }
    }
}

const DEFAULT_TYPE: &str = "Default";

/// `List<T>` -> `T`
fn list_item_type(type_name: &str) -> Option<&str> {
    type_name.strip_prefix("List<")?.strip_suffix('>')
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Enum(e) => write!(f, "{}", e.name),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(object) => match object.name() {
                Some(name) => write!(f, "{} '{}'", object.type_name(), name),
                None => write!(f, "{}", object.type_name()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        object.into_value()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map(Into::into).unwrap_or_default()
    }
}
