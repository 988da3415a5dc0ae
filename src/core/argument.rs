//! 条件参数
//!
//! 持久化形态为 `{"Type": ..., "Value": ...}`；嵌套条件与变量递归序列化。

use crate::core::criterion::Criterion;
use crate::core::error::OperationError;
use crate::core::operation::Operation;
use crate::core::value::{EnumValue, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 操作参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Value")]
pub enum Argument {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    Enum(EnumValue),
    List(Vec<Argument>),
    Range(Range),
    Criterion(Box<Criterion>),
    Operation(Operation),
    Variable(Variable),
}

/// 闭区间（两端都包含）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Range {
    pub min: Box<Argument>,
    pub max: Box<Argument>,
}

impl Range {
    pub fn new(min: impl Into<Argument>, max: impl Into<Argument>) -> Self {
        Self {
            min: Box::new(min.into()),
            max: Box::new(max.into()),
        }
    }
}

/// 命名变量，执行时解析为其值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Variable {
    pub variable_id: Uuid,
    pub name: String,
    pub value: Box<Argument>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self {
            variable_id: Uuid::new_v4(),
            name: name.into(),
            value: Box::new(value.into()),
        }
    }
}

impl Argument {
    /// 由多个参数组成的列表
    pub fn list<I, A>(items: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        Argument::List(items.into_iter().map(Into::into).collect())
    }

    /// 解析为运行时值
    ///
    /// 区间、条件与操作本身不是值，返回 `InvalidArgument`。
    pub fn resolve(&self) -> Result<Value, OperationError> {
        Ok(match self {
            Argument::Null => Value::Null,
            Argument::Boolean(b) => Value::Bool(*b),
            Argument::Integer(i) => Value::Integer(*i),
            Argument::Number(x) => Value::Float(*x),
            Argument::Text(s) => Value::Text(s.clone()),
            Argument::Date(d) => Value::Date(*d),
            Argument::Enum(e) => Value::Enum(e.clone()),
            Argument::List(items) => Value::List(
                items
                    .iter()
                    .map(Argument::resolve)
                    .collect::<Result<_, _>>()?,
            ),
            Argument::Variable(variable) => variable.value.resolve()?,
            Argument::Range(_) | Argument::Criterion(_) | Argument::Operation(_) => {
                return Err(OperationError::InvalidArgument(self.type_name().to_string()))
            }
        })
    }

    /// 若为区间（或解析为区间的变量），返回其上下界
    pub fn as_range(&self) -> Option<&Range> {
        match self {
            Argument::Range(range) => Some(range),
            Argument::Variable(variable) => variable.value.as_range(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Argument::Null => "Null",
            Argument::Boolean(_) => "Boolean",
            Argument::Integer(_) => "Integer",
            Argument::Number(_) => "Number",
            Argument::Text(_) => "Text",
            Argument::Date(_) => "Date",
            Argument::Enum(_) => "Enum",
            Argument::List(_) => "List",
            Argument::Range(_) => "Range",
            Argument::Criterion(_) => "Criterion",
            Argument::Operation(_) => "Operation",
            Argument::Variable(_) => "Variable",
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Null => write!(f, "null"),
            Argument::Boolean(b) => write!(f, "{}", b),
            Argument::Integer(i) => write!(f, "{}", i),
            Argument::Number(x) => write!(f, "{}", x),
            Argument::Text(s) => write!(f, "{}", s),
            Argument::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Argument::Enum(e) => write!(f, "{}", e.name),
            Argument::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Argument::Range(range) => write!(f, "{} and {}", range.min, range.max),
            Argument::Criterion(criterion) => write!(f, "{}", criterion),
            Argument::Operation(operation) => write!(f, "{}", operation),
            Argument::Variable(variable) => write!(f, "{{{}}}", variable.name),
        }
    }
}

impl From<bool> for Argument {
    fn from(b: bool) -> Self {
        Argument::Boolean(b)
    }
}

impl From<i32> for Argument {
    fn from(i: i32) -> Self {
        Argument::Integer(i as i64)
    }
}

impl From<i64> for Argument {
    fn from(i: i64) -> Self {
        Argument::Integer(i)
    }
}

impl From<f64> for Argument {
    fn from(x: f64) -> Self {
        Argument::Number(x)
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::Text(s.to_string())
    }
}

impl From<String> for Argument {
    fn from(s: String) -> Self {
        Argument::Text(s)
    }
}

impl From<DateTime<Utc>> for Argument {
    fn from(d: DateTime<Utc>) -> Self {
        Argument::Date(d)
    }
}

impl From<EnumValue> for Argument {
    fn from(e: EnumValue) -> Self {
        Argument::Enum(e)
    }
}

impl From<Range> for Argument {
    fn from(range: Range) -> Self {
        Argument::Range(range)
    }
}

impl From<Criterion> for Argument {
    fn from(criterion: Criterion) -> Self {
        Argument::Criterion(Box::new(criterion))
    }
}

impl From<Operation> for Argument {
    fn from(operation: Operation) -> Self {
        Argument::Operation(operation)
    }
}

impl From<Variable> for Argument {
    fn from(variable: Variable) -> Self {
        Argument::Variable(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(Argument::from(123)).unwrap();
        assert_eq!(json, json!({"Type": "Integer", "Value": 123}));

        let json = serde_json::to_value(Argument::from(Range::new(1, 10))).unwrap();
        assert_eq!(
            json,
            json!({"Type": "Range", "Value": {
                "Min": {"Type": "Integer", "Value": 1},
                "Max": {"Type": "Integer", "Value": 10}
            }})
        );

        let json = serde_json::to_value(Argument::Null).unwrap();
        assert_eq!(json, json!({"Type": "Null"}));
    }

    #[test]
    fn test_variable_resolves_to_value() {
        let variable = Argument::from(Variable::new("Limit", 50));
        assert_eq!(variable.resolve().unwrap(), Value::Integer(50));
        assert_eq!(variable.to_string(), "{Limit}");

        let parsed: Argument = serde_json::from_value(serde_json::to_value(&variable).unwrap()).unwrap();
        assert_eq!(parsed, variable);
    }

    #[test]
    fn test_non_values_rejected() {
        let err = Argument::from(Operation::EqualTo).resolve().unwrap_err();
        assert_eq!(err, OperationError::InvalidArgument("Operation".to_string()));
        assert_eq!(
            Argument::list(["a", "b"]).resolve().unwrap(),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }
}
