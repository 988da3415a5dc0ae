//! 操作目录
//!
//! 所有谓词都是无状态的封闭枚举成员，按元数分为四族：
//! - 一元：忽略多余参数（空值、空集、布尔检查）
//! - 二元：恰好一个参数（相等、排序、文本匹配、成员关系）
//! - 三元：两个界值，或一个区间参数（Between/Outside）
//! - 集合：输入必须为集合，首个参数可以是操作、嵌套条件或普通值
//!
//! `execute` 是纯函数，元数或类型不符时返回错误，不做重试。

use crate::core::argument::Argument;
use crate::core::criterion::Criterion;
use crate::core::error::OperationError;
use crate::core::type_group::TypeGroup;
use crate::core::value::Value;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock};

/// 参数元数类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    None,
    One,
    Two,
    Sequence,
}

impl Arity {
    /// 用于错误信息的期望参数描述
    pub fn describe(&self) -> &'static str {
        match self {
            Arity::None => "no",
            Arity::One => "exactly one",
            Arity::Two => "exactly two",
            Arity::Sequence => "at least one",
        }
    }
}

/// 操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    // 一元
    Void,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    IsNullOrEmpty,
    IsNullOrWhiteSpace,
    IsTrue,
    IsFalse,
    IsNumeric,
    IsUpper,
    IsLower,
    // 二元
    EqualTo,
    NotEqualTo,
    IsEquivalent,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Containing,
    StartingWith,
    EndingWith,
    Like,
    Matching,
    In,
    NotIn,
    HasLength,
    // 三元
    Between,
    Outside,
    // 集合
    All,
    Any,
    NoneOf,
    Count,
}

impl Operation {
    pub const ALL: [Operation; 33] = [
        Operation::Void,
        Operation::IsNull,
        Operation::IsNotNull,
        Operation::IsEmpty,
        Operation::IsNotEmpty,
        Operation::IsNullOrEmpty,
        Operation::IsNullOrWhiteSpace,
        Operation::IsTrue,
        Operation::IsFalse,
        Operation::IsNumeric,
        Operation::IsUpper,
        Operation::IsLower,
        Operation::EqualTo,
        Operation::NotEqualTo,
        Operation::IsEquivalent,
        Operation::GreaterThan,
        Operation::GreaterThanOrEqualTo,
        Operation::LessThan,
        Operation::LessThanOrEqualTo,
        Operation::Containing,
        Operation::StartingWith,
        Operation::EndingWith,
        Operation::Like,
        Operation::Matching,
        Operation::In,
        Operation::NotIn,
        Operation::HasLength,
        Operation::Between,
        Operation::Outside,
        Operation::All,
        Operation::Any,
        Operation::NoneOf,
        Operation::Count,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Void => "Void",
            Operation::IsNull => "IsNull",
            Operation::IsNotNull => "IsNotNull",
            Operation::IsEmpty => "IsEmpty",
            Operation::IsNotEmpty => "IsNotEmpty",
            Operation::IsNullOrEmpty => "IsNullOrEmpty",
            Operation::IsNullOrWhiteSpace => "IsNullOrWhiteSpace",
            Operation::IsTrue => "IsTrue",
            Operation::IsFalse => "IsFalse",
            Operation::IsNumeric => "IsNumeric",
            Operation::IsUpper => "IsUpper",
            Operation::IsLower => "IsLower",
            Operation::EqualTo => "EqualTo",
            Operation::NotEqualTo => "NotEqualTo",
            Operation::IsEquivalent => "IsEquivalent",
            Operation::GreaterThan => "GreaterThan",
            Operation::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
            Operation::LessThan => "LessThan",
            Operation::LessThanOrEqualTo => "LessThanOrEqualTo",
            Operation::Containing => "Containing",
            Operation::StartingWith => "StartingWith",
            Operation::EndingWith => "EndingWith",
            Operation::Like => "Like",
            Operation::Matching => "Matching",
            Operation::In => "In",
            Operation::NotIn => "NotIn",
            Operation::HasLength => "HasLength",
            Operation::Between => "Between",
            Operation::Outside => "Outside",
            Operation::All => "All",
            Operation::Any => "Any",
            Operation::NoneOf => "NoneOf",
            Operation::Count => "Count",
        }
    }

    pub fn arity(&self) -> Arity {
        use Operation::*;
        match self {
            Void | IsNull | IsNotNull | IsEmpty | IsNotEmpty | IsNullOrEmpty
            | IsNullOrWhiteSpace | IsTrue | IsFalse | IsNumeric | IsUpper | IsLower => Arity::None,
            EqualTo | NotEqualTo | IsEquivalent | GreaterThan | GreaterThanOrEqualTo | LessThan
            | LessThanOrEqualTo | Containing | StartingWith | EndingWith | Like | Matching | In
            | NotIn | HasLength => Arity::One,
            Between | Outside => Arity::Two,
            All | Any | NoneOf | Count => Arity::Sequence,
        }
    }

    /// 是否适用于给定分组的属性（供编辑层筛选）
    pub fn supports(&self, group: TypeGroup) -> bool {
        use Operation::*;
        use TypeGroup as G;
        match self {
            Void | IsNull | IsNotNull => true,
            IsEmpty | IsNotEmpty | HasLength => matches!(group, G::Text | G::Collection),
            IsNullOrEmpty | IsNullOrWhiteSpace | IsNumeric | IsUpper | IsLower => {
                group == G::Text
            }
            IsTrue | IsFalse => group == G::Boolean,
            EqualTo | NotEqualTo => !matches!(group, G::Collection | G::Criterion),
            IsEquivalent => matches!(group, G::Text | G::Enum),
            GreaterThan | GreaterThanOrEqualTo | LessThan | LessThanOrEqualTo | Between
            | Outside => matches!(group, G::Number | G::Text | G::Date | G::Enum),
            Containing => matches!(group, G::Text | G::Collection),
            StartingWith | EndingWith | Like | Matching => group == G::Text,
            In | NotIn => matches!(
                group,
                G::Boolean | G::Number | G::Text | G::Date | G::Enum | G::Default
            ),
            All | Any | NoneOf | Count => group == G::Collection,
        }
    }

    /// 某分组可用的全部操作
    pub fn supported(group: TypeGroup) -> Vec<Operation> {
        Self::ALL
            .iter()
            .copied()
            .filter(|op| op.supports(group))
            .collect()
    }

    /// 执行操作
    pub fn execute(&self, input: &Value, args: &[Argument]) -> Result<bool, OperationError> {
        match self.arity() {
            Arity::None => Ok(self.unary(input)),
            Arity::One => match args {
                [arg] => self.binary(input, &arg.resolve()?),
                _ => Err(self.arity_error(args.len())),
            },
            Arity::Two => {
                let (min, max) = self.bounds(args)?;
                self.ternary(input, &min, &max)
            }
            Arity::Sequence => self.collection(input, args),
        }
    }

    fn arity_error(&self, received: usize) -> OperationError {
        OperationError::Arity {
            operation: *self,
            expected: self.arity().describe(),
            received,
        }
    }

    fn unary(&self, input: &Value) -> bool {
        match self {
            Operation::Void => true,
            Operation::IsNull => input.is_null(),
            Operation::IsNotNull => !input.is_null(),
            Operation::IsEmpty => input.length() == Some(0),
            Operation::IsNotEmpty => matches!(input.length(), Some(n) if n > 0),
            Operation::IsNullOrEmpty => input.is_null() || input.length() == Some(0),
            Operation::IsNullOrWhiteSpace => match input {
                Value::Null => true,
                Value::Text(s) => s.trim().is_empty(),
                _ => false,
            },
            Operation::IsTrue => matches!(input, Value::Bool(true)),
            Operation::IsFalse => matches!(input, Value::Bool(false)),
            Operation::IsNumeric => match input {
                Value::Integer(_) | Value::Float(_) => true,
                Value::Text(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            },
            Operation::IsUpper => match input {
                Value::Text(s) => {
                    s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_lowercase)
                }
                _ => false,
            },
            Operation::IsLower => match input {
                Value::Text(s) => {
                    s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_uppercase)
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn binary(&self, input: &Value, arg: &Value) -> Result<bool, OperationError> {
        match self {
            Operation::EqualTo => Ok(input.loose_eq(arg)),
            Operation::NotEqualTo => Ok(!input.loose_eq(arg)),
            Operation::IsEquivalent => Ok(!input.is_null()
                && input.to_string().to_lowercase() == arg.to_string().to_lowercase()),
            Operation::GreaterThan => Ok(input.compare(arg)? == Ordering::Greater),
            Operation::GreaterThanOrEqualTo => Ok(input.compare(arg)? != Ordering::Less),
            Operation::LessThan => Ok(input.compare(arg)? == Ordering::Less),
            Operation::LessThanOrEqualTo => Ok(input.compare(arg)? != Ordering::Greater),
            Operation::Containing => Ok(match input {
                Value::Text(s) => s.contains(&arg.to_string()),
                Value::List(items) => items.iter().any(|item| item.loose_eq(arg)),
                _ => false,
            }),
            Operation::StartingWith => {
                Ok(input.as_text().is_some_and(|s| s.starts_with(&arg.to_string())))
            }
            Operation::EndingWith => {
                Ok(input.as_text().is_some_and(|s| s.ends_with(&arg.to_string())))
            }
            Operation::Like => match input.as_text() {
                Some(s) => matches_pattern(&wildcard_to_regex(&arg.to_string()), s, true),
                None => Ok(false),
            },
            Operation::Matching => match input {
                Value::Null => Ok(false),
                other => matches_pattern(&arg.to_string(), &other.to_string(), false),
            },
            Operation::In => Ok(contains(arg, input)),
            Operation::NotIn => Ok(!contains(arg, input)),
            Operation::HasLength => {
                let expected = match arg {
                    Value::Integer(n) => *n,
                    Value::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                        OperationError::InvalidArgument(arg.type_name().to_string())
                    })?,
                    other => {
                        return Err(OperationError::InvalidArgument(
                            other.type_name().to_string(),
                        ))
                    }
                };
                Ok(input.length().is_some_and(|n| n as i64 == expected))
            }
            _ => Err(self.arity_error(1)),
        }
    }

    /// 三元操作的上下界：两个参数，或一个区间
    fn bounds(&self, args: &[Argument]) -> Result<(Value, Value), OperationError> {
        match args {
            [single] => match single.as_range() {
                Some(range) => Ok((range.min.resolve()?, range.max.resolve()?)),
                None => Err(self.arity_error(1)),
            },
            [min, max] => Ok((min.resolve()?, max.resolve()?)),
            _ => Err(self.arity_error(args.len())),
        }
    }

    fn ternary(&self, input: &Value, min: &Value, max: &Value) -> Result<bool, OperationError> {
        let above_min = input.compare(min)? != Ordering::Less;
        let below_max = input.compare(max)? != Ordering::Greater;
        match self {
            Operation::Between => Ok(above_min && below_max),
            Operation::Outside => Ok(!(above_min && below_max)),
            _ => Err(self.arity_error(2)),
        }
    }

    fn collection(&self, input: &Value, args: &[Argument]) -> Result<bool, OperationError> {
        let items = input.as_list().ok_or_else(|| OperationError::NotCollection {
            operation: *self,
            found: input.type_name().to_string(),
        })?;
        let inner = Inner::parse(*self, args)?;

        match self {
            Operation::All => {
                for item in items {
                    if !inner.test(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operation::Any => {
                for item in items {
                    if inner.test(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Operation::NoneOf => {
                for item in items {
                    if inner.test(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operation::Count => inner.test(&Value::Integer(items.len() as i64)),
            _ => Err(self.arity_error(args.len())),
        }
    }
}

/// 集合操作的内层谓词
enum Inner<'a> {
    Operation(Operation, &'a [Argument]),
    Criterion(&'a Criterion),
    Value(Value),
}

impl<'a> Inner<'a> {
    fn parse(outer: Operation, args: &'a [Argument]) -> Result<Self, OperationError> {
        match args.split_first() {
            Some((Argument::Operation(op), rest)) => Ok(Inner::Operation(*op, rest)),
            Some((Argument::Criterion(criterion), [])) => Ok(Inner::Criterion(criterion.as_ref())),
            Some((value, [])) => Ok(Inner::Value(value.resolve()?)),
            _ => Err(OperationError::Arity {
                operation: outer,
                expected: "one value, criterion, or operation with its",
                received: args.len(),
            }),
        }
    }

    fn test(&self, item: &Value) -> Result<bool, OperationError> {
        match self {
            Inner::Operation(op, rest) => op.execute(item, rest),
            Inner::Criterion(criterion) => criterion
                .check(item)
                .map_err(|e| OperationError::Criterion(e.to_string())),
            Inner::Value(value) => Ok(item.loose_eq(value)),
        }
    }
}

fn contains(list: &Value, input: &Value) -> bool {
    match list {
        Value::List(items) => items.iter().any(|item| item.loose_eq(input)),
        single => single.loose_eq(input),
    }
}

/// `*`/`%` 匹配任意串，`?`/`_` 匹配单个字符
fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' | '%' => regex.push_str(".*"),
            '?' | '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

/// 已编译的正则，按 (模式, 是否忽略大小写) 缓存
static PATTERNS: OnceLock<RwLock<HashMap<(String, bool), Regex>>> = OnceLock::new();

/// 缓存条目上限，超出后整体清空
const PATTERN_CACHE_LIMIT: usize = 256;

fn compiled_pattern(pattern: &str, ignore_case: bool) -> Result<Regex, OperationError> {
    let cache = PATTERNS.get_or_init(|| RwLock::new(HashMap::new()));
    let key = (pattern.to_string(), ignore_case);

    if let Some(regex) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(regex.clone());
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| OperationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    let mut patterns = cache.write().unwrap_or_else(PoisonError::into_inner);
    if patterns.len() >= PATTERN_CACHE_LIMIT {
        patterns.clear();
    }
    patterns.insert(key, regex.clone());
    Ok(regex)
}

fn matches_pattern(pattern: &str, text: &str, ignore_case: bool) -> Result<bool, OperationError> {
    Ok(compiled_pattern(pattern, ignore_case)?.is_match(text))
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operation '{}'", s))
    }
}
