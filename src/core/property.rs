//! 属性与访问器
//!
//! 属性由 (起始类型, 点分路径) 唯一确定。构造时把路径编译成一串空值短路的闭包，
//! 之后对每个候选对象求值都复用同一个访问器，不再重复解析路径。

use crate::core::catalog::TypeCatalog;
use crate::core::type_group::TypeGroup;
use crate::core::value::Value;
use std::fmt;
use std::sync::Arc;

/// 编译后的访问器
pub type Accessor = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// 可导航的属性路径
#[derive(Clone)]
pub struct Property {
    origin: String,
    path: String,
    accessor: Accessor,
}

impl Property {
    /// 指向候选对象自身的路径
    pub const THIS: &'static str = "This";

    pub fn new(origin: impl Into<String>, path: impl Into<String>) -> Self {
        let origin = origin.into();
        let path = normalize(&path.into());
        let segments: Vec<String> = split(&path).map(str::to_string).collect();
        let accessor = compile(&segments);

        Self {
            origin,
            path,
            accessor,
        }
    }

    /// 候选对象自身
    pub fn this(origin: impl Into<String>) -> Self {
        Self::new(origin, Self::THIS)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.origin, &self.path)
    }

    /// 路径段（`This` 没有段）
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        split(&self.path)
    }

    /// 路径最后一段的名称
    pub fn name(&self) -> &str {
        self.segments().last().unwrap_or(Self::THIS)
    }

    /// 对候选对象求值
    pub fn value(&self, candidate: &Value) -> Value {
        (self.accessor)(candidate)
    }

    /// 终端成员的静态类型名（目录未知时为 `Default`）
    pub fn type_name(&self, catalog: &TypeCatalog) -> String {
        catalog
            .resolve_path(&self.origin, self.segments())
            .unwrap_or_else(|| "Default".to_string())
    }

    pub fn group(&self, catalog: &TypeCatalog) -> TypeGroup {
        catalog.group(&self.type_name(catalog))
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('.');
    if trimmed.is_empty() {
        return Property::THIS.to_string();
    }
    trimmed
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
        .enumerate()
        .filter(|(i, s)| !(*i == 0 && *s == Property::THIS))
        .map(|(_, s)| s)
}

/// 递归构建访问器：当前段为空则整条表达式短路为空，否则进入剩余路径
fn compile(segments: &[String]) -> Accessor {
    match segments.split_first() {
        None => Arc::new(|value: &Value| value.clone()),
        Some((head, rest)) => {
            let head = head.clone();
            let next = compile(rest);
            Arc::new(move |value: &Value| {
                let member = value.member(&head);
                if member.is_null() {
                    Value::Null
                } else {
                    next(&member)
                }
            })
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("origin", &self.origin)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
