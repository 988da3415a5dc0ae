//! 规范定义
//!
//! 规范是有序的 查询 → 筛选 → 验证 步骤集合，持久化时带有 schema 版本。
//! 步骤按 `"Step"` 判别字段显式解码为封闭的三种类型。

use crate::core::criterion::Criterion;
use crate::core::migration::CURRENT_SCHEMA_VERSION;
use crate::core::models::{Element, Inclusion};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 规范
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Spec {
    pub spec_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// 候选对象之间的聚合策略
    #[serde(default)]
    pub candidate_inclusion: Inclusion,
    /// 单个候选对象内各验证的聚合策略
    #[serde(default)]
    pub verification_inclusion: Inclusion,
    /// 对候选数量的范围检查（属性为 `This`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Criterion>,
}

/// 步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Step")]
pub enum Step {
    Query(Query),
    Filter(Filter),
    Verify(Verify),
}

/// 查询：按元素种类从文档取对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Query {
    pub element: Element,
}

/// 筛选：All 要求全部条件成立，Any 要求至少一个成立
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    #[serde(default)]
    pub r#match: Inclusion,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

/// 验证：对每个剩余候选对象评估全部条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Verify {
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

impl Spec {
    /// 创建空规范
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec_id: Uuid::new_v4(),
            name: name.into(),
            schema_version: CURRENT_SCHEMA_VERSION,
            steps: Vec::new(),
            candidate_inclusion: Inclusion::All,
            verification_inclusion: Inclusion::All,
            range: None,
        }
    }

    pub fn with_id(mut self, spec_id: Uuid) -> Self {
        self.spec_id = spec_id;
        self
    }

    /// 查询步骤
    pub fn query(mut self, element: Element) -> Self {
        self.steps.push(Step::Query(Query { element }));
        self
    }

    /// 筛选步骤
    pub fn filter(mut self, r#match: Inclusion, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        self.steps.push(Step::Filter(Filter {
            r#match,
            criteria: criteria.into_iter().collect(),
        }));
        self
    }

    /// 验证步骤
    pub fn verify(mut self, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        self.steps.push(Step::Verify(Verify {
            criteria: criteria.into_iter().collect(),
        }));
        self
    }

    /// 设置两个聚合策略
    pub fn with_inclusion(mut self, candidates: Inclusion, verifications: Inclusion) -> Self {
        self.candidate_inclusion = candidates;
        self.verification_inclusion = verifications;
        self
    }

    /// 设置候选数量范围检查
    pub fn with_range(mut self, range: Criterion) -> Self {
        self.range = Some(range);
        self
    }

    /// 查询的元素种类
    pub fn element(&self) -> Option<Element> {
        self.steps.iter().find_map(|step| match step {
            Step::Query(query) => Some(query.element),
            _ => None,
        })
    }

    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.steps.iter().filter_map(|step| match step {
            Step::Filter(filter) => Some(filter),
            _ => None,
        })
    }

    /// 全部验证条件（按步骤顺序）
    pub fn verifications(&self) -> impl Iterator<Item = &Criterion> {
        self.steps.iter().flat_map(|step| match step {
            Step::Verify(verify) => verify.criteria.as_slice(),
            _ => &[][..],
        })
    }

    /// 检查步骤顺序：恰好一个查询且位于首位，验证之后不再出现筛选
    pub fn validate_steps(&self) -> Result<()> {
        match self.steps.first() {
            Some(Step::Query(_)) => {}
            Some(_) => bail!("规范 '{}' 的第一个步骤必须是查询", self.name),
            None => bail!("规范 '{}' 没有任何步骤", self.name),
        }

        let mut verifying = false;
        for step in &self.steps[1..] {
            match step {
                Step::Query(_) => bail!("规范 '{}' 包含多个查询步骤", self.name),
                Step::Filter(_) if verifying => {
                    bail!("规范 '{}' 的筛选步骤不能位于验证步骤之后", self.name)
                }
                Step::Filter(_) => {}
                Step::Verify(_) => verifying = true,
            }
        }
        Ok(())
    }
}
