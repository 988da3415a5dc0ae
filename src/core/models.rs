//! 核心数据模型定义
//!
//! 元素种类、包含策略、结果等级以及评估/验证/运行结果记录。
//! 结果记录一经构造即只读。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 元素种类
/// 文档可以按种类返回其中的全部对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Controller,
    DataType,
    AddOnInstruction,
    Module,
    Tag,
    Program,
    Routine,
    Rung,
    Task,
}

impl Element {
    pub const ALL: [Element; 9] = [
        Element::Controller,
        Element::DataType,
        Element::AddOnInstruction,
        Element::Module,
        Element::Tag,
        Element::Program,
        Element::Routine,
        Element::Rung,
        Element::Task,
    ];

    /// 元素对应的根类型名称（属性路径的起点）
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Controller => "Controller",
            Element::DataType => "DataType",
            Element::AddOnInstruction => "AddOnInstruction",
            Element::Module => "Module",
            Element::Tag => "Tag",
            Element::Program => "Program",
            Element::Routine => "Routine",
            Element::Rung => "Rung",
            Element::Task => "Task",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.type_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown element '{}'", s))
    }
}

/// 包含策略（筛选的 Match，以及结果聚合的 InclusionType）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Inclusion {
    #[default]
    All,
    Any,
}

/// 结果等级，按严重程度全序排列
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ResultState {
    #[default]
    None,
    Passed,
    Inconclusive,
    Failed,
    Error,
}

impl ResultState {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            ResultState::Passed
        } else {
            ResultState::Failed
        }
    }

    /// 最严重的结果（空集为 None）
    pub fn worst(states: impl IntoIterator<Item = ResultState>) -> Self {
        states.into_iter().max().unwrap_or_default()
    }

    /// 最轻的结果（空集为 None）
    pub fn best(states: impl IntoIterator<Item = ResultState>) -> Self {
        states.into_iter().min().unwrap_or_default()
    }

    /// 按包含策略合并：All 取最严重，Any 取最轻
    pub fn aggregate(inclusion: Inclusion, states: impl IntoIterator<Item = ResultState>) -> Self {
        match inclusion {
            Inclusion::All => Self::worst(states),
            Inclusion::Any => Self::best(states),
        }
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 单个条件对单个候选对象的评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Evaluation {
    pub criterion_id: Uuid,
    pub result: ResultState,
    /// 候选对象快照
    pub candidate: String,
    /// 条件描述
    pub criteria: String,
    pub expected: String,
    pub actual: String,
    pub error: Option<String>,
}

/// 单个候选对象的验证结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Verification {
    pub candidate: String,
    pub result: ResultState,
    pub evaluations: Vec<Evaluation>,
}

impl Verification {
    /// 按验证包含策略合并该候选对象的全部评估
    pub fn new(candidate: String, inclusion: Inclusion, evaluations: Vec<Evaluation>) -> Self {
        let result = ResultState::aggregate(inclusion, evaluations.iter().map(|e| e.result));
        Self {
            candidate,
            result,
            evaluations,
        }
    }
}

/// 一次规范运行的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Outcome {
    pub spec_id: Uuid,
    pub name: String,
    /// 聚合结果；没有验证步骤时为 None
    pub result: ResultState,
    /// 查询返回的对象数
    pub found: usize,
    /// 经筛选后的候选数
    pub candidates: usize,
    pub in_range: bool,
    pub verifications: Vec<Verification>,
    pub duration_ms: u64,
    pub ran_at: DateTime<Utc>,
}

impl Outcome {
    /// 全部评估（扁平化）
    pub fn evaluations(&self) -> impl Iterator<Item = &Evaluation> {
        self.verifications.iter().flat_map(|v| v.evaluations.iter())
    }
}
