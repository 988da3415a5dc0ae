//! 规则引擎模块
//!
//! 负责按 查询 → 筛选 → 验证 的顺序运行规范并聚合结果。
//! 引擎本身不持有可变状态，单次运行是顺序的；取消只在运行开始前检查。
//! 条件评估中的错误被隔离在各自的评估结果中，查询和筛选中的错误则让整次运行失败。

use crate::core::criterion::Criterion;
use crate::core::document::Document;
use crate::core::models::{Inclusion, Outcome, ResultState, Verification};
use crate::core::spec::{Filter, Spec, Step};
use crate::core::value::Value;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// 取消标志（可在多个运行之间共享）
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 规则引擎
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    cancel: Option<CancelFlag>,
}

impl RuleEngine {
    /// 创建新的规则引擎
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定取消标志
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// 对文档运行规范
    pub fn run(&self, spec: &Spec, document: &dyn Document) -> Result<Outcome> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            bail!("规范 '{}' 的运行已取消", spec.name);
        }
        spec.validate_steps()?;

        let started = Instant::now();
        let mut candidates = Vec::new();
        let mut found = 0;
        let mut criteria: Vec<&Criterion> = Vec::new();

        for step in &spec.steps {
            match step {
                Step::Query(query) => {
                    candidates = document
                        .find(query.element)
                        .with_context(|| format!("查询 {} 失败", query.element))?;
                    found = candidates.len();
                    tracing::debug!("查询 {} 返回 {} 个对象", query.element, found);
                }
                Step::Filter(filter) => {
                    candidates = apply_filter(filter, candidates)
                        .with_context(|| format!("规范 '{}' 筛选失败", spec.name))?;
                    tracing::debug!("筛选后剩余 {} 个候选对象", candidates.len());
                }
                // 验证步骤之后不会再有筛选，候选集合已经确定
                Step::Verify(verify) => criteria.extend(verify.criteria.iter()),
            }
        }

        let verifications: Vec<Verification> = candidates
            .iter()
            .map(|candidate| {
                let evaluations = criteria
                    .iter()
                    .map(|criterion| criterion.evaluate(candidate))
                    .collect();
                Verification::new(
                    candidate.to_string(),
                    spec.verification_inclusion,
                    evaluations,
                )
            })
            .collect();
        tracing::debug!("验证了 {} 个候选对象", verifications.len());

        let in_range = in_range(spec.range.as_ref(), candidates.len());
        let result = if criteria.is_empty() {
            ResultState::None
        } else if candidates.is_empty() {
            ResultState::Inconclusive
        } else {
            ResultState::aggregate(
                spec.candidate_inclusion,
                verifications.iter().map(|v| v.result),
            )
        };

        tracing::info!(
            "规范 '{}' 运行完成: {} (找到 {}，候选 {})",
            spec.name,
            result,
            found,
            candidates.len()
        );

        Ok(Outcome {
            spec_id: spec.spec_id,
            name: spec.name.clone(),
            result,
            found,
            candidates: candidates.len(),
            in_range,
            verifications,
            duration_ms: started.elapsed().as_millis() as u64,
            ran_at: Utc::now(),
        })
    }
}

/// 按匹配策略保留候选对象，保持原有顺序
fn apply_filter(filter: &Filter, candidates: Vec<Value>) -> Result<Vec<Value>> {
    if filter.criteria.is_empty() {
        return Ok(candidates);
    }

    let mut retained = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if matches(filter.r#match, &filter.criteria, &candidate)? {
            retained.push(candidate);
        }
    }
    Ok(retained)
}

fn matches(inclusion: Inclusion, criteria: &[Criterion], candidate: &Value) -> Result<bool> {
    for criterion in criteria {
        let passed = criterion
            .check(candidate)
            .with_context(|| format!("条件 '{}' 无法应用于 {}", criterion, candidate))?;
        match inclusion {
            Inclusion::All if !passed => return Ok(false),
            Inclusion::Any if passed => return Ok(true),
            _ => {}
        }
    }
    Ok(inclusion == Inclusion::All)
}

/// 候选数量范围检查；未设置时视为在范围内
fn in_range(range: Option<&Criterion>, count: usize) -> bool {
    range.map_or(true, |criterion| {
        criterion.evaluate(&Value::Integer(count as i64)).result == ResultState::Passed
    })
}
