//! 批量运行服务
//!
//! 每个规范在独立的阻塞任务中运行，所有任务共享同一个文档和取消标志。

use crate::core::document::Document;
use crate::core::models::Outcome;
use crate::core::rule_engine::{CancelFlag, RuleEngine};
use crate::core::spec::Spec;
use anyhow::{Context, Result};
use std::sync::Arc;

/// 对同一文档并发运行一批规范，结果顺序与输入一致
pub async fn run_specs(
    specs: Vec<Spec>,
    document: Arc<dyn Document>,
    cancel: CancelFlag,
) -> Result<Vec<Outcome>> {
    tracing::info!("开始运行 {} 个规范", specs.len());

    let handles: Vec<_> = specs
        .into_iter()
        .map(|spec| {
            let document = Arc::clone(&document);
            let engine = RuleEngine::new().with_cancel(cancel.clone());
            tokio::task::spawn_blocking(move || engine.run(&spec, document.as_ref()))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.context("规范运行任务异常退出")??);
    }
    Ok(outcomes)
}
