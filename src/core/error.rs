//! 引擎错误类型
//!
//! 操作、条件与迁移各自有独立的错误类型，编排层统一使用 `anyhow`。
//! 错误文本会原样写入评估结果并随结果持久化，因此保持稳定的英文措辞。

use crate::core::operation::Operation;
use crate::core::type_group::TypeGroup;
use thiserror::Error;

/// 操作执行错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("operation '{operation}' expects {expected} argument(s) but received {received}")]
    Arity {
        operation: Operation,
        expected: &'static str,
        received: usize,
    },
    #[error("{0} is not a comparable type")]
    NotComparable(String),
    #[error("cannot compare {input} with {argument}")]
    Incompatible { input: String, argument: String },
    #[error("operation '{operation}' requires a collection input but received {found}")]
    NotCollection { operation: Operation, found: String },
    #[error("argument of type {0} cannot be used as a value")]
    InvalidArgument(String),
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("inner criterion failed: {0}")]
    Criterion(String),
}

/// 条件评估错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriterionError {
    #[error("candidate is null")]
    NullCandidate,
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("operation '{operation}' is not supported for {group} properties")]
    Unsupported {
        operation: Operation,
        group: TypeGroup,
    },
    #[error("operation '{operation}' expects {expected} argument(s) but {received} were given")]
    ArgumentCount {
        operation: Operation,
        expected: &'static str,
        received: usize,
    },
}

/// 规范迁移错误（对反序列化是致命的）
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("schema version {found} is newer than the latest known version {latest}")]
    Unsupported { found: u32, latest: u32 },
    #[error("migration chain has a gap: expected version {expected}, found {found}")]
    Gap { expected: u32, found: u32 },
    #[error("schema version field is not a non-negative integer: {0}")]
    InvalidVersion(String),
    #[error("migration to version {version} failed: {reason}")]
    Transform { version: u32, reason: String },
    #[error("malformed spec document: {0}")]
    Malformed(#[from] serde_json::Error),
}
