//! AutoSpex - 工业自动化项目文件的规则验证引擎
//!
//! 核心设计原则：
//! - 规范是 查询 → 筛选 → 验证 的有序步骤
//! - 条件评估永不失败，错误记录在评估结果中
//! - 持久化的规范总是经过版本迁移后再解析

pub mod core;
pub mod storage;
