//! Core模块 - 包含所有核心业务逻辑

pub mod argument;
pub mod catalog;
pub mod criterion;
pub mod document;
pub mod error;
pub mod migration;
pub mod models;
pub mod operation;
pub mod property;
pub mod rule_engine;
pub mod service;
pub mod spec;
pub mod type_group;
pub mod value;

#[cfg(test)]
mod sim_integration_tests;
