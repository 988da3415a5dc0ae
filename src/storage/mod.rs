//! 存储模块 - 规范数据库与配置文件

pub mod config;
pub mod database;
