//! 数据库存储模块
//!
//! 使用SQLite存储规范和运行结果。规范以 JSON 文本按节点 ID 保存，
//! 读取时统一经过支持迁移的反序列化器，旧版本的规范会被自动升级。

use crate::core::migration::SpecSerializer;
use crate::core::models::Outcome;
use crate::core::spec::Spec;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// 已保存规范的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRecord {
    pub node_id: String,
    pub name: String,
    pub schema_version: u32,
    pub updated_at: DateTime<Utc>,
}

/// 数据库管理器
pub struct Database {
    conn: Connection,
    serializer: SpecSerializer,
}

impl Database {
    /// 打开或创建数据库
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_serializer(path, SpecSerializer::default())
    }

    /// 使用指定的序列化器打开数据库
    pub fn with_serializer(path: &Path, serializer: SpecSerializer) -> Result<Self> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("打开数据库失败: {}", path.display()))?;
        let db = Self { conn, serializer };
        db.init_tables()?;
        Ok(db)
    }

    /// 初始化表结构
    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- 规范表
            CREATE TABLE IF NOT EXISTS specs (
                node_id TEXT PRIMARY KEY,
                spec_id TEXT NOT NULL,
                name TEXT NOT NULL,
                schema_version INTEGER NOT NULL,
                spec_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- 运行结果表
            CREATE TABLE IF NOT EXISTS outcomes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id TEXT NOT NULL,
                spec_id TEXT NOT NULL,
                result TEXT NOT NULL,
                ran_at TEXT NOT NULL,
                outcome_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_outcomes_node ON outcomes(node_id, id DESC);
            "#,
        )?;
        Ok(())
    }

    /// 保存规范（总是写入最新 schema 版本）
    pub fn save_spec(&self, node_id: &str, spec: &Spec) -> Result<()> {
        let spec_json = self.serializer.serialize(spec)?;

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO specs
            (node_id, spec_id, name, schema_version, spec_json, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                node_id,
                spec.spec_id.to_string(),
                spec.name,
                self.serializer.migrations().latest(),
                spec_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tracing::info!("已保存规范 '{}' 到节点 {}", spec.name, node_id);
        Ok(())
    }

    /// 保存原始规范文本（不做转换，读取时再迁移）
    pub fn save_raw_spec(&self, node_id: &str, raw: &str) -> Result<()> {
        let spec = self.serializer.deserialize(raw)?;
        let document: serde_json::Value = serde_json::from_str(raw)?;
        let version = crate::core::migration::schema_version(&document)?;

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO specs
            (node_id, spec_id, name, schema_version, spec_json, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                node_id,
                spec.spec_id.to_string(),
                spec.name,
                version,
                raw,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 加载规范（必要时迁移）
    pub fn load_spec(&self, node_id: &str) -> Result<Option<Spec>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT spec_json FROM specs WHERE node_id = ?1",
                params![node_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => {
                let spec = self
                    .serializer
                    .deserialize(&raw)
                    .with_context(|| format!("节点 {} 的规范无法解析", node_id))?;
                Ok(Some(spec))
            }
            None => Ok(None),
        }
    }

    /// 删除规范及其运行结果
    pub fn delete_spec(&self, node_id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM specs WHERE node_id = ?1", params![node_id])?;
        self.conn
            .execute("DELETE FROM outcomes WHERE node_id = ?1", params![node_id])?;
        Ok(affected > 0)
    }

    /// 列出所有已保存的规范
    pub fn list_specs(&self) -> Result<Vec<SpecRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT node_id, name, schema_version, updated_at
            FROM specs
            ORDER BY name
            "#,
        )?;

        let records = stmt.query_map([], |row| {
            let updated_at_str: String = row.get(3)?;
            Ok(SpecRecord {
                node_id: row.get(0)?,
                name: row.get(1)?,
                schema_version: row.get(2)?,
                updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        records.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// 保存运行结果
    pub fn save_outcome(&self, node_id: &str, outcome: &Outcome) -> Result<()> {
        let outcome_json = serde_json::to_string(outcome)?;

        self.conn.execute(
            r#"
            INSERT INTO outcomes (node_id, spec_id, result, ran_at, outcome_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                node_id,
                outcome.spec_id.to_string(),
                outcome.result.to_string(),
                outcome.ran_at.to_rfc3339(),
                outcome_json,
            ],
        )?;
        Ok(())
    }

    /// 加载节点最近的运行结果（最新的在前）
    pub fn load_recent_outcomes(&self, node_id: &str, limit: usize) -> Result<Vec<Outcome>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT outcome_json
            FROM outcomes
            WHERE node_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![node_id, limit as i64], |row| row.get::<_, String>(0))?;

        let mut outcomes = Vec::new();
        for row in rows {
            outcomes.push(serde_json::from_str(&row?)?);
        }
        Ok(outcomes)
    }

    /// 清理旧的运行结果，每个节点保留最近的 `keep_count` 条
    pub fn cleanup_old_outcomes(&self, keep_count: usize) -> Result<usize> {
        let affected = self.conn.execute(
            r#"
            DELETE FROM outcomes
            WHERE id NOT IN (
                SELECT o.id FROM outcomes o
                WHERE (
                    SELECT COUNT(*) FROM outcomes n
                    WHERE n.node_id = o.node_id AND n.id > o.id
                ) < ?1
            )
            "#,
            params![keep_count as i64],
        )?;
        if affected > 0 {
            tracing::info!("已清理 {} 条旧的运行结果", affected);
        }
        Ok(affected)
    }
}
