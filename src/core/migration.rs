//! 规范 schema 迁移
//!
//! 迁移表是显式构造并传入序列化器的有序 (版本, 转换) 列表，没有全局缓存。
//! 反序列化时先读取 `SchemaVersion`（缺省为 0，即旧格式），再按版本升序依次
//! 执行纯文本到文本的转换，最后解析为当前对象模型。
//!
//! 规则：
//! - 版本等于最新版本时直接解析，不执行任何迁移
//! - 版本比已知最新版本更新时直接失败
//! - 迁移表的版本必须是 1..=n 的连续序列

use crate::core::error::MigrationError;
use crate::core::spec::Spec;
use serde_json::{json, Map, Value};
use std::fmt;

/// 当前 schema 版本
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// 迁移转换函数
pub type Transform = fn(&str) -> Result<String, MigrationError>;

/// 单个迁移
#[derive(Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub transform: Transform,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Migration {
    pub fn new(version: u32, transform: Transform) -> Self {
        Self { version, transform }
    }

    /// 执行转换，失败统一归为该版本的转换错误
    pub fn apply(&self, raw: &str) -> Result<String, MigrationError> {
        (self.transform)(raw).map_err(|e| match e {
            MigrationError::Transform { .. } => e,
            other => MigrationError::Transform {
                version: self.version,
                reason: other.to_string(),
            },
        })
    }
}

/// 迁移表（按版本升序）
#[derive(Debug, Clone, Default)]
pub struct MigrationTable {
    migrations: Vec<Migration>,
}

impl MigrationTable {
    /// 构造迁移表，版本必须连续且从 1 开始
    pub fn new(mut migrations: Vec<Migration>) -> Result<Self, MigrationError> {
        migrations.sort_by_key(|m| m.version);
        for (i, migration) in migrations.iter().enumerate() {
            let expected = i as u32 + 1;
            if migration.version != expected {
                return Err(MigrationError::Gap {
                    expected,
                    found: migration.version,
                });
            }
        }
        Ok(Self { migrations })
    }

    /// 内置迁移链
    pub fn standard() -> Self {
        Self {
            migrations: vec![
                Migration::new(1, flatten_steps),
                Migration::new(2, rename_operations),
            ],
        }
    }

    /// 最新版本（空表为 0）
    pub fn latest(&self) -> u32 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }

    /// 需要在给定版本之上执行的迁移
    pub fn pending(&self, from: u32) -> impl Iterator<Item = &Migration> {
        self.migrations.iter().filter(move |m| m.version > from)
    }

    /// 把原始文档升级到最新版本
    pub fn migrate(&self, raw: &str) -> Result<String, MigrationError> {
        let document: Value = serde_json::from_str(raw)?;
        let version = schema_version(&document)?;
        let latest = self.latest();

        if version > latest {
            return Err(MigrationError::Unsupported {
                found: version,
                latest,
            });
        }
        if version == latest {
            return Ok(raw.to_string());
        }

        let mut current = raw.to_string();
        for migration in self.pending(version) {
            current = migration.apply(&current)?;
            tracing::debug!("已应用规范迁移 v{}", migration.version);
        }
        Ok(current)
    }
}

/// 读取文档的 schema 版本，缺省为 0
pub fn schema_version(document: &Value) -> Result<u32, MigrationError> {
    match document.get("SchemaVersion") {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| MigrationError::InvalidVersion(v.to_string())),
    }
}

/// 支持迁移的规范序列化器
#[derive(Debug, Clone)]
pub struct SpecSerializer {
    migrations: MigrationTable,
}

impl Default for SpecSerializer {
    fn default() -> Self {
        Self::new(MigrationTable::standard())
    }
}

impl SpecSerializer {
    pub fn new(migrations: MigrationTable) -> Self {
        Self { migrations }
    }

    pub fn migrations(&self) -> &MigrationTable {
        &self.migrations
    }

    /// 序列化，写入最新 schema 版本
    pub fn serialize(&self, spec: &Spec) -> Result<String, MigrationError> {
        Ok(serde_json::to_string(&self.stamped(spec)?)?)
    }

    pub fn serialize_pretty(&self, spec: &Spec) -> Result<String, MigrationError> {
        Ok(serde_json::to_string_pretty(&self.stamped(spec)?)?)
    }

    /// 反序列化（必要时先迁移）
    pub fn deserialize(&self, raw: &str) -> Result<Spec, MigrationError> {
        let migrated = self.migrations.migrate(raw)?;
        Ok(serde_json::from_str(&migrated)?)
    }

    fn stamped(&self, spec: &Spec) -> Result<Value, MigrationError> {
        let mut document = serde_json::to_value(spec)?;
        if let Some(map) = document.as_object_mut() {
            map.insert("SchemaVersion".to_string(), json!(self.migrations.latest()));
        }
        Ok(document)
    }
}

fn transform_error(version: u32, reason: &str) -> MigrationError {
    MigrationError::Transform {
        version,
        reason: reason.to_string(),
    }
}

fn object_mut(document: &mut Value, version: u32) -> Result<&mut Map<String, Value>, MigrationError> {
    document
        .as_object_mut()
        .ok_or_else(|| transform_error(version, "spec document is not an object"))
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// v1：旧的扁平布局（Element/Filters/Verifications/Settings）转换为步骤列表
fn flatten_steps(raw: &str) -> Result<String, MigrationError> {
    let mut document: Value = serde_json::from_str(raw)?;
    let map = object_mut(&mut document, 1)?;

    let element = map
        .remove("Element")
        .ok_or_else(|| transform_error(1, "legacy spec has no Element"))?;
    let filters = take_array(map, "Filters");
    let verifications = take_array(map, "Verifications");
    let settings = map.remove("Settings").unwrap_or(Value::Null);
    let filter_match = settings
        .get("FilterInclusion")
        .cloned()
        .unwrap_or_else(|| json!("All"));
    let verification_inclusion = settings
        .get("VerificationInclusion")
        .cloned()
        .unwrap_or_else(|| json!("All"));

    let mut steps = vec![json!({"Step": "Query", "Element": element})];
    if !filters.is_empty() {
        steps.push(json!({"Step": "Filter", "Match": filter_match, "Criteria": filters}));
    }
    if !verifications.is_empty() {
        steps.push(json!({"Step": "Verify", "Criteria": verifications}));
    }

    map.insert("Steps".to_string(), Value::Array(steps));
    map.insert("CandidateInclusion".to_string(), json!("All"));
    map.insert("VerificationInclusion".to_string(), verification_inclusion);
    map.insert("SchemaVersion".to_string(), json!(1));
    Ok(serde_json::to_string(&document)?)
}

/// 旧操作名 -> 当前操作名
const LEGACY_OPERATIONS: [(&str, &str); 8] = [
    ("Equal", "EqualTo"),
    ("NotEqual", "NotEqualTo"),
    ("Contains", "Containing"),
    ("StartsWith", "StartingWith"),
    ("EndsWith", "EndingWith"),
    ("GreaterThanOrEqual", "GreaterThanOrEqualTo"),
    ("LessThanOrEqual", "LessThanOrEqualTo"),
    ("IsMatch", "Matching"),
];

/// v2：重命名旧操作名，递归处理嵌套条件与操作参数
fn rename_operations(raw: &str) -> Result<String, MigrationError> {
    let mut document: Value = serde_json::from_str(raw)?;
    rename_in(&mut document);
    object_mut(&mut document, 2)?.insert("SchemaVersion".to_string(), json!(2));
    Ok(serde_json::to_string(&document)?)
}

fn rename_in(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let operation_argument = map.get("Type").and_then(Value::as_str) == Some("Operation");
            for (key, member) in map.iter_mut() {
                let names_operation =
                    key == "Operation" || (operation_argument && key == "Value");
                match member {
                    Value::String(name) if names_operation => {
                        if let Some((_, current)) =
                            LEGACY_OPERATIONS.iter().find(|(legacy, _)| *legacy == name.as_str())
                        {
                            *name = current.to_string();
                        }
                    }
                    other => rename_in(other),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(rename_in),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::criterion::Criterion;
    use crate::core::models::{Element, Inclusion};
    use crate::core::operation::Operation;
    use uuid::Uuid;

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    fn legacy_document(spec_id: Uuid, filter_id: Uuid, verify_id: Uuid) -> String {
        json!({
            "SpecId": spec_id,
            "Name": "Test tags",
            "Element": "Tag",
            "Filters": [{
                "CriterionId": filter_id,
                "Type": "Tag",
                "Property": "Name",
                "Operation": "Contains",
                "Arguments": [{"Type": "Text", "Value": "Test"}],
                "Invert": false
            }],
            "Verifications": [{
                "CriterionId": verify_id,
                "Type": "Tag",
                "Property": "Value",
                "Operation": "Equal",
                "Arguments": [{"Type": "Integer", "Value": 123}],
                "Invert": false
            }],
            "Settings": {"FilterInclusion": "All", "VerificationInclusion": "All"}
        })
        .to_string()
    }

    #[test]
    fn test_legacy_matches_fluent_build() {
        let (spec_id, filter_id, verify_id) = ids();
        let serializer = SpecSerializer::default();

        let migrated = serializer
            .deserialize(&legacy_document(spec_id, filter_id, verify_id))
            .unwrap();

        let built = Spec::new("Test tags")
            .with_id(spec_id)
            .query(Element::Tag)
            .filter(Inclusion::All, [Criterion::new(Element::Tag, "Name", Operation::Containing)
                .arg("Test")
                .with_id(filter_id)])
            .verify([Criterion::new(Element::Tag, "Value", Operation::EqualTo)
                .arg(123)
                .with_id(verify_id)]);

        assert_eq!(migrated, built);
    }

    #[test]
    fn test_round_trip_current() {
        let serializer = SpecSerializer::default();
        let spec = Spec::new("Modules")
            .query(Element::Module)
            .filter(Inclusion::Any, [
                Criterion::new(Element::Module, "Inhibited", Operation::IsTrue),
                Criterion::new(Element::Module, "CatalogNumber", Operation::Like).arg("1756-*"),
            ])
            .verify([Criterion::new(Element::Module, "Ports", Operation::Any).arg(
                Criterion::new("Port", "Address", Operation::Matching).arg(r"^\d+$"),
            )])
            .with_inclusion(Inclusion::Any, Inclusion::All)
            .with_range(Criterion::new(Element::Module, "This", Operation::GreaterThan).arg(0));

        let raw = serializer.serialize(&spec).unwrap();
        assert_eq!(serializer.deserialize(&raw).unwrap(), spec);
    }

    #[test]
    fn test_current_document_is_untouched() {
        let serializer = SpecSerializer::default();
        let spec = Spec::new("Tags").query(Element::Tag);
        let raw = serializer.serialize(&spec).unwrap();

        assert_eq!(serializer.migrations().migrate(&raw).unwrap(), raw);
        let direct: Spec = serde_json::from_str(&raw).unwrap();
        assert_eq!(serializer.deserialize(&raw).unwrap(), direct);
    }

    #[test]
    fn test_v1_only_renames() {
        let raw = json!({
            "SpecId": Uuid::new_v4(),
            "SchemaVersion": 1,
            "Steps": [
                {"Step": "Query", "Element": "Program"},
                {"Step": "Verify", "Criteria": [{
                    "CriterionId": Uuid::new_v4(),
                    "Type": "Program",
                    "Property": "Routines",
                    "Operation": "Any",
                    "Arguments": [
                        {"Type": "Criterion", "Value": {
                            "CriterionId": Uuid::new_v4(),
                            "Type": "Routine",
                            "Property": "Name",
                            "Operation": "StartsWith",
                            "Arguments": [{"Type": "Text", "Value": "Main"}]
                        }}
                    ]
                }, {
                    "CriterionId": Uuid::new_v4(),
                    "Type": "Program",
                    "Property": "Tags",
                    "Operation": "Count",
                    "Arguments": [
                        {"Type": "Operation", "Value": "GreaterThanOrEqual"},
                        {"Type": "Integer", "Value": 1}
                    ]
                }]}
            ]
        })
        .to_string();

        let spec = SpecSerializer::default().deserialize(&raw).unwrap();
        let criteria: Vec<_> = spec.verifications().collect();
        assert_eq!(spec.schema_version, CURRENT_SCHEMA_VERSION);

        match &criteria[0].arguments()[0] {
            crate::core::argument::Argument::Criterion(inner) => {
                assert_eq!(inner.operation(), Operation::StartingWith)
            }
            other => panic!("unexpected argument {other:?}"),
        }
        assert_eq!(
            criteria[1].arguments()[0],
            crate::core::argument::Argument::Operation(Operation::GreaterThanOrEqualTo)
        );
    }

    #[test]
    fn test_newer_version_fails() {
        let raw = json!({"SpecId": Uuid::new_v4(), "SchemaVersion": 99}).to_string();
        let err = SpecSerializer::default().deserialize(&raw).unwrap_err();
        assert!(matches!(err, MigrationError::Unsupported { found: 99, latest: 2 }));
    }

    #[test]
    fn test_invalid_version_fails() {
        let raw = json!({"SpecId": Uuid::new_v4(), "SchemaVersion": "two"}).to_string();
        let err = SpecSerializer::default().deserialize(&raw).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidVersion(_)));
    }

    #[test]
    fn test_table_rejects_gaps() {
        let err = MigrationTable::new(vec![
            Migration::new(1, flatten_steps),
            Migration::new(3, rename_operations),
        ])
        .unwrap_err();
        assert!(matches!(err, MigrationError::Gap { expected: 2, found: 3 }));

        let err = MigrationTable::new(vec![
            Migration::new(1, flatten_steps),
            Migration::new(1, flatten_steps),
        ])
        .unwrap_err();
        assert!(matches!(err, MigrationError::Gap { expected: 2, found: 1 }));
    }

    #[test]
    fn test_table_sorts_ascending() {
        let table = MigrationTable::new(vec![
            Migration::new(2, rename_operations),
            Migration::new(1, flatten_steps),
        ])
        .unwrap();
        let versions: Vec<u32> = table.pending(0).map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(table.latest(), CURRENT_SCHEMA_VERSION);
        assert_eq!(MigrationTable::standard().latest(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_transform_failure_is_fatal() {
        let raw = json!({"SpecId": Uuid::new_v4(), "Filters": []}).to_string();
        let err = SpecSerializer::default().deserialize(&raw).unwrap_err();
        assert!(matches!(err, MigrationError::Transform { version: 1, .. }));
    }
}
