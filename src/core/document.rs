//! 文档模块
//!
//! 文档是查询步骤的数据来源：按元素种类返回其中的全部对象。
//! 此模块只做读取，不做任何判断。

use crate::core::catalog::TypeCatalog;
use crate::core::models::Element;
use crate::core::value::Value;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// 可被查询的文档
pub trait Document: Send + Sync {
    /// 返回指定种类的全部对象（按文档中的原始顺序）
    fn find(&self, element: Element) -> Result<Vec<Value>>;
}

/// 基于 JSON 的文档
///
/// 顶层是以元素名为键的对象，每个键对应一个对象数组：
/// `{"Tag": [{"Name": "Pump_01", "Value": 1}], "Module": [...]}`
#[derive(Debug, Clone, Default)]
pub struct JsonDocument {
    elements: HashMap<Element, Vec<Value>>,
}

impl JsonDocument {
    /// 创建空文档
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加对象
    pub fn insert(&mut self, element: Element, values: impl IntoIterator<Item = Value>) {
        self.elements.entry(element).or_default().extend(values);
    }

    pub fn with(mut self, element: Element, values: impl IntoIterator<Item = Value>) -> Self {
        self.insert(element, values);
        self
    }

    /// 按内置 Logix 目录从JSON字符串解析，未知的元素名会被跳过
    pub fn from_json_str(json_str: &str) -> Result<Self> {
        Self::from_json_str_with(json_str, &TypeCatalog::logix())
    }

    /// 按给定目录解析：成员类型决定日期解析与集合元素的类型名
    pub fn from_json_str_with(json_str: &str, catalog: &TypeCatalog) -> Result<Self> {
        let root: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json_str).context("文档必须是以元素名为键的 JSON 对象")?;

        let mut document = Self::new();
        for (key, items) in root {
            let element = match key.parse::<Element>() {
                Ok(element) => element,
                Err(e) => {
                    tracing::warn!("跳过未知元素: {}", e);
                    continue;
                }
            };
            let type_name = element.type_name();
            let values = match items {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|item| Value::from_json_typed(item, type_name, catalog))
                    .collect(),
                single => vec![Value::from_json_typed(&single, type_name, catalog)],
            };
            document.insert(element, values);
        }

        tracing::info!("文档加载完成，共 {} 个对象", document.len());
        Ok(document)
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取文档失败: {}", path.display()))?;
        Self::from_json_str(&content)
    }

    /// 对象总数
    pub fn len(&self) -> usize {
        self.elements.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Document for JsonDocument {
    fn find(&self, element: Element) -> Result<Vec<Value>> {
        Ok(self.elements.get(&element).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::criterion::Criterion;
    use crate::core::models::ResultState;
    use crate::core::operation::Operation;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "Tag": [
            {"Name": "Pump_01", "Value": 1, "Members": [{"$type": "Tag", "Name": "Run"}]},
            {"Name": "Pump_02", "Value": 2}
        ],
        "Module": {"Name": "Local", "Inhibited": false},
        "Widget": []
    }"#;

    #[test]
    fn test_from_json_str() {
        let document = JsonDocument::from_json_str(SAMPLE).unwrap();
        assert_eq!(document.len(), 3);

        let tags = document.find(Element::Tag).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].type_name(), "Tag");
        assert_eq!(tags[0].member("Name"), Value::from("Pump_01"));
        assert_eq!(tags[0].member("Members").member("Count"), Value::Integer(1));

        let modules = document.find(Element::Module).unwrap();
        assert_eq!(modules[0].member("Inhibited"), Value::Bool(false));

        assert!(document.find(Element::Rung).unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("document.json");
        fs::write(&path, SAMPLE).unwrap();

        let document = JsonDocument::load(&path).unwrap();
        assert_eq!(document.find(Element::Tag).unwrap().len(), 2);
        assert!(JsonDocument::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(JsonDocument::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_date_shaped_text_stays_text() {
        let document = JsonDocument::from_json_str(
            r#"{"Tag": [{"Name": "2024-06-15T12:00:00Z", "Members": [{"Name": "m"}]}]}"#,
        )
        .unwrap();
        let tags = document.find(Element::Tag).unwrap();

        let criterion = Criterion::new(Element::Tag, "Name", Operation::Containing).arg("2024");
        assert_eq!(criterion.evaluate(&tags[0]).result, ResultState::Passed);

        let members = tags[0].member("Members");
        assert_eq!(members.as_list().unwrap()[0].type_name(), "Tag");
    }

    #[test]
    fn test_catalog_dates_are_parsed() {
        let document = JsonDocument::from_json_str(
            r#"{"Controller": [{"Name": "Main", "LastModified": "2024-06-15T12:00:00Z"}]}"#,
        )
        .unwrap();
        let controller = &document.find(Element::Controller).unwrap()[0];
        assert!(matches!(controller.member("LastModified"), Value::Date(_)));

        let criterion = Criterion::new(Element::Controller, "LastModified", Operation::GreaterThan)
            .arg("2024-01-01T00:00:00Z");
        assert_eq!(criterion.evaluate(controller).result, ResultState::Passed);
    }
}
