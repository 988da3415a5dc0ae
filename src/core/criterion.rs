//! 条件
//!
//! 条件把属性、操作、参数和取反标志绑定为一个可评估的单元。
//! `evaluate` 永不失败：任何错误都会变成 Error 等级的评估结果。

use crate::core::argument::Argument;
use crate::core::catalog::TypeCatalog;
use crate::core::error::CriterionError;
use crate::core::models::{Evaluation, ResultState};
use crate::core::operation::{Arity, Operation};
use crate::core::property::Property;
use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 条件定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CriterionData", into = "CriterionData")]
pub struct Criterion {
    id: Uuid,
    property: Property,
    operation: Operation,
    arguments: Vec<Argument>,
    negate: bool,
}

/// 持久化形态
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CriterionData {
    criterion_id: Uuid,
    #[serde(rename = "Type", default)]
    origin: String,
    #[serde(default)]
    property: String,
    operation: Operation,
    #[serde(default)]
    arguments: Vec<Argument>,
    #[serde(default)]
    invert: bool,
}

impl From<CriterionData> for Criterion {
    fn from(data: CriterionData) -> Self {
        Self {
            id: data.criterion_id,
            property: Property::new(data.origin, data.property),
            operation: data.operation,
            arguments: data.arguments,
            negate: data.invert,
        }
    }
}

impl From<Criterion> for CriterionData {
    fn from(criterion: Criterion) -> Self {
        Self {
            criterion_id: criterion.id,
            origin: criterion.property.origin().to_string(),
            property: criterion.property.path().to_string(),
            operation: criterion.operation,
            arguments: criterion.arguments,
            invert: criterion.negate,
        }
    }
}

impl Criterion {
    /// 创建新条件（无参数）
    pub fn new(origin: impl fmt::Display, path: &str, operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            property: Property::new(origin.to_string(), path),
            operation,
            arguments: Vec::new(),
            negate: false,
        }
    }

    /// 追加一个参数
    pub fn arg(mut self, argument: impl Into<Argument>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// 追加多个参数
    pub fn args<I, A>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// 取反
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> &str {
        self.property.origin()
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    /// 评估候选对象（不会失败）
    pub fn evaluate(&self, candidate: &Value) -> Evaluation {
        if candidate.is_null() {
            return self.errored(candidate, &Value::Null, CriterionError::NullCandidate);
        }

        let actual = self.property.value(candidate);
        match self.operation.execute(&actual, &self.arguments) {
            Ok(result) => Evaluation {
                criterion_id: self.id,
                result: ResultState::from_bool(result != self.negate),
                candidate: candidate.to_string(),
                criteria: self.to_string(),
                expected: self.expected(),
                actual: actual.to_string(),
                error: None,
            },
            Err(e) => self.errored(candidate, &actual, e.into()),
        }
    }

    /// 检查候选对象是否满足条件，错误向调用方传播（用于筛选）
    pub fn check(&self, candidate: &Value) -> Result<bool, CriterionError> {
        if candidate.is_null() {
            return Err(CriterionError::NullCandidate);
        }
        let actual = self.property.value(candidate);
        Ok(self.operation.execute(&actual, &self.arguments)? != self.negate)
    }

    /// 期望值的文本表示
    pub fn expected(&self) -> String {
        if self.arguments.is_empty() {
            return self.operation.to_string();
        }
        self.arguments
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 校验操作与属性分组、参数个数是否匹配（供编辑层使用，构造时不强制）
    pub fn validate(&self, catalog: &TypeCatalog) -> Result<(), CriterionError> {
        let group = self.property.group(catalog);
        if !self.operation.supports(group) {
            return Err(CriterionError::Unsupported {
                operation: self.operation,
                group,
            });
        }

        let received = self.arguments.len();
        let arity = self.operation.arity();
        let valid = match arity {
            Arity::None => true,
            Arity::One => received == 1,
            Arity::Two => {
                received == 2 || (received == 1 && self.arguments[0].as_range().is_some())
            }
            Arity::Sequence => received >= 1,
        };
        if !valid {
            return Err(CriterionError::ArgumentCount {
                operation: self.operation,
                expected: arity.describe(),
                received,
            });
        }

        for argument in &self.arguments {
            if let Argument::Criterion(inner) = argument {
                inner.validate(catalog)?;
            }
        }
        Ok(())
    }

    fn errored(&self, candidate: &Value, actual: &Value, error: CriterionError) -> Evaluation {
        Evaluation {
            criterion_id: self.id,
            result: ResultState::Error,
            candidate: candidate.to_string(),
            criteria: self.to_string(),
            expected: self.expected(),
            actual: actual.to_string(),
            error: Some(error.to_string()),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.property)?;
        if self.negate {
            write!(f, " Not")?;
        }
        write!(f, " {}", self.operation)?;
        if !self.arguments.is_empty() {
            write!(f, " {}", self.expected())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::argument::Range;
    use crate::core::models::Element;
    use crate::core::type_group::TypeGroup;
    use crate::core::value::Object;

    fn tag(name: &str, value: impl Into<Value>) -> Value {
        Object::new("Tag")
            .with("Name", name)
            .with("Value", value)
            .into_value()
    }

    #[test]
    fn test_containing_passes() {
        let criterion = Criterion::new(Element::Tag, "Name", Operation::Containing).arg("Test");
        let evaluation = criterion.evaluate(&tag("TestTag", 1));

        assert_eq!(evaluation.result, ResultState::Passed);
        assert_eq!(evaluation.criterion_id, criterion.id());
        assert_eq!(evaluation.candidate, "Tag 'TestTag'");
        assert_eq!(evaluation.expected, "Test");
        assert_eq!(evaluation.actual, "TestTag");
        assert_eq!(evaluation.criteria, "Name Containing Test");
        assert!(evaluation.error.is_none());
    }

    #[test]
    fn test_negate_flips_result() {
        let criterion = Criterion::new(Element::Tag, "Name", Operation::Containing)
            .arg("Test")
            .negated();
        assert_eq!(criterion.evaluate(&tag("TestTag", 1)).result, ResultState::Failed);
        assert_eq!(criterion.evaluate(&tag("Other", 1)).result, ResultState::Passed);
        assert_eq!(criterion.to_string(), "Name Not Containing Test");
    }

    #[test]
    fn test_non_comparable_becomes_error() {
        let criterion = Criterion::new(Element::Tag, "Value", Operation::GreaterThan).arg(10);
        let candidate = tag("Udt", Object::new("MyUdt").with("Member", 1));
        let evaluation = criterion.evaluate(&candidate);

        assert_eq!(evaluation.result, ResultState::Error);
        assert!(evaluation
            .error
            .as_deref()
            .unwrap()
            .contains("not a comparable type"));
    }

    #[test]
    fn test_null_candidate_is_error() {
        let criterion = Criterion::new(Element::Tag, "Name", Operation::IsNotNull);
        let evaluation = criterion.evaluate(&Value::Null);
        assert_eq!(evaluation.result, ResultState::Error);
        assert_eq!(evaluation.error.as_deref(), Some("candidate is null"));
        assert_eq!(criterion.check(&Value::Null), Err(CriterionError::NullCandidate));
    }

    #[test]
    fn test_evaluate_never_fails() {
        let candidates = [
            Value::Null,
            tag("A", 1),
            tag("B", Value::Null),
            Value::from("text"),
            Value::from(vec![1, 2]),
        ];
        let criteria = [
            Criterion::new(Element::Tag, "Value", Operation::Between).arg(Range::new(1, 2)),
            Criterion::new(Element::Tag, "Value", Operation::All).arg(1),
            Criterion::new(Element::Tag, "Name", Operation::Matching).arg("("),
            Criterion::new(Element::Tag, "Name", Operation::EqualTo),
            Criterion::new(Element::Tag, "Name.Length", Operation::LessThan).arg("abc"),
        ];

        for criterion in &criteria {
            for candidate in &candidates {
                let evaluation = criterion.evaluate(candidate);
                assert_eq!(evaluation.error.is_some(), evaluation.result == ResultState::Error);
            }
        }
    }

    #[test]
    fn test_wire_shape() {
        let criterion = Criterion::new(Element::Tag, "Value", Operation::EqualTo).arg(123);
        let json = serde_json::to_value(&criterion).unwrap();

        assert_eq!(json["Type"], "Tag");
        assert_eq!(json["Property"], "Value");
        assert_eq!(json["Operation"], "EqualTo");
        assert_eq!(json["Arguments"][0]["Value"], 123);
        assert_eq!(json["Invert"], false);

        let parsed: Criterion = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, criterion);
    }

    #[test]
    fn test_validate() {
        let catalog = TypeCatalog::logix();

        let ok = Criterion::new(Element::Tag, "Name", Operation::StartingWith).arg("Pump");
        assert!(ok.validate(&catalog).is_ok());

        let unsupported = Criterion::new(Element::Tag, "Constant", Operation::GreaterThan).arg(1);
        assert_eq!(
            unsupported.validate(&catalog),
            Err(CriterionError::Unsupported {
                operation: Operation::GreaterThan,
                group: TypeGroup::Boolean,
            })
        );

        let missing = Criterion::new(Element::Tag, "Dimensions", Operation::Between).arg(1);
        assert!(matches!(
            missing.validate(&catalog),
            Err(CriterionError::ArgumentCount { received: 1, .. })
        ));

        let nested = Criterion::new(Element::Program, "Routines", Operation::Any).arg(
            Criterion::new(Element::Routine, "Type", Operation::IsTrue),
        );
        assert!(nested.validate(&catalog).is_err());
    }
}
