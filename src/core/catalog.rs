//! 类型目录
//!
//! 描述各元素类型的成员及其静态类型，供属性解析确定终端类型分组，
//! 并供编辑层列出某属性可用的操作。目录缺失的成员不影响求值，只归为 Default 分组。

use crate::core::type_group::TypeGroup;
use std::collections::{BTreeMap, HashMap};

/// 类型定义
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// 结构化元素：成员名 -> 成员类型名
    Element(BTreeMap<String, String>),
    /// 枚举：可选值名称
    Enum(Vec<String>),
}

/// 类型目录
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDef>,
}

impl TypeCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 定义元素类型
    pub fn define_element(&mut self, name: &str, members: &[(&str, &str)]) -> &mut Self {
        let members = members
            .iter()
            .map(|(m, t)| (m.to_string(), t.to_string()))
            .collect();
        self.types.insert(name.to_string(), TypeDef::Element(members));
        self
    }

    /// 定义枚举类型
    pub fn define_enum(&mut self, name: &str, options: &[&str]) -> &mut Self {
        let options = options.iter().map(|s| s.to_string()).collect();
        self.types.insert(name.to_string(), TypeDef::Enum(options));
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDef> {
        self.types.get(type_name)
    }

    /// 枚举类型的可选值
    pub fn enum_options(&self, type_name: &str) -> Option<&[String]> {
        match self.types.get(type_name) {
            Some(TypeDef::Enum(options)) => Some(options),
            _ => None,
        }
    }

    /// 某类型上单个成员的静态类型
    pub fn member_type(&self, type_name: &str, member: &str) -> Option<String> {
        if type_name.starts_with("List<") && member == "Count" {
            return Some("Integer".to_string());
        }
        if type_name == "Text" && member == "Length" {
            return Some("Integer".to_string());
        }
        match self.types.get(type_name) {
            Some(TypeDef::Element(members)) => members.get(member).cloned(),
            _ => None,
        }
    }

    /// 沿路径解析终端类型名；任一段未知则返回 `None`
    pub fn resolve_path<'a>(
        &self,
        origin: &str,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Option<String> {
        segments
            .into_iter()
            .try_fold(origin.to_string(), |current, segment| {
                self.member_type(&current, segment)
            })
    }

    /// 类型名的分组
    pub fn group(&self, type_name: &str) -> TypeGroup {
        if let Some(group) = TypeGroup::of_primitive(type_name) {
            return group;
        }
        match self.types.get(type_name) {
            Some(TypeDef::Element(_)) => TypeGroup::Element,
            Some(TypeDef::Enum(_)) => TypeGroup::Enum,
            None => TypeGroup::Default,
        }
    }

    /// Logix 项目元素的内置目录
    pub fn logix() -> Self {
        let mut catalog = Self::new();

        catalog
            .define_enum("Radix", &[
                "Null", "General", "Binary", "Octal", "Decimal", "Hex", "Exponential",
                "Float", "Ascii", "Unicode", "DateTime", "DateTimeNs",
            ])
            .define_enum("ExternalAccess", &["None", "ReadOnly", "ReadWrite"])
            .define_enum("TagType", &["Base", "Alias", "Produced", "Consumed"])
            .define_enum("TagUsage", &["Null", "Normal", "Local", "Input", "Output", "InOut", "Public"])
            .define_enum("Scope", &["Null", "Controller", "Program", "Instruction"])
            .define_enum("ProgramType", &["Normal", "EquipmentPhase", "EquipmentSequence"])
            .define_enum("RoutineType", &["Typeless", "RLL", "FBD", "SFC", "ST"])
            .define_enum("TaskType", &["Continuous", "Periodic", "Event"])
            .define_enum("DataTypeClass", &["Unknown", "Atomic", "Predefined", "ProductDefined", "User"])
            .define_enum("DataTypeFamily", &["None", "String"]);

        catalog
            .define_element("Controller", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("ProcessorType", "Text"),
                ("Revision", "Text"),
                ("LastModified", "Date"),
                ("DataTypes", "List<DataType>"),
                ("Modules", "List<Module>"),
                ("Tags", "List<Tag>"),
                ("Programs", "List<Program>"),
                ("Tasks", "List<Task>"),
            ])
            .define_element("DataType", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("Class", "DataTypeClass"),
                ("Family", "DataTypeFamily"),
                ("Members", "List<DataTypeMember>"),
            ])
            .define_element("DataTypeMember", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("DataType", "Text"),
                ("Dimension", "Integer"),
                ("Radix", "Radix"),
                ("ExternalAccess", "ExternalAccess"),
                ("Hidden", "Boolean"),
            ])
            .define_element("AddOnInstruction", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("Revision", "Text"),
                ("Vendor", "Text"),
                ("EditedDate", "Date"),
                ("Parameters", "List<Tag>"),
                ("Routines", "List<Routine>"),
            ])
            .define_element("Module", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("CatalogNumber", "Text"),
                ("Vendor", "Integer"),
                ("ProductType", "Integer"),
                ("Revision", "Text"),
                ("ParentModule", "Text"),
                ("Inhibited", "Boolean"),
                ("MajorFault", "Boolean"),
                ("Ports", "List<Port>"),
            ])
            .define_element("Port", &[
                ("Id", "Integer"),
                ("Type", "Text"),
                ("Address", "Text"),
                ("Upstream", "Boolean"),
            ])
            .define_element("Tag", &[
                ("Name", "Text"),
                ("TagName", "Text"),
                ("Description", "Text"),
                ("Comment", "Text"),
                ("DataType", "Text"),
                ("Value", "Default"),
                ("Radix", "Radix"),
                ("ExternalAccess", "ExternalAccess"),
                ("TagType", "TagType"),
                ("Usage", "TagUsage"),
                ("Scope", "Scope"),
                ("Constant", "Boolean"),
                ("Dimensions", "Integer"),
                ("Container", "Text"),
                ("Members", "List<Tag>"),
            ])
            .define_element("Program", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("Type", "ProgramType"),
                ("Disabled", "Boolean"),
                ("TestEdits", "Boolean"),
                ("MainRoutineName", "Text"),
                ("FaultRoutineName", "Text"),
                ("Routines", "List<Routine>"),
                ("Tags", "List<Tag>"),
            ])
            .define_element("Routine", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("Type", "RoutineType"),
                ("Container", "Text"),
                ("Rungs", "List<Rung>"),
            ])
            .define_element("Rung", &[
                ("Number", "Integer"),
                ("Text", "Text"),
                ("Comment", "Text"),
                ("Routine", "Text"),
                ("Container", "Text"),
            ])
            .define_element("Task", &[
                ("Name", "Text"),
                ("Description", "Text"),
                ("Type", "TaskType"),
                ("Priority", "Integer"),
                ("Rate", "Number"),
                ("Watchdog", "Number"),
                ("InhibitTask", "Boolean"),
                ("ScheduledPrograms", "List<Text>"),
            ]);

        catalog
    }
}
