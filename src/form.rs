//! 表单数据模型
//!
//! [`FormField`] 的线格式与前端及 LLM 约定一致：camelCase 键、`type` 表示
//! 字段类型、未知键忽略。[`FieldKind`] 是封闭枚举，未收录的外部类型标签
//! 经 `Other` 原样传递，序列化时写回原文。

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 字段语义类型
///
/// Select / Radio / Checkbox 为「选择类」，只有它们允许携带选项列表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    DatetimeLocal,
    Email,
    Tel,
    Select,
    Checkbox,
    Radio,
    Password,
    Textarea,
    /// 未收录的类型标签，原样保留
    Other(String),
}

impl FieldKind {
    /// 规范类型标记（即 HTML 控件 type 值）
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::DatetimeLocal => "datetime-local",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::Password => "password",
            FieldKind::Textarea => "textarea",
            FieldKind::Other(tag) => tag,
        }
    }

    /// 选择类字段（允许携带选项列表）
    pub fn is_selection(&self) -> bool {
        matches!(
            self,
            FieldKind::Select | FieldKind::Radio | FieldKind::Checkbox
        )
    }
}

impl From<&str> for FieldKind {
    fn from(tag: &str) -> Self {
        match tag {
            "text" => FieldKind::Text,
            "number" => FieldKind::Number,
            "date" => FieldKind::Date,
            "datetime-local" => FieldKind::DatetimeLocal,
            "email" => FieldKind::Email,
            "tel" => FieldKind::Tel,
            "select" => FieldKind::Select,
            "checkbox" => FieldKind::Checkbox,
            "radio" => FieldKind::Radio,
            "password" => FieldKind::Password,
            "textarea" => FieldKind::Textarea,
            other => FieldKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(FieldKind::from(tag.as_str()))
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Text
    }
}

/// 单个表单字段定义。`name` 在表单内唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub default_value: String,
    /// 仅选择类字段携带，顺序即展示顺序
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
    pub placeholder: String,
}

impl Default for FormField {
    fn default() -> Self {
        Self {
            name: String::new(),
            label: String::new(),
            kind: FieldKind::Text,
            default_value: String::new(),
            options: None,
            required: false,
            placeholder: String::new(),
        }
    }
}

impl FormField {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
        default_value: impl Into<String>,
        options: Option<Vec<String>>,
        required: bool,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            default_value: default_value.into(),
            options,
            required,
            placeholder: placeholder.into(),
        }
    }
}

/// 会话当前持有的表单：字段定义 + 已填值 + 稳定标识
///
/// 标识只在创建时铸造；填写只改值，不换标识。
#[derive(Debug, Clone)]
pub struct ActiveForm {
    pub id: String,
    pub fields: Vec<FormField>,
    pub values: Map<String, Value>,
}

impl ActiveForm {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fields,
            values: Map::new(),
        }
    }

    /// 合并字段更新：新键新增、旧键覆盖，同时把值写回对应字段的
    /// default_value，重渲染后表单直接反映最新数据。
    pub fn apply_updates(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            self.values.insert(key.clone(), value.clone());
        }
        for field in &mut self.fields {
            if let Some(value) = updates.get(&field.name) {
                field.default_value = value_to_display(value);
            }
        }
    }
}

/// JSON 值转展示字符串：字符串去引号、null 为空、其余紧凑序列化
pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_serializes_with_camel_case_keys() {
        let field = FormField::new(
            "checkInDate",
            "入住日期",
            FieldKind::Date,
            "2025-06-01",
            None,
            true,
            "请选择入住日期",
        );
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["name"], "checkInDate");
        assert_eq!(json["type"], "date");
        assert_eq!(json["defaultValue"], "2025-06-01");
        assert_eq!(json["required"], true);
        // 非选择类字段不输出 options 键
        assert!(json.get("options").is_none());
    }

    #[test]
    fn field_deserializes_ignoring_unknown_keys() {
        let field: FormField = serde_json::from_str(
            r#"{"name":"roomType","label":"房间类型","type":"select",
                "defaultValue":"","options":["单人间","双人间"],
                "required":true,"placeholder":"","extra":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(field.kind, FieldKind::Select);
        assert_eq!(field.options.as_deref().unwrap().len(), 2);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let field: FormField = serde_json::from_str(r#"{"name":"note"}"#).unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert!(!field.required);
        assert!(field.default_value.is_empty());
    }

    #[test]
    fn unmapped_kind_round_trips_verbatim() {
        let kind = FieldKind::from("birthday");
        assert_eq!(kind, FieldKind::Other("birthday".to_string()));
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("birthday"));
    }

    #[test]
    fn apply_updates_overwrites_and_mirrors_to_defaults() {
        let mut form = ActiveForm::new(vec![FormField::new(
            "name",
            "姓名",
            FieldKind::Text,
            "",
            None,
            true,
            "请输入姓名",
        )]);
        let first_id = form.id.clone();

        let mut updates = Map::new();
        updates.insert("name".to_string(), json!("张三"));
        updates.insert("guests".to_string(), json!(2));
        form.apply_updates(&updates);

        let mut overwrite = Map::new();
        overwrite.insert("name".to_string(), json!("李四"));
        form.apply_updates(&overwrite);

        assert_eq!(form.id, first_id);
        assert_eq!(form.values["name"], json!("李四"));
        assert_eq!(form.values["guests"], json!(2));
        assert_eq!(form.fields[0].default_value, "李四");
    }

    #[test]
    fn value_display_formats() {
        assert_eq!(value_to_display(&json!("文本")), "文本");
        assert_eq!(value_to_display(&json!(3)), "3");
        assert_eq!(value_to_display(&Value::Null), "");
    }
}
