//! 表单渲染：字段定义 + 当前值 -> HTML 片段
//!
//! 引擎只决定「渲染哪些字段、带什么值」；标记方言由渲染器自理，引擎不做
//! 二次转义。[`HtmlFormRenderer`] 输出 div.form-container 包裹的表单，
//! select 类型渲染为下拉框，其余渲染为对应 type 的 input。

use serde_json::{Map, Value};

use crate::form::{value_to_display, FieldKind, FormField};

/// 表单渲染器
pub trait FormRenderer: Send + Sync {
    /// 渲染为标记片段。`values` 覆盖字段自身的 default_value。
    fn render(&self, fields: &[FormField], values: &Map<String, Value>) -> String;
}

#[derive(Debug, Default)]
pub struct HtmlFormRenderer;

impl FormRenderer for HtmlFormRenderer {
    fn render(&self, fields: &[FormField], values: &Map<String, Value>) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"form-container\">\n");
        html.push_str("<form class=\"dynamic-form\">\n");
        for field in fields {
            let current = values.get(&field.name).map(value_to_display);
            html.push_str(&field_html(field, current));
        }
        html.push_str("<div class=\"form-actions\">\n");
        html.push_str("<button type=\"submit\" class=\"btn-submit\">提交</button>\n");
        html.push_str("<button type=\"reset\" class=\"btn-reset\">重置</button>\n");
        html.push_str("</div>\n</form>\n</div>");
        html
    }
}

fn field_html(field: &FormField, current: Option<String>) -> String {
    // 已填值优先于字段默认值；selected 比较用原文，输出时再转义
    let value = current.unwrap_or_else(|| field.default_value.clone());
    let name = escape_html(&field.name);

    let mut html = String::from("<div class=\"form-field\">\n");
    html.push_str(&format!(
        "<label for=\"{}\">{}{}</label>\n",
        name,
        escape_html(&field.label),
        if field.required {
            "<span class=\"required\">*</span>"
        } else {
            ""
        }
    ));

    if field.kind == FieldKind::Select {
        html.push_str(&format!("<select id=\"{name}\" name=\"{name}\""));
        if field.required {
            html.push_str(" required");
        }
        html.push_str(">\n");
        for option in field.options.as_deref().unwrap_or_default() {
            let selected = if *option == value { " selected" } else { "" };
            html.push_str(&format!(
                "<option value=\"{}\"{selected}>{}</option>\n",
                escape_html(option),
                escape_html(option)
            ));
        }
        html.push_str("</select>\n");
    } else {
        html.push_str(&format!(
            "<input type=\"{}\" id=\"{name}\" name=\"{name}\"",
            escape_html(field.kind.as_str())
        ));
        if !value.is_empty() {
            html.push_str(&format!(" value=\"{}\"", escape_html(&value)));
        }
        if !field.placeholder.is_empty() {
            html.push_str(&format!(" placeholder=\"{}\"", escape_html(&field.placeholder)));
        }
        if field.required {
            html.push_str(" required");
        }
        html.push_str(">\n");
    }

    html.push_str("</div>\n");
    html
}

/// HTML 转义：& 必须最先替换
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
