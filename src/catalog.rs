//! 表单模板目录
//!
//! 三种出行类工作流的固定字段模板。默认值按「抽取实体 > 用户资料 > 类型
//! 默认」求解；相对日期词在此处解析为 ISO 日期。请假与报销没有静态模板，
//! 它们的字段只会由结构化分类器给出。

use chrono::{Duration, Local, NaiveDate};

use crate::extract::ExtractedEntities;
use crate::form::{FieldKind, FormField};
use crate::intent::WorkflowKind;
use crate::profile::UserProfile;

/// 资料没有偏好时选择类交通字段的兜底选项，保证选择字段总有选项可选
const DEFAULT_TRANSPORT_OPTIONS: [&str; 4] = ["飞机", "高铁", "大巴", "自驾"];

const ROOM_TYPES: [&str; 4] = ["单人间", "双人间", "大床房", "套房"];
const SEAT_TYPES: [&str; 6] = ["一等座", "二等座", "商务座", "硬座", "硬卧", "软卧"];

/// 工作流对应的字段模板；请假/报销返回空表
pub fn fields_for(
    workflow: WorkflowKind,
    entities: &ExtractedEntities,
    profile: &UserProfile,
) -> Vec<FormField> {
    let today = Local::now().date_naive();
    match workflow {
        WorkflowKind::Hotel => hotel_fields(entities, profile, today),
        WorkflowKind::Flight => flight_fields(entities, profile, today),
        WorkflowKind::Train => train_fields(entities, profile, today),
        WorkflowKind::Leave | WorkflowKind::Expense => Vec::new(),
    }
}

/// 实体值优先，其次资料值
fn prefer(entity: Option<&String>, profile_value: &str) -> String {
    entity
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(profile_value)
        .to_string()
}

/// 相对日期词解析为 ISO 日期（中英等价词），其余原样返回
fn resolve_date_token(token: &str, today: NaiveDate) -> String {
    let offset = match token.to_lowercase().as_str() {
        "今天" | "today" => 0,
        "明天" | "tomorrow" => 1,
        "后天" | "day after tomorrow" => 2,
        _ => return token.to_string(),
    };
    (today + Duration::days(offset)).format("%Y-%m-%d").to_string()
}

fn date_default(entities: &ExtractedEntities, today: NaiveDate) -> String {
    entities
        .date
        .as_deref()
        .map(|token| resolve_date_token(token, today))
        .unwrap_or_default()
}

fn opts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// 交通方式选项与默认值：资料偏好优先，空偏好用兜底选项
fn transport_options(profile: &UserProfile, fallback_default: &str) -> (Vec<String>, String) {
    if profile.preferred_transportation.is_empty() {
        (opts(&DEFAULT_TRANSPORT_OPTIONS), fallback_default.to_string())
    } else {
        let default = profile.preferred_transportation[0].clone();
        (profile.preferred_transportation.clone(), default)
    }
}

fn hotel_fields(
    entities: &ExtractedEntities,
    profile: &UserProfile,
    today: NaiveDate,
) -> Vec<FormField> {
    vec![
        FormField::new(
            "name",
            "姓名",
            FieldKind::Text,
            prefer(entities.name.as_ref(), &profile.name),
            None,
            true,
            "请输入姓名",
        ),
        FormField::new(
            "phone",
            "联系电话",
            FieldKind::Text,
            profile.phone.clone(),
            None,
            true,
            "请输入联系电话",
        ),
        FormField::new(
            "email",
            "邮箱",
            FieldKind::Text,
            profile.email.clone(),
            None,
            false,
            "请输入邮箱",
        ),
        FormField::new(
            "destination",
            "目的地",
            FieldKind::Text,
            prefer(entities.destination.as_ref(), &profile.default_city),
            None,
            true,
            "请输入目的地",
        ),
        FormField::new(
            "checkInDate",
            "入住日期",
            FieldKind::Date,
            date_default(entities, today),
            None,
            true,
            "请选择入住日期",
        ),
        FormField::new(
            "checkOutDate",
            "退房日期",
            FieldKind::Date,
            "",
            None,
            true,
            "请选择退房日期",
        ),
        FormField::new(
            "roomType",
            "房间类型",
            FieldKind::Select,
            "",
            Some(opts(&ROOM_TYPES)),
            true,
            "",
        ),
        FormField::new(
            "guests",
            "入住人数",
            FieldKind::Number,
            "1",
            None,
            true,
            "请输入入住人数",
        ),
    ]
}

fn flight_fields(
    entities: &ExtractedEntities,
    profile: &UserProfile,
    today: NaiveDate,
) -> Vec<FormField> {
    let (options, default) = transport_options(profile, "飞机");
    vec![
        FormField::new(
            "name",
            "姓名",
            FieldKind::Text,
            prefer(entities.name.as_ref(), &profile.name),
            None,
            true,
            "请输入姓名",
        ),
        FormField::new(
            "phone",
            "联系电话",
            FieldKind::Text,
            profile.phone.clone(),
            None,
            true,
            "请输入联系电话",
        ),
        FormField::new(
            "email",
            "邮箱",
            FieldKind::Text,
            profile.email.clone(),
            None,
            false,
            "请输入邮箱",
        ),
        FormField::new(
            "idCard",
            "身份证号",
            FieldKind::Text,
            profile.id_card.clone(),
            None,
            true,
            "请输入身份证号",
        ),
        FormField::new(
            "departure",
            "出发地",
            FieldKind::Text,
            profile.default_city.clone(),
            None,
            true,
            "请输入出发地",
        ),
        FormField::new(
            "destination",
            "目的地",
            FieldKind::Text,
            entities.destination.clone().unwrap_or_default(),
            None,
            true,
            "请输入目的地",
        ),
        FormField::new(
            "departureDate",
            "出发日期",
            FieldKind::Date,
            date_default(entities, today),
            None,
            true,
            "请选择出发日期",
        ),
        FormField::new(
            "transportation",
            "交通方式",
            FieldKind::Select,
            default,
            Some(options),
            true,
            "",
        ),
        FormField::new(
            "passengers",
            "乘客人数",
            FieldKind::Number,
            "1",
            None,
            true,
            "请输入乘客人数",
        ),
    ]
}

fn train_fields(
    entities: &ExtractedEntities,
    profile: &UserProfile,
    today: NaiveDate,
) -> Vec<FormField> {
    let (options, default) = transport_options(profile, "高铁");
    vec![
        FormField::new(
            "name",
            "姓名",
            FieldKind::Text,
            prefer(entities.name.as_ref(), &profile.name),
            None,
            true,
            "请输入姓名",
        ),
        FormField::new(
            "phone",
            "联系电话",
            FieldKind::Text,
            profile.phone.clone(),
            None,
            true,
            "请输入联系电话",
        ),
        FormField::new(
            "email",
            "邮箱",
            FieldKind::Text,
            profile.email.clone(),
            None,
            false,
            "请输入邮箱",
        ),
        FormField::new(
            "idCard",
            "身份证号",
            FieldKind::Text,
            profile.id_card.clone(),
            None,
            true,
            "请输入身份证号",
        ),
        FormField::new(
            "departure",
            "出发地",
            FieldKind::Text,
            profile.default_city.clone(),
            None,
            true,
            "请输入出发地",
        ),
        FormField::new(
            "destination",
            "目的地",
            FieldKind::Text,
            entities.destination.clone().unwrap_or_default(),
            None,
            true,
            "请输入目的地",
        ),
        FormField::new(
            "departureDate",
            "出发日期",
            FieldKind::Date,
            date_default(entities, today),
            None,
            true,
            "请选择出发日期",
        ),
        FormField::new(
            "transportation",
            "交通方式",
            FieldKind::Select,
            default,
            Some(options),
            true,
            "",
        ),
        FormField::new(
            "seatType",
            "座位类型",
            FieldKind::Select,
            "二等座",
            Some(opts(&SEAT_TYPES)),
            true,
            "",
        ),
        FormField::new(
            "passengers",
            "乘客人数",
            FieldKind::Number,
            "1",
            None,
            true,
            "请输入乘客人数",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jeffery() -> UserProfile {
        UserProfile {
            name: "jeffery".to_string(),
            phone: "138****8888".to_string(),
            email: "user@example.com".to_string(),
            id_card: "110101199001011234".to_string(),
            preferred_transportation: vec![
                "飞机".to_string(),
                "高铁".to_string(),
                "自驾".to_string(),
                "大巴".to_string(),
            ],
            default_city: "北京".to_string(),
        }
    }

    fn field<'a>(fields: &'a [FormField], name: &str) -> &'a FormField {
        fields.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn hotel_template_has_expected_fields_in_order() {
        let fields = fields_for(
            WorkflowKind::Hotel,
            &ExtractedEntities::default(),
            &UserProfile::default(),
        );
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "name",
                "phone",
                "email",
                "destination",
                "checkInDate",
                "checkOutDate",
                "roomType",
                "guests"
            ]
        );
        assert_eq!(field(&fields, "guests").default_value, "1");
        assert!(!field(&fields, "email").required);
        assert_eq!(
            field(&fields, "roomType").options.as_deref().unwrap().len(),
            4
        );
    }

    #[test]
    fn entity_beats_profile_for_defaults() {
        let entities = ExtractedEntities {
            name: Some("张三".to_string()),
            destination: Some("上海".to_string()),
            date: None,
        };
        let fields = fields_for(WorkflowKind::Hotel, &entities, &jeffery());
        assert_eq!(field(&fields, "name").default_value, "张三");
        assert_eq!(field(&fields, "destination").default_value, "上海");
        // 实体缺失的字段仍从资料补
        assert_eq!(field(&fields, "phone").default_value, "138****8888");
    }

    #[test]
    fn hotel_destination_falls_back_to_profile_city_flight_does_not() {
        let fields = fields_for(
            WorkflowKind::Hotel,
            &ExtractedEntities::default(),
            &jeffery(),
        );
        assert_eq!(field(&fields, "destination").default_value, "北京");

        let fields = fields_for(
            WorkflowKind::Flight,
            &ExtractedEntities::default(),
            &jeffery(),
        );
        // 机票的目的地不用常驻城市兜底，出发地才用
        assert_eq!(field(&fields, "destination").default_value, "");
        assert_eq!(field(&fields, "departure").default_value, "北京");
    }

    #[test]
    fn transportation_prefers_profile_order() {
        let fields = fields_for(
            WorkflowKind::Flight,
            &ExtractedEntities::default(),
            &jeffery(),
        );
        let transport = field(&fields, "transportation");
        assert_eq!(transport.default_value, "飞机");
        assert_eq!(
            transport.options.as_deref().unwrap(),
            ["飞机", "高铁", "自驾", "大巴"]
        );
    }

    #[test]
    fn empty_profile_gets_fallback_transport_options() {
        let fields = fields_for(
            WorkflowKind::Flight,
            &ExtractedEntities::default(),
            &UserProfile::default(),
        );
        let transport = field(&fields, "transportation");
        assert_eq!(transport.default_value, "飞机");
        assert_eq!(
            transport.options.as_deref().unwrap(),
            DEFAULT_TRANSPORT_OPTIONS
        );
    }

    #[test]
    fn train_template_adds_seat_type() {
        let fields = fields_for(
            WorkflowKind::Train,
            &ExtractedEntities::default(),
            &UserProfile::default(),
        );
        let seat = field(&fields, "seatType");
        assert_eq!(seat.default_value, "二等座");
        assert_eq!(seat.options.as_deref().unwrap().len(), 6);
        // 空资料时交通方式退到火车场景的兜底默认
        assert_eq!(field(&fields, "transportation").default_value, "高铁");

        // 有偏好时与机票一样取偏好首位
        let fields = fields_for(WorkflowKind::Train, &ExtractedEntities::default(), &jeffery());
        assert_eq!(field(&fields, "transportation").default_value, "飞机");
    }

    #[test]
    fn leave_and_expense_have_no_static_template() {
        for workflow in [WorkflowKind::Leave, WorkflowKind::Expense] {
            assert!(fields_for(
                workflow,
                &ExtractedEntities::default(),
                &UserProfile::default()
            )
            .is_empty());
        }
    }

    #[test]
    fn relative_date_tokens_resolve_to_iso() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        assert_eq!(resolve_date_token("今天", today), "2025-05-31");
        assert_eq!(resolve_date_token("明天", today), "2025-06-01");
        assert_eq!(resolve_date_token("后天", today), "2025-06-02");
        assert_eq!(resolve_date_token("tomorrow", today), "2025-06-01");
        // 已是具体日期的原样保留
        assert_eq!(resolve_date_token("2025-12-25", today), "2025-12-25");
        assert_eq!(resolve_date_token("12月25日", today), "12月25日");
    }

    #[test]
    fn selection_fields_always_carry_options() {
        for workflow in [WorkflowKind::Hotel, WorkflowKind::Flight, WorkflowKind::Train] {
            let fields = fields_for(
                workflow,
                &ExtractedEntities::default(),
                &UserProfile::default(),
            );
            for f in fields {
                if f.kind.is_selection() {
                    assert!(f.options.as_deref().is_some_and(|o| !o.is_empty()), "{}", f.name);
                } else {
                    assert!(f.options.is_none(), "{}", f.name);
                }
            }
        }
    }
}
