//! 实体抽取：从自由文本抽取姓名 / 目的地 / 日期
//!
//! 每类实体是一张有序规则表，按表序尝试、首个命中生效，之后的规则不再
//! 参与。三类抽取相互独立，可在同一句话上同时命中。抽取只会命中或缺失，
//! 从不报错。

use std::sync::LazyLock;

use regex::Regex;

/// 姓名的最大字符数，超长视为误捕，换下一条规则
const MAX_NAME_CHARS: usize = 10;

/// 抽取结果。缺失的字段表示「未在文本中发现」，不是错误。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub name: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
}

impl ExtractedEntities {
    /// 按字段合并：primary 缺失时用 fallback 补位
    pub fn merged(primary: Self, fallback: Self) -> Self {
        Self {
            name: primary.name.or(fallback.name),
            destination: primary.destination.or(fallback.destination),
            date: primary.date.or(fallback.date),
        }
    }
}

/// 姓名规则表（表序即优先级）：
/// 先试显式自称标签，捕获其后首个词（遇分隔符截断）；
/// 再试受益人句式「帮/为/给 + 姓名 + 定/订/买」。
/// 「I am / I'm」只接受首字母大写的词，避免把普通动词当姓名。
static NAME_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"我叫[：:\s]*([^，,。.\s：:]+)",
        r"我是[：:\s]*([^，,。.\s：:]+)",
        r"姓名[：:\s]*([^，,。.\s：:]+)",
        r"名字[：:\s]*([^，,。.\s：:]+)",
        r"(?i)\bmy name is\s+([^，,。.\s：:]+)",
        // (?i) 限定在标签上：捕获组的大写约束不能被大小写折叠掉
        r"(?i:\bi am)\s+([A-Z][^，,。.\s：:]*)",
        r"(?i:\bi'm)\s+([A-Z][^，,。.\s：:]*)",
        r"(?i)\bname[：:]\s*([^，,。.\s：:]+)",
        r"帮([\x{4e00}-\x{9fa5}a-zA-Z]+)(?:定|订|买)",
        r"为([\x{4e00}-\x{9fa5}a-zA-Z]+)(?:定|订|买)",
        r"给([\x{4e00}-\x{9fa5}a-zA-Z]+)(?:定|订|买)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// 代词不是姓名；受益人句式里「帮我订」之类会捕到它们
const PRONOUNS: [&str; 5] = ["我", "你", "他", "她", "它"];

/// 目的地规则表：动词引导的地名
static DESTINATION_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:去|到达|前往|抵达)([\x{4e00}-\x{9fa5}]+)",
        r"(?i)\b(?:go to|going to|heading to|fly to|arrive at)\s+([A-Za-z]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// 日期规则表：相对日期词在前（长词先于短词），绝对日期在后
static DATE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"后天",
        r"明天",
        r"今天",
        r"(?i)day after tomorrow",
        r"(?i)tomorrow",
        r"(?i)today",
        r"\d{4}-\d{2}-\d{2}",
        r"\d{1,2}月\d{1,2}日",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// 对同一句话做三类独立抽取
pub fn extract(text: &str) -> ExtractedEntities {
    ExtractedEntities {
        name: extract_name(text),
        destination: extract_destination(text),
        date: extract_date(text),
    }
}

pub fn extract_name(text: &str) -> Option<String> {
    NAME_RULES.iter().find_map(|rule| {
        rule.captures(text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|name| {
                !name.is_empty()
                    && name.chars().count() <= MAX_NAME_CHARS
                    && !PRONOUNS.contains(&name.as_str())
            })
    })
}

pub fn extract_destination(text: &str) -> Option<String> {
    DESTINATION_RULES
        .iter()
        .find_map(|rule| rule.captures(text).map(|caps| caps[1].to_string()))
}

pub fn extract_date(text: &str) -> Option<String> {
    DATE_RULES
        .iter()
        .find_map(|rule| rule.find(text).map(|m| m.as_str().to_string()))
}
