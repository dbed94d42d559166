use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 缺失值在报告中的显示标记
pub const MISSING_MARKER: &str = "/";

/// 残留限量值（mg/kg），可能缺失
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mrl(Option<f64>);

impl Mrl {
    pub const MISSING: Mrl = Mrl(None);

    /// 非有限数值视为缺失
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Mrl(Some(value))
        } else {
            Mrl(None)
        }
    }

    /// 把文本强制转换为数值，无法解析（包括 "/"）时视为缺失
    ///
    /// EU 数据用末尾的 `*` 标记定量限，按数值本身读取。
    pub fn parse(text: &str) -> Self {
        text.trim()
            .trim_end_matches('*')
            .trim_end()
            .parse::<f64>()
            .map(Mrl::new)
            .unwrap_or_default()
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_missing(self) -> bool {
        self.0.is_none()
    }

    /// 取两者中较严格（较小）的值
    pub fn stricter(self, other: Mrl) -> Mrl {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Mrl(Some(a.min(b))),
            (Some(a), None) => Mrl(Some(a)),
            (None, b) => Mrl(b),
        }
    }
}

impl From<Option<f64>> for Mrl {
    fn from(value: Option<f64>) -> Self {
        value.map(Mrl::new).unwrap_or_default()
    }
}

impl fmt::Display for Mrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => f.write_str(MISSING_MARKER),
        }
    }
}

impl Serialize for Mrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_str(MISSING_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for Mrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Number(n) => n.as_f64().map(Mrl::new).unwrap_or_default(),
            serde_json::Value::String(s) => Mrl::parse(&s),
            _ => Mrl::MISSING,
        })
    }
}

/// 中国农药名 → 对应的 EU 农药名集合
///
/// 没有匹配是一种明确的状态（空集合），不是错误。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeMapping(BTreeMap<String, BTreeSet<String>>);

impl BridgeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, chinese: impl Into<String>, european: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(chinese.into())
            .or_default()
            .extend(european.into_iter().map(Into::into));
    }

    /// 对应的 EU 农药名，未登记的名称视为没有匹配
    pub fn matches<'a>(&'a self, chinese: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.0.get(chinese).into_iter().flatten()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// 所有被匹配到的 EU 农药名（去重）
    pub fn european_names(&self) -> BTreeSet<String> {
        self.0.values().flatten().cloned().collect()
    }
}

/// 报告中的一行比对结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub chi_pesticide: String,
    pub eu_pesticide: String,
    pub chi_food: String,
    pub eu_food: String,
    pub chi_mrl: Mrl,
    pub eu_mrl: Mrl,
    pub note: String,
    pub valid_mrl: Mrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mrl_parse_and_display() {
        assert_eq!(Mrl::parse(" 0.05 ").value(), Some(0.05));
        assert!(Mrl::parse("/").is_missing());
        assert!(Mrl::parse("n.a.").is_missing());
        assert_eq!(Mrl::parse("0.01*").value(), Some(0.01));
        assert!(Mrl::new(f64::NAN).is_missing());
        assert_eq!(Mrl::new(0.02).to_string(), "0.02");
        assert_eq!(Mrl::MISSING.to_string(), "/");
    }

    #[test]
    fn test_mrl_serializes_missing_as_marker() {
        let json = serde_json::to_string(&vec![Mrl::new(0.5), Mrl::MISSING]).unwrap();
        assert_eq!(json, r#"[0.5,"/"]"#);
        let back: Vec<Mrl> = serde_json::from_str(r#"[0.5,"/","0.1",null]"#).unwrap();
        assert_eq!(back, vec![Mrl::new(0.5), Mrl::MISSING, Mrl::new(0.1), Mrl::MISSING]);
    }

    #[test]
    fn test_bridge_mapping_unknown_key_has_no_matches() {
        let mut mapping = BridgeMapping::new();
        mapping.insert("Zoxamide", ["Zoxamide"]);
        mapping.insert("Unknownicide", Vec::<String>::new());
        assert_eq!(mapping.matches("Zoxamide").count(), 1);
        assert_eq!(mapping.matches("Unknownicide").count(), 0);
        assert_eq!(mapping.matches("never seen").count(), 0);
        assert_eq!(mapping.keys().count(), 2);
    }
}
