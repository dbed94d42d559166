use serde::{Deserialize, Serialize};

use super::comparison::Mrl;

/// 中国限量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChineseRecord {
    pub pesticide: String,
    pub food: String,
    pub mrl: Mrl,
}

impl ChineseRecord {
    pub fn new(pesticide: impl Into<String>, food: impl Into<String>, mrl: Mrl) -> Self {
        Self {
            pesticide: pesticide.into(),
            food: food.into(),
            mrl,
        }
    }
}

/// EU 限量记录（已去掉无关字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuropeanRecord {
    pub pesticide_residue_name: String,
    pub product_name: String,
    pub mrl_value_only: Mrl,
    pub applicability_text: String,
    pub application_date: Option<String>,
}

impl EuropeanRecord {
    pub fn new(pesticide: impl Into<String>, product: impl Into<String>, mrl: Mrl) -> Self {
        Self {
            pesticide_residue_name: pesticide.into(),
            product_name: product.into(),
            mrl_value_only: mrl,
            applicability_text: "Applicable".to_string(),
            application_date: None,
        }
    }
}

/// 一次 EU 数据快照
///
/// 两个分区互不相交。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EuSnapshot {
    /// 当前生效
    pub applicable: Vec<EuropeanRecord>,
    /// 尚未生效
    pub not_yet_applicable: Vec<EuropeanRecord>,
}

impl EuSnapshot {
    pub fn len(&self) -> usize {
        self.applicable.len() + self.not_yet_applicable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
