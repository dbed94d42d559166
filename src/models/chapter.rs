use serde::{Deserialize, Serialize};

/// 文档中一个农药对应的章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 规范化后的农药名
    pub pesticide: String,
    /// 章节全文（以标题开头）
    pub text: String,
    /// 文档版本，如 "GB2021-001"
    pub version: String,
    /// 标题在原文中的字节偏移
    #[serde(skip)]
    pub offset: usize,
}

/// 按关键词从数据库命中的章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterHit {
    pub pesticide: String,
    pub text: String,
    pub version: String,
    /// 命中该章节的关键词
    pub keyword: String,
}
