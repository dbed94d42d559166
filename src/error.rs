use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 参数校验错误，处理前直接拒绝
    #[error("参数错误: {0}")]
    Input(#[from] InputError),
    /// PDF 文档读取错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// EU 数据源错误
    #[error("EU数据源错误: {0}")]
    Feed(#[from] FeedError),
    /// 数据库错误
    #[error("数据库错误: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// 参数校验错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 标题列表中存在空标题
    #[error("第 {index} 个标题为空")]
    EmptyHeading { index: usize },
    /// 标题无法编译为匹配模式
    #[error("第 {index} 个标题无法匹配: {reason}")]
    InvalidHeading { index: usize, reason: String },
    /// 关键词列表为空
    #[error("关键词列表不能为空")]
    NoKeywords,
    /// 章节号非法
    #[error("章节号非法 ({chapter}): {reason}")]
    InvalidChapterNumber { chapter: u32, reason: String },
    /// 页码范围非法
    #[error("页码范围非法 ({first}-{last}): {reason}")]
    InvalidPageRange {
        first: u32,
        last: u32,
        reason: &'static str,
    },
}

/// PDF 文档读取错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 不是 PDF 文件
    #[error("不是有效的 PDF 路径: {path}")]
    NotPdf { path: String },
    /// 加载失败
    #[error("加载 PDF 失败 ({path}): {source}")]
    LoadFailed {
        path: String,
        #[source]
        source: lopdf::Error,
    },
    /// 文本提取失败
    #[error("提取第 {page} 页文本失败: {source}")]
    ExtractFailed {
        page: u32,
        #[source]
        source: lopdf::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 调用超时
    #[error("LLM API调用超时 (模型: {model}, {secs} 秒)")]
    Timeout { model: String, secs: u64 },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// EU 数据源错误
#[derive(Debug, Error)]
pub enum FeedError {
    /// 网络请求失败
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回非成功状态码
    #[error("返回错误状态码 ({url}): {status}")]
    BadStatus { url: String, status: u16 },
    /// JSON 结构不符合预期
    #[error("无法识别的数据结构: {0}")]
    UnexpectedShape(String),
    /// JSON 解析失败
    #[error("JSON解析失败: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
}

impl AppError {
    /// 创建 LLM API 调用错误
    pub fn llm_api_failed(model: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            message: message.to_string(),
        })
    }

    /// 创建 EU 数据源请求错误
    pub fn feed_request_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Feed(FeedError::RequestFailed {
            url: url.into(),
            source,
        })
    }

    /// 是否值得重试（网络类错误）
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Llm(LlmError::ApiCallFailed { .. }) | AppError::Llm(LlmError::Timeout { .. }) => true,
            AppError::Feed(FeedError::RequestFailed { .. }) => true,
            AppError::Feed(FeedError::BadStatus { status, .. }) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::llm_api_failed("m", "boom").is_transient());
        assert!(AppError::Llm(LlmError::Timeout { model: "m".into(), secs: 1 }).is_transient());
        assert!(!AppError::Llm(LlmError::EmptyContent { model: "m".into() }).is_transient());
        assert!(AppError::Feed(FeedError::BadStatus { url: "u".into(), status: 503 }).is_transient());
        assert!(!AppError::Feed(FeedError::BadStatus { url: "u".into(), status: 404 }).is_transient());
        assert!(!AppError::from(InputError::NoKeywords).is_transient());
    }

    #[test]
    fn test_display_carries_context() {
        let err = AppError::from(InputError::EmptyHeading { index: 3 });
        assert_eq!(err.to_string(), "参数错误: 第 3 个标题为空");
    }
}
