//! PDF 文档读取
//!
//! 只做两件事：按页码范围取出正文，按章节号从目录页取出标题。

use std::path::Path;

use lopdf::Document;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{AppResult, DocumentError, InputError};

/// PDF 读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    /// 读取页码范围内的正文
    ///
    /// # 参数
    /// - `first`, `last`: 从 1 开始的页码，包含两端；超出文档的部分会被截掉
    ///
    /// # 返回
    /// 按页拼接、空白规整后的文本
    pub fn load_text(&self, path: &Path, first: u32, last: u32) -> AppResult<String> {
        let document = open_document(path, first, last)?;
        let pages = clamp_pages(&document, path, first, last);
        if pages.is_empty() {
            return Ok(String::new());
        }

        let text = document
            .extract_text(&pages)
            .map_err(|source| DocumentError::ExtractFailed {
                page: pages[0],
                source,
            })?;
        let text = normalize_whitespace(&text);

        info!(
            "📄 读取 {} 第 {}-{} 页，共 {} 字符",
            path.display(),
            pages[0],
            pages[pages.len() - 1],
            text.chars().count()
        );
        Ok(text)
    }

    /// 从目录页中读取指定章节下的标题
    ///
    /// 例如章节号 4 匹配 `4.15 Zoxamide (苯酰菌胺)`。
    pub fn load_outline_headings(
        &self,
        path: &Path,
        first: u32,
        last: u32,
        chapter_number: u32,
    ) -> AppResult<Vec<String>> {
        let outline = self.load_text(path, first, last)?;
        let headings = extract_headings(&outline, chapter_number)?;
        info!("📑 目录中找到 {} 个第 {} 章标题", headings.len(), chapter_number);
        Ok(headings)
    }
}

fn open_document(path: &Path, first: u32, last: u32) -> AppResult<Document> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(DocumentError::NotFound { path: display }.into());
    }
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(DocumentError::NotPdf { path: display }.into());
    }
    validate_page_range(first, last)?;

    Document::load(path)
        .map_err(|source| DocumentError::LoadFailed { path: display, source }.into())
}

/// 校验页码范围（从 1 开始，首页不大于末页）
pub fn validate_page_range(first: u32, last: u32) -> Result<(), InputError> {
    let reason = if first == 0 {
        "页码从 1 开始"
    } else if first > last {
        "起始页大于结束页"
    } else {
        return Ok(());
    };
    Err(InputError::InvalidPageRange { first, last, reason })
}

fn clamp_pages(document: &Document, path: &Path, first: u32, last: u32) -> Vec<u32> {
    let page_count = document.get_pages().len() as u32;
    if last > page_count {
        warn!(
            "⚠️ {} 只有 {} 页，请求的第 {}-{} 页已截断",
            path.display(),
            page_count,
            first,
            last
        );
    }
    (first..=last.min(page_count)).collect()
}

/// 规整提取出的空白：连续空格合并为一个，行首空格去掉
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_line_start = true;
    let mut pending_space = false;

    for ch in text.chars() {
        match ch {
            ' ' => pending_space = !at_line_start,
            '\n' => {
                if pending_space {
                    out.push(' ');
                }
                out.push('\n');
                at_line_start = true;
                pending_space = false;
            }
            _ => {
                if pending_space {
                    out.push(' ');
                }
                out.push(ch);
                at_line_start = false;
                pending_space = false;
            }
        }
    }
    if pending_space {
        out.push(' ');
    }
    out
}

/// 按章节号提取标题，结果按出现顺序，去掉首尾空白
pub fn extract_headings(outline: &str, chapter_number: u32) -> AppResult<Vec<String>> {
    if chapter_number == 0 {
        return Err(InputError::InvalidChapterNumber {
            chapter: chapter_number,
            reason: "章节号从 1 开始".to_string(),
        }
        .into());
    }

    // 标题从编号开始，到第一个点号或下一个同章编号为止；跨行的标题合并成一行
    let pattern = format!(r"\b{}\.\d+", chapter_number);
    let re = Regex::new(&pattern).map_err(|e| InputError::InvalidChapterNumber {
        chapter: chapter_number,
        reason: e.to_string(),
    })?;

    let numbers: Vec<(usize, usize)> = re.find_iter(outline).map(|m| (m.start(), m.end())).collect();
    let mut headings = Vec::with_capacity(numbers.len());
    for (i, &(start, number_end)) in numbers.iter().enumerate() {
        let limit = numbers.get(i + 1).map_or(outline.len(), |next| next.0);
        let body = &outline[number_end..limit];
        let body = &body[..body.find('.').unwrap_or(body.len())];
        if body.trim().is_empty() {
            continue;
        }
        let heading = outline[start..number_end + body.len()]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        headings.push(heading);
    }
    debug!("标题: {:?}", headings);
    Ok(headings)
}
