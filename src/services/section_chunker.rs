//! 按目录标题把报告全文切分成章节
//!
//! 标题按目录顺序逐个在尚未消费的文本中查找：标题的非空白字符逐字转义，
//! 之间允许任意空白（PDF 提取会插入换行和空格）。找不到的标题直接跳过。
//! 第一个命中标题之前的内容（前言、目录残留）丢弃。

use regex::Regex;
use tracing::{debug, info};

use crate::error::{AppResult, InputError};
use crate::models::Chapter;
use crate::services::name_normalizer;

/// 为标题构建容忍空白的匹配模式
fn heading_pattern(index: usize, heading: &str) -> AppResult<Regex> {
    let escaped: Vec<String> = heading
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    if escaped.is_empty() {
        return Err(InputError::EmptyHeading { index }.into());
    }
    Regex::new(&escaped.join(r"\s*")).map_err(|e| {
        InputError::InvalidHeading {
            index,
            reason: e.to_string(),
        }
        .into()
    })
}

/// 切分报告
///
/// # 参数
/// - `text`: PDF 提取出的全文
/// - `headings`: 目录中的标题，顺序即正文中出现的顺序
/// - `version`: 文档版本标记，写入每个章节
///
/// # 返回
/// 每个命中的标题对应一个章节，顺序与 `headings` 中的相对顺序一致。
///
/// # 错误
/// 任何一个标题为空（或只有空白）时直接拒绝，不产生部分结果。
pub fn chunk(text: &str, headings: &[String], version: &str) -> AppResult<Vec<Chapter>> {
    let patterns = headings
        .iter()
        .enumerate()
        .map(|(index, heading)| heading_pattern(index, heading).map(|re| (heading, re)))
        .collect::<AppResult<Vec<_>>>()?;

    // (规范名, 标题起始偏移)
    let mut starts: Vec<(String, usize)> = Vec::new();
    // 下一次查找的起点：上一个标题匹配结束的位置
    let mut cursor = 0usize;

    for (heading, re) in patterns {
        match re.find(&text[cursor..]) {
            Some(m) => {
                let start = cursor + m.start();
                cursor += m.end();
                starts.push((name_normalizer::normalize(heading), start));
            }
            None => {
                debug!("标题未在正文中找到，跳过: {}", heading.trim());
            }
        }
    }

    let chapters: Vec<Chapter> = starts
        .iter()
        .enumerate()
        .map(|(i, (pesticide, start))| {
            let end = starts.get(i + 1).map(|(_, next)| *next).unwrap_or(text.len());
            Chapter {
                pesticide: pesticide.clone(),
                text: text[*start..end].to_string(),
                version: version.to_string(),
                offset: *start,
            }
        })
        .collect();

    info!(
        "✓ 切分完成: {} 个标题中命中 {} 个章节 (版本 {})",
        headings.len(),
        chapters.len(),
        version
    );

    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn headings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const REPORT: &str = "Table of contents\n4.1 Abamectin (阿维菌素)\n\
        4.1 Abamectin (阿维菌素)\nADI: 0.001\nrice 0.02\n\
        4.2 Zox\namide (苯酰菌胺)\nADI: 0.5\nwheat 0.02\n\
        4.3 Acephate (乙酰甲胺磷)\nrice 1\n";

    #[test]
    fn test_every_heading_found_in_order() {
        let text = "front\nAAA body a\nBBB body b\nCCC body c";
        let chapters = chunk(text, &headings(&["AAA", "BBB", "CCC"]), "v1").unwrap();

        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].pesticide, "AAA");
        assert_eq!(chapters[0].text, "AAA body a\n");
        assert_eq!(chapters[1].text, "BBB body b\n");
        assert_eq!(chapters[2].text, "CCC body c");
        assert!(chapters.iter().all(|c| c.version == "v1"));
    }

    #[test]
    fn test_front_matter_discarded() {
        let chapters = chunk("preface text\nAAA x", &headings(&["AAA"]), "v").unwrap();
        assert_eq!(chapters.len(), 1);
        assert!(!chapters[0].text.contains("preface"));
    }

    #[test]
    fn test_tolerates_inserted_whitespace() {
        let chapters = chunk(
            REPORT,
            &headings(&["4.2 Zoxamide (苯酰菌胺)", "4.3 Acephate (乙酰甲胺磷)"]),
            "GB2021-001",
        )
        .unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].pesticide, "苯酰菌胺");
        assert!(chapters[0].text.starts_with("4.2 Zox\namide"));
        assert!(chapters[0].text.contains("wheat 0.02"));
        assert_eq!(chapters[1].pesticide, "乙酰甲胺磷");
    }

    #[test]
    fn test_missing_heading_skipped() {
        let text = "AAA one\nCCC three";
        let chapters = chunk(text, &headings(&["AAA", "BBB", "CCC"]), "v").unwrap();
        let names: Vec<&str> = chapters.iter().map(|c| c.pesticide.as_str()).collect();
        assert_eq!(names, vec!["AAA", "CCC"]);
        assert_eq!(chapters[0].text, "AAA one\n");
    }

    #[test]
    fn test_never_rescans_consumed_text() {
        // BBB 只出现在 CCC 之前，CCC 命中后不会回头
        let text = "BBB early\nCCC middle\nAAA late";
        let chapters = chunk(text, &headings(&["CCC", "BBB", "AAA"]), "v").unwrap();
        let names: Vec<&str> = chapters.iter().map(|c| c.pesticide.as_str()).collect();
        assert_eq!(names, vec!["CCC", "AAA"]);
    }

    #[test]
    fn test_offsets_strictly_increase() {
        // 同名标题出现两次时依次命中
        let chapters = chunk(
            REPORT,
            &headings(&[
                "4.1 Abamectin (阿维菌素)",
                "4.1 Abamectin (阿维菌素)",
                "4.2 Zoxamide (苯酰菌胺)",
                "4.3 Acephate (乙酰甲胺磷)",
            ]),
            "v",
        )
        .unwrap();
        assert_eq!(chapters.len(), 4);
        for pair in chapters.windows(2) {
            assert!(pair[1].offset > pair[0].offset);
        }
    }

    #[test]
    fn test_empty_heading_rejected_before_processing() {
        let err = chunk("AAA", &headings(&["AAA", "  "]), "v").unwrap_err();
        assert!(matches!(
            err,
            AppError::Input(InputError::EmptyHeading { index: 1 })
        ));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let text = "x\n2,4-D (2,4-滴) body\n4.1 a.b [c] body";
        let chapters = chunk(text, &headings(&["2,4-D (2,4-滴)", "4.1 a.b [c]"]), "v").unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].pesticide, "2,4-滴");
        assert_eq!(chapters[1].pesticide, "c");
    }

    #[test]
    fn test_no_headings_yields_nothing() {
        assert!(chunk("some text", &[], "v").unwrap().is_empty());
    }
}
