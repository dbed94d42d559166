//! 标题 → 规范农药名
//!
//! 目录中的标题形如 `4.15 Zoxamide (苯酰菌胺)`，末尾括号内是用作连接键的名称。

use tracing::warn;

/// 规范化一个标题
///
/// 标题（忽略末尾空白）以 `)` 或 `]` 结尾时，返回最后一对同类括号内最里层的内容；
/// 否则原样返回标题。
///
/// 以下畸形输入记录警告并原样返回标题：
/// - 以其他括号（如全角 `）`、`】`、`}`）结尾
/// - 找不到对应的左括号
/// - 括号内为空
pub fn normalize(heading: &str) -> String {
    let trimmed = heading.trim_end();
    let Some(closer) = trimmed.chars().last() else {
        return heading.to_string();
    };

    let opener = match closer {
        ')' => '(',
        ']' => '[',
        '）' | '】' | '}' | '>' | '」' => {
            warn!(
                "标题以无法识别的括号 '{}' 结尾，保留原标题: {}",
                closer, heading
            );
            return heading.to_string();
        }
        _ => return heading.to_string(),
    };

    let body = &trimmed[..trimmed.len() - closer.len_utf8()];
    let Some(open_idx) = body.rfind(opener) else {
        warn!("标题末尾的 '{}' 没有对应的 '{}'，保留原标题: {}", closer, opener, heading);
        return heading.to_string();
    };

    let inner = &body[open_idx + opener.len_utf8()..];
    // 嵌套时只取最里层
    let inner = inner.split(closer).next().unwrap_or(inner).trim();

    if inner.is_empty() {
        warn!("标题末尾括号内为空，保留原标题: {}", heading);
        return heading.to_string();
    }

    inner.to_string()
}
