//! 宽松的列表解析器
//!
//! 模型被要求输出 Python 风格的列表字面量，如 `[["wheat", 0.02], ["rice", 0.1]]`，
//! 但实际输出经常带有代码块、前后说明文字、缺逗号、括号不配平等问题。
//! 这里先修复文本，再用一个小型递归下降解析器读取结果。
//!
//! 修复步骤（按顺序）：
//! 1. 只保留第一个 `[` 到最后一个 `]` 之间的内容（去掉代码块标记和说明文字）
//! 2. 相邻子列表 `] [` 之间补逗号
//! 3. 配平括号：多余的右括号丢弃，未闭合的字符串和括号在末尾补齐
//! 4. 顶层出现多个并列列表时补一层外括号

use std::fmt;

use crate::models::Mrl;

/// 解析出的字面量
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    List(Vec<Literal>),
    Str(String),
    Num(f64),
    Null,
}

impl Literal {
    /// 作为文本读取，数字转成字符串，`None` 为空
    pub fn as_text(&self) -> Option<String> {
        match self {
            Literal::Str(s) => Some(s.trim().to_string()),
            Literal::Num(n) => Some(n.to_string()),
            Literal::List(_) | Literal::Null => None,
        }
    }

    /// 作为限量值读取，无法识别时为缺失
    pub fn as_mrl(&self) -> Mrl {
        match self {
            Literal::Num(n) => Mrl::new(*n),
            Literal::Str(s) => Mrl::parse(s),
            Literal::List(_) | Literal::Null => Mrl::MISSING,
        }
    }
}

/// 修复后仍无法解析
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// 修复后的文本，用于日志
    pub repaired: String,
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (修复后文本: {})", self.reason, self.repaired)
    }
}

impl std::error::Error for ParseFailure {}

/// 修复模型输出，找不到任何 `[` 时返回 `None`
pub fn repair(raw: &str) -> Option<String> {
    let start = raw.find('[')?;
    // 最后一个 `]` 之后还有 `[` 说明输出被截断，保留到结尾
    let end = raw
        .rfind(']')
        .filter(|&e| e > start && !raw[e..].contains('['))
        .map(|e| e + 1)
        .unwrap_or(raw.len());

    let separated = insert_missing_separators(&raw[start..end]);
    let balanced = balance_brackets(&separated);
    Some(force_outer_brackets(balanced))
}

/// 解析二维列表
///
/// 顶层只有标量时视为单独一行。只含列表的列表被视为行的容器并展开，
/// 因此多包一层括号的输出也能读出同样的行；容器中夹杂的标量和空行被忽略。
pub fn parse_rows(raw: &str) -> Result<Vec<Vec<Literal>>, ParseFailure> {
    let (repaired, literal) = parse_repaired(raw)?;
    let Literal::List(items) = literal else {
        return Err(ParseFailure {
            repaired,
            reason: "顶层不是列表".to_string(),
        });
    };

    if !items.is_empty() && items.iter().all(|item| !is_list(item)) {
        return Ok(vec![items]);
    }

    let mut rows = Vec::new();
    collect_rows(items, &mut rows);
    Ok(rows)
}

fn is_list(literal: &Literal) -> bool {
    matches!(literal, Literal::List(_))
}

fn collect_rows(items: Vec<Literal>, rows: &mut Vec<Vec<Literal>>) {
    for item in items {
        let Literal::List(inner) = item else { continue };
        if inner.is_empty() {
            continue;
        }
        if inner.iter().all(is_list) {
            collect_rows(inner, rows);
        } else {
            rows.push(inner);
        }
    }
}

/// 解析字符串列表，嵌套列表会被展开
pub fn parse_string_list(raw: &str) -> Result<Vec<String>, ParseFailure> {
    let (_, literal) = parse_repaired(raw)?;
    let mut out = Vec::new();
    flatten_strings(literal, &mut out);
    Ok(out)
}

fn flatten_strings(literal: Literal, out: &mut Vec<String>) {
    match literal {
        Literal::List(items) => items.into_iter().for_each(|item| flatten_strings(item, out)),
        other => {
            if let Some(text) = other.as_text().filter(|t| !t.is_empty()) {
                out.push(text);
            }
        }
    }
}

fn parse_repaired(raw: &str) -> Result<(String, Literal), ParseFailure> {
    if let Some(span) = leading_complete_list(raw) {
        if let Ok(literal) = parse_literal(span) {
            return Ok((span.to_string(), literal));
        }
    }

    let Some(repaired) = repair(raw) else {
        return Err(ParseFailure {
            repaired: raw.trim().to_string(),
            reason: "输出中没有列表".to_string(),
        });
    };

    match parse_literal(&repaired) {
        Ok(literal) => Ok((repaired, literal)),
        Err(reason) => Err(ParseFailure { repaired, reason }),
    }
}

/// 从第一个 `[` 开始的第一个完整列表
///
/// 列表之后紧跟 `,` `[` `]` 时说明输出还在继续（缺外层括号、缺逗号或括号多余），返回 `None`，
/// 交给修复流程处理整段文本。
fn leading_complete_list(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '(' => depth += 1,
            ']' | ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + 1;
                    let rest = raw[end..].trim_start();
                    if rest.starts_with(&[',', '[', ']'][..]) {
                        return None;
                    }
                    return Some(&raw[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 在 `]` 和 `[` 之间补上缺失的逗号
fn insert_missing_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '[' if out.trim_end().ends_with(']') => {
                let len = out.trim_end().len();
                out.truncate(len);
                out.push_str(", ");
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// 配平括号：丢弃多余的右括号，纠正不匹配的右括号，末尾补齐未闭合的字符串和括号
fn balance_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '[' | '(' => {
                stack.push(c);
                out.push(c);
            }
            ']' | ')' => {
                if let Some(open) = stack.pop() {
                    out.push(closer_for(open));
                }
            }
            _ => out.push(c),
        }
    }

    if let Some(q) = quote {
        out.push(q);
    }
    while let Some(open) = stack.pop() {
        out.push(closer_for(open));
    }
    out
}

fn closer_for(open: char) -> char {
    if open == '(' {
        ')'
    } else {
        ']'
    }
}

/// 顶层列表在文本结束前就闭合时，给整体补一层外括号
fn force_outer_brackets(text: String) -> String {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '(' => depth += 1,
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && !text[i + c.len_utf8()..].trim().is_empty() {
                    return format!("[{}]", text);
                }
            }
            _ => {}
        }
    }
    text
}

/// 解析一个完整的字面量，末尾不允许有多余内容
pub fn parse_literal(text: &str) -> Result<Literal, String> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let literal = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(format!("位置 {} 之后有多余内容", parser.pos));
    }
    Ok(literal)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("意外的结尾".to_string()),
            Some('[') => self.parse_seq(']'),
            Some('(') => self.parse_seq(')'),
            Some(q @ ('\'' | '"')) => self.parse_str(q),
            Some(_) => self.parse_bare(),
        }
    }

    fn parse_seq(&mut self, close: char) -> Result<Literal, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(Literal::List(items));
                }
                None => return Err(format!("列表未闭合，缺少 '{}'", close)),
                _ => {}
            }

            items.push(self.parse_value()?);

            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                Some(c) => return Err(format!("位置 {} 出现意外字符 '{}'", self.pos, c)),
                None => return Err(format!("列表未闭合，缺少 '{}'", close)),
            }
        }
    }

    fn parse_str(&mut self, quote: char) -> Result<Literal, String> {
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    let Some(next) = self.peek() else { break };
                    self.pos += 1;
                    value.push(match next {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Ok(Literal::Str(value)),
                c => value.push(c),
            }
        }
        Err("字符串未闭合".to_string())
    }

    /// 未加引号的值：数字、None/null 或裸字
    fn parse_bare(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !matches!(c, ',' | ']' | ')' | '[' | '('))
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let word = word.trim();

        if word.is_empty() {
            return Err(format!("位置 {} 缺少值", start));
        }
        Ok(classify_bare(word))
    }
}

fn classify_bare(word: &str) -> Literal {
    match word {
        "None" | "null" | "NULL" | "nan" | "NaN" => Literal::Null,
        _ => match word.parse::<f64>() {
            Ok(n) if n.is_finite() => Literal::Num(n),
            _ => Literal::Str(word.to_string()),
        },
    }
}
