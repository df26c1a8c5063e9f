//! 书籍选择解析
//!
//! 将用户输入的 `1, 3, 7, 14-32` 这类文本转换为去重后的展示序号集合。
//! 处理分三步：切分为 token、逐个分类、归约为结果集合。
//! 序号指列表展示时的位置，而不是书籍的产品ID。

use log::warn;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::api::Book;

/// 输入该指令时直接退出程序
pub const EXIT_COMMAND: &str = "exit";

/// 单个 token 被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    NotANumber,
    MultipleHyphens,
    MalformedRange,
    DescendingRange,
    OutOfRange,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::Empty => "参数为空",
            RejectReason::NotANumber => "不是数字",
            RejectReason::MultipleHyphens => "包含多个 '-'",
            RejectReason::MalformedRange => "范围格式不正确",
            RejectReason::DescendingRange => "范围起点大于终点",
            RejectReason::OutOfRange => "序号不存在",
        };
        f.write_str(text)
    }
}

/// 被丢弃的 token 及原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub token: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.token, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// 输入中没有任何可用的序号，调用方应重新提示
    #[error("输入 '{input}' 中没有有效的序号")]
    InvalidInput {
        input: String,
        rejected: Vec<Rejection>,
    },
}

/// 解析成功得到的序号集合，按首次出现顺序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionResult {
    indices: Vec<usize>,
    rejected: Vec<Rejection>,
}

impl SelectionResult {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// 解析过程中被丢弃的部分，已经以 warn 级别记录过
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    fn reject(&mut self, token: String, reason: RejectReason) {
        self.rejected.push(Rejection { token, reason });
    }

    /// 按序号从展示列表中取出书籍
    pub fn pick<'a>(&self, books: &'a [Book]) -> Vec<&'a Book> {
        self.indices.iter().filter_map(|&i| books.get(i)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 用户要求退出
    Exit,
    Books(SelectionResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Index(usize),
    Range(usize, usize),
    Invalid(&'a str, RejectReason),
}

/// 解析用户输入的选择文本
///
/// 只有整段输入都没有可用序号时才返回 `InvalidInput`，
/// 单个错误 token 只会记录警告并被跳过。
pub fn parse(text: &str, catalog_size: usize) -> Result<Selection, SelectionError> {
    let text = text.trim();
    if text == EXIT_COMMAND {
        return Ok(Selection::Exit);
    }

    let result = reduce(tokenize(text).map(classify), catalog_size);
    for rejection in &result.rejected {
        warn!("参数 {}", rejection);
    }

    if result.indices.is_empty() {
        return Err(SelectionError::InvalidInput {
            input: text.to_string(),
            rejected: result.rejected,
        });
    }

    Ok(Selection::Books(result))
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim)
}

fn classify(token: &str) -> Token<'_> {
    if token.is_empty() {
        return Token::Invalid(token, RejectReason::Empty);
    }

    match token.matches('-').count() {
        0 => match token.parse::<usize>() {
            Ok(index) => Token::Index(index),
            Err(_) => Token::Invalid(token, RejectReason::NotANumber),
        },
        1 => {
            let Some((from, to)) = token.split_once('-') else {
                return Token::Invalid(token, RejectReason::MalformedRange);
            };
            match (from.trim().parse::<usize>(), to.trim().parse::<usize>()) {
                (Ok(from), Ok(to)) if from <= to => Token::Range(from, to),
                (Ok(_), Ok(_)) => Token::Invalid(token, RejectReason::DescendingRange),
                _ => Token::Invalid(token, RejectReason::MalformedRange),
            }
        }
        _ => Token::Invalid(token, RejectReason::MultipleHyphens),
    }
}

fn reduce<'a>(tokens: impl Iterator<Item = Token<'a>>, catalog_size: usize) -> SelectionResult {
    let mut seen = HashSet::new();
    let mut result = SelectionResult::default();

    for token in tokens {
        match token {
            Token::Index(index) if index < catalog_size => {
                if seen.insert(index) {
                    result.indices.push(index);
                }
            }
            Token::Index(index) => {
                result.reject(index.to_string(), RejectReason::OutOfRange);
            }
            Token::Range(from, to) if from >= catalog_size => {
                result.reject(format!("{}-{}", from, to), RejectReason::OutOfRange);
            }
            Token::Range(from, to) => {
                let last = to.min(catalog_size - 1);
                for index in from..=last {
                    if seen.insert(index) {
                        result.indices.push(index);
                    }
                }
                if to > last {
                    result.reject(format!("{}-{}", last + 1, to), RejectReason::OutOfRange);
                }
            }
            Token::Invalid(token, reason) => result.reject(token.to_string(), reason),
        }
    }

    result
}
