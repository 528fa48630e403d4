//! Parsing of model-proposed query lists.
//!
//! Model output is untrusted text. The bracketed-list reader accepts only
//! quoted string literals separated by commas; anything else (numbers, names,
//! nested lists, expressions) makes that candidate list invalid and the scan
//! moves on to the next `[`.

use std::sync::LazyLock;

use regex::Regex;

use ai_client::strip_code_blocks;

static NUMBERED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[.)]\s+").unwrap());

/// Which reader produced the queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    BracketedList,
    Lines,
}

/// Extract at most `max` queries from a model response.
///
/// Tries the first well-formed bracketed list of strings, then falls back to
/// one query per non-empty line. Returns `None` when neither yields anything.
pub fn parse_queries(response: &str, max: usize) -> Option<(Vec<String>, ParseMode)> {
    let text = strip_code_blocks(response);

    if let Some(list) = first_string_list(text) {
        let queries: Vec<String> = list
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(max)
            .collect();
        if !queries.is_empty() {
            return Some((queries, ParseMode::BracketedList));
        }
    }

    let lines = line_queries(text, max);
    if lines.is_empty() {
        None
    } else {
        Some((lines, ParseMode::Lines))
    }
}

/// The first `[ "..", '..' ]` list in `text` that parses completely.
pub fn first_string_list(text: &str) -> Option<Vec<String>> {
    text.char_indices()
        .filter(|(_, c)| *c == '[')
        .find_map(|(idx, _)| parse_list_at(&text[idx..]))
}

/// One query per line, with bullets, numbering and quotes stripped.
pub fn line_queries(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .take(max)
        .collect()
}

fn clean_line(line: &str) -> String {
    let trimmed = line.trim();
    let unnumbered = NUMBERED_PREFIX.replace(trimmed, "");
    unnumbered
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | '*' | '•' | '"' | '\'' | '`' | ',' | '[' | ']')
        })
        .to_string()
}

/// Parse a list that starts at `input[0] == '['`. Trailing text after `]` is ignored.
fn parse_list_at(input: &str) -> Option<Vec<String>> {
    let mut chars = input.chars().peekable();
    if chars.next()? != '[' {
        return None;
    }

    let mut items = Vec::new();
    skip_whitespace(&mut chars);
    if chars.peek() == Some(&']') {
        return Some(items);
    }

    loop {
        skip_whitespace(&mut chars);
        let quote = chars.next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        items.push(read_string(&mut chars, quote)?);

        skip_whitespace(&mut chars);
        match chars.next()? {
            ']' => return Some(items),
            ',' => {
                skip_whitespace(&mut chars);
                if chars.peek() == Some(&']') {
                    return Some(items);
                }
            }
            _ => return None,
        }
    }
}

fn skip_whitespace<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

/// Read up to the closing `quote`. Raw newlines end the literal unsuccessfully.
fn read_string<I: Iterator<Item = char>>(chars: &mut I, quote: char) -> Option<String> {
    let mut out = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(out),
            '\n' => return None,
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
}
