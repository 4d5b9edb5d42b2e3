//! Tokenizer for XPath expressions

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Dot,
    DotDot,
    Comma,
    Pipe,
    ColonColon,
    Star,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    /// Names, including operator names (`and`, `or`, `div`, `mod`); the
    /// parser tells them apart by position
    Name(String),
    Literal(String),
    Number(f64),
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];
        let next = bytes.get(pos + 1).copied();

        let token = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'/' if next == Some(b'/') => {
                pos += 2;
                Token::DoubleSlash
            }
            b'/' => {
                pos += 1;
                Token::Slash
            }
            b'[' => {
                pos += 1;
                Token::LBracket
            }
            b']' => {
                pos += 1;
                Token::RBracket
            }
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b'@' => {
                pos += 1;
                Token::At
            }
            b',' => {
                pos += 1;
                Token::Comma
            }
            b'|' => {
                pos += 1;
                Token::Pipe
            }
            b'*' => {
                pos += 1;
                Token::Star
            }
            b'+' => {
                pos += 1;
                Token::Plus
            }
            b'-' => {
                pos += 1;
                Token::Minus
            }
            b'=' => {
                pos += 1;
                Token::Eq
            }
            b'!' if next == Some(b'=') => {
                pos += 2;
                Token::NotEq
            }
            b'<' if next == Some(b'=') => {
                pos += 2;
                Token::Le
            }
            b'<' => {
                pos += 1;
                Token::Lt
            }
            b'>' if next == Some(b'=') => {
                pos += 2;
                Token::Ge
            }
            b'>' => {
                pos += 1;
                Token::Gt
            }
            b':' if next == Some(b':') => {
                pos += 2;
                Token::ColonColon
            }
            b'.' if next == Some(b'.') => {
                pos += 2;
                Token::DotDot
            }
            b'.' if !next.is_some_and(|n| n.is_ascii_digit()) => {
                pos += 1;
                Token::Dot
            }
            b'.' | b'0'..=b'9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                if pos < bytes.len() && bytes[pos] == b'.' {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text = &input[start..pos];
                let value = text.parse::<f64>().map_err(|_| SyntaxError {
                    offset: start,
                    message: format!("invalid number '{text}'"),
                })?;
                Token::Number(value)
            }
            b'"' | b'\'' => {
                let close = input[pos + 1..].find(c as char).ok_or(SyntaxError {
                    offset: start,
                    message: "unterminated string literal".to_string(),
                })?;
                let text = &input[pos + 1..pos + 1 + close];
                pos += close + 2;
                Token::Literal(text.to_string())
            }
            _ => {
                let len = name_len(&input[pos..]);
                if len == 0 {
                    let ch = input[pos..].chars().next().unwrap_or_default();
                    return Err(SyntaxError {
                        offset: start,
                        message: format!("unexpected character '{ch}'"),
                    });
                }
                pos += len;
                Token::Name(input[start..pos].to_string())
            }
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    Ok(tokens)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Byte length of the (optionally prefixed) name at the start of `input`
fn name_len(input: &str) -> usize {
    let mut chars = input.char_indices().peekable();
    match chars.peek() {
        Some((_, c)) if is_name_start(*c) => {}
        _ => return 0,
    }

    let mut end = 0;
    let mut seen_colon = false;
    while let Some((idx, c)) = chars.next() {
        if is_name_char(c) {
            end = idx + c.len_utf8();
            continue;
        }
        // A single colon joins a prefix to a local name or `*`; `::` is an axis
        if c == ':' && !seen_colon {
            match chars.peek() {
                Some((_, '*')) => return idx + 2,
                Some((_, after)) if is_name_start(*after) => {
                    seen_colon = true;
                    end = idx + 1;
                    continue;
                }
                _ => {}
            }
        }
        break;
    }
    end
}
