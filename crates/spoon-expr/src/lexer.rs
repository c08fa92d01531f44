//! Tokenizer for formulas and preamble statements.

use crate::error::{ExprError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    /// Statement separator: `;` or a newline outside brackets.
    Sep,
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub tok: Tok,
    pub pos: usize,
}

// Longest operators first so `**` wins over `*`.
const OPS: [&str; 14] = [
    "**", "//", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "=",
];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    let err = |pos: usize, message: String| ExprError::Syntax {
        source_text: src.to_string(),
        pos,
        message,
    };

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' => i += 1,
            b'\n' | b';' => {
                if depth == 0 {
                    out.push(Token { tok: Tok::Sep, pos: i });
                }
                i += 1;
            }
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'(' | b'[' => {
                depth += 1;
                let tok = if c == b'(' { Tok::LParen } else { Tok::LBracket };
                out.push(Token { tok, pos: i });
                i += 1;
            }
            b')' | b']' => {
                depth = depth.saturating_sub(1);
                let tok = if c == b')' { Tok::RParen } else { Tok::RBracket };
                out.push(Token { tok, pos: i });
                i += 1;
            }
            b',' => {
                out.push(Token { tok: Tok::Comma, pos: i });
                i += 1;
            }
            b':' => {
                out.push(Token { tok: Tok::Colon, pos: i });
                i += 1;
            }
            b'.' if !bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()) => {
                out.push(Token { tok: Tok::Dot, pos: i });
                i += 1;
            }
            b'\'' | b'"' => {
                let (s, next) = lex_string(src, i).map_err(|m| err(i, m))?;
                out.push(Token { tok: Tok::Str(s), pos: i });
                i = next;
            }
            b'0'..=b'9' | b'.' => {
                let (tok, next) = lex_number(src, i).map_err(|m| err(i, m))?;
                out.push(Token { tok, pos: i });
                i = next;
            }
            _ if c == b'_' || c.is_ascii_alphabetic() || c >= 0x80 => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric() || bytes[i] >= 0x80)
                {
                    i += 1;
                }
                out.push(Token {
                    tok: Tok::Name(src[start..i].to_string()),
                    pos: start,
                });
            }
            _ => {
                let rest = &src[i..];
                match OPS.iter().find(|op| rest.starts_with(**op)) {
                    Some(op) => {
                        out.push(Token { tok: Tok::Op(op), pos: i });
                        i += op.len();
                    }
                    None => {
                        let ch = rest.chars().next().unwrap_or('?');
                        return Err(err(i, format!("unexpected character {ch:?}")));
                    }
                }
            }
        }
    }
    out.push(Token {
        tok: Tok::Eof,
        pos: src.len(),
    });
    Ok(out)
}

fn lex_string(src: &str, start: usize) -> std::result::Result<(String, usize), String> {
    let mut chars = src[start..].char_indices();
    let (_, quote) = chars.next().ok_or("empty string literal")?;
    let mut out = String::new();
    while let Some((off, ch)) = chars.next() {
        if ch == quote {
            return Ok((out, start + off + ch.len_utf8()));
        }
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => out.push('\n'),
            Some((_, 't')) => out.push('\t'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, '0')) => out.push('\0'),
            Some((_, '\\')) => out.push('\\'),
            Some((_, '\'')) => out.push('\''),
            Some((_, '"')) => out.push('"'),
            Some((_, other)) => {
                out.push('\\');
                out.push(other);
            }
            None => break,
        }
    }
    Err("unterminated string literal".to_string())
}

fn lex_number(src: &str, start: usize) -> std::result::Result<(Tok, usize), String> {
    let bytes = src.as_bytes();
    let mut i = start;
    let mut is_float = false;
    let digits = |i: &mut usize| {
        while *i < bytes.len() && (bytes[*i].is_ascii_digit() || bytes[*i] == b'_') {
            *i += 1;
        }
    };
    digits(&mut i);
    if i < bytes.len() && bytes[i] == b'.' {
        is_float = true;
        i += 1;
        digits(&mut i);
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            is_float = true;
            i = j;
            digits(&mut i);
        }
    }
    let text = src[start..i].replace('_', "");
    if is_float {
        text.parse::<f64>()
            .map(|f| (Tok::Float(f), i))
            .map_err(|e| format!("invalid float literal {text:?}: {e}"))
    } else {
        text.parse::<i64>()
            .map(|n| (Tok::Int(n), i))
            .map_err(|e| format!("invalid integer literal {text:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            toks("x**2 // 3"),
            vec![
                Tok::Name("x".into()),
                Tok::Op("**"),
                Tok::Int(2),
                Tok::Op("//"),
                Tok::Int(3),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            toks("1.5e3 .5 'a\\'b' \"c\""),
            vec![
                Tok::Float(1500.0),
                Tok::Float(0.5),
                Tok::Str("a'b".into()),
                Tok::Str("c".into()),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_do_not_separate() {
        let t = toks("f(1,\n2)\ny");
        assert_eq!(t.iter().filter(|t| **t == Tok::Sep).count(), 1);
    }

    #[test]
    fn method_call_dot_is_not_a_number() {
        assert_eq!(
            toks("s.upper()"),
            vec![
                Tok::Name("s".into()),
                Tok::Dot,
                Tok::Name("upper".into()),
                Tok::LParen,
                Tok::RParen,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        assert!(matches!(tokenize("'abc"), Err(ExprError::Syntax { .. })));
    }
}
