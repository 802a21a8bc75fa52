//! Tokenizer for path expressions.

use std::fmt;

use crate::error::DocError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    Star,
    Pipe,
    Plus,
    Minus,
    Dollar,
    DoubleColon,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// An NCName, or a `prefix:local` QName.
    Name(String),
    Literal(String),
    Number(f64),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::At => "@",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::DotDot => "..",
            Token::Star => "*",
            Token::Pipe => "|",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Dollar => "$",
            Token::DoubleColon => "::",
            Token::Eq => "=",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Name(name) => return write!(f, "`{name}`"),
            Token::Literal(lit) => return write!(f, "'{lit}'"),
            Token::Number(n) => return write!(f, "{n}"),
        };
        write!(f, "`{s}`")
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, DocError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            i += 1;
            continue;
        }

        let (token, len) = match c {
            '/' if next == Some('/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '@' => (Token::At, 1),
            ',' => (Token::Comma, 1),
            '*' => (Token::Star, 1),
            '|' => (Token::Pipe, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '$' => (Token::Dollar, 1),
            '=' => (Token::Eq, 1),
            '!' if next == Some('=') => (Token::Ne, 2),
            '<' if next == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            ':' if next == Some(':') => (Token::DoubleColon, 2),
            '.' if next == Some('.') => (Token::DotDot, 2),
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => lex_number(&chars, i)?,
            '.' => (Token::Dot, 1),
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| {
                        DocError::invalid_input("unterminated string literal in path expression")
                    })?;
                let literal: String = chars[i + 1..i + 1 + end].iter().collect();
                (Token::Literal(literal), end + 2)
            }
            c if c.is_ascii_digit() => lex_number(&chars, i)?,
            c if is_name_start(c) => lex_name(&chars, i),
            other => {
                return Err(DocError::invalid_input(format!(
                    "unexpected character {other:?} in path expression"
                )));
            }
        };

        tokens.push(token);
        i += len;
    }

    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(Token, usize), DocError> {
    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() {
        match chars[end] {
            '0'..='9' => {}
            '.' if !seen_dot && chars.get(end + 1) != Some(&'.') => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    let text: String = chars[start..end].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| DocError::invalid_input(format!("invalid number {text:?}")))?;
    Ok((Token::Number(value), end - start))
}

/// Reads an NCName, plus a `:local` (or `:*`) suffix when one follows.
fn lex_name(chars: &[char], start: usize) -> (Token, usize) {
    let mut end = start + 1;
    while end < chars.len() && is_name_char(chars[end]) {
        end += 1;
    }

    if chars.get(end) == Some(&':') && chars.get(end + 1) != Some(&':') {
        let mut local_end = end + 1;
        if chars.get(local_end) == Some(&'*') {
            local_end += 1;
        } else {
            while local_end < chars.len() && is_name_char(chars[local_end]) {
                local_end += 1;
            }
        }
        if local_end > end + 1 {
            end = local_end;
        }
    }

    let name: String = chars[start..end].iter().collect();
    (Token::Name(name), end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_location_path() {
        let tokens = tokenize("//ul/li[@id='2']").expect("tokens");
        assert_eq!(
            tokens,
            vec![
                Token::DoubleSlash,
                Token::Name("ul".into()),
                Token::Slash,
                Token::Name("li".into()),
                Token::LBracket,
                Token::At,
                Token::Name("id".into()),
                Token::Eq,
                Token::Literal("2".into()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_tokenize_functions_and_operators() {
        let tokens =
            tokenize("*[contains(normalize-space(.), \"x\") and position() >= 2.5]").expect("ok");
        assert!(tokens.contains(&Token::Name("normalize-space".into())));
        assert!(tokens.contains(&Token::Literal("x".into())));
        assert!(tokens.contains(&Token::Ge));
        assert!(tokens.contains(&Token::Number(2.5)));
        assert_eq!(tokens[0], Token::Star);
    }

    #[test]
    fn test_tokenize_axes_and_dots() {
        let tokens = tokenize("../following-sibling::p/.").expect("ok");
        assert_eq!(
            tokens,
            vec![
                Token::DotDot,
                Token::Slash,
                Token::Name("following-sibling".into()),
                Token::DoubleColon,
                Token::Name("p".into()),
                Token::Slash,
                Token::Dot,
            ]
        );
    }

    #[test]
    fn test_tokenize_qname() {
        let tokens = tokenize("svg:rect").expect("ok");
        assert_eq!(tokens, vec![Token::Name("svg:rect".into())]);
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize("//a[@x='unterminated]").is_err());
        assert!(tokenize("//a ! b").is_err());
        assert!(tokenize("#").is_err());
    }
}
