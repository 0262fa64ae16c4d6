//! Tokenizer for the query language.

use crate::error::WashError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare or quoted identifier. Keywords are identifiers matched case-insensitively.
    Ident { text: String, quoted: bool },
    Int(i64),
    Float(f64),
    Str(String),
    Comma,
    LParen,
    RParen,
    Star,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Semicolon,
}

impl Token {
    /// True when this is the unquoted keyword `kw`.
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Ident { text, quoted: false } if text.eq_ignore_ascii_case(kw))
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, WashError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Le);
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Ne);
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' => {
                let (text, next) = read_quoted(&chars, i, '\'')?;
                tokens.push(Token::Str(text));
                i = next;
            }
            '"' | '`' => {
                let (text, next) = read_quoted(&chars, i, c)?;
                tokens.push(Token::Ident { text, quoted: true });
                i = next;
            }
            c if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(number(&text)?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident {
                    text: chars[start..i].iter().collect(),
                    quoted: false,
                });
            }
            other => {
                return Err(WashError::query(format!(
                    "unexpected character '{other}' at position {i}"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted run starting at `start`; a doubled quote escapes itself.
fn read_quoted(chars: &[char], start: usize, quote: char) -> Result<(String, usize), WashError> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                text.push(quote);
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }
    Err(WashError::query(format!(
        "unterminated {quote}-quoted text starting at position {start}"
    )))
}

fn number(text: &str) -> Result<Token, WashError> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Token::Int(i));
    }
    text.parse::<f64>()
        .map(Token::Float)
        .map_err(|_| WashError::query(format!("invalid number '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str) -> Token {
        Token::Ident {
            text: text.into(),
            quoted: false,
        }
    }

    #[test]
    fn test_tokenize_select() {
        let tokens = tokenize("SELECT dept, AVG(salary) FROM emp WHERE salary >= 4.5e4").unwrap();
        assert_eq!(
            tokens,
            vec![
                ident("SELECT"),
                ident("dept"),
                Token::Comma,
                ident("AVG"),
                Token::LParen,
                ident("salary"),
                Token::RParen,
                ident("FROM"),
                ident("emp"),
                ident("WHERE"),
                ident("salary"),
                Token::Ge,
                Token::Float(45000.0),
            ]
        );
        assert!(tokens[0].is_keyword("select"));
    }

    #[test]
    fn test_quotes_and_operators() {
        let tokens = tokenize("`my col` <> 'it''s' != <= <").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident {
                    text: "my col".into(),
                    quoted: true
                },
                Token::Ne,
                Token::Str("it's".into()),
                Token::Ne,
                Token::Le,
                Token::Lt,
            ]
        );
        assert!(!tokens[0].is_keyword("my col"));
    }

    #[test]
    fn test_errors() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a # b").is_err());
        assert!(tokenize("1.2.3").is_err());
    }
}
