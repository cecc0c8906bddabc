//! Hand-written lexer for the script language (external collaborator).
//!
//! Grounded in `original_source/src/examples/script.cpp`'s token set —
//! keywords, multi-character comparison/logical operators, string literals
//! with `\n`/`\t`/`\\`/`\"` escapes, and `#`-to-end-of-line comments — which
//! is considerably richer than the single-token-per-char lexer in
//! `original_source/src/lexer.cpp` (kept there only for the toy grammar
//! used by the legacy LL(1)/SLR(1) tools).

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Real(f64),
    Str(String),
    Ident(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semi,
    Comma,
    Assign,
    Lt,
    Gt,
    Leq,
    Geq,
    Eq,
    Neq,
    AndAnd,
    OrOr,
    Bang,

    KwIf,
    KwElse,
    KwLoop,
    KwFunc,
    KwExtern,
    KwReturn,
    KwBreak,
    KwContinue,

    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    let mut line = 1u32;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            let mut is_real = false;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
                is_real = true;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let kind = if is_real {
                TokenKind::Real(text.parse().map_err(|_| lex_err(line, "invalid real literal"))?)
            } else {
                TokenKind::Int(text.parse().map_err(|_| lex_err(line, "invalid int literal"))?)
            };
            tokens.push(Token { kind, line });
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let kind = match text.as_str() {
                "if" => TokenKind::KwIf,
                "else" => TokenKind::KwElse,
                "loop" => TokenKind::KwLoop,
                "func" => TokenKind::KwFunc,
                "extern" => TokenKind::KwExtern,
                "return" => TokenKind::KwReturn,
                "break" => TokenKind::KwBreak,
                "continue" => TokenKind::KwContinue,
                _ => TokenKind::Ident(text),
            };
            tokens.push(Token { kind, line });
            continue;
        }
        if c == '"' {
            i += 1;
            let mut s = String::new();
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    i += 1;
                    s.push(match chars[i] {
                        'n' => '\n',
                        't' => '\t',
                        '\\' => '\\',
                        '"' => '"',
                        other => other,
                    });
                } else {
                    s.push(chars[i]);
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(lex_err(line, "unterminated string literal"));
            }
            i += 1; // closing quote
            tokens.push(Token { kind: TokenKind::Str(s), line });
            continue;
        }

        macro_rules! two_char {
            ($second:expr, $two:expr, $one:expr) => {{
                if i + 1 < chars.len() && chars[i + 1] == $second {
                    i += 2;
                    $two
                } else {
                    i += 1;
                    $one
                }
            }};
        }

        let kind = match c {
            '+' => { i += 1; TokenKind::Plus }
            '-' => { i += 1; TokenKind::Minus }
            '*' => { i += 1; TokenKind::Star }
            '/' => { i += 1; TokenKind::Slash }
            '%' => { i += 1; TokenKind::Percent }
            '^' => { i += 1; TokenKind::Caret }
            '(' => { i += 1; TokenKind::LParen }
            ')' => { i += 1; TokenKind::RParen }
            '{' => { i += 1; TokenKind::LBrace }
            '}' => { i += 1; TokenKind::RBrace }
            ';' => { i += 1; TokenKind::Semi }
            ',' => { i += 1; TokenKind::Comma }
            '<' => two_char!('=', TokenKind::Leq, TokenKind::Lt),
            '>' => two_char!('=', TokenKind::Geq, TokenKind::Gt),
            '=' => two_char!('=', TokenKind::Eq, TokenKind::Assign),
            '!' => two_char!('=', TokenKind::Neq, TokenKind::Bang),
            '&' => {
                if i + 1 < chars.len() && chars[i + 1] == '&' {
                    i += 2;
                    TokenKind::AndAnd
                } else {
                    return Err(lex_err(line, "unexpected character '&'"));
                }
            }
            '|' => {
                if i + 1 < chars.len() && chars[i + 1] == '|' {
                    i += 2;
                    TokenKind::OrOr
                } else {
                    return Err(lex_err(line, "unexpected character '|'"));
                }
            }
            other => return Err(lex_err(line, &format!("unexpected character '{other}'"))),
        };
        tokens.push(Token { kind, line });
    }

    tokens.push(Token { kind: TokenKind::End, line });
    Ok(tokens)
}

fn lex_err(line: u32, message: &str) -> Error {
    Error::Lexer { line, message: message.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_arithmetic_expression() {
        let toks = tokenize("(2*3 + (5+4) * (1+2)) * 5+12").unwrap();
        assert_eq!(toks.first().unwrap().kind, TokenKind::LParen);
        assert_eq!(toks.last().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn recognizes_keywords_and_comments() {
        let toks = tokenize("# comment\nif (a < 5) { loop(a<1){continue;} }").unwrap();
        assert!(toks.iter().any(|t| t.kind == TokenKind::KwIf));
        assert!(toks.iter().any(|t| t.kind == TokenKind::KwLoop));
        assert!(toks.iter().any(|t| t.kind == TokenKind::KwContinue));
    }

    #[test]
    fn parses_string_literal_escapes() {
        let toks = tokenize("\"a\\nb\"").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Str("a\nb".to_string()));
    }
}
