//! Tokenizer for the expression language

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Question,
    Colon,
    Semicolon,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source
    pub position: usize,
}

/// Longest spellings first so `===` wins over `==`
const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("===", TokenKind::EqualEqualEqual),
    ("!==", TokenKind::BangEqualEqual),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::BangEqual),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (".", TokenKind::Dot),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    ("!", TokenKind::Bang),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
];

pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if c.is_ascii_digit() {
            let mut end = pos;
            let mut seen_dot = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || (d == '.' && !seen_dot) {
                    seen_dot |= d == '.';
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[pos..end];
            let value = text.parse::<f64>().map_err(|_| ExpressionError::Syntax {
                position: pos,
                message: format!("invalid number '{}'", text),
            })?;
            TokenKind::Number(value)
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut end = pos;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' || d == '$' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            TokenKind::Ident(source[pos..end].to_string())
        } else if c == '\'' || c == '"' {
            chars.next();
            TokenKind::Str(read_string(&mut chars, c, pos)?)
        } else {
            let rest = &source[pos..];
            let (text, kind) = PUNCTUATION
                .iter()
                .find(|(text, _)| rest.starts_with(text))
                .ok_or(ExpressionError::UnexpectedCharacter {
                    found: c,
                    position: pos,
                })?;
            // Punctuation is ASCII, so one char per byte
            for _ in 0..text.len() {
                chars.next();
            }
            kind.clone()
        };

        tokens.push(Token { kind, position: pos });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: source.len(),
    });
    Ok(tokens)
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, ExpressionError> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(out),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            other => out.push(other),
        }
    }
    Err(ExpressionError::UnterminatedString(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a === b !== c && d || !e <= 1"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqualEqualEqual,
                TokenKind::Ident("b".into()),
                TokenKind::BangEqualEqual,
                TokenKind::Ident("c".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("d".into()),
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Ident("e".into()),
                TokenKind::LessEqual,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_numbers() {
        assert_eq!(
            kinds(r#"'it\'s' "two" 3.25"#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("two".into()),
                TokenKind::Number(3.25),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_rejects_assignment_and_braces() {
        assert!(matches!(
            tokenize("a = 1"),
            Err(ExpressionError::UnexpectedCharacter { found: '=', .. })
        ));
        assert!(matches!(
            tokenize("{}"),
            Err(ExpressionError::UnexpectedCharacter { found: '{', .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(tokenize("'abc"), Err(ExpressionError::UnterminatedString(0)));
    }
}
