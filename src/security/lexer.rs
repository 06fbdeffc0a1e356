//! Minimal SQL lexer.
//!
//! Classifies the candidate text into typed tokens so the validator and the
//! limit-bounding pass operate on token type rather than raw substrings.
//! Keyword-like text inside string literals, quoted identifiers, and comments
//! therefore never reaches the denylist. Comments are consumed outright and
//! produce no tokens.
//!
//! Tokens carry byte spans into the original text, which is what lets the
//! executor splice a rewritten `LIMIT` value in place.

use std::fmt;

/// Byte range of a token in the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Lexical class of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted word: identifier or keyword, original casing preserved.
    Word(String),
    /// `"double-quoted"` identifier, quotes stripped, `""` unescaped.
    QuotedIdent(String),
    /// `'single-quoted'` string literal, quotes stripped, `''` unescaped.
    StringLit(String),
    /// Numeric literal, verbatim.
    Number(String),
    /// Multi-character operator (`<=`, `::`, `||`, ...).
    Operator(String),
    /// Any other single character: parens, commas, arithmetic, ...
    Punct(char),
    /// Statement terminator (`;`).
    Terminator,
}

/// A single token with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// The uppercased text of a `Word` token, `None` for everything else.
    ///
    /// Quoted identifiers intentionally return `None`: `"drop"` is a column
    /// name, not the keyword.
    pub fn word_upper(&self) -> Option<String> {
        match &self.kind {
            TokenKind::Word(w) => Some(w.to_uppercase()),
            _ => None,
        }
    }

    /// Case-insensitive match against an unquoted word.
    pub fn is_word(&self, expected: &str) -> bool {
        match &self.kind {
            TokenKind::Word(w) => w.eq_ignore_ascii_case(expected),
            _ => false,
        }
    }

    /// Identifier text usable as a table reference: unquoted words
    /// lowercased, quoted identifiers verbatim.
    pub fn identifier_text(&self) -> Option<String> {
        match &self.kind {
            TokenKind::Word(w) => Some(w.to_lowercase()),
            TokenKind::QuotedIdent(q) => Some(q.clone()),
            _ => None,
        }
    }
}

/// Lexical failure: the input cannot be tokenized as SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnterminatedString { at: usize },
    UnterminatedQuotedIdentifier { at: usize },
    UnterminatedBlockComment { at: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString { at } => {
                write!(f, "unterminated string literal at byte {}", at)
            }
            Self::UnterminatedQuotedIdentifier { at } => {
                write!(f, "unterminated quoted identifier at byte {}", at)
            }
            Self::UnterminatedBlockComment { at } => {
                write!(f, "unterminated block comment at byte {}", at)
            }
        }
    }
}

/// Tokenize SQL text.
///
/// Handles `--` line comments, nested `/* */` block comments, `''` escapes
/// in string literals, and `""` escapes in quoted identifiers.
pub fn tokenize(sql: &str) -> Result<Vec<Token>, LexError> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}

            '-' if peek_char(bytes, start + 1) == Some('-') => {
                // Line comment runs to end of line.
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }

            '/' if peek_char(bytes, start + 1) == Some('*') => {
                chars.next(); // consume '*'
                let mut depth = 1u32;
                loop {
                    match chars.next() {
                        Some((i, '*')) if peek_char(bytes, i + 1) == Some('/') => {
                            chars.next();
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        Some((i, '/')) if peek_char(bytes, i + 1) == Some('*') => {
                            chars.next();
                            depth += 1;
                        }
                        Some(_) => {}
                        None => return Err(LexError::UnterminatedBlockComment { at: start }),
                    }
                }
            }

            '\'' => {
                let (text, end) = read_quoted(&mut chars, '\'')
                    .ok_or(LexError::UnterminatedString { at: start })?;
                tokens.push(Token {
                    kind: TokenKind::StringLit(text),
                    span: Span { start, end },
                });
            }

            '"' => {
                let (text, end) = read_quoted(&mut chars, '"')
                    .ok_or(LexError::UnterminatedQuotedIdentifier { at: start })?;
                tokens.push(Token {
                    kind: TokenKind::QuotedIdent(text),
                    span: Span { start, end },
                });
            }

            ';' => tokens.push(Token {
                kind: TokenKind::Terminator,
                span: Span {
                    start,
                    end: start + 1,
                },
            }),

            c if c.is_ascii_digit() => {
                let end = read_while(&mut chars, start + c.len_utf8(), |c| {
                    c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E'
                });
                tokens.push(Token {
                    kind: TokenKind::Number(sql[start..end].to_string()),
                    span: Span { start, end },
                });
            }

            c if c.is_alphabetic() || c == '_' => {
                let end = read_while(&mut chars, start + c.len_utf8(), |c| {
                    c.is_alphanumeric() || c == '_' || c == '$'
                });
                tokens.push(Token {
                    kind: TokenKind::Word(sql[start..end].to_string()),
                    span: Span { start, end },
                });
            }

            _ => {
                let two = peek_char(bytes, start + ch.len_utf8())
                    .map(|next| (ch, next))
                    .filter(|&(a, b)| {
                        matches!(
                            (a, b),
                            ('<', '=')
                                | ('>', '=')
                                | ('<', '>')
                                | ('!', '=')
                                | ('|', '|')
                                | (':', ':')
                        )
                    });
                match two {
                    Some((a, b)) => {
                        chars.next();
                        let end = start + a.len_utf8() + b.len_utf8();
                        tokens.push(Token {
                            kind: TokenKind::Operator(sql[start..end].to_string()),
                            span: Span { start, end },
                        });
                    }
                    None => tokens.push(Token {
                        kind: TokenKind::Punct(ch),
                        span: Span {
                            start,
                            end: start + ch.len_utf8(),
                        },
                    }),
                }
            }
        }
    }

    Ok(tokens)
}

/// Split a token stream into statements on top-level terminators.
///
/// Empty groups (e.g. after a trailing `;`) are discarded, so a single
/// statement with one trailing terminator yields exactly one group.
pub fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    let mut statements = Vec::new();
    let mut begin = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Terminator {
            if i > begin {
                statements.push(&tokens[begin..i]);
            }
            begin = i + 1;
        }
    }
    if begin < tokens.len() {
        statements.push(&tokens[begin..]);
    }
    statements
}

fn peek_char(bytes: &[u8], index: usize) -> Option<char> {
    // Caller only probes ASCII; a multibyte continuation byte compares unequal.
    bytes.get(index).map(|b| *b as char)
}

/// Consume a quoted region after its opening quote. Doubled quotes are
/// unescaped. Returns the inner text and the byte offset past the closing
/// quote, or `None` if the input ends first.
fn read_quoted(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
) -> Option<(String, usize)> {
    let mut text = String::new();
    loop {
        let (i, c) = chars.next()?;
        if c == quote {
            match chars.peek() {
                Some(&(_, next)) if next == quote => {
                    chars.next();
                    text.push(quote);
                }
                _ => return Some((text, i + quote.len_utf8())),
            }
        } else {
            text.push(c);
        }
    }
}

/// Advance while `pred` holds, returning the byte offset past the last
/// matching character.
fn read_while(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    mut end: usize,
    pred: impl Fn(char) -> bool,
) -> usize {
    while let Some(&(i, c)) = chars.peek() {
        if pred(c) {
            end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    end
}
