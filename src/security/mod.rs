//! SQL admission control: lexing and statement validation.

pub mod lexer;
pub mod tables;
pub mod validator;

pub use lexer::{LexError, Span, Token, TokenKind};
pub use validator::{AcceptedStatement, RejectReason, StatementValidator, ValidationVerdict};
