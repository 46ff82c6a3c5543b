//! Tokenizing LS-8 program text.
//! 
//! This module holds the tokens that characterize an `.ls8` program file ([`Token`]).
//! This module is used by the loader to facilitate the conversion of
//! program text into a [`Program`](super::Program).
//! 
//! An `.ls8` file consists of one binary byte literal per line,
//! each optionally followed by a `#` comment. For example:
//! 
//! ```text
//! # print8.ls8
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

/// A unit of information in LS-8 program text.
#[derive(Debug, Logos, PartialEq, Eq)]
#[logos(skip r"[ \t\f]+", error = LexErr)]
pub enum Token {
    // This spans over tokens that are technically invalid (e.g., 0102 or 1x1).
    // The callback then decides why it is invalid.

    /// A binary byte literal (e.g., `10000010`).
    #[regex(r"[0-9A-Za-z_]+", lex_binary)]
    Byte(u8),

    /// A comment, which starts with a `#` and spans the remaining part of the line.
    #[regex(r"#[^\r\n]*")]
    Comment,

    /// A new line
    #[regex(r"\r?\n")]
    NewLine
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// Binary literal cannot fit within the range of a u8
    DoesNotFitU8,
    /// Literal could not be parsed as binary because it has invalid digits (i.e., not 0 or 1)
    InvalidBinary,
    /// Int parsing failed but the reason why is unknown
    UnknownIntErr,
    /// A symbol was used which is not allowed in LS-8 program files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::DoesNotFitU8  => f.write_str("binary literal does not fit 8-bit unsigned integer"),
            LexErr::InvalidBinary => f.write_str("invalid binary literal"),
            LexErr::UnknownIntErr => f.write_str("could not parse integer"),
            LexErr::InvalidSymbol => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::DoesNotFitU8  => Some(format!("the range for an 8-bit unsigned integer is [{}, {}]", u8::MIN, u8::MAX).into()),
            LexErr::InvalidBinary => Some("a binary literal only consists of digits 0 and 1".into()),
            LexErr::UnknownIntErr => None,
            LexErr::InvalidSymbol => Some("comments must start with '#'".into()),
        }
    }
}

fn lex_binary(lx: &Lexer<'_, Token>) -> Result<u8, LexErr> {
    u8::from_str_radix(lx.slice(), 2)
        .map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => LexErr::DoesNotFitU8,
            IntErrorKind::InvalidDigit => LexErr::InvalidBinary,
            _ => LexErr::UnknownIntErr,
        })
}
