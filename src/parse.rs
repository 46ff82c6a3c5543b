//! Loading LS-8 programs.
//!
//! This module is used to convert `.ls8` program text into a [`Program`],
//! a validated memory image which can be loaded into the [`Simulator`].
//!
//! This module consists of:
//! - [`parse_program`]: Parses program text.
//! - [`load_file`]: Reads and parses a program file.
//! - [`lex`]: The tokenizer for program text.
//!
//! A program file holds one binary byte per line, optionally followed by a `#` comment.
//! Blank lines and comment-only lines are skipped.
//!
//! ```
//! use ls8_ensemble::parse::parse_program;
//!
//! let program = parse_program("
//!     ## mult.ls8
//!     10000010 # LDI R0,8
//!     00000000
//!     00001000
//! ").unwrap();
//! assert_eq!(program.as_bytes(), &[0b1000_0010, 0, 8]);
//! ```
//!
//! [`Simulator`]: crate::sim::Simulator
pub mod lex;

use std::ops::Range;
use std::path::Path;

use logos::Logos;

use crate::sim::mem::MEM_SIZE;
use lex::{LexErr, Token};

/// A program that can be loaded into the simulator.
///
/// This is a memory image which is placed starting at address 0.
/// It is guaranteed to fit in the machine's memory.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Program {
    bytes: Vec<u8>
}
impl Program {
    /// Creates a new program from a memory image,
    /// erroring if the image does not fit in memory.
    pub fn new(bytes: Vec<u8>) -> Result<Self, LoadErr> {
        match bytes.len() <= MEM_SIZE {
            true  => Ok(Self { bytes }),
            false => Err(LoadErr::new(LoadErrKind::ProgramTooLarge, None)),
        }
    }

    /// The bytes of this program.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of bytes in this program.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether this program is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Kinds of errors that can occur while loading a program.
#[derive(Debug)]
pub enum LoadErrKind {
    /// The program file could not be read.
    Io(std::io::Error),
    /// A line could not be tokenized.
    Lex(LexErr),
    /// A line held more than one byte literal.
    ExtraToken,
    /// The program holds more bytes than fit in memory.
    ProgramTooLarge,
}
impl std::fmt::Display for LoadErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadErrKind::Io(e)           => write!(f, "could not read program file: {e}"),
            LoadErrKind::Lex(e)          => e.fmt(f),
            LoadErrKind::ExtraToken      => f.write_str("unexpected token after byte literal"),
            LoadErrKind::ProgramTooLarge => write!(f, "program does not fit in {MEM_SIZE} bytes of memory"),
        }
    }
}

/// Error from loading a program.
///
/// Errors raised from program text also hold the line and span they occurred at.
#[derive(Debug)]
pub struct LoadErr {
    /// The kind of error.
    pub kind: LoadErrKind,
    /// The line (1-indexed) and the span in the source associated with this error (if it exists).
    pub pos: Option<(usize, Range<usize>)>
}
impl LoadErr {
    /// Creates a new [`LoadErr`].
    pub fn new(kind: LoadErrKind, pos: Option<(usize, Range<usize>)>) -> Self {
        LoadErr { kind, pos }
    }

    /// The line (1-indexed) this error occurred on, if it occurred in program text.
    pub fn line(&self) -> Option<usize> {
        self.pos.as_ref().map(|(line, _)| *line)
    }
}
impl std::fmt::Display for LoadErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line() {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => self.kind.fmt(f),
        }
    }
}
impl std::error::Error for LoadErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            LoadErrKind::Io(e)  => Some(e),
            LoadErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for LoadErr {
    fn span(&self) -> Option<crate::err::ErrSpan> {
        self.pos.as_ref().map(|(_, span)| span.clone())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            LoadErrKind::Io(_)           => Some("check that the path exists and is readable".into()),
            LoadErrKind::Lex(e)          => e.help(),
            LoadErrKind::ExtraToken      => Some("each line holds exactly one byte; move this to its own line or comment it out with '#'".into()),
            LoadErrKind::ProgramTooLarge => Some(format!("programs are limited to {MEM_SIZE} bytes").into()),
        }
    }
}

/// Parses program text into a [`Program`].
///
/// Each non-blank, non-comment line must hold exactly one binary byte literal.
/// Any error aborts the whole load.
pub fn parse_program(src: &str) -> Result<Program, LoadErr> {
    let mut bytes = Vec::with_capacity(MEM_SIZE);
    let mut line = 1;
    let mut line_has_byte = false;

    let mut lexer = Token::lexer(src);
    while let Some(result) = lexer.next() {
        let err = |kind| LoadErr::new(kind, Some((line, lexer.span())));

        match result {
            Ok(Token::Byte(_)) if line_has_byte => return Err(err(LoadErrKind::ExtraToken)),
            Ok(Token::Byte(_)) if bytes.len() >= MEM_SIZE => return Err(err(LoadErrKind::ProgramTooLarge)),
            Ok(Token::Byte(byte)) => {
                bytes.push(byte);
                line_has_byte = true;
            },
            Ok(Token::Comment) => {},
            Ok(Token::NewLine) => {
                line += 1;
                line_has_byte = false;
            },
            Err(e) => return Err(err(LoadErrKind::Lex(e))),
        }
    }

    log::debug!("parsed program with {} bytes over {line} lines", bytes.len());
    Ok(Program { bytes })
}

/// Reads a program file and parses it into a [`Program`].
pub fn load_file(path: impl AsRef<Path>) -> Result<Program, LoadErr> {
    let path = path.as_ref();
    log::debug!("loading program from {}", path.display());

    let src = std::fs::read_to_string(path)
        .map_err(|e| LoadErr::new(LoadErrKind::Io(e), None))?;
    parse_program(&src)
}
