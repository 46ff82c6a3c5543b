//! Error interface for this crate.
//!
//! Every error type of this crate implements [`Error`],
//! which extends [`std::error::Error`] with additional diagnostic information.
//!
//! This module also re-exports every error type in the crate:
//! - [`LexErr`]: errors from tokenizing program text
//! - [`LoadErr`]: errors from loading a program
//! - [`SimErr`]: errors from executing a program
use std::borrow::Cow;
use std::ops::Range;

pub use crate::parse::lex::LexErr;
pub use crate::parse::{LoadErr, LoadErrKind};
pub use crate::sim::SimErr;

/// A span in program text.
pub type ErrSpan = Range<usize>;

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// The range where this error occurs in source.
    ///
    /// If this is not known, this can be set to `None`.
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A simple message explaining how to resolve this error (if one exists).
    fn help(&self) -> Option<Cow<str>>;
}
