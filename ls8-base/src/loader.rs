//! Program text loader.
//!
//! A program is written one byte per line as an 8-bit binary literal. Anything
//! after `#` is a comment, and blank or comment-only lines are skipped.
//!
//! # Examples
//!
//! ```
//! # use ls8_base::loader::{Loader, LoaderError};
//! let source = "
//! ## print8
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ";
//! let bytes: Result<Vec<u8>, LoaderError> = Loader::new(source)
//!     .into_iter() // -> LoaderIter
//!     .collect();
//!
//! assert_eq!(bytes.unwrap(), &[0x82, 0x00, 0x08, 0x47, 0x00, 0x01]);
//! ```

use alloc::vec::Vec;
use core::str::Lines;
use thiserror::Error;

/// Basic line loader. Can be turned into iterator using [`Loader::into_iter`].
pub struct Loader<'a> {
    lines: Lines<'a>,
    line: usize,
}

impl<'a> Loader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line: 0,
        }
    }

    fn parse_literal(&self, literal: &str) -> Result<u8, LoaderError> {
        if !literal.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(LoaderError {
                kind: LoaderErrorKind::InvalidDigit,
                line: self.line,
            });
        }
        u8::from_str_radix(literal, 2).map_err(|_| LoaderError {
            kind: LoaderErrorKind::Overflow,
            line: self.line,
        })
    }

    /// Parses and returns next instruction byte, or [`None`] at the end of text.
    pub fn next_byte(&mut self) -> Option<Result<u8, LoaderError>> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;

            let literal = raw.split('#').next().unwrap_or_default().trim();
            if literal.is_empty() {
                continue;
            }

            return Some(self.parse_literal(literal));
        }
    }
}

impl<'a> IntoIterator for Loader<'a> {
    type IntoIter = LoaderIter<'a>;
    type Item = <Self::IntoIter as Iterator>::Item;

    fn into_iter(self) -> Self::IntoIter {
        LoaderIter(self)
    }
}

/// Iterator wrapper over [`Loader`].
pub struct LoaderIter<'a>(Loader<'a>);

impl<'a> Iterator for LoaderIter<'a> {
    type Item = Result<u8, LoaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_byte()
    }
}

/// Collects a whole program text into bytes.
pub fn load_program(source: &str) -> Result<Vec<u8>, LoaderError> {
    Loader::new(source).into_iter().collect()
}

/// Represents error that may occur while loading program text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} at line {line}")]
pub struct LoaderError {
    pub kind: LoaderErrorKind,
    /// 1-based line number.
    pub line: usize,
}

/// Represents a error kind that may occur while loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LoaderErrorKind {
    #[error("expected binary literal")]
    InvalidDigit,
    #[error("literal does not fit into 8 bits")]
    Overflow,
}
