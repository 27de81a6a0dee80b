// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    Generic,
    InvalidArgument,
    DoesNotExist,
    DuplicateName,
    BadName,
    BadDimensionRef,
    NotAContainer,
    EmptyCompound,
    ShapeOverflow,
    IndexOutOfRange,
    TypeMismatch,
    ShapeMismatch,
    ExpectedDataset,
    MissingNode,
    IllegalState,
    ReadFailure,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            Generic => "generic",
            InvalidArgument => "invalid_argument",
            DoesNotExist => "does_not_exist",
            DuplicateName => "duplicate_name",
            BadName => "bad_name",
            BadDimensionRef => "bad_dimension_ref",
            NotAContainer => "not_a_container",
            EmptyCompound => "empty_compound",
            ShapeOverflow => "shape_overflow",
            IndexOutOfRange => "index_out_of_range",
            TypeMismatch => "type_mismatch",
            ShapeMismatch => "shape_mismatch",
            ExpectedDataset => "expected_dataset",
            MissingNode => "missing_node",
            IllegalState => "illegal_state",
            ReadFailure => "read_failure",
        };

        write!(f, "{name}")
    }
}

/// Broad error class; callers usually match on this and only look at
/// the code for diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller passed an argument outside an operation's domain.
    Argument,
    /// The schema itself is malformed.
    Config,
    /// Data disagrees with its schema, or a position is out of range.
    Data,
    /// An operation was invoked in the wrong compiler state.
    State,
    /// The data source failed to produce a value.
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    /// Fully qualified name of the offending node, when known.
    pub path: Option<String>,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            path: None,
            details,
        }
    }

    /// Wraps a failure reported by a data source.
    pub fn io<E: fmt::Display>(err: E) -> Self {
        Error::new(
            ErrorKind::Io,
            ErrorCode::ReadFailure,
            Some(err.to_string()),
        )
    }

    /// Attaches the path of the node being processed. The innermost path
    /// is kept, so outer frames can call this unconditionally.
    pub fn at(mut self, path: &str) -> Self {
        if self.path.is_none() {
            self.path = Some(path.to_owned());
        }
        self
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Data => "DataError",
            ErrorKind::State => "StateError",
            ErrorKind::Io => "IoError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details)?,
            None => write!(f, "{}{{{}}}", kind, self.code)?,
        }
        if let Some(ref path) = self.path {
            write!(f, " at {path}")?;
        }
        Ok(())
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! arg_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Argument, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Argument, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! config_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Config, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Config, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! data_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Data, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Data, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! state_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::State, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::State, ErrorCode::$code, None))
    }};
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Data,
        ErrorCode::IndexOutOfRange,
        Some("row 3".to_string()),
    );
    assert_eq!("DataError{index_out_of_range: row 3}", format!("{err}"));

    let err = err.at("/seq");
    assert_eq!("DataError{index_out_of_range: row 3} at /seq", format!("{err}"));

    let err = Error::new(ErrorKind::State, ErrorCode::IllegalState, None);
    assert_eq!("StateError{illegal_state}", format!("{err}"));
}

#[test]
fn test_error_innermost_path_wins() {
    let err = Error::new(ErrorKind::Data, ErrorCode::TypeMismatch, None)
        .at("/s.x")
        .at("/s");
    assert_eq!(Some("/s.x".to_string()), err.path);
}

#[test]
fn test_io_wrapping() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
    let err: Error = io.into();
    assert_eq!(ErrorKind::Io, err.kind);
    assert_eq!(ErrorCode::ReadFailure, err.code);
    assert!(err.get_details().unwrap().contains("timed out"));
}

#[test]
fn test_err_macros() {
    fn fails() -> Result<()> {
        data_err!(ShapeMismatch, "3 != 4".to_string())
    }
    let err = fails().unwrap_err();
    assert_eq!(ErrorKind::Data, err.kind);
    assert_eq!(ErrorCode::ShapeMismatch, err.code);

    fn fails_bare() -> Result<()> {
        state_err!(IllegalState)
    }
    assert_eq!(ErrorKind::State, fails_bare().unwrap_err().kind);
}
