//! Accumulated diagnostics for preflight, execute and import
//!
//! Provides:
//! - [`Error`]: classified failure with a numeric code
//! - [`Warning`]: advisory message that never blocks
//! - [`Report<T>`]: a value or a list of errors, plus warnings either way

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use strata_data::DataError;

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Path missing, name collision, tuple or type mismatch
    Structural,
    /// Argument binding or validation
    Argument,
    /// Raised by an execute body
    Execution,
    /// Legacy argument import
    Import,
    /// Lifecycle misuse (illegal state transition)
    State,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Structural => "structural",
            Self::Argument => "argument",
            Self::Execution => "execution",
            Self::Import => "import",
            Self::State => "state",
        };
        f.write_str(s)
    }
}

/// One failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error {code}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub code: i32,
    pub message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn structural(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural, code, message)
    }

    #[must_use]
    pub fn argument(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, code, message)
    }

    #[must_use]
    pub fn execution(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, code, message)
    }

    #[must_use]
    pub fn import(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Import, code, message)
    }

    #[must_use]
    pub fn state(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, code, message)
    }
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        Self::structural(err.code(), err.to_string())
    }
}

/// Advisory message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: i32,
    pub message: String,
}

impl Warning {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "warning {}: {}", self.code, self.message)
    }
}

/// Value-or-errors with warnings preserved across every conversion
///
/// A report is *valid* when it holds a value. Pushing an error into a valid
/// report drops the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report<T = ()> {
    outcome: Result<T, Vec<Error>>,
    warnings: Vec<Warning>,
}

impl Default for Report<()> {
    fn default() -> Self {
        Self::ok(())
    }
}

impl<T> Report<T> {
    /// Successful report
    #[inline]
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            outcome: Ok(value),
            warnings: Vec::new(),
        }
    }

    /// Failed report with a single error
    #[inline]
    #[must_use]
    pub fn fail(error: Error) -> Self {
        Self::fail_many(vec![error])
    }

    /// Failed report; an empty list still counts as failed
    #[inline]
    #[must_use]
    pub fn fail_many(errors: Vec<Error>) -> Self {
        Self {
            outcome: Err(errors),
            warnings: Vec::new(),
        }
    }

    /// Attach a warning (builder style)
    #[must_use]
    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Attach several warnings (builder style)
    #[must_use]
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = Warning>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Record an error, dropping any held value
    pub fn push_error(&mut self, error: Error) {
        match &mut self.outcome {
            Err(errors) => errors.push(error),
            Ok(_) => self.outcome = Err(vec![error]),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        match &self.outcome {
            Ok(_) => &[],
            Err(errors) => errors,
        }
    }

    #[inline]
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether any error carries `code`
    #[must_use]
    pub fn has_error_code(&self, code: i32) -> bool {
        self.errors().iter().any(|e| e.code == code)
    }

    /// Whether any warning carries `code`
    #[must_use]
    pub fn has_warning_code(&self, code: i32) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// Transform the value, keeping warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Report<U> {
        Report {
            outcome: self.outcome.map(f),
            warnings: self.warnings,
        }
    }

    /// Chain a fallible step; warnings of both sides are kept
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Report<U>) -> Report<U> {
        match self.outcome {
            Ok(value) => {
                let mut next = f(value);
                let mut warnings = self.warnings;
                warnings.append(&mut next.warnings);
                next.warnings = warnings;
                next
            }
            Err(errors) => Report {
                outcome: Err(errors),
                warnings: self.warnings,
            },
        }
    }

    /// Fold another report into this one
    ///
    /// Warnings are always taken. Errors of `other` are appended (making this
    /// report failed). Returns `other`'s value if it had one.
    pub fn absorb<U>(&mut self, other: Report<U>) -> Option<U> {
        self.warnings.extend(other.warnings);
        match other.outcome {
            Ok(value) => Some(value),
            Err(errors) => {
                match &mut self.outcome {
                    Err(existing) => existing.extend(errors),
                    Ok(_) => self.outcome = Err(errors),
                }
                None
            }
        }
    }

    /// Combine two reports; valid only when both are
    pub fn zip<U>(self, other: Report<U>) -> Report<(T, U)> {
        let mut warnings = self.warnings;
        warnings.extend(other.warnings);
        let outcome = match (self.outcome, other.outcome) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            (Err(mut a), Err(b)) => {
                a.extend(b);
                Err(a)
            }
            (Err(a), Ok(_)) | (Ok(_), Err(a)) => Err(a),
        };
        Report { outcome, warnings }
    }

    /// Drop the value, keeping errors and warnings
    pub fn discard(self) -> Report<()> {
        self.map(|_| ())
    }

    /// Standard result, dropping warnings
    ///
    /// # Errors
    /// The accumulated errors when the report is not valid.
    pub fn into_result(self) -> Result<T, Vec<Error>> {
        self.outcome
    }

    /// Outcome and warnings
    #[must_use]
    pub fn into_parts(self) -> (Result<T, Vec<Error>>, Vec<Warning>) {
        (self.outcome, self.warnings)
    }
}

impl<T> From<Result<T, Error>> for Report<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(error) => Self::fail(error),
        }
    }
}

impl<T> From<Result<T, DataError>> for Report<T> {
    fn from(result: Result<T, DataError>) -> Self {
        result.map_err(Error::from).into()
    }
}

impl<T> FromIterator<Report<T>> for Report<Vec<T>> {
    /// Valid only if every item is; errors and warnings of all items kept
    fn from_iter<I: IntoIterator<Item = Report<T>>>(iter: I) -> Self {
        let mut out = Report::ok(());
        let mut values = Vec::new();
        for item in iter {
            if let Some(v) = out.absorb(item) {
                values.push(v);
            }
        }
        out.map(|()| values)
    }
}

/// How an execute run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Finished,
    /// Cancellation was observed at a poll point
    Cancelled,
}
