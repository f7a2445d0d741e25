//! Error and result types for the `graphfuzz` crate.
//!
//! Failures of the algorithms under test are *not* represented here: those
//! are ordinary values ([`ExecError`][crate::ExecError]) that the fuzzer
//! inspects and records. This module covers errors in the fuzzer itself:
//! mutator exhaustion, configuration mistakes and artifact I/O.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// A result that is either `Ok(T)` or `Err(graphfuzz::Error)`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An extension trait for [`graphfuzz::Result`][crate::Result] that provides
/// additional methods.
pub trait ResultExt {
    /// Ignores the error if it is [`Exhausted`][ErrorKind::Exhausted],
    /// returning `Ok(())` instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use graphfuzz::{Error, Result, ResultExt};
    ///
    /// let result: Result<()> = Err(Error::exhausted());
    /// let result = result.ignore_exhausted();
    /// assert!(result.is_ok());
    /// ```
    fn ignore_exhausted(self) -> Result<()>;
}

impl<T> ResultExt for Result<T> {
    #[inline]
    fn ignore_exhausted(self) -> Result<()> {
        match self {
            Ok(_) => Ok(()),
            Err(err) if err.is_exhausted() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

enum ErrorInner {
    Kind(Box<ErrorKind>),

    /// For internal usage only: break out of the candidate enumeration once
    /// the chosen mutation has been applied. Kept out of `ErrorKind` so that
    /// it never allocates.
    EarlyExit,
}

/// An error that can occur when using the `graphfuzz` crate.
///
/// This type is a thin wrapper around [`ErrorKind`], which contains the
/// specific kind of error that occurred.
///
/// # Examples
///
/// ```
/// use graphfuzz::{Error, ErrorKind};
///
/// let error = Error::config("unknown feedback kind `foo`");
/// assert!(error.is_config());
///
/// match error.kind() {
///     ErrorKind::Config(msg) => println!("bad configuration: {msg}"),
///     ErrorKind::Exhausted => println!("exhausted!"),
///
///     // The `ErrorKind` type is not exhaustive, so we always need a catch-all arm.
///     unknown => println!("unknown! {unknown:?}"),
/// }
/// ```
pub struct Error {
    inner: ErrorInner,
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self {
            inner: ErrorInner::Kind(Box::new(kind)),
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(err).into()
    }
}

impl From<serde_json::Error> for Error {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        ErrorKind::Serialization(err).into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ErrorInner::Kind(kind) => match &**kind {
                ErrorKind::Exhausted => write!(f, "the mutator is exhausted"),
                ErrorKind::EmptyCorpus => write!(f, "the corpus is empty"),
                ErrorKind::Config(msg) => write!(f, "invalid configuration: {msg}"),
                ErrorKind::Io(err) => write!(f, "i/o error: {err}"),
                ErrorKind::Serialization(err) => write!(f, "serialization error: {err}"),
                ErrorKind::CorruptArtifact { path, msg } => {
                    write!(f, "corrupted artifact `{}`: {msg}", path.display())
                }
                ErrorKind::Other(msg) => write!(f, "an unknown error occurred: {msg}"),
            },
            ErrorInner::EarlyExit => {
                write!(f, "internal error variant: early exit from mutation loop")
            }
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.inner {
            ErrorInner::Kind(kind) => match &**kind {
                ErrorKind::Io(err) => Some(err),
                ErrorKind::Serialization(err) => Some(err),
                _ => None,
            },
            ErrorInner::EarlyExit => None,
        }
    }
}

impl Error {
    #[inline]
    pub(crate) fn early_exit() -> Self {
        Self {
            inner: ErrorInner::EarlyExit,
        }
    }

    #[inline]
    pub(crate) fn is_early_exit(&self) -> bool {
        matches!(self.inner, ErrorInner::EarlyExit)
    }

    /// Returns a new error indicating that the mutator is exhausted.
    #[must_use]
    pub fn exhausted() -> Self {
        ErrorKind::Exhausted.into()
    }

    /// Returns a new error indicating that a graph was requested from an
    /// empty corpus.
    #[must_use]
    pub fn empty_corpus() -> Self {
        ErrorKind::EmptyCorpus.into()
    }

    /// Returns a new configuration error with the given message.
    #[must_use]
    pub fn config(msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::Config(msg.into()).into()
    }

    /// Returns a new error for an on-disk artifact that could not be parsed.
    #[must_use]
    pub fn corrupt_artifact(path: impl Into<PathBuf>, msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::CorruptArtifact {
            path: path.into(),
            msg: msg.into(),
        }
        .into()
    }

    /// Returns a new error with the given message.
    #[must_use]
    pub fn other(msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::Other(msg.into()).into()
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        match &self.inner {
            ErrorInner::Kind(kind) => kind,
            ErrorInner::EarlyExit => unreachable!(),
        }
    }

    /// Returns `true` if the error's kind is
    /// [`Exhausted`][ErrorKind::Exhausted].
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind(), ErrorKind::Exhausted)
    }

    /// Returns `true` if the error's kind is
    /// [`EmptyCorpus`][ErrorKind::EmptyCorpus].
    #[must_use]
    pub fn is_empty_corpus(&self) -> bool {
        matches!(self.kind(), ErrorKind::EmptyCorpus)
    }

    /// Returns `true` if the error's kind is [`Config`][ErrorKind::Config].
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config(_))
    }

    /// Returns `true` if the error's kind is
    /// [`CorruptArtifact`][ErrorKind::CorruptArtifact].
    #[must_use]
    pub fn is_corrupt_artifact(&self) -> bool {
        matches!(self.kind(), ErrorKind::CorruptArtifact { .. })
    }
}

/// The kind of an error that can occur when using the `graphfuzz` crate.
///
/// This enum is not exhaustive, and new variants may be added in the future.
/// When matching on this enum, a catch-all arm should be used to handle any
/// new variants that are added.
#[non_exhaustive]
#[derive(Debug)]
pub enum ErrorKind {
    /// The mutator has no applicable mutation for the given value.
    Exhausted,

    /// A graph was requested from a corpus that holds none.
    EmptyCorpus,

    /// The fuzzer was configured with invalid or inconsistent options.
    Config(ErrorMessage),

    /// Reading or writing an artifact failed.
    Io(io::Error),

    /// An artifact could not be serialized or deserialized.
    Serialization(serde_json::Error),

    /// An artifact on disk is corrupted in a way that cannot be recovered
    /// from without losing already-recorded results.
    CorruptArtifact {
        /// The corrupted file.
        path: PathBuf,
        /// What was wrong with it.
        msg: ErrorMessage,
    },

    /// Some other error occurred.
    Other(ErrorMessage),
}

impl From<Error> for ErrorKind {
    #[inline]
    fn from(err: Error) -> Self {
        match err.inner {
            ErrorInner::Kind(kind) => *kind,
            ErrorInner::EarlyExit => unreachable!(),
        }
    }
}

/// A message that can be attached to an error.
///
/// # Examples
///
/// ```
/// use graphfuzz::ErrorMessage;
///
/// let msg = ErrorMessage::new("something went wrong");
/// assert_eq!(msg.as_str(), "something went wrong");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    inner: Cow<'static, str>,
}

impl ErrorMessage {
    /// Returns a new error message with the given string.
    #[must_use]
    pub fn new(msg: impl Into<ErrorMessage>) -> Self {
        msg.into()
    }

    /// Returns the message as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for ErrorMessage {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self {
            inner: Cow::Borrowed(s),
        }
    }
}

impl From<String> for ErrorMessage {
    #[inline]
    fn from(s: String) -> Self {
        Self {
            inner: Cow::Owned(s),
        }
    }
}
