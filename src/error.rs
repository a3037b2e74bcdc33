//! API errors - explicit per-call failure values
//!
//! Every fallible operation returns `ApiResult<T>`. There is no ambient
//! error slot: the C surface turns an `ApiError` into the entry point's
//! documented sentinel and logs it.

use std::fmt;

/// Result alias used throughout the runtime
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure taxonomy of the object model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Allocator exhausted or request too large
    Allocation,
    /// Dynamic kind incompatible with the requested operation
    Type,
    /// Container index outside `0..len` or slot never set
    Index,
    /// Wrong number of positional/keyword arguments
    Arity,
    /// Value does not fit the native target
    Value,
    /// Caller broke an API contract (bad format, mismatched slot, null)
    Usage,
    /// Invoked native function reported failure
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    AllocationFailed { size: usize },
    TypeMismatch { expected: &'static str, found: &'static str },
    IndexOutOfRange { index: isize, len: isize },
    UninitializedSlot { index: isize },
    Arity { min: usize, max: usize, found: usize },
    MissingArgument { name: String },
    DuplicateArgument { name: String },
    UnknownKeyword { name: String },
    Overflow { target: &'static str },
    EmbeddedNul,
    InvalidUtf8,
    BadFormat { format: String, reason: String },
    SlotMismatch { position: usize, expected: char, found: char },
    NullReference,
    BadCallConvention { flags: i32 },
    CallFailed { name: String },
    UnknownMethod { name: String },
    TypeTagInUse { tag: u32 },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AllocationFailed { .. } => ErrorKind::Allocation,
            Self::TypeMismatch { .. } => ErrorKind::Type,
            Self::IndexOutOfRange { .. } | Self::UninitializedSlot { .. } => ErrorKind::Index,
            Self::Arity { .. }
            | Self::MissingArgument { .. }
            | Self::DuplicateArgument { .. }
            | Self::UnknownKeyword { .. } => ErrorKind::Arity,
            Self::Overflow { .. } | Self::EmbeddedNul | Self::InvalidUtf8 => ErrorKind::Value,
            Self::BadFormat { .. }
            | Self::SlotMismatch { .. }
            | Self::NullReference
            | Self::BadCallConvention { .. }
            | Self::UnknownMethod { .. }
            | Self::TypeTagInUse { .. } => ErrorKind::Usage,
            Self::CallFailed { .. } => ErrorKind::Call,
        }
    }

    pub(crate) fn bad_format(format: &str, reason: impl Into<String>) -> Self {
        Self::BadFormat {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { size } => {
                write!(f, "Allocation of {} bytes failed", size)
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for length {}", index, len)
            }
            Self::UninitializedSlot { index } => {
                write!(f, "Slot {} was never set", index)
            }
            Self::Arity { min, max, found } if min == max => {
                write!(f, "Expected {} arguments, got {}", min, found)
            }
            Self::Arity { min, max, found } => {
                write!(f, "Expected {} to {} arguments, got {}", min, max, found)
            }
            Self::MissingArgument { name } => {
                write!(f, "Missing required argument '{}'", name)
            }
            Self::DuplicateArgument { name } => {
                write!(f, "Argument '{}' given by name and position", name)
            }
            Self::UnknownKeyword { name } => {
                write!(f, "Unexpected keyword argument '{}'", name)
            }
            Self::Overflow { target } => {
                write!(f, "Value does not fit in {}", target)
            }
            Self::EmbeddedNul => write!(f, "String contains an embedded NUL byte"),
            Self::InvalidUtf8 => write!(f, "String is not valid UTF-8"),
            Self::BadFormat { format, reason } => {
                write!(f, "Bad format '{}': {}", format, reason)
            }
            Self::SlotMismatch { position, expected, found } => {
                write!(
                    f,
                    "Slot {} has code '{}' but format expects '{}'",
                    position, found, expected
                )
            }
            Self::NullReference => write!(f, "Null object reference"),
            Self::BadCallConvention { flags } => {
                write!(f, "Unsupported calling convention flags {:#x}", flags)
            }
            Self::CallFailed { name } => write!(f, "Function '{}' returned failure", name),
            Self::UnknownMethod { name } => write!(f, "No method named '{}'", name),
            Self::TypeTagInUse { tag } => write!(f, "Type tag {:#x} already registered", tag),
        }
    }
}

impl std::error::Error for ApiError {}
