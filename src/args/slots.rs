//! Tagged argument slots - the replacement for C varargs
//!
//! Extract writes into an ordered list of output slots, each tagged with
//! the format code it expects; build reads an ordered list of tagged
//! native values. Rust callers use `Output` and `BuildArg`; C callers pass
//! arrays of the `#[repr(C)]` `PyArgSlot` and `PyBuildArg`.

use super::format::FormatCode;
use crate::error::{ApiError, ApiResult};
use crate::object::PyObject;
use crate::refcount::Borrowed;
use core::ffi::{c_char, c_double, c_float, c_int, c_long, c_longlong, c_void, CStr};

/// A converted input value, staged until every code has succeeded
#[derive(Debug, Clone, Copy)]
pub enum Converted<'a> {
    Str(&'a CStr),
    Int(c_int),
    Long(c_long),
    LongLong(c_longlong),
    Double(c_double),
    Float(c_float),
    /// Borrowed: valid as long as the argument tuple is
    Object(Borrowed<'a>),
}

impl Converted<'_> {
    pub fn code(&self) -> FormatCode {
        match self {
            Self::Str(_) => FormatCode::Str,
            Self::Int(_) => FormatCode::Int,
            Self::Long(_) => FormatCode::Long,
            Self::LongLong(_) => FormatCode::LongLong,
            Self::Double(_) => FormatCode::Double,
            Self::Float(_) => FormatCode::Float,
            Self::Object(_) => FormatCode::Object,
        }
    }
}

/// Destination for one extracted value
pub trait OutputSlot<'a> {
    /// Code character this slot was declared for
    fn code_char(&self) -> char;

    /// Write a value whose code has already been matched against this slot
    fn store(&mut self, value: Converted<'a>);
}

/// Rust-side output slot
#[derive(Debug)]
pub enum Output<'o, 'a> {
    Str(&'o mut Option<&'a str>),
    Int(&'o mut c_int),
    Long(&'o mut c_long),
    LongLong(&'o mut c_longlong),
    Double(&'o mut c_double),
    Float(&'o mut c_float),
    Object(&'o mut Option<Borrowed<'a>>),
}

impl<'a> OutputSlot<'a> for Output<'_, 'a> {
    fn code_char(&self) -> char {
        let code = match self {
            Self::Str(_) => FormatCode::Str,
            Self::Int(_) => FormatCode::Int,
            Self::Long(_) => FormatCode::Long,
            Self::LongLong(_) => FormatCode::LongLong,
            Self::Double(_) => FormatCode::Double,
            Self::Float(_) => FormatCode::Float,
            Self::Object(_) => FormatCode::Object,
        };
        code.as_char()
    }

    fn store(&mut self, value: Converted<'a>) {
        match (self, value) {
            // A str box is always valid UTF-8
            (Self::Str(out), Converted::Str(s)) => **out = s.to_str().ok(),
            (Self::Int(out), Converted::Int(v)) => **out = v,
            (Self::Long(out), Converted::Long(v)) => **out = v,
            (Self::LongLong(out), Converted::LongLong(v)) => **out = v,
            (Self::Double(out), Converted::Double(v)) => **out = v,
            (Self::Float(out), Converted::Float(v)) => **out = v,
            (Self::Object(out), Converted::Object(o)) => **out = Some(o),
            (slot, value) => debug_assert!(
                false,
                "slot '{}' given '{}' value",
                slot.code_char(),
                value.code().as_char()
            ),
        }
    }
}

/// C-side output slot: a code character and the address to write to
///
/// `dest` points at `const char *` for `s`, `int` for `i`, `long` for `l`,
/// `long long` for `L`, `double` for `d`, `float` for `f` and `PyObject *`
/// for `O` (a borrowed reference).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PyArgSlot {
    pub code: c_char,
    pub dest: *mut c_void,
}

impl PyArgSlot {
    pub fn new<T>(code: FormatCode, dest: *mut T) -> Self {
        Self {
            code: code as u8 as c_char,
            dest: dest.cast(),
        }
    }
}

impl<'a> OutputSlot<'a> for PyArgSlot {
    fn code_char(&self) -> char {
        self.code as u8 as char
    }

    fn store(&mut self, value: Converted<'a>) {
        if self.dest.is_null() {
            return;
        }
        unsafe {
            match value {
                Converted::Str(s) => *self.dest.cast::<*const c_char>() = s.as_ptr(),
                Converted::Int(v) => *self.dest.cast::<c_int>() = v,
                Converted::Long(v) => *self.dest.cast::<c_long>() = v,
                Converted::LongLong(v) => *self.dest.cast::<c_longlong>() = v,
                Converted::Double(v) => *self.dest.cast::<c_double>() = v,
                Converted::Float(v) => *self.dest.cast::<c_float>() = v,
                Converted::Object(o) => *self.dest.cast::<*mut PyObject>() = o.as_ptr(),
            }
        }
    }
}

/// Rust-side native input for build
#[derive(Debug, Clone, Copy)]
pub enum BuildArg<'a> {
    /// `None` builds the None object, like a NULL `char *`
    Str(Option<&'a str>),
    Int(c_int),
    Long(c_long),
    LongLong(c_longlong),
    Double(c_double),
    Float(c_float),
    /// A new reference is taken; the caller keeps its own
    Object(Borrowed<'a>),
}

impl BuildArg<'_> {
    pub fn code(&self) -> FormatCode {
        match self {
            Self::Str(_) => FormatCode::Str,
            Self::Int(_) => FormatCode::Int,
            Self::Long(_) => FormatCode::Long,
            Self::LongLong(_) => FormatCode::LongLong,
            Self::Double(_) => FormatCode::Double,
            Self::Float(_) => FormatCode::Float,
            Self::Object(_) => FormatCode::Object,
        }
    }
}

/// Native value of a C build argument, selected by `PyBuildArg::code`
#[repr(C)]
#[derive(Clone, Copy)]
pub union PyBuildValue {
    pub s: *const c_char,
    pub i: c_int,
    pub l: c_long,
    pub ll: c_longlong,
    pub d: c_double,
    pub f: c_float,
    pub o: *mut PyObject,
}

/// C-side build input: a code character and its value
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PyBuildArg {
    pub code: c_char,
    pub value: PyBuildValue,
}

impl PyBuildArg {
    pub fn long(v: c_long) -> Self {
        Self::tagged(FormatCode::Long, PyBuildValue { l: v })
    }

    pub fn int(v: c_int) -> Self {
        Self::tagged(FormatCode::Int, PyBuildValue { i: v })
    }

    pub fn long_long(v: c_longlong) -> Self {
        Self::tagged(FormatCode::LongLong, PyBuildValue { ll: v })
    }

    pub fn double(v: c_double) -> Self {
        Self::tagged(FormatCode::Double, PyBuildValue { d: v })
    }

    pub fn float(v: c_float) -> Self {
        Self::tagged(FormatCode::Float, PyBuildValue { f: v })
    }

    pub fn string(s: *const c_char) -> Self {
        Self::tagged(FormatCode::Str, PyBuildValue { s })
    }

    pub fn object(o: *mut PyObject) -> Self {
        Self::tagged(FormatCode::Object, PyBuildValue { o })
    }

    fn tagged(code: FormatCode, value: PyBuildValue) -> Self {
        Self {
            code: code as u8 as c_char,
            value,
        }
    }

    /// Decode into a `BuildArg`, reading the union member `code` selects
    ///
    /// # Safety
    /// A `s` value must be null or a NUL-terminated string, and an `O` value
    /// a live object, both outliving `'a`.
    pub unsafe fn decode<'a>(&self) -> ApiResult<BuildArg<'a>> {
        let found = self.code as u8;
        let code = FormatCode::from_byte(found).ok_or_else(|| {
            ApiError::bad_format(
                &(found as char).to_string(),
                "unknown build argument code",
            )
        })?;

        Ok(match code {
            FormatCode::Str if self.value.s.is_null() => BuildArg::Str(None),
            FormatCode::Str => {
                let text = CStr::from_ptr(self.value.s)
                    .to_str()
                    .map_err(|_| ApiError::InvalidUtf8)?;
                BuildArg::Str(Some(text))
            }
            FormatCode::Int => BuildArg::Int(self.value.i),
            FormatCode::Long => BuildArg::Long(self.value.l),
            FormatCode::LongLong => BuildArg::LongLong(self.value.ll),
            FormatCode::Double => BuildArg::Double(self.value.d),
            FormatCode::Float => BuildArg::Float(self.value.f),
            FormatCode::Object => {
                BuildArg::Object(Borrowed::from_raw(self.value.o).ok_or(ApiError::NullReference)?)
            }
        })
    }
}

impl core::fmt::Debug for PyBuildArg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PyBuildArg")
            .field("code", &(self.code as u8 as char))
            .finish_non_exhaustive()
    }
}
