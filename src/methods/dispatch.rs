//! Calling-convention dispatch
//!
//! The declared convention is checked against the actual call shape before
//! the function pointer is touched. A function is never invoked with an
//! argument count its convention does not allow.

use super::def::{
    PyCFunction, PyCFunctionWithKeywords, PyMethodDef, METH_KEYWORDS, METH_NOARGS, METH_O, METH_VARARGS,
};
use crate::args::{KeywordPairs, KeywordSource};
use crate::builtins::{self, tuple};
use crate::error::{ApiError, ApiResult};
use crate::logging::debug;
use crate::refcount::{Borrowed, Owned};
use core::ffi::{c_int, CStr};
use core::ptr;

/// Calling convention selected by `ml_flags`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallConvention {
    /// `METH_NOARGS`: `f(self, NULL)`
    NoArgs,
    /// `METH_O`: `f(self, arg)`
    Object,
    /// `METH_VARARGS`: `f(self, args)`
    VarArgs,
    /// `METH_VARARGS | METH_KEYWORDS`: `f(self, args, kwargs)`
    VarArgsKeywords,
}

impl CallConvention {
    pub fn from_flags(flags: c_int) -> ApiResult<Self> {
        match flags {
            METH_NOARGS => Ok(Self::NoArgs),
            METH_O => Ok(Self::Object),
            METH_VARARGS => Ok(Self::VarArgs),
            f if f == METH_VARARGS | METH_KEYWORDS => Ok(Self::VarArgsKeywords),
            _ => Err(ApiError::BadCallConvention { flags }),
        }
    }

    pub const fn flags(self) -> c_int {
        match self {
            Self::NoArgs => METH_NOARGS,
            Self::Object => METH_O,
            Self::VarArgs => METH_VARARGS,
            Self::VarArgsKeywords => METH_VARARGS | METH_KEYWORDS,
        }
    }

    #[inline]
    pub fn accepts_keywords(self) -> bool {
        self == Self::VarArgsKeywords
    }
}

/// A validated method table entry
#[derive(Debug, Clone, Copy)]
pub struct Method {
    name: &'static str,
    doc: Option<&'static str>,
    convention: CallConvention,
    function: PyCFunction,
}

impl Method {
    /// Validate a C descriptor
    ///
    /// # Safety
    /// `ml_name` and `ml_doc` must be null or NUL-terminated strings that
    /// live for the rest of the process, and `ml_meth` must follow the
    /// convention `ml_flags` declares.
    pub unsafe fn from_def(def: &PyMethodDef) -> ApiResult<Self> {
        if def.ml_name.is_null() {
            return Err(ApiError::NullReference);
        }
        let name = CStr::from_ptr(def.ml_name).to_str().map_err(|_| ApiError::InvalidUtf8)?;
        let function = def.ml_meth.ok_or(ApiError::NullReference)?;
        let convention = CallConvention::from_flags(def.ml_flags)?;
        let doc = if def.ml_doc.is_null() {
            None
        } else {
            CStr::from_ptr(def.ml_doc).to_str().ok()
        };

        Ok(Self {
            name,
            doc,
            convention,
            function,
        })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }

    #[inline]
    pub fn convention(&self) -> CallConvention {
        self.convention
    }

    /// Invoke with a positional tuple and optional keyword pairs
    ///
    /// `args` of `None` stands for no positional arguments. `kwargs` is a
    /// boxed sequence of `(str, object)` pairs; an empty one counts as
    /// absent. The result is the new reference the function returned.
    pub fn call(
        &self,
        slf: Option<Borrowed<'_>>,
        args: Option<Borrowed<'_>>,
        kwargs: Option<Borrowed<'_>>,
    ) -> ApiResult<Owned> {
        let nargs = match args {
            Some(args) => tuple::len(args)?,
            None => 0,
        };
        let kwargs = match kwargs {
            Some(kw) if builtins::sequence_slots(kw)?.is_empty() => None,
            other => other,
        };
        if let Some(kw) = kwargs {
            let pairs = KeywordPairs::from_object(kw)?;
            if !self.convention.accepts_keywords() {
                let name = pairs.entries()?.first().map(|(name, _)| name.to_string()).unwrap_or_default();
                return Err(ApiError::UnknownKeyword { name });
            }
        }

        debug!(method = self.name, convention = ?self.convention, nargs, "Dispatching native method");

        let slf = slf.map_or(ptr::null_mut(), Borrowed::as_ptr);
        let result = match self.convention {
            CallConvention::NoArgs => {
                if nargs != 0 {
                    return Err(ApiError::Arity { min: 0, max: 0, found: nargs });
                }
                unsafe { (self.function)(slf, ptr::null_mut()) }
            }
            CallConvention::Object => {
                let arg = match args {
                    Some(args) if nargs == 1 => tuple::get_item(args, 0)?,
                    _ => return Err(ApiError::Arity { min: 1, max: 1, found: nargs }),
                };
                unsafe { (self.function)(slf, arg.as_ptr()) }
            }
            CallConvention::VarArgs | CallConvention::VarArgsKeywords => {
                // Callee always sees a tuple
                let empty;
                let args = match args {
                    Some(args) => args.as_ptr(),
                    None => {
                        empty = tuple::new(0)?;
                        empty.as_ptr()
                    }
                };
                if self.convention == CallConvention::VarArgs {
                    unsafe { (self.function)(slf, args) }
                } else {
                    let kw = kwargs.map_or(ptr::null_mut(), Borrowed::as_ptr);
                    unsafe {
                        let f = core::mem::transmute::<PyCFunction, PyCFunctionWithKeywords>(self.function);
                        f(slf, args, kw)
                    }
                }
            }
        };

        unsafe { Owned::from_raw(result) }.ok_or_else(|| ApiError::CallFailed { name: self.name.to_string() })
    }
}

/// Validate `def` and dispatch one call through it
///
/// # Safety
/// Same as `Method::from_def`.
pub unsafe fn call_method(
    def: &PyMethodDef,
    slf: Option<Borrowed<'_>>,
    args: Option<Borrowed<'_>>,
    kwargs: Option<Borrowed<'_>>,
) -> ApiResult<Owned> {
    Method::from_def(def)?.call(slf, args, kwargs)
}
