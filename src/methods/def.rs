//! Method descriptors as laid out in C

use crate::object::PyObject;
use core::ffi::{c_char, c_int, CStr};
use core::ptr;

/// `METH_NOARGS`, `METH_O` and `METH_VARARGS` functions
pub type PyCFunction = unsafe extern "C" fn(*mut PyObject, *mut PyObject) -> *mut PyObject;

/// `METH_VARARGS | METH_KEYWORDS` functions, stored cast to `PyCFunction`
pub type PyCFunctionWithKeywords =
    unsafe extern "C" fn(*mut PyObject, *mut PyObject, *mut PyObject) -> *mut PyObject;

pub const METH_VARARGS: c_int = 0x0001;
pub const METH_KEYWORDS: c_int = 0x0002;
pub const METH_NOARGS: c_int = 0x0004;
pub const METH_O: c_int = 0x0008;

/// One entry of a method table
///
/// Tables end with `PyMethodDef::SENTINEL` (all fields null/zero).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PyMethodDef {
    pub ml_name: *const c_char,
    pub ml_meth: Option<PyCFunction>,
    pub ml_flags: c_int,
    pub ml_doc: *const c_char,
}

// Tables are immutable statics of pointers to string literals
unsafe impl Sync for PyMethodDef {}

impl PyMethodDef {
    pub const SENTINEL: Self = Self {
        ml_name: ptr::null(),
        ml_meth: None,
        ml_flags: 0,
        ml_doc: ptr::null(),
    };

    pub const fn new(
        name: &'static CStr,
        meth: PyCFunction,
        flags: c_int,
        doc: Option<&'static CStr>,
    ) -> Self {
        Self {
            ml_name: name.as_ptr(),
            ml_meth: Some(meth),
            ml_flags: flags,
            ml_doc: match doc {
                Some(doc) => doc.as_ptr(),
                None => ptr::null(),
            },
        }
    }

    /// Entry for a keyword-taking function; flags are `METH_VARARGS | METH_KEYWORDS`
    pub const fn with_keywords(
        name: &'static CStr,
        meth: PyCFunctionWithKeywords,
        doc: Option<&'static CStr>,
    ) -> Self {
        // Same cast C extensions perform; dispatch casts back before calling
        let meth = unsafe { core::mem::transmute::<PyCFunctionWithKeywords, PyCFunction>(meth) };
        Self::new(name, meth, METH_VARARGS | METH_KEYWORDS, doc)
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.ml_name.is_null()
    }
}
