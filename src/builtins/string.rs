//! Text type - minimal immutable UTF-8 box
//!
//! Only what the `s` format code and `PyUnicode_*` constructors need:
//! build from UTF-8, read back as `&str` or a NUL-terminated C string.
//! Bytes are stored inline after the var header, followed by a NUL.

use crate::error::{ApiError, ApiResult};
use crate::object::{self, generic_dealloc, PyVarObject, TypeObject, TypeTag};
use crate::refcount::{Borrowed, Owned};
use core::ffi::CStr;

#[repr(C)]
pub struct PyStrObject {
    pub ob_base: PyVarObject,
    data: [u8; 0],
}

pub static STR_TYPE: TypeObject = TypeObject::new(
    c"str",
    TypeTag::STR,
    core::mem::size_of::<PyStrObject>() + 1,
    1,
    generic_dealloc,
);

pub fn from_str(text: &str) -> ApiResult<Owned> {
    let obj = object::new_var_object(&STR_TYPE, text.len())?;
    unsafe {
        core::ptr::copy_nonoverlapping(text.as_ptr(), data_ptr(obj.borrow()), text.len());
    }
    Ok(obj)
}

/// Build from bytes that must be valid UTF-8
pub fn from_bytes(bytes: &[u8]) -> ApiResult<Owned> {
    let text = core::str::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)?;
    from_str(text)
}

pub fn from_c_str(text: &CStr) -> ApiResult<Owned> {
    from_bytes(text.to_bytes())
}

pub fn as_str<'a>(obj: Borrowed<'a>) -> ApiResult<&'a str> {
    object::ensure_instance(obj, &STR_TYPE)?;
    unsafe {
        let len = PyVarObject::size_of(obj.as_non_null()) as usize;
        let bytes = core::slice::from_raw_parts(data_ptr(obj), len);
        Ok(core::str::from_utf8_unchecked(bytes))
    }
}

/// NUL-terminated view; text with an interior NUL cannot be represented
pub fn as_c_str<'a>(obj: Borrowed<'a>) -> ApiResult<&'a CStr> {
    object::ensure_instance(obj, &STR_TYPE)?;
    // The payload is stored with a trailing NUL past `ob_size`
    let with_nul = unsafe {
        let len = PyVarObject::size_of(obj.as_non_null()) as usize;
        core::slice::from_raw_parts(data_ptr(obj), len + 1)
    };
    CStr::from_bytes_with_nul(with_nul).map_err(|_| ApiError::EmbeddedNul)
}

#[inline]
pub fn check(obj: Borrowed<'_>) -> bool {
    obj.is_instance(&STR_TYPE)
}

#[inline]
fn data_ptr(obj: Borrowed<'_>) -> *mut u8 {
    unsafe { core::ptr::addr_of_mut!((*obj.as_ptr().cast::<PyStrObject>()).data).cast::<u8>() }
}
