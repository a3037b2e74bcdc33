//! Float type - IEEE 754 double-precision boxes
//!
//! Integer boxes are a compatible kind on the way out: `as_double` widens
//! them, the way extension code expects `PyFloat_AsDouble(int)` to work.

use super::long;
use crate::error::{ApiError, ApiResult};
use crate::object::{self, generic_dealloc, PyObject, TypeObject, TypeTag};
use crate::refcount::{Borrowed, Owned};

#[repr(C)]
pub struct PyFloatObject {
    pub ob_base: PyObject,
    pub ob_fval: f64,
}

pub static FLOAT_TYPE: TypeObject = TypeObject::new(
    c"float",
    TypeTag::FLOAT,
    core::mem::size_of::<PyFloatObject>(),
    0,
    generic_dealloc,
);

/// Create new float box
pub fn from_double(value: f64) -> ApiResult<Owned> {
    let obj = object::new_object(&FLOAT_TYPE)?;
    unsafe {
        (*obj.as_ptr().cast::<PyFloatObject>()).ob_fval = value;
    }
    Ok(obj)
}

/// Native value of a float or integer box
pub fn as_double(obj: Borrowed<'_>) -> ApiResult<f64> {
    if check(obj) {
        return Ok(unsafe { (*obj.as_ptr().cast::<PyFloatObject>()).ob_fval });
    }
    if long::check(obj) {
        return Ok(long::value(obj)? as f64);
    }
    Err(ApiError::TypeMismatch {
        expected: FLOAT_TYPE.name,
        found: obj.type_name(),
    })
}

#[inline]
pub fn check(obj: Borrowed<'_>) -> bool {
    obj.is_instance(&FLOAT_TYPE)
}

#[inline]
pub fn check_exact(obj: Borrowed<'_>) -> bool {
    obj.is_exact(&FLOAT_TYPE)
}
