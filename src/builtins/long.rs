//! Integer type - immutable boxed integers, plus the bool singletons
//!
//! Design: one `i128` payload covers every native width the C surface
//! converts from (signed and unsigned 64-bit), so boxing never fails for
//! range reasons. Narrowing happens on the way out and reports overflow.
//!
//! `bool` derives from `int`: `True`/`False` are immortal integer boxes
//! holding 1 and 0, accepted anywhere an integer is.

use crate::error::{ApiError, ApiResult};
use crate::object::singletons::{immortal_dealloc, FALSE, TRUE};
use crate::object::{self, generic_dealloc, PyObject, TypeObject, TypeTag};
use crate::refcount::{Borrowed, Owned};

/// Integer box layout
#[repr(C)]
pub struct PyLongObject {
    pub ob_base: PyObject,
    pub ob_ival: i128,
}

impl PyLongObject {
    /// Statically allocated immortal box (used for `True`/`False`)
    pub const fn immortal(tp: &'static TypeObject, value: i128) -> Self {
        Self {
            ob_base: PyObject::immortal(tp),
            ob_ival: value,
        }
    }
}

pub static LONG_TYPE: TypeObject = TypeObject::new(
    c"int",
    TypeTag::LONG,
    core::mem::size_of::<PyLongObject>(),
    0,
    generic_dealloc,
);

pub static BOOL_TYPE: TypeObject = TypeObject::new(
    c"bool",
    TypeTag::BOOL,
    core::mem::size_of::<PyLongObject>(),
    0,
    immortal_dealloc,
)
.with_base(&LONG_TYPE);

/// Box an integer
pub fn from_i128(value: i128) -> ApiResult<Owned> {
    let obj = object::new_object(&LONG_TYPE)?;
    unsafe {
        (*obj.as_ptr().cast::<PyLongObject>()).ob_ival = value;
    }
    Ok(obj)
}

#[inline]
pub fn from_long(value: i64) -> ApiResult<Owned> {
    from_i128(value.into())
}

#[inline]
pub fn from_unsigned_long(value: u64) -> ApiResult<Owned> {
    from_i128(value.into())
}

#[inline]
pub fn from_size_t(value: usize) -> ApiResult<Owned> {
    from_i128(value as i128)
}

#[inline]
pub fn from_ssize_t(value: isize) -> ApiResult<Owned> {
    from_i128(value as i128)
}

/// Integer held by an `int` (or `bool`) box; floats are rejected
pub fn value(obj: Borrowed<'_>) -> ApiResult<i128> {
    object::ensure_instance(obj, &LONG_TYPE)?;
    Ok(unsafe { (*obj.as_ptr().cast::<PyLongObject>()).ob_ival })
}

/// Unbox into a native integer type, reporting values that do not fit
pub fn as_native<T: TryFrom<i128>>(obj: Borrowed<'_>, target: &'static str) -> ApiResult<T> {
    T::try_from(value(obj)?).map_err(|_| ApiError::Overflow { target })
}

#[inline]
pub fn as_long(obj: Borrowed<'_>) -> ApiResult<i64> {
    as_native(obj, "long")
}

#[inline]
pub fn as_unsigned_long(obj: Borrowed<'_>) -> ApiResult<u64> {
    as_native(obj, "unsigned long")
}

#[inline]
pub fn as_size_t(obj: Borrowed<'_>) -> ApiResult<usize> {
    as_native(obj, "size_t")
}

#[inline]
pub fn as_ssize_t(obj: Borrowed<'_>) -> ApiResult<isize> {
    as_native(obj, "Py_ssize_t")
}

/// `int` or a type deriving from it (`bool`)
#[inline]
pub fn check(obj: Borrowed<'_>) -> bool {
    obj.is_instance(&LONG_TYPE)
}

#[inline]
pub fn check_exact(obj: Borrowed<'_>) -> bool {
    obj.is_exact(&LONG_TYPE)
}

// ============================================================================
// bool
// ============================================================================

/// New reference to `True` or `False` (no count change, both are immortal)
#[inline]
pub fn from_bool(value: bool) -> Owned {
    object::bool_object(value).retain()
}

#[inline]
pub fn bool_check(obj: Borrowed<'_>) -> bool {
    obj.is_exact(&BOOL_TYPE)
}

pub fn is_true(obj: Borrowed<'_>) -> bool {
    obj.is(Borrowed::from_static(&TRUE.ob_base))
}

pub fn is_false(obj: Borrowed<'_>) -> bool {
    obj.is(Borrowed::from_static(&FALSE.ob_base))
}
