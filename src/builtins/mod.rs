//! Built-in types - scalar boxes and the two sequence containers
//!
//! Design: each type is a focused module holding its layout, its static
//! `TypeObject` and safe Rust operations. The `extern "C"` names live in
//! `crate::ffi` and delegate here.

pub mod float;
pub mod list;
pub mod long;
pub mod string;
pub mod tuple;


pub use float::{PyFloatObject, FLOAT_TYPE};
pub use list::{PyListObject, LIST_TYPE};
pub use long::{PyLongObject, BOOL_TYPE, LONG_TYPE};
pub use string::{PyStrObject, STR_TYPE};
pub use tuple::{PyTupleObject, TUPLE_TYPE};

use crate::error::{ApiError, ApiResult};
use crate::object::Slot;
use crate::refcount::Borrowed;

/// Slots of a tuple or a list, for code that accepts either sequence
pub fn sequence_slots<'a>(obj: Borrowed<'a>) -> ApiResult<&'a [Slot]> {
    if tuple::check(obj) {
        tuple::slots(obj)
    } else if list::check(obj) {
        list::slots(obj)
    } else {
        Err(ApiError::TypeMismatch {
            expected: "sequence",
            found: obj.type_name(),
        })
    }
}

/// Borrowed items of a tuple or a list; an empty slot is an error
pub fn sequence_items<'a>(obj: Borrowed<'a>) -> ApiResult<impl Iterator<Item = ApiResult<Borrowed<'a>>>> {
    let slots = sequence_slots(obj)?;
    Ok(slots.iter().enumerate().map(|(index, slot)| match slot.get() {
        Some(item) => Ok(unsafe { Borrowed::from_non_null(item) }),
        None => Err(ApiError::UninitializedSlot { index: index as isize }),
    }))
}
