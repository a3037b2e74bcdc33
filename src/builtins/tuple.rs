//! Tuple type - fixed-size sequence of owned references
//!
//! Design: slots are stored inline after the var header (flexible array
//! member). A new tuple's slots are all empty; each is normally set once.
//! Deallocation releases every set slot and skips empty ones.

use crate::error::{ApiError, ApiResult};
use crate::logging::trace;
use crate::object::{self, PyObject, PyVarObject, Slot, TypeObject, TypeTag};
use crate::refcount::{self, Borrowed, Owned};
use core::ptr::NonNull;

#[repr(C)]
pub struct PyTupleObject {
    pub ob_base: PyVarObject,
    pub ob_item: [Slot; 0],
}

pub static TUPLE_TYPE: TypeObject = TypeObject::new(
    c"tuple",
    TypeTag::TUPLE,
    core::mem::size_of::<PyTupleObject>(),
    core::mem::size_of::<Slot>(),
    tuple_dealloc,
);

unsafe fn tuple_dealloc(op: NonNull<PyObject>) {
    let obj = Borrowed::from_non_null(op);
    let slots = slots_mut(obj);
    trace!(event = "tuple_dealloc", len = slots.len());
    for slot in slots.iter_mut() {
        if let Some(item) = slot.take() {
            refcount::decref(item);
        }
    }
    object::free_object(op);
}

/// New tuple with `len` empty slots
pub fn new(len: usize) -> ApiResult<Owned> {
    object::new_var_object(&TUPLE_TYPE, len)
}

/// New tuple taking ownership of every item
pub fn from_items<I>(items: I) -> ApiResult<Owned>
where
    I: IntoIterator<Item = Owned>,
    I::IntoIter: ExactSizeIterator,
{
    let items = items.into_iter();
    let tuple = new(items.len())?;
    for (i, item) in items.enumerate() {
        set_item(tuple.borrow(), i, item)?;
    }
    Ok(tuple)
}

pub fn len(obj: Borrowed<'_>) -> ApiResult<usize> {
    object::ensure_instance(obj, &TUPLE_TYPE)?;
    Ok(unsafe { PyVarObject::size_of(obj.as_non_null()) as usize })
}

/// Borrowed reference to item `index`
pub fn get_item<'a>(obj: Borrowed<'a>, index: usize) -> ApiResult<Borrowed<'a>> {
    let slots = slots(obj)?;
    let slot = slots.get(index).ok_or_else(|| out_of_range(index, slots.len()))?;
    match slot.get() {
        Some(item) => Ok(unsafe { Borrowed::from_non_null(item) }),
        None => Err(ApiError::UninitializedSlot { index: index as isize }),
    }
}

/// Store `item` at `index`, releasing any previous occupant
///
/// Takes ownership of `item` in every case: on failure it is released.
pub fn set_item(obj: Borrowed<'_>, index: usize, item: Owned) -> ApiResult<()> {
    object::ensure_instance(obj, &TUPLE_TYPE)?;
    let slots = unsafe { slots_mut(obj) };
    let len = slots.len();
    let slot = slots.get_mut(index).ok_or_else(|| out_of_range(index, len))?;

    if let Some(old) = slot.replace(item.into_non_null()) {
        unsafe { refcount::decref(old) };
    }
    Ok(())
}

/// Items of a tuple (empty slots included)
pub fn slots<'a>(obj: Borrowed<'a>) -> ApiResult<&'a [Slot]> {
    object::ensure_instance(obj, &TUPLE_TYPE)?;
    Ok(unsafe { slots_mut(obj) })
}

#[inline]
pub fn check(obj: Borrowed<'_>) -> bool {
    obj.is_instance(&TUPLE_TYPE)
}

#[inline]
pub fn check_exact(obj: Borrowed<'_>) -> bool {
    obj.is_exact(&TUPLE_TYPE)
}

/// # Safety
/// `obj` must be a tuple and no other reference to its slots may be live.
unsafe fn slots_mut<'a>(obj: Borrowed<'a>) -> &'a mut [Slot] {
    let len = PyVarObject::size_of(obj.as_non_null()) as usize;
    let base = core::ptr::addr_of_mut!((*obj.as_ptr().cast::<PyTupleObject>()).ob_item).cast::<Slot>();
    core::slice::from_raw_parts_mut(base, len)
}

#[inline]
fn out_of_range(index: usize, len: usize) -> ApiError {
    ApiError::IndexOutOfRange {
        index: index as isize,
        len: len as isize,
    }
}
