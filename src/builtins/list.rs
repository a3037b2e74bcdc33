//! List type - growable sequence with amortized O(1) append
//!
//! Design: header + separately allocated slot buffer with geometric growth
//! - first buffer holds `MIN_CAPACITY` slots, then capacity doubles
//! - capacity never shrinks
//! - `length <= capacity` at all times
//!
//! The buffer comes from the two-tier allocator, so small lists live in
//! pool blocks and `realloc` moves them to the heap as they grow.

use crate::allocator;
use crate::error::{ApiError, ApiResult};
use crate::logging::{debug, trace};
use crate::object::{self, PyObject, PyVarObject, Slot, TypeObject, TypeTag};
use crate::refcount::{self, Borrowed, Owned};
use core::ptr::NonNull;

/// Capacity of the first buffer allocated by `append`
pub const MIN_CAPACITY: usize = 4;
/// Capacity multiplier when the buffer is full
pub const GROWTH_FACTOR: usize = 2;

#[repr(C)]
pub struct PyListObject {
    pub ob_base: PyVarObject,
    pub ob_item: *mut Slot,
    pub allocated: isize,
}

pub static LIST_TYPE: TypeObject = TypeObject::new(
    c"list",
    TypeTag::LIST,
    core::mem::size_of::<PyListObject>(),
    0,
    list_dealloc,
)
.with_var_size();

unsafe fn list_dealloc(op: NonNull<PyObject>) {
    let obj = Borrowed::from_non_null(op);
    let list = raw(obj);
    trace!(event = "list_dealloc", len = (*list).ob_base.ob_size, capacity = (*list).allocated);

    for slot in slots_mut(obj) {
        if let Some(item) = slot.take() {
            refcount::decref(item);
        }
    }
    if let Some(buffer) = NonNull::new((*list).ob_item) {
        allocator::free(buffer.cast::<u8>());
    }
    object::free_object(op);
}

/// New list of logical length `len`, every slot empty
pub fn new(len: usize) -> ApiResult<Owned> {
    let obj = object::new_object(&LIST_TYPE)?;
    if len > 0 {
        let bytes = len.saturating_mul(core::mem::size_of::<Slot>());
        let buffer = allocator::calloc(len, core::mem::size_of::<Slot>())
            .ok_or(ApiError::AllocationFailed { size: bytes })?;
        unsafe {
            let list = raw(obj.borrow());
            (*list).ob_item = buffer.cast::<Slot>().as_ptr();
            (*list).allocated = len as isize;
            (*list).ob_base.ob_size = len as i64;
        }
    }
    Ok(obj)
}

pub fn len(obj: Borrowed<'_>) -> ApiResult<usize> {
    object::ensure_instance(obj, &LIST_TYPE)?;
    Ok(unsafe { (*raw(obj)).ob_base.ob_size as usize })
}

pub fn capacity(obj: Borrowed<'_>) -> ApiResult<usize> {
    object::ensure_instance(obj, &LIST_TYPE)?;
    Ok(unsafe { (*raw(obj)).allocated as usize })
}

/// Append `item`, taking ownership of it (released if the list cannot grow)
pub fn append(obj: Borrowed<'_>, item: Owned) -> ApiResult<()> {
    object::ensure_instance(obj, &LIST_TYPE)?;
    unsafe {
        let list = raw(obj);
        let len = (*list).ob_base.ob_size as usize;
        if len == (*list).allocated as usize {
            grow(list, len)?;
        }
        let previous = (*(*list).ob_item.add(len)).replace(item.into_non_null());
        debug_assert!(previous.is_none());
        (*list).ob_base.ob_size = len as i64 + 1;
    }
    Ok(())
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
    object::ensure_instance(obj, &LIST_TYPE)?;
    let slots = unsafe { slots_mut(obj) };
    let len = slots.len();
    let slot = slots.get_mut(index).ok_or_else(|| out_of_range(index, len))?;

    if let Some(old) = slot.replace(item.into_non_null()) {
        unsafe { refcount::decref(old) };
    }
    Ok(())
}

/// Items up to the logical length (empty slots included)
pub fn slots<'a>(obj: Borrowed<'a>) -> ApiResult<&'a [Slot]> {
    object::ensure_instance(obj, &LIST_TYPE)?;
    Ok(unsafe { slots_mut(obj) })
}

#[inline]
pub fn check(obj: Borrowed<'_>) -> bool {
    obj.is_instance(&LIST_TYPE)
}

#[inline]
pub fn check_exact(obj: Borrowed<'_>) -> bool {
    obj.is_exact(&LIST_TYPE)
}

/// Grow the buffer past `len` slots
unsafe fn grow(list: *mut PyListObject, len: usize) -> ApiResult<()> {
    let old_capacity = (*list).allocated as usize;
    let new_capacity = if old_capacity == 0 {
        MIN_CAPACITY
    } else {
        old_capacity.checked_mul(GROWTH_FACTOR).ok_or(ApiError::AllocationFailed { size: usize::MAX })?
    };
    let bytes = new_capacity
        .checked_mul(core::mem::size_of::<Slot>())
        .filter(|&b| b <= isize::MAX as usize)
        .ok_or(ApiError::AllocationFailed { size: usize::MAX })?;

    let buffer = allocator::realloc(NonNull::new((*list).ob_item.cast::<u8>()), bytes)
        .ok_or(ApiError::AllocationFailed { size: bytes })?;
    let items = buffer.cast::<Slot>().as_ptr();
    for i in len..new_capacity {
        items.add(i).write(Slot::EMPTY);
    }

    (*list).ob_item = items;
    (*list).allocated = new_capacity as isize;
    debug!(old_capacity, new_capacity, "List buffer grown");
    Ok(())
}

#[inline]
unsafe fn raw(obj: Borrowed<'_>) -> *mut PyListObject {
    obj.as_ptr().cast::<PyListObject>()
}

/// # Safety
/// `obj` must be a list and no other reference to its slots may be live.
unsafe fn slots_mut<'a>(obj: Borrowed<'a>) -> &'a mut [Slot] {
    let list = raw(obj);
    let len = (*list).ob_base.ob_size as usize;
    if len == 0 {
        return &mut [];
    }
    core::slice::from_raw_parts_mut((*list).ob_item, len)
}

#[inline]
fn out_of_range(index: usize, len: usize) -> ApiError {
    ApiError::IndexOutOfRange {
        index: index as isize,
        len: len as isize,
    }
}
