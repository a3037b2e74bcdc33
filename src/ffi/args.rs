//! Argument marshalling for C callers
//!
//! The variadic `PyArg_ParseTuple(args, format, ...)` family is replaced by
//! entry points taking an explicit array of tagged slots, one per format
//! code. `PyArg_*` return `1` on success and `0` on failure; on failure no
//! slot has been written.

use super::{borrowed, new_reference, report};
use crate::args::{self, BuildArg, KeywordPairs, KeywordSource, NoKeywords, PyArgSlot, PyBuildArg};
use crate::error::{ApiError, ApiResult};
use crate::logging::log_entry;
use crate::object::PyObject;
use core::ffi::{c_char, c_int, CStr};
use smallvec::SmallVec;

/// # Safety
/// `text` must be null or a NUL-terminated string outliving `'a`.
unsafe fn c_text<'a>(text: *const c_char) -> ApiResult<&'a str> {
    if text.is_null() {
        return Err(ApiError::NullReference);
    }
    CStr::from_ptr(text).to_str().map_err(|_| ApiError::InvalidUtf8)
}

/// # Safety
/// `ptr` must be null or valid for `len` elements, for `'a`.
unsafe fn c_slice<'a, T>(ptr: *const T, len: usize) -> ApiResult<&'a [T]> {
    match (ptr.is_null(), len) {
        (_, 0) => Ok(&[]),
        (true, _) => Err(ApiError::NullReference),
        (false, _) => Ok(core::slice::from_raw_parts(ptr, len)),
    }
}

/// # Safety
/// Same as `c_slice`, with exclusive access.
unsafe fn c_slice_mut<'a, T>(ptr: *mut T, len: usize) -> ApiResult<&'a mut [T]> {
    match (ptr.is_null(), len) {
        (_, 0) => Ok(&mut []),
        (true, _) => Err(ApiError::NullReference),
        (false, _) => Ok(core::slice::from_raw_parts_mut(ptr, len)),
    }
}

/// Names from a NULL-terminated `char *` array
unsafe fn keyword_names<'a>(keywords: *const *const c_char) -> ApiResult<SmallVec<[&'a str; 8]>> {
    if keywords.is_null() {
        return Err(ApiError::NullReference);
    }
    let mut names = SmallVec::new();
    let mut cursor = keywords;
    while !(*cursor).is_null() {
        names.push(c_text(*cursor)?);
        cursor = cursor.add(1);
    }
    Ok(names)
}

fn truth(fn_name: &str, result: ApiResult<()>) -> c_int {
    report(fn_name, result.map(|()| 1), 0)
}

/// `PyArg_ParseTuple` with explicit output slots
///
/// # Safety
/// `args` must be null or a live object, `format` a NUL-terminated string
/// and `slots` valid for `nslots` entries whose `dest` pointers are
/// writable for their declared codes.
#[no_mangle]
pub unsafe extern "C" fn PyArg_ParseTupleSlots(
    args: *mut PyObject,
    format: *const c_char,
    slots: *mut PyArgSlot,
    nslots: usize,
) -> c_int {
    log_entry("PyArg_ParseTupleSlots", nslots);
    let result = (|| {
        let args = borrowed(args)?;
        let format = c_text(format)?;
        let slots = c_slice_mut(slots, nslots)?;
        args::parse_tuple(args, format, slots)
    })();
    truth("PyArg_ParseTupleSlots", result)
}

/// `PyArg_ParseTupleAndKeywords` with explicit output slots
///
/// `kwargs` is null or a tuple/list of `(str, object)` pairs. `keywords`
/// names every format position, `""` marking a positional-only one, and
/// ends with a null pointer.
///
/// # Safety
/// As `PyArg_ParseTupleSlots`; `kwargs` must be null or a live object and
/// `keywords` a NULL-terminated array of NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn PyArg_ParseTupleAndKeywordsSlots(
    args: *mut PyObject,
    kwargs: *mut PyObject,
    format: *const c_char,
    keywords: *const *const c_char,
    slots: *mut PyArgSlot,
    nslots: usize,
) -> c_int {
    log_entry("PyArg_ParseTupleAndKeywordsSlots", nslots);
    let result = (|| {
        let args = borrowed(args)?;
        let format = c_text(format)?;
        let names = keyword_names(keywords)?;
        let slots = c_slice_mut(slots, nslots)?;

        let pairs;
        let kwargs: &dyn KeywordSource<'_> = if kwargs.is_null() {
            &NoKeywords
        } else {
            pairs = KeywordPairs::from_object(borrowed(kwargs)?)?;
            &pairs
        };
        args::parse_tuple_and_keywords(args, kwargs, format, &names, slots)
    })();
    truth("PyArg_ParseTupleAndKeywordsSlots", result)
}

/// `Py_BuildValue` with explicit tagged values; null on failure
///
/// # Safety
/// `format` must be a NUL-terminated string and `values` valid for
/// `nvalues` entries, each satisfying `PyBuildArg::decode`.
#[no_mangle]
pub unsafe extern "C" fn Py_BuildValueSlots(
    format: *const c_char,
    values: *const PyBuildArg,
    nvalues: usize,
) -> *mut PyObject {
    log_entry("Py_BuildValueSlots", nvalues);
    let result = (|| {
        let format = c_text(format)?;
        let decoded = c_slice(values, nvalues)?
            .iter()
            .map(|value| value.decode())
            .collect::<ApiResult<SmallVec<[BuildArg<'_>; 8]>>>()?;
        args::build_value(format, &decoded)
    })();
    new_reference("Py_BuildValueSlots", result)
}
