//! A native extension module written only against the exported C surface
//!
//! Each function below is what a C extension would compile to: it receives
//! raw object pointers, parses with slot arrays, and returns a new
//! reference or null. The module's method table is sentinel-terminated and
//! dispatched through the runtime.

use pyabi_runtime::args::{FormatCode, PyArgSlot, PyBuildArg};
use pyabi_runtime::ffi::*;
use pyabi_runtime::methods::{MethodTable, PyMethodDef, METH_NOARGS, METH_O, METH_VARARGS};
use pyabi_runtime::PyObject;
use core::ffi::{c_char, c_long};
use core::ptr::{self, addr_of_mut};

// ============================================================================
// Extension functions
// ============================================================================

unsafe extern "C" fn add_numbers(_slf: *mut PyObject, args: *mut PyObject) -> *mut PyObject {
    let (mut a, mut b): (c_long, c_long) = (0, 0);
    let mut slots = [
        PyArgSlot::new(FormatCode::Long, addr_of_mut!(a)),
        PyArgSlot::new(FormatCode::Long, addr_of_mut!(b)),
    ];
    if PyArg_ParseTupleSlots(args, c"ll:add_numbers".as_ptr(), slots.as_mut_ptr(), slots.len()) == 0 {
        return ptr::null_mut();
    }
    PyLong_FromLong(a + b)
}

unsafe extern "C" fn create_tuple(_slf: *mut PyObject, args: *mut PyObject) -> *mut PyObject {
    let (mut a, mut b, mut c): (c_long, c_long, c_long) = (0, 0, 0);
    let mut slots = [
        PyArgSlot::new(FormatCode::Long, addr_of_mut!(a)),
        PyArgSlot::new(FormatCode::Long, addr_of_mut!(b)),
        PyArgSlot::new(FormatCode::Long, addr_of_mut!(c)),
    ];
    if PyArg_ParseTupleSlots(args, c"lll".as_ptr(), slots.as_mut_ptr(), slots.len()) == 0 {
        return ptr::null_mut();
    }

    let tuple = PyTuple_New(3);
    if tuple.is_null() {
        return ptr::null_mut();
    }
    for (i, v) in [a, b, c].into_iter().enumerate() {
        if PyTuple_SetItem(tuple, i as i64, PyLong_FromLong(v)) != 0 {
            Py_DECREF(tuple.cast());
            return ptr::null_mut();
        }
    }
    tuple
}

unsafe extern "C" fn sum_list(_slf: *mut PyObject, list: *mut PyObject) -> *mut PyObject {
    if PyList_Check(list) == 0 {
        return ptr::null_mut();
    }
    let mut total: c_long = 0;
    for i in 0..PyList_Size(list) {
        let item = PyList_GetItem(list, i);
        if item.is_null() {
            return ptr::null_mut();
        }
        if PyLong_Check(item) != 0 {
            total += PyLong_AsLong(item);
        }
    }
    PyLong_FromLong(total)
}

unsafe extern "C" fn touch_refcount(_slf: *mut PyObject, obj: *mut PyObject) -> *mut PyObject {
    Py_INCREF(obj.cast());
    Py_DECREF(obj.cast());
    Py_INCREF(Py_None.as_ptr().cast());
    Py_None.as_ptr()
}

unsafe extern "C" fn fill_memory(_slf: *mut PyObject, args: *mut PyObject) -> *mut PyObject {
    let mut size: c_long = 0;
    let mut slots = [PyArgSlot::new(FormatCode::Long, addr_of_mut!(size))];
    if PyArg_ParseTupleSlots(args, c"l".as_ptr(), slots.as_mut_ptr(), 1) == 0 || size < 0 {
        return ptr::null_mut();
    }

    let mem = PyMem_Malloc(size as usize).cast::<u8>();
    if mem.is_null() {
        return ptr::null_mut();
    }
    ptr::write_bytes(mem, b'A', size as usize);
    let intact = (0..size as usize).all(|i| *mem.add(i) == b'A');
    PyMem_Free(mem.cast());
    PyBool_FromLong(intact as c_long)
}

unsafe extern "C" fn version(_slf: *mut PyObject, _args: *mut PyObject) -> *mut PyObject {
    let values = [PyBuildArg::string(c"pyabi".as_ptr()), PyBuildArg::long(1)];
    Py_BuildValueSlots(c"(s, l)".as_ptr(), values.as_ptr(), values.len())
}

static MODULE_METHODS: [PyMethodDef; 7] = [
    PyMethodDef::new(c"add_numbers", add_numbers, METH_VARARGS, Some(c"Add two numbers")),
    PyMethodDef::new(c"create_tuple", create_tuple, METH_VARARGS, Some(c"Create tuple of 3 numbers")),
    PyMethodDef::new(c"sum_list", sum_list, METH_O, Some(c"Sum all numbers in list")),
    PyMethodDef::new(c"touch_refcount", touch_refcount, METH_O, None),
    PyMethodDef::new(c"fill_memory", fill_memory, METH_VARARGS, None),
    PyMethodDef::new(c"version", version, METH_NOARGS, None),
    PyMethodDef::SENTINEL,
];

// ============================================================================
// Helpers
// ============================================================================

fn longs(values: &[c_long]) -> *mut PyObject {
    let built: Vec<PyBuildArg> = values.iter().map(|&v| PyBuildArg::long(v)).collect();
    let format = format!("({})", "l".repeat(values.len()));
    let format = std::ffi::CString::new(format).unwrap();
    let tuple = unsafe { Py_BuildValueSlots(format.as_ptr(), built.as_ptr(), built.len()) };
    assert!(!tuple.is_null());
    tuple
}

fn call(name: &std::ffi::CStr, args: *mut PyObject) -> *mut PyObject {
    unsafe { pyabi_call_table(MODULE_METHODS.as_ptr(), name.as_ptr(), ptr::null_mut(), args, ptr::null_mut()) }
}

unsafe fn release(objs: &[*mut PyObject]) {
    for &obj in objs {
        Py_XDECREF(obj.cast());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_add_numbers() {
    unsafe {
        let args = longs(&[40, 2]);
        let result = call(c"add_numbers", args);
        assert_eq!(PyLong_AsLong(result), 42);

        let short = longs(&[1]);
        assert!(call(c"add_numbers", short).is_null());

        release(&[args, result, short]);
    }
}

#[test]
fn test_create_tuple() {
    unsafe {
        let args = longs(&[5, 10, 15]);
        let tuple = call(c"create_tuple", args);
        assert_eq!(PyTuple_Size(tuple), 3);
        for (i, expected) in [5, 10, 15].into_iter().enumerate() {
            let item = PyTuple_GetItem(tuple, i as i64);
            assert_eq!(PyLong_AsLong(item), expected);
            assert_eq!(pyabi_refcnt(item), 1);
        }
        assert_eq!(pyabi_size(tuple), 3);
        release(&[args, tuple]);
    }
}

#[test]
fn test_sum_list() {
    unsafe {
        let list = PyList_New(0);
        for v in [10, 20, 30] {
            assert_eq!(PyList_Append(list, PyLong_FromLong(v)), 0);
        }
        let args = PyTuple_New(1);
        Py_INCREF(list.cast());
        assert_eq!(PyTuple_SetItem(args, 0, list), 0);

        let total = call(c"sum_list", args);
        assert_eq!(PyLong_AsLong(total), 60);

        let not_a_list = longs(&[1]);
        let wrapped = PyTuple_New(1);
        PyTuple_SetItem(wrapped, 0, not_a_list);
        assert!(call(c"sum_list", wrapped).is_null());

        release(&[total, args, list, wrapped]);
    }
}

#[test]
fn test_refcount_round_trip() {
    unsafe {
        let obj = PyLong_FromLong(999);
        assert_eq!(pyabi_refcnt(obj), 1);
        Py_INCREF(obj.cast());
        assert_eq!(pyabi_refcnt(obj), 2);
        Py_DECREF(obj.cast());
        assert_eq!(pyabi_refcnt(obj), 1);

        let args = PyTuple_New(1);
        PyTuple_SetItem(args, 0, obj);
        let none = call(c"touch_refcount", args);
        assert_eq!(none, Py_None.as_ptr());
        assert_eq!(pyabi_refcnt(obj), 1);
        release(&[none, args]);
    }
}

#[test]
fn test_memory_round_trip() {
    unsafe {
        for size in [0, 1, 1024, 5000] {
            let args = longs(&[size]);
            let ok = call(c"fill_memory", args);
            assert_eq!(ok, Py_True.as_ptr());
            release(&[args]);
        }
    }
}

#[test]
fn test_noargs_function_builds_value() {
    unsafe {
        let result = call(c"version", ptr::null_mut());
        assert_eq!(PyTuple_Size(result), 2);
        let name = PyUnicode_AsUTF8(PyTuple_GetItem(result, 0));
        assert_eq!(std::ffi::CStr::from_ptr(name).to_str().unwrap(), "pyabi");
        assert_eq!(std::ffi::CStr::from_ptr(pyabi_type_name(result)).to_str().unwrap(), "tuple");
        release(&[result]);

        let args = longs(&[1]);
        assert!(call(c"version", args).is_null());
        release(&[args]);
    }
}

#[test]
fn test_method_table_contents() {
    let table = unsafe { MethodTable::from_sentinel(MODULE_METHODS.as_ptr()) }.unwrap();
    assert_eq!(table.len(), 6);
    assert_eq!(table.find("sum_list").unwrap().doc(), Some("Sum all numbers in list"));
    assert!(call(c"missing", ptr::null_mut()).is_null());
}

#[test]
fn test_allocator_entry_points() {
    unsafe {
        let block = PyObject_Malloc(64).cast::<c_char>();
        assert!(!block.is_null());
        let grown = PyObject_Realloc(block.cast(), 4096).cast::<u8>();
        assert!(!grown.is_null());
        PyObject_Free(grown.cast());

        let zeroed = PyMem_Calloc(16, 8).cast::<u8>();
        assert!((0..128).all(|i| *zeroed.add(i) == 0));
        PyMem_Free(zeroed.cast());
        assert!(PyMem_Calloc(usize::MAX, 2).is_null());

        let raw = PyMem_RawMalloc(0);
        assert!(!raw.is_null());
        PyMem_RawFree(raw);
        PyMem_Free(ptr::null_mut());
    }
}
