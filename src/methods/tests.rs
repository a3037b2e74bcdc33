use super::*;
use crate::builtins::{long, string, tuple};
use crate::error::ApiError;
use crate::object::PyObject;
use crate::refcount::{Borrowed, Owned};
use core::ptr;

fn boxed(value: i128) -> *mut PyObject {
    long::from_i128(value).map_or(ptr::null_mut(), Owned::into_raw)
}

unsafe extern "C" fn answer(_slf: *mut PyObject, args: *mut PyObject) -> *mut PyObject {
    if !args.is_null() {
        return ptr::null_mut();
    }
    boxed(42)
}

unsafe extern "C" fn identity(_slf: *mut PyObject, arg: *mut PyObject) -> *mut PyObject {
    match Borrowed::from_raw(arg) {
        Some(arg) => arg.retain().into_raw(),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn count_args(_slf: *mut PyObject, args: *mut PyObject) -> *mut PyObject {
    match Borrowed::from_raw(args).map(tuple::len) {
        Some(Ok(n)) => boxed(n as i128),
        _ => ptr::null_mut(),
    }
}

unsafe extern "C" fn count_all(_slf: *mut PyObject, args: *mut PyObject, kwargs: *mut PyObject) -> *mut PyObject {
    let nargs = Borrowed::from_raw(args).map_or(0, |a| tuple::len(a).unwrap_or(0));
    let nkw = Borrowed::from_raw(kwargs).map_or(0, |k| tuple::len(k).unwrap_or(0));
    boxed((nargs * 100 + nkw) as i128)
}

unsafe extern "C" fn fails(_slf: *mut PyObject, _args: *mut PyObject) -> *mut PyObject {
    ptr::null_mut()
}

static TABLE: [PyMethodDef; 6] = [
    PyMethodDef::new(c"answer", answer, METH_NOARGS, Some(c"Return 42")),
    PyMethodDef::new(c"identity", identity, METH_O, None),
    PyMethodDef::new(c"count_args", count_args, METH_VARARGS, None),
    PyMethodDef::with_keywords(c"count_all", count_all, None),
    PyMethodDef::new(c"fails", fails, METH_VARARGS, None),
    PyMethodDef::SENTINEL,
];

fn table() -> MethodTable {
    unsafe { MethodTable::from_sentinel(TABLE.as_ptr()) }.unwrap()
}

fn longs(values: &[i64]) -> Owned {
    tuple::from_items(values.iter().map(|&v| long::from_long(v).unwrap())).unwrap()
}

fn value(obj: &Owned) -> i64 {
    long::as_long(obj.borrow()).unwrap()
}

#[test]
fn test_flags_map_to_conventions() {
    assert_eq!(CallConvention::from_flags(METH_NOARGS), Ok(CallConvention::NoArgs));
    assert_eq!(CallConvention::from_flags(METH_O), Ok(CallConvention::Object));
    assert_eq!(CallConvention::from_flags(METH_VARARGS), Ok(CallConvention::VarArgs));
    assert_eq!(
        CallConvention::from_flags(METH_VARARGS | METH_KEYWORDS),
        Ok(CallConvention::VarArgsKeywords)
    );

    for flags in [0, METH_KEYWORDS, METH_O | METH_NOARGS, 0x10] {
        assert_eq!(
            CallConvention::from_flags(flags),
            Err(ApiError::BadCallConvention { flags })
        );
    }
    assert_eq!(CallConvention::VarArgsKeywords.flags(), 0x3);
}

#[test]
fn test_table_reads_to_sentinel() {
    let table = table();
    assert_eq!(table.len(), 5);
    assert_eq!(table.find("answer").unwrap().doc(), Some("Return 42"));
    assert_eq!(table.find("identity").unwrap().convention(), CallConvention::Object);
    assert_eq!(
        table.find("missing").unwrap_err(),
        ApiError::UnknownMethod { name: "missing".into() }
    );

    let from_slice = unsafe { MethodTable::from_slice(&TABLE) }.unwrap();
    assert_eq!(from_slice.len(), 5);
}

#[test]
fn test_noargs_rejects_arguments() {
    let table = table();
    assert_eq!(value(&table.call("answer", None, None, None).unwrap()), 42);

    let empty = longs(&[]);
    assert_eq!(value(&table.call("answer", None, Some(empty.borrow()), None).unwrap()), 42);

    let one = longs(&[1]);
    let err = table.call("answer", None, Some(one.borrow()), None).unwrap_err();
    assert_eq!(err, ApiError::Arity { min: 0, max: 0, found: 1 });
}

#[test]
fn test_single_object_call() {
    let table = table();
    let args = longs(&[7]);
    let item = tuple::get_item(args.borrow(), 0).unwrap();

    let result = table.call("identity", None, Some(args.borrow()), None).unwrap();
    assert!(result.is(item));
    assert_eq!(item.refcnt(), 2);
    drop(result);
    assert_eq!(item.refcnt(), 1);

    let two = longs(&[1, 2]);
    let err = table.call("identity", None, Some(two.borrow()), None).unwrap_err();
    assert_eq!(err, ApiError::Arity { min: 1, max: 1, found: 2 });
    let err = table.call("identity", None, None, None).unwrap_err();
    assert_eq!(err, ApiError::Arity { min: 1, max: 1, found: 0 });
}

#[test]
fn test_varargs_always_receives_tuple() {
    let table = table();
    assert_eq!(value(&table.call("count_args", None, None, None).unwrap()), 0);

    let args = longs(&[1, 2, 3]);
    assert_eq!(value(&table.call("count_args", None, Some(args.borrow()), None).unwrap()), 3);
}

#[test]
fn test_keywords_only_for_keyword_convention() {
    let table = table();
    let pair = tuple::from_items([string::from_str("x").unwrap(), long::from_long(1).unwrap()]).unwrap();
    let kwargs = tuple::from_items([pair]).unwrap();
    let args = longs(&[1, 2]);

    let err = table
        .call("count_args", None, Some(args.borrow()), Some(kwargs.borrow()))
        .unwrap_err();
    assert_eq!(err, ApiError::UnknownKeyword { name: "x".into() });

    let result = table
        .call("count_all", None, Some(args.borrow()), Some(kwargs.borrow()))
        .unwrap();
    assert_eq!(value(&result), 201);

    // Empty keyword pairs are passed as NULL
    let none = longs(&[]);
    let result = table.call("count_all", None, None, Some(none.borrow())).unwrap();
    assert_eq!(value(&result), 0);
}

#[test]
fn test_null_result_is_call_failure() {
    let err = table().call("fails", None, None, None).unwrap_err();
    assert_eq!(err, ApiError::CallFailed { name: "fails".into() });
}

#[test]
fn test_invalid_entries_rejected() {
    let bad_flags = [PyMethodDef::new(c"bad", answer, METH_KEYWORDS, None), PyMethodDef::SENTINEL];
    let err = unsafe { MethodTable::from_sentinel(bad_flags.as_ptr()) }.unwrap_err();
    assert_eq!(err, ApiError::BadCallConvention { flags: METH_KEYWORDS });

    let no_function = [
        PyMethodDef {
            ml_name: c"empty".as_ptr(),
            ml_meth: None,
            ml_flags: METH_NOARGS,
            ml_doc: ptr::null(),
        },
        PyMethodDef::SENTINEL,
    ];
    let err = unsafe { MethodTable::from_sentinel(no_function.as_ptr()) }.unwrap_err();
    assert_eq!(err, ApiError::NullReference);

    let err = unsafe { MethodTable::from_sentinel(ptr::null()) }.unwrap_err();
    assert_eq!(err, ApiError::NullReference);
}

#[test]
fn test_call_method_directly() {
    let result = unsafe { call_method(&TABLE[0], None, None, None) }.unwrap();
    assert_eq!(value(&result), 42);
}
