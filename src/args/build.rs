//! Build direction - native values to a new boxed object
//!
//! Zero top-level items build None, one builds that value unwrapped, more
//! build a tuple. `(...)` always builds a tuple. Every argument is checked
//! against its code before the first box is allocated.

use super::format::{BuildFormat, BuildItem};
use super::slots::BuildArg;
use crate::builtins::{float, long, string, tuple};
use crate::error::{ApiError, ApiResult};
use crate::object;
use crate::refcount::Owned;

/// `Py_BuildValue`: returns a new reference
pub fn build_value(format: &str, args: &[BuildArg<'_>]) -> ApiResult<Owned> {
    let fmt = BuildFormat::parse(format)?;
    check_args(&fmt, args)?;

    let mut values = args.iter();
    match fmt.items.as_slice() {
        [] => Ok(object::new_none()),
        [single] => build_item(single, &mut values),
        items => build_tuple(items, &mut values),
    }
}

fn check_args(fmt: &BuildFormat, args: &[BuildArg<'_>]) -> ApiResult<()> {
    let codes = fmt.flat_codes();
    if codes.len() != args.len() {
        return Err(ApiError::Arity {
            min: codes.len(),
            max: codes.len(),
            found: args.len(),
        });
    }
    for (position, (code, arg)) in codes.iter().zip(args).enumerate() {
        if arg.code() != *code {
            return Err(ApiError::SlotMismatch {
                position,
                expected: code.as_char(),
                found: arg.code().as_char(),
            });
        }
    }
    Ok(())
}

type Values<'s, 'b> = core::slice::Iter<'s, BuildArg<'b>>;

fn build_item(item: &BuildItem, values: &mut Values<'_, '_>) -> ApiResult<Owned> {
    match item {
        BuildItem::Code(_) => {
            let arg = values.next().ok_or(ApiError::Arity { min: 1, max: 1, found: 0 })?;
            box_value(arg)
        }
        BuildItem::Tuple(items) => build_tuple(items, values),
    }
}

fn build_tuple(items: &[BuildItem], values: &mut Values<'_, '_>) -> ApiResult<Owned> {
    let result = tuple::new(items.len())?;
    for (index, item) in items.iter().enumerate() {
        let value = build_item(item, values)?;
        tuple::set_item(result.borrow(), index, value)?;
    }
    Ok(result)
}

fn box_value(arg: &BuildArg<'_>) -> ApiResult<Owned> {
    match *arg {
        BuildArg::Str(None) => Ok(object::new_none()),
        BuildArg::Str(Some(text)) => string::from_str(text),
        BuildArg::Int(v) => long::from_i128(v.into()),
        BuildArg::Long(v) => long::from_i128(v.into()),
        BuildArg::LongLong(v) => long::from_i128(v.into()),
        BuildArg::Double(v) => float::from_double(v),
        BuildArg::Float(v) => float::from_double(v.into()),
        BuildArg::Object(obj) => Ok(obj.retain()),
    }
}
