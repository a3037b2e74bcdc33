//! Extract direction - boxed argument tuple to native values
//!
//! Staged: every code is converted into a `Converted` first and outputs
//! are written only once the whole format has succeeded, so a failed call
//! leaves every output untouched. `O` yields borrowed references, so no
//! outcome hands the caller a reference it must release.

use super::format::{ExtractFormat, FormatCode};
use super::slots::{Converted, OutputSlot};
use crate::builtins::{float, long, string, tuple};
use crate::error::{ApiError, ApiResult};
use crate::logging::debug;
use crate::refcount::Borrowed;
use core::ffi::{c_float, c_int, c_long, c_longlong};
use smallvec::SmallVec;

/// Staged extraction result, one entry per format code
///
/// `None` marks an optional position the caller did not supply.
#[derive(Debug)]
pub struct Extracted<'a> {
    values: SmallVec<[Option<Converted<'a>>; 8]>,
}

impl<'a> Extracted<'a> {
    pub(crate) fn new(values: SmallVec<[Option<Converted<'a>>; 8]>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Converted<'a>> {
        self.values.get(index).copied().flatten()
    }

    /// Write every supplied value; unsupplied optional outputs keep their value
    pub fn write_to<S: OutputSlot<'a>>(self, outputs: &mut [S]) {
        for (value, slot) in self.values.into_iter().zip(outputs.iter_mut()) {
            if let Some(value) = value {
                slot.store(value);
            }
        }
    }
}

/// Convert one boxed argument according to `code`
pub fn convert<'a>(code: FormatCode, obj: Borrowed<'a>) -> ApiResult<Converted<'a>> {
    Ok(match code {
        FormatCode::Str => Converted::Str(string::as_c_str(obj)?),
        FormatCode::Int => Converted::Int(long::as_native::<c_int>(obj, "int")?),
        FormatCode::Long => Converted::Long(long::as_native::<c_long>(obj, "long")?),
        FormatCode::LongLong => Converted::LongLong(long::as_native::<c_longlong>(obj, "long long")?),
        FormatCode::Double => Converted::Double(float::as_double(obj)?),
        FormatCode::Float => Converted::Float(float::as_double(obj)? as c_float),
        FormatCode::Object => Converted::Object(obj),
    })
}

/// Convert the positional arguments in `args` per `format`
pub fn extract<'a>(args: Borrowed<'a>, format: &str) -> ApiResult<Extracted<'a>> {
    let fmt = ExtractFormat::parse(format)?;
    extract_parsed(args, &fmt)
}

pub(crate) fn extract_parsed<'a>(args: Borrowed<'a>, fmt: &ExtractFormat<'_>) -> ApiResult<Extracted<'a>> {
    let items = tuple::slots(args)?;
    let nargs = items.len();
    if nargs < fmt.required || nargs > fmt.len() {
        return Err(ApiError::Arity {
            min: fmt.required,
            max: fmt.len(),
            found: nargs,
        });
    }

    let mut values = SmallVec::with_capacity(fmt.len());
    for (index, &code) in fmt.codes.iter().enumerate() {
        let value = match items.get(index) {
            Some(slot) => {
                let item = slot.get().ok_or(ApiError::UninitializedSlot { index: index as isize })?;
                Some(convert(code, unsafe { Borrowed::from_non_null(item) })?)
            }
            None => None,
        };
        values.push(value);
    }
    Ok(Extracted::new(values))
}

/// Check that `outputs` lines up with the format, one slot per code
pub(crate) fn check_outputs<'a, S: OutputSlot<'a>>(
    fmt: &ExtractFormat<'_>,
    format: &str,
    outputs: &[S],
) -> ApiResult<()> {
    if outputs.len() != fmt.len() {
        return Err(ApiError::bad_format(
            format,
            format!("{} codes but {} output slots", fmt.len(), outputs.len()),
        ));
    }
    for (position, (code, slot)) in fmt.codes.iter().zip(outputs).enumerate() {
        if slot.code_char() != code.as_char() {
            return Err(ApiError::SlotMismatch {
                position,
                expected: code.as_char(),
                found: slot.code_char(),
            });
        }
    }
    Ok(())
}

/// `PyArg_ParseTuple`: extract `args` into `outputs`, all or nothing
pub fn parse_tuple<'a, S: OutputSlot<'a>>(
    args: Borrowed<'a>,
    format: &str,
    outputs: &mut [S],
) -> ApiResult<()> {
    let fmt = ExtractFormat::parse(format)?;
    check_outputs(&fmt, format, outputs)?;

    match extract_parsed(args, &fmt) {
        Ok(values) => {
            values.write_to(outputs);
            Ok(())
        }
        Err(err) => {
            log_failure(&fmt, &err);
            Err(err)
        }
    }
}

pub(crate) fn log_failure(fmt: &ExtractFormat<'_>, err: &ApiError) {
    match fmt.message {
        Some(message) => debug!(function = fmt.function_name(), error = %err, "{}", message),
        None => debug!(function = fmt.function_name(), error = %err, "Argument extraction failed"),
    }
}
