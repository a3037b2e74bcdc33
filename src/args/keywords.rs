//! Keyword-aware extract
//!
//! Each format position has a declared keyword name; an empty name makes
//! the position positional-only. Positions are filled from the argument
//! tuple first, then by name. Supplying a position both ways, repeating a
//! name, or naming no declared keyword fails the whole call.
//!
//! The mapping type lives outside this runtime, so keywords arrive through
//! `KeywordSource`: a Rust list of pairs, or a boxed sequence of
//! `(str, object)` 2-tuples from C.

use super::format::ExtractFormat;
use super::parse::{check_outputs, convert, log_failure, Extracted};
use super::slots::OutputSlot;
use crate::builtins::{self, string, tuple};
use crate::error::{ApiError, ApiResult};
use crate::refcount::Borrowed;
use smallvec::SmallVec;

pub type KeywordEntries<'a> = SmallVec<[(&'a str, Borrowed<'a>); 8]>;

/// Provider of `(name, value)` keyword arguments
pub trait KeywordSource<'a> {
    fn entries(&self) -> ApiResult<KeywordEntries<'a>>;
}

/// No keyword arguments supplied
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeywords;

impl<'a> KeywordSource<'a> for NoKeywords {
    fn entries(&self) -> ApiResult<KeywordEntries<'a>> {
        Ok(SmallVec::new())
    }
}

impl<'a, const N: usize> KeywordSource<'a> for [(&'a str, Borrowed<'a>); N] {
    fn entries(&self) -> ApiResult<KeywordEntries<'a>> {
        Ok(self.iter().copied().collect())
    }
}

impl<'a> KeywordSource<'a> for Vec<(&'a str, Borrowed<'a>)> {
    fn entries(&self) -> ApiResult<KeywordEntries<'a>> {
        Ok(self.iter().copied().collect())
    }
}

/// Keywords held in a boxed tuple or list of `(str, object)` 2-tuples
#[derive(Debug, Clone, Copy)]
pub struct KeywordPairs<'a> {
    obj: Borrowed<'a>,
}

impl<'a> KeywordPairs<'a> {
    /// Validate the shape of `obj` and wrap it
    pub fn from_object(obj: Borrowed<'a>) -> ApiResult<Self> {
        let pairs = Self { obj };
        pairs.entries()?;
        Ok(pairs)
    }

    pub fn len(&self) -> usize {
        builtins::sequence_slots(self.obj).map_or(0, |slots| slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> KeywordSource<'a> for KeywordPairs<'a> {
    fn entries(&self) -> ApiResult<KeywordEntries<'a>> {
        let mut entries = SmallVec::new();
        for pair in builtins::sequence_items(self.obj)? {
            let pair = pair?;
            let len = tuple::len(pair)?;
            if len != 2 {
                return Err(ApiError::Arity { min: 2, max: 2, found: len });
            }
            let name = string::as_str(tuple::get_item(pair, 0)?)?;
            entries.push((name, tuple::get_item(pair, 1)?));
        }
        Ok(entries)
    }
}

/// Convert positional and keyword arguments per `format` and `keywords`
pub fn extract_keywords<'a>(
    args: Borrowed<'a>,
    kwargs: &dyn KeywordSource<'a>,
    format: &str,
    keywords: &[&str],
) -> ApiResult<Extracted<'a>> {
    let fmt = ExtractFormat::parse(format)?;
    extract_keywords_parsed(args, kwargs, &fmt, format, keywords)
}

fn extract_keywords_parsed<'a>(
    args: Borrowed<'a>,
    kwargs: &dyn KeywordSource<'a>,
    fmt: &ExtractFormat<'_>,
    format: &str,
    keywords: &[&str],
) -> ApiResult<Extracted<'a>> {
    if keywords.len() != fmt.len() {
        return Err(ApiError::bad_format(
            format,
            format!("{} codes but {} keyword names", fmt.len(), keywords.len()),
        ));
    }

    let positional = tuple::slots(args)?;
    let nargs = positional.len();
    let entries = kwargs.entries()?;
    if nargs > fmt.len() {
        return Err(ApiError::Arity {
            min: fmt.required,
            max: fmt.len(),
            found: nargs + entries.len(),
        });
    }

    // Resolve each keyword to its position
    let mut by_position: SmallVec<[Option<Borrowed<'a>>; 8]> = SmallVec::from_elem(None, fmt.len());
    for &(name, value) in &entries {
        let position = keywords
            .iter()
            .position(|kw| !kw.is_empty() && *kw == name)
            .ok_or_else(|| ApiError::UnknownKeyword { name: name.to_string() })?;
        if position < nargs || by_position[position].is_some() {
            return Err(ApiError::DuplicateArgument { name: name.to_string() });
        }
        by_position[position] = Some(value);
    }

    let mut values = SmallVec::with_capacity(fmt.len());
    for (index, &code) in fmt.codes.iter().enumerate() {
        let supplied = match positional.get(index) {
            Some(slot) => {
                let item = slot.get().ok_or(ApiError::UninitializedSlot { index: index as isize })?;
                Some(unsafe { Borrowed::from_non_null(item) })
            }
            None => by_position[index],
        };

        let value = match supplied {
            Some(obj) => Some(convert(code, obj)?),
            None if index < fmt.required => return Err(missing(keywords[index], fmt, nargs, &entries)),
            None => None,
        };
        values.push(value);
    }
    Ok(Extracted::new(values))
}

fn missing(name: &str, fmt: &ExtractFormat<'_>, nargs: usize, entries: &KeywordEntries<'_>) -> ApiError {
    if name.is_empty() {
        ApiError::Arity {
            min: fmt.required,
            max: fmt.len(),
            found: nargs + entries.len(),
        }
    } else {
        ApiError::MissingArgument { name: name.to_string() }
    }
}

/// `PyArg_ParseTupleAndKeywords`: extract into `outputs`, all or nothing
pub fn parse_tuple_and_keywords<'a, S: OutputSlot<'a>>(
    args: Borrowed<'a>,
    kwargs: &dyn KeywordSource<'a>,
    format: &str,
    keywords: &[&str],
    outputs: &mut [S],
) -> ApiResult<()> {
    let fmt = ExtractFormat::parse(format)?;
    check_outputs(&fmt, format, outputs)?;

    match extract_keywords_parsed(args, kwargs, &fmt, format, keywords) {
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
