//! Format strings - the code table shared by extract and build
//!
//! Extract formats are a flat run of codes with at most one `|` marker,
//! optionally ended by `:name` or `;message`. Build formats may group
//! codes in `(...)` and ignore spaces, commas and colons between codes.

use crate::error::{ApiError, ApiResult};
use smallvec::SmallVec;

/// One format code and the native type it converts to or from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormatCode {
    /// `s`: NUL-terminated UTF-8 string
    Str = b's',
    /// `i`: C `int`
    Int = b'i',
    /// `l`: C `long`
    Long = b'l',
    /// `L`: C `long long`
    LongLong = b'L',
    /// `d`: C `double`
    Double = b'd',
    /// `f`: C `float`
    Float = b'f',
    /// `O`: boxed object reference
    Object = b'O',
}

impl FormatCode {
    #[inline]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Self::Str),
            b'i' => Some(Self::Int),
            b'l' => Some(Self::Long),
            b'L' => Some(Self::LongLong),
            b'd' => Some(Self::Double),
            b'f' => Some(Self::Float),
            b'O' => Some(Self::Object),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_char(self) -> char {
        self as u8 as char
    }

    /// Size of the native value in bytes
    #[inline]
    pub const fn native_size(self) -> usize {
        use core::ffi::{c_char, c_double, c_float, c_int, c_long, c_longlong};
        use core::mem::size_of;
        match self {
            Self::Str => size_of::<*const c_char>(),
            Self::Int => size_of::<c_int>(),
            Self::Long => size_of::<c_long>(),
            Self::LongLong => size_of::<c_longlong>(),
            Self::Double => size_of::<c_double>(),
            Self::Float => size_of::<c_float>(),
            Self::Object => size_of::<*mut crate::object::PyObject>(),
        }
    }

    /// Boxed type name used in messages
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int | Self::Long | Self::LongLong => "int",
            Self::Double | Self::Float => "float",
            Self::Object => "object",
        }
    }
}

/// Parsed extract format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractFormat<'f> {
    pub codes: SmallVec<[FormatCode; 8]>,
    /// Number of mandatory codes (those before `|`)
    pub required: usize,
    /// Function name from a `:name` suffix
    pub function: Option<&'f str>,
    /// Replacement message from a `;message` suffix
    pub message: Option<&'f str>,
}

impl<'f> ExtractFormat<'f> {
    pub fn parse(format: &'f str) -> ApiResult<Self> {
        let mut codes = SmallVec::new();
        let mut optional_at = None;
        let mut function = None;
        let mut message = None;

        for (pos, byte) in format.bytes().enumerate() {
            match byte {
                b'|' if optional_at.is_some() => {
                    return Err(ApiError::bad_format(format, "more than one '|'"));
                }
                b'|' => optional_at = Some(codes.len()),
                b':' => {
                    function = Some(&format[pos + 1..]);
                    break;
                }
                b';' => {
                    message = Some(&format[pos + 1..]);
                    break;
                }
                _ => match FormatCode::from_byte(byte) {
                    Some(code) => codes.push(code),
                    None => {
                        return Err(ApiError::bad_format(
                            format,
                            format!("unknown code '{}'", byte as char),
                        ))
                    }
                },
            }
        }

        let required = optional_at.unwrap_or(codes.len());
        Ok(Self {
            codes,
            required,
            function,
            message,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Name for log lines about this call
    #[inline]
    pub fn function_name(&self) -> &'f str {
        self.function.unwrap_or("function")
    }
}

/// One element of a build format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildItem {
    Code(FormatCode),
    Tuple(Vec<BuildItem>),
}

impl BuildItem {
    /// Number of native values this item consumes
    pub fn arity(&self) -> usize {
        match self {
            Self::Code(_) => 1,
            Self::Tuple(items) => items.iter().map(Self::arity).sum(),
        }
    }
}

/// Parsed build format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFormat {
    pub items: Vec<BuildItem>,
}

impl BuildFormat {
    pub fn parse(format: &str) -> ApiResult<Self> {
        // Stack of open groups; the bottom entry is the top level
        let mut stack: SmallVec<[Vec<BuildItem>; 4]> = SmallVec::new();
        stack.push(Vec::new());

        for byte in format.bytes() {
            match byte {
                b' ' | b'\t' | b',' | b':' => {}
                b'(' => stack.push(Vec::new()),
                b')' => {
                    if stack.len() == 1 {
                        return Err(ApiError::bad_format(format, "unmatched ')'"));
                    }
                    if let Some(group) = stack.pop() {
                        push_item(&mut stack, BuildItem::Tuple(group));
                    }
                }
                _ => match FormatCode::from_byte(byte) {
                    Some(code) => push_item(&mut stack, BuildItem::Code(code)),
                    None => {
                        return Err(ApiError::bad_format(
                            format,
                            format!("unknown code '{}'", byte as char),
                        ))
                    }
                },
            }
        }

        if stack.len() != 1 {
            return Err(ApiError::bad_format(format, "unmatched '('"));
        }
        Ok(Self {
            items: stack.pop().unwrap_or_default(),
        })
    }

    /// Number of native values the whole format consumes
    pub fn arity(&self) -> usize {
        self.items.iter().map(BuildItem::arity).sum()
    }

    /// Codes in the order their values are consumed
    pub fn flat_codes(&self) -> SmallVec<[FormatCode; 8]> {
        fn walk(items: &[BuildItem], out: &mut SmallVec<[FormatCode; 8]>) {
            for item in items {
                match item {
                    BuildItem::Code(code) => out.push(*code),
                    BuildItem::Tuple(inner) => walk(inner, out),
                }
            }
        }
        let mut out = SmallVec::new();
        walk(&self.items, &mut out);
        out
    }
}

fn push_item(stack: &mut SmallVec<[Vec<BuildItem>; 4]>, item: BuildItem) {
    if let Some(top) = stack.last_mut() {
        top.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain() {
        let f = ExtractFormat::parse("lld").unwrap();
        assert_eq!(f.codes.as_slice(), &[FormatCode::Long, FormatCode::Long, FormatCode::Double]);
        assert_eq!(f.required, 3);
        assert!(f.function.is_none());
    }

    #[test]
    fn test_extract_optional_and_name() {
        let f = ExtractFormat::parse("s|iO:connect").unwrap();
        assert_eq!(f.len(), 3);
        assert_eq!(f.required, 1);
        assert_eq!(f.function, Some("connect"));
        assert_eq!(f.function_name(), "connect");

        let f = ExtractFormat::parse("i;expected one int").unwrap();
        assert_eq!(f.message, Some("expected one int"));
        assert_eq!(f.required, 1);
    }

    #[test]
    fn test_extract_rejects_bad_input() {
        assert!(matches!(ExtractFormat::parse("l|l|l"), Err(ApiError::BadFormat { .. })));
        assert!(matches!(ExtractFormat::parse("lx"), Err(ApiError::BadFormat { .. })));
        assert!(matches!(ExtractFormat::parse("(ll)"), Err(ApiError::BadFormat { .. })));
    }

    #[test]
    fn test_empty_extract() {
        let f = ExtractFormat::parse("").unwrap();
        assert!(f.is_empty());
        assert_eq!(f.required, 0);
        let f = ExtractFormat::parse("|").unwrap();
        assert_eq!(f.required, 0);
    }

    #[test]
    fn test_build_nesting() {
        let f = BuildFormat::parse("l(dO), s").unwrap();
        assert_eq!(f.arity(), 4);
        assert_eq!(
            f.items,
            vec![
                BuildItem::Code(FormatCode::Long),
                BuildItem::Tuple(vec![
                    BuildItem::Code(FormatCode::Double),
                    BuildItem::Code(FormatCode::Object),
                ]),
                BuildItem::Code(FormatCode::Str),
            ]
        );
        assert_eq!(
            f.flat_codes().as_slice(),
            &[FormatCode::Long, FormatCode::Double, FormatCode::Object, FormatCode::Str]
        );
    }

    #[test]
    fn test_build_unbalanced() {
        assert!(matches!(BuildFormat::parse("(ll"), Err(ApiError::BadFormat { .. })));
        assert!(matches!(BuildFormat::parse("ll)"), Err(ApiError::BadFormat { .. })));
        assert!(matches!(BuildFormat::parse("l|l"), Err(ApiError::BadFormat { .. })));
    }

    #[test]
    fn test_native_sizes() {
        assert_eq!(FormatCode::Int.native_size(), 4);
        assert_eq!(FormatCode::LongLong.native_size(), 8);
        assert_eq!(FormatCode::Double.native_size(), 8);
        assert_eq!(FormatCode::Float.native_size(), 4);
        assert_eq!(FormatCode::Object.as_char(), 'O');
    }
}
