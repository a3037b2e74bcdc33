//! Argument marshalling - format-string driven extract and build
//!
//! Design: a format string is parsed once into codes, then driven against
//! tagged slots instead of C varargs:
//! 1. `parse`: argument tuple -> staged native values -> output slots
//! 2. `keywords`: the same with values resolved by keyword name
//! 3. `build`: tagged native values -> new boxed object

pub mod build;
pub mod format;
pub mod keywords;
pub mod parse;
pub mod slots;


pub use build::build_value;
pub use format::{BuildFormat, BuildItem, ExtractFormat, FormatCode};
pub use keywords::{
    extract_keywords, parse_tuple_and_keywords, KeywordPairs, KeywordSource, NoKeywords,
};
pub use parse::{convert, extract, parse_tuple, Extracted};
pub use slots::{BuildArg, Converted, Output, OutputSlot, PyArgSlot, PyBuildArg, PyBuildValue};
