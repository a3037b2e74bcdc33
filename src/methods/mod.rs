//! Native methods - descriptors, calling conventions and dispatch
//!
//! Extension modules describe their functions with `PyMethodDef` tables.
//! Each entry's flags select how the function receives its arguments;
//! dispatch checks the call shape against those flags before invoking.

mod def;
mod dispatch;
mod table;

#[cfg(test)]
mod tests;

pub use def::{
    PyCFunction, PyCFunctionWithKeywords, PyMethodDef, METH_KEYWORDS, METH_NOARGS, METH_O, METH_VARARGS,
};
pub use dispatch::{call_method, CallConvention, Method};
pub use table::MethodTable;
