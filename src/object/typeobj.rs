//! Type descriptors - static, process-wide per-type metadata
//!
//! Instances point at their descriptor but never own it.

use super::PyObject;
use core::ffi::CStr;
use core::fmt;
use core::ptr::NonNull;

/// Deallocation routine: releases owned children, then frees the object
pub type Destructor = unsafe fn(NonNull<PyObject>);

/// Numeric type identifier, stable across the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeTag(pub u32);

impl TypeTag {
    pub const NONE: Self = Self(0);
    pub const BOOL: Self = Self(1);
    pub const LONG: Self = Self(2);
    pub const FLOAT: Self = Self(3);
    pub const STR: Self = Self(4);
    pub const TUPLE: Self = Self(5);
    pub const LIST: Self = Self(6);

    /// First tag available to embedder-defined types
    pub const USER_BASE: u32 = 0x100;

    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::USER_BASE
    }
}

/// Per-type metadata (`PyTypeObject`, opaque to C)
pub struct TypeObject {
    pub name: &'static str,
    /// `name` with its NUL terminator, for C callers
    pub c_name: &'static CStr,
    pub tag: TypeTag,
    /// Size of an instance with zero items, header included
    pub basic_size: usize,
    /// Size of each trailing inline item (0 for fixed-size types)
    pub item_size: usize,
    /// Layout starts with `PyVarObject`, so `ob_size` is meaningful
    pub var_sized: bool,
    /// Single base type for `Check`-style membership tests
    pub base: Option<&'static TypeObject>,
    pub dealloc: Destructor,
}

impl TypeObject {
    pub const fn new(
        name: &'static CStr,
        tag: TypeTag,
        basic_size: usize,
        item_size: usize,
        dealloc: Destructor,
    ) -> Self {
        let text = match name.to_str() {
            Ok(text) => text,
            Err(_) => panic!("type name must be UTF-8"),
        };
        Self {
            name: text,
            c_name: name,
            tag,
            basic_size,
            item_size,
            var_sized: item_size > 0,
            base: None,
            dealloc,
        }
    }

    /// Same descriptor marked variable-size with out-of-line items
    pub const fn with_var_size(self) -> Self {
        Self {
            var_sized: true,
            ..self
        }
    }

    /// Same descriptor with `base` as its single base type
    pub const fn with_base(self, base: &'static TypeObject) -> Self {
        Self {
            base: Some(base),
            ..self
        }
    }

    /// Total instance size for `nitems` trailing items
    #[inline]
    pub fn instance_size(&self, nitems: usize) -> Option<usize> {
        self.item_size
            .checked_mul(nitems)?
            .checked_add(self.basic_size)
    }

    /// Whether `self` is `other` or has it somewhere in its base chain
    pub fn is_subtype_of(&self, other: &TypeObject) -> bool {
        let mut current = Some(self);
        while let Some(tp) = current {
            if core::ptr::eq(tp, other) {
                return true;
            }
            current = tp.base;
        }
        false
    }
}

impl fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeObject")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("basic_size", &self.basic_size)
            .field("item_size", &self.item_size)
            .field("var_sized", &self.var_sized)
            .field("base", &self.base.map(|b| b.name))
            .finish()
    }
}
