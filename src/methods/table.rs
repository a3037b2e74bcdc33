//! Method tables - sentinel-terminated `PyMethodDef` arrays

use super::def::PyMethodDef;
use super::dispatch::Method;
use crate::error::{ApiError, ApiResult};
use crate::logging::debug;
use crate::refcount::{Borrowed, Owned};

/// Validated lookup table over a module's method definitions
///
/// Every entry is checked once at construction; lookups and calls then
/// work on the validated copies. The first entry wins if a name repeats.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: Vec<Method>,
}

impl MethodTable {
    /// Read entries up to the `{NULL, NULL, 0, NULL}` sentinel
    ///
    /// # Safety
    /// `defs` must point to a sentinel-terminated array whose entries
    /// satisfy `Method::from_def`.
    pub unsafe fn from_sentinel(defs: *const PyMethodDef) -> ApiResult<Self> {
        if defs.is_null() {
            return Err(ApiError::NullReference);
        }

        let mut methods = Vec::new();
        let mut cursor = defs;
        while !(*cursor).is_sentinel() {
            methods.push(Method::from_def(&*cursor)?);
            cursor = cursor.add(1);
        }

        debug!(methods = methods.len(), "Loaded method table");
        Ok(Self { methods })
    }

    /// Read entries from a slice, stopping early at a sentinel
    ///
    /// # Safety
    /// Every entry before the sentinel must satisfy `Method::from_def`.
    pub unsafe fn from_slice(defs: &[PyMethodDef]) -> ApiResult<Self> {
        let methods = defs
            .iter()
            .take_while(|def| !def.is_sentinel())
            .map(|def| Method::from_def(def))
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(Self { methods })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn find(&self, name: &str) -> ApiResult<&Method> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| ApiError::UnknownMethod { name: name.to_string() })
    }

    /// Look up `name` and dispatch per its calling convention
    pub fn call(
        &self,
        name: &str,
        slf: Option<Borrowed<'_>>,
        args: Option<Borrowed<'_>>,
        kwargs: Option<Borrowed<'_>>,
    ) -> ApiResult<Owned> {
        self.find(name)?.call(slf, args, kwargs)
    }
}
