//! Type registry - maps a type tag to its static descriptor
//!
//! Builtin types are present from first use. Embedders may add their own
//! `'static` descriptors under tags at or above `TypeTag::USER_BASE`.

use super::{TypeObject, TypeTag};
use crate::builtins::{float::FLOAT_TYPE, list::LIST_TYPE, long::{BOOL_TYPE, LONG_TYPE}};
use crate::builtins::{string::STR_TYPE, tuple::TUPLE_TYPE};
use crate::error::{ApiError, ApiResult};
use crate::logging::debug;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

static REGISTRY: Lazy<DashMap<u32, &'static TypeObject>> = Lazy::new(|| {
    let map = DashMap::new();
    for tp in builtin_types() {
        map.insert(tp.tag.0, tp);
    }
    map
});

/// Descriptors of every builtin type
pub fn builtin_types() -> [&'static TypeObject; 7] {
    [
        &super::singletons::NONE_TYPE,
        &BOOL_TYPE,
        &LONG_TYPE,
        &FLOAT_TYPE,
        &STR_TYPE,
        &TUPLE_TYPE,
        &LIST_TYPE,
    ]
}

/// Find the descriptor registered under `tag`
pub fn lookup(tag: TypeTag) -> Option<&'static TypeObject> {
    REGISTRY.get(&tag.0).map(|entry| *entry.value())
}

/// Register an embedder type
///
/// Registering the same descriptor twice is a no-op; a different
/// descriptor under a taken tag is rejected.
pub fn register(tp: &'static TypeObject) -> ApiResult<()> {
    if tp.tag.is_builtin() {
        return Err(ApiError::TypeTagInUse { tag: tp.tag.0 });
    }

    match REGISTRY.entry(tp.tag.0) {
        Entry::Occupied(existing) if core::ptr::eq(*existing.get(), tp) => Ok(()),
        Entry::Occupied(_) => Err(ApiError::TypeTagInUse { tag: tp.tag.0 }),
        Entry::Vacant(slot) => {
            debug!(type_name = tp.name, tag = tp.tag.0, "Type registered");
            slot.insert(tp);
            Ok(())
        }
    }
}

/// Number of registered types, builtins included
pub fn registered_count() -> usize {
    REGISTRY.len()
}
