//! Type-erased values that survive the bundle boundary.
//!
//! A bundle built as a `cdylib` statically links its own copy of this crate
//! and of every type it shares with the host. `TypeId`s computed on one side
//! do not match those computed on the other, so a `Box<dyn Any>` boxed by the
//! host cannot be downcast by the bundle, and vice versa.
//!
//! [`ErasedBox`] records a [`TypeTag`] (type name, size and alignment) when a
//! value is boxed. Unboxing first tries the `TypeId`, then falls back to the
//! tag. The fallback is sound only when both sides were built by the same
//! compiler against the same crate versions, which is the bundle ABI
//! contract checked through [`BUNDLE_ABI_VERSION`](crate::bundle::BUNDLE_ABI_VERSION).

use std::any::{type_name, Any};
use std::fmt;
use std::mem::{align_of, size_of};

// =============================================================================
// Type Tag
// =============================================================================

/// Identity of a Rust type that does not depend on `TypeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTag {
    name: &'static str,
    size: usize,
    align: usize,
}

impl TypeTag {
    /// The tag of `T`.
    #[must_use]
    pub fn of<T>() -> Self {
        Self {
            name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }

    /// Fully qualified Rust type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Erased Box
// =============================================================================

/// An owned value of some `Send` type, tagged with that type.
pub struct ErasedBox {
    value: Box<dyn Any + Send>,
    tag: TypeTag,
}

impl ErasedBox {
    /// Boxes `value`.
    #[must_use]
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            tag: TypeTag::of::<T>(),
        }
    }

    /// The tag recorded when the value was boxed.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Returns true if the value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>() || self.tag == TypeTag::of::<T>()
    }

    /// Unboxes the value as a `T`, or hands it back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `self` if the value is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<Box<T>, Self> {
        if self.value.is::<T>() {
            let Self { value, tag } = self;
            return value.downcast::<T>().map_err(|value| Self { value, tag });
        }
        if self.tag != TypeTag::of::<T>() {
            return Err(self);
        }
        let raw = Box::into_raw(self.value).cast::<T>();
        // SAFETY: the value was boxed as a type with the same name, size and
        // alignment as `T` by another copy of this crate built under the same
        // bundle ABI contract, so it is a `T`. Both sides use the global
        // allocator the box was allocated with.
        Ok(unsafe { Box::from_raw(raw) })
    }
}

impl fmt::Debug for ErasedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedBox")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Borrows `value` as a `T`, judged by `TypeId` or by `tag`.
///
/// `tag` must be the tag recorded when `value` was boxed.
pub(crate) fn downcast_ref<T: Any>(value: &(dyn Any + Send + Sync), tag: TypeTag) -> Option<&T> {
    if let Some(value) = value.downcast_ref::<T>() {
        return Some(value);
    }
    if tag != TypeTag::of::<T>() {
        return None;
    }
    let raw = std::ptr::from_ref(value).cast::<T>();
    // SAFETY: same argument as `ErasedBox::downcast`; the borrow keeps the
    // pointee alive for the returned lifetime.
    Some(unsafe { &*raw })
}

// =============================================================================
// Tests
// =============================================================================
