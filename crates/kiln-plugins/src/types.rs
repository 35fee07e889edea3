//! Runtime type identities and type-erased constructor arguments.
//!
//! Constructor selection works on [`TypeRef`]s rather than Rust's static
//! types: a bundle declares the parameter types of each constructor, and a
//! caller supplies [`Argument`]s that carry their own runtime type. The
//! matcher compares the two (see [`crate::matcher`]).
//!
//! # Example
//!
//! ```
//! use kiln_plugins::types::{Argument, Arguments, TypeRef};
//!
//! let mut args = Arguments::from(vec![
//!     Argument::new(vec![0.0_f32, 1.0]),
//!     Argument::new(0.5_f32),
//! ]);
//!
//! let names: Vec<String> = args.types().iter().map(ToString::to_string).collect();
//! assert_eq!(names, ["f32[]", "f32"]);
//! assert_eq!(args.take::<f32>(1).unwrap(), 0.5);
//! ```

use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt;

use glam::{UVec2, Vec2};
use serde::Serialize;

use crate::capability::Capability;
use crate::erased::ErasedBox;
use crate::error::ConstructError;

// =============================================================================
// Type Reference
// =============================================================================

/// Runtime identity of a type as seen by constructor matching.
///
/// Two `TypeRef`s are equal when they name the same type; the interface
/// list is metadata and does not take part in equality.
#[derive(Debug, Clone, Serialize)]
pub enum TypeRef {
    /// A named type with the interfaces it declares.
    Named {
        /// Type name.
        name: Cow<'static, str>,
        /// Declared interface names, in declaration order.
        interfaces: Vec<Cow<'static, str>>,
    },
    /// A homogeneous sequence.
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// A named type declaring no interfaces.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named {
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    /// An array of `element`.
    #[must_use]
    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// The runtime type of `T`.
    #[must_use]
    pub fn of<T: Reflect>() -> Self {
        T::type_ref()
    }

    /// The interface type of capability `C`: its name, declaring the
    /// interfaces `C` derives from.
    #[must_use]
    pub fn capability<C: Capability + ?Sized>() -> Self {
        Self::named(C::DECLARATION.name).implementing(C::DECLARATION.extends.iter().copied())
    }

    /// Adds declared interfaces. Arrays declare none, so this is a no-op on
    /// an array.
    #[must_use]
    pub fn implementing<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        if let Self::Named { interfaces, .. } = &mut self {
            interfaces.extend(names.into_iter().map(Into::into));
        }
        self
    }

    /// Declared interface names.
    #[must_use]
    pub fn interfaces(&self) -> &[Cow<'static, str>] {
        match self {
            Self::Named { interfaces, .. } => interfaces,
            Self::Array(_) => &[],
        }
    }

    /// Element type, if this is an array.
    #[must_use]
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            Self::Named { .. } => None,
            Self::Array(element) => Some(element),
        }
    }

    /// Returns true if this is an array type.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named { name: a, .. }, Self::Named { name: b, .. }) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeRef {}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, .. } => f.write_str(name),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}

// =============================================================================
// Reflect
// =============================================================================

/// Types that know their own [`TypeRef`] and can travel as an [`Argument`].
pub trait Reflect: Any + Send {
    /// The runtime type of `Self`.
    fn type_ref() -> TypeRef;
}

macro_rules! impl_reflect {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_ref() -> TypeRef {
                    TypeRef::named($name)
                }
            }
        )*
    };
}

impl_reflect! {
    bool => "bool",
    i32 => "i32",
    i64 => "i64",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    String => "String",
    Vec2 => "Vec2",
    UVec2 => "UVec2",
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::array_of(T::type_ref())
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// A type-erased constructor argument tagged with its runtime type.
pub struct Argument {
    value: ErasedBox,
    runtime_type: TypeRef,
}

impl Argument {
    /// Wraps a value whose runtime type is known statically.
    #[must_use]
    pub fn new<T: Reflect>(value: T) -> Self {
        Self {
            value: ErasedBox::new(value),
            runtime_type: T::type_ref(),
        }
    }

    /// Wraps a value under an explicit runtime type.
    ///
    /// Used for values whose runtime type is not their Rust type, such as a
    /// boxed capability passed on to another backend.
    #[must_use]
    pub fn with_type<T: Any + Send>(value: T, runtime_type: TypeRef) -> Self {
        Self {
            value: ErasedBox::new(value),
            runtime_type,
        }
    }

    /// The runtime type this argument was tagged with.
    #[must_use]
    pub fn runtime_type(&self) -> &TypeRef {
        &self.runtime_type
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("runtime_type", &self.runtime_type)
            .finish_non_exhaustive()
    }
}

/// The ordered argument list handed to a constructor factory.
///
/// Factories take each value out exactly once, by position.
#[derive(Debug, Default)]
pub struct Arguments {
    slots: Vec<Option<Argument>>,
    types: Vec<TypeRef>,
}

impl Arguments {
    /// An empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of arguments supplied, taken or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runtime types of the supplied arguments, in order.
    #[must_use]
    pub fn types(&self) -> &[TypeRef] {
        &self.types
    }

    /// Takes the value at `index` out of the list.
    ///
    /// # Errors
    ///
    /// [`ConstructError::MissingArgument`] if there is no value at `index`
    /// (or it was already taken); [`ConstructError::ArgumentType`] if the
    /// value is not a `T`, in which case it stays in place.
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, ConstructError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ConstructError::MissingArgument { index })?;
        let argument = slot.take().ok_or(ConstructError::MissingArgument { index })?;
        match argument.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                *slot = Some(Argument {
                    value,
                    runtime_type: argument.runtime_type,
                });
                Err(ConstructError::ArgumentType {
                    index,
                    expected: type_name::<T>(),
                })
            }
        }
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(arguments: Vec<Argument>) -> Self {
        arguments.into_iter().collect()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        let slots: Vec<Option<Argument>> = iter.into_iter().map(Some).collect();
        let types = slots
            .iter()
            .flatten()
            .map(|argument| argument.runtime_type.clone())
            .collect();
        Self { slots, types }
    }
}

// =============================================================================
// Tests
// =============================================================================
