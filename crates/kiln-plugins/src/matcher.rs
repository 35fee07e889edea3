//! Constructor selection by structural type compatibility.
//!
//! A declared parameter type accepts a supplied argument when:
//!
//! 1. the two types are equal, or
//! 2. both are arrays and their element types are equal or share an
//!    interface name, or
//! 3. both declare at least one interface and their interface *name* sets
//!    intersect.
//!
//! Rule 3 is a name-based approximation of subtyping. Two unrelated
//! interfaces that happen to share a name are treated as compatible, and a
//! concrete type is compatible with any interface type that shares one of
//! its declared parents (the marker counts). Constructor factories still
//! downcast each value, so a loose match surfaces as a construction error
//! rather than as a wrongly typed value.
//!
//! # Example
//!
//! ```
//! use kiln_plugins::matcher::compatible;
//! use kiln_plugins::types::TypeRef;
//!
//! assert!(compatible(&TypeRef::of::<i32>(), &TypeRef::of::<i32>()));
//! assert!(!compatible(&TypeRef::of::<String>(), &TypeRef::of::<i32>()));
//! assert!(compatible(&TypeRef::of::<Vec<f32>>(), &TypeRef::of::<Vec<f32>>()));
//! ```

use tracing::trace;

use crate::bundle::{ConstructorDescriptor, TypeDescriptor};
use crate::types::TypeRef;

/// Returns true if an argument of runtime type `arg` may be passed for a
/// parameter declared as `param`.
#[must_use]
pub fn compatible(param: &TypeRef, arg: &TypeRef) -> bool {
    if param == arg {
        return true;
    }
    if let (Some(param_element), Some(arg_element)) = (param.element(), arg.element()) {
        return param_element == arg_element || shares_interface(param_element, arg_element);
    }
    shares_interface(param, arg)
}

/// Both types declare interfaces and at least one name is common.
fn shares_interface(a: &TypeRef, b: &TypeRef) -> bool {
    let theirs = b.interfaces();
    !theirs.is_empty() && a.interfaces().iter().any(|name| theirs.contains(name))
}

/// Returns the first constructor of `ty`, in declaration order, whose arity
/// equals `args.len()` and whose every parameter is [`compatible`] with the
/// corresponding argument.
#[must_use]
pub fn find_constructor<'t>(
    ty: &'t TypeDescriptor,
    args: &[TypeRef],
) -> Option<&'t ConstructorDescriptor> {
    ty.constructors().iter().find(|constructor| {
        if constructor.arity() != args.len() {
            trace!(
                implementation = ty.name(),
                arity = constructor.arity(),
                supplied = args.len(),
                "constructor rejected: arity"
            );
            return false;
        }
        let mismatch = constructor
            .params()
            .iter()
            .zip(args)
            .position(|(param, arg)| !compatible(param, arg));
        if let Some(index) = mismatch {
            trace!(
                implementation = ty.name(),
                index,
                param = %constructor.params()[index],
                arg = %args[index],
                "constructor rejected: parameter"
            );
        }
        mismatch.is_none()
    })
}

// =============================================================================
// Tests
// =============================================================================
