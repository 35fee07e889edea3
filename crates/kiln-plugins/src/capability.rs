//! Capability declarations and discovery.
//!
//! A *capability* is a pluggable role the engine delegates to a backend:
//! rendering, physics bodies, input devices. The host declares each one as a
//! Rust trait deriving from the marker trait [`Component`], and ties the
//! trait object type to a [`CapabilityDeclaration`] through the
//! [`Capability`] trait.
//!
//! The set of capabilities is closed at host compile time.
//! [`CapabilityInterfaceSet::discover`] scans the declarations and keeps every
//! one that derives from the marker, is not the marker itself, and has a name
//! of at least two characters.
//!
//! # Example
//!
//! ```
//! use kiln_plugins::capability::{
//!     CapabilityDeclaration, CapabilityInterfaceSet, MARKER,
//! };
//!
//! let declarations = [
//!     MARKER,
//!     CapabilityDeclaration::derived("Renderer"),
//!     CapabilityDeclaration::derived("PhysicsBody"),
//! ];
//!
//! let set = CapabilityInterfaceSet::discover_from(&declarations);
//! assert_eq!(set.names().collect::<Vec<_>>(), ["Renderer", "PhysicsBody"]);
//! assert!(!set.is_recognized("Component"));
//! ```

use std::fmt;

use serde::Serialize;

// =============================================================================
// Marker
// =============================================================================

/// Name of the marker capability every capability and implementation derives from.
pub const MARKER_NAME: &str = "Component";

/// Declaration of the marker capability itself.
pub const MARKER: CapabilityDeclaration = CapabilityDeclaration {
    name: MARKER_NAME,
    extends: &[],
};

/// Marker trait for everything a backend bundle can hand to the engine.
///
/// Capability traits are subtraits of `Component`; implementations must be
/// `Send` so a constructed backend can move to the thread that drives it.
pub trait Component: Send + 'static {
    /// Short human-readable name of the concrete implementation.
    fn component_name(&self) -> &str;
}

// =============================================================================
// Declarations
// =============================================================================

/// Compile-time description of one capability interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDeclaration {
    /// Capability name, used as the catalog key.
    pub name: &'static str,
    /// Names of the interfaces this capability derives from.
    pub extends: &'static [&'static str],
}

impl CapabilityDeclaration {
    /// Declares a capability deriving directly from the marker.
    #[must_use]
    pub const fn derived(name: &'static str) -> Self {
        Self {
            name,
            extends: &[MARKER_NAME],
        }
    }

    /// Returns true if this declaration derives from the marker.
    #[must_use]
    pub fn extends_marker(&self) -> bool {
        self.extends.contains(&MARKER_NAME)
    }

    /// Returns true if this declaration is the marker itself.
    #[must_use]
    pub fn is_marker(&self) -> bool {
        self.name == MARKER_NAME
    }
}

/// Ties a capability trait object type to its declaration.
///
/// Implemented for `dyn Trait` types, so that resolution is driven by the
/// type the caller asks for:
///
/// ```
/// use kiln_plugins::capability::{Capability, CapabilityDeclaration, Component};
///
/// pub trait Audio: Component {
///     fn play(&mut self, clip: &str);
/// }
///
/// impl Capability for dyn Audio {
///     const DECLARATION: CapabilityDeclaration = CapabilityDeclaration::derived("Audio");
/// }
///
/// assert_eq!(<dyn Audio as Capability>::DECLARATION.name, "Audio");
/// ```
pub trait Capability: 'static {
    /// Declaration of this capability.
    const DECLARATION: CapabilityDeclaration;

    /// Shorthand for the declared name.
    #[must_use]
    fn name() -> &'static str {
        Self::DECLARATION.name
    }
}

// =============================================================================
// Capability Interface
// =============================================================================

/// A discovered capability interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CapabilityInterface {
    name: &'static str,
    is_marker: bool,
}

impl CapabilityInterface {
    fn from_declaration(declaration: &CapabilityDeclaration) -> Self {
        Self {
            name: declaration.name,
            is_marker: declaration.is_marker(),
        }
    }

    /// Capability name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the marker capability.
    #[must_use]
    pub fn is_marker(&self) -> bool {
        self.is_marker
    }

    /// Name with a conventional interface prefix removed.
    ///
    /// A single leading `I` followed by an uppercase letter is treated as the
    /// prefix (`IRenderer` becomes `Renderer`); any other name is returned
    /// unchanged.
    #[must_use]
    pub fn stem(&self) -> &'static str {
        let mut chars = self.name.chars();
        match (chars.next(), chars.next()) {
            (Some('I'), Some(next)) if next.is_ascii_uppercase() => &self.name[1..],
            _ => self.name,
        }
    }
}

impl fmt::Display for CapabilityInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Capability Interface Set
// =============================================================================

/// The authoritative list of capability interfaces known to the host.
///
/// Order follows declaration order, which keeps diagnostics stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityInterfaceSet {
    interfaces: Vec<CapabilityInterface>,
}

impl CapabilityInterfaceSet {
    /// Discovers the host's built-in capabilities.
    ///
    /// See [`crate::interfaces::HOST_CAPABILITIES`].
    #[must_use]
    pub fn discover() -> Self {
        Self::discover_from(crate::interfaces::HOST_CAPABILITIES)
    }

    /// Discovers capabilities from an explicit declaration list.
    ///
    /// Keeps every declaration that derives from the marker, is not the
    /// marker, and has a name of at least two characters. Duplicate names
    /// are kept once.
    #[must_use]
    pub fn discover_from(declarations: &[CapabilityDeclaration]) -> Self {
        let mut interfaces: Vec<CapabilityInterface> = Vec::new();
        for declaration in declarations {
            if declaration.is_marker()
                || !declaration.extends_marker()
                || declaration.name.chars().count() < 2
            {
                continue;
            }
            if interfaces.iter().any(|i| i.name == declaration.name) {
                continue;
            }
            interfaces.push(CapabilityInterface::from_declaration(declaration));
        }
        Self { interfaces }
    }

    /// Returns true iff `name` is a discovered capability.
    #[must_use]
    pub fn is_recognized(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Looks up a discovered capability by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CapabilityInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Iterates over the discovered capabilities in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CapabilityInterface> {
        self.interfaces.iter()
    }

    /// Iterates over the discovered capability names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.interfaces.iter().map(CapabilityInterface::name)
    }

    /// Number of discovered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Returns true if no capability was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
