//! Capability traits the engine declares for its backends.
//!
//! These are the roles a backend bundle may fill. The engine never names a
//! concrete backend type; it asks the resolver for `dyn Renderer`,
//! `dyn PhysicsBody` or `dyn InputDevice` and drives whatever comes back.

use glam::{UVec2, Vec2};

use crate::capability::{Capability, CapabilityDeclaration, Component, MARKER};

/// Every capability declaration compiled into the host, marker included.
pub const HOST_CAPABILITIES: &[CapabilityDeclaration] = &[
    MARKER,
    <dyn Renderer as Capability>::DECLARATION,
    <dyn PhysicsBody as Capability>::DECLARATION,
    <dyn InputDevice as Capability>::DECLARATION,
];

// =============================================================================
// Renderer
// =============================================================================

/// Frame presentation backend.
pub trait Renderer: Component {
    /// Current drawable size in pixels.
    fn size(&self) -> UVec2;

    /// Resizes the drawable surface.
    fn resize(&mut self, size: UVec2);

    /// Starts a frame, clearing to `color` (linear RGBA).
    fn begin_frame(&mut self, color: [f32; 4]);

    /// Finishes and presents the current frame. Returns the number of frames
    /// presented so far.
    fn end_frame(&mut self) -> u64;
}

impl Capability for dyn Renderer {
    const DECLARATION: CapabilityDeclaration = CapabilityDeclaration::derived("Renderer");
}

// =============================================================================
// Physics Body
// =============================================================================

/// A rigid body owned by the physics backend.
pub trait PhysicsBody: Component {
    /// World position of the body origin.
    fn position(&self) -> Vec2;

    /// Teleports the body.
    fn set_position(&mut self, position: Vec2);

    /// Outline of the body in local space.
    fn vertices(&self) -> Vec<Vec2>;

    /// Mass per unit area.
    fn density(&self) -> f32;

    /// Coulomb friction coefficient.
    fn friction(&self) -> f32;
}

impl Capability for dyn PhysicsBody {
    const DECLARATION: CapabilityDeclaration = CapabilityDeclaration::derived("PhysicsBody");
}

// =============================================================================
// Input Device
// =============================================================================

/// Keyboard/pad state source.
pub trait InputDevice: Component {
    /// Pulls pending platform events into the device state.
    fn poll(&mut self);

    /// Whether the named key or button is currently held.
    fn is_down(&self, key: &str) -> bool;

    /// Pointer position in window coordinates, if the device has one.
    fn pointer(&self) -> Option<Vec2> {
        None
    }
}

impl Capability for dyn InputDevice {
    const DECLARATION: CapabilityDeclaration = CapabilityDeclaration::derived("InputDevice");
}
