//! # Kiln Headless
//!
//! A backend bundle with no window, GPU or input hardware behind it.
//!
//! It implements every host capability well enough to run the engine in
//! tests and on servers: the renderer counts frames, physics bodies keep
//! their shape and material, and the input device reports only keys pressed
//! programmatically.
//!
//! Built as a `cdylib`, the crate is a loadable bundle (see
//! [`kiln_plugins::export_bundle!`]). Linked as an `rlib`, [`register`] can be
//! handed to a [`StaticOpener`](kiln_plugins::bundle::StaticOpener) instead.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::collections::HashSet;

use glam::{UVec2, Vec2};
use kiln_plugins::bundle::BundleBuilder;
use kiln_plugins::interfaces::{InputDevice, PhysicsBody, Renderer};
use kiln_plugins::{Component, ConstructError, TypeRef};
use tracing::{debug, trace};

/// Registers the headless backend's exports.
pub fn register(bundle: &mut BundleBuilder) {
    bundle
        .export::<HeadlessRenderer>("HeadlessRenderer")
        .implements::<dyn Renderer>(|r| r)
        .default_constructor()
        .constructor(vec![TypeRef::of::<UVec2>()], |args| {
            Ok(HeadlessRenderer::with_size(args.take(0)?))
        });

    bundle
        .export::<PolygonBody>("PolygonBody")
        .implements::<dyn PhysicsBody>(|b| b)
        .default_constructor()
        .constructor(
            vec![
                TypeRef::of::<Vec<f32>>(),
                TypeRef::of::<Vec<f32>>(),
                TypeRef::of::<f32>(),
                TypeRef::of::<f32>(),
            ],
            |args| {
                PolygonBody::from_coordinates(
                    &args.take::<Vec<f32>>(0)?,
                    &args.take::<Vec<f32>>(1)?,
                    args.take(2)?,
                    args.take(3)?,
                )
            },
        );

    bundle
        .export::<NullInput>("NullInput")
        .implements::<dyn InputDevice>(|i| i)
        .default_constructor();

    debug!(namespace = bundle.root_namespace(), "registered headless backend");
}

kiln_plugins::export_bundle!(register);

// =============================================================================
// Renderer
// =============================================================================

/// Renderer that presents nothing and counts frames.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessRenderer {
    size: UVec2,
    frames: u64,
}

impl HeadlessRenderer {
    /// Default surface size.
    pub const DEFAULT_SIZE: UVec2 = UVec2::new(1280, 720);

    /// A renderer with a surface of `size` pixels.
    #[must_use]
    pub fn with_size(size: UVec2) -> Self {
        Self { size, frames: 0 }
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::with_size(Self::DEFAULT_SIZE)
    }
}

impl Component for HeadlessRenderer {
    fn component_name(&self) -> &str {
        "headless-renderer"
    }
}

impl Renderer for HeadlessRenderer {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn resize(&mut self, size: UVec2) {
        self.size = size;
    }

    fn begin_frame(&mut self, color: [f32; 4]) {
        trace!(frame = self.frames + 1, ?color, "begin frame");
    }

    fn end_frame(&mut self) -> u64 {
        self.frames += 1;
        self.frames
    }
}

// =============================================================================
// Physics Body
// =============================================================================

/// A polygon with material properties and no simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonBody {
    vertices: Vec<Vec2>,
    position: Vec2,
    density: f32,
    friction: f32,
}

impl PolygonBody {
    /// Builds a body from parallel coordinate lists.
    ///
    /// # Errors
    ///
    /// [`ConstructError::Invalid`] if the lists differ in length, describe
    /// fewer than three vertices, or the density is not positive.
    pub fn from_coordinates(
        xs: &[f32],
        ys: &[f32],
        density: f32,
        friction: f32,
    ) -> Result<Self, ConstructError> {
        if xs.len() != ys.len() {
            return Err(ConstructError::Invalid(format!(
                "{} x coordinates but {} y coordinates",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 3 {
            return Err(ConstructError::Invalid(format!(
                "a polygon needs at least 3 vertices, got {}",
                xs.len()
            )));
        }
        if density <= 0.0 {
            return Err(ConstructError::Invalid(format!(
                "density must be positive, got {density}"
            )));
        }
        Ok(Self {
            vertices: xs.iter().zip(ys).map(|(&x, &y)| Vec2::new(x, y)).collect(),
            position: Vec2::ZERO,
            density,
            friction,
        })
    }
}

impl Default for PolygonBody {
    /// A unit square of density 1 and friction 0.5.
    fn default() -> Self {
        Self {
            vertices: vec![
                Vec2::new(-0.5, -0.5),
                Vec2::new(0.5, -0.5),
                Vec2::new(0.5, 0.5),
                Vec2::new(-0.5, 0.5),
            ],
            position: Vec2::ZERO,
            density: 1.0,
            friction: 0.5,
        }
    }
}

impl Component for PolygonBody {
    fn component_name(&self) -> &str {
        "polygon-body"
    }
}

impl PhysicsBody for PolygonBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn vertices(&self) -> Vec<Vec2> {
        self.vertices.clone()
    }

    fn density(&self) -> f32 {
        self.density
    }

    fn friction(&self) -> f32 {
        self.friction
    }
}

// =============================================================================
// Input
// =============================================================================

/// Input device driven by code rather than hardware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullInput {
    held: HashSet<String>,
}

impl NullInput {
    /// Marks `key` as held.
    pub fn press(&mut self, key: impl Into<String>) {
        self.held.insert(key.into());
    }

    /// Marks `key` as released.
    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }
}

impl Component for NullInput {
    fn component_name(&self) -> &str {
        "null-input"
    }
}

impl InputDevice for NullInput {
    fn poll(&mut self) {}

    fn is_down(&self, key: &str) -> bool {
        self.held.contains(key)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod type_tests {
        use super::*;

        #[test]
        fn renderer_counts_frames() {
            let mut renderer = HeadlessRenderer::default();
            assert_eq!(renderer.size(), HeadlessRenderer::DEFAULT_SIZE);
            renderer.begin_frame([0.0, 0.0, 0.0, 1.0]);
            assert_eq!(renderer.end_frame(), 1);
            assert_eq!(renderer.end_frame(), 2);
        }

        #[test]
        fn polygon_requires_matching_lists() {
            let err = PolygonBody::from_coordinates(&[0.0, 1.0, 1.0], &[0.0], 1.0, 0.2).unwrap_err();
            assert!(matches!(err, ConstructError::Invalid(_)));
        }

        #[test]
        fn polygon_requires_three_vertices() {
            assert!(PolygonBody::from_coordinates(&[0.0, 1.0], &[0.0, 1.0], 1.0, 0.2).is_err());
        }

        #[test]
        fn polygon_requires_positive_density() {
            assert!(
                PolygonBody::from_coordinates(&[0.0, 1.0, 1.0], &[0.0, 0.0, 1.0], 0.0, 0.2).is_err()
            );
        }

        #[test]
        fn default_polygon_is_unit_square() {
            let body = PolygonBody::default();
            assert_eq!(body.vertices().len(), 4);
            assert!((body.density() - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn null_input_reports_pressed_keys() {
            let mut input = NullInput::default();
            input.press("space");
            input.poll();
            assert!(input.is_down("space"));
            input.release("space");
            assert!(!input.is_down("space"));
            assert_eq!(input.pointer(), None);
        }
    }

    mod bundle_tests {
        use super::*;
        use std::env::consts::DLL_EXTENSION;

        use kiln_plugins::bundle::{StaticOpener, BUNDLE_ABI_VERSION};
        use kiln_plugins::{Argument, PluginHost, PluginHostConfig, ResolveError};

        fn headless_host() -> (tempfile::TempDir, PluginHost) {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(format!("libkiln_headless.{DLL_EXTENSION}")), b"")
                .unwrap();
            let host = PluginHost::with_opener(
                PluginHostConfig::new(dir.path()),
                StaticOpener::new().with_bundle("kiln_headless", register),
            );
            host.load("headless").unwrap();
            (dir, host)
        }

        #[test]
        fn exports_every_capability() {
            let (_dir, host) = headless_host();
            let catalog = host.catalog().unwrap();
            assert_eq!(catalog.capabilities(), ["Renderer", "PhysicsBody", "InputDevice"]);
            assert_eq!(host.handle().unwrap().root_namespace(), "kiln_headless");
        }

        #[test]
        fn resolves_defaults() {
            let (_dir, host) = headless_host();
            let resolver = host.resolver().unwrap();

            let renderer = resolver.resolve_default::<dyn Renderer>().unwrap();
            let body = resolver.resolve_default::<dyn PhysicsBody>().unwrap();
            let input = resolver.resolve_default::<dyn InputDevice>().unwrap();

            assert_eq!(renderer.component_name(), "headless-renderer");
            assert_eq!(body.component_name(), "polygon-body");
            assert_eq!(input.component_name(), "null-input");
        }

        #[test]
        fn resolves_renderer_with_size() {
            let (_dir, host) = headless_host();
            let renderer = host
                .resolver()
                .unwrap()
                .resolve_with_args::<dyn Renderer>(vec![Argument::new(UVec2::new(320, 200))])
                .unwrap();
            assert_eq!(renderer.size(), UVec2::new(320, 200));
        }

        #[test]
        fn resolves_body_from_coordinates() {
            let (_dir, host) = headless_host();
            let body = host
                .resolver()
                .unwrap()
                .resolve_with_args::<dyn PhysicsBody>(vec![
                    Argument::new(vec![0.0_f32, 1.0, 1.0]),
                    Argument::new(vec![0.0_f32, 0.0, 1.0]),
                    Argument::new(2.0_f32),
                    Argument::new(0.3_f32),
                ])
                .unwrap();
            assert_eq!(body.vertices()[2], Vec2::new(1.0, 1.0));
            assert!((body.density() - 2.0).abs() < f32::EPSILON);
        }

        #[test]
        fn invalid_body_is_construction_failure() {
            let (_dir, host) = headless_host();
            let err = host
                .resolver()
                .unwrap()
                .resolve_with_args::<dyn PhysicsBody>(vec![
                    Argument::new(vec![0.0_f32]),
                    Argument::new(vec![0.0_f32]),
                    Argument::new(1.0_f32),
                    Argument::new(0.3_f32),
                ])
                .err()
                .unwrap();
            assert!(matches!(err, ResolveError::ConstructionFailed { .. }));
        }

        #[test]
        fn exported_symbols_use_crate_namespace() {
            assert_eq!(kiln_bundle_abi_version(), BUNDLE_ABI_VERSION);

            let mut bundle = BundleBuilder::new("libkiln_headless");
            kiln_bundle_register(&mut bundle);
            let manifest = bundle.finish();
            assert_eq!(manifest.root_namespace, "kiln_headless");
            assert_eq!(manifest.types.len(), 3);
        }
    }
}
