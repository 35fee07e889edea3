//! Fake backend bundles and host setup shared by the scenario tests.
//!
//! The fake bundles register through [`StaticOpener`], so no dynamic library
//! is built; a placeholder file in a temporary bundle directory stands in
//! for the library on disk.

use std::env::consts::DLL_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::{UVec2, Vec2};
use tempfile::TempDir;

use crate::bundle::{BundleBuilder, BundleManifest, BundleOpener, StaticOpener};
use crate::capability::Component;
use crate::config::{AmbiguityPolicy, PluginHostConfig};
use crate::error::{ConstructError, OpenError};
use crate::host::PluginHost;
use crate::interfaces::{PhysicsBody, Renderer};
use crate::types::TypeRef;

// =============================================================================
// Fake Backend Types
// =============================================================================

/// Renderer that counts frames.
#[derive(Debug, Default)]
pub struct SdlRenderer {
    pub size: UVec2,
    pub frames: u64,
}

impl Component for SdlRenderer {
    fn component_name(&self) -> &str {
        "SdlRenderer"
    }
}

impl Renderer for SdlRenderer {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn resize(&mut self, size: UVec2) {
        self.size = size;
    }

    fn begin_frame(&mut self, _color: [f32; 4]) {}

    fn end_frame(&mut self) -> u64 {
        self.frames += 1;
        self.frames
    }
}

/// Second renderer, used to make the renderer capability ambiguous.
#[derive(Debug, Default)]
pub struct SoftwareRenderer;

impl Component for SoftwareRenderer {
    fn component_name(&self) -> &str {
        "SoftwareRenderer"
    }
}

impl Renderer for SoftwareRenderer {
    fn size(&self) -> UVec2 {
        UVec2::ONE
    }

    fn resize(&mut self, _size: UVec2) {}

    fn begin_frame(&mut self, _color: [f32; 4]) {}

    fn end_frame(&mut self) -> u64 {
        0
    }
}

/// Polygon body built from separate x and y vertex lists.
#[derive(Debug)]
pub struct FakePhysicsBody {
    pub vertices: Vec<Vec2>,
    pub density: f32,
    pub friction: f32,
    pub position: Vec2,
}

impl FakePhysicsBody {
    fn from_arguments(
        x: Vec<f32>,
        y: Vec<f32>,
        density: f32,
        friction: f32,
    ) -> Result<Self, ConstructError> {
        if x.len() != y.len() {
            return Err(ConstructError::Invalid(format!(
                "{} x coordinates but {} y coordinates",
                x.len(),
                y.len()
            )));
        }
        Ok(Self {
            vertices: x.into_iter().zip(y).map(|(x, y)| Vec2::new(x, y)).collect(),
            density,
            friction,
            position: Vec2::ZERO,
        })
    }
}

impl Component for FakePhysicsBody {
    fn component_name(&self) -> &str {
        "FakePhysicsBody"
    }
}

impl PhysicsBody for FakePhysicsBody {
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

/// Declares the input capability by name but never registers the upcast.
#[derive(Debug, Default)]
pub struct Impostor;

// =============================================================================
// Fake Bundles
// =============================================================================

/// Parameter list of the four-argument physics body constructor.
pub fn body_params() -> Vec<TypeRef> {
    vec![
        TypeRef::of::<Vec<f32>>(),
        TypeRef::of::<Vec<f32>>(),
        TypeRef::of::<f32>(),
        TypeRef::of::<f32>(),
    ]
}

/// One renderer and one physics body; no input device.
pub fn register_sdl(bundle: &mut BundleBuilder) {
    bundle
        .export::<SdlRenderer>("SdlRenderer")
        .implements::<dyn Renderer>(|r| r)
        .default_constructor();

    bundle
        .export::<FakePhysicsBody>("FakePhysicsBody")
        .implements::<dyn PhysicsBody>(|b| b)
        .constructor(body_params(), |args| {
            FakePhysicsBody::from_arguments(args.take(0)?, args.take(1)?, args.take(2)?, args.take(3)?)
        });
}

/// Two renderers, plus an impostor input device.
pub fn register_crowded(bundle: &mut BundleBuilder) {
    bundle
        .export::<SdlRenderer>("SdlRenderer")
        .implements::<dyn Renderer>(|r| r)
        .default_constructor();

    bundle
        .export::<SoftwareRenderer>("SoftwareRenderer")
        .implements::<dyn Renderer>(|r| r)
        .default_constructor();

    bundle
        .export::<Impostor>("Impostor")
        .interface("InputDevice")
        .default_constructor();
}

/// Static opener knowing both fake bundles.
pub fn fake_opener() -> StaticOpener {
    StaticOpener::new()
        .with_bundle("sdl_backend", register_sdl)
        .with_bundle("crowded_backend", register_crowded)
}

// =============================================================================
// Bundle Directory Setup
// =============================================================================

/// Creates a temporary bundle directory holding an empty library file per
/// stem.
pub fn bundle_dir(stems: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for stem in stems {
        touch_bundle(dir.path(), stem);
    }
    dir
}

/// Creates `<stem>.<dll extension>` in `dir`.
pub fn touch_bundle(dir: &Path, stem: &str) -> PathBuf {
    let path = dir.join(format!("{stem}.{DLL_EXTENSION}"));
    fs::write(&path, b"").unwrap();
    path
}

/// A host over `dir` using the fake bundles.
pub fn fake_host(dir: &Path, ambiguity: AmbiguityPolicy) -> PluginHost {
    PluginHost::with_opener(
        PluginHostConfig::new(dir).with_ambiguity(ambiguity),
        fake_opener(),
    )
}

// =============================================================================
// Counting Opener
// =============================================================================

/// Wraps the fake opener and counts how often a bundle is opened.
#[derive(Debug, Clone, Default)]
pub struct CountingOpener {
    opens: Arc<AtomicUsize>,
}

impl CountingOpener {
    /// Number of `open` calls so far, shared across clones.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl BundleOpener for CountingOpener {
    fn open(&self, path: &Path) -> Result<BundleManifest, OpenError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        fake_opener().open(path)
    }
}
