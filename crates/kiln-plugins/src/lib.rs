//! # Kiln Plugins
//!
//! Backend plugin discovery and instantiation for the Kiln 2D engine.
//!
//! The engine core never links against a renderer, physics engine or input
//! system. It declares each of them as a *capability* trait, loads one
//! backend bundle at startup, and asks for implementations by capability.
//!
//! ## Architecture
//!
//! - **Capabilities** ([`capability`], [`interfaces`]): the closed set of
//!   roles a backend may fill, all deriving from the [`Component`] marker
//! - **Bundles** ([`bundle`]): libraries that register their exported types,
//!   located by name in the bundle directory and opened once
//! - **Catalog** ([`catalog`]): which exported type implements which
//!   capability
//! - **Erased values** ([`erased`]): boxed values that unbox correctly on
//!   both sides of a dynamically loaded bundle
//! - **Matcher** ([`matcher`]): which constructor accepts a given argument
//!   list
//! - **Resolver** ([`resolver`]): turns a capability request into a boxed
//!   trait object
//! - **Host** ([`host`]): owns all of the above for the process
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kiln_plugins::{PluginHost, PluginHostConfig};
//! use kiln_plugins::interfaces::Renderer;
//!
//! let host = PluginHost::new(PluginHostConfig::from_env()?);
//! host.load("headless")?;
//! let renderer = host.resolver()?.resolve_default::<dyn Renderer>()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bundle;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod erased;
pub mod error;
pub mod host;
pub mod interfaces;
pub mod matcher;
pub mod resolver;
pub mod types;

pub use bundle::{BundleBuilder, ComponentLibraryHandle};
pub use capability::{Capability, CapabilityInterface, CapabilityInterfaceSet, Component};
pub use catalog::{PluginCatalog, PluginRecord};
pub use config::{AmbiguityPolicy, PluginHostConfig};
pub use erased::{ErasedBox, TypeTag};
pub use error::{ConfigError, ConstructError, LoadError, OpenError, ResolveError};
pub use host::PluginHost;
pub use resolver::PluginResolver;
pub use types::{Argument, Arguments, Reflect, TypeRef};

#[cfg(test)]
mod tests;
