//! End-to-end tests of loading, cataloguing and resolution.
//!
//! # Test Structure
//!
//! - `helpers.rs`: fake backend bundles and host setup
//! - `loading.rs`: host state machine and first-load-wins behaviour
//! - `resolution.rs`: resolving capabilities against a loaded bundle
//! - `ambiguity.rs`: several implementations of one capability

mod helpers;
