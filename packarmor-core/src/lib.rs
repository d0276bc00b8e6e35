//! packarmor core library: packager kinds, pack plans, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: packager kinds, bundle layouts and targets, interpreter info
//! - [`plan`]: resolve a [`PackRequest`] into a [`PackPlan`]
//! - [`config`]: load / save / resolve `~/.packarmor/config.yaml`
//! - [`error`]: [`ConfigError`], [`PlanError`]

pub mod config;
pub mod error;
pub mod plan;
pub mod types;

pub use config::{Config, Settings};
pub use error::{ConfigError, PlanError};
pub use plan::{PackPlan, PackRequest};
pub use types::{BundleLayout, BundleTarget, InterpreterInfo, PackerKind};
