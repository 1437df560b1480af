//! yacls - access snapshots as code
//!
//! Collects who-has-access-to-what from SaaS and cloud platforms and
//! renders it as reviewable, diff-able YAML:
//! - [`platform`]: ingester registry, source factory and per-platform ingesters
//! - [`render`]: YAML snapshots and CSV change lists
//! - [`run`]: the driver behind the `yacls` binary
//! - [`config`]: layered run configuration

pub mod config;
pub mod error;
pub mod platform;
pub mod render;
pub mod run;

pub use error::{Error, ErrorKind};
pub use yacls_gcloud as gcloud;
pub use yacls_model as model;
pub use yacls_model::{finalize, summary, Artifact, Change};
