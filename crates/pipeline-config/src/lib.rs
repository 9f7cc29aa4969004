//! Config Store (component A) write path: loads an operator-authored
//! bootstrap file, validates it, and seeds the pipeline step/model/
//! document-class/setting/feature-flag tables the read path
//! (`pipeline_store::ConfigRepository`) serves at runtime. Also exposes
//! the atomic step-versioning operation for callers outside the store.

pub mod error;
pub mod loader;
pub mod model;
pub mod seed;
pub mod validation;
pub mod version;

pub use error::ConfigError;
pub use loader::load_bootstrap;
pub use model::Bootstrap;
pub use seed::seed;
pub use version::bump_step_version;
