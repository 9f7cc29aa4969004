//! Process wiring for the `docworker-worker` binary: configuration
//! loading and the startup sequence that assembles the job store, queue,
//! executor, worker runtime and maintenance scheduler into one running
//! process. `main.rs` only calls [`Config::load`] and [`run`].

pub mod config;
pub mod startup;

pub use config::Config;
pub use startup::run;
