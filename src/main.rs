//! docworker-worker binary entrypoint.
//!
//! All wiring lives in the library; main only loads configuration and
//! runs the worker process to completion.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = docworker_pipeline::Config::load();
    docworker_pipeline::run(config).await
}
