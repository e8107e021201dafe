//! drowse: answers every HTTP request on :8080 after a three second nap.

use anyhow::Context;
use drowse_core::{DelayedResponder, Router, Server, ServerConfig};

// Use mimalloc for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    drowse_core::logging::init();

    let config = ServerConfig::default();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let responder = DelayedResponder::new(config.delay, config.body.clone());
    let router = Router::with_responder(responder);

    // Only returns on a bind failure, which anyhow reports on stderr
    runtime
        .block_on(Server::new(config, router).run())
        .context("drowse failed to start")
}
