pub mod events;
pub mod orchestrator;
pub mod recorder;
pub mod state;
pub mod steps;

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use events::*;
pub use orchestrator::{Orchestrator, PacingPolicy, RunOutcome};
pub use recorder::{ResultRecord, RunLog};
pub use state::*;

use crate::http::{ReqwestTransport, RequestExecutor, RetryPolicy, Transport};
use crate::utils::config::Config;
use steps::Fixture;

/// Run the full step catalogue against `config.base_url`, printing progress
/// to the console.
///
/// Always hands back an outcome with a log to report on; a client that cannot
/// be built is logged as an aborted run.
pub async fn run_tests(config: &Config) -> RunOutcome {
    let started_at = Local::now();

    let transport = match ReqwestTransport::new() {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            return RunOutcome::failed_to_start(
                started_at,
                &config.normalized_base_url(),
                &format!("Failed to build HTTP client: {}", e),
            );
        }
    };

    run_with(config, transport, started_at, |receiver| {
        tokio::spawn(ConsoleEventListener::listen(receiver))
    })
    .await
}

async fn run_with<T, L>(
    config: &Config,
    transport: T,
    started_at: DateTime<Local>,
    spawn_listener: L,
) -> RunOutcome
where
    T: Transport,
    L: FnOnce(broadcast::Receiver<TestEvent>) -> JoinHandle<()>,
{
    let executor = RequestExecutor::new(
        transport,
        config.request_timeout(),
        RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        },
    );

    let fixture = Fixture {
        credentials: Credentials::for_run(started_at.timestamp()),
        site_url: config.site_url.clone(),
    };

    let (emitter, receiver) = EventEmitter::new();
    let listener = spawn_listener(receiver);

    let orchestrator = Orchestrator::new(
        executor,
        PacingPolicy::from_config(config),
        fixture,
        &config.normalized_base_url(),
        started_at,
        emitter,
    );
    // consumes the emitter; the listener drains and exits once it is gone
    let outcome = orchestrator.run(&steps::catalogue()).await;
    if let Err(e) = listener.await {
        log::warn!("Console listener stopped early: {}", e);
    }

    outcome
}
