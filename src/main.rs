//! sdp CLI binary.
//!
//! Builds the tokio runtime `sdp-runner` blocks on, runs the CLI's
//! (synchronous) dispatch on a blocking-pool thread, and races it against
//! SIGINT/SIGTERM so a signal can cancel an in-flight agent invocation
//! (spec.md §5) instead of leaving the process to be killed outright.

use sdp_runner::CancellationToken;

fn main() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to start tokio runtime");
    let handle = runtime.handle().clone();
    let cancel = CancellationToken::new();

    let worker = runtime.spawn_blocking({
        let handle = handle.clone();
        let cancel = cancel.clone();
        move || sdp::cli::run(handle, cancel)
    });

    let code = runtime.block_on(run_until_exit(worker, cancel));
    std::process::exit(code);
}

/// Waits for the CLI worker to finish, or for a shutdown signal — whichever
/// comes first. A signal only sets the token; the worker's own error path
/// (propagating `SdpError::Cancelled` out of `sdp_agent::run`) still owns
/// unwinding, releasing locks through its own guards rather than this race.
async fn run_until_exit(mut worker: tokio::task::JoinHandle<i32>, cancel: CancellationToken) -> i32 {
    tokio::select! {
        result = &mut worker => result.expect("cli worker panicked"),
        () = wait_for_shutdown_signal() => {
            cancel.cancel();
            worker.await.expect("cli worker panicked")
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
