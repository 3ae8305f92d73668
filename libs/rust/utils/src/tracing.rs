use anyhow::{anyhow, Result};
use futures::{Future, FutureExt};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn setup_tracing() {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ensure the fmt layer logs to the console
    let fmt_layer = fmt::layer()
        .with_line_number(true)
        .compact()
        .with_writer(std::io::stdout);

    // A subscriber may already be installed when several runs share a process (tests)
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

/// Installs tracing, then drives `future` to completion. Errors are logged
/// and returned; a panic is logged with its backtrace and turned into an error
/// so the binary still exits non-zero.
pub async fn run_with_tracing<F, Fut>(future: F) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    setup_tracing();

    // Wrap the async block in a catch_unwind
    match std::panic::AssertUnwindSafe(future()).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = ?e, "Run failed");
            Err(e)
        }
        Err(panic) => {
            capture_panic_details(panic);
            Err(anyhow!("run panicked"))
        }
    }
}

fn capture_panic_details(e: Box<dyn std::any::Any + Send>) {
    let backtrace = backtrace::Backtrace::new();
    if let Some(s) = e.downcast_ref::<&str>() {
        error!(panic_message = *s, backtrace = ?backtrace, "Panic occurred with message");
    } else if let Some(s) = e.downcast_ref::<String>() {
        error!(panic_message = s, backtrace = ?backtrace, "Panic occurred with message");
    } else {
        error!(backtrace = ?backtrace, "Panic occurred but the payload is not a string");
    }
}
