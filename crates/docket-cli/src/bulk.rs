//! # Bulk Subcommand
//!
//! Runs the bulk engine over stdin and writes newline-delimited responses
//! to stdout. Ctrl-C stops reading and interrupts pending sleeps; the
//! final response is still written.

use std::sync::Arc;

use anyhow::{Context, Result};
use docket_doc::Registry;
use docket_engine::bulk::write_responses;
use docket_engine::Bulk;
use tokio::sync::watch;

use crate::keys;

pub fn run_bulk(reg: Registry) -> Result<()> {
    let bulk = Bulk::new(Arc::new(reg), keys::service_key()?);
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let result = runtime.block_on(async move {
        let (cancel_tx, cancel) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, finishing outstanding requests");
                let _ = cancel_tx.send(true);
            }
        });
        let rx = bulk.spawn(tokio::io::stdin(), cancel);
        write_responses(rx, tokio::io::stdout())
            .await
            .context("writing responses")
    });
    // A stdin read may still be parked on a blocking thread after Ctrl-C.
    runtime.shutdown_background();
    result
}
