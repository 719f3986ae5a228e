//! # Serve Subcommand
//!
//! Runs the HTTP server. The port comes from `--port`, then `$PORT`, then
//! 80.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use docket_api::AppState;
use docket_doc::Registry;
use tokio::net::TcpListener;

use crate::keys;

const DEFAULT_PORT: u16 = 80;

/// Arguments for `serve`.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen port.
    #[arg(short = 'p', long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    pub fn resolve_port(&self, env: Option<&str>) -> Result<u16> {
        if let Some(port) = self.port {
            return Ok(port);
        }
        match env {
            Some(text) => text.parse().with_context(|| format!("invalid PORT '{text}'")),
            None => Ok(DEFAULT_PORT),
        }
    }
}

pub fn run_serve(reg: Registry, args: &ServeArgs) -> Result<()> {
    let port = args.resolve_port(std::env::var("PORT").ok().as_deref())?;
    let state = AppState::new(Arc::new(reg), keys::service_key()?);
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding port {port}"))?;
        docket_api::serve(listener, state).await.context("server error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_precedence() {
        let flag = ServeArgs { port: Some(8080) };
        assert_eq!(flag.resolve_port(Some("3000")).unwrap(), 8080);

        let none = ServeArgs::default();
        assert_eq!(none.resolve_port(Some("3000")).unwrap(), 3000);
        assert_eq!(none.resolve_port(None).unwrap(), 80);
        assert!(none.resolve_port(Some("http")).is_err());
    }
}
