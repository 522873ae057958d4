//! HTTP listener
//!
//! Stackwatch runs behind a TLS terminating proxy that sets the trusted
//! client IP headers, so it listens on plain HTTP.

use axum::Router;
use tokio::net::TcpListener;

use crate::prelude::*;

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			error!("Failed to listen for ctrl-c: {}", err);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(err) => {
				error!("Failed to listen for SIGTERM: {}", err);
				std::future::pending::<()>().await;
			}
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
	info!("Shutdown signal received");
}

pub async fn serve(app: &App, router: Router) -> ClResult<()> {
	let listener = TcpListener::bind(&*app.opts.listen).await.map_err(|err| {
		error!("FATAL: Cannot listen on {}: {}", app.opts.listen, err);
		Error::Io(err)
	})?;
	info!("Listening on http://{}", app.opts.listen);

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

	info!("Server stopped");
	Ok(())
}

// vim: ts=4
