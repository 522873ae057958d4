//! Change detection

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::prelude::*;
use stackwatch_core::request::normalize_target_url;
use stackwatch_email::EmailModule;
use stackwatch_types::meta_adapter::{Watch, WatchCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
	/// First check, the hash is only recorded
	Baseline,
	Unchanged,
	Changed,
}

/// Totals of a `check_all` run
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
	pub checked: usize,
	pub changed: usize,
	pub failed: usize,
	pub alerts_sent: usize,
}

/// Hex encoded SHA-256 of a page body
pub fn hash_body(body: &[u8]) -> String {
	format!("{:x}", Sha256::digest(body))
}

/// Compares a fresh hash with the last one recorded
pub fn classify(last_hash: Option<&str>, hash: &str) -> CheckOutcome {
	match last_hash {
		None => CheckOutcome::Baseline,
		Some(last) if last == hash => CheckOutcome::Unchanged,
		Some(_) => CheckOutcome::Changed,
	}
}

/// Fetches a watched page and records the result
pub async fn check_watch(app: &App, watch: &Watch) -> ClResult<CheckOutcome> {
	let url = normalize_target_url(&watch.url)?;
	let page = app.request.fetch_page(&url).await?;
	let hash = hash_body(&page.body);
	let outcome = classify(watch.last_hash.as_deref(), &hash);
	let now = Timestamp::now();

	app.meta_adapter
		.update_watch_check(
			watch.id,
			&WatchCheck { hash: &hash, checked_at: now, changed: outcome == CheckOutcome::Changed },
		)
		.await?;

	debug!(watch_id = watch.id, url = %watch.url, ?outcome, "Watch checked");
	Ok(outcome)
}

async fn send_alert(app: &App, email: &EmailModule, watch: &Watch) -> ClResult<()> {
	let message = email.compose(
		app,
		&watch.email,
		"watch_alert",
		json!({ "url": watch.url, "changedAt": Timestamp::now().to_iso_string() }),
	)?;
	EmailModule::send_now(app, &message).await
}

/// Checks every watch, one after the other.
///
/// A failed fetch or alert is counted and logged, the run goes on.
pub async fn check_all(app: &App) -> ClResult<CheckReport> {
	let email = app.ext::<Arc<EmailModule>>()?;
	let watches = app.meta_adapter.list_watches().await?;
	let mut report = CheckReport::default();

	for watch in &watches {
		report.checked += 1;
		match check_watch(app, watch).await {
			Ok(CheckOutcome::Changed) => {
				report.changed += 1;
				match send_alert(app, email, watch).await {
					Ok(()) => report.alerts_sent += 1,
					Err(err) => warn!(watch_id = watch.id, error = %err, "Failed to send watch alert"),
				}
			}
			Ok(_) => {}
			Err(err) => {
				report.failed += 1;
				warn!(watch_id = watch.id, url = %watch.url, error = %err, "Watch check failed");
			}
		}
	}

	info!(
		checked = report.checked,
		changed = report.changed,
		failed = report.failed,
		"Watch check run finished"
	);
	Ok(report)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_body() {
		assert_eq!(
			hash_body(b""),
			"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
		);
		assert_eq!(hash_body(b"abc").len(), 64);
	}

	#[test]
	fn test_classify() {
		let h1 = hash_body(b"one");
		let h2 = hash_body(b"two");
		assert_eq!(classify(None, &h1), CheckOutcome::Baseline);
		assert_eq!(classify(Some(&h1), &h1), CheckOutcome::Unchanged);
		assert_eq!(classify(Some(&h1), &h2), CheckOutcome::Changed);
	}
}

// vim: ts=4
