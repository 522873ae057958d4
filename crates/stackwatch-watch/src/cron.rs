//! Scheduler-triggered routes, behind `require_cron_secret`

use axum::{Json, extract::State};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::check::{CheckReport, check_all};
use crate::prelude::*;
use stackwatch_email::{BatchSummary, EmailModule};
use stackwatch_types::mail_adapter::EmailMessage;
use stackwatch_types::meta_adapter::Watch;

/// Groups watches by notification address, keeping their order
pub fn group_by_email(watches: &[Watch]) -> BTreeMap<&str, Vec<&Watch>> {
	let mut groups: BTreeMap<&str, Vec<&Watch>> = BTreeMap::new();
	for watch in watches {
		groups.entry(&*watch.email).or_default().push(watch);
	}
	groups
}

/// One reminder message per address
pub fn compose_reminders(
	app: &App,
	email: &EmailModule,
	watches: &[Watch],
) -> ClResult<Vec<EmailMessage>> {
	group_by_email(watches)
		.into_iter()
		.map(|(to, watches)| {
			let items: Vec<_> = watches
				.iter()
				.map(|w| {
					json!({
						"url": w.url,
						"lastChangedAt": w.last_changed_at.map(|t| t.to_iso_string()),
					})
				})
				.collect();
			email.compose(app, to, "watch_reminder", json!({ "count": items.len(), "watches": items }))
		})
		.collect()
}

/// POST /api/cron/check-watches
pub async fn post_check_watches(State(app): State<App>) -> ClResult<Json<CheckReport>> {
	Ok(Json(check_all(&app).await?))
}

/// POST /api/cron/send-reminders
pub async fn post_send_reminders(State(app): State<App>) -> ClResult<Json<BatchSummary>> {
	let email = app.ext::<Arc<EmailModule>>()?;
	let watches = app.meta_adapter.list_watches().await?;
	let messages = compose_reminders(&app, email, &watches)?;

	let summary = EmailModule::send_batch(&app, &messages).await;
	info!(
		sent = summary.total_sent,
		failed = summary.total_failed,
		"Reminder run finished"
	);
	Ok(Json(summary))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn watch(id: i64, email: &str, url: &str) -> Watch {
		Watch {
			id,
			user_id: "u".into(),
			url: url.into(),
			email: email.into(),
			last_hash: None,
			last_checked_at: None,
			last_changed_at: None,
			created_at: Timestamp(0),
		}
	}

	#[test]
	fn test_group_by_email() {
		let watches = vec![
			watch(1, "b@example.com", "https://one.example"),
			watch(2, "a@example.com", "https://two.example"),
			watch(3, "b@example.com", "https://three.example"),
		];
		let groups = group_by_email(&watches);
		assert_eq!(groups.len(), 2);
		let b: Vec<i64> = groups["b@example.com"].iter().map(|w| w.id).collect();
		assert_eq!(b, vec![1, 3]);
		assert_eq!(groups["a@example.com"].len(), 1);
	}
}

// vim: ts=4
