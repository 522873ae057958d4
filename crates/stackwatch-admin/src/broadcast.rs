//! Broadcast email to every user with an address

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::prelude::*;
use stackwatch_core::{ClientIp, Identity};
use stackwatch_email::{BatchSummary, EmailModule};
use stackwatch_types::meta_adapter::{CreateInteraction, InteractionType};

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
	subject: String,
	text: String,
}

/// POST /api/mod/broadcast
pub async fn post_broadcast(
	State(app): State<App>,
	Identity(moderator): Identity,
	ClientIp(origin): ClientIp,
	Json(req): Json<BroadcastRequest>,
) -> ClResult<Json<BatchSummary>> {
	let subject = req.subject.trim();
	let text = req.text.trim();
	if subject.is_empty() {
		return Err(Error::FieldError { field: "subject".into(), message: "required".into() });
	}
	if text.is_empty() {
		return Err(Error::FieldError { field: "text".into(), message: "required".into() });
	}

	let email = app.ext::<Arc<EmailModule>>()?;
	let users = app.meta_adapter.list_users_with_email().await?;
	let messages = users
		.iter()
		.filter_map(|u| u.email.as_deref())
		.map(|to| email.compose(&app, to, "broadcast", json!({ "subject": subject, "text": text })))
		.collect::<ClResult<Vec<_>>>()?;

	let summary = EmailModule::send_batch(&app, &messages).await;
	info!(
		by = %moderator.user_id,
		sent = summary.total_sent,
		failed = summary.total_failed,
		"Broadcast sent"
	);

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::Broadcast,
		user_id: Some(&moderator.user_id),
		ip: origin.as_deref(),
		target_users: &[],
		target_ips: &[],
		data: json!({
			"subject": subject,
			"totalSent": summary.total_sent,
			"totalFailed": summary.total_failed,
		}),
	})
	.await;

	Ok(Json(summary))
}

// vim: ts=4
