use axum::{
	Json,
	extract::{Path, State},
	http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use crate::MAX_WATCHES_PER_USER;
use crate::prelude::*;
use stackwatch_core::request::normalize_target_url;
use stackwatch_core::{ClientIp, Identity};
use stackwatch_types::meta_adapter::{CreateInteraction, CreateWatch, InteractionType, Watch};
use stackwatch_types::utils::is_valid_email;

#[derive(Debug, Deserialize)]
pub struct CreateWatchRequest {
	url: String,
	email: Option<String>,
}

/// POST /api/watches
pub async fn post_watch(
	State(app): State<App>,
	Identity(identity): Identity,
	ClientIp(ip): ClientIp,
	Json(req): Json<CreateWatchRequest>,
) -> ClResult<(StatusCode, Json<Watch>)> {
	let url = normalize_target_url(&req.url)?;

	let email = req
		.email
		.as_deref()
		.map(str::trim)
		.filter(|e| !e.is_empty())
		.or(identity.email.as_deref())
		.ok_or_else(|| Error::FieldError { field: "email".into(), message: "required".into() })?;
	if !is_valid_email(email) {
		return Err(Error::FieldError { field: "email".into(), message: "invalid-email".into() });
	}

	app.meta_adapter.ensure_user(&identity.user_id).await?;
	if app.meta_adapter.count_watches_by_user(&identity.user_id).await? >= MAX_WATCHES_PER_USER {
		return Err(Error::TooMany("too-many-watches".into()));
	}

	let watch = app
		.meta_adapter
		.create_watch(&CreateWatch { user_id: &identity.user_id, url: url.as_str(), email })
		.await?;
	info!(watch_id = watch.id, user_id = %identity.user_id, url = %watch.url, "Watch created");

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::WatchCreate,
		user_id: Some(&identity.user_id),
		ip: ip.as_deref(),
		target_users: &[],
		target_ips: &[],
		data: json!({ "watchId": watch.id, "url": watch.url }),
	})
	.await;

	Ok((StatusCode::CREATED, Json(watch)))
}

/// GET /api/watches
pub async fn list_watches(
	State(app): State<App>,
	Identity(identity): Identity,
) -> ClResult<Json<Vec<Watch>>> {
	Ok(Json(app.meta_adapter.list_watches_by_user(&identity.user_id).await?))
}

/// DELETE /api/watches/{id}
pub async fn delete_watch(
	State(app): State<App>,
	Identity(identity): Identity,
	ClientIp(ip): ClientIp,
	Path(watch_id): Path<i64>,
) -> ClResult<StatusCode> {
	let watch = app.meta_adapter.read_watch(watch_id).await?;
	if watch.user_id != identity.user_id {
		warn!(watch_id, user_id = %identity.user_id, "Refusing to delete a foreign watch");
		return Err(Error::PermissionDenied);
	}

	app.meta_adapter.delete_watch(watch_id).await?;
	app.record_interaction(&CreateInteraction {
		typ: InteractionType::WatchDelete,
		user_id: Some(&identity.user_id),
		ip: ip.as_deref(),
		target_users: &[],
		target_ips: &[],
		data: json!({ "watchId": watch_id, "url": watch.url }),
	})
	.await;

	Ok(StatusCode::NO_CONTENT)
}

// vim: ts=4
