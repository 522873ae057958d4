use axum::{
	Json,
	extract::{Path, State},
};
use serde_json::json;

use crate::prelude::*;
use crate::validate_user_id;
use stackwatch_core::{ClientIp, Identity};
use stackwatch_types::meta_adapter::{CreateInteraction, InteractionType, User};

/// POST /api/mod/users/{user_id}/promote
///
/// The promoted user picks up the flag with `POST /api/auth/sync`.
pub async fn post_promote(
	State(app): State<App>,
	Identity(moderator): Identity,
	ClientIp(origin): ClientIp,
	Path(user_id): Path<String>,
) -> ClResult<Json<User>> {
	let user_id = validate_user_id(&user_id)?;

	app.meta_adapter.set_user_mod(user_id, true).await?;
	let user = app.meta_adapter.read_user(user_id).await?;
	info!(user_id = %user_id, by = %moderator.user_id, "User promoted to moderator");

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::PromoteMod,
		user_id: Some(&moderator.user_id),
		ip: origin.as_deref(),
		target_users: &[user_id],
		target_ips: &[],
		data: json!({}),
	})
	.await;

	Ok(Json(user))
}

// vim: ts=4
