use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::prelude::*;
use crate::reissue;
use stackwatch_core::token::{IdentityClaims, removal_cookie};
use stackwatch_core::{Identity, ResponseMeta};
use stackwatch_types::utils::is_valid_email;

/// GET /api/auth/me
pub async fn get_me(
	State(app): State<App>,
	Identity(identity): Identity,
) -> ClResult<Json<IdentityClaims>> {
	app.meta_adapter.ensure_user(&identity.user_id).await?;
	Ok(Json(identity))
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmailRequest {
	email: Option<String>,
}

/// PUT /api/auth/email
///
/// An empty or null email clears it.
pub async fn put_email(
	State(app): State<App>,
	Identity(identity): Identity,
	Json(req): Json<UpdateEmailRequest>,
) -> ClResult<(ResponseMeta, Json<IdentityClaims>)> {
	let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
	if let Some(email) = email {
		if !is_valid_email(email) {
			return Err(Error::FieldError {
				field: "email".into(),
				message: "invalid-email".into(),
			});
		}
	}

	app.meta_adapter.ensure_user(&identity.user_id).await?;
	app.meta_adapter.update_user_email(&identity.user_id, email).await?;

	let identity = IdentityClaims { email: email.map(Into::into), ..identity };
	let meta = reissue(&app, &identity)?;
	info!(user_id = %identity.user_id, "Email updated");
	Ok((meta, Json(identity)))
}

/// POST /api/auth/sync
///
/// Reissues the token from the stored user, picking up moderator changes.
pub async fn post_sync(
	State(app): State<App>,
	Identity(identity): Identity,
) -> ClResult<(ResponseMeta, Json<IdentityClaims>)> {
	let user = app.meta_adapter.ensure_user(&identity.user_id).await?;
	let synced = IdentityClaims { user_id: user.id, is_mod: user.is_mod, email: user.email };
	if synced != identity {
		info!(user_id = %synced.user_id, is_mod = synced.is_mod, "Identity synced from store");
	}
	let meta = reissue(&app, &synced)?;
	Ok((meta, Json(synced)))
}

/// POST /api/auth/logout
pub async fn post_logout(State(app): State<App>) -> ClResult<(ResponseMeta, StatusCode)> {
	let meta =
		ResponseMeta::new().with_cookie(&removal_cookie(&app.opts.cookie_name, app.opts.dev_mode))?;
	Ok((meta, StatusCode::NO_CONTENT))
}

// vim: ts=4
