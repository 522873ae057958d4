//! IP and user bans
//!
//! The KV flag is written first: it is what blocks traffic. The relational
//! store mirrors it for the dashboard and the action lands in the
//! interaction log.

use axum::{
	Json,
	extract::{Path, State},
};
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;

use crate::prelude::*;
use crate::validate_user_id;
use stackwatch_core::client_ip::normalize_ip;
use stackwatch_core::{ClientIp, Identity};
use stackwatch_types::meta_adapter::{BanLevel, CreateInteraction, InteractionType, Ip, User};

fn validate_ip(ip: &str) -> ClResult<Box<str>> {
	let ip = ip.trim();
	if ip.is_empty() {
		return Err(Error::FieldError { field: "ip".into(), message: "required".into() });
	}
	if ip.parse::<IpAddr>().is_err() {
		return Err(Error::FieldError { field: "ip".into(), message: "invalid-ip".into() });
	}
	Ok(normalize_ip(ip))
}

// IP bans //
//*********//
#[derive(Debug, Deserialize)]
pub struct BanIpRequest {
	ip: String,
	level: Option<BanLevel>,
}

/// POST /api/mod/ban/ip
pub async fn post_ban_ip(
	State(app): State<App>,
	Identity(moderator): Identity,
	ClientIp(origin): ClientIp,
	Json(req): Json<BanIpRequest>,
) -> ClResult<Json<Ip>> {
	let ip = validate_ip(&req.ip)?;
	let level = req.level.unwrap_or(BanLevel::Hard);

	app.bans.ban_ip(&ip).await?;
	let record = app.meta_adapter.set_ip_ban_level(&ip, Some(level)).await?;
	info!(ip = %ip, level = level.as_str(), by = %moderator.user_id, "IP banned");

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::BanIp,
		user_id: Some(&moderator.user_id),
		ip: origin.as_deref(),
		target_users: &[],
		target_ips: &[&*ip],
		data: json!({ "level": level }),
	})
	.await;

	Ok(Json(record))
}

/// DELETE /api/mod/ban/ip/{ip}
pub async fn delete_ban_ip(
	State(app): State<App>,
	Identity(moderator): Identity,
	ClientIp(origin): ClientIp,
	Path(ip): Path<String>,
) -> ClResult<Json<Ip>> {
	let ip = validate_ip(&ip)?;

	app.bans.unban_ip(&ip).await?;
	let record = app.meta_adapter.set_ip_ban_level(&ip, None).await?;
	info!(ip = %ip, by = %moderator.user_id, "IP unbanned");

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::UnbanIp,
		user_id: Some(&moderator.user_id),
		ip: origin.as_deref(),
		target_users: &[],
		target_ips: &[&*ip],
		data: json!({}),
	})
	.await;

	Ok(Json(record))
}

// User bans //
//***********//
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanUserRequest {
	user_id: String,
}

/// POST /api/mod/ban/user
pub async fn post_ban_user(
	State(app): State<App>,
	Identity(moderator): Identity,
	ClientIp(origin): ClientIp,
	Json(req): Json<BanUserRequest>,
) -> ClResult<Json<User>> {
	let user_id = validate_user_id(&req.user_id)?;
	if user_id == &*moderator.user_id {
		return Err(Error::ValidationError("cannot-ban-self".into()));
	}

	app.bans.ban_user(user_id).await?;
	app.meta_adapter.set_user_banned(user_id, true).await?;
	let user = app.meta_adapter.read_user(user_id).await?;
	info!(user_id = %user_id, by = %moderator.user_id, "User banned");

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::BanUser,
		user_id: Some(&moderator.user_id),
		ip: origin.as_deref(),
		target_users: &[user_id],
		target_ips: &[],
		data: json!({}),
	})
	.await;

	Ok(Json(user))
}

/// DELETE /api/mod/ban/user/{user_id}
pub async fn delete_ban_user(
	State(app): State<App>,
	Identity(moderator): Identity,
	ClientIp(origin): ClientIp,
	Path(user_id): Path<String>,
) -> ClResult<Json<User>> {
	let user_id = validate_user_id(&user_id)?;

	app.bans.unban_user(user_id).await?;
	app.meta_adapter.set_user_banned(user_id, false).await?;
	let user = app.meta_adapter.read_user(user_id).await?;
	info!(user_id = %user_id, by = %moderator.user_id, "User unbanned");

	app.record_interaction(&CreateInteraction {
		typ: InteractionType::UnbanUser,
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
