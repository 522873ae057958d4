//! Server-rendered pages, behind `edge_gate`

use axum::{
	extract::State,
	http::StatusCode,
	response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use serde_json::json;
use std::sync::Arc;

use crate::prelude::*;
use stackwatch_core::Identity;
use stackwatch_core::app::VERSION;
use stackwatch_detect::signature::companies;

const LAYOUT: &str = include_str!("../pages/layout.html.hbs");
const PAGES: [(&str, &str); 3] = [
	("index", include_str!("../pages/index.html.hbs")),
	("moderator", include_str!("../pages/moderator.html.hbs")),
	("restricted", include_str!("../pages/restricted.html.hbs")),
];

/// Compiled page templates, registered as an app extension
pub struct Pages {
	registry: Handlebars<'static>,
}

impl std::fmt::Debug for Pages {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pages").field("pages", &PAGES.map(|(name, _)| name)).finish()
	}
}

impl Pages {
	pub fn new() -> ClResult<Self> {
		let mut registry = Handlebars::new();
		registry
			.register_partial("layout", LAYOUT)
			.map_err(|err| Error::ConfigError(format!("page layout: {}", err)))?;
		for (name, source) in PAGES {
			registry.register_template_string(name, source).map_err(|err| {
				Error::ConfigError(format!("page template '{}': {}", name, err))
			})?;
		}
		Ok(Self { registry })
	}

	pub fn render(&self, name: &str, vars: &serde_json::Value) -> ClResult<String> {
		let mut vars = vars.clone();
		if let serde_json::Value::Object(ref mut map) = vars {
			map.insert("version".into(), VERSION.into());
		}
		self.registry.render(name, &vars).map_err(|err| {
			error!("Page render error: {}", err);
			Error::Internal(format!("page '{}' failed to render", name))
		})
	}
}

/// GET /
pub async fn get_index(
	State(app): State<App>,
	Identity(identity): Identity,
) -> ClResult<Html<String>> {
	let pages = app.ext::<Arc<Pages>>()?;
	let html = pages.render("index", &json!({ "userId": identity.user_id, "companies": companies() }))?;
	Ok(Html(html))
}

/// GET /mod
///
/// Visitors without the moderator flag get a 403 page, with their identity
/// cookie issued all the same.
pub async fn get_moderator(
	State(app): State<App>,
	Identity(identity): Identity,
) -> ClResult<Response> {
	let pages = app.ext::<Arc<Pages>>()?;
	if !identity.is_mod {
		let html = pages.render("moderator", &json!({ "userId": identity.user_id, "isMod": false }))?;
		return Ok((StatusCode::FORBIDDEN, Html(html)).into_response());
	}

	let meta = &app.meta_adapter;
	let (users, banned_users, banned_ips, interactions) = tokio::try_join!(
		meta.count_users(),
		meta.count_banned_users(),
		meta.count_banned_ips(),
		meta.count_interactions(),
	)?;
	let html = pages.render(
		"moderator",
		&json!({
			"userId": identity.user_id,
			"isMod": true,
			"stats": {
				"users": users,
				"bannedUsers": banned_users,
				"bannedIps": banned_ips,
				"interactions": interactions,
			},
		}),
	)?;
	Ok(Html(html).into_response())
}

/// GET /restricted
pub async fn get_restricted(State(app): State<App>) -> ClResult<Response> {
	let pages = app.ext::<Arc<Pages>>()?;
	let html = pages.render("restricted", &json!({}))?;
	Ok((StatusCode::FORBIDDEN, Html(html)).into_response())
}


// vim: ts=4
