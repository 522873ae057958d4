use axum::{
	Router,
	http::{HeaderValue, header},
	middleware::from_fn_with_state,
	routing::{delete, get, post, put},
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::pages;
use crate::prelude::*;
use stackwatch_core::middleware::{edge_gate, identity_gate, require_cron_secret, require_moderator};

fn init_pages(app: &App) -> Router<App> {
	Router::new()
		.route("/", get(pages::get_index))
		.route("/mod", get(pages::get_moderator))
		.route(&app.opts.restricted_path, get(pages::get_restricted))
}

fn init_api(app: &App) -> Router<App> {
	Router::new()
		// Identity
		.route("/api/auth/me", get(stackwatch_auth::handler::get_me))
		.route("/api/auth/email", put(stackwatch_auth::handler::put_email))
		.route("/api/auth/sync", post(stackwatch_auth::handler::post_sync))
		.route("/api/auth/logout", post(stackwatch_auth::handler::post_logout))
		// Detection
		.route("/api/detect", post(stackwatch_detect::handler::post_detect))
		.route("/api/detect/companies", get(stackwatch_detect::handler::get_companies))
		// Watches
		.route(
			"/api/watches",
			get(stackwatch_watch::handler::list_watches).post(stackwatch_watch::handler::post_watch),
		)
		.route("/api/watches/{id}", delete(stackwatch_watch::handler::delete_watch))
		.route_layer(from_fn_with_state(app.clone(), identity_gate))
}

fn init_mod_api(app: &App) -> Router<App> {
	use stackwatch_admin::{ban, broadcast, stats, user};

	Router::new()
		.route("/api/mod/stats", get(stats::get_stats))
		.route("/api/mod/interactions", get(stats::list_interactions))
		.route("/api/mod/ban/ip", post(ban::post_ban_ip))
		.route("/api/mod/ban/ip/{ip}", delete(ban::delete_ban_ip))
		.route("/api/mod/ban/user", post(ban::post_ban_user))
		.route("/api/mod/ban/user/{user_id}", delete(ban::delete_ban_user))
		.route("/api/mod/users/{user_id}/promote", post(user::post_promote))
		.route("/api/mod/broadcast", post(broadcast::post_broadcast))
		.route_layer(from_fn_with_state(app.clone(), require_moderator))
}

fn init_cron_api(app: &App) -> Router<App> {
	use stackwatch_watch::cron;

	Router::new()
		.route("/api/cron/check-watches", post(cron::post_check_watches))
		.route("/api/cron/send-reminders", post(cron::post_send_reminders))
		.route_layer(from_fn_with_state(app.clone(), require_cron_secret))
}

pub fn init(app: App) -> Router {
	Router::new()
		.merge(init_pages(&app))
		.merge(init_api(&app))
		.merge(init_mod_api(&app))
		.merge(init_cron_api(&app))
		.fallback(async || Error::NotFound)
		// Every path, routed or not; `edge_gate` skips API and static paths itself
		.layer(from_fn_with_state(app.clone(), edge_gate))
		.layer(SetResponseHeaderLayer::if_not_present(
			header::X_CONTENT_TYPE_OPTIONS,
			HeaderValue::from_static("nosniff"),
		))
		.layer(TraceLayer::new_for_http())
		.with_state(app)
}

// vim: ts=4
