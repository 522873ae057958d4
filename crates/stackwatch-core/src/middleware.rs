//! Gating middlewares
//!
//! - `edge_gate`: pages. Banned callers are redirected to the restricted page.
//! - `identity_gate`: API routes. Banned callers get a 403 form error.
//! - `require_moderator`: moderator API routes, `identity_gate` plus a moderator check.
//! - `require_cron_secret`: scheduler trigger routes.

use axum::{
	extract::{Request, State},
	http::{HeaderMap, header},
	middleware::Next,
	response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use sha2::{Digest, Sha256};

use crate::ban::{BanDecision, DenyReason};
use crate::client_ip::resolve_client_ip;
use crate::extract::{ClientIp, Identity};
use crate::prelude::*;
use crate::response::ResponseMeta;
use crate::token::{IdentityClaims, token_cookie};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

const STATIC_EXTENSIONS: [&str; 16] = [
	"css", "js", "mjs", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif", "woff",
	"woff2", "ttf", "otf",
];

/// Reads the raw identity token from the request cookies
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	CookieJar::from_headers(headers).get(cookie_name).map(|c| c.value().to_string())
}

/// Resolves (and if needed issues) the caller's identity.
///
/// The returned metadata carries the `Set-Cookie` for a newly issued token.
pub fn resolve_identity(app: &App, headers: &HeaderMap) -> ClResult<(IdentityClaims, ResponseMeta)> {
	let raw = token_from_headers(headers, &app.opts.cookie_name);
	let refreshed = app.tokens.refresh(raw.as_deref())?;
	let mut meta = ResponseMeta::new();
	if let Some(token) = refreshed.token {
		meta.add_cookie(&token_cookie(&app.opts.cookie_name, &token, app.opts.dev_mode))?;
	}
	Ok((refreshed.identity, meta))
}

/// True when the response already carries a `Set-Cookie` for `cookie_name`
fn sets_cookie(headers: &HeaderMap, cookie_name: &str) -> bool {
	headers.get_all(header::SET_COOKIE).iter().any(|v| {
		v.to_str()
			.ok()
			.and_then(|v| v.split_once('='))
			.is_some_and(|(name, _)| name.trim() == cookie_name)
	})
}

/// Puts the gate's metadata on the handler response.
///
/// A handler that reissued the identity cookie itself wins over the gate.
fn finish(app: &App, meta: &ResponseMeta, res: Response) -> Response {
	if !meta.cookies().is_empty() && sets_cookie(res.headers(), &app.opts.cookie_name) {
		return res;
	}
	meta.apply(res)
}

/// Paths the edge gate does not look at
pub fn is_edge_excluded(path: &str, restricted_path: &str) -> bool {
	if path == "/api" || path.starts_with("/api/") || path.starts_with("/static/") {
		return true;
	}
	if path == restricted_path || path == "/favicon.ico" {
		return true;
	}
	let last = path.rsplit('/').next().unwrap_or_default();
	match last.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => {
			STATIC_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
		}
		_ => false,
	}
}

// Edge gate //
//***********//
pub async fn edge_gate(State(app): State<App>, mut req: Request, next: Next) -> ClResult<Response> {
	if is_edge_excluded(req.uri().path(), &app.opts.restricted_path) {
		return Ok(next.run(req).await);
	}

	let ip = resolve_client_ip(req.headers(), app.opts.dev_mode);
	let claims = token_from_headers(req.headers(), &app.opts.cookie_name)
		.and_then(|raw| app.tokens.decode(&raw));

	if let BanDecision::Deny(reason) =
		app.bans.evaluate(ip.as_deref(), claims.as_ref().map(|c| c.user_id.as_ref())).await
	{
		info!(path = %req.uri().path(), reason = reason.as_str(), "Redirecting banned visitor");
		return Ok(Redirect::to(&app.opts.restricted_path).into_response());
	}

	let (identity, meta) = resolve_identity(&app, req.headers())?;
	req.extensions_mut().insert(Identity(identity));
	req.extensions_mut().insert(ClientIp(ip));

	let res = next.run(req).await;
	Ok(finish(&app, &meta, res))
}

// API gates //
//***********//
async fn gate_api(app: &App, mut req: Request, next: Next, require_mod: bool) -> ClResult<Response> {
	// IP ban check, derived from this request
	let ip = resolve_client_ip(req.headers(), app.opts.dev_mode);
	if let Some(ip) = ip.as_deref() {
		if app.bans.is_ip_banned(ip).await {
			warn!(ip = %ip, path = %req.uri().path(), "API request from banned IP");
			return Err(DenyReason::IpBanned.into());
		}
	}

	// Token refresh, always before the moderator check
	let (identity, meta) = resolve_identity(app, req.headers())?;

	if app.bans.is_user_banned(&identity.user_id).await {
		warn!(user_id = %identity.user_id, path = %req.uri().path(), "API request from banned user");
		return Ok(meta.apply(Error::from(DenyReason::UserBanned).into_response()));
	}

	if require_mod && !identity.is_mod {
		warn!(user_id = %identity.user_id, path = %req.uri().path(), "Moderator permission denied");
		return Ok(meta.apply(Error::NotModerator.into_response()));
	}

	req.extensions_mut().insert(Identity(identity));
	req.extensions_mut().insert(ClientIp(ip));

	let res = next.run(req).await;
	Ok(finish(app, &meta, res))
}

/// Resolves the caller's identity for API routes, rejecting banned callers
pub async fn identity_gate(State(app): State<App>, req: Request, next: Next) -> ClResult<Response> {
	gate_api(&app, req, next, false).await
}

/// Guard for moderator routes.
///
/// Per request: IP ban check, then token refresh (an anonymous caller still
/// gets its cookie), then the moderator check.
pub async fn require_moderator(State(app): State<App>, req: Request, next: Next) -> ClResult<Response> {
	gate_api(&app, req, next, true).await
}

// Cron //
//******//
pub async fn require_cron_secret(State(app): State<App>, req: Request, next: Next) -> ClResult<Response> {
	let Some(secret) = app.opts.cron_secret.as_deref() else {
		warn!(path = %req.uri().path(), "Cron call rejected: no cron secret configured");
		return Err(Error::Unauthorized);
	};
	let provided = req
		.headers()
		.get(CRON_SECRET_HEADER)
		.and_then(|v| v.to_str().ok())
		.unwrap_or_default();

	// Digests have equal length whatever the input
	if Sha256::digest(provided.as_bytes()) != Sha256::digest(secret.as_bytes()) {
		warn!(path = %req.uri().path(), "Cron call rejected: bad secret");
		return Err(Error::Unauthorized);
	}

	Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_edge_exclusions() {
		let r = "/restricted";
		assert!(is_edge_excluded("/api/detect", r));
		assert!(is_edge_excluded("/api", r));
		assert!(is_edge_excluded("/restricted", r));
		assert!(is_edge_excluded("/static/app.css", r));
		assert!(is_edge_excluded("/favicon.ico", r));
		assert!(is_edge_excluded("/assets/logo.PNG", r));
		assert!(is_edge_excluded("/bundle.js", r));

		assert!(!is_edge_excluded("/", r));
		assert!(!is_edge_excluded("/mod", r));
		assert!(!is_edge_excluded("/apis", r));
		assert!(!is_edge_excluded("/watch/example.com", r));
		assert!(!is_edge_excluded("/.css", r));
	}

	#[test]
	fn test_sets_cookie() {
		let mut headers = HeaderMap::new();
		headers.append(header::SET_COOKIE, "theme=dark; Path=/".parse().unwrap());
		assert!(!sets_cookie(&headers, "token"));
		headers.append(header::SET_COOKIE, "token=abc; HttpOnly; Path=/".parse().unwrap());
		assert!(sets_cookie(&headers, "token"));
		assert!(!sets_cookie(&headers, "tok"));
	}

	#[test]
	fn test_token_from_headers() {
		let mut headers = HeaderMap::new();
		headers.insert("cookie", "theme=dark; token=abc.def.ghi".parse().unwrap());
		assert_eq!(token_from_headers(&headers, "token").as_deref(), Some("abc.def.ghi"));
		assert_eq!(token_from_headers(&headers, "other"), None);
	}
}

// vim: ts=4
