use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::detector::{Detection, Detector};
use crate::prelude::*;
use crate::signature::{CompanyInfo, companies};
use stackwatch_core::request::normalize_target_url;
use stackwatch_core::{ClientIp, Identity};
use stackwatch_types::meta_adapter::{CreateInteraction, InteractionType};

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
	url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
	url: String,
	final_url: String,
	companies: Vec<Detection>,
}

/// POST /api/detect
pub async fn post_detect(
	State(app): State<App>,
	Identity(identity): Identity,
	ClientIp(ip): ClientIp,
	Json(req): Json<DetectRequest>,
) -> ClResult<Json<DetectResponse>> {
	let url = normalize_target_url(&req.url)?;
	let detector = app.ext::<Arc<Detector>>()?;

	let page = app.request.fetch_page(&url).await?;
	if !page.status.is_success() {
		info!(url = %url, status = %page.status, "Detect target returned an error status");
	}
	let detections = detector.detect(&page.headers, &page.text());
	info!(url = %url, found = detections.len(), "Detection finished");

	app.meta_adapter.ensure_user(&identity.user_id).await?;
	let found: Vec<&str> = detections.iter().map(|d| d.id).collect();
	app.record_interaction(&CreateInteraction {
		typ: InteractionType::Detect,
		user_id: Some(&identity.user_id),
		ip: ip.as_deref(),
		target_users: &[],
		target_ips: &[],
		data: json!({ "url": url.as_str(), "finalUrl": page.url.as_str(), "companies": found }),
	})
	.await;

	Ok(Json(DetectResponse {
		url: url.to_string(),
		final_url: page.url.to_string(),
		companies: detections,
	}))
}

/// GET /api/detect/companies
pub async fn get_companies() -> Json<Vec<CompanyInfo>> {
	Json(companies())
}

// vim: ts=4
