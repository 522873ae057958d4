//! Dashboard counts and the interaction log

use axum::{
	Json,
	extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use stackwatch_types::meta_adapter::{Interaction, ListInteractionOptions};

pub const DEFAULT_INTERACTION_LIMIT: u32 = 50;
pub const MAX_INTERACTION_LIMIT: u32 = 200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
	pub users: u64,
	pub banned_users: u64,
	pub banned_ips: u64,
	pub interactions: u64,
}

/// GET /api/mod/stats
pub async fn get_stats(State(app): State<App>) -> ClResult<Json<Stats>> {
	let meta = &app.meta_adapter;
	let (users, banned_users, banned_ips, interactions) = tokio::try_join!(
		meta.count_users(),
		meta.count_banned_users(),
		meta.count_banned_ips(),
		meta.count_interactions(),
	)?;

	Ok(Json(Stats { users, banned_users, banned_ips, interactions }))
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionQuery {
	limit: Option<u32>,
	offset: Option<u32>,
}

impl InteractionQuery {
	fn options(&self) -> ListInteractionOptions {
		ListInteractionOptions {
			limit: self.limit.unwrap_or(DEFAULT_INTERACTION_LIMIT).clamp(1, MAX_INTERACTION_LIMIT),
			offset: self.offset.unwrap_or(0),
		}
	}
}

/// GET /api/mod/interactions?limit&offset
pub async fn list_interactions(
	State(app): State<App>,
	Query(query): Query<InteractionQuery>,
) -> ClResult<Json<Vec<Interaction>>> {
	Ok(Json(app.meta_adapter.list_interactions(&query.options()).await?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_interaction_limits() {
		let opts = InteractionQuery::default().options();
		assert_eq!((opts.limit, opts.offset), (50, 0));

		let opts = InteractionQuery { limit: Some(1000), offset: Some(20) }.options();
		assert_eq!((opts.limit, opts.offset), (200, 20));

		let opts = InteractionQuery { limit: Some(0), offset: None }.options();
		assert_eq!(opts.limit, 1);
	}

	#[test]
	fn test_stats_shape() {
		let stats = Stats { users: 3, banned_users: 1, banned_ips: 2, interactions: 9 };
		assert_eq!(
			serde_json::to_value(&stats).unwrap(),
			serde_json::json!({ "users": 3, "bannedUsers": 1, "bannedIps": 2, "interactions": 9 })
		);
	}
}

// vim: ts=4
