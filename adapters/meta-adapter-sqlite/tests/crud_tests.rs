//! Meta adapter CRUD tests against a temporary SQLite database

use serde_json::json;
use stackwatch_meta_adapter_sqlite::MetaAdapterSqlite;
use stackwatch_types::meta_adapter::{
	BanLevel, CreateInteraction, CreateWatch, InteractionType, ListInteractionOptions, MetaAdapter,
	WatchCheck,
};
use stackwatch_types::prelude::*;
use tempfile::TempDir;

async fn create_test_adapter() -> (MetaAdapterSqlite, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = MetaAdapterSqlite::new(temp_dir.path().join("db"))
		.await
		.expect("Failed to create adapter");
	(adapter, temp_dir)
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
	let (adapter, _temp) = create_test_adapter().await;

	let first = adapter.ensure_user("user-a").await.expect("ensure");
	let second = adapter.ensure_user("user-a").await.expect("ensure again");

	assert_eq!(first.id, second.id);
	assert_eq!(first.created_at, second.created_at);
	assert!(!first.is_mod);
	assert!(!first.is_banned);
	assert_eq!(adapter.count_users().await.expect("count"), 1);
}

#[tokio::test]
async fn test_read_unknown_user_is_not_found() {
	let (adapter, _temp) = create_test_adapter().await;

	let res = adapter.read_user("missing").await;
	assert!(matches!(res, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_user_flags_and_email() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter.set_user_mod("mod-1", true).await.expect("set mod");
	adapter.set_user_banned("bad-1", true).await.expect("set banned");
	adapter.update_user_email("mod-1", Some("mod@example.com")).await.expect("email");

	let m = adapter.read_user("mod-1").await.expect("read mod");
	assert!(m.is_mod);
	assert_eq!(m.email.as_deref(), Some("mod@example.com"));

	let b = adapter.read_user("bad-1").await.expect("read banned");
	assert!(b.is_banned);

	assert_eq!(adapter.count_users().await.expect("count"), 2);
	assert_eq!(adapter.count_banned_users().await.expect("count banned"), 1);

	let with_email = adapter.list_users_with_email().await.expect("list");
	assert_eq!(with_email.len(), 1);
	assert_eq!(&*with_email[0].id, "mod-1");

	adapter.update_user_email("mod-1", None).await.expect("clear email");
	assert!(adapter.list_users_with_email().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_ip_ban_level() {
	let (adapter, _temp) = create_test_adapter().await;

	let ip = adapter.ensure_ip("10.0.0.1").await.expect("ensure ip");
	assert!(ip.ban_level.is_none());

	let ip2 = adapter.set_ip_ban_level("10.0.0.1", Some(BanLevel::Hard)).await.expect("ban");
	assert_eq!(ip.id, ip2.id);
	assert_eq!(ip2.ban_level, Some(BanLevel::Hard));
	assert_eq!(adapter.count_banned_ips().await.expect("count"), 1);

	// Unknown IPs are created on the fly
	let ip3 = adapter.set_ip_ban_level("10.0.0.2", Some(BanLevel::Soft)).await.expect("ban new");
	assert_eq!(ip3.ban_level, Some(BanLevel::Soft));
	assert_eq!(adapter.count_banned_ips().await.expect("count"), 2);

	adapter.set_ip_ban_level("10.0.0.1", None).await.expect("unban");
	assert_eq!(adapter.count_banned_ips().await.expect("count"), 1);
}

#[tokio::test]
async fn test_interactions_newest_first_with_targets() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter
		.create_interaction(&CreateInteraction {
			typ: InteractionType::Detect,
			user_id: Some("user-a"),
			ip: Some("10.0.0.1"),
			target_users: &[],
			target_ips: &[],
			data: json!({ "url": "https://example.com" }),
		})
		.await
		.expect("create detect");
	adapter
		.create_interaction(&CreateInteraction {
			typ: InteractionType::BanIp,
			user_id: Some("mod-1"),
			ip: None,
			target_users: &["user-a"],
			target_ips: &["10.0.0.9"],
			data: json!({ "level": "hard" }),
		})
		.await
		.expect("create ban");

	assert_eq!(adapter.count_interactions().await.expect("count"), 2);

	let list = adapter
		.list_interactions(&ListInteractionOptions { limit: 10, offset: 0 })
		.await
		.expect("list");
	assert_eq!(list.len(), 2);
	assert_eq!(list[0].typ, InteractionType::BanIp);
	assert_eq!(list[0].target_ips, vec![Box::<str>::from("10.0.0.9")]);
	assert_eq!(list[0].target_users, vec![Box::<str>::from("user-a")]);
	assert_eq!(list[0].data["level"], "hard");
	assert_eq!(list[1].typ, InteractionType::Detect);
	assert_eq!(list[1].ip.as_deref(), Some("10.0.0.1"));

	let page = adapter
		.list_interactions(&ListInteractionOptions { limit: 1, offset: 1 })
		.await
		.expect("page");
	assert_eq!(page.len(), 1);
	assert_eq!(page[0].typ, InteractionType::Detect);
}

#[tokio::test]
async fn test_watch_lifecycle() {
	let (adapter, _temp) = create_test_adapter().await;

	let watch = adapter
		.create_watch(&CreateWatch {
			user_id: "user-a",
			url: "https://example.com",
			email: "a@example.com",
		})
		.await
		.expect("create watch");
	assert!(watch.last_hash.is_none());
	assert!(watch.last_checked_at.is_none());

	assert_eq!(adapter.count_watches_by_user("user-a").await.expect("count"), 1);
	assert_eq!(adapter.list_watches_by_user("user-b").await.expect("list").len(), 0);

	adapter
		.update_watch_check(
			watch.id,
			&WatchCheck { hash: "h1", checked_at: Timestamp(100), changed: false },
		)
		.await
		.expect("baseline");
	let w = adapter.read_watch(watch.id).await.expect("read");
	assert_eq!(w.last_hash.as_deref(), Some("h1"));
	assert_eq!(w.last_checked_at, Some(Timestamp(100)));
	assert!(w.last_changed_at.is_none());

	adapter
		.update_watch_check(
			watch.id,
			&WatchCheck { hash: "h2", checked_at: Timestamp(200), changed: true },
		)
		.await
		.expect("change");
	let w = adapter.read_watch(watch.id).await.expect("read");
	assert_eq!(w.last_changed_at, Some(Timestamp(200)));

	assert_eq!(adapter.list_watches().await.expect("all").len(), 1);

	adapter.delete_watch(watch.id).await.expect("delete");
	assert!(matches!(adapter.delete_watch(watch.id).await, Err(Error::NotFound)));
	assert!(matches!(adapter.read_watch(watch.id).await, Err(Error::NotFound)));
}

// vim: ts=4
