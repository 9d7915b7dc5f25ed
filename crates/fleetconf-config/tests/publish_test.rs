//! Integration tests for publish orchestration

mod common;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use fleetconf_common::{AgentCipher, FleetconfError};
use fleetconf_config::service::ledger::{compute_fingerprint, save_new_version};
use fleetconf_config::service::publish::{PublishPlan, publish, publish_version};
use fleetconf_config::{Author, EngineContext, PublishData};
use fleetconf_persistence::entity::{configuration, configuration_publish, configuration_status};

use common::*;

async fn publish_rows(db: &sea_orm::DatabaseConnection) -> (u64, u64) {
    let publishes = configuration_publish::Entity::find().count(db).await.unwrap();
    let statuses = configuration_status::Entity::find().count(db).await.unwrap();
    (publishes, statuses)
}

#[tokio::test]
async fn test_publish_writes_keys_and_ledger() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let h = harness(db.clone());

    let history_id = save_new_version(&h.ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    let receipt = publish(&h.ctx, config.id, history_id, 7).await.unwrap();

    // 2 hosts x 2 prefixes x (host key + cluster key)
    assert_eq!(receipt.keys_written, 8);
    assert_eq!(receipt.instances, vec!["h1", "h2"]);
    assert_eq!(
        receipt.file_path,
        "/a/svc/config/app.toml;/b/svc/config/app.toml"
    );

    let keys = h.kv.keys();
    assert_eq!(keys.len(), 8);
    assert!(keys.contains(&"/p1/h1/svc/dev/static/app.toml/9090".to_string()));
    assert!(keys.contains(&"/p2/h2/svc/dev/static/app.toml/9090".to_string()));
    assert!(keys.contains(&"/p1/cluster/svc/dev/static/app.toml".to_string()));

    let version = compute_fingerprint("a = 1\n");
    let data: PublishData = serde_json::from_str(&h.kv.values()[0]).unwrap();
    assert_eq!(
        data.content,
        format!("fleetconf_configuration_version = \"{}\"\na = 1\n", version)
    );
    assert_eq!(data.metadata.format, "toml");
    assert_eq!(data.metadata.version, version);
    assert_eq!(
        data.metadata.paths,
        vec!["/a/svc/config/app.toml", "/b/svc/config/app.toml"]
    );

    let record = configuration_publish::Entity::find_by_id(receipt.publish_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.configuration_history_id, history_id);
    assert_eq!(record.apply_instance, r#"["h1","h2"]"#);
    assert_eq!(record.uid, 7);

    let statuses = configuration_status::Entity::find()
        .filter(configuration_status::Column::ConfigurationPublishId.eq(record.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(
        statuses
            .iter()
            .all(|s| s.used == 0 && s.synced == 0 && s.take_effect == 0)
    );

    let current = configuration::Entity::find_by_id(config.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(current.published_at.is_some());

    let events = h.events.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].app_name, "svc");
    assert_eq!(events[0].operator_uid, 7);
}

#[tokio::test]
async fn test_publish_without_instances_writes_nothing() {
    let db = setup_db().await;
    seed_app(&db).await;
    seed_node(&db, "h1", "10.0.0.1", "dev", "other").await;
    let config = seed_config(&db, "app", "toml", "dev", "wh").await;
    let h = harness(db.clone());

    let history_id = save_new_version(&h.ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    let err = publish(&h.ctx, config.id, history_id, 7).await.unwrap_err();

    assert!(matches!(err, FleetconfError::NoInstances { .. }));
    assert!(h.kv.keys().is_empty());
    assert_eq!(publish_rows(&db).await, (0, 0));
}

#[tokio::test]
async fn test_store_failure_leaves_ledger_untouched() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let h = harness_with(
        db.clone(),
        RecordingKv::failing_at(3),
        ScriptedProxy::default(),
        Default::default(),
    );

    let history_id = save_new_version(&h.ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    let err = publish(&h.ctx, config.id, history_id, 7).await.unwrap_err();

    assert!(matches!(err, FleetconfError::UpstreamFailure(_)));
    // keys written before the failure stay in the store
    assert_eq!(h.kv.keys().len(), 3);
    assert_eq!(publish_rows(&db).await, (0, 0));
    assert!(h.events.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_store_deadline_is_shared() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;

    let mut settings = test_settings();
    settings.publish_timeout = Duration::from_millis(50);
    let ctx = EngineContext::builder(db.clone())
        .settings(settings)
        .kv_store(Arc::new(StalledKv))
        .agent_proxy(Arc::new(ScriptedProxy::default()))
        .decryptor(Arc::new(AgentCipher::new(&TEST_KEY)))
        .build()
        .unwrap();

    let history_id = save_new_version(&ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    let err = publish(&ctx, config.id, history_id, 7).await.unwrap_err();

    assert!(matches!(err, FleetconfError::UpstreamFailure(_)));
    assert_eq!(publish_rows(&db).await, (0, 0));
}

#[tokio::test]
async fn test_history_of_other_configuration_not_found() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let other = seed_config(&db, "other", "yaml", "dev", "wh").await;
    let h = harness(db.clone());

    let history_id = save_new_version(&h.ctx, other.id, "a: 1\n", Author::User(7), "init")
        .await
        .unwrap();
    let err = publish(&h.ctx, config.id, history_id, 7).await.unwrap_err();

    assert!(matches!(err, FleetconfError::NotFound(_)));
    assert!(h.kv.keys().is_empty());
}

#[tokio::test]
async fn test_non_toml_payload_has_no_header() {
    let db = setup_db().await;
    seed_fleet(&db).await;
    let config = seed_config(&db, "app", "yaml", "dev", "wh").await;
    let h = harness(db.clone());

    let history_id = save_new_version(&h.ctx, config.id, "a: 1\n", Author::User(7), "init")
        .await
        .unwrap();
    let plan = PublishPlan::prepare(&h.ctx, config.id, history_id)
        .await
        .unwrap();

    let data: PublishData = serde_json::from_str(plan.payload()).unwrap();
    assert_eq!(data.content, "a: 1\n");
    assert_eq!(plan.instances(), ["h1", "h2"]);

    let committed = plan.commit_store(&h.ctx).await.unwrap();
    assert_eq!(committed.keys_written(), 8);
    let receipt = committed.commit_ledger(&h.ctx, 9).await.unwrap();
    assert_eq!(receipt.file_path, "/a/svc/config/app.yaml;/b/svc/config/app.yaml");
}

#[tokio::test]
async fn test_publish_by_version() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let h = harness(db.clone());

    let history_id = save_new_version(&h.ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    save_new_version(&h.ctx, config.id, "a = 2\n", Author::User(7), "next")
        .await
        .unwrap();

    let receipt = publish_version(&h.ctx, config.id, &compute_fingerprint("a = 1\n"), 7)
        .await
        .unwrap();
    assert_eq!(receipt.configuration_history_id, history_id);

    let err = publish_version(&h.ctx, config.id, "deadbeef", 7)
        .await
        .unwrap_err();
    assert!(matches!(err, FleetconfError::NotFound(_)));
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_publish() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;

    let events = Arc::new(RecordingEvents {
        fail: true,
        ..Default::default()
    });
    let ctx = EngineContext::builder(db.clone())
        .settings(test_settings())
        .kv_store(Arc::new(RecordingKv::default()))
        .agent_proxy(Arc::new(ScriptedProxy::default()))
        .decryptor(Arc::new(AgentCipher::new(&TEST_KEY)))
        .event_sink(events.clone())
        .build()
        .unwrap();

    let history_id = save_new_version(&ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    publish(&ctx, config.id, history_id, 7).await.unwrap();

    assert_eq!(events.events.lock().unwrap().len(), 1);
    assert_eq!(publish_rows(&db).await, (1, 2));
}
