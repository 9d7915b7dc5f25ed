//! Integration tests for instance status reconciliation

mod common;

use std::sync::Arc;

use fleetconf_common::FleetconfError;
use fleetconf_config::service::ledger::{compute_fingerprint, save_new_version};
use fleetconf_config::service::publish::publish;
use fleetconf_config::service::status::list_instance_status;
use fleetconf_config::{Author, StatusProbes};

use common::*;

#[tokio::test]
async fn test_status_merges_probes_over_stored_rows() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let probes = StatusProbes {
        used: Arc::new(FixedProbe(Ok(vec![("h1", 1)]))),
        synced: Arc::new(FixedProbe(Ok(vec![("h1", 1), ("h2", 1)]))),
        take_effect: Arc::new(FixedProbe(Err("governance endpoint timeout"))),
    };
    let h = harness_with(db.clone(), RecordingKv::default(), ScriptedProxy::default(), probes);

    let history_id = save_new_version(&h.ctx, config.id, "a = 1\n", Author::User(7), "init")
        .await
        .unwrap();
    publish(&h.ctx, config.id, history_id, 7).await.unwrap();

    // joined after the publish, so it has no status row yet
    seed_node(&db, "h3", "10.0.0.3", "dev", "wh").await;

    let views = list_instance_status(&h.ctx, config.id, "dev", "wh")
        .await
        .unwrap();

    assert_eq!(views.len(), 2);
    assert_eq!(views[0].host_name, "h1");
    assert_eq!(views[0].config_file_used, 1);
    assert_eq!(views[0].config_file_synced, 1);
    assert_eq!(views[0].config_file_take_effect, 0);
    assert_eq!(views[1].host_name, "h2");
    assert_eq!(views[1].config_file_used, 0);
    assert_eq!(views[1].config_file_synced, 1);
    assert_eq!(views[1].config_file_take_effect, 0);

    let view = &views[0];
    assert_eq!(view.ip, "10.0.0.1");
    assert_eq!(view.zone_code, "wh");
    assert_eq!(view.version, compute_fingerprint("a = 1\n"));
    assert_eq!(view.change_log, "init");
    assert_eq!(
        view.config_file_path,
        "/a/svc/config/app.toml;/b/svc/config/app.toml"
    );
}

#[tokio::test]
async fn test_status_follows_latest_publish() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let h = harness(db.clone());

    let first = save_new_version(&h.ctx, config.id, "a = 1\n", Author::User(7), "v1")
        .await
        .unwrap();
    publish(&h.ctx, config.id, first, 7).await.unwrap();
    let second = save_new_version(&h.ctx, config.id, "a = 2\n", Author::User(7), "v2")
        .await
        .unwrap();
    publish(&h.ctx, config.id, second, 7).await.unwrap();

    let views = list_instance_status(&h.ctx, config.id, "dev", "wh")
        .await
        .unwrap();

    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|v| v.change_log == "v2"));
    assert!(
        views
            .iter()
            .all(|v| v.version == compute_fingerprint("a = 2\n"))
    );
}

#[tokio::test]
async fn test_status_without_publish_is_empty() {
    let db = setup_db().await;
    let config = seed_fleet(&db).await;
    let h = harness(db);

    let views = list_instance_status(&h.ctx, config.id, "dev", "wh")
        .await
        .unwrap();
    assert!(views.is_empty());
}

#[tokio::test]
async fn test_status_of_missing_configuration() {
    let db = setup_db().await;
    let h = harness(db);

    let err = list_instance_status(&h.ctx, 99, "dev", "wh")
        .await
        .unwrap_err();
    assert!(matches!(err, FleetconfError::NotFound(_)));
}
