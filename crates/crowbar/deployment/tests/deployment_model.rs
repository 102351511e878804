//! End-to-end tests for the barclamp deployment model

use crowbar_deployment::{BarclampManager, CrowbarError, ErrorKind, ManagerConfig};
use crowbar_types::{Barclamp, DeploymentId, LifecycleState, NameRule, SnapshotStatus};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const FOO: &str = r#"
name: foo
description: unit test barclamp
roles:
  - name: private
    order: 0
    run_order: 0
  - name: server
    order: 10
    run_order: 10
"#;

const TEST: &str = r#"
name: test
allow_multiple_deployments: false
roles:
  - name: private
    order: 0
    run_order: 0
  - name: server
    order: 10
    run_order: 10
  - name: client
    order: 20
    run_order: 20
  - name: clone_me
    order: 90
    run_order: 90
    optional: true
"#;

struct Fixture {
    _dir: TempDir,
    manager: BarclampManager,
    foo: Barclamp,
}

fn write_definition(dir: &Path, contents: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("crowbar.yml"), contents).unwrap();
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup() -> Fixture {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("barclamps");
    write_definition(&root.join("test"), TEST);
    write_definition(&root.join("nodup1"), "name: nodup1\n");
    write_definition(&root.join("nodup2"), "name: nodup2\n");
    // foo lives outside the definitions root
    let foo_dir = dir.path().join("data").join("foo");
    write_definition(&foo_dir, FOO);

    let config = ManagerConfig {
        definitions_root: root,
        ..Default::default()
    };
    let manager = BarclampManager::from_config(&config);
    let foo = manager.import("foo", None, Some(&foo_dir)).await.unwrap();

    Fixture {
        _dir: dir,
        manager,
        foo,
    }
}

/// Bare deployment with one snapshot in `status`, made active
async fn deployment_with_status(f: &Fixture, status: SnapshotStatus) -> DeploymentId {
    let deployment = f
        .manager
        .create_deployment(&f.foo.id, "status")
        .await
        .unwrap();
    let snapshot = f
        .manager
        .create_snapshot(&deployment.id, "status2", status, None)
        .await
        .unwrap();
    f.manager
        .set_active_snapshot(&deployment.id, &snapshot.id)
        .await
        .unwrap();
    deployment.id
}

#[tokio::test]
async fn unique_per_barclamp_name() {
    let f = setup().await;
    let b1 = f.manager.import("nodup1", None, None).await.unwrap();
    let b2 = f.manager.import("nodup2", None, None).await.unwrap();

    let d1 = f.manager.create_deployment(&b1.id, "nodup").await.unwrap();
    let d2 = f.manager.create_deployment(&b2.id, "nodup").await.unwrap();
    assert_ne!(d1.id, d2.id);

    // nodup1 allows a single deployment; the name clash is still what fails
    assert!(!b1.allow_multiple_deployments);
    let err = f
        .manager
        .create_deployment(&b1.id, "nodup")
        .await
        .unwrap_err();
    assert!(matches!(err, CrowbarError::DuplicateName { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(f.manager.deployments(&b1.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn illegal_names_rejected() {
    let f = setup().await;
    let cases = [
        ("1123", NameRule::LeadingCharacter),
        ("1foo", NameRule::LeadingCharacter),
        ("Ille!gal", NameRule::IllegalCharacter),
        (" nospaces", NameRule::Whitespace),
        ("no spaces", NameRule::Whitespace),
        ("nospacesatall ", NameRule::Whitespace),
    ];

    for (name, rule) in cases {
        let err = f
            .manager
            .create_deployment(&f.foo.id, name)
            .await
            .unwrap_err();
        match err {
            CrowbarError::InvalidName(e) => assert_eq!(e.rule, rule, "{name:?}"),
            other => panic!("{name:?}: unexpected {other}"),
        }
    }
    assert!(f.manager.deployments(&f.foo.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn active_works() {
    let f = setup().await;
    let config = f
        .manager
        .create_proposal(&f.foo.id, Some("active"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(f.manager.snapshots(&config.id).await.unwrap().len(), 1);
    assert!(!f.manager.is_active(&config.id).await.unwrap());
    assert!(f.manager.active_snapshot(&config.id).await.unwrap().is_none());

    let proposed = f
        .manager
        .proposed_snapshot(&config.id)
        .await
        .unwrap()
        .unwrap();
    f.manager
        .set_active_snapshot(&config.id, &proposed.id)
        .await
        .unwrap();

    assert_eq!(f.manager.snapshots(&config.id).await.unwrap().len(), 1);
    assert!(f.manager.is_active(&config.id).await.unwrap());
    assert!(f.manager.active_snapshot(&config.id).await.unwrap().is_some());
}

#[tokio::test]
async fn status_check_missing() {
    let f = setup().await;
    let config = f
        .manager
        .create_deployment(&f.foo.id, "status")
        .await
        .unwrap();
    f.manager
        .create_snapshot(&config.id, "status2", SnapshotStatus::default(), None)
        .await
        .unwrap();

    assert_eq!(
        f.manager.status(&config.id).await.unwrap(),
        LifecycleState::Inactive
    );
}

#[tokio::test]
async fn status_follows_active_snapshot() {
    let cases = [
        (SnapshotStatus::None, "none"),
        (SnapshotStatus::Queued, "pending"),
        (SnapshotStatus::Committing, "unready"),
        (SnapshotStatus::Failed, "failed"),
        (SnapshotStatus::Applied, "ready"),
        (SnapshotStatus::from_code(-1), "hold"),
    ];

    for (status, expected) in cases {
        let f = setup().await;
        let id = deployment_with_status(&f, status).await;
        let state = f.manager.status(&id).await.unwrap();
        assert_eq!(state.as_str(), expected, "{status}");
    }
}

#[tokio::test]
async fn create_proposal_without_name_is_default() {
    let f = setup().await;
    let test = f.manager.import("test", None, None).await.unwrap();
    assert!(f.manager.deployments(&test.id).await.unwrap().is_empty());
    assert!(!f.manager.template(&test.id).await.unwrap().roles.is_empty());

    let config = f
        .manager
        .create_proposal(&test.id, None)
        .await
        .unwrap()
        .unwrap();

    let deployments = f.manager.deployments(&test.id).await.unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].id, config.id);
    assert_eq!(config.name.as_str(), "default");
    assert_eq!(config.barclamp_id, test.id);
}

#[tokio::test]
async fn create_config_from_barclamp() {
    let f = setup().await;
    let test = f.manager.import("test", None, None).await.unwrap();
    assert!(!test.allow_multiple_deployments);

    let config = f
        .manager
        .create_proposal(&test.id, Some("foo"))
        .await
        .unwrap()
        .unwrap();

    let deployments = f.manager.deployments(&test.id).await.unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].id, config.id);
    assert_eq!(config.name.as_str(), "foo");
    assert_eq!(config.barclamp_id, test.id);
}

#[tokio::test]
async fn allow_multiple_proposals_works() {
    let f = setup().await;
    let test = f.manager.import("test", None, None).await.unwrap();
    assert!(!test.allow_multiple_deployments);

    f.manager
        .create_proposal(&test.id, Some("foo"))
        .await
        .unwrap()
        .unwrap();

    let rejected = f.manager.create_proposal(&test.id, Some("bar")).await.unwrap();
    assert!(rejected.is_none());
    let deployments = f.manager.deployments(&test.id).await.unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].name.as_str(), "foo");

    f.manager
        .set_allow_multiple_deployments(&test.id, true)
        .await
        .unwrap();
    let c3 = f
        .manager
        .create_proposal(&test.id, Some("bar"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c3.name.as_str(), "bar");
    assert_eq!(f.manager.deployments(&test.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn create_proposal_clones_roles() {
    let f = setup().await;
    let test = f.manager.import("test", None, None).await.unwrap();
    let count = f.manager.template(&test.id).await.unwrap().roles.len();

    let added = f
        .manager
        .add_template_role(&test.id, "clone_me")
        .await
        .unwrap();
    assert_eq!(added.name, "clone_me");
    f.manager
        .set_template_role_order(&test.id, &added.role_type_id, 1, 1)
        .await
        .unwrap();

    let template = f.manager.template(&test.id).await.unwrap();
    assert_eq!(template.roles.len(), count + 1);
    assert_eq!(
        template.roles.get(1).unwrap().role_type_id,
        added.role_type_id,
        "added role is second after private"
    );

    let config = f
        .manager
        .create_proposal(&test.id, Some("cloned"))
        .await
        .unwrap()
        .unwrap();
    let proposed = f
        .manager
        .proposed_snapshot(&config.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(proposed.roles.len(), template.roles.len());
    assert_eq!(
        proposed.roles.get(1).unwrap().role_type_id,
        template.roles.get(1).unwrap().role_type_id
    );
    assert_ne!(proposed.roles.get(1).unwrap().id, template.roles.get(1).unwrap().id);
}

#[tokio::test]
async fn snapshot_lifecycle() {
    let f = setup().await;
    let config = f
        .manager
        .create_proposal(&f.foo.id, Some("cycle"))
        .await
        .unwrap()
        .unwrap();
    let snapshot_id = config.proposed_snapshot_id.clone().unwrap();
    f.manager
        .set_active_snapshot(&config.id, &snapshot_id)
        .await
        .unwrap();

    let expected = [
        (SnapshotStatus::Queued, LifecycleState::Pending),
        (SnapshotStatus::Committing, LifecycleState::Unready),
        (SnapshotStatus::Failed, LifecycleState::Failed),
        (SnapshotStatus::Queued, LifecycleState::Pending),
        (SnapshotStatus::Committing, LifecycleState::Unready),
        (SnapshotStatus::Applied, LifecycleState::Ready),
    ];
    for (status, state) in expected {
        f.manager.transition(&snapshot_id, status).await.unwrap();
        assert_eq!(f.manager.status(&config.id).await.unwrap(), state);
    }

    let err = f
        .manager
        .transition(&snapshot_id, SnapshotStatus::Committing)
        .await
        .unwrap_err();
    assert!(matches!(err, CrowbarError::IllegalTransition(_)));
    assert_eq!(
        f.manager.snapshot(&snapshot_id).await.unwrap().status,
        SnapshotStatus::Applied
    );
}

#[tokio::test]
async fn foreign_snapshot_cannot_be_activated() {
    let f = setup().await;
    f.manager
        .set_allow_multiple_deployments(&f.foo.id, true)
        .await
        .unwrap();
    let a = f
        .manager
        .create_proposal(&f.foo.id, Some("a"))
        .await
        .unwrap()
        .unwrap();
    let b = f
        .manager
        .create_proposal(&f.foo.id, Some("b"))
        .await
        .unwrap()
        .unwrap();

    let err = f
        .manager
        .set_active_snapshot(&a.id, b.proposed_snapshot_id.as_ref().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, CrowbarError::ForeignSnapshot(_)));
    assert!(!f.manager.is_active(&a.id).await.unwrap());
}

#[tokio::test]
async fn delete_waits_for_commit() {
    let f = setup().await;
    let id = deployment_with_status(&f, SnapshotStatus::Queued).await;

    let err = f.manager.delete_deployment(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let active = f.manager.active_snapshot(&id).await.unwrap().unwrap();
    f.manager
        .transition(&active.id, SnapshotStatus::Committing)
        .await
        .unwrap();
    f.manager
        .transition(&active.id, SnapshotStatus::Applied)
        .await
        .unwrap();

    assert_eq!(f.manager.delete_deployment(&id).await.unwrap(), 1);
    assert_eq!(
        f.manager.deployment(&id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        f.manager.snapshot(&active.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    // The name is free again
    f.manager
        .create_deployment(&f.foo.id, "status")
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_proposals_respect_single_deployment() {
    let f = setup().await;
    let manager = Arc::new(f.manager);
    let barclamp_id = f.foo.id.clone();

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = manager.clone();
        let barclamp_id = barclamp_id.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("racer{i}");
            manager
                .create_proposal(&barclamp_id, Some(name.as_str()))
                .await
                .unwrap()
                .is_some()
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(manager.deployments(&barclamp_id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_imports_yield_one_barclamp() {
    let f = setup().await;
    let manager = Arc::new(f.manager);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.import("test", None, None).await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(manager.barclamps().await.unwrap().len(), 2);
}
