// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for the server lifecycle manager
//!
//! Covers the create-server saga and its compensating rollback, the
//! deletion veto point, permission gating, and the read operations.

use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

use hostpanel::access::{AllowAll, Caller, Operation, StaticPolicy};
use hostpanel::domain::{NewUser, ServerId, UserId};
use hostpanel::errors::ApiError;
use hostpanel::hooks::{HookPoint, HookRegistry};
use hostpanel::store::{MemoryStore, RecordStore};
use hostpanel::ServerLifecycle;

struct TestBed {
    store: Arc<MemoryStore>,
    hooks: Arc<HookRegistry>,
    lifecycle: ServerLifecycle,
    admin: Caller,
}

fn testbed() -> TestBed {
    let store = Arc::new(MemoryStore::new());
    let hooks = Arc::new(HookRegistry::new());
    let lifecycle = ServerLifecycle::new(store.clone(), hooks.clone(), Arc::new(AllowAll));
    TestBed {
        store,
        hooks,
        lifecycle,
        admin: Caller::new(UserId(1), "admin"),
    }
}

#[tokio::test]
async fn test_create_server_returns_default_ip() {
    let bed = testbed();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.10", None)
        .await
        .unwrap();

    assert_eq!(export.server.name, "edge1");
    assert_eq!(export.server.description, "");
    assert_eq!(export.ips.len(), 1);
    assert_eq!(export.ips[0].value.to_string(), "192.0.2.10");
    assert!(export.ips[0].is_default);
    assert_eq!(export.server.owner, Some(bed.admin.user_id));
}

#[tokio::test]
async fn test_create_server_rolls_back_on_ip_conflict() {
    let bed = testbed();
    bed.lifecycle
        .create_server(&bed.admin, "existing", "", "10.0.0.1", None)
        .await
        .unwrap();

    let err = bed
        .lifecycle
        .create_server(&bed.admin, "S", "d", "10.0.0.1", None)
        .await
        .unwrap_err();

    // The error is the attach's conflict error, unchanged
    assert_eq!(err.status(), 406);
    assert!(err.to_string().contains("already exists for server \"existing\""));

    // No orphan server row remains
    let names: Vec<String> = bed
        .lifecycle
        .list_servers(None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["existing"]);
}

#[tokio::test]
async fn test_create_server_validates_before_writing() {
    let bed = testbed();

    let err = bed
        .lifecycle
        .create_server(&bed.admin, "   ", "", "192.0.2.1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "not-an-ip", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    assert!(bed.lifecycle.list_servers(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_server_with_unknown_owner() {
    let bed = testbed();
    let err = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", Some(UserId(77)))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 404);
    assert_eq!(
        err.to_string(),
        "Specified owner with id #77 does not exist"
    );
    assert!(bed.lifecycle.list_servers(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_server_with_explicit_owner() {
    let bed = testbed();
    let owner = bed
        .store
        .insert_user(NewUser {
            login: "alice".to_string(),
        })
        .await
        .unwrap();

    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", Some(owner.id))
        .await
        .unwrap();
    assert_eq!(export.server.owner, Some(owner.id));

    let owned = bed.lifecycle.list_servers(Some(owner.id)).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].name, "edge1");
}

#[tokio::test]
async fn test_permission_refusal_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let policy = Arc::new(StaticPolicy::new());
    let lifecycle = ServerLifecycle::new(store.clone(), Arc::new(HookRegistry::new()), policy);
    let caller = Caller::new(UserId(5), "nobody");

    let err = lifecycle
        .create_server(&caller, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), 403);
    assert_eq!(
        err.to_string(),
        "You are not allowed to access this function"
    );
    assert!(lifecycle.list_servers(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_without_attach_permission_rolls_back() {
    // The saga's attach step runs under the caller's identity; a caller
    // holding addServer but not addServerIP must not leave an IP-less
    // server behind.
    let store = Arc::new(MemoryStore::new());
    let policy = Arc::new(StaticPolicy::new());
    policy.grant(UserId(5), Operation::AddServer);
    let lifecycle = ServerLifecycle::new(store.clone(), Arc::new(HookRegistry::new()), policy);
    let caller = Caller::new(UserId(5), "halfway");

    let err = lifecycle
        .create_server(&caller, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), 403);
    assert!(lifecycle.list_servers(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_server_after_store_veto_rolls_back() {
    let bed = testbed();
    bed.hooks.on(HookPoint::AddServerAfterStore, |_| {
        anyhow::bail!("quota exceeded")
    });

    let err = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Hook {
            point: HookPoint::AddServerAfterStore,
            ..
        }
    ));
    assert!(err.to_string().contains("quota exceeded"));
    assert!(bed.lifecycle.list_servers(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_server_before_return_veto_keeps_state() {
    // A beforeReturn veto aborts the response, not the mutation: the
    // server exists fully formed afterwards.
    let bed = testbed();
    bed.hooks
        .on(HookPoint::AddServerBeforeReturn, |_| anyhow::bail!("late"));

    let err = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Hook {
            point: HookPoint::AddServerBeforeReturn,
            ..
        }
    ));
    let servers = bed.lifecycle.list_servers(None).await.unwrap();
    assert_eq!(servers.len(), 1);
    let export = bed.lifecycle.get_server(servers[0].id).await.unwrap();
    assert_eq!(export.ips.len(), 1);
    assert!(export.ips[0].is_default);
}

#[tokio::test]
async fn test_create_server_hook_order_and_payloads() {
    let bed = testbed();
    let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    for point in [
        HookPoint::AddServerAfterStore,
        HookPoint::AddServerIpAfterStore,
        HookPoint::AddServerIpBeforeReturn,
        HookPoint::AddServerBeforeReturn,
    ] {
        let sink = order.clone();
        bed.hooks.on(point, move |payload| {
            sink.lock().unwrap().push(format!(
                "{point}:{}",
                payload.get("ips").map(|ips| ips.as_array().unwrap().len()).unwrap_or_default()
            ));
            Ok(())
        });
    }

    bed.lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap();

    let seen = order.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            // server export before the IP exists
            "addServer_afterStore:0".to_string(),
            // IP exports carry no ips array
            "addServerIP_afterStore:0".to_string(),
            "addServerIP_beforeReturn:0".to_string(),
            // full export with the attached IP
            "addServer_beforeReturn:1".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_delete_server_veto_keeps_server() {
    let bed = testbed();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap();
    bed.hooks.on(HookPoint::DeleteServerBeforeDelete, |_| {
        anyhow::bail!("server still referenced by billing")
    });

    let err = bed
        .lifecycle
        .delete_server(&bed.admin, export.server.id)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("still referenced by billing"));
    assert!(bed
        .store
        .load_server(export.server.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_delete_server_leaves_ip_rows() {
    // Pins the no-cascade decision: the server row goes, its IP rows stay
    // and keep holding their values against global uniqueness.
    let bed = testbed();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap();

    bed.lifecycle
        .delete_server(&bed.admin, export.server.id)
        .await
        .unwrap();

    let err = bed
        .lifecycle
        .get_server(export.server.id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 404);
    assert!(bed.store.load_ip(export.ips[0].id).await.unwrap().is_some());

    // The orphaned value still blocks reuse; the conflict message falls
    // back to the deleted server's id
    let other = bed
        .lifecycle
        .create_server(&bed.admin, "other", "", "192.0.2.2", None)
        .await
        .unwrap();
    let err = bed
        .lifecycle
        .registry()
        .attach(&bed.admin, other.server.id, "192.0.2.1", false)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 406);
    assert!(err
        .to_string()
        .contains(&format!("#{}", export.server.id)));
}

#[tokio::test]
async fn test_delete_unknown_server_is_not_found() {
    let bed = testbed();
    let err = bed
        .lifecycle
        .delete_server(&bed.admin, ServerId(9))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Server with id #9 could not be found");
}

#[tokio::test]
async fn test_modify_server_fields() {
    let bed = testbed();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "old", "192.0.2.1", None)
        .await
        .unwrap();

    let updated = bed
        .lifecycle
        .modify_server(
            &bed.admin,
            export.server.id,
            Some("  edge1-renamed "),
            Some("new description"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(updated.server.name, "edge1-renamed");
    assert_eq!(updated.server.description, "new description");
    assert_eq!(updated.ips.len(), 1, "IP set untouched");
}

#[tokio::test]
async fn test_modify_server_empty_name_is_ignored() {
    let bed = testbed();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap();

    let updated = bed
        .lifecycle
        .modify_server(&bed.admin, export.server.id, Some("   "), None, None)
        .await
        .unwrap();
    assert_eq!(updated.server.name, "edge1");
}

#[tokio::test]
async fn test_modify_server_owner_reassignment() {
    let bed = testbed();
    let alice = bed
        .store
        .insert_user(NewUser {
            login: "alice".to_string(),
        })
        .await
        .unwrap();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap();

    let updated = bed
        .lifecycle
        .modify_server(&bed.admin, export.server.id, None, None, Some(alice.id))
        .await
        .unwrap();
    assert_eq!(updated.server.owner, Some(alice.id));

    // Owner id 0 removes the previous owner; the acting caller takes over
    let updated = bed
        .lifecycle
        .modify_server(&bed.admin, export.server.id, None, None, Some(UserId(0)))
        .await
        .unwrap();
    assert_eq!(updated.server.owner, Some(bed.admin.user_id));

    let err = bed
        .lifecycle
        .modify_server(&bed.admin, export.server.id, None, None, Some(UserId(88)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn test_list_servers_ordered_and_filtered() {
    let bed = testbed();
    let owner = bed
        .store
        .insert_user(NewUser {
            login: "alice".to_string(),
        })
        .await
        .unwrap();
    bed.lifecycle
        .create_server(&bed.admin, "zeta", "", "10.0.0.1", None)
        .await
        .unwrap();
    bed.lifecycle
        .create_server(&bed.admin, "alpha", "", "10.0.0.2", Some(owner.id))
        .await
        .unwrap();
    bed.lifecycle
        .create_server(&bed.admin, "mid", "", "10.0.0.3", None)
        .await
        .unwrap();

    let names: Vec<String> = bed
        .lifecycle
        .list_servers(None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);

    let owned: Vec<String> = bed
        .lifecycle
        .list_servers(Some(owner.id))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(owned, vec!["alpha"]);
}

#[tokio::test]
async fn test_get_server_exports_ips() {
    let bed = testbed();
    let export = bed
        .lifecycle
        .create_server(&bed.admin, "edge1", "", "192.0.2.1", None)
        .await
        .unwrap();
    bed.lifecycle
        .registry()
        .attach(&bed.admin, export.server.id, "192.0.2.2", false)
        .await
        .unwrap();

    let fetched = bed.lifecycle.get_server(export.server.id).await.unwrap();
    assert_eq!(fetched.ips.len(), 2);
    assert_eq!(
        fetched.default_ip().unwrap().value.to_string(),
        "192.0.2.1"
    );

    let err = bed.lifecycle.get_server(ServerId(50)).await.unwrap_err();
    assert_eq!(err.status(), 404);
}
