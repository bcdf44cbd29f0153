//! Persistence port round trips against an in-memory backend
//!
//! `MemoryRepository` stores `NodeRecord` snapshots and enforces the
//! compare-and-swap on the loaded version that real backends must honor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use node_core::node::{Node, NodeDraft, NodeFilter, NodeRecord, NodeRepository, NodeStatus};
use node_core::protocol::{Hysteria2Config, Protocol, TlsOptions, VmessCipher, VmessConfig};
use node_core::RepositoryError;

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
struct MemoryRepository {
    records: Mutex<HashMap<u64, NodeRecord>>,
    next_id: AtomicU64,
}

fn load(record: &NodeRecord) -> Result<Node, RepositoryError> {
    Node::reconstruct(record.clone()).map_err(|e| RepositoryError::Storage(e.to_string()))
}

#[async_trait]
impl NodeRepository for MemoryRepository {
    async fn get_by_id(&self, id: u64) -> Result<Option<Node>, RepositoryError> {
        let records = self.records.lock().await;
        records.get(&id).map(load).transpose()
    }

    async fn get_by_sid(&self, sid: &str) -> Result<Option<Node>, RepositoryError> {
        let records = self.records.lock().await;
        records.values().find(|r| r.sid == sid).map(load).transpose()
    }

    async fn get_by_token_hash(&self, hash: &str) -> Result<Option<Node>, RepositoryError> {
        let records = self.records.lock().await;
        records
            .values()
            .find(|r| r.token_hash == hash)
            .map(load)
            .transpose()
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<Node>, RepositoryError> {
        let records = self.records.lock().await;
        let mut nodes = Vec::new();
        for record in records.values() {
            let node = load(record)?;
            if filter.matches(&node) {
                nodes.push(node);
            }
        }
        nodes.sort_by_key(Node::sort_order);
        Ok(nodes)
    }

    async fn create(&self, node: &Node) -> Result<u64, RepositoryError> {
        let mut records = self.records.lock().await;
        if records.values().any(|r| r.sid == node.sid()) {
            return Err(RepositoryError::DuplicateSid(node.sid().to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut record = node.snapshot();
        record.id = Some(id);
        records.insert(id, record);
        Ok(id)
    }

    async fn update(&self, node: &Node) -> Result<(), RepositoryError> {
        let id = node.id().ok_or_else(|| RepositoryError::Unpersisted {
            sid: node.sid().to_string(),
        })?;
        let mut records = self.records.lock().await;
        let stored = records.get_mut(&id).ok_or(RepositoryError::NotFound { id })?;

        let expected = node.original_version();
        if stored.version != expected {
            return Err(RepositoryError::VersionConflict {
                id,
                expected,
                actual: stored.version,
            });
        }
        *stored = node.snapshot();
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().await;
        records
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound { id })
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

fn vmess_node(sid: &'static str) -> Node {
    Node::create(
        NodeDraft::new(sid, "v.example.com", 443, VmessConfig::new(VmessCipher::Auto))
            .with_groups([7]),
        &move || sid.to_string(),
    )
    .unwrap()
}

async fn persist(repo: &MemoryRepository, node: &Node) -> u64 {
    let id = repo.create(node).await.unwrap();
    node.assign_id(id).unwrap();
    node.mark_persisted();
    id
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_reload() {
    let repo = MemoryRepository::default();
    let node = vmess_node("vm-1");
    let id = persist(&repo, &node).await;

    assert_eq!(node.id(), Some(id));
    assert!(!node.is_dirty());

    let loaded = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.id(), Some(id));
    assert_eq!(loaded.sid(), "vm-1");
    assert_eq!(loaded.version(), 1);
    assert_eq!(loaded.original_version(), 1);
    // plaintext tokens never survive persistence
    assert!(loaded.plain_api_token().is_none());

    let by_sid = repo.get_by_sid("vm-1").await.unwrap().unwrap();
    assert_eq!(by_sid.id(), Some(id));
}

#[tokio::test]
async fn test_duplicate_sid() {
    let repo = MemoryRepository::default();
    persist(&repo, &vmess_node("vm-1")).await;
    let err = repo.create(&vmess_node("vm-1")).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateSid(_)));
}

#[tokio::test]
async fn test_update_then_mark_persisted() {
    let repo = MemoryRepository::default();
    let node = vmess_node("vm-1");
    let id = persist(&repo, &node).await;

    node.activate().unwrap();
    node.update_name("VMess Tokyo").unwrap();
    assert!(node.is_dirty());
    assert_eq!(node.original_version(), 1);

    repo.update(&node).await.unwrap();
    node.mark_persisted();
    assert!(!node.is_dirty());

    let loaded = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.version(), 3);
    assert_eq!(loaded.status(), NodeStatus::Active);
    assert_eq!(loaded.name(), "VMess Tokyo");
}

#[tokio::test]
async fn test_concurrent_writers_conflict() {
    let repo = MemoryRepository::default();
    let id = persist(&repo, &vmess_node("vm-1")).await;

    let first = repo.get_by_id(id).await.unwrap().unwrap();
    let second = repo.get_by_id(id).await.unwrap().unwrap();

    first.activate().unwrap();
    repo.update(&first).await.unwrap();
    first.mark_persisted();

    second.update_sort_order(5);
    let err = repo.update(&second).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(
        err,
        RepositoryError::VersionConflict { expected: 1, actual: 2, .. }
    ));

    // reload and retry
    let retry = repo.get_by_id(id).await.unwrap().unwrap();
    retry.update_sort_order(5);
    repo.update(&retry).await.unwrap();
    let stored = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.version(), 3);
    assert_eq!(stored.status(), NodeStatus::Active);
    assert_eq!(stored.sort_order(), 5);
}

#[tokio::test]
async fn test_unpersisted_update_rejected() {
    let repo = MemoryRepository::default();
    let err = repo.update(&vmess_node("vm-1")).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Unpersisted { .. }));
}

#[tokio::test]
async fn test_list_with_filter() {
    let repo = MemoryRepository::default();
    let a = vmess_node("vm-1");
    a.update_sort_order(2);
    a.activate().unwrap();
    let b = vmess_node("vm-2");
    b.update_sort_order(1);
    b.activate().unwrap();
    let c = Node::create(
        NodeDraft::new("hy-1", "h.example.com", 443, Hysteria2Config::new(TlsOptions::with_sni("h.example.com"))),
        &|| "hy-1".to_string(),
    )
    .unwrap();
    for node in [&a, &b, &c] {
        persist(&repo, node).await;
    }

    let all = repo.list(&NodeFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let active_vmess = repo
        .list(&NodeFilter {
            status: Some(NodeStatus::Active),
            protocol: Some(Protocol::Vmess),
            ..NodeFilter::default()
        })
        .await
        .unwrap();
    let sids: Vec<_> = active_vmess.iter().map(|n| n.sid().to_string()).collect();
    assert_eq!(sids, ["vm-2", "vm-1"]);

    let grouped = repo
        .list(&NodeFilter {
            group_id: Some(7),
            ..NodeFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(grouped.len(), 2);
}

#[tokio::test]
async fn test_lookup_by_token_hash() {
    let repo = MemoryRepository::default();
    let node = vmess_node("vm-1");
    let token = node.plain_api_token().unwrap();
    persist(&repo, &node).await;

    let hash = node_core::node::hash_token(&token);
    let found = repo.get_by_token_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.sid(), "vm-1");
    assert!(found.verify_api_token(&token));

    assert!(repo
        .get_by_token_hash(&node_core::node::hash_token("node_other"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_delete() {
    let repo = MemoryRepository::default();
    let id = persist(&repo, &vmess_node("vm-1")).await;

    repo.delete(id).await.unwrap();
    assert!(repo.get_by_id(id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete(id).await,
        Err(RepositoryError::NotFound { id: missing }) if missing == id
    ));
}
