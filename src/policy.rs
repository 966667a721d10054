//! Buffer policy configuration: pure data plus the provider seam to the
//! salon's settings store.
//!
//! Evaluations never read live configuration. Each one takes a
//! [`PolicySnapshot`] value up front and works on that alone, so an edit in
//! the settings screen mid-evaluation can never produce a torn read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use ulid::Ulid;

/// Minutes of mandatory idle time demanded before/after a booking by one
/// policy scope. Absence of a rule at a scope means "no demand", which is
/// distinct from an explicit zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferRule {
    pub before_min: i64,
    pub after_min: i64,
}

impl BufferRule {
    pub fn new(before_min: i64, after_min: i64) -> Self {
        debug_assert!(before_min >= 0 && after_min >= 0, "buffers are non-negative");
        Self {
            before_min,
            after_min,
        }
    }
}

/// How buffer violations are treated. `strict_mode` always wins over
/// `allow_override`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementSettings {
    pub enabled: bool,
    pub strict_mode: bool,
    pub allow_override: bool,
}

impl Default for EnforcementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mode: false,
            allow_override: false,
        }
    }
}

/// Immutable view of the configured buffer rules at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub enforcement: EnforcementSettings,
    pub global: BufferRule,
    pub per_service: HashMap<Ulid, BufferRule>,
    pub per_staff: HashMap<Ulid, BufferRule>,
    pub per_location: HashMap<Ulid, BufferRule>,
}

impl PolicySnapshot {
    pub fn new(enforcement: EnforcementSettings, global: BufferRule) -> Self {
        Self {
            enforcement,
            global,
            per_service: HashMap::new(),
            per_staff: HashMap::new(),
            per_location: HashMap::new(),
        }
    }

    pub fn with_service_rule(mut self, id: Ulid, rule: BufferRule) -> Self {
        self.per_service.insert(id, rule);
        self
    }

    pub fn with_staff_rule(mut self, id: Ulid, rule: BufferRule) -> Self {
        self.per_staff.insert(id, rule);
        self
    }

    pub fn with_location_rule(mut self, id: Ulid, rule: BufferRule) -> Self {
        self.per_location.insert(id, rule);
        self
    }
}

/// The configuration store was unreachable. The engine fails closed on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyUnavailable(pub String);

impl std::fmt::Display for PolicyUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "policy store unavailable: {}", self.0)
    }
}

impl std::error::Error for PolicyUnavailable {}

/// Seam to the external policy configuration store.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    async fn snapshot(&self) -> Result<PolicySnapshot, PolicyUnavailable>;
}

/// In-memory provider. Settings-screen edits replace the whole snapshot;
/// in-flight evaluations keep the clone they already took.
pub struct InMemoryPolicies {
    inner: RwLock<PolicySnapshot>,
}

impl InMemoryPolicies {
    pub fn new(snapshot: PolicySnapshot) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(snapshot),
        })
    }

    pub async fn replace(&self, snapshot: PolicySnapshot) {
        *self.inner.write().await = snapshot;
    }
}

#[async_trait]
impl PolicyProvider for InMemoryPolicies {
    async fn snapshot(&self) -> Result<PolicySnapshot, PolicyUnavailable> {
        Ok(self.inner.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_default_off() {
        let e = EnforcementSettings::default();
        assert!(e.enabled);
        assert!(!e.strict_mode);
        assert!(!e.allow_override);
    }

    #[test]
    fn absent_rule_distinct_from_zero() {
        let staff = Ulid::new();
        let snap = PolicySnapshot::new(EnforcementSettings::default(), BufferRule::new(0, 10))
            .with_staff_rule(staff, BufferRule::new(0, 0));
        assert_eq!(snap.per_staff.get(&staff), Some(&BufferRule::new(0, 0)));
        assert_eq!(snap.per_staff.get(&Ulid::new()), None);
    }

    #[tokio::test]
    async fn in_memory_provider_replaces_whole_snapshot() {
        let provider =
            InMemoryPolicies::new(PolicySnapshot::new(EnforcementSettings::default(), BufferRule::new(5, 5)));
        let before = provider.snapshot().await.unwrap();
        assert_eq!(before.global, BufferRule::new(5, 5));

        provider
            .replace(PolicySnapshot::new(
                EnforcementSettings::default(),
                BufferRule::new(0, 15),
            ))
            .await;
        let after = provider.snapshot().await.unwrap();
        assert_eq!(after.global, BufferRule::new(0, 15));
        // the snapshot taken earlier is unaffected
        assert_eq!(before.global, BufferRule::new(5, 5));
    }
}
