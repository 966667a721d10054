use tokio::sync::broadcast;

use crate::model::AuditRecord;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for override audit records.
///
/// The engine publishes here on every `AdmittedByOverride`; the surrounding
/// application subscribes and forwards to whatever audit trail or
/// notification pipeline it owns.
pub struct AuditHub {
    tx: broadcast::Sender<AuditRecord>,
}

impl AuditHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.tx.subscribe()
    }

    /// Log the structured record and fan it out. No-op if nobody is
    /// listening.
    pub fn publish(&self, record: &AuditRecord) {
        match serde_json::to_string(record) {
            Ok(json) => tracing::info!(target: "slotguard::audit", record = %json, "override admitted"),
            Err(e) => tracing::warn!("audit record not serializable: {e}"),
        }
        let _ = self.tx.send(record.clone());
    }
}

impl Default for AuditHub {
    fn default() -> Self {
        Self::new()
    }
}
