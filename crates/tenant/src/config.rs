//! Tenant configuration record

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::id::TenantId;

/// Per-tenant configuration persisted alongside routes.
///
/// Quota enforcement itself lives outside the gateway core; the record is
/// carried so the control plane can round-trip it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// The tenant this configuration belongs to
    pub tenant: TenantId,

    /// Event throughput quota; 0 means unlimited
    #[serde(rename = "quota", default)]
    pub quota_events_per_sec: u64,

    /// Last modification time, epoch millis
    #[serde(default)]
    pub modified: i64,
}

impl TenantConfig {
    /// Create a configuration with an up-to-date modification stamp.
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            quota_events_per_sec: 0,
            modified: Utc::now().timestamp_millis(),
        }
    }

    /// Refresh the modification stamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now().timestamp_millis();
    }
}
