//! Tenant identifier
//!
//! `TenantId` is the `(org_id, app_id)` pair that scopes every route and
//! plugin instance. Equality is structural; `key()` is the canonical map key
//! used across the live set, caches, and storage drivers.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TenantError};

/// Allowed shape for org and app ids.
pub const ID_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9_.\-]*$";

/// Maximum length of an org or app id.
pub const MAX_ID_LEN: usize = 64;

static ID_VALIDATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ID_PATTERN).expect("id pattern is valid"));

/// Tenant identity: organization plus application.
///
/// # Example
///
/// ```
/// use relay_tenant::TenantId;
///
/// let tid = TenantId::new("comcast", "xfi").unwrap();
/// assert_eq!(tid.key(), "comcast.xfi");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId {
    /// Organization id
    #[serde(rename = "orgId")]
    pub org_id: String,

    /// Application id within the organization
    #[serde(rename = "appId")]
    pub app_id: String,
}

impl TenantId {
    /// Create a validated tenant id.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::InvalidId` if either id is empty, too long, or
    /// does not match [`ID_PATTERN`].
    pub fn new(org_id: impl Into<String>, app_id: impl Into<String>) -> Result<Self> {
        let tid = Self {
            org_id: org_id.into(),
            app_id: app_id.into(),
        };
        tid.validate()?;
        Ok(tid)
    }

    /// Validate both ids against the restricted pattern.
    pub fn validate(&self) -> Result<()> {
        validate_id("orgId", &self.org_id)?;
        validate_id("appId", &self.app_id)?;
        Ok(())
    }

    /// Canonical map key: `"<org>.<app>"`.
    #[inline]
    pub fn key(&self) -> String {
        format!("{}.{}", self.org_id, self.app_id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.org_id, self.app_id)
    }
}

/// Validate a single org or app id.
pub fn validate_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TenantError::InvalidId {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    if value.len() > MAX_ID_LEN || !ID_VALIDATOR.is_match(value) {
        return Err(TenantError::InvalidId {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
