//! Fragment resolver
//!
//! Rewrites every fragment reference in a route into the tenant's stored
//! fragment before validation. A stored fragment body may itself carry an
//! onward reference, forming a chain; resolution is bounded by depth and a
//! visited set detects cycles by name.

use std::collections::HashSet;
use std::sync::Arc;

use relay_route::{PluginConfig, RouteConfig, RouteError, RouteStorer};
use relay_tenant::TenantId;

use crate::error::{Result, TableError};

/// Bound on fragment-in-fragment nesting.
pub const MAX_FRAGMENT_DEPTH: usize = 8;

/// Resolve every fragment reference in `route` against the tenant's
/// fragment set.
///
/// # Errors
///
/// `TableError::BadConfig` for an unresolved fragment (naming it), a
/// reference cycle, or nesting beyond [`MAX_FRAGMENT_DEPTH`].
pub async fn resolve_fragments(
    storer: &Arc<dyn RouteStorer>,
    tid: &TenantId,
    route: &mut RouteConfig,
) -> Result<()> {
    resolve_node(storer, tid, &mut route.receiver).await?;
    for filter in &mut route.filter_chain {
        resolve_node(storer, tid, filter).await?;
    }
    resolve_node(storer, tid, &mut route.sender).await?;
    Ok(())
}

async fn resolve_node(
    storer: &Arc<dyn RouteStorer>,
    tid: &TenantId,
    node: &mut PluginConfig,
) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut depth = 0;
    while let Some(name) = node.fragment_name.clone() {
        if !visited.insert(name.clone()) {
            return Err(TableError::BadConfig(format!(
                "fragment reference cycle through '{}'",
                name
            )));
        }
        depth += 1;
        if depth > MAX_FRAGMENT_DEPTH {
            return Err(TableError::BadConfig(format!(
                "fragment nesting exceeds depth {}",
                MAX_FRAGMENT_DEPTH
            )));
        }
        let mut fragment = match storer.get_fragment(tid, &name).await {
            Ok(fragment) => fragment,
            Err(RouteError::FragmentNotFound { name }) => {
                return Err(TableError::BadConfig(format!("unresolved fragment '{}'", name)));
            }
            Err(err) => return Err(err.into()),
        };
        // The reference node's own name survives resolution.
        if !node.name.is_empty() {
            fragment.name = node.name.clone();
        }
        *node = fragment;
    }
    Ok(())
}
