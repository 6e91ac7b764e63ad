//! Execution order of a run.

use std::collections::HashSet;

use crate::config::{ActionKind, PipelineConfig};

/// Computes the order in which enabled actions run.
///
/// Follows `ordering`, dropping repeats and kinds that are absent or
/// disabled. An enabled `purchase_authenticated` action always runs first,
/// whether or not `ordering` lists it.
#[must_use]
pub fn execution_order(pipeline: &PipelineConfig) -> Vec<ActionKind> {
    let mut order = Vec::with_capacity(pipeline.ordering.len() + 1);
    let mut seen = HashSet::new();

    if pipeline.is_enabled(ActionKind::PurchaseAuthenticated) {
        order.push(ActionKind::PurchaseAuthenticated);
        seen.insert(ActionKind::PurchaseAuthenticated);
    }

    for kind in &pipeline.ordering {
        if pipeline.is_enabled(*kind) && seen.insert(*kind) {
            order.push(*kind);
        }
    }

    order
}
