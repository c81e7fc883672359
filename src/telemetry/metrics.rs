//! Lifecycle metrics recorded through the `metrics` facade.
//!
//! Without an installed recorder every call is a no-op.

use metrics::counter;

pub const TEARDOWNS_TOTAL: &str = "gg_learner_teardowns_total";
pub const EXAMPLES_FREED_TOTAL: &str = "gg_learner_examples_freed_total";
pub const EXAMPLE_LEASES_TOTAL: &str = "gg_learner_example_leases_total";
pub const RELOADS_TOTAL: &str = "gg_learner_reloads_total";
pub const SAVES_TOTAL: &str = "gg_learner_saves_total";

pub fn record_teardown(examples_freed: usize) {
    counter!(TEARDOWNS_TOTAL).increment(1);
    counter!(EXAMPLES_FREED_TOTAL).increment(examples_freed as u64);
}

/// `reused` is false when a fresh native buffer had to be allocated.
pub fn record_example_lease(reused: bool) {
    let source = if reused { "pool" } else { "alloc" };
    counter!(EXAMPLE_LEASES_TOTAL, "source" => source).increment(1);
}

pub fn record_reload() {
    counter!(RELOADS_TOTAL).increment(1);
}

pub fn record_save() {
    counter!(SAVES_TOTAL).increment(1);
}
