//! Static IP routing module.
//!
//! This module holds the route table model, the fixed table for the
//! four-router scenario, static validation of a table against a topology,
//! and a forwarding analysis that walks the table hop by hop.

pub mod table;
pub mod static_routes;
pub mod validation;
pub mod forwarding;

// Re-export commonly used types
pub use table::{RouteEntry, RouteError, RouteTable, KERNEL_DEFAULT_METRIC};
pub use static_routes::{router_route_table, BACKUP_METRIC, PRIMARY_METRIC};
pub use validation::{check_metric_order, missing_routes, validate_entry, validate_route_table};
pub use forwarding::{lookup, trace, LinkFailures, NextHop};
