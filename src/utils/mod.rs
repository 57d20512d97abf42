//! Shared utilities: CIDR parsing and serde helpers for addresses.

pub mod ip_utils;

pub use ip_utils::{parse_cidr, subnet_of, DEFAULT_PREFIX_LEN};
