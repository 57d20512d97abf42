//! # Netlab - small network emulation on Linux namespaces
//!
//! This library describes small emulated networks as typed data, checks them
//! statically and realizes them on Linux network namespaces.
//!
//! ## Overview
//!
//! Two scenarios are built in:
//!
//! - **LAN**: one Open vSwitch switch, six hosts in a star and an external
//!   OpenFlow controller on port 6633. Hosts h1 and h2 serve files over HTTP.
//! - **Routers**: four routers in a ring (r1-r2, r1-r3, r3-r4, r2-r4), each
//!   anchoring an access subnet with one switch and one host, plus a static
//!   route table with primary (metric 100) and backup (metric 200) paths.
//!
//! Custom scenarios can be loaded from YAML or JSON files.
//!
//! ## Architecture
//!
//! - `topology`: nodes, links, interface resolution and the two builders
//! - `routing`: route table, the built-in static routes, table validation
//!   and forwarding analysis
//! - `emulator`: command shells, router lifecycle hooks, network
//!   realization and the interactive console
//! - `config`: scenario structures and validation
//! - `config_loader`: scenario file loading and writing
//! - `orchestrator`: end-to-end scenario runs
//! - `utils`: CIDR helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use netlab::config::Scenario;
//! use netlab::emulator::RecordingShell;
//! use netlab::orchestrator;
//!
//! let scenario = Scenario::routers()?;
//!
//! // Record every command instead of touching the system
//! let run = orchestrator::run_scenario(&scenario, RecordingShell::new(), None)?;
//! assert!(run.routes.is_complete());
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Scenario Format
//!
//! ```yaml
//! name: pair
//! topology:
//!   name: pair
//!   nodes:
//!     - { name: h1, role: host, address: 10.0.0.1 }
//!     - { name: h2, role: host, address: 10.0.0.2 }
//!     - { name: s1, role: switch }
//!   links:
//!     - { endpoint_a: h1, endpoint_b: s1 }
//!     - { endpoint_a: h2, endpoint_b: s1 }
//! services:
//!   - { host: h1, command: "python3 -m http.server 80" }
//! ```
//!
//! An address without a prefix length gets `/8`.
//!
//! ## Error Handling
//!
//! Library modules return typed `thiserror` errors; the runner and the binary
//! wrap them with `color_eyre` context.

pub mod config;
pub mod config_loader;
pub mod emulator;
pub mod orchestrator;
pub mod routing;
pub mod topology;
pub mod utils;
