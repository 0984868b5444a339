//! Monitoring system abstraction.
//!
//! This module provides a `Monitoring` trait over the event API of the
//! alerting system and its Zabbix JSON-RPC implementation.

mod types;
mod zabbix;

pub use types::*;
pub use zabbix::ZabbixClient;
