//! Ticketing system abstraction.
//!
//! This module provides a `TicketingSystem` trait covering the remote calls
//! shared by opening and closing tickets, the CITSmart implementation, and
//! the extraction of ticket numbers from portal responses.

mod citsmart;
pub mod extract;
mod types;

pub use citsmart::{normalize_base_url, CitsmartClient};
pub use extract::{extract_task_id, extract_ticket_id, TicketIdSource};
pub use types::*;
