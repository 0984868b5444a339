pub mod audit;
pub mod bridge;
pub mod closure;
pub mod config;
pub mod correlator;
pub mod error;
pub mod monitoring;
pub mod opener;
pub mod testing;
pub mod ticketing;

pub use audit::{AuditEntry, AuditLog, FileAuditLog};
pub use bridge::{EventClose, EventOpen, IncidentBridge};
pub use closure::{ClosureEngine, ClosureReport, ClosureRequest, ClosureState};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use correlator::{Correlation, EventCorrelator, TicketMarker};
pub use error::{exit_code, WorkflowError};
pub use monitoring::{Monitoring, MonitoringError, ZabbixClient};
pub use opener::{OpenOutcome, Opener};
pub use ticketing::{CitsmartClient, ResolutionParams, TicketingError, TicketingSystem};
