//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use ticketbridge_core::config::ResolutionConfig;
use ticketbridge_core::ticketing::{ResolutionParams, WorkItemId};

/// Opens, correlates and closes service-desk tickets from monitoring alerts.
#[derive(Debug, Parser)]
#[command(name = "ticketbridge")]
#[command(about = "Zabbix to CITSmart incident ticket automation")]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "TICKETBRIDGE_CONFIG",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate against the ticketing system and exit
    Login,

    /// Open a ticket
    Open {
        /// Ticket description (words are joined with spaces)
        description: Vec<String>,
    },

    /// Open a ticket for a monitoring event and annotate the event with it
    OpenEvent {
        /// Monitoring event id
        event_id: String,

        /// Event value; only 1 (problem) opens a ticket
        event_value: String,

        /// Ticket description (words are joined with spaces)
        description: Vec<String>,
    },

    /// Resolve and close a ticket
    Close {
        /// Ticket number
        ticket_id: u64,

        #[command(flatten)]
        resolution: ResolutionArgs,
    },

    /// Find the ticket of a monitoring event and close it
    CorrelateAndClose {
        /// Monitoring event id (problem or recovery)
        event_id: String,

        #[command(flatten)]
        resolution: ResolutionArgs,
    },

    /// Print the effective configuration with secrets hidden
    PrintConfig,
}

/// Per-invocation overrides of the configured resolution.
#[derive(Debug, Default, Args)]
pub struct ResolutionArgs {
    /// Work item to act on instead of the ticket's own
    #[arg(long)]
    pub work_item: Option<WorkItemId>,

    /// Status code written on resolution
    #[arg(long)]
    pub status_id: Option<i64>,

    /// Workflow action code
    #[arg(long)]
    pub flow_action: Option<String>,

    /// Solution category code
    #[arg(long)]
    pub category_id: Option<i64>,

    /// Incident cause code
    #[arg(long)]
    pub cause_id: Option<i64>,

    /// Solution text (HTML)
    #[arg(long)]
    pub solution: Option<String>,

    /// Cause details (HTML)
    #[arg(long)]
    pub cause: Option<String>,
}

impl ResolutionArgs {
    /// Resolution from `base` with the given overrides applied.
    pub fn resolve(&self, base: &ResolutionConfig) -> ResolutionParams {
        self.apply(ResolutionParams::from(base))
    }

    /// Like `resolve`, starting from the texts configured for event closes.
    pub fn resolve_for_event(&self, base: &ResolutionConfig) -> ResolutionParams {
        self.apply(ResolutionParams::for_event(base))
    }

    fn apply(&self, mut params: ResolutionParams) -> ResolutionParams {
        if let Some(status_id) = self.status_id {
            params.status_id = status_id;
        }
        if let Some(flow_action) = &self.flow_action {
            params.flow_action = flow_action.clone();
        }
        if let Some(category_id) = self.category_id {
            params.category_id = category_id;
        }
        if let Some(cause_id) = self.cause_id {
            params.cause_id = cause_id;
        }
        if let Some(solution) = &self.solution {
            params.solution_html = solution.clone();
        }
        if let Some(cause) = &self.cause {
            params.cause_html = cause.clone();
        }
        params
    }
}

/// Join free-form words into one description.
pub fn join_words(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_open() {
        let cli = Cli::try_parse_from(["ticketbridge", "open", "disk", "full"]).unwrap();
        match cli.command {
            Command::Open { description } => assert_eq!(join_words(&description), "disk full"),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_open_event() {
        let cli = Cli::try_parse_from([
            "ticketbridge",
            "open-event",
            "100",
            "1",
            "CPU",
            "high",
            "--verbose",
        ])
        .unwrap();
        match cli.command {
            Command::OpenEvent {
                event_id,
                event_value,
                description,
            } => {
                assert_eq!(event_id, "100");
                assert_eq!(event_value, "1");
                assert_eq!(join_words(&description), "CPU high");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_close_with_overrides() {
        let cli = Cli::try_parse_from([
            "ticketbridge",
            "--config",
            "/etc/ticketbridge.toml",
            "close",
            "5001",
            "--work-item",
            "42",
            "--status-id",
            "5",
            "--flow-action",
            "F",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/ticketbridge.toml"));
        match cli.command {
            Command::Close {
                ticket_id,
                resolution,
            } => {
                assert_eq!(ticket_id, 5001);
                assert_eq!(resolution.work_item, Some(42));
                let params = resolution.resolve(&ResolutionConfig::default());
                assert_eq!(params.status_id, 5);
                assert_eq!(params.flow_action, "F");
                assert_eq!(params.category_id, 13);
                assert_eq!(params.cause_id, 6);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_close_requires_numeric_ticket() {
        let err = Cli::try_parse_from(["ticketbridge", "close", "abc"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_subcommand_is_usage_error() {
        let err = Cli::try_parse_from(["ticketbridge"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_event_resolution_keeps_overrides() {
        let cli = Cli::try_parse_from([
            "ticketbridge",
            "correlate-and-close",
            "200",
            "--cause",
            "<div>disk cleaned</div>",
        ])
        .unwrap();
        match cli.command {
            Command::CorrelateAndClose { resolution, .. } => {
                let base = ResolutionConfig::default();
                let params = resolution.resolve_for_event(&base);
                assert_eq!(params.solution_html, base.event_solution_html);
                assert_eq!(params.cause_html, "<div>disk cleaned</div>");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_resolution_without_overrides_matches_config() {
        let base = ResolutionConfig::default();
        assert_eq!(
            ResolutionArgs::default().resolve(&base),
            ResolutionParams::from(&base)
        );
    }
}
