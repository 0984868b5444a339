mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ticketbridge_core::{
    exit_code, load_config, validate_config, AuditLog, CitsmartClient, ClosureEngine,
    ClosureRequest, Config, ConfigError, EventCorrelator, EventOpen, FileAuditLog,
    IncidentBridge, Monitoring, Opener, SanitizedConfig, TicketMarker, TicketingSystem,
    WorkflowError, ZabbixClient,
};

use cli::{join_words, Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(code) => exit_with(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Fatal error");
            exit_with(exit_code_for(&e))
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the command's JSON report
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Exit code for an error that ended the run.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    if let Some(workflow) = e.downcast_ref::<WorkflowError>() {
        workflow.exit_code()
    } else if e.downcast_ref::<ConfigError>().is_some() {
        exit_code::CONFIG
    } else {
        exit_code::FAILURE
    }
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Remote clients and sinks built from the configuration.
struct Services {
    ticketing: Arc<dyn TicketingSystem>,
    audit: Arc<dyn AuditLog>,
}

impl Services {
    fn new(config: &Config) -> Result<Self> {
        let ticketing = CitsmartClient::new(config.ticketing.clone(), config.portal.clone())
            .map_err(WorkflowError::from)?;
        info!(
            base_url = %config.ticketing.base_url,
            audit_log = %config.audit.log_file.display(),
            "Ticketing client ready"
        );
        Ok(Self {
            ticketing: Arc::new(ticketing),
            audit: Arc::new(FileAuditLog::new(config.audit.log_file.clone())),
        })
    }

    fn opener(&self, config: &Config) -> Opener {
        Opener::new(self.ticketing.clone(), self.audit.clone(), config.portal.clone())
    }

    fn closure(&self) -> ClosureEngine {
        ClosureEngine::new(self.ticketing.clone(), self.audit.clone())
    }

    fn bridge(&self, config: &Config) -> Result<IncidentBridge> {
        let monitoring: Arc<dyn Monitoring> = Arc::new(
            ZabbixClient::new(config.monitoring.clone()).map_err(WorkflowError::from)?,
        );
        let marker = ticket_marker(&config.monitoring.marker_key)?;
        let closed_marker = ticket_marker(&config.monitoring.closed_marker_key)?;
        let correlator =
            EventCorrelator::new(monitoring.clone(), marker, config.monitoring.scan_window);

        Ok(IncidentBridge::new(
            monitoring,
            correlator,
            self.opener(config),
            self.closure(),
            closed_marker,
        ))
    }
}

fn ticket_marker(key: &str) -> Result<TicketMarker> {
    TicketMarker::new(key).map_err(|e| {
        ConfigError::ValidationError(format!("invalid marker key {:?}: {}", key, e)).into()
    })
}

fn load(cli: &Cli) -> Result<Config> {
    info!(path = %cli.config.display(), "Loading configuration");
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load(&cli)?;

    match cli.command {
        Command::PrintConfig => {
            print_report(&SanitizedConfig::from(&config))?;
            Ok(exit_code::SUCCESS)
        }

        Command::Login => {
            Services::new(&config)?
                .ticketing
                .login()
                .await
                .map_err(|e| WorkflowError::Auth(e.to_string()))?;
            info!("Login succeeded");
            Ok(exit_code::SUCCESS)
        }

        Command::Open { description } => {
            let outcome = Services::new(&config)?
                .opener(&config)
                .open(&join_words(&description))
                .await?;
            print_report(&outcome)?;
            Ok(partial_success(outcome.ticket_id()))
        }

        Command::OpenEvent {
            event_id,
            event_value,
            description,
        } => {
            let result = Services::new(&config)?
                .bridge(&config)?
                .open_for_event(&event_id, &event_value, &join_words(&description))
                .await?;
            print_report(&result)?;
            match result {
                EventOpen::Opened { outcome, .. } => Ok(partial_success(outcome.ticket_id())),
                EventOpen::Skipped => Ok(exit_code::SUCCESS),
            }
        }

        Command::Close {
            ticket_id,
            resolution,
        } => {
            let request = ClosureRequest::new(ticket_id, resolution.resolve(&config.resolution))
                .with_work_item(resolution.work_item);
            let report = Services::new(&config)?.closure().close(&request).await?;
            print_report(&report)?;
            Ok(exit_code::SUCCESS)
        }

        Command::CorrelateAndClose {
            event_id,
            resolution,
        } => {
            let closed = Services::new(&config)?
                .bridge(&config)?
                .close_for_event(
                    &event_id,
                    resolution.work_item,
                    resolution.resolve_for_event(&config.resolution),
                )
                .await?;
            print_report(&closed)?;
            Ok(exit_code::SUCCESS)
        }
    }
}

/// Exit code of an open whose ticket number may be unknown.
fn partial_success(ticket_id: Result<u64, WorkflowError>) -> i32 {
    match ticket_id {
        Ok(ticket_id) => {
            info!(ticket_id, "Ticket opened");
            exit_code::SUCCESS
        }
        Err(e) => {
            warn!(error = %e, "Ticket opened without a known number");
            e.exit_code()
        }
    }
}
