//! Resolving the ticket behind a monitoring event.
//!
//! When a ticket is opened its number is written into an annotation of the
//! problem event as `KEY=<number>`. A later recovery event only knows its
//! trigger, so the recent problem events of that trigger are scanned for the
//! marker. The trigger may flap several times before someone (or the opener)
//! annotates the right problem event; a bounded window of recent events keeps
//! the lookup cheap while still finding it.

use std::sync::Arc;

use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::monitoring::{Event, EventId, Monitoring};
use crate::ticketing::TicketId;

/// `KEY=<digits>` marker carried in event annotations.
#[derive(Debug, Clone)]
pub struct TicketMarker {
    key: String,
    pattern: Regex,
}

impl TicketMarker {
    /// Build a marker for `key`. The key is matched literally; whitespace is
    /// allowed around `=`.
    pub fn new(key: &str) -> Result<Self, regex_lite::Error> {
        let pattern = Regex::new(&format!(r"{}\s*=\s*(\d+)", regex_lite::escape(key)))?;
        Ok(Self {
            key: key.to_string(),
            pattern,
        })
    }

    /// Ticket number in `text`, if the marker is present.
    pub fn find(&self, text: &str) -> Option<TicketId> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// First marked ticket among the event's annotations, in their order.
    pub fn find_in_event(&self, event: &Event) -> Option<TicketId> {
        event
            .annotations
            .iter()
            .find_map(|annotation| self.find(&annotation.message))
    }

    /// Render the marker for `ticket_id`, optionally followed by a note.
    pub fn render(&self, ticket_id: TicketId, note: Option<&str>) -> String {
        match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => format!("{}={} | {}", self.key, ticket_id, note),
            None => format!("{}={}", self.key, ticket_id),
        }
    }
}

/// Outcome of a correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Correlation {
    pub ticket_id: Option<TicketId>,
    /// Problem event the ticket (or the search) settled on.
    pub problem_event_id: Option<EventId>,
}

impl Correlation {
    fn found(ticket_id: TicketId, problem_event_id: EventId) -> Self {
        Self {
            ticket_id: Some(ticket_id),
            problem_event_id: Some(problem_event_id),
        }
    }

    fn not_found() -> Self {
        Self::default()
    }
}

/// Finds the ticket that an event (problem or recovery) belongs to.
pub struct EventCorrelator {
    monitoring: Arc<dyn Monitoring>,
    marker: TicketMarker,
    window: u32,
}

impl EventCorrelator {
    pub fn new(monitoring: Arc<dyn Monitoring>, marker: TicketMarker, window: u32) -> Self {
        Self {
            monitoring,
            marker,
            window: window.max(1),
        }
    }

    pub fn marker(&self) -> &TicketMarker {
        &self.marker
    }

    /// Resolve the ticket for `event_id`.
    ///
    /// Never fails: remote errors are logged and reported as "not found".
    pub async fn resolve_ticket(&self, event_id: &str) -> Correlation {
        let event = match self.monitoring.get_event(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!(event_id, "Event not found");
                return Correlation::not_found();
            }
            Err(e) => {
                warn!(event_id, error = %e, "Failed to fetch event");
                return Correlation::not_found();
            }
        };

        if let Some(ticket_id) = self.marker.find_in_event(&event) {
            debug!(event_id, ticket_id, "Ticket marker found on the event itself");
            return Correlation::found(ticket_id, event.id);
        }

        let Some(trigger_id) = event.trigger_id.as_deref() else {
            warn!(event_id, "Event has no trigger to correlate through");
            return Correlation::not_found();
        };

        let problems = match self
            .monitoring
            .recent_problem_events(trigger_id, self.window)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!(event_id, trigger_id, error = %e, "Failed to list problem events");
                return Correlation::not_found();
            }
        };

        let correlation = self.scan(&problems);
        match (&correlation.ticket_id, &correlation.problem_event_id) {
            (Some(ticket_id), Some(problem_event_id)) => info!(
                event_id,
                trigger_id,
                ticket_id,
                problem_event_id = %problem_event_id,
                "Ticket correlated through trigger"
            ),
            (None, Some(problem_event_id)) => warn!(
                event_id,
                trigger_id,
                problem_event_id = %problem_event_id,
                scanned = problems.len(),
                "No ticket marker in recent problem events"
            ),
            _ => warn!(event_id, trigger_id, "Trigger has no problem events"),
        }
        correlation
    }

    /// First marked event in returned order, else the newest one unmarked.
    fn scan(&self, problems: &[Event]) -> Correlation {
        if let Some((ticket_id, event)) = problems
            .iter()
            .find_map(|event| self.marker.find_in_event(event).map(|t| (t, event)))
        {
            return Correlation::found(ticket_id, event.id.clone());
        }

        Correlation {
            ticket_id: None,
            problem_event_id: problems.first().map(|event| event.id.clone()),
        }
    }
}
