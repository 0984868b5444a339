//! Event correlation integration tests.
//!
//! These tests resolve tickets through the mock monitoring system:
//! - Markers on the event itself
//! - Recovery events correlated through their trigger
//! - The bounded scan window
//! - Degradation to "not found" on remote failures

use std::sync::Arc;

use ticketbridge_core::{
    monitoring::Monitoring,
    testing::{fixtures, MockMonitoring},
    Correlation, EventCorrelator, TicketMarker,
};

const MARKER: &str = "CITSmartTicketID";

fn correlator(monitoring: &MockMonitoring, window: u32) -> EventCorrelator {
    let monitoring: Arc<dyn Monitoring> = Arc::new(monitoring.clone());
    EventCorrelator::new(monitoring, TicketMarker::new(MARKER).unwrap(), window)
}

fn found(ticket_id: u64, problem_event_id: &str) -> Correlation {
    Correlation {
        ticket_id: Some(ticket_id),
        problem_event_id: Some(problem_event_id.to_string()),
    }
}

#[tokio::test]
async fn test_marked_problem_event_resolves_to_itself() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("100", "T1", 1000, &["CITSmartTicketID=5001"]))
        .await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("100").await;

    assert_eq!(correlation, found(5001, "100"));
    assert!(monitoring.window_queries().await.is_empty());
}

#[tokio::test]
async fn test_recovery_resolves_through_trigger() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("150", "T1", 1500, &["CITSmartTicketID=7003"]))
        .await;
    monitoring.add_event(fixtures::recovery_event("200", "T1", 2000)).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("200").await;

    assert_eq!(correlation, found(7003, "150"));
    assert_eq!(
        monitoring.window_queries().await,
        vec![("T1".to_string(), 20)]
    );
}

#[tokio::test]
async fn test_unmarked_cycles_are_skipped() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("150", "T1", 1500, &["CITSmartTicketID=7003"]))
        .await;
    monitoring.add_event(fixtures::recovery_event("160", "T1", 1600)).await;
    monitoring
        .add_event(fixtures::problem_event("170", "T1", 1700, &["looking into it"]))
        .await;
    monitoring.add_event(fixtures::recovery_event("180", "T1", 1800)).await;
    monitoring.add_event(fixtures::problem_event("190", "T1", 1900, &[])).await;
    monitoring.add_event(fixtures::recovery_event("200", "T1", 2000)).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("200").await;

    assert_eq!(correlation, found(7003, "150"));
}

#[tokio::test]
async fn test_newest_marked_problem_wins() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("150", "T1", 1500, &["CITSmartTicketID=7003"]))
        .await;
    monitoring
        .add_event(fixtures::problem_event("170", "T1", 1700, &["CITSmartTicketID=7010"]))
        .await;
    monitoring.add_event(fixtures::recovery_event("200", "T1", 2000)).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("200").await;

    assert_eq!(correlation, found(7010, "170"));
}

#[tokio::test]
async fn test_other_triggers_are_ignored() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("150", "T2", 1500, &["CITSmartTicketID=7003"]))
        .await;
    monitoring.add_event(fixtures::problem_event("160", "T1", 1600, &[])).await;
    monitoring.add_event(fixtures::recovery_event("200", "T1", 2000)).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("200").await;

    assert_eq!(
        correlation,
        Correlation {
            ticket_id: None,
            problem_event_id: Some("160".to_string()),
        }
    );
}

#[tokio::test]
async fn test_marker_outside_window_is_not_found() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("100", "T1", 1000, &["CITSmartTicketID=5001"]))
        .await;
    for i in 1..=3 {
        let id = (100 + i).to_string();
        monitoring
            .add_event(fixtures::problem_event(&id, "T1", 1000 + i, &[]))
            .await;
    }
    monitoring.add_event(fixtures::recovery_event("200", "T1", 2000)).await;

    let correlation = correlator(&monitoring, 3).resolve_ticket("200").await;

    assert_eq!(
        correlation,
        Correlation {
            ticket_id: None,
            problem_event_id: Some("103".to_string()),
        }
    );
    assert_eq!(monitoring.window_queries().await, vec![("T1".to_string(), 3)]);
}

#[tokio::test]
async fn test_empty_window_is_not_found() {
    let monitoring = MockMonitoring::new();
    monitoring.add_event(fixtures::recovery_event("200", "T1", 2000)).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("200").await;

    assert_eq!(correlation, Correlation::default());
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let monitoring = MockMonitoring::new();

    let correlation = correlator(&monitoring, 20).resolve_ticket("404").await;

    assert_eq!(correlation, Correlation::default());
}

#[tokio::test]
async fn test_event_without_trigger_is_not_found() {
    let monitoring = MockMonitoring::new();
    let mut event = fixtures::recovery_event("200", "T1", 2000);
    event.trigger_id = None;
    monitoring.add_event(event).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("200").await;

    assert_eq!(correlation, Correlation::default());
    assert!(monitoring.window_queries().await.is_empty());
}

#[tokio::test]
async fn test_remote_failure_degrades_to_not_found() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event("100", "T1", 1000, &["CITSmartTicketID=5001"]))
        .await;
    monitoring.set_unavailable(true).await;

    let correlation = correlator(&monitoring, 20).resolve_ticket("100").await;

    assert_eq!(correlation, Correlation::default());
}

#[tokio::test]
async fn test_custom_marker_key() {
    let monitoring = MockMonitoring::new();
    monitoring
        .add_event(fixtures::problem_event(
            "100",
            "T1",
            1000,
            &["CITSmartTicketID=5001", "Ticket = 9"],
        ))
        .await;
    let monitoring_dyn: Arc<dyn Monitoring> = Arc::new(monitoring.clone());
    let correlator =
        EventCorrelator::new(monitoring_dyn, TicketMarker::new("Ticket").unwrap(), 20);

    assert_eq!(correlator.resolve_ticket("100").await, found(9, "100"));
}
