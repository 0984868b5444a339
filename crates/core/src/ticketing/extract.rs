//! Recovering identifiers from portal responses.
//!
//! The portal answers the commit of a new request either with a JSON object or
//! with rendered markup. Candidates are tried in a fixed order and the first
//! hit wins, so the same body always yields the same id.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

use super::types::{positive_integer, TicketId};

/// JSON members that may hold the new ticket number, by priority.
pub const TICKET_FIELDS: [&str; 4] = ["ticketNumber", "ticket", "number", "id"];

/// Text patterns for non-JSON bodies, by priority. Each captures the number
/// in group 1. The last one matches any run of 5+ digits and can hit
/// unrelated numbers; it only runs when everything else failed.
const TICKET_PATTERNS: [(&str, &str); 8] = [
    (
        "escaped_header",
        r"(?i)class=\\#33#text-citsmart\\#33#\s*>\s*(\d+)\s*</h[23]>",
    ),
    (
        "header",
        r#"(?i)<h2[^>]*class="[^"]*text-citsmart[^"]*"[^>]*>\s*(\d+)\s*</h2>"#,
    ),
    (
        "label_block",
        r#"(?i)<span[^>]*class="[^"]*label-numero[^"]*"[^>]*>Ticket</span><h2[^>]*class="[^"]*text-citsmart[^"]*"[^>]*>\s*(\d+)\s*</h[23]>"#,
    ),
    ("ticket", r"(?i)ticket[:\s]*(\d+)"),
    ("ticket_number", r"(?i)ticketNumber[:\s]*(\d+)"),
    ("number", r"(?i)number[:\s]*(\d+)"),
    ("id", r"(?i)id[:\s]*(\d+)"),
    ("long_digits", r"(\d{5,})"),
];

/// Patterns locating the task id in the open-activity page.
const TASK_PATTERNS: [&str; 3] = [
    r#"name="idTarefa"\s*value="(\d+)""#,
    r#""idTarefa"\s*:\s*"?(\d+)"?"#,
    r"idTarefa=(\d+)",
];

static COMPILED_TICKET_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    TICKET_PATTERNS
        .iter()
        .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (*name, re)))
        .collect()
});

static COMPILED_TASK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    TASK_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Where an extracted ticket id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketIdSource {
    /// A member of the JSON response.
    Field(&'static str),
    /// A named text pattern.
    Pattern(&'static str),
}

/// Extract the ticket number from a commit response body.
pub fn extract_ticket_id(body: &str) -> Option<TicketId> {
    extract_ticket_id_with_source(body).map(|(id, _)| id)
}

/// Like [`extract_ticket_id`], also reporting which candidate matched.
///
/// A body that parses as JSON is only searched by field; text patterns
/// apply to non-JSON bodies.
pub fn extract_ticket_id_with_source(body: &str) -> Option<(TicketId, TicketIdSource)> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let object = value.as_object()?;
        return TICKET_FIELDS.iter().find_map(|field| {
            object
                .get(*field)
                .and_then(positive_integer)
                .map(|id| (id, TicketIdSource::Field(field)))
        });
    }

    COMPILED_TICKET_PATTERNS.iter().find_map(|(name, re)| {
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<TicketId>().ok())
            .map(|id| (id, TicketIdSource::Pattern(name)))
    })
}

/// Extract the `idTarefa` of the new ticket from the open-activity page.
pub fn extract_task_id(body: &str) -> Option<String> {
    COMPILED_TASK_PATTERNS.iter().find_map(|re| {
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED_TICKET_PATTERNS.len(), TICKET_PATTERNS.len());
        assert_eq!(COMPILED_TASK_PATTERNS.len(), TASK_PATTERNS.len());
    }

    #[test]
    fn test_json_field_priority() {
        let body = r#"{"id": 3, "number": 2, "ticketNumber": 52606}"#;
        assert_eq!(
            extract_ticket_id_with_source(body),
            Some((52606, TicketIdSource::Field("ticketNumber")))
        );

        let body = r#"{"id": 3, "ticket": "52607"}"#;
        assert_eq!(
            extract_ticket_id_with_source(body),
            Some((52607, TicketIdSource::Field("ticket")))
        );

        let body = r#"{"id": 52608}"#;
        assert_eq!(
            extract_ticket_id_with_source(body),
            Some((52608, TicketIdSource::Field("id")))
        );
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let body = r#"{"ticketNumber": null, "ticket": "", "number": 0, "id": 77}"#;
        assert_eq!(extract_ticket_id(body), Some(77));
    }

    #[test]
    fn test_json_without_fields_does_not_scan_text() {
        assert_eq!(extract_ticket_id(r#"{"message": "ticket 52606 created"}"#), None);
        assert_eq!(extract_ticket_id("[52606]"), None);
    }

    #[test]
    fn test_escaped_header_pattern() {
        let body = r"<span>Ticket</span><h3 class=\#33#text-citsmart\#33# > 52606 </h3>";
        assert_eq!(
            extract_ticket_id_with_source(body),
            Some((52606, TicketIdSource::Pattern("escaped_header")))
        );
    }

    #[test]
    fn test_header_pattern() {
        let body = r#"<div><h2 id="n" class="big text-citsmart">  52606 </h2></div>"#;
        assert_eq!(
            extract_ticket_id_with_source(body),
            Some((52606, TicketIdSource::Pattern("header")))
        );
    }

    #[test]
    fn test_label_block_pattern() {
        // The header pattern only accepts a closing h2; an h3 reaches the full block.
        let body = r#"<span class="label-numero">Ticket</span><h2 class="text-citsmart">52606</h3>"#;
        assert_eq!(
            extract_ticket_id_with_source(body),
            Some((52606, TicketIdSource::Pattern("label_block")))
        );
    }

    #[test]
    fn test_keyword_patterns() {
        assert_eq!(
            extract_ticket_id_with_source("Seu TICKET: 4521 foi registrado"),
            Some((4521, TicketIdSource::Pattern("ticket")))
        );
        assert_eq!(
            extract_ticket_id_with_source("request number 812"),
            Some((812, TicketIdSource::Pattern("number")))
        );
        assert_eq!(
            extract_ticket_id_with_source("created with id 99"),
            Some((99, TicketIdSource::Pattern("id")))
        );
    }

    #[test]
    fn test_long_digits_fallback() {
        assert_eq!(
            extract_ticket_id_with_source("<p>Pedido 52606 registrado</p>"),
            Some((52606, TicketIdSource::Pattern("long_digits")))
        );
        assert_eq!(extract_ticket_id("<p>Pedido 1234 registrado</p>"), None);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(extract_ticket_id(""), None);
        assert_eq!(extract_ticket_id("<html>ok</html>"), None);
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let body = r#"<h2 class="text-citsmart">52606</h2> ticket 11111"#;
        let first = extract_ticket_id(body);
        assert_eq!(first, Some(52606));
        assert_eq!(extract_ticket_id(body), first);
    }

    #[test]
    fn test_extract_task_id() {
        assert_eq!(
            extract_task_id(r#"<input type="hidden" name="idTarefa" value="918"/>"#).as_deref(),
            Some("918")
        );
        assert_eq!(extract_task_id(r#"{"idTarefa": "919"}"#).as_deref(), Some("919"));
        assert_eq!(extract_task_id(r#"{"idTarefa":920}"#).as_deref(), Some("920"));
        assert_eq!(extract_task_id("url?idTarefa=921&x=1").as_deref(), Some("921"));
        assert_eq!(extract_task_id("nothing here"), None);
    }
}
