//! Domain types for the campus events core.
//!
//! Events, communities and notifications are immutable values. Updates replace
//! the whole record in the owning collection (see [`crate::catalog`]).

use crate::error::RegistrationError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Wraps an identifier string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a community
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommunityId(String);

impl CommunityId {
    /// Wraps an identifier string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque ticket identifier
///
/// Used both as the text shown on the ticket and as the QR payload. The only
/// contract is that it is non-empty and free of control characters; issued
/// tickets look like `UV-<eventId>-<suffix>` but nothing relies on that.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(String);

impl TicketId {
    /// Validate a raw ticket string
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::EmptyTicketId`] for empty or whitespace-only input,
    /// [`RegistrationError::MalformedTicketId`] if it contains control characters.
    pub fn parse(raw: &str) -> Result<Self, RegistrationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RegistrationError::EmptyTicketId);
        }
        if trimmed.chars().any(char::is_control) {
            return Err(RegistrationError::MalformedTicketId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build the id issued on approval: `<prefix>-<eventId>-<suffix>`
    #[must_use]
    pub fn issue(prefix: &str, event_id: &EventId, suffix: u32) -> Self {
        Self(format!("{prefix}-{event_id}-{suffix}"))
    }

    /// Borrow the identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A campus event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    pub id: EventId,
    /// Display title
    pub title: String,
    /// Display date ("Today", "Sat, Jan 18")
    pub date: String,
    /// Display time ("2:00 PM")
    pub time: String,
    /// Room or venue
    pub location: String,
    /// Number of registered attendees
    pub attendees: u32,
    /// Category label ("Workshop", "Competition")
    pub category: String,
    /// Whether the event is happening now
    pub is_live: bool,
    /// Hosting community, lookup only
    pub host_community_id: Option<CommunityId>,
}

/// A student community
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Unique identifier
    pub id: CommunityId,
    /// Display name
    pub name: String,
    /// Short description
    pub description: String,
    /// Number of members
    pub member_count: u32,
    /// Logo location, empty when the community has none
    pub logo_url: String,
    /// Whether the current user administers this community
    pub is_admin: bool,
}

/// A notification shown in the notification sheet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier
    pub id: String,
    /// Headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Display timestamp ("2h ago")
    pub timestamp: String,
    /// Community that sent it
    pub community_name: String,
    /// Whether the user has opened it
    pub is_read: bool,
}

/// User input from the event creation form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Title (required)
    pub title: String,
    /// Display date (required)
    pub date: String,
    /// Display time
    pub time: String,
    /// Room or venue
    pub location: String,
    /// Category label
    pub category: String,
    /// Community hosting the event
    pub host_community_id: Option<CommunityId>,
}

impl EventDraft {
    /// Turn the draft into an event with the given id
    ///
    /// New events start with no attendees and are not live.
    #[must_use]
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            title: self.title.trim().to_string(),
            date: self.date.trim().to_string(),
            time: self.time,
            location: self.location,
            attendees: 0,
            category: self.category,
            is_live: false,
            host_community_id: self.host_community_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn ticket_id_trims_whitespace() {
        let ticket = TicketId::parse("  UV-1-9942 \n").unwrap();
        assert_eq!(ticket.as_str(), "UV-1-9942");
    }

    #[test]
    fn ticket_id_rejects_blank() {
        assert_eq!(TicketId::parse(""), Err(RegistrationError::EmptyTicketId));
        assert_eq!(TicketId::parse("   "), Err(RegistrationError::EmptyTicketId));
    }

    #[test]
    fn ticket_id_rejects_control_characters() {
        assert!(matches!(
            TicketId::parse("UV-1\u{0}-9942"),
            Err(RegistrationError::MalformedTicketId(_))
        ));
    }

    #[test]
    fn issued_ticket_format() {
        let ticket = TicketId::issue("UV", &EventId::new("1"), 9942);
        assert_eq!(ticket.to_string(), "UV-1-9942");
    }

    #[test]
    fn draft_becomes_fresh_event() {
        let draft = EventDraft {
            title: " Rust Night ".to_string(),
            date: "Fri, Jan 24".to_string(),
            time: "6:00 PM".to_string(),
            location: "Lab B".to_string(),
            category: "Workshop".to_string(),
            host_community_id: Some(CommunityId::new("c1")),
        };

        let event = draft.into_event(EventId::new("e9"));
        assert_eq!(event.title, "Rust Night");
        assert_eq!(event.attendees, 0);
        assert!(!event.is_live);
        assert_eq!(event.host_community_id, Some(CommunityId::new("c1")));
    }
}
