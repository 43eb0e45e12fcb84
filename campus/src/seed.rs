//! Demo catalog contents.

use crate::catalog::CatalogState;
use crate::types::{Community, CommunityId, Event, EventId, Notification};

#[allow(clippy::too_many_arguments)]
fn event(
    id: &str,
    title: &str,
    date: &str,
    time: &str,
    location: &str,
    attendees: u32,
    category: &str,
    is_live: bool,
    host: &str,
) -> Event {
    Event {
        id: EventId::new(id),
        title: title.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        location: location.to_string(),
        attendees,
        category: category.to_string(),
        is_live,
        host_community_id: Some(CommunityId::new(host)),
    }
}

fn community(id: &str, name: &str, description: &str, member_count: u32, is_admin: bool) -> Community {
    Community {
        id: CommunityId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        member_count,
        logo_url: String::new(),
        is_admin,
    }
}

/// Events shown on a fresh install
#[must_use]
pub fn events() -> Vec<Event> {
    vec![
        event("1", "Tech Workshop", "Today", "2:00 PM", "Room 301", 45, "Workshop", true, "c1"),
        event("2", "Coding Bootcamp", "Tomorrow", "10:00 AM", "Lab A", 32, "Education", false, "c2"),
        event("3", "Hackathon Meetup", "Sat, Jan 18", "9:00 AM", "Main Hall", 78, "Competition", false, "c1"),
        event("4", "Design Sprint", "Mon, Jan 20", "3:00 PM", "Creative Space", 24, "Design", false, "c3"),
    ]
}

/// Communities shown on a fresh install
#[must_use]
pub fn communities() -> Vec<Community> {
    vec![
        community(
            "c1",
            "Google Developer Group",
            "Official GDG on campus for developers and enthusiasts.",
            1200,
            true,
        ),
        community(
            "c2",
            "Code Wizards",
            "A community for competitive programming and algorithms.",
            450,
            true,
        ),
        community("c3", "Design Hub", "Focusing on UI/UX and product design.", 800, false),
        community(
            "c4",
            "AI Explorers",
            "Discovering the latest in Machine Learning and AI.",
            600,
            false,
        ),
    ]
}

/// Notifications shown on a fresh install
#[must_use]
pub fn notifications() -> Vec<Notification> {
    vec![
        Notification {
            id: "n1".to_string(),
            title: "Hackathon registrations open".to_string(),
            message: "Teams of up to four can now sign up for the Hackathon Meetup.".to_string(),
            timestamp: "2h ago".to_string(),
            community_name: "Google Developer Group".to_string(),
            is_read: false,
        },
        Notification {
            id: "n2".to_string(),
            title: "Bootcamp room change".to_string(),
            message: "Tomorrow's Coding Bootcamp moves to Lab A.".to_string(),
            timestamp: "5h ago".to_string(),
            community_name: "Code Wizards".to_string(),
            is_read: false,
        },
        Notification {
            id: "n3".to_string(),
            title: "Welcome to Design Hub".to_string(),
            message: "Thanks for joining. Our next sprint is on Monday.".to_string(),
            timestamp: "1d ago".to_string(),
            community_name: "Design Hub".to_string(),
            is_read: true,
        },
    ]
}

/// Catalog holding all seed records
#[must_use]
pub fn catalog() -> CatalogState {
    CatalogState::new(events(), communities(), notifications())
}
