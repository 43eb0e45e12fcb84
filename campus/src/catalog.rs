//! In-memory catalog of events, communities and notifications.
//!
//! Records are immutable values; posting appends and replacing swaps the
//! whole record. Queries borrow from [`CatalogState`] and are what the home,
//! explore and community screens filter by.

use crate::error::CatalogError;
use crate::types::{Community, CommunityId, Event, EventDraft, EventId, Notification};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use universe_core::{SmallVec, effect::Effect, environment::IdGenerator, reducer::Reducer};
use universe_runtime::{Store, StoreError};

/// Attendee count above which an event is trending
pub const DEFAULT_TRENDING_THRESHOLD: u32 = 50;

/// Catalog contents
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogState {
    /// Events in posting order
    pub events: Vec<Event>,
    /// Known communities
    pub communities: Vec<Community>,
    /// Notifications, newest first
    pub notifications: Vec<Notification>,
    /// Last rejected command
    #[serde(skip)]
    pub last_error: Option<CatalogError>,
}

impl CatalogState {
    /// Catalog seeded with the given records
    #[must_use]
    pub const fn new(
        events: Vec<Event>,
        communities: Vec<Community>,
        notifications: Vec<Notification>,
    ) -> Self {
        Self {
            events,
            communities,
            notifications,
            last_error: None,
        }
    }

    /// Event by id
    #[must_use]
    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| &e.id == id)
    }

    /// Community by id
    #[must_use]
    pub fn community(&self, id: &CommunityId) -> Option<&Community> {
        self.communities.iter().find(|c| &c.id == id)
    }

    /// Events hosted by `community`
    #[must_use]
    pub fn events_by_community(&self, community: &CommunityId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.host_community_id.as_ref() == Some(community))
            .collect()
    }

    /// Events happening now
    #[must_use]
    pub fn live_events(&self) -> Vec<&Event> {
        self.events.iter().filter(|e| e.is_live).collect()
    }

    /// Events not yet started
    #[must_use]
    pub fn upcoming_events(&self) -> Vec<&Event> {
        self.events.iter().filter(|e| !e.is_live).collect()
    }

    /// Events with strictly more than `threshold` attendees
    #[must_use]
    pub fn trending_events(&self, threshold: u32) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.attendees > threshold)
            .collect()
    }

    /// Communities the user administers
    #[must_use]
    pub fn managed_communities(&self) -> Vec<&Community> {
        self.communities.iter().filter(|c| c.is_admin).collect()
    }

    /// Number of unread notifications
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }
}

/// Actions for the catalog
#[derive(Clone, Debug)]
pub enum CatalogAction {
    // Commands
    /// Publish a new event from the creation form
    PostEvent {
        /// Form contents
        draft: EventDraft,
    },
    /// Swap an existing event for an updated record
    ReplaceEvent {
        /// Updated record; its id selects the one replaced
        event: Event,
    },
    /// Mark one notification as read
    MarkNotificationRead {
        /// Notification id
        id: String,
    },
    /// Mark every notification as read
    MarkAllNotificationsRead,

    // Events
    /// An event was published
    EventPosted {
        /// Published event
        event: Event,
    },
    /// An event record was replaced
    EventReplaced {
        /// New record
        event: Event,
    },
    /// A notification was read
    NotificationRead {
        /// Notification id
        id: String,
    },
    /// All notifications were read
    AllNotificationsRead,
    /// A command was not applied
    CommandRejected {
        /// Why
        error: CatalogError,
    },
}

/// Environment for the catalog reducer
#[derive(Clone)]
pub struct CatalogEnvironment {
    /// Ids for posted events
    pub ids: Arc<dyn IdGenerator>,
}

impl CatalogEnvironment {
    /// Environment drawing event ids from `ids`
    #[must_use]
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }
}

/// Reducer for the catalog
#[derive(Clone, Copy, Debug, Default)]
pub struct CatalogReducer;

type Effects = SmallVec<[Effect<CatalogAction>; 4]>;

impl CatalogReducer {
    /// Creates a new `CatalogReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_draft(state: &CatalogState, draft: &EventDraft) -> Result<(), CatalogError> {
        if draft.title.trim().is_empty() {
            return Err(CatalogError::MissingField("title".to_string()));
        }
        if draft.date.trim().is_empty() {
            return Err(CatalogError::MissingField("date".to_string()));
        }
        let unknown_host = draft
            .host_community_id
            .as_ref()
            .filter(|host| state.community(host).is_none());
        if let Some(host) = unknown_host {
            return Err(CatalogError::UnknownCommunity(host.to_string()));
        }
        Ok(())
    }

    fn apply_event(state: &mut CatalogState, action: &CatalogAction) {
        match action {
            CatalogAction::EventPosted { event } => {
                state.events.push(event.clone());
                state.last_error = None;
            },
            CatalogAction::EventReplaced { event } => {
                if let Some(slot) = state.events.iter_mut().find(|e| e.id == event.id) {
                    *slot = event.clone();
                }
                state.last_error = None;
            },
            CatalogAction::NotificationRead { id } => {
                if let Some(n) = state.notifications.iter_mut().find(|n| &n.id == id) {
                    n.is_read = true;
                }
                state.last_error = None;
            },
            CatalogAction::AllNotificationsRead => {
                for n in &mut state.notifications {
                    n.is_read = true;
                }
                state.last_error = None;
            },
            CatalogAction::CommandRejected { error } => {
                state.last_error = Some(error.clone());
            },
            // Commands are not applied to state
            CatalogAction::PostEvent { .. }
            | CatalogAction::ReplaceEvent { .. }
            | CatalogAction::MarkNotificationRead { .. }
            | CatalogAction::MarkAllNotificationsRead => {},
        }
    }

    fn reject(state: &mut CatalogState, error: CatalogError) -> Effects {
        tracing::warn!(%error, "Catalog command rejected");
        Self::apply_event(state, &CatalogAction::CommandRejected { error });
        SmallVec::new()
    }
}

impl Reducer for CatalogReducer {
    type State = CatalogState;
    type Action = CatalogAction;
    type Environment = CatalogEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            CatalogAction::PostEvent { draft } => {
                if let Err(error) = Self::validate_draft(state, &draft) {
                    return Self::reject(state, error);
                }
                let event = draft.into_event(EventId::new(env.ids.next_id()));
                tracing::info!(event_id = %event.id, title = %event.title, "Event posted");
                Self::apply_event(state, &CatalogAction::EventPosted { event });
                SmallVec::new()
            },

            CatalogAction::ReplaceEvent { event } => {
                if state.event(&event.id).is_none() {
                    return Self::reject(state, CatalogError::UnknownEvent(event.id.to_string()));
                }
                tracing::debug!(event_id = %event.id, "Event replaced");
                Self::apply_event(state, &CatalogAction::EventReplaced { event });
                SmallVec::new()
            },

            CatalogAction::MarkNotificationRead { id } => {
                if !state.notifications.iter().any(|n| n.id == id) {
                    return Self::reject(state, CatalogError::UnknownNotification(id));
                }
                Self::apply_event(state, &CatalogAction::NotificationRead { id });
                SmallVec::new()
            },

            CatalogAction::MarkAllNotificationsRead => {
                Self::apply_event(state, &CatalogAction::AllNotificationsRead);
                SmallVec::new()
            },

            CatalogAction::EventPosted { .. }
            | CatalogAction::EventReplaced { .. }
            | CatalogAction::NotificationRead { .. }
            | CatalogAction::AllNotificationsRead
            | CatalogAction::CommandRejected { .. } => {
                Self::apply_event(state, &action);
                SmallVec::new()
            },
        }
    }
}

type CatalogStore = Store<CatalogState, CatalogAction, CatalogEnvironment, CatalogReducer>;

/// Catalog backed by a store
pub struct Catalog {
    store: CatalogStore,
}

impl Catalog {
    /// Catalog over `state`
    #[must_use]
    pub fn new(state: CatalogState, environment: CatalogEnvironment) -> Self {
        Self {
            store: Store::new(state, CatalogReducer::new(), environment),
        }
    }

    /// Publish a draft
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after shutdown. Validation failures
    /// are recorded in `last_error` instead.
    pub async fn post_event(&self, draft: EventDraft) -> Result<(), StoreError> {
        self.store.send(CatalogAction::PostEvent { draft }).await
    }

    /// Replace an event record
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn replace_event(&self, event: Event) -> Result<(), StoreError> {
        self.store.send(CatalogAction::ReplaceEvent { event }).await
    }

    /// Mark a notification read
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn mark_notification_read(&self, id: impl Into<String>) -> Result<(), StoreError> {
        self.store
            .send(CatalogAction::MarkNotificationRead { id: id.into() })
            .await
    }

    /// Mark every notification read
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn mark_all_notifications_read(&self) -> Result<(), StoreError> {
        self.store.send(CatalogAction::MarkAllNotificationsRead).await
    }

    /// Run a query against the current contents
    pub async fn query<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&CatalogState) -> T,
    {
        self.store.state(f).await
    }
}
