//! Check-in desk.
//!
//! The host side of a ticket: scanned payloads arrive from the camera, each
//! valid one approves the desk's own registration controller and is recorded
//! as admitted. The scan itself is the approval, so the embedded registration
//! runs lenient.

use crate::error::CheckInError;
use crate::registration::{
    RegistrationAction, RegistrationEnvironment, RegistrationModel, RegistrationReducer,
    Strictness,
};
use crate::types::{Event, TicketId};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use universe_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer};
use universe_runtime::{Store, StoreError};

/// State of a check-in desk
#[derive(Clone, Debug, Default)]
pub struct CheckInState {
    /// Host-side registration controller
    pub registration: RegistrationModel,
    /// Tickets let in, in admission order
    pub admitted: Vec<TicketId>,
    /// Last payload handed to the desk, without surrounding whitespace
    pub last_scanned: Option<String>,
    /// Tickets allowed in; `None` admits any valid ticket
    pub guest_list: Option<HashSet<TicketId>>,
    /// Most recent rejection
    pub last_rejection: Option<CheckInError>,
}

impl CheckInState {
    /// Desk for `event`, optionally restricted to `guest_list`
    #[must_use]
    pub fn for_event(event: Event, guest_list: Option<HashSet<TicketId>>) -> Self {
        Self {
            registration: RegistrationModel::for_event(event),
            guest_list,
            ..Self::default()
        }
    }

    /// Whether `ticket` has been let in
    #[must_use]
    pub fn is_admitted(&self, ticket: &TicketId) -> bool {
        self.admitted.contains(ticket)
    }
}

/// Actions for the check-in desk
#[derive(Clone, Debug)]
pub enum CheckInAction {
    // Commands
    /// A payload was read from the camera
    TicketScanned {
        /// Decoded string
        payload: String,
    },

    // Events
    /// A ticket was let in
    Admitted {
        /// Admitted ticket
        ticket: TicketId,
    },

    /// A scan was turned away
    ScanRejected {
        /// Why
        error: CheckInError,
    },

    /// Action for the embedded registration controller
    Registration(RegistrationAction),
}

/// Environment for the check-in desk
#[derive(Clone)]
pub struct CheckInEnvironment {
    /// Environment of the embedded registration reducer
    pub registration: RegistrationEnvironment,
}

impl CheckInEnvironment {
    /// Lenient registration environment without ticket rendering
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registration: RegistrationEnvironment::new(clock)
                .with_strictness(Strictness::Lenient),
        }
    }
}

/// Reducer for the check-in desk
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckInReducer {
    registration: RegistrationReducer,
}

type Effects = SmallVec<[Effect<CheckInAction>; 4]>;

impl CheckInReducer {
    /// Creates a new `CheckInReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registration: RegistrationReducer::new(),
        }
    }

    fn validate_scan(state: &CheckInState, payload: &str) -> Result<TicketId, CheckInError> {
        let ticket = TicketId::parse(payload)?;
        let on_list = state
            .guest_list
            .as_ref()
            .is_none_or(|guests| guests.contains(&ticket));
        if !on_list {
            return Err(CheckInError::NotOnGuestList(ticket.to_string()));
        }
        if state.is_admitted(&ticket) {
            return Err(CheckInError::AlreadyAdmitted(ticket.to_string()));
        }
        Ok(ticket)
    }

    fn apply_event(state: &mut CheckInState, action: &CheckInAction) {
        match action {
            CheckInAction::Admitted { ticket } => {
                state.admitted.push(ticket.clone());
                state.last_rejection = None;
            },
            CheckInAction::ScanRejected { error } => {
                state.last_rejection = Some(error.clone());
            },
            CheckInAction::TicketScanned { .. } | CheckInAction::Registration(_) => {},
        }
    }

    fn delegate(
        &self,
        state: &mut CheckInState,
        action: RegistrationAction,
        env: &CheckInEnvironment,
    ) -> Effects {
        self.registration
            .reduce(&mut state.registration, action, &env.registration)
            .into_iter()
            .map(|effect| effect.map(CheckInAction::Registration))
            .collect()
    }
}

impl Reducer for CheckInReducer {
    type State = CheckInState;
    type Action = CheckInAction;
    type Environment = CheckInEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            CheckInAction::TicketScanned { payload } => {
                let payload = payload.trim();
                if state.last_scanned.as_deref() == Some(payload) {
                    tracing::trace!(payload = %payload, "Repeated scan ignored");
                    return SmallVec::new();
                }
                state.last_scanned = Some(payload.to_string());

                let ticket = match Self::validate_scan(state, payload) {
                    Ok(ticket) => ticket,
                    Err(error) => {
                        tracing::warn!(%error, "Scan rejected");
                        Self::apply_event(state, &CheckInAction::ScanRejected { error });
                        return SmallVec::new();
                    },
                };

                let effects = self.delegate(
                    state,
                    RegistrationAction::Approve {
                        ticket_id: ticket.to_string(),
                    },
                    env,
                );

                if state.registration.state.ticket() == Some(&ticket) {
                    tracing::info!(ticket = %ticket, "Ticket admitted");
                    Self::apply_event(state, &CheckInAction::Admitted { ticket });
                } else if let Some(error) = state.registration.last_error.clone() {
                    Self::apply_event(
                        state,
                        &CheckInAction::ScanRejected {
                            error: error.into(),
                        },
                    );
                }
                effects
            },

            CheckInAction::Registration(inner) => self.delegate(state, inner, env),

            CheckInAction::Admitted { .. } | CheckInAction::ScanRejected { .. } => {
                Self::apply_event(state, &action);
                SmallVec::new()
            },
        }
    }
}

type CheckInStore = Store<CheckInState, CheckInAction, CheckInEnvironment, CheckInReducer>;

/// A check-in desk backed by a store
pub struct CheckInDesk {
    store: CheckInStore,
}

impl CheckInDesk {
    /// Desk starting from `state`
    #[must_use]
    pub fn new(state: CheckInState, environment: CheckInEnvironment) -> Self {
        Self {
            store: Store::new(state, CheckInReducer::new(), environment),
        }
    }

    /// Hand one scanned payload to the desk
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after the desk is closed.
    pub async fn scan(&self, payload: impl Into<String>) -> Result<(), StoreError> {
        self.store
            .send(CheckInAction::TicketScanned {
                payload: payload.into(),
            })
            .await
    }

    /// Feed every read from `reads` to the desk until the source ends
    ///
    /// Returns how many tickets were admitted along the way.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] if the desk closes mid-stream.
    pub async fn run<S>(&self, reads: S) -> Result<usize, StoreError>
    where
        S: Stream<Item = String>,
    {
        let before = self.admitted().await.len();
        futures::pin_mut!(reads);
        while let Some(payload) = reads.next().await {
            self.scan(payload).await?;
        }
        Ok(self.admitted().await.len() - before)
    }

    /// Tickets let in so far
    pub async fn admitted(&self) -> Vec<TicketId> {
        self.store.state(|s| s.admitted.clone()).await
    }

    /// Most recent rejection
    pub async fn last_rejection(&self) -> Option<CheckInError> {
        self.store.state(|s| s.last_rejection.clone()).await
    }

    /// Observe every reduced action
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CheckInAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting scans
    pub fn close(&self) {
        self.store.shutdown();
    }
}
