//! Registration controller: the store a ticket screen talks to.

use super::reducer::{RegistrationAction, RegistrationEnvironment, RegistrationReducer};
use super::state::{RegistrationModel, RegistrationState, TicketImage};
use crate::types::Event;
use tokio::sync::broadcast;
use universe_runtime::{Store, StoreError};

type RegistrationStore =
    Store<RegistrationModel, RegistrationAction, RegistrationEnvironment, RegistrationReducer>;

/// Per-event registration controller
///
/// Each operation reduces its command and every feedback action it causes
/// (ticket rendering included) before returning, so a read straight after an
/// `await` sees the finished transition.
pub struct RegistrationController {
    store: RegistrationStore,
}

impl RegistrationController {
    /// Controller with no event selected
    #[must_use]
    pub fn new(environment: RegistrationEnvironment) -> Self {
        Self::with_model(RegistrationModel::default(), environment)
    }

    /// Controller starting from an existing model
    #[must_use]
    pub fn with_model(model: RegistrationModel, environment: RegistrationEnvironment) -> Self {
        Self {
            store: Store::new(model, RegistrationReducer::new(), environment),
        }
    }

    /// Open `event`, resetting the registration to `NotRegistered`
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn select_event(&self, event: Event) -> Result<(), StoreError> {
        self.store
            .send(RegistrationAction::SelectEvent { event })
            .await
    }

    /// Ask to attend the selected event
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn register(&self) -> Result<(), StoreError> {
        self.store.send(RegistrationAction::Register).await
    }

    /// Host approval with the issued ticket
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn approve(&self, ticket_id: impl Into<String>) -> Result<(), StoreError> {
        self.store
            .send(RegistrationAction::Approve {
                ticket_id: ticket_id.into(),
            })
            .await
    }

    /// Issue and approve a ticket without a host
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn simulate_approval(&self) -> Result<(), StoreError> {
        self.store.send(RegistrationAction::SimulateApproval).await
    }

    /// Withdraw from the event
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn revoke(&self) -> Result<(), StoreError> {
        self.store.send(RegistrationAction::Revoke).await
    }

    /// Render the held ticket again
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn retry_ticket(&self) -> Result<(), StoreError> {
        self.store.send(RegistrationAction::RetryTicketRender).await
    }

    /// Current registration state
    pub async fn state(&self) -> RegistrationState {
        self.store.state(|model| model.state.clone()).await
    }

    /// Current ticket image status
    pub async fn ticket_image(&self) -> TicketImage {
        self.store.state(|model| model.ticket_image.clone()).await
    }

    /// Snapshot of the whole model
    pub async fn model(&self) -> RegistrationModel {
        self.store.state(Clone::clone).await
    }

    /// Observe every reduced action
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrationAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting commands
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}
