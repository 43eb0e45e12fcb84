//! # Campus
//!
//! Core of a campus-community events app, built on the universe reducer
//! architecture.
//!
//! ## Modules
//!
//! - [`registration`]: per-event state machine (`NotRegistered → Registered → Going`)
//! - [`ticket`]: QR rendering of ticket ids and deduplicated scanning
//! - [`check_in`]: host-side desk admitting scanned tickets
//! - [`catalog`]: events, communities and notifications with their screen queries
//! - [`config`]: environment-driven settings
//!
//! ## Example
//!
//! ```ignore
//! use campus::{config::Config, registration::RegistrationController, seed};
//! use std::sync::Arc;
//! use universe_core::environment::SystemClock;
//!
//! let config = Config::from_env();
//! let controller =
//!     RegistrationController::new(config.registration_environment(Arc::new(SystemClock)));
//!
//! controller.select_event(seed::events()[0].clone()).await?;
//! controller.register().await?;
//! controller.approve("UV-1-9942").await?;
//! assert!(controller.state().await.is_going());
//! ```

pub mod catalog;
pub mod check_in;
pub mod config;
pub mod error;
pub mod registration;
pub mod seed;
pub mod ticket;
pub mod types;

pub use catalog::{Catalog, CatalogState};
pub use check_in::{CheckInDesk, CheckInState};
pub use config::Config;
pub use error::{CatalogError, CheckInError, ConfigError, RegistrationError, TicketError};
pub use registration::{RegistrationController, RegistrationState, TicketImage};
pub use ticket::TicketCodec;
pub use types::{Community, CommunityId, Event, EventDraft, EventId, Notification, TicketId};
