//! Error types for the campus core.
//!
//! None of these are fatal. Registration errors are recorded on the model and
//! leave the state machine untouched, ticket errors become an absent image.

use crate::registration::RegistrationStage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a registration command was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationError {
    /// The command is not meaningful in the current state
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        /// State the controller was in
        from: RegistrationStage,
        /// Command that was attempted
        action: String,
    },

    /// Ticket id was empty or whitespace
    #[error("ticket id must not be empty")]
    EmptyTicketId,

    /// Ticket id contained characters a scanner cannot round-trip
    #[error("ticket id {0:?} contains control characters")]
    MalformedTicketId(String),

    /// A ticket can only be issued for a selected event
    #[error("no event selected")]
    NoEventSelected,

    /// The debug approval shortcut is switched off
    #[error("simulated host approval is disabled")]
    SimulatedApprovalDisabled,
}

/// Ticket rendering failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// The content/size combination cannot be rendered as a QR symbol
    #[error("ticket encoding failed: {0}")]
    EncodingFailed(String),
}

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value outside its allowed set
    #[error("invalid value {value:?} for {key}: expected one of {expected}")]
    InvalidValue {
        /// Environment variable name
        key: &'static str,
        /// Value found
        value: String,
        /// Accepted values
        expected: &'static str,
    },
}

/// Why a scanned ticket was turned away at the door
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckInError {
    /// The payload is not a usable ticket id
    #[error("invalid ticket: {0}")]
    InvalidTicket(#[from] RegistrationError),

    /// A guest list is in force and the ticket is not on it
    #[error("ticket {0} is not on the guest list")]
    NotOnGuestList(String),

    /// The ticket was admitted earlier
    #[error("ticket {0} already admitted")]
    AlreadyAdmitted(String),
}

/// Why a catalog command was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogError {
    /// A required field was blank
    #[error("{0} must not be blank")]
    MissingField(String),

    /// The referenced community does not exist
    #[error("unknown community {0}")]
    UnknownCommunity(String),

    /// The referenced event does not exist
    #[error("unknown event {0}")]
    UnknownEvent(String),

    /// The referenced notification does not exist
    #[error("unknown notification {0}")]
    UnknownNotification(String),
}
