//! Per-event registration.
//!
//! ```text
//! NotRegistered --register--> Registered --approve(id)--> Going(id)
//!       ^                          |                          |
//!       +--------- revoke ---------+---------- revoke --------+
//! ```
//!
//! Selecting an event always returns to `NotRegistered`.

pub mod controller;
pub mod reducer;
pub mod state;

pub use controller::RegistrationController;
pub use reducer::{
    FixedSuffix, RandomSuffix, RegistrationAction, RegistrationEnvironment, RegistrationReducer,
    Strictness, SuffixSource,
};
pub use state::{
    RegistrationModel, RegistrationStage, RegistrationState, TicketBitmap, TicketImage,
};
