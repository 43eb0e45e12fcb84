//! Registration state and the model a ticket screen renders from.

use crate::error::RegistrationError;
use crate::types::{Event, TicketId};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where the current user stands for the viewed event
///
/// Exactly one variant is active; every transition replaces it wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    /// No request made (initial state, re-entered on revoke or event change)
    #[default]
    NotRegistered,
    /// Request made, awaiting host approval
    Registered,
    /// Approved; the ticket is both shown and encoded in the QR
    Going {
        /// Issued ticket
        ticket: TicketId,
    },
}

impl RegistrationState {
    /// Payload-free discriminant, used in diagnostics
    #[must_use]
    pub const fn stage(&self) -> RegistrationStage {
        match self {
            Self::NotRegistered => RegistrationStage::NotRegistered,
            Self::Registered => RegistrationStage::Registered,
            Self::Going { .. } => RegistrationStage::Going,
        }
    }

    /// Issued ticket, when going
    #[must_use]
    pub const fn ticket(&self) -> Option<&TicketId> {
        match self {
            Self::Going { ticket } => Some(ticket),
            Self::NotRegistered | Self::Registered => None,
        }
    }

    /// Whether a request is pending approval
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }

    /// Whether the registration has been approved
    #[must_use]
    pub const fn is_going(&self) -> bool {
        matches!(self, Self::Going { .. })
    }
}

/// Discriminant of [`RegistrationState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStage {
    /// See [`RegistrationState::NotRegistered`]
    NotRegistered,
    /// See [`RegistrationState::Registered`]
    Registered,
    /// See [`RegistrationState::Going`]
    Going,
}

impl fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotRegistered => "not registered",
            Self::Registered => "registered",
            Self::Going => "going",
        };
        f.write_str(label)
    }
}

/// Shared handle to a rendered ticket
///
/// `Debug` prints the dimensions only, so actions and models carrying a
/// ticket stay readable in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TicketBitmap(Arc<RgbaImage>);

impl TicketBitmap {
    /// Pixels of the rendered ticket
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.0
    }
}

impl From<RgbaImage> for TicketBitmap {
    fn from(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }
}

impl std::ops::Deref for TicketBitmap {
    type Target = RgbaImage;

    fn deref(&self) -> &RgbaImage {
        &self.0
    }
}

impl fmt::Debug for TicketBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.0.dimensions();
        write!(f, "TicketBitmap({width}x{height})")
    }
}

/// Rendering status of the ticket image
#[derive(Clone, Debug, Default)]
pub enum TicketImage {
    /// Nothing to show (not going, or no renderer configured)
    #[default]
    Absent,
    /// Render in flight
    Pending,
    /// Rendered QR image
    Ready(TicketBitmap),
    /// Rendering failed; the screen offers a retry
    Unavailable {
        /// Why the render failed
        reason: String,
    },
}

impl TicketImage {
    /// Rendered image, if any
    #[must_use]
    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            Self::Ready(bitmap) => Some(bitmap.image()),
            Self::Absent | Self::Pending | Self::Unavailable { .. } => None,
        }
    }

    /// Whether a retry makes sense
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Everything the event screen needs to render its registration affordance
#[derive(Clone, Debug, Default)]
pub struct RegistrationModel {
    /// Event currently being viewed
    pub event: Option<Event>,
    /// Current registration state
    pub state: RegistrationState,
    /// Rendering status of the ticket
    pub ticket_image: TicketImage,
    /// When the pending request was made
    pub registered_at: Option<DateTime<Utc>>,
    /// When the request was approved
    pub approved_at: Option<DateTime<Utc>>,
    /// Last rejected command, cleared by the next accepted one
    pub last_error: Option<RegistrationError>,
}

impl RegistrationModel {
    /// Model for a freshly opened event screen
    #[must_use]
    pub fn for_event(event: Event) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }
}
