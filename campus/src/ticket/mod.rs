//! Ticket rendering and scanning.
//!
//! - [`codec`]: QR encode/decode of ticket ids
//! - [`scanner`]: deduplication of continuous decode attempts

pub mod codec;
pub mod scanner;

pub use codec::{
    BLACK, Background, CodecConfig, ErrorCorrection, MAX_TICKET_SIZE, TicketCodec,
};
pub use scanner::{DedupPolicy, ScanFilter, decode_frames, scan};

use crate::error::TicketError;
use crate::types::TicketId;
use image::{Rgba, RgbaImage};

/// Renders an issued ticket for display
///
/// Injected into the registration environment so reducers never touch the
/// codec directly and tests can substitute a failing renderer.
pub trait TicketRenderer: Send + Sync {
    /// Render the ticket as an image
    ///
    /// # Errors
    ///
    /// [`TicketError::EncodingFailed`] when the ticket cannot be drawn.
    fn render(&self, ticket: &TicketId) -> Result<RgbaImage, TicketError>;
}

/// Size and colour used for every rendered ticket
#[derive(Debug, Clone, Copy)]
pub struct RenderProfile {
    codec: TicketCodec,
    size: u32,
    foreground: Rgba<u8>,
}

impl RenderProfile {
    /// Create a profile rendering `size × size` tickets in `foreground`
    #[must_use]
    pub const fn new(codec: TicketCodec, size: u32, foreground: Rgba<u8>) -> Self {
        Self {
            codec,
            size,
            foreground,
        }
    }

    /// Codec behind this profile, used to decode what it renders
    #[must_use]
    pub const fn codec(&self) -> &TicketCodec {
        &self.codec
    }
}

impl TicketRenderer for RenderProfile {
    fn render(&self, ticket: &TicketId) -> Result<RgbaImage, TicketError> {
        self.codec.encode(ticket.as_str(), self.size, self.foreground)
    }
}
