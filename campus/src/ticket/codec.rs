//! QR codec for ticket identifiers.
//!
//! Encoding maps every module of the QR symbol to a square block of pixels.
//! The symbol (plus its quiet zone) is scaled by the largest integer factor
//! that fits the requested size and centred, so the same content and size
//! always produce the same bytes.

use crate::error::TicketError;
use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque black, the usual ticket foreground
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Quiet zone recommended by the QR standard, in modules
pub const DEFAULT_MARGIN: u32 = 4;

/// Largest ticket edge, in pixels, the codec will render
pub const MAX_TICKET_SIZE: u32 = 4096;

/// Fill for non-foreground pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    /// Opaque white
    #[default]
    White,
    /// Fully transparent
    Transparent,
}

impl FromStr for Background {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "transparent" => Ok(Self::Transparent),
            other => Err(other.to_string()),
        }
    }
}

/// QR error correction level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery
    Low,
    /// ~15% recovery
    #[default]
    Medium,
    /// ~25% recovery
    Quartile,
    /// ~30% recovery
    High,
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::Low),
            "M" => Ok(Self::Medium),
            "Q" => Ok(Self::Quartile),
            "H" => Ok(Self::High),
            other => Err(other.to_string()),
        }
    }
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => Self::L,
            ErrorCorrection::Medium => Self::M,
            ErrorCorrection::Quartile => Self::Q,
            ErrorCorrection::High => Self::H,
        }
    }
}

/// Rendering options shared by every ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Quiet zone around the symbol, in modules
    pub margin: u32,
    /// Fill for background pixels
    pub background: Background,
    /// Error correction level
    pub error_correction: ErrorCorrection,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            background: Background::default(),
            error_correction: ErrorCorrection::default(),
        }
    }
}

/// Encodes ticket ids as QR images and decodes captured frames
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketCodec {
    config: CodecConfig,
}

impl TicketCodec {
    /// Create a codec with the given options
    #[must_use]
    pub const fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Rendering options in use
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Render `content` as a `size × size` QR image
    ///
    /// # Errors
    ///
    /// [`TicketError::EncodingFailed`] if `content` is empty, exceeds the
    /// symbol capacity at the configured error correction level, `size`
    /// is smaller than the symbol plus quiet zone, or `size` exceeds
    /// [`MAX_TICKET_SIZE`].
    pub fn encode(
        &self,
        content: &str,
        size: u32,
        foreground: Rgba<u8>,
    ) -> Result<RgbaImage, TicketError> {
        if content.is_empty() {
            return Err(TicketError::EncodingFailed("content is empty".to_string()));
        }
        if size > MAX_TICKET_SIZE {
            return Err(TicketError::EncodingFailed(format!(
                "{size}px exceeds the {MAX_TICKET_SIZE}px limit"
            )));
        }

        let code = QrCode::with_error_correction_level(
            content.as_bytes(),
            self.config.error_correction.into(),
        )
        .map_err(|e| TicketError::EncodingFailed(e.to_string()))?;

        let width = u32::try_from(code.width())
            .map_err(|_| TicketError::EncodingFailed("symbol too wide".to_string()))?;
        let modules = self
            .config
            .margin
            .checked_mul(2)
            .and_then(|quiet| width.checked_add(quiet))
            .ok_or_else(|| {
                TicketError::EncodingFailed(format!("margin {} is too wide", self.config.margin))
            })?;
        if size < modules {
            return Err(TicketError::EncodingFailed(format!(
                "{size}px cannot hold {modules} modules"
            )));
        }

        let scale = size / modules;
        let offset = (size - scale * modules) / 2;
        let background = match self.config.background {
            Background::White => WHITE,
            Background::Transparent => CLEAR,
        };

        let colors = code.to_colors();
        let mut image = RgbaImage::from_pixel(size, size, background);

        for my in 0..width {
            for mx in 0..width {
                if colors[(my * width + mx) as usize] != Color::Dark {
                    continue;
                }
                let left = offset + (mx + self.config.margin) * scale;
                let top = offset + (my + self.config.margin) * scale;
                for py in top..top + scale {
                    for px in left..left + scale {
                        image.put_pixel(px, py, foreground);
                    }
                }
            }
        }

        tracing::debug!(size, modules, scale, "Encoded ticket symbol");
        Ok(image)
    }

    /// Render `content`, reporting failure as an absent image
    #[must_use]
    pub fn render_or_absent(
        &self,
        content: &str,
        size: u32,
        foreground: Rgba<u8>,
    ) -> Option<RgbaImage> {
        match self.encode(content, size, foreground) {
            Ok(image) => Some(image),
            Err(error) => {
                tracing::warn!(%error, size, "Ticket image unavailable");
                None
            },
        }
    }

    /// Locate and decode a QR symbol in a frame
    ///
    /// Returns `None` when the frame holds no readable symbol, which is the
    /// normal outcome for most camera frames. Transparent pixels read as white.
    #[must_use]
    pub fn decode(&self, frame: &RgbaImage) -> Option<String> {
        let (width, height) = frame.dimensions();

        #[allow(clippy::cast_possible_truncation)] // coordinates are bounded by the u32 frame size
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| luminance(*frame.get_pixel(x as u32, y as u32)),
        );

        prepared
            .detect_grids()
            .iter()
            .find_map(|grid| grid.decode().ok())
            .map(|(_, content)| content)
            .filter(|content| !content.is_empty())
    }
}

/// Grey level of a pixel as a scanner sees it
#[allow(clippy::cast_possible_truncation)] // weighted average of u8 channels stays below 256
fn luminance(pixel: Rgba<u8>) -> u8 {
    let [r, g, b, a] = pixel.0;
    if a < 128 {
        return u8::MAX;
    }
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn encode_has_requested_dimensions() {
        let image = TicketCodec::default()
            .encode("UV-1-9942", 512, BLACK)
            .unwrap();
        assert_eq!(image.dimensions(), (512, 512));
    }

    #[test]
    fn encode_uses_foreground_and_background() {
        let teal = Rgba([0, 128, 128, 255]);
        let image = TicketCodec::default().encode("UV-2-0001", 300, teal).unwrap();

        let colors: std::collections::HashSet<_> = image.pixels().copied().collect();
        assert_eq!(colors.len(), 2);
        assert!(colors.contains(&teal));
        assert!(colors.contains(&WHITE));
        // Corner lies in the quiet zone
        assert_eq!(*image.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn transparent_background() {
        let codec = TicketCodec::new(CodecConfig {
            background: Background::Transparent,
            ..CodecConfig::default()
        });
        let image = codec.encode("UV-3-1234", 256, BLACK).unwrap();
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn encode_rejects_empty_content() {
        let result = TicketCodec::default().encode("", 512, BLACK);
        assert!(matches!(result, Err(TicketError::EncodingFailed(_))));
    }

    #[test]
    fn encode_rejects_tiny_size() {
        let result = TicketCodec::default().encode("UV-1-9942", 16, BLACK);
        assert!(matches!(result, Err(TicketError::EncodingFailed(_))));
    }

    #[test]
    fn encode_rejects_oversized_image() {
        let codec = TicketCodec::default();

        let result = codec.encode("UV-1-9942", u32::MAX, BLACK);
        assert!(matches!(result, Err(TicketError::EncodingFailed(_))));

        assert!(codec.encode("UV-1-9942", MAX_TICKET_SIZE + 1, BLACK).is_err());
    }

    #[test]
    fn encode_rejects_unrepresentable_margin() {
        for margin in [u32::MAX / 2 + 1, u32::MAX] {
            let codec = TicketCodec::new(CodecConfig {
                margin,
                ..CodecConfig::default()
            });
            let result = codec.encode("UV-1-9942", 512, BLACK);
            assert!(matches!(result, Err(TicketError::EncodingFailed(_))));
        }
    }

    #[test]
    fn margin_wider_than_the_image_fails() {
        let codec = TicketCodec::new(CodecConfig {
            margin: 1000,
            ..CodecConfig::default()
        });
        assert!(codec.encode("UV-1-9942", 512, BLACK).is_err());
    }

    #[test]
    fn render_or_absent_absorbs_failure() {
        assert!(TicketCodec::default().render_or_absent("", 512, BLACK).is_none());
    }

    #[test]
    fn blank_frame_is_a_miss() {
        let frame = RgbaImage::from_pixel(200, 200, WHITE);
        assert_eq!(TicketCodec::default().decode(&frame), None);
    }

    #[test]
    fn luminance_treats_clear_as_white() {
        assert_eq!(luminance(CLEAR), 255);
        assert_eq!(luminance(BLACK), 0);
        assert_eq!(luminance(WHITE), 255);
    }

    #[test]
    fn parses_settings() {
        assert_eq!("transparent".parse(), Ok(Background::Transparent));
        assert_eq!("q".parse(), Ok(ErrorCorrection::Quartile));
        assert!("purple".parse::<Background>().is_err());
    }
}
