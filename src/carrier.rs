//! Carrier codecs hide a transport string inside a cover image.
//!
//! The pipeline only relies on [`CarrierCodec`]. [`LsbCodec`] is the
//! default implementation: it writes one bit into the least significant bit
//! of each R, G and B channel, row-major and MSB-first, and never touches
//! alpha.
//!
//! ```text
//! [magic "TZ": 2][length: 4 BE][message bytes]
//! ```

use crate::error::{Result, TrizipError};
use image::{ImageFormat, RgbaImage};
use std::path::Path;

/// Marks an image as carrying a message
pub const LSB_MAGIC: &[u8; 2] = b"TZ";

/// Magic plus the 32-bit length
pub const LSB_HEADER_LEN: usize = 6;

const CHANNELS_PER_PIXEL: usize = 3;

/// Hide and recover a transport string
pub trait CarrierCodec: Sync {
    type Image: Send + Sync;

    /// Return a new carrier image holding `message`; `cover` is unchanged
    fn embed(&self, cover: &Self::Image, message: &str) -> Result<Self::Image>;

    /// Recover the message, or `None` when the image carries nothing
    fn reveal(&self, carrier: &Self::Image) -> Result<Option<String>>;
}

/// Least-significant-bit codec over RGBA images
#[derive(Debug, Clone, Copy, Default)]
pub struct LsbCodec;

impl LsbCodec {
    /// Number of message bytes an image of this size can hold
    pub fn capacity(width: u32, height: u32) -> usize {
        let bits = width as usize * height as usize * CHANNELS_PER_PIXEL;
        (bits / 8).saturating_sub(LSB_HEADER_LEN)
    }
}

impl CarrierCodec for LsbCodec {
    type Image = RgbaImage;

    fn embed(&self, cover: &RgbaImage, message: &str) -> Result<RgbaImage> {
        let len = u32::try_from(message.len()).map_err(|_| TrizipError::CarrierTooSmall {
            needed: message.len().saturating_mul(8),
            available: u32::MAX as usize,
        })?;

        let mut frame = Vec::with_capacity(LSB_HEADER_LEN + message.len());
        frame.extend_from_slice(LSB_MAGIC);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(message.as_bytes());

        let available = cover.width() as usize * cover.height() as usize * CHANNELS_PER_PIXEL;
        let needed = frame.len() * 8;
        if needed > available {
            return Err(TrizipError::CarrierTooSmall { needed, available });
        }

        let mut carrier = cover.clone();
        let mut bits = frame
            .iter()
            .flat_map(|byte| (0..8).map(move |i| (byte >> (7 - i)) & 1));

        'pixels: for pixel in carrier.pixels_mut() {
            for channel in pixel.0.iter_mut().take(CHANNELS_PER_PIXEL) {
                match bits.next() {
                    Some(bit) => *channel = (*channel & 0xFE) | bit,
                    None => break 'pixels,
                }
            }
        }
        Ok(carrier)
    }

    fn reveal(&self, carrier: &RgbaImage) -> Result<Option<String>> {
        let mut bits = carrier
            .pixels()
            .flat_map(|p| p.0.into_iter().take(CHANNELS_PER_PIXEL))
            .map(|channel| channel & 1);

        let mut next_byte = || -> Option<u8> {
            let mut value = 0u8;
            for _ in 0..8 {
                value = (value << 1) | bits.next()?;
            }
            Some(value)
        };

        let mut header = [0u8; LSB_HEADER_LEN];
        for slot in header.iter_mut() {
            match next_byte() {
                Some(b) => *slot = b,
                None => return Ok(None),
            }
        }
        if &header[..2] != LSB_MAGIC {
            return Ok(None);
        }

        let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
        if len > LsbCodec::capacity(carrier.width(), carrier.height()) {
            return Ok(None);
        }

        let mut message = Vec::with_capacity(len);
        for _ in 0..len {
            match next_byte() {
                Some(b) => message.push(b),
                None => return Ok(None),
            }
        }
        Ok(String::from_utf8(message).ok())
    }
}

/// Load any supported image as RGBA
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Write a carrier as PNG; lossy formats would destroy the payload
pub fn save_carrier(image: &RgbaImage, path: &Path) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
