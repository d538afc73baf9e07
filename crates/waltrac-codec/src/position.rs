//! Position report sent by a field device.
//!
//! Wire format (big-endian):
//! ```text
//! [1: header][1: interval][6: device][4: lat i32][4: lon i32][4: timestamp u32][1: name_len][N: name][16: tag]
//! ```
//!
//! Latitude and longitude travel as degrees × [`SCALE`]. They are held as
//! `f64` in memory and re-quantized on every encode, so a decoded message
//! re-encodes to exactly the bytes that were signed.

use crate::auth::{Signable, Tag, TAG_LEN};
use crate::error::{CodecError, CodecResult};
use crate::wire::{put_text, Reader};
use crate::HEADER_MARKER;
use std::fmt;

/// Fixed-point scale for latitude and longitude.
pub const SCALE: f64 = 10_000_000.0;

/// Length of a device identifier in bytes.
pub const DEVICE_ID_LEN: usize = 6;

/// Header bit carrying the fix-valid flag.
const VALID_BIT: u8 = 0x01;

/// Quantize degrees to the wire's fixed-point representation.
///
/// Rounds to the nearest unit; values outside the `i32` range saturate.
pub fn to_fixed(degrees: f64) -> i32 {
    (degrees * SCALE).round() as i32
}

/// Convert a fixed-point wire value back to degrees.
pub fn from_fixed(value: i32) -> f64 {
    f64::from(value) / SCALE
}

/// Opaque 6-byte identifier of a field device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceId(pub [u8; DEVICE_ID_LEN]);

impl DeviceId {
    pub fn as_bytes(&self) -> &[u8; DEVICE_ID_LEN] {
        &self.0
    }

    /// Lower-case hex rendering, as used in topics and events.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Position report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Position {
    /// Status byte: marker bit 7, fix-valid bit 0.
    pub header: u8,
    /// Report interval in seconds.
    pub interval: u8,
    pub device: DeviceId,
    /// Degrees, quantized to 1e-7 on encode.
    pub latitude: f64,
    /// Degrees, quantized to 1e-7 on encode.
    pub longitude: f64,
    /// Device-reported time in seconds.
    pub timestamp: u32,
    /// Device name; at most 255 bytes once encoded.
    pub name: String,
    pub tag: Tag,
}

impl Position {
    /// Smallest valid encoding: every fixed field, an empty name and the tag.
    pub const MIN_LEN: usize = 1 + 1 + DEVICE_ID_LEN + 4 + 4 + 4 + 1 + TAG_LEN;

    /// Parse a received buffer. The buffer must be consumed exactly.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < Self::MIN_LEN {
            return Err(CodecError::Framing(format!(
                "Position too short: {} bytes, need at least {}",
                data.len(),
                Self::MIN_LEN
            )));
        }

        let mut reader = Reader::new(data);

        let header = reader.u8()?;
        let interval = reader.u8()?;
        let device = DeviceId(reader.array()?);
        let latitude = from_fixed(reader.i32_be()?);
        let longitude = from_fixed(reader.i32_be()?);
        let timestamp = reader.u32_be()?;
        let name = reader.text("name")?;
        let tag = reader.tag()?;

        reader.finish()?;

        Ok(Self {
            header,
            interval,
            device,
            latitude,
            longitude,
            timestamp,
            name,
            tag,
        })
    }

    /// Encode with whatever tag is currently stored, without re-signing.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut bytes = self.signable_bytes()?;
        bytes.extend_from_slice(self.tag.as_bytes());
        Ok(bytes)
    }

    /// Set the header from its parameters, keeping the marker bit.
    pub fn set_header(&mut self, valid: bool) {
        self.header = HEADER_MARKER | if valid { VALID_BIT } else { 0 };
    }

    /// Fix-valid flag from the header.
    pub fn is_valid(&self) -> bool {
        self.header & VALID_BIT != 0
    }

    pub fn latitude_fixed(&self) -> i32 {
        to_fixed(self.latitude)
    }

    pub fn longitude_fixed(&self) -> i32 {
        to_fixed(self.longitude)
    }
}

impl Signable for Position {
    fn signable_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::MIN_LEN - TAG_LEN + self.name.len());

        buf.push(self.header);
        buf.push(self.interval);
        buf.extend_from_slice(self.device.as_bytes());
        buf.extend_from_slice(&self.latitude_fixed().to_be_bytes());
        buf.extend_from_slice(&self.longitude_fixed().to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        put_text(&mut buf, "name", &self.name)?;

        Ok(buf)
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position(header={:#04x}, interval={}, device={}, lat={:.7}, lon={:.7}, timestamp={}, name={:?})",
            self.header,
            self.interval,
            self.device,
            self.latitude,
            self.longitude,
            self.timestamp,
            self.name
        )
    }
}
