//! Control command sent to a field device.
//!
//! Wire format:
//! ```text
//! [1: header][1: arg_len][N: arg][16: tag]
//! ```

use crate::auth::{Signable, Tag, TAG_LEN};
use crate::error::{CodecError, CodecResult};
use crate::wire::{put_text, Reader};
use crate::HEADER_MARKER;
use std::fmt;

/// Header bits carrying the action code.
pub const ACTION_MASK: u8 = 0x0F;

/// Command message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// Action byte: marker bit 7, action code in the low nibble.
    pub header: u8,
    /// Action argument; at most 255 bytes once encoded.
    pub arg: String,
    pub tag: Tag,
}

impl Command {
    /// Smallest valid encoding: header, empty argument and the tag.
    pub const MIN_LEN: usize = 1 + 1 + TAG_LEN;

    /// Build an unsigned command for `action`, setting the marker bit.
    pub fn with_action(action: u8, arg: impl Into<String>) -> Self {
        Self {
            header: HEADER_MARKER | (action & ACTION_MASK),
            arg: arg.into(),
            tag: Tag::ZERO,
        }
    }

    /// Parse a received buffer. The buffer must be consumed exactly.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < Self::MIN_LEN {
            return Err(CodecError::Framing(format!(
                "Command too short: {} bytes, need at least {}",
                data.len(),
                Self::MIN_LEN
            )));
        }

        let mut reader = Reader::new(data);

        let header = reader.u8()?;
        let arg = reader.text("arg")?;
        let tag = reader.tag()?;

        reader.finish()?;

        Ok(Self { header, arg, tag })
    }

    /// Encode with whatever tag is currently stored, without re-signing.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut bytes = self.signable_bytes()?;
        bytes.extend_from_slice(self.tag.as_bytes());
        Ok(bytes)
    }

    /// Action code from the header's low nibble.
    pub fn action(&self) -> u8 {
        self.header & ACTION_MASK
    }
}

impl Signable for Command {
    fn signable_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(2 + self.arg.len());

        buf.push(self.header);
        put_text(&mut buf, "arg", &self.arg)?;

        Ok(buf)
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command(header={:#04x}, arglen={}, arg={:?})",
            self.header,
            self.arg.len(),
            self.arg
        )
    }
}
