//! Authenticated binary wire codec shared by every Waltrac message.
//!
//! Two message shapes travel between field devices and the gateway:
//!
//! ```text
//! Position: [1 header][1 interval][6 device][4 lat][4 lon][4 timestamp][1 len][N name][16 tag]
//! Command:  [1 header][1 len][N arg][16 tag]
//! ```
//!
//! All multi-byte integers are big-endian. The trailing tag is the first 16
//! bytes of HMAC-SHA256 over everything before it.

mod auth;
mod command;
mod error;
mod position;
mod wire;

pub use auth::{sign, verify, Signable, Tag, TAG_LEN};
pub use command::{Command, ACTION_MASK};
pub use error::{CodecError, CodecResult};
pub use position::{from_fixed, to_fixed, DeviceId, Position, DEVICE_ID_LEN, SCALE};

/// Header bit the device always sets on outgoing messages.
pub const HEADER_MARKER: u8 = 0x80;
