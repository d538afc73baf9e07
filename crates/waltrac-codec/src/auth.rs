//! Message authentication shared by every wire message.
//!
//! A tag is HMAC-SHA256 over the message's signable bytes, truncated to the
//! first [`TAG_LEN`] bytes. Signing and verification live here once and are
//! generic over [`Signable`].

use crate::error::{CodecError, CodecResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of the truncated authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Truncated HMAC-SHA256 authentication tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    /// Placeholder tag carried by unsigned messages.
    pub const ZERO: Tag = Tag([0u8; TAG_LEN]);

    pub fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// True for the unsigned placeholder.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; TAG_LEN]
    }
}

/// A wire message that can be signed and verified.
///
/// Implementors only describe their own bytes; the tag is never part of
/// [`Signable::signable_bytes`].
pub trait Signable {
    /// Every field except the tag, in wire order.
    fn signable_bytes(&self) -> CodecResult<Vec<u8>>;

    /// The tag currently stored on the message.
    fn tag(&self) -> &Tag;

    /// Replace the stored tag.
    fn set_tag(&mut self, tag: Tag);
}

fn compute_tag(key: &[u8], data: &[u8]) -> CodecResult<Tag> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CodecError::Key(e.to_string()))?;
    mac.update(data);

    let digest = mac.finalize().into_bytes();
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest[..TAG_LEN]);

    Ok(Tag(tag))
}

/// Sign `message` and return its full wire encoding (`signable || tag`).
///
/// With `key == None` no MAC is computed and the zero tag is stored and
/// appended. Such a message never passes [`verify`].
pub fn sign<M: Signable + ?Sized>(message: &mut M, key: Option<&[u8]>) -> CodecResult<Vec<u8>> {
    let mut bytes = message.signable_bytes()?;

    let tag = match key {
        Some(key) => compute_tag(key, &bytes)?,
        None => Tag::ZERO,
    };

    message.set_tag(tag);
    bytes.extend_from_slice(tag.as_bytes());

    Ok(bytes)
}

/// Check the stored tag against one recomputed with `key`.
///
/// The comparison is constant-time. Never fails: an unencodable message, a
/// rejected key or the zero placeholder tag all yield `false`.
pub fn verify<M: Signable + ?Sized>(message: &M, key: &[u8]) -> bool {
    if message.tag().is_zero() {
        return false;
    }

    let expected = match message
        .signable_bytes()
        .and_then(|bytes| compute_tag(key, &bytes))
    {
        Ok(tag) => tag,
        Err(_) => return false,
    };

    expected.0.ct_eq(message.tag().as_bytes()).into()
}
