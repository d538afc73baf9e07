//! Big-endian cursor shared by the message decoders and encoders.

use crate::auth::{Tag, TAG_LEN};
use crate::error::{CodecError, CodecResult};

/// Forward-only reader over a received buffer.
///
/// Every read is bounds-checked; running past the end is a framing error.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::Framing(format!(
                "need {} bytes at offset {}, only {} remaining",
                len,
                self.offset,
                self.remaining()
            )));
        }

        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn i32_be(&mut self) -> CodecResult<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32_be(&mut self) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Read a one-byte length prefix and that many bytes of UTF-8.
    ///
    /// The prefix must leave room for the trailing tag.
    pub(crate) fn text(&mut self, field: &'static str) -> CodecResult<String> {
        let len = self.u8()? as usize;

        if self.remaining() < len + TAG_LEN {
            return Err(CodecError::Framing(format!(
                "{} length {} plus {}-byte tag exceeds the {} bytes remaining",
                field,
                len,
                TAG_LEN,
                self.remaining()
            )));
        }

        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| CodecError::Encoding { field, source })
    }

    pub(crate) fn tag(&mut self) -> CodecResult<Tag> {
        Ok(Tag::from_bytes(self.array()?))
    }

    /// Require that every byte was consumed.
    pub(crate) fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::Framing(format!(
                "{} trailing bytes after tag",
                extra
            ))),
        }
    }
}

/// Append a one-byte length prefix followed by the UTF-8 bytes of `text`.
pub(crate) fn put_text(buf: &mut Vec<u8>, field: &'static str, text: &str) -> CodecResult<()> {
    let len = u8::try_from(text.len()).map_err(|_| CodecError::TextTooLong {
        field,
        len: text.len(),
    })?;

    buf.push(len);
    buf.extend_from_slice(text.as_bytes());
    Ok(())
}
