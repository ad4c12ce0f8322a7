//! Fixed frame header for the message transport.
//!
//! The header sits right after the frame length prefix and tells the decoder
//! how the remainder of the frame splits into meid, transaction id and payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Wire protocol version
pub const WIRE_VERSION: u8 = 1;

/// Frame header size in bytes
pub const FRAME_HEADER_SIZE: usize = 13;

/// Maximum meid length accepted on the wire
pub const MAX_MEID_LEN: usize = 256;

/// Maximum transaction id length accepted on the wire
pub const MAX_XACTION_LEN: usize = 256;

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version
    pub version: u8,
    /// Message type
    pub msg_type: i32,
    /// Length of the meid section
    pub meid_len: u16,
    /// Length of the transaction id section
    pub xaction_len: u16,
    /// Length of the payload section
    pub payload_len: u32,
}

impl FrameHeader {
    /// Number of body bytes described by this header
    pub fn body_len(&self) -> usize {
        self.meid_len as usize + self.xaction_len as usize + self.payload_len as usize
    }

    /// Encode header into buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_i32(self.msg_type);
        buf.put_u16(self.meid_len);
        buf.put_u16(self.xaction_len);
        buf.put_u32(self.payload_len);
    }

    /// Decode header from buffer
    pub fn decode(buf: &mut Bytes) -> Result<Self, crate::WireError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Err(crate::WireError::Incomplete);
        }

        let header = Self {
            version: buf.get_u8(),
            msg_type: buf.get_i32(),
            meid_len: buf.get_u16(),
            xaction_len: buf.get_u16(),
            payload_len: buf.get_u32(),
        };
        header.validate()?;
        Ok(header)
    }

    /// Validate header fields
    pub fn validate(&self) -> Result<(), crate::WireError> {
        if self.version != WIRE_VERSION {
            return Err(crate::WireError::Version(self.version));
        }
        if self.meid_len as usize > MAX_MEID_LEN {
            return Err(crate::WireError::Size(self.meid_len as usize));
        }
        if self.xaction_len as usize > MAX_XACTION_LEN {
            return Err(crate::WireError::Size(self.xaction_len as usize));
        }
        Ok(())
    }
}
