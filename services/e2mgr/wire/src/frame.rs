//! Length-prefixed framing of message buffers over a byte stream.

use crate::header::{FrameHeader, FRAME_HEADER_SIZE, WIRE_VERSION};
use crate::message::MBuf;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Default maximum payload size (64 KiB)
pub const DEFAULT_MAX_MSG_SIZE: usize = 64 * 1024;
/// Hard maximum payload size limit (16 MiB)
pub const HARD_MAX_MSG_SIZE: usize = 16 * 1024 * 1024;

/// Total encoded size of a message, including the length prefix
pub fn encoded_size(mbuf: &MBuf) -> usize {
    4 + FRAME_HEADER_SIZE + mbuf.meid.len() + mbuf.xaction.len() + mbuf.payload.len()
}

/// Encode a message to a contiguous buffer
pub fn encode_frame(mbuf: &MBuf, max_msg_size: usize) -> Result<Bytes, crate::WireError> {
    if mbuf.payload.len() > max_msg_size.min(HARD_MAX_MSG_SIZE) {
        return Err(crate::WireError::Size(mbuf.payload.len()));
    }

    let header = FrameHeader {
        version: WIRE_VERSION,
        msg_type: mbuf.msg_type,
        meid_len: u16::try_from(mbuf.meid.len())
            .map_err(|_| crate::WireError::Size(mbuf.meid.len()))?,
        xaction_len: u16::try_from(mbuf.xaction.len())
            .map_err(|_| crate::WireError::Size(mbuf.xaction.len()))?,
        payload_len: mbuf.payload.len() as u32,
    };
    header.validate()?;

    let total_size = encoded_size(mbuf);
    let mut buf = BytesMut::with_capacity(total_size);

    // Frame length (everything after this u32)
    buf.put_u32((total_size - 4) as u32);
    header.encode(&mut buf);
    buf.put_slice(mbuf.meid.as_bytes());
    buf.put_slice(&mbuf.xaction);
    buf.put_slice(&mbuf.payload);

    Ok(buf.freeze())
}

/// Frame decoder for parsing incoming frames
#[derive(Debug)]
pub struct FrameDecoder {
    max_msg_size: usize,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self::with_max_msg_size(DEFAULT_MAX_MSG_SIZE)
    }

    /// Create a decoder that rejects payloads above `max_msg_size`
    pub fn with_max_msg_size(max_msg_size: usize) -> Self {
        Self {
            max_msg_size: max_msg_size.min(HARD_MAX_MSG_SIZE),
        }
    }

    fn max_frame_len(&self) -> usize {
        FRAME_HEADER_SIZE + crate::header::MAX_MEID_LEN + crate::header::MAX_XACTION_LEN + self.max_msg_size
    }

    /// Decode one frame from a buffer.
    ///
    /// Returns `Ok(None)` until a complete frame is buffered.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<MBuf>, crate::WireError> {
        // Need at least 4 bytes for frame length
        if buf.len() < 4 {
            return Ok(None);
        }

        // Peek at frame length
        let frame_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        if frame_len > self.max_frame_len() {
            return Err(crate::WireError::Size(frame_len));
        }
        if frame_len < FRAME_HEADER_SIZE {
            return Err(crate::WireError::Malformed);
        }

        // Check if we have the complete frame
        if buf.len() < 4 + frame_len {
            return Ok(None);
        }

        buf.advance(4);
        let mut frame_buf = buf.split_to(frame_len).freeze();
        let header = FrameHeader::decode(&mut frame_buf)?;

        if header.payload_len as usize > self.max_msg_size {
            return Err(crate::WireError::Size(header.payload_len as usize));
        }
        if header.body_len() != frame_buf.len() {
            return Err(crate::WireError::Malformed);
        }

        let meid_raw = frame_buf.split_to(header.meid_len as usize);
        let meid = String::from_utf8(meid_raw.to_vec()).map_err(|_| crate::WireError::Malformed)?;
        let xaction = frame_buf.split_to(header.xaction_len as usize);
        let payload = frame_buf;

        Ok(Some(MBuf {
            msg_type: header.msg_type,
            meid,
            payload,
            xaction,
        }))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RIC_X2_SETUP_RESP;

    fn sample() -> MBuf {
        MBuf::new(RIC_X2_SETUP_RESP, "enb-01", &b"payload"[..], &b"tx-7"[..])
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let encoded = encode_frame(&sample(), DEFAULT_MAX_MSG_SIZE).unwrap();
        let mut decoder = FrameDecoder::new();

        let mut buf = BytesMut::from(&encoded[..10]);
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&encoded[10..]);
        let decoded = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, sample());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_two_frames_back_to_back() {
        let first = encode_frame(&sample(), DEFAULT_MAX_MSG_SIZE).unwrap();
        let second_msg = MBuf::new(1080, "gnb-02", Bytes::new(), Bytes::new());
        let second = encode_frame(&second_msg, DEFAULT_MAX_MSG_SIZE).unwrap();

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), sample());
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), second_msg);
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let big = MBuf::new(1, "ran", vec![0u8; 128], Bytes::new());
        assert!(matches!(
            encode_frame(&big, 64),
            Err(crate::WireError::Size(128))
        ));

        let encoded = encode_frame(&big, DEFAULT_MAX_MSG_SIZE).unwrap();
        let mut decoder = FrameDecoder::with_max_msg_size(64);
        let mut buf = BytesMut::from(&encoded[..]);
        assert!(decoder.decode(&mut buf).is_err());
    }

    #[test]
    fn test_inconsistent_lengths_rejected() {
        let encoded = encode_frame(&sample(), DEFAULT_MAX_MSG_SIZE).unwrap();
        let mut raw = BytesMut::from(&encoded[..]);
        // Claim one more payload byte than the frame carries
        let payload_len_offset = 4 + 1 + 4 + 2 + 2;
        raw[payload_len_offset + 3] += 1;

        let mut decoder = FrameDecoder::new();
        assert!(matches!(
            decoder.decode(&mut raw),
            Err(crate::WireError::Malformed)
        ));
    }

    #[test]
    fn test_invalid_meid_utf8() {
        let mut buf = BytesMut::new();
        let header = FrameHeader {
            version: WIRE_VERSION,
            msg_type: 1,
            meid_len: 2,
            xaction_len: 0,
            payload_len: 0,
        };
        buf.put_u32((FRAME_HEADER_SIZE + 2) as u32);
        header.encode(&mut buf);
        buf.put_slice(&[0xff, 0xfe]);

        let mut decoder = FrameDecoder::new();
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(crate::WireError::Malformed)
        ));
    }
}
