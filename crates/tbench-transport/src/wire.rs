use tbench_core::{Result, TbenchError, ResponseTag};

/// Fixed request header: id (u64 LE) + len (u64 LE), followed by `len`
/// payload bytes.
pub const REQ_HEADER_LEN: usize = 16;

/// Fixed response header: tag (u8) + id (u64 LE) + svc_ns (u64 LE) +
/// len (u64 LE), followed by `len` payload bytes only when
/// `tag == RESPONSE`.
pub const RESP_HEADER_LEN: usize = 1 + 8 + 8 + 8;

pub fn encode_request_header(id: u64, len: u64) -> [u8; REQ_HEADER_LEN] {
    let mut buf = [0u8; REQ_HEADER_LEN];
    buf[0..8].copy_from_slice(&id.to_le_bytes());
    buf[8..16].copy_from_slice(&len.to_le_bytes());
    buf
}

pub fn encode_response_header(tag: ResponseTag, id: u64, svc_ns: u64, len: u64) -> [u8; RESP_HEADER_LEN] {
    let mut buf = [0u8; RESP_HEADER_LEN];
    buf[0] = tag as u8;
    buf[1..9].copy_from_slice(&id.to_le_bytes());
    buf[9..17].copy_from_slice(&svc_ns.to_le_bytes());
    buf[17..25].copy_from_slice(&len.to_le_bytes());
    buf
}

pub fn decode_response_header(buf: &[u8; RESP_HEADER_LEN]) -> Result<(ResponseTag, u64, u64, u64)> {
    let tag = ResponseTag::from_u8(buf[0])?;
    let id = u64::from_le_bytes(buf[1..9].try_into().unwrap());
    let svc_ns = u64::from_le_bytes(buf[9..17].try_into().unwrap());
    let len = u64::from_le_bytes(buf[17..25].try_into().unwrap());
    Ok((tag, id, svc_ns, len))
}

pub fn decode_request_header(buf: &[u8; REQ_HEADER_LEN]) -> (u64, u64) {
    let id = u64::from_le_bytes(buf[0..8].try_into().unwrap());
    let len = u64::from_le_bytes(buf[8..16].try_into().unwrap());
    (id, len)
}

pub fn check_len(len: u64, max: usize, what: &str) -> Result<usize> {
    if len as usize > max {
        return Err(TbenchError::Protocol(format!(
            "{what} length {len} exceeds max {max}"
        )));
    }
    Ok(len as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_round_trips() {
        let buf = encode_request_header(42, 100);
        let (id, len) = decode_request_header(&buf);
        assert_eq!(id, 42);
        assert_eq!(len, 100);
    }

    #[test]
    fn response_header_round_trips() {
        let buf = encode_response_header(ResponseTag::Response, 7, 900, 12);
        let (tag, id, svc_ns, len) = decode_response_header(&buf).unwrap();
        assert_eq!(tag, ResponseTag::Response);
        assert_eq!(id, 7);
        assert_eq!(svc_ns, 900);
        assert_eq!(len, 12);
    }

    #[test]
    fn unknown_tag_is_protocol_error() {
        let mut buf = encode_response_header(ResponseTag::Response, 0, 0, 0);
        buf[0] = 200;
        assert!(decode_response_header(&buf).is_err());
    }
}
