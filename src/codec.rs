//! Wire codec: DNS header and question-section parsing, name decompression,
//! and refusal-response synthesis.
//!
//! Ref [RFC1035](https://www.rfc-editor.org/rfc/rfc1035#section-4.1.1) section 4.1.1.

use packed_struct::prelude::*;
use std::collections::HashSet;

use crate::enums::Rcode;
use crate::error::WireError;

pub const HEADER_BYTES: usize = 12;
/// Maximum number of labels in a single resolved name (§3, §4.1).
const MAX_LABELS: usize = 127;
/// Maximum resolved name length in bytes (§3, §4.1).
const MAX_NAME_BYTES: usize = 255;
/// Top two bits of a label-length byte both set marks a compression pointer.
const POINTER_MASK: u8 = 0b1100_0000;

/// The 12-byte header shared by every DNS message.
///
/// Fields that this forwarder never interprets (`opcode`, `z`, `rcode`) are
/// kept as raw bit-width integers rather than typed enums so that
/// [`Header::unpack`] round-trips *any* 12-byte input losslessly, per the
/// header round-trip invariant — a typed enum would reject bit patterns the
/// spec requires us to tolerate.
#[derive(Debug, PackedStruct, PartialEq, Eq, Clone, Copy)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct Header {
    /// The transaction id, copied verbatim between query and reply.
    #[packed_field(bits = "0..=15", endian = "msb")]
    pub id: u16,
    /// Query (false) or response (true) — bit 15 of the flags word.
    #[packed_field(bits = "16")]
    pub qr: bool,
    #[packed_field(bits = "17..=20")]
    pub opcode: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "21")]
    pub aa: bool,
    #[packed_field(bits = "22")]
    pub tc: bool,
    #[packed_field(bits = "23")]
    pub rd: bool,
    #[packed_field(bits = "24")]
    pub ra: bool,
    #[packed_field(bits = "25..=27")]
    pub z: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "28..=31")]
    pub rcode: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "32..=47", endian = "msb")]
    pub qd_count: u16,
    #[packed_field(bits = "48..=63", endian = "msb")]
    pub an_count: u16,
    #[packed_field(bits = "64..=79", endian = "msb")]
    pub ns_count: u16,
    #[packed_field(bits = "80..=95", endian = "msb")]
    pub ar_count: u16,
}

impl Header {
    pub fn is_query(&self) -> bool {
        !self.qr
    }

    pub fn is_response(&self) -> bool {
        self.qr
    }
}

/// Parses the 12-byte DNS header. Requires `buffer.len() >= HEADER_BYTES`
/// and never fails for any such buffer — does not validate counts against
/// payload length, per §4.1.
pub fn parse_header(buffer: &[u8]) -> Result<Header, WireError> {
    if buffer.len() < HEADER_BYTES {
        return Err(WireError::ShortHeader(buffer.len()));
    }
    let mut raw = [0u8; HEADER_BYTES];
    raw.copy_from_slice(&buffer[..HEADER_BYTES]);
    Ok(Header::unpack(&raw)?)
}

/// A fully-resolved domain name: an ordered list of label byte-strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    /// The printable, lowercased, dot-joined form used for blacklist comparison.
    pub fn to_lowercase_string(&self) -> String {
        self.labels
            .iter()
            .map(|label| String::from_utf8_lossy(label).to_lowercase())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Walks labels starting at `offset`, following at most one level of
/// compression-pointer redirection per hop, and rejecting pointers that
/// target the current position or later (forward references and cycles).
///
/// Returns the parsed name and the offset one past the end of what was read
/// *from the original position* — a pointer's target is never reflected in
/// the returned offset (§4.1).
pub fn parse_name(buffer: &[u8], offset: usize) -> Result<(Name, usize), WireError> {
    let mut labels: Vec<Vec<u8>> = Vec::new();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut pos = offset;
    let mut new_offset: Option<usize> = None;

    loop {
        let len_byte = *buffer
            .get(pos)
            .ok_or(WireError::OutOfBounds(pos, buffer.len()))?;

        if len_byte & POINTER_MASK == POINTER_MASK {
            let hi = (len_byte & !POINTER_MASK) as usize;
            let lo = *buffer
                .get(pos + 1)
                .ok_or(WireError::OutOfBounds(pos + 1, buffer.len()))? as usize;
            let target = (hi << 8) | lo;

            if new_offset.is_none() {
                new_offset = Some(pos + 2);
            }
            if target >= pos || visited.contains(&target) {
                return Err(WireError::ForwardPointer(pos, target));
            }
            visited.insert(target);
            pos = target;
            continue;
        }

        if len_byte == 0 {
            if new_offset.is_none() {
                new_offset = Some(pos + 1);
            }
            break;
        }

        if len_byte > 63 {
            return Err(WireError::LabelTooLong(len_byte));
        }
        let label_len = len_byte as usize;
        let label_start = pos + 1;
        let label_end = label_start + label_len;
        let label = buffer
            .get(label_start..label_end)
            .ok_or(WireError::OutOfBounds(label_end, buffer.len()))?
            .to_vec();

        labels.push(label);
        if labels.len() > MAX_LABELS {
            return Err(WireError::TooManyLabels);
        }

        pos = label_end;
    }

    let name = Name { labels };
    let resolved_len: usize = name.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
    if resolved_len > MAX_NAME_BYTES {
        return Err(WireError::NameTooLong);
    }

    Ok((name, new_offset.expect("loop always sets new_offset before breaking")))
}

/// Parses `qd_count` questions starting at offset 12, returning the question
/// names in order and the offset at which the question section ends.
pub fn parse_questions(
    buffer: &[u8],
    qd_count: u16,
) -> Result<(Vec<Name>, usize), WireError> {
    let mut offset = HEADER_BYTES;
    let mut names = Vec::with_capacity(qd_count as usize);

    for _ in 0..qd_count {
        let (name, after_name) = parse_name(buffer, offset)?;
        names.push(name);
        // skip QTYPE (2 bytes) + QCLASS (2 bytes)
        let after_fixed = after_name + 4;
        if after_fixed > buffer.len() {
            return Err(WireError::TruncatedQuestion(qd_count));
        }
        offset = after_fixed;
    }

    Ok((names, offset))
}

/// Produces a 12-byte refusal response: same `id`, QR=1, Opcode=0, all
/// flags clear except RCODE, all counts zero. No question section is
/// echoed (§4.1).
pub fn synthesize_refusal(id: u16, rcode: Rcode) -> [u8; HEADER_BYTES] {
    let header = Header {
        id,
        qr: true,
        opcode: 0.into(),
        aa: false,
        tc: false,
        rd: false,
        ra: false,
        z: 0.into(),
        rcode: (rcode as u8).into(),
        qd_count: 0,
        an_count: 0,
        ns_count: 0,
        ar_count: 0,
    };
    header
        .pack()
        .expect("refusal header is built from in-range fields and always packs")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(id: u16, flags: u16, qd: u16, an: u16, ns: u16, ar: u16) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[0..2].copy_from_slice(&id.to_be_bytes());
        buf[2..4].copy_from_slice(&flags.to_be_bytes());
        buf[4..6].copy_from_slice(&qd.to_be_bytes());
        buf[6..8].copy_from_slice(&an.to_be_bytes());
        buf[8..10].copy_from_slice(&ns.to_be_bytes());
        buf[10..12].copy_from_slice(&ar.to_be_bytes());
        buf
    }

    #[test]
    fn header_round_trip_any_bits() {
        // sweep a handful of representative flag words, including ones with
        // opcode/rcode bit patterns no enum would accept.
        for flags in [0x0000u16, 0x8005, 0xFFFF, 0x1234, 0x0780, 0x000F] {
            let raw = header_bytes(0xBEEF, flags, 1, 2, 3, 4);
            let header = parse_header(&raw).expect("parses");
            let packed = header.pack().expect("packs");
            assert_eq!(packed, raw, "round trip failed for flags={flags:#06x}");
        }
    }

    #[test]
    fn header_too_short() {
        let buf = [0u8; 11];
        assert_eq!(parse_header(&buf), Err(WireError::ShortHeader(11)));
    }

    #[test]
    fn header_qr_bit() {
        let raw = header_bytes(1, 0x8000, 0, 0, 0, 0);
        let header = parse_header(&raw).unwrap();
        assert!(header.is_response());
        assert!(!header.is_query());

        let raw = header_bytes(1, 0x0000, 0, 0, 0, 0);
        let header = parse_header(&raw).unwrap();
        assert!(header.is_query());
    }

    #[test]
    fn parse_name_simple() {
        let mut buf = vec![];
        buf.push(3);
        buf.extend(b"www");
        buf.push(6);
        buf.extend(b"google");
        buf.push(3);
        buf.extend(b"com");
        buf.push(0);

        let (name, new_offset) = parse_name(&buf, 0).unwrap();
        assert_eq!(name.to_lowercase_string(), "www.google.com");
        assert_eq!(new_offset, buf.len());
    }

    #[test]
    fn parse_name_uppercase_is_lowercased() {
        let mut buf = vec![3];
        buf.extend(b"WWW");
        buf.push(0);
        let (name, _) = parse_name(&buf, 0).unwrap();
        assert_eq!(name.to_lowercase_string(), "www");
    }

    #[test]
    fn parse_name_with_pointer() {
        // offset 0: "example" + "com" + 0
        let mut buf = vec![7];
        buf.extend(b"example");
        buf.push(3);
        buf.extend(b"com");
        buf.push(0);

        let pointer_offset = buf.len();
        // a second name "www" followed by a pointer back to offset 0
        buf.push(3);
        buf.extend(b"www");
        buf.push(0xC0);
        buf.push(0x00);

        let (name, new_offset) = parse_name(&buf, pointer_offset).unwrap();
        assert_eq!(name.to_lowercase_string(), "www.example.com");
        // new_offset is right after the pointer's two bytes, not the target
        assert_eq!(new_offset, buf.len());
    }

    #[test]
    fn parse_name_rejects_forward_pointer() {
        let mut buf = vec![0xC0, 0x05, 0, 0, 0];
        buf.extend([7]);
        let err = parse_name(&buf, 0).unwrap_err();
        assert_eq!(err, WireError::ForwardPointer(0, 5));
    }

    #[test]
    fn parse_name_rejects_self_pointer() {
        let buf = vec![0xC0, 0x00];
        let err = parse_name(&buf, 0).unwrap_err();
        assert_eq!(err, WireError::ForwardPointer(0, 0));
    }

    #[test]
    fn parse_name_rejects_any_forward_hop_in_a_chain() {
        // offset 0 points to offset 2, which (if ever reached) points back to
        // offset 0 — but the first hop is already a forward reference and
        // must be rejected before the chain is followed any further.
        let buf = vec![0xC0, 0x02, 0xC0, 0x00];
        let err = parse_name(&buf, 0).unwrap_err();
        assert_eq!(err, WireError::ForwardPointer(0, 2));
    }

    #[test]
    fn parse_name_follows_chain_of_strictly_backward_pointers() {
        // offset 0: "com", offset 4: pointer to 0, offset 6: pointer to 4
        let mut buf = vec![3];
        buf.extend(b"com");
        buf.push(0);
        assert_eq!(buf.len(), 5);
        buf.push(0xC0);
        buf.push(0x00);
        let second_pointer_offset = buf.len();
        buf.push(0xC0);
        buf.push(0x05);

        let (name, new_offset) = parse_name(&buf, second_pointer_offset).unwrap();
        assert_eq!(name.to_lowercase_string(), "com");
        assert_eq!(new_offset, buf.len());
    }

    #[test]
    fn parse_name_rejects_oversized_label() {
        // 64 has only the high bit set, so it reads as a plain label length,
        // not a compression pointer (top two bits must both be set for that).
        let buf = vec![64u8, 1, 2, 3];
        let err = parse_name(&buf, 0).unwrap_err();
        assert_eq!(err, WireError::LabelTooLong(64));
    }

    #[test]
    fn parse_name_rejects_out_of_bounds_label() {
        let buf = vec![10u8, 1, 2, 3];
        let err = parse_name(&buf, 0).unwrap_err();
        assert!(matches!(err, WireError::OutOfBounds(_, _)));
    }

    #[test]
    fn parse_questions_skips_qtype_qclass() {
        let mut buf = vec![0u8; HEADER_BYTES];
        buf.push(5);
        buf.extend(b"allow");
        buf.push(0);
        buf.extend([0, 1]); // QTYPE A
        buf.extend([0, 1]); // QCLASS IN

        let (names, end) = parse_questions(&buf, 1).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].to_lowercase_string(), "allow");
        assert_eq!(end, buf.len());
    }

    #[test]
    fn parse_questions_empty_qd_count() {
        let buf = vec![0u8; HEADER_BYTES];
        let (names, end) = parse_questions(&buf, 0).unwrap();
        assert!(names.is_empty());
        assert_eq!(end, HEADER_BYTES);
    }

    #[test]
    fn synthesize_refusal_matches_spec_example() {
        // S2 in the spec: id=0xBEEF, flags=0x8005 (QR=1, RCODE=5), counts=0.
        let bytes = synthesize_refusal(0xBEEF, Rcode::Refused);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..2], &0xBEEFu16.to_be_bytes());
        assert_eq!(&bytes[2..4], &0x8005u16.to_be_bytes());
        assert_eq!(&bytes[4..12], &[0u8; 8]);
    }

    #[test]
    fn synthesize_refusal_preserves_id_for_any_rcode() {
        for rcode in [
            Rcode::FormatError,
            Rcode::ServFail,
            Rcode::NameError,
            Rcode::NotImplemented,
            Rcode::Refused,
        ] {
            let bytes = synthesize_refusal(0x1234, rcode);
            let header = parse_header(&bytes).unwrap();
            assert_eq!(header.id, 0x1234);
            assert!(header.is_response());
        }
    }
}
