use nom::{
    self,
    bytes::complete::take,
    error::{Error, ErrorKind},
    number::complete::{be_u16, be_u8},
    IResult,
};

use crate::errors::DnsCodecError;
use crate::protocol::{DnsPacketHeader, DnsQuestion, HEADER_LEN, MAX_LABEL_LEN};

pub fn parse_dns_packet_header(input: &[u8]) -> IResult<&[u8], DnsPacketHeader> {
    let (input, id) = be_u16(input)?;
    // take 1 bit for qr, 4 bits for opcode, 1 bit for aa,
    // 1 bit for tc, 1 bit for rd, 1 bit for ra, 3 bits for z,
    // and 4 bits for rcode
    let (input, flags) = be_u16(input)?;
    let (input, qdcount) = be_u16(input)?;
    let (input, ancount) = be_u16(input)?;
    let (input, nscount) = be_u16(input)?;
    let (input, arcount) = be_u16(input)?;

    let header = DnsPacketHeader {
        id,
        qr: (flags & 0x8000) != 0,
        opcode: ((flags & 0x7800) >> 11) as u8,
        aa: (flags & 0x0400) != 0,
        tc: (flags & 0x0200) != 0,
        rd: (flags & 0x0100) != 0,
        ra: (flags & 0x0080) != 0,
        z: ((flags & 0x0070) >> 4) as u8,
        rcode: (flags & 0x000F) as u8,
        qdcount,
        ancount,
        nscount,
        arcount,
    };

    Ok((input, header))
}

/// Parses an uncompressed domain name into its dotted form.
///
/// Each label is a length byte followed by that many bytes, and a zero length
/// byte ends the name. Length bytes with either of the top two bits set are
/// compression pointers or extended label types; both are rejected with
/// `ErrorKind::Verify` before any following byte is read.
///
/// Label bytes must be valid UTF-8 (`ErrorKind::Char` otherwise) and must not
/// contain a `.` (`ErrorKind::NoneOf`), so the dotted form encodes back to the
/// exact labels that were read. Both errors point at the label's length byte.
pub fn parse_domain_name(input: &[u8]) -> IResult<&[u8], String> {
    let mut labels: Vec<String> = Vec::new();
    let mut remaining = input;

    loop {
        let (i, length) = be_u8(remaining)?;

        match length {
            0 => return Ok((i, labels.join("."))),
            l if (l as usize) <= MAX_LABEL_LEN => {
                let (i, label_bytes) = take(l as usize)(i)?;
                let label = std::str::from_utf8(label_bytes).map_err(|_| {
                    nom::Err::Failure(Error::new(remaining, ErrorKind::Char))
                })?;
                if label.contains('.') {
                    return Err(nom::Err::Failure(Error::new(
                        remaining,
                        ErrorKind::NoneOf,
                    )));
                }
                labels.push(label.to_owned());
                remaining = i;
            }
            _ => {
                return Err(nom::Err::Failure(Error::new(
                    remaining,
                    ErrorKind::Verify,
                )))
            }
        }
    }
}

/// Parse a single entry of the question section.
pub fn parse_dns_question(input: &[u8]) -> IResult<&[u8], DnsQuestion> {
    let (input, name) = parse_domain_name(input)?;
    let (input, qtype) = be_u16(input)?;
    let (input, qclass) = be_u16(input)?;

    Ok((input, DnsQuestion::new(name, qtype.into(), qclass.into())))
}

/// Maps a nom failure on `packet` to a codec error carrying the byte offset
/// where parsing stopped.
pub fn to_codec_error(packet: &[u8], err: nom::Err<Error<&[u8]>>) -> DnsCodecError {
    match err {
        nom::Err::Incomplete(needed) => {
            let needed = match needed {
                nom::Needed::Size(n) => n.get(),
                nom::Needed::Unknown => HEADER_LEN,
            };
            DnsCodecError::IncompletePacket {
                needed,
                available: packet.len(),
            }
        }
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = packet.len() - e.input.len();
            match e.code {
                ErrorKind::Verify => DnsCodecError::UnsupportedLabel {
                    offset,
                    byte: e.input.first().copied().unwrap_or_default(),
                },
                ErrorKind::Char => DnsCodecError::InvalidLabel {
                    offset,
                    reason: "label is not valid UTF-8",
                },
                ErrorKind::NoneOf => DnsCodecError::InvalidLabel {
                    offset,
                    reason: "label contains a '.'",
                },
                ErrorKind::Eof => DnsCodecError::Truncated { offset },
                other => DnsCodecError::NomError(format!("{:?} at offset {}", other, offset)),
            }
        }
    }
}
