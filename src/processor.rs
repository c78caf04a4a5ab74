use bytes::BytesMut;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::UdpSocket;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, warn};

use crate::codec::{DecodeMode, DnsCodec};
use crate::errors::DnsCodecError;
use crate::protocol::{DnsPacket, UDP_MAX_MESSAGE_SIZE};
use crate::resolver::Resolver;
use crate::response_builder::DnsResponseBuilder;

/// Resolve every question of `packet` and assemble the response
pub fn handle_query(
    packet: &DnsPacket,
    resolver: &dyn Resolver,
) -> Result<DnsPacket, DnsCodecError> {
    let mut builder = DnsResponseBuilder::for_query(packet);

    for question in &packet.questions {
        let resolution = resolver.resolve(question);
        if resolution.is_empty() {
            debug!("No records for {}", question);
        } else {
            info!(
                "Resolved {} -> {} answer(s)",
                question,
                resolution.answers.len()
            );
        }
        builder = builder.with_resolution(resolution);
    }

    builder.build()
}

/// Decode a datagram, resolve it and encode the reply.
///
/// `Ok(None)` means there is nothing to answer.
pub fn answer_datagram(
    packet_data: &[u8],
    resolver: &dyn Resolver,
    mode: DecodeMode,
) -> Result<Option<BytesMut>, DnsCodecError> {
    let mut codec = DnsCodec::with_mode(mode);
    let mut bytes_mut = BytesMut::from(packet_data);

    let Some(packet) = codec.decode(&mut bytes_mut)? else {
        return Ok(None);
    };

    debug!(
        target: "dns_server::packet_details",
        packet_id = packet.header.id,
        query_response = if packet.header.qr { "Response" } else { "Query" },
        opcode = packet.header.opcode,
        recursion_desired = packet.header.rd,
        question_count = packet.header.qdcount,
        answer_count = packet.header.ancount,
        authority_count = packet.header.nscount,
        additional_count = packet.header.arcount,
        "DNS packet header parsed successfully"
    );

    let response_packet = handle_query(&packet, resolver)?;

    let mut response_buf = BytesMut::new();
    codec.encode(response_packet, &mut response_buf)?;
    Ok(Some(response_buf))
}

// Process DNS query in an asynchronous manner. `packet_data` is owned by
// this task, the receive loop is free to reuse its buffer.
pub async fn process_dns_query(
    packet_data: Vec<u8>,
    addr: SocketAddr,
    resolver: Arc<dyn Resolver>,
    sock: Arc<UdpSocket>,
    mode: DecodeMode,
) {
    debug!("Received {} bytes from {}", packet_data.len(), addr);

    let response_buf = match answer_datagram(&packet_data, resolver.as_ref(), mode) {
        Ok(Some(buf)) => buf,
        Ok(None) => {
            info!("Empty datagram received from {}, ignoring", addr);
            return;
        }
        Err(e) => {
            error!("Dropping datagram from {}: {}", addr, e);
            return;
        }
    };

    if response_buf.len() > UDP_MAX_MESSAGE_SIZE {
        warn!(
            "Response to {} is {} bytes, above the {} byte UDP limit",
            addr,
            response_buf.len(),
            UDP_MAX_MESSAGE_SIZE
        );
    }

    match sock.send_to(&response_buf, addr).await {
        Ok(response_len) => info!("Sent DNS response ({} bytes) to {}", response_len, addr),
        Err(e) => error!("Failed to send DNS response to {}: {}", addr, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_dns_packet_header;
    use crate::protocol::{DnsQuestion, RecordClass, RecordType};
    use crate::resolver::NameTable;
    use std::net::Ipv4Addr;

    fn example_table() -> NameTable {
        let mut table = NameTable::new(31337);
        table.insert("example.com", Ipv4Addr::new(3, 1, 3, 7));
        table
    }

    fn query_bytes(id: u16, name: &str) -> Vec<u8> {
        let mut bytes = vec![0u8; 12];
        bytes[0..2].copy_from_slice(&id.to_be_bytes());
        bytes[2] = 0x01; // RD
        bytes[5] = 1; // one question
        for label in name.split('.') {
            bytes.push(label.len() as u8);
            bytes.extend_from_slice(label.as_bytes());
        }
        bytes.extend_from_slice(&[0, 0, 1, 0, 1]);
        bytes
    }

    #[test]
    fn test_known_name_answer_section() {
        let table = example_table();
        let request = query_bytes(0x4242, "example.com");

        let response = answer_datagram(&request, &table, DecodeMode::Lenient)
            .unwrap()
            .unwrap();

        let (_, header) = parse_dns_packet_header(&response).unwrap();
        assert_eq!(header.id, 0x4242);
        assert!(header.qr);
        assert_eq!(header.qdcount, 1);
        assert_eq!(header.ancount, 1);
        assert_eq!(header.nscount, 0);
        assert_eq!(header.arcount, 0);

        // The question is replayed verbatim after the header
        assert_eq!(&response[12..request.len()], &request[12..]);

        let mut answer: Vec<u8> = vec![
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
        ];
        answer.extend_from_slice(&[0, 1, 0, 1]);
        answer.extend_from_slice(&31337u32.to_be_bytes());
        answer.extend_from_slice(&[0, 4, 3, 1, 3, 7]);
        assert_eq!(&response[request.len()..], &answer[..]);
    }

    #[test]
    fn test_unknown_name_still_succeeds() {
        let table = example_table();
        let request = query_bytes(7, "nowhere.example");

        let response = answer_datagram(&request, &table, DecodeMode::Lenient)
            .unwrap()
            .unwrap();

        // ID 7, only the QR bit set, one question, no records
        assert_eq!(&response[..12], &[0, 7, 0x80, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(response.len(), request.len());
    }

    #[test]
    fn test_multiple_questions_are_aggregated() {
        let mut table = example_table();
        table.insert("example.org", Ipv4Addr::new(4, 4, 4, 4));

        let questions = vec![
            DnsQuestion::new("example.com", RecordType::A, RecordClass::IN),
            DnsQuestion::new("example.org", RecordType::A, RecordClass::IN),
        ];
        let packet = DnsPacket {
            questions,
            ..Default::default()
        };

        let response = handle_query(&packet, &table).unwrap();
        assert_eq!(response.header.qdcount, 2);
        assert_eq!(response.answers.len(), 2);
        assert_eq!(response.answers[0].rdata, vec![3, 1, 3, 7]);
        assert_eq!(response.answers[1].rdata, vec![4, 4, 4, 4]);
    }

    #[test]
    fn test_short_datagram_is_an_error() {
        let table = example_table();
        assert!(answer_datagram(&[0, 1, 2], &table, DecodeMode::Lenient).is_err());
        assert!(answer_datagram(&[], &table, DecodeMode::Lenient)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lenient_mode_answers_partial_query() {
        let table = example_table();
        let mut request = query_bytes(9, "example.com");
        request[5] = 2; // claims a second question that is not there

        let response = answer_datagram(&request, &table, DecodeMode::Lenient)
            .unwrap()
            .unwrap();
        let (_, header) = parse_dns_packet_header(&response).unwrap();
        assert_eq!(header.qdcount, 1);
        assert_eq!(header.ancount, 1);

        assert!(answer_datagram(&request, &table, DecodeMode::Strict).is_err());
    }

    fn raw_question_query(id: u16, question: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; 12];
        bytes[0..2].copy_from_slice(&id.to_be_bytes());
        bytes[5] = 1;
        bytes.extend_from_slice(question);
        bytes
    }

    #[test]
    fn test_utf8_label_is_echoed_byte_identical() {
        let mut table = example_table();
        table.insert("café.example", Ipv4Addr::new(5, 5, 5, 5));
        let request = raw_question_query(
            11,
            &[
                5, b'c', b'a', b'f', 0xC3, 0xA9, // "café"
                7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0, // "example"
                0, 1, 0, 1,
            ],
        );

        let response = answer_datagram(&request, &table, DecodeMode::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(&response[12..request.len()], &request[12..]);
        assert_eq!(&response[response.len() - 4..], &[5, 5, 5, 5]);
    }

    #[test]
    fn test_non_utf8_label_is_not_rewritten() {
        let table = example_table();
        let request = raw_question_query(12, &[3, b'a', 0xE9, b'b', 0, 0, 1, 0, 1]);

        assert!(matches!(
            answer_datagram(&request, &table, DecodeMode::Strict),
            Err(DnsCodecError::InvalidLabel { offset: 12, .. })
        ));

        // Lenient mode answers with the header alone rather than a mangled name
        let response = answer_datagram(&request, &table, DecodeMode::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(&response[..], &[0, 12, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_full_length_non_utf8_label_is_refused_at_decode() {
        let table = example_table();
        let mut question = vec![63];
        question.extend_from_slice(&[0xFF; 63]);
        question.extend_from_slice(&[0, 0, 1, 0, 1]);
        let request = raw_question_query(13, &question);

        assert!(matches!(
            answer_datagram(&request, &table, DecodeMode::Strict),
            Err(DnsCodecError::InvalidLabel { offset: 12, .. })
        ));
    }

    #[test]
    fn test_label_containing_dot_is_not_split() {
        let table = example_table();
        let request = raw_question_query(14, &[3, b'a', b'.', b'b', 0, 0, 1, 0, 1]);

        assert!(matches!(
            answer_datagram(&request, &table, DecodeMode::Strict),
            Err(DnsCodecError::InvalidLabel { offset: 12, .. })
        ));

        let response = answer_datagram(&request, &table, DecodeMode::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(response.len(), 12);
        assert_eq!(&response[4..6], &[0, 0]);
    }
}
