//! DNS packet codec for tokio_util
//!
//! This module provides Decoder and Encoder implementations for DNS packets.
//! Decoding reads the header and the question section of a query; encoding
//! writes a full response with its answer, authority and additional sections.
//! Names are always written uncompressed.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::errors::DnsCodecError;
use crate::parsers::{parse_dns_packet_header, parse_dns_question, to_codec_error};
use crate::protocol::{
    DnsPacket, DnsPacketHeader, DnsQuestion, DnsResourceRecord, HEADER_LEN, MAX_LABEL_LEN,
};

/// How the decoder treats a malformed question section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Keep the questions parsed before the failure and carry on.
    #[default]
    Lenient,
    /// Fail the whole datagram.
    Strict,
}

/// DNS packet codec for use with tokio_util framed streams
#[derive(Debug, Default)]
pub struct DnsCodec {
    mode: DecodeMode,
}

impl DnsCodec {
    pub fn with_mode(mode: DecodeMode) -> Self {
        Self { mode }
    }
}

impl Decoder for DnsCodec {
    type Item = DnsPacket;
    type Error = DnsCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // DNS packets need at least 12 bytes for the header
        if src.len() < HEADER_LEN {
            debug!("Insufficient bytes for DNS header: {} < {}", src.len(), HEADER_LEN);
            return Err(DnsCodecError::IncompletePacket {
                needed: HEADER_LEN,
                available: src.len(),
            });
        }

        let input_bytes = src.as_ref();

        let (mut remaining, header) =
            parse_dns_packet_header(input_bytes).map_err(|e| to_codec_error(input_bytes, e))?;

        let mut questions = Vec::new();
        for index in 0..header.qdcount {
            match parse_dns_question(remaining) {
                Ok((i, question)) => {
                    questions.push(question);
                    remaining = i;
                }
                Err(e) => {
                    let err = to_codec_error(input_bytes, e);
                    if self.mode == DecodeMode::Strict {
                        return Err(err);
                    }
                    warn!(
                        packet_id = header.id,
                        question = index,
                        parsed = questions.len(),
                        "Malformed question section, keeping partial data: {}",
                        err
                    );
                    break;
                }
            }
        }

        // Requests carry no answer, authority or additional records worth
        // reading, so whatever follows the questions is dropped with them.
        src.clear();

        Ok(Some(DnsPacket {
            header,
            questions,
            ..Default::default()
        }))
    }
}

impl Encoder<DnsPacket> for DnsCodec {
    type Error = DnsCodecError;

    fn encode(&mut self, mut item: DnsPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug!("DnsCodec::encode called for packet ID {}", item.header.id);

        // The counts always follow the sections actually written
        item.update_counts()?;

        self.encode_header(&item.header, dst);

        for question in &item.questions {
            self.encode_question(question, dst)?;
        }

        for record in item
            .answers
            .iter()
            .chain(&item.authorities)
            .chain(&item.additionals)
        {
            self.encode_record(record, dst)?;
        }

        Ok(())
    }
}

impl DnsCodec {
    /// Encode a DNS domain name using label format
    /// Domain names are encoded as a sequence of labels, each prefixed by its length,
    /// terminated by a null byte (0)
    ///
    /// The root is written for `""` and `"."`, and one trailing dot is accepted
    /// as the absolute form of a name. Any other empty label is refused since it
    /// would read back as the terminator.
    pub fn encode_domain_name(
        &self,
        domain_name: &str,
        dst: &mut BytesMut,
    ) -> Result<(), DnsCodecError> {
        let relative = domain_name.strip_suffix('.').unwrap_or(domain_name);

        if relative.is_empty() {
            dst.put_u8(0);
            return Ok(());
        }

        let labels: Vec<&str> = relative.split('.').collect();

        // Validate first so a rejected name leaves nothing behind in dst
        for label in &labels {
            if label.is_empty() {
                return Err(DnsCodecError::InvalidDomainName(format!(
                    "'{}' contains an empty label",
                    domain_name
                )));
            }

            if label.len() > MAX_LABEL_LEN {
                return Err(DnsCodecError::InvalidDomainName(format!(
                    "Label '{}' exceeds maximum length of {} bytes",
                    label, MAX_LABEL_LEN
                )));
            }
        }

        // sum of (1 byte length + label bytes) + 1 null terminator
        let total_space: usize = labels.iter().map(|label| 1 + label.len()).sum::<usize>() + 1;
        dst.reserve(total_space);

        for label in labels {
            dst.put_u8(label.len() as u8);
            dst.put_slice(label.as_bytes());
        }

        dst.put_u8(0);

        Ok(())
    }

    /// Name, type and class; questions carry no TTL or data
    fn encode_question(
        &self,
        question: &DnsQuestion,
        dst: &mut BytesMut,
    ) -> Result<(), DnsCodecError> {
        self.encode_domain_name(&question.name, dst)?;
        dst.put_u16(question.qtype.into());
        dst.put_u16(question.qclass.into());
        Ok(())
    }

    fn encode_record(
        &self,
        record: &DnsResourceRecord,
        dst: &mut BytesMut,
    ) -> Result<(), DnsCodecError> {
        let rdlength = u16::try_from(record.rdata.len())
            .map_err(|_| DnsCodecError::RecordTooLarge(record.rdata.len()))?;

        self.encode_domain_name(&record.name, dst)?;
        dst.reserve(10 + record.rdata.len());
        dst.put_u16(record.rtype.into());
        dst.put_u16(record.rclass.into());
        dst.put_u32(record.ttl);
        dst.put_u16(rdlength);
        dst.put_slice(&record.rdata);
        Ok(())
    }

    /// Encode DNS packet header into the destination buffer
    fn encode_header(&self, header: &DnsPacketHeader, dst: &mut BytesMut) {
        dst.reserve(HEADER_LEN);

        dst.put_u16(header.id);

        let mut flags: u16 = 0;

        // QR (1 bit) - bit 15
        if header.qr {
            flags |= 0x8000;
        }

        // OPCODE (4 bits) - bits 14-11
        flags |= ((header.opcode as u16) & 0x0F) << 11;

        // AA (1 bit) - bit 10
        if header.aa {
            flags |= 0x0400;
        }

        // TC (1 bit) - bit 9
        if header.tc {
            flags |= 0x0200;
        }

        // RD (1 bit) - bit 8
        if header.rd {
            flags |= 0x0100;
        }

        // RA (1 bit) - bit 7
        if header.ra {
            flags |= 0x0080;
        }

        // Z (3 bits) - bits 6-4
        flags |= ((header.z as u16) & 0x07) << 4;

        // RCODE (4 bits) - bits 3-0
        flags |= (header.rcode as u16) & 0x0F;

        dst.put_u16(flags);
        dst.put_u16(header.qdcount);
        dst.put_u16(header.ancount);
        dst.put_u16(header.nscount);
        dst.put_u16(header.arcount);
    }
}
