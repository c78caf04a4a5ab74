use crate::errors::DnsCodecError;
use crate::protocol::{DnsPacket, DnsPacketHeader, DnsQuestion, DnsResourceRecord, Resolution};

/// Builder for creating DNS response packets
///
/// A response echoes the query's transaction ID and questions and has only
/// the QR bit set: no error code is ever signalled, so an unknown name is an
/// empty but otherwise successful answer.
#[derive(Debug, Clone)]
pub struct DnsResponseBuilder {
    response_header: DnsPacketHeader,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsResourceRecord>,
    authorities: Vec<DnsResourceRecord>,
    additionals: Vec<DnsResourceRecord>,
}

impl DnsResponseBuilder {
    /// Start a response to `query_packet`
    pub fn for_query(query_packet: &DnsPacket) -> Self {
        Self {
            response_header: DnsPacketHeader {
                id: query_packet.header.id, // Echo the query ID
                qr: true,                   // Always a response
                ..Default::default()
            },
            questions: query_packet.questions.clone(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }

    /// Append one question's records after those already collected
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.answers.extend(resolution.answers);
        self.authorities.extend(resolution.authorities);
        self.additionals.extend(resolution.additionals);
        self
    }

    /// Build the response packet with header counts taken from the collected
    /// sections. Fails when a section outgrows its 16-bit count.
    pub fn build(self) -> Result<DnsPacket, DnsCodecError> {
        let mut packet = DnsPacket {
            header: self.response_header,
            questions: self.questions,
            answers: self.answers,
            authorities: self.authorities,
            additionals: self.additionals,
        };
        packet.update_counts()?;
        Ok(packet)
    }
}
