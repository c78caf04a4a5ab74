// DNS message structures shared by the parsers, the codec and the resolver

use std::net::Ipv4Addr;

use crate::errors::DnsCodecError;

/// Largest message a plain UDP exchange carries (RFC 1035, section 4.2.1)
pub const UDP_MAX_MESSAGE_SIZE: usize = 512;

/// Size of the fixed message header
pub const HEADER_LEN: usize = 12;

/// Longest label a length byte can describe
pub const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DnsPacketHeader {
    pub id: u16,      // Identifier, 16 bits
    pub qr: bool,     // Query or Response, 1 bit
    pub opcode: u8,   // Operation code, 4 bits
    pub aa: bool,     // Authoritative answer, 1 bit
    pub tc: bool,     // Truncated, 1 bit
    pub rd: bool,     // Recursion desired, 1 bit
    pub ra: bool,     // Recursion available, 1 bit
    pub z: u8,        // Reserved for future use, 3 bits
    pub rcode: u8,    // Response code, 4 bits
    pub qdcount: u16, // Number of questions, 16 bits
    pub ancount: u16, // Number of answers, 16 bits
    pub nscount: u16, // Number of authority records, 16 bits
    pub arcount: u16, // Number of additional records, 16 bits
}

/// Record type codes. Only host addresses are interpreted, anything else is
/// carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A host address, https://www.rfc-editor.org/rfc/rfc1035#section-3.2.2
    A,
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            other => RecordType::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::Unknown(other) => other,
        }
    }
}

/// Record class codes, https://www.rfc-editor.org/rfc/rfc1035#section-3.2.4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass {
    /// The Internet
    IN,
    Unknown(u16),
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            other => RecordClass::Unknown(other),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::IN => 1,
            RecordClass::Unknown(other) => other,
        }
    }
}

// Define the DNS question section structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String, // Domain name, represented as a sequence of "labels"
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl DnsQuestion {
    pub fn new(name: impl Into<String>, qtype: RecordType, qclass: RecordClass) -> Self {
        Self {
            name: name.into(),
            qtype,
            qclass,
        }
    }
}

impl std::fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.name,
            u16::from(self.qtype),
            u16::from(self.qclass)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsPacket {
    pub header: DnsPacketHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsResourceRecord>,
    pub authorities: Vec<DnsResourceRecord>,
    pub additionals: Vec<DnsResourceRecord>,
}

impl DnsPacket {
    /// Set the four header counts from the sections actually held.
    pub fn update_counts(&mut self) -> Result<(), DnsCodecError> {
        self.header.qdcount = section_count(self.questions.len())?;
        self.header.ancount = section_count(self.answers.len())?;
        self.header.nscount = section_count(self.authorities.len())?;
        self.header.arcount = section_count(self.additionals.len())?;
        Ok(())
    }
}

fn section_count(len: usize) -> Result<u16, DnsCodecError> {
    u16::try_from(len).map_err(|_| DnsCodecError::TooManyRecords(len))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResourceRecord {
    pub name: String, // The domain name encoded as a sequence of labels
    pub rtype: RecordType,
    pub rclass: RecordClass,
    pub ttl: u32,       // Time to live in seconds
    pub rdlength: u16,  // Length of the resource data in bytes
    pub rdata: Vec<u8>, // Resource data (variable length)
}

impl DnsResourceRecord {
    /// Builds a record, deriving `rdlength` from the data. Data longer than a
    /// 16-bit length saturates here and is rejected by the encoder.
    pub fn new(
        name: String,
        rtype: RecordType,
        rclass: RecordClass,
        ttl: u32,
        rdata: Vec<u8>,
    ) -> Self {
        let rdlength = u16::try_from(rdata.len()).unwrap_or(u16::MAX);
        DnsResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            rdlength,
            rdata,
        }
    }

    /// Host address record in the Internet class
    pub fn a(name: &str, addr: Ipv4Addr, ttl: u32) -> Self {
        Self::new(
            name.to_string(),
            RecordType::A,
            RecordClass::IN,
            ttl,
            addr.octets().to_vec(),
        )
    }
}

/// Records a resolver produced for one question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub answers: Vec<DnsResourceRecord>,
    pub authorities: Vec<DnsResourceRecord>,
    pub additionals: Vec<DnsResourceRecord>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.authorities.is_empty() && self.additionals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_passthrough() {
        assert_eq!(RecordType::from(1), RecordType::A);
        assert_eq!(RecordType::from(28), RecordType::Unknown(28));
        assert_eq!(u16::from(RecordType::Unknown(28)), 28);
        assert_eq!(u16::from(RecordType::A), 1);
    }

    #[test]
    fn test_record_class_passthrough() {
        assert_eq!(RecordClass::from(1), RecordClass::IN);
        assert_eq!(RecordClass::from(255), RecordClass::Unknown(255));
        assert_eq!(u16::from(RecordClass::Unknown(3)), 3);
    }

    #[test]
    fn test_a_record_constructor() {
        let record = DnsResourceRecord::a("example.com", Ipv4Addr::new(3, 1, 3, 7), 31337);
        assert_eq!(record.rdlength, 4);
        assert_eq!(record.rdata, vec![3, 1, 3, 7]);
        assert_eq!(record.rtype, RecordType::A);
        assert_eq!(record.rclass, RecordClass::IN);
    }

    #[test]
    fn test_update_counts_follows_sections() {
        let mut packet = DnsPacket {
            header: DnsPacketHeader {
                qdcount: 9,
                arcount: 4,
                ..Default::default()
            },
            questions: vec![DnsQuestion::new("example.com", RecordType::A, RecordClass::IN)],
            answers: vec![
                DnsResourceRecord::a("example.com", Ipv4Addr::new(1, 2, 3, 4), 60),
                DnsResourceRecord::a("example.com", Ipv4Addr::new(5, 6, 7, 8), 60),
            ],
            ..Default::default()
        };

        packet.update_counts().unwrap();
        assert_eq!(packet.header.qdcount, 1);
        assert_eq!(packet.header.ancount, 2);
        assert_eq!(packet.header.nscount, 0);
        assert_eq!(packet.header.arcount, 0);
    }

    #[test]
    fn test_update_counts_rejects_overflowing_section() {
        let question = DnsQuestion::new("a", RecordType::A, RecordClass::IN);
        let mut packet = DnsPacket {
            questions: vec![question; usize::from(u16::MAX) + 1],
            ..Default::default()
        };

        assert!(matches!(
            packet.update_counts(),
            Err(DnsCodecError::TooManyRecords(65536))
        ));
        assert_eq!(packet.header.qdcount, 0);
    }

    #[test]
    fn test_question_display() {
        let question = DnsQuestion::new("example.com", RecordType::A, RecordClass::IN);
        assert_eq!(question.to_string(), "example.com 1 1");
    }
}
