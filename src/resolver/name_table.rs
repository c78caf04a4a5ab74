use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::errors::LookupTableError;
use crate::protocol::{DnsQuestion, DnsResourceRecord, RecordClass, RecordType, Resolution};
use crate::resolver::{loaders, Resolver};

/// TTL handed out with every answer unless configured otherwise
pub const DEFAULT_TTL: u32 = 300;

/// Immutable name to IPv4 address map built once at startup.
#[derive(Debug, Clone)]
pub struct NameTable {
    ttl: u32,
    entries: HashMap<String, Vec<Ipv4Addr>>,
}

// Lookups ignore ASCII case and a trailing root dot
fn normalize(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

impl NameTable {
    pub fn new(ttl: u32) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Adds an address for `name`; repeated addresses are stored once.
    pub fn insert(&mut self, name: &str, addr: Ipv4Addr) {
        let addrs = self.entries.entry(normalize(name)).or_default();
        if !addrs.contains(&addr) {
            addrs.push(addr);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&[Ipv4Addr]> {
        self.entries.get(&normalize(name)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Loads a JSON array of `{"name", "address"}` objects.
    pub fn from_json_file(path: &Path, ttl: u32) -> Result<Self, LookupTableError> {
        let content = loaders::read_source(path)?;
        let entries = loaders::parse_json(&content, path)?;
        Self::from_entries(entries, path, ttl)
    }

    /// Loads a hosts-format file.
    pub fn from_hosts_file(path: &Path, ttl: u32) -> Result<Self, LookupTableError> {
        let content = loaders::read_source(path)?;
        let entries = loaders::parse_hosts(&content, path)?;
        Self::from_entries(entries, path, ttl)
    }

    fn from_entries(
        entries: Vec<(String, IpAddr)>,
        path: &Path,
        ttl: u32,
    ) -> Result<Self, LookupTableError> {
        let mut table = Self::new(ttl);

        for (name, address) in entries {
            match address {
                IpAddr::V4(v4) => table.insert(&name, v4),
                IpAddr::V6(v6) => {
                    warn!("Skipping {} -> {}: only IPv4 host addresses are served", name, v6)
                }
            }
        }

        if table.is_empty() {
            return Err(LookupTableError::Empty {
                path: path.to_path_buf(),
            });
        }

        info!(
            source = %path.display(),
            names = table.len(),
            ttl,
            "Name table loaded"
        );

        Ok(table)
    }
}

impl Resolver for NameTable {
    fn resolve(&self, question: &DnsQuestion) -> Resolution {
        let mut resolution = Resolution::default();

        if question.qtype != RecordType::A || question.qclass != RecordClass::IN {
            debug!("Not answering {}: unsupported type or class", question);
            return resolution;
        }

        if let Some(addrs) = self.lookup(&question.name) {
            resolution.answers = addrs
                .iter()
                .map(|addr| DnsResourceRecord::a(&question.name, *addr, self.ttl))
                .collect();
        }

        resolution
    }
}
