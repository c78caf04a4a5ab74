use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::codec::DecodeMode;
use crate::resolver::name_table::DEFAULT_TTL;

/// Name table used when neither `--names` nor `--hosts` is given
pub const DEFAULT_NAMES_FILE: &str = "names.json";

#[derive(Parser, Debug)]
#[command(name = "simple-dns-server")]
#[command(about = "A minimal authoritative DNS server written in Rust", long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// UDP port to listen on
    #[arg(short, long, default_value_t = 1053)]
    pub port: u16,

    /// JSON name table: an array of {"name": ..., "address": ...} objects
    #[arg(short, long, conflicts_with = "hosts")]
    pub names: Option<PathBuf>,

    /// Hosts-format name table: "<address> <name> [alias...]" per line
    #[arg(long)]
    pub hosts: Option<PathBuf>,

    /// TTL in seconds attached to every answer
    #[arg(short, long, default_value_t = DEFAULT_TTL)]
    pub ttl: u32,

    /// Drop queries with a malformed question section instead of answering
    /// the questions that could be read
    #[arg(long)]
    pub strict: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where the name table is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Json(PathBuf),
    Hosts(PathBuf),
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn table_source(&self) -> TableSource {
        match (&self.names, &self.hosts) {
            (_, Some(hosts)) => TableSource::Hosts(hosts.clone()),
            (Some(names), None) => TableSource::Json(names.clone()),
            (None, None) => TableSource::Json(PathBuf::from(DEFAULT_NAMES_FILE)),
        }
    }

    pub fn decode_mode(&self) -> DecodeMode {
        if self.strict {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        }
    }
}
