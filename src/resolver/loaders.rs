//! Readers for the name table sources.
//!
//! Two formats are understood: a JSON array of `{"name": ..., "address": ...}`
//! objects, and the classic hosts layout of one address followed by one or more
//! names per line. Both yield `(name, address)` pairs in file order; anything
//! unreadable is an error so the server never starts on a partial table.

use std::{net::IpAddr, path::Path};

use serde::Deserialize;

use crate::errors::LookupTableError;

/// One entry of the JSON name table
#[derive(Debug, Clone, Deserialize)]
pub struct NameRecord {
    pub name: String,
    pub address: String,
}

pub fn read_source(path: &Path) -> Result<String, LookupTableError> {
    std::fs::read_to_string(path).map_err(|source| LookupTableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_json(content: &str, path: &Path) -> Result<Vec<(String, IpAddr)>, LookupTableError> {
    let records: Vec<NameRecord> =
        serde_json::from_str(content).map_err(|source| LookupTableError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    records
        .into_iter()
        .map(|record| {
            let address = record.address.trim().parse::<IpAddr>().map_err(|_| {
                LookupTableError::InvalidAddress {
                    path: path.to_path_buf(),
                    name: record.name.clone(),
                    value: record.address.clone(),
                }
            })?;
            Ok((record.name, address))
        })
        .collect()
}

pub fn parse_hosts(content: &str, path: &Path) -> Result<Vec<(String, IpAddr)>, LookupTableError> {
    let mut entries = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = match raw_line.split_once('#') {
            Some((before, _comment)) => before,
            None => raw_line,
        };

        let mut fields = line.split_whitespace();
        let Some(address) = fields.next() else {
            continue;
        };

        let names: Vec<&str> = fields.collect();
        if names.is_empty() {
            return Err(LookupTableError::MalformedLine {
                path: path.to_path_buf(),
                line: index + 1,
                content: raw_line.to_string(),
            });
        }

        let address =
            address
                .parse::<IpAddr>()
                .map_err(|_| LookupTableError::InvalidAddress {
                    path: path.to_path_buf(),
                    name: names[0].to_string(),
                    value: address.to_string(),
                })?;

        entries.extend(names.into_iter().map(|name| (name.to_string(), address)));
    }

    Ok(entries)
}
