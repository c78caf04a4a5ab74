pub mod loaders;
pub mod name_table;

use crate::protocol::{DnsQuestion, Resolution};

pub use name_table::NameTable;

/// Answers a single question with answer, authority and additional records.
///
/// Implementations are consulted once per question and must not block for
/// long: the dispatch waiting on them holds its reply until they return.
pub trait Resolver: Send + Sync {
    fn resolve(&self, question: &DnsQuestion) -> Resolution;
}
