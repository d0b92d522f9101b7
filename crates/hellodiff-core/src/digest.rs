//! Grouping of JA3 digests computed by the decoder.
//!
//! Nothing here hashes anything; records are only organized and compared.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use serde::Serialize;

/// JA3 string and digest of one ClientHello, as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DigestRecord {
    /// Destination address of the connection
    pub ip: IpAddr,
    /// Comma/dash separated JA3 string
    pub raw: String,
    /// 32-character MD5 hex digest of `raw`
    pub digest: String,
}

/// Group records by destination address.
///
/// Keys iterate in ascending address order; records of one address keep
/// their original relative order.
pub fn group_digests_by_ip<I>(records: I) -> BTreeMap<IpAddr, Vec<DigestRecord>>
where
    I: IntoIterator<Item = DigestRecord>,
{
    let mut grouped: BTreeMap<IpAddr, Vec<DigestRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.ip).or_default().push(record);
    }
    grouped
}

/// Distinct digests among `records`.
pub fn distinct_digests(records: &[DigestRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.digest.clone()).collect()
}

/// Digest agreement between several labelled captures of the same client.
#[derive(Debug, Clone, Serialize)]
pub struct DigestConsistency {
    /// Distinct digests per label, in caller order
    pub by_label: Vec<(String, BTreeSet<String>)>,
    /// Labels whose own connections produced more than one digest
    pub inconsistent_within: Vec<String>,
    /// Every label produced the same digest set
    pub consistent_across: bool,
}

impl DigestConsistency {
    pub fn check(captures: &[(String, Vec<DigestRecord>)]) -> Self {
        let by_label: Vec<(String, BTreeSet<String>)> = captures
            .iter()
            .map(|(label, records)| (label.clone(), distinct_digests(records)))
            .collect();

        let inconsistent_within = by_label
            .iter()
            .filter(|(_, digests)| digests.len() > 1)
            .map(|(label, _)| label.clone())
            .collect();

        let consistent_across = by_label
            .windows(2)
            .all(|pair| pair[0].1 == pair[1].1);

        Self {
            by_label,
            inconsistent_within,
            consistent_across,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.consistent_across && self.inconsistent_within.is_empty()
    }
}
