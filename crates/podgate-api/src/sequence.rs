//! Pod name sequence
//!
//! Process-wide monotonic counter minting `pod<N>` names, starting at
//! `pod1`. Increment and read happen as one atomic step, so concurrent
//! creates never share a number and never skip one.
//!
//! The counter is not persisted. After a restart it starts from zero again
//! unless it is seeded from the Pods already in the cluster.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::client::PodClient;
use crate::error::{Error, Result};

/// Prefix of generated Pod names
pub const POD_NAME_PREFIX: &str = "pod";

/// Monotonic Pod name generator
#[derive(Debug, Default)]
pub struct PodSequence {
    last: AtomicU64,
}

impl PodSequence {
    /// Sequence whose first name is `pod1`
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence whose first name is `pod<last + 1>`
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Reserve the next index
    ///
    /// The index is consumed even if the caller's create later fails.
    pub fn next_index(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reserve the next Pod name
    pub fn next_name(&self) -> String {
        pod_name(self.next_index())
    }

    /// Most recently reserved index (0 if none)
    pub fn last_index(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

/// Name for sequence index `index`
pub fn pod_name(index: u64) -> String {
    format!("{}{}", POD_NAME_PREFIX, index)
}

/// Parse the index out of a generated name
///
/// Only exact `pod<N>` spellings match (no sign, no leading zeros).
pub fn parse_pod_index(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(POD_NAME_PREFIX)?;
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    digits.parse().ok()
}

/// Highest generated index among `names` (0 if none match)
pub fn highest_index<'a>(names: impl IntoIterator<Item = &'a str>) -> u64 {
    names
        .into_iter()
        .filter_map(parse_pod_index)
        .max()
        .unwrap_or(0)
}

/// Build a sequence that continues after the Pods already in `namespace`
///
/// Closes the restart gap where a fresh counter would reuse names of Pods
/// created by an earlier process.
pub async fn seed_from_cluster(client: &dyn PodClient, namespace: &str) -> Result<PodSequence> {
    let pods = client
        .list_pods(namespace)
        .await
        .map_err(|e| Error::ListFailed(e.to_string()))?;

    let last = highest_index(pods.iter().filter_map(|p| p.metadata.name.as_deref()));

    info!(
        namespace = %namespace,
        existing = pods.len(),
        last_index = last,
        "Seeded pod name sequence from cluster"
    );

    Ok(PodSequence::starting_after(last))
}
