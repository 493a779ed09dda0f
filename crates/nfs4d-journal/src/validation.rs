use std::collections::{HashMap, HashSet, VecDeque};

use crate::entry::JournalEntry;
use crate::error::{JournalError, JournalResult};

/// Order `entries` for replay per §4.4's rules:
///
/// 1. For the same `target_path`, entries replay in timestamp order
///    unless a later entry names an earlier one as an explicit
///    dependency (in which case the dependency wins).
/// 2. Disjoint paths with no dependency may replay in any topological
///    order.
/// 3. A cycle among explicit dependencies is a fatal consistency error.
pub fn order_for_replay(entries: Vec<JournalEntry>) -> JournalResult<Vec<JournalEntry>> {
    let by_seq: HashMap<u64, JournalEntry> =
        entries.into_iter().map(|e| (e.seq_id, e)).collect();

    // predecessor edges: (must-come-first -> must-come-after)
    let mut edges: HashMap<u64, HashSet<u64>> = HashMap::new();
    let mut indegree: HashMap<u64, usize> = by_seq.keys().map(|&s| (s, 0)).collect();

    let mut add_edge = |from: u64, to: u64| {
        if from == to || !by_seq.contains_key(&from) || !by_seq.contains_key(&to) {
            return;
        }
        if edges.entry(from).or_default().insert(to) {
            *indegree.entry(to).or_insert(0) += 1;
        }
    };

    // Explicit dependency edges.
    for entry in by_seq.values() {
        for &dep in &entry.deps {
            add_edge(dep, entry.seq_id);
        }
    }

    // Implicit per-path temporal edges: chain consecutive entries on the
    // same path by timestamp.
    let mut by_path: HashMap<&str, Vec<&JournalEntry>> = HashMap::new();
    for entry in by_seq.values() {
        by_path.entry(entry.target_path.as_str()).or_default().push(entry);
    }
    for (_, mut group) in by_path {
        group.sort_by_key(|e| (e.timestamp, e.seq_id));
        for window in group.windows(2) {
            add_edge(window[0].seq_id, window[1].seq_id);
        }
    }

    // Kahn's algorithm, breaking ties by (timestamp, seq_id) for
    // deterministic output among disjoint-path entries.
    let mut ready: Vec<u64> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&s, _)| s)
        .collect();
    ready.sort_by_key(|s| (by_seq[s].timestamp, *s));
    let mut queue: VecDeque<u64> = ready.into_iter().collect();

    let mut ordered = Vec::with_capacity(by_seq.len());
    let mut remaining = indegree.clone();
    while let Some(seq) = queue.pop_front() {
        ordered.push(seq);
        if let Some(children) = edges.get(&seq) {
            let mut newly_ready = Vec::new();
            for &child in children {
                let d = remaining.get_mut(&child).unwrap();
                *d -= 1;
                if *d == 0 {
                    newly_ready.push(child);
                }
            }
            newly_ready.sort_by_key(|s| (by_seq[s].timestamp, *s));
            for r in newly_ready {
                queue.push_back(r);
            }
        }
    }

    if ordered.len() != by_seq.len() {
        let stuck: Vec<u64> = by_seq
            .keys()
            .copied()
            .filter(|s| !ordered.contains(s))
            .collect();
        return Err(JournalError::DependencyCycle(stuck));
    }

    let mut by_seq = by_seq;
    Ok(ordered
        .into_iter()
        .map(|s| by_seq.remove(&s).expect("seq present"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfs4d_types::{MutatingProcedure, Timestamp};

    fn entry(seq: u64, path: &str, millis: u64, deps: Vec<u64>) -> JournalEntry {
        JournalEntry {
            seq_id: seq,
            txn_id: seq,
            procedure: MutatingProcedure::Write,
            args: Vec::new(),
            deps,
            target_path: path.to_string(),
            timestamp: Timestamp::from_millis(millis),
            completed: false,
            result: None,
            client_id: None,
        }
    }

    #[test]
    fn same_path_orders_by_timestamp() {
        let entries = vec![entry(2, "/f", 20, vec![]), entry(1, "/f", 10, vec![])];
        let ordered = order_for_replay(entries).unwrap();
        assert_eq!(ordered.iter().map(|e| e.seq_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn explicit_dependency_overrides_timestamp() {
        // seq 1 is timestamped later but seq 2 depends on it.
        let entries = vec![entry(1, "/f", 50, vec![]), entry(2, "/g", 10, vec![1])];
        let ordered = order_for_replay(entries).unwrap();
        let pos1 = ordered.iter().position(|e| e.seq_id == 1).unwrap();
        let pos2 = ordered.iter().position(|e| e.seq_id == 2).unwrap();
        assert!(pos1 < pos2);
    }

    #[test]
    fn cycle_is_fatal() {
        let entries = vec![entry(1, "/a", 1, vec![2]), entry(2, "/b", 2, vec![1])];
        assert!(matches!(
            order_for_replay(entries),
            Err(JournalError::DependencyCycle(_))
        ));
    }

    #[test]
    fn disjoint_paths_interleave_freely() {
        let entries = vec![entry(1, "/a", 1, vec![]), entry(2, "/b", 2, vec![])];
        let ordered = order_for_replay(entries).unwrap();
        assert_eq!(ordered.len(), 2);
    }
}
