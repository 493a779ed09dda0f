use std::collections::{HashMap, HashSet};

/// One blocked request registered with the lock manager while it waits
/// for a conflicting region to clear.
#[derive(Clone, Debug)]
pub struct Waiter {
    pub holder: String,
    pub blocked_on: Vec<String>,
}

/// `true` if granting `requester`'s request -- which would wait on the
/// holders in `blocked_on_holders` -- closes a cycle in the wait-for
/// graph, per §4.5's deadlock rule.
///
/// The graph is ephemeral: built fresh from the current waiter set plus
/// the hypothetical new edges, never persisted. Edge `(w -> h)` means `w`
/// waits on a region held by `h`. A DFS from `requester` that reaches
/// `requester` again is a back edge, i.e. a cycle.
pub fn would_deadlock(
    requester: &str,
    blocked_on_holders: &[String],
    existing_waiters: &[Waiter],
) -> bool {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for waiter in existing_waiters {
        edges
            .entry(waiter.holder.as_str())
            .or_default()
            .extend(waiter.blocked_on.iter().map(String::as_str));
    }
    edges
        .entry(requester)
        .or_default()
        .extend(blocked_on_holders.iter().map(String::as_str));

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![requester];
    // Skip the zero-length start edge check; begin DFS from requester's
    // direct successors so reaching `requester` again means a cycle.
    while let Some(node) = stack.pop() {
        if let Some(next) = edges.get(node) {
            for &n in next {
                if n == requester {
                    return true;
                }
                if visited.insert(n) {
                    stack.push(n);
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_waiters_never_deadlocks() {
        assert!(!would_deadlock("c1", &["c2".to_string()], &[]));
    }

    #[test]
    fn direct_cycle_is_detected() {
        // c2 is already waiting on c1; c1 now wants to wait on c2.
        let waiters = vec![Waiter {
            holder: "c2".to_string(),
            blocked_on: vec!["c1".to_string()],
        }];
        assert!(would_deadlock("c1", &["c2".to_string()], &waiters));
    }

    #[test]
    fn transitive_cycle_is_detected() {
        // c2 waits on c3, c3 waits on c1; c1 now wants to wait on c2.
        let waiters = vec![
            Waiter {
                holder: "c2".to_string(),
                blocked_on: vec!["c3".to_string()],
            },
            Waiter {
                holder: "c3".to_string(),
                blocked_on: vec!["c1".to_string()],
            },
        ];
        assert!(would_deadlock("c1", &["c2".to_string()], &waiters));
    }

    #[test]
    fn independent_waiters_do_not_deadlock() {
        let waiters = vec![Waiter {
            holder: "c2".to_string(),
            blocked_on: vec!["c3".to_string()],
        }];
        assert!(!would_deadlock("c1", &["c4".to_string()], &waiters));
    }
}
