use nfs4d_types::{LockKind, Timestamp};

/// A granted byte-range lock held by one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRegion {
    pub offset: u64,
    pub length: u64,
    pub kind: LockKind,
    pub holder: String,
    pub granted_at: Timestamp,
}

impl LockRegion {
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Whether `[offset, offset+length)` overlaps this region's range.
    /// Half-open ranges: touching endpoints do not overlap.
    pub fn overlaps_range(&self, offset: u64, length: u64) -> bool {
        let other_end = offset.saturating_add(length);
        self.offset < other_end && offset < self.end()
    }

    /// Whether `self` and `other`, both the same holder and kind, should
    /// be coalesced: their ranges overlap or touch at an endpoint
    /// (inclusive comparison, per §4.5).
    pub fn touches_or_overlaps(&self, other: &LockRegion) -> bool {
        self.end() >= other.offset && other.end() >= self.offset
    }
}

/// Coalesce `regions` to a fixed point: repeatedly merge same-holder,
/// same-kind regions that touch or overlap until no more merges apply.
pub fn coalesce(regions: &mut Vec<LockRegion>) {
    loop {
        let mut merged = false;
        'outer: for i in 0..regions.len() {
            for j in (i + 1)..regions.len() {
                let (a, b) = (&regions[i], &regions[j]);
                if a.holder == b.holder && a.kind == b.kind && a.touches_or_overlaps(b) {
                    let new_offset = a.offset.min(b.offset);
                    let new_end = a.end().max(b.end());
                    let granted_at = a.granted_at.max(b.granted_at);
                    let holder = a.holder.clone();
                    let kind = a.kind;
                    regions.remove(j);
                    regions.remove(i);
                    regions.push(LockRegion {
                        offset: new_offset,
                        length: new_end - new_offset,
                        kind,
                        holder,
                        granted_at,
                    });
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            break;
        }
    }
}

/// Split `region` around an unlocked sub-range `[u, u+n)`, returning the
/// residual region(s) that remain locked. Per §4.5: up to two residuals,
/// `[r, u)` if `u > r` and `[u+n, r+m)` if `u+n < r+m`.
pub fn split(region: &LockRegion, u: u64, n: u64) -> Vec<LockRegion> {
    let r = region.offset;
    let end = region.end();
    let unlock_end = u.saturating_add(n);
    let mut residuals = Vec::new();
    if u > r {
        residuals.push(LockRegion {
            offset: r,
            length: u - r,
            kind: region.kind,
            holder: region.holder.clone(),
            granted_at: region.granted_at,
        });
    }
    if unlock_end < end {
        residuals.push(LockRegion {
            offset: unlock_end,
            length: end - unlock_end,
            kind: region.kind,
            holder: region.holder.clone(),
            granted_at: region.granted_at,
        });
    }
    residuals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: u64, length: u64, kind: LockKind, holder: &str) -> LockRegion {
        LockRegion {
            offset,
            length,
            kind,
            holder: holder.to_string(),
            granted_at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn coalesce_merges_touching_same_holder_regions() {
        let mut regions = vec![
            region(0, 10, LockKind::Read, "c1"),
            region(10, 10, LockKind::Read, "c1"),
        ];
        coalesce(&mut regions);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].offset, 0);
        assert_eq!(regions[0].length, 20);
    }

    #[test]
    fn coalesce_leaves_different_holders_apart() {
        let mut regions = vec![
            region(0, 10, LockKind::Read, "c1"),
            region(10, 10, LockKind::Read, "c2"),
        ];
        coalesce(&mut regions);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn split_full_unlock_removes_region() {
        let r = region(0, 100, LockKind::Write, "c1");
        let residuals = split(&r, 0, 100);
        assert!(residuals.is_empty());
    }

    #[test]
    fn split_subrange_leaves_two_residuals() {
        let r = region(0, 100, LockKind::Write, "c1");
        let residuals = split(&r, 40, 10);
        assert_eq!(residuals.len(), 2);
        assert_eq!(residuals[0].offset, 0);
        assert_eq!(residuals[0].length, 40);
        assert_eq!(residuals[1].offset, 50);
        assert_eq!(residuals[1].length, 50);
    }

    #[test]
    fn split_on_one_edge_leaves_one_residual() {
        let r = region(0, 100, LockKind::Write, "c1");
        let residuals = split(&r, 0, 50);
        assert_eq!(residuals.len(), 1);
        assert_eq!(residuals[0].offset, 50);
        assert_eq!(residuals[0].length, 50);
    }
}
