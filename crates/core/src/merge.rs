//! Per-path merge policy
//!
//! Collapses the raw kinds seen for one path within a quiet window into the
//! single kind a consumer is told about.
//!
//! Rules, in order:
//! 1. With `prefer_added`, Added + Modified (either order) stays Added
//! 2. Otherwise the higher rank wins (Removed > rename > Modified > Added)
//! 3. On equal rank the incoming kind wins

use crate::ChangeKind;

/// Merge a newly observed kind into the kind already pending for a path
pub fn merge(previous: ChangeKind, incoming: ChangeKind, prefer_added: bool) -> ChangeKind {
    use ChangeKind::{Added, Modified};

    if prefer_added {
        if let (Added, Modified) | (Modified, Added) = (previous, incoming) {
            return Added;
        }
    }

    if previous.rank() > incoming.rank() {
        previous
    } else {
        incoming
    }
}

/// Fold a sequence of kinds left to right, in arrival order
///
/// Returns `None` for an empty sequence.
pub fn fold<I>(kinds: I, prefer_added: bool) -> Option<ChangeKind>
where
    I: IntoIterator<Item = ChangeKind>,
{
    kinds
        .into_iter()
        .reduce(|acc, kind| merge(acc, kind, prefer_added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use ChangeKind::*;

    #[test]
    fn test_prefer_added_keeps_creation() {
        assert_eq!(merge(Added, Modified, true), Added);
        assert_eq!(merge(Modified, Added, true), Added);
    }

    #[test]
    fn test_without_preference_modified_outranks_added() {
        assert_eq!(merge(Added, Modified, false), Modified);
        assert_eq!(merge(Modified, Added, false), Modified);
    }

    #[test]
    fn test_removal_dominates() {
        for kind in ChangeKind::ALL {
            for prefer_added in [true, false] {
                assert_eq!(merge(kind, Removed, prefer_added), Removed);
                assert_eq!(merge(Removed, kind, prefer_added), Removed);
            }
        }
    }

    #[test]
    fn test_renames_outrank_modify_and_add() {
        for rename in [RenamedFrom, RenamedTo] {
            for lower in [Added, Modified] {
                assert_eq!(merge(rename, lower, true), rename);
                assert_eq!(merge(lower, rename, false), rename);
            }
        }
    }

    #[test]
    fn test_equal_rank_incoming_wins() {
        assert_eq!(merge(RenamedFrom, RenamedTo, false), RenamedTo);
        assert_eq!(merge(RenamedTo, RenamedFrom, false), RenamedFrom);
        assert_eq!(merge(Modified, Modified, true), Modified);
    }

    #[test]
    fn test_fold_empty_and_single() {
        assert_eq!(fold(Vec::<ChangeKind>::new(), true), None);
        assert_eq!(fold([Modified], true), Some(Modified));
    }

    #[test]
    fn test_fold_create_then_writes() {
        // Writers that create then write several times still report a creation
        assert_eq!(fold([Added, Modified, Modified], true), Some(Added));
        assert_eq!(fold([Added, Modified, Modified], false), Some(Modified));
        assert_eq!(fold([Added, Modified, Removed], true), Some(Removed));
    }

    #[test]
    fn test_incremental_fold_matches_whole_sequence() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

        for _ in 0..2_000 {
            let len = rng.gen_range(1..=12);
            let kinds: Vec<ChangeKind> = (0..len)
                .map(|_| ChangeKind::ALL[rng.gen_range(0..ChangeKind::ALL.len())])
                .collect();
            let prefer_added = rng.gen_bool(0.5);

            // What enqueue does: merge each arrival into the running value
            let mut running = kinds[0];
            for &kind in &kinds[1..] {
                running = merge(running, kind, prefer_added);
            }

            let whole = fold(kinds.iter().copied(), prefer_added).unwrap();
            assert_eq!(running, whole, "sequence {:?}", kinds);

            if len > 1 {
                let prefix = fold(kinds[..len - 1].iter().copied(), prefer_added).unwrap();
                assert_eq!(whole, merge(prefix, kinds[len - 1], prefer_added));
            }
        }
    }

    #[test]
    fn test_result_is_always_one_of_the_inputs() {
        for a in ChangeKind::ALL {
            for b in ChangeKind::ALL {
                for prefer_added in [true, false] {
                    let merged = merge(a, b, prefer_added);
                    assert!(merged == a || merged == b);
                }
            }
        }
    }
}
