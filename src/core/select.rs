//! Conversation subset selection — shuffle once, then backtrack to an
//! exact tag cover under per-group quotas.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::schema::record::{ConvoId, ConversationRecord, GroupId, SelectionTarget};

/// Pick a conflict-free subset of `pool` whose tags cover
/// `target.required_tags` exactly, with at most `target.max_per_group`
/// records per group.
///
/// The pool is shuffled once so repeated runs do not favor sheet order,
/// then searched depth-first in shuffled order: each record is either
/// skipped or taken, and taking is allowed only when none of its tags are
/// already used, none fall outside the target, and its group is under
/// quota. The first subset whose used tags equal the target wins — neither
/// globally optimal nor minimum-size, and a rerun may return a different
/// valid subset.
///
/// Returns `None` once every branch is exhausted: not enough distinct tags
/// in the pool, or quotas too tight.
///
/// Worst case is exponential in pool size. Pools here are tens of records,
/// which is the only reason the naive search is acceptable; revisit if
/// they grow by orders of magnitude.
pub fn select(
    pool: &[ConversationRecord],
    target: &SelectionTarget,
    rng: &mut StdRng,
) -> Option<Vec<ConvoId>> {
    let mut shuffled: Vec<&ConversationRecord> = pool.iter().collect();
    shuffled.shuffle(rng);

    let mut search = Search {
        order: &shuffled,
        required: &target.required_tags,
        max_per_group: target.max_per_group,
        used: FxHashSet::default(),
        group_counts: FxHashMap::default(),
        chosen: Vec::new(),
    };

    if search.descend(0) {
        log::debug!(
            "selected {} conversation(s) covering {} tag(s)",
            search.chosen.len(),
            search.used.len()
        );
        Some(search.chosen)
    } else {
        log::debug!(
            "no feasible subset: {} required tag(s) over a pool of {}",
            target.required_tags.len(),
            pool.len()
        );
        None
    }
}

/// The records of `pool` named by `ids`, in pool order.
pub fn records_for_ids<'a>(
    pool: &'a [ConversationRecord],
    ids: &[ConvoId],
) -> Vec<&'a ConversationRecord> {
    pool.iter().filter(|record| ids.contains(&record.id)).collect()
}

struct Search<'a> {
    order: &'a [&'a ConversationRecord],
    required: &'a FxHashSet<u32>,
    max_per_group: u32,
    used: FxHashSet<u32>,
    group_counts: FxHashMap<GroupId, u32>,
    chosen: Vec<ConvoId>,
}

impl Search<'_> {
    fn descend(&mut self, from: usize) -> bool {
        // Only in-target tags ever enter `used`, so size equality is set
        // equality.
        if self.used.len() == self.required.len() {
            return true;
        }

        for i in from..self.order.len() {
            let record = self.order[i];
            if !self.admissible(record) {
                continue;
            }

            for &tag in &record.tags {
                self.used.insert(tag);
            }
            *self.group_counts.entry(record.group).or_insert(0) += 1;
            self.chosen.push(record.id.clone());

            if self.descend(i + 1) {
                return true;
            }

            self.chosen.pop();
            if let Some(count) = self.group_counts.get_mut(&record.group) {
                *count -= 1;
            }
            for &tag in &record.tags {
                self.used.remove(&tag);
            }
        }

        false
    }

    fn admissible(&self, record: &ConversationRecord) -> bool {
        if record.tags.is_empty() {
            // Contributes nothing; taking it only burns group quota.
            return false;
        }
        let group_count = self.group_counts.get(&record.group).copied().unwrap_or(0);
        group_count < self.max_per_group
            && record
                .tags
                .iter()
                .all(|tag| self.required.contains(tag) && !self.used.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn record(id: &str, tags: &[u32], group: u32) -> ConversationRecord {
        ConversationRecord {
            id: ConvoId::from(id),
            tags: tags.iter().copied().collect(),
            group: GroupId(group),
        }
    }

    #[test]
    fn covers_target_exactly() {
        let pool = vec![
            record("a", &[1, 2], 1),
            record("b", &[3], 1),
            record("c", &[1, 2, 3], 2),
        ];
        let target = SelectionTarget::new([1, 2, 3], 2);
        let mut rng = StdRng::seed_from_u64(7);
        let ids = select(&pool, &target, &mut rng).unwrap();

        let mut covered = FxHashSet::default();
        for picked in records_for_ids(&pool, &ids) {
            for &tag in &picked.tags {
                assert!(covered.insert(tag), "tag {} used twice", tag);
            }
        }
        assert_eq!(covered, target.required_tags);
    }

    #[test]
    fn infeasible_when_tags_missing() {
        let pool = vec![record("a", &[1], 1), record("b", &[2], 1)];
        let target = SelectionTarget::new([1, 2, 3], 2);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select(&pool, &target, &mut rng), None);
    }

    #[test]
    fn group_quota_respected() {
        // Both records share a group; quota 1 forces infeasibility.
        let pool = vec![record("a", &[1], 1), record("b", &[2], 1)];
        let target = SelectionTarget::new([1, 2], 1);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select(&pool, &target, &mut rng), None);

        let target = SelectionTarget::new([1, 2], 2);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select(&pool, &target, &mut rng).is_some());
    }

    #[test]
    fn out_of_target_record_never_chosen() {
        // "b" would cover tag 2 but drags tag 9 along.
        let pool = vec![
            record("a", &[1], 1),
            record("b", &[2, 9], 1),
            record("c", &[2], 2),
        ];
        let target = SelectionTarget::new([1, 2], 2);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ids = select(&pool, &target, &mut rng).unwrap();
            assert!(!ids.contains(&ConvoId::from("b")), "seed {}", seed);
        }
    }

    #[test]
    fn zero_quota_is_infeasible() {
        let pool = vec![record("a", &[1], 1)];
        let target = SelectionTarget::new([1], 0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select(&pool, &target, &mut rng), None);
    }

    #[test]
    fn same_seed_same_result() {
        let pool = vec![
            record("a", &[1, 2], 1),
            record("b", &[3, 4], 2),
            record("c", &[1], 1),
            record("d", &[2], 2),
            record("e", &[3], 3),
            record("f", &[4], 3),
        ];
        let target = SelectionTarget::new([1, 2, 3, 4], 2);
        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        assert_eq!(
            select(&pool, &target, &mut rng1),
            select(&pool, &target, &mut rng2)
        );
    }
}
