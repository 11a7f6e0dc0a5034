//! Conflict detector.
//!
//! Co-reachable tokens with the same variant stack and important flag whose
//! bases fall in one conflict group but differ. Conflicting pairs are joined
//! into components so `text-left text-center text-right` is reported once.

use crate::classify::classify;
use crate::diagnostics::Diagnostic;
use crate::eval::{AnalysisUnit, Occurrence};
use crate::oracle::ConflictGroupTable;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConflictKey {
    variants: Vec<String>,
    important: bool,
    group: String,
}

struct Bucket {
    key: ConflictKey,
    members: Vec<(usize, String)>,
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // Keep the earlier member as the root so components report in order.
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[drop] = keep;
    }
}

pub fn find_conflicts(unit: &AnalysisUnit, groups: &dyn ConflictGroupTable) -> Vec<Diagnostic> {
    let occurrences = &unit.occurrences;
    let mut buckets: Vec<Bucket> = Vec::new();

    for (i, occurrence) in occurrences.iter().enumerate() {
        let token = classify(&occurrence.text);
        let Some(group) = groups.group_of(&token.base) else {
            continue;
        };
        let key = ConflictKey {
            variants: token.variants,
            important: token.important,
            group: group.to_string(),
        };
        match buckets.iter_mut().find(|bucket| bucket.key == key) {
            Some(bucket) => bucket.members.push((i, token.base)),
            None => buckets.push(Bucket {
                key,
                members: vec![(i, token.base)],
            }),
        }
    }

    let mut diagnostics = Vec::new();
    for bucket in &buckets {
        let members = &bucket.members;
        let mut parent: Vec<usize> = (0..members.len()).collect();
        let mut linked = vec![false; members.len()];

        for a in 0..members.len() {
            for b in a + 1..members.len() {
                let (ia, base_a) = &members[a];
                let (ib, base_b) = &members[b];
                if base_a != base_b && occurrences[*ia].branch.is_compatible(&occurrences[*ib].branch) {
                    union(&mut parent, a, b);
                    linked[a] = true;
                    linked[b] = true;
                }
            }
        }

        let mut components: Vec<(usize, Vec<&Occurrence>)> = Vec::new();
        for k in 0..members.len() {
            if !linked[k] {
                continue;
            }
            let root = find(&mut parent, k);
            let occurrence = &occurrences[members[k].0];
            match components.iter_mut().find(|(r, _)| *r == root) {
                Some((_, component)) => component.push(occurrence),
                None => components.push((root, vec![occurrence])),
            }
        }

        diagnostics.extend(
            components
                .iter()
                .filter_map(|(_, component)| Diagnostic::conflict(component, &bucket.key.group)),
        );
    }

    diagnostics
}
