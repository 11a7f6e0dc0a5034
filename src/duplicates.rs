//! Duplicate detector.
//!
//! Two occurrences of the same text are duplicates when their branch paths
//! are compatible, i.e. both can be applied in one render. Occurrences of a
//! text that only ever appear in mutually exclusive arms are not duplicates;
//! when such a text shows up on every arm of one site it gets an
//! extractable hint instead.

use std::collections::{BTreeSet, HashMap};

use crate::diagnostics::Diagnostic;
use crate::eval::{AnalysisUnit, Occurrence};

#[derive(Debug, Clone, Default)]
pub struct DuplicateReport {
    pub duplicates: Vec<Diagnostic>,
    pub hints: Vec<Diagnostic>,
}

fn group_by_text(occurrences: &[Occurrence]) -> Vec<Vec<usize>> {
    let mut order: Vec<Vec<usize>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, occurrence) in occurrences.iter().enumerate() {
        let slot = *index.entry(occurrence.text.as_str()).or_insert_with(|| {
            order.push(Vec::new());
            order.len() - 1
        });
        order[slot].push(i);
    }
    order
}

pub fn find_duplicates(unit: &AnalysisUnit) -> DuplicateReport {
    let occurrences = &unit.occurrences;
    let mut report = DuplicateReport::default();

    for indices in group_by_text(occurrences) {
        if indices.len() < 2 {
            continue;
        }

        let mut partners: Vec<Vec<usize>> = vec![Vec::new(); indices.len()];
        for a in 0..indices.len() {
            for b in a + 1..indices.len() {
                let (left, right) = (&occurrences[indices[a]], &occurrences[indices[b]]);
                if left.branch.is_compatible(&right.branch) {
                    partners[a].push(indices[b]);
                    partners[b].push(indices[a]);
                }
            }
        }

        let mut exclusive = Vec::new();
        for (k, &i) in indices.iter().enumerate() {
            if partners[k].is_empty() {
                exclusive.push(i);
            } else {
                partners[k].sort_unstable();
                report.duplicates.push(Diagnostic::duplicate(
                    &occurrences[i],
                    partners[k].iter().map(|&j| &occurrences[j]),
                ));
            }
        }

        let mut hinted = BTreeSet::new();
        for site in unit.sites.iter().filter(|site| site.arms >= 2) {
            let mut covered = vec![false; site.arms as usize];
            let mut members = Vec::new();
            for &i in &exclusive {
                let Some(arm) = occurrences[i].branch.arm_for(site.site) else {
                    continue;
                };
                if (arm as usize) < covered.len() {
                    covered[arm as usize] = true;
                    members.push(i);
                }
            }
            if covered.iter().all(|hit| *hit) {
                hinted.extend(members);
            }
        }
        report
            .hints
            .extend(hinted.into_iter().map(|i| Diagnostic::extractable(&occurrences[i])));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{BranchPath, BranchSite};
    use crate::diagnostics::DiagnosticKind;
    use crate::eval::{OriginKind, SiteInfo, UnitKind};
    use crate::span::SourceSpan;
    use proptest::prelude::*;

    fn occurrence(text: &str, start: u32, branch: BranchPath) -> Occurrence {
        Occurrence {
            text: text.to_string(),
            span: SourceSpan::new(start, start + 1),
            declaration: None,
            branch,
            origin: OriginKind::Literal,
        }
    }

    fn unit(occurrences: Vec<Occurrence>, sites: Vec<SiteInfo>) -> AnalysisUnit {
        AnalysisUnit {
            kind: UnitKind::Attribute,
            span: SourceSpan::default(),
            occurrences,
            sites,
        }
    }

    fn site(id: u32, arms: u32) -> SiteInfo {
        SiteInfo {
            site: BranchSite(id),
            arms,
        }
    }

    #[test]
    fn test_root_and_arm_are_duplicates() {
        let root = BranchPath::root();
        let yes = root.push(BranchSite(0), 0);
        let no = root.push(BranchSite(0), 1);
        let report = find_duplicates(&unit(
            vec![
                occurrence("flex", 0, root.clone()),
                occurrence("items-center", 5, root),
                occurrence("items-center", 20, yes),
                occurrence("items-start", 40, no),
            ],
            vec![site(0, 2)],
        ));
        assert_eq!(report.duplicates.len(), 2);
        assert_eq!(report.duplicates[0].span.start, 5);
        assert_eq!(report.duplicates[0].related, vec![SourceSpan::new(20, 21)]);
        assert_eq!(report.duplicates[1].span.start, 20);
        assert!(report.hints.is_empty());
    }

    #[test]
    fn test_token_on_every_arm_is_a_hint() {
        let root = BranchPath::root();
        let yes = root.push(BranchSite(0), 0);
        let no = root.push(BranchSite(0), 1);
        let report = find_duplicates(&unit(
            vec![
                occurrence("mt-4", 0, root),
                occurrence("flex", 10, yes.clone()),
                occurrence("bg-blue-500", 15, yes),
                occurrence("flex", 30, no.clone()),
                occurrence("bg-gray-500", 35, no),
            ],
            vec![site(0, 2)],
        ));
        assert!(report.duplicates.is_empty());
        assert_eq!(report.hints.len(), 2);
        assert!(report.hints.iter().all(|d| d.kind == DiagnosticKind::ExtractableHint));
    }

    #[test]
    fn test_enclosing_occurrence_promotes_arms_to_duplicates() {
        let root = BranchPath::root();
        let yes = root.push(BranchSite(0), 0);
        let no = root.push(BranchSite(0), 1);
        let report = find_duplicates(&unit(
            vec![
                occurrence("flex", 0, root),
                occurrence("flex", 10, yes),
                occurrence("flex", 30, no),
            ],
            vec![site(0, 2)],
        ));
        assert_eq!(report.duplicates.len(), 3);
        assert!(report.hints.is_empty());
        assert_eq!(report.duplicates[0].related.len(), 2);
    }

    #[test]
    fn test_partial_arm_coverage_gives_nothing() {
        let root = BranchPath::root();
        let report = find_duplicates(&unit(
            vec![
                occurrence("p-2", 0, root.push(BranchSite(0), 0)),
                occurrence("p-2", 10, root.push(BranchSite(0), 1)),
            ],
            vec![site(0, 3)],
        ));
        assert!(report.duplicates.is_empty());
        assert!(report.hints.is_empty());
    }

    #[test]
    fn test_nested_arm_counts_for_outer_site() {
        let root = BranchPath::root();
        let outer_yes = root.push(BranchSite(0), 0);
        let report = find_duplicates(&unit(
            vec![
                occurrence("grid", 0, outer_yes.push(BranchSite(1), 0)),
                occurrence("grid", 10, root.push(BranchSite(0), 1)),
            ],
            vec![site(0, 2), site(1, 2)],
        ));
        assert!(report.duplicates.is_empty());
        let hinted: Vec<u32> = report.hints.iter().map(|d| d.span.start).collect();
        assert_eq!(hinted, vec![0, 10]);
    }

    fn arb_unit() -> impl Strategy<Value = AnalysisUnit> {
        let entry = (0usize..3, prop::collection::btree_map(0u32..3, 0u32..2, 0..3));
        prop::collection::vec(entry, 0..12).prop_map(|entries| {
            let occurrences = entries
                .into_iter()
                .enumerate()
                .map(|(i, (text, markers))| {
                    let branch = markers
                        .into_iter()
                        .fold(BranchPath::root(), |path, (s, arm)| path.push(BranchSite(s), arm));
                    occurrence(["flex", "grid", "p-4"][text], i as u32 * 10, branch)
                })
                .collect();
            unit(occurrences, (0..3).map(|s| site(s, 2)).collect())
        })
    }

    proptest! {
        #[test]
        fn duplicates_are_exactly_the_co_reachable_repeats(unit in arb_unit()) {
            let report = find_duplicates(&unit);
            let flagged: BTreeSet<u32> = report.duplicates.iter().map(|d| d.span.start).collect();
            for (i, a) in unit.occurrences.iter().enumerate() {
                let has_partner = unit.occurrences.iter().enumerate().any(|(j, b)| {
                    i != j && a.text == b.text && a.branch.is_compatible(&b.branch)
                });
                prop_assert_eq!(flagged.contains(&a.span.start), has_partner);
            }
        }

        #[test]
        fn hints_never_overlap_duplicates(unit in arb_unit()) {
            let report = find_duplicates(&unit);
            let flagged: BTreeSet<u32> = report.duplicates.iter().map(|d| d.span.start).collect();
            for hint in &report.hints {
                prop_assert!(!flagged.contains(&hint.span.start));
            }
        }
    }
}
