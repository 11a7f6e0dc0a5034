//! Branch paths.
//!
//! Every conditional arm and every value of a variant group the evaluator
//! descends into appends one marker. Two occurrences can co-exist at runtime
//! unless their paths pick different arms of the same site.

use std::fmt;
use std::sync::Arc;

/// One conditional node or variant group, numbered per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchSite(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchMarker {
    pub site: BranchSite,
    /// Conditionals use 0 for the consequent and 1 for the alternate.
    pub arm: u32,
}

#[derive(Debug)]
struct BranchNode {
    marker: BranchMarker,
    parent: Option<Arc<BranchNode>>,
}

/// Immutable persistent list of markers; `push` shares the prefix.
#[derive(Clone, Default)]
pub struct BranchPath {
    head: Option<Arc<BranchNode>>,
    len: usize,
}

impl BranchPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push(&self, site: BranchSite, arm: u32) -> Self {
        Self {
            head: Some(Arc::new(BranchNode {
                marker: BranchMarker { site, arm },
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Innermost marker.
    pub fn last(&self) -> Option<BranchMarker> {
        self.head.as_ref().map(|node| node.marker)
    }

    /// Markers from innermost to outermost.
    pub fn iter(&self) -> BranchIter<'_> {
        BranchIter {
            next: self.head.as_deref(),
        }
    }

    /// Markers from outermost to innermost.
    pub fn markers(&self) -> Vec<BranchMarker> {
        let mut markers: Vec<BranchMarker> = self.iter().collect();
        markers.reverse();
        markers
    }

    pub fn arm_for(&self, site: BranchSite) -> Option<u32> {
        self.iter().find(|m| m.site == site).map(|m| m.arm)
    }

    /// True when no site shared by both paths is taken with different arms.
    pub fn is_compatible(&self, other: &BranchPath) -> bool {
        self.iter().all(|marker| match other.arm_for(marker.site) {
            Some(arm) => arm == marker.arm,
            None => true,
        })
    }
}

impl PartialEq for BranchPath {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for BranchPath {}

impl fmt::Debug for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.markers().iter().map(|m| (m.site.0, m.arm)))
            .finish()
    }
}

pub struct BranchIter<'p> {
    next: Option<&'p BranchNode>,
}

impl<'p> Iterator for BranchIter<'p> {
    type Item = BranchMarker;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(node.marker)
    }
}
