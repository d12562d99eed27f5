use crate::{NodeId, PageTree, Result};
use log::debug;

/// One link in a prioritized fallback chain.
pub trait Probe {
    type Output;

    fn label(&self) -> &str;

    /// `Ok(None)` when the probe does not match the current page.
    fn probe(&self, tree: &dyn PageTree) -> Result<Option<Self::Output>>;
}

/// A probe that matches the first element for `selector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorProbe {
    pub label: &'static str,
    pub selector: &'static str,
}

impl AnchorProbe {
    #[must_use]
    pub const fn new(label: &'static str, selector: &'static str) -> Self {
        Self { label, selector }
    }
}

impl Probe for AnchorProbe {
    type Output = NodeId;

    fn label(&self) -> &str {
        self.label
    }

    fn probe(&self, tree: &dyn PageTree) -> Result<Option<NodeId>> {
        tree.query(self.selector)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatch<'p, T> {
    pub label: &'p str,
    pub position: usize,
    pub value: T,
}

/// Runs `chain` in order and returns the first hit.
///
/// A probe that errors counts as a miss; the remaining links still run.
pub fn first_match<'p, P: Probe>(
    tree: &dyn PageTree,
    chain: &'p [P],
) -> Option<ProbeMatch<'p, P::Output>> {
    for (position, probe) in chain.iter().enumerate() {
        match probe.probe(tree) {
            Ok(Some(value)) => {
                return Some(ProbeMatch {
                    label: probe.label(),
                    position,
                    value,
                })
            }
            Ok(None) => {}
            Err(err) => debug!("Probe {} failed: {err}", probe.label()),
        }
    }
    None
}
