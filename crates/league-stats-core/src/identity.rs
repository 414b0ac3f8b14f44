use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::model::{Member, MemberId};

/// Resolves merged-away member identities to the surviving member.
///
/// Redirects are followed transitively. A redirect cycle resolves to the
/// lexically smallest id on the cycle so resolution stays total and
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemberResolver {
    redirects: BTreeMap<MemberId, MemberId>,
    resolved: BTreeMap<MemberId, MemberId>,
}

impl MemberResolver {
    #[must_use]
    pub fn from_members(members: &[Member]) -> Self {
        let redirects: BTreeMap<MemberId, MemberId> = members
            .iter()
            .filter_map(|member| {
                member
                    .merged_into
                    .as_ref()
                    .filter(|target| *target != &member.id)
                    .map(|target| (member.id.clone(), target.clone()))
            })
            .collect();

        let mut resolver = Self {
            redirects,
            resolved: BTreeMap::new(),
        };
        let sources: Vec<MemberId> = resolver.redirects.keys().cloned().collect();
        for source in sources {
            let canonical = resolver.follow(&source);
            resolver.resolved.insert(source, canonical);
        }
        resolver
    }

    /// Canonical identity for `member_id`; ids without a redirect map to themselves.
    #[must_use]
    pub fn resolve(&self, member_id: &MemberId) -> MemberId {
        self.resolved
            .get(member_id)
            .cloned()
            .unwrap_or_else(|| member_id.clone())
    }

    #[must_use]
    pub fn is_merged_away(&self, member_id: &MemberId) -> bool {
        self.resolve(member_id) != *member_id
    }

    #[must_use]
    pub fn redirect_count(&self) -> usize {
        self.redirects.len()
    }

    fn follow(&self, start: &MemberId) -> MemberId {
        let mut seen = BTreeSet::new();
        let mut path = Vec::new();
        let mut current = start.clone();
        loop {
            if !seen.insert(current.clone()) {
                let cycle_start = path.iter().position(|id| id == &current).unwrap_or(0);
                let canonical = path[cycle_start..]
                    .iter()
                    .min()
                    .cloned()
                    .unwrap_or_else(|| current.clone());
                warn!(
                    member_id = %start,
                    canonical = %canonical,
                    "member merge redirects form a cycle"
                );
                return canonical;
            }
            path.push(current.clone());
            match self.redirects.get(&current) {
                Some(next) => current = next.clone(),
                None => return current,
            }
        }
    }
}
