//! Family-tree reconstruction: flat member list → forest of rooted trees.
//!
//! Each [`FamilyNode`] is one household unit: an anchor person, the spouses
//! declared against them, and the children of the anchor or of any of those
//! spouses, recursively.
//!
//! # Placement rule
//!
//! Every member id is placed at most once in the whole forest. Placement is
//! tracked by a claim set passed explicitly through the construction. A
//! candidate is checked against it right before it is built, so self links,
//! mutual "child of" cycles and children shared by two parents all terminate
//! and never duplicate.
//!
//! # Roots
//!
//! A member is a root unless their child/spouse link resolves to another
//! member of the same tree. If that leaves no roots (every member hangs off
//! someone else, e.g. a cycle), the members of the lowest generation that are
//! not declared as spouses become the roots instead, so a non-empty tree
//! never renders as an empty forest.
//!
//! # Ordering
//!
//! Nothing is sorted. Roots follow input order; children follow
//! anchor-then-spouses encounter order with duplicates removed.
//!
//! ```
//! use giapha_engine::forest::build_forest;
//! use giapha_engine::model::{Person, RelationshipType};
//!
//! let persons = vec![
//!     Person::new("A", "Cao Văn Nam"),
//!     Person::new("B", "Lê Thị Hoa").related(RelationshipType::WifeOf, "A"),
//!     Person::new("C", "Cao Văn Bình").related(RelationshipType::SonOf, "A"),
//!     Person::new("D", "Cao Thị Mai").related(RelationshipType::DaughterOf, "B"),
//! ];
//! let forest = build_forest(&persons);
//! assert_eq!(forest.len(), 1);
//! assert_eq!(forest[0].person_ids(), vec!["A", "B", "C", "D"]);
//! ```

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::kinship::KinshipIndex;
use crate::model::Person;

// ── FamilyNode ──────────────────────────────────────────────────────────────

/// One household unit in the reconstructed forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyNode<'a> {
    /// The anchor of this unit.
    pub person: &'a Person,
    /// Spouses declared against the anchor that were not placed elsewhere.
    pub spouses: Vec<&'a Person>,
    /// Children of the anchor or of any spouse above.
    pub children: Vec<FamilyNode<'a>>,
}

impl<'a> FamilyNode<'a> {
    /// Number of people in this subtree, spouses included.
    pub fn len(&self) -> usize {
        1 + self.spouses.len() + self.children.iter().map(FamilyNode::len).sum::<usize>()
    }

    /// Always false: a node holds at least its anchor.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ids in pre-order: anchor, spouses, then each child subtree.
    pub fn person_ids(&self) -> Vec<&'a str> {
        let mut ids = Vec::with_capacity(self.len());
        self.collect_ids(&mut ids);
        ids
    }

    /// Generations spanned by this subtree (1 for a childless unit).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(FamilyNode::depth).max().unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.person.id == id
            || self.spouses.iter().any(|s| s.id == id)
            || self.children.iter().any(|c| c.contains(id))
    }

    fn collect_ids(&self, out: &mut Vec<&'a str>) {
        out.push(self.person.id.as_str());
        out.extend(self.spouses.iter().map(|s| s.id.as_str()));
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

// ── Forest ──────────────────────────────────────────────────────────────────

/// The reconstructed forest plus the members it could not reach.
#[derive(Debug, Clone, Serialize)]
pub struct Forest<'a> {
    pub roots: Vec<FamilyNode<'a>>,
    /// Members never placed, e.g. both halves of a "child of" cycle when other
    /// roots exist. Input order.
    pub unplaced: Vec<&'a Person>,
}

impl<'a> Forest<'a> {
    /// Reconstruct the forest for one tree's members.
    pub fn build(persons: &'a [Person]) -> Self {
        let index = KinshipIndex::new(persons);
        let mut claims = Claims::default();

        let roots: Vec<FamilyNode<'a>> = find_roots(&index)
            .into_iter()
            .filter_map(|root| {
                if claims.is_claimed(&root.id) {
                    trace!(id = %root.id, "root already placed, skipped");
                    return None;
                }
                Some(build_unit(&index, root, &mut claims))
            })
            .collect();

        let unplaced: Vec<&'a Person> = persons
            .iter()
            .filter(|p| !claims.is_claimed(&p.id))
            .collect();
        if !unplaced.is_empty() {
            debug!(count = unplaced.len(), "members not reachable from any root");
        }

        Self { roots, unplaced }
    }

    /// Number of people placed in the forest.
    pub fn person_count(&self) -> usize {
        self.roots.iter().map(FamilyNode::len).sum()
    }
}

/// Reconstruct the forest for one tree's members.
///
/// Total over any input: dangling links, self links and cycles never fail
/// and never loop.
pub fn build_forest(persons: &[Person]) -> Vec<FamilyNode<'_>> {
    Forest::build(persons).roots
}

/// Root selection, including the lowest-generation fallback.
pub fn find_roots<'a>(index: &KinshipIndex<'a>) -> Vec<&'a Person> {
    let persons = index.persons();
    let roots: Vec<&'a Person> = persons
        .iter()
        .filter(|p| !index.has_resolved_parent_link(p))
        .collect();
    if !roots.is_empty() || persons.is_empty() {
        return roots;
    }

    let mut candidates: Vec<&'a Person> = persons.iter().filter(|p| !p.is_spouse()).collect();
    if candidates.is_empty() {
        candidates = persons.iter().collect();
    }
    let Some(min_generation) = candidates.iter().map(|p| p.generation).min() else {
        return Vec::new();
    };
    debug!(
        generation = min_generation,
        "no natural roots, falling back to lowest generation"
    );
    candidates
        .into_iter()
        .filter(|p| p.generation == min_generation)
        .collect()
}

// ── Construction ────────────────────────────────────────────────────────────

/// Ids already placed somewhere in the forest.
#[derive(Debug, Default)]
struct Claims<'a> {
    placed: HashSet<&'a str>,
}

impl<'a> Claims<'a> {
    /// Returns false if `id` was already claimed.
    fn claim(&mut self, id: &'a str) -> bool {
        self.placed.insert(id)
    }

    fn is_claimed(&self, id: &str) -> bool {
        self.placed.contains(id)
    }
}

fn build_unit<'a>(
    index: &KinshipIndex<'a>,
    person: &'a Person,
    claims: &mut Claims<'a>,
) -> FamilyNode<'a> {
    claims.claim(&person.id);

    let spouses: Vec<&'a Person> = index
        .spouses_of(&person.id)
        .filter(|&s| claims.claim(&s.id))
        .collect();

    let mut seen: HashSet<&'a str> = HashSet::new();
    let candidates: Vec<&'a Person> = index
        .children_of(&person.id)
        .chain(spouses.iter().flat_map(|s| index.children_of(&s.id)))
        .filter(|&c| seen.insert(c.id.as_str()))
        .collect();

    let mut children = Vec::with_capacity(candidates.len());
    for child in candidates {
        // A sibling's subtree may have claimed this child in the meantime.
        if claims.is_claimed(&child.id) {
            trace!(id = %child.id, parent = %person.id, "child already placed, skipped");
            continue;
        }
        children.push(build_unit(index, child, claims));
    }

    FamilyNode {
        person,
        spouses,
        children,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
