//! Explicit relationship graph over the flat member list of one tree.
//!
//! Members only carry a foreign-key style link (`relationshipType` +
//! `relatedMemberId`). [`KinshipIndex`] turns those links into adjacency lists
//! keyed by the *target* id, built once per recomputation. Every lookup keeps
//! input order, because display order is insertion order.
//!
//! The same index backs both the forest builder and the per-member counts in
//! the generation table, so the two views always agree on who is whose spouse
//! or child.

use std::collections::HashMap;

use tracing::trace;

use crate::model::Person;

/// Adjacency over one tree's members. Positions refer to the input slice.
#[derive(Debug)]
pub struct KinshipIndex<'a> {
    persons: &'a [Person],
    by_id: HashMap<&'a str, usize>,
    spouses: HashMap<&'a str, Vec<usize>>,
    children: HashMap<&'a str, Vec<usize>>,
}

impl<'a> KinshipIndex<'a> {
    pub fn new(persons: &'a [Person]) -> Self {
        let mut by_id = HashMap::with_capacity(persons.len());
        let mut spouses: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();

        for (pos, person) in persons.iter().enumerate() {
            // First occurrence wins for duplicated ids.
            by_id.entry(person.id.as_str()).or_insert(pos);

            let Some(target) = person.related_member_id.as_deref() else {
                continue;
            };
            if person.is_spouse() {
                spouses.entry(target).or_default().push(pos);
            } else if person.is_child() {
                children.entry(target).or_default().push(pos);
            }
        }

        Self {
            persons,
            by_id,
            spouses,
            children,
        }
    }

    /// The members this index was built from, in input order.
    pub fn persons(&self) -> &'a [Person] {
        self.persons
    }

    pub fn get(&self, id: &str) -> Option<&'a Person> {
        self.by_id.get(id).map(|&pos| &self.persons[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Everyone declared as wife/husband of `id`, in input order.
    pub fn spouses_of(&self, id: &str) -> impl Iterator<Item = &'a Person> + '_ {
        self.lookup(&self.spouses, id)
    }

    /// Everyone declared as son/daughter of `id`, in input order.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &'a Person> + '_ {
        self.lookup(&self.children, id)
    }

    pub fn spouse_count(&self, id: &str) -> usize {
        self.spouses.get(id).map_or(0, Vec::len)
    }

    pub fn child_count(&self, id: &str) -> usize {
        self.children.get(id).map_or(0, Vec::len)
    }

    /// Whether `person` is attached below someone else in the tree: a
    /// child/spouse link that resolves to a *different* member.
    ///
    /// Dangling links and links to oneself do not count, so such a member
    /// still surfaces as a root.
    pub fn has_resolved_parent_link(&self, person: &Person) -> bool {
        if !person.is_child() && !person.is_spouse() {
            return false;
        }
        match person.related_member_id.as_deref() {
            Some(target) if target == person.id => {
                trace!(id = %person.id, "self-referencing link ignored");
                false
            }
            Some(target) => {
                let resolved = self.contains(target);
                if !resolved {
                    trace!(id = %person.id, related = target, "dangling link ignored");
                }
                resolved
            }
            None => false,
        }
    }

    fn lookup<'s>(
        &'s self,
        table: &'s HashMap<&'a str, Vec<usize>>,
        id: &str,
    ) -> impl Iterator<Item = &'a Person> + 's {
        let persons = self.persons;
        table
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&pos| &persons[pos])
    }
}
