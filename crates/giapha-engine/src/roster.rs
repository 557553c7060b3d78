//! The generation table: members grouped by "Đời", filtered by name, with
//! age and spouse/child counts per row.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::kinship::KinshipIndex;
use crate::model::{parse_iso_date, Person, RelationshipType};

/// Members bucketed by generation, ascending. Within a bucket, input order.
///
/// `search` is a case-insensitive substring match on the full name; an empty
/// search keeps everyone.
pub fn group_by_generation<'a>(
    persons: &'a [Person],
    search: &str,
) -> BTreeMap<u32, Vec<&'a Person>> {
    let needle = search.trim().to_lowercase();
    let mut groups: BTreeMap<u32, Vec<&Person>> = BTreeMap::new();
    for p in persons
        .iter()
        .filter(|p| needle.is_empty() || p.full_name.to_lowercase().contains(&needle))
    {
        groups.entry(p.generation).or_default().push(p);
    }
    groups
}

/// Age in whole years at `death`, or at `today` for living members.
///
/// `None` when there is no birth date or a date does not parse.
pub fn calculate_age(birth: Option<&str>, death: Option<&str>, today: NaiveDate) -> Option<i32> {
    let start = parse_iso_date(birth?).ok()?;
    let end = match death {
        Some(d) => parse_iso_date(d).ok()?,
        None => today,
    };
    let mut age = end.year() - start.year();
    if (end.month(), end.day()) < (start.month(), start.day()) {
        age -= 1;
    }
    Some(age)
}

/// "{label} {related name}", e.g. "Con trai của Cao Văn Nam".
///
/// `None` when the person has no relationship, the relationship is "other",
/// or the related member is not in `members`.
pub fn describe_relationship(person: &Person, members: &[Person]) -> Option<String> {
    let kind = person.relationship_type.as_ref()?;
    if *kind == RelationshipType::Other {
        return None;
    }
    let related_id = person.related_member_id.as_deref()?;
    let related = members.iter().find(|m| m.id == related_id)?;
    Some(format!("{} {}", kind.label(), related.full_name))
}

/// One row of the generation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary<'a> {
    pub id: &'a str,
    pub full_name: &'a str,
    pub gender: &'static str,
    pub generation: u32,
    pub age: Option<i32>,
    pub alive: bool,
    pub spouse_count: usize,
    pub child_count: usize,
}

impl<'a> MemberSummary<'a> {
    pub fn new(person: &'a Person, index: &KinshipIndex<'_>, today: NaiveDate) -> Self {
        Self {
            id: &person.id,
            full_name: &person.full_name,
            gender: person.gender.label(),
            generation: person.generation,
            age: calculate_age(
                person.birth_date.as_deref(),
                person.death_date.as_deref(),
                today,
            ),
            alive: person.is_alive(),
            spouse_count: index.spouse_count(&person.id),
            child_count: index.child_count(&person.id),
        }
    }

    /// Whether the row can be expanded to show spouses and children.
    pub fn has_family(&self) -> bool {
        self.spouse_count > 0 || self.child_count > 0
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationGroup<'a> {
    pub generation: u32,
    pub members: Vec<MemberSummary<'a>>,
}

/// The whole table for one tree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster<'a> {
    /// Members in the tree, regardless of the search.
    pub total: usize,
    pub living: usize,
    pub generations: Vec<GenerationGroup<'a>>,
}

impl<'a> Roster<'a> {
    pub fn build(persons: &'a [Person], search: &str, today: NaiveDate) -> Self {
        let index = KinshipIndex::new(persons);
        let generations = group_by_generation(persons, search)
            .into_iter()
            .map(|(generation, members)| GenerationGroup {
                generation,
                members: members
                    .into_iter()
                    .map(|p| MemberSummary::new(p, &index, today))
                    .collect(),
            })
            .collect();
        Self {
            total: persons.len(),
            living: persons.iter().filter(|p| p.is_alive()).count(),
            generations,
        }
    }

    /// The first generation with any matching member; the table opens on it.
    pub fn first_generation(&self) -> Option<u32> {
        self.generations.first().map(|g| g.generation)
    }

    pub fn generation(&self, generation: u32) -> Option<&GenerationGroup<'a>> {
        self.generations.iter().find(|g| g.generation == generation)
    }
}
