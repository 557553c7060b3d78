//! # giapha-engine
//!
//! Family-tree reconstruction and Vietnamese lunar-calendar reminders.
//!
//! Members of a family tree are stored as a flat list where each person may
//! point at one other person ("son of", "wife of", ...). The engine rebuilds
//! the tree structure from those links, converts solar dates to the
//! Vietnamese lunar calendar, and decides which remembrance days are due.
//!
//! ## Modules
//!
//! - [`model`] — Person, FamilyTree and FamilyEvent records
//! - [`kinship`] — Spouse/child adjacency over one tree's members
//! - [`forest`] — Flat member list → forest of family units
//! - [`lunar`] — Gregorian → Vietnamese lunar date conversion
//! - [`events`] — Upcoming-event predicate and event categories
//! - [`roster`] — Generation table: grouping, search, ages, counts
//! - [`store`] — Tree/event document storage (in-memory and JSON file)
//! - [`config`] — Time zone, lunar offset and "soon" window
//! - [`error`] — Error types

pub mod config;
pub mod error;
pub mod events;
pub mod forest;
pub mod kinship;
pub mod lunar;
pub mod model;
pub mod roster;
pub mod store;

pub use config::EngineConfig;
pub use error::{GiaphaError, Result};
pub use events::{
    categorize, check_upcoming_events, check_upcoming_events_with_options, is_event_upcoming,
    partition_by_category, upcoming_events_at, EventCategory, EventGroups,
};
pub use forest::{build_forest, find_roots, FamilyNode, Forest};
pub use kinship::KinshipIndex;
pub use lunar::{solar_to_lunar, solar_to_lunar_iso, solar_to_lunar_with_options, LunarDate, LunarOptions};
pub use model::{
    new_member_id, parse_iso_date, FamilyEvent, FamilyTree, Gender, Person, RelationshipType,
    Repeat,
};
pub use roster::{calculate_age, describe_relationship, group_by_generation, MemberSummary, Roster};
pub use store::{load_or_seed, select_tree, EventRecord, EventStore, JsonFileStore, MemoryStore, TreeStore};
