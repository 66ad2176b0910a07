//! A rule-based chemical structure engine.
//!
//! Species are explicit-hydrogen molecular graphs validated against a
//! fixed element table; functional groups are located by subgraph search;
//! reaction rules (explicit stoichiometric ones and generic
//! pattern-driven ones) rewrite mixtures in a single deterministic
//! resolution pass.

pub mod atom;
pub mod bond;
pub mod decl;
pub mod element;
pub mod find;
pub mod formula;
pub mod graph;
pub mod pattern;
pub mod reaction;
pub mod registry;
pub mod resolve;
pub mod species;
pub mod topology;

pub use atom::Atom;
pub use bond::{Bond, BondOrder};
pub use decl::Declarations;
pub use element::{Element, Geometry, ALL_ELEMENTS, VALENCY_EPSILON};
pub use find::{find_all, find_pattern};
pub use formula::{empirical_formula, format_formula, molar_mass};
pub use graph::MolGraph;
pub use pattern::{AtomQuery, BondQuery, GroupOccurrence, GroupPattern, PatternId};
pub use reaction::{
    build_products, enumerate_bindings, Candidate, ExplicitRule, GenericBinding, GenericRule,
    ProductAtom, ProductTemplate, RateClass, ReactionError, RoleRef, RuleId, SlotBinding,
    MAX_COMBINATIONS,
};
pub use registry::{LoadError, Registry};
pub use resolve::{resolve, AppliedReaction, Mixture, Resolution, ResolveDiagnostic};
pub use species::{Species, SpeciesId, StructureError};
pub use topology::{Topology, TopologyError, TopologyLibrary};
