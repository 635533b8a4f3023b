//! Invalidation Rules
//!
//! Declares, per kind of data mutation, which caches and which key families
//! become stale. Write paths publish a [`MutationEvent`]; they never need to
//! know which caches exist.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Invalidation;

// == Mutation Event ==
/// Kind of record that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Operation,
    Basket,
    Position,
    Cycle,
    Lot,
    Flupsy,
    Screening,
    Sgr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

/// A write that happened against the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub entity: Entity,
    pub action: Action,
    #[serde(default)]
    pub basket_id: Option<i64>,
    #[serde(default)]
    pub cycle_id: Option<i64>,
    #[serde(default)]
    pub flupsy_id: Option<i64>,
    #[serde(default)]
    pub lot_id: Option<i64>,
}

impl MutationEvent {
    pub fn new(entity: Entity, action: Action) -> Self {
        Self {
            entity,
            action,
            basket_id: None,
            cycle_id: None,
            flupsy_id: None,
            lot_id: None,
        }
    }

    pub fn basket(mut self, id: i64) -> Self {
        self.basket_id = Some(id);
        self
    }

    pub fn cycle(mut self, id: i64) -> Self {
        self.cycle_id = Some(id);
        self
    }

    pub fn flupsy(mut self, id: i64) -> Self {
        self.flupsy_id = Some(id);
        self
    }

    pub fn lot(mut self, id: i64) -> Self {
        self.lot_id = Some(id);
        self
    }

    /// Substitutes `{basket_id}`, `{cycle_id}`, `{flupsy_id}` and `{lot_id}`.
    ///
    /// Returns `None` when the template needs an id the event does not carry.
    fn render(&self, template: &str) -> Option<String> {
        let mut rendered = template.to_string();
        for (placeholder, id) in [
            ("{basket_id}", self.basket_id),
            ("{cycle_id}", self.cycle_id),
            ("{flupsy_id}", self.flupsy_id),
            ("{lot_id}", self.lot_id),
        ] {
            if rendered.contains(placeholder) {
                rendered = rendered.replace(placeholder, &id?.to_string());
            }
        }
        Some(rendered)
    }
}

// == Target ==
/// Scope of a rule, possibly templated on the event's ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Prefix(String),
    Key(String),
}

/// One cache affected by a mutation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub cache: String,
    pub scope: Scope,
}

impl Target {
    pub fn all(cache: &str) -> Self {
        Self {
            cache: cache.to_string(),
            scope: Scope::All,
        }
    }

    pub fn prefix(cache: &str, template: &str) -> Self {
        Self {
            cache: cache.to_string(),
            scope: Scope::Prefix(template.to_string()),
        }
    }

    pub fn key(cache: &str, template: &str) -> Self {
        Self {
            cache: cache.to_string(),
            scope: Scope::Key(template.to_string()),
        }
    }

    /// Resolves the target against an event.
    ///
    /// A templated key or prefix whose id is missing from the event widens to
    /// the whole cache.
    pub fn resolve(&self, event: &MutationEvent) -> Invalidation {
        match &self.scope {
            Scope::All => Invalidation::All,
            Scope::Prefix(template) => event
                .render(template)
                .map_or(Invalidation::All, Invalidation::Prefix),
            Scope::Key(template) => event
                .render(template)
                .map_or(Invalidation::All, Invalidation::Key),
        }
    }
}

// == Invalidation Rules ==
/// Mutation kind to affected caches.
#[derive(Debug, Clone, Default)]
pub struct InvalidationRules {
    rules: HashMap<Entity, Vec<Target>>,
}

impl InvalidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds targets for a mutation kind. Repeated calls accumulate.
    pub fn on(mut self, entity: Entity, targets: impl IntoIterator<Item = Target>) -> Self {
        self.rules.entry(entity).or_default().extend(targets);
        self
    }

    pub fn targets(&self, entity: Entity) -> &[Target] {
        self.rules.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of every cache mentioned by some rule.
    pub fn caches(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .rules
            .values()
            .flatten()
            .map(|target| target.cache.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
