//! Specialists and the per-player pool of hireable offers.

use serde::{Deserialize, Serialize};

use crate::id::{PlayerId, SpecialistId};

// ---------------------------------------------------------------------------
// Specialist
// ---------------------------------------------------------------------------

/// A named, owned unit that can be hired into an entity's roster.
///
/// `priority` ranks the specialist's effect against other specialists present
/// at the same location; it must be strictly positive for the specialist to be
/// considered valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialist {
    /// Unique id of this specialist.
    pub id: SpecialistId,
    /// Display name (e.g. `"Queen"`, `"Navigator"`).
    pub name: String,
    /// The player the specialist works for. `None` for unassigned catalog
    /// entries, which are never valid inside a roster.
    pub owner: Option<PlayerId>,
    /// Effect resolution rank.
    pub priority: i32,
}

impl Specialist {
    /// Create a specialist owned by `owner`.
    pub fn new(id: SpecialistId, name: &str, owner: PlayerId, priority: i32) -> Self {
        Self {
            id,
            name: name.to_owned(),
            owner: Some(owner),
            priority,
        }
    }
}

// ---------------------------------------------------------------------------
// SpecialistPool
// ---------------------------------------------------------------------------

/// The offers a player can currently hire from.
///
/// Hiring removes the offer and reports the index it occupied, which is what
/// [`undo_hire`](Self::undo_hire) needs to put the pool back exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistPool {
    offers: Vec<Specialist>,
}

impl SpecialistPool {
    /// Create a pool with the given offers, in display order.
    pub fn new(offers: Vec<Specialist>) -> Self {
        Self { offers }
    }

    /// The currently available offers.
    pub fn peek_offers(&self) -> &[Specialist] {
        &self.offers
    }

    /// Look up an offer by specialist id.
    pub fn find_offer(&self, id: SpecialistId) -> Option<&Specialist> {
        self.offers.iter().find(|s| s.id == id)
    }

    /// Remove the offer with the given id.
    ///
    /// Returns the index the offer occupied together with the specialist, or
    /// `None` if no such offer exists.
    pub fn hire(&mut self, id: SpecialistId) -> Option<(usize, Specialist)> {
        let index = self.offers.iter().position(|s| s.id == id)?;
        Some((index, self.offers.remove(index)))
    }

    /// Put a previously hired specialist back at `index`.
    ///
    /// An index past the end appends.
    pub fn undo_hire(&mut self, index: usize, specialist: Specialist) {
        let index = index.min(self.offers.len());
        self.offers.insert(index, specialist);
    }

    /// Number of offers.
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Whether there is nothing left to hire.
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> SpecialistPool {
        SpecialistPool::new(vec![
            Specialist::new(SpecialistId(1), "Queen", PlayerId(1), 3),
            Specialist::new(SpecialistId(2), "Navigator", PlayerId(1), 1),
            Specialist::new(SpecialistId(3), "Pirate", PlayerId(1), 2),
        ])
    }

    #[test]
    fn hire_then_undo_restores_order() {
        let mut p = pool();
        let before = p.clone();
        let (index, hired) = p.hire(SpecialistId(2)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(hired.name, "Navigator");
        assert_eq!(p.len(), 2);
        assert!(p.find_offer(SpecialistId(2)).is_none());

        p.undo_hire(index, hired);
        assert_eq!(p, before);
    }

    #[test]
    fn hire_unknown_offer_is_none() {
        let mut p = pool();
        assert!(p.hire(SpecialistId(99)).is_none());
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn undo_hire_past_end_appends() {
        let mut p = SpecialistPool::default();
        p.undo_hire(5, Specialist::new(SpecialistId(1), "Queen", PlayerId(1), 3));
        assert_eq!(p.len(), 1);
    }
}
