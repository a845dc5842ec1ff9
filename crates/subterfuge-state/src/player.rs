//! Players.

use serde::{Deserialize, Serialize};

use crate::id::PlayerId;
use crate::specialist::SpecialistPool;

/// A participant in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    eliminated: bool,
    specialist_pool: SpecialistPool,
}

impl Player {
    pub fn new(id: PlayerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            eliminated: false,
            specialist_pool: SpecialistPool::default(),
        }
    }

    /// Builder-style: replace the hireable offers.
    pub fn with_specialist_pool(mut self, pool: SpecialistPool) -> Self {
        self.specialist_pool = pool;
        self
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Eliminated players keep their entities on the map but no longer
    /// produce or issue commands.
    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    pub fn set_eliminated(&mut self, eliminated: bool) {
        self.eliminated = eliminated;
    }

    pub fn specialist_pool(&self) -> &SpecialistPool {
        &self.specialist_pool
    }

    pub fn specialist_pool_mut(&mut self) -> &mut SpecialistPool {
        &mut self.specialist_pool
    }
}
