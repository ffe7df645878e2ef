use crate::definition::{ObjectiveType, QuestDef};
use crate::id::QuestId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Errors raised while building a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate quest id: {0}")]
    DuplicateQuest(QuestId),
}

/// Builder for constructing an immutable [`Catalog`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    quests: BTreeMap<QuestId, QuestDef>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a quest definition.
    pub fn register(&mut self, quest: QuestDef) -> Result<QuestId, CatalogError> {
        let id = quest.id;
        if self.quests.contains_key(&id) {
            return Err(CatalogError::DuplicateQuest(id));
        }
        self.quests.insert(id, quest);
        Ok(id)
    }

    /// Register several definitions, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        quests: impl IntoIterator<Item = QuestDef>,
    ) -> Result<(), CatalogError> {
        for quest in quests {
            self.register(quest)?;
        }
        Ok(())
    }

    /// Whether a quest id is already registered.
    pub fn contains(&self, id: QuestId) -> bool {
        self.quests.contains_key(&id)
    }

    /// Phase 2: Validate every objective and freeze the catalog.
    pub fn build(self) -> Catalog {
        let quests = self
            .quests
            .into_iter()
            .map(|(id, mut quest)| {
                quest.validate();
                warn_unreachable(&quest);
                (id, Arc::new(quest))
            })
            .collect();
        Catalog { quests }
    }
}

/// Objectives that can never progress are legal, but almost always an
/// authoring mistake.
fn warn_unreachable(quest: &QuestDef) {
    for (index, objective) in quest.objectives.iter().enumerate() {
        let stuck = match objective.objective_type {
            ObjectiveType::TriggerFlags => objective.required_flags.is_empty(),
            ObjectiveType::Delivery => false,
            _ => objective.target_ids.is_empty(),
        };
        if stuck && !objective.optional {
            tracing::warn!(
                quest = %quest.id,
                objective = index,
                name = %objective.display_name,
                kind = ?objective.objective_type,
                "mandatory objective can never complete"
            );
        }
    }
}

/// Immutable quest catalog. Frozen after [`CatalogBuilder::build`]; share it
/// behind an `Arc`.
#[derive(Debug, Default)]
pub struct Catalog {
    quests: BTreeMap<QuestId, Arc<QuestDef>>,
}

impl Catalog {
    /// Shorthand for building a catalog from definitions.
    pub fn from_quests(quests: impl IntoIterator<Item = QuestDef>) -> Result<Self, CatalogError> {
        let mut builder = CatalogBuilder::new();
        builder.register_all(quests)?;
        Ok(builder.build())
    }

    pub fn get(&self, id: QuestId) -> Option<&Arc<QuestDef>> {
        self.quests.get(&id)
    }

    pub fn contains(&self, id: QuestId) -> bool {
        self.quests.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    /// Quest ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = QuestId> + '_ {
        self.quests.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<QuestDef>> {
        self.quests.values()
    }
}
