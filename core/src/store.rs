use anyhow::Result;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    ImportSummary, Recipe, decode_collection, encode_collection, seed_recipes, validate_id,
    validate_recipe,
};
use crate::storage::RecipeStorage;

/// Where the in-memory collection came from when the store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Stored,
    SeededMissing,
    SeededEmpty,
    SeededCorrupt,
}

impl LoadOutcome {
    pub fn is_seeded(self) -> bool {
        !matches!(self, Self::Stored)
    }
}

/// Owns the canonical recipe collection and writes it back after every change.
pub struct RecipeStore<S: RecipeStorage> {
    storage: S,
    recipes: Vec<Recipe>,
    outcome: LoadOutcome,
}

impl<S: RecipeStorage> RecipeStore<S> {
    /// Load the collection from `storage`, falling back to the seed set when
    /// nothing usable is stored. Nothing is written during load.
    pub fn open(storage: S) -> Result<Self> {
        let (recipes, outcome) = match storage.load()? {
            None => {
                debug!("no stored recipes, using seed set");
                (seed_recipes(), LoadOutcome::SeededMissing)
            }
            Some(raw) => match decode_collection(&raw) {
                Ok(recipes) if recipes.is_empty() => {
                    debug!("stored recipe list is empty, using seed set");
                    (seed_recipes(), LoadOutcome::SeededEmpty)
                }
                Ok(recipes) => {
                    debug!(count = recipes.len(), "loaded stored recipes");
                    (recipes, LoadOutcome::Stored)
                }
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "stored recipes are unreadable, using seed set");
                    (seed_recipes(), LoadOutcome::SeededCorrupt)
                }
            },
        };

        Ok(Self {
            storage,
            recipes,
            outcome,
        })
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.outcome
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Write the collection to storage. An empty collection is never
    /// written; returns whether a write happened.
    pub fn persist(&self) -> Result<bool> {
        if self.recipes.is_empty() {
            debug!("recipe collection is empty, not persisting");
            return Ok(false);
        }
        let contents = encode_collection(&self.recipes)?;
        self.storage.save(&contents)?;
        debug!(count = self.recipes.len(), "persisted recipes");
        Ok(true)
    }

    /// Replace the recipe with the same id, or append it under a fresh id
    /// when it has none. Returns the stored recipe.
    pub fn save(&mut self, recipe: Recipe) -> Result<Recipe> {
        let previous = self.recipes.clone();
        let saved = self.merge(recipe)?.0;
        if let Err(err) = self.persist() {
            self.recipes = previous;
            return Err(err);
        }
        Ok(saved)
    }

    /// Remove the recipe with `id`. Unknown ids are not an error.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.recipes.len();
        self.recipes.retain(|r| r.id != id);
        let removed = self.recipes.len() != before;
        if removed {
            info!(id, "deleted recipe");
        } else {
            debug!(id, "delete of unknown recipe id ignored");
        }
        self.persist()?;
        Ok(removed)
    }

    /// Pretty-printed JSON of the full collection.
    pub fn export(&self) -> Result<String> {
        encode_collection(&self.recipes)
    }

    /// Merge every recipe with save semantics, then persist once.
    ///
    /// Either every recipe is merged and written, or the collection is left
    /// exactly as it was.
    pub fn import(&mut self, recipes: Vec<Recipe>) -> Result<ImportSummary> {
        for recipe in &recipes {
            validate_id(&recipe.id)?;
            validate_recipe(recipe)?;
        }

        let previous = self.recipes.clone();
        let summary = match self.merge_all(recipes) {
            Ok(summary) => summary,
            Err(err) => {
                self.recipes = previous;
                return Err(err);
            }
        };
        if let Err(err) = self.persist() {
            self.recipes = previous;
            return Err(err);
        }
        info!(
            created = summary.created,
            updated = summary.updated,
            "imported recipes"
        );
        Ok(summary)
    }

    fn merge_all(&mut self, recipes: Vec<Recipe>) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        for recipe in recipes {
            if self.merge(recipe)?.1 {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }
        Ok(summary)
    }

    /// Returns the stored recipe and whether it was appended.
    fn merge(&mut self, mut recipe: Recipe) -> Result<(Recipe, bool)> {
        validate_id(&recipe.id)?;
        validate_recipe(&recipe)?;

        if recipe.id.is_empty() {
            recipe.id = self.next_id();
            self.recipes.push(recipe.clone());
            info!(id = %recipe.id, name = %recipe.name, "created recipe");
            return Ok((recipe, true));
        }

        if let Some(existing) = self.recipes.iter_mut().find(|r| r.id == recipe.id) {
            *existing = recipe.clone();
            info!(id = %recipe.id, name = %recipe.name, "updated recipe");
            return Ok((recipe, false));
        }

        self.recipes.push(recipe.clone());
        info!(id = %recipe.id, name = %recipe.name, "added recipe with caller-supplied id");
        Ok((recipe, true))
    }

    fn next_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}
