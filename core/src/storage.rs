use std::cell::{Cell, RefCell};

use anyhow::Result;

/// Key under which the serialized recipe collection is kept.
pub const RECIPES_KEY: &str = "recipes";

/// Persistence behind a [`RecipeStore`](crate::store::RecipeStore).
///
/// Implementations hold one text value under [`RECIPES_KEY`]; encoding and
/// decoding of the collection happen in the store.
pub trait RecipeStorage {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, contents: &str) -> Result<()>;
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    value: RefCell<Option<String>>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            value: RefCell::new(Some(value.to_string())),
            writes: Cell::new(0),
        }
    }

    pub fn value(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// Number of `save` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl RecipeStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.value.borrow().clone())
    }

    fn save(&self, contents: &str) -> Result<()> {
        *self.value.borrow_mut() = Some(contents.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl<S: RecipeStorage + ?Sized> RecipeStorage for &S {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, contents: &str) -> Result<()> {
        (**self).save(contents)
    }
}
