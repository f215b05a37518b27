use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::models::{
    Ingredient, Recipe, ScaledIngredient, scale_ingredients, validate_amount, validate_portions,
    validate_recipe,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientField {
    Name,
    Amount,
    Unit,
}

impl FromStr for IngredientField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "amount" => Ok(Self::Amount),
            "unit" => Ok(Self::Unit),
            other => bail!("Unknown ingredient field '{other}'. Use name, amount or unit"),
        }
    }
}

impl fmt::Display for IngredientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Amount => "amount",
            Self::Unit => "unit",
        };
        f.write_str(s)
    }
}

/// Working copy of a recipe. Nothing reaches the store until [`save`](Self::save).
#[derive(Debug, Clone)]
pub struct RecipeEditor {
    original: Recipe,
    name: String,
    ingredients: Vec<Ingredient>,
    portions: u32,
}

impl RecipeEditor {
    pub fn new(recipe: &Recipe) -> Self {
        Self {
            original: recipe.clone(),
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            portions: recipe.portions,
        }
    }

    pub fn blank() -> Self {
        Self::new(&Recipe::blank())
    }

    pub fn id(&self) -> &str {
        &self.original.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn portions(&self) -> u32 {
        self.portions
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_portions(&mut self, portions: u32) -> Result<()> {
        validate_portions(portions)?;
        self.portions = portions;
        Ok(())
    }

    /// Append a blank ingredient and return its index.
    pub fn add_ingredient(&mut self) -> usize {
        self.ingredients.push(Ingredient::empty());
        self.ingredients.len() - 1
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Result<Ingredient> {
        self.check_index(index)?;
        Ok(self.ingredients.remove(index))
    }

    /// Set one field of one ingredient from its text form.
    pub fn set_ingredient_field(
        &mut self,
        index: usize,
        field: IngredientField,
        value: &str,
    ) -> Result<()> {
        self.check_index(index)?;
        let amount = if field == IngredientField::Amount {
            let amount: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid amount: '{value}'"))?;
            validate_amount(amount)?;
            Some(amount)
        } else {
            None
        };

        let ingredient = &mut self.ingredients[index];
        match field {
            IngredientField::Name => ingredient.name = value.to_string(),
            IngredientField::Unit => ingredient.unit = value.to_string(),
            IngredientField::Amount => {
                if let Some(amount) = amount {
                    ingredient.amount = amount;
                }
            }
        }
        Ok(())
    }

    /// Amounts for `target` portions, relative to the draft's current portions.
    pub fn scale(&self, target: u32) -> Result<Vec<ScaledIngredient>> {
        scale_ingredients(&self.ingredients, self.portions, target)
    }

    pub fn is_dirty(&self) -> bool {
        self.name != self.original.name
            || self.portions != self.original.portions
            || self.ingredients != self.original.ingredients
    }

    /// The draft merged onto the original recipe's id.
    pub fn save(self) -> Result<Recipe> {
        let recipe = Recipe {
            id: self.original.id,
            name: self.name,
            ingredients: self.ingredients,
            portions: self.portions,
        };
        validate_recipe(&recipe)?;
        Ok(recipe)
    }

    pub fn cancel(self) {
        debug!(id = %self.original.id, dirty = self.is_dirty(), "discarded recipe draft");
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.ingredients.len() {
            bail!(
                "No ingredient at position {} (recipe has {})",
                index + 1,
                self.ingredients.len()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seed_recipes;
    use crate::storage::MemoryStorage;
    use crate::store::RecipeStore;

    fn carbonara() -> Recipe {
        seed_recipes().into_iter().next().unwrap()
    }

    #[test]
    fn test_blank_draft() {
        let editor = RecipeEditor::blank();
        assert_eq!(editor.id(), "");
        assert_eq!(editor.name(), "");
        assert!(editor.ingredients().is_empty());
        assert_eq!(editor.portions(), 1);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_add_ingredient_appends_blank() {
        let mut editor = RecipeEditor::new(&carbonara());
        let index = editor.add_ingredient();
        assert_eq!(index, 5);
        assert_eq!(editor.ingredients()[index], Ingredient::empty());
        assert!(editor.is_dirty());
    }

    #[test]
    fn test_remove_ingredient_shifts() {
        let mut editor = RecipeEditor::new(&carbonara());
        let removed = editor.remove_ingredient(1).unwrap();
        assert_eq!(removed.name, "Pancetta");
        let names: Vec<&str> = editor.ingredients().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Spaghetti", "Eggs", "Parmesan cheese", "Black pepper"]);
        assert_eq!(editor.name(), "Spaghetti Carbonara");
        assert_eq!(editor.portions(), 4);
    }

    #[test]
    fn test_remove_ingredient_out_of_range() {
        let mut editor = RecipeEditor::new(&carbonara());
        assert!(editor.remove_ingredient(5).is_err());
        assert_eq!(editor.ingredients().len(), 5);
    }

    #[test]
    fn test_set_ingredient_field_touches_one_field() {
        let original = carbonara();
        let mut editor = RecipeEditor::new(&original);
        editor
            .set_ingredient_field(2, IngredientField::Amount, "6")
            .unwrap();

        for (i, (ing, orig)) in editor.ingredients().iter().zip(&original.ingredients).enumerate() {
            if i == 2 {
                assert_eq!(ing.amount, 6.0);
                assert_eq!(ing.name, orig.name);
                assert_eq!(ing.unit, orig.unit);
            } else {
                assert_eq!(ing, orig);
            }
        }
    }

    #[test]
    fn test_set_ingredient_name_and_unit() {
        let mut editor = RecipeEditor::blank();
        let index = editor.add_ingredient();
        editor
            .set_ingredient_field(index, IngredientField::Name, "Rice")
            .unwrap();
        editor
            .set_ingredient_field(index, IngredientField::Unit, "g")
            .unwrap();
        assert_eq!(editor.ingredients()[0], Ingredient::new("Rice", 0.0, "g"));
    }

    #[test]
    fn test_set_ingredient_amount_invalid() {
        let mut editor = RecipeEditor::new(&carbonara());
        assert!(editor.set_ingredient_field(0, IngredientField::Amount, "lots").is_err());
        assert!(editor.set_ingredient_field(0, IngredientField::Amount, "-3").is_err());
        assert!(editor.set_ingredient_field(9, IngredientField::Name, "x").is_err());
        assert_eq!(editor.ingredients()[0].amount, 400.0);
    }

    #[test]
    fn test_ingredient_field_from_str() {
        assert_eq!("Amount".parse::<IngredientField>().unwrap(), IngredientField::Amount);
        assert_eq!(" unit ".parse::<IngredientField>().unwrap(), IngredientField::Unit);
        assert!("colour".parse::<IngredientField>().is_err());
        assert_eq!(IngredientField::Name.to_string(), "name");
    }

    #[test]
    fn test_set_portions_rejects_zero() {
        let mut editor = RecipeEditor::new(&carbonara());
        assert!(editor.set_portions(0).is_err());
        assert_eq!(editor.portions(), 4);
    }

    #[test]
    fn test_scale_identity_and_linearity() {
        let editor = RecipeEditor::new(&carbonara());
        let base = editor.scale(editor.portions()).unwrap();
        for (s, ing) in base.iter().zip(editor.ingredients()) {
            assert_eq!(s.scaled_amount, ing.amount);
        }
        let double = editor.scale(editor.portions() * 2).unwrap();
        for (d, s) in double.iter().zip(&base) {
            assert!((d.scaled_amount - 2.0 * s.scaled_amount).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scale_uses_current_portions() {
        let mut editor = RecipeEditor::new(&carbonara());
        editor.set_portions(2).unwrap();
        // 400g was entered for 2 portions now, so 4 portions doubles it
        let scaled = editor.scale(4).unwrap();
        assert!((scaled[0].scaled_amount - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_does_not_mutate_draft() {
        let editor = RecipeEditor::new(&carbonara());
        editor.scale(12).unwrap();
        assert_eq!(editor.portions(), 4);
        assert_eq!(editor.ingredients()[0].amount, 400.0);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_save_keeps_original_id() {
        let mut editor = RecipeEditor::new(&carbonara());
        editor.set_name("Carbonara for two");
        editor.set_portions(2).unwrap();
        let recipe = editor.save().unwrap();
        assert_eq!(recipe.id, "1");
        assert_eq!(recipe.name, "Carbonara for two");
        assert_eq!(recipe.portions, 2);
        assert_eq!(recipe.ingredients[0].amount, 400.0);
    }

    #[test]
    fn test_save_rejects_blank_ingredient() {
        let mut editor = RecipeEditor::new(&carbonara());
        editor.add_ingredient();
        assert!(editor.save().is_err());
    }

    #[test]
    fn test_new_recipe_flow_through_store() {
        let mut store = RecipeStore::open(MemoryStorage::new()).unwrap();
        let mut editor = RecipeEditor::blank();
        editor.set_name("Omelette");
        let index = editor.add_ingredient();
        editor
            .set_ingredient_field(index, IngredientField::Name, "Eggs")
            .unwrap();
        editor
            .set_ingredient_field(index, IngredientField::Amount, "3")
            .unwrap();

        let saved = store.save(editor.save().unwrap()).unwrap();
        assert!(!saved.id.is_empty());
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(&saved.id).unwrap().ingredients[0].amount, 3.0);
    }

    #[test]
    fn test_cancel_leaves_store_untouched() {
        let store = RecipeStore::open(MemoryStorage::new()).unwrap();
        let mut editor = RecipeEditor::new(store.get("2").unwrap());
        editor.set_name("Changed");
        editor.cancel();
        assert_eq!(store.get("2").unwrap().name, "Classic Caesar Salad");
        assert_eq!(store.storage().writes(), 0);
    }
}
