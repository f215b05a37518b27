use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    // Older collections were written without units
    #[serde(default)]
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: &str, amount: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
        }
    }

    /// The blank row appended by the editor.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            amount: 0.0,
            unit: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Empty until the recipe has been saved into a store.
    pub id: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    /// Base yield that the stored ingredient amounts correspond to.
    pub portions: u32,
}

impl Recipe {
    /// Template used for "add new recipe".
    pub fn blank() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            ingredients: Vec::new(),
            portions: 1,
        }
    }

    /// Ingredient amounts for `target` portions. The recipe itself is untouched.
    pub fn scaled(&self, target: u32) -> Result<Vec<ScaledIngredient>> {
        scale_ingredients(&self.ingredients, self.portions, target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledIngredient {
    pub name: String,
    pub unit: String,
    pub amount: f64,
    pub scaled_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaledRecipe {
    pub id: String,
    pub name: String,
    pub portions: u32,
    pub target_portions: u32,
    pub ingredients: Vec<ScaledIngredient>,
}

impl ScaledRecipe {
    pub fn from_recipe(recipe: &Recipe, target: u32) -> Result<Self> {
        Ok(Self {
            id: recipe.id.clone(),
            name: recipe.name.clone(),
            portions: recipe.portions,
            target_portions: target,
            ingredients: recipe.scaled(target)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

/// Compute `amount * target / base` for every ingredient.
///
/// The factor is computed once, so scaling to `base` returns the stored
/// amounts exactly.
pub fn scale_ingredients(
    ingredients: &[Ingredient],
    base: u32,
    target: u32,
) -> Result<Vec<ScaledIngredient>> {
    if base == 0 {
        bail!("Recipe portions must be greater than 0");
    }
    let factor = f64::from(target) / f64::from(base);
    Ok(ingredients
        .iter()
        .map(|ing| ScaledIngredient {
            name: ing.name.clone(),
            unit: ing.unit.clone(),
            amount: ing.amount,
            scaled_amount: ing.amount * factor,
        })
        .collect())
}

pub fn validate_portions(portions: u32) -> Result<()> {
    if portions == 0 {
        bail!("Portions must be at least 1");
    }
    Ok(())
}

pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() {
        bail!("Ingredient amount must be a finite number");
    }
    if amount < 0.0 {
        bail!("Ingredient amount must not be negative");
    }
    Ok(())
}

pub fn validate_ingredient(ingredient: &Ingredient) -> Result<()> {
    if ingredient.name.trim().is_empty() {
        bail!("Ingredient name must not be empty");
    }
    validate_amount(ingredient.amount)
}

/// An empty id means "not saved yet"; anything else must have visible characters.
pub fn validate_id(id: &str) -> Result<()> {
    if !id.is_empty() && id.trim().is_empty() {
        bail!("Recipe id must not be blank");
    }
    Ok(())
}

pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.name.trim().is_empty() {
        bail!("Recipe name must not be empty");
    }
    validate_portions(recipe.portions)?;
    for (i, ing) in recipe.ingredients.iter().enumerate() {
        validate_ingredient(ing).with_context(|| format!("Invalid ingredient #{}", i + 1))?;
    }
    Ok(())
}

/// Parse a stored or exported collection.
///
/// Everything that would break the collection invariants is an error: callers
/// decide whether to fall back (store load) or reject (import).
pub fn decode_collection(raw: &str) -> Result<Vec<Recipe>> {
    let recipes: Vec<Recipe> =
        serde_json::from_str(raw).context("Recipe collection is not a valid JSON recipe list")?;

    let mut seen = HashSet::new();
    for recipe in &recipes {
        if recipe.id.trim().is_empty() {
            bail!("Recipe '{}' has no id", recipe.name);
        }
        if !seen.insert(recipe.id.as_str()) {
            bail!("Duplicate recipe id '{}'", recipe.id);
        }
        validate_portions(recipe.portions)
            .with_context(|| format!("Invalid recipe '{}'", recipe.id))?;
        for ing in &recipe.ingredients {
            validate_amount(ing.amount)
                .with_context(|| format!("Invalid ingredient in recipe '{}'", recipe.id))?;
        }
    }
    Ok(recipes)
}

/// Pretty-printed JSON array, no envelope. Used for both storage and export.
pub fn encode_collection(recipes: &[Recipe]) -> Result<String> {
    serde_json::to_string_pretty(recipes).context("Failed to serialize recipes")
}

/// The example recipes shown when nothing usable has been stored yet.
pub fn seed_recipes() -> Vec<Recipe> {
    vec![
        Recipe {
            id: "1".to_string(),
            name: "Spaghetti Carbonara".to_string(),
            ingredients: vec![
                Ingredient::new("Spaghetti", 400.0, "g"),
                Ingredient::new("Pancetta", 150.0, "g"),
                Ingredient::new("Eggs", 4.0, "pcs"),
                Ingredient::new("Parmesan cheese", 50.0, "g"),
                Ingredient::new("Black pepper", 1.0, "tsp"),
            ],
            portions: 4,
        },
        Recipe {
            id: "2".to_string(),
            name: "Classic Caesar Salad".to_string(),
            ingredients: vec![
                Ingredient::new("Romaine lettuce", 1.0, "head"),
                Ingredient::new("Croutons", 100.0, "g"),
                Ingredient::new("Parmesan cheese", 50.0, "g"),
                Ingredient::new("Caesar dressing", 60.0, "ml"),
            ],
            portions: 2,
        },
        Recipe {
            id: "3".to_string(),
            name: "Chocolate Chip Cookies".to_string(),
            ingredients: vec![
                Ingredient::new("All-purpose flour", 280.0, "g"),
                Ingredient::new("Butter", 230.0, "g"),
                Ingredient::new("Brown sugar", 200.0, "g"),
                Ingredient::new("White sugar", 100.0, "g"),
                Ingredient::new("Eggs", 2.0, "pcs"),
                Ingredient::new("Vanilla extract", 2.0, "tsp"),
                Ingredient::new("Chocolate chips", 340.0, "g"),
            ],
            portions: 24,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbonara() -> Recipe {
        seed_recipes().into_iter().next().unwrap()
    }

    #[test]
    fn test_seed_recipes() {
        let seeds = seed_recipes();
        assert_eq!(seeds.len(), 3);
        let ids: Vec<&str> = seeds.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(seeds[2].portions, 24);
        for recipe in &seeds {
            validate_recipe(recipe).unwrap();
        }
    }

    #[test]
    fn test_scale_same_portions_is_identity() {
        let recipe = carbonara();
        let scaled = recipe.scaled(recipe.portions).unwrap();
        for (s, ing) in scaled.iter().zip(&recipe.ingredients) {
            assert_eq!(s.scaled_amount, ing.amount);
        }
    }

    #[test]
    fn test_scale_is_linear() {
        let recipe = carbonara();
        let single = recipe.scaled(recipe.portions).unwrap();
        let double = recipe.scaled(recipe.portions * 2).unwrap();
        for (d, s) in double.iter().zip(&single) {
            assert!((d.scaled_amount - 2.0 * s.scaled_amount).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scale_down() {
        let recipe = carbonara();
        let scaled = recipe.scaled(1).unwrap();
        assert!((scaled[0].scaled_amount - 100.0).abs() < 1e-9);
        assert_eq!(scaled[0].amount, 400.0);
        assert_eq!(scaled[0].unit, "g");
    }

    #[test]
    fn test_scale_zero_base_rejected() {
        let ingredients = vec![Ingredient::new("Salt", 1.0, "tsp")];
        assert!(scale_ingredients(&ingredients, 0, 4).is_err());
    }

    #[test]
    fn test_validate_recipe_zero_portions() {
        let mut recipe = carbonara();
        recipe.portions = 0;
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_recipe_empty_name() {
        let mut recipe = carbonara();
        recipe.name = "   ".to_string();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_recipe_negative_amount() {
        let mut recipe = carbonara();
        recipe.ingredients[1].amount = -5.0;
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(format!("{err:#}").contains("#2"));
    }

    #[test]
    fn test_validate_amount_non_finite() {
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
        assert!(validate_amount(0.0).is_ok());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("").is_ok());
        assert!(validate_id("42").is_ok());
        assert!(validate_id(" ").is_err());
        assert!(validate_id("\n\t").is_err());
    }

    #[test]
    fn test_validate_ingredient_blank_name() {
        assert!(validate_ingredient(&Ingredient::empty()).is_err());
    }

    #[test]
    fn test_encode_decode_preserves_order() {
        let seeds = seed_recipes();
        let raw = encode_collection(&seeds).unwrap();
        assert_eq!(decode_collection(&raw).unwrap(), seeds);
    }

    #[test]
    fn test_decode_missing_unit_defaults_empty() {
        let raw = r#"[{"id":"7","name":"Toast","ingredients":[{"name":"Bread","amount":2}],"portions":1}]"#;
        let recipes = decode_collection(raw).unwrap();
        assert_eq!(recipes[0].ingredients[0].unit, "");
        assert_eq!(recipes[0].ingredients[0].amount, 2.0);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(decode_collection(r#"{"recipes":[]}"#).is_err());
        assert!(decode_collection("not json").is_err());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(decode_collection(r#"[{"id":"1","name":"No portions","ingredients":[]}]"#).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_portions() {
        let zero = r#"[{"id":"1","name":"A","ingredients":[],"portions":0}]"#;
        let negative = r#"[{"id":"1","name":"A","ingredients":[],"portions":-2}]"#;
        assert!(decode_collection(zero).is_err());
        assert!(decode_collection(negative).is_err());
    }

    #[test]
    fn test_decode_rejects_duplicate_and_empty_ids() {
        let dup = r#"[{"id":"1","name":"A","ingredients":[],"portions":1},
                      {"id":"1","name":"B","ingredients":[],"portions":1}]"#;
        let empty = r#"[{"id":"","name":"A","ingredients":[],"portions":1}]"#;
        let blank = r#"[{"id":"  ","name":"A","ingredients":[],"portions":1}]"#;
        assert!(decode_collection(dup).is_err());
        assert!(decode_collection(empty).is_err());
        assert!(decode_collection(blank).is_err());
    }

    #[test]
    fn test_decode_empty_array() {
        assert!(decode_collection("[]").unwrap().is_empty());
    }

    #[test]
    fn test_scaled_recipe_from_recipe() {
        let recipe = carbonara();
        let scaled = ScaledRecipe::from_recipe(&recipe, 8).unwrap();
        assert_eq!(scaled.portions, 4);
        assert_eq!(scaled.target_portions, 8);
        assert!((scaled.ingredients[2].scaled_amount - 8.0).abs() < 1e-9);
    }
}
