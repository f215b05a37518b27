use anyhow::{Context, Result, bail};
use std::path::Path;

use recipebox_core::editor::{IngredientField, RecipeEditor};
use recipebox_core::models::{Recipe, decode_collection};

use super::recipe::Store;

pub(crate) fn cmd_import(
    store: &mut Store,
    file: &Path,
    name_override: Option<String>,
    portions_override: Option<u32>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let is_cooklang = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("cook"));

    if is_cooklang {
        let recipe = cooklang_to_recipe(&input, file, name_override, portions_override)?;
        let saved = store.save(recipe)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&saved)?);
        } else {
            let name = &saved.name;
            let id = &saved.id;
            let count = saved.ingredients.len();
            let portions = saved.portions;
            println!("Imported recipe: {name} (id: {id}, {count} ingredients, {portions} portions)");
        }
        return Ok(());
    }

    if name_override.is_some() || portions_override.is_some() {
        bail!("--name and --portions only apply to Cooklang (.cook) files");
    }

    let recipes = decode_collection(&input)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    let summary = store.import(recipes)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let created = summary.created;
        let updated = summary.updated;
        println!("Imported {created} new and {updated} updated recipes");
    }
    Ok(())
}

fn cooklang_to_recipe(
    input: &str,
    file: &Path,
    name_override: Option<String>,
    portions_override: Option<u32>,
) -> Result<Recipe> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let name = name_override
        .or_else(|| recipe_data.metadata.title().map(String::from))
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe name. Use --name to specify one")?;

    let portions = match portions_override {
        Some(p) => p,
        None => recipe_data
            .metadata
            .servings()
            .and_then(|s| s.as_number().map(f64::from))
            .map_or(Ok(1), portions_from_servings)?,
    };

    let converter = cooklang::Converter::default();
    let grouped = recipe_data.group_ingredients(&converter);
    if grouped.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let mut editor = RecipeEditor::blank();
    editor.set_name(&name);
    editor.set_portions(portions)?;
    for gi in &grouped {
        let (amount, unit) = cooklang_quantity(gi);
        let ing_name = gi.ingredient.display_name().to_string();
        let index = editor.add_ingredient();
        editor.set_ingredient_field(index, IngredientField::Name, &ing_name)?;
        editor.set_ingredient_field(index, IngredientField::Amount, &amount.to_string())?;
        editor.set_ingredient_field(index, IngredientField::Unit, &unit)?;
    }
    editor.save()
}

/// First quantity of a grouped ingredient as `(amount, unit)`.
/// Text quantities that are not numbers become 0 with a warning.
fn cooklang_quantity(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> (f64, String) {
    gi.quantity
        .iter()
        .next()
        .map_or((0.0, String::new()), |qty: &cooklang::Quantity| {
            let amount = match qty.value() {
                cooklang::Value::Number(n) => n.value(),
                cooklang::Value::Range { start, .. } => start.value(),
                cooklang::Value::Text(t) => t.trim().parse::<f64>().unwrap_or_else(|_| {
                    let ing_name = gi.ingredient.display_name();
                    eprintln!("Warning: Non-numeric quantity '{t}' for {ing_name}, using 0");
                    0.0
                }),
            };
            let unit = qty.unit().map(String::from).unwrap_or_default();
            (amount, unit)
        })
}

#[allow(clippy::cast_sign_loss)]
fn portions_from_servings(servings: f64) -> Result<u32> {
    if !servings.is_finite() || servings < 1.0 || servings > f64::from(u32::MAX) {
        bail!("Recipe servings must be at least 1 (got {servings})");
    }
    Ok(servings.round() as u32)
}
