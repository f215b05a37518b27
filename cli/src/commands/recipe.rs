use anyhow::Result;
use std::process;

use recipebox_core::db::Database;
use recipebox_core::editor::{IngredientField, RecipeEditor};
use recipebox_core::models::{Recipe, ScaledRecipe};
use recipebox_core::storage::RECIPES_KEY;
use recipebox_core::store::RecipeStore;

use super::helpers::{
    json_error, parse_field_edit, parse_ingredient_arg, parse_position,
    print_ingredient_table, print_recipe_table,
};

pub(crate) type Store = RecipeStore<Database>;

/// Changes requested by `recipebox edit`.
#[derive(Default)]
pub(crate) struct RecipeChanges<'a> {
    pub name: Option<&'a str>,
    pub portions: Option<u32>,
    pub set: &'a [String],
    pub remove: &'a [String],
    pub add: &'a [String],
}

fn not_found(id: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(&format!("No recipe with id '{id}'")));
    } else {
        eprintln!("No recipe with id '{id}'");
    }
    process::exit(2);
}

fn find_recipe(store: &Store, id: &str, json: bool) -> Recipe {
    match store.get(id) {
        Some(recipe) => recipe.clone(),
        None => not_found(id, json),
    }
}

/// Append `NAME=AMOUNT [UNIT]` arguments to the draft through the editor.
fn add_ingredients(editor: &mut RecipeEditor, specs: &[String]) -> Result<()> {
    for spec in specs {
        let arg = parse_ingredient_arg(spec)?;
        let index = editor.add_ingredient();
        editor.set_ingredient_field(index, IngredientField::Name, &arg.name)?;
        editor.set_ingredient_field(index, IngredientField::Amount, &arg.amount)?;
        editor.set_ingredient_field(index, IngredientField::Unit, &arg.unit)?;
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(store: &Store, json: bool) -> Result<()> {
    let recipes = store.recipes();
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(recipes)?);
        return Ok(());
    }

    print_recipe_table(recipes);
    if store.load_outcome().is_seeded() {
        eprintln!("Showing example recipes. Save or edit one to start your own collection.");
    } else if let Some(updated_at) = store.storage().value_updated_at(RECIPES_KEY)? {
        eprintln!("Last saved: {updated_at}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(
    store: &Store,
    id: &str,
    portions: Option<u32>,
    json: bool,
) -> Result<()> {
    let recipe = find_recipe(store, id, json);
    let target = portions.unwrap_or(recipe.portions);
    let scaled = ScaledRecipe::from_recipe(&recipe, target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scaled)?);
        return Ok(());
    }

    let name = &scaled.name;
    let base = scaled.portions;
    println!("=== {name} ===");
    if target == base {
        println!("  Portions: {base}  |  ID: {}\n", scaled.id);
    } else {
        println!("  Scaled to {target} portions (recipe makes {base})  |  ID: {}\n", scaled.id);
    }

    if scaled.ingredients.is_empty() {
        println!("  No ingredients yet");
    } else {
        print_ingredient_table(&scaled.ingredients, target != base);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_new(
    store: &mut Store,
    name: &str,
    portions: u32,
    ingredients: &[String],
    json: bool,
) -> Result<()> {
    let mut editor = RecipeEditor::blank();
    editor.set_name(name);
    editor.set_portions(portions)?;
    add_ingredients(&mut editor, ingredients)?;

    let recipe = store.save(editor.save()?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let id = &recipe.id;
        let count = recipe.ingredients.len();
        println!("Created recipe: {name} (id: {id}, portions: {portions}, {count} ingredients)");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_edit(
    store: &mut Store,
    id: &str,
    changes: &RecipeChanges<'_>,
    json: bool,
) -> Result<()> {
    let recipe = find_recipe(store, id, json);
    let mut editor = RecipeEditor::new(&recipe);

    if let Some(name) = changes.name {
        editor.set_name(name);
    }
    if let Some(portions) = changes.portions {
        editor.set_portions(portions)?;
    }

    // Field edits and removals refer to positions before anything is added
    for raw in changes.set {
        let edit = parse_field_edit(raw)?;
        editor.set_ingredient_field(edit.index, edit.field, &edit.value)?;
    }

    let mut removals = changes
        .remove
        .iter()
        .map(|s| parse_position(s))
        .collect::<Result<Vec<_>>>()?;
    removals.sort_unstable();
    removals.dedup();
    for index in removals.into_iter().rev() {
        editor.remove_ingredient(index)?;
    }

    add_ingredients(&mut editor, changes.add)?;

    if !editor.is_dirty() {
        editor.cancel();
        if json {
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        } else {
            println!("No changes to {}", recipe.name);
        }
        return Ok(());
    }

    let saved = store.save(editor.save()?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
    } else {
        let name = &saved.name;
        let portions = saved.portions;
        let count = saved.ingredients.len();
        println!("Updated {name} ({portions} portions, {count} ingredients)");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(store: &mut Store, id: &str, json: bool) -> Result<()> {
    let name = store.get(id).map(|r| r.name.clone());
    let deleted = store.delete(id)?;

    if json {
        println!("{}", serde_json::json!({ "id": id, "deleted": deleted }));
    } else if let Some(name) = name {
        println!("Deleted {name} (id: {id})");
    } else {
        eprintln!("No recipe with id '{id}', nothing deleted");
    }
    if store.is_empty() {
        eprintln!(
            "Note: the collection is now empty. Empty collections are not saved, so the previous recipes will return next time."
        );
    }
    Ok(())
}
