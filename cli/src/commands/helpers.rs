use anyhow::{Context, Result, bail};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use recipebox_core::editor::IngredientField;
use recipebox_core::models::{Recipe, ScaledIngredient};

/// An ingredient as given on the command line, still in text form so the
/// editor does the amount parsing.
#[derive(Debug, PartialEq)]
pub(crate) struct IngredientArg {
    pub name: String,
    pub amount: String,
    pub unit: String,
}

/// Parse `NAME=AMOUNT [UNIT]`, e.g. "Spaghetti=400 g", "Flour=2.5cups", "Eggs=4".
pub(crate) fn parse_ingredient_arg(s: &str) -> Result<IngredientArg> {
    let (name, quantity) = s
        .rsplit_once('=')
        .with_context(|| format!("Invalid ingredient '{s}'. Use NAME=AMOUNT [UNIT]"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid ingredient '{s}': name is empty");
    }

    let quantity = quantity.trim();
    let (amount, unit) = if let Some((amount, unit)) = quantity.split_once(char::is_whitespace) {
        (amount, unit.trim())
    } else if let Some((amount, unit)) = split_number_unit(quantity) {
        (amount, unit)
    } else {
        (quantity, "")
    };
    if amount.is_empty() {
        bail!("Invalid ingredient '{s}': amount is empty");
    }

    Ok(IngredientArg {
        name: name.to_string(),
        amount: amount.to_string(),
        unit: unit.to_string(),
    })
}

/// Split "500ml" or "2.5tbsp" into ("500", "ml") or ("2.5", "tbsp").
fn split_number_unit(s: &str) -> Option<(&str, &str)> {
    let idx = s.find(|c: char| c.is_alphabetic())?;
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    num_part.parse::<f64>().ok()?;
    Some((num_part, unit_part))
}

/// A single field edit, `INDEX.FIELD=VALUE` with a 1-based index,
/// e.g. "2.amount=300" or "1.name=Bucatini".
#[derive(Debug, PartialEq)]
pub(crate) struct FieldEdit {
    pub index: usize,
    pub field: IngredientField,
    pub value: String,
}

pub(crate) fn parse_field_edit(s: &str) -> Result<FieldEdit> {
    let (target, value) = s
        .split_once('=')
        .with_context(|| format!("Invalid edit '{s}'. Use INDEX.FIELD=VALUE"))?;
    let (index, field) = target
        .split_once('.')
        .with_context(|| format!("Invalid edit '{s}'. Use INDEX.FIELD=VALUE"))?;
    let index = parse_position(index)?;
    let field: IngredientField = field.parse()?;
    Ok(FieldEdit {
        index,
        field,
        value: value.to_string(),
    })
}

/// Parse a 1-based ingredient position into a 0-based index.
pub(crate) fn parse_position(s: &str) -> Result<usize> {
    let n: usize = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid ingredient position: '{s}'"))?;
    if n == 0 {
        bail!("Ingredient positions start at 1");
    }
    Ok(n - 1)
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Portions")]
        portions: u32,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: truncate(&r.id, 12),
            name: truncate(&r.name, 35),
            portions: r.portions,
            ingredients: r.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_ingredient_table(ingredients: &[ScaledIngredient], scaled: bool) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .enumerate()
        .map(|(i, ing)| IngredientRow {
            idx: i + 1,
            name: truncate(&ing.name, 35),
            amount: if scaled {
                format_amount(ing.scaled_amount)
            } else {
                format_amount(ing.amount)
            },
            unit: ing.unit.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Up to two decimals, without trailing zeros: 400 -> "400", 0.5 -> "0.5".
pub(crate) fn format_amount(v: f64) -> String {
    let s = format!("{:.2}", no_neg_zero(v));
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient_arg_with_space() {
        let arg = parse_ingredient_arg("Spaghetti=400 g").unwrap();
        assert_eq!(
            arg,
            IngredientArg {
                name: "Spaghetti".to_string(),
                amount: "400".to_string(),
                unit: "g".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_ingredient_arg_attached_unit() {
        let arg = parse_ingredient_arg("Milk=2.5cups").unwrap();
        assert_eq!(arg.amount, "2.5");
        assert_eq!(arg.unit, "cups");
    }

    #[test]
    fn test_parse_ingredient_arg_no_unit() {
        let arg = parse_ingredient_arg(" Eggs = 4 ").unwrap();
        assert_eq!(arg.name, "Eggs");
        assert_eq!(arg.amount, "4");
        assert_eq!(arg.unit, "");
    }

    #[test]
    fn test_parse_ingredient_arg_multiword_unit() {
        let arg = parse_ingredient_arg("Lettuce=1 small head").unwrap();
        assert_eq!(arg.unit, "small head");
    }

    #[test]
    fn test_parse_ingredient_arg_invalid() {
        assert!(parse_ingredient_arg("Spaghetti").is_err());
        assert!(parse_ingredient_arg("=400 g").is_err());
        assert!(parse_ingredient_arg("Salt=").is_err());
    }

    #[test]
    fn test_parse_field_edit() {
        let edit = parse_field_edit("2.amount=300").unwrap();
        assert_eq!(edit.index, 1);
        assert_eq!(edit.field, IngredientField::Amount);
        assert_eq!(edit.value, "300");

        let edit = parse_field_edit("1.name=Bucatini").unwrap();
        assert_eq!(edit.index, 0);
        assert_eq!(edit.field, IngredientField::Name);
    }

    #[test]
    fn test_parse_field_edit_invalid() {
        assert!(parse_field_edit("amount=300").is_err());
        assert!(parse_field_edit("0.amount=300").is_err());
        assert!(parse_field_edit("1.colour=red").is_err());
        assert!(parse_field_edit("1.amount").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(400.0), "400");
        assert_eq!(format_amount(0.5), "0.5");
        assert_eq!(format_amount(133.333_333), "133.33");
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(-0.0), "0");
        assert_eq!(format_amount(0.001), "0");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), r#"{"error":"nope"}"#);
    }
}
