mod export;
mod helpers;
mod import;
mod recipe;

pub(crate) use export::cmd_export;
pub(crate) use import::cmd_import;
pub(crate) use recipe::{
    RecipeChanges, Store, cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_list, cmd_recipe_new,
    cmd_recipe_show,
};
