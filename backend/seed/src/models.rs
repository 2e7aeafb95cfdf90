use ledger::models::{FoodInput, MenuInput, TableInput};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub menus: Vec<MenuFixture>,
    #[serde(default)]
    pub tables: Vec<TableInput>,
}

/// A menu and the foods served on it. Foods get the menu's id once it exists.
#[derive(Debug, Default, Deserialize)]
pub struct MenuFixture {
    #[serde(flatten)]
    pub menu: MenuInput,
    #[serde(default)]
    pub foods: Vec<FoodInput>,
}
