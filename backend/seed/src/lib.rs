//! # Seeding
//!
//! Loads menus, their foods, and tables from a JSON fixture:
//!
//! ```json
//! {
//!   "menus": [
//!     {
//!       "name": "Dinner",
//!       "category": "Mains",
//!       "foods": [{ "name": "Pho", "price": 12.5, "food_image": "pho.png" }]
//!     }
//!   ],
//!   "tables": [{ "number_of_guests": 4, "table_number": 1 }]
//! }
//! ```
//!
//! Every entry goes through the same validation as the HTTP API and gets a
//! fresh business id. The whole fixture is validated before the first write, so
//! a bad entry leaves the store untouched.
use std::{fmt, fs::read_to_string, path::Path};

use anyhow::Context;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use ledger::{
    Collection, Store, encode,
    models::{Food, Menu, Table},
};
use tracing::{debug, info};

pub mod models;
pub mod utils;

use models::Fixture;
use utils::tidy_field;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub menus: usize,
    pub foods: usize,
    pub tables: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inserted Menus: {}", self.menus)?;
        writeln!(f, "Inserted Foods: {}", self.foods)?;
        write!(f, "Inserted Tables: {}", self.tables)
    }
}

pub fn load_fixture(path: &Path) -> anyhow::Result<Fixture> {
    let raw = read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;

    serde_json::from_str(&raw).with_context(|| format!("Invalid fixture {}", path.display()))
}

struct Prepared {
    menus: Vec<(Menu, Vec<Food>)>,
    tables: Vec<Table>,
}

fn prepare(fixture: Fixture, now: DateTime<Utc>) -> anyhow::Result<Prepared> {
    let mut menus = Vec::with_capacity(fixture.menus.len());

    for (index, entry) in fixture.menus.into_iter().enumerate() {
        let mut input = entry.menu;
        tidy_field(&mut input.name);
        tidy_field(&mut input.category);

        let menu = input
            .into_menu(now)
            .with_context(|| format!("menus[{index}]"))?;

        let foods = entry
            .foods
            .into_iter()
            .enumerate()
            .map(|(food_index, mut food)| {
                tidy_field(&mut food.name);
                food.menu_id = Some(menu.menu_id.clone());

                food.into_food(now)
                    .with_context(|| format!("menus[{index}].foods[{food_index}]"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        menus.push((menu, foods));
    }

    let tables = fixture
        .tables
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            table
                .into_table(now)
                .with_context(|| format!("tables[{index}]"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Prepared { menus, tables })
}

fn encode_all<T: serde::Serialize>(values: &[T]) -> anyhow::Result<Vec<mongodb::bson::Document>> {
    values
        .iter()
        .map(|value| encode(value).map_err(anyhow::Error::from))
        .collect()
}

pub async fn seed(
    store: &dyn Store,
    fixture: Fixture,
    now: DateTime<Utc>,
) -> anyhow::Result<Summary> {
    let prepared = prepare(fixture, now)?;
    let mut summary = Summary::default();

    let pb = ProgressBar::new((prepared.menus.len() + 1) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    for (menu, foods) in &prepared.menus {
        pb.set_message(format!("Menu {}", menu.name));

        store.insert_one(Collection::Menu, encode(menu)?).await?;
        summary.menus += 1;

        if !foods.is_empty() {
            let ids = store
                .insert_many(Collection::Food, encode_all(foods)?)
                .await?;
            summary.foods += ids.len();
        }

        debug!("Seeded menu {} with {} foods", menu.menu_id, foods.len());
        pb.inc(1);
    }

    pb.set_message("Tables");
    if !prepared.tables.is_empty() {
        let ids = store
            .insert_many(Collection::Table, encode_all(&prepared.tables)?)
            .await?;
        summary.tables = ids.len();
    }
    pb.inc(1);

    pb.finish_with_message("Done");
    info!(
        "Seeded {} menus, {} foods, {} tables",
        summary.menus, summary.foods, summary.tables
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ledger::{MemoryStore, decode_all};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn fixture(json: &str) -> Fixture {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_seed_links_foods_to_menus() {
        let store = MemoryStore::new();
        let fixture = fixture(
            r#"{
                "menus": [
                    {
                        "name": "  Late   Dinner ",
                        "category": "Mains",
                        "foods": [
                            { "name": "Pho", "price": 12.499, "food_image": "pho.png" },
                            { "name": "Ramen", "price": 11, "food_image": "ramen.png" }
                        ]
                    },
                    { "name": "Drinks", "category": "Bar" }
                ],
                "tables": [
                    { "number_of_guests": 4, "table_number": 1 },
                    { "number_of_guests": 2, "table_number": 2 }
                ]
            }"#,
        );

        let summary = seed(&store, fixture, now()).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                menus: 2,
                foods: 2,
                tables: 2
            }
        );

        let menus: Vec<Menu> = decode_all(store.find_all(Collection::Menu).await.unwrap()).unwrap();
        assert_eq!(menus[0].name, "Late Dinner");

        let foods: Vec<Food> = decode_all(store.find_all(Collection::Food).await.unwrap()).unwrap();
        assert!(foods.iter().all(|food| food.menu_id == menus[0].menu_id));
        assert_eq!(foods[0].price, 12.5);
        assert_eq!(foods[0].created_at, now());
    }

    #[tokio::test]
    async fn test_invalid_entry_writes_nothing() {
        let store = MemoryStore::new();
        let fixture = fixture(
            r#"{
                "menus": [
                    {
                        "name": "Dinner",
                        "category": "Mains",
                        "foods": [{ "name": "P", "price": 1, "food_image": "p.png" }]
                    }
                ],
                "tables": [{ "number_of_guests": 4, "table_number": 1 }]
            }"#,
        );

        let err = seed(&store, fixture, now()).await.unwrap_err();
        assert!(err.to_string().contains("menus[0].foods[0]"));

        assert_eq!(store.len(Collection::Menu).await, 0);
        assert_eq!(store.len(Collection::Table).await, 0);
    }

    #[tokio::test]
    async fn test_empty_fixture() {
        let store = MemoryStore::new();
        let summary = seed(&store, Fixture::default(), now()).await.unwrap();

        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_summary_display() {
        let summary = Summary {
            menus: 1,
            foods: 3,
            tables: 2,
        };
        assert_eq!(
            summary.to_string(),
            "Inserted Menus: 1\nInserted Foods: 3\nInserted Tables: 2"
        );
    }
}
