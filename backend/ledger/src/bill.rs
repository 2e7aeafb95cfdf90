//! # Order Bill
//!
//! Read-side report joining an order's items with their food, order and table
//! documents:
//!
//! 1. match the order's items
//! 2. look up each item's food, its order, and the order's table (missing joins are kept as nulls)
//! 3. project one line per item
//! 4. group the lines, summing food prices into `payment_due`
//!
//! [`pipeline`] is the server-side form run by the MongoDB store.
//! [`compute`] produces the same bill from plain documents.
use mongodb::bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{
    models::{Portion, round_price},
    store::Collection,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(default)]
    pub payment_due: f64,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub table_number: Option<i64>,
    #[serde(default)]
    pub order_items: Vec<BillLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLine {
    pub order_id: String,
    #[serde(default)]
    pub table_number: Option<i64>,
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub food_image: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub quantity: Option<Portion>,
}

fn lookup(from: Collection, local: &str, foreign: &str, alias: &str) -> [Document; 2] {
    [
        doc! {
            "$lookup": {
                "from": from.name(),
                "localField": local,
                "foreignField": foreign,
                "as": alias,
            }
        },
        doc! {
            "$unwind": {
                "path": format!("${alias}"),
                "preserveNullAndEmptyArrays": true,
            }
        },
    ]
}

pub fn pipeline(order_id: &str) -> Vec<Document> {
    let mut stages = vec![doc! { "$match": { "order_id": order_id } }];

    stages.extend(lookup(Collection::Food, "food_id", "food_id", "food"));
    stages.extend(lookup(Collection::Order, "order_id", "order_id", "order"));
    stages.extend(lookup(Collection::Table, "order.table_id", "table_id", "table"));

    stages.push(doc! {
        "$project": {
            "_id": 0,
            "order_id": 1,
            "quantity": 1,
            "table_number": "$table.table_number",
            "amount": "$food.price",
            "price": "$food.price",
            "food_name": "$food.name",
            "food_image": "$food.food_image",
        }
    });
    stages.push(doc! {
        "$group": {
            "_id": { "order_id": "$order_id", "table_number": "$table_number" },
            "payment_due": { "$sum": "$amount" },
            "total_count": { "$sum": 1 },
            "order_items": { "$push": "$$ROOT" },
        }
    });
    stages.push(doc! {
        "$project": {
            "_id": 0,
            "payment_due": 1,
            "total_count": 1,
            "table_number": "$_id.table_number",
            "order_items": 1,
        }
    });

    stages
}

fn find<'a>(documents: &'a [Document], field: &str, id: &str) -> Option<&'a Document> {
    documents.iter().find(|doc| doc.get_str(field).ok() == Some(id))
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

fn text(document: &Document, field: &str) -> Option<String> {
    document.get_str(field).ok().map(str::to_string)
}

/// `None` when the order has no items.
pub fn compute(
    order_id: &str,
    items: &[Document],
    foods: &[Document],
    orders: &[Document],
    tables: &[Document],
) -> Option<Bill> {
    let table = find(orders, "order_id", order_id)
        .and_then(|order| order.get_str("table_id").ok())
        .and_then(|table_id| find(tables, "table_id", table_id));
    let table_number = table.and_then(|t| t.get("table_number")).and_then(as_i64);

    let order_items: Vec<BillLine> = items
        .iter()
        .filter(|item| item.get_str("order_id").ok() == Some(order_id))
        .map(|item| {
            let food = item
                .get_str("food_id")
                .ok()
                .and_then(|food_id| find(foods, "food_id", food_id));
            let price = food.and_then(|f| f.get("price")).and_then(as_f64);

            BillLine {
                order_id: order_id.to_string(),
                table_number,
                food_name: food.and_then(|f| text(f, "name")),
                food_image: food.and_then(|f| text(f, "food_image")),
                price,
                amount: price,
                quantity: item.get_str("quantity").ok().and_then(Portion::parse),
            }
        })
        .collect();

    if order_items.is_empty() {
        return None;
    }

    Some(Bill {
        payment_due: round_price(order_items.iter().filter_map(|line| line.amount).sum()),
        total_count: order_items.len() as i64,
        table_number,
        order_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (Vec<Document>, Vec<Document>, Vec<Document>, Vec<Document>) {
        let items = vec![
            doc! { "order_item_id": "i1", "order_id": "o1", "food_id": "f1", "quantity": "S" },
            doc! { "order_item_id": "i2", "order_id": "o1", "food_id": "f2", "quantity": "L" },
            doc! { "order_item_id": "i3", "order_id": "o2", "food_id": "f1", "quantity": "M" },
        ];
        let foods = vec![
            doc! { "food_id": "f1", "name": "Pho", "price": 12.5, "food_image": "pho.png" },
            doc! { "food_id": "f2", "name": "Banh Mi", "price": 7.25, "food_image": "bm.png" },
        ];
        let orders = vec![
            doc! { "order_id": "o1", "table_id": "t1" },
            doc! { "order_id": "o2" },
        ];
        let tables = vec![doc! { "table_id": "t1", "table_number": 7 }];

        (items, foods, orders, tables)
    }

    #[test]
    fn test_bill_sums_food_prices() {
        let (items, foods, orders, tables) = fixtures();
        let bill = compute("o1", &items, &foods, &orders, &tables).unwrap();

        assert_eq!(bill.payment_due, 19.75);
        assert_eq!(bill.total_count, 2);
        assert_eq!(bill.table_number, Some(7));
        assert_eq!(bill.order_items[0].food_name.as_deref(), Some("Pho"));
        assert_eq!(bill.order_items[1].quantity, Some(Portion::L));
    }

    #[test]
    fn test_bill_without_table() {
        let (items, foods, orders, tables) = fixtures();
        let bill = compute("o2", &items, &foods, &orders, &tables).unwrap();

        assert_eq!(bill.table_number, None);
        assert_eq!(bill.payment_due, 12.5);
    }

    #[test]
    fn test_bill_missing_food_contributes_nothing() {
        let (mut items, foods, orders, tables) = fixtures();
        items.push(doc! { "order_item_id": "i4", "order_id": "o1", "food_id": "gone", "quantity": "S" });

        let bill = compute("o1", &items, &foods, &orders, &tables).unwrap();

        assert_eq!(bill.total_count, 3);
        assert_eq!(bill.payment_due, 19.75);
        assert_eq!(bill.order_items[2].food_name, None);
        assert_eq!(bill.order_items[2].price, None);
    }

    #[test]
    fn test_no_items_no_bill() {
        let (items, foods, orders, tables) = fixtures();
        assert!(compute("o9", &items, &foods, &orders, &tables).is_none());
    }

    #[test]
    fn test_pipeline_stage_order() {
        let stages: Vec<String> = pipeline("o1")
            .iter()
            .map(|stage| stage.keys().next().cloned().unwrap_or_default())
            .collect();

        assert_eq!(
            stages,
            [
                "$match", "$lookup", "$unwind", "$lookup", "$unwind", "$lookup", "$unwind",
                "$project", "$group", "$project",
            ]
        );
    }

    #[test]
    fn test_pipeline_joins_table_through_order() {
        let stages = pipeline("o1");
        let table_lookup = stages[5].get_document("$lookup").unwrap();

        assert_eq!(table_lookup.get_str("from").unwrap(), "table");
        assert_eq!(table_lookup.get_str("localField").unwrap(), "order.table_id");
        assert_eq!(
            stages[0].get_document("$match").unwrap().get_str("order_id").unwrap(),
            "o1"
        );
    }

    #[test]
    fn test_bill_decodes_from_group_output() {
        let output = doc! {
            "payment_due": 19.75,
            "total_count": 2,
            "table_number": 7,
            "order_items": [
                { "order_id": "o1", "table_number": 7, "food_name": "Pho", "price": 12.5, "amount": 12.5, "quantity": "S" },
                { "order_id": "o1", "quantity": "L" },
            ],
        };

        let bill: Bill = crate::store::decode(output).unwrap();
        assert_eq!(bill.total_count, 2);
        assert_eq!(bill.order_items[1].food_name, None);
        assert_eq!(bill.order_items[1].quantity, Some(Portion::L));
    }
}
