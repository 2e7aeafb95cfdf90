use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    handlers::{
        foods::{create_food, get_food, list_foods, update_food},
        invoices::{create_invoice, get_invoice, list_invoices, update_invoice},
        menus::{create_menu, get_menu, list_menus, update_menu},
        order_items::{
            create_order_items, get_order_item, list_order_items, order_items_by_order,
            update_order_item,
        },
        orders::{create_order, get_order, list_orders, update_order},
        tables::{create_table, get_table, list_tables, update_table},
        users::{get_user, list_users, login, refresh, signup},
    },
    state::AppState,
};

type AppRouter = Router<Arc<AppState>>;

/// Routes reachable without a token.
pub fn public_routes() -> AppRouter {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/refresh", post(refresh))
}

pub fn user_routes() -> AppRouter {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}", get(get_user))
}

pub fn food_routes() -> AppRouter {
    Router::new()
        .route("/foods", get(list_foods).post(create_food))
        .route("/foods/{food_id}", get(get_food).patch(update_food))
}

pub fn menu_routes() -> AppRouter {
    Router::new()
        .route("/menus", get(list_menus).post(create_menu))
        .route("/menus/{menu_id}", get(get_menu).patch(update_menu))
}

pub fn table_routes() -> AppRouter {
    Router::new()
        .route("/tables", get(list_tables).post(create_table))
        .route("/tables/{table_id}", get(get_table).patch(update_table))
}

pub fn order_routes() -> AppRouter {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{order_id}", get(get_order).patch(update_order))
}

pub fn order_item_routes() -> AppRouter {
    Router::new()
        .route("/order-items", get(list_order_items).post(create_order_items))
        .route(
            "/order-items/{order_item_id}",
            get(get_order_item).patch(update_order_item),
        )
        .route("/order-items-order/{order_id}", get(order_items_by_order))
}

pub fn invoice_routes() -> AppRouter {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{invoice_id}",
            get(get_invoice).patch(update_invoice),
        )
}

/// Every route that sits behind the token check.
pub fn protected_routes() -> AppRouter {
    Router::new()
        .merge(user_routes())
        .merge(food_routes())
        .merge(menu_routes())
        .merge(table_routes())
        .merge(order_routes())
        .merge(order_item_routes())
        .merge(invoice_routes())
}
