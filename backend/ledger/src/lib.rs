//! # Ledger
//!
//! Data layer of the restaurant API, shared by the HTTP server and the seeder.
//!
//! ## Collections
//!
//! | Collection   | Business id     | Notes                                   |
//! |--------------|-----------------|-----------------------------------------|
//! | `food`       | `food_id`       | belongs to a menu                       |
//! | `menu`       | `menu_id`       | optional availability window            |
//! | `table`      | `table_id`      |                                         |
//! | `order`      | `order_id`      | optionally seated at a table            |
//! | `order_item` | `order_item_id` | one food in one order                   |
//! | `invoice`    | `invoice_id`    | bills one order                         |
//! | `user`       | `user_id`       | unique email, argon2 password hash      |
//!
//! Business ids are ObjectId hex strings generated on creation. Every route
//! addresses documents by them, never by `_id`.
//!
//! ## Stores
//!
//! - [`MongoStore`]: the real thing
//! - [`MemoryStore`]: same behavior in-process, for tests and dry runs
pub mod bill;
pub mod error;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod store;

pub use bill::{Bill, BillLine};
pub use error::{StoreError, ValidationError};
pub use memory::MemoryStore;
pub use mongo::{MongoStore, redact_uri};
pub use store::{Collection, Page, Store, UpdateOutcome, decode, decode_all, encode};
