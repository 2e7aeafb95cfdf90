//! # Documents
//!
//! One struct per collection as it is stored, plus an `*Input` struct per
//! collection as it arrives over the wire. Inputs keep every field optional so
//! that the same type serves both creation (every required field checked) and
//! partial updates (only present fields written).
//!
//! Timestamps are stored as RFC 3339 strings in UTC.
use std::sync::LazyLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use mongodb::bson::{Bson, Document, oid::ObjectId};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// Fresh business id, the hex form of a new ObjectId.
pub fn new_id() -> String {
    ObjectId::new().to_hex()
}

pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

pub fn timestamp(at: DateTime<Utc>) -> Bson {
    Bson::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Stamps `updated_at` onto an update set.
pub fn touch(set: &mut Document, now: DateTime<Utc>) {
    set.insert("updated_at", timestamp(now));
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::required(field))
}

fn check_present(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }

    Ok(())
}

fn check_price(field: &'static str, price: f64) -> Result<f64, ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::new(field, "must be a non-negative number"));
    }

    Ok(round_price(price))
}

fn check_positive(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if value < 1 {
        return Err(ValidationError::new(field, "must be at least 1"));
    }

    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub food_id: String,
    pub name: String,
    pub price: f64,
    pub food_image: String,
    pub menu_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodInput {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub food_image: Option<String>,
    pub menu_id: Option<String>,
}

impl FoodInput {
    pub fn into_food(self, now: DateTime<Utc>) -> Result<Food, ValidationError> {
        let name = required("name", self.name)?;
        check_length("name", &name, 2, 40)?;

        let price = check_price("price", required("price", self.price)?)?;

        let food_image = required("food_image", self.food_image)?;
        check_present("food_image", &food_image)?;

        let menu_id = required("menu_id", self.menu_id)?;
        check_present("menu_id", &menu_id)?;

        Ok(Food {
            food_id: new_id(),
            name,
            price,
            food_image,
            menu_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn changes(&self) -> Result<Document, ValidationError> {
        let mut set = Document::new();

        if let Some(name) = &self.name {
            check_length("name", name, 2, 40)?;
            set.insert("name", name.as_str());
        }
        if let Some(price) = self.price {
            set.insert("price", check_price("price", price)?);
        }
        if let Some(food_image) = &self.food_image {
            check_present("food_image", food_image)?;
            set.insert("food_image", food_image.as_str());
        }
        if let Some(menu_id) = &self.menu_id {
            set.insert("menu_id", menu_id.as_str());
        }

        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub menu_id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// A menu window is only accepted when it opens in the future and closes after it opens.
pub fn in_time_span(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start > now && end > start
}

impl MenuInput {
    pub fn into_menu(self, now: DateTime<Utc>) -> Result<Menu, ValidationError> {
        let name = required("name", self.name)?;
        check_present("name", &name)?;

        let category = required("category", self.category)?;
        check_present("category", &category)?;

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end <= start {
                return Err(ValidationError::new("end_date", "must be after start_date"));
            }
        }

        Ok(Menu {
            menu_id: new_id(),
            name,
            category,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn changes(&self, now: DateTime<Utc>) -> Result<Document, ValidationError> {
        let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
            return Err(ValidationError::new(
                "start_date",
                "start_date and end_date are both required to update a menu",
            ));
        };

        if !in_time_span(start, end, now) {
            return Err(ValidationError::new(
                "start_date",
                "must be in the future and before end_date",
            ));
        }

        let mut set = Document::new();
        set.insert("start_date", timestamp(start));
        set.insert("end_date", timestamp(end));

        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            set.insert("name", name);
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            set.insert("category", category);
        }

        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub table_id: String,
    pub number_of_guests: i32,
    pub table_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableInput {
    pub number_of_guests: Option<i32>,
    pub table_number: Option<i32>,
}

impl TableInput {
    pub fn into_table(self, now: DateTime<Utc>) -> Result<Table, ValidationError> {
        let number_of_guests = check_positive(
            "number_of_guests",
            required("number_of_guests", self.number_of_guests)?,
        )?;
        let table_number =
            check_positive("table_number", required("table_number", self.table_number)?)?;

        Ok(Table {
            table_id: new_id(),
            number_of_guests,
            table_number,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn changes(&self) -> Result<Document, ValidationError> {
        let mut set = Document::new();

        if let Some(guests) = self.number_of_guests {
            set.insert("number_of_guests", check_positive("number_of_guests", guests)?);
        }
        if let Some(number) = self.table_number {
            set.insert("table_number", check_positive("table_number", number)?);
        }

        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub table_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(order_date: DateTime<Utc>, table_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            order_id: new_id(),
            order_date,
            table_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderInput {
    pub order_date: Option<DateTime<Utc>>,
    pub table_id: Option<String>,
}

impl OrderInput {
    pub fn into_order(self, now: DateTime<Utc>) -> Result<Order, ValidationError> {
        let order_date = required("order_date", self.order_date)?;

        Ok(Order::new(order_date, self.table_id, now))
    }

    pub fn changes(&self) -> Document {
        let mut set = Document::new();

        if let Some(order_date) = self.order_date {
            set.insert("order_date", timestamp(order_date));
        }
        if let Some(table_id) = &self.table_id {
            set.insert("table_id", table_id.as_str());
        }

        set
    }
}

/// Portion size of an order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Portion {
    S,
    M,
    L,
}

impl Portion {
    pub fn as_str(self) -> &'static str {
        match self {
            Portion::S => "S",
            Portion::M => "M",
            Portion::L => "L",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "S" => Some(Portion::S),
            "M" => Some(Portion::M),
            "L" => Some(Portion::L),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_item_id: String,
    pub quantity: Portion,
    pub unit_price: f64,
    pub food_id: String,
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderItemInput {
    pub quantity: Option<Portion>,
    pub unit_price: Option<f64>,
    pub food_id: Option<String>,
}

impl OrderItemInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required("quantity", self.quantity)?;
        check_price("unit_price", required("unit_price", self.unit_price)?)?;
        check_present("food_id", required("food_id", self.food_id.as_deref())?)?;

        Ok(())
    }

    pub fn into_item(self, order_id: &str, now: DateTime<Utc>) -> Result<OrderItem, ValidationError> {
        self.validate()?;

        Ok(OrderItem {
            order_item_id: new_id(),
            quantity: required("quantity", self.quantity)?,
            unit_price: check_price("unit_price", required("unit_price", self.unit_price)?)?,
            food_id: required("food_id", self.food_id)?,
            order_id: order_id.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn changes(&self) -> Result<Document, ValidationError> {
        let mut set = Document::new();

        if let Some(unit_price) = self.unit_price {
            set.insert("unit_price", check_price("unit_price", unit_price)?);
        }
        if let Some(food_id) = &self.food_id {
            check_present("food_id", food_id)?;
            set.insert("food_id", food_id.as_str());
        }
        if let Some(quantity) = self.quantity {
            set.insert("quantity", quantity.as_str());
        }

        Ok(set)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Card,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Cash => "CASH",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub order_id: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceInput {
    pub order_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
}

impl InvoiceInput {
    pub fn into_invoice(self, now: DateTime<Utc>) -> Result<Invoice, ValidationError> {
        let order_id = required("order_id", self.order_id)?;
        check_present("order_id", &order_id)?;

        Ok(Invoice {
            invoice_id: new_id(),
            order_id,
            payment_method: self.payment_method,
            payment_status: self.payment_status.unwrap_or_default(),
            payment_due_date: now + Duration::days(1),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn changes(&self) -> Document {
        let mut set = Document::new();

        if let Some(method) = self.payment_method {
            set.insert("payment_method", method.as_str());
        }
        if let Some(status) = self.payment_status {
            set.insert("payment_status", status.as_str());
        }

        set
    }
}

/// Stored user, secrets included. Never serialized into a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields that never leave the store.
pub const USER_SECRETS: [&str; 3] = ["password", "access_token", "refresh_token"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            avatar: user.avatar,
            phone: user.phone,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
}

impl SignupInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("first_name", required("first_name", self.first_name.as_deref())?, 3, 15)?;
        check_length("last_name", required("last_name", self.last_name.as_deref())?, 3, 15)?;
        check_length("password", required("password", self.password.as_deref())?, 8, 40)?;

        let email = required("email", self.email.as_deref())?;
        if !EMAIL.is_match(email) {
            return Err(ValidationError::new("email", "must be a valid email address"));
        }

        Ok(())
    }

    /// Builds the stored user around an already hashed password. Tokens are issued afterwards.
    pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> Result<User, ValidationError> {
        self.validate()?;

        Ok(User {
            user_id: new_id(),
            first_name: required("first_name", self.first_name)?,
            last_name: required("last_name", self.last_name)?,
            password: password_hash,
            email: required("email", self.email)?.to_lowercase(),
            avatar: self.avatar,
            phone: self.phone,
            access_token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginInput {
    pub fn credentials(self) -> Result<(String, String), ValidationError> {
        let email = required("email", self.email)?;
        check_present("email", &email)?;

        let password = required("password", self.password)?;
        check_present("password", &password)?;

        Ok((email.to_lowercase(), password))
    }
}
