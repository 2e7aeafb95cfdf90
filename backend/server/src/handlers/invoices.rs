use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use ledger::{
    BillLine, Collection, decode_all, encode,
    models::{Invoice, InvoiceInput, PaymentStatus, touch},
};
use serde::Serialize;
use tracing::info;

use super::orders::ORDER_NOT_FOUND;
use crate::{
    error::AppError,
    state::AppState,
    utils::{Payload, Success, created, ensure_exists, find_or_404, success},
};

const INVOICE_NOT_FOUND: &str = "invoice not found";

/// An invoice joined with the bill of its order.
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    pub invoice_id: String,
    pub order_id: String,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_due_date: DateTime<Utc>,
    pub payment_due: f64,
    pub table_number: Option<i64>,
    pub order_details: Vec<BillLine>,
}

pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<Invoice>>>, AppError> {
    let invoices = decode_all(state.store.find_all(Collection::Invoice).await?)?;

    Ok(success(invoices))
}

pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<Success<InvoiceView>>, AppError> {
    let invoice: Invoice = find_or_404(
        state.store.as_ref(),
        Collection::Invoice,
        &invoice_id,
        INVOICE_NOT_FOUND,
    )
    .await?;

    // An order without items still gets an invoice view, just an empty one.
    let bill = state
        .store
        .order_bill(&invoice.order_id)
        .await?
        .unwrap_or_default();

    Ok(success(InvoiceView {
        invoice_id: invoice.invoice_id,
        order_id: invoice.order_id,
        payment_method: invoice
            .payment_method
            .map_or("null", |method| method.as_str())
            .to_string(),
        payment_status: invoice.payment_status,
        payment_due_date: invoice.payment_due_date,
        payment_due: bill.payment_due,
        table_number: bill.table_number,
        order_details: bill.order_items,
    }))
}

pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<InvoiceInput>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = input.into_invoice(Utc::now())?;

    ensure_exists(
        state.store.as_ref(),
        Collection::Order,
        &invoice.order_id,
        ORDER_NOT_FOUND,
    )
    .await?;
    state
        .store
        .insert_one(Collection::Invoice, encode(&invoice)?)
        .await?;

    info!("Created invoice {} for order {}", invoice.invoice_id, invoice.order_id);
    Ok(created(invoice))
}

pub async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<String>,
    Payload(input): Payload<InvoiceInput>,
) -> Result<Json<Success<Invoice>>, AppError> {
    let store = state.store.as_ref();
    ensure_exists(store, Collection::Invoice, &invoice_id, INVOICE_NOT_FOUND).await?;

    let mut set = input.changes();
    touch(&mut set, Utc::now());

    store
        .update_by_id(Collection::Invoice, &invoice_id, set)
        .await?;

    Ok(success(
        find_or_404(store, Collection::Invoice, &invoice_id, INVOICE_NOT_FOUND).await?,
    ))
}
