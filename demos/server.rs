//! Simple REST API server example for the ledger engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /accounts` - Create an account
//! - `GET /owners/{id}/accounts` - List an owner's accounts with balances
//! - `GET /owners/{id}/dashboard` - Home-currency totals (optional `?hours=N`)
//! - `POST /movements` - Record an expense or income
//! - `POST /transfers` - Transfer between two accounts
//!
//! ## Example Usage
//!
//! ```bash
//! # Create an account
//! curl -X POST http://localhost:3000/accounts \
//!   -H "Content-Type: application/json" \
//!   -d '{"owner": 1, "name": "Banco", "kind": "Bank", "currency": "ARS", "starting_balance": "1000.00"}'
//!
//! # Record an expense
//! curl -X POST http://localhost:3000/movements \
//!   -H "Content-Type: application/json" \
//!   -d '{"type": "expense", "owner": 1, "description": "Supermercado", "amount": "150.00", "currency": "ARS", "account": 1}'
//!
//! # Dashboard totals for the last 24 hours
//! curl http://localhost:3000/owners/1/dashboard?hours=24
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use billetera_rs::{
    Account, AccountId, AccountKind, DashboardTotals, Entry, Ledger, LedgerError, NewExpense,
    NewIncome, NewTransfer, OwnerId, TimeWindow, Transfer,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub owner: u32,
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    #[serde(default)]
    pub starting_balance: Decimal,
}

/// Request body for recording movements.
///
/// Uses a tagged enum for clean JSON representation:
/// ```json
/// {"type": "expense", "owner": 1, "description": "Supermercado", "amount": "150.00", "currency": "ARS"}
/// ```
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MovementRequest {
    Expense {
        owner: u32,
        description: String,
        amount: Decimal,
        currency: String,
        category: Option<String>,
        account: Option<u64>,
    },
    Income {
        owner: u32,
        description: String,
        amount: Decimal,
        currency: String,
        category: Option<String>,
        account: Option<u64>,
    },
}

/// Request body for transfers.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub owner: u32,
    pub source_account: u64,
    pub dest_account: u64,
    pub source_amount: Decimal,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub dest_amount: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Response body for account information.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: Account,
    pub balance: Decimal,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Rolling window in hours; all-time when absent.
    pub hours: Option<i64>,
}

// === Application State ===

/// Shared application state containing the ledger engine.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::NonPositiveAmount(_) => (StatusCode::BAD_REQUEST, "NON_POSITIVE_AMOUNT"),
            LedgerError::InvalidQuantity => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
            LedgerError::SameAccount => (StatusCode::BAD_REQUEST, "SAME_ACCOUNT"),
            LedgerError::OwnerMismatch => (StatusCode::BAD_REQUEST, "OWNER_MISMATCH"),
            LedgerError::AccountNotFound => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::EntryNotFound => (StatusCode::NOT_FOUND, "ENTRY_NOT_FOUND"),
            LedgerError::DebtNotFound => (StatusCode::NOT_FOUND, "DEBT_NOT_FOUND"),
            LedgerError::PaymentNotFound => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
            LedgerError::UnknownCurrency(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_CURRENCY"),
            LedgerError::PaymentExceedsBalance { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PAYMENT_EXCEEDS_BALANCE")
            }
            LedgerError::EmptyPurchase => (StatusCode::BAD_REQUEST, "EMPTY_PURCHASE"),
            LedgerError::AccountInUse => (StatusCode::CONFLICT, "ACCOUNT_IN_USE"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /accounts - Create a new account.
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<AccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let account = state.ledger.create_account(
        OwnerId(request.owner),
        &request.name,
        request.kind,
        &request.currency,
        request.starting_balance,
    )?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /owners/{id}/accounts - List an owner's accounts with balances.
async fn list_accounts(
    State(state): State<AppState>,
    Path(owner): Path<u32>,
) -> Json<Vec<AccountResponse>> {
    let accounts = state
        .ledger
        .accounts(OwnerId(owner))
        .into_iter()
        .map(|account| {
            let balance = state
                .ledger
                .account_balance(account.id)
                .unwrap_or(Decimal::ZERO);
            AccountResponse { account, balance }
        })
        .collect();
    Json(accounts)
}

/// GET /owners/{id}/dashboard - Home-currency totals over a rolling window.
async fn dashboard(
    State(state): State<AppState>,
    Path(owner): Path<u32>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardTotals> {
    let window = match query.hours {
        Some(hours) => TimeWindow::hours(hours),
        None => TimeWindow::All,
    };
    Json(state.ledger.dashboard_totals(OwnerId(owner), window))
}

/// POST /movements - Record an expense or income.
async fn create_movement(
    State(state): State<AppState>,
    Json(request): Json<MovementRequest>,
) -> Result<(StatusCode, Json<Entry>), AppError> {
    let entry = match request {
        MovementRequest::Expense {
            owner,
            description,
            amount,
            currency,
            category,
            account,
        } => {
            let mut new = NewExpense::new(OwnerId(owner), description, amount, currency);
            new.category = category;
            new.account = account.map(AccountId);
            state.ledger.create_expense(new)?
        }
        MovementRequest::Income {
            owner,
            description,
            amount,
            currency,
            category,
            account,
        } => {
            let mut new = NewIncome::new(OwnerId(owner), description, amount, currency);
            new.category = category;
            new.account = account.map(AccountId);
            state.ledger.create_income(new)?
        }
    };
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /transfers - Transfer between two of the owner's accounts.
async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<Transfer>), AppError> {
    let mut new = NewTransfer::new(
        OwnerId(request.owner),
        AccountId(request.source_account),
        AccountId(request.dest_account),
        request.source_amount,
    );
    if let Some(rate) = request.rate {
        new.rate = rate;
    }
    new.dest_amount = request.dest_amount;
    new.note = request.note;
    let transfer = state.ledger.transfer(new)?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/owners/{id}/accounts", get(list_accounts))
        .route("/owners/{id}/dashboard", get(dashboard))
        .route("/movements", post(create_movement))
        .route("/transfers", post(create_transfer))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let ledger = Ledger::new();
    ledger.ensure_seed_data();

    let state = AppState {
        ledger: Arc::new(ledger),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Billetera API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /accounts               - Create an account");
    println!("  GET  /owners/:id/accounts    - List accounts with balances");
    println!("  GET  /owners/:id/dashboard   - Home-currency totals");
    println!("  POST /movements              - Record an expense or income");
    println!("  POST /transfers              - Transfer between accounts");

    axum::serve(listener, app).await.unwrap();
}
