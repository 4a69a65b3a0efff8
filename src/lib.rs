// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Billetera
//!
//! This library provides a multi-currency personal ledger engine: accounts
//! with derived balances, income and expense entries, multi-item purchases,
//! cross-currency transfers at manual rates, balance adjustments, and a
//! debt ledger with payments that can mirror into the main ledger.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Central engine owning every entity collection
//! - [`Entry`]: A single dated inflow or outflow, always positive
//! - [`Account`]: A money container with a fixed currency; its balance is
//!   recomputed from history on every read
//! - [`Transfer`]: A balance-neutral linked outflow+inflow pair
//! - [`Debt`]: A receivable/payable with derived Pending/Paid status
//! - [`LedgerError`]: Validation failures, always recoverable
//!
//! ## Example
//!
//! ```
//! use billetera_rs::{AccountKind, Ledger, NewExpense, NewIncome, OwnerId};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//! ledger.ensure_seed_data();
//!
//! let owner = OwnerId(1);
//! let account = ledger
//!     .create_account(owner, "Billetera", AccountKind::Cash, "ARS", dec!(1000.00))
//!     .unwrap();
//!
//! let mut income = NewIncome::new(owner, "Salario", dec!(500.00), "ARS");
//! income.account = Some(account.id);
//! ledger.create_income(income).unwrap();
//!
//! let mut expense = NewExpense::new(owner, "Supermercado", dec!(200.00), "ARS");
//! expense.account = Some(account.id);
//! ledger.create_expense(expense).unwrap();
//!
//! assert_eq!(ledger.account_balance(account.id).unwrap(), dec!(1300.00));
//! ```
//!
//! ## Consistency
//!
//! Balances are derived, never cached, so entries and balances cannot
//! drift. Multi-entity operations validate before writing and run under a
//! single write guard; a returned error always leaves prior state
//! untouched.

pub mod account;
mod base;
pub mod category;
pub mod currency;
pub mod debt;
pub mod entry;
pub mod error;
mod ledger;
pub mod report;
pub mod transfer;

pub use account::{Account, AccountKind};
pub use base::{
    AccountId, CategoryId, DebtId, EntryId, GroupId, OwnerId, PaymentId, TransferId,
};
pub use category::Category;
pub use currency::Currency;
pub use debt::{
    Debt, DebtDirection, DebtPayment, DebtStatus, NewDebt, NewPayment, PaymentUpdate,
    compute_status,
};
pub use entry::{Entry, EntryFlow, NewExpense, NewIncome, NewPurchase, PurchaseGroup, PurchaseItem};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use report::{
    ACTIVITY_FEED_LIMIT, CategoryTotal, CurrencyTotal, DashboardTotals, Movement, MovementKind,
    TimeWindow,
};
pub use transfer::{NewTransfer, Transfer};
