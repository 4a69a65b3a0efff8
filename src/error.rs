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

//! Error types for ledger operations.
//!
//! Every error here is a validation failure and is recoverable: the caller
//! can re-prompt with the violated constraint. Multi-write operations
//! validate before writing, so a returned error always leaves prior state
//! untouched.

use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A monetary field is zero or negative; carries the field name.
    #[error("{0} must be positive")]
    NonPositiveAmount(&'static str),

    /// A purchase item quantity of zero.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Transfer source and destination are the same account.
    #[error("source and destination accounts must differ")]
    SameAccount,

    /// Transfer endpoints belong to different owners.
    #[error("accounts belong to different owners")]
    OwnerMismatch,

    /// Referenced account does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// Referenced entry does not exist.
    #[error("entry not found")]
    EntryNotFound,

    /// Referenced debt does not exist.
    #[error("debt not found")]
    DebtNotFound,

    /// Referenced payment does not exist.
    #[error("payment not found")]
    PaymentNotFound,

    /// Currency code is not registered.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Payment would push the paid total over the debt's principal.
    #[error("payment exceeds the debt's remaining balance ({remaining})")]
    PaymentExceedsBalance { remaining: Decimal },

    /// Purchase group creation with no items.
    #[error("a purchase requires at least one item")]
    EmptyPurchase,

    /// Account deletion blocked by a transfer or purchase group
    /// referencing it.
    #[error("account is referenced by a transfer or purchase")]
    AccountInUse,
}
