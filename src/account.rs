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

//! Accounts.
//!
//! An account is a named money container with a fixed currency and a
//! starting balance. No balance field is stored beyond the starting
//! balance: the current balance is always derived by aggregating the
//! account's entries (see [`Ledger::account_balance`](crate::Ledger::account_balance)).

use crate::base::{AccountId, OwnerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountKind {
    Cash,
    Bank,
    VirtualWallet,
    Crypto,
}

impl AccountKind {
    /// Spanish display label.
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Cash => "Efectivo",
            AccountKind::Bank => "Banco",
            AccountKind::VirtualWallet => "Billetera Virtual",
            AccountKind::Crypto => "Crypto",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A money container owned by one user.
///
/// # Invariants
///
/// - The currency is fixed at creation. Changing it would invalidate the
///   currency assumption of every historical entry against the account, so
///   no mutation path exists for it.
/// - `starting_balance` may be negative (an account opened in the red).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub owner: OwnerId,
    pub name: String,
    pub kind: AccountKind,
    /// Currency code; all entries against this account are assumed to be
    /// denominated in it.
    pub currency: String,
    pub starting_balance: Decimal,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.currency)
    }
}
