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

//! Transfers between two accounts of the same owner.
//!
//! A transfer is balance-neutral from the whole-portfolio perspective: it
//! records a linked outflow+inflow pair, possibly across currencies at a
//! user-declared (not market) rate.

use crate::base::{AccountId, EntryId, OwnerId, TransferId};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Record of a completed transfer.
///
/// The entry links are nullable: deleting one of the generated entries
/// nulls its side here while the transfer record itself remains as
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transfer {
    pub id: TransferId,
    pub owner: OwnerId,
    pub source_account: AccountId,
    pub dest_account: AccountId,
    /// Amount debited, in the source account's currency.
    pub source_amount: Decimal,
    /// Amount credited, in the destination account's currency.
    pub dest_amount: Decimal,
    /// Manual exchange rate: destination units per source unit.
    pub rate: Decimal,
    pub note: String,
    pub timestamp: DateTime<Utc>,
    /// Generated outflow on the source account.
    pub outflow: Option<EntryId>,
    /// Generated inflow on the destination account.
    pub inflow: Option<EntryId>,
}

/// Parameter object for [`Ledger::transfer`](crate::Ledger::transfer).
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub owner: OwnerId,
    pub source_account: AccountId,
    pub dest_account: AccountId,
    /// In the source account's currency; strictly positive.
    pub source_amount: Decimal,
    /// Destination units per source unit; strictly positive.
    pub rate: Decimal,
    /// Explicit override; computed from `source_amount × rate` when absent.
    pub dest_amount: Option<Decimal>,
    pub note: Option<String>,
    /// Defaults to the current instant; shared by both generated entries.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewTransfer {
    /// Same-currency transfer at rate 1.
    pub fn new(
        owner: OwnerId,
        source_account: AccountId,
        dest_account: AccountId,
        source_amount: Decimal,
    ) -> Self {
        Self {
            owner,
            source_account,
            dest_account,
            source_amount,
            rate: Decimal::ONE,
            dest_amount: None,
            note: None,
            timestamp: None,
        }
    }
}

/// Converts a source amount at a manual rate, rounding to 2 decimal
/// places, half-up.
pub(crate) fn convert(source_amount: Decimal, rate: Decimal) -> Decimal {
    (source_amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
