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

//! Ledger entries and purchase groups.
//!
//! An [`Entry`] is a single dated movement of money. Direction is encoded
//! by [`EntryFlow`], never by the sign of the amount: amounts are always
//! positive, and an entry's effect on an account balance is `+amount` for
//! an inflow and `-amount` for an outflow.

use crate::base::{AccountId, EntryId, GroupId, OwnerId, TransferId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryFlow {
    /// Money entering the owner's portfolio (income).
    Inflow,
    /// Money leaving the owner's portfolio (expense).
    Outflow,
}

/// A single dated movement of money against a currency and, optionally,
/// an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub owner: OwnerId,
    pub flow: EntryFlow,
    pub description: String,
    /// Always strictly positive; see [`EntryFlow`] for direction.
    pub amount: Decimal,
    /// Number of units this entry represents. 1 except for multi-unit
    /// purchase line items, where `amount` is the quantity-extended total.
    pub quantity: u32,
    pub currency: String,
    pub category: Option<String>,
    /// Entries may exist unattached to any account (legacy or manual
    /// records, debt mirrors).
    pub account: Option<AccountId>,
    /// Set when the entry is a line item of a purchase group.
    pub group: Option<GroupId>,
    /// Set when the entry was generated by a transfer. The aggregation
    /// engine excludes such entries from top-line income/expense totals.
    pub transfer: Option<TransferId>,
    pub timestamp: DateTime<Utc>,
}

impl Entry {
    /// Signed effect of this entry on its account's balance.
    pub fn balance_effect(&self) -> Decimal {
        match self.flow {
            EntryFlow::Inflow => self.amount,
            EntryFlow::Outflow => -self.amount,
        }
    }

    /// Feed descriptor: the description plus a quantity suffix when the
    /// entry represents more than one unit.
    pub fn descriptor(&self) -> String {
        if self.quantity > 1 {
            format!("{} x{}", self.description, self.quantity)
        } else {
            self.description.clone()
        }
    }
}

/// A set of outflow entries created together from one multi-item purchase,
/// displayed as a single aggregated movement.
///
/// A purchase group never persists empty: deleting its last entry deletes
/// the group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseGroup {
    pub id: GroupId,
    pub owner: OwnerId,
    pub place: String,
    pub account: AccountId,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

/// Parameter object for [`Ledger::create_expense`](crate::Ledger::create_expense).
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub owner: OwnerId,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub account: Option<AccountId>,
    /// Defaults to the current instant.
    pub timestamp: Option<DateTime<Utc>>,
    /// Units purchased; `amount` is the quantity-extended total.
    pub quantity: u32,
}

impl NewExpense {
    /// Single-unit expense with no category or account.
    pub fn new(
        owner: OwnerId,
        description: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            description: description.into(),
            amount,
            currency: currency.into(),
            category: None,
            account: None,
            timestamp: None,
            quantity: 1,
        }
    }
}

/// Parameter object for [`Ledger::create_income`](crate::Ledger::create_income).
#[derive(Debug, Clone)]
pub struct NewIncome {
    pub owner: OwnerId,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub account: Option<AccountId>,
    /// Defaults to the current instant.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewIncome {
    pub fn new(
        owner: OwnerId,
        description: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            description: description.into(),
            amount,
            currency: currency.into(),
            category: None,
            account: None,
            timestamp: None,
        }
    }
}

/// One line item of a purchase.
#[derive(Debug, Clone)]
pub struct PurchaseItem {
    pub description: String,
    pub category: Option<String>,
    /// At least 1.
    pub quantity: u32,
    /// Price per unit; the generated entry's amount is
    /// `quantity × unit_price`.
    pub unit_price: Decimal,
}

/// Parameter object for [`Ledger::create_purchase_group`](crate::Ledger::create_purchase_group).
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub owner: OwnerId,
    pub place: String,
    pub account: AccountId,
    pub currency: String,
    /// Defaults to the current instant; shared by the group and all its
    /// entries.
    pub timestamp: Option<DateTime<Utc>>,
    pub items: Vec<PurchaseItem>,
}

/// Thread-safe entry collection preserving insertion order.
///
/// Combines a [`DashMap`] for O(1) lookup with an `RwLock<Vec<EntryId>>`
/// index so aggregation reads can iterate entries in creation order while
/// individual entries are deleted out from the middle.
#[derive(Debug, Default)]
pub(crate) struct EntryStore {
    entries: DashMap<EntryId, Entry>,
    order: RwLock<Vec<EntryId>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Adds an entry. Ids are allocated by the engine and never reused, so
    /// insertion cannot collide.
    pub fn insert(&self, entry: Entry) {
        let id = entry.id;
        self.entries.insert(id, entry);
        self.order.write().push(id);
    }

    /// Removes an entry, returning it if present.
    pub fn remove(&self, id: EntryId) -> Option<Entry> {
        let removed = self.entries.remove(&id).map(|(_, entry)| entry);
        if removed.is_some() {
            self.order.write().retain(|other| *other != id);
        }
        removed
    }

    pub fn get(&self, id: EntryId) -> Option<Entry> {
        self.entries.get(&id).map(|entry| entry.clone())
    }

    /// Applies `mutate` to the stored entry in place.
    pub fn update<F>(&self, id: EntryId, mutate: F) -> bool
    where
        F: FnOnce(&mut Entry),
    {
        match self.entries.get_mut(&id) {
            Some(mut entry) => {
                mutate(&mut entry);
                true
            }
            None => false,
        }
    }

    /// Snapshot of all entries in insertion order.
    pub fn snapshot(&self) -> Vec<Entry> {
        let order = self.order.read();
        order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| entry.clone()))
            .collect()
    }

    /// Folds over entries without cloning; iteration order is unspecified.
    pub fn fold<T, F>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, &Entry) -> T,
    {
        let mut acc = init;
        for entry in self.entries.iter() {
            acc = f(acc, entry.value());
        }
        acc
    }
}
