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

//! Debt ledger: receivables and payables with their payments.
//!
//! Debt status follows a two-state machine, `Pending ⇄ Paid`, fully
//! determined by the outstanding balance. The transition is expressed as
//! the pure function [`compute_status`], invoked by every payment
//! create/update/delete operation, never as a hidden side effect of an
//! unrelated save path.

use crate::base::{DebtId, EntryId, OwnerId, PaymentId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which way the obligation points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DebtDirection {
    /// A third party owes the owner (money coming in).
    Receivable,
    /// The owner owes a third party (money going out).
    Payable,
}

/// Derived debt state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DebtStatus {
    Pending,
    Paid,
}

/// An obligation to or from a third party, tracked independently of
/// accounts and optionally mirrored into the main ledger via its payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Debt {
    pub id: DebtId,
    pub owner: OwnerId,
    /// Name of the external person or entity.
    pub counterparty: String,
    pub direction: DebtDirection,
    pub principal: Decimal,
    pub currency: String,
    pub opened_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub description: String,
    /// Derived; recomputed via [`compute_status`] after every payment
    /// mutation and principal change.
    pub status: DebtStatus,
}

/// A payment against a debt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtPayment {
    pub id: PaymentId,
    pub debt: DebtId,
    /// Always strictly positive.
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub note: String,
    /// Ledger entry mirroring this payment, when the payment was included
    /// in the owner's finances: an outflow for payable debts, an inflow
    /// for receivable ones.
    pub mirror_entry: Option<EntryId>,
}

/// Parameter object for [`Ledger::create_debt`](crate::Ledger::create_debt).
#[derive(Debug, Clone)]
pub struct NewDebt {
    pub owner: OwnerId,
    pub counterparty: String,
    pub direction: DebtDirection,
    pub principal: Decimal,
    pub currency: String,
    /// Defaults to the current instant.
    pub opened_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl NewDebt {
    pub fn new(
        owner: OwnerId,
        counterparty: impl Into<String>,
        direction: DebtDirection,
        principal: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            counterparty: counterparty.into(),
            direction,
            principal,
            currency: currency.into(),
            opened_at: None,
            due_date: None,
            description: None,
        }
    }
}

/// Parameter object for [`Ledger::pay_debt`](crate::Ledger::pay_debt).
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub debt: DebtId,
    /// Strictly positive, capped by the debt's outstanding balance.
    pub amount: Decimal,
    /// Defaults to the current instant.
    pub timestamp: Option<DateTime<Utc>>,
    pub note: Option<String>,
    /// When set, the payment is mirrored into the main ledger as an
    /// unattached outflow (payable debt) or inflow (receivable debt).
    pub mirror_to_ledger: bool,
}

impl NewPayment {
    pub fn new(debt: DebtId, amount: Decimal) -> Self {
        Self {
            debt,
            amount,
            timestamp: None,
            note: None,
            mirror_to_ledger: false,
        }
    }
}

/// Parameter object for [`Ledger::update_payment`](crate::Ledger::update_payment).
///
/// `mirror_to_ledger` reflects the desired end state: an existing mirror is
/// updated in place, a missing one is created, and clearing the flag deletes
/// the mirror and the link.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
    pub mirror_to_ledger: bool,
}

/// Status transition function: `Paid` iff the paid total covers the
/// principal.
pub fn compute_status(principal: Decimal, paid_total: Decimal) -> DebtStatus {
    if principal - paid_total <= Decimal::ZERO {
        DebtStatus::Paid
    } else {
        DebtStatus::Pending
    }
}
