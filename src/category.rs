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

//! Entry categories.
//!
//! Categories are scoped per entry flow: expense categories and income
//! categories are separate namespaces, so "Deudas" exists once per flow.
//! A handful of reserved names are created on demand by the operations
//! that need them (transfers, balance adjustments, debt mirroring).

use crate::base::CategoryId;
use crate::entry::EntryFlow;
use serde::{Deserialize, Serialize};

/// Expense category applied to the outflow side of a transfer.
pub const CATEGORY_TRANSFER_OUT: &str = "Transferencia Saliente";
/// Income category applied to the inflow side of a transfer.
pub const CATEGORY_TRANSFER_IN: &str = "Transferencia Entrante";
/// Category applied to corrective entries created by a balance adjustment.
pub const CATEGORY_ADJUSTMENT: &str = "Ajuste de Saldo";
/// Category applied to entries mirrored from debt payments.
pub const CATEGORY_DEBTS: &str = "Deudas";

/// A named category within one flow's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub flow: EntryFlow,
    pub name: String,
}

/// Expense categories created by [`ensure_seed_data`](crate::Ledger::ensure_seed_data).
pub(crate) const SEED_EXPENSE_CATEGORIES: [&str; 11] = [
    "Alimentación",
    "Transporte",
    "Entretenimiento",
    "Salud",
    "Vivienda",
    "Educación",
    "Ropa",
    "Viajes",
    "Tecnología",
    "Ahorros e Inversiones",
    "Vicio",
];

/// Income categories created by [`ensure_seed_data`](crate::Ledger::ensure_seed_data).
pub(crate) const SEED_INCOME_CATEGORIES: [&str; 8] = [
    "Salario",
    "Regalos",
    "Inversiones",
    "Freelance",
    "Ventas",
    "Alquiler",
    "Intereses",
    "Dividendos",
];
