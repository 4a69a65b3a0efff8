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

//! Currency reference data.
//!
//! Currencies are immutable records keyed by their short code ("ARS",
//! "USD", ...). They are seeded once via
//! [`Ledger::ensure_seed_data`](crate::Ledger::ensure_seed_data) and may be
//! extended at runtime with [`Ledger::register_currency`](crate::Ledger::register_currency).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Currency {
    /// Short unique code, e.g. "ARS".
    pub code: String,
    /// Display name, e.g. "Peso Argentino".
    pub name: String,
    /// Display symbol, e.g. "$".
    pub symbol: String,
}

impl Currency {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Currencies created by [`ensure_seed_data`](crate::Ledger::ensure_seed_data).
pub(crate) fn seed_currencies() -> [Currency; 4] {
    [
        Currency::new("USD", "Dólar Estadounidense", "$"),
        Currency::new("EUR", "Euro", "€"),
        Currency::new("ARS", "Peso Argentino", "$"),
        Currency::new("CLP", "Peso Chileno", "$"),
    ]
}
