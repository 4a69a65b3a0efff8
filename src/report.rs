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

//! Aggregation engine: dashboard totals, per-currency totals, and the
//! recent-activity feed.
//!
//! Two different aggregations coexist and must not be conflated:
//! account-balance totals (starting balances plus attached entries, per
//! currency) and flow totals (raw entry sums, per currency). Top-line
//! income/expense totals exclude transfer-linked entries: a transfer only
//! moves money between the owner's accounts and is balance-neutral for the
//! whole portfolio.
//!
//! Time windows are rolling, anchored to the current instant, never to
//! calendar-day boundaries, which would be off by up to a day for owners
//! in negative UTC offsets.

use crate::base::OwnerId;
use crate::debt::DebtDirection;
use crate::entry::EntryFlow;
use crate::ledger::Ledger;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fallback top-line currency when the owner has no accounts.
const DEFAULT_HOME_CURRENCY: &str = "ARS";

/// How many movements the recent-activity feed returns by default.
pub const ACTIVITY_FEED_LIMIT: usize = 10;

/// A rolling time window ending at the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Everything from `now - duration` (inclusive) to now.
    Last(Duration),
    /// No time filter.
    All,
}

impl TimeWindow {
    /// Last `n` hours (dashboard ranges like 24h and 72h).
    pub fn hours(n: i64) -> Self {
        TimeWindow::Last(Duration::hours(n))
    }

    /// Last `n` days (dashboard ranges like 7d, 30d and 365d).
    pub fn days(n: i64) -> Self {
        TimeWindow::Last(Duration::days(n))
    }

    /// Inclusive lower bound of the window anchored at `now`, or `None`
    /// for [`TimeWindow::All`].
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::Last(duration) => Some(now - *duration),
            TimeWindow::All => None,
        }
    }

    fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => timestamp >= cutoff,
            None => true,
        }
    }
}

/// Top-line dashboard numbers in the owner's home currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardTotals {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// `total_income - total_expense`.
    pub net_balance: Decimal,
}

/// A per-currency total with the currency's display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyTotal {
    pub code: String,
    pub symbol: String,
    pub name: String,
    pub total: Decimal,
}

/// A per-category expense total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: Decimal,
}

/// Kind of a row in the recent-activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementKind {
    Income,
    Expense,
    /// Synthetic row aggregating a purchase group.
    Purchase,
}

/// One row of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub kind: MovementKind,
    pub description: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    /// Name of the attached account, if any.
    pub account: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Ledger {
    /// The owner's top-line aggregation currency: "ARS" when the owner has
    /// an ARS account, otherwise the lexically-first account currency,
    /// otherwise "ARS".
    pub fn home_currency(&self, owner: OwnerId) -> String {
        let mut codes: Vec<String> = self
            .accounts
            .iter()
            .filter(|a| a.owner == owner)
            .map(|a| a.currency.clone())
            .collect();
        codes.sort();
        if codes.iter().any(|code| code == DEFAULT_HOME_CURRENCY) {
            return DEFAULT_HOME_CURRENCY.to_string();
        }
        codes
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_HOME_CURRENCY.to_string())
    }

    /// Home-currency income/expense/net totals over a rolling window,
    /// excluding transfer-linked entries.
    pub fn dashboard_totals(&self, owner: OwnerId, window: TimeWindow) -> DashboardTotals {
        self.dashboard_totals_at(owner, window, Utc::now())
    }

    /// [`dashboard_totals`](Self::dashboard_totals) with an explicit
    /// anchor instant.
    pub fn dashboard_totals_at(
        &self,
        owner: OwnerId,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> DashboardTotals {
        let home = self.home_currency(owner);
        let (total_income, total_expense) = self.entries.fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(income, expense), entry| {
                if entry.owner != owner
                    || entry.currency != home
                    || entry.transfer.is_some()
                    || !window.contains(entry.timestamp, now)
                {
                    return (income, expense);
                }
                match entry.flow {
                    EntryFlow::Inflow => (income + entry.amount, expense),
                    EntryFlow::Outflow => (income, expense + entry.amount),
                }
            },
        );
        DashboardTotals {
            total_income,
            total_expense,
            net_balance: total_income - total_expense,
        }
    }

    /// Per-currency totals of the owner's account balances, sorted by
    /// currency code.
    pub fn account_totals_by_currency(&self, owner: OwnerId) -> Vec<CurrencyTotal> {
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for account in self.accounts.iter().filter(|a| a.owner == owner) {
            let balance = self.balance_of(&account);
            *totals.entry(account.currency.clone()).or_default() += balance;
        }
        self.into_currency_totals(totals)
    }

    /// Per-currency totals of the owner's raw entries for one flow, sorted
    /// by currency code. This is a flow aggregation, distinct from
    /// [`account_totals_by_currency`](Self::account_totals_by_currency).
    pub fn flow_totals_by_currency(&self, owner: OwnerId, flow: EntryFlow) -> Vec<CurrencyTotal> {
        let totals = self
            .entries
            .fold(BTreeMap::<String, Decimal>::new(), |mut totals, entry| {
                if entry.owner == owner && entry.flow == flow {
                    *totals.entry(entry.currency.clone()).or_default() += entry.amount;
                }
                totals
            });
        self.into_currency_totals(totals)
    }

    /// Per-currency outstanding totals of the owner's debts in one
    /// direction, sorted by currency code. Fully paid debts are skipped.
    pub fn debt_totals_by_currency(
        &self,
        owner: OwnerId,
        direction: DebtDirection,
    ) -> Vec<CurrencyTotal> {
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for debt in self.debts.iter() {
            if debt.owner != owner || debt.direction != direction {
                continue;
            }
            let outstanding = debt.principal
                - self
                    .payments
                    .iter()
                    .filter(|p| p.debt == debt.id)
                    .map(|p| p.amount)
                    .sum::<Decimal>();
            if outstanding > Decimal::ZERO {
                *totals.entry(debt.currency.clone()).or_default() += outstanding;
            }
        }
        self.into_currency_totals(totals)
    }

    fn into_currency_totals(&self, totals: BTreeMap<String, Decimal>) -> Vec<CurrencyTotal> {
        totals
            .into_iter()
            .map(|(code, total)| {
                let (symbol, name) = self
                    .currency(&code)
                    .map(|c| (c.symbol, c.name))
                    .unwrap_or_default();
                CurrencyTotal {
                    code,
                    symbol,
                    name,
                    total,
                }
            })
            .collect()
    }

    /// Home-currency expense totals grouped by category over a rolling
    /// window, largest first. Transfer-linked entries are excluded;
    /// uncategorized expenses land under "Sin categoría".
    pub fn expense_totals_by_category(
        &self,
        owner: OwnerId,
        window: TimeWindow,
    ) -> Vec<CategoryTotal> {
        self.expense_totals_by_category_at(owner, window, Utc::now())
    }

    /// [`expense_totals_by_category`](Self::expense_totals_by_category)
    /// with an explicit anchor instant.
    pub fn expense_totals_by_category_at(
        &self,
        owner: OwnerId,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Vec<CategoryTotal> {
        let home = self.home_currency(owner);
        let totals = self
            .entries
            .fold(BTreeMap::<String, Decimal>::new(), |mut totals, entry| {
                if entry.owner == owner
                    && entry.flow == EntryFlow::Outflow
                    && entry.currency == home
                    && entry.transfer.is_none()
                    && window.contains(entry.timestamp, now)
                {
                    let name = entry
                        .category
                        .clone()
                        .unwrap_or_else(|| "Sin categoría".to_string());
                    *totals.entry(name).or_default() += entry.amount;
                }
                totals
            });
        let mut result: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(name, total)| CategoryTotal { name, total })
            .collect();
        result.sort_by(|a, b| b.total.cmp(&a.total));
        result
    }

    /// Merged recent-activity feed: individual entries that belong to no
    /// purchase group, plus one synthetic row per purchase group, sorted by
    /// timestamp descending and truncated to `limit`.
    ///
    /// A group of exactly one item is shown as that item (with a quantity
    /// suffix when it represents several units); larger groups are shown as
    /// "Compra en {place}" with a parenthetical list of any multi-unit
    /// items.
    pub fn recent_activity(&self, owner: OwnerId, limit: usize) -> Vec<Movement> {
        let mut movements: Vec<Movement> = Vec::new();

        for entry in self.entries.snapshot() {
            if entry.owner != owner || entry.group.is_some() {
                continue;
            }
            let kind = match entry.flow {
                EntryFlow::Inflow => MovementKind::Income,
                EntryFlow::Outflow => MovementKind::Expense,
            };
            movements.push(Movement {
                kind,
                description: entry.descriptor(),
                category: entry.category.clone(),
                amount: entry.amount,
                currency: entry.currency.clone(),
                account: entry
                    .account
                    .and_then(|id| self.account(id))
                    .map(|a| a.name),
                timestamp: entry.timestamp,
            });
        }

        for group in self.groups.iter() {
            if group.owner != owner {
                continue;
            }
            let items = self.group_entries(group.id);
            let total: Decimal = items.iter().map(|item| item.amount).sum();

            let description = if items.len() == 1 {
                items[0].descriptor()
            } else {
                let mut description = if group.place.is_empty() {
                    "Compra".to_string()
                } else {
                    format!("Compra en {}", group.place)
                };
                let multi_unit: Vec<String> = items
                    .iter()
                    .filter(|item| item.quantity > 1)
                    .map(|item| item.descriptor())
                    .collect();
                if !multi_unit.is_empty() {
                    description.push_str(&format!(" ({})", multi_unit.join(", ")));
                }
                description
            };

            movements.push(Movement {
                kind: MovementKind::Purchase,
                description,
                category: None,
                amount: total,
                currency: group.currency.clone(),
                account: self.account(group.account).map(|a| a.name),
                timestamp: group.timestamp,
            });
        }

        movements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        movements.truncate(limit);
        movements
    }
}
