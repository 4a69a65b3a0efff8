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

//! The ledger engine.
//!
//! [`Ledger`] is the central component: it owns every entity collection and
//! exposes the mutating operations (expenses, incomes, purchases, transfers,
//! balance adjustments, debts and their payments). The read-side aggregation
//! operations live in [`crate::report`].
//!
//! # Consistency model
//!
//! - Account balances are never stored; every read recomputes them by
//!   aggregating the account's entry history, so entries and balances
//!   cannot drift apart.
//! - Operations that write multiple entities (a transfer writes two entries
//!   plus the transfer record) validate everything first and only then
//!   write; the writes themselves cannot fail, which gives all-or-nothing
//!   behavior.
//! - Read-then-decide operations (balance adjustment, the debt payment
//!   cap) and all multi-entity writes run under a single engine-wide write
//!   guard, so two concurrent adjustments cannot both observe the same
//!   stale balance.
//!
//! # Invariants
//!
//! - Entry amounts are strictly positive; direction is the entry's flow.
//! - A purchase group always has at least one entry.
//! - A debt's status is `Paid` iff its outstanding balance is `<= 0`,
//!   recomputed synchronously after every payment mutation.

use crate::account::{Account, AccountKind};
use crate::base::{AccountId, CategoryId, DebtId, EntryId, GroupId, OwnerId, PaymentId, TransferId};
use crate::category::{
    CATEGORY_ADJUSTMENT, CATEGORY_DEBTS, CATEGORY_TRANSFER_IN, CATEGORY_TRANSFER_OUT, Category,
    SEED_EXPENSE_CATEGORIES, SEED_INCOME_CATEGORIES,
};
use crate::currency::{Currency, seed_currencies};
use crate::debt::{
    Debt, DebtDirection, DebtPayment, DebtStatus, NewDebt, NewPayment, PaymentUpdate,
    compute_status,
};
use crate::entry::{Entry, EntryFlow, EntryStore, NewExpense, NewIncome, NewPurchase, PurchaseGroup};
use crate::error::LedgerError;
use crate::transfer::{NewTransfer, Transfer, convert};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// In-memory, thread-safe ledger engine.
pub struct Ledger {
    pub(crate) accounts: DashMap<AccountId, Account>,
    pub(crate) entries: EntryStore,
    pub(crate) groups: DashMap<GroupId, PurchaseGroup>,
    pub(crate) transfers: DashMap<TransferId, Transfer>,
    pub(crate) debts: DashMap<DebtId, Debt>,
    pub(crate) payments: DashMap<PaymentId, DebtPayment>,
    /// Currencies keyed by code.
    pub(crate) currencies: DashMap<String, Currency>,
    /// Categories keyed by `(flow, name)`; expense and income namespaces
    /// are distinct.
    pub(crate) categories: DashMap<(EntryFlow, String), Category>,
    /// Single monotonic counter for all internally-allocated ids.
    next_id: AtomicU64,
    /// Serializes multi-entity mutations and read-then-decide operations.
    write_guard: Mutex<()>,
}

impl Ledger {
    /// Creates an empty ledger with no reference data. Call
    /// [`ensure_seed_data`](Self::ensure_seed_data) once at startup to
    /// register the stock currencies and categories.
    pub fn new() -> Self {
        Ledger {
            accounts: DashMap::new(),
            entries: EntryStore::new(),
            groups: DashMap::new(),
            transfers: DashMap::new(),
            debts: DashMap::new(),
            payments: DashMap::new(),
            currencies: DashMap::new(),
            categories: DashMap::new(),
            next_id: AtomicU64::new(1),
            write_guard: Mutex::new(()),
        }
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // === Reference data ===

    /// Idempotently registers the stock currencies and categories.
    ///
    /// Safe to call on every process start; existing records are left
    /// untouched.
    pub fn ensure_seed_data(&self) {
        for currency in seed_currencies() {
            self.register_currency(currency);
        }
        for name in SEED_EXPENSE_CATEGORIES {
            self.get_or_create_category(EntryFlow::Outflow, name);
        }
        for name in SEED_INCOME_CATEGORIES {
            self.get_or_create_category(EntryFlow::Inflow, name);
        }
        debug!("seed data ensured");
    }

    /// Registers a currency if its code is not already known.
    pub fn register_currency(&self, currency: Currency) {
        self.currencies
            .entry(currency.code.clone())
            .or_insert(currency);
    }

    /// Looks up a currency by code.
    pub fn currency(&self, code: &str) -> Option<Currency> {
        self.currencies.get(code).map(|c| c.clone())
    }

    /// All registered currencies, sorted by code.
    pub fn currencies(&self) -> Vec<Currency> {
        let mut all: Vec<Currency> = self.currencies.iter().map(|c| c.clone()).collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        all
    }

    /// Returns the category for `(flow, name)`, creating it on first use.
    pub fn get_or_create_category(&self, flow: EntryFlow, name: &str) -> Category {
        self.categories
            .entry((flow, name.to_string()))
            .or_insert_with(|| Category {
                id: CategoryId(self.alloc_id()),
                flow,
                name: name.to_string(),
            })
            .clone()
    }

    /// All categories of one flow, sorted by name.
    pub fn categories(&self, flow: EntryFlow) -> Vec<Category> {
        let mut all: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| c.flow == flow)
            .map(|c| c.clone())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    // === Accounts ===

    /// Creates an account denominated in `currency`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownCurrency`] - the currency code is not
    ///   registered.
    pub fn create_account(
        &self,
        owner: OwnerId,
        name: &str,
        kind: AccountKind,
        currency: &str,
        starting_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.require_currency(currency)?;
        let account = Account {
            id: AccountId(self.alloc_id()),
            owner,
            name: name.to_string(),
            kind,
            currency: currency.to_string(),
            starting_balance,
        };
        info!(account = %account.id, owner = %owner, "account created");
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    /// Looks up an account by id.
    pub fn account(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id).map(|a| a.clone())
    }

    /// All accounts of one owner, in id order.
    pub fn accounts(&self, owner: OwnerId) -> Vec<Account> {
        let mut all: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| a.owner == owner)
            .map(|a| a.clone())
            .collect();
        all.sort_by_key(|a| a.id.0);
        all
    }

    /// Deletes an account, detaching its entries.
    ///
    /// Entries that referenced the account survive as unattached records.
    /// Deletion is refused while a transfer or a purchase group still
    /// references the account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`]
    /// - [`LedgerError::AccountInUse`] - a transfer or purchase group
    ///   references the account.
    pub fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        let _guard = self.write_guard.lock();

        if !self.accounts.contains_key(&id) {
            return Err(LedgerError::AccountNotFound);
        }
        let referenced = self
            .transfers
            .iter()
            .any(|t| t.source_account == id || t.dest_account == id)
            || self.groups.iter().any(|g| g.account == id);
        if referenced {
            return Err(LedgerError::AccountInUse);
        }

        let detach: Vec<EntryId> = self.entries.fold(Vec::new(), |mut ids, entry| {
            if entry.account == Some(id) {
                ids.push(entry.id);
            }
            ids
        });
        for entry_id in detach {
            self.entries.update(entry_id, |entry| entry.account = None);
        }
        self.accounts.remove(&id);
        info!(account = %id, "account deleted");
        Ok(())
    }

    /// Derived balance of an account: starting balance plus the signed sum
    /// of all entries attached to it.
    ///
    /// An account with no entries yields its starting balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`]
    pub fn account_balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        let account = self.require_account(id)?;
        Ok(self.balance_of(&account))
    }

    pub(crate) fn balance_of(&self, account: &Account) -> Decimal {
        self.entries.fold(account.starting_balance, |sum, entry| {
            if entry.account == Some(account.id) {
                sum + entry.balance_effect()
            } else {
                sum
            }
        })
    }

    // === Entries ===

    /// Records an expense (outflow).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NonPositiveAmount`] - amount is zero or negative.
    /// - [`LedgerError::InvalidQuantity`] - quantity is zero.
    /// - [`LedgerError::UnknownCurrency`]
    /// - [`LedgerError::AccountNotFound`] - the target account is missing.
    /// - [`LedgerError::OwnerMismatch`] - the target account belongs to a
    ///   different owner.
    pub fn create_expense(&self, new: NewExpense) -> Result<Entry, LedgerError> {
        if new.quantity == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        self.insert_entry(
            EntryFlow::Outflow,
            new.owner,
            new.description,
            new.amount,
            new.quantity,
            new.currency,
            new.category,
            new.account,
            new.timestamp,
        )
    }

    /// Records an income (inflow).
    ///
    /// Same errors as [`create_expense`](Self::create_expense).
    pub fn create_income(&self, new: NewIncome) -> Result<Entry, LedgerError> {
        self.insert_entry(
            EntryFlow::Inflow,
            new.owner,
            new.description,
            new.amount,
            1,
            new.currency,
            new.category,
            new.account,
            new.timestamp,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_entry(
        &self,
        flow: EntryFlow,
        owner: OwnerId,
        description: String,
        amount: Decimal,
        quantity: u32,
        currency: String,
        category: Option<String>,
        account: Option<AccountId>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Entry, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("amount"));
        }
        self.require_currency(&currency)?;
        if let Some(account_id) = account {
            let target = self.require_account(account_id)?;
            if target.owner != owner {
                return Err(LedgerError::OwnerMismatch);
            }
        }
        let category = category.map(|name| self.get_or_create_category(flow, &name).name);

        let entry = Entry {
            id: EntryId(self.alloc_id()),
            owner,
            flow,
            description,
            amount,
            quantity,
            currency,
            category,
            account,
            group: None,
            transfer: None,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };
        debug!(entry = %entry.id, owner = %entry.owner, amount = %entry.amount, ?flow, "entry created");
        self.entries.insert(entry.clone());
        Ok(entry)
    }

    /// Records a multi-item purchase: one group plus one outflow entry per
    /// item, all sharing the same account, currency and timestamp.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyPurchase`] - no items.
    /// - [`LedgerError::InvalidQuantity`] - an item with quantity zero.
    /// - [`LedgerError::NonPositiveAmount`] - an item with a non-positive
    ///   unit price.
    /// - [`LedgerError::UnknownCurrency`], [`LedgerError::AccountNotFound`],
    ///   [`LedgerError::OwnerMismatch`]
    pub fn create_purchase_group(
        &self,
        new: NewPurchase,
    ) -> Result<(PurchaseGroup, Vec<Entry>), LedgerError> {
        let _guard = self.write_guard.lock();

        if new.items.is_empty() {
            return Err(LedgerError::EmptyPurchase);
        }
        self.require_currency(&new.currency)?;
        let account = self.require_account(new.account)?;
        if account.owner != new.owner {
            return Err(LedgerError::OwnerMismatch);
        }
        for item in &new.items {
            if item.quantity == 0 {
                return Err(LedgerError::InvalidQuantity);
            }
            if item.unit_price <= Decimal::ZERO {
                return Err(LedgerError::NonPositiveAmount("unit price"));
            }
        }

        let timestamp = new.timestamp.unwrap_or_else(Utc::now);
        let group = PurchaseGroup {
            id: GroupId(self.alloc_id()),
            owner: new.owner,
            place: new.place,
            account: new.account,
            currency: new.currency.clone(),
            timestamp,
        };

        let mut entries = Vec::with_capacity(new.items.len());
        for item in new.items {
            let category = item
                .category
                .map(|name| self.get_or_create_category(EntryFlow::Outflow, &name).name);
            let entry = Entry {
                id: EntryId(self.alloc_id()),
                owner: new.owner,
                flow: EntryFlow::Outflow,
                description: item.description,
                amount: Decimal::from(item.quantity) * item.unit_price,
                quantity: item.quantity,
                currency: new.currency.clone(),
                category,
                account: Some(new.account),
                group: Some(group.id),
                transfer: None,
                timestamp,
            };
            self.entries.insert(entry.clone());
            entries.push(entry);
        }
        info!(group = %group.id, owner = %group.owner, items = entries.len(), "purchase recorded");
        self.groups.insert(group.id, group.clone());
        Ok((group, entries))
    }

    /// Looks up a purchase group by id.
    pub fn purchase_group(&self, id: GroupId) -> Option<PurchaseGroup> {
        self.groups.get(&id).map(|g| g.clone())
    }

    /// Entries belonging to a purchase group, in insertion order.
    pub fn group_entries(&self, id: GroupId) -> Vec<Entry> {
        self.entries
            .snapshot()
            .into_iter()
            .filter(|entry| entry.group == Some(id))
            .collect()
    }

    /// Total of a purchase group: the sum of its entries' amounts.
    pub fn group_total(&self, id: GroupId) -> Decimal {
        self.entries.fold(Decimal::ZERO, |sum, entry| {
            if entry.group == Some(id) {
                sum + entry.amount
            } else {
                sum
            }
        })
    }

    /// Looks up an entry by id.
    pub fn entry(&self, id: EntryId) -> Option<Entry> {
        self.entries.get(id)
    }

    /// Deletes an entry.
    ///
    /// If the entry was the last member of a purchase group the group is
    /// deleted with it; if it was generated by a transfer, that side of the
    /// transfer record is nulled while the record itself remains.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EntryNotFound`]
    pub fn delete_entry(&self, id: EntryId) -> Result<(), LedgerError> {
        let _guard = self.write_guard.lock();

        let entry = self.entries.remove(id).ok_or(LedgerError::EntryNotFound)?;

        if let Some(group_id) = entry.group {
            let emptied = self
                .entries
                .fold(true, |empty, other| empty && other.group != Some(group_id));
            if emptied {
                self.groups.remove(&group_id);
                debug!(group = %group_id, "emptied purchase group deleted");
            }
        }

        if let Some(transfer_id) = entry.transfer {
            if let Some(mut transfer) = self.transfers.get_mut(&transfer_id) {
                if transfer.outflow == Some(id) {
                    transfer.outflow = None;
                }
                if transfer.inflow == Some(id) {
                    transfer.inflow = None;
                }
            }
        }

        debug!(entry = %id, "entry deleted");
        Ok(())
    }

    // === Transfers ===

    /// Moves money between two of the owner's accounts, possibly across
    /// currencies at a user-declared rate.
    ///
    /// Creates an outflow on the source account, an inflow on the
    /// destination account, and the linking [`Transfer`] record, atomically.
    /// When no destination amount is supplied it is computed as
    /// `source_amount × rate`, rounded to 2 decimal places half-up. Both
    /// generated entries carry the transfer link, which excludes them from
    /// top-line income/expense totals.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SameAccount`] - source equals destination.
    /// - [`LedgerError::AccountNotFound`]
    /// - [`LedgerError::OwnerMismatch`] - either account belongs to someone
    ///   else.
    /// - [`LedgerError::NonPositiveAmount`] - non-positive source amount,
    ///   rate, or destination amount override.
    pub fn transfer(&self, new: NewTransfer) -> Result<Transfer, LedgerError> {
        let _guard = self.write_guard.lock();

        if new.source_account == new.dest_account {
            return Err(LedgerError::SameAccount);
        }
        let source = self.require_account(new.source_account)?;
        let dest = self.require_account(new.dest_account)?;
        if source.owner != new.owner || dest.owner != new.owner {
            return Err(LedgerError::OwnerMismatch);
        }
        if new.source_amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("source amount"));
        }
        if new.rate <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("rate"));
        }
        if let Some(dest_amount) = new.dest_amount {
            if dest_amount <= Decimal::ZERO {
                return Err(LedgerError::NonPositiveAmount("destination amount"));
            }
        }
        let dest_amount = new
            .dest_amount
            .unwrap_or_else(|| convert(new.source_amount, new.rate));

        let out_category = self
            .get_or_create_category(EntryFlow::Outflow, CATEGORY_TRANSFER_OUT)
            .name;
        let in_category = self
            .get_or_create_category(EntryFlow::Inflow, CATEGORY_TRANSFER_IN)
            .name;

        let timestamp = new.timestamp.unwrap_or_else(Utc::now);
        let transfer_id = TransferId(self.alloc_id());

        let outflow = Entry {
            id: EntryId(self.alloc_id()),
            owner: new.owner,
            flow: EntryFlow::Outflow,
            description: format!("Transferencia a {}", dest.name),
            amount: new.source_amount,
            quantity: 1,
            currency: source.currency.clone(),
            category: Some(out_category),
            account: Some(source.id),
            group: None,
            transfer: Some(transfer_id),
            timestamp,
        };
        let inflow = Entry {
            id: EntryId(self.alloc_id()),
            owner: new.owner,
            flow: EntryFlow::Inflow,
            description: format!("Transferencia desde {}", source.name),
            amount: dest_amount,
            quantity: 1,
            currency: dest.currency.clone(),
            category: Some(in_category),
            account: Some(dest.id),
            group: None,
            transfer: Some(transfer_id),
            timestamp,
        };
        let transfer = Transfer {
            id: transfer_id,
            owner: new.owner,
            source_account: source.id,
            dest_account: dest.id,
            source_amount: new.source_amount,
            dest_amount,
            rate: new.rate,
            note: new.note.unwrap_or_default(),
            timestamp,
            outflow: Some(outflow.id),
            inflow: Some(inflow.id),
        };

        // Validation is complete; none of these writes can fail.
        self.entries.insert(outflow);
        self.entries.insert(inflow);
        self.transfers.insert(transfer.id, transfer.clone());
        info!(
            transfer = %transfer.id,
            source = %transfer.source_account,
            dest = %transfer.dest_account,
            amount = %transfer.source_amount,
            rate = %transfer.rate,
            "transfer recorded"
        );
        Ok(transfer)
    }

    /// Looks up a transfer by id.
    pub fn get_transfer(&self, id: TransferId) -> Option<Transfer> {
        self.transfers.get(&id).map(|t| t.clone())
    }

    /// All transfers of one owner, newest first.
    pub fn transfers(&self, owner: OwnerId) -> Vec<Transfer> {
        let mut all: Vec<Transfer> = self
            .transfers
            .iter()
            .filter(|t| t.owner == owner)
            .map(|t| t.clone())
            .collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all
    }

    // === Balance adjustment ===

    /// Reconciles an account's derived balance against a user-declared real
    /// balance by synthesizing a corrective entry.
    ///
    /// Returns the corrective entry, or `None` when the balances already
    /// match. Afterwards `account_balance(account) == declared_balance`
    /// holds; repeating the call with the same declared value creates
    /// nothing further.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`]
    pub fn adjust_balance(
        &self,
        account_id: AccountId,
        declared_balance: Decimal,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Option<Entry>, LedgerError> {
        let _guard = self.write_guard.lock();

        let account = self.require_account(account_id)?;
        let system_balance = self.balance_of(&account);
        let diff = declared_balance - system_balance;

        if diff.is_zero() {
            debug!(account = %account_id, "balance already consistent");
            return Ok(None);
        }

        let (flow, description) = if diff > Decimal::ZERO {
            (EntryFlow::Inflow, "Ajuste manual de saldo (Positivo)")
        } else {
            (EntryFlow::Outflow, "Ajuste manual de saldo (Negativo)")
        };
        let category = self.get_or_create_category(flow, CATEGORY_ADJUSTMENT).name;

        let entry = Entry {
            id: EntryId(self.alloc_id()),
            owner: account.owner,
            flow,
            description: description.to_string(),
            amount: diff.abs(),
            quantity: 1,
            currency: account.currency.clone(),
            category: Some(category),
            account: Some(account.id),
            group: None,
            transfer: None,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };
        info!(account = %account_id, diff = %diff, "balance adjusted");
        self.entries.insert(entry.clone());
        Ok(Some(entry))
    }

    // === Debts ===

    /// Opens a debt with a third party.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NonPositiveAmount`] - non-positive principal.
    /// - [`LedgerError::UnknownCurrency`]
    pub fn create_debt(&self, new: NewDebt) -> Result<Debt, LedgerError> {
        if new.principal <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("principal"));
        }
        self.require_currency(&new.currency)?;

        let debt = Debt {
            id: DebtId(self.alloc_id()),
            owner: new.owner,
            counterparty: new.counterparty,
            direction: new.direction,
            principal: new.principal,
            currency: new.currency,
            opened_at: new.opened_at.unwrap_or_else(Utc::now),
            due_date: new.due_date,
            description: new.description.unwrap_or_default(),
            status: DebtStatus::Pending,
        };
        info!(debt = %debt.id, owner = %debt.owner, principal = %debt.principal, "debt opened");
        self.debts.insert(debt.id, debt.clone());
        Ok(debt)
    }

    /// Looks up a debt by id.
    pub fn debt(&self, id: DebtId) -> Option<Debt> {
        self.debts.get(&id).map(|d| d.clone())
    }

    /// All debts of one owner, newest first.
    pub fn debts(&self, owner: OwnerId) -> Vec<Debt> {
        let mut all: Vec<Debt> = self
            .debts
            .iter()
            .filter(|d| d.owner == owner)
            .map(|d| d.clone())
            .collect();
        all.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        all
    }

    /// Payments of one debt, oldest first.
    pub fn debt_payments(&self, debt: DebtId) -> Vec<DebtPayment> {
        let mut all: Vec<DebtPayment> = self
            .payments
            .iter()
            .filter(|p| p.debt == debt)
            .map(|p| p.clone())
            .collect();
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        all
    }

    fn paid_total(&self, debt: DebtId) -> Decimal {
        self.payments
            .iter()
            .filter(|p| p.debt == debt)
            .map(|p| p.amount)
            .sum()
    }

    /// Outstanding balance of a debt: principal minus the paid total.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DebtNotFound`]
    pub fn debt_outstanding(&self, id: DebtId) -> Result<Decimal, LedgerError> {
        let debt = self.debts.get(&id).ok_or(LedgerError::DebtNotFound)?;
        Ok(debt.principal - self.paid_total(id))
    }

    fn recompute_debt_status(&self, id: DebtId) {
        let paid = self.paid_total(id);
        if let Some(mut debt) = self.debts.get_mut(&id) {
            debt.status = compute_status(debt.principal, paid);
        }
    }

    /// Records a payment against a debt, optionally mirroring it into the
    /// main ledger, and recomputes the debt's status.
    ///
    /// The mirror is an unattached outflow ("Pago de deuda a ...") for a
    /// payable debt or inflow ("Cobro de deuda a ...") for a receivable
    /// one, under the "Deudas" category.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DebtNotFound`]
    /// - [`LedgerError::NonPositiveAmount`] - non-positive payment amount.
    /// - [`LedgerError::PaymentExceedsBalance`] - the payment would push
    ///   the paid total over the principal.
    pub fn pay_debt(&self, new: NewPayment) -> Result<DebtPayment, LedgerError> {
        let _guard = self.write_guard.lock();

        let debt = self.debts.get(&new.debt).ok_or(LedgerError::DebtNotFound)?.clone();
        if new.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("payment amount"));
        }
        let remaining = debt.principal - self.paid_total(debt.id);
        if new.amount > remaining {
            return Err(LedgerError::PaymentExceedsBalance { remaining });
        }

        let timestamp = new.timestamp.unwrap_or_else(Utc::now);
        let mirror_entry = if new.mirror_to_ledger {
            Some(self.create_mirror(&debt, new.amount, timestamp))
        } else {
            None
        };

        let payment = DebtPayment {
            id: PaymentId(self.alloc_id()),
            debt: debt.id,
            amount: new.amount,
            timestamp,
            note: new.note.unwrap_or_default(),
            mirror_entry,
        };
        self.payments.insert(payment.id, payment.clone());
        self.recompute_debt_status(debt.id);
        info!(debt = %debt.id, payment = %payment.id, amount = %payment.amount, "debt payment recorded");
        Ok(payment)
    }

    fn create_mirror(&self, debt: &Debt, amount: Decimal, timestamp: DateTime<Utc>) -> EntryId {
        let (flow, description) = match debt.direction {
            DebtDirection::Payable => (
                EntryFlow::Outflow,
                format!("Pago de deuda a {}", debt.counterparty),
            ),
            DebtDirection::Receivable => (
                EntryFlow::Inflow,
                format!("Cobro de deuda a {}", debt.counterparty),
            ),
        };
        let category = self.get_or_create_category(flow, CATEGORY_DEBTS).name;
        let entry = Entry {
            id: EntryId(self.alloc_id()),
            owner: debt.owner,
            flow,
            description,
            amount,
            quantity: 1,
            currency: debt.currency.clone(),
            category: Some(category),
            account: None,
            group: None,
            transfer: None,
            timestamp,
        };
        let id = entry.id;
        self.entries.insert(entry);
        id
    }

    /// Rewrites a payment's amount, timestamp, note, and mirroring state,
    /// then recomputes the debt's status.
    ///
    /// The cap check excludes the payment's own previous amount. An
    /// existing mirror entry is updated in place; turning mirroring off
    /// deletes it and clears the link; turning it back on creates a fresh
    /// one.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::PaymentNotFound`], [`LedgerError::DebtNotFound`]
    /// - [`LedgerError::NonPositiveAmount`]
    /// - [`LedgerError::PaymentExceedsBalance`]
    pub fn update_payment(
        &self,
        id: PaymentId,
        update: PaymentUpdate,
    ) -> Result<DebtPayment, LedgerError> {
        let _guard = self.write_guard.lock();

        let payment = self
            .payments
            .get(&id)
            .ok_or(LedgerError::PaymentNotFound)?
            .clone();
        let debt = self
            .debts
            .get(&payment.debt)
            .ok_or(LedgerError::DebtNotFound)?
            .clone();
        if update.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("payment amount"));
        }
        let others = self.paid_total(debt.id) - payment.amount;
        let remaining = debt.principal - others;
        if update.amount > remaining {
            return Err(LedgerError::PaymentExceedsBalance { remaining });
        }

        let mirror_entry = if update.mirror_to_ledger {
            let existing = payment.mirror_entry.filter(|eid| self.entries.get(*eid).is_some());
            match existing {
                Some(eid) => {
                    self.entries.update(eid, |entry| {
                        entry.amount = update.amount;
                        entry.timestamp = update.timestamp;
                    });
                    Some(eid)
                }
                // The mirror may have been deleted as an ordinary entry in
                // the meantime; create a fresh one.
                None => Some(self.create_mirror(&debt, update.amount, update.timestamp)),
            }
        } else {
            if let Some(eid) = payment.mirror_entry {
                let _ = self.entries.remove(eid);
            }
            None
        };

        let mut updated = payment;
        updated.amount = update.amount;
        updated.timestamp = update.timestamp;
        if let Some(note) = update.note {
            updated.note = note;
        }
        updated.mirror_entry = mirror_entry;
        self.payments.insert(updated.id, updated.clone());
        self.recompute_debt_status(debt.id);
        debug!(payment = %id, amount = %updated.amount, "debt payment updated");
        Ok(updated)
    }

    /// Deletes a payment and recomputes the debt's status.
    ///
    /// A mirrored ledger entry is left behind as an ordinary unlinked
    /// record; it is not deleted with the payment.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::PaymentNotFound`]
    pub fn delete_payment(&self, id: PaymentId) -> Result<(), LedgerError> {
        let _guard = self.write_guard.lock();

        let (_, payment) = self
            .payments
            .remove(&id)
            .ok_or(LedgerError::PaymentNotFound)?;
        self.recompute_debt_status(payment.debt);
        debug!(payment = %id, debt = %payment.debt, "debt payment deleted");
        Ok(())
    }

    /// Changes a debt's principal and recomputes its status.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DebtNotFound`]
    /// - [`LedgerError::NonPositiveAmount`]
    pub fn update_debt_principal(
        &self,
        id: DebtId,
        principal: Decimal,
    ) -> Result<Debt, LedgerError> {
        let _guard = self.write_guard.lock();

        if principal <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount("principal"));
        }
        {
            let mut debt = self.debts.get_mut(&id).ok_or(LedgerError::DebtNotFound)?;
            debt.principal = principal;
        }
        self.recompute_debt_status(id);
        Ok(self.debt(id).expect("debt present under write guard"))
    }

    /// Deletes a debt and all its payments.
    ///
    /// Mirrored ledger entries are kept as ordinary unlinked records.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DebtNotFound`]
    pub fn delete_debt(&self, id: DebtId) -> Result<(), LedgerError> {
        let _guard = self.write_guard.lock();

        if self.debts.remove(&id).is_none() {
            return Err(LedgerError::DebtNotFound);
        }
        self.payments.retain(|_, payment| payment.debt != id);
        info!(debt = %id, "debt deleted");
        Ok(())
    }

    // === Internal lookups ===

    fn require_currency(&self, code: &str) -> Result<(), LedgerError> {
        if self.currencies.contains_key(code) {
            Ok(())
        } else {
            Err(LedgerError::UnknownCurrency(code.to_string()))
        }
    }

    pub(crate) fn require_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .get(&id)
            .map(|a| a.clone())
            .ok_or(LedgerError::AccountNotFound)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seeded() -> Ledger {
        let ledger = Ledger::new();
        ledger.ensure_seed_data();
        ledger
    }

    #[test]
    fn seed_data_is_idempotent() {
        let ledger = seeded();
        let currencies_before = ledger.currencies().len();
        let categories_before = ledger.categories(EntryFlow::Outflow).len();

        ledger.ensure_seed_data();

        assert_eq!(ledger.currencies().len(), currencies_before);
        assert_eq!(ledger.categories(EntryFlow::Outflow).len(), categories_before);
    }

    #[test]
    fn account_requires_known_currency() {
        let ledger = seeded();
        let result = ledger.create_account(
            OwnerId(1),
            "Banco",
            AccountKind::Bank,
            "XXX",
            Decimal::ZERO,
        );
        assert_eq!(result, Err(LedgerError::UnknownCurrency("XXX".to_string())));
    }

    #[test]
    fn expense_rejects_non_positive_amount() {
        let ledger = seeded();
        let result = ledger.create_expense(NewExpense::new(OwnerId(1), "Café", dec!(0), "ARS"));
        assert_eq!(result, Err(LedgerError::NonPositiveAmount("amount")));

        let result = ledger.create_expense(NewExpense::new(OwnerId(1), "Café", dec!(-5), "ARS"));
        assert_eq!(result, Err(LedgerError::NonPositiveAmount("amount")));
    }

    #[test]
    fn expense_rejects_foreign_account() {
        let ledger = seeded();
        let account = ledger
            .create_account(OwnerId(1), "Billetera", AccountKind::Cash, "ARS", dec!(0))
            .unwrap();

        let mut new = NewExpense::new(OwnerId(2), "Café", dec!(100), "ARS");
        new.account = Some(account.id);
        assert_eq!(ledger.create_expense(new), Err(LedgerError::OwnerMismatch));
    }

    #[test]
    fn category_namespaces_are_per_flow() {
        let ledger = seeded();
        let expense = ledger.get_or_create_category(EntryFlow::Outflow, "Deudas");
        let income = ledger.get_or_create_category(EntryFlow::Inflow, "Deudas");
        assert_ne!(expense.id, income.id);
        assert_eq!(expense.name, income.name);
    }

    #[test]
    fn categories_are_created_once() {
        let ledger = seeded();
        let first = ledger.get_or_create_category(EntryFlow::Outflow, "Mascotas");
        let second = ledger.get_or_create_category(EntryFlow::Outflow, "Mascotas");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn delete_account_detaches_entries() {
        let ledger = seeded();
        let account = ledger
            .create_account(OwnerId(1), "Billetera", AccountKind::Cash, "ARS", dec!(0))
            .unwrap();
        let mut new = NewExpense::new(OwnerId(1), "Café", dec!(100), "ARS");
        new.account = Some(account.id);
        let entry = ledger.create_expense(new).unwrap();

        ledger.delete_account(account.id).unwrap();

        assert_eq!(ledger.entry(entry.id).unwrap().account, None);
        assert_eq!(
            ledger.account_balance(account.id),
            Err(LedgerError::AccountNotFound)
        );
    }

    #[test]
    fn delete_account_blocked_by_transfer() {
        let ledger = seeded();
        let a = ledger
            .create_account(OwnerId(1), "Origen", AccountKind::Bank, "ARS", dec!(1000))
            .unwrap();
        let b = ledger
            .create_account(OwnerId(1), "Destino", AccountKind::Cash, "ARS", dec!(0))
            .unwrap();
        ledger
            .transfer(NewTransfer::new(OwnerId(1), a.id, b.id, dec!(100)))
            .unwrap();

        assert_eq!(ledger.delete_account(a.id), Err(LedgerError::AccountInUse));
        assert_eq!(ledger.delete_account(b.id), Err(LedgerError::AccountInUse));
    }
}
