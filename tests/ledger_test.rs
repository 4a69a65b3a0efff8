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

//! Ledger public API integration tests: balances, transfers, adjustments,
//! and purchase groups.

use billetera_rs::{
    AccountId, AccountKind, Ledger, LedgerError, NewExpense, NewIncome, NewPurchase, NewTransfer,
    OwnerId, PurchaseItem, TimeWindow,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const OWNER: OwnerId = OwnerId(1);

fn seeded() -> Ledger {
    let ledger = Ledger::new();
    ledger.ensure_seed_data();
    ledger
}

fn ars_account(ledger: &Ledger, name: &str, starting: Decimal) -> AccountId {
    ledger
        .create_account(OWNER, name, AccountKind::Bank, "ARS", starting)
        .unwrap()
        .id
}

fn expense_on(ledger: &Ledger, account: AccountId, amount: Decimal) {
    let mut new = NewExpense::new(OWNER, "Gasto", amount, "ARS");
    new.account = Some(account);
    ledger.create_expense(new).unwrap();
}

fn income_on(ledger: &Ledger, account: AccountId, amount: Decimal) {
    let mut new = NewIncome::new(OWNER, "Ingreso", amount, "ARS");
    new.account = Some(account);
    ledger.create_income(new).unwrap();
}

// === Balance derivation ===

#[test]
fn balance_is_starting_plus_inflows_minus_outflows() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(1000.00));

    income_on(&ledger, account, dec!(500.00));
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(1500.00));

    expense_on(&ledger, account, dec!(200.00));
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(1300.00));
}

#[test]
fn balance_without_entries_is_starting_balance() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(-42.50));
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(-42.50));
}

#[test]
fn unattached_entries_do_not_affect_account_balances() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(100.00));

    ledger
        .create_expense(NewExpense::new(OWNER, "Suelto", dec!(30.00), "ARS"))
        .unwrap();

    assert_eq!(ledger.account_balance(account).unwrap(), dec!(100.00));
}

#[test]
fn deleting_an_entry_restores_the_balance() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(100.00));

    let mut new = NewExpense::new(OWNER, "Gasto", dec!(40.00), "ARS");
    new.account = Some(account);
    let entry = ledger.create_expense(new).unwrap();
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(60.00));

    ledger.delete_entry(entry.id).unwrap();
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(100.00));
}

// === Transfers ===

#[test]
fn transfer_round_trip_across_currencies() {
    let ledger = seeded();
    let ars = ars_account(&ledger, "Pesos", dec!(1000.00));
    let usd = ledger
        .create_account(OWNER, "Dólares", AccountKind::Bank, "USD", dec!(0))
        .unwrap()
        .id;

    let before = ledger.dashboard_totals(OWNER, TimeWindow::All);

    let mut new = NewTransfer::new(OWNER, ars, usd, dec!(100.00));
    new.rate = dec!(0.5);
    let transfer = ledger.transfer(new).unwrap();

    assert_eq!(ledger.account_balance(ars).unwrap(), dec!(900.00));
    assert_eq!(ledger.account_balance(usd).unwrap(), dec!(50.00));
    assert_eq!(transfer.dest_amount, dec!(50.00));

    // Transfer-linked entries are excluded from top-line totals.
    let after = ledger.dashboard_totals(OWNER, TimeWindow::All);
    assert_eq!(before, after);
}

#[test]
fn transfer_generates_linked_categorized_entries() {
    let ledger = seeded();
    let a = ars_account(&ledger, "Banco", dec!(500.00));
    let b = ars_account(&ledger, "Efectivo", dec!(0));

    let transfer = ledger
        .transfer(NewTransfer::new(OWNER, a, b, dec!(200.00)))
        .unwrap();

    let outflow = ledger.entry(transfer.outflow.unwrap()).unwrap();
    let inflow = ledger.entry(transfer.inflow.unwrap()).unwrap();

    assert_eq!(outflow.transfer, Some(transfer.id));
    assert_eq!(inflow.transfer, Some(transfer.id));
    assert_eq!(outflow.category.as_deref(), Some("Transferencia Saliente"));
    assert_eq!(inflow.category.as_deref(), Some("Transferencia Entrante"));
    assert_eq!(outflow.description, "Transferencia a Efectivo");
    assert_eq!(inflow.description, "Transferencia desde Banco");
    assert_eq!(outflow.timestamp, inflow.timestamp);
}

#[test]
fn transfer_rejects_same_account() {
    let ledger = seeded();
    let a = ars_account(&ledger, "Banco", dec!(500.00));

    let result = ledger.transfer(NewTransfer::new(OWNER, a, a, dec!(100.00)));
    assert_eq!(result, Err(LedgerError::SameAccount));
}

#[test]
fn transfer_rejects_non_positive_inputs() {
    let ledger = seeded();
    let a = ars_account(&ledger, "Banco", dec!(500.00));
    let b = ars_account(&ledger, "Efectivo", dec!(0));

    let result = ledger.transfer(NewTransfer::new(OWNER, a, b, dec!(0)));
    assert_eq!(result, Err(LedgerError::NonPositiveAmount("source amount")));

    let mut new = NewTransfer::new(OWNER, a, b, dec!(100.00));
    new.rate = dec!(0);
    assert_eq!(
        ledger.transfer(new),
        Err(LedgerError::NonPositiveAmount("rate"))
    );

    let mut new = NewTransfer::new(OWNER, a, b, dec!(100.00));
    new.dest_amount = Some(dec!(-1));
    assert_eq!(
        ledger.transfer(new),
        Err(LedgerError::NonPositiveAmount("destination amount"))
    );

    // Nothing was written by the failed attempts.
    assert_eq!(ledger.account_balance(a).unwrap(), dec!(500.00));
    assert_eq!(ledger.account_balance(b).unwrap(), dec!(0));
    assert!(ledger.transfers(OWNER).is_empty());
}

#[test]
fn transfer_rejects_foreign_accounts() {
    let ledger = seeded();
    let mine = ars_account(&ledger, "Banco", dec!(500.00));
    let theirs = ledger
        .create_account(OwnerId(2), "Ajena", AccountKind::Bank, "ARS", dec!(0))
        .unwrap()
        .id;

    let result = ledger.transfer(NewTransfer::new(OWNER, mine, theirs, dec!(100.00)));
    assert_eq!(result, Err(LedgerError::OwnerMismatch));
}

#[test]
fn transfer_rounds_destination_half_up() {
    let ledger = seeded();
    let ars = ars_account(&ledger, "Pesos", dec!(1000.00));
    let usd = ledger
        .create_account(OWNER, "Dólares", AccountKind::Bank, "USD", dec!(0))
        .unwrap()
        .id;

    // 10.00 × 0.3333 = 3.333 -> 3.33
    let mut new = NewTransfer::new(OWNER, ars, usd, dec!(10.00));
    new.rate = dec!(0.3333);
    let transfer = ledger.transfer(new).unwrap();
    assert_eq!(transfer.dest_amount, dec!(3.33));

    // Exact products still come out with two decimal places.
    let mut new = NewTransfer::new(OWNER, ars, usd, dec!(100.00));
    new.rate = dec!(0.5);
    let transfer = ledger.transfer(new).unwrap();
    assert_eq!(transfer.dest_amount, dec!(50.00));
    assert_eq!(transfer.dest_amount.scale(), 2);
}

#[test]
fn transfer_honors_destination_override() {
    let ledger = seeded();
    let ars = ars_account(&ledger, "Pesos", dec!(1000.00));
    let usd = ledger
        .create_account(OWNER, "Dólares", AccountKind::Bank, "USD", dec!(0))
        .unwrap()
        .id;

    let mut new = NewTransfer::new(OWNER, ars, usd, dec!(100.00));
    new.rate = dec!(0.5);
    new.dest_amount = Some(dec!(48.75));
    let transfer = ledger.transfer(new).unwrap();

    assert_eq!(transfer.dest_amount, dec!(48.75));
    assert_eq!(ledger.account_balance(usd).unwrap(), dec!(48.75));
}

#[test]
fn deleting_a_generated_entry_nulls_the_transfer_link() {
    let ledger = seeded();
    let a = ars_account(&ledger, "Banco", dec!(500.00));
    let b = ars_account(&ledger, "Efectivo", dec!(0));

    let transfer = ledger
        .transfer(NewTransfer::new(OWNER, a, b, dec!(100.00)))
        .unwrap();

    ledger.delete_entry(transfer.outflow.unwrap()).unwrap();

    let record = ledger.get_transfer(transfer.id).unwrap();
    assert_eq!(record.outflow, None);
    assert!(record.inflow.is_some());
}

// === Balance adjustment ===

#[test]
fn adjustment_reconciles_to_declared_balance() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(1000.00));
    expense_on(&ledger, account, dec!(300.00));

    let entry = ledger
        .adjust_balance(account, dec!(900.00), None)
        .unwrap()
        .expect("a corrective entry");

    assert_eq!(ledger.account_balance(account).unwrap(), dec!(900.00));
    assert_eq!(entry.amount, dec!(200.00));
    assert_eq!(entry.description, "Ajuste manual de saldo (Positivo)");
    assert_eq!(entry.category.as_deref(), Some("Ajuste de Saldo"));
}

#[test]
fn negative_adjustment_creates_an_outflow() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(1000.00));

    let entry = ledger
        .adjust_balance(account, dec!(750.00), None)
        .unwrap()
        .expect("a corrective entry");

    assert_eq!(entry.amount, dec!(250.00));
    assert_eq!(entry.description, "Ajuste manual de saldo (Negativo)");
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(750.00));
}

#[test]
fn repeated_adjustment_is_a_no_op() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Banco", dec!(1000.00));

    let first = ledger.adjust_balance(account, dec!(1234.56), None).unwrap();
    assert!(first.is_some());

    let second = ledger.adjust_balance(account, dec!(1234.56), None).unwrap();
    assert!(second.is_none());

    assert_eq!(ledger.account_balance(account).unwrap(), dec!(1234.56));
}

// === Purchase groups ===

fn groceries(account: AccountId) -> NewPurchase {
    NewPurchase {
        owner: OWNER,
        place: "Supermercado Día".to_string(),
        account,
        currency: "ARS".to_string(),
        timestamp: None,
        items: vec![
            PurchaseItem {
                description: "Leche".to_string(),
                category: Some("Alimentación".to_string()),
                quantity: 2,
                unit_price: dec!(150.00),
            },
            PurchaseItem {
                description: "Pan".to_string(),
                category: Some("Alimentación".to_string()),
                quantity: 1,
                unit_price: dec!(200.00),
            },
            PurchaseItem {
                description: "Lavandina".to_string(),
                category: Some("Vivienda".to_string()),
                quantity: 1,
                unit_price: dec!(120.00),
            },
        ],
    }
}

#[test]
fn purchase_creates_group_and_line_entries() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Billetera", dec!(1000.00));

    let (group, entries) = ledger.create_purchase_group(groceries(account)).unwrap();

    assert_eq!(entries.len(), 3);
    // Quantity-extended amount for the milk line.
    assert_eq!(entries[0].amount, dec!(300.00));
    assert!(entries.iter().all(|e| e.group == Some(group.id)));
    assert!(entries.iter().all(|e| e.account == Some(account)));
    assert!(entries.iter().all(|e| e.timestamp == group.timestamp));
    assert_eq!(ledger.group_total(group.id), dec!(620.00));
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(380.00));
}

#[test]
fn purchase_with_no_items_is_rejected() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Billetera", dec!(1000.00));

    let mut new = groceries(account);
    new.items.clear();
    assert_eq!(
        ledger.create_purchase_group(new),
        Err(LedgerError::EmptyPurchase)
    );
}

#[test]
fn purchase_rejects_bad_items() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Billetera", dec!(1000.00));

    let mut new = groceries(account);
    new.items[1].quantity = 0;
    assert_eq!(
        ledger.create_purchase_group(new),
        Err(LedgerError::InvalidQuantity)
    );

    let mut new = groceries(account);
    new.items[2].unit_price = dec!(0);
    assert_eq!(
        ledger.create_purchase_group(new),
        Err(LedgerError::NonPositiveAmount("unit price"))
    );

    // No partial group was written.
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(1000.00));
}

#[test]
fn deleting_one_item_keeps_the_group_with_recomputed_total() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Billetera", dec!(1000.00));
    let (group, entries) = ledger.create_purchase_group(groceries(account)).unwrap();

    ledger.delete_entry(entries[0].id).unwrap();

    assert!(ledger.purchase_group(group.id).is_some());
    assert_eq!(ledger.group_entries(group.id).len(), 2);
    assert_eq!(ledger.group_total(group.id), dec!(320.00));
}

#[test]
fn deleting_the_last_item_deletes_the_group() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Billetera", dec!(1000.00));
    let (group, entries) = ledger.create_purchase_group(groceries(account)).unwrap();

    for entry in &entries {
        ledger.delete_entry(entry.id).unwrap();
    }

    assert!(ledger.purchase_group(group.id).is_none());
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(1000.00));
}

#[test]
fn deleting_an_ungrouped_entry_leaves_groups_alone() {
    let ledger = seeded();
    let account = ars_account(&ledger, "Billetera", dec!(1000.00));
    let (group, _) = ledger.create_purchase_group(groceries(account)).unwrap();

    let mut new = NewExpense::new(OWNER, "Taxi", dec!(50.00), "ARS");
    new.account = Some(account);
    let single = ledger.create_expense(new).unwrap();
    ledger.delete_entry(single.id).unwrap();

    assert!(ledger.purchase_group(group.id).is_some());
}

// === Entry creation ===

#[test]
fn expense_with_new_category_registers_it() {
    let ledger = seeded();

    let mut new = NewExpense::new(OWNER, "Croquetas", dec!(80.00), "ARS");
    new.category = Some("Mascotas".to_string());
    let entry = ledger.create_expense(new).unwrap();

    assert_eq!(entry.category.as_deref(), Some("Mascotas"));
    assert!(
        ledger
            .categories(billetera_rs::EntryFlow::Outflow)
            .iter()
            .any(|c| c.name == "Mascotas")
    );
}

#[test]
fn income_rejects_unknown_currency() {
    let ledger = seeded();
    let result = ledger.create_income(NewIncome::new(OWNER, "Sueldo", dec!(100), "GBP"));
    assert_eq!(result, Err(LedgerError::UnknownCurrency("GBP".to_string())));
}

#[test]
fn delete_missing_entry_fails() {
    let ledger = seeded();
    assert_eq!(
        ledger.delete_entry(billetera_rs::EntryId(999)),
        Err(LedgerError::EntryNotFound)
    );
}
