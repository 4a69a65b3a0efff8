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

//! Concurrency tests using parking_lot's built-in deadlock detector.
//!
//! These tests verify that the engine's locking pattern (entity maps plus a
//! single write guard for multi-entity and read-then-decide operations)
//! does not deadlock, and that the guard actually serializes the races it
//! exists for: double-applied balance adjustments and debt payments
//! sneaking past the cap.

use billetera_rs::{
    AccountKind, DebtDirection, DebtStatus, Ledger, NewDebt, NewExpense, NewIncome, NewPayment,
    NewTransfer, OwnerId, TimeWindow,
};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

fn seeded() -> Arc<Ledger> {
    let ledger = Ledger::new();
    ledger.ensure_seed_data();
    Arc::new(ledger)
}

// === Tests ===

/// Mixed writers and readers against a shared set of accounts.
#[test]
fn no_deadlock_mixed_operations() {
    let detector = start_deadlock_detector();
    let ledger = seeded();

    const NUM_THREADS: usize = 20;
    const NUM_ACCOUNTS: usize = 5;
    const OPS_PER_THREAD: usize = 50;

    let accounts: Vec<_> = (0..NUM_ACCOUNTS)
        .map(|i| {
            ledger
                .create_account(
                    OwnerId(1),
                    &format!("Cuenta {}", i),
                    AccountKind::Bank,
                    "ARS",
                    dec!(10000.00),
                )
                .unwrap()
                .id
        })
        .collect();

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let ledger = ledger.clone();
        let accounts = accounts.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let account = accounts[(thread_id + i) % accounts.len()];

                match i % 4 {
                    0 => {
                        let mut new =
                            NewIncome::new(OwnerId(1), "Ingreso", dec!(10.00), "ARS");
                        new.account = Some(account);
                        ledger.create_income(new).unwrap();
                    }
                    1 => {
                        let mut new = NewExpense::new(OwnerId(1), "Gasto", dec!(1.00), "ARS");
                        new.account = Some(account);
                        ledger.create_expense(new).unwrap();
                    }
                    2 => {
                        let _ = ledger.account_balance(account).unwrap();
                    }
                    _ => {
                        let _ = ledger.dashboard_totals(OwnerId(1), TimeWindow::hours(24));
                    }
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Every write landed across the shared accounts.
    let total: Decimal = accounts
        .iter()
        .map(|id| ledger.account_balance(*id).unwrap())
        .sum();
    let incomes = (0..OPS_PER_THREAD).filter(|i| i % 4 == 0).count() * NUM_THREADS;
    let expenses = (0..OPS_PER_THREAD).filter(|i| i % 4 == 1).count() * NUM_THREADS;
    let expected = dec!(10000.00) * Decimal::from(NUM_ACCOUNTS as u32)
        + dec!(10.00) * Decimal::from(incomes as u32)
        - dec!(1.00) * Decimal::from(expenses as u32);
    assert_eq!(total, expected);
}

/// Concurrent transfers in both directions between the same two accounts.
#[test]
fn no_deadlock_transfer_storm() {
    let detector = start_deadlock_detector();
    let ledger = seeded();

    let a = ledger
        .create_account(OwnerId(1), "Banco", AccountKind::Bank, "ARS", dec!(100000.00))
        .unwrap()
        .id;
    let b = ledger
        .create_account(OwnerId(1), "Efectivo", AccountKind::Cash, "ARS", dec!(100000.00))
        .unwrap()
        .id;

    const NUM_THREADS: usize = 16;
    const TRANSFERS_PER_THREAD: usize = 50;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let ledger = ledger.clone();

        let handle = thread::spawn(move || {
            for _ in 0..TRANSFERS_PER_THREAD {
                let (source, dest) = if thread_id % 2 == 0 { (a, b) } else { (b, a) };
                ledger
                    .transfer(NewTransfer::new(OwnerId(1), source, dest, dec!(5.00)))
                    .unwrap();
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Transfers conserve the combined balance.
    let total = ledger.account_balance(a).unwrap() + ledger.account_balance(b).unwrap();
    assert_eq!(total, dec!(200000.00));
    assert_eq!(
        ledger.transfers(OwnerId(1)).len(),
        NUM_THREADS * TRANSFERS_PER_THREAD
    );
}

/// Concurrent adjustments to the same declared balance must not
/// double-apply: the write guard makes the losers observe diff == 0.
#[test]
fn concurrent_adjustments_apply_once() {
    let detector = start_deadlock_detector();
    let ledger = seeded();

    let account = ledger
        .create_account(OwnerId(1), "Banco", AccountKind::Bank, "ARS", dec!(1000.00))
        .unwrap()
        .id;

    const NUM_THREADS: usize = 20;
    let corrections = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let ledger = ledger.clone();
        let corrections = corrections.clone();

        let handle = thread::spawn(move || {
            if ledger
                .adjust_balance(account, dec!(1500.00), None)
                .unwrap()
                .is_some()
            {
                corrections.fetch_add(1, Ordering::SeqCst);
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert_eq!(corrections.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.account_balance(account).unwrap(), dec!(1500.00));
}

/// Concurrent payments cannot sneak past the remaining-balance cap.
#[test]
fn concurrent_payments_respect_the_cap() {
    let detector = start_deadlock_detector();
    let ledger = seeded();

    let debt = ledger
        .create_debt(NewDebt::new(
            OwnerId(1),
            "Juan",
            DebtDirection::Payable,
            dec!(100.00),
            "ARS",
        ))
        .unwrap();

    const NUM_THREADS: usize = 50;
    let accepted = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let ledger = ledger.clone();
        let accepted = accepted.clone();

        let handle = thread::spawn(move || {
            if ledger
                .pay_debt(NewPayment::new(debt.id, dec!(10.00)))
                .is_ok()
            {
                accepted.fetch_add(1, Ordering::SeqCst);
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Exactly 10 payments of 10.00 fit into a 100.00 principal.
    assert_eq!(accepted.load(Ordering::SeqCst), 10);
    assert_eq!(ledger.debt_outstanding(debt.id).unwrap(), dec!(0.00));
    assert_eq!(ledger.debt(debt.id).unwrap().status, DebtStatus::Paid);
}

/// Readers iterating aggregations while writers add entries.
#[test]
fn no_deadlock_iteration_during_mutation() {
    let detector = start_deadlock_detector();
    let ledger = seeded();
    let running = Arc::new(AtomicBool::new(true));

    let mut handles = Vec::new();

    // Writers add unattached entries.
    for writer_id in 0..5u32 {
        let ledger = ledger.clone();
        let running = running.clone();

        let handle = thread::spawn(move || {
            let mut count = 0;
            while running.load(Ordering::SeqCst) && count < 100 {
                ledger
                    .create_income(NewIncome::new(
                        OwnerId(writer_id),
                        "Ingreso",
                        dec!(1.00),
                        "ARS",
                    ))
                    .unwrap();
                count += 1;
                thread::yield_now();
            }
        });

        handles.push(handle);
    }

    // Readers run the aggregations.
    for reader_id in 0..5u32 {
        let ledger = ledger.clone();
        let running = running.clone();

        let handle = thread::spawn(move || {
            let mut iterations = 0;
            while running.load(Ordering::SeqCst) && iterations < 50 {
                let _ = ledger.dashboard_totals(OwnerId(reader_id), TimeWindow::All);
                let _ = ledger.recent_activity(OwnerId(reader_id), 10);
                iterations += 1;
                thread::yield_now();
            }
        });

        handles.push(handle);
    }

    thread::sleep(Duration::from_millis(500));
    running.store(false, Ordering::SeqCst);

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);
}
