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

use billetera_rs::{
    AccountId, AccountKind, Currency, Ledger, NewExpense, NewIncome, NewTransfer, OwnerId,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Billetera - Replay movement CSV files through the ledger engine
///
/// Reads movements from a CSV file and outputs per-account balances to
/// stdout. Supports expenses, incomes, transfers, and balance adjustments.
/// Accounts are created on first mention using the row's currency.
#[derive(Parser, Debug)]
#[command(name = "billetera-rs")]
#[command(about = "A ledger engine that replays movement CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with movements
    ///
    /// Expected format: type,owner,account,to_account,amount,rate,currency,category,description,date
    /// Example: cargo run -- movements.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Open input file
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // Replay movements from CSV
    let replay = match process_movements(BufReader::new(file)) {
        Ok(replay) => replay,
        Err(e) => {
            eprintln!("Error processing movements: {}", e);
            process::exit(1);
        }
    };

    // Write results to stdout
    if let Err(e) = write_balances(&replay, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, owner, account, to_account, amount, rate, currency,
/// category, description, date`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    movement_type: String,
    owner: u32,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    to_account: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    amount: Option<Decimal>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    rate: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl CsvRecord {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
    }
}

/// Ledger plus the accounts created while replaying, in creation order.
pub struct Replay {
    pub ledger: Ledger,
    accounts: Vec<AccountId>,
}

/// Resolves an account by `(owner, name)`, creating it on first mention
/// with the given currency and a zero starting balance.
fn resolve_account(
    replay: &mut Replay,
    index: &mut HashMap<(u32, String), AccountId>,
    owner: u32,
    name: &str,
    currency: &str,
) -> Option<AccountId> {
    if let Some(id) = index.get(&(owner, name.to_string())) {
        return Some(*id);
    }
    let account = replay
        .ledger
        .create_account(
            OwnerId(owner),
            name,
            AccountKind::Cash,
            currency,
            Decimal::ZERO,
        )
        .ok()?;
    index.insert((owner, name.to_string()), account.id);
    replay.accounts.push(account.id);
    Some(account.id)
}

/// Replays movements from a CSV reader.
///
/// This function uses streaming parsing to handle arbitrarily large CSV
/// files without loading the entire file into memory. Malformed rows and
/// invalid movements are silently skipped.
///
/// # CSV Format
///
/// Expected columns: `type, owner, account, to_account, amount, rate,
/// currency, category, description, date`
/// - `type`: Movement type (expense, income, transfer, adjust)
/// - `owner`: Owner ID (u32)
/// - `account`: Account name (created on first mention; optional for
///   expense/income)
/// - `to_account`: Transfer destination account name
/// - `amount`: Decimal amount; for adjust rows this is the declared
///   real balance
/// - `rate`: Manual exchange rate for transfers (defaults to 1)
/// - `currency`: Currency code (registered on the fly if unknown)
/// - `date`: Optional RFC 3339 timestamp
///
/// # Example
///
/// ```csv
/// type,owner,account,to_account,amount,rate,currency,category,description,date
/// income,1,Banco,,1000.00,,ARS,Salario,Sueldo,
/// expense,1,Banco,,150.00,,ARS,Alimentación,Supermercado,
/// transfer,1,Banco,Efectivo,200.00,1,ARS,,,
/// adjust,1,Banco,,600.00,,ARS,,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual movement errors are logged in debug mode but don't
/// stop processing.
pub fn process_movements<R: Read>(reader: R) -> Result<Replay, csv::Error> {
    let mut replay = Replay {
        ledger: Ledger::new(),
        accounts: Vec::new(),
    };
    replay.ledger.ensure_seed_data();
    let mut index: HashMap<(u32, String), AccountId> = HashMap::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " expense "
        .flexible(true) // Allow missing trailing fields
        .has_headers(true) // Skip first row as header
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                // Skip malformed rows
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                let _ = e;
                continue;
            }
        };

        if let Err(e) = apply_record(&mut replay, &mut index, record) {
            #[cfg(debug_assertions)]
            eprintln!("Skipping movement: {}", e);
            let _ = e;
        }
    }

    Ok(replay)
}

fn apply_record(
    replay: &mut Replay,
    index: &mut HashMap<(u32, String), AccountId>,
    record: CsvRecord,
) -> Result<(), String> {
    let owner = record.owner;
    let currency = record.currency.clone().unwrap_or_default();
    if !currency.is_empty() && replay.ledger.currency(&currency).is_none() {
        // Be forgiving about unseeded currencies: register the code with
        // itself as the display name.
        replay
            .ledger
            .register_currency(Currency::new(currency.clone(), currency.clone(), "$"));
    }

    let account = match record.account.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => {
            Some(resolve_account(replay, index, owner, name, &currency).ok_or("bad account")?)
        }
        None => None,
    };

    match record.movement_type.to_lowercase().as_str() {
        "expense" => {
            let mut new = NewExpense::new(
                OwnerId(owner),
                record.description.clone().unwrap_or_default(),
                record.amount.ok_or("missing amount")?,
                currency,
            );
            new.category = record.category.clone();
            new.account = account;
            new.timestamp = record.timestamp();
            replay
                .ledger
                .create_expense(new)
                .map_err(|e| e.to_string())?;
        }
        "income" => {
            let mut new = NewIncome::new(
                OwnerId(owner),
                record.description.clone().unwrap_or_default(),
                record.amount.ok_or("missing amount")?,
                currency,
            );
            new.category = record.category.clone();
            new.account = account;
            new.timestamp = record.timestamp();
            replay
                .ledger
                .create_income(new)
                .map_err(|e| e.to_string())?;
        }
        "transfer" => {
            let dest_name = record
                .to_account
                .as_deref()
                .filter(|name| !name.is_empty())
                .ok_or("missing to_account")?;
            let dest = resolve_account(replay, index, owner, dest_name, &currency)
                .ok_or("bad to_account")?;
            let mut new = NewTransfer::new(
                OwnerId(owner),
                account.ok_or("missing account")?,
                dest,
                record.amount.ok_or("missing amount")?,
            );
            if let Some(rate) = record.rate {
                new.rate = rate;
            }
            new.note = record.description.clone();
            new.timestamp = record.timestamp();
            replay.ledger.transfer(new).map_err(|e| e.to_string())?;
        }
        "adjust" => {
            replay
                .ledger
                .adjust_balance(
                    account.ok_or("missing account")?,
                    record.amount.ok_or("missing amount")?,
                    record.timestamp(),
                )
                .map_err(|e| e.to_string())?;
        }
        other => return Err(format!("unknown movement type '{}'", other)),
    }
    Ok(())
}

/// Output row: one account with its derived balance.
#[derive(Debug, Serialize)]
struct BalanceRecord {
    account: String,
    owner: u32,
    currency: String,
    balance: Decimal,
}

/// Write account balances to a CSV writer.
///
/// Outputs all accounts in creation order with their derived balances.
///
/// # CSV Format
///
/// Columns: `account, owner, currency, balance`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_balances<W: Write>(replay: &Replay, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for account_id in &replay.accounts {
        let Some(account) = replay.ledger.account(*account_id) else {
            continue;
        };
        let Ok(balance) = replay.ledger.account_balance(*account_id) else {
            continue;
        };
        wtr.serialize(BalanceRecord {
            account: account.name,
            owner: account.owner.0,
            currency: account.currency,
            balance,
        })?;
    }

    // Flush to ensure all data is written
    wtr.flush()?;
    Ok(())
}
