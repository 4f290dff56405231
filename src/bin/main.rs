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

use clap::Parser;
use csv::{ReaderBuilder, StringRecord, Trim};
use ressourcerie_checkout::config::LogFormat;
use ressourcerie_checkout::money::parse_amount;
use ressourcerie_checkout::{
    CheckoutSession, Config, Event, FocusField, Key, Outcome, PaymentMethod, ReplayError,
    SaleContext, SaleLineItem,
};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Checkout replay - finalize a sale from a recorded operator session
///
/// Replays keypad events against the finalization engine and prints the
/// resulting submission as JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "checkout")]
#[command(about = "Replays a sale finalization and prints the submission", long_about = None)]
struct Args {
    /// Path to CSV file with operator events
    ///
    /// Expected format: event,value
    /// Example: checkout --total 12.50 session.csv
    #[arg(value_name = "FILE")]
    events: PathBuf,

    /// Register configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sale line items (CSV)
    #[arg(long, value_name = "FILE")]
    items: Option<PathBuf>,

    /// Sale total computed from the line items
    #[arg(long, default_value = "0")]
    total: Decimal,

    /// Note attached to the sale before finalization
    #[arg(long)]
    note: Option<String>,

    /// Overrides the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };
    init_logging(&config, args.log_level.as_deref());

    let items = match &args.items {
        Some(path) => match open(path).and_then(read_items) {
            Ok(items) => items,
            Err(e) => {
                eprintln!("Error reading items: {}", e);
                process::exit(1);
            }
        },
        None => Vec::new(),
    };

    let events = match open(&args.events).and_then(read_events) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Error reading events: {}", e);
            process::exit(1);
        }
    };

    let ctx = SaleContext::new(
        items,
        args.total,
        args.note.clone(),
        config.capabilities(),
        &config.classifier(),
    );
    let mut session = CheckoutSession::new(ctx, config.notice_duration());

    match replay(&mut session, events) {
        Some(Outcome::Submitted(submission)) => match serde_json::to_string_pretty(&submission) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error writing output: {}", e);
                process::exit(1);
            }
        },
        Some(Outcome::Cancelled) => {
            eprintln!("Finalization cancelled");
        }
        _ => {
            eprintln!("Session ended without submission");
            process::exit(2);
        }
    }
}

/// `--log-level` wins, then `RUST_LOG`, then the configured level.
fn init_logging(config: &Config, level_override: Option<&str>) {
    let filter = match level_override {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
    };

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn open(path: &Path) -> Result<BufReader<File>, ReplayError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Feeds events until the dialog submits or cancels.
fn replay(session: &mut CheckoutSession, events: Vec<Event>) -> Option<Outcome> {
    session.open();
    for event in events {
        match session.dispatch(event, Instant::now()) {
            Some(Outcome::PaymentAdded(entry)) => {
                tracing::info!(method = %entry.method, amount = %entry.amount, "payment added");
            }
            Some(outcome) => return Some(outcome),
            None => {}
        }
    }
    None
}

/// Reads sale line items.
///
/// Expected columns: `category_id, quantity, weight, unit_price, total, preset_id, notes`.
/// Only `category_id` and `total` are required.
fn read_items<R: Read>(reader: R) -> Result<Vec<SaleLineItem>, ReplayError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut items = Vec::new();
    for result in rdr.deserialize::<SaleLineItem>() {
        items.push(result?);
    }
    Ok(items)
}

/// Reads an event script.
///
/// Columns: `event, value`. The value column may be left out for `submit`,
/// `cancel` and `add_payment`.
///
/// ```csv
/// event,value
/// method,check
/// key,enter
/// tendered,6
/// key,enter
/// key,enter
/// add_payment,cash 4
/// submit,
/// ```
fn read_events<R: Read>(reader: R) -> Result<Vec<Event>, ReplayError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut events = Vec::new();
    for result in rdr.records() {
        let record = result?;
        events.push(parse_event(&record)?);
    }
    Ok(events)
}

fn parse_event(record: &StringRecord) -> Result<Event, ReplayError> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let kind = record.get(0).unwrap_or_default().to_lowercase();
    let value = record.get(1).unwrap_or_default();

    let invalid = || ReplayError::InvalidValue {
        line,
        kind: kind.clone(),
        value: value.to_string(),
    };

    let event = match kind.as_str() {
        "total" => Event::SetManualTotal(value.to_string()),
        "donation" => Event::SetDonation(value.to_string()),
        "tendered" => Event::SetTendered(value.to_string()),
        "note" => Event::SetNote(value.to_string()),
        "loop_amount" => Event::SetLoopAmount(value.to_string()),
        "method" => Event::SelectMethod(value.parse().map_err(|_| invalid())?),
        "loop_method" => Event::SelectLoopMethod(value.parse().map_err(|_| invalid())?),
        "add_payment" => {
            let mut parts = value.split_whitespace();
            let method = match parts.next() {
                Some(name) => PaymentMethod::from_str(name).map_err(|_| invalid())?,
                None => PaymentMethod::Cash,
            };
            let amount = match parts.next() {
                Some(raw) => {
                    Decimal::from_str(&raw.replace(',', ".")).map_err(|_| invalid())?;
                    parse_amount(raw)
                }
                None => None,
            };
            Event::AddPayment { amount, method }
        }
        "remove_payment" => Event::RemovePayment(value.parse().map_err(|_| invalid())?),
        "focus" => Event::Focus(FocusField::from_str(value).map_err(|_| invalid())?),
        "key" => Event::Key(Key::from_str(value).map_err(|_| invalid())?),
        "submit" => Event::Submit,
        "cancel" => Event::Cancel,
        _ => return Err(ReplayError::UnknownEvent { line, kind: kind.clone() }),
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ressourcerie_checkout::{Capabilities, PresetClassifier, Submission};
    use rust_decimal_macros::dec;
    use std::io::Cursor;
    use std::time::Duration;

    fn session(total: Decimal) -> CheckoutSession {
        let ctx = SaleContext::new(
            vec![SaleLineItem::priced(1, total)],
            total,
            None,
            Capabilities::default(),
            &PresetClassifier::default(),
        );
        CheckoutSession::new(ctx, Duration::from_secs(2))
    }

    #[test]
    fn parse_items_with_optional_columns() {
        let csv = "category_id,total,preset_id\n\
                   1,4.50,\n\
                   2,0,recycling\n";
        let items = read_items(Cursor::new(csv)).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total, dec!(4.50));
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].preset_id, None);
        assert_eq!(items[1].preset_id.as_ref().map(|p| p.as_str()), Some("recycling"));
    }

    #[test]
    fn parse_event_script() {
        let csv = "event,value\n\
                   method,check\n\
                   key,enter\n\
                   tendered,6\n\
                   add_payment,cash 4\n\
                   focus,donation\n\
                   submit\n";
        let events = read_events(Cursor::new(csv)).unwrap();

        assert_eq!(
            events,
            vec![
                Event::SelectMethod(PaymentMethod::Check),
                Event::Key(Key::Enter),
                Event::SetTendered("6".to_string()),
                Event::AddPayment {
                    amount: Some(dec!(4)),
                    method: PaymentMethod::Cash,
                },
                Event::Focus(FocusField::Donation),
                Event::Submit,
            ]
        );
    }

    #[test]
    fn add_payment_amount_is_capped() {
        let csv = "event,value\nadd_payment,cash 5000000\n";
        let events = read_events(Cursor::new(csv)).unwrap();
        assert_eq!(
            events,
            vec![Event::AddPayment {
                amount: Some(dec!(999999.99)),
                method: PaymentMethod::Cash,
            }]
        );
    }

    #[test]
    fn unknown_event_is_reported_with_line() {
        let csv = "event,value\nkey,enter\nswipe,card\n";
        let err = read_events(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, ReplayError::UnknownEvent { line: 3, .. }));
    }

    #[test]
    fn invalid_value_is_reported() {
        let csv = "event,value\nmethod,bitcoin\n";
        let err = read_events(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidValue { .. }));
    }

    #[test]
    fn replay_split_sale() {
        let csv = "event,value\n\
                   method,check\n\
                   key,enter\n\
                   tendered,6\n\
                   key,enter\n\
                   key,enter\n\
                   key,enter\n\
                   loop_amount,10\n\
                   key,enter\n\
                   key,enter\n";
        let events = read_events(Cursor::new(csv)).unwrap();
        let mut session = session(dec!(10));

        let outcome = replay(&mut session, events);
        let Some(Outcome::Submitted(Submission::Split(split))) = outcome else {
            panic!("expected a split submission, got {:?}", outcome);
        };
        assert_eq!(split.payments.len(), 2);
        assert_eq!(split.payments[0].method, PaymentMethod::Check);
        assert_eq!(split.payments[1].amount, dec!(4));
        assert_eq!(split.payments[1].change, Some(dec!(6)));
        assert!(!session.is_open());
    }

    #[test]
    fn replay_without_submit_returns_none() {
        let csv = "event,value\ntendered,5\n";
        let events = read_events(Cursor::new(csv)).unwrap();
        let mut session = session(dec!(10));
        assert_eq!(replay(&mut session, events), None);
        assert!(session.is_open());
    }
}
