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

//! Payment methods and the multi-payment ledger.
//!
//! A sale can be settled with several payments (a partial check then cash for
//! the rest). The ledger clamps every payment to the balance still due when it
//! is added, so the recorded amounts can never add up to more than the amount
//! due.
//!
//! # Example
//!
//! ```
//! use ressourcerie_checkout::{Capabilities, PaymentLedger, PaymentMethod};
//! use rust_decimal_macros::dec;
//!
//! let caps = Capabilities::default();
//! let mut ledger = PaymentLedger::new();
//!
//! ledger.add(dec!(8), PaymentMethod::Check, dec!(11), &caps).unwrap();
//! let cash = ledger.add(dec!(5), PaymentMethod::Cash, dec!(11), &caps).unwrap();
//!
//! assert_eq!(cash.amount, dec!(3));
//! assert_eq!(cash.change, Some(dec!(2)));
//! assert_eq!(ledger.remaining(dec!(11)), dec!(0));
//! ```

use crate::config::Capabilities;
use crate::error::ParseError;
use crate::money::{non_negative, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Check,
    Card,
    /// Free donation: nothing is owed, whatever is handed over is a gift.
    Free,
}

impl PaymentMethod {
    /// Arrow-key order on the main method selector.
    const SELECTOR_ORDER: [PaymentMethod; 4] = [Self::Cash, Self::Check, Self::Card, Self::Free];
    /// Arrow-key order inside the split loop; free cannot be a split.
    const LOOP_ORDER: [PaymentMethod; 3] = [Self::Cash, Self::Check, Self::Card];

    pub fn is_selectable(self, caps: &Capabilities) -> bool {
        match self {
            Self::Card => caps.card_enabled,
            _ => true,
        }
    }

    /// Methods that take a tendered amount and give change back.
    pub fn is_cash_like(self, caps: &Capabilities) -> bool {
        match self {
            Self::Cash => true,
            Self::Check => caps.check_change,
            _ => false,
        }
    }

    /// Methods whose tendered amount above the base becomes a donation.
    pub fn derives_donation(self, caps: &Capabilities) -> bool {
        matches!(self, Self::Check | Self::Card) && !self.is_cash_like(caps)
    }

    pub fn next(self, in_loop: bool, caps: &Capabilities) -> Self {
        cycle(self, in_loop, caps, 1)
    }

    pub fn previous(self, in_loop: bool, caps: &Capabilities) -> Self {
        cycle(self, in_loop, caps, -1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Check => "check",
            Self::Card => "card",
            Self::Free => "free",
        }
    }
}

fn cycle(current: PaymentMethod, in_loop: bool, caps: &Capabilities, step: isize) -> PaymentMethod {
    let order: Vec<PaymentMethod> = if in_loop {
        &PaymentMethod::LOOP_ORDER[..]
    } else {
        &PaymentMethod::SELECTOR_ORDER[..]
    }
    .iter()
    .copied()
    .filter(|method| method.is_selectable(caps))
    .collect();

    let Some(position) = order.iter().position(|method| *method == current) else {
        return PaymentMethod::Cash;
    };
    let len = order.len() as isize;
    order[(position as isize + step).rem_euclid(len) as usize]
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "especes" => Ok(Self::Cash),
            "check" | "cheque" => Ok(Self::Check),
            "card" | "carte" => Ok(Self::Card),
            "free" | "gratuit" => Ok(Self::Free),
            other => Err(ParseError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// One recorded payment of a split sale. Immutable once added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub method: PaymentMethod,
    /// Amount applied toward the sale.
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_given: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
}

/// Ordered list of split payments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentLedger {
    entries: Vec<PaymentEntry>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PaymentEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_paid(&self) -> Decimal {
        self.entries.iter().map(|entry| entry.amount).sum()
    }

    /// Balance still owed: `max(0, amount_due - total_paid)`.
    pub fn remaining(&self, amount_due: Decimal) -> Decimal {
        non_negative(amount_due - self.total_paid())
    }

    /// Records a payment of `requested` toward `amount_due`.
    ///
    /// The applied amount is clamped to the remaining balance. For cash-like
    /// methods `requested` is what was handed over and any excess is recorded
    /// as change. `free` is only accepted as the first payment and is recorded
    /// as cash afterwards. Returns `None` when nothing could be applied.
    pub fn add(
        &mut self,
        requested: Decimal,
        method: PaymentMethod,
        amount_due: Decimal,
        caps: &Capabilities,
    ) -> Option<PaymentEntry> {
        let requested = round_money(requested);
        let remaining = self.remaining(amount_due);
        if requested <= Decimal::ZERO || remaining <= Decimal::ZERO {
            return None;
        }

        let method = if method == PaymentMethod::Free && !self.entries.is_empty() {
            PaymentMethod::Cash
        } else {
            method
        };

        let applied = requested.min(remaining);
        let (cash_given, change) = if method.is_cash_like(caps) {
            let change = (requested > applied).then(|| requested - applied);
            (Some(requested), change)
        } else {
            (None, None)
        };

        let entry = PaymentEntry {
            method,
            amount: applied,
            cash_given,
            change,
        };
        self.entries.push(entry.clone());
        debug_assert!(self.total_paid() <= amount_due);
        Some(entry)
    }

    /// Removes the entry at `index`. Other entries keep their order.
    pub fn remove(&mut self, index: usize) -> Option<PaymentEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Method suggested for the payment after one made with `last`.
    pub fn suggest_next(last: PaymentMethod, caps: &Capabilities) -> PaymentMethod {
        let base = if last == PaymentMethod::Free {
            PaymentMethod::Cash
        } else {
            last
        };
        base.next(true, caps)
    }
}
