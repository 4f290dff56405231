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

//! Finalization form state and the derived-amount calculator.
//!
//! [`FinalizationState`] holds what the operator typed; [`Amounts`] is
//! everything derived from it. Derivation is a pure function of the state and
//! the [`SaleContext`], recomputed after every event.

use crate::config::Capabilities;
use crate::error::{ManualTotalIssue, ParseError};
use crate::money::{non_negative, parse_signed_amount, round_money};
use crate::payment::{PaymentLedger, PaymentMethod};
use crate::sale::{ItemClassifier, SaleLineItem, priced_subtotal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Read-only inputs of a finalization: the sale and the register setup.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleContext {
    items: Vec<SaleLineItem>,
    total_amount: Decimal,
    note: Option<String>,
    caps: Capabilities,
    special: bool,
    subtotal: Decimal,
}

impl SaleContext {
    pub fn new(
        items: Vec<SaleLineItem>,
        total_amount: Decimal,
        note: Option<String>,
        caps: Capabilities,
        classifier: &dyn ItemClassifier,
    ) -> Self {
        let special = classifier.is_special(&items);
        let subtotal = priced_subtotal(&items);
        Self {
            items,
            total_amount: round_money(total_amount),
            note: normalize_note(note.as_deref().unwrap_or_default()),
            caps,
            special,
            subtotal,
        }
    }

    pub fn items(&self) -> &[SaleLineItem] {
        &self.items
    }

    /// Sale total computed upstream from the line items.
    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Recycling, drop-off or donation-only sale.
    pub fn is_special(&self) -> bool {
        self.special
    }

    pub fn priced_subtotal(&self) -> Decimal {
        self.subtotal
    }
}

/// Empty or blank notes are no note at all.
pub fn normalize_note(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The focusable fields of the finalization form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusField {
    Total,
    PaymentMethod,
    AmountTendered,
    Donation,
    PaymentMethodLoop,
    PaymentAmountLoop,
}

impl FocusField {
    pub fn is_method_selector(self) -> bool {
        matches!(self, Self::PaymentMethod | Self::PaymentMethodLoop)
    }

    pub fn in_loop(self) -> bool {
        matches!(self, Self::PaymentMethodLoop | Self::PaymentAmountLoop)
    }
}

impl FromStr for FocusField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "total" => Ok(Self::Total),
            "payment_method" => Ok(Self::PaymentMethod),
            "amount_tendered" => Ok(Self::AmountTendered),
            "donation" => Ok(Self::Donation),
            "payment_method_loop" => Ok(Self::PaymentMethodLoop),
            "payment_amount_loop" => Ok(Self::PaymentAmountLoop),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

impl fmt::Display for FocusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Total => "total",
            Self::PaymentMethod => "payment_method",
            Self::AmountTendered => "amount_tendered",
            Self::Donation => "donation",
            Self::PaymentMethodLoop => "payment_method_loop",
            Self::PaymentAmountLoop => "payment_amount_loop",
        };
        f.write_str(name)
    }
}

/// Mutable session of the finalization form.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizationState {
    /// Manual total as typed. Only read in global-pricing mode.
    pub manual_total: String,
    /// Donation as typed by the operator.
    pub manual_donation: Decimal,
    pub payment_method: PaymentMethod,
    pub amount_tendered: Option<Decimal>,
    pub payments: PaymentLedger,
    pub note: Option<String>,
    pub focus: FocusField,
    /// Method previewed with the arrow keys, not yet committed.
    pub pending_method: Option<PaymentMethod>,
    /// Method suggested for the next split payment.
    pub loop_method: PaymentMethod,
    /// Amount typed for the next split payment.
    pub loop_amount: Option<Decimal>,
}

impl FinalizationState {
    /// Fresh state for a dialog that just opened.
    pub fn open(ctx: &SaleContext) -> Self {
        let focus = if ctx.caps.global_pricing {
            FocusField::Total
        } else {
            FocusField::PaymentMethod
        };
        let payment_method = if ctx.special {
            PaymentMethod::Free
        } else {
            PaymentMethod::Cash
        };
        Self {
            manual_total: String::new(),
            manual_donation: Decimal::ZERO,
            payment_method,
            amount_tendered: None,
            payments: PaymentLedger::new(),
            note: ctx.note.clone(),
            focus,
            pending_method: None,
            loop_method: PaymentMethod::Cash,
            loop_amount: None,
        }
    }

    /// Validated manual total, if global pricing is on and the total is usable.
    pub fn override_total(&self, ctx: &SaleContext) -> Option<Decimal> {
        if !ctx.caps.global_pricing {
            return None;
        }
        match manual_total_check(ctx, self) {
            Ok(total) => Some(total),
            Err(_) => None,
        }
    }

    /// Problem with the manual total, including a missing one.
    pub fn manual_total_issue(&self, ctx: &SaleContext) -> Option<ManualTotalIssue> {
        if !ctx.caps.global_pricing {
            return None;
        }
        manual_total_check(ctx, self).err()
    }
}

fn manual_total_check(ctx: &SaleContext, state: &FinalizationState) -> Result<Decimal, ManualTotalIssue> {
    let total = parse_signed_amount(&state.manual_total).ok_or(ManualTotalIssue::Missing)?;
    if total < Decimal::ZERO {
        return Err(ManualTotalIssue::Negative);
    }
    let subtotal = ctx.subtotal;
    if subtotal > Decimal::ZERO && total < subtotal {
        return Err(ManualTotalIssue::BelowSubtotal { subtotal });
    }
    Ok(total)
}

/// Derived, read-only amounts of a finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amounts {
    pub base_amount: Decimal,
    pub donation: Decimal,
    pub amount_due: Decimal,
    /// Change to hand back, for cash-like and free payments.
    pub change: Option<Decimal>,
    pub total_paid: Decimal,
    pub remaining: Decimal,
    /// Inline message under the manual total. A missing total shows nothing.
    pub manual_total_error: Option<ManualTotalIssue>,
}

impl Amounts {
    pub fn compute(ctx: &SaleContext, state: &FinalizationState) -> Self {
        let caps = &ctx.caps;
        let method = state.payment_method;

        let base_amount = state.override_total(ctx).unwrap_or(ctx.total_amount);

        let donation = match state.amount_tendered {
            Some(tendered) if method.derives_donation(caps) && tendered >= base_amount => {
                round_money(tendered - base_amount)
            }
            _ => state.manual_donation,
        };

        let amount_due = if method == PaymentMethod::Free {
            Decimal::ZERO
        } else {
            base_amount.saturating_add(donation)
        };

        let owed = if method == PaymentMethod::Free {
            Some(donation)
        } else if method.is_cash_like(caps) {
            Some(amount_due)
        } else {
            None
        };
        let change = match (owed, state.amount_tendered) {
            (Some(owed), Some(tendered)) if tendered >= owed => Some(round_money(tendered - owed)),
            _ => None,
        };

        let total_paid = state.payments.total_paid();
        let remaining = non_negative(amount_due - total_paid);

        let manual_total_error = state
            .manual_total_issue(ctx)
            .filter(|issue| *issue != ManualTotalIssue::Missing);

        Self {
            base_amount,
            donation,
            amount_due,
            change,
            total_paid,
            remaining,
            manual_total_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::PresetClassifier;
    use rust_decimal_macros::dec;

    fn context(total: Decimal, caps: Capabilities) -> SaleContext {
        let items = vec![SaleLineItem::priced(1, total)];
        SaleContext::new(items, total, None, caps, &PresetClassifier::default())
    }

    #[test]
    fn open_state_defaults() {
        let ctx = context(dec!(10), Capabilities::default());
        let state = FinalizationState::open(&ctx);
        assert_eq!(state.payment_method, PaymentMethod::Cash);
        assert_eq!(state.manual_donation, Decimal::ZERO);
        assert_eq!(state.focus, FocusField::PaymentMethod);
        assert!(state.payments.is_empty());
    }

    #[test]
    fn global_pricing_starts_on_total() {
        let caps = Capabilities {
            global_pricing: true,
            ..Capabilities::default()
        };
        let state = FinalizationState::open(&context(dec!(10), caps));
        assert_eq!(state.focus, FocusField::Total);
    }

    #[test]
    fn special_sale_defaults_to_free() {
        let items = vec![SaleLineItem::priced(9, dec!(0)).with_preset("dropoff")];
        let ctx = SaleContext::new(
            items,
            dec!(0),
            Some("  ".to_string()),
            Capabilities::default(),
            &PresetClassifier::default(),
        );
        let state = FinalizationState::open(&ctx);
        assert_eq!(state.payment_method, PaymentMethod::Free);
        assert_eq!(state.note, None);
    }

    #[test]
    fn cash_change() {
        let ctx = context(dec!(10), Capabilities::default());
        let mut state = FinalizationState::open(&ctx);
        state.manual_donation = dec!(1);
        state.amount_tendered = Some(dec!(20));

        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.amount_due, dec!(11));
        assert_eq!(amounts.change, Some(dec!(9.00)));
        assert_eq!(amounts.remaining, dec!(11));
    }

    #[test]
    fn short_cash_has_no_change() {
        let ctx = context(dec!(10), Capabilities::default());
        let mut state = FinalizationState::open(&ctx);
        state.amount_tendered = Some(dec!(5));
        assert_eq!(Amounts::compute(&ctx, &state).change, None);
    }

    #[test]
    fn check_overpayment_becomes_donation() {
        let ctx = context(dec!(10), Capabilities::default());
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Check;
        state.manual_donation = dec!(2);
        state.amount_tendered = Some(dec!(15.555));

        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.donation, dec!(5.56));
        assert_eq!(amounts.amount_due, dec!(15.56));
        assert_eq!(amounts.change, None);

        state.amount_tendered = Some(dec!(4));
        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.donation, dec!(2));
        assert_eq!(amounts.amount_due, dec!(12));
    }

    #[test]
    fn cash_like_check_keeps_manual_donation() {
        let caps = Capabilities {
            check_change: true,
            ..Capabilities::default()
        };
        let ctx = context(dec!(10), caps);
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Check;
        state.amount_tendered = Some(dec!(15));

        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.donation, Decimal::ZERO);
        assert_eq!(amounts.change, Some(dec!(5)));
    }

    #[test]
    fn free_due_is_zero_and_change_is_over_donation() {
        let ctx = context(dec!(10), Capabilities::default());
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Free;
        state.manual_donation = dec!(3);
        state.amount_tendered = Some(dec!(5));

        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.amount_due, Decimal::ZERO);
        assert_eq!(amounts.change, Some(dec!(2)));
    }

    #[test]
    fn manual_total_overrides_base() {
        let caps = Capabilities {
            global_pricing: true,
            ..Capabilities::default()
        };
        let ctx = context(dec!(4), caps);
        let mut state = FinalizationState::open(&ctx);

        assert_eq!(state.manual_total_issue(&ctx), Some(ManualTotalIssue::Missing));
        assert_eq!(Amounts::compute(&ctx, &state).manual_total_error, None);

        state.manual_total = "7,50".to_string();
        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.base_amount, dec!(7.50));
        assert_eq!(amounts.manual_total_error, None);

        state.manual_total = "3".to_string();
        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.base_amount, dec!(4));
        assert_eq!(
            amounts.manual_total_error,
            Some(ManualTotalIssue::BelowSubtotal { subtotal: dec!(4) })
        );

        state.manual_total = "-1".to_string();
        assert_eq!(
            Amounts::compute(&ctx, &state).manual_total_error,
            Some(ManualTotalIssue::Negative)
        );
    }

    #[test]
    fn oversized_manual_total_is_capped() {
        let caps = Capabilities {
            global_pricing: true,
            ..Capabilities::default()
        };
        let ctx = context(dec!(4), caps);
        let mut state = FinalizationState::open(&ctx);
        state.manual_total = "79228162514264337593543950335".to_string();
        state.manual_donation = dec!(5);

        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.base_amount, dec!(999999.99));
        assert_eq!(amounts.amount_due, dec!(1000004.99));
    }

    #[test]
    fn manual_total_ignored_without_global_pricing() {
        let ctx = context(dec!(4), Capabilities::default());
        let mut state = FinalizationState::open(&ctx);
        state.manual_total = "50".to_string();
        assert_eq!(Amounts::compute(&ctx, &state).base_amount, dec!(4));
        assert_eq!(state.override_total(&ctx), None);
    }

    #[test]
    fn focus_field_names_round_trip() {
        for field in [
            FocusField::Total,
            FocusField::PaymentMethod,
            FocusField::AmountTendered,
            FocusField::Donation,
            FocusField::PaymentMethodLoop,
            FocusField::PaymentAmountLoop,
        ] {
            assert_eq!(field.to_string().parse::<FocusField>(), Ok(field));
        }
        assert_eq!(
            "tip".parse::<FocusField>(),
            Err(ParseError::UnknownField("tip".to_string()))
        );
    }
}
