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

//! Confirmation predicate.
//!
//! Rules are checked in order, first match wins:
//!
//! | Situation | Confirm allowed when |
//! |-----------|----------------------|
//! | split payments recorded | the payments add up to exactly the amount due |
//! | `free` method | always |
//! | special sale (recycling, drop-off, donation) | always |
//! | global pricing | manual total is valid |
//! | nothing due | something was tendered (all of it is a donation) |
//! | cash-like method | tendered covers the amount due |
//! | check or card | a positive amount was tendered |

use crate::payment::PaymentMethod;
use crate::state::{Amounts, FinalizationState, SaleContext};
use rust_decimal::Decimal;

pub fn can_confirm(ctx: &SaleContext, state: &FinalizationState) -> bool {
    let amounts = Amounts::compute(ctx, state);
    can_confirm_with(ctx, state, &amounts)
}

/// Same as [`can_confirm`] with amounts already derived.
pub fn can_confirm_with(ctx: &SaleContext, state: &FinalizationState, amounts: &Amounts) -> bool {
    if !state.payments.is_empty() {
        return amounts.remaining <= Decimal::ZERO && amounts.total_paid <= amounts.amount_due;
    }

    let method = state.payment_method;
    if method == PaymentMethod::Free {
        return true;
    }

    if ctx.is_special() {
        return true;
    }

    if ctx.capabilities().global_pricing {
        return state.override_total(ctx).is_some();
    }

    let tendered = state.amount_tendered;
    let tendered_positive = tendered.is_some_and(|amount| amount > Decimal::ZERO);

    if amounts.amount_due <= Decimal::ZERO {
        return tendered_positive;
    }

    if method.is_cash_like(ctx.capabilities()) {
        return tendered.is_some_and(|amount| amount >= amounts.amount_due);
    }

    match method {
        PaymentMethod::Check | PaymentMethod::Card => tendered_positive,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Capabilities;
    use crate::sale::{PresetClassifier, SaleLineItem};
    use rust_decimal_macros::dec;

    fn context(items: Vec<SaleLineItem>, total: Decimal, caps: Capabilities) -> SaleContext {
        SaleContext::new(items, total, None, caps, &PresetClassifier::default())
    }

    fn regular(total: Decimal) -> SaleContext {
        context(vec![SaleLineItem::priced(1, total)], total, Capabilities::default())
    }

    #[test]
    fn cash_needs_full_tender() {
        let ctx = regular(dec!(10));
        let mut state = FinalizationState::open(&ctx);
        assert!(!can_confirm(&ctx, &state));

        state.amount_tendered = Some(dec!(9.99));
        assert!(!can_confirm(&ctx, &state));

        state.amount_tendered = Some(dec!(10));
        assert!(can_confirm(&ctx, &state));
    }

    #[test]
    fn check_accepts_partial_amount() {
        let ctx = regular(dec!(10));
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Check;
        assert!(!can_confirm(&ctx, &state));

        state.amount_tendered = Some(dec!(3));
        assert!(can_confirm(&ctx, &state));
    }

    #[test]
    fn cash_like_check_needs_full_tender() {
        let caps = Capabilities {
            check_change: true,
            ..Capabilities::default()
        };
        let ctx = context(vec![SaleLineItem::priced(1, dec!(10))], dec!(10), caps);
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Check;
        state.amount_tendered = Some(dec!(3));
        assert!(!can_confirm(&ctx, &state));
    }

    #[test]
    fn free_always_confirms() {
        let ctx = regular(dec!(10));
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Free;
        assert!(can_confirm(&ctx, &state));
        assert_eq!(Amounts::compute(&ctx, &state).amount_due, Decimal::ZERO);
    }

    #[test]
    fn zero_due_needs_positive_tender() {
        let ctx = regular(dec!(0));
        let mut state = FinalizationState::open(&ctx);
        assert!(!can_confirm(&ctx, &state));
        state.amount_tendered = Some(dec!(2));
        assert!(can_confirm(&ctx, &state));
    }

    #[test]
    fn special_sale_bypasses_manual_total() {
        let caps = Capabilities {
            global_pricing: true,
            ..Capabilities::default()
        };
        let items = vec![SaleLineItem::priced(4, dec!(0)).with_preset("recycling")];
        let ctx = context(items, dec!(0), caps);
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Cash;
        assert!(can_confirm(&ctx, &state));
    }

    #[test]
    fn global_pricing_requires_valid_total() {
        let caps = Capabilities {
            global_pricing: true,
            ..Capabilities::default()
        };
        let ctx = context(vec![SaleLineItem::priced(1, dec!(5))], dec!(5), caps);
        let mut state = FinalizationState::open(&ctx);
        state.amount_tendered = Some(dec!(50));
        assert!(!can_confirm(&ctx, &state));

        state.manual_total = "4".to_string();
        assert!(!can_confirm(&ctx, &state));

        state.manual_total = "-8".to_string();
        assert!(!can_confirm(&ctx, &state));

        state.manual_total = "8".to_string();
        assert!(can_confirm(&ctx, &state));
    }

    #[test]
    fn valid_manual_total_confirms_without_tender() {
        let caps = Capabilities {
            global_pricing: true,
            ..Capabilities::default()
        };
        let ctx = context(vec![SaleLineItem::priced(1, dec!(5))], dec!(5), caps);
        let mut state = FinalizationState::open(&ctx);
        state.manual_total = "12".to_string();
        assert_eq!(state.payment_method, PaymentMethod::Cash);
        assert_eq!(state.amount_tendered, None);
        assert!(can_confirm(&ctx, &state));
    }

    #[test]
    fn overpaid_ledger_is_not_confirmable() {
        let ctx = regular(dec!(10));
        let caps = *ctx.capabilities();
        let mut state = FinalizationState::open(&ctx);
        state.payment_method = PaymentMethod::Check;
        state.payments.add(dec!(15), PaymentMethod::Check, dec!(15), &caps);

        let amounts = Amounts::compute(&ctx, &state);
        assert_eq!(amounts.remaining, Decimal::ZERO);
        assert_eq!(amounts.amount_due, dec!(10));
        assert!(!can_confirm(&ctx, &state));
    }

    #[test]
    fn split_payments_must_settle() {
        let ctx = regular(dec!(10));
        let caps = *ctx.capabilities();
        let mut state = FinalizationState::open(&ctx);
        state.payments.add(dec!(4), PaymentMethod::Check, dec!(10), &caps);
        assert!(!can_confirm(&ctx, &state));

        state.payments.add(dec!(6), PaymentMethod::Cash, dec!(10), &caps);
        assert!(can_confirm(&ctx, &state));
    }
}
