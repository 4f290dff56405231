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

//! Finalization reducer.
//!
//! Every operator action is an [`Event`]. [`reduce`] takes the current state
//! and one event and returns the next state, plus an [`Outcome`] when the event
//! produced something the caller must act on.
//!
//! Enter walks the form in a fixed order:
//!
//! ```text
//! Total -> PaymentMethod -> AmountTendered -> Donation
//!                                               |  first Enter records the tendered amount
//!                                               v  as a payment if a balance remains
//!                          PaymentMethodLoop <-> PaymentAmountLoop
//!                                               |  settled
//!                                               v
//!                                            Donation -> submit
//! ```
//!
//! Blocked transitions are silent no-ops. Escape cancels from anywhere.

use crate::error::ParseError;
use crate::money::parse_amount;
use crate::payment::{PaymentEntry, PaymentLedger, PaymentMethod};
use crate::state::{Amounts, FinalizationState, FocusField, SaleContext, normalize_note};
use crate::validation::can_confirm_with;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

/// Keys the form reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    ArrowUp,
    ArrowDown,
    Plus,
    Equals,
    Escape,
}

impl FromStr for Key {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enter" => Ok(Self::Enter),
            "up" | "arrowup" => Ok(Self::ArrowUp),
            "down" | "arrowdown" => Ok(Self::ArrowDown),
            "+" | "plus" => Ok(Self::Plus),
            "=" | "equals" => Ok(Self::Equals),
            "escape" | "esc" => Ok(Self::Escape),
            other => Err(ParseError::UnknownKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetManualTotal(String),
    SetDonation(String),
    SetTendered(String),
    SetNote(String),
    SetLoopAmount(String),
    SelectMethod(PaymentMethod),
    SelectLoopMethod(PaymentMethod),
    /// Split payment from the "add" button. `None` pays the whole remainder.
    AddPayment {
        amount: Option<Decimal>,
        method: PaymentMethod,
    },
    RemovePayment(usize),
    Focus(FocusField),
    Key(Key),
    Submit,
    Cancel,
}

/// Payload handed to the sale-submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    Split(SplitPayment),
    Single(SinglePayment),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePayment {
    pub donation: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_given: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_total_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPayment {
    pub donation: Decimal,
    pub payments: Vec<PaymentEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_total_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A split payment was recorded.
    PaymentAdded(PaymentEntry),
    Submitted(Submission),
    Cancelled,
}

/// Applies one event.
pub fn reduce(
    ctx: &SaleContext,
    mut state: FinalizationState,
    event: Event,
) -> (FinalizationState, Option<Outcome>) {
    let caps = *ctx.capabilities();
    let outcome = match event {
        Event::SetManualTotal(input) => {
            if caps.global_pricing && !due_locked(&state) {
                state.manual_total = input;
            }
            None
        }
        Event::SetDonation(input) => {
            if !due_locked(&state) {
                state.manual_donation = parse_amount(&input).unwrap_or(Decimal::ZERO);
            }
            None
        }
        Event::SetTendered(input) => {
            if !due_locked(&state) {
                state.amount_tendered = parse_amount(&input);
            }
            None
        }
        Event::SetNote(input) => {
            state.note = normalize_note(&input);
            None
        }
        Event::SetLoopAmount(input) => {
            state.loop_amount = parse_amount(&input);
            None
        }
        Event::SelectMethod(method) => {
            if method.is_selectable(&caps) && !due_locked(&state) {
                state.payment_method = method;
                state.pending_method = None;
            }
            None
        }
        Event::SelectLoopMethod(method) => {
            if method.is_selectable(&caps) && method != PaymentMethod::Free {
                state.loop_method = method;
                state.pending_method = None;
            }
            None
        }
        Event::AddPayment { amount, method } => {
            if method.is_selectable(&caps) {
                state.loop_amount = amount;
                state.loop_method = method;
                add_split_payment(ctx, &mut state)
            } else {
                None
            }
        }
        Event::RemovePayment(index) => {
            if let Some(entry) = state.payments.remove(index) {
                debug!(index, method = %entry.method, amount = %entry.amount, "payment removed");
            }
            None
        }
        Event::Focus(field) => {
            if field != FocusField::Total || caps.global_pricing {
                state.focus = field;
                state.pending_method = None;
            }
            None
        }
        Event::Key(key) => return handle_key(ctx, state, key),
        Event::Submit => submit(ctx, &state),
        Event::Cancel => cancel(),
    };
    (state, outcome)
}

fn handle_key(
    ctx: &SaleContext,
    mut state: FinalizationState,
    key: Key,
) -> (FinalizationState, Option<Outcome>) {
    let caps = *ctx.capabilities();
    let outcome = match key {
        Key::Escape => cancel(),
        Key::ArrowUp | Key::ArrowDown => {
            let in_loop = state.focus.in_loop();
            if state.focus.is_method_selector() && (in_loop || !due_locked(&state)) {
                let current = state.pending_method.unwrap_or(if in_loop {
                    state.loop_method
                } else {
                    state.payment_method
                });
                let previewed = if key == Key::ArrowDown {
                    current.next(in_loop, &caps)
                } else {
                    current.previous(in_loop, &caps)
                };
                debug!(method = %previewed, "payment method previewed");
                state.pending_method = Some(previewed);
            }
            None
        }
        Key::Plus | Key::Equals => {
            if state.focus == FocusField::PaymentAmountLoop {
                add_split_payment(ctx, &mut state)
            } else {
                None
            }
        }
        Key::Enter => match state.focus {
            FocusField::Total => {
                move_focus(&mut state, FocusField::PaymentMethod);
                None
            }
            FocusField::PaymentMethod => {
                if let Some(method) = state.pending_method.take().filter(|_| !due_locked(&state)) {
                    state.payment_method = method;
                }
                move_focus(&mut state, FocusField::AmountTendered);
                None
            }
            FocusField::AmountTendered => {
                move_focus(&mut state, FocusField::Donation);
                None
            }
            FocusField::Donation => donation_enter(ctx, &mut state),
            FocusField::PaymentMethodLoop => {
                if let Some(method) = state.pending_method.take() {
                    state.loop_method = method;
                }
                move_focus(&mut state, FocusField::PaymentAmountLoop);
                None
            }
            FocusField::PaymentAmountLoop => add_split_payment(ctx, &mut state),
        },
    };
    (state, outcome)
}

/// Once a payment is recorded, the fields that feed the amount due are frozen
/// so the ledger can never exceed it. Removing every payment unfreezes them.
fn due_locked(state: &FinalizationState) -> bool {
    !state.payments.is_empty()
}

fn move_focus(state: &mut FinalizationState, field: FocusField) {
    debug!(from = %state.focus, to = %field, "focus moved");
    state.focus = field;
    state.pending_method = None;
}

/// Enter on the donation field.
///
/// On the first visit the tendered amount becomes the first payment; if that
/// leaves a balance the split loop starts. Otherwise Enter submits.
fn donation_enter(ctx: &SaleContext, state: &mut FinalizationState) -> Option<Outcome> {
    let caps = *ctx.capabilities();
    let amounts = Amounts::compute(ctx, state);

    if state.payments.is_empty() {
        let tendered = state.amount_tendered.unwrap_or(Decimal::ZERO);
        if tendered > Decimal::ZERO {
            let recorded = state
                .payments
                .add(tendered, state.payment_method, amounts.amount_due, &caps);
            if let Some(entry) = recorded {
                let remaining = state.payments.remaining(amounts.amount_due);
                debug!(method = %entry.method, amount = %entry.amount, %remaining, "first payment recorded");
                if remaining > Decimal::ZERO {
                    state.loop_method = PaymentLedger::suggest_next(entry.method, &caps);
                    state.loop_amount = None;
                    move_focus(state, FocusField::PaymentMethodLoop);
                }
                return Some(Outcome::PaymentAdded(entry));
            }
        }
        return submit(ctx, state);
    }

    if amounts.remaining > Decimal::ZERO {
        move_focus(state, FocusField::PaymentMethodLoop);
        return None;
    }
    submit(ctx, state)
}

/// Records the in-loop payment and routes focus back into the loop, or to the
/// donation field once the sale is settled.
fn add_split_payment(ctx: &SaleContext, state: &mut FinalizationState) -> Option<Outcome> {
    let caps = *ctx.capabilities();
    let amounts = Amounts::compute(ctx, state);
    let requested = state.loop_amount.unwrap_or(amounts.remaining);

    let entry = state
        .payments
        .add(requested, state.loop_method, amounts.amount_due, &caps)?;

    let remaining = state.payments.remaining(amounts.amount_due);
    debug!(method = %entry.method, amount = %entry.amount, %remaining, "split payment recorded");

    state.loop_amount = None;
    state.loop_method = PaymentLedger::suggest_next(entry.method, &caps);
    let next = if remaining > Decimal::ZERO {
        FocusField::PaymentMethodLoop
    } else {
        FocusField::Donation
    };
    move_focus(state, next);
    Some(Outcome::PaymentAdded(entry))
}

fn submit(ctx: &SaleContext, state: &FinalizationState) -> Option<Outcome> {
    let amounts = Amounts::compute(ctx, state);
    if !can_confirm_with(ctx, state, &amounts) {
        debug!(method = %state.payment_method, "confirm blocked");
        return None;
    }
    let submission = build_submission(ctx, state, &amounts);
    info!(
        method = %state.payment_method,
        payments = state.payments.len(),
        amount_due = %amounts.amount_due,
        donation = %amounts.donation,
        "sale finalized"
    );
    Some(Outcome::Submitted(submission))
}

fn cancel() -> Option<Outcome> {
    info!("finalization cancelled");
    Some(Outcome::Cancelled)
}

/// Packages the form into the submission payload.
pub fn build_submission(ctx: &SaleContext, state: &FinalizationState, amounts: &Amounts) -> Submission {
    let override_total_amount = state.override_total(ctx);
    if !state.payments.is_empty() {
        return Submission::Split(SplitPayment {
            donation: amounts.donation,
            payments: state.payments.entries().to_vec(),
            note: state.note.clone(),
            override_total_amount,
        });
    }

    let method = state.payment_method;
    let takes_cash = method == PaymentMethod::Free || method.is_cash_like(ctx.capabilities());
    Submission::Single(SinglePayment {
        donation: amounts.donation,
        payment_method: method,
        cash_given: state.amount_tendered.filter(|_| takes_cash),
        change: amounts.change,
        note: state.note.clone(),
        override_total_amount,
    })
}
