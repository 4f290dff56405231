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

//! Amount parsing and rounding.
//!
//! Operator input arrives as free text from the register keypad. Parsing never
//! fails: garbage reads as zero, negatives are clamped to zero and oversized
//! values are clamped to [`MAX_INPUT_AMOUNT`]. The manual total is the one
//! field that keeps its sign, so a negative total can be reported instead of
//! silently corrected. Its magnitude is still capped.

use rust_decimal::prelude::*;
use std::str::FromStr;

/// Number of decimal places kept on every monetary value.
pub const DECIMAL_PLACES: u32 = 2;

/// Ceiling applied to every manually entered amount (999,999.99).
pub const MAX_INPUT_AMOUNT: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

/// Rounds to cents, half away from zero.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses an operator-entered amount.
///
/// Returns `None` only for blank input, which the form treats as "not entered".
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let value = parse_signed_amount(input)?;
    Some(value.clamp(Decimal::ZERO, MAX_INPUT_AMOUNT))
}

/// Parses an amount keeping its sign. Non-numeric input reads as zero and the
/// magnitude is capped at [`MAX_INPUT_AMOUNT`].
pub fn parse_signed_amount(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace(',', ".");
    let value = Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO);
    Some(round_money(value.clamp(-MAX_INPUT_AMOUNT, MAX_INPUT_AMOUNT)))
}

/// Positive part of `value`.
#[inline]
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
