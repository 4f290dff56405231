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

//! # Ressourcerie Checkout
//!
//! This library implements the sale finalization step of a ressourcerie cash
//! register: choosing how the customer pays, splitting a sale over several
//! payments, turning overpayments into donations and computing change.
//!
//! ## Core Components
//!
//! - [`SaleContext`]: Read-only inputs (line items, sale total, capabilities)
//! - [`FinalizationState`]: What the operator has typed so far
//! - [`Amounts`]: Derived base amount, donation, amount due, change and balance
//! - [`PaymentLedger`]: Split payments, clamped to the balance due
//! - [`reduce`]: Pure `(state, event) -> state` transition function
//! - [`can_confirm`]: Whether the sale may be submitted
//! - [`CheckoutSession`]: Open/close lifecycle and the "payment added" notice
//!
//! ## Example
//!
//! ```
//! use ressourcerie_checkout::{
//!     Amounts, Capabilities, Event, FinalizationState, PresetClassifier, SaleContext,
//!     SaleLineItem, can_confirm, reduce,
//! };
//! use rust_decimal_macros::dec;
//!
//! let ctx = SaleContext::new(
//!     vec![SaleLineItem::priced(1, dec!(10))],
//!     dec!(10),
//!     None,
//!     Capabilities::default(),
//!     &PresetClassifier::default(),
//! );
//!
//! let state = FinalizationState::open(&ctx);
//! let (state, _) = reduce(&ctx, state, Event::SetDonation("1".into()));
//! let (state, _) = reduce(&ctx, state, Event::SetTendered("20".into()));
//!
//! let amounts = Amounts::compute(&ctx, &state);
//! assert_eq!(amounts.amount_due, dec!(11));
//! assert_eq!(amounts.change, Some(dec!(9.00)));
//! assert!(can_confirm(&ctx, &state));
//! ```
//!
//! ## Purity
//!
//! Nothing in the engine performs I/O or reads global configuration. Register
//! options and feature flags are resolved into [`Capabilities`] up front.

mod base;
pub mod config;
pub mod error;
pub mod money;
pub mod payment;
mod reducer;
pub mod sale;
mod session;
mod state;
mod validation;

pub use base::{CategoryId, PresetId};
pub use config::{Capabilities, Config, FeatureFlags, RegisterOptions, StaticFlags};
pub use error::{ConfigError, ManualTotalIssue, ParseError, ReplayError};
pub use payment::{PaymentEntry, PaymentLedger, PaymentMethod};
pub use reducer::{Event, Key, Outcome, SinglePayment, SplitPayment, Submission, build_submission, reduce};
pub use sale::{ItemClassifier, PresetClassifier, SaleLineItem, priced_subtotal};
pub use session::{CheckoutSession, NoticeHandle, NoticeTimer, PAYMENT_ADDED};
pub use state::{Amounts, FinalizationState, FocusField, SaleContext, normalize_note};
pub use validation::{can_confirm, can_confirm_with};
