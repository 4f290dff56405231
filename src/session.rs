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

//! Dialog lifecycle.
//!
//! A [`CheckoutSession`] owns at most one [`FinalizationState`]. The state is
//! built when the dialog goes from closed to open and dropped when it closes,
//! whether by confirm or cancel. Nothing survives a close.
//!
//! # Example
//!
//! ```
//! use ressourcerie_checkout::{
//!     Capabilities, CheckoutSession, Event, Key, Outcome, PresetClassifier, SaleContext,
//!     SaleLineItem,
//! };
//! use rust_decimal_macros::dec;
//! use std::time::{Duration, Instant};
//!
//! let ctx = SaleContext::new(
//!     vec![SaleLineItem::priced(1, dec!(10))],
//!     dec!(10),
//!     None,
//!     Capabilities::default(),
//!     &PresetClassifier::default(),
//! );
//! let mut session = CheckoutSession::new(ctx, Duration::from_secs(2));
//! session.open();
//!
//! let now = Instant::now();
//! session.dispatch(Event::SetTendered("20".into()), now);
//! let outcome = session.dispatch(Event::Submit, now);
//!
//! assert!(matches!(outcome, Some(Outcome::Submitted(_))));
//! assert!(!session.is_open());
//! ```

use crate::reducer::{Event, Outcome, reduce};
use crate::state::{Amounts, FinalizationState, SaleContext};
use crate::validation::can_confirm;
use std::time::{Duration, Instant};
use tracing::debug;

/// Message shown after a split payment is recorded.
pub const PAYMENT_ADDED: &str = "payment added";

/// Handle to a scheduled notice. Cancelling with a stale handle does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeHandle(u64);

#[derive(Debug, Clone)]
struct ActiveNotice {
    handle: NoticeHandle,
    message: &'static str,
    expires_at: Instant,
}

/// Transient notice with explicit cancellation.
///
/// Time is passed in by the caller so expiry is deterministic.
#[derive(Debug, Clone)]
pub struct NoticeTimer {
    lifetime: Duration,
    next_id: u64,
    active: Option<ActiveNotice>,
}

impl NoticeTimer {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            next_id: 0,
            active: None,
        }
    }

    /// Shows `message` until `now + lifetime`, replacing any current notice.
    pub fn schedule(&mut self, message: &'static str, now: Instant) -> NoticeHandle {
        self.next_id += 1;
        let handle = NoticeHandle(self.next_id);
        self.active = Some(ActiveNotice {
            handle,
            message,
            expires_at: now + self.lifetime,
        });
        handle
    }

    /// Cancels the notice if `handle` is still the current one.
    pub fn cancel(&mut self, handle: NoticeHandle) -> bool {
        match &self.active {
            Some(active) if active.handle == handle => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.active = None;
    }

    pub fn current(&self) -> Option<NoticeHandle> {
        self.active.as_ref().map(|active| active.handle)
    }

    /// Message still showing at `now`.
    pub fn visible(&self, now: Instant) -> Option<&'static str> {
        self.active
            .as_ref()
            .filter(|active| now < active.expires_at)
            .map(|active| active.message)
    }

    /// Drops an expired notice. Returns whether one was dropped.
    pub fn expire(&mut self, now: Instant) -> bool {
        let expired = self
            .active
            .as_ref()
            .is_some_and(|active| now >= active.expires_at);
        if expired {
            self.active = None;
        }
        expired
    }
}

/// The finalization dialog.
#[derive(Debug)]
pub struct CheckoutSession {
    ctx: SaleContext,
    state: Option<FinalizationState>,
    notice: NoticeTimer,
}

impl CheckoutSession {
    pub fn new(ctx: SaleContext, notice_lifetime: Duration) -> Self {
        Self {
            ctx,
            state: None,
            notice: NoticeTimer::new(notice_lifetime),
        }
    }

    pub fn context(&self) -> &SaleContext {
        &self.ctx
    }

    /// Opens the dialog. Already open: keeps the current state.
    pub fn open(&mut self) {
        if self.state.is_none() {
            debug!(total = %self.ctx.total_amount(), special = self.ctx.is_special(), "finalization opened");
            self.state = Some(FinalizationState::open(&self.ctx));
        }
    }

    /// Closes the dialog and discards everything typed.
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            debug!("finalization closed");
        }
        self.notice.cancel_all();
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&FinalizationState> {
        self.state.as_ref()
    }

    pub fn amounts(&self) -> Option<Amounts> {
        self.state
            .as_ref()
            .map(|state| Amounts::compute(&self.ctx, state))
    }

    pub fn can_confirm(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| can_confirm(&self.ctx, state))
    }

    pub fn notice(&self, now: Instant) -> Option<&'static str> {
        self.notice.visible(now)
    }

    /// Feeds one event to the open dialog. Events on a closed dialog are dropped.
    ///
    /// Submission and cancellation close the dialog.
    pub fn dispatch(&mut self, event: Event, now: Instant) -> Option<Outcome> {
        let state = self.state.take()?;
        self.notice.cancel_all();

        let (state, outcome) = reduce(&self.ctx, state, event);
        self.state = Some(state);

        match &outcome {
            Some(Outcome::PaymentAdded(_)) => {
                self.notice.schedule(PAYMENT_ADDED, now);
            }
            Some(Outcome::Submitted(_)) | Some(Outcome::Cancelled) => self.close(),
            None => {}
        }
        outcome
    }
}
