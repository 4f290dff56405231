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

//! Error types.
//!
//! The finalization engine itself has no failure path: bad input is clamped and
//! blocked transitions are ignored. What remains are inline validation messages
//! for the manual total and the I/O errors of loading configuration and replay
//! files.

use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

/// Inline message shown under the manual total field.
///
/// Blocks confirmation, never aborts anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManualTotalIssue {
    /// Global pricing is on and no total was typed
    #[error("enter the sale total")]
    Missing,

    /// Typed total is below zero
    #[error("total cannot be negative")]
    Negative,

    /// Typed total is lower than what the priced items already add up to
    #[error("total must be at least {subtotal} (priced items)")]
    BelowSubtotal { subtotal: Decimal },
}

/// Unrecognized name in a keypad or replay script token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown payment method '{0}'")]
    UnknownPaymentMethod(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("unknown form field '{0}'")]
    UnknownField(String),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Errors raised while replaying a recorded event script.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: unknown event '{kind}'")]
    UnknownEvent { line: u64, kind: String },

    #[error("line {line}: invalid value '{value}' for '{kind}'")]
    InvalidValue { line: u64, kind: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn manual_total_messages() {
        assert_eq!(ManualTotalIssue::Missing.to_string(), "enter the sale total");
        assert_eq!(ManualTotalIssue::Negative.to_string(), "total cannot be negative");
        assert_eq!(
            ManualTotalIssue::BelowSubtotal { subtotal: dec!(12.50) }.to_string(),
            "total must be at least 12.50 (priced items)"
        );
    }

    #[test]
    fn replay_error_messages() {
        let err = ReplayError::UnknownEvent {
            line: 4,
            kind: "swipe".to_string(),
        };
        assert_eq!(err.to_string(), "line 4: unknown event 'swipe'");

        let err = ReplayError::InvalidValue {
            line: 2,
            kind: "key".to_string(),
            value: "f5".to_string(),
        };
        assert_eq!(err.to_string(), "line 2: invalid value 'f5' for 'key'");
    }

    #[test]
    fn parse_error_messages() {
        assert_eq!(
            ParseError::UnknownPaymentMethod("bitcoin".to_string()).to_string(),
            "unknown payment method 'bitcoin'"
        );
        assert_eq!(ParseError::UnknownKey("f5".to_string()).to_string(), "unknown key 'f5'");
        assert_eq!(
            ParseError::UnknownField("tip".to_string()).to_string(),
            "unknown form field 'tip'"
        );
    }

    #[test]
    fn issues_are_cloneable() {
        let issue = ManualTotalIssue::Negative;
        assert_eq!(issue.clone(), issue);
    }
}
