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

//! Sale line items and transaction classification.

use crate::base::{CategoryId, PresetId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One line of the sale being finalized. Read-only for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub category_id: CategoryId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub weight: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub preset_id: Option<PresetId>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl SaleLineItem {
    pub fn priced(category_id: u32, total: Decimal) -> Self {
        Self {
            category_id: CategoryId(category_id),
            quantity: 1,
            weight: Decimal::ZERO,
            unit_price: total,
            total,
            preset_id: None,
            notes: None,
        }
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset_id = Some(PresetId::new(preset));
        self
    }

    pub fn is_priced(&self) -> bool {
        self.total > Decimal::ZERO
    }
}

/// Sum of the totals of positively priced lines.
pub fn priced_subtotal(items: &[SaleLineItem]) -> Decimal {
    items
        .iter()
        .filter(|item| item.is_priced())
        .map(|item| item.total)
        .sum()
}

/// Decides whether a sale is "special": recycling, drop-off or donation-only
/// lines that may be closed at zero amount.
pub trait ItemClassifier {
    fn is_special(&self, items: &[SaleLineItem]) -> bool;
}

/// Classifies by preset identifier.
///
/// A sale is special when at least one line carries a special preset and no
/// line is positively priced.
#[derive(Debug, Clone)]
pub struct PresetClassifier {
    presets: HashSet<String>,
}

impl PresetClassifier {
    pub const DEFAULT_PRESETS: [&'static str; 3] = ["recycling", "dropoff", "donation"];

    pub fn new<I, S>(presets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            presets: presets.into_iter().map(Into::into).collect(),
        }
    }

    fn is_special_line(&self, item: &SaleLineItem) -> bool {
        item.preset_id
            .as_ref()
            .is_some_and(|preset| self.presets.contains(preset.as_str()))
    }
}

impl Default for PresetClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRESETS)
    }
}

impl ItemClassifier for PresetClassifier {
    fn is_special(&self, items: &[SaleLineItem]) -> bool {
        let has_special = items.iter().any(|item| self.is_special_line(item));
        has_special && !items.iter().any(SaleLineItem::is_priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subtotal_ignores_free_lines() {
        let items = vec![
            SaleLineItem::priced(1, dec!(4.50)),
            SaleLineItem::priced(2, dec!(0)).with_preset("recycling"),
            SaleLineItem::priced(3, dec!(2.00)),
        ];
        assert_eq!(priced_subtotal(&items), dec!(6.50));
    }

    #[test]
    fn recycling_only_sale_is_special() {
        let items = vec![SaleLineItem::priced(7, dec!(0)).with_preset("recycling")];
        assert!(PresetClassifier::default().is_special(&items));
    }

    #[test]
    fn priced_line_disqualifies_special() {
        let items = vec![
            SaleLineItem::priced(7, dec!(0)).with_preset("donation"),
            SaleLineItem::priced(1, dec!(3)),
        ];
        assert!(!PresetClassifier::default().is_special(&items));
    }

    #[test]
    fn empty_and_unknown_presets_are_regular() {
        let classifier = PresetClassifier::default();
        assert!(!classifier.is_special(&[]));
        let items = vec![SaleLineItem::priced(7, dec!(0)).with_preset("promo")];
        assert!(!classifier.is_special(&items));
    }

    #[test]
    fn custom_presets() {
        let classifier = PresetClassifier::new(["dechetterie"]);
        let items = vec![SaleLineItem::priced(7, dec!(0)).with_preset("dechetterie")];
        assert!(classifier.is_special(&items));
    }
}
