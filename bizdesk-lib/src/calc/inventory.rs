//! Stock levels and movements

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// How an item's available quantity compares to its reorder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Goods received.
    In,
    /// Goods shipped or consumed.
    Out,
    /// Goods moved to another location.
    Transfer,
    /// Stock count correction; the quantity is the counted on-hand amount.
    Adjustment,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }

    /// Whether the movement takes stock out of the source location.
    pub fn draws_stock(self) -> bool {
        matches!(self, MovementType::Out | MovementType::Transfer)
    }
}

/// Quantities of one item at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StockLevels {
    pub on_hand: i64,
    pub reserved: i64,
    pub reorder_level: i64,
}

impl StockLevels {
    pub fn new(on_hand: i64, reserved: i64, reorder_level: i64) -> Self {
        Self {
            on_hand,
            reserved,
            reorder_level,
        }
    }

    /// On-hand minus reserved, never negative.
    pub fn available(&self) -> i64 {
        (self.on_hand - self.reserved).max(0)
    }

    pub fn status(&self) -> StockStatus {
        let available = self.available();
        if available <= 0 {
            StockStatus::OutOfStock
        } else if available <= self.reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Levels at the source location after a movement.
    ///
    /// Quantities are not checked here; see `validation::validate_movement`.
    pub fn after(&self, kind: MovementType, quantity: i64) -> StockLevels {
        let on_hand = match kind {
            MovementType::In => self.on_hand + quantity,
            MovementType::Out | MovementType::Transfer => self.on_hand - quantity,
            MovementType::Adjustment => quantity,
        };
        StockLevels { on_hand, ..*self }
    }

    /// Signed change in on-hand quantity caused by a movement.
    pub fn delta(&self, kind: MovementType, quantity: i64) -> i64 {
        self.after(kind, quantity).on_hand - self.on_hand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_never_negative() {
        assert_eq!(StockLevels::new(5, 8, 0).available(), 0);
        assert_eq!(StockLevels::new(10, 3, 0).available(), 7);
    }

    #[test]
    fn test_status() {
        assert_eq!(StockLevels::new(0, 0, 5).status(), StockStatus::OutOfStock);
        assert_eq!(StockLevels::new(6, 1, 5).status(), StockStatus::LowStock);
        assert_eq!(StockLevels::new(20, 1, 5).status(), StockStatus::InStock);
    }

    #[test]
    fn test_movement_effects() {
        let levels = StockLevels::new(10, 2, 3);
        assert_eq!(levels.after(MovementType::In, 5).on_hand, 15);
        assert_eq!(levels.after(MovementType::Out, 4).on_hand, 6);
        assert_eq!(levels.after(MovementType::Transfer, 4).on_hand, 6);
        assert_eq!(levels.after(MovementType::Adjustment, 7).on_hand, 7);
        assert_eq!(levels.delta(MovementType::Adjustment, 7), -3);
        assert_eq!(levels.after(MovementType::Out, 4).reserved, 2);
    }
}
