//! Stock movement rules
//!
//! - quantity must be positive (an adjustment count may be zero)
//! - outbound and transfer movements cannot exceed available stock
//! - a transfer needs a destination different from its source
//! - an adjustment needs a reason of at least [`ADJUSTMENT_REASON_MIN_WORDS`] words

use super::codes;
use super::non_blank;
use super::require_min_words;
use crate::calc::inventory::MovementType;
use crate::calc::inventory::StockLevels;
use crate::error::ValidationErrors;

/// Minimum words in the reason for a stock adjustment.
pub const ADJUSTMENT_REASON_MIN_WORDS: usize = 3;

/// A stock movement as entered on the movement form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub kind: MovementType,
    pub quantity: i64,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

impl MovementRequest {
    pub fn new(kind: MovementType, quantity: i64) -> Self {
        Self {
            kind,
            quantity,
            from_location: None,
            to_location: None,
            reason: None,
            reference: None,
        }
    }

    pub fn from_location(mut self, location: impl Into<String>) -> Self {
        self.from_location = Some(location.into());
        self
    }

    pub fn to_location(mut self, location: impl Into<String>) -> Self {
        self.to_location = Some(location.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Validates a movement against the item's current levels.
pub fn validate_movement(request: &MovementRequest, levels: &StockLevels) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match request.kind {
        MovementType::Adjustment if request.quantity < 0 => {
            errors.push_code("quantity", "Counted quantity cannot be negative", codes::NON_NEGATIVE);
        }
        MovementType::Adjustment => {}
        _ if request.quantity <= 0 => {
            errors.push_code("quantity", "Quantity must be greater than zero", codes::POSITIVE);
        }
        kind if kind.draws_stock() && request.quantity > levels.available() => {
            errors.push_code(
                "quantity",
                format!("Only {} units available", levels.available()),
                codes::INSUFFICIENT_STOCK,
            );
        }
        _ => {}
    }

    if request.kind == MovementType::Transfer {
        match non_blank(request.to_location.as_deref()) {
            None => errors.push_code("to_location", "Destination is required", codes::REQUIRED),
            Some(to) => {
                let from = non_blank(request.from_location.as_deref());
                if from.is_some_and(|from| from.eq_ignore_ascii_case(to)) {
                    errors.push_code(
                        "to_location",
                        "Destination must differ from the source location",
                        codes::SAME_LOCATION,
                    );
                }
            }
        }
    }

    if request.kind == MovementType::Adjustment {
        require_min_words(
            &mut errors,
            "reason",
            request.reason.as_deref(),
            ADJUSTMENT_REASON_MIN_WORDS,
        );
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> StockLevels {
        StockLevels::new(10, 4, 2)
    }

    #[test]
    fn test_quantity_must_be_positive() {
        let err = validate_movement(&MovementRequest::new(MovementType::In, 0), &levels()).unwrap_err();
        assert!(err.has_code("quantity", codes::POSITIVE));
        assert!(validate_movement(&MovementRequest::new(MovementType::In, 50), &levels()).is_ok());
    }

    #[test]
    fn test_out_checks_available_not_on_hand() {
        assert!(validate_movement(&MovementRequest::new(MovementType::Out, 6), &levels()).is_ok());
        let err = validate_movement(&MovementRequest::new(MovementType::Out, 7), &levels()).unwrap_err();
        assert!(err.has_code("quantity", codes::INSUFFICIENT_STOCK));
    }

    #[test]
    fn test_transfer_rules() {
        let missing = MovementRequest::new(MovementType::Transfer, 1).from_location("A");
        assert!(validate_movement(&missing, &levels())
            .unwrap_err()
            .has_code("to_location", codes::REQUIRED));

        let same = missing.clone().to_location("a");
        assert!(validate_movement(&same, &levels())
            .unwrap_err()
            .has_code("to_location", codes::SAME_LOCATION));

        let too_many = MovementRequest::new(MovementType::Transfer, 9)
            .from_location("A")
            .to_location("B");
        assert!(validate_movement(&too_many, &levels())
            .unwrap_err()
            .has_code("quantity", codes::INSUFFICIENT_STOCK));

        let ok = MovementRequest::new(MovementType::Transfer, 2)
            .from_location("A")
            .to_location("B");
        assert!(validate_movement(&ok, &levels()).is_ok());
    }

    #[test]
    fn test_adjustment_needs_reason() {
        let bare = MovementRequest::new(MovementType::Adjustment, 0);
        assert!(validate_movement(&bare, &levels())
            .unwrap_err()
            .has_code("reason", codes::REQUIRED));

        let short = bare.clone().reason("recount");
        assert!(validate_movement(&short, &levels())
            .unwrap_err()
            .has_code("reason", codes::TOO_FEW_WORDS));

        let ok = bare.reason("annual physical stock count");
        assert!(validate_movement(&ok, &levels()).is_ok());
    }

    #[test]
    fn test_collects_every_failure() {
        let request = MovementRequest::new(MovementType::Transfer, 0);
        let err = validate_movement(&request, &levels()).unwrap_err();
        assert_eq!(err.len(), 2);
    }
}
