// Fixed display bounds per quantity
use super::electric::Quantity;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    /// No calibration: the renderer should not constrain the axis.
    pub const UNCALIBRATED: AxisBounds = AxisBounds { min: 0.0, max: 0.0 };

    pub fn is_calibrated(&self) -> bool {
        self.min != self.max
    }
}

/// Dial and y-axis range for a quantity, so consecutive refreshes stay
/// visually comparable.
pub fn bounds_for(quantity: Option<Quantity>) -> AxisBounds {
    match quantity {
        // signed, flow can reverse
        Some(Quantity::Current) => AxisBounds { min: -40.0, max: 40.0 },
        // 230 V nominal, +/- 10 %
        Some(Quantity::Voltage) => AxisBounds { min: 209.0, max: 253.0 },
        Some(Quantity::GridFrequency) => AxisBounds { min: 49.8, max: 50.2 },
        None => AxisBounds::UNCALIBRATED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_table() {
        assert_eq!(bounds_for(Some(Quantity::Current)), AxisBounds { min: -40.0, max: 40.0 });
        assert_eq!(bounds_for(Some(Quantity::Voltage)), AxisBounds { min: 209.0, max: 253.0 });
        assert_eq!(
            bounds_for(Some(Quantity::GridFrequency)),
            AxisBounds { min: 49.8, max: 50.2 }
        );
    }

    #[test]
    fn test_unknown_quantity_is_uncalibrated() {
        let bounds = bounds_for(None);
        assert_eq!(bounds, AxisBounds { min: 0.0, max: 0.0 });
        assert!(!bounds.is_calibrated());
    }
}
