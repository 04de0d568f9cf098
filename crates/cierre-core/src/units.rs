//! Unit normalization: raw field units into canonical Liters/Kilograms.
//!
//! Field crews record quantities in whatever unit is on the container (cc,
//! g, L, kg). Costing and inventory work exclusively in the canonical base
//! units, so every recorded quantity passes through [`normalize`] first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Canonical base unit of a normalized quantity.
///
/// `Unit` is the lenient pass-through for unrecognized input units: the
/// quantity is kept as-is and no conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseUnit {
    Liters,
    Kilograms,
    Unit,
}

impl fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Liters => "L",
            Self::Kilograms => "kg",
            Self::Unit => "unit",
        };
        f.write_str(s)
    }
}

/// Convert a raw recorded quantity into its canonical base.
///
/// Matching is case-insensitive on the trimmed unit string. Unknown units
/// pass through unchanged as [`BaseUnit::Unit`]; that leniency is
/// deliberate (legacy totals depend on it) but each occurrence is logged so
/// data-entry typos do not go completely unnoticed.
pub fn normalize(quantity: f64, unit: &str) -> (f64, BaseUnit) {
    match unit.trim().to_lowercase().as_str() {
        "cc" => (quantity / 1000.0, BaseUnit::Liters),
        "l" | "lt" | "litro" | "litros" => (quantity, BaseUnit::Liters),
        "g" => (quantity / 1000.0, BaseUnit::Kilograms),
        "kg" | "kilo" | "kilos" => (quantity, BaseUnit::Kilograms),
        other => {
            tracing::warn!(unit = other, quantity, "unrecognized unit passed through unchanged");
            (quantity, BaseUnit::Unit)
        }
    }
}

/// Convert a fertilizer bag count to kilograms via the product's configured
/// kg-per-bulto factor.
///
/// Unlike [`normalize`], a missing (or non-positive) factor is a hard error:
/// bag capture cannot proceed until the product is configured. The caller is
/// the daily capture form, which records quantities before closure ever sees
/// them; closure itself only reads the already-normalized records.
pub fn bultos_to_kilograms(
    count: f64,
    kg_per_bulto: Option<f64>,
    product_name: &str,
) -> CoreResult<f64> {
    match kg_per_bulto {
        Some(factor) if factor > 0.0 => Ok(count * factor),
        _ => Err(CoreError::Configuration(format!(
            "product {product_name:?} has no kg-per-bulto factor configured"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cc_converts_to_liters() {
        assert_eq!(normalize(1500.0, "cc"), (1.5, BaseUnit::Liters));
    }

    #[test]
    fn grams_convert_to_kilograms() {
        assert_eq!(normalize(2500.0, "g"), (2.5, BaseUnit::Kilograms));
    }

    #[test]
    fn liters_and_kilos_pass_through() {
        assert_eq!(normalize(4.0, "L"), (4.0, BaseUnit::Liters));
        assert_eq!(normalize(3.0, "kg"), (3.0, BaseUnit::Kilograms));
        assert_eq!(normalize(2.0, "Litros"), (2.0, BaseUnit::Liters));
    }

    #[test]
    fn input_is_trimmed_and_case_insensitive() {
        assert_eq!(normalize(250.0, "  CC "), (0.25, BaseUnit::Liters));
        assert_eq!(normalize(1.0, "KILOS"), (1.0, BaseUnit::Kilograms));
    }

    #[test]
    fn unknown_unit_is_lenient_pass_through() {
        assert_eq!(normalize(7.0, "sobres"), (7.0, BaseUnit::Unit));
        assert_eq!(normalize(7.0, ""), (7.0, BaseUnit::Unit));
    }

    #[test]
    fn bultos_need_a_configured_factor() {
        assert_eq!(bultos_to_kilograms(4.0, Some(50.0), "urea").unwrap(), 200.0);

        let err = bultos_to_kilograms(4.0, None, "urea").unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert!(err.to_string().contains("urea"));

        // A zero factor is as unusable as a missing one.
        assert!(bultos_to_kilograms(4.0, Some(0.0), "urea").is_err());
    }
}
