use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use super::aggregate::Npk;

/// Concentrations at or above which a nutrient index saturates at 1.
pub const NITROGEN_MAX: f64 = 140.0;
pub const PHOSPHOROUS_MAX: f64 = 125.0;
pub const POTASSIUM_MAX: f64 = 200.0;

/// Composite 0-100 soil quality from NPK levels.
///
/// Each nutrient is normalised against its saturation level and clamped to
/// [0, 1]; the score is the rounded mean of the three indices times 100.
#[must_use]
pub fn soil_quality(npk: &Npk) -> u8 {
    let index = |value: f64, max: f64| (value / max).clamp(0.0, 1.0);

    let mean = (index(npk.nitrogen, NITROGEN_MAX)
        + index(npk.phosphorous, PHOSPHOROUS_MAX)
        + index(npk.potassium, POTASSIUM_MAX))
        / 3.0;

    // NaN saturates to 0 on cast
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (mean * 100.0).round() as u8;
    score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Nitrogen,
    Phosphorous,
    Potassium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 3] = [Self::Nitrogen, Self::Phosphorous, Self::Potassium];

    #[must_use]
    pub fn level(self, npk: &Npk) -> f64 {
        match self {
            Self::Nitrogen => npk.nitrogen,
            Self::Phosphorous => npk.phosphorous,
            Self::Potassium => npk.potassium,
        }
    }

    /// Agronomic working range for this nutrient.
    #[must_use]
    pub fn range(self) -> NutrientRange {
        match self {
            Self::Nitrogen => NutrientRange {
                min: 20.0,
                optimal: 80.0,
                max: NITROGEN_MAX,
            },
            Self::Phosphorous => NutrientRange {
                min: 10.0,
                optimal: 55.0,
                max: PHOSPHOROUS_MAX,
            },
            Self::Potassium => NutrientRange {
                min: 15.0,
                optimal: 90.0,
                max: POTASSIUM_MAX,
            },
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nitrogen => "nitrogen",
            Self::Phosphorous => "phosphorous",
            Self::Potassium => "potassium",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientRange {
    pub min: f64,
    pub optimal: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    Increase,
    Reduce,
}

/// Corrective action for one nutrient outside its working range.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NutrientAdvice {
    pub nutrient: Nutrient,
    pub adjustment: Adjustment,
    /// Suggested change in sensor units, one decimal
    pub amount: f64,
    pub message: String,
}

impl NutrientAdvice {
    fn new(nutrient: Nutrient, adjustment: Adjustment, amount: f64) -> Self {
        let amount = (amount * 10.0).round() / 10.0;
        let message = match adjustment {
            Adjustment::Increase => format!("Low {nutrient}: Increase by {amount:.1} units"),
            Adjustment::Reduce => format!("High {nutrient}: Reduce by {amount:.1} units"),
        };
        Self {
            nutrient,
            adjustment,
            amount,
            message,
        }
    }
}

/// Advice for every nutrient below its minimum or above its maximum.
#[must_use]
pub fn npk_advice(npk: &Npk) -> Vec<NutrientAdvice> {
    Nutrient::ALL
        .into_iter()
        .filter_map(|nutrient| {
            let value = nutrient.level(npk);
            let range = nutrient.range();
            if value < range.min {
                let increase = (range.optimal - value).min(range.max - value);
                Some(NutrientAdvice::new(nutrient, Adjustment::Increase, increase))
            } else if value > range.max {
                let reduction = (value - range.optimal).min(value - range.min);
                Some(NutrientAdvice::new(nutrient, Adjustment::Reduce, reduction))
            } else {
                None
            }
        })
        .collect()
}
