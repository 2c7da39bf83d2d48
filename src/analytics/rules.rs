//! Rule tables that turn aggregated metrics into crop, irrigation and
//! fertilizer recommendations.
//!
//! Each axis is an ordered list of `(threshold, effect)` rows evaluated with
//! strict comparisons, so the thresholds stay declarative and can be checked
//! one table at a time.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::aggregate::{is_missing, AggregatedMetrics};
use super::soil_quality::Nutrient;
use crate::error::AppError;

/// Moisture percentage treated as the irrigation target.
pub const OPTIMAL_MOISTURE: f64 = 60.0;
/// Temperature at which the evaporation factor equals 1.
pub const REFERENCE_TEMPERATURE: f64 = 30.0;

const CONFIDENCE_PENALTY: i32 = 30;

// ---------------------------------------------------------------------------
// Crop suitability
// ---------------------------------------------------------------------------

/// An axis where the first tier whose threshold is exceeded wins.
struct TieredAxis {
    metric: fn(&AggregatedMetrics) -> f64,
    tiers: &'static [(f64, &'static [&'static str])],
    otherwise: &'static [&'static str],
}

impl TieredAxis {
    fn select(&self, metrics: &AggregatedMetrics) -> &'static [&'static str] {
        let value = (self.metric)(metrics);
        self.tiers
            .iter()
            .find(|(threshold, _)| value > *threshold)
            .map_or(self.otherwise, |(_, crops)| *crops)
    }
}

/// Crops favoured by a high level of one nutrient; rules apply independently.
struct NutrientRule {
    nutrient: Nutrient,
    above: f64,
    crops: &'static [&'static str],
}

fn average_temp(m: &AggregatedMetrics) -> f64 {
    m.average_temp
}

fn average_moisture(m: &AggregatedMetrics) -> f64 {
    m.average_moisture
}

const TEMPERATURE_AXIS: TieredAxis = TieredAxis {
    metric: average_temp,
    tiers: &[
        (
            30.0,
            &[
                "Paddy (நெல்)",
                "Groundnut (நிலக்கடலை)",
                "Cotton (பருத்தி)",
                "Black Gram (உளுந்து)",
            ],
        ),
        (
            25.0,
            &[
                "Sugarcane (கரும்பு)",
                "Turmeric (மஞ்சள்)",
                "Green Gram (பச்சைப்பயிறு)",
                "Finger Millet (கேழ்வரகு)",
            ],
        ),
    ],
    otherwise: &[
        "Mustard (கடுகு)",
        "Coriander (கொத்தமல்லி)",
        "Fenugreek (வெந்தயம்)",
        "Pearl Millet (கம்பு)",
    ],
};

const MOISTURE_AXIS: TieredAxis = TieredAxis {
    metric: average_moisture,
    tiers: &[
        (
            60.0,
            &[
                "Banana (வாழைப்பழம்)",
                "Betel (வெற்றிலை)",
                "Water Spinach (வள்ளிக்கீரை)",
            ],
        ),
        (
            40.0,
            &[
                "Tomato (தக்காளி)",
                "Brinjal (கத்திரிக்காய்)",
                "Chilli (மிளகாய்)",
            ],
        ),
    ],
    otherwise: &[
        "Sorghum (சோளம்)",
        "Horse Gram (கொள்ளு)",
        "Sesame (எள்ளு)",
    ],
};

const NUTRIENT_RULES: &[NutrientRule] = &[
    NutrientRule {
        nutrient: Nutrient::Nitrogen,
        above: 60.0,
        crops: &["Coconut (தென்னை)", "Mango (மாம்பழம்)", "Guava (கொய்யா)"],
    },
    NutrientRule {
        nutrient: Nutrient::Phosphorous,
        above: 60.0,
        crops: &[
            "Drumstick (முருங்கை)",
            "Lady's Finger (வெண்டைக்காய்)",
            "Cluster Beans (கொத்தவரங்காய்)",
        ],
    },
    NutrientRule {
        nutrient: Nutrient::Potassium,
        above: 60.0,
        crops: &[
            "Tapioca (மரவள்ளி)",
            "Sweet Potato (சர்க்கரைவள்ளி)",
            "Curry Leaves (கருவேப்பிலை)",
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CropRecommendation {
    /// Unique crop names in order of first appearance
    pub recommended_crops: Vec<String>,
    pub confidence: u8,
}

#[must_use]
pub fn recommend_crops(metrics: &AggregatedMetrics) -> CropRecommendation {
    let nutrient_crops = NUTRIENT_RULES
        .iter()
        .filter(|rule| rule.nutrient.level(&metrics.average_npk) > rule.above)
        .flat_map(|rule| rule.crops.iter());

    let mut recommended_crops: Vec<String> = Vec::new();
    for crop in TEMPERATURE_AXIS
        .select(metrics)
        .iter()
        .chain(MOISTURE_AXIS.select(metrics))
        .chain(nutrient_crops)
    {
        if !recommended_crops.iter().any(|c| c == crop) {
            recommended_crops.push((*crop).to_string());
        }
    }

    CropRecommendation {
        recommended_crops,
        confidence: confidence(metrics),
    }
}

// ---------------------------------------------------------------------------
// Irrigation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum IrrigationUrgency {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "this week")]
    ThisWeek,
}

const URGENCY_TIERS: &[(f64, IrrigationUrgency)] = &[
    (15.0, IrrigationUrgency::Immediate),
    (10.0, IrrigationUrgency::Today),
];

/// Water need above which irrigation is recommended at all.
const NEEDS_WATER_ABOVE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationRecommendation {
    pub needs_water: bool,
    /// Litres per square metre, one decimal
    pub recommended_amount: f64,
    pub frequency: IrrigationUrgency,
    pub confidence: u8,
}

/// Water need from the moisture deficit scaled by an evaporation factor.
#[must_use]
pub fn water_needed(metrics: &AggregatedMetrics) -> f64 {
    let deficit = OPTIMAL_MOISTURE - metrics.average_moisture;
    let evaporation = metrics.average_temp / REFERENCE_TEMPERATURE;
    (deficit * evaporation).max(0.0)
}

#[must_use]
pub fn recommend_irrigation(metrics: &AggregatedMetrics) -> IrrigationRecommendation {
    let needed = water_needed(metrics);

    let frequency = URGENCY_TIERS
        .iter()
        .find(|(threshold, _)| needed > *threshold)
        .map_or(IrrigationUrgency::ThisWeek, |(_, urgency)| *urgency);

    IrrigationRecommendation {
        needs_water: needed > NEEDS_WATER_ABOVE,
        recommended_amount: (needed * 10.0).round() / 10.0,
        frequency,
        confidence: confidence(metrics),
    }
}

// ---------------------------------------------------------------------------
// Fertilizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NeedLevel {
    High,
    Moderate,
    Low,
}

const NEED_TIERS: &[(f64, NeedLevel)] = &[(40.0, NeedLevel::High), (60.0, NeedLevel::Moderate)];

/// Fertilizer need for a nutrient level; thresholds are exclusive upper bounds.
#[must_use]
pub fn need_level(level: f64) -> NeedLevel {
    NEED_TIERS
        .iter()
        .find(|(below, _)| level < *below)
        .map_or(NeedLevel::Low, |(_, need)| *need)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct FertilizerLevels {
    pub nitrogen: NeedLevel,
    pub phosphorous: NeedLevel,
    pub potassium: NeedLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FertilizerRecommendation {
    pub recommendations: FertilizerLevels,
    pub confidence: u8,
}

#[must_use]
pub fn recommend_fertilizer(metrics: &AggregatedMetrics) -> FertilizerRecommendation {
    let npk = &metrics.average_npk;
    FertilizerRecommendation {
        recommendations: FertilizerLevels {
            nitrogen: need_level(npk.nitrogen),
            phosphorous: need_level(npk.phosphorous),
            potassium: need_level(npk.potassium),
        },
        confidence: confidence(metrics),
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Data-completeness score: 100 minus 30 for each of missing temperature,
/// missing moisture and any missing NPK component, floored at 0.
#[must_use]
pub fn confidence(metrics: &AggregatedMetrics) -> u8 {
    let penalties = [
        is_missing(metrics.average_temp),
        is_missing(metrics.average_moisture),
        metrics.average_npk.has_missing_component(),
    ];

    let missing = penalties.into_iter().filter(|p| *p).count();
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let score = 100 - CONFIDENCE_PENALTY * missing as i32;

    u8::try_from(score.max(0)).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PredictionType {
    Crop,
    Irrigation,
    Fertilizer,
}

impl FromStr for PredictionType {
    type Err = UnknownPredictionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crop" => Ok(Self::Crop),
            "irrigation" => Ok(Self::Irrigation),
            "fertilizer" => Ok(Self::Fertilizer),
            other => Err(UnknownPredictionType(other.to_string())),
        }
    }
}

impl fmt::Display for PredictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Crop => "crop",
            Self::Irrigation => "irrigation",
            Self::Fertilizer => "fertilizer",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid prediction type: {0}")]
pub struct UnknownPredictionType(pub String);

impl From<UnknownPredictionType> for AppError {
    fn from(e: UnknownPredictionType) -> Self {
        Self::BadRequest(e.to_string())
    }
}

/// Output of one rule set, serialized without a tag.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Prediction {
    Crop(CropRecommendation),
    Irrigation(IrrigationRecommendation),
    Fertilizer(FertilizerRecommendation),
}

#[must_use]
pub fn recommend(kind: PredictionType, metrics: &AggregatedMetrics) -> Prediction {
    match kind {
        PredictionType::Crop => Prediction::Crop(recommend_crops(metrics)),
        PredictionType::Irrigation => Prediction::Irrigation(recommend_irrigation(metrics)),
        PredictionType::Fertilizer => Prediction::Fertilizer(recommend_fertilizer(metrics)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregate::Npk;

    fn metrics(temp: f64, moisture: f64, n: f64, p: f64, k: f64) -> AggregatedMetrics {
        AggregatedMetrics::new(
            temp,
            moisture,
            Npk {
                nitrogen: n,
                phosphorous: p,
                potassium: k,
            },
        )
    }

    #[test]
    fn hot_wet_rich_soil_collects_every_tier() {
        let rec = recommend_crops(&metrics(32.0, 70.0, 70.0, 70.0, 70.0));
        assert_eq!(rec.recommended_crops.len(), 4 + 3 + 9);
        assert_eq!(rec.recommended_crops[0], "Paddy (நெல்)");
        assert_eq!(rec.recommended_crops[4], "Banana (வாழைப்பழம்)");
        assert_eq!(rec.confidence, 100);
    }

    #[test]
    fn cool_dry_poor_soil_uses_fallback_tiers() {
        let rec = recommend_crops(&metrics(20.0, 30.0, 10.0, 10.0, 10.0));
        assert_eq!(
            rec.recommended_crops,
            vec![
                "Mustard (கடுகு)",
                "Coriander (கொத்தமல்லி)",
                "Fenugreek (வெந்தயம்)",
                "Pearl Millet (கம்பு)",
                "Sorghum (சோளம்)",
                "Horse Gram (கொள்ளு)",
                "Sesame (எள்ளு)",
            ]
        );
    }

    #[test]
    fn tier_boundaries_are_exclusive() {
        let rec = recommend_crops(&metrics(30.0, 60.0, 60.0, 60.0, 60.0));
        assert_eq!(rec.recommended_crops[0], "Sugarcane (கரும்பு)");
        assert_eq!(rec.recommended_crops[4], "Tomato (தக்காளி)");
        assert_eq!(rec.recommended_crops.len(), 7);
    }

    #[test]
    fn irrigation_urgency_tiers() {
        // deficit 12, factor 1 -> 12
        let rec = recommend_irrigation(&metrics(30.0, 48.0, 50.0, 50.0, 50.0));
        assert_eq!(rec.frequency, IrrigationUrgency::Today);
        assert!(rec.needs_water);

        // deficit 6, factor 0.5 -> 3
        let rec = recommend_irrigation(&metrics(15.0, 54.0, 50.0, 50.0, 50.0));
        assert_eq!(rec.frequency, IrrigationUrgency::ThisWeek);
        assert!(!rec.needs_water);
        assert_eq!(rec.recommended_amount, 3.0);
    }

    #[test]
    fn irrigation_amount_rounds_to_one_decimal() {
        // deficit 10, factor 26/30 -> 8.666..
        let rec = recommend_irrigation(&metrics(26.0, 50.0, 50.0, 50.0, 50.0));
        assert_eq!(rec.recommended_amount, 8.7);
    }

    #[test]
    fn need_levels_per_nutrient() {
        let rec = recommend_fertilizer(&metrics(25.0, 50.0, 10.0, 45.0, 90.0));
        assert_eq!(rec.recommendations.nitrogen, NeedLevel::High);
        assert_eq!(rec.recommendations.phosphorous, NeedLevel::Moderate);
        assert_eq!(rec.recommendations.potassium, NeedLevel::Low);
    }

    #[test]
    fn prediction_type_parsing() {
        assert_eq!("crop".parse::<PredictionType>(), Ok(PredictionType::Crop));
        assert_eq!(
            "irrigation".parse::<PredictionType>(),
            Ok(PredictionType::Irrigation)
        );
        assert!("Crop".parse::<PredictionType>().is_err());
        assert!("yield".parse::<PredictionType>().is_err());
    }

    #[test]
    fn untagged_prediction_serializes_inner_shape() {
        let json = serde_json::to_value(recommend(
            PredictionType::Irrigation,
            &metrics(30.0, 40.0, 50.0, 50.0, 50.0),
        ))
        .unwrap();
        assert_eq!(json["needsWater"], true);
        assert_eq!(json["frequency"], "immediate");
        assert_eq!(json["recommendedAmount"], 20.0);
    }
}
