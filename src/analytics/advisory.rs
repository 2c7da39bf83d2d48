//! Static agronomy guidance keyed by image-classification label.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

/// Soil classes produced by the soil image model, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SoilClass {
    #[serde(rename = "Alluvial Soil")]
    Alluvial,
    #[serde(rename = "Black Soil")]
    Black,
    #[serde(rename = "Clay Soil")]
    Clay,
    #[serde(rename = "Red Soil")]
    Red,
}

/// Leaf conditions produced by the disease image model, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeafCondition {
    Curl,
    Healthy,
    Slug,
    Spot,
}

impl SoilClass {
    pub const ALL: [SoilClass; 4] = [Self::Alluvial, Self::Black, Self::Clay, Self::Red];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Alluvial => "Alluvial Soil",
            Self::Black => "Black Soil",
            Self::Clay => "Clay Soil",
            Self::Red => "Red Soil",
        }
    }

    #[must_use]
    pub fn guidance(self) -> SoilGuidance {
        match self {
            Self::Alluvial => SoilGuidance {
                description: "Rich in nutrients and highly fertile soil formed by river deposits, common in Tamil Nadu delta regions.",
                suitable_crops: &[
                    "Paddy (நெல்)",
                    "Sugarcane (கரும்பு)",
                    "Banana (வாழைப்பழம்)",
                    "Coconut (தென்னை)",
                    "Betel (வெற்றிலை)",
                ],
                improvements: &[
                    "Regular organic matter addition to maintain fertility",
                    "Good drainage system to prevent waterlogging",
                    "Crop rotation to maintain soil health",
                ],
                characteristics: &[
                    "Good water retention capacity",
                    "High mineral content",
                    "Medium to fine texture",
                ],
            },
            Self::Black => SoilGuidance {
                description: "Deep black soil rich in clay content and moisture retention capacity, found in parts of western Tamil Nadu.",
                suitable_crops: &[
                    "Cotton (பருத்தி)",
                    "Chilli (மிளகாய்)",
                    "Groundnut (நிலக்கடலை)",
                    "Sorghum (சோளம்)",
                    "Green Gram (பச்சைப்பயிறு)",
                ],
                improvements: &[
                    "Deep ploughing to improve aeration",
                    "Addition of organic matter to improve structure",
                    "Proper drainage during monsoon",
                ],
                characteristics: &[
                    "High water retention",
                    "Rich in calcium, magnesium, and potash",
                    "Self-ploughing nature",
                ],
            },
            Self::Clay => SoilGuidance {
                description: "Heavy soil with high water retention and slow drainage, common in lowland areas of Tamil Nadu.",
                suitable_crops: &[
                    "Paddy (நெல்)",
                    "Turmeric (மஞ்சள்)",
                    "Water Spinach (வள்ளிக்கீரை)",
                    "Taro (சேப்பங்கிழங்கு)",
                    "Tapioca (மரவள்ளி)",
                ],
                improvements: &[
                    "Add organic matter to improve structure",
                    "Install drainage systems",
                    "Deep tilling when dry",
                ],
                characteristics: &["High nutrient content", "Poor drainage", "Compacts easily"],
            },
            Self::Red => SoilGuidance {
                description: "Well-drained soil rich in iron oxides with moderate fertility, predominant in many parts of Tamil Nadu.",
                suitable_crops: &[
                    "Finger Millet (கேழ்வரகு)",
                    "Groundnut (நிலக்கடலை)",
                    "Horse Gram (கொள்ளு)",
                    "Pearl Millet (கம்பு)",
                    "Black Gram (உளுந்து)",
                ],
                improvements: &[
                    "Regular addition of organic matter",
                    "Mulching to prevent water loss",
                    "Balanced fertilization",
                ],
                characteristics: &[
                    "Good drainage",
                    "Low nitrogen and phosphorus",
                    "Responsive to irrigation",
                ],
            },
        }
    }
}

impl LeafCondition {
    pub const ALL: [LeafCondition; 4] = [Self::Curl, Self::Healthy, Self::Slug, Self::Spot];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Curl => "curl",
            Self::Healthy => "healthy",
            Self::Slug => "slug",
            Self::Spot => "spot",
        }
    }

    #[must_use]
    pub fn guidance(self) -> LeafGuidance {
        match self {
            Self::Curl => LeafGuidance {
                description: "Leaf curl disease affecting plant growth and yield.",
                causes: &[
                    "Viral infection",
                    "Transmitted by whiteflies",
                    "Environmental stress",
                ],
                treatment: &[
                    "Remove and destroy infected plants",
                    "Control whitefly population",
                    "Use disease-resistant varieties",
                ],
                maintenance: &[],
                prevention: &[
                    "Regular monitoring for early detection",
                    "Maintain proper plant spacing",
                    "Use yellow sticky traps for whiteflies",
                ],
            },
            Self::Healthy => LeafGuidance {
                description: "Plant showing normal growth patterns without disease symptoms.",
                causes: &[],
                treatment: &[],
                maintenance: &[
                    "Regular watering schedule",
                    "Balanced fertilization",
                    "Proper sunlight exposure",
                ],
                prevention: &[
                    "Monitor for early signs of disease",
                    "Maintain good air circulation",
                    "Practice crop rotation",
                ],
            },
            Self::Slug => LeafGuidance {
                description: "Damage caused by slugs feeding on plant tissue.",
                causes: &[
                    "High moisture conditions",
                    "Dense plant coverage",
                    "Organic debris accumulation",
                ],
                treatment: &[
                    "Use slug baits or traps",
                    "Create barriers around plants",
                    "Remove hiding places near plants",
                ],
                maintenance: &[],
                prevention: &[
                    "Maintain dry soil surface",
                    "Regular garden cleanup",
                    "Encourage natural predators",
                ],
            },
            Self::Spot => LeafGuidance {
                description: "Fungal disease causing spots on leaves and stems.",
                causes: &["Fungal pathogens", "High humidity", "Poor air circulation"],
                treatment: &[
                    "Remove infected leaves",
                    "Apply appropriate fungicide",
                    "Improve air circulation",
                ],
                maintenance: &[],
                prevention: &[
                    "Avoid overhead watering",
                    "Space plants properly",
                    "Use disease-resistant varieties",
                ],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl From<UnknownLabel> for AppError {
    fn from(e: UnknownLabel) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl FromStr for SoilClass {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl FromStr for LeafCondition {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for SoilClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for LeafCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoilGuidance {
    #[schema(value_type = String)]
    pub description: &'static str,
    #[schema(value_type = Vec<String>)]
    pub suitable_crops: &'static [&'static str],
    #[schema(value_type = Vec<String>)]
    pub improvements: &'static [&'static str],
    #[schema(value_type = Vec<String>)]
    pub characteristics: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeafGuidance {
    #[schema(value_type = String)]
    pub description: &'static str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    #[schema(value_type = Vec<String>)]
    pub causes: &'static [&'static str],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    #[schema(value_type = Vec<String>)]
    pub treatment: &'static [&'static str],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    #[schema(value_type = Vec<String>)]
    pub maintenance: &'static [&'static str],
    #[schema(value_type = Vec<String>)]
    pub prevention: &'static [&'static str],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soil_labels_parse_case_insensitively() {
        assert_eq!("red soil".parse::<SoilClass>(), Ok(SoilClass::Red));
        assert_eq!("Alluvial Soil".parse::<SoilClass>(), Ok(SoilClass::Alluvial));
        assert!("Sandy Soil".parse::<SoilClass>().is_err());
    }

    #[test]
    fn healthy_leaves_get_maintenance_not_treatment() {
        let guidance = LeafCondition::Healthy.guidance();
        assert!(guidance.treatment.is_empty());
        assert_eq!(guidance.maintenance.len(), 3);

        let json = serde_json::to_value(guidance).unwrap();
        assert!(json.get("treatment").is_none());
        assert!(json.get("maintenance").is_some());
    }

    #[test]
    fn every_soil_class_lists_five_crops() {
        for class in SoilClass::ALL {
            assert_eq!(class.guidance().suitable_crops.len(), 5, "{class}");
        }
    }
}
