use axum::{extract::Path, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::analytics::advisory::{LeafCondition, LeafGuidance, SoilClass, SoilGuidance};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoilAdvisoryResponse {
    pub soil_type: SoilClass,
    #[serde(flatten)]
    pub guidance: SoilGuidance,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiseaseAdvisoryResponse {
    pub condition: LeafCondition,
    #[serde(flatten)]
    pub guidance: LeafGuidance,
}

/// Accepts the full label ("Red Soil") or the short form ("red").
fn parse_soil_class(raw: &str) -> Option<SoilClass> {
    raw.parse::<SoilClass>()
        .or_else(|_| format!("{} soil", raw.trim()).parse())
        .ok()
}

/// Agronomy guidance for a soil class
#[utoipa::path(
    get,
    path = "/api/recommendations/soil/{soil_type}",
    params(
        ("soil_type" = String, Path, description = "Alluvial, Black, Clay or Red (with or without \" Soil\")"),
    ),
    responses(
        (status = 200, description = "Guidance found", body = SoilAdvisoryResponse),
        (status = 404, description = "Unknown soil class"),
    ),
    tag = "recommendations"
)]
pub async fn soil_recommendations(
    Path(soil_type): Path<String>,
) -> AppResult<Json<SoilAdvisoryResponse>> {
    let soil_type = parse_soil_class(&soil_type)
        .ok_or_else(|| AppError::NotFound(format!("Unknown soil type '{soil_type}'")))?;

    Ok(Json(SoilAdvisoryResponse {
        soil_type,
        guidance: soil_type.guidance(),
    }))
}

/// Treatment and prevention guidance for a leaf condition
#[utoipa::path(
    get,
    path = "/api/recommendations/disease/{condition}",
    params(
        ("condition" = String, Path, description = "curl, healthy, slug or spot"),
    ),
    responses(
        (status = 200, description = "Guidance found", body = DiseaseAdvisoryResponse),
        (status = 404, description = "Unknown leaf condition"),
    ),
    tag = "recommendations"
)]
pub async fn disease_recommendations(
    Path(condition): Path<String>,
) -> AppResult<Json<DiseaseAdvisoryResponse>> {
    let condition: LeafCondition = condition
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown leaf condition '{condition}'")))?;

    Ok(Json(DiseaseAdvisoryResponse {
        condition,
        guidance: condition.guidance(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_soil_names_resolve() {
        assert_eq!(parse_soil_class("red"), Some(SoilClass::Red));
        assert_eq!(parse_soil_class("Black Soil"), Some(SoilClass::Black));
        assert_eq!(parse_soil_class("sandy"), None);
    }
}
