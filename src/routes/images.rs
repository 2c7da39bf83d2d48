use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::advisory::{LeafCondition, SoilClass};
use crate::common::AppState;
use crate::entity::{disease_images, soil_images};
use crate::error::{AppError, AppResult};

/// A classified image already stored by the image host.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecordRequest {
    pub url: String,
    /// Identifier assigned by the image host
    pub public_id: String,
    /// Class label returned by the classifier
    pub prediction: String,
    /// Percent
    pub confidence: Option<f64>,
}

impl ImageRecordRequest {
    fn validate(&self) -> AppResult<()> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(AppError::BadRequest(
                "url must be an http(s) URL".to_string(),
            ));
        }
        if self.public_id.trim().is_empty() {
            return Err(AppError::BadRequest("publicId is required".to_string()));
        }
        if self.confidence.is_some_and(|c| !(0.0..=100.0).contains(&c)) {
            return Err(AppError::BadRequest(
                "confidence must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecordResponse {
    pub id: Uuid,
    pub url: String,
    pub public_id: String,
    pub prediction: String,
    pub confidence: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

/// Record a classified soil image
#[utoipa::path(
    post,
    path = "/api/soil-images",
    request_body = ImageRecordRequest,
    responses(
        (status = 201, description = "Image recorded", body = ImageRecordResponse),
        (status = 400, description = "Invalid URL, identifier, label or confidence"),
    ),
    tag = "images"
)]
pub async fn record_soil_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRecordRequest>,
) -> AppResult<(StatusCode, Json<ImageRecordResponse>)> {
    request.validate()?;
    let label: SoilClass = request.prediction.parse()?;

    let saved = soil_images::ActiveModel {
        id: Set(Uuid::new_v4()),
        url: Set(request.url),
        public_id: Set(request.public_id),
        prediction: Set(label.label().to_string()),
        confidence: Set(request.confidence),
        uploaded_at: Set(Utc::now().into()),
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageRecordResponse {
            id: saved.id,
            url: saved.url,
            public_id: saved.public_id,
            prediction: saved.prediction,
            confidence: saved.confidence,
            uploaded_at: saved.uploaded_at.with_timezone(&Utc),
        }),
    ))
}

/// Record a classified plant-disease image
#[utoipa::path(
    post,
    path = "/api/disease-images",
    request_body = ImageRecordRequest,
    responses(
        (status = 201, description = "Image recorded", body = ImageRecordResponse),
        (status = 400, description = "Invalid URL, identifier, label or confidence"),
    ),
    tag = "images"
)]
pub async fn record_disease_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRecordRequest>,
) -> AppResult<(StatusCode, Json<ImageRecordResponse>)> {
    request.validate()?;
    let label: LeafCondition = request.prediction.parse()?;

    let saved = disease_images::ActiveModel {
        id: Set(Uuid::new_v4()),
        url: Set(request.url),
        public_id: Set(request.public_id),
        prediction: Set(label.label().to_string()),
        confidence: Set(request.confidence),
        uploaded_at: Set(Utc::now().into()),
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageRecordResponse {
            id: saved.id,
            url: saved.url,
            public_id: saved.public_id,
            prediction: saved.prediction,
            confidence: saved.confidence,
            uploaded_at: saved.uploaded_at.with_timezone(&Utc),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, confidence: Option<f64>) -> ImageRecordRequest {
        ImageRecordRequest {
            url: url.to_string(),
            public_id: "soil/abc123".to_string(),
            prediction: "Red Soil".to_string(),
            confidence,
        }
    }

    #[test]
    fn hosted_urls_only() {
        let hosted = request("https://res.example.com/soil/abc123.jpg", Some(91.0));
        assert!(hosted.validate().is_ok());
        assert!(request("file:///tmp/x.jpg", None).validate().is_err());
    }

    #[test]
    fn confidence_is_a_percentage() {
        let overconfident = request("https://img.example.com/a.jpg", Some(101.0));
        assert!(overconfident.validate().is_err());
    }
}
