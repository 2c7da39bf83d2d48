use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sensor_readings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub device_id: Uuid,
    pub nitrogen: Option<f64>,
    pub phosphorous: Option<f64>,
    pub potassium: Option<f64>,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
    /// Capture time reported by the device (or receipt time when absent)
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::devices::Entity",
        from = "Column::DeviceId",
        to = "super::devices::Column::Id"
    )]
    Device,
    #[sea_orm(has_one = "super::weather_samples::Entity")]
    WeatherSample,
}

impl Related<super::devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::weather_samples::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WeatherSample.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
