mod handlers;
mod types;

pub use handlers::{create_sensor_data, export_sensor_data, get_sensor_data, get_summary};
pub use types::{
    HistoryQuery, NewSensorDataRequest, NewSensorDataResponse, NpkReading, ReadingResponse,
    SensorDataQuery, SensorDataResponse, SummaryResponse,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_create_sensor_data, __path_export_sensor_data, __path_get_sensor_data,
    __path_get_summary,
};
