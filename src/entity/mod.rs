pub mod devices;
pub mod disease_images;
pub mod sensor_readings;
pub mod soil_images;
pub mod weather_samples;
