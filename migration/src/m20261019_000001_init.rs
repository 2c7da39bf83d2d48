use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ========== DEVICES ==========
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(
                        ColumnDef::new(Devices::DeviceId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Devices::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Devices::Latitude).double().not_null())
                    .col(ColumnDef::new(Devices::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(Devices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== SENSOR_READINGS ==========
        // Append-only; NPK/moisture/temperature are nullable so a reading can
        // carry a partial frame.
        manager
            .create_table(
                Table::create()
                    .table(SensorReadings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SensorReadings::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(SensorReadings::DeviceId).uuid().not_null())
                    .col(ColumnDef::new(SensorReadings::Nitrogen).double())
                    .col(ColumnDef::new(SensorReadings::Phosphorous).double())
                    .col(ColumnDef::new(SensorReadings::Potassium).double())
                    .col(ColumnDef::new(SensorReadings::Moisture).double())
                    .col(ColumnDef::new(SensorReadings::Temperature).double())
                    .col(
                        ColumnDef::new(SensorReadings::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sensor_readings_device")
                            .from(SensorReadings::Table, SensorReadings::DeviceId)
                            .to(Devices::Table, Devices::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-reading lookups walk this index
        db.execute_unprepared(
            "CREATE INDEX idx_sensor_readings_device_time ON sensor_readings (device_id, timestamp DESC)",
        )
        .await?;

        // ========== WEATHER_SAMPLES ==========
        manager
            .create_table(
                Table::create()
                    .table(WeatherSamples::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WeatherSamples::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(
                        ColumnDef::new(WeatherSamples::SensorReadingId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(WeatherSamples::Temperature).double().not_null())
                    .col(ColumnDef::new(WeatherSamples::Humidity).double().not_null())
                    .col(ColumnDef::new(WeatherSamples::WindSpeed).double().not_null())
                    .col(
                        ColumnDef::new(WeatherSamples::WindDirection)
                            .string_len(4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WeatherSamples::Precipitation)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(WeatherSamples::Condition)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WeatherSamples::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_weather_samples_reading")
                            .from(WeatherSamples::Table, WeatherSamples::SensorReadingId)
                            .to(SensorReadings::Table, SensorReadings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            "CREATE INDEX idx_weather_samples_time ON weather_samples (timestamp DESC)",
        )
        .await?;

        // ========== SOIL_IMAGES / DISEASE_IMAGES ==========
        for table in [ImageTable::Soil, ImageTable::Disease] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ClassifiedImages::Id)
                                .uuid()
                                .not_null()
                                .primary_key()
                                .extra("DEFAULT gen_random_uuid()"),
                        )
                        .col(ColumnDef::new(ClassifiedImages::Url).text().not_null())
                        .col(
                            ColumnDef::new(ClassifiedImages::PublicId)
                                .string_len(256)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClassifiedImages::Prediction)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ClassifiedImages::Confidence).double())
                        .col(
                            ColumnDef::new(ClassifiedImages::UploadedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .extra("DEFAULT NOW()"),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [ImageTable::Disease, ImageTable::Soil] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(WeatherSamples::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SensorReadings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    Id,
    DeviceId,
    Name,
    Latitude,
    Longitude,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SensorReadings {
    Table,
    Id,
    DeviceId,
    Nitrogen,
    Phosphorous,
    Potassium,
    Moisture,
    Temperature,
    Timestamp,
}

#[derive(DeriveIden)]
enum WeatherSamples {
    Table,
    Id,
    SensorReadingId,
    Temperature,
    Humidity,
    WindSpeed,
    WindDirection,
    Precipitation,
    Condition,
    Timestamp,
}

/// Both image tables share one column layout.
#[derive(DeriveIden)]
enum ImageTable {
    #[sea_orm(iden = "soil_images")]
    Soil,
    #[sea_orm(iden = "disease_images")]
    Disease,
}

#[derive(DeriveIden)]
enum ClassifiedImages {
    Id,
    Url,
    PublicId,
    Prediction,
    Confidence,
    UploadedAt,
}
