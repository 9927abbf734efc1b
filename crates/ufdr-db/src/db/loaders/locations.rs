use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::LocationRecord;
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for location fixes and named places.
#[derive(Clone)]
pub struct LocationLoader {
    pool: PgPool,
}

impl LocationLoader {
    pub const BATCH: usize = 100;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_batch(
        &self,
        upload_id: Uuid,
        locations: &[LocationRecord],
    ) -> Result<(), AppError> {
        if locations.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO location_records (
                upload_id, model_id, source_app, latitude, longitude,
                altitude, accuracy, bearing, speed, location_type, category,
                street, city, state, country, postal_code,
                location_ts, location_time, platform, confidence,
                deleted_state, decoding_confidence, raw
            ) "#,
        );
        qb.push_values(locations, |mut b, loc| {
            b.push_bind(upload_id)
                .push_bind(&loc.model_id)
                .push_bind(&loc.source_app)
                .push_bind(loc.latitude)
                .push_bind(loc.longitude)
                .push_bind(loc.altitude)
                .push_bind(loc.accuracy)
                .push_bind(loc.bearing)
                .push_bind(loc.speed)
                .push_bind(&loc.location_type)
                .push_bind(&loc.category)
                .push_bind(&loc.street)
                .push_bind(&loc.city)
                .push_bind(&loc.state)
                .push_bind(&loc.country)
                .push_bind(&loc.postal_code)
                .push_bind(loc.timestamp_ms)
                .push_bind(loc.timestamp)
                .push_bind(&loc.platform)
                .push_bind(&loc.confidence)
                .push_bind(&loc.deleted_state)
                .push_bind(&loc.decoding_confidence)
                .push_bind(&loc.raw);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, model_id) DO UPDATE SET
                source_app = COALESCE(EXCLUDED.source_app, location_records.source_app),
                latitude = COALESCE(EXCLUDED.latitude, location_records.latitude),
                longitude = COALESCE(EXCLUDED.longitude, location_records.longitude),
                altitude = COALESCE(EXCLUDED.altitude, location_records.altitude),
                accuracy = COALESCE(EXCLUDED.accuracy, location_records.accuracy),
                bearing = COALESCE(EXCLUDED.bearing, location_records.bearing),
                speed = COALESCE(EXCLUDED.speed, location_records.speed),
                location_type = COALESCE(EXCLUDED.location_type, location_records.location_type),
                category = COALESCE(EXCLUDED.category, location_records.category),
                street = COALESCE(EXCLUDED.street, location_records.street),
                city = COALESCE(EXCLUDED.city, location_records.city),
                state = COALESCE(EXCLUDED.state, location_records.state),
                country = COALESCE(EXCLUDED.country, location_records.country),
                postal_code = COALESCE(EXCLUDED.postal_code, location_records.postal_code),
                location_ts = COALESCE(EXCLUDED.location_ts, location_records.location_ts),
                location_time = COALESCE(EXCLUDED.location_time, location_records.location_time),
                platform = COALESCE(EXCLUDED.platform, location_records.platform),
                confidence = COALESCE(EXCLUDED.confidence, location_records.confidence),
                deleted_state = COALESCE(EXCLUDED.deleted_state, location_records.deleted_state),
                decoding_confidence = COALESCE(EXCLUDED.decoding_confidence, location_records.decoding_confidence),
                raw = EXCLUDED.raw,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
