use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::InstalledApp;
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for installed applications.
#[derive(Clone)]
pub struct AppLoader {
    pool: PgPool,
}

impl AppLoader {
    pub const BATCH: usize = 50;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_batch(
        &self,
        upload_id: Uuid,
        apps: &[InstalledApp],
    ) -> Result<(), AppError> {
        if apps.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO installed_apps (
                upload_id, app_identifier, app_name, app_version, app_guid,
                install_ts, install_time, last_launched_ts, last_launched,
                decoding_status, is_emulatable, operation_mode,
                permissions, categories, directory_paths,
                deleted_state, decoding_confidence, raw
            ) "#,
        );
        qb.push_values(apps, |mut b, app| {
            b.push_bind(upload_id)
                .push_bind(&app.app_identifier)
                .push_bind(&app.name)
                .push_bind(&app.version)
                .push_bind(&app.guid)
                .push_bind(app.install_ts)
                .push_bind(app.install_time)
                .push_bind(app.last_launched_ts)
                .push_bind(app.last_launched)
                .push_bind(&app.decoding_status)
                .push_bind(app.is_emulatable)
                .push_bind(&app.operation_mode)
                .push_bind(super::to_json(&app.permissions))
                .push_bind(super::to_json(&app.categories))
                .push_bind(super::to_json(&app.directory_paths))
                .push_bind(&app.deleted_state)
                .push_bind(&app.decoding_confidence)
                .push_bind(&app.raw);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, app_identifier) DO UPDATE SET
                app_name = COALESCE(EXCLUDED.app_name, installed_apps.app_name),
                app_version = COALESCE(EXCLUDED.app_version, installed_apps.app_version),
                app_guid = COALESCE(EXCLUDED.app_guid, installed_apps.app_guid),
                install_ts = COALESCE(EXCLUDED.install_ts, installed_apps.install_ts),
                install_time = COALESCE(EXCLUDED.install_time, installed_apps.install_time),
                last_launched_ts = COALESCE(EXCLUDED.last_launched_ts, installed_apps.last_launched_ts),
                last_launched = COALESCE(EXCLUDED.last_launched, installed_apps.last_launched),
                decoding_status = COALESCE(EXCLUDED.decoding_status, installed_apps.decoding_status),
                is_emulatable = COALESCE(EXCLUDED.is_emulatable, installed_apps.is_emulatable),
                operation_mode = COALESCE(EXCLUDED.operation_mode, installed_apps.operation_mode),
                permissions = EXCLUDED.permissions,
                categories = EXCLUDED.categories,
                directory_paths = EXCLUDED.directory_paths,
                deleted_state = COALESCE(EXCLUDED.deleted_state, installed_apps.deleted_state),
                decoding_confidence = COALESCE(EXCLUDED.decoding_confidence, installed_apps.decoding_confidence),
                raw = EXCLUDED.raw,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
