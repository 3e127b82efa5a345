use crate::db::Database;
use crate::engine::FieldLookup;
use crate::error::{Result, RotaplanError};
use crate::models::{
    ClimateZone, DrainageClass, FieldProfile, HistoryEntry, Level, SoilTexture,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::warn;

// Field Profile Queries

impl Database {
    /// Inserts or replaces a field and its full crop history.
    pub fn upsert_field(&self, field: &FieldProfile) -> Result<()> {
        if field.field_id.trim().is_empty() {
            return Err(RotaplanError::InvalidInput("field_id must not be empty".into()));
        }
        if !(field.acreage > 0.0) {
            return Err(RotaplanError::InvalidInput(format!(
                "field '{}' must have a positive acreage",
                field.field_id
            )));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();
            tx.execute(
                r#"
                INSERT INTO fields
                    (field_id, name, acreage, soil_texture, drainage, slope_percent,
                     soil_health_index, climate_zone, climate_volatility, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                ON CONFLICT(field_id) DO UPDATE SET
                    name = excluded.name,
                    acreage = excluded.acreage,
                    soil_texture = excluded.soil_texture,
                    drainage = excluded.drainage,
                    slope_percent = excluded.slope_percent,
                    soil_health_index = excluded.soil_health_index,
                    climate_zone = excluded.climate_zone,
                    climate_volatility = excluded.climate_volatility,
                    updated_at = excluded.updated_at
                "#,
                params![
                    field.field_id,
                    field.name,
                    field.acreage,
                    format!("{:?}", field.soil_texture),
                    format!("{:?}", field.drainage),
                    field.slope_percent,
                    field.soil_health_index,
                    format!("{:?}", field.climate_zone),
                    field.climate_volatility.map(|v| format!("{:?}", v)),
                    now,
                ],
            )?;

            tx.execute(
                "DELETE FROM crop_history WHERE field_id = ?1",
                params![field.field_id],
            )?;
            for entry in &field.crop_history {
                tx.execute(
                    "INSERT INTO crop_history (field_id, year, crop) VALUES (?1, ?2, ?3)",
                    params![field.field_id, entry.year, entry.crop.to_lowercase()],
                )?;
            }

            tx.commit()?;
            tracing::debug!(
                field_id = %field.field_id,
                history = field.crop_history.len(),
                "Saved field profile"
            );
            Ok(())
        })
    }

    pub fn get_field(&self, field_id: &str) -> Result<Option<FieldProfile>> {
        self.with_conn(|conn| {
            let field = conn
                .query_row(
                    "SELECT * FROM fields WHERE field_id = ?1",
                    params![field_id],
                    row_to_field,
                )
                .optional()?;

            match field {
                Some(mut field) => {
                    field.crop_history = load_history(conn, &field.field_id)?;
                    Ok(Some(field))
                }
                None => Ok(None),
            }
        })
    }

    pub fn list_fields(&self) -> Result<Vec<FieldProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM fields ORDER BY field_id")?;
            let fields = stmt
                .query_map([], row_to_field)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            fields
                .into_iter()
                .map(|mut field| {
                    field.crop_history = load_history(conn, &field.field_id)?;
                    Ok(field)
                })
                .collect()
        })
    }

    pub fn delete_field(&self, field_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM fields WHERE field_id = ?1", params![field_id])?;
            Ok(removed > 0)
        })
    }
}

impl FieldLookup for Database {
    fn field_profile(&self, field_id: &str) -> Result<FieldProfile> {
        self.get_field(field_id)?
            .ok_or_else(|| RotaplanError::UnknownField(field_id.to_string()))
    }
}

fn load_history(conn: &Connection, field_id: &str) -> Result<Vec<HistoryEntry>> {
    let mut stmt =
        conn.prepare("SELECT year, crop FROM crop_history WHERE field_id = ?1 ORDER BY year")?;
    let history = stmt
        .query_map(params![field_id], |row| {
            Ok(HistoryEntry {
                year: row.get("year")?,
                crop: row.get("crop")?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(history)
}

fn row_to_field(row: &Row) -> rusqlite::Result<FieldProfile> {
    let field_id: String = row.get("field_id")?;
    let texture_str: String = row.get("soil_texture")?;
    let drainage_str: String = row.get("drainage")?;
    let zone_str: String = row.get("climate_zone")?;
    let volatility_str: Option<String> = row.get("climate_volatility")?;

    let soil_texture = SoilTexture::from_str(&texture_str).unwrap_or_else(|| {
        warn!(
            soil_texture = %texture_str,
            "Unknown soil_texture in database, defaulting to Unknown"
        );
        SoilTexture::Unknown
    });
    let drainage = DrainageClass::from_str(&drainage_str).unwrap_or_else(|| {
        warn!(
            drainage = %drainage_str,
            "Unknown drainage in database, defaulting to Unknown"
        );
        DrainageClass::Unknown
    });
    let climate_zone = ClimateZone::from_str(&zone_str).unwrap_or_else(|| {
        warn!(
            climate_zone = %zone_str,
            "Unknown climate_zone in database, defaulting to Temperate"
        );
        ClimateZone::Temperate
    });
    let climate_volatility = volatility_str.as_ref().and_then(|v| {
        Level::from_str(v).or_else(|| {
            warn!(climate_volatility = %v, "Unknown climate_volatility in database, ignoring");
            None
        })
    });

    Ok(FieldProfile {
        field_id,
        name: row.get("name")?,
        acreage: row.get("acreage")?,
        soil_texture,
        drainage,
        slope_percent: row.get("slope_percent")?,
        soil_health_index: row.get("soil_health_index")?,
        climate_zone,
        climate_volatility,
        crop_history: Vec::new(),
    })
}
