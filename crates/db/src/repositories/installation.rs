use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use propquote_core::domain::device::normalize_category;
use propquote_core::domain::installation::{InstallationConfig, LaborCategory, MaterialRequirement};
use propquote_core::estimation::{InstallationRuleSet, RateOverrides};
use propquote_core::money::ensure_amount;

use super::{column, parse_decimal, RepositoryError};
use crate::DbPool;

/// Writes installation rules, material templates and labor-rate overrides.
pub struct SqlInstallationRuleRepository {
    pool: DbPool,
}

impl SqlInstallationRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save_config(
        &self,
        id: &str,
        config: &InstallationConfig,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO installation_config (id, category, vendor, model, complexity_type,
                                              first_unit_hours, additional_unit_hours,
                                              labor_category, complexity_multiplier, active,
                                              created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 category = excluded.category,
                 vendor = excluded.vendor,
                 model = excluded.model,
                 complexity_type = excluded.complexity_type,
                 first_unit_hours = excluded.first_unit_hours,
                 additional_unit_hours = excluded.additional_unit_hours,
                 labor_category = excluded.labor_category,
                 complexity_multiplier = excluded.complexity_multiplier,
                 active = 1,
                 updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(normalize_category(&config.category))
        .bind(&config.vendor)
        .bind(&config.model)
        .bind(&config.complexity_type)
        .bind(config.first_unit_hours.to_string())
        .bind(config.additional_unit_hours.to_string())
        .bind(config.labor_category.as_str())
        .bind(config.complexity_multiplier.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn deactivate_config(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE installation_config SET active = 0, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_material(
        &self,
        id: &str,
        category: &str,
        material: &MaterialRequirement,
        sort_order: i64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO material_template (id, category, name, unit, quantity_per_device,
                                            cost_per_unit, sort_order, active)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1)
             ON CONFLICT(id) DO UPDATE SET
                 category = excluded.category,
                 name = excluded.name,
                 unit = excluded.unit,
                 quantity_per_device = excluded.quantity_per_device,
                 cost_per_unit = excluded.cost_per_unit,
                 sort_order = excluded.sort_order,
                 active = 1",
        )
        .bind(id)
        .bind(normalize_category(category))
        .bind(&material.name)
        .bind(&material.unit)
        .bind(material.quantity_per_device.to_string())
        .bind(material.cost_per_unit.to_string())
        .bind(sort_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_labor_rate(
        &self,
        category: LaborCategory,
        hourly_rate: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO labor_rate (labor_category, hourly_rate, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(labor_category) DO UPDATE SET
                 hourly_rate = excluded.hourly_rate,
                 updated_at = excluded.updated_at",
        )
        .bind(category.as_str())
        .bind(hourly_rate.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_labor_category(raw: &str) -> Result<LaborCategory, RepositoryError> {
    LaborCategory::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("labor_category: unknown value `{raw}`")))
}

fn row_to_config(row: &sqlx::sqlite::SqliteRow) -> Result<InstallationConfig, RepositoryError> {
    let first: String = column(row, "first_unit_hours")?;
    let additional: String = column(row, "additional_unit_hours")?;
    let multiplier: String = column(row, "complexity_multiplier")?;
    let labor_category: String = column(row, "labor_category")?;

    let config = InstallationConfig {
        category: column(row, "category")?,
        first_unit_hours: parse_decimal("first_unit_hours", &first)?,
        additional_unit_hours: parse_decimal("additional_unit_hours", &additional)?,
        labor_category: parse_labor_category(&labor_category)?,
        vendor: column(row, "vendor")?,
        model: column(row, "model")?,
        complexity_type: column(row, "complexity_type")?,
        complexity_multiplier: parse_decimal("complexity_multiplier", &multiplier)?,
    };
    config.validate().map_err(|error| {
        RepositoryError::Decode(format!("installation_config `{}`: {error}", config.category))
    })?;
    Ok(config)
}

fn row_to_material(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(String, MaterialRequirement), RepositoryError> {
    let quantity: String = column(row, "quantity_per_device")?;
    let cost: String = column(row, "cost_per_unit")?;

    let material = MaterialRequirement {
        name: column(row, "name")?,
        unit: column(row, "unit")?,
        quantity_per_device: parse_decimal("quantity_per_device", &quantity)?,
        cost_per_unit: parse_decimal("cost_per_unit", &cost)?,
    };
    material.validate().map_err(|error| {
        RepositoryError::Decode(format!("material_template `{}`: {error}", material.name))
    })?;
    Ok((column(row, "category")?, material))
}

/// Reads every active rule and template into a fresh immutable snapshot.
///
/// Rows keep insertion order within a category, so ties between equally
/// specific configs resolve to the oldest row.
pub async fn load_installation_rules(pool: &DbPool) -> Result<InstallationRuleSet, RepositoryError> {
    let config_rows = sqlx::query(
        "SELECT category, vendor, model, complexity_type, first_unit_hours,
                additional_unit_hours, labor_category, complexity_multiplier
         FROM installation_config
         WHERE active = 1
         ORDER BY category ASC, created_at ASC, rowid ASC",
    )
    .fetch_all(pool)
    .await?;
    let configs = config_rows.iter().map(row_to_config).collect::<Result<Vec<_>, _>>()?;

    let material_rows = sqlx::query(
        "SELECT category, name, unit, quantity_per_device, cost_per_unit
         FROM material_template
         WHERE active = 1
         ORDER BY category ASC, sort_order ASC, rowid ASC",
    )
    .fetch_all(pool)
    .await?;
    let materials = material_rows.iter().map(row_to_material).collect::<Result<Vec<_>, _>>()?;

    info!(
        event_name = "estimation.rules.loaded",
        config_count = configs.len(),
        material_count = materials.len(),
        "installation rule snapshot loaded"
    );

    Ok(InstallationRuleSet::new(configs, materials))
}

pub async fn load_labor_rates(pool: &DbPool) -> Result<RateOverrides, RepositoryError> {
    let rows = sqlx::query("SELECT labor_category, hourly_rate FROM labor_rate")
        .fetch_all(pool)
        .await?;

    let mut rates = RateOverrides::new();
    for row in &rows {
        let category: String = column(row, "labor_category")?;
        let rate: String = column(row, "hourly_rate")?;
        let rate = parse_decimal("hourly_rate", &rate)?;
        ensure_amount("hourly_rate", rate)
            .map_err(|error| RepositoryError::Decode(format!("labor_rate `{category}`: {error}")))?;
        rates.insert(parse_labor_category(&category)?, rate);
    }
    Ok(rates)
}
