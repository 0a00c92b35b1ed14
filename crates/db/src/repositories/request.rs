use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use baja_core::domain::equipment::{EquipmentCode, EquipmentSnapshot};
use baja_core::domain::request::{
    DeclineType, DecommissionRequest, LifecycleSnapshot, NewDecommissionRequest, RequestCode,
    RequestId, RequestState,
};
use baja_core::listing::{OrderDirection, OrderField, PageSpec, RequestFilter};
use baja_core::ports::{PortError, RequestRepository};

use super::RepositoryError;
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id,
    request_code,
    state,
    equipment_code,
    equipment_name,
    equipment_brand,
    equipment_model,
    equipment_serial_number,
    equipment_location,
    responsible_party,
    requester,
    decline_type,
    technical_justification,
    economic_justification,
    notes,
    estimated_recoverable_value,
    recoverable_parts_json,
    supporting_documents_json,
    evaluation_json,
    execution_start_json,
    execution_json,
    version,
    created_at,
    updated_at";

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &RequestId) -> Result<DecommissionRequest, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM decommission_request WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(request_from_row).transpose()?.ok_or(RepositoryError::NotFound)
    }

    async fn insert_row(&self, request: &DecommissionRequest) -> Result<(), RepositoryError> {
        let lifecycle = request.lifecycle();
        sqlx::query(&format!(
            "INSERT INTO decommission_request ({REQUEST_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&request.id.0)
        .bind(&request.request_code.0)
        .bind(lifecycle.state.as_str())
        .bind(&request.equipment.code.0)
        .bind(&request.equipment.name)
        .bind(request.equipment.brand.as_deref())
        .bind(request.equipment.model.as_deref())
        .bind(request.equipment.serial_number.as_deref())
        .bind(request.equipment.location.as_deref())
        .bind(&request.responsible_party)
        .bind(&request.requester)
        .bind(request.decline_type.as_str())
        .bind(&request.technical_justification)
        .bind(request.economic_justification.as_deref())
        .bind(request.notes.as_deref())
        .bind(request.estimated_recoverable_value.map(|value| value.to_string()))
        .bind(encode_json("recoverable_parts_json", &request.recoverable_parts)?)
        .bind(encode_json("supporting_documents_json", &request.supporting_documents)?)
        .bind(encode_optional_json("evaluation_json", lifecycle.evaluation.as_ref())?)
        .bind(encode_optional_json("execution_start_json", lifecycle.execution_start.as_ref())?)
        .bind(encode_optional_json("execution_json", lifecycle.execution.as_ref())?)
        .bind(i64::from(request.version))
        .bind(format_timestamp(request.created_at))
        .bind(format_timestamp(request.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_row(
        &self,
        request: &DecommissionRequest,
        expected_version: u32,
    ) -> Result<(), RepositoryError> {
        let lifecycle = request.lifecycle();
        let result = sqlx::query(
            "UPDATE decommission_request SET
                state = ?,
                recoverable_parts_json = ?,
                supporting_documents_json = ?,
                evaluation_json = ?,
                execution_start_json = ?,
                execution_json = ?,
                version = ?,
                updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(lifecycle.state.as_str())
        .bind(encode_json("recoverable_parts_json", &request.recoverable_parts)?)
        .bind(encode_json("supporting_documents_json", &request.supporting_documents)?)
        .bind(encode_optional_json("evaluation_json", lifecycle.evaluation.as_ref())?)
        .bind(encode_optional_json("execution_start_json", lifecycle.execution_start.as_ref())?)
        .bind(encode_optional_json("execution_json", lifecycle.execution.as_ref())?)
        .bind(i64::from(request.version))
        .bind(format_timestamp(request.updated_at))
        .bind(&request.id.0)
        .bind(i64::from(expected_version))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM decommission_request WHERE id = ?")
            .bind(&request.id.0)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if exists {
            Err(RepositoryError::Conflict)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn find_rows(
        &self,
        filter: &RequestFilter,
        page: PageSpec,
        order_by: OrderField,
        direction: OrderDirection,
    ) -> Result<(Vec<DecommissionRequest>, u64), RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM decommission_request WHERE 1 = 1",
        );
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {REQUEST_COLUMNS} FROM decommission_request WHERE 1 = 1"
        ));
        push_filter(&mut select, filter);
        select
            .push(format!(
                " ORDER BY {} {}, request_code ASC LIMIT ",
                order_by.column(),
                direction.as_sql()
            ))
            .push_bind(i64::from(page.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows.into_iter().map(request_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok((items, u64::try_from(total).unwrap_or_default()))
    }

    async fn allocate_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO request_code_sequence (year, last_value) VALUES (?, 1)
             ON CONFLICT(year) DO UPDATE SET last_value = last_value + 1
             RETURNING last_value",
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        parse_u32("last_value", value)
    }
}

#[async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn get(&self, id: &RequestId) -> Result<DecommissionRequest, PortError> {
        Ok(self.fetch(id).await?)
    }

    async fn insert(&self, request: DecommissionRequest) -> Result<(), PortError> {
        Ok(self.insert_row(&request).await?)
    }

    async fn save(
        &self,
        request: &DecommissionRequest,
        expected_version: u32,
    ) -> Result<(), PortError> {
        Ok(self.update_row(request, expected_version).await?)
    }

    async fn find(
        &self,
        filter: &RequestFilter,
        page: PageSpec,
        order_by: OrderField,
        direction: OrderDirection,
    ) -> Result<(Vec<DecommissionRequest>, u64), PortError> {
        Ok(self.find_rows(filter, page, order_by, direction).await?)
    }

    async fn next_code_sequence(&self, year: i32) -> Result<u32, PortError> {
        Ok(self.allocate_sequence(year).await?)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &RequestFilter) {
    if let Some(state) = filter.state {
        builder.push(" AND state = ").push_bind(state.as_str());
    }

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|term| !term.is_empty()) {
        let needle = term.to_ascii_lowercase();
        builder
            .push(" AND (instr(LOWER(request_code), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(LOWER(equipment_code), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(LOWER(equipment_name), ")
            .push_bind(needle)
            .push(") > 0)");
    }
}

fn request_from_row(row: SqliteRow) -> Result<DecommissionRequest, RepositoryError> {
    let state_raw = row.try_get::<String, _>("state")?;
    let state = RequestState::parse(&state_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request state `{state_raw}`")))?;
    let decline_raw = row.try_get::<String, _>("decline_type")?;
    let decline_type = DeclineType::parse(&decline_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown decline type `{decline_raw}`")))?;

    let equipment = EquipmentSnapshot {
        code: EquipmentCode(row.try_get("equipment_code")?),
        name: row.try_get("equipment_name")?,
        brand: row.try_get("equipment_brand")?,
        model: row.try_get("equipment_model")?,
        serial_number: row.try_get("equipment_serial_number")?,
        location: row.try_get("equipment_location")?,
    };
    let id = RequestId(row.try_get("id")?);

    let mut request = DecommissionRequest::new(NewDecommissionRequest {
        id: id.clone(),
        request_code: RequestCode(row.try_get("request_code")?),
        equipment,
        responsible_party: row.try_get("responsible_party")?,
        requester: row.try_get("requester")?,
        decline_type,
        technical_justification: row.try_get("technical_justification")?,
        economic_justification: row.try_get("economic_justification")?,
        notes: row.try_get("notes")?,
        estimated_recoverable_value: parse_optional_decimal(
            "estimated_recoverable_value",
            row.try_get("estimated_recoverable_value")?,
        )?,
        recoverable_parts: decode_json(
            "recoverable_parts_json",
            row.try_get("recoverable_parts_json")?,
        )?,
        supporting_documents: decode_json(
            "supporting_documents_json",
            row.try_get("supporting_documents_json")?,
        )?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
    .map_err(|error| {
        RepositoryError::Decode(format!("stored request `{id}` is invalid: {error}"))
    })?;

    request.version = parse_u32("version", row.try_get("version")?)?;
    request.updated_at = parse_timestamp("updated_at", row.try_get("updated_at")?)?;

    let lifecycle = LifecycleSnapshot {
        state,
        evaluation: decode_optional_json("evaluation_json", row.try_get("evaluation_json")?)?,
        execution_start: decode_optional_json(
            "execution_start_json",
            row.try_get("execution_start_json")?,
        )?,
        execution: decode_optional_json("execution_json", row.try_get("execution_json")?)?,
    };

    request.with_lifecycle(lifecycle).map_err(|error| {
        RepositoryError::Decode(format!("stored request `{id}` has an invalid lifecycle: {error}"))
    })
}

/// Fixed-width UTC timestamps so lexical order in SQL equals chronological order.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        })
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value
        .map(|raw| {
            Decimal::from_str(&raw).map_err(|error| {
                RepositoryError::Decode(format!("invalid decimal in `{column}`: `{raw}` ({error})"))
            })
        })
        .transpose()
}

fn encode_json<T: Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|error| RepositoryError::Encode(format!("cannot encode `{column}`: {error}")))
}

fn encode_optional_json<T: Serialize>(
    column: &str,
    value: Option<&T>,
) -> Result<Option<String>, RepositoryError> {
    value.map(|inner| encode_json(column, inner)).transpose()
}

fn decode_json<T: DeserializeOwned>(column: &str, value: String) -> Result<T, RepositoryError> {
    serde_json::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `{column}`: {error}")))
}

fn decode_optional_json<T: DeserializeOwned>(
    column: &str,
    value: Option<String>,
) -> Result<Option<T>, RepositoryError> {
    value.map(|raw| decode_json(column, raw)).transpose()
}
