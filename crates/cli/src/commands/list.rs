use std::str::FromStr;
use std::sync::Arc;

use baja_core::domain::request::{DecommissionRequest, RequestState};
use baja_core::listing::{ListQuery, OrderDirection, OrderField};
use baja_core::ListingService;
use baja_db::SqlRequestRepository;
use clap::Args;
use serde_json::json;

use crate::commands::{build_runtime, load_config, open_pool, CommandResult, StepError};

#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(
        long,
        help = "Only requests in this state (pending, approved, rejected, executing, executed)"
    )]
    pub state: Option<String>,
    #[arg(long, help = "Case-insensitive match on request code, equipment code or name")]
    pub search: Option<String>,
    #[arg(long, help = "1-based page number")]
    pub page: Option<u32>,
    #[arg(long, help = "Rows per page, capped by workflow.max_page_size")]
    pub page_size: Option<u32>,
    #[arg(long, help = "Field to order by, e.g. created_at or equipment_name")]
    pub order_by: Option<String>,
    #[arg(long, help = "asc or desc")]
    pub order_direction: Option<String>,
}

impl ListArgs {
    fn into_query(self) -> Result<ListQuery, StepError> {
        let state = match self.state.as_deref() {
            Some(value) => Some(
                RequestState::parse(value)
                    .ok_or_else(|| ("invalid_argument", format!("unknown state `{value}`"), 2u8))?,
            ),
            None => None,
        };
        let order_by = self
            .order_by
            .as_deref()
            .map(OrderField::from_str)
            .transpose()
            .map_err(|error| ("invalid_argument", error.to_string(), 2u8))?;
        let order_direction = self
            .order_direction
            .as_deref()
            .map(OrderDirection::from_str)
            .transpose()
            .map_err(|error| ("invalid_argument", error.to_string(), 2u8))?;

        Ok(ListQuery {
            state,
            search: self.search,
            page: self.page,
            page_size: self.page_size,
            order_by,
            order_direction,
        })
    }
}

pub fn run(args: ListArgs) -> CommandResult {
    let query = match args.into_query() {
        Ok(query) => query,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("list", error_class, message, exit_code);
        }
    };
    let config = match load_config("list") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("list") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let listing = ListingService::new(Arc::new(SqlRequestRepository::new(pool.clone())))
            .with_settings(config.listing_settings());
        let listed = listing.list(query).await.map_err(|error| ("listing", error.to_string(), 6u8));
        pool.close().await;
        listed
    });

    match result {
        Ok(listed) => {
            let data = json!({
                "total": listed.total,
                "total_pages": listed.total_pages,
                "page": listed.page,
                "page_size": listed.page_size,
                "items": listed.items.iter().map(row).collect::<Vec<_>>(),
            });
            CommandResult::success_with_data(
                "list",
                format!(
                    "{} of {} requests (page {} of {})",
                    listed.items.len(),
                    listed.total,
                    listed.page,
                    listed.total_pages
                ),
                Some(data),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("list", error_class, message, exit_code)
        }
    }
}

fn row(request: &DecommissionRequest) -> serde_json::Value {
    json!({
        "id": request.id.0,
        "request_code": request.request_code.0,
        "state": request.state().as_str(),
        "equipment_code": request.equipment.code.0,
        "equipment_name": request.equipment.name,
        "decline_type": request.decline_type.as_str(),
        "responsible_party": request.responsible_party,
        "created_at": request.created_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use baja_core::domain::request::RequestState;
    use baja_core::listing::{OrderDirection, OrderField};

    use super::ListArgs;

    #[test]
    fn arguments_become_a_typed_query() {
        let query = ListArgs {
            state: Some("Approved".to_string()),
            search: Some("autoclave".to_string()),
            page: Some(2),
            page_size: Some(5),
            order_by: Some("equipment_name".to_string()),
            order_direction: Some("asc".to_string()),
        }
        .into_query()
        .expect("valid arguments");

        assert_eq!(query.state, Some(RequestState::Approved));
        assert_eq!(query.order_by, Some(OrderField::EquipmentName));
        assert_eq!(query.order_direction, Some(OrderDirection::Asc));
        assert_eq!(query.page, Some(2));
    }

    #[test]
    fn unknown_state_is_an_invalid_argument() {
        let error = ListArgs { state: Some("archived".to_string()), ..ListArgs::default() }
            .into_query()
            .expect_err("unknown state");

        assert_eq!(error.0, "invalid_argument");
        assert_eq!(error.2, 2);
    }
}
