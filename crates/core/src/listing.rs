use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::request::{DecommissionRequest, RequestState};
use crate::errors::WorkflowError;
use crate::ports::RequestRepository;

/// Repository-level filter. Free text matches request code, equipment code and
/// equipment name, ignoring ASCII case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub state: Option<RequestState>,
    pub search: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, request: &DecommissionRequest) -> bool {
        if let Some(state) = self.state {
            if request.state() != state {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim).filter(|term| !term.is_empty()) {
            None => true,
            Some(term) => {
                let needle = term.to_ascii_lowercase();
                [
                    request.request_code.0.as_str(),
                    request.equipment.code.0.as_str(),
                    request.equipment.name.as_str(),
                ]
                .iter()
                .any(|haystack| haystack.to_ascii_lowercase().contains(&needle))
            }
        }
    }
}

/// Root fields a listing may be ordered by. Closed on purpose: SQL adapters take the
/// column expression from here, never from caller text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    #[default]
    CreatedAt,
    UpdatedAt,
    RequestCode,
    State,
    EquipmentCode,
    EquipmentName,
    DeclineType,
    ResponsibleParty,
    EstimatedRecoverableValue,
}

impl OrderField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::RequestCode => "request_code",
            Self::State => "state",
            Self::EquipmentCode => "equipment_code",
            Self::EquipmentName => "equipment_name",
            Self::DeclineType => "decline_type",
            Self::ResponsibleParty => "responsible_party",
            Self::EstimatedRecoverableValue => "estimated_recoverable_value",
        }
    }

    /// SQL expression used in `ORDER BY`.
    pub fn column(&self) -> &'static str {
        match self {
            Self::EstimatedRecoverableValue => "CAST(estimated_recoverable_value AS REAL)",
            other => other.as_str(),
        }
    }

    pub fn compare(&self, left: &DecommissionRequest, right: &DecommissionRequest) -> Ordering {
        match self {
            Self::CreatedAt => left.created_at.cmp(&right.created_at),
            Self::UpdatedAt => left.updated_at.cmp(&right.updated_at),
            Self::RequestCode => left.request_code.0.cmp(&right.request_code.0),
            Self::State => left.state().as_str().cmp(right.state().as_str()),
            Self::EquipmentCode => left.equipment.code.0.cmp(&right.equipment.code.0),
            Self::EquipmentName => left.equipment.name.cmp(&right.equipment.name),
            Self::DeclineType => left.decline_type.as_str().cmp(right.decline_type.as_str()),
            Self::ResponsibleParty => left.responsible_party.cmp(&right.responsible_party),
            Self::EstimatedRecoverableValue => {
                left.estimated_recoverable_value.cmp(&right.estimated_recoverable_value)
            }
        }
    }
}

impl FromStr for OrderField {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .trim()
            .chars()
            .flat_map(|ch| {
                let lower = ch.to_ascii_lowercase();
                let underscore = ch.is_ascii_uppercase().then_some('_');
                underscore.into_iter().chain(std::iter::once(lower))
            })
            .collect();

        match key.trim_start_matches('_').replace('-', "_").as_str() {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "request_code" | "code" => Ok(Self::RequestCode),
            "state" => Ok(Self::State),
            "equipment_code" => Ok(Self::EquipmentCode),
            "equipment_name" => Ok(Self::EquipmentName),
            "decline_type" => Ok(Self::DeclineType),
            "responsible_party" => Ok(Self::ResponsibleParty),
            "estimated_recoverable_value" => Ok(Self::EstimatedRecoverableValue),
            _ => Err(WorkflowError::validation(
                "order_by",
                format!("unsupported ordering field `{}`", value.trim()),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for OrderDirection {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(WorkflowError::validation(
                "order_direction",
                format!("unsupported direction `{other}` (expected asc|desc)"),
            )),
        }
    }
}

/// One-based page of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub page: u32,
    pub page_size: u32,
}

impl PageSpec {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Orders two requests by `field`, then by request code so pages are stable.
pub fn compare_for_listing(
    field: OrderField,
    direction: OrderDirection,
    left: &DecommissionRequest,
    right: &DecommissionRequest,
) -> Ordering {
    direction
        .apply(field.compare(left, right))
        .then_with(|| left.request_code.0.cmp(&right.request_code.0))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub state: Option<RequestState>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub order_by: Option<OrderField>,
    pub order_direction: Option<OrderDirection>,
}

impl ListQuery {
    /// Requests waiting for a technical evaluation, oldest first.
    pub fn approval_queue() -> Self {
        Self {
            state: Some(RequestState::Pending),
            order_by: Some(OrderField::CreatedAt),
            order_direction: Some(OrderDirection::Asc),
            ..Self::default()
        }
    }

    /// Approved requests waiting for physical retirement, oldest first.
    pub fn execution_queue() -> Self {
        Self {
            state: Some(RequestState::Approved),
            order_by: Some(OrderField::CreatedAt),
            order_direction: Some(OrderDirection::Asc),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListResult {
    pub items: Vec<DecommissionRequest>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListingSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self { default_page_size: 20, max_page_size: 100 }
    }
}

/// Translates caller criteria into a repository `find`. Holds no business rule
/// beyond page normalisation.
#[derive(Clone)]
pub struct ListingService {
    repository: Arc<dyn RequestRepository>,
    settings: ListingSettings,
}

impl ListingService {
    pub fn new(repository: Arc<dyn RequestRepository>) -> Self {
        Self { repository, settings: ListingSettings::default() }
    }

    pub fn with_settings(mut self, settings: ListingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn page_spec(&self, query: &ListQuery) -> PageSpec {
        let max = self.settings.max_page_size.max(1);
        let page_size = query.page_size.unwrap_or(self.settings.default_page_size).clamp(1, max);
        PageSpec { page: query.page.unwrap_or(1).max(1), page_size }
    }

    pub async fn list(&self, query: ListQuery) -> Result<ListResult, WorkflowError> {
        let page = self.page_spec(&query);
        let filter = RequestFilter {
            state: query.state,
            search: query
                .search
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty()),
        };
        let order_by = query.order_by.unwrap_or_default();
        let direction = query.order_direction.unwrap_or_default();

        let (items, total) = self
            .repository
            .find(&filter, page, order_by, direction)
            .await
            .map_err(|error| WorkflowError::Persistence(error.to_string()))?;

        debug!(
            event_name = "decommission.request.listed",
            state = filter.state.map(|state| state.as_str()).unwrap_or("any"),
            page = page.page,
            page_size = page.page_size,
            total,
            "listed decommission requests"
        );

        Ok(ListResult {
            items,
            total,
            total_pages: total.div_ceil(u64::from(page.page_size)),
            page: page.page,
            page_size: page.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::errors::WorkflowError;
    use crate::listing::{OrderDirection, OrderField, PageSpec};

    #[test]
    fn order_field_accepts_camel_and_snake_case() {
        assert_eq!(OrderField::from_str("createdAt").ok(), Some(OrderField::CreatedAt));
        assert_eq!(OrderField::from_str("equipment_name").ok(), Some(OrderField::EquipmentName));
        assert_eq!(
            OrderField::from_str("EstimatedRecoverableValue").ok(),
            Some(OrderField::EstimatedRecoverableValue)
        );
    }

    #[test]
    fn unknown_order_field_is_a_validation_error() {
        let error = OrderField::from_str("id; DROP TABLE").expect_err("not a root field");
        assert!(matches!(error, WorkflowError::Validation { ref field, .. } if field == "order_by"));
    }

    #[test]
    fn direction_parsing_is_case_insensitive() {
        assert_eq!(OrderDirection::from_str("ASC").ok(), Some(OrderDirection::Asc));
        assert_eq!(OrderDirection::from_str("descending").ok(), Some(OrderDirection::Desc));
        assert!(OrderDirection::from_str("sideways").is_err());
    }

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(PageSpec { page: 1, page_size: 10 }.offset(), 0);
        assert_eq!(PageSpec { page: 3, page_size: 10 }.offset(), 20);
        assert_eq!(PageSpec { page: 0, page_size: 10 }.offset(), 0);
    }
}
