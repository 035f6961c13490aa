//! Built-in report tasks.
//!
//! Every task maps onto one POST endpoint sharing the same envelope: an
//! offset/length body plus optional date-range and dimension fields.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::entity::dimension_kind::DimensionKind;
use crate::entity::task_type::TaskType;
use crate::platform::{PlatformError, ReportClient, SuccessCodes};

use super::fanout::FanoutKind;
use super::pagination::Page;
use super::period::Granularity;
use super::task::{
    PageRequest, PersistenceMode, RegistryError, TaskDescriptor, TaskHandler, TaskRegistry,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// [`TaskHandler`] for one JSON endpoint.
#[derive(Debug, Clone)]
pub struct EndpointHandler {
    path: String,
    success: SuccessCodes,
    key_fields: Vec<String>,
    start_field: String,
    end_field: String,
    dimension_fields: Vec<(DimensionKind, String)>,
}

impl EndpointHandler {
    pub fn new(path: impl Into<String>, success: SuccessCodes) -> Self {
        Self {
            path: path.into(),
            success,
            key_fields: Vec::new(),
            start_field: "start_date".to_string(),
            end_field: "end_date".to_string(),
            dimension_fields: vec![
                (DimensionKind::Store, "sid".to_string()),
                (DimensionKind::Seller, "seller_id".to_string()),
                (DimensionKind::Shop, "shop_name".to_string()),
                (DimensionKind::Currency, "currency_code".to_string()),
            ],
        }
    }

    /// Fields forming the record's natural key, in order.
    #[must_use]
    pub fn key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Request field names carrying the date range.
    #[must_use]
    pub fn date_fields(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_field = start.into();
        self.end_field = end.into();
        self
    }

    /// Override the request field carrying one dimension component.
    #[must_use]
    pub fn dimension_field(mut self, kind: DimensionKind, field: impl Into<String>) -> Self {
        let field = field.into();
        match self.dimension_fields.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = field,
            None => self.dimension_fields.push((kind, field)),
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request body for one page.
    pub fn build_body(&self, request: &PageRequest<'_>) -> Value {
        let mut body = Map::new();
        body.insert("offset".to_string(), Value::from(request.offset));
        body.insert("length".to_string(), Value::from(request.length));

        if let Some(range) = request.range {
            body.insert(
                self.start_field.clone(),
                Value::from(range.start.format(DATE_FORMAT).to_string()),
            );
            body.insert(
                self.end_field.clone(),
                Value::from(range.end.format(DATE_FORMAT).to_string()),
            );
        }

        if let Some(dimension) = request.dimension {
            for (kind, value) in dimension.parts() {
                if let Some((_, field)) = self.dimension_fields.iter().find(|(k, _)| k == kind) {
                    body.insert(field.clone(), Value::from(value.as_str()));
                }
            }
        }

        Value::Object(body)
    }
}

fn key_part(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl TaskHandler for EndpointHandler {
    async fn fetch_page(
        &self,
        client: &dyn ReportClient,
        request: &PageRequest<'_>,
    ) -> Result<Page, PlatformError> {
        let body = self.build_body(request);
        let response = client.post(request.account, &self.path, &body).await?;
        response.ensure_success(self.success)?;
        Ok(Page {
            records: response.records()?,
            total: response.total(),
        })
    }

    fn natural_key(&self, record: &Value) -> Option<String> {
        if self.key_fields.is_empty() {
            return None;
        }
        let parts = self
            .key_fields
            .iter()
            .map(|field| record.get(field).and_then(key_part))
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("|"))
    }
}

fn endpoint(path: &str, success: SuccessCodes) -> EndpointHandler {
    EndpointHandler::new(path, success)
}

/// Descriptors of all built-in tasks.
pub fn builtin_tasks() -> Vec<TaskDescriptor> {
    vec![
        TaskDescriptor::builder(
            TaskType::Orders,
            Arc::new(
                endpoint("/erp/orders/list", SuccessCodes::Zero)
                    .key_fields(["order_id"])
                    .date_fields("start_date", "end_date"),
            ),
        )
        .granularity(Granularity::Day)
        .lookback(30)
        .persistence(PersistenceMode::UpsertByKey)
        .fanout(FanoutKind::Store)
        .page_size(200)
        .build(),
        TaskDescriptor::builder(
            TaskType::SettlementSummary,
            Arc::new(
                endpoint("/finance/settlement/summary", SuccessCodes::Http200)
                    .key_fields(["settlement_id", "fee_type"]),
            ),
        )
        .granularity(Granularity::Day)
        .lookback(90)
        .persistence(PersistenceMode::OverwriteByPeriod)
        .fanout(FanoutKind::StoreCurrency)
        .page_size(100)
        .build(),
        TaskDescriptor::builder(
            TaskType::ProfitReport,
            Arc::new(
                endpoint("/finance/profit/seller", SuccessCodes::Zero)
                    .key_fields(["msku", "asin"])
                    .date_fields("start_date", "end_date"),
            ),
        )
        .granularity(Granularity::Month)
        .lookback(3)
        .max_span_days(15)
        .persistence(PersistenceMode::OverwriteByPeriod)
        .fanout(FanoutKind::Seller)
        .page_size(1_000)
        .build(),
        TaskDescriptor::builder(
            TaskType::AdSpend,
            Arc::new(
                endpoint("/ads/spend/daily", SuccessCodes::One)
                    .key_fields(["campaign_id", "ad_group_id"])
                    .date_fields("report_start", "report_end"),
            ),
        )
        .granularity(Granularity::Day)
        .lookback(60)
        .persistence(PersistenceMode::OverwriteByPeriod)
        .fanout(FanoutKind::Shop)
        .page_size(500)
        .build(),
        TaskDescriptor::builder(
            TaskType::Inventory,
            Arc::new(
                endpoint("/warehouse/inventory/list", SuccessCodes::Zero)
                    .key_fields(["warehouse_id", "sku"]),
            ),
        )
        .granularity(Granularity::Snapshot)
        .persistence(PersistenceMode::ArchiveThenFullResync)
        .fanout(FanoutKind::Store)
        .page_size(500)
        .build(),
        TaskDescriptor::builder(
            TaskType::Listings,
            Arc::new(endpoint("/catalog/listings", SuccessCodes::Zero).key_fields(["listing_id"])),
        )
        .granularity(Granularity::Snapshot)
        .persistence(PersistenceMode::ArchiveThenFullResync)
        .page_size(1_000)
        .build(),
        TaskDescriptor::builder(
            TaskType::ExchangeRates,
            Arc::new(
                endpoint("/reference/exchange-rates", SuccessCodes::Http200)
                    .key_fields(["currency_code", "date"]),
            ),
        )
        .granularity(Granularity::Snapshot)
        .persistence(PersistenceMode::ArchiveThenFullResync)
        .global()
        .page_size(500)
        .build(),
    ]
}

/// Registry holding every built-in task.
pub fn default_registry() -> Result<TaskRegistry, RegistryError> {
    let mut registry = TaskRegistry::new();
    for descriptor in builtin_tasks() {
        registry.register(descriptor)?;
    }
    Ok(registry)
}
