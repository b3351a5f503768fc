use std::sync::Arc;

use chrono::NaiveDate;
use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Hydrate, Insert, OnConflict, Order, Row, Select,
    TableGateway, Update,
};

use super::qualified;
use crate::dto::UsageDailyDto;
use crate::entity::UsageDaily;
use crate::new_id;

/// Amounts to add to one day's counters. Zero fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageIncrement {
    pub storage_bytes: i64,
    pub egress_bytes: i64,
    pub uploads_count: i64,
    pub downloads_count: i64,
    pub transforms_count: i64,
}

impl UsageIncrement {
    fn counters(&self) -> [(&'static str, i64); 5] {
        [
            ("storage_bytes", self.storage_bytes),
            ("egress_bytes", self.egress_bytes),
            ("uploads_count", self.uploads_count),
            ("downloads_count", self.downloads_count),
            ("transforms_count", self.transforms_count),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.counters().iter().all(|(_, amount)| *amount == 0)
    }

    fn apply(&self, update: Update) -> Update {
        self.counters()
            .into_iter()
            .fold(update, |update, (column, amount)| match amount {
                0 => update,
                n if n > 0 => update.increment(column, n),
                n => update.decrement(column, n.saturating_neg()),
            })
    }
}

/// Gateway for `usage_daily`: one row per tenant and UTC day.
#[derive(Clone)]
pub struct UsageDailyTable {
    gateway: TableGateway<UsageDaily>,
}

impl UsageDailyTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<UsageDaily> {
        &self.gateway
    }

    pub async fn fetch_by_id(&self, usage_id: &str) -> Result<Option<UsageDaily>, GatewayError> {
        self.gateway.fetch_by_id(usage_id).await
    }

    pub async fn fetch_by_tenant_and_day(
        &self,
        tenant_id: &str,
        day: NaiveDate,
    ) -> Result<Option<UsageDaily>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("day", day);
        self.gateway.fetch_entity(select).await
    }

    /// The tenant's latest `limit` days, newest first.
    pub async fn fetch_by_tenant_id(
        &self,
        tenant_id: &str,
        limit: u64,
    ) -> Result<Vec<UsageDaily>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .order("day", Order::Desc)
            .limit(limit);
        self.gateway.fetch_entities(select).await
    }

    /// Days from `from` to `to` inclusive, oldest first.
    pub async fn fetch_by_tenant_and_date_range(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<UsageDaily>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .and_where("day >= ?", from)
            .and_where("day <= ?", to)
            .order("day", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    fn details(&self) -> Select {
        Select::new()
            .from_as("u", UsageDaily::TABLE, qualified("u", UsageDaily::columns()))
            .columns([("tenant_name", "t.name")])
            .join_left("t", "tenant", "t.tenant_id = u.tenant_id")
    }

    pub async fn fetch_by_tenant_with_details(
        &self,
        tenant_id: &str,
        limit: u64,
    ) -> Result<Vec<UsageDailyDto>, GatewayError> {
        let select = self
            .details()
            .eq("u.tenant_id", tenant_id)
            .order("u.day", Order::Desc)
            .limit(limit);
        self.gateway.fetch_projection(select).await
    }

    /// Every tenant's usage for one day, by tenant name.
    pub async fn fetch_all_by_day_with_details(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<UsageDailyDto>, GatewayError> {
        let select = self
            .details()
            .eq("u.day", day)
            .order("t.name", Order::Asc)
            .order("u.tenant_id", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    fn zeroed(tenant_id: &str, day: NaiveDate) -> Row {
        Row::new()
            .with("usage_id", new_id())
            .with("tenant_id", tenant_id)
            .with("day", day)
            .with("storage_bytes", 0i64)
            .with("egress_bytes", 0i64)
            .with("uploads_count", 0i64)
            .with("downloads_count", 0i64)
            .with("transforms_count", 0i64)
    }

    /// Insert a zeroed row for the tenant and day.
    pub async fn insert(
        &self,
        tenant_id: &str,
        day: NaiveDate,
    ) -> Result<Option<UsageDaily>, GatewayError> {
        self.gateway.insert(Self::zeroed(tenant_id, day)).await
    }

    /// The day's row, inserted zeroed when missing. A concurrent insert of
    /// the same day is tolerated by the `(tenant_id, day)` unique key.
    async fn ensure_day(
        &self,
        tenant_id: &str,
        day: NaiveDate,
    ) -> Result<Option<UsageDaily>, GatewayError> {
        if let Some(existing) = self.fetch_by_tenant_and_day(tenant_id, day).await? {
            return Ok(Some(existing));
        }
        Insert::into_table(UsageDaily::TABLE)
            .set(Self::zeroed(tenant_id, day))
            .on_conflict(OnConflict::DoNothing)
            .execute(self.gateway.adapter())
            .await?;
        self.fetch_by_tenant_and_day(tenant_id, day).await
    }

    /// Add `increments` to the day's counters with `SET x = x + n`, creating
    /// the row first when needed. Returns the updated row.
    pub async fn increment_counters(
        &self,
        tenant_id: &str,
        day: NaiveDate,
        increments: UsageIncrement,
    ) -> Result<Option<UsageDaily>, GatewayError> {
        let Some(record) = self.ensure_day(tenant_id, day).await? else {
            return Ok(None);
        };
        if increments.is_empty() {
            return Ok(Some(record));
        }

        let result = increments
            .apply(Update::for_table(UsageDaily::TABLE))
            .eq("usage_id", record.usage_id.as_str())
            .returning(UsageDaily::columns().iter().copied())
            .execute(self.gateway.adapter())
            .await?;
        if let Some(updated) = result.inserted_record() {
            return UsageDaily::hydrate(updated).map(Some);
        }
        if !result.success() {
            return Ok(None);
        }
        self.fetch_by_id(&record.usage_id).await
    }
}
