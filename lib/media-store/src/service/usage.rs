use chrono::{Days, NaiveDate};
use table_gateway::time;

use crate::dto::UsageDailyDto;
use crate::entity::UsageDaily;
use crate::table::{UsageDailyTable, UsageIncrement};
use crate::{Actor, ServiceError};

/// Daily usage accounting. Counters are bumped on the current UTC day.
#[derive(Clone)]
pub struct UsageService {
    usage: UsageDailyTable,
}

impl UsageService {
    pub fn new(usage: UsageDailyTable) -> Self {
        Self { usage }
    }

    async fn record(
        &self,
        actor: &Actor,
        increments: UsageIncrement,
    ) -> Result<UsageDaily, ServiceError> {
        let day = time::today();
        let updated = self
            .usage
            .increment_counters(&actor.tenant_id, day, increments)
            .await?;
        tracing::debug!(tenant_id = %actor.tenant_id, %day, ?increments, "recorded usage");
        updated.ok_or_else(|| ServiceError::Conflict(format!("usage for {day} was not stored")))
    }

    pub async fn record_upload(
        &self,
        actor: &Actor,
        bytes: i64,
    ) -> Result<UsageDaily, ServiceError> {
        self.record(
            actor,
            UsageIncrement {
                storage_bytes: bytes,
                uploads_count: 1,
                ..UsageIncrement::default()
            },
        )
        .await
    }

    pub async fn record_download(
        &self,
        actor: &Actor,
        bytes: i64,
    ) -> Result<UsageDaily, ServiceError> {
        self.record(
            actor,
            UsageIncrement {
                egress_bytes: bytes,
                downloads_count: 1,
                ..UsageIncrement::default()
            },
        )
        .await
    }

    pub async fn record_transform(&self, actor: &Actor) -> Result<UsageDaily, ServiceError> {
        self.record(
            actor,
            UsageIncrement {
                transforms_count: 1,
                ..UsageIncrement::default()
            },
        )
        .await
    }

    /// The tenant's latest `days` days of usage, newest first.
    pub async fn recent_usage(
        &self,
        actor: &Actor,
        days: u64,
    ) -> Result<Vec<UsageDailyDto>, ServiceError> {
        Ok(self
            .usage
            .fetch_by_tenant_with_details(&actor.tenant_id, days)
            .await?)
    }

    /// Usage from `from` to `to` inclusive, oldest first.
    pub async fn usage_between(
        &self,
        actor: &Actor,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<UsageDaily>, ServiceError> {
        if from > to {
            return Err(ServiceError::InvalidArgument(format!(
                "usage range starts after it ends ({from} > {to})"
            )));
        }
        Ok(self
            .usage
            .fetch_by_tenant_and_date_range(&actor.tenant_id, from, to)
            .await?)
    }

    /// The last `days` days up to today.
    pub async fn usage_for_last_days(
        &self,
        actor: &Actor,
        days: u64,
    ) -> Result<Vec<UsageDaily>, ServiceError> {
        let to = time::today();
        let from = to
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        self.usage_between(actor, from, to).await
    }

    /// Every tenant's usage for one day. Not tenant scoped.
    pub async fn usage_for_day(&self, day: NaiveDate) -> Result<Vec<UsageDailyDto>, ServiceError> {
        Ok(self.usage.fetch_all_by_day_with_details(day).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, Value};

    fn usage_row(day: NaiveDate, downloads: i64) -> Row {
        Row::new()
            .with("usage_id", "u1")
            .with("tenant_id", "x")
            .with("day", day)
            .with("storage_bytes", 0i64)
            .with("egress_bytes", 2048i64)
            .with("uploads_count", 0i64)
            .with("downloads_count", downloads)
            .with("transforms_count", 0i64)
    }

    fn service(mock: &Arc<MockAdapter>) -> UsageService {
        UsageService::new(UsageDailyTable::new(mock.clone()))
    }

    #[tokio::test]
    async fn downloads_bump_todays_counters() {
        let today = time::today();
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![usage_row(today, 0)])
                .append_rows(vec![usage_row(today, 1)]),
        );

        let usage = service(&mock)
            .record_download(&Actor::new("u1", "x"), 2048)
            .await
            .unwrap();

        assert_eq!(usage.downloads_count, 1);
        let statements = mock.statements();
        assert_eq!(statements[0].params[1], Value::Date(today));
        assert!(statements[1].sql.starts_with(
            "UPDATE usage_daily SET egress_bytes = egress_bytes + 2048, \
             downloads_count = downloads_count + 1"
        ));
    }

    #[tokio::test]
    async fn inverted_ranges_are_rejected() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres));
        let from = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_matches!(
            service(&mock)
                .usage_between(&Actor::new("u1", "x"), from, to)
                .await,
            Err(ServiceError::InvalidArgument(_))
        );
        assert!(mock.statements().is_empty());
    }

    #[tokio::test]
    async fn usage_for_day_covers_every_tenant() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let row = usage_row(day, 3).with("tenant_name", Value::Null);
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![row]));

        let usage = service(&mock).usage_for_day(day).await.unwrap();

        assert_eq!(usage[0].tenant_name, None);
        assert_eq!(usage[0].downloads_count, 3);
        let sql = mock.last_statement().unwrap().sql;
        assert!(sql.contains(
            "LEFT JOIN tenant AS t ON t.tenant_id = u.tenant_id WHERE u.day = $1"
        ));
        assert!(!sql.contains("u.tenant_id = $"));
    }
}
