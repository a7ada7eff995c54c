use std::collections::BTreeSet;

use tracing::debug;

use crate::aggregate;
use crate::error::{DashboardError, Result};
use crate::filter;
use crate::models::{
    ChartData, CustomerRecord, FilterCriteria, FilterOptions, Metrics, SalesRecord, Snapshot,
};
use crate::source::{CustomerSource, SalesSource};

/// Sequences fetch, filter and aggregation. Every call fetches fresh collections.
pub struct AnalysisService<S, C> {
    sales_source: S,
    customer_source: C,
}

impl<S, C> AnalysisService<S, C>
where
    S: SalesSource,
    C: CustomerSource,
{
    pub fn new(sales_source: S, customer_source: C) -> Self {
        Self {
            sales_source,
            customer_source,
        }
    }

    pub async fn filtered_sales(&self, criteria: &FilterCriteria) -> Result<Vec<SalesRecord>> {
        let sales = self.sales_source.fetch_all_sales().await?;
        let filtered = filter::filter_sales(&sales, criteria);
        debug!(fetched = sales.len(), matched = filtered.len(), "filtered sales");
        Ok(filtered)
    }

    pub async fn filtered_customers(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<CustomerRecord>> {
        let customers = self.customer_source.fetch_all_customers().await?;
        let filtered = filter::filter_customers(&customers, criteria);
        debug!(
            fetched = customers.len(),
            matched = filtered.len(),
            "filtered customers"
        );
        Ok(filtered)
    }

    pub async fn metrics(&self, criteria: &FilterCriteria) -> Result<Metrics> {
        let sales = self.filtered_sales(criteria).await?;
        let customers = self.filtered_customers(criteria).await?;
        Ok(aggregate::summarize(&sales, &customers))
    }

    pub async fn chart_data(&self, criteria: &FilterCriteria) -> Result<ChartData> {
        let sales = self.filtered_sales(criteria).await?;
        let customers = self.filtered_customers(criteria).await?;
        Ok(aggregate::build_chart_data(&sales, &customers))
    }

    pub async fn snapshot(&self, criteria: &FilterCriteria) -> Result<Snapshot> {
        let sales = self.filtered_sales(criteria).await?;
        let customers = self.filtered_customers(criteria).await?;
        let metrics = aggregate::summarize(&sales, &customers);
        let charts = aggregate::build_chart_data(&sales, &customers);
        Ok(Snapshot {
            sales,
            customers,
            metrics,
            charts,
        })
    }

    /// Value sets and bounds over the unfiltered collections.
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        let sales = self.sales_source.fetch_all_sales().await?;
        let customers = self.customer_source.fetch_all_customers().await?;
        derive_filter_options(&sales, &customers)
    }
}

pub fn derive_filter_options(
    sales: &[SalesRecord],
    customers: &[CustomerRecord],
) -> Result<FilterOptions> {
    let sales_range = sales
        .iter()
        .map(|sale| sale.amount)
        .fold(None, |range: Option<(f64, f64)>, amount| match range {
            Some((min, max)) => Some((min.min(amount), max.max(amount))),
            None => Some((amount, amount)),
        })
        .ok_or_else(|| {
            DashboardError::InsufficientData("no sales records to derive filter options".into())
        })?;

    let ages = customers.iter().map(|customer| customer.age);
    let age_range = ages
        .clone()
        .min()
        .zip(ages.max())
        .ok_or_else(|| {
            DashboardError::InsufficientData(
                "no customer records to derive filter options".into(),
            )
        })?;

    Ok(FilterOptions {
        categories: sales.iter().map(|sale| sale.category.clone()).collect(),
        regions: sales.iter().map(|sale| sale.region.clone()).collect(),
        sales_range,
        age_range,
        genders: customers
            .iter()
            .map(|customer| customer.gender.clone())
            .collect::<BTreeSet<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SatisfactionTier;
    use crate::source::InMemorySource;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn sale(d: u32, amount: f64, category: &str, region: &str) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            amount,
            category: category.to_string(),
            region: region.to_string(),
        }
    }

    fn customer(id: i64, age: i32, gender: &str, satisfaction: i32) -> CustomerRecord {
        CustomerRecord {
            customer_id: id,
            age,
            gender: gender.to_string(),
            purchase_amount: 2500.0,
            satisfaction,
        }
    }

    fn sample_source() -> InMemorySource {
        InMemorySource::new(
            vec![
                sale(1, 100.0, "A", "East"),
                sale(2, 200.0, "B", "West"),
                sale(1, 50.0, "A", "West"),
            ],
            vec![customer(1, 20, "Female", 5), customer(2, 70, "Male", 2)],
        )
    }

    fn service(source: InMemorySource) -> AnalysisService<InMemorySource, InMemorySource> {
        AnalysisService::new(source.clone(), source)
    }

    struct Offline;

    #[async_trait]
    impl SalesSource for Offline {
        async fn fetch_all_sales(&self) -> Result<Vec<SalesRecord>> {
            Err(DashboardError::unavailable("sales table", "connection refused"))
        }
    }

    #[async_trait]
    impl CustomerSource for Offline {
        async fn fetch_all_customers(&self) -> Result<Vec<CustomerRecord>> {
            Err(DashboardError::unavailable("customers table", "connection refused"))
        }
    }

    #[tokio::test]
    async fn metrics_follow_criteria() {
        let service = service(sample_source());
        let criteria = FilterCriteria {
            categories: Some(BTreeSet::from(["A".to_string()])),
            satisfaction_tier: Some(SatisfactionTier::High),
            ..FilterCriteria::default()
        };

        let metrics = service.metrics(&criteria).await.unwrap();
        assert_eq!(metrics.total_sales, 150.0);
        assert_eq!(metrics.avg_daily_sales, 75.0);
        assert_eq!(metrics.total_customers, 1);
        assert_eq!(metrics.avg_satisfaction, 5.0);
    }

    #[tokio::test]
    async fn chart_data_and_snapshot_agree() {
        let service = service(sample_source());
        let criteria = FilterCriteria::default();

        let charts = service.chart_data(&criteria).await.unwrap();
        let snapshot = service.snapshot(&criteria).await.unwrap();
        assert_eq!(charts, snapshot.charts);
        assert_eq!(snapshot.metrics.total_customers, snapshot.customers.len());
        assert_eq!(snapshot.sales.len(), 3);
        assert_eq!(charts.ages, vec![20, 70]);
    }

    #[tokio::test]
    async fn filter_options_use_unfiltered_data() {
        let service = service(sample_source());
        let options = service.filter_options().await.unwrap();

        assert_eq!(options.categories, BTreeSet::from(["A".into(), "B".into()]));
        assert_eq!(options.regions, BTreeSet::from(["East".into(), "West".into()]));
        assert_eq!(options.sales_range, (50.0, 200.0));
        assert_eq!(options.age_range, (20, 70));
        assert_eq!(options.genders.len(), 2);
    }

    #[tokio::test]
    async fn filter_options_on_empty_sales_is_insufficient_data() {
        let source = InMemorySource::new(Vec::new(), vec![customer(1, 30, "Female", 3)]);
        let err = service(source).filter_options().await.unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn filter_options_on_empty_customers_is_insufficient_data() {
        let source = InMemorySource::new(vec![sale(1, 10.0, "A", "East")], Vec::new());
        let err = service(source).filter_options().await.unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn empty_filter_result_is_not_an_error() {
        let service = service(sample_source());
        let criteria = FilterCriteria {
            regions: Some(BTreeSet::new()),
            genders: Some(BTreeSet::new()),
            ..FilterCriteria::default()
        };
        let metrics = service.metrics(&criteria).await.unwrap();
        assert_eq!(metrics, Metrics::default());
    }

    #[tokio::test]
    async fn source_failures_propagate() {
        let service = AnalysisService::new(Offline, Offline);
        let err = service.metrics(&FilterCriteria::default()).await.unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable { .. }));

        let err = service.filter_options().await.unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable { .. }));
    }
}
