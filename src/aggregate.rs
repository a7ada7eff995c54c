use std::collections::BTreeMap;

use crate::models::{ChartData, ChartPoint, CustomerRecord, Metrics, SalesRecord};

pub fn summarize(sales: &[SalesRecord], customers: &[CustomerRecord]) -> Metrics {
    let total_sales: f64 = sales.iter().map(|sale| sale.amount).sum();
    let total_satisfaction: i64 = customers
        .iter()
        .map(|customer| i64::from(customer.satisfaction))
        .sum();

    Metrics {
        total_sales,
        avg_daily_sales: if sales.is_empty() {
            0.0
        } else {
            total_sales / sales.len() as f64
        },
        total_customers: customers.len(),
        avg_satisfaction: if customers.is_empty() {
            0.0
        } else {
            total_satisfaction as f64 / customers.len() as f64
        },
    }
}

/// Sums `amount` per key; output is ordered by key.
fn sum_by<K, F>(sales: &[SalesRecord], key: F) -> Vec<ChartPoint<K>>
where
    K: Ord,
    F: Fn(&SalesRecord) -> K,
{
    let mut totals: BTreeMap<K, f64> = BTreeMap::new();
    for sale in sales {
        *totals.entry(key(sale)).or_insert(0.0) += sale.amount;
    }

    totals
        .into_iter()
        .map(|(x, y)| ChartPoint { x, y })
        .collect()
}

pub fn sales_by_date(sales: &[SalesRecord]) -> Vec<ChartPoint<chrono::NaiveDate>> {
    sum_by(sales, |sale| sale.date)
}

pub fn sales_by_category(sales: &[SalesRecord]) -> Vec<ChartPoint<String>> {
    sum_by(sales, |sale| sale.category.clone())
}

pub fn sales_by_region(sales: &[SalesRecord]) -> Vec<ChartPoint<String>> {
    sum_by(sales, |sale| sale.region.clone())
}

pub fn build_chart_data(sales: &[SalesRecord], customers: &[CustomerRecord]) -> ChartData {
    ChartData {
        by_date: sales_by_date(sales),
        by_category: sales_by_category(sales),
        by_region: sales_by_region(sales),
        ages: customers.iter().map(|customer| customer.age).collect(),
    }
}
