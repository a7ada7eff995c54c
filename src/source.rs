//! Record sources: where the full, unfiltered collections come from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::db;
use crate::error::{DashboardError, Result};
use crate::mock;
use crate::models::{CustomerRecord, SalesRecord};

#[async_trait]
pub trait SalesSource: Send + Sync {
    async fn fetch_all_sales(&self) -> Result<Vec<SalesRecord>>;
}

#[async_trait]
pub trait CustomerSource: Send + Sync {
    async fn fetch_all_customers(&self) -> Result<Vec<CustomerRecord>>;
}

/// Fixed collections held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub sales: Vec<SalesRecord>,
    pub customers: Vec<CustomerRecord>,
}

impl InMemorySource {
    pub fn new(sales: Vec<SalesRecord>, customers: Vec<CustomerRecord>) -> Self {
        Self { sales, customers }
    }
}

#[async_trait]
impl SalesSource for InMemorySource {
    async fn fetch_all_sales(&self) -> Result<Vec<SalesRecord>> {
        Ok(self.sales.clone())
    }
}

#[async_trait]
impl CustomerSource for InMemorySource {
    async fn fetch_all_customers(&self) -> Result<Vec<CustomerRecord>> {
        Ok(self.customers.clone())
    }
}

/// Seeded mock data, generated once at construction.
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    inner: InMemorySource,
}

impl GeneratedSource {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let sales = mock::generate_sales(config.sales_seed, config.start, config.end);
        let customers = mock::generate_customers(config.customer_seed, config.customer_count)
            .map_err(|err| DashboardError::unavailable("mock generator", err))?;
        debug!(
            sales = sales.len(),
            customers = customers.len(),
            "generated mock records"
        );
        Ok(Self {
            inner: InMemorySource::new(sales, customers),
        })
    }
}

#[async_trait]
impl SalesSource for GeneratedSource {
    async fn fetch_all_sales(&self) -> Result<Vec<SalesRecord>> {
        self.inner.fetch_all_sales().await
    }
}

#[async_trait]
impl CustomerSource for GeneratedSource {
    async fn fetch_all_customers(&self) -> Result<Vec<CustomerRecord>> {
        self.inner.fetch_all_customers().await
    }
}

/// Sales from a CSV file (`date,sales,category,region`), customers from a JSON array.
/// Files are re-read on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub sales_csv: PathBuf,
    pub customers_json: PathBuf,
}

impl FileSource {
    pub fn new(sales_csv: impl Into<PathBuf>, customers_json: impl Into<PathBuf>) -> Self {
        Self {
            sales_csv: sales_csv.into(),
            customers_json: customers_json.into(),
        }
    }
}

pub fn read_sales_csv(path: &Path) -> Result<Vec<SalesRecord>> {
    let source_name = format!("sales file {}", path.display());
    let unavailable = |err: csv::Error| DashboardError::unavailable(source_name.as_str(), err);

    let mut reader = csv::Reader::from_path(path).map_err(unavailable)?;
    let mut sales = Vec::new();
    for (index, result) in reader.deserialize::<SalesRecord>().enumerate() {
        let sale = result.map_err(unavailable)?;
        sale.validate().map_err(|reason| {
            // +2: one-based, after the header line
            DashboardError::unavailable(source_name.as_str(), format!("line {}: {reason}", index + 2))
        })?;
        sales.push(sale);
    }
    Ok(sales)
}

pub fn read_customers_json(path: &Path) -> Result<Vec<CustomerRecord>> {
    let source_name = format!("customer file {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|err| DashboardError::unavailable(source_name.as_str(), err))?;
    let customers: Vec<CustomerRecord> = serde_json::from_str(&content)
        .map_err(|err| DashboardError::unavailable(source_name.as_str(), err))?;

    for (index, customer) in customers.iter().enumerate() {
        customer.validate().map_err(|reason| {
            DashboardError::unavailable(source_name.as_str(), format!("record {index}: {reason}"))
        })?;
    }
    Ok(customers)
}

#[async_trait]
impl SalesSource for FileSource {
    async fn fetch_all_sales(&self) -> Result<Vec<SalesRecord>> {
        let sales = read_sales_csv(&self.sales_csv)?;
        debug!(path = %self.sales_csv.display(), rows = sales.len(), "read sales file");
        Ok(sales)
    }
}

#[async_trait]
impl CustomerSource for FileSource {
    async fn fetch_all_customers(&self) -> Result<Vec<CustomerRecord>> {
        let customers = read_customers_json(&self.customers_json)?;
        debug!(path = %self.customers_json.display(), rows = customers.len(), "read customer file");
        Ok(customers)
    }
}

/// Postgres tables created by `init-db`.
#[derive(Debug, Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesSource for PgSource {
    async fn fetch_all_sales(&self) -> Result<Vec<SalesRecord>> {
        db::fetch_sales(&self.pool)
            .await
            .map_err(|err| DashboardError::unavailable("sales table", err))
    }
}

#[async_trait]
impl CustomerSource for PgSource {
    async fn fetch_all_customers(&self) -> Result<Vec<CustomerRecord>> {
        db::fetch_customers(&self.pool)
            .await
            .map_err(|err| DashboardError::unavailable("customers table", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn file_source_reads_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let sales_path = dir.path().join("sales.csv");
        let customers_path = dir.path().join("customers.json");

        let mut sales_file = std::fs::File::create(&sales_path).unwrap();
        writeln!(sales_file, "date,sales,category,region").unwrap();
        writeln!(sales_file, "2024-01-01,100.5,Food,Tokyo").unwrap();
        writeln!(sales_file, "2024-01-02,80,Books,Osaka").unwrap();

        std::fs::write(
            &customers_path,
            r#"[{"customer_id": 1, "age": 30, "gender": "Female", "purchase_amount": 1200.0, "satisfaction": 4}]"#,
        )
        .unwrap();

        let source = FileSource::new(&sales_path, &customers_path);
        let sales = source.fetch_all_sales().await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].amount, 100.5);
        assert_eq!(sales[1].category, "Books");

        let customers = source.fetch_all_customers().await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].satisfaction, 4);
    }

    #[tokio::test]
    async fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("nope.csv"), dir.path().join("nope.json"));

        let err = source.fetch_all_sales().await.unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable { .. }));

        let err = source.fetch_all_customers().await.unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn negative_sale_is_rejected_with_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let sales_path = dir.path().join("sales.csv");
        std::fs::write(
            &sales_path,
            "date,sales,category,region\n2024-01-01,10,Food,Tokyo\n2024-01-02,-5,Food,Osaka\n",
        )
        .unwrap();

        let source = FileSource::new(&sales_path, dir.path().join("customers.json"));
        let err = source.fetch_all_sales().await.unwrap_err();
        let DashboardError::SourceUnavailable { source_name, reason } = err else {
            panic!("expected SourceUnavailable, got {err:?}");
        };
        assert!(source_name.contains("sales.csv"));
        assert!(reason.contains("line 3"), "{reason}");
    }

    #[tokio::test]
    async fn out_of_range_customer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let customers_path = dir.path().join("customers.json");
        std::fs::write(
            &customers_path,
            r#"[
                {"customer_id": 1, "age": 40, "gender": "Male", "purchase_amount": 10.0, "satisfaction": 3},
                {"customer_id": -3, "age": 999, "gender": "Male", "purchase_amount": -1.0, "satisfaction": 9}
            ]"#,
        )
        .unwrap();

        let source = FileSource::new(dir.path().join("sales.csv"), &customers_path);
        let err = source.fetch_all_customers().await.unwrap_err();
        let DashboardError::SourceUnavailable { source_name, reason } = err else {
            panic!("expected SourceUnavailable, got {err:?}");
        };
        assert!(source_name.contains("customers.json"));
        assert!(reason.contains("record 1"), "{reason}");
    }

    #[tokio::test]
    async fn generated_source_is_reproducible() {
        let config = GeneratorConfig {
            customer_count: 20,
            ..GeneratorConfig::default()
        };
        let first = GeneratedSource::new(&config).unwrap();
        let second = GeneratedSource::new(&config).unwrap();

        assert_eq!(
            first.fetch_all_sales().await.unwrap(),
            second.fetch_all_sales().await.unwrap()
        );
        assert_eq!(first.fetch_all_customers().await.unwrap().len(), 20);
    }
}
