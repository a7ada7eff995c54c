use anyhow::Context;
use sqlx::{PgConnection, PgPool, Row};
use tracing::info;

use crate::config::GeneratorConfig;
use crate::mock;
use crate::models::{CustomerRecord, SalesRecord};
use crate::source;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub sales: usize,
    pub customers: usize,
}

async fn count_rows(pool: &PgPool, table: &str) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query(&format!("SELECT COUNT(*) AS n FROM dashboard.{table}"))
        .fetch_one(pool)
        .await?
        .get("n");
    Ok(count)
}

/// Loads generated mock data. Tables that already hold rows are left untouched.
pub async fn seed(pool: &PgPool, generator: &GeneratorConfig) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    if count_rows(pool, "sales").await? == 0 {
        let sales = mock::generate_sales(generator.sales_seed, generator.start, generator.end);
        summary.sales = insert_sales(pool, &sales).await?;
    } else {
        info!("sales table already populated, skipping");
    }

    if count_rows(pool, "customers").await? == 0 {
        let customers = mock::generate_customers(generator.customer_seed, generator.customer_count)
            .context("failed to generate mock customers")?;
        summary.customers = insert_customers(pool, &customers).await?;
    } else {
        info!("customers table already populated, skipping");
    }

    Ok(summary)
}

async fn lookup_id(conn: &mut PgConnection, table: &str, name: &str) -> anyhow::Result<i32> {
    let id: i32 = sqlx::query(&format!(
        r#"
        INSERT INTO dashboard.{table} (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#
    ))
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to resolve {table} entry '{name}'"))?
    .get("id");
    Ok(id)
}

/// All rows land in one transaction: a failing row leaves the tables unchanged.
pub async fn insert_sales(pool: &PgPool, sales: &[SalesRecord]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for sale in sales {
        let category_id = lookup_id(&mut tx, "categories", &sale.category).await?;
        let region_id = lookup_id(&mut tx, "regions", &sale.region).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO dashboard.sales (date, sales, category_id, region_id)
            VALUES ($1, $2::numeric(12, 2), $3, $4)
            "#,
        )
        .bind(sale.date)
        .bind(sale.amount)
        .bind(category_id)
        .bind(region_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert sale dated {}", sale.date))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Same all-or-nothing contract as [`insert_sales`]; existing customer ids are skipped.
pub async fn insert_customers(
    pool: &PgPool,
    customers: &[CustomerRecord],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for customer in customers {
        let result = sqlx::query(
            r#"
            INSERT INTO dashboard.customers
            (customer_id, age, gender, purchase_amount, satisfaction)
            VALUES ($1, $2, $3, $4::numeric(12, 2), $5)
            ON CONFLICT (customer_id) DO NOTHING
            "#,
        )
        .bind(customer.customer_id)
        .bind(customer.age)
        .bind(&customer.gender)
        .bind(customer.purchase_amount)
        .bind(customer.satisfaction)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert customer {}", customer.customer_id))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn import_sales_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let sales = source::read_sales_csv(csv_path)?;
    insert_sales(pool, &sales).await
}

pub async fn import_customers_json(
    pool: &PgPool,
    json_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let customers = source::read_customers_json(json_path)?;
    insert_customers(pool, &customers).await
}

pub async fn fetch_sales(pool: &PgPool) -> anyhow::Result<Vec<SalesRecord>> {
    let rows = sqlx::query(
        "SELECT s.date, s.sales::float8 AS sales, c.name AS category, r.name AS region \
         FROM dashboard.sales s \
         JOIN dashboard.categories c ON c.id = s.category_id \
         JOIN dashboard.regions r ON r.id = s.region_id \
         ORDER BY s.date DESC, s.id",
    )
    .fetch_all(pool)
    .await?;

    let mut sales = Vec::with_capacity(rows.len());
    for row in rows {
        sales.push(SalesRecord {
            date: row.try_get("date")?,
            amount: row.try_get("sales")?,
            category: row.try_get("category")?,
            region: row.try_get("region")?,
        });
    }

    Ok(sales)
}

pub async fn fetch_customers(pool: &PgPool) -> anyhow::Result<Vec<CustomerRecord>> {
    let rows = sqlx::query(
        "SELECT customer_id, age, gender, purchase_amount::float8 AS purchase_amount, satisfaction \
         FROM dashboard.customers \
         ORDER BY customer_id",
    )
    .fetch_all(pool)
    .await?;

    let mut customers = Vec::with_capacity(rows.len());
    for row in rows {
        customers.push(CustomerRecord {
            customer_id: row.try_get("customer_id")?,
            age: row.try_get("age")?,
            gender: row.try_get("gender")?,
            purchase_amount: row.try_get("purchase_amount")?,
            satisfaction: row.try_get("satisfaction")?,
        });
    }

    Ok(customers)
}
