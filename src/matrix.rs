//! Cross-tab tables over filtered records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use crate::models::{CustomerRecord, Matrix, MatrixRow, SalesRecord};

pub const AGE_BANDS: [(&str, i32, i32); 5] = [
    ("18-29", 18, 29),
    ("30-39", 30, 39),
    ("40-49", 40, 49),
    ("50-59", 50, 59),
    ("60+", 60, i32::MAX),
];

pub fn age_band(age: i32) -> Option<&'static str> {
    AGE_BANDS
        .iter()
        .find(|(_, min, max)| (*min..=*max).contains(&age))
        .map(|(label, _, _)| *label)
}

fn pivot(
    row_label: &str,
    rows: BTreeSet<String>,
    columns: BTreeSet<String>,
    cells: &BTreeMap<(String, String), f64>,
) -> Matrix {
    let columns: Vec<String> = columns.into_iter().collect();
    let rows = rows
        .into_iter()
        .map(|label| {
            let values: Vec<f64> = columns
                .iter()
                .map(|column| {
                    cells
                        .get(&(label.clone(), column.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect();
            let total = values.iter().sum();
            MatrixRow {
                label,
                cells: values,
                total,
            }
        })
        .collect();

    Matrix {
        row_label: row_label.to_string(),
        columns,
        rows,
    }
}

fn sales_pivot<R, C>(row_label: &str, sales: &[SalesRecord], row_key: R, column_key: C) -> Matrix
where
    R: Fn(&SalesRecord) -> String,
    C: Fn(&SalesRecord) -> String,
{
    let mut rows = BTreeSet::new();
    let mut columns = BTreeSet::new();
    let mut cells: BTreeMap<(String, String), f64> = BTreeMap::new();

    for sale in sales {
        let row = row_key(sale);
        let column = column_key(sale);
        rows.insert(row.clone());
        columns.insert(column.clone());
        *cells.entry((row, column)).or_insert(0.0) += sale.amount;
    }

    pivot(row_label, rows, columns, &cells)
}

/// Summed sales per category (rows) and region (columns).
pub fn category_region(sales: &[SalesRecord]) -> Matrix {
    sales_pivot(
        "category",
        sales,
        |sale| sale.category.clone(),
        |sale| sale.region.clone(),
    )
}

/// Summed sales per calendar month (rows, `YYYY-MM`) and category (columns).
pub fn month_category(sales: &[SalesRecord]) -> Matrix {
    sales_pivot(
        "month",
        sales,
        |sale| format!("{:04}-{:02}", sale.date.year(), sale.date.month()),
        |sale| sale.category.clone(),
    )
}

/// Customer counts per age band (rows) and satisfaction score (columns 1..=5).
/// All bands are listed even when empty; customers under 18 are not counted.
pub fn age_satisfaction(customers: &[CustomerRecord]) -> Matrix {
    let columns: Vec<String> = (1..=5).map(|score: i32| score.to_string()).collect();
    let rows = AGE_BANDS
        .iter()
        .map(|(label, _, _)| {
            let mut values = vec![0.0; columns.len()];
            for customer in customers {
                if age_band(customer.age) != Some(*label) {
                    continue;
                }
                if let Some(slot) = usize::try_from(customer.satisfaction - 1)
                    .ok()
                    .and_then(|index| values.get_mut(index))
                {
                    *slot += 1.0;
                }
            }
            let total = values.iter().sum();
            MatrixRow {
                label: label.to_string(),
                cells: values,
                total,
            }
        })
        .collect();

    Matrix {
        row_label: "age".to_string(),
        columns,
        rows,
    }
}
