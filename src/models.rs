use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// One day's aggregated sales figure for a category/region pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    #[serde(rename = "sales")]
    pub amount: f64,
    pub category: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: i64,
    pub age: i32,
    pub gender: String,
    pub purchase_amount: f64,
    pub satisfaction: i32,
}

impl SalesRecord {
    /// Describes the first field outside its allowed domain, if any.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.amount >= 0.0 && self.amount.is_finite()) {
            return Err(format!("sales amount {} is not a non-negative number", self.amount));
        }
        Ok(())
    }
}

impl CustomerRecord {
    pub const AGE_RANGE: (i32, i32) = (0, 150);
    pub const SATISFACTION_RANGE: (i32, i32) = (1, 5);

    pub fn validate(&self) -> Result<(), String> {
        let (min_age, max_age) = Self::AGE_RANGE;
        let (min_score, max_score) = Self::SATISFACTION_RANGE;

        if self.customer_id <= 0 {
            return Err(format!("customer_id {} is not positive", self.customer_id));
        }
        if !(min_age..=max_age).contains(&self.age) {
            return Err(format!(
                "age {} is outside {min_age}-{max_age}",
                self.age
            ));
        }
        if !(self.purchase_amount >= 0.0 && self.purchase_amount.is_finite()) {
            return Err(format!(
                "purchase_amount {} is not a non-negative number",
                self.purchase_amount
            ));
        }
        if !(min_score..=max_score).contains(&self.satisfaction) {
            return Err(format!(
                "satisfaction {} is outside {min_score}-{max_score}",
                self.satisfaction
            ));
        }
        Ok(())
    }
}

/// Coarse bucketing of the 1-5 satisfaction score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SatisfactionTier {
    #[serde(alias = "high")]
    High,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "low")]
    Low,
}

impl SatisfactionTier {
    pub fn contains(self, satisfaction: i32) -> bool {
        match self {
            SatisfactionTier::High => satisfaction >= 4,
            SatisfactionTier::Medium => satisfaction == 3,
            SatisfactionTier::Low => satisfaction <= 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SatisfactionTier::High => "high (4-5)",
            SatisfactionTier::Medium => "medium (3)",
            SatisfactionTier::Low => "low (1-2)",
        }
    }
}

impl fmt::Display for SatisfactionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SatisfactionTier {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(SatisfactionTier::High),
            "medium" => Ok(SatisfactionTier::Medium),
            "low" => Ok(SatisfactionTier::Low),
            other => Err(DashboardError::InvalidCriteria(format!(
                "unknown satisfaction tier '{other}'"
            ))),
        }
    }
}

/// Active filter selections. `None` means "no constraint"; an empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub categories: Option<BTreeSet<String>>,
    pub regions: Option<BTreeSet<String>>,
    pub sales_range: Option<(f64, f64)>,
    pub age_range: Option<(i32, i32)>,
    pub genders: Option<BTreeSet<String>>,
    pub satisfaction_tier: Option<SatisfactionTier>,
}

impl FilterCriteria {
    pub fn is_unconstrained(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// Rejects inverted ranges coming from user input. The filter engine itself
    /// accepts them and simply matches nothing.
    pub fn validate(&self) -> Result<(), DashboardError> {
        if let Some((start, end)) = self.date_range {
            if start > end {
                return Err(DashboardError::InvalidCriteria(format!(
                    "date range starts after it ends ({start} > {end})"
                )));
            }
        }
        if let Some((min, max)) = self.sales_range {
            if min.is_nan() || max.is_nan() || min > max {
                return Err(DashboardError::InvalidCriteria(format!(
                    "sales range is empty ({min} > {max})"
                )));
            }
        }
        if let Some((min, max)) = self.age_range {
            if min > max {
                return Err(DashboardError::InvalidCriteria(format!(
                    "age range is empty ({min} > {max})"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_sales: f64,
    pub avg_daily_sales: f64,
    pub total_customers: usize,
    pub avg_satisfaction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint<K> {
    pub x: K,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub by_date: Vec<ChartPoint<NaiveDate>>,
    pub by_category: Vec<ChartPoint<String>>,
    pub by_region: Vec<ChartPoint<String>>,
    pub ages: Vec<i32>,
}

/// Value sets and numeric bounds used to populate filter controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub categories: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub sales_range: (f64, f64),
    pub age_range: (i32, i32),
    pub genders: BTreeSet<String>,
}

/// Everything the dashboard shows for one criteria value, built from a single fetch.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub sales: Vec<SalesRecord>,
    pub customers: Vec<CustomerRecord>,
    pub metrics: Metrics,
    pub charts: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub label: String,
    pub cells: Vec<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    pub row_label: String,
    pub columns: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_deserializes_with_missing_and_null_fields() {
        let criteria: FilterCriteria = serde_json::from_str(
            r#"{"categories": ["A"], "regions": null, "date_range": ["2024-01-01", "2024-01-31"]}"#,
        )
        .unwrap();

        assert_eq!(
            criteria.categories,
            Some(BTreeSet::from(["A".to_string()]))
        );
        assert_eq!(criteria.regions, None);
        assert_eq!(
            criteria.date_range,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
            ))
        );
        assert!(criteria.satisfaction_tier.is_none());
    }

    #[test]
    fn empty_object_is_unconstrained() {
        let criteria: FilterCriteria = serde_json::from_str("{}").unwrap();
        assert!(criteria.is_unconstrained());
    }

    #[test]
    fn tier_parses_both_cases() {
        let upper: SatisfactionTier = serde_json::from_str("\"HIGH\"").unwrap();
        let lower: SatisfactionTier = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(upper, SatisfactionTier::High);
        assert_eq!(lower, SatisfactionTier::Low);
        assert_eq!("Medium".parse::<SatisfactionTier>().unwrap(), SatisfactionTier::Medium);
        assert!("great".parse::<SatisfactionTier>().is_err());
    }

    #[test]
    fn tier_boundaries() {
        assert!(SatisfactionTier::High.contains(4));
        assert!(!SatisfactionTier::High.contains(3));
        assert!(SatisfactionTier::Medium.contains(3));
        assert!(SatisfactionTier::Low.contains(2));
        assert!(!SatisfactionTier::Low.contains(3));
    }

    #[test]
    fn validate_rejects_inverted_ranges() {
        let criteria = FilterCriteria {
            age_range: Some((60, 20)),
            ..FilterCriteria::default()
        };
        assert!(criteria.validate().is_err());
        assert!(FilterCriteria::default().validate().is_ok());
    }

    #[test]
    fn each_customer_bound_is_checked() {
        let valid = CustomerRecord {
            customer_id: 1,
            age: 150,
            gender: "Female".to_string(),
            purchase_amount: 0.0,
            satisfaction: 5,
        };
        assert!(valid.validate().is_ok());

        let broken = [
            CustomerRecord { customer_id: 0, ..valid.clone() },
            CustomerRecord { age: 151, ..valid.clone() },
            CustomerRecord { age: -1, ..valid.clone() },
            CustomerRecord { purchase_amount: -0.01, ..valid.clone() },
            CustomerRecord { satisfaction: 0, ..valid.clone() },
            CustomerRecord { satisfaction: 6, ..valid.clone() },
        ];
        for customer in &broken {
            assert!(customer.validate().is_err(), "{customer:?}");
        }
    }

    #[test]
    fn negative_or_non_finite_sale_is_invalid() {
        let sale = SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            amount: 0.0,
            category: "Books".to_string(),
            region: "East".to_string(),
        };
        assert!(sale.validate().is_ok());
        assert!(SalesRecord { amount: -0.5, ..sale.clone() }.validate().is_err());
        assert!(SalesRecord { amount: f64::NAN, ..sale }.validate().is_err());
    }

    #[test]
    fn sales_amount_uses_wire_name() {
        let record = SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            amount: 12.5,
            category: "Books".to_string(),
            region: "East".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sales"], 12.5);
        assert_eq!(value["date"], "2024-03-01");
    }
}
