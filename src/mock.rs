//! Seeded mock data for demos, seeding and tests.
//!
//! Output is a pure function of the seed: the same seed always yields the same
//! records, so fixtures built on top of it are reproducible.

use std::f64::consts::PI;

use chrono::NaiveDate;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{CustomerRecord, SalesRecord};

pub const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Food", "Books"];
pub const REGIONS: [&str; 4] = ["Tokyo", "Osaka", "Nagoya", "Fukuoka"];
pub const GENDERS: [&str; 2] = ["Male", "Female"];

pub const DEFAULT_SALES_SEED: u64 = 42;
pub const DEFAULT_CUSTOMER_SEED: u64 = 123;
pub const DEFAULT_CUSTOMER_COUNT: usize = 1000;

const SATISFACTION_WEIGHTS: [f64; 5] = [0.05, 0.1, 0.2, 0.4, 0.25];

pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN)
}

/// Box-Muller transform.
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn exponential(rng: &mut StdRng, mean: f64) -> f64 {
    let u: f64 = 1.0 - rng.gen::<f64>();
    -mean * u.ln()
}

/// One record per day in `[start, end]`, with a yearly seasonal swing.
pub fn generate_sales(seed: u64, start: NaiveDate, end: NaiveDate) -> Vec<SalesRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .enumerate()
        .map(|(index, date)| {
            let seasonal = (index as f64 * 2.0 * PI / 365.0).sin() * 10_000.0;
            let amount = (normal(&mut rng, 100_000.0, 20_000.0) + seasonal).max(0.0);
            SalesRecord {
                date,
                amount,
                category: CATEGORIES[rng.gen_range(0..CATEGORIES.len())].to_string(),
                region: REGIONS[rng.gen_range(0..REGIONS.len())].to_string(),
            }
        })
        .collect()
}

pub fn generate_customers(seed: u64, count: usize) -> Result<Vec<CustomerRecord>, WeightedError> {
    generate_customers_weighted(seed, count, &SATISFACTION_WEIGHTS)
}

/// `weights[i]` is the relative frequency of satisfaction score `i + 1`.
pub fn generate_customers_weighted(
    seed: u64,
    count: usize,
    weights: &[f64; 5],
) -> Result<Vec<CustomerRecord>, WeightedError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let satisfaction = WeightedIndex::new(weights)?;

    Ok((1..=count as i64)
        .map(|customer_id| {
            let age = normal(&mut rng, 35.0, 12.0).clamp(18.0, 80.0) as i32;
            CustomerRecord {
                customer_id,
                age,
                gender: GENDERS[rng.gen_range(0..GENDERS.len())].to_string(),
                purchase_amount: exponential(&mut rng, 50_000.0),
                satisfaction: satisfaction.sample(&mut rng) as i32 + 1,
            }
        })
        .collect())
}
