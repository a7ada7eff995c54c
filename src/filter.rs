use std::collections::BTreeSet;

use crate::models::{CustomerRecord, FilterCriteria, SalesRecord};

fn within<T: PartialOrd>(value: T, range: Option<&(T, T)>) -> bool {
    match range {
        Some((min, max)) => *min <= value && value <= *max,
        None => true,
    }
}

fn member(value: &str, set: Option<&BTreeSet<String>>) -> bool {
    set.map_or(true, |set| set.contains(value))
}

pub fn sales_matches(record: &SalesRecord, criteria: &FilterCriteria) -> bool {
    within(record.date, criteria.date_range.as_ref())
        && member(&record.category, criteria.categories.as_ref())
        && member(&record.region, criteria.regions.as_ref())
        && within(record.amount, criteria.sales_range.as_ref())
}

pub fn customer_matches(record: &CustomerRecord, criteria: &FilterCriteria) -> bool {
    within(record.age, criteria.age_range.as_ref())
        && member(&record.gender, criteria.genders.as_ref())
        && criteria
            .satisfaction_tier
            .map_or(true, |tier| tier.contains(record.satisfaction))
}

pub fn filter_sales(records: &[SalesRecord], criteria: &FilterCriteria) -> Vec<SalesRecord> {
    records
        .iter()
        .filter(|record| sales_matches(record, criteria))
        .cloned()
        .collect()
}

pub fn filter_customers(
    records: &[CustomerRecord],
    criteria: &FilterCriteria,
) -> Vec<CustomerRecord> {
    records
        .iter()
        .filter(|record| customer_matches(record, criteria))
        .cloned()
        .collect()
}
