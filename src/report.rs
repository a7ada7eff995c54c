use std::fmt::Write;

use crate::matrix;
use crate::models::{ChartPoint, FilterCriteria, Matrix, Snapshot};

/// Ten-year age bins: `(lower bound, count)`, ascending.
pub fn age_histogram(ages: &[i32]) -> Vec<(i32, usize)> {
    let mut bins: std::collections::BTreeMap<i32, usize> = std::collections::BTreeMap::new();
    for age in ages {
        *bins.entry(age.div_euclid(10) * 10).or_insert(0) += 1;
    }
    bins.into_iter().collect()
}

fn describe_criteria(criteria: &FilterCriteria) -> Vec<String> {
    let join = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "(none)".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };

    let mut lines = Vec::new();
    if let Some((start, end)) = criteria.date_range {
        lines.push(format!("dates {start} to {end}"));
    }
    if let Some(categories) = &criteria.categories {
        lines.push(format!("categories: {}", join(categories)));
    }
    if let Some(regions) = &criteria.regions {
        lines.push(format!("regions: {}", join(regions)));
    }
    if let Some((min, max)) = criteria.sales_range {
        lines.push(format!("sales between {min:.0} and {max:.0}"));
    }
    if let Some((min, max)) = criteria.age_range {
        lines.push(format!("ages {min} to {max}"));
    }
    if let Some(genders) = &criteria.genders {
        lines.push(format!("genders: {}", join(genders)));
    }
    if let Some(tier) = criteria.satisfaction_tier {
        lines.push(format!("satisfaction {tier}"));
    }
    lines
}

fn write_mix(output: &mut String, title: &str, points: &[ChartPoint<String>], total: f64) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if points.is_empty() {
        let _ = writeln!(output, "No sales match these filters.");
        return;
    }

    let mut ranked: Vec<&ChartPoint<String>> = points.iter().collect();
    ranked.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));
    for point in ranked {
        let share = if total > 0.0 { point.y / total * 100.0 } else { 0.0 };
        let _ = writeln!(output, "- {}: {:.0} ({:.1}%)", point.x, point.y, share);
    }
}

fn write_matrix(output: &mut String, matrix: &Matrix) {
    if matrix.rows.is_empty() {
        let _ = writeln!(output, "No sales match these filters.");
        return;
    }

    let _ = writeln!(
        output,
        "| {} | {} | total |",
        matrix.row_label,
        matrix.columns.join(" | ")
    );
    let _ = writeln!(output, "|{}", "---|".repeat(matrix.columns.len() + 2));
    for row in &matrix.rows {
        let cells: Vec<String> = row.cells.iter().map(|cell| format!("{cell:.0}")).collect();
        let _ = writeln!(
            output,
            "| {} | {} | {:.0} |",
            row.label,
            cells.join(" | "),
            row.total
        );
    }
}

pub fn build_report(criteria: &FilterCriteria, snapshot: &Snapshot) -> String {
    let metrics = &snapshot.metrics;
    let mut output = String::new();

    let _ = writeln!(output, "# Sales Dashboard Report");
    if criteria.is_unconstrained() {
        let _ = writeln!(output, "Generated for all records (no filters)");
    } else {
        let _ = writeln!(
            output,
            "Generated for {}",
            describe_criteria(criteria).join("; ")
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline Metrics");
    let _ = writeln!(output, "- Total sales: {:.0}", metrics.total_sales);
    let _ = writeln!(output, "- Average daily sales: {:.0}", metrics.avg_daily_sales);
    let _ = writeln!(output, "- Customers: {}", metrics.total_customers);
    if metrics.total_customers == 0 {
        let _ = writeln!(output, "- Average satisfaction: no customers match these filters");
    } else {
        let _ = writeln!(
            output,
            "- Average satisfaction: {:.1}/5",
            metrics.avg_satisfaction
        );
    }

    write_mix(
        &mut output,
        "Category Mix",
        &snapshot.charts.by_category,
        metrics.total_sales,
    );
    write_mix(
        &mut output,
        "Region Mix",
        &snapshot.charts.by_region,
        metrics.total_sales,
    );

    let mut top_days = snapshot.charts.by_date.clone();
    top_days.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Sales Days");

    if top_days.is_empty() {
        let _ = writeln!(output, "No sales match these filters.");
    } else {
        for point in top_days.iter().take(5) {
            let _ = writeln!(output, "- {}: {:.0}", point.x, point.y);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Customer Ages");
    let histogram = age_histogram(&snapshot.charts.ages);

    if histogram.is_empty() {
        let _ = writeln!(output, "No customers match these filters.");
    } else {
        for (lower, count) in histogram {
            let _ = writeln!(output, "- {}-{}: {}", lower, lower + 9, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category x Region");
    write_matrix(&mut output, &matrix::category_region(&snapshot.sales));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use crate::models::{CustomerRecord, SalesRecord, SatisfactionTier};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn snapshot(sales: Vec<SalesRecord>, customers: Vec<CustomerRecord>) -> Snapshot {
        Snapshot {
            metrics: aggregate::summarize(&sales, &customers),
            charts: aggregate::build_chart_data(&sales, &customers),
            sales,
            customers,
        }
    }

    #[test]
    fn histogram_bins_by_decade() {
        assert_eq!(
            age_histogram(&[18, 19, 25, 31, 80]),
            vec![(10, 2), (20, 1), (30, 1), (80, 1)]
        );
        assert!(age_histogram(&[]).is_empty());
    }

    #[test]
    fn report_lists_sections() {
        let sales = vec![
            SalesRecord {
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                amount: 300.0,
                category: "Food".to_string(),
                region: "Tokyo".to_string(),
            },
            SalesRecord {
                date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
                amount: 100.0,
                category: "Books".to_string(),
                region: "Osaka".to_string(),
            },
        ];
        let customers = vec![CustomerRecord {
            customer_id: 1,
            age: 34,
            gender: "Female".to_string(),
            purchase_amount: 900.0,
            satisfaction: 4,
        }];
        let criteria = FilterCriteria {
            satisfaction_tier: Some(SatisfactionTier::High),
            ..FilterCriteria::default()
        };

        let report = build_report(&criteria, &snapshot(sales, customers));
        assert!(report.contains("Generated for satisfaction high (4-5)"));
        assert!(report.contains("- Total sales: 400"));
        assert!(report.contains("- Food: 300 (75.0%)"));
        assert!(report.contains("- 2024-02-01: 300"));
        assert!(report.contains("- 30-39: 1"));
        assert!(report.contains("| category | Osaka | Tokyo | total |"));
    }

    #[test]
    fn default_criteria_report_all_records() {
        let sales = vec![SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            amount: 50.0,
            category: "Food".to_string(),
            region: "Tokyo".to_string(),
        }];
        let report = build_report(&FilterCriteria::default(), &snapshot(sales, Vec::new()));
        assert!(report.contains("Generated for all records (no filters)"));
        assert!(!report.contains("Generated for dates"));
    }

    #[test]
    fn empty_snapshot_renders_empty_states() {
        let criteria = FilterCriteria {
            categories: Some(BTreeSet::new()),
            ..FilterCriteria::default()
        };
        let report = build_report(&criteria, &snapshot(Vec::new(), Vec::new()));
        assert!(report.contains("categories: (none)"));
        assert!(report.contains("no customers match these filters"));
        assert!(report.contains("No customers match these filters."));
        assert!(report.contains("No sales match these filters."));
    }
}
