//! Sales aggregation: group sale records by period and summarize each group.
//!
//! This is a pure transformation (no I/O). It is re-run from scratch on every
//! interaction, so it takes everything it needs as arguments.

use std::collections::BTreeMap;

use crate::domain::{AgeBucket, AggregationConfig, PeriodKey, PeriodSummary, SaleRecord};

pub mod age;

pub use age::classify;

/// Aggregate records into per-period summaries, sorted by period start.
///
/// Records with a missing main surface are counted (sales and age mix) but add
/// nothing to the traded surface, not even their auxiliary area.
pub fn aggregate<'a, I>(records: I, config: &AggregationConfig) -> Vec<PeriodSummary>
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    let mut groups: BTreeMap<PeriodKey, PeriodSummary> = BTreeMap::new();

    for record in records {
        let key = PeriodKey::from_date(record.sale_date, config.granularity);
        let summary = groups.entry(key).or_insert_with(|| PeriodSummary::empty(key));

        summary.sale_count += 1;
        summary.total_surface_sqm += traded_surface(record, config);
        *summary.bucket_counts.entry(classify(record, config)).or_insert(0) += 1;
    }

    groups.into_values().collect()
}

/// Surface contributed by one record to its period total.
pub fn traded_surface(record: &SaleRecord, config: &AggregationConfig) -> f64 {
    let Some(main) = record.main_surface_sqm else {
        return 0.0;
    };
    let aux = if config.include_aux_surface {
        record.aux_surface_sqm.unwrap_or(0.0)
    } else {
        0.0
    };
    main + aux
}

/// Grand totals over a set of summaries (label `total`).
pub fn totals(summaries: &[PeriodSummary]) -> PeriodSummary {
    let mut bucket_counts: BTreeMap<AgeBucket, usize> = AgeBucket::ALL.iter().map(|&b| (b, 0)).collect();
    let mut sale_count = 0usize;
    let mut total_surface_sqm = 0.0;

    for s in summaries {
        sale_count += s.sale_count;
        total_surface_sqm += s.total_surface_sqm;
        for (bucket, count) in &s.bucket_counts {
            *bucket_counts.entry(*bucket).or_insert(0) += count;
        }
    }

    PeriodSummary {
        key: None,
        period_label: "total".to_string(),
        period_start: None,
        sale_count,
        total_surface_sqm,
        bucket_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Granularity;
    use chrono::{Datelike, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn random_records(seed: u64, n: usize) -> Vec<SaleRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let sale = date(rng.gen_range(2018..=2024), rng.gen_range(1..=12), rng.gen_range(1..=28));
                let built = if rng.gen_bool(0.2) { None } else { Some(rng.gen_range(1950..=2024)) };
                let main = if rng.gen_bool(0.05) { None } else { Some(rng.gen_range(20.0..250.0)) };
                let aux = if rng.gen_bool(0.5) { Some(rng.gen_range(0.0..40.0)) } else { None };
                SaleRecord::new(sale, built, main).with_aux(aux)
            })
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let out = aggregate(&Vec::<SaleRecord>::new(), &AggregationConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn same_month_pre_and_unknown() {
        let records = vec![
            SaleRecord::new(date(2023, 5, 2), Some(1985), Some(80.0)),
            SaleRecord::new(date(2023, 5, 20), None, Some(60.0)),
        ];
        let out = aggregate(&records, &AggregationConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].period_label, "2023-05");
        assert_eq!(out[0].sale_count, 2);
        assert_eq!(out[0].count(AgeBucket::Pre1990), 1);
        assert_eq!(out[0].count(AgeBucket::Unknown), 1);
        assert_eq!(out[0].count(AgeBucket::NewLast5y), 0);
        assert_eq!(out[0].count(AgeBucket::MidAge), 0);
        assert!((out[0].total_surface_sqm - 140.0).abs() < 1e-9);
    }

    #[test]
    fn output_sorted_by_period_start() {
        let records = vec![
            SaleRecord::new(date(2024, 1, 1), None, Some(1.0)),
            SaleRecord::new(date(2023, 12, 31), None, Some(1.0)),
            SaleRecord::new(date(2023, 2, 1), None, Some(1.0)),
        ];
        let out = aggregate(&records, &AggregationConfig::default());
        let labels: Vec<&str> = out.iter().map(|s| s.period_label.as_str()).collect();
        assert_eq!(labels, ["2023-02", "2023-12", "2024-01"]);
    }

    #[test]
    fn missing_main_surface_still_counted() {
        let records = vec![
            SaleRecord::new(date(2023, 1, 1), Some(2000), None).with_aux(Some(10.0)),
            SaleRecord::new(date(2023, 1, 2), Some(2000), Some(70.0)).with_aux(Some(5.0)),
        ];
        let config = AggregationConfig {
            include_aux_surface: true,
            ..AggregationConfig::default()
        };
        let out = aggregate(&records, &config);
        assert_eq!(out[0].sale_count, 2);
        assert!((out[0].total_surface_sqm - 75.0).abs() < 1e-9);
    }

    #[test]
    fn counts_sum_to_record_count() {
        let records = random_records(7, 500);
        for granularity in Granularity::ALL {
            let config = AggregationConfig {
                granularity,
                ..AggregationConfig::default()
            };
            let out = aggregate(&records, &config);
            let total: usize = out.iter().map(|s| s.sale_count).sum();
            assert_eq!(total, records.len());
            for s in &out {
                let buckets: usize = s.bucket_counts.values().sum();
                assert_eq!(buckets, s.sale_count, "bucket counts must partition {}", s.period_label);
            }
        }
    }

    #[test]
    fn including_aux_never_decreases_totals() {
        let records = random_records(11, 300);
        let without = aggregate(&records, &AggregationConfig::default());
        let with = aggregate(
            &records,
            &AggregationConfig {
                include_aux_surface: true,
                ..AggregationConfig::default()
            },
        );
        assert_eq!(without.len(), with.len());
        for (a, b) in without.iter().zip(&with) {
            assert_eq!(a.period_label, b.period_label);
            assert!(b.total_surface_sqm >= a.total_surface_sqm);
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = random_records(3, 200);
        let config = AggregationConfig {
            granularity: Granularity::Quarter,
            ..AggregationConfig::default()
        };
        assert_eq!(aggregate(&records, &config), aggregate(&records, &config));
    }

    #[test]
    fn yearly_counts_equal_sum_of_monthly() {
        let records = random_records(19, 400);
        let monthly = aggregate(&records, &AggregationConfig::default());
        let yearly = aggregate(
            &records,
            &AggregationConfig {
                granularity: Granularity::Year,
                ..AggregationConfig::default()
            },
        );

        for y in &yearly {
            let year = y.period_start.unwrap().year();
            let from_months: usize = monthly
                .iter()
                .filter(|m| m.period_start.unwrap().year() == year)
                .map(|m| m.sale_count)
                .sum();
            assert_eq!(y.sale_count, from_months, "year {year}");
        }
    }

    #[test]
    fn totals_add_up() {
        let records = random_records(5, 100);
        let out = aggregate(&records, &AggregationConfig::default());
        let total = totals(&out);
        assert_eq!(total.sale_count, 100);
        assert_eq!(total.period_label, "total");
        let buckets: usize = total.bucket_counts.values().sum();
        assert_eq!(buckets, 100);
    }
}
