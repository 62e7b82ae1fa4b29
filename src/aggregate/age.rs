//! Age bucketing.

use crate::domain::{AgeBucket, AggregationConfig, SaleRecord};

/// Classify a record. First match wins:
///
/// 1. unknown year built
/// 2. built within `new_years_window` years of the sale
/// 3. built before `pre_1990_threshold`
/// 4. everything else
pub fn classify(record: &SaleRecord, config: &AggregationConfig) -> AgeBucket {
    classify_years(record.year_built, record.sale_year(), config)
}

pub fn classify_years(year_built: Option<i32>, sale_year: i32, config: &AggregationConfig) -> AgeBucket {
    let Some(built) = year_built else {
        return AgeBucket::Unknown;
    };

    if i64::from(sale_year) - i64::from(built) <= i64::from(config.new_years_window) {
        return AgeBucket::NewLast5y;
    }
    if built < config.pre_1990_threshold {
        return AgeBucket::Pre1990;
    }
    AgeBucket::MidAge
}
