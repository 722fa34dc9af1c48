use chrono::{Datelike, Duration, NaiveDate, Weekday};

use seedmart_core::{DateDim, RunConfig};

/// Enumerate one row per day of the configured horizon. No sampling.
pub fn generate(config: &RunConfig) -> Vec<DateDim> {
    (0..i64::from(config.date_range_days))
        .map(|offset| row_for(config.start_date + Duration::days(offset)))
        .collect()
}

fn row_for(date: NaiveDate) -> DateDim {
    let month = date.month();
    let quarter = (month - 1) / 3 + 1;
    DateDim {
        date_id: date_id(date),
        date_value: date,
        day_of_week: date.weekday().number_from_monday(),
        day_name: date.format("%A").to_string(),
        week_of_year: date.iso_week().week(),
        month,
        month_name: date.format("%B").to_string(),
        quarter,
        fiscal_quarter: quarter,
        year: date.year(),
        fiscal_year: date.year(),
        is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        is_holiday: false,
    }
}

fn date_id(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_day() {
        let mut config = RunConfig::default();
        config.date_range_days = 31;
        let rows = generate(&config);
        assert_eq!(rows.len(), 31);
        assert_eq!(rows[0].date_value, config.start_date);
        assert_eq!(rows[30].date_value, config.end_date());
    }

    #[test]
    fn derived_fields_are_pure() {
        // 2023-01-07 was a Saturday.
        let row = row_for(NaiveDate::from_ymd_opt(2023, 1, 7).unwrap());
        assert_eq!(row.date_id, 20230107);
        assert_eq!(row.day_of_week, 6);
        assert_eq!(row.day_name, "Saturday");
        assert!(row.is_weekend);
        assert_eq!(row.quarter, 1);
        assert_eq!(row.fiscal_quarter, 1);
        assert!(!row.is_holiday);
    }

    #[test]
    fn quarter_boundaries() {
        let april = row_for(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
        assert_eq!(april.quarter, 2);
        let december = row_for(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(december.quarter, 4);
    }
}
