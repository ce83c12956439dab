use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use dashlens::{
    aggregate, count_by, filter_records, monthly_totals, resolve, Bucket, CustomRange, FlatRecord,
    GroupKey, Record, Reducer, ResolvedRange, Selector,
};

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn rows(values: Vec<Value>) -> Vec<FlatRecord> {
    values
        .into_iter()
        .map(|v| FlatRecord::try_from(v).unwrap())
        .collect()
}

fn dates(records: &[FlatRecord]) -> Vec<&str> {
    records.iter().filter_map(|r| r.date_value()).collect()
}

fn sample() -> Vec<FlatRecord> {
    rows(vec![
        json!({"date": "2024-06-10", "stage": "Won"}),
        json!({"date": "2024-06-01", "stage": "Lost"}),
        json!({"date": "2024-05-01", "stage": "Won"}),
        json!({"date": "2023-01-01", "stage": "Open"}),
    ])
}

fn mixed() -> Vec<FlatRecord> {
    rows(vec![
        json!({"date": "2024-06-15T09:00:00", "stage": "Open"}),
        json!({"date": "2024-06-14", "stage": "Won"}),
        json!({"date": "2024-06-08", "stage": "Lost"}),
        json!({"date": "2024-06-01", "stage": "Won"}),
        json!({"date": "2024-05-20", "stage": "Open"}),
        json!({"date": "2024-05-15T00:00:00", "stage": "Open"}),
        json!({"date": "2024-05-14T23:59:59", "stage": "Lost"}),
        json!({"date": "garbage", "stage": "Won"}),
        json!({"stage": "Open"}),
        json!({"date": "2024-06-16", "stage": "Won"}),
    ])
}

#[test]
fn last_five_days_and_one_month_windows() {
    let now = at(2024, 6, 15);
    let records = sample();

    let last5 = resolve(&Selector::Last5Days, now);
    let (start, end) = last5.bounds().unwrap();
    assert_eq!(start, at(2024, 6, 10));
    assert_eq!(
        end,
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap()
    );
    assert_eq!(dates(&filter_records(&records, &last5)), vec!["2024-06-10"]);

    let month = resolve(&Selector::OneMonth, now);
    assert_eq!(month.bounds().unwrap().0, at(2024, 5, 15));
    assert_eq!(
        dates(&filter_records(&records, &month)),
        vec!["2024-06-10", "2024-06-01"]
    );
}

#[test]
fn monthly_value_series() {
    let records = rows(vec![
        json!({"stage": "Won", "value": 100, "date": "2024-01-05"}),
        json!({"stage": "Won", "value": 50, "date": "2024-02-10"}),
        json!({"stage": "Lost", "value": 0, "date": "2024-01-20"}),
    ]);
    let buckets = monthly_totals(&records, "value");

    assert_eq!(buckets.len(), 12);
    assert_eq!(buckets[0].label, "Jan");
    assert_eq!(buckets[0].total(), Some(100.0));
    assert_eq!(buckets[1].label, "Feb");
    assert_eq!(buckets[1].total(), Some(50.0));
    assert!(buckets[2..].iter().all(|b| b.total() == Some(0.0)));
}

#[test]
fn single_day_custom_range() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let selector = Selector::Custom(CustomRange::new(Some(day), Some(day)));
    let records = rows(vec![
        json!({"date": "2024-03-01T12:00:00"}),
        json!({"date": "2024-03-02T00:00:00"}),
    ]);

    let range = resolve(&selector, at(2024, 6, 15));
    assert_eq!(dates(&filter_records(&records, &range)), vec!["2024-03-01T12:00:00"]);
}

#[test]
fn unknown_token_behaves_like_all_time() {
    let now = at(2024, 6, 15);
    let records = mixed();
    let bogus = Selector::parse("Bogus", CustomRange::default());

    assert_eq!(
        filter_records(&records, &resolve(&bogus, now)),
        filter_records(&records, &resolve(&Selector::AllTime, now))
    );
}

#[test]
fn pass_through_is_identity() {
    let records = mixed();
    assert_eq!(filter_records(&records, &ResolvedRange::PassThrough), records);

    let half = Selector::Custom(CustomRange::new(None, NaiveDate::from_ymd_opt(2024, 1, 1)));
    assert_eq!(filter_records(&records, &resolve(&half, at(2024, 6, 15))), records);
}

#[test]
fn filtering_is_idempotent() {
    let now = at(2024, 6, 15);
    let records = mixed();
    for token in ["Today", "Last5Days", "Last15Days", "OneMonth", "ThisMonth", "LastMonth"] {
        let range = resolve(&Selector::parse(token, CustomRange::default()), now);
        let once = filter_records(&records, &range);
        assert_eq!(filter_records(&once, &range), once, "{}", token);
    }
}

#[test]
fn wider_windows_contain_narrower_ones() {
    let records = mixed();
    for now in [at(2024, 6, 15), at(2024, 3, 31), at(2024, 1, 1)] {
        let chain: Vec<Vec<FlatRecord>> = [
            Selector::Today,
            Selector::Last5Days,
            Selector::Last15Days,
            Selector::OneMonth,
        ]
        .iter()
        .map(|selector| filter_records(&records, &resolve(selector, now)))
        .collect();

        for pair in chain.windows(2) {
            assert!(
                pair[0].iter().all(|r| pair[1].contains(r)),
                "narrower window escaped the wider one at {}",
                now
            );
        }
    }
}

#[test]
fn stage_counts_sum_to_filtered_size() {
    let now = at(2024, 6, 15);
    let records = mixed();
    for selector in [Selector::AllTime, Selector::Last15Days, Selector::OneMonth] {
        let kept = filter_records(&records, &resolve(&selector, now));
        let counted: usize = count_by(&kept, "stage")
            .iter()
            .filter_map(Bucket::count)
            .sum();
        assert_eq!(counted, kept.len(), "{}", selector);
    }
}

#[test]
fn month_boundary_records_land_on_the_right_side() {
    let records = mixed();
    let range = resolve(&Selector::OneMonth, at(2024, 6, 15));
    let kept = filter_records(&records, &range);
    let kept_dates = dates(&kept);

    assert!(kept_dates.contains(&"2024-05-15T00:00:00"));
    assert!(!kept_dates.contains(&"2024-05-14T23:59:59"));
    assert!(!kept_dates.contains(&"2024-06-16"));
    assert!(!kept_dates.contains(&"garbage"));
}

#[test]
fn aggregation_leaves_input_untouched() {
    let records = mixed();
    let before = records.clone();
    let first = aggregate(&records, GroupKey::Field("stage"), Reducer::Count, None);
    let second = aggregate(&records, GroupKey::Field("stage"), Reducer::Count, None);
    assert_eq!(records, before);
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|b| b.label.as_str()).collect::<Vec<_>>(),
        vec!["Open", "Won", "Lost"]
    );
}
