use super::*;

fn year_source(column: usize) -> Option<TimeSource> {
    Some(TimeSource {
        column,
        pattern: DatePattern::compile("yyyy").unwrap(),
    })
}

#[test]
fn template_without_tokens_is_returned_verbatim() {
    let template = TableTemplate::parse("plain_table");
    for record in [
        Record::default(),
        Record::from(vec!["a"]),
        Record::from(vec!["a", "b", "c", "d"]),
    ] {
        assert_eq!(template.evaluate(&record).unwrap(), "plain_table");
    }
}

#[test]
fn field_token_reads_field_or_empty() {
    let template = TableTemplate::parse("t_@2");
    assert_eq!(
        template.evaluate(&Record::from(vec!["x", "y"])).unwrap(),
        "t_y"
    );
    assert_eq!(template.evaluate(&Record::from(vec!["x"])).unwrap(), "t_");
}

#[test]
fn multi_digit_tokens_do_not_collide_with_shorter_ones() {
    let fields: Vec<String> = (1..=12).map(|i| format!("f{}", i)).collect();
    let record = Record::new(fields);
    let template = TableTemplate::parse("@12_@1_@1");
    assert_eq!(template.evaluate(&record).unwrap(), "f12_f1_f1");
    assert_eq!(template.highest_field(), 12);
}

#[test]
fn lone_at_sign_is_literal() {
    let template = TableTemplate::parse("a@b@0");
    assert!(!template.references_fields());
    assert_eq!(template.evaluate(&Record::from(vec!["x"])).unwrap(), "a@b@0");
}

#[test]
fn time_token_renders_configured_pattern() {
    let template = TableTemplate::parse("sink#").with_time_source(year_source(2));
    let first = Record::from(vec!["a", "2024-01-01"]);
    let second = Record::from(vec!["b", "2024-01-02"]);
    assert_eq!(template.evaluate(&first).unwrap(), "sink2024");
    assert_eq!(template.evaluate(&second).unwrap(), "sink2024");
}

#[test]
fn time_column_is_ignored_when_token_absent() {
    let template = TableTemplate::parse("sink_@1").with_time_source(year_source(2));
    let record = Record::from(vec!["a", "not a date"]);
    assert_eq!(template.evaluate(&record).unwrap(), "sink_a");
    assert_eq!(
        template.evaluate(&Record::from(vec!["a"])).unwrap(),
        "sink_a"
    );
}

#[test]
fn time_column_out_of_range_fails() {
    let template = TableTemplate::parse("sink#").with_time_source(year_source(3));
    let err = template
        .evaluate(&Record::from(vec!["a", "2024-01-01"]))
        .unwrap_err();
    assert_eq!(
        err,
        EvaluationError::TimeColumnOutOfRange {
            column: 3,
            fields: 2
        }
    );
}

#[test]
fn unparsable_time_fails() {
    let template = TableTemplate::parse("sink#").with_time_source(year_source(1));
    let err = template
        .evaluate(&Record::from(vec!["yesterday"]))
        .unwrap_err();
    assert!(matches!(err, EvaluationError::UnparsableTime { .. }));
}

#[test]
fn table_name_rejects_unsafe_identifiers() {
    let template = TableTemplate::parse("sink_@1");
    assert_eq!(
        template.table_name(&Record::from(vec!["eu"])).unwrap(),
        "sink_eu"
    );
    let err = template
        .table_name(&Record::from(vec!["x; DROP TABLE users"]))
        .unwrap_err();
    assert!(matches!(err, EvaluationError::UnsafeTableName(_)));
}

#[test]
fn date_pattern_parses_prefix_and_formats() {
    let pattern = DatePattern::compile("yyyyMMdd").unwrap();
    assert_eq!(pattern.reformat("20240315").unwrap(), "20240315");

    let pattern = DatePattern::compile("yyyy-MM").unwrap();
    assert_eq!(
        pattern.reformat("2024-03-15 10:11:12").unwrap(),
        "2024-03"
    );

    let pattern = DatePattern::compile("yyyy_M_d").unwrap();
    assert_eq!(pattern.reformat("2024_3_5").unwrap(), "2024_3_5");
}

#[test]
fn date_pattern_rejects_invalid_dates() {
    let pattern = DatePattern::compile("yyyy-MM-dd").unwrap();
    assert!(pattern.parse("2024-13-01").is_none());
    assert!(pattern.parse("2024/01/01").is_none());
    assert!(pattern.parse("").is_none());
}

#[test]
fn date_pattern_supports_time_and_quoted_literals() {
    let pattern = DatePattern::compile("yyyy'T'HH").unwrap();
    assert_eq!(pattern.reformat("2024T07").unwrap(), "2024T07");

    let pattern = DatePattern::compile("yy").unwrap();
    assert_eq!(pattern.reformat("24").unwrap(), "24");
}

#[test]
fn date_pattern_reads_full_timestamps() {
    let pattern = DatePattern::compile("yyyy-MM-dd HH:mm:ss.SSS").unwrap();
    let value = pattern.parse("2024-03-05 07:08:09.123").unwrap();
    assert_eq!(value.and_utc().timestamp_subsec_millis(), 123);
    assert_eq!(
        pattern.format(&value),
        "2024-03-05 07:08:09.123"
    );

    assert!(pattern.parse("2024-02-30 00:00:00.000").is_none());
    assert!(DatePattern::compile("yyyy-MM-dd").unwrap().parse("2024-02-30").is_none());
}

#[test]
fn date_pattern_defaults_missing_fields_to_epoch() {
    let pattern = DatePattern::compile("HH'h'").unwrap();
    let value = pattern.parse("13h").unwrap();
    assert_eq!(value.to_string(), "1970-01-01 13:00:00");
}

#[test]
fn date_pattern_compile_errors() {
    assert!(DatePattern::compile("EEE").is_err());
    assert!(DatePattern::compile("MMM").is_err());
    assert!(DatePattern::compile("'unterminated").is_err());
    assert!(DatePattern::compile("--").is_err());
}
