use super::*;
use serde_json::json;

fn base_config() -> serde_json::Value {
    json!({
        "connection.url": "mysql://host:3306/database",
        "connection.user": "user",
        "connection.password": "password",
        "table.prefix": "sink",
        "columns.to.insert": "a,b,c",
    })
}

fn config_from(value: serde_json::Value) -> SinkConfig {
    serde_json::from_value(value).unwrap()
}

fn with(mut value: serde_json::Value, key: &str, entry: serde_json::Value) -> serde_json::Value {
    value[key] = entry;
    value
}

fn without(mut value: serde_json::Value, key: &str) -> serde_json::Value {
    value.as_object_mut().unwrap().remove(key);
    value
}

#[test]
fn applies_defaults() {
    let config = config_from(base_config());
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.max_duration, 0);

    let settings = config.validate().unwrap();
    assert_eq!(settings.connection.url, "mysql://host:3306/database");
    assert_eq!(settings.connection.db_type, DatabaseType::MySQL);
    assert_eq!(settings.delimiter, b',');
    assert_eq!(settings.charset, encoding_rs::UTF_8);
    assert_eq!(settings.max_duration, Duration::ZERO);
    assert!(settings.create_template.is_none());
}

#[test]
fn accepts_hibernate_connection_keys() {
    let config = config_from(json!({
        "hibernate.connection.url": "postgres://host:5432/database",
        "hibernate.connection.user": "user",
        "hibernate.connection.password": "password",
        "table.prefix": "sink",
        "columns.to.insert": "a,b,c",
    }));

    let settings = config.validate().unwrap();
    assert_eq!(settings.connection.url, "postgres://host:5432/database");
    assert_eq!(settings.connection.db_type, DatabaseType::PostgreSQL);
    assert_eq!(settings.connection.username, "user");
    assert_eq!(settings.connection.password, "password");
}

#[test]
fn missing_mandatory_properties_fail() {
    for (key, name) in [
        ("connection.url", "connection.url"),
        ("table.prefix", "table.prefix"),
        ("connection.user", "connection.user"),
        ("connection.password", "connection.password"),
    ] {
        let err = config_from(without(base_config(), key)).validate().unwrap_err();
        assert_eq!(err, ConfigError::Missing(name));
    }
}

#[test]
fn field_template_requires_columns() {
    let value = with(without(base_config(), "columns.to.insert"), "table.prefix", json!("sink_@1"));
    let err = config_from(value).validate().unwrap_err();
    assert_eq!(err, ConfigError::ColumnsRequiredByTemplate);
}

#[test]
fn time_token_requires_time_column() {
    let value = with(base_config(), "table.prefix", json!("sink#"));
    let err = config_from(value).validate().unwrap_err();
    assert_eq!(err, ConfigError::TimeColumnRequired);
}

#[test]
fn formatter_and_time_column_come_together() {
    let value = with(base_config(), "table.formatter", json!("yyyy"));
    assert_eq!(
        config_from(value).validate().unwrap_err(),
        ConfigError::TimeColumnRequired
    );

    let value = with(base_config(), "table.time.column", json!(2));
    assert_eq!(
        config_from(value).validate().unwrap_err(),
        ConfigError::FormatterRequired
    );
}

#[test]
fn time_column_accepts_index_string_or_name() {
    for spec in [json!(2), json!("2"), json!("b")] {
        let value = with(
            with(with(base_config(), "table.prefix", json!("sink#")), "table.formatter", json!("yyyy")),
            "table.time.column",
            spec,
        );
        let settings = config_from(value).validate().unwrap();
        assert_eq!(settings.template.time_source().unwrap().column, 2);
    }

    let value = with(
        with(base_config(), "table.formatter", json!("yyyy")),
        "table.time.column",
        json!("missing"),
    );
    assert_eq!(
        config_from(value).validate().unwrap_err(),
        ConfigError::UnknownTimeColumn("missing".to_string())
    );
}

#[test]
fn rejects_bad_delimiter_charset_and_url() {
    let value = with(base_config(), "delimiter.entry", json!(";;"));
    assert!(matches!(
        config_from(value).validate().unwrap_err(),
        ConfigError::InvalidDelimiter(_)
    ));

    let value = with(base_config(), "default.charset.resultset", json!("klingon"));
    assert!(matches!(
        config_from(value).validate().unwrap_err(),
        ConfigError::UnknownCharset(_)
    ));

    let value = with(base_config(), "connection.url", json!("jdbc:mysql://host/db"));
    assert!(matches!(
        config_from(value).validate().unwrap_err(),
        ConfigError::UnsupportedUrl(_)
    ));
}

#[test]
fn rejects_oversized_batches() {
    let value = with(
        with(base_config(), "connection.url", json!("sqlite::memory:")),
        "batch.size",
        json!(20_000),
    );
    assert!(matches!(
        config_from(value).validate().unwrap_err(),
        ConfigError::TooManyParameters { limit: 32_766, .. }
    ));

    let value = with(base_config(), "batch.size", json!(0));
    assert_eq!(
        config_from(value).validate().unwrap_err(),
        ConfigError::ZeroBatchSize
    );
}

#[test]
fn binding_puts_keys_first() {
    let binding = ColumnBinding::parse("name, id ,,value,region", "region,id").unwrap();
    let names: Vec<&str> = binding.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["region", "id", "name", "value"]);

    let fields: Vec<usize> = binding.columns().iter().map(|c| c.field_index).collect();
    assert_eq!(fields, vec![4, 1, 0, 3]);
    assert_eq!(binding.key_columns().count(), 2);
    assert_eq!(binding.field_position("value"), Some(4));
}

#[test]
fn binding_rejects_duplicates_and_foreign_keys() {
    assert_eq!(
        ColumnBinding::parse("a,b,A", "").unwrap_err(),
        ConfigError::DuplicateColumn("A".to_string())
    );
    assert_eq!(
        ColumnBinding::parse("a,b", "c").unwrap_err(),
        ConfigError::KeyColumnNotInsertable("c".to_string())
    );
    assert_eq!(
        ColumnBinding::parse("a,b c", "").unwrap_err(),
        ConfigError::InvalidIdentifier("b c".to_string())
    );
}

#[test]
fn loads_from_file() {
    let path = std::env::temp_dir().join(format!("sqlsink-config-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, base_config().to_string()).unwrap();
    let config = SinkConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(config.table_prefix.as_deref(), Some("sink"));

    assert!(matches!(
        SinkConfig::load(Path::new("/nonexistent/sqlsink.json")).unwrap_err(),
        ConfigError::Io(_)
    ));
}
