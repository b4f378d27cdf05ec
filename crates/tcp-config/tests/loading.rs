use std::io::Write;

use tcp_config::{load_tier_layout, ConfigError, ExecutionMode};

fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write fixture");
    file
}

#[test]
fn load_valid_fixture_from_disk() {
    let file = write_fixture(
        r#"
org: acme
environment: prod
provider:
  name: local
tiers:
  infrastructure:
    capabilities:
      - name: vpc
        type: network
"#,
    );
    let layout = load_tier_layout(file.path()).expect("should load without error");
    assert_eq!(layout.org, "acme");
    assert_eq!(layout.provider.name, "local");
    assert_eq!(layout.execution.tier3_mode, ExecutionMode::AutoApply);
}

#[test]
fn missing_file_returns_io_error() {
    let err = load_tier_layout(std::path::Path::new("/nonexistent/path/does/not/exist.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_yaml_returns_parse_error() {
    let file = write_fixture("org: [this is not a map");
    let err = load_tier_layout(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }));
}
