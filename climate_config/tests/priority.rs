//! Source precedence: settings files, then the environment, then updates.
//!
//! Each case clears the prefix from the process environment so only the
//! variables set here are visible.

use anyhow::Result;
use climate_config::Climate;
use rstest::rstest;
use serde_json::{Value, json};
use serial_test::serial;
use test_helpers::{env, settings_dir::SettingsDir};

const PREFIX: &str = "CLIMATE_IT_PRIORITY";

#[rstest]
#[case(true, true, true, "ext")]
#[case(true, true, false, "env")]
#[case(true, false, false, "file")]
#[case(false, true, false, "env")]
#[case(false, false, true, "ext")]
#[serial]
fn later_sources_override_earlier_ones(
    #[case] with_file: bool,
    #[case] with_env: bool,
    #[case] with_update: bool,
    #[case] expected: &str,
) -> Result<()> {
    let dir = SettingsDir::new()?;
    let file = dir.write("settings.json", r#"{"x": "file", "from_file": true}"#)?;
    let _scope = env::scope_with(|lock| {
        let mut guards = lock.clear_prefix(PREFIX);
        if with_env {
            guards.push(lock.set_var(format!("{PREFIX}_X"), "env"));
        }
        guards
    });

    let mut builder = Climate::builder().prefix(PREFIX);
    if with_file {
        builder = builder.settings_file(file.as_str());
    }
    let mut climate = builder.build()?;
    if with_update {
        climate.update(json!({"x": "ext"}))?;
    }

    let settings = climate.settings()?;
    anyhow::ensure!(
        settings.get("x") == Some(&Value::from(expected)),
        "expected x = {expected}, got {settings}"
    );
    anyhow::ensure!(settings.get("from_file").is_some() == with_file);
    Ok(())
}

#[rstest]
#[serial]
fn settings_files_apply_in_list_order() -> Result<()> {
    let dir = SettingsDir::new()?;
    let first = dir.write("first.toml", "x = 1\ny = 1\n")?;
    let second = dir.write("second.yaml", "x: 2\n")?;
    let _scope = env::scope_with(|lock| lock.clear_prefix("CLIMATE_IT_FILES"));

    let mut climate = Climate::builder()
        .prefix("CLIMATE_IT_FILES")
        .settings_files([second.as_str(), first.as_str()])
        .build()?;
    anyhow::ensure!(climate.settings()? == &json!({"x": 1, "y": 1}));

    climate.set_settings_files([first.as_str(), second.as_str()]);
    climate.reload()?;
    anyhow::ensure!(climate.settings()? == &json!({"x": 2, "y": 1}));
    Ok(())
}

#[rstest]
#[serial]
fn environment_lists_merge_sparsely_over_files() -> Result<()> {
    let dir = SettingsDir::new()?;
    let file = dir.write("settings.json", r#"{"hosts": [{"name": "a"}, {"name": "b"}]}"#)?;
    let _scope = env::scope_with(|lock| {
        let mut guards = lock.clear_prefix("CLIMATE_IT_SPARSE");
        guards.push(lock.set_var("CLIMATE_IT_SPARSE_HOSTS__1__PORT", "8080"));
        guards
    });

    let mut climate = Climate::builder()
        .prefix("CLIMATE_IT_SPARSE")
        .settings_file(file.as_str())
        .build()?;
    anyhow::ensure!(
        climate.settings()? == &json!({"hosts": [{"name": "a"}, {"name": "b", "port": 8080}]})
    );
    Ok(())
}
