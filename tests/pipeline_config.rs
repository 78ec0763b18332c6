// tests/pipeline_config.rs
use incident_stream::ingest::config::{
    ENV_CONFIG_PATH, ENV_HTTP_ADDR, ENV_POLL_INTERVAL, ENV_WATCH_DIR,
};
use incident_stream::PipelineConfig;
use std::path::PathBuf;
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("incident_stream.toml");
    fs::write(
        &p_toml,
        r#"
watch_dir = "drops"
poll_interval_secs = 5
delimiter = ";"
extension = "csv"
snapshot_path = "out/snapshot.json"
"#,
    )
    .unwrap();
    let c = PipelineConfig::load_from(&p_toml).unwrap();
    assert_eq!(c.watch_dir, PathBuf::from("drops"));
    assert_eq!(c.poll_interval_secs, 5);
    assert_eq!(c.delimiter, ';');
    assert_eq!(c.extension.as_deref(), Some("csv"));
    assert_eq!(c.snapshot_path, Some(PathBuf::from("out/snapshot.json")));

    let p_json = dir.path().join("incident_stream.json");
    fs::write(&p_json, r#"{"watch_dir":"x","log_snapshots":false}"#).unwrap();
    let j = PipelineConfig::load_from(&p_json).unwrap();
    assert_eq!(j.watch_dir, PathBuf::from("x"));
    assert!(!j.log_snapshots);
    assert_eq!(j.poll_interval_secs, 2);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_WATCH_DIR);
    env::remove_var(ENV_POLL_INTERVAL);
    env::remove_var(ENV_HTTP_ADDR);

    // 1) nothing → defaults
    let c = PipelineConfig::load_default().unwrap();
    assert_eq!(c, PipelineConfig::default());

    // 2) fallback TOML in ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/incident_stream.toml"),
        r#"watch_dir = "from-toml""#,
    )
    .unwrap();
    let c = PipelineConfig::load_default().unwrap();
    assert_eq!(c.watch_dir, PathBuf::from("from-toml"));

    // 3) env path wins, env overrides on top
    let p_env = tmp.path().join("other.json");
    fs::write(&p_env, r#"{"watch_dir":"from-env-file"}"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    env::set_var(ENV_POLL_INTERVAL, "9");
    let c = PipelineConfig::load_default().unwrap();
    assert_eq!(c.watch_dir, PathBuf::from("from-env-file"));
    assert_eq!(c.poll_interval_secs, 9);

    env::set_var(ENV_WATCH_DIR, "override");
    let c = PipelineConfig::load_default().unwrap();
    assert_eq!(c.watch_dir, PathBuf::from("override"));

    // 4) env path to a missing file is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(PipelineConfig::load_default().is_err());

    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_WATCH_DIR);
    env::remove_var(ENV_POLL_INTERVAL);
    env::remove_var(ENV_HTTP_ADDR);
    env::set_current_dir(&old).unwrap();
}
