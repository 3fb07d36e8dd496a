use serial_test::serial;
use std::fs;
use tempfile::tempdir;

use blob_backup::config::{load_or_init, locate_config, LoadResult, CONFIG_ENV_VAR};
use blob_backup::BackupError;

const MINIMAL: &str = r#"<config>
  <destination_storage_account>
    <storage_account>dstacct</storage_account>
    <storage_key>ZHN0LWtleQ==</storage_key>
  </destination_storage_account>
  <relative_log_path>logs</relative_log_path>
  <source_containers>
    <source_container>
      <storage_account>srcacct</storage_account>
      <container_name>mydata</container_name>
      <storage_key>c3JjLWtleQ==</storage_key>
    </source_container>
  </source_containers>
</config>"#;

#[test]
#[serial]
fn env_var_selects_config_file() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("from_env.xml");
    fs::write(&cfg, MINIMAL).unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV_VAR, &cfg);
    }
    let loc = locate_config(None).unwrap();
    let loaded = load_or_init(None);
    unsafe {
        std::env::remove_var(CONFIG_ENV_VAR);
    }

    assert_eq!(loc.path, cfg);
    assert!(loc.explicit);
    match loaded.unwrap() {
        LoadResult::Loaded { config, path } => {
            assert_eq!(path, cfg);
            assert_eq!(config.destination.storage_account, "dstacct");
        }
        LoadResult::CreatedTemplate(p) => panic!("unexpected template at {}", p.display()),
    }
}

#[test]
#[serial]
fn flag_beats_env_var() {
    let td = tempdir().unwrap();
    let from_flag = td.path().join("flag.xml");
    let from_env = td.path().join("env.xml");
    fs::write(&from_flag, MINIMAL).unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV_VAR, &from_env);
    }
    let loc = locate_config(Some(&from_flag)).unwrap();
    unsafe {
        std::env::remove_var(CONFIG_ENV_VAR);
    }

    assert_eq!(loc.path, from_flag);
}

#[test]
#[serial]
fn missing_explicit_config_is_an_error_not_a_template() {
    let td = tempdir().unwrap();
    let missing = td.path().join("nope.xml");

    unsafe {
        std::env::set_var(CONFIG_ENV_VAR, &missing);
    }
    let res = load_or_init(None);
    unsafe {
        std::env::remove_var(CONFIG_ENV_VAR);
    }

    assert!(matches!(res, Err(BackupError::Configuration(_))));
    assert!(!missing.exists());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn missing_default_config_writes_template() {
    let td = tempdir().unwrap();
    let prev = std::env::var_os("XDG_CONFIG_HOME");
    unsafe {
        std::env::remove_var(CONFIG_ENV_VAR);
        std::env::set_var("XDG_CONFIG_HOME", td.path());
    }
    let res = load_or_init(None);
    unsafe {
        match prev {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    let expected = td.path().join("blob_backup").join("config.xml");
    match res.unwrap() {
        LoadResult::CreatedTemplate(p) => assert_eq!(p, expected),
        LoadResult::Loaded { .. } => panic!("expected a template to be created"),
    }
    let text = fs::read_to_string(&expected).unwrap();
    assert!(text.contains("<source_containers>"));

    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(&expected).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
