use lantern::config::{CONFIG_FILE, Config};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.source_path, "www");
    assert_eq!(cfg.root_resource, "index.html");
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml_str("port: 9000\nsourcePath: public\nrootResource: home.html\n").unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.source_path, "public");
    assert_eq!(cfg.root_resource, "home.html");
}

#[test]
fn test_config_missing_keys_take_defaults() {
    let cfg = Config::from_yaml_str("port: 3000\n").unwrap();

    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.source_path, "www");
    assert_eq!(cfg.root_resource, "index.html");
}

#[test]
fn test_config_empty_document() {
    assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
}

#[test]
fn test_config_invalid_port() {
    assert!(Config::from_yaml_str("port: not-a-port\n").is_err());
}

#[test]
fn test_config_load_from_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        "port: 0\nsourcePath: site\nrootResource: start.html\n",
    )
    .unwrap();

    let cfg = Config::load(dir.path());

    assert_eq!(cfg.port, 0);
    assert_eq!(cfg.base_dir, dir.path());
    assert_eq!(cfg.document_root(), dir.path().join("site"));
}

#[test]
fn test_config_load_missing_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();

    let cfg = Config::load(dir.path());

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.document_root(), dir.path().join("www"));
}

#[test]
fn test_config_load_invalid_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_FILE), "port: [1, 2\n").unwrap();

    let cfg = Config::load(dir.path());

    assert_eq!(cfg.root_resource, "index.html");
    assert_eq!(cfg.base_dir, PathBuf::from(dir.path()));
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1, cfg2);
}
