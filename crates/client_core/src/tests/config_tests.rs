use super::*;

use std::collections::HashMap;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/blog.db"),
        "sqlite://./data/blog.db"
    );
}

#[test]
fn keeps_explicit_sqlite_urls() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url(" sqlite://blog.db?mode=rwc "),
        "sqlite://blog.db?mode=rwc"
    );
}

#[test]
fn normalizes_windows_path_separators() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\blog.db"),
        "sqlite://C:/Users/alice/blog.db"
    );
}

#[test]
fn empty_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("   "), Settings::default().database_url);
}

#[test]
fn missing_settings_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = load_settings_from(&dir.path().join("absent.toml")).expect("settings");
    // The process environment may carry overrides; compare only what it can't touch.
    settings.database_url = Settings::default().database_url;
    settings.author = None;
    assert_eq!(settings, Settings::default());
}

#[test]
fn reads_settings_file_with_partial_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("blog.toml");
    fs::write(&path, "window_title = \"Innova y Emprende\"\n").expect("write settings");

    let settings = load_settings_from(&path).expect("settings");
    assert_eq!(settings.window_title, "Innova y Emprende");
}

#[test]
fn rejects_malformed_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("blog.toml");
    fs::write(&path, "database_url = [").expect("write settings");

    let err = load_settings_from(&path).expect_err("malformed");
    assert!(err.to_string().contains("failed to parse settings file"));
}

#[test]
fn app_prefixed_env_wins_over_blog_prefixed() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        lookup_from(&[
            ("BLOG_DATABASE_URL", "sqlite://first.db"),
            ("APP__DATABASE_URL", "sqlite://second.db"),
            ("BLOG_AUTHOR", "alice"),
        ]),
    );
    assert_eq!(settings.database_url, "sqlite://second.db");
    assert_eq!(settings.author.as_deref(), Some("alice"));
}

#[test]
fn blank_author_means_anonymous() {
    let mut settings = Settings {
        author: Some("bob".into()),
        ..Settings::default()
    };
    apply_env_overrides(&mut settings, lookup_from(&[("APP__AUTHOR", "   ")]));
    assert_eq!(settings.author, None);
}
