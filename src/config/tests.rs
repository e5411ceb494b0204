use super::*;

#[test]
fn defaults_match_render_server_conventions() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.renderer.server_url, "http://localhost:8000");
    assert_eq!(settings.renderer.default_format, "mp4");
    assert_eq!(settings.renderer.default_quality, "low");
    assert_eq!(settings.renderer.fence_language, "manim");
    assert_eq!(settings.renderer.request_timeout, None);
    assert_eq!(settings.output.media, MediaMode::Inline);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.renderer.server_url = Some("http://file.example:8000".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = RenderOverrides {
        server_url: Some("http://cli.example:9000".to_string()),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.renderer.server_url, "http://cli.example:9000");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let mut raw = RawSettings::default();
    raw.renderer.server_url = Some("  ".to_string());
    raw.renderer.default_format = Some(String::new());
    raw.renderer.fence_language = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.renderer.server_url, DEFAULT_SERVER_URL);
    assert_eq!(settings.renderer.default_format, DEFAULT_FORMAT);
    assert_eq!(settings.renderer.fence_language, DEFAULT_FENCE_LANGUAGE);
}

#[test]
fn invalid_server_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.renderer.server_url = Some("localhost without scheme".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "renderer.server_url",
            ..
        }
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.renderer.request_timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "renderer.request_timeout_seconds",
            ..
        }
    ));
}

#[test]
fn assets_prefix_defaults_to_directory() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&RenderOverrides {
        media: Some(MediaMode::Directory),
        assets_dir: Some(PathBuf::from("public/media")),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.output.media, MediaMode::Directory);
    assert_eq!(settings.output.assets_dir, PathBuf::from("public/media"));
    assert_eq!(settings.output.assets_url_prefix, "public/media");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&RenderOverrides {
        log_json: Some(true),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn parse_document_arguments() {
    let args = CliArgs::parse_from([
        "manimark",
        "document",
        "--server-url",
        "http://render:8000",
        "--media",
        "directory",
        "notes.md",
        "-o",
        "notes.html",
    ]);

    match args.command {
        Command::Document(document) => {
            assert_eq!(
                document.overrides.server_url.as_deref(),
                Some("http://render:8000")
            );
            assert_eq!(document.overrides.media, Some(MediaMode::Directory));
            assert_eq!(document.input, std::path::Path::new("notes.md"));
            assert_eq!(
                document.output.as_deref(),
                Some(std::path::Path::new("notes.html"))
            );
        }
        Command::Block(_) => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_block_arguments() {
    let args = CliArgs::parse_from([
        "manimark",
        "block",
        "--info",
        "scene=Intro format=gif",
        "--request-timeout-seconds",
        "30",
        "intro.py",
    ]);

    match args.command {
        Command::Block(block) => {
            assert_eq!(block.info, "scene=Intro format=gif");
            assert_eq!(block.overrides.request_timeout_seconds, Some(30));
            assert_eq!(block.source, std::path::Path::new("intro.py"));
            assert!(block.output.is_none());
        }
        Command::Document(_) => panic!("wrong command parsed"),
    }
}
