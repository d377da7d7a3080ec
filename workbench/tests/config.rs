use clap::Parser;
use std::io::Write;
use workbench::config::{Cli, WorkbenchConfig};

#[test]
fn empty_file_gives_defaults() {
    let config = WorkbenchConfig::from_json("{}").unwrap();
    assert_eq!(config, WorkbenchConfig::default());
    assert_eq!(config.fps, 60.0);
    assert_eq!(config.substeps, 10);
    assert!(config.training);

    let playback = config.playback();
    assert!((playback.base_timestep - 1.0 / 60.0).abs() < 1e-15);
    assert_eq!(playback.speed, 1.0);
    assert_eq!(playback.speed_delta, 0.05);
    assert_eq!(config.cartpole().clip, f64::INFINITY);
}

#[test]
fn file_values_feed_the_session() {
    let config = WorkbenchConfig::from_json(
        r#"{ "rand_seed": 42, "rank": 3, "fps": 30, "playback_speed": -2.5, "clip": 5.0 }"#,
    )
    .unwrap();

    let session = config.session();
    assert_eq!(session.seed, Some(42));
    assert_eq!(session.rank, 3);
    assert_eq!(session.playback.speed, -2.5);
    assert!((session.playback.base_timestep - 1.0 / 30.0).abs() < 1e-15);
    assert_eq!(config.cartpole().clip, 5.0);
}

#[test]
fn unknown_keys_and_bad_values_are_rejected() {
    assert!(WorkbenchConfig::from_json(r#"{ "frames_per_second": 60 }"#).is_err());
    assert!(WorkbenchConfig::from_json(r#"{ "fps": 0 }"#).is_err());
    assert!(WorkbenchConfig::from_json(r#"{ "fps_decay": 1.0 }"#).is_err());
    assert!(WorkbenchConfig::from_json(r#"{ "clip": -1.0 }"#).is_err());
    assert!(WorkbenchConfig::from_json("not json").is_err());
}

#[test]
fn command_line_overrides_the_argument_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "rand_seed": 1, "playback_speed": 2.0, "substeps": 4 }}"#).unwrap();
    let path = file.path().to_str().unwrap().to_owned();

    let cli = Cli::try_parse_from([
        "workbench",
        "--arg-file",
        &path,
        "--playback-speed",
        "-1.5",
        "--no-training",
        "--headless",
    ])
    .unwrap();
    let config = cli.resolve().unwrap();

    assert_eq!(config.rand_seed, Some(1));
    assert_eq!(config.substeps, 4);
    assert_eq!(config.playback_speed, -1.5);
    assert!(!config.training);
    assert!(config.headless);
}

#[test]
fn missing_argument_file_is_an_error() {
    let cli = Cli::try_parse_from(["workbench", "--arg-file", "/nonexistent/args.json"]).unwrap();
    let err = cli.resolve().unwrap_err();
    assert!(format!("{err:#}").contains("args.json"));
}

#[test]
fn playback_speed_beyond_the_cap_is_rejected() {
    assert!(WorkbenchConfig::from_json(r#"{ "playback_speed": 1e9 }"#).is_err());
    assert!(WorkbenchConfig::from_json(r#"{ "playback_speed": -1000.5 }"#).is_err());
    let config = WorkbenchConfig::from_json(r#"{ "playback_speed": -1000.0 }"#).unwrap();
    assert_eq!(config.playback_speed, -1000.0);

    let cli = Cli::parse_from(["workbench", "--playback-speed", "5e6"]);
    assert!(cli.resolve().is_err());
}
