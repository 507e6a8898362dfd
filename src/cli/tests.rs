use super::*;
use crate::dispatcher::UnhandledErrorPolicy;
use crate::runtime_config::RuntimeConfig;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_parse_serve_flags() {
    let cli = Cli::try_parse_from([
        "waypoint",
        "serve",
        "--addr",
        "127.0.0.1:9000",
        "--static-dir",
        "public",
        "--workers",
        "2",
        "--error-policy",
        "close",
    ])
    .unwrap();
    match cli.command {
        Commands::Serve {
            addr,
            static_dir,
            template_dir,
            workers,
            error_policy,
        } => {
            assert_eq!(addr, "127.0.0.1:9000");
            assert_eq!(static_dir, Some(PathBuf::from("public")));
            assert_eq!(template_dir, None);
            assert_eq!(workers, Some(2));
            assert_eq!(error_policy, Some(UnhandledErrorPolicy::Close));
        }
        Commands::Routes => panic!("expected serve"),
    }
}

#[test]
fn test_parse_rejects_unknown_policy() {
    assert!(Cli::try_parse_from(["waypoint", "serve", "--error-policy", "explode"]).is_err());
}

#[test]
fn test_parse_routes() {
    let cli = Cli::try_parse_from(["waypoint", "routes"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes));
}

#[test]
fn test_flags_override_environment() {
    let env = RuntimeConfig {
        workers: 4,
        static_dir: Some(PathBuf::from("env-static")),
        ..RuntimeConfig::default()
    };
    let merged = apply_overrides(
        env,
        None,
        Some(PathBuf::from("flag-templates")),
        Some(8),
        Some(UnhandledErrorPolicy::Close),
    );
    assert_eq!(merged.static_dir, Some(PathBuf::from("env-static")));
    assert_eq!(merged.template_dir, Some(PathBuf::from("flag-templates")));
    assert_eq!(merged.workers, 8);
    assert_eq!(merged.error_policy, UnhandledErrorPolicy::Close);
}

#[test]
fn test_demo_dispatcher_builds() {
    let dispatcher = build_dispatcher(&RuntimeConfig::default()).unwrap();
    assert!(dispatcher.routes().len() >= 10);
}
