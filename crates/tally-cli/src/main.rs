// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::{Config, PASSWORD_ENV};
use runtime::{ApiRuntime, DemoRuntime};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tally_app::AppState;
use tally_tui::{AppRuntime, ConsoleOptions};
use tracing::{info, warn};

const DEMO_SEED: u64 = 7;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tally --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_dir = logging::default_log_dir()?;
    let _log_guard = logging::init(config.log_level(), &log_dir)?;
    info!(config = %options.config_path.display(), demo = options.demo, "starting");

    let console = ConsoleOptions {
        debounce: config.debounce()?,
        page_size: config.page_size(),
        location: options
            .open
            .clone()
            .unwrap_or_else(|| config.start_tab().path().to_owned()),
    };

    if options.demo {
        let runtime = DemoRuntime::seeded(DEMO_SEED);
        if options.check_only {
            return Ok(());
        }
        return launch(runtime, console);
    }

    let client = connect(&config).with_context(|| {
        format!(
            "connect to {} -- set [api].base_url in {} or start the backend",
            config.base_url(),
            options.config_path.display()
        )
    })?;
    if options.check_only {
        client.ping()?;
        println!("ok: {}", client.base_url());
        return Ok(());
    }
    launch(ApiRuntime::new(client), console)
}

fn connect(config: &Config) -> Result<tally_api::Client> {
    let mut client =
        tally_api::Client::new(config.base_url(), config.timeout()?)?.with_token(config.token());
    if !client.has_token()
        && let Some(email) = config.login_email()
    {
        match env::var(PASSWORD_ENV) {
            Ok(password) => client.login(email, &password)?,
            Err(_) => warn!(email, "no {PASSWORD_ENV} set; continuing without a token"),
        }
    }
    Ok(client)
}

fn launch<R: AppRuntime + 'static>(runtime: R, console: ConsoleOptions) -> Result<()> {
    let mut state = AppState::default();
    let result = tally_tui::run_app(&mut state, Arc::new(runtime), console);
    info!(ok = result.is_ok(), "console closed");
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    open: Option<String>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        open: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--open" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--open requires a location such as /sales?q=oil"))?;
                let value = value.as_ref().trim();
                options.open = Some(if value.starts_with('/') {
                    value.to_owned()
                } else {
                    format!("/{value}")
                });
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("tally");
    println!("  --config <path>          Use a specific config path");
    println!("  --open <location>        Start at a location, e.g. /sales?q=oil&page=2");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against a seeded in-memory shop");
    println!("  --check                  Validate config and reach the backend, then exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/tally-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                demo: false,
                check_only: false,
                open: None,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--open"], default_options_path())
            .expect_err("missing location should fail");
        assert!(error.to_string().contains("--open requires a location"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_demo_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--demo", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.demo);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_roots_open_locations() -> Result<()> {
        let rooted = parse_cli_args(vec!["--open", "/sales?q=oil&page=2"], default_options_path())?;
        assert_eq!(rooted.open.as_deref(), Some("/sales?q=oil&page=2"));

        let bare = parse_cli_args(vec!["--open", "customers"], default_options_path())?;
        assert_eq!(bare.open.as_deref(), Some("/customers"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
