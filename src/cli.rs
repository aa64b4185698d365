use crate::config::{ResolvedConfig, ResolvedConfigFile};
use crate::errors::{AppError, AppResult};
use crate::export::{
    normalize, DirectorySaveTarget, ExportController, ReqwestTransport, SavedExport,
};
use crate::i18n::Catalog;
use crate::models::{FilterInput, TimestampValue};
use crate::stat::{fetch_stat, render_stat};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// Parses command-line arguments and executes the requested subcommand.
///
/// This function handles three subcommands:
/// - `export`: Export logs matching the filter flags as CSV
/// - `stat`: Print quota consumed, RPM and TPM for the filter flags
/// - `toml`: Run an export using only a TOML configuration file
///
/// `export` and `stat` accept `--config` to load settings and filters from a
/// TOML file; flags given on the command line win over the file.
///
/// # Returns
///
/// Returns the process exit status. A failed export has already been reported
/// through the notifier and only yields `ExitCode::FAILURE`. Returns an error if:
/// - The configuration is invalid
/// - The stat request fails or the server answers with an error status
///
pub async fn cli() -> AppResult<ExitCode> {
    let cmd = build_command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("export", sub)) => {
            let (config, filters) = resolve_settings(sub)?;
            return run_export(&config, &filters).await;
        }
        Some(("stat", sub)) => {
            let (config, filters) = resolve_settings(sub)?;
            run_stat(&config, &filters).await?;
        }
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .ok_or_else(|| AppError::InvalidInput("Config path is required".into()))?;

            let file_config = ResolvedConfigFile::from_toml_file(config_path)?;
            file_config.server.validate()?;
            return run_export(&file_config.server, &file_config.filters).await;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::IoError(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub(crate) fn build_command() -> Command<'static> {
    Command::new("usage-logs-export")
        .version(APP_VERSION)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("export")
                .about("Export logs matching the filters as a CSV file")
                .after_help("Example:\n  usage-logs-export export --config export.toml -m gpt-4o -s 2024-01-01 -e 2024-02-01")
                .args(filter_args())
                .args(connection_args()),
        )
        .subcommand(
            Command::new("stat")
                .about("Show quota consumed, RPM and TPM for the filters")
                .args(filter_args())
                .args(connection_args()),
        )
        .subcommand(
            Command::new("toml")
                .about("Run an export using a TOML configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML config file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn filter_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("type")
            .short('t')
            .long("type")
            .help("Log type code")
            .action(ArgAction::Set),
        Arg::new("username")
            .short('u')
            .long("username")
            .help("Only logs of this user")
            .action(ArgAction::Set),
        Arg::new("token_name")
            .long("token-name")
            .help("Only logs of this token")
            .action(ArgAction::Set),
        Arg::new("model_name")
            .short('m')
            .long("model-name")
            .help("Only logs of this model")
            .action(ArgAction::Set),
        Arg::new("start")
            .short('s')
            .long("start")
            .help("Start of the range: Unix seconds or a date such as 2024-01-01 00:00:00")
            .action(ArgAction::Set),
        Arg::new("end")
            .short('e')
            .long("end")
            .help("End of the range: Unix seconds or a date such as 2024-01-31 23:59:59")
            .action(ArgAction::Set),
        Arg::new("channel")
            .short('c')
            .long("channel")
            .help("Only logs of this channel id")
            .action(ArgAction::Set),
        Arg::new("group")
            .short('g')
            .long("group")
            .help("Only logs of this group")
            .action(ArgAction::Set),
    ]
}

fn connection_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("config")
            .long("config")
            .help("TOML file with [server] settings and [filters]")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
        Arg::new("base_url")
            .long("base-url")
            .help("Base URL of the API server")
            .action(ArgAction::Set),
        Arg::new("user_id")
            .long("user-id")
            .help("User id sent in the New-Api-User header")
            .action(ArgAction::Set),
        Arg::new("session_cookie")
            .long("session-cookie")
            .help("Session cookie, e.g. session=...")
            .action(ArgAction::Set),
        Arg::new("admin")
            .long("admin")
            .help("Caller is an administrator")
            .action(ArgAction::SetTrue),
        Arg::new("output_dir")
            .short('o')
            .long("output-dir")
            .help("Directory to save the CSV into")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
        Arg::new("locale")
            .long("locale")
            .help("Message language: en or zh")
            .action(ArgAction::Set),
        Arg::new("timeout")
            .long("timeout")
            .help("Request timeout in seconds (default: none)")
            .value_parser(clap::value_parser!(u64))
            .action(ArgAction::Set),
    ]
}

/// Merges the optional config file with command-line flags and validates the result.
pub(crate) fn resolve_settings(sub: &ArgMatches) -> AppResult<(ResolvedConfig, FilterInput)> {
    let file_config = match sub.get_one::<PathBuf>("config") {
        Some(path) => ResolvedConfigFile::from_toml_file(path)?,
        None => ResolvedConfigFile::default(),
    };
    let mut config = file_config.server;
    let mut filters = file_config.filters;

    if let Some(base_url) = sub.get_one::<String>("base_url") {
        config.base_url = base_url.clone();
    }
    if let Some(user_id) = sub.get_one::<String>("user_id") {
        config.user_id = user_id.clone();
    }
    if let Some(cookie) = sub.get_one::<String>("session_cookie") {
        config.session_cookie = Some(cookie.clone());
    }
    if sub.get_flag("admin") {
        config.is_admin = true;
    }
    if let Some(output_dir) = sub.get_one::<PathBuf>("output_dir") {
        config.output_dir = output_dir.clone();
    }
    if let Some(locale) = sub.get_one::<String>("locale") {
        config.locale = locale.clone();
    }
    if let Some(&timeout) = sub.get_one::<u64>("timeout") {
        config.request_timeout_secs = Some(timeout);
    }

    let text = |name: &str| sub.get_one::<String>(name).cloned();
    if let Some(value) = text("type") {
        filters.log_type = Some(value);
    }
    if let Some(value) = text("username") {
        filters.username = Some(value);
    }
    if let Some(value) = text("token_name") {
        filters.token_name = Some(value);
    }
    if let Some(value) = text("model_name") {
        filters.model_name = Some(value);
    }
    if let Some(value) = text("start") {
        filters.start_timestamp = TimestampValue::from_cli_arg(&value);
    }
    if let Some(value) = text("end") {
        filters.end_timestamp = TimestampValue::from_cli_arg(&value);
    }
    if let Some(value) = text("channel") {
        filters.channel = Some(value);
    }
    if let Some(value) = text("group") {
        filters.group = Some(value);
    }

    config.validate()?;
    Ok((config, filters))
}

async fn run_export(config: &ResolvedConfig, filters: &FilterInput) -> AppResult<ExitCode> {
    let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
    let target = DirectorySaveTarget::new(&config.output_dir);
    let translator = Arc::new(Catalog::new(config.locale()?));

    info!(
        base_url = %config.base_url,
        output_dir = %config.output_dir.display(),
        "Exporting usage logs"
    );

    let controller = ExportController::new(
        config.base_url()?,
        config.identity(),
        config.is_admin,
        transport,
        target,
    )
    .with_translator(translator);

    match saved_path(controller.export(Some(filters)).await) {
        Some(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

/// The controller reports its own failures, so they are not surfaced again.
fn saved_path(outcome: AppResult<SavedExport>) -> Option<PathBuf> {
    match outcome {
        Ok(saved) => Some(saved.path),
        Err(e) => {
            debug!(error = %e, "Export failure already reported");
            None
        }
    }
}

async fn run_stat(config: &ResolvedConfig, filters: &FilterInput) -> AppResult<()> {
    let transport = ReqwestTransport::new(config.request_timeout())?;
    let translator = Catalog::new(config.locale()?);
    let query = normalize(Some(filters));

    let stat = fetch_stat(
        &transport,
        &config.base_url()?,
        &query,
        &config.identity(),
        config.is_admin,
    )
    .await?;
    println!("{}", render_stat(&stat, config.quota_per_unit, &translator));
    Ok(())
}
