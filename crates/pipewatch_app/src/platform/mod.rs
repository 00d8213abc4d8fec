pub mod app;
pub mod effects;
pub mod logging;
pub mod persistence;
pub mod ui;

use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use anyhow::Context;
use engine_logging::engine_info;
use log::LevelFilter;
use pipewatch_core::UiState;
use pipewatch_engine::ReqwestPipelineApi;

use crate::cli::{start_form, Cli, Command, ThemeChoice};
use crate::config::WatchConfig;
use app::{spawn_stdin_reader, Goal, Session};
use effects::EffectRunner;
use logging::LogDestination;
use ui::render::Renderer;

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let log_path = logging::default_log_path();
    let destination = if cli.verbose {
        LogDestination::Both(log_path)
    } else {
        LogDestination::File(log_path)
    };
    logging::initialize(destination, LevelFilter::Info);

    let preferences = persistence::preferences_path();
    let goal = match cli.command {
        Command::Theme { choice } => return Ok(change_theme(choice, &preferences)),
        Command::Watch => Goal::Watch,
        Command::Start {
            region,
            category,
            step,
        } => Goal::Start(start_form(region, category, step)),
        Command::Stop => Goal::Stop,
    };

    let config_path = cli.config.unwrap_or_else(WatchConfig::default_path);
    let mut config = WatchConfig::load(&config_path)?;
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    config.validate()?;

    let api = ReqwestPipelineApi::new(&config.api_settings())
        .with_context(|| format!("invalid server url {:?}", config.server.base_url))?;
    engine_info!("Orchestrator at {}", api.base_url());

    let (event_tx, event_rx) = mpsc::channel();
    let renderer = Renderer::new(persistence::load_theme(&preferences));
    let runner = EffectRunner::new(Arc::new(api), renderer, event_tx.clone())
        .context("starting the engine")?;
    spawn_stdin_reader(event_tx);

    let outcome = Session::new(config.poll_settings(), runner, goal).run(event_rx);
    Ok(match outcome {
        UiState::Failed { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn change_theme(choice: Option<ThemeChoice>, path: &std::path::Path) -> ExitCode {
    let current = persistence::load_theme(path);
    let next = match choice {
        None => {
            println!("{current}");
            return ExitCode::SUCCESS;
        }
        Some(ThemeChoice::Light) => ui::theme::Theme::Light,
        Some(ThemeChoice::Dark) => ui::theme::Theme::Dark,
        Some(ThemeChoice::Toggle) => current.toggled(),
    };
    if persistence::save_theme(path, next) {
        println!("{next}");
        ExitCode::SUCCESS
    } else {
        eprintln!("Could not save the theme preference; see the log file.");
        ExitCode::FAILURE
    }
}
