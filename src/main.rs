use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use stationvox::cli::{Cli, Commands, ConfigAction};
use stationvox::config::Config;
use stationvox::daemon::{resolve_socket_path, run_daemon};
use stationvox::ipc::client::{follow, send_command};
use stationvox::ipc::protocol::{Command, Response};
use stationvox::output;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    stationvox::logging::init(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Daemon {
            pause,
            settle,
            languages,
            volume,
            repeat,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(ms) = pause {
                config.playback.inter_item_pause_ms = ms;
            }
            if let Some(ms) = settle {
                config.playback.settle_pause_ms = ms;
            }
            if let Some(languages) = languages {
                config.playback.languages = languages;
            }
            if let Some(volume) = volume {
                config.playback.volume = volume;
            }
            if let Some(repeat) = repeat {
                config.playback.repeat_count = repeat;
            }
            config.validate()?;
            tracing::info!(version = %stationvox::version_string(), "starting daemon");
            run_daemon(config, cli.socket).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "stationvox",
                &mut std::io::stdout(),
            );
        }
        #[cfg(feature = "mic")]
        Commands::Devices => {
            list_audio_devices()?;
        }
        Commands::Follow => {
            let socket_path = socket_path(cli.socket, cli.config.as_deref())?;
            handle_follow(&socket_path).await?;
        }
        command => {
            let socket_path = socket_path(cli.socket, cli.config.as_deref())?;
            let Some(ipc) = command.to_ipc() else {
                anyhow::bail!("{:?} is not a daemon command", command);
            };
            handle_ipc_command(&socket_path, ipc).await?;
        }
    }

    Ok(())
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    };

    Ok(config.with_env_overrides())
}

fn socket_path(flag: Option<PathBuf>, custom_config: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let config = load_config(custom_config)?;
    Ok(resolve_socket_path(&config, None))
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path)?;
    match action {
        ConfigAction::Get { key } => {
            println!("{}", config.get_value_by_path(&key)?);
        }
        ConfigAction::Dump => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

#[cfg(feature = "mic")]
fn list_audio_devices() -> Result<()> {
    let devices = stationvox::audio::capture::list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found");
    } else {
        println!("Audio input devices:");
        for device in devices {
            println!("  {}", device);
        }
    }
    Ok(())
}

async fn handle_ipc_command(socket_path: &Path, command: Command) -> Result<()> {
    let response = match send_command(socket_path, command).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!(
                "{}",
                format!("Failed to communicate with daemon: {}", e).red()
            );
            eprintln!("Is the daemon running? Start it with: stationvox daemon");
            std::process::exit(1);
        }
    };

    match response {
        Response::Ok => println!("{}", "OK".green()),
        Response::Queued { job_id } => println!("{} {}", "Queued".green(), job_id),
        Response::NothingQueued => {
            println!("{}", "Nothing to announce for the selected languages".yellow())
        }
        Response::Status {
            snapshot,
            recording,
        } => {
            println!("Status:");
            println!(
                "  {}   {}",
                "Version:".dimmed(),
                stationvox::version_string()
            );
            println!("{}", output::format_status(&snapshot, recording.as_ref()));
        }
        Response::Jobs { jobs } => {
            if jobs.is_empty() {
                println!("{}", "(empty)".dimmed());
            }
            for job in &jobs {
                println!("{}", output::format_job(job));
            }
        }
        Response::Events { events } => {
            for event in &events {
                output::render_event(event);
            }
        }
        Response::Recordings { recordings } => {
            if recordings.is_empty() {
                println!("{}", "No recordings".dimmed());
            }
            for info in &recordings {
                println!("{}", output::format_recording(info));
            }
        }
        Response::Recording { info } => {
            println!("{} {}", "Stored".green(), output::format_recording(&info));
        }
        Response::Trains { trains } => {
            for train in &trains {
                println!("{}", output::format_train(train));
            }
        }
        Response::Settings { settings } => {
            println!("{}", output::format_settings(&settings));
        }
        Response::Path { path } => println!("{} {}", "Wrote".green(), path.display()),
        Response::Event { event } => output::render_event(&event),
        Response::Error { message } => {
            eprintln!("{}", format!("Error: {}", message).red());
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn handle_follow(socket_path: &Path) -> Result<()> {
    println!("Following announcements... (Ctrl+C to stop)");

    match follow(socket_path, |event| {
        output::render_event(&event);
        true
    })
    .await
    {
        Ok(()) => println!("Daemon connection closed"),
        Err(e) => {
            eprintln!("{}", format!("Failed to follow daemon: {}", e).red());
            eprintln!("Is the daemon running? Start it with: stationvox daemon");
            std::process::exit(1);
        }
    }

    Ok(())
}
