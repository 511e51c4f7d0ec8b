//! Lectern CLI - Main entry point

use clap::Parser;
use lectern_cli::commands::{self, CommandContext};
use lectern_cli::{Cli, Commands, ConfigCommand, LessonCommand, VideoCommand};
use lectern_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // A local .env may carry LECTERN_* settings
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // Verbose mode logs debug to stderr; otherwise only warnings surface
    let mut log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("lectern-cli")
        .filter_directives("hyper=warn,reqwest=warn")
        .build();
    if let Err(e) = log_config.apply_env() {
        eprintln!("Warning: {}", e);
    }

    // The CLI works without logging; keep the guard so file logs flush on exit
    let _log_guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> lectern_cli::Result<()> {
    let Some(ref command) = cli.command else {
        return Ok(());
    };

    // `config path` must work even when the config file is broken
    if let Commands::Config {
        command: ConfigCommand::Path,
    } = command
    {
        return commands::config::path().await;
    }

    let ctx = CommandContext::from_cli(cli)?;

    match command {
        Commands::Upload {
            file,
            chapter,
            title,
            description,
            content_type,
            notify_retries,
            json,
        } => {
            commands::upload::run(
                &ctx,
                commands::upload::UploadArgs {
                    file: file.clone(),
                    chapter: *chapter,
                    title: title.clone(),
                    description: description.clone(),
                    content_type: content_type.clone(),
                    notify_retries: *notify_retries,
                    json: *json,
                },
            )
            .await
        },

        Commands::Attach {
            file,
            lesson,
            content_type,
            notify_retries,
            json,
        } => {
            commands::attach::run(
                &ctx,
                file.clone(),
                *lesson,
                content_type.clone(),
                *notify_retries,
                *json,
            )
            .await
        },

        Commands::Complete {
            lesson,
            object_key,
            duration,
        } => commands::complete::run(&ctx, *lesson, object_key.clone(), *duration).await,

        Commands::Probe { file, content_type } => {
            commands::probe::run(&ctx, file.clone(), content_type.clone()).await
        },

        Commands::Lesson { command } => match command {
            LessonCommand::Status {
                lesson,
                wait,
                interval,
                timeout,
            } => commands::lesson::status(&ctx, *lesson, *wait, *interval, *timeout).await,
        },

        Commands::Video { command } => match command {
            VideoCommand::Delete { lesson } => commands::video::delete(&ctx, *lesson).await,
        },

        Commands::Doctor => commands::doctor::run(&ctx).await,

        Commands::Config { command } => match command {
            ConfigCommand::Get { key } => commands::config::get(&ctx, key).await,
            ConfigCommand::Show => commands::config::show(&ctx).await,
            ConfigCommand::Path => commands::config::path().await,
        },
    }
}
