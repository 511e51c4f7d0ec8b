//! `lectern doctor` command implementation
//!
//! Checks everything an upload depends on before one is attempted.

use colored::Colorize;

use super::CommandContext;
use crate::error::{CliError, Result};
use crate::ingest::FfprobeProbe;

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Run all checks without printing
pub async fn checks(ctx: &CommandContext) -> Result<Vec<Check>> {
    let api = ctx.api_client()?;
    let mut results = Vec::new();

    let reachable = api.health_check().await;
    results.push(Check {
        name: "server",
        passed: reachable,
        detail: if reachable {
            format!("{} is reachable", api.server_url())
        } else {
            format!("{} did not answer the health check", api.server_url())
        },
    });

    let token = ctx.tokens.bearer_token();
    results.push(Check {
        name: "token",
        passed: token.is_ok(),
        detail: match token {
            Ok(_) => "access token found".to_string(),
            Err(e) => e.to_string(),
        },
    });

    let probe = FfprobeProbe::new(&ctx.config.ffprobe_path);
    let available = probe.is_available().await;
    results.push(Check {
        name: "ffprobe",
        passed: available,
        detail: if available {
            format!("{} runs", ctx.config.ffprobe_path)
        } else {
            format!(
                "{} not found; install ffmpeg or set LECTERN_FFPROBE_PATH",
                ctx.config.ffprobe_path
            )
        },
    });

    Ok(results)
}

pub async fn run(ctx: &CommandContext) -> Result<()> {
    let results = checks(ctx).await?;

    for check in &results {
        let mark = if check.passed { "✓".green() } else { "✗".red() };
        println!("{} {:<8} {}", mark, check.name, check.detail);
    }

    let failed = results.iter().filter(|c| !c.passed).count();
    if failed > 0 {
        return Err(CliError::Other(anyhow::anyhow!("{} check(s) failed", failed)));
    }
    Ok(())
}
