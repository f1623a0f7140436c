use std::io::ErrorKind;

use anyhow::{Context, Result};
use clap::Parser;
use cliclack::{input, spinner};
use console::style;
use tracing_subscriber::EnvFilter;

use neo::agent::{Agent, AgentConfig, DEFAULT_FOLLOW_UP_MAX_TOKENS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use neo::commands::Command;
use neo::context::{add_to_context, AddReport};
use neo::prompt::HELP_TEXT;
use neo::providers::configs::{DeepSeekProviderConfig, ProviderConfig};
use neo::providers::configs::deepseek::DEEPSEEK_HOST;
use neo::providers::deepseek::DeepSeekProvider;
use neo::render::{Renderer, TerminalRenderer};
use neo::tools::ToolRegistry;

/// How many skip records `/add` lists before summarising the rest.
const SHOWN_SKIPS: usize = 10;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// DeepSeek API key (can also be set via DEEPSEEK_API_KEY environment variable)
    #[arg(short, long)]
    api_key: Option<String>,

    /// API host (can also be set via DEEPSEEK_API_HOST environment variable)
    #[arg(long)]
    host: Option<String>,

    /// Model to use
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Token budget for each reply
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Token budget for the reply that follows tool execution
    #[arg(long, default_value_t = DEFAULT_FOLLOW_UP_MAX_TOKENS)]
    follow_up_max_tokens: u32,

    /// Log info and debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info,neo=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn provider_config(cli: &Cli) -> Result<DeepSeekProviderConfig> {
    let api_key = match &cli.api_key {
        Some(key) => key.clone(),
        None => DeepSeekProviderConfig::get_env("DEEPSEEK_API_KEY", false, None)?.context(
            "API key must be provided via --api-key or DEEPSEEK_API_KEY environment variable",
        )?,
    };
    let host = match &cli.host {
        Some(host) => host.clone(),
        None => DeepSeekProviderConfig::get_env("DEEPSEEK_API_HOST", false, None)?
            .unwrap_or_else(|| DEEPSEEK_HOST.to_string()),
    };
    Ok(DeepSeekProviderConfig::new(api_key, host))
}

fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let provider = DeepSeekProvider::new(provider_config(&cli)?)
        .context("failed to build HTTP client")?;
    let registry = ToolRegistry::standard().context("invalid tool registry")?;
    let mut agent = Agent::new(
        Box::new(provider),
        registry,
        AgentConfig {
            model: cli.model.clone(),
            max_tokens: cli.max_tokens,
            follow_up_max_tokens: cli.follow_up_max_tokens,
        },
    );
    let mut renderer = TerminalRenderer::new();

    cliclack::intro(style(" neo ").on_cyan().black())?;
    println!(
        "{} {}",
        style(format!("model {}", cli.model)).dim(),
        style("- type /help for commands, \"exit\" to end the session").dim()
    );
    println!();

    loop {
        let line: String = match input("You").placeholder("").required(false).interact() {
            Ok(line) => line,
            Err(e) if e.kind() == ErrorKind::Interrupted => break,
            Err(e) => return Err(e.into()),
        };

        match Command::parse(&line) {
            Command::Exit => break,
            Command::Empty => continue,
            Command::Help => println!("{}\n", HELP_TEXT),
            Command::Clear => {
                agent.clear_history();
                renderer.notice("Conversation history cleared");
            }
            Command::MissingPath => renderer.error("usage: /add <path>"),
            Command::Add(path) => {
                let spin = spinner();
                spin.start(format!("reading {}", path));
                match add_to_context(&mut agent, &path) {
                    Ok(report) => {
                        spin.stop(format!("added {}", report.root.display()));
                        print_add_report(&report);
                    }
                    Err(e) => {
                        spin.error(format!("could not add {}", path));
                        renderer.error(&e.to_string());
                    }
                }
            }
            Command::Message(text) => {
                if let Err(e) = agent.submit_user_turn(&text, &mut renderer) {
                    renderer.error(&e.to_string());
                }
            }
        }
    }

    cliclack::outro("bye")?;
    Ok(())
}

fn print_add_report(report: &AddReport) {
    if !report.is_directory {
        println!(
            "{} Added file {}",
            style("✓").green(),
            style(report.root.display()).cyan()
        );
        println!();
        return;
    }

    println!(
        "{} Added folder {} ({} files)",
        style("✓").green(),
        style(report.root.display()).cyan(),
        report.added.len()
    );
    for path in &report.added {
        println!("  {}", style(path.display()).cyan());
    }

    if !report.skipped.is_empty() {
        println!(
            "{}",
            style(format!("Skipped {} entries", report.skipped.len())).yellow()
        );
        for entry in report.skipped.iter().take(SHOWN_SKIPS) {
            println!("  {}", style(entry).yellow().dim());
        }
        if report.skipped.len() > SHOWN_SKIPS {
            println!(
                "  {}",
                style(format!("...and {} more", report.skipped.len() - SHOWN_SKIPS)).dim()
            );
        }
    }
    if report.limit_reached {
        println!(
            "{}",
            style("File limit reached; remaining files were not added").yellow()
        );
    }
    println!();
}
