use std::io::{self, BufRead, Write};

use clap::Parser;
use reelpack::cli::{Cli, Commands};
use reelpack::commands::{self, SetArgs};
use reelpack::config::{Config, logs_dir};
use reelpack::transfer::{PushArgs, TerminalAction, UploadPlan, handle_push};
use reelpack::util::{human_bytes, init_tracing};

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            2
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let verbose = matches!(cli.command, Commands::Push { verbose: true, .. });
    let log_file = if verbose { Some(logs_dir()?.join("reelpack.log")) } else { None };
    // held until exit so the non-blocking writer flushes
    let _guard = init_tracing(log_file.as_deref());

    let config = Config::init()?;
    match cli.command {
        Commands::Push {
            folder,
            endpoint,
            cookie,
            csrf_token,
            form_html,
            include_loose,
            retries,
            yes,
            verbose,
            json,
            quiet,
        } => {
            let args = PushArgs {
                folder,
                endpoint,
                cookie,
                csrf_token,
                form_html,
                include_loose,
                max_retries: retries,
                verbose,
                json,
                quiet,
            };
            let confirm = |plan: &UploadPlan| yes || json || prompt_confirm(plan);
            let report = handle_push(&config, args, &confirm)?;
            if !json && !quiet {
                println!("{}", report.message());
            }
            Ok(match report.action {
                TerminalAction::EnableRetry => 1,
                TerminalAction::Redirect(url) => {
                    if !json && !quiet {
                        println!("➡️  Continue at {}", url);
                    }
                    0
                }
                TerminalAction::Reload => 0,
            })
        }
        Commands::Scan { folder, include_loose } => {
            commands::handle_scan(&folder, include_loose)?;
            Ok(0)
        }
        Commands::Set { endpoint, base_url, cookie, level, timeout, retries } => {
            commands::handle_set(
                &config,
                SetArgs { endpoint, base_url, cookie, level, timeout, retries },
            )?;
            Ok(0)
        }
        Commands::Show {} => {
            commands::handle_show(&config)?;
            Ok(0)
        }
    }
}

fn prompt_confirm(plan: &UploadPlan) -> bool {
    if commands::show_plan_table(plan).is_err() {
        return false;
    }
    print!(
        "Upload {} group(s), {} file(s), {}? [y/N] ",
        plan.groups.len(),
        plan.accepted_count(),
        human_bytes(plan.total_size())
    );
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
