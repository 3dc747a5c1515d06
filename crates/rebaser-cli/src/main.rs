//! patch-rebaser CLI - keep downstream -patches branches rebased on upstream.

use clap::Parser;

mod commands;
mod output;
mod services;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp_secs()
        .init();
    output::set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            dev_mode,
            no_dev_mode,
        } => commands::run::run(
            config.as_deref(),
            Commands::dev_mode_override(dev_mode, no_dev_mode),
        ),
        Commands::GuessBranch {
            distgit_branch,
            remote,
            repo,
        } => commands::guess_branch::run(&distgit_branch, &remote, &repo),
        Commands::Gitreview {
            remote,
            branch,
            repo,
            no_commit,
        } => commands::gitreview::run(&remote, &branch, &repo, !no_commit),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
