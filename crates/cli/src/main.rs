// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Init, Shell, Version};
use termfs::logging::init_logging;
use termfs::state::AppState;

command_enum! {
    (Init, Init),
    (Shell, Shell),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Log level: explicit flag > config file > info
    let log_level = args.log_level.clone().unwrap_or_else(|| {
        AppState::load_or_default(args.config_path.clone())
            .map(|state| state.config.log_level)
            .unwrap_or_else(|_| "info".to_string())
    });
    let guard = init_logging(&log_level);

    // Resolve remote URL: explicit flag > config remote > hardcoded default
    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());

    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    // flush buffered logs before exiting
    drop(guard);
    std::process::exit(code);
}
