//! The imgctl command line tool.
#![deny(missing_docs)]

// Always export the cmd_* modules as public so that it tells us when we are
// missing docs.

mod cmd;
/// The completion command.
pub mod cmd_completion;
/// The config command.
pub mod cmd_config;
/// The image commands.
pub mod cmd_image;
mod colors;
mod config;
mod config_file;
mod config_from_env;
mod config_from_file;
mod config_map;
mod context;
mod format;
mod image_service;
mod iostreams;
mod logging;
mod proto;
mod types;

use std::io::Write;

use anyhow::Result;
use clap::Parser;

use crate::{cmd::Command, config::Config};

/// Manage container images through a CRI image service.
///
/// Environment variables that can be used with imgctl.
///
/// IMAGE_SERVICE_ENDPOINT: the image service to talk to, e.g.
/// "unix:///run/containerd/containerd.sock" or "tcp://localhost:3735".
/// Takes precedence over the configured image-endpoint.
///
/// IMGCTL_TIMEOUT: seconds to wait when connecting to and calling the image
/// service. Takes precedence over the configured timeout.
///
/// DEBUG: set to any value to enable verbose output to standard error.
///
/// NO_COLOR: set to any value to avoid printing ANSI escape sequences for color output.
///
/// CLICOLOR: set to "0" to disable printing ANSI colors in output.
///
/// CLICOLOR_FORCE: set to a value other than "0" to keep ANSI colors in output
/// even when the output is piped.
///
/// IMGCTL_CONFIG_DIR: the directory where imgctl will store configuration files.
/// Default: "$XDG_CONFIG_HOME/imgctl" or "$HOME/.config/imgctl".
#[derive(Parser, Debug, Clone)]
#[clap(version = clap::crate_version!(), author = clap::crate_authors!("\n"))]
struct Opts {
    /// Print debug info
    #[clap(short = 'D', long, global = true, env)]
    debug: bool,

    /// Endpoint of the image service
    #[clap(short, long, global = true, value_name = "ENDPOINT")]
    image_endpoint: Option<String>,

    /// Seconds to wait when connecting to and calling the image service
    #[clap(long, global = true, value_name = "SECONDS")]
    timeout: Option<u64>,

    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Parser, Debug, Clone)]
enum SubCommand {
    Completion(cmd_completion::CmdCompletion),
    Config(cmd_config::CmdConfig),
    Images(cmd_image::CmdImageList),
    Inspecti(cmd_image::CmdImageStatus),
    Pull(cmd_image::CmdImagePull),
    Rmi(cmd_image::CmdImageRemove),
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    };

    std::process::exit(code);
}

async fn run() -> Result<i32> {
    // Let's get our configuration.
    let mut c = crate::config_file::parse_default_config()?;
    let mut config = crate::config_from_env::EnvConfig::inherit_env(&mut c);
    let mut ctx = crate::context::Context::new(&mut config);

    // The context owns the logger, returning drops it and flushes any
    // pending records before we exit.
    do_main(std::env::args().collect(), &mut ctx).await
}

async fn do_main(args: Vec<String>, ctx: &mut crate::context::Context<'_>) -> Result<i32> {
    // Parse the command line arguments.
    let opts = match Opts::try_parse_from(args) {
        Ok(opts) => opts,
        Err(err) => {
            // Help and version are not failures.
            if !err.use_stderr() {
                write!(ctx.io.out, "{}", err)?;
                return Ok(0);
            }

            write!(ctx.io.err_out, "{}", err)?;
            return Ok(2);
        }
    };

    if opts.debug || ctx.config.get("debug")? == "true" {
        ctx.logger = crate::logging::new_logger(true);
    }
    ctx.image_endpoint = opts.image_endpoint;
    ctx.timeout = opts.timeout;

    let result = match opts.subcmd {
        SubCommand::Completion(cmd) => cmd.run(ctx).await,
        SubCommand::Config(cmd) => cmd.run(ctx).await,
        SubCommand::Images(cmd) => cmd.run(ctx).await,
        SubCommand::Inspecti(cmd) => cmd.run(ctx).await,
        SubCommand::Pull(cmd) => cmd.run(ctx).await,
        SubCommand::Rmi(cmd) => cmd.run(ctx).await,
    };

    if let Err(err) = result {
        slog::debug!(ctx.logger, "command failed"; "error" => ?err);
        writeln!(ctx.io.err_out, "{:#}", err)?;
        return Ok(1);
    }

    Ok(0)
}
