use std::io::Write;

use anyhow::Result;
use clap::CommandFactory;

/// This trait describes a command.
#[async_trait::async_trait]
pub trait Command {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()>;
}

/// Print the help for a subcommand to stdout, for commands invoked without
/// their required arguments.
pub fn show_subcommand_help(ctx: &mut crate::context::Context, name: &str) -> Result<()> {
    let app = crate::Opts::command();
    let bin = app.get_name().to_string();

    match app.try_get_matches_from(vec![bin.as_str(), name, "--help"]) {
        Err(err) if err.kind() == clap::ErrorKind::DisplayHelp => {
            write!(ctx.io.out, "{}", err)?;
            Ok(())
        }
        Err(err) => Err(err.into()),
        Ok(_) => Ok(()),
    }
}
