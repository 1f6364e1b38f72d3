use std::io::Write;

use anyhow::Result;
use clap::Parser;

/// Manage configuration for imgctl.
///
/// Current respected settings:
/// - image-endpoint: the image service to talk to
///   (default "unix:///run/containerd/containerd.sock")
/// - timeout: seconds to wait when connecting to and calling the image
///   service (default "10")
/// - debug: "true" to print debug info to standard error (default "false")
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdConfig {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Parser, Debug, Clone)]
enum SubCommand {
    Get(CmdConfigGet),
    Set(CmdConfigSet),
    List(CmdConfigList),
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdConfig {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        match &self.subcmd {
            SubCommand::Get(cmd) => cmd.run(ctx).await,
            SubCommand::Set(cmd) => cmd.run(ctx).await,
            SubCommand::List(cmd) => cmd.run(ctx).await,
        }
    }
}

/// Print the value of a given configuration key.
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdConfigGet {
    /// The configuration key.
    #[clap(name = "key", required = true)]
    pub key: String,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdConfigGet {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        let value = ctx.config.get(&self.key)?;
        writeln!(ctx.io.out, "{}", value)?;

        Ok(())
    }
}

/// Update configuration with a value for the given key.
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdConfigSet {
    /// The configuration key.
    #[clap(name = "key", required = true)]
    pub key: String,

    /// The new value.
    #[clap(name = "value", required = true)]
    pub value: String,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdConfigSet {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        crate::config::validate_key(&self.key)?;
        crate::config::validate_value(&self.key, &self.value)?;

        ctx.config.set(&self.key, &self.value)?;
        ctx.config.write()?;

        Ok(())
    }
}

/// Print a list of configuration keys and values.
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdConfigList {}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdConfigList {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        for option in crate::config::config_options() {
            let value = ctx.config.get(&option.key)?;
            writeln!(ctx.io.out, "{}={}", option.key, value)?;
        }

        Ok(())
    }
}
