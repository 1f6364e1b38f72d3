use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};

/// Generate shell completion scripts.
///
/// If you need to set up completions manually, follow the instructions below. The exact
/// config file locations might vary based on your system. Make sure to restart your
/// shell before testing whether completions are working.
///
/// ### bash
///
/// First, ensure that you install `bash-completion` using your package manager.
///
/// After, add this to your `~/.bash_profile`:
///
///         eval "$(imgctl completion -s bash)"
///
/// ### zsh
/// Generate a `_imgctl` completion script and put it somewhere in your `$fpath`:
///
///         imgctl completion -s zsh > /usr/local/share/zsh/site-functions/_imgctl
///
/// Ensure that the following is present in your `~/.zshrc`:
///         autoload -U compinit
///         compinit -i
///
/// ### fish
///
/// Generate a `imgctl.fish` completion script:
///
///         imgctl completion -s fish > ~/.config/fish/completions/imgctl.fish
///
/// ### PowerShell
///
/// Add this line to your profile script:
///
///         Invoke-Expression -Command $(imgctl completion -s powershell | Out-String)
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdCompletion {
    /// Shell type: {bash|zsh|fish|powershell|elvish}
    #[clap(short, long, default_value = "bash", arg_enum)]
    pub shell: Shell,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdCompletion {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        // Convert our opts into a clap command.
        let mut app = crate::Opts::command();
        let name = app.get_name().to_string();

        generate(self.shell, &mut app, name, &mut ctx.io.out);

        Ok(())
    }
}
