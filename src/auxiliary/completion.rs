use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};

use crate::Cli;

#[derive(Clone, Debug, Args)]
pub struct CompletionArgs {
    #[arg(help = "Shell to generate completions for")]
    shell: Shell,
}

/// Write the completion script for `artifetch` to stdout
pub fn handle(args: &CompletionArgs) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, &bin_name, &mut std::io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod handle {
        use super::*;

        #[test]
        fn test_generates_scripts() {
            for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
                let mut cmd = Cli::command();
                let mut buf = Vec::new();
                generate(shell, &mut cmd, "artifetch", &mut buf);
                let script = String::from_utf8(buf).unwrap();
                assert!(script.contains("artifetch"), "{shell:?}");
                assert!(script.contains("no-sign-request"), "{shell:?}");
            }
        }
    }
}
