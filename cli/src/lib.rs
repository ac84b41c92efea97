//! Operator CLI over the husk core.

pub mod session_cmd;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "husk",
    about = "Manage webshell session profiles and run commands through them"
)]
pub struct HuskCli {
    #[command(subcommand)]
    pub subcommand: HuskSubcommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum HuskSubcommand {
    /// List stored session profiles.
    List(session_cmd::ListArgs),

    /// Show one stored profile (secrets stay redacted).
    Get(session_cmd::GetArgs),

    /// Add a profile, or replace the stored one with the same id.
    Add(session_cmd::AddArgs),

    /// Delete a stored profile.
    Remove(session_cmd::RemoveArgs),

    /// Check that a session's webshell is reachable and executes commands.
    Probe(session_cmd::ProbeArgs),

    /// Run a shell command through a stored session.
    Exec(session_cmd::ExecArgs),

    /// Print a session's remote working directory.
    Pwd(session_cmd::PwdArgs),

    /// List a remote directory through a stored session.
    Ls(session_cmd::LsArgs),

    /// Resolve a navigation entry against a remote directory. Pure path
    /// algebra, no network involved.
    Resolve(session_cmd::ResolveArgs),
}

/// Route stderr diagnostics through `RUST_LOG`, quiet by default.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run(cli: HuskCli) -> anyhow::Result<()> {
    match cli.subcommand {
        HuskSubcommand::List(args) => session_cmd::run_list(args),
        HuskSubcommand::Get(args) => session_cmd::run_get(args),
        HuskSubcommand::Add(args) => session_cmd::run_add(args),
        HuskSubcommand::Remove(args) => session_cmd::run_remove(args),
        HuskSubcommand::Probe(args) => session_cmd::run_probe(args).await,
        HuskSubcommand::Exec(args) => session_cmd::run_exec(args).await,
        HuskSubcommand::Pwd(args) => session_cmd::run_pwd(args).await,
        HuskSubcommand::Ls(args) => session_cmd::run_ls(args).await,
        HuskSubcommand::Resolve(args) => session_cmd::run_resolve(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        HuskCli::command().debug_assert();
    }

    #[test]
    fn exec_collects_the_trailing_command() {
        let cli = HuskCli::parse_from([
            "husk",
            "exec",
            "1f2d9a34-0000-0000-0000-000000000000",
            "ls",
            "-la",
            "/tmp",
        ]);
        let HuskSubcommand::Exec(args) = cli.subcommand else {
            panic!("expected exec");
        };
        assert_eq!(args.command.join(" "), "ls -la /tmp");
    }

    #[test]
    fn resolve_takes_directory_and_entry() {
        let cli = HuskCli::parse_from(["husk", "resolve", "/var/www", ".."]);
        let HuskSubcommand::Resolve(args) = cli.subcommand else {
            panic!("expected resolve");
        };
        assert_eq!(args.current_dir, "/var/www");
        assert_eq!(args.entry, "..");
    }
}
