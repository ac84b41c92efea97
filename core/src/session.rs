//! Runtime handle combining a stored profile with its bound transport.
//!
//! A `Session` keeps no network state between calls: every capability is
//! a fresh round trip, because the remote side of a webshell is stateless.
//! The *caller* owns the notion of a current directory and passes it back
//! in, deriving the next one with [`RemotePath::resolve`].

use husk_protocol::DirEntry;
use husk_protocol::SessionInfo;
use rand::distr::Alphanumeric;
use rand::distr::SampleString;
use tracing::debug;

use crate::config::HuskConfig;
use crate::error::Result;
use crate::error::SessionError;
use crate::listing;
use crate::remote_path::PathStyle;
use crate::remote_path::RemotePath;
use crate::transport;
use crate::transport::ShellTransport;

pub struct Session {
    info: SessionInfo,
    transport: Box<dyn ShellTransport>,
}

impl Session {
    /// Bind a profile to the transport its variant tag selects.
    pub fn bind(info: SessionInfo, client: &reqwest::Client, config: &HuskConfig) -> Self {
        let transport = transport::for_profile(client, &info, config.request_timeout);
        Self { info, transport }
    }

    /// Bind with an explicit transport (the pluggable edge; also the test
    /// seam).
    pub fn with_transport(info: SessionInfo, transport: Box<dyn ShellTransport>) -> Self {
        Self { info, transport }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Probe whether the webshell is reachable and actually executes
    /// commands.
    ///
    /// Sends `echo <nonce>` and checks the nonce comes back. An empty or
    /// undecodable response means "not usable", not a failure; only
    /// connectivity problems surface as an error.
    pub async fn test_usability(&self) -> Result<bool> {
        let nonce = Alphanumeric.sample_string(&mut rand::rng(), 12);
        match self.execute_command(&format!("echo {nonce}")).await {
            Ok(output) => Ok(output.contains(&nonce)),
            Err(err @ SessionError::Network { .. }) => Err(err),
            Err(SessionError::Unexpected { message }) => {
                debug!(message, "probe reached the endpoint but got no shell output");
                Ok(false)
            }
        }
    }

    /// Execute a command in the profile's remote shell context.
    ///
    /// stderr is merged into stdout (`2>&1`) for every variant, the one
    /// capture contract all flavors share, unless the command already
    /// redirects stream 2 itself. Output comes back verbatim.
    pub async fn execute_command(&self, command: &str) -> Result<String> {
        let merged = if command.contains("2>") {
            command.to_string()
        } else {
            format!("{command} 2>&1")
        };
        self.transport.send(&merged).await
    }

    /// Ask the remote for its working directory.
    ///
    /// Runs `pwd` first; shells on Windows hosts answer that with an
    /// "unrecognized command" complaint, so a bare `cd` (which makes
    /// cmd.exe print its cwd) is tried once before giving up. Path style
    /// is inferred from the returned string and sticks to the value.
    pub async fn working_directory(&self) -> Result<RemotePath> {
        let output = self.execute_command("pwd").await?;
        if let Some(path) = parse_pwd_output(&output) {
            return Ok(path);
        }
        debug!("pwd gave no usable path, falling back to cd");
        let output = self.execute_command("cd").await?;
        parse_pwd_output(&output).ok_or_else(|| {
            SessionError::unexpected("remote did not report a working directory")
        })
    }

    /// List the directory at `path`, using the listing command its style
    /// calls for.
    ///
    /// Malformed individual lines are skipped; output that does not match
    /// the listing grammar at all (an auth challenge page, a disabled-
    /// function warning) fails the whole call.
    pub async fn list_directory(&self, path: &RemotePath) -> Result<Vec<DirEntry>> {
        let command = match path.style() {
            PathStyle::Posix => format!("ls -lA -- {}", quote_posix(&path.to_string())),
            PathStyle::Windows => format!("dir /a \"{path}\""),
        };
        let output = self.execute_command(&command).await?;
        match path.style() {
            PathStyle::Posix => listing::parse_posix(&output),
            PathStyle::Windows => listing::parse_windows(&output),
        }
    }
}

/// Accept the output of `pwd`/`cd` only when it is a single absolute path.
fn parse_pwd_output(output: &str) -> Option<RemotePath> {
    let trimmed = output.trim();
    let mut lines = trimmed.lines();
    let line = lines.next()?.trim();
    if lines.next().is_some() || line.is_empty() || line.contains('<') {
        return None;
    }
    let path = RemotePath::parse(line);
    match path.style() {
        PathStyle::Posix if !line.starts_with('/') => None,
        _ => Some(path),
    }
}

/// Single-quote an argument for the remote POSIX shell.
fn quote_posix(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pwd_output_accepts_single_absolute_paths() {
        let path = parse_pwd_output("/var/www\n").expect("posix path");
        assert_eq!(path.to_string(), "/var/www");

        let path = parse_pwd_output("C:\\inetpub\\wwwroot\r\n").expect("windows path");
        assert_eq!(path.style(), PathStyle::Windows);
    }

    #[test]
    fn pwd_output_rejects_noise() {
        // cmd.exe complaining about `pwd` must not be mistaken for a path.
        assert!(parse_pwd_output("'pwd' is not recognized as an internal command\n").is_none());
        assert!(parse_pwd_output("").is_none());
        assert!(parse_pwd_output("/var/www\n/extra/line\n").is_none());
        assert!(parse_pwd_output("<html>nope</html>").is_none());
        assert!(parse_pwd_output("relative/path").is_none());
    }

    #[test]
    fn posix_quoting_survives_embedded_quotes() {
        assert_eq!(quote_posix("/var/it's"), "'/var/it'\\''s'");
    }
}
