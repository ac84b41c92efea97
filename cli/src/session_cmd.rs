use std::str::FromStr;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use chrono::Utc;
use husk_core::HuskConfig;
use husk_core::RemotePath;
use husk_core::SessionError;
use husk_core::SessionManager;
use husk_core::SessionRegistry;
use husk_protocol::DirEntry;
use husk_protocol::SessionInfo;
use husk_protocol::ShellKind;
use uuid::Uuid;

#[derive(Debug, clap::Parser)]
pub struct ListArgs {
    /// Output the profiles as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Parser)]
pub struct GetArgs {
    /// Session identifier.
    pub id: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Parser)]
pub struct AddArgs {
    /// Reuse an existing identifier to replace that profile; a fresh one
    /// is generated otherwise.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub name: String,

    /// Webshell flavor: php, jsp or aspx.
    #[arg(long)]
    pub kind: String,

    /// Endpoint the webshell answers on.
    #[arg(long)]
    pub url: String,

    /// Shared secret the webshell checks.
    #[arg(long)]
    pub secret: String,

    /// Form field carrying the secret (flavor default when omitted).
    #[arg(long, default_value = "")]
    pub secret_param: String,

    /// Form field carrying the command (flavor default when omitted).
    #[arg(long, default_value = "")]
    pub command_param: String,

    /// Boundary token wrapping real output in the response body.
    #[arg(long)]
    pub marker: Option<String>,

    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, clap::Parser)]
pub struct RemoveArgs {
    pub id: String,
}

#[derive(Debug, clap::Parser)]
pub struct ProbeArgs {
    /// Stored session identifier. Omit to probe an unsaved profile given
    /// via --url/--kind/--secret.
    pub id: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub kind: Option<String>,

    #[arg(long)]
    pub secret: Option<String>,

    #[arg(long)]
    pub marker: Option<String>,
}

#[derive(Debug, clap::Parser)]
pub struct ExecArgs {
    pub id: String,

    /// Command to run in the remote shell, passed through verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, clap::Parser)]
pub struct PwdArgs {
    pub id: String,
}

#[derive(Debug, clap::Parser)]
pub struct LsArgs {
    pub id: String,

    /// Directory to list; the session's working directory when omitted.
    pub path: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Parser)]
pub struct ResolveArgs {
    /// Current remote directory.
    pub current_dir: String,

    /// Navigation entry: `.`, `..`, a child name, or an absolute path.
    pub entry: String,
}

fn open_manager() -> Result<SessionManager> {
    let config = HuskConfig::load().context("loading configuration")?;
    let registry =
        SessionRegistry::open(config.store_path()).context("opening the session store")?;
    SessionManager::new(config, registry).context("building the HTTP client")
}

/// Operator-facing rendering of the two failure kinds.
fn describe(err: SessionError) -> anyhow::Error {
    if err.is_retryable() {
        anyhow::anyhow!("{err} (connectivity problem; retrying may help)")
    } else {
        anyhow::anyhow!("{err} (check the shell kind, secret and marker settings)")
    }
}

pub fn run_list(args: ListArgs) -> Result<()> {
    let manager = open_manager()?;
    let summaries = manager.registry().list();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("no stored sessions");
        return Ok(());
    }
    for summary in summaries {
        println!(
            "{}  {:<4}  {:<20}  {}",
            summary.session_id, summary.kind, summary.name, summary.url
        );
    }
    Ok(())
}

pub fn run_get(args: GetArgs) -> Result<()> {
    let manager = open_manager()?;
    let Some(info) = manager.registry().get_by_raw_id(&args.id) else {
        bail!("no such session: {}", args.id);
    };
    let summary = info.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("id:      {}", summary.session_id);
        println!("name:    {}", summary.name);
        println!("kind:    {}", summary.kind);
        println!("url:     {}", summary.url);
        if let Some(note) = &summary.note {
            println!("note:    {note}");
        }
        println!("created: {}", summary.created_at.to_rfc3339());
    }
    Ok(())
}

pub fn run_add(args: AddArgs) -> Result<()> {
    let manager = open_manager()?;
    let session_id = match args.id.as_deref() {
        Some(raw) => Uuid::from_str(raw).with_context(|| format!("invalid id `{raw}`"))?,
        None => Uuid::new_v4(),
    };
    let kind = parse_kind(&args.kind)?;
    let info = SessionInfo {
        session_id,
        name: args.name,
        kind,
        url: args.url,
        secret: args.secret,
        secret_param: args.secret_param,
        command_param: args.command_param,
        marker: args.marker,
        note: args.note,
        created_at: Utc::now(),
    };
    manager.upsert(info).context("saving the profile")?;
    println!("{session_id}");
    Ok(())
}

pub fn run_remove(args: RemoveArgs) -> Result<()> {
    let manager = open_manager()?;
    let removed = match Uuid::from_str(args.id.trim()) {
        Ok(id) => manager.delete(id).context("updating the session store")?,
        // A malformed identifier names nothing, which is a plain miss.
        Err(_) => false,
    };
    if !removed {
        bail!("no such session: {}", args.id);
    }
    println!("removed {}", args.id);
    Ok(())
}

pub async fn run_probe(args: ProbeArgs) -> Result<()> {
    let manager = open_manager()?;
    let usable = match (&args.id, &args.url) {
        (Some(id), None) => {
            let Some(session) = manager.open_session_raw(id) else {
                bail!("no such session: {id}");
            };
            session.test_usability().await.map_err(describe)?
        }
        (None, Some(url)) => {
            let (Some(kind), Some(secret)) = (&args.kind, &args.secret) else {
                bail!("--url needs --kind and --secret");
            };
            let kind = parse_kind(kind)?;
            let info = SessionInfo {
                session_id: Uuid::new_v4(),
                name: "probe".to_string(),
                kind,
                url: url.clone(),
                secret: secret.clone(),
                secret_param: String::new(),
                command_param: String::new(),
                marker: args.marker.clone(),
                note: None,
                created_at: Utc::now(),
            };
            let session = manager.session_for(info);
            session.test_usability().await.map_err(describe)?
        }
        (Some(_), Some(_)) => bail!("give either a session id or --url, not both"),
        (None, None) => bail!("give a session id or --url/--kind/--secret"),
    };
    println!("{}", if usable { "usable" } else { "not usable" });
    Ok(())
}

pub async fn run_exec(args: ExecArgs) -> Result<()> {
    let manager = open_manager()?;
    let Some(session) = manager.open_session_raw(&args.id) else {
        bail!("no such session: {}", args.id);
    };
    let output = session
        .execute_command(&args.command.join(" "))
        .await
        .map_err(describe)?;
    print!("{output}");
    Ok(())
}

pub async fn run_pwd(args: PwdArgs) -> Result<()> {
    let manager = open_manager()?;
    let Some(session) = manager.open_session_raw(&args.id) else {
        bail!("no such session: {}", args.id);
    };
    let cwd = session.working_directory().await.map_err(describe)?;
    println!("{cwd}");
    Ok(())
}

pub async fn run_ls(args: LsArgs) -> Result<()> {
    let manager = open_manager()?;
    let Some(session) = manager.open_session_raw(&args.id) else {
        bail!("no such session: {}", args.id);
    };
    let path = match &args.path {
        Some(raw) => RemotePath::parse(raw),
        None => session.working_directory().await.map_err(describe)?,
    };
    let entries = session.list_directory(&path).await.map_err(describe)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    println!("{}", RemotePath::parse(&args.current_dir).resolve(&args.entry));
    Ok(())
}

fn parse_kind(raw: &str) -> Result<ShellKind> {
    ShellKind::from_str(raw)
        .map_err(|_| anyhow::anyhow!("unknown shell kind `{raw}` (expected php, jsp or aspx)"))
}

fn format_entry(entry: &DirEntry) -> String {
    let marker = if entry.is_dir { "d" } else { "-" };
    let size = match entry.size {
        Some(size) => size.to_string(),
        None => "-".to_string(),
    };
    let modified = match entry.modified {
        Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    };
    format!("{marker}  {size:>12}  {modified:>16}  {}", entry.name)
}
