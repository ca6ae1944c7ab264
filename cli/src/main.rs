//! tconsole — command-line console for the integration platform backend.
//!
//! Every command prints pretty JSON on stdout; logs go to stderr
//! (`RUST_LOG` controls verbosity). The session (token, active org and
//! project) lives in a JSON file between invocations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tenant_console::resources::apps::AppSearch;
use tenant_console::resources::execution_logs::ExecutionLogSearch;
use tenant_console::resources::linked_accounts::{LinkedAccountSearch, OAuth2LinkRequest};
use tenant_console::resources::mcp_servers::McpServerSearch;
use tenant_console::{
    ApiClient, BootstrapResolver, BootstrapState, ConsoleConfig, ContextStore,
    HttpMembershipSource, PageRequest, SessionContext, resolve_env_ref,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_TOKEN_ENV: &str = "TCONSOLE_TOKEN";

/// tconsole — tenant-scoped console for apps, keys, linked accounts and logs.
#[derive(Parser)]
#[command(name = "tconsole", version, about)]
struct Cli {
    /// Path to tconsole.toml [default: ./tconsole.toml or ~/.config/tconsole/tconsole.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Session file [default: ~/.config/tconsole/session.json]
    #[arg(long, global = true)]
    session: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or change the stored session
    #[command(subcommand)]
    Session(SessionCommand),
    /// Browse the app catalogue
    #[command(subcommand)]
    Apps(AppsCommand),
    /// API keys of the active project
    #[command(subcommand)]
    ApiKeys(ApiKeysCommand),
    /// Linked accounts of the active project
    #[command(subcommand)]
    LinkedAccounts(LinkedAccountsCommand),
    /// Function execution logs
    #[command(subcommand)]
    Logs(LogsCommand),
    /// MCP servers of the active project
    #[command(subcommand)]
    McpServers(McpServersCommand),
    /// Subscription of the active organization
    #[command(subcommand)]
    Billing(BillingCommand),
    /// Usage analytics of the active project
    #[command(subcommand)]
    Analytics(AnalyticsCommand),
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Print the session with the token masked
    Show,
    /// Store a bearer token and resolve the default organization
    Login {
        /// Environment variable holding the token [default: config reference or TCONSOLE_TOKEN]
        #[arg(long)]
        token_env: Option<String>,
    },
    /// Switch the active organization
    UseOrg { org_id: String },
    /// Switch the active project within the active organization
    UseProject { project_id: String },
    /// Forget the token, organization and projects
    Logout,
}

#[derive(Args)]
struct PageArgs {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    offset: Option<u32>,
}

impl PageArgs {
    fn page(&self) -> PageRequest {
        PageRequest {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Subcommand)]
enum AppsCommand {
    Search {
        #[arg(long)]
        search: Option<String>,
        /// Repeatable
        #[arg(long = "category")]
        categories: Vec<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    Categories,
    Get { name: String },
}

#[derive(Subcommand)]
enum ApiKeysCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
enum LinkedAccountsCommand {
    List {
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Print the URL that finishes an OAuth2 link
    Oauth2Url {
        #[arg(long)]
        app: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        redirect: Option<String>,
    },
}

#[derive(Subcommand)]
enum LogsCommand {
    Search {
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        function: Option<String>,
        /// RFC 3339 lower bound
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<DateTime<Utc>>,
        /// RFC 3339 upper bound
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<DateTime<Utc>>,
        #[command(flatten)]
        page: PageArgs,
    },
    Show { id: String },
}

#[derive(Subcommand)]
enum McpServersCommand {
    List {
        #[arg(long)]
        app_config: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
enum BillingCommand {
    Subscription,
}

#[derive(Subcommand)]
enum AnalyticsCommand {
    /// Executions per app over the last week, or per minute today
    AppUsage {
        #[arg(long)]
        timeseries: bool,
    },
    /// Executions per function over the last week, or per minute today
    FunctionUsage {
        #[arg(long)]
        timeseries: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config(cli.config)?;
    let config = load_config(&config_path).await?;
    let session_path = resolve_session_path(cli.session)?;
    let session = load_session(&session_path, &config)?;

    match cli.command {
        Commands::Session(command) => run_session(command, &config, &session, &session_path).await,
        command => {
            let client = ApiClient::new(&config, Arc::new(session.clone()))
                .context("Failed to build API client")?;
            run_resource(command, &client).await
        }
    }
}

async fn run_session(
    command: SessionCommand,
    config: &ConsoleConfig,
    session: &SessionContext,
    session_path: &Path,
) -> Result<()> {
    match command {
        SessionCommand::Show => {
            let mut snapshot = session.snapshot();
            snapshot.access_token = snapshot.access_token.map(|_| "********".to_string());
            print_json(&snapshot)
        }
        SessionCommand::Login { token_env } => {
            let reference = match token_env {
                Some(var) => format!("${{{}}}", var),
                None => config
                    .session
                    .access_token
                    .clone()
                    .unwrap_or_else(|| format!("${{{}}}", DEFAULT_TOKEN_ENV)),
            };
            let token = resolve_env_ref(&reference)
                .with_context(|| format!("No token found in {}", reference))?;
            session.set_access_token(Some(token.clone()));
            resolve_login_org(config, session, &token).await?;
            session.save(session_path)?;
            tracing::info!(path = %session_path.display(), "Session saved");
            print_json(&serde_json::json!({
                "active_org_id": session.active_org_id(),
            }))
        }
        SessionCommand::UseOrg { org_id } => {
            session.set_active_org(Some(org_id));
            session.save(session_path)?;
            print_json(&session.snapshot().active_org_id)
        }
        SessionCommand::UseProject { project_id } => {
            let org_id = session
                .active_org_id()
                .context("No active organization; run `session use-org` first")?;
            session.set_active_project(&org_id, project_id);
            session.save(session_path)?;
            print_json(&session.active_project_id(&org_id))
        }
        SessionCommand::Logout => {
            session.clear();
            session.save(session_path)?;
            print_json(&serde_json::Value::Null)
        }
    }
}

/// How `session login` settled the active organization.
#[derive(Debug, PartialEq, Eq)]
enum OrgResolution {
    /// No memberships endpoint configured; nothing was looked up.
    NotConfigured,
    Resolved(Option<String>),
    /// The endpoint never listed a membership within the attempt budget.
    Pending,
}

async fn resolve_login_org(
    config: &ConsoleConfig,
    session: &SessionContext,
    token: &str,
) -> Result<OrgResolution> {
    let Some(url) = &config.bootstrap.memberships_url else {
        tracing::info!(
            "bootstrap.memberships_url not set; no organization resolved, use `session use-org`"
        );
        return Ok(OrgResolution::NotConfigured);
    };

    let source = HttpMembershipSource::new(config, url, token)?;
    let outcome = BootstrapResolver::from_config(&config.bootstrap)
        .resolve(&source)
        .await;
    if outcome.state == BootstrapState::Resolved {
        let org_id = session.adopt_first_org(&outcome.organizations);
        tracing::info!(org_id = ?org_id, "Organization resolved");
        Ok(OrgResolution::Resolved(org_id))
    } else {
        tracing::warn!("No organization provisioned yet; run `session login` again shortly");
        Ok(OrgResolution::Pending)
    }
}

async fn run_resource(command: Commands, client: &ApiClient) -> Result<()> {
    match command {
        Commands::Apps(AppsCommand::Search {
            search,
            categories,
            page,
        }) => {
            let filter = AppSearch {
                search,
                categories,
                page: page.page(),
            };
            print_json(&client.apps().search(&filter).await?)
        }
        Commands::Apps(AppsCommand::Categories) => print_json(&client.apps().categories().await?),
        Commands::Apps(AppsCommand::Get { name }) => print_json(&client.apps().get(&name).await?),
        Commands::ApiKeys(ApiKeysCommand::List { page }) => {
            print_json(&client.api_keys().list(page.page()).await?)
        }
        Commands::LinkedAccounts(LinkedAccountsCommand::List { app, owner, page }) => {
            let filter = LinkedAccountSearch {
                app_name: app,
                linked_account_owner_id: owner,
                page: page.page(),
            };
            print_json(&client.linked_accounts().list(&filter).await?)
        }
        Commands::LinkedAccounts(LinkedAccountsCommand::Oauth2Url {
            app,
            owner,
            redirect,
        }) => {
            let request = OAuth2LinkRequest {
                app_name: app,
                linked_account_owner_id: owner,
                after_oauth2_link_redirect_url: redirect,
            };
            print_json(&client.linked_accounts().oauth2_link_url(&request).await?)
        }
        Commands::Logs(LogsCommand::Search {
            app,
            function,
            since,
            until,
            page,
        }) => {
            let filter = ExecutionLogSearch {
                start_time: since,
                end_time: until,
                app_name: app,
                function_name: function,
                page: page.page(),
                ..Default::default()
            };
            print_json(&client.execution_logs().search(&filter).await?)
        }
        Commands::Logs(LogsCommand::Show { id }) => {
            let id = id.parse().context("Log id must be a UUID")?;
            print_json(&client.execution_logs().get(id).await?)
        }
        Commands::McpServers(McpServersCommand::List { app_config, page }) => {
            let app_config_id = app_config
                .map(|id| id.parse())
                .transpose()
                .context("--app-config must be a UUID")?;
            let filter = McpServerSearch {
                app_config_id,
                auth_type: None,
                page: page.page(),
            };
            print_json(&client.mcp_servers().search(&filter).await?)
        }
        Commands::Billing(BillingCommand::Subscription) => {
            print_json(&client.billing().subscription().await?)
        }
        Commands::Analytics(AnalyticsCommand::AppUsage { timeseries }) => {
            let analytics = client.analytics();
            if timeseries {
                print_json(&analytics.app_usage_timeseries().await?)
            } else {
                print_json(&analytics.app_usage_distribution().await?)
            }
        }
        Commands::Analytics(AnalyticsCommand::FunctionUsage { timeseries }) => {
            let analytics = client.analytics();
            if timeseries {
                print_json(&analytics.function_usage_timeseries().await?)
            } else {
                print_json(&analytics.function_usage_distribution().await?)
            }
        }
        Commands::Session(_) => Ok(()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {}", e))
}

/// Resolve config file path: explicit flag → ./tconsole.toml → ~/.config/tconsole/tconsole.toml.
fn resolve_config(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let local = Path::new("tconsole.toml");
    if local.exists() {
        return Ok(local.to_path_buf());
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("tconsole").join("tconsole.toml");
        if xdg.exists() {
            return Ok(xdg);
        }
    }

    Err(anyhow::anyhow!(
        "No tconsole.toml found. Searched ./tconsole.toml and ~/.config/tconsole/tconsole.toml. \
         Use --config to specify a path."
    ))
}

fn resolve_session_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("tconsole").join("session.json"))
        .context("No config directory on this platform; use --session to specify a path")
}

/// Load and validate a tconsole.toml config file.
async fn load_config(config_path: &Path) -> Result<ConsoleConfig> {
    let content = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", config_path, e))?;
    let config: ConsoleConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", config_path, e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config file {:?}: {}", config_path, e))?;
    Ok(config)
}

/// Load the stored session, seeding empty slots from `[session]` config.
fn load_session(path: &Path, config: &ConsoleConfig) -> Result<SessionContext> {
    let session = SessionContext::load(path)
        .with_context(|| format!("Failed to read session file {:?}", path))?;

    if session.access_token().is_none() {
        if let Some(token) = config.session.access_token.as_deref().and_then(resolve_env_ref) {
            session.set_access_token(Some(token));
        }
    }
    if session.active_org_id().is_none() {
        if let Some(org_id) = &config.session.org_id {
            session.set_active_org(Some(org_id.clone()));
            if let Some(project_id) = &config.session.project_id {
                session.set_active_project(org_id, project_id.clone());
            }
        }
    }
    Ok(session)
}
