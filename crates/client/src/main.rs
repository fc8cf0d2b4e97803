use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use client::{
    App, AppConfig,
    proxy_client::{DEFAULT_PROXY_URL, HttpCodeProxy},
    session::SessionState,
};
use db::DBService;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use services::services::{
    catalog::Component, firebase_auth::FirebaseAuthClient, history_store::SqliteHistoryStore,
};

const AUTH_TIMEOUT: Duration = Duration::from_secs(30);
const GENERATION_TIMEOUT: Duration = Duration::from_secs(300);
const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "codegen", about = "Generate microcontroller code for electronics components")]
struct Cli {
    /// URL of the generate-code proxy endpoint
    #[arg(long, env = "CODEGEN_PROXY_URL", default_value = DEFAULT_PROXY_URL, global = true)]
    proxy_url: String,

    /// Namespace for stored history
    #[arg(long, env = "CODEGEN_APP_ID", default_value = "default-app-id", global = true)]
    app_id: String,

    /// Firebase web API key used for sign-in
    #[arg(long, env = "FIREBASE_API_KEY", default_value = "", hide_env_values = true, global = true)]
    firebase_api_key: String,

    /// History database location
    #[arg(long, env = "CODEGEN_DATABASE_URL", default_value = "sqlite://codegen-history.db", global = true)]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported components
    Components,
    /// Generate code for a component
    Generate(GenerateArgs),
    /// Show saved history for an account
    History(LoginArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Component name from the catalog; prompts when omitted
    #[arg(long)]
    component: Option<String>,
    /// What the component should do; prompts when omitted
    #[arg(long)]
    description: Option<String>,
    /// Generation model override
    #[arg(long)]
    model: Option<String>,
    #[command(flatten)]
    login: OptionalLogin,
}

#[derive(Args, Debug)]
struct OptionalLogin {
    /// Sign in with this email to save the result
    #[arg(long)]
    email: Option<String>,
    /// Password; prompts when omitted
    #[arg(long, env = "CODEGEN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Create the account instead of signing in
    #[arg(long, requires = "email")]
    sign_up: bool,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "CODEGEN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::logging::init_tracing_stderr("warn");
    let cli = Cli::parse();

    match &cli.command {
        Command::Components => {
            for component in Component::all() {
                println!("{component}");
            }
            Ok(())
        }
        Command::Generate(args) => generate(&cli, args).await,
        Command::History(args) => history(&cli, args).await,
    }
}

async fn build_app(cli: &Cli) -> anyhow::Result<App> {
    let auth = FirebaseAuthClient::from_env(cli.firebase_api_key.clone())
        .context("failed to create auth client")?;
    let db = DBService::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open {}", cli.database_url))?;
    let proxy = HttpCodeProxy::new(cli.proxy_url.clone()).context("failed to create proxy client")?;

    let mut app = App::new(
        AppConfig {
            app_id: cli.app_id.clone(),
        },
        Arc::new(auth),
        Arc::new(SqliteHistoryStore::new(db)),
        Arc::new(proxy),
    );
    app.start();
    if !app
        .run_until(AUTH_TIMEOUT, |app| !app.session().is_loading() && !app.is_auth_busy())
        .await
    {
        bail!("timed out waiting for a session");
    }
    Ok(app)
}

async fn sign_in(app: &mut App, email: &str, password: Option<&str>, sign_up: bool) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => Password::new()
            .with_prompt(format!("Password for {email}"))
            .interact()?,
    };

    if sign_up {
        app.sign_up(email, &password);
    } else {
        app.sign_in(email, &password);
    }

    let settled = app
        .run_until(AUTH_TIMEOUT, |app| {
            app.auth_error().is_some()
                || (!app.is_auth_busy() && app.session().is_authenticated())
        })
        .await;
    if let Some(e) = app.auth_error() {
        bail!("{e}");
    }
    if !settled {
        bail!("timed out waiting for sign-in");
    }
    Ok(())
}

fn pick_component(requested: Option<&str>) -> anyhow::Result<Component> {
    if let Some(name) = requested {
        return Component::from_name(name).with_context(|| {
            format!("unknown component {name:?}; run `codegen components` for the list")
        });
    }
    let all = Component::all();
    let names: Vec<&str> = all.iter().map(|c| c.name()).collect();
    let index = Select::new()
        .with_prompt("Component")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(all[index])
}

async fn generate(cli: &Cli, args: &GenerateArgs) -> anyhow::Result<()> {
    let component = pick_component(args.component.as_deref())?;
    let description = match &args.description {
        Some(d) => d.clone(),
        None => Input::<String>::new()
            .with_prompt("What should it do?")
            .interact_text()?,
    };

    let mut app = build_app(cli).await?;
    if let Some(email) = &args.login.email {
        sign_in(&mut app, email, args.login.password.as_deref(), args.login.sign_up).await?;
    }
    if let SessionState::Unauthenticated { .. } = app.session() {
        eprintln!("warning: running without a session; results will not be saved");
    }

    app.set_component(component);
    app.set_description(description);
    app.set_model(args.model.clone());
    app.submit()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Generating code for {component}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let finished = app
        .run_until(GENERATION_TIMEOUT, |app| {
            !app.generation().busy && !app.generation().pending_write
        })
        .await;
    spinner.finish_and_clear();

    let view = app.view();
    print!("{}", view.render_text());
    generation_outcome(finished, view.error.as_deref())
}

/// Errors are already rendered; this only sets the exit status. Must return
/// rather than exit so `App` is dropped and its subscriptions close.
fn generation_outcome(finished: bool, error: Option<&str>) -> anyhow::Result<()> {
    if !finished {
        bail!("timed out waiting for the generation to finish");
    }
    if error.is_some() {
        bail!("generation failed");
    }
    Ok(())
}

async fn history(cli: &Cli, args: &LoginArgs) -> anyhow::Result<()> {
    let mut app = build_app(cli).await?;
    sign_in(&mut app, &args.email, args.password.as_deref(), false).await?;

    let loaded = app
        .run_until(HISTORY_TIMEOUT, |app| app.history().has_snapshot())
        .await;
    if !loaded {
        bail!("timed out waiting for history");
    }

    print!("{}", app.view().render_history_text());
    Ok(())
}
