use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex as AsyncMutex;
use tracing_subscriber::EnvFilter;

use portal_client::environment::init_env_settings;
use portal_client::reauth::{PromptOutcome, PromptSubmission, ReauthPrompt};
use portal_client::session::Region;
use portal_client::view::{MessageTone, StatusLine};
use portal_client::{
    ClientPatch, Portal, PortalContext, Recommendation, ReqwestTransport, SessionState,
    SignInOutcome, SubmitOutcome,
};

type InputLines = Arc<AsyncMutex<Lines<BufReader<Stdin>>>>;
type TerminalPortal = Portal<ReqwestTransport, TerminalPrompt>;

const DESCRIPTION_LIMIT: usize = 320;

/// Reauth overlay rendered as an inline question on the terminal.
struct TerminalPrompt {
    input: InputLines,
}

impl TerminalPrompt {
    async fn ask(&self, label: &str) -> Option<String> {
        print!("{}", label);
        let _ = std::io::stdout().flush();
        let mut lines = self.input.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => Some(line.trim_end().to_string()),
            _ => None,
        }
    }

    async fn collect(&self) -> PromptOutcome {
        let Some(email) = self.ask("  email (blank to cancel): ").await else {
            return PromptOutcome::Cancelled;
        };
        if email.trim().is_empty() {
            return PromptOutcome::Cancelled;
        }
        let Some(password) = self.ask("  password: ").await else {
            return PromptOutcome::Cancelled;
        };
        PromptOutcome::Submitted(PromptSubmission::new(email.trim(), password))
    }
}

#[async_trait]
impl ReauthPrompt for TerminalPrompt {
    async fn open(&self, reason: &str) -> PromptOutcome {
        println!("[auth] {}", reason);
        self.collect().await
    }

    async fn reject(&self, message: &str) -> PromptOutcome {
        println!("[auth] {}", message);
        self.collect().await
    }

    fn close(&self) {
        println!("[auth] prompt closed");
    }
}

enum Flow {
    Continue,
    Quit,
}

fn main() -> Result<()> {
    let settings = init_env_settings()
        .context("Failed to initialize settings")?
        .clone();
    init_logging(&settings.log_level());

    let root = std::env::var_os("PORTAL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".portal"));
    let context = PortalContext::initialize(root, settings)
        .context("Failed to initialize portal context")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(context))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portal_client={},portal={}", level, level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(context: PortalContext) -> Result<()> {
    let input: InputLines = Arc::new(AsyncMutex::new(
        BufReader::new(tokio::io::stdin()).lines(),
    ));
    let portal = context.connect(TerminalPrompt {
        input: input.clone(),
    })?;

    let state = portal.start().await;
    println!(
        "portal client for {} ({})",
        context.config().network.base_url,
        describe_state(&state)
    );
    println!("type `help` for commands");
    render(&portal);

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let line = {
            let mut lines = input.lock().await;
            lines.next_line().await?
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match execute(&portal, line).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) => println!("error: {}", err),
        }
        render(&portal);
    }
    Ok(())
}

async fn execute(portal: &TerminalPortal, line: &str) -> Result<Flow> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match command {
        "help" => print_help(),
        "quit" | "exit" => return Ok(Flow::Quit),
        "state" => println!("{}", describe_state(&portal.state())),
        "signin" => {
            let (email, password) = pair(&args);
            report_sign_in(portal.sign_in(email, password).await);
        }
        "signup" => {
            let (email, password) = pair(&args);
            report_sign_in(portal.sign_up(email, password).await);
        }
        "login" => {
            let (login, password) = pair(&args);
            report_sign_in(portal.login(login, password).await);
        }
        "resume" => println!("{}", describe_state(&portal.resume_session().await)),
        "logout" => portal.sign_out().await,
        "forget" => portal.forget_credentials(),
        "balance" => {
            portal.refresh_balance().await;
        }
        "topup" => {
            portal.set_top_up_input(args.first().copied().unwrap_or_default());
            report_submit(portal.top_up().await);
        }
        "predict" => report_submit(portal.predict(&args.join(" ")).await),
        "tg" => telegram(portal, &args).await?,
        "dashboard" => {
            let dashboard = portal.client_page().dashboard().await?;
            println!("client #{}", dashboard.client.user_id);
            if let Some(manager) = dashboard.manager {
                println!(
                    "manager: {} {}",
                    manager.first_name.unwrap_or_default(),
                    manager.last_name.unwrap_or_default()
                );
            }
            match dashboard.score {
                Some(score) => println!("score: {:.4} ({})", score.score, score.timestamp),
                None => println!("score: -"),
            }
        }
        "score" => {
            let score = portal.client_page().rescore().await?;
            println!("score: {:.4} ({})", score.score, score.timestamp);
        }
        "credit" => match portal.client_page().credit().await? {
            Some(credit) => println!(
                "credit #{}: {:.2} at {:.2}% ({} payments)",
                credit.id,
                credit.amount_total,
                credit.annual_rate,
                credit.payment_history.len()
            ),
            None => println!("no credit on record"),
        },
        "clients" => {
            let clients = portal.manager_page().clients(wants_all(&args)).await?;
            if clients.is_empty() {
                println!("Empty");
            }
            for client in clients {
                println!(
                    "#{}  age={}  occ={}  income={}  manager_id={}",
                    client.user_id,
                    client.age_group.as_deref().unwrap_or("-"),
                    client.occupation_type.as_deref().unwrap_or("-"),
                    client
                        .amt_income_total
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".into()),
                    client
                        .manager_id
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".into()),
                );
            }
        }
        "summary" => {
            for row in portal.manager_page().summaries(wants_all(&args)).await? {
                println!("#{}  {} {}", row.user_id, row.first_name, row.last_name);
            }
        }
        "client" => {
            let detail = portal.manager_page().client(client_id(&args)?).await?;
            println!(
                "#{} {} {} ({})",
                detail.client.user_id,
                detail.user.first_name,
                detail.user.last_name,
                detail.user.login
            );
        }
        "client-score" => match portal.manager_page().score(client_id(&args)?).await? {
            Some(score) => println!("score: {:.4} ({})", score.score, score.timestamp),
            None => println!("score: -"),
        },
        "rescore" => {
            let score = portal.manager_page().rescore(client_id(&args)?).await?;
            println!("score: {:.4} ({})", score.score, score.timestamp);
        }
        "update" => {
            let id = client_id(&args)?;
            let patch = parse_patch(&args[1..])?;
            let updated = portal.manager_page().update_client(id, &patch).await?;
            println!("updated client #{}", updated.user_id);
        }
        other => println!("unknown command `{}`", other),
    }
    Ok(Flow::Continue)
}

async fn telegram(portal: &TerminalPortal, args: &[&str]) -> Result<()> {
    match args.first().copied() {
        Some("status") | None => portal.refresh_telegram_status().await,
        Some("link") => {
            portal
                .link_telegram(&args[1..].join(" "))
                .await?;
        }
        Some("unlink") => portal.unlink_telegram().await?,
        Some(other) => bail!("unknown telegram action `{}`", other),
    }
    Ok(())
}

// missing halves are reported by the portal's own validation
fn pair<'a>(args: &[&'a str]) -> (&'a str, &'a str) {
    (
        args.first().copied().unwrap_or_default(),
        args.get(1).copied().unwrap_or_default(),
    )
}

fn client_id(args: &[&str]) -> Result<i64> {
    args.first()
        .ok_or_else(|| anyhow!("client id required"))?
        .parse()
        .context("client id must be a number")
}

fn wants_all(args: &[&str]) -> bool {
    args.first().map(|a| *a == "all").unwrap_or(false)
}

fn parse_patch(args: &[&str]) -> Result<ClientPatch> {
    let mut fields = Map::new();
    for arg in args {
        let (key, raw) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value, got `{}`", arg))?;
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }
    serde_json::from_value(Value::Object(fields)).context("invalid client fields")
}

fn report_sign_in(outcome: SignInOutcome) {
    if let SignInOutcome::SignedIn {
        redirect: Some(redirect),
        ..
    } = outcome
    {
        println!("landing page: {}", redirect);
    }
}

fn report_submit(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Ignored => println!("still processing the previous request"),
        SubmitOutcome::Discarded => println!("session ended before the request finished"),
        _ => {}
    }
}

fn describe_state(state: &SessionState) -> String {
    match state {
        SessionState::Anonymous => "signed out".to_string(),
        SessionState::Authenticated(identity) => match &identity.role {
            Some(role) => format!("signed in as {} ({})", identity.name, role),
            None => format!("signed in as {}", identity.name),
        },
        SessionState::Reauthenticating(_) => "waiting for sign-in".to_string(),
    }
}

fn status(line: &StatusLine) {
    if line.is_empty() {
        return;
    }
    let marker = match line.tone {
        MessageTone::Info => "i",
        MessageTone::Success => "+",
        MessageTone::Error => "!",
    };
    println!("  [{}] {}", marker, line.text);
}

fn render(portal: &TerminalPortal) {
    let display = portal.display();
    let regions = portal.visible_regions();

    if regions.contains(&Region::AuthStatus) {
        println!("  {}", describe_state(&portal.state()));
    }
    status(&display.auth_message);

    if regions.contains(&Region::BalanceCard) {
        println!("  balance: {}", display.balance_text());
        status(&display.balance_message);
    }

    if regions.contains(&Region::PredictionControls) {
        status(&display.prediction_message);
        for recommendation in &display.recommendations {
            print_recommendation(recommendation);
        }
    }

    if regions.contains(&Region::TelegramControls) {
        if let Some(text) = &display.telegram_status {
            println!("  {}", text);
        }
        if let Some(token) = &display.telegram_token {
            println!("  {}", token);
        }
    }
}

fn print_recommendation(item: &Recommendation) {
    let year = match &item.year {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    };
    println!("  * {} ({})", item.title.as_deref().unwrap_or("-"), year);
    if let Some(description) = &item.description {
        let short: String = description.chars().take(DESCRIPTION_LIMIT).collect();
        println!("    {}", short);
    }
    if !item.genres.is_empty() {
        println!("    [{}]", item.genres.join(", "));
    }
}

fn print_help() {
    println!(
        "\
commands:
  signin <email> <password>    sign in with an email/password pair
  signup <email> <password>    create an account and sign in
  login <login> <password>     cookie login for the client/manager pages
  resume                       check the cookie session with the backend
  logout                       sign out and clear stored credentials
  forget                       remove stored credentials, stay signed in
  balance                      refresh the balance
  topup <amount>               add funds to the signed-in account
  predict <text>               ask for recommendations (charged)
  tg [status|link <phone>|unlink]
  dashboard | score | credit   client pages
  clients [all] | summary [all] | client <id> | client-score <id>
  rescore <id> | update <id> field=value...
  state | help | quit"
    );
}
