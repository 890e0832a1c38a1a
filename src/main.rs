//! GoalGuru Sports Probability Bot
//!
//! Football and basketball match probabilities over Telegram, with a
//! credit/VIP ledger and Mercado Pago checkout.

use clap::{Parser, Subcommand};
use goalguru_bot::{
    bot::ChatBot,
    client::{ApiFootballClient, MercadoPagoClient},
    config::Config,
    gate::RequestGate,
    model::{parse_query, Forecast, ProbabilityEngine},
    payments::{CheckoutService, PaymentReconciler, PaymentWebhookHandler},
    server::{start_server, AppState},
    stats::{ProfileResolver, StaticRatings},
    storage::Database,
    telegram::TelegramBot,
    types::{parse_external_reference, Sport},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "goalguru-bot")]
#[command(about = "Football and basketball probability bot with a credit/VIP ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (webhooks, admin stats)
    Run {
        /// Also long-poll Telegram for updates instead of relying on the webhook
        #[arg(long)]
        polling: bool,
    },
    /// Forecast a match offline, without touching the ledger
    Analyze {
        /// football | basketball
        sport: String,
        /// Match query, e.g. "Flamengo x Palmeiras"
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Show a user's credits and VIP status
    Balance {
        user_id: i64,
    },
    /// Manually confirm an approved payment by external reference
    Confirm {
        reference: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { polling } => run_bot(config, polling).await,
        Commands::Analyze { sport, query } => analyze_match(config, &sport, &query.join(" ")).await,
        Commands::Balance { user_id } => show_balance(config, user_id).await,
        Commands::Confirm { reference } => confirm_payment(config, &reference).await,
    }
}

fn build_resolver(config: &Config) -> anyhow::Result<ProfileResolver> {
    let mut resolver = ProfileResolver::new(Duration::from_millis(config.stats.timeout_ms))
        .with_provider(Sport::Basketball, Arc::new(StaticRatings::new()));

    match &config.stats.football_api_key {
        Some(key) if !key.is_empty() => {
            let client = ApiFootballClient::new(&config.stats, key.clone())?;
            resolver = resolver.with_provider(Sport::Football, Arc::new(client));
        }
        _ => tracing::warn!("No API-Football key configured, football uses league averages"),
    }

    Ok(resolver)
}

async fn open_database(config: &Config) -> anyhow::Result<Arc<Database>> {
    let db = Database::connect(&config.database)
        .await?
        .with_initial_credits(config.ledger.initial_credits);
    Ok(Arc::new(db))
}

async fn run_bot(config: Config, polling: bool) -> anyhow::Result<()> {
    tracing::info!("Starting GoalGuru bot");

    let db = open_database(&config).await?;
    let gate = Arc::new(RequestGate::new(
        db.clone(),
        db.clone(),
        build_resolver(&config)?,
        ProbabilityEngine::new(&config.engine),
        config.ledger.analysis_cost,
    ));
    let reconciler = Arc::new(PaymentReconciler::new(db.clone(), config.ledger.vip_days));

    let (checkout, webhook) = match &config.payments {
        Some(payments) => {
            let processor = Arc::new(MercadoPagoClient::new(payments)?);
            let checkout = Arc::new(CheckoutService::new(
                processor.clone(),
                db.clone(),
                payments.clone(),
                config.ledger.vip_days,
            ));
            let webhook = Arc::new(PaymentWebhookHandler::new(
                processor,
                reconciler.clone(),
                payments.webhook_secret.clone(),
                Duration::from_millis(payments.timeout_ms),
            ));
            (Some(checkout), Some(webhook))
        }
        None => {
            tracing::warn!("Payments not configured, /vip and /buy are disabled");
            (None, None)
        }
    };

    let bot = Arc::new(ChatBot::new(
        gate,
        db.clone(),
        checkout,
        config.ledger.vip_days,
    ));

    let telegram = match &config.telegram {
        Some(tg) => Some(Arc::new(TelegramBot::new(tg, bot.clone())?)),
        None => {
            tracing::warn!("Telegram not configured, chat is disabled");
            None
        }
    };

    if polling {
        match &telegram {
            Some(telegram) => {
                let telegram = telegram.clone();
                tokio::spawn(async move {
                    telegram.start_polling().await;
                });
                tracing::info!("Telegram long polling started");
            }
            None => tracing::warn!("--polling ignored: Telegram is not configured"),
        }
    }

    let state = Arc::new(AppState {
        db: db.clone(),
        telegram,
        payments: webhook,
        admin_token: config.server.admin_token.clone(),
    });

    tokio::select! {
        result = start_server(state, &config.server.bind) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    db.close().await;
    Ok(())
}

async fn analyze_match(config: Config, sport: &str, query: &str) -> anyhow::Result<()> {
    let sport: Sport = sport.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let pair = parse_query(query)?;
    let resolver = build_resolver(&config)?;
    let (home, away) = resolver.resolve_pair(sport, &pair).await;
    let forecast = ProbabilityEngine::new(&config.engine).forecast(sport, &home, &away)?;

    println!("\n{} {} x {}\n", sport.emoji(), home.team_name, away.team_name);
    match forecast {
        Forecast::Football(f) => {
            println!("Expected goals: {:.2} - {:.2}", f.lambda_home, f.lambda_away);
            println!("\nResult:");
            println!("  {} win = {:.1}%", f.home_team, f.home_win * 100.0);
            println!("  Draw = {:.1}%", f.draw * 100.0);
            println!("  {} win = {:.1}%", f.away_team, f.away_win * 100.0);
            println!("\nGoals:");
            for (line, p) in &f.overs {
                println!("  Over {:.1} = {:.1}%", line, p * 100.0);
            }
            println!("  Both teams score = {:.1}%", f.both_teams_score * 100.0);
            println!(
                "\nMost likely score: {}-{} ({:.2}%)",
                f.most_likely_score.0,
                f.most_likely_score.1,
                f.most_likely_probability * 100.0
            );
        }
        Forecast::Basketball(b) => {
            println!("Projected: {:.1} - {:.1}", b.expected_home, b.expected_away);
            println!("Expected total: {:.1} pts", b.expected_total);
            println!("Spread: {:+.1}", b.spread);
            println!("\nTotals:");
            for (threshold, p) in &b.overs {
                println!("  Over {:.0} = {:.1}%", threshold, p * 100.0);
            }
        }
    }

    Ok(())
}

async fn show_balance(config: Config, user_id: i64) -> anyhow::Result<()> {
    let db = open_database(&config).await?;

    match db.find_user(user_id).await? {
        Some(user) => {
            let now = chrono::Utc::now();
            println!("\n💰 User {}\n", user.id);
            println!("Credits: {}", user.credits);
            if user.is_vip_active(now) {
                println!("VIP: active, {} days left", user.vip_days_left(now));
            } else {
                println!("VIP: inactive");
            }
            println!("Analyses: {}", db.count_analyses(user_id).await?);
            for analysis in db.recent_analyses(user_id, 5).await? {
                println!(
                    "  {} {} {}",
                    analysis.created_at.format("%Y-%m-%d %H:%M"),
                    analysis.sport,
                    analysis.query
                );
            }
            println!("Payments:");
            for payment in db.payments_for(user_id).await? {
                println!(
                    "  {} {} R$ {} ({})",
                    payment.external_reference,
                    payment.kind.as_str(),
                    payment.amount,
                    payment.status.as_str()
                );
            }
        }
        None => println!("User {} not found", user_id),
    }

    db.close().await;
    Ok(())
}

async fn confirm_payment(config: Config, reference: &str) -> anyhow::Result<()> {
    let Some((kind, user_id, _)) = parse_external_reference(reference) else {
        anyhow::bail!(
            "malformed reference {:?}, expected <vip|credits>-<user_id>-<millis>",
            reference
        );
    };
    println!("Confirming {} payment for user {}", kind.as_str(), user_id);

    let db = open_database(&config).await?;
    let reconciler = PaymentReconciler::new(db.clone(), config.ledger.vip_days);

    let outcome = reconciler.confirm(reference, true).await?;
    println!("{}: {:?}", reference, outcome);

    db.close().await;
    Ok(())
}
