mod output;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;
use voxmail_client::api::{ChatMessage, ChatRequest, ProcessTextRequest};
use voxmail_client::resources::{
    AnalyticsOverview, MessageStats, NotificationSettings, Preferences, ProfilePatch, ShareRequest,
};
use voxmail_client::result_ext::ResultExt;
use voxmail_client::{
    AppContext, ChannelNotifier, ClientConfig, Credentials, MessageFilters, MessageStatus, NotificationKind,
    Registration, TimeRange, User,
};

use crate::output::{AnalyticsReport, SettingsReport};

#[ctor::ctor]
fn init() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Parser)]
#[command(name = "voxmail")]
#[command(version, about = "Voxmail Command Line Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides VOXMAIL_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Create an account and store the session
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        company: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged in user
    Whoami,

    /// Check that the API is reachable
    Health,

    /// Voice message inbox
    Messages {
        #[command(subcommand)]
        command: MessageCommand,
    },

    /// Account profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Message and response statistics
    Analytics {
        /// 7d, 30d, 90d or 1y
        #[arg(short, long, default_value = "7d")]
        range: TimeRange,
    },

    /// Notification settings and preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Subscription and payments
    Billing {
        #[command(subcommand)]
        command: BillingCommand,
    },

    /// Text processing and assistant chat
    Ai {
        #[command(subcommand)]
        command: AiCommand,
    },
}

#[derive(Subcommand)]
enum MessageCommand {
    /// List voice messages
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// pending, processed, responded, archived or trashed
        #[arg(short, long)]
        status: Option<MessageStatus>,

        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Keep reading until the last page
        #[arg(long)]
        all: bool,
    },

    /// Show one voice message
    Show { id: String },

    /// Save a response to a voice message
    Respond { id: String, text: String },

    /// Move a voice message to the archive
    Archive { id: String },

    /// Bring a voice message back to the inbox
    Restore { id: String },

    /// Move a voice message to the trash
    Trash { id: String },

    /// Delete a voice message for good
    Delete { id: String },

    /// Share a voice message by email
    Share {
        id: String,

        /// Recipient email (repeatable)
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,

        #[arg(short, long)]
        message: Option<String>,

        #[arg(long)]
        expires_in_days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,

    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        timezone: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
}

#[derive(Subcommand)]
enum BillingCommand {
    /// Current plan and renewal
    Status,

    /// Start a checkout for a plan and print the payment link
    Checkout { price_id: String },
}

#[derive(Subcommand)]
enum AiCommand {
    /// Rewrite, summarize or otherwise process a piece of text
    Process {
        text: String,

        #[arg(short, long)]
        instruction: Option<String>,

        #[arg(long)]
        tone: Option<String>,
    },

    /// Ask the assistant a question
    Chat {
        message: String,

        /// Voice message the question is about
        #[arg(long)]
        voice_message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    let (notifier, mut notifications) = ChannelNotifier::new();
    let ctx = AppContext::from_config_with(config, Arc::new(notifier))
        .log("create client context")
        .context("Failed to create client")?;
    ctx.hydration_gate().mount();
    tracing::debug!(authenticated = ctx.session().is_authenticated(), "Session restored");

    let result = run(&ctx, cli.command, cli.json).await;

    let mut reported = false;
    while let Ok(note) = notifications.try_recv() {
        reported |= note.kind == NotificationKind::Error;
        output::notification(&note);
    }

    if let Err(err) = result {
        if !reported {
            eprintln!("Error: {:#}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(ctx: &AppContext, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let user = ctx.auth().login(&Credentials { email, password }).await?;
            output::emit(json, &user, |u| println!("Logged in as {} <{}>", u.name, u.email))?;
        }
        Commands::Register {
            name,
            email,
            password,
            company,
        } => {
            let registration = Registration {
                name,
                email,
                password,
                company,
            };
            let user = ctx.auth().register(&registration).await?;
            output::emit(json, &user, |u| println!("Welcome, {}", u.name))?;
        }
        Commands::Logout => {
            ctx.auth().logout().await;
            if !json {
                println!("Logged out");
            }
        }
        Commands::Whoami => {
            let user = require_user(ctx)?;
            output::emit(json, &user, output::user)?;
        }
        Commands::Health => {
            let status = ctx.api().health().await?;
            output::emit(json, &status, |_| println!("API at {} is up", ctx.api().base_url()))?;
        }
        Commands::Messages { command } => {
            require_user(ctx)?;
            messages(ctx, command, json).await?;
        }
        Commands::Profile { command } => {
            require_user(ctx)?;
            profile(ctx, command, json).await?;
        }
        Commands::Analytics { range } => {
            require_user(ctx)?;
            let (overview, stats) = load_analytics(ctx, range).await?;
            let report = AnalyticsReport {
                overview: &overview,
                messages: &stats,
            };
            output::emit(json, &report, output::analytics)?;
        }
        Commands::Settings {
            command: SettingsCommand::Show,
        } => {
            require_user(ctx)?;
            let (notifications, preferences) = load_settings(ctx).await?;
            let report = SettingsReport {
                notifications: &notifications,
                preferences: &preferences,
            };
            output::emit(json, &report, output::settings)?;
        }
        Commands::Billing { command } => {
            require_user(ctx)?;
            let billing = ctx.billing();
            match command {
                BillingCommand::Status => {
                    let status = billing.subscription_status().await?;
                    output::emit(json, &status, output::subscription)?;
                }
                BillingCommand::Checkout { price_id } => {
                    let redirect = billing.create_checkout_session(&price_id).await?;
                    output::emit(json, &redirect, |r| {
                        println!("Complete your purchase at:\n{}", r.url)
                    })?;
                }
            }
        }
        Commands::Ai { command } => {
            require_user(ctx)?;
            let ai = ctx.ai();
            match command {
                AiCommand::Process {
                    text,
                    instruction,
                    tone,
                } => {
                    let request = ProcessTextRequest {
                        text,
                        instruction,
                        tone,
                    };
                    let response = ai.process_text(&request).await?;
                    output::emit(json, &response, |r| println!("{}", r.processed_text))?;
                }
                AiCommand::Chat {
                    message,
                    voice_message,
                } => {
                    let request = ChatRequest {
                        messages: vec![ChatMessage::user(message)],
                        voice_message_id: voice_message,
                    };
                    let response = ai.chat(&request).await?;
                    output::emit(json, &response, |r| println!("{}", r.reply))?;
                }
            }
        }
    }
    Ok(())
}

async fn messages(ctx: &AppContext, command: MessageCommand, json: bool) -> Result<()> {
    let messages = ctx.voice_messages();
    match command {
        MessageCommand::List {
            page,
            limit,
            status,
            search,
            all,
        } => {
            let filters = MessageFilters {
                page,
                limit,
                status,
                search,
            };
            let mut query = messages.list(filters);
            let mut current = query.fetch().await.into_result()?;
            output::emit(json, current.as_ref(), output::message_page)?;

            while all && current.has_next() {
                let next = query.params().next_page();
                current = query.set_params(next).await.into_result()?;
                output::emit(json, current.as_ref(), output::message_page)?;
            }
        }
        MessageCommand::Show { id } => {
            let message = messages.detail(&id).fetch().await.into_result()?;
            output::emit(json, message.as_ref(), output::message)?;
        }
        MessageCommand::Respond { id, text } => {
            let message = messages.update_response(&id, &text).await?;
            output::emit(json, &message, output::message)?;
        }
        MessageCommand::Archive { id } => messages.archive(&id).await?,
        MessageCommand::Restore { id } => messages.restore(&id).await?,
        MessageCommand::Trash { id } => messages.trash(&id).await?,
        MessageCommand::Delete { id } => messages.delete_permanently(&id).await?,
        MessageCommand::Share {
            id,
            recipients,
            message,
            expires_in_days,
        } => {
            let request = ShareRequest {
                recipients,
                message,
                expires_in_days,
            };
            let link = messages.share(&id, &request).await?;
            output::emit(json, &link, |l| println!("{}", l.url))?;
        }
    }
    Ok(())
}

async fn profile(ctx: &AppContext, command: ProfileCommand, json: bool) -> Result<()> {
    let profiles = ctx.profile();
    match command {
        ProfileCommand::Show => {
            let profile = profiles.get().fetch().await.into_result()?;
            output::emit(json, profile.as_ref(), output::profile)?;
        }
        ProfileCommand::Update {
            name,
            email,
            company,
            phone,
            bio,
            timezone,
        } => {
            let patch = ProfilePatch {
                name,
                email,
                company,
                phone,
                bio,
                timezone,
            };
            if serde_json::to_value(&patch)?.as_object().is_some_and(|o| o.is_empty()) {
                bail!("Nothing to update. Pass at least one of --name, --email, --company, --phone, --bio or --timezone");
            }
            let profile = profiles.update(&patch).await?;
            output::emit(json, &profile, output::profile)?;
        }
    }
    Ok(())
}

async fn load_analytics(
    ctx: &AppContext,
    range: TimeRange,
) -> Result<(Arc<AnalyticsOverview>, Arc<MessageStats>)> {
    let analytics = ctx.analytics();
    let overview = analytics.overview(range);
    let stats = analytics.message_stats(range);
    let (overview, stats) = tokio::join!(overview.fetch(), stats.fetch());
    Ok((overview.into_result()?, stats.into_result()?))
}

async fn load_settings(ctx: &AppContext) -> Result<(Arc<NotificationSettings>, Arc<Preferences>)> {
    let settings = ctx.settings();
    let notifications = settings.notifications();
    let preferences = settings.preferences();
    let (notifications, preferences) = tokio::join!(notifications.fetch(), preferences.fetch());
    Ok((notifications.into_result()?, preferences.into_result()?))
}

fn require_user(ctx: &AppContext) -> Result<User> {
    match ctx.session().user() {
        Some(user) if ctx.session().is_authenticated() => Ok(user),
        _ => bail!("Not logged in. Run `voxmail login` first."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use voxmail_client::MemoryStore;

    async fn context_for(router: Router) -> AppContext {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut config = ClientConfig::default();
        config.api.base_url = format!("http://{}", addr);
        let (notifier, _rx) = ChannelNotifier::new();
        AppContext::new(config, Arc::new(MemoryStore::new()), Arc::new(notifier)).unwrap()
    }

    #[tokio::test]
    async fn test_load_analytics_reads_both_views() {
        let router = Router::new()
            .route(
                "/analytics/overview",
                get(|Query(q): Query<std::collections::HashMap<String, String>>| async move {
                    let total = if q.get("range").map(String::as_str) == Some("30d") { 40 } else { 0 };
                    Json(json!({"totalMessages": total, "respondedMessages": 10}))
                }),
            )
            .route(
                "/analytics/messages",
                get(|| async { Json(json!({"series": [{"date": "2026-10-01", "received": 3}]})) }),
            );
        let ctx = context_for(router).await;

        let (overview, stats) = load_analytics(&ctx, TimeRange::Month).await.unwrap();
        assert_eq!(overview.total_messages, 40);
        assert_eq!(stats.series.len(), 1);
        assert_eq!(stats.series[0].received, 3);
    }

    #[tokio::test]
    async fn test_load_settings_reads_both_sections() {
        let router = Router::new()
            .route(
                "/settings/notifications",
                get(|| async { Json(json!({"emailNotifications": true, "pushNotifications": false})) }),
            )
            .route(
                "/settings/preferences",
                get(|| async { Json(json!({"language": "en", "timezone": "UTC"})) }),
            );
        let ctx = context_for(router).await;

        let (notifications, preferences) = load_settings(&ctx).await.unwrap();
        assert!(notifications.email_notifications);
        assert!(!notifications.push_notifications);
        assert_eq!(preferences.timezone, "UTC");
    }

    #[tokio::test]
    async fn test_load_settings_surfaces_server_error() {
        let router = Router::new().route(
            "/settings/notifications",
            get(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "settings unavailable"})),
                )
            }),
        );
        let ctx = context_for(router).await;

        let err = load_settings(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("settings unavailable"));
    }
}
