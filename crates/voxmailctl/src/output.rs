use anyhow::Result;
use serde::Serialize;
use voxmail_client::api::SubscriptionStatus;
use voxmail_client::resources::{
    AnalyticsOverview, MessageStats, NotificationSettings, Preferences, Profile, VoiceMessage,
};
use voxmail_client::{Notification, NotificationKind, Page, User};

/// Print `value` as pretty JSON with `--json`, through `human` otherwise.
pub fn emit<T: Serialize + ?Sized>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

pub fn notification(note: &Notification) {
    match note.kind {
        NotificationKind::Success => eprintln!("✓ {}", note.message),
        NotificationKind::Error => eprintln!("✗ {}", note.message),
    }
}

pub fn user(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!("  ID:           {}", user.id);
    if let Some(company) = &user.company {
        println!("  Company:      {}", company);
    }
    println!("  Role:         {:?}", user.role);
    println!("  Subscription: {:?}", user.subscription_tier);
}

pub fn message_page(page: &Page<VoiceMessage>) {
    if page.items.is_empty() {
        println!("No voice messages");
        return;
    }
    println!("{:<26} {:<10} {:<17} {}", "ID", "STATUS", "RECEIVED", "TITLE");
    for message in &page.items {
        println!(
            "{:<26} {:<10} {:<17} {}",
            message.id,
            message.status,
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.title
        );
    }
    println!(
        "Page {} of {} ({} messages)",
        page.page,
        page.total_pages().max(1),
        page.total
    );
}

pub fn message(message: &VoiceMessage) {
    println!("{}", message.title);
    println!("  ID:       {}", message.id);
    println!("  Status:   {}", message.status);
    println!("  Received: {}", message.created_at.format("%Y-%m-%d %H:%M"));
    match (&message.sender_name, &message.sender_email) {
        (Some(name), Some(email)) => println!("  From:     {} <{}>", name, email),
        (Some(name), None) => println!("  From:     {}", name),
        (None, Some(email)) => println!("  From:     {}", email),
        (None, None) => {}
    }
    if let Some(duration) = message.duration {
        println!("  Length:   {:.0}s", duration);
    }
    if let Some(transcript) = &message.transcript {
        println!("\nTranscript:\n{}", transcript);
    }
    if let Some(response) = &message.response {
        println!("\nResponse:\n{}", response);
    }
}

pub fn profile(profile: &Profile) {
    println!("{} <{}>", profile.name, profile.email);
    let fields = [
        ("Company", &profile.company),
        ("Phone", &profile.phone),
        ("Timezone", &profile.timezone),
        ("Bio", &profile.bio),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<9} {}", format!("{}:", label), value);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport<'a> {
    pub overview: &'a AnalyticsOverview,
    pub messages: &'a MessageStats,
}

pub fn analytics(report: &AnalyticsReport<'_>) {
    let overview = report.overview;
    println!("Messages:      {}", overview.total_messages);
    println!("Responded:     {}", overview.responded_messages);
    println!("Pending:       {}", overview.pending_messages);
    println!("Response rate: {:.1}%", overview.response_rate() * 100.0);
    if let Some(avg) = overview.average_response_time {
        println!("Avg response:  {:.0} min", avg / 60.0);
    }
    println!("Audio:         {:.0} min", overview.total_duration / 60.0);

    if !report.messages.series.is_empty() {
        println!("\n{:<12} {:>8} {:>9}", "DATE", "RECEIVED", "RESPONDED");
        for day in &report.messages.series {
            println!("{:<12} {:>8} {:>9}", day.date, day.received, day.responded);
        }
    }
}

#[derive(Serialize)]
pub struct SettingsReport<'a> {
    pub notifications: &'a NotificationSettings,
    pub preferences: &'a Preferences,
}

pub fn settings(report: &SettingsReport<'_>) {
    let n = report.notifications;
    println!("Notifications");
    println!("  Email:        {}", on_off(n.email_notifications));
    println!("  Push:         {}", on_off(n.push_notifications));
    println!("  New messages: {}", on_off(n.new_message_alerts));
    println!("  Weekly digest: {}", on_off(n.weekly_digest));

    let p = report.preferences;
    println!("Preferences");
    println!("  Language:     {}", p.language);
    println!("  Timezone:     {}", p.timezone);
    println!("  Theme:        {:?}", p.theme);
    println!("  Transcribe:   {}", on_off(p.auto_transcribe));
}

pub fn subscription(status: &SubscriptionStatus) {
    println!("Plan:   {:?}", status.tier);
    println!("Status: {:?}", status.status);
    if let Some(end) = status.current_period_end {
        let verb = if status.cancel_at_period_end { "Ends" } else { "Renews" };
        println!("{}:  {}", verb, end.format("%Y-%m-%d"));
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
