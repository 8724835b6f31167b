use std::time::Duration;

use chrono::Local;
use rand::{seq::SliceRandom, RngCore};

use crate::{
    calc::{self, Number},
    stats::StatsSnapshot,
};

use super::{CommandKind, Invocation};

pub const HELP_TEXT: &str = "🤖 **AI Bot Commands**

**Basic Commands:**
• !help - Show this help message
• !ping - Test bot responsiveness
• !time - Show current server time
• !status - Display bot status

**Utility Commands:**
• !calc <expression> - Simple calculator
• !weather <city> - Weather information (demo)
• !joke - Tell a random joke
• !quote - Inspirational quote

**Information Commands:**
• !rooms - List bot's rooms
• !stats - Show bot statistics

**Chat naturally with me for AI responses!** 💬
";

const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything! 😄",
    "Why did the robot go to therapy? It had too many bits and bytes! 🤖",
    "What do you call a Matrix server that tells jokes? A stand-up homeserver! 😂",
    "Why don't databases ever get lonely? They're always in relationships! 💾",
    "What's a bot's favorite type of music? Algo-rhythms! 🎵",
];

const QUOTES: &[&str] = &[
    "\"The future belongs to those who believe in the beauty of their dreams.\" - Eleanor Roosevelt",
    "\"Innovation distinguishes between a leader and a follower.\" - Steve Jobs",
    "\"The only way to do great work is to love what you do.\" - Steve Jobs",
    "\"Technology is best when it brings people together.\" - Matt Mullenweg",
    "\"The advance of technology is based on making it fit in so that you don't really even notice it.\" - Bill Gates",
];

/// Room ids longer than this are abbreviated in `!rooms`.
const ROOM_ID_PREVIEW: usize = 20;

pub(super) fn run(kind: CommandKind, inv: &Invocation<'_>, rng: &mut dyn RngCore) -> String {
    match kind {
        CommandKind::Help => HELP_TEXT.to_string(),
        CommandKind::Ping => format!("🏓 Pong! Bot is responsive and ready, {}!", inv.sender),
        CommandKind::Time => format!(
            "🕐 Current server time: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S %Z")
        ),
        CommandKind::Status => status(&inv.state.stats.snapshot()),
        CommandKind::Stats => stats(&inv.state.stats.snapshot()),
        CommandKind::Rooms => rooms(inv),
        CommandKind::Joke => pick(JOKES, rng).to_string(),
        CommandKind::Quote => format!("💭 {}", pick(QUOTES, rng)),
        CommandKind::Weather => weather(inv.args),
        CommandKind::Calc => calculate(inv.args),
    }
}

fn pick(items: &[&'static str], rng: &mut dyn RngCore) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn status(s: &StatsSnapshot) -> String {
    format!(
        "🤖 **AI Bot Status**

**System Information:**
• Status: Online and ready! ✅
• Uptime: {:.1} hours

**Statistics:**
• Messages sent: {}
• Commands processed: {}
• Rooms joined: {}
",
        s.uptime.as_secs_f64() / 3600.0,
        s.messages_sent,
        s.commands_processed,
        s.rooms_joined,
    )
}

fn stats(s: &StatsSnapshot) -> String {
    format!(
        "📊 **Detailed Bot Statistics**

**Activity Metrics:**
• Total messages sent: {}
• Commands processed: {}
• Rooms joined: {}

**System Metrics:**
• Uptime: {}
",
        s.messages_sent,
        s.commands_processed,
        s.rooms_joined,
        format_duration(s.uptime),
    )
}

fn format_duration(d: Duration) -> String {
    let seconds = d.as_secs();
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        return format!("{hours}h {mins}m {secs}s");
    }
    if mins > 0 {
        return format!("{mins}m {secs}s");
    }
    format!("{secs}s")
}

fn rooms(inv: &Invocation<'_>) -> String {
    let table = &inv.state.rooms;
    if table.is_empty() {
        return "📋 I'm not in any rooms yet (or haven't synced recently).".to_string();
    }

    let mut out = String::from("📋 **Rooms I'm in:**\n\n");
    for (room_id, info) in table.iter() {
        let name = info.name.as_deref().unwrap_or("Unknown Room");
        let id: String = room_id.0.chars().take(ROOM_ID_PREVIEW).collect();
        let ellipsis = if room_id.0.chars().count() > ROOM_ID_PREVIEW {
            "..."
        } else {
            ""
        };
        out.push_str(&format!(
            "• {name}\n  ID: {id}{ellipsis}\n  Since: {}\n\n",
            info.first_seen.format("%Y-%m-%d %H:%M")
        ));
    }
    out
}

fn weather(args: &str) -> String {
    let city = if args.trim().is_empty() {
        "your city"
    } else {
        args.trim()
    };
    format!(
        "🌤️ Weather in {city}: 22°C, Partly cloudy\n(This is a demo response - integrate with a real weather API for production!)"
    )
}

fn calculate(args: &str) -> String {
    let expr = args.trim();
    if expr.is_empty() {
        return "🧮 Usage: !calc <expression>\nExample: !calc 2 + 2".to_string();
    }

    match calc::evaluate(expr) {
        Ok(v) => format!("🧮 {expr} = {}", Number(v)),
        Err(e) => format!("❌ Invalid expression: {expr} ({e})\nTry something like: 2 + 2 or 10 * 5"),
    }
}
