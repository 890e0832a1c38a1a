//! Chat dispatcher
//!
//! Turns normalized `ChatEvent`s into replies. Knows nothing about the
//! transport; the Telegram adapter renders `Reply` and its buttons.


use crate::error::BotError;
use crate::gate::RequestGate;
use crate::ledger::Ledger;
use crate::model::parse_query;
use crate::payments::{CheckoutService, Purchase};
use crate::types::{ChatEvent, ChatId, Sport, UserId};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// What a button does when pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Sent back to us as a `ChatEvent::Button`
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Text plus optional button rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    /// `/football <query>`; an empty query only selects the sport
    Analyze { sport: Sport, query: String },
    Balance,
    Vip,
    Buy,
    Unknown(String),
}

impl BotCommand {
    pub fn parse(name: &str, args: &str) -> Self {
        let name = name.trim_start_matches('/');
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        let args = args.trim().to_string();

        match name.as_str() {
            "start" => BotCommand::Start,
            "help" | "ajuda" => BotCommand::Help,
            "balance" | "saldo" => BotCommand::Balance,
            "vip" => BotCommand::Vip,
            "buy" | "comprar" => BotCommand::Buy,
            other => match other.parse::<Sport>() {
                Ok(sport) => BotCommand::Analyze { sport, query: args },
                Err(_) => BotCommand::Unknown(other.to_string()),
            },
        }
    }
}

/// Chats whose sport choice is remembered; the least recently chosen is
/// forgotten first
const DEFAULT_SELECTION_CAPACITY: usize = 10_000;

/// Sport picked from the menu, per chat
#[derive(Default)]
struct Selections {
    by_chat: HashMap<ChatId, (Sport, u64)>,
    next_seq: u64,
}

const PAYMENTS_UNAVAILABLE: &str = "⚠️ Payments are not available right now. Please try again later.";

pub struct ChatBot {
    gate: Arc<RequestGate>,
    ledger: Arc<dyn Ledger>,
    checkout: Option<Arc<CheckoutService>>,
    vip_days: i64,
    selected: RwLock<Selections>,
    selection_capacity: usize,
}

impl ChatBot {
    pub fn new(
        gate: Arc<RequestGate>,
        ledger: Arc<dyn Ledger>,
        checkout: Option<Arc<CheckoutService>>,
        vip_days: i64,
    ) -> Self {
        Self {
            gate,
            ledger,
            checkout,
            vip_days,
            selected: RwLock::new(Selections::default()),
            selection_capacity: DEFAULT_SELECTION_CAPACITY,
        }
    }

    pub fn with_selection_capacity(mut self, capacity: usize) -> Self {
        self.selection_capacity = capacity.max(1);
        self
    }

    pub fn selected_sport(&self, chat_id: ChatId) -> Option<Sport> {
        self.selected
            .read()
            .by_chat
            .get(&chat_id)
            .map(|(sport, _)| *sport)
    }

    fn select_sport(&self, chat_id: ChatId, sport: Sport) {
        let mut selected = self.selected.write();
        let full = selected.by_chat.len() >= self.selection_capacity;
        if full && !selected.by_chat.contains_key(&chat_id) {
            let oldest = selected
                .by_chat
                .iter()
                .min_by_key(|(_, (_, seq))| *seq)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                selected.by_chat.remove(&oldest);
            }
        }
        let seq = selected.next_seq;
        selected.next_seq += 1;
        selected.by_chat.insert(chat_id, (sport, seq));
    }

    pub async fn handle(&self, event: ChatEvent) -> Reply {
        match event {
            ChatEvent::Command {
                name,
                args,
                user_id,
                chat_id,
            } => {
                info!("Received command /{} from user {}", name, user_id);
                self.handle_command(BotCommand::parse(&name, &args), user_id, chat_id)
                    .await
            }
            ChatEvent::Text {
                text,
                user_id,
                chat_id,
            } => self.handle_text(&text, user_id, chat_id).await,
            ChatEvent::Button {
                data,
                user_id,
                chat_id,
            } => self.handle_button(&data, user_id, chat_id).await,
        }
    }

    async fn handle_command(&self, command: BotCommand, user_id: UserId, chat_id: ChatId) -> Reply {
        match command {
            BotCommand::Start => self.start(user_id).await,
            BotCommand::Help => Reply::text(help_text()),
            BotCommand::Analyze { sport, query } if query.is_empty() => {
                self.select_sport(chat_id, sport);
                Reply::text(sport_prompt(sport))
            }
            BotCommand::Analyze { sport, query } => {
                self.select_sport(chat_id, sport);
                self.analyze(user_id, sport, &query).await
            }
            BotCommand::Balance => self.balance(user_id).await,
            BotCommand::Vip => self.vip_offer(),
            BotCommand::Buy => self.credit_offer(),
            BotCommand::Unknown(name) => Reply::text(format!(
                "❓ Unknown command: /{}\nUse /help for available commands",
                name
            )),
        }
    }

    async fn handle_text(&self, text: &str, user_id: UserId, chat_id: ChatId) -> Reply {
        let sport = match self.selected_sport(chat_id) {
            Some(sport) => sport,
            // unprompted match queries are read as football
            None if parse_query(text).is_ok() => Sport::Football,
            None => {
                return Reply::text("👋 Pick a sport first, then send <code>TeamA x TeamB</code>.")
                    .with_buttons(main_menu())
            }
        };
        self.analyze(user_id, sport, text).await
    }

    async fn handle_button(&self, data: &str, user_id: UserId, chat_id: ChatId) -> Reply {
        let parts: Vec<&str> = data.split(':').collect();
        match parts.as_slice() {
            ["sport", sport] => match sport.parse::<Sport>() {
                Ok(sport) => {
                    self.select_sport(chat_id, sport);
                    Reply::text(sport_prompt(sport))
                }
                Err(_) => Reply::text("❓ Unknown option"),
            },
            ["menu", "balance"] => self.balance(user_id).await,
            ["menu", "vip"] => self.vip_offer(),
            ["menu", "buy"] => self.credit_offer(),
            ["buy", "vip"] => self.checkout(user_id, Purchase::Vip).await,
            ["buy", "credits", credits] => match credits.parse::<i64>() {
                Ok(credits) => self.checkout(user_id, Purchase::Credits { credits }).await,
                Err(_) => Reply::text("❓ Unknown option"),
            },
            _ => Reply::text("❓ Unknown option"),
        }
    }

    async fn start(&self, user_id: UserId) -> Reply {
        match self.ledger.get_or_create(user_id).await {
            Ok(user) => Reply::text(format!(
                "⚽🏀 <b>Welcome to GoalGuru!</b>\n\n\
                I compute match probabilities for football and basketball.\n\
                Pick a sport and send <code>TeamA x TeamB</code>.\n\n\
                Credits: <code>{}</code> (1 per analysis)",
                user.credits
            ))
            .with_buttons(main_menu()),
            Err(e) => failure_reply(user_id, e),
        }
    }

    async fn analyze(&self, user_id: UserId, sport: Sport, query: &str) -> Reply {
        match self.gate.analyze(user_id, sport, query).await {
            Ok(report) => Reply::text(report.text),
            Err(e @ BotError::InsufficientCredits(_)) => {
                Reply::text(e.user_message()).with_buttons(vec![vec![
                    Button::callback("⭐ VIP", "menu:vip"),
                    Button::callback("🛒 Buy credits", "menu:buy"),
                ]])
            }
            Err(e) => failure_reply(user_id, e),
        }
    }

    async fn balance(&self, user_id: UserId) -> Reply {
        let user = match self.ledger.get_or_create(user_id).await {
            Ok(user) => user,
            Err(e) => return failure_reply(user_id, e),
        };

        let now = Utc::now();
        let vip = if user.is_vip_active(now) {
            format!("active, {} days left", user.vip_days_left(now))
        } else {
            "inactive".to_string()
        };

        Reply::text(format!(
            "💰 <b>Your balance</b>\n\n\
            Credits: <code>{}</code>\n\
            VIP: {}",
            user.credits, vip
        ))
        .with_buttons(vec![vec![
            Button::callback("⭐ VIP", "menu:vip"),
            Button::callback("🛒 Buy credits", "menu:buy"),
        ]])
    }

    fn vip_offer(&self) -> Reply {
        let Some(checkout) = &self.checkout else {
            return Reply::text(PAYMENTS_UNAVAILABLE);
        };

        Reply::text(format!(
            "⭐ <b>GoalGuru VIP</b>\n\n\
            Unlimited analyses for {} days.\n\
            Price: <code>R$ {}</code>",
            self.vip_days,
            checkout.config().vip_price
        ))
        .with_buttons(vec![vec![Button::callback("⭐ Become VIP", "buy:vip")]])
    }

    fn credit_offer(&self) -> Reply {
        let Some(checkout) = &self.checkout else {
            return Reply::text(PAYMENTS_UNAVAILABLE);
        };

        let buttons = checkout
            .config()
            .credit_packs
            .iter()
            .map(|pack| {
                vec![Button::callback(
                    format!("{} credits - R$ {}", pack.credits, pack.price),
                    format!("buy:credits:{}", pack.credits),
                )]
            })
            .collect();

        Reply::text("🛒 <b>Buy credits</b>\n\nEach analysis costs 1 credit.").with_buttons(buttons)
    }

    async fn checkout(&self, user_id: UserId, purchase: Purchase) -> Reply {
        let Some(checkout) = &self.checkout else {
            return Reply::text(PAYMENTS_UNAVAILABLE);
        };

        match checkout.start(user_id, purchase).await {
            Ok(link) => Reply::text(
                "💳 Your checkout is ready. Credits or VIP are applied as soon as the payment is approved.",
            )
            .with_buttons(vec![vec![Button::url("💳 Pay now", link.url)]]),
            Err(e) => failure_reply(user_id, e),
        }
    }
}

fn failure_reply(user_id: UserId, e: BotError) -> Reply {
    if !e.is_user_facing() {
        error!("Request from user {} failed: {}", user_id, e);
    }
    Reply::text(e.user_message())
}

pub fn main_menu() -> Vec<Vec<Button>> {
    vec![
        vec![
            Button::callback("⚽ Football", "sport:football"),
            Button::callback("🏀 Basketball", "sport:basketball"),
        ],
        vec![
            Button::callback("💰 Balance", "menu:balance"),
            Button::callback("⭐ VIP", "menu:vip"),
        ],
        vec![Button::callback("🛒 Buy credits", "menu:buy")],
    ]
}

fn sport_prompt(sport: Sport) -> String {
    let example = match sport {
        Sport::Football => "Flamengo x Palmeiras",
        Sport::Basketball => "Lakers x Celtics",
    };
    format!(
        "{} Send the match as <code>TeamA x TeamB</code>\nExample: <code>{}</code>",
        sport.emoji(),
        example
    )
}

fn help_text() -> &'static str {
    r#"🤖 <b>GoalGuru Commands</b>

<b>Analysis</b>
/football &lt;TeamA x TeamB&gt; - Football probabilities
/basketball &lt;TeamA x TeamB&gt; - Basketball totals
Or pick a sport and just send <code>TeamA x TeamB</code>

<b>Account</b>
/balance - Credits and VIP status
/vip - Unlimited analyses
/buy - Buy credit packs

/help - Show this message"#
}
