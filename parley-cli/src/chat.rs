//! Minimal chat application that stores every turn in the memory service.
//!
//! Failures inside the loop print a diagnostic and abort only the current
//! command; the session keeps running.

use std::io::Write;

use parley_core::ids::short_id;
use parley_core::models::Metadata;
use parley_core::{
    ClientError, ConversationClient, ConversationSummary, Message, MessageInput, NewUser, Role,
    SessionSummary, User,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Messages fetched for `/history`; the last `HISTORY_SHOWN` are printed.
const HISTORY_LIMIT: u32 = 10;
const HISTORY_SHOWN: usize = 5;

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    New(Option<String>),
    History,
    Summary,
    List,
    Help,
    Quit,
    Say(String),
    Empty,
}

pub fn parse_line(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    if !line.starts_with('/') {
        return ChatCommand::Say(line.to_string());
    }

    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };
    match cmd {
        "/new" => ChatCommand::New(Some(rest.to_string()).filter(|t| !t.is_empty())),
        "/history" => ChatCommand::History,
        "/summary" => ChatCommand::Summary,
        "/list" => ChatCommand::List,
        "/quit" | "/exit" => ChatCommand::Quit,
        _ => ChatCommand::Help,
    }
}

/// Assistant reply for interactive chat.
pub fn canned_reply(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if ["hello", "hi", "hey"].iter().any(|g| lower.starts_with(g)) {
        "Hello! How can I help you today?"
    } else if lower.contains("help") {
        "I'm here to help! What do you need assistance with?"
    } else if lower.contains("thank") {
        "You're welcome! Is there anything else I can help with?"
    } else {
        "I understand. Can you tell me more about that?"
    }
}

/// Assistant reply for the scripted support conversation, if any.
pub fn scripted_reply(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("trouble") || lower.contains("can't") {
        Some("I'm sorry to hear you're having trouble. Let me help you with that.")
    } else if lower.contains("404") {
        Some("A 404 error usually means the page doesn't exist. Let me check your account status.")
    } else if lower.contains("cache") {
        Some("Good troubleshooting step! Let me try a different approach to resolve this.")
    } else if lower.contains("thank") {
        Some("You're welcome! I've reset your account permissions. Try logging in again now.")
    } else {
        None
    }
}

pub struct ChatApp {
    client: ConversationClient,
    current_user: Option<User>,
    current_session: Option<String>,
}

impl ChatApp {
    pub fn new(client: ConversationClient) -> Self {
        Self {
            client,
            current_user: None,
            current_session: None,
        }
    }

    /// Log in as `user_id`, creating the user if the service does not know it.
    pub async fn login(
        &mut self,
        user_id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<&User, ClientError> {
        let user = match self.client.find_user(user_id).await? {
            Some(user) => {
                println!("✅ Welcome back, {}!", user.display_name());
                user
            }
            None => {
                let email = email
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}@example.com", user_id));
                let new_user = NewUser::new(user_id)
                    .email(email)
                    .first_name(name.unwrap_or(user_id));
                let user = self.client.create_user(&new_user).await?;
                println!("✅ New user created: {}", user.display_name());
                user
            }
        };
        Ok(&*self.current_user.insert(user))
    }

    pub async fn start_conversation(&mut self, topic: Option<&str>) -> Result<String, ClientError> {
        let user_id = self.require_user()?.user_id.clone();

        let mut metadata = Metadata::new();
        if let Some(topic) = topic {
            metadata.insert("topic".to_string(), topic.into());
        }
        metadata.insert(
            "started_at".to_string(),
            self.client.clock().now().to_rfc3339().into(),
        );

        let session_id = self
            .client
            .create_session(&user_id, None, Some(metadata))
            .await?;
        println!("💬 Started new conversation: {}", session_id);
        if let Some(topic) = topic {
            println!("📝 Topic: {}", topic);
        }
        self.current_session = Some(session_id.clone());
        Ok(session_id)
    }

    pub async fn send(&self, role: Role, content: &str) -> Result<(), ClientError> {
        let session_id = self.require_session()?;
        let message = MessageInput::new(role, content).with_timestamp(self.client.clock().now());
        self.client.add_message(session_id, message).await?;
        let preview: String = content.chars().take(50).collect();
        println!("✅ Message sent: {}...", preview);
        Ok(())
    }

    pub async fn history(&self) -> Result<Vec<Message>, ClientError> {
        let session_id = self.require_session()?;
        let snapshot = self.client.get_context(session_id, HISTORY_LIMIT).await?;
        Ok(snapshot.messages)
    }

    pub async fn summary(&self) -> Result<ConversationSummary, ClientError> {
        let session_id = self.require_session()?;
        self.client.get_conversation_summary(session_id).await
    }

    pub async fn conversations(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let user = self.require_user()?;
        self.client.get_user_sessions(&user.user_id).await
    }

    fn require_user(&self) -> Result<&User, ClientError> {
        self.current_user
            .as_ref()
            .ok_or_else(|| ClientError::InvalidArgument("please log in first".to_string()))
    }

    fn require_session(&self) -> Result<&str, ClientError> {
        self.current_session
            .as_deref()
            .ok_or_else(|| {
                ClientError::InvalidArgument(
                    "no active conversation, start one with /new".to_string(),
                )
            })
    }
}

fn print_help() {
    println!("\nCommands:");
    println!("  /new [topic]  start a conversation");
    println!("  /history      show recent messages");
    println!("  /summary      summarise the conversation");
    println!("  /list         list your conversations");
    println!("  /quit         exit");
    println!("Anything else is sent as a message.");
}

fn print_history(messages: &[Message]) {
    if messages.is_empty() {
        println!("No conversation history available");
        return;
    }
    println!("\n📜 Conversation History:");
    let start = messages.len().saturating_sub(HISTORY_SHOWN);
    for (i, m) in messages[start..].iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, m.speaker().to_uppercase(), m.content);
        println!("     Time: {}", m.timestamp().unwrap_or("unknown"));
    }
}

fn print_summary(summary: &ConversationSummary) {
    println!("\n📊 Conversation Summary:");
    println!("   - Session ID: {}", summary.session_id);
    println!("   - Message count: {}", summary.message_count);
    println!("   - Facts: {}", summary.relevant_facts.len());
    println!("   - Retrieved at: {}", summary.retrieved_at.to_rfc3339());
}

fn print_conversations(sessions: &[SessionSummary]) {
    if sessions.is_empty() {
        println!("No conversations found");
        return;
    }
    println!("\n📚 Your Conversations ({}):", sessions.len());
    for (i, s) in sessions.iter().enumerate() {
        println!(
            "  {}. {} - {} ({})",
            i + 1,
            s.session_id,
            s.metadata_str("topic").unwrap_or("No topic"),
            s.created_at.as_deref().unwrap_or("Unknown date")
        );
    }
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()
}

pub async fn run_interactive(
    client: ConversationClient,
    user_id: Option<String>,
    name: Option<String>,
    email: Option<String>,
) -> anyhow::Result<()> {
    println!("💬 Simple Chat Application");
    println!("{}", "=".repeat(50));

    let user_id = user_id.unwrap_or_else(|| short_id("user"));
    let mut app = ChatApp::new(client);
    if let Err(e) = app.login(&user_id, name.as_deref(), email.as_deref()).await {
        println!("❌ Login failed: {}", e);
        return Ok(());
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("\n> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Help => print_help(),
            ChatCommand::Quit => {
                println!("👋 Goodbye!");
                break;
            }
            ChatCommand::New(topic) => {
                if let Err(e) = app.start_conversation(topic.as_deref()).await {
                    println!("❌ Failed to start conversation: {}", e);
                }
            }
            ChatCommand::History => match app.history().await {
                Ok(messages) => print_history(&messages),
                Err(e) => println!("❌ Failed to get history: {}", e),
            },
            ChatCommand::Summary => match app.summary().await {
                Ok(summary) => print_summary(&summary),
                Err(e) => println!("❌ Failed to get summary: {}", e),
            },
            ChatCommand::List => match app.conversations().await {
                Ok(sessions) => print_conversations(&sessions),
                Err(e) => println!("❌ Failed to list conversations: {}", e),
            },
            ChatCommand::Say(text) => {
                if let Err(e) = app.send(Role::User, &text).await {
                    println!("❌ Failed to send message: {}", e);
                    continue;
                }
                if let Err(e) = app.send(Role::Assistant, canned_reply(&text)).await {
                    println!("❌ Failed to send message: {}", e);
                }
            }
        }
    }

    Ok(())
}

/// Scripted support conversation.
pub async fn run_automated(client: ConversationClient) -> anyhow::Result<()> {
    println!("🤖 Automated Chat Application Demo");
    println!("{}", "=".repeat(40));

    let mut app = ChatApp::new(client);
    app.login(&short_id("demo-user"), Some("Demo User"), Some("demo@example.com"))
        .await?;
    app.start_conversation(Some("Technical Support")).await?;

    let script = [
        "Hi, I'm having trouble with my account",
        "I can't access my dashboard",
        "I'm getting a 404 error when I try to log in",
        "I've tried clearing my cache but it didn't help",
        "Thank you for your help!",
    ];

    println!("\n💬 Simulating conversation...");
    for line in script {
        if let Err(e) = app.send(Role::User, line).await {
            println!("❌ Failed to send message: {}", e);
            continue;
        }
        if let Some(reply) = scripted_reply(line) {
            if let Err(e) = app.send(Role::Assistant, reply).await {
                println!("❌ Failed to send message: {}", e);
            }
        }
    }

    println!("\n📊 Conversation Results:");
    match app.summary().await {
        Ok(summary) => {
            println!("   - Messages: {}", summary.message_count);
            println!("   - Facts: {}", summary.relevant_facts.len());
        }
        Err(e) => println!("❌ Failed to get summary: {}", e),
    }
    match app.conversations().await {
        Ok(sessions) => println!("   - Total conversations: {}", sessions.len()),
        Err(e) => println!("❌ Failed to list conversations: {}", e),
    }

    println!("\n🎉 Demo completed!");
    Ok(())
}
