//! Scripted end-to-end flows: a smoke test and a conversation-database walkthrough.

use anyhow::Context as _;
use parley_core::ids::short_id;
use parley_core::models::Metadata;
use parley_core::{ConversationClient, MessageInput, NewUser, DEFAULT_LAST_N};

fn metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}

/// Shopping conversation used by the smoke test.
pub fn smoke_messages() -> Vec<MessageInput> {
    vec![
        MessageInput::user("Hi! I'm looking for running shoes. I love Nike."),
        MessageInput::assistant(
            "Great! I can help you find Nike running shoes. What's your budget?",
        ),
        MessageInput::user("Around $100-150. I need them for marathon training."),
        MessageInput::assistant(
            "Perfect! I recommend the Nike Air Zoom Pegasus 40 for $120. It's excellent for marathon training.",
        ),
    ]
}

/// Health → user → session → memory write → memory read. Stops at the first failure.
pub async fn run_smoke(client: &ConversationClient) -> anyhow::Result<()> {
    println!("🚀 Starting memory service smoke test");
    println!("{}", "=".repeat(50));

    println!("🔍 Checking service health...");
    client.health().await.context("health check failed")?;
    println!("✅ Service is healthy!");

    let user_id = short_id("test-user");
    println!("\n👤 Creating test user {}...", user_id);
    let user = client
        .create_user(
            &NewUser::new(&user_id)
                .email("test@example.com")
                .first_name("Test")
                .last_name("User"),
        )
        .await
        .context("failed to create user")?;
    println!("✅ User created: {}", user.user_id);

    let requested = short_id("test-session");
    println!("\n💬 Creating session for user {}...", user_id);
    let session_id = client
        .create_session(&user_id, Some(requested.as_str()), None)
        .await
        .context("failed to create session")?;
    println!("✅ Session created: {}", session_id);

    println!("\n🧠 Adding memory to session {}...", session_id);
    client
        .add_message_batch(&session_id, &smoke_messages())
        .await
        .context("failed to add memory")?;
    println!("✅ Memory added successfully!");

    println!("\n🔍 Retrieving memory from session {}...", session_id);
    let snapshot = client
        .get_context(&session_id, DEFAULT_LAST_N)
        .await
        .context("failed to retrieve memory")?;
    println!("✅ Memory retrieved successfully!");
    println!("📝 Messages: {}", snapshot.message_count());
    println!("🧠 Facts: {}", snapshot.relevant_facts.len());

    println!("\n🎉 All checks passed!");
    println!("📊 Summary:");
    println!("   - User ID: {}", user_id);
    println!("   - Session ID: {}", session_id);
    println!("   - Messages stored: {}", snapshot.message_count());
    println!("   - Facts extracted: {}", snapshot.relevant_facts.len());
    Ok(())
}

/// Two support conversations for one user, then context, summary and listing.
pub async fn run_demo(client: &ConversationClient) -> anyhow::Result<()> {
    println!("🗄️  Conversation Database Demo");
    println!("{}", "=".repeat(50));

    let user_id = short_id("user");
    println!("👤 Creating user: {}", user_id);
    let user = client
        .create_user(
            &NewUser::new(&user_id)
                .email("john.doe@example.com")
                .first_name("John")
                .last_name("Doe")
                .metadata(metadata(&[("department", "Engineering"), ("role", "Developer")])),
        )
        .await?;
    println!("✅ User created: {}", user.user_id);

    let support_session = client
        .create_session(
            &user_id,
            None,
            Some(metadata(&[("topic", "Technical Support"), ("priority", "High")])),
        )
        .await?;
    println!("💬 Created conversation: {}", support_session);

    println!("\n📝 Adding conversation about technical issue...");
    let now = || client.clock().now();
    let support = vec![
        MessageInput::user(
            "Hi, I'm having trouble with the API integration. The authentication is failing.",
        )
        .with_timestamp(now()),
        MessageInput::assistant(
            "I can help you with the API authentication issue. What error message are you seeing?",
        )
        .with_timestamp(now()),
        MessageInput::user(
            "I'm getting a 401 Unauthorized error when trying to authenticate with the API key.",
        )
        .with_timestamp(now()),
        MessageInput::assistant(
            "A 401 error usually means the API key is invalid or expired. Let me check your account status and help you generate a new key.",
        )
        .with_timestamp(now()),
        MessageInput::user("That would be great. I'm using the key that was generated last week.")
            .with_timestamp(now()),
        MessageInput::assistant(
            "I see the issue. Your API key expired yesterday. I've generated a new one for you. Please update your integration code.",
        )
        .with_timestamp(now())
        .with_metadata("action", "generated_new_key"),
    ];
    client.add_message_batch(&support_session, &support).await?;
    println!("✅ Conversation added successfully!");

    println!("\n📝 Adding conversation about feature request...");
    let feature_session = client
        .create_session(
            &user_id,
            None,
            Some(metadata(&[("topic", "Feature Request"), ("priority", "Medium")])),
        )
        .await?;
    let feature = vec![
        MessageInput::user(
            "I'd like to request a new feature for the dashboard. Can we add real-time notifications?",
        )
        .with_timestamp(now()),
        MessageInput::assistant(
            "That's a great suggestion! Real-time notifications would improve user experience. What type of notifications are you thinking about?",
        )
        .with_timestamp(now()),
        MessageInput::user(
            "I want to be notified when new data is uploaded, when processing is complete, and when there are any errors.",
        )
        .with_timestamp(now()),
        MessageInput::assistant(
            "Perfect! I'll add this to our feature backlog. We can implement WebSocket-based notifications for these events.",
        )
        .with_timestamp(now())
        .with_metadata("action", "added_to_backlog"),
    ];
    client.add_message_batch(&feature_session, &feature).await?;
    println!("✅ Feature request conversation added!");

    println!("\n🔍 Retrieving context for session: {}", support_session);
    let context = client.get_context(&support_session, DEFAULT_LAST_N).await?;
    let context_text: String = context
        .context
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or("No context available")
        .chars()
        .take(100)
        .collect();
    println!("📊 Context retrieved:");
    println!("   - Messages: {}", context.message_count());
    println!("   - Facts: {}", context.relevant_facts.len());
    println!("   - Context summary: {}...", context_text);

    println!("\n📋 Conversation Summary for {}:", support_session);
    let summary = client.get_conversation_summary(&support_session).await?;
    println!("   - Message count: {}", summary.message_count);
    println!("   - Relevant facts: {}", summary.relevant_facts.len());
    println!("   - Retrieved at: {}", summary.retrieved_at.to_rfc3339());

    println!("\n📚 All conversations for user {}:", user_id);
    let sessions = client.get_user_sessions(&user_id).await?;
    for s in &sessions {
        println!(
            "   - {}: {}",
            s.session_id,
            s.metadata_str("topic").unwrap_or("No topic")
        );
    }

    let mut total_messages = 0;
    for s in &sessions {
        total_messages += client
            .get_context(&s.session_id, DEFAULT_LAST_N)
            .await?
            .message_count();
    }

    println!("\n🎉 Conversation database demo completed!");
    println!("📊 Summary:");
    println!("   - User: {}", user_id);
    println!("   - Conversations: {}", sessions.len());
    println!("   - Total messages: {}", total_messages);
    Ok(())
}
