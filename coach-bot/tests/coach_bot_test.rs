//! End-to-end tests of the assembled handler chain: commands and plain text, driven with fake
//! messages against a recording bot and queued LLM replies.

mod common;

use std::sync::Arc;

use coach_bot::commands::{CLEAR_CONFIRMATION, CLEAR_SWEEP, EMPTY_DOSSIER};
use coach_bot::{build_coach_bot, create_session_store, CoachBot, SessionStoreType, MSG_TURN_FAILED};
use common::{
    drain, messages, script, test_config, text_message, BotEvent, MockBot, QueuedLlm, Script,
    BOT_NAME, CHAT_ID,
};
use dbot_core::HandlerResponse;
use prompt::{MessageRole, CONTROL_TOKEN};
use storage::{SessionStore, Turn};
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    coach: CoachBot,
    llm: Arc<QueuedLlm>,
    rx: UnboundedReceiver<BotEvent>,
}

fn harness_with_store(store: SessionStore, scripts: Vec<Script>) -> Harness {
    let config = test_config(SessionStoreType::Memory, "");
    let llm = QueuedLlm::new(scripts);
    let (bot, rx) = MockBot::with_receiver();
    let coach = build_coach_bot(&config, store, llm.clone(), bot);
    Harness { coach, llm, rx }
}

fn harness(scripts: Vec<Script>) -> Harness {
    harness_with_store(SessionStore::in_memory(), scripts)
}

/// **Test: Plain text is appended and answered paragraph by paragraph.**
#[tokio::test]
async fn test_plain_text_is_relayed() {
    let mut h = harness(vec![script(
        &["Nice to meet you, Alex!\n\n", "What brings you here?"],
        "stop",
    )]);

    let response = h.coach.chain.handle(&text_message("I'm Alex")).await.unwrap();

    assert_eq!(response, HandlerResponse::Stop);
    assert_eq!(
        drain(&mut h.rx),
        vec![
            BotEvent::Typing(CHAT_ID),
            BotEvent::Message(CHAT_ID, "Nice to meet you, Alex!".to_string()),
            BotEvent::Typing(CHAT_ID),
            BotEvent::Message(CHAT_ID, "What brings you here?".to_string()),
        ]
    );
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(
        session.messages,
        vec![
            Turn::user("I'm Alex"),
            Turn::assistant("Nice to meet you, Alex!\n\nWhat brings you here?"),
        ]
    );
}

/// **Test: /start replaces the history with the greeting and keeps the facts.**
#[tokio::test]
async fn test_start_resets_history_with_greeting() {
    let store = SessionStore::in_memory();
    store.append(CHAT_ID, Turn::user("old question")).await.unwrap();
    store.append(CHAT_ID, Turn::assistant("old answer")).await.unwrap();
    store
        .set_facts(CHAT_ID, "- Name: Alex (she/her)".to_string())
        .await
        .unwrap();
    let mut h = harness_with_store(store, vec![script(&["Welcome back, Alex!"], "stop")]);

    h.coach.chain.handle(&text_message("/start")).await.unwrap();

    assert_eq!(messages(&drain(&mut h.rx)), vec!["Welcome back, Alex!"]);
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(
        session.messages,
        vec![
            Turn::user(format!("Hi {}!", BOT_NAME)),
            Turn::assistant("Welcome back, Alex!"),
        ]
    );
    assert_eq!(session.facts.as_deref(), Some("- Name: Alex (she/her)"));

    let requests = h.llm.requests();
    let request = &requests[0];
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::System);
    assert!(request[0].content.starts_with(&format!("You are {}", BOT_NAME)));
    assert!(request[0].content.ends_with("\n\n- Name: Alex (she/her)"));
    assert_eq!(request[1].content, format!("Hi {}!", BOT_NAME));
}

/// **Test: /start addressed to the bot by username is recognised.**
#[tokio::test]
async fn test_start_with_bot_suffix() {
    let mut h = harness(vec![script(&["Hello!"], "stop")]);

    h.coach
        .chain
        .handle(&text_message("/start@MarvinCoachBot"))
        .await
        .unwrap();

    assert_eq!(messages(&drain(&mut h.rx)), vec!["Hello!"]);
    assert_eq!(h.llm.requests().len(), 1);
}

/// **Test: /dossier stores the facts, drops the placeholder and sends the dossier once.**
#[tokio::test]
async fn test_dossier_stores_and_sends_facts() {
    let store = SessionStore::in_memory();
    store.append(CHAT_ID, Turn::user("I'm Alex, she/her")).await.unwrap();
    store.append(CHAT_ID, Turn::assistant("Hi Alex!")).await.unwrap();
    let dossier = "- Name: Alex (she/her)\n\n- Runs a bakery";
    let mut h = harness_with_store(
        store,
        vec![script(&["- Name: Alex (she/her)\n\n", "- Runs a bakery"], "stop")],
    );

    h.coach.chain.handle(&text_message("/dossier")).await.unwrap();

    assert_eq!(
        drain(&mut h.rx),
        vec![
            BotEvent::Typing(CHAT_ID),
            BotEvent::Message(CHAT_ID, dossier.to_string()),
        ]
    );
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(session.facts.as_deref(), Some(dossier));
    assert_eq!(session.messages.len(), 2);
    assert!(session.messages.iter().all(|t| !t.is_control()));

    let requests = h.llm.requests();
    let request = &requests[0];
    assert_eq!(request.last().map(|m| m.content.as_str()), Some(CONTROL_TOKEN));
}

/// **Test: An empty dossier is answered with a notice instead of an empty message.**
#[tokio::test]
async fn test_dossier_empty_reply_sends_notice() {
    let mut h = harness(vec![script(&[], "stop")]);

    h.coach.chain.handle(&text_message("/dossier")).await.unwrap();

    assert_eq!(messages(&drain(&mut h.rx)), vec![EMPTY_DOSSIER]);
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(session.facts.as_deref(), Some(""));
    assert!(session.messages.is_empty());
}

/// **Test: A failed /dossier removes the placeholder, keeps old facts and apologises.**
#[tokio::test]
async fn test_dossier_failure_leaves_session_unchanged() {
    let store = SessionStore::in_memory();
    store.append(CHAT_ID, Turn::user("Hello")).await.unwrap();
    store.set_facts(CHAT_ID, "old facts".to_string()).await.unwrap();
    let before = store.get_or_create(CHAT_ID).await.unwrap();
    let mut h = harness_with_store(store, vec![script(&["- Name: Al"], "length")]);

    let response = h.coach.chain.handle(&text_message("/dossier")).await.unwrap();

    assert_eq!(response, HandlerResponse::Stop);
    assert_eq!(messages(&drain(&mut h.rx)), vec![MSG_TURN_FAILED]);
    assert_eq!(h.coach.store.get_or_create(CHAT_ID).await.unwrap(), before);
}

/// **Test: /clear forgets everything and confirms with two messages.**
#[tokio::test]
async fn test_clear_forgets_session() {
    let store = SessionStore::in_memory();
    store.append(CHAT_ID, Turn::user("Hello")).await.unwrap();
    store.set_facts(CHAT_ID, "- Name: Alex".to_string()).await.unwrap();
    let mut h = harness_with_store(store, vec![]);

    h.coach.chain.handle(&text_message("/clear")).await.unwrap();

    assert_eq!(
        messages(&drain(&mut h.rx)),
        vec![CLEAR_SWEEP, CLEAR_CONFIRMATION]
    );
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert!(session.messages.is_empty());
    assert!(session.facts.is_none());
    assert!(h.llm.requests().is_empty());
}

/// **Test: Unknown commands are swallowed without touching the LLM or the session.**
#[tokio::test]
async fn test_unknown_command_is_ignored() {
    let mut h = harness(vec![]);

    let response = h.coach.chain.handle(&text_message("/help me")).await.unwrap();

    assert_eq!(response, HandlerResponse::Stop);
    assert!(drain(&mut h.rx).is_empty());
    assert!(h.llm.requests().is_empty());
    assert!(h.coach.store.get_or_create(CHAT_ID).await.unwrap().is_empty());
}

/// **Test: A failed plain-text turn keeps the user turn, commits no reply and apologises.**
#[tokio::test]
async fn test_plain_text_failure_sends_apology() {
    let mut h = harness(vec![vec![
        Ok(llm_client::StreamChunk::role("assistant")),
        Ok(llm_client::StreamChunk::text("First thought.\n\n")),
        Err(anyhow::anyhow!("connection reset")),
    ]]);

    h.coach.chain.handle(&text_message("Help me plan")).await.unwrap();

    assert_eq!(
        messages(&drain(&mut h.rx)),
        vec!["First thought.", MSG_TURN_FAILED]
    );
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(session.messages, vec![Turn::user("Help me plan")]);
}

/// **Test: Overlapping messages for one chat are answered one after the other.**
///
/// **Setup:** Two plain-text messages handled concurrently on the same chat.
/// **Expected:** History alternates user/assistant; the second request saw the first reply.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_chat_turns_are_serialized() {
    let h = harness(vec![
        script(&["Reply one."], "stop"),
        script(&["Reply two."], "stop"),
    ]);
    let chain = h.coach.chain.clone();
    let chain2 = h.coach.chain.clone();

    let first = tokio::spawn(async move { chain.handle(&text_message("first")).await });
    let second = tokio::spawn(async move { chain2.handle(&text_message("second")).await });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    let roles: Vec<_> = session.messages.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![
            storage::TurnRole::User,
            storage::TurnRole::Assistant,
            storage::TurnRole::User,
            storage::TurnRole::Assistant,
        ]
    );
    let requests = h.llm.requests();
    assert_eq!(requests[0].len(), 2);
    assert_eq!(requests[1].len(), 4);
}

/// **Test: With the SQLite store, a conversation survives reopening the file.**
#[tokio::test]
async fn test_sqlite_store_persists_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.db");
    let path = path.to_str().unwrap();
    let config = test_config(SessionStoreType::Sqlite, path);

    {
        let store = create_session_store(&config).await.unwrap();
        let h = harness_with_store(store, vec![script(&["Hello Alex!"], "stop")]);
        h.coach.chain.handle(&text_message("Hi, I'm Alex")).await.unwrap();
    }

    let reopened = create_session_store(&config).await.unwrap();
    let session = reopened.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(
        session.messages,
        vec![Turn::user("Hi, I'm Alex"), Turn::assistant("Hello Alex!")]
    );
}

/// **Test: The command menu lists the three commands with the bot's name.**
#[tokio::test]
async fn test_command_menu() {
    let h = harness(vec![]);

    let menu = h.coach.commands.menu();
    let names: Vec<_> = menu.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["start", "dossier", "clear"]);
    assert_eq!(
        menu[0].description,
        format!("start a new appointment with {}", BOT_NAME)
    );
    assert_eq!(
        menu[1].description,
        format!("ask {} for the content of your dossier", BOT_NAME)
    );
    assert_eq!(
        menu[2].description,
        format!("{} will forget everything about you", BOT_NAME)
    );
}

/// **Test: A lone control token typed as text stores and shows the dossier like /dossier.**
#[tokio::test]
async fn test_plain_text_control_token_sends_dossier() {
    let store = SessionStore::in_memory();
    store.append(CHAT_ID, Turn::user("Hello")).await.unwrap();
    store.append(CHAT_ID, Turn::assistant("Hi! Who am I talking to?")).await.unwrap();
    let mut h = harness_with_store(store, vec![script(&["- Name: Alex (she/her)"], "stop")]);

    h.coach.chain.handle(&text_message(CONTROL_TOKEN)).await.unwrap();

    assert_eq!(
        drain(&mut h.rx),
        vec![
            BotEvent::Typing(CHAT_ID),
            BotEvent::Message(CHAT_ID, "- Name: Alex (she/her)".to_string()),
        ]
    );
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(session.facts.as_deref(), Some("- Name: Alex (she/her)"));
    assert_eq!(session.messages.len(), 2);
    assert!(session.messages.iter().all(|t| !t.is_control()));
}

/// **Test: A failed control-token text turn leaves no placeholder behind.**
///
/// **Setup:** History `[user "Hello"]`; user types `💾`; stream finishes with `length`.
/// **Expected:** apology sent; history back to `[user "Hello"]`; the next turn's request has no `💾`.
#[tokio::test]
async fn test_plain_text_control_token_failure_drops_placeholder() {
    let store = SessionStore::in_memory();
    store.append(CHAT_ID, Turn::user("Hello")).await.unwrap();
    let mut h = harness_with_store(
        store,
        vec![
            script(&["- Name: Al"], "length"),
            script(&["Hi again!"], "stop"),
        ],
    );

    h.coach.chain.handle(&text_message(CONTROL_TOKEN)).await.unwrap();

    assert_eq!(messages(&drain(&mut h.rx)), vec![MSG_TURN_FAILED]);
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(session.messages, vec![Turn::user("Hello")]);
    assert!(session.facts.is_none());

    h.coach.chain.handle(&text_message("hi")).await.unwrap();

    let requests = h.llm.requests();
    assert!(requests[1].iter().all(|m| m.content != CONTROL_TOKEN));
    let session = h.coach.store.get_or_create(CHAT_ID).await.unwrap();
    assert_eq!(
        session.messages,
        vec![
            Turn::user("Hello"),
            Turn::user("hi"),
            Turn::assistant("Hi again!"),
        ]
    );
}
