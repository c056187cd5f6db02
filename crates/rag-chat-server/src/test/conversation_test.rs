use std::sync::Arc;

use super::{chunk, manager_with};
use crate::models::chat::{ChatMessage, Role};
use crate::services::conversation::manager::{MockLlmProvider, MockRetrievalProvider};
use crate::services::conversation::{
    ConversationError, InMemorySessionStore, SessionStore, FALLBACK_LLM_REPLY, NO_CONTEXT_REPLY,
};
use crate::services::query_analyzer::ServiceIntent;

#[tokio::test]
async fn test_full_exchange_is_recorded() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .withf(|query, top_k| query == "How much for aircon cleaning pricing rate" && *top_k == 1)
        .times(1)
        .returning(|_, _| Ok(vec![chunk("Aircon cleaning: $50 per unit", "Aircon")]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate()
        .withf(|messages| {
            messages.len() == 2
                && messages[0].role == Role::System
                && messages[0].content.contains("Aircon cleaning: $50 per unit")
                && messages[1] == ChatMessage::user("How much for aircon cleaning")
        })
        .times(1)
        .returning(|_| Ok("It is $50 per unit.".to_string()));

    let manager = manager_with(store.clone(), retrieval, llm);
    let reply = manager
        .handle_message("s1", "How much for aircon cleaning")
        .await
        .unwrap();

    assert_eq!(reply, "It is $50 per unit.");
    assert_eq!(
        store.transcript("s1"),
        vec![
            ChatMessage::user("How much for aircon cleaning"),
            ChatMessage::assistant("It is $50 per unit."),
        ]
    );
    assert_eq!(store.intent("s1"), Some(ServiceIntent::Aircon));
}

#[tokio::test]
async fn test_empty_retrieval_answers_without_llm() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval.expect_search().returning(|_, _| Ok(vec![]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate().never();

    let manager = manager_with(store.clone(), retrieval, llm);
    let reply = manager.handle_message("s1", "hello there").await.unwrap();

    assert_eq!(reply, NO_CONTEXT_REPLY);
    assert!(store.transcript("s1").is_empty());
}

#[tokio::test]
async fn test_empty_retrieval_keeps_existing_history() {
    let store = Arc::new(InMemorySessionStore::default());
    store.append("s1", ChatMessage::user("is my aircon due for servicing"));
    store.append("s1", ChatMessage::assistant("Every 3 months is recommended."));
    store.set_intent("s1", ServiceIntent::Aircon);
    let before = store.transcript("s1");

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .withf(|query, _| query.starts_with("is my aircon due for servicing"))
        .times(1)
        .returning(|_, _| Ok(vec![]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate().never();

    let manager = manager_with(store.clone(), retrieval, llm);
    let reply = manager
        .handle_message("s1", "aircon chemical wash")
        .await
        .unwrap();

    assert_eq!(reply, NO_CONTEXT_REPLY);
    assert_eq!(store.transcript("s1"), before);
    assert_eq!(store.intent("s1"), Some(ServiceIntent::Aircon));
}

#[tokio::test]
async fn test_blank_passage_counts_as_empty() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .returning(|_, _| Ok(vec![chunk("   \n", "General")]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate().never();

    let manager = manager_with(store.clone(), retrieval, llm);
    assert_eq!(manager.handle_message("s1", "hi").await.unwrap(), "I don't know");
    assert!(store.transcript("s1").is_empty());
}

#[tokio::test]
async fn test_llm_failure_records_fallback() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .returning(|_, _| Ok(vec![chunk("Massage: 60 minutes for $80", "Massage")]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate()
        .returning(|_| Err(anyhow::anyhow!("429 Too Many Requests")));

    let manager = manager_with(store.clone(), retrieval, llm);
    let reply = manager.handle_message("s1", "book a massage").await.unwrap();

    assert_eq!(reply, FALLBACK_LLM_REPLY);
    let transcript = store.transcript("s1");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], ChatMessage::assistant(FALLBACK_LLM_REPLY));
}

#[tokio::test]
async fn test_retrieval_failure_propagates() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate().never();

    let manager = manager_with(store.clone(), retrieval, llm);
    let err = manager.handle_message("s1", "aircon").await.unwrap_err();

    assert!(matches!(err, ConversationError::Retrieval(_)));
    assert!(store.transcript("s1").is_empty());
}

#[tokio::test]
async fn test_blank_input_is_rejected() {
    let mut retrieval = MockRetrievalProvider::new();
    retrieval.expect_search().never();
    let mut llm = MockLlmProvider::new();
    llm.expect_generate().never();

    let manager = manager_with(Arc::new(InMemorySessionStore::default()), retrieval, llm);

    assert!(matches!(
        manager.handle_message("s1", "").await,
        Err(ConversationError::InvalidInput(_))
    ));
    assert!(matches!(
        manager.handle_message("", "hello").await,
        Err(ConversationError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_whitespace_session_id_is_accepted() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval.expect_search().returning(|_, _| Ok(vec![]));

    let manager = manager_with(store, retrieval, MockLlmProvider::new());
    assert_eq!(
        manager.handle_message(" ", "hello").await.unwrap(),
        NO_CONTEXT_REPLY
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_session_exchanges_do_not_interleave() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .returning(|_, _| Ok(vec![chunk("Aircon servicing from $40", "Aircon")]));

    // Slow LLM that echoes the message it answers
    let mut llm = MockLlmProvider::new();
    llm.expect_generate().times(2).returning(|messages| {
        std::thread::sleep(std::time::Duration::from_millis(50));
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("re: {}", last))
    });

    let manager = Arc::new(manager_with(store.clone(), retrieval, llm));

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.handle_message("s1", "aircon gas top up").await })
    };
    let second = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.handle_message("s1", "aircon chemical wash").await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let transcript = store.transcript("s1");
    let roles: Vec<_> = transcript.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);

    // Each reply answers the user message right before it
    for pair in transcript.chunks(2) {
        assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
    }
}

#[tokio::test]
async fn test_topic_change_starts_fresh_transcript() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .returning(|_, _| Ok(vec![chunk("Some service details", "General")]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate()
        .returning(|messages| Ok(format!("reply #{}", messages.len())));

    let manager = manager_with(store.clone(), retrieval, llm);

    manager.handle_message("s1", "my aircon leaks water").await.unwrap();
    manager.handle_message("s1", "aircon servicing schedule").await.unwrap();
    assert_eq!(store.transcript("s1").len(), 4);

    manager.handle_message("s1", "I need a massage").await.unwrap();

    let transcript = store.transcript("s1");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0], ChatMessage::user("I need a massage"));
    assert_eq!(store.intent("s1"), Some(ServiceIntent::Massage));
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let store = Arc::new(InMemorySessionStore::default());

    let mut retrieval = MockRetrievalProvider::new();
    retrieval
        .expect_search()
        .returning(|_, _| Ok(vec![chunk("Pet grooming from $40", "Pet_Care")]));

    let mut llm = MockLlmProvider::new();
    llm.expect_generate().returning(|_| Ok("ok".to_string()));

    let manager = Arc::new(manager_with(store.clone(), retrieval, llm));

    let a = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.handle_message("a", "dog grooming").await })
    };
    let b = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.handle_message("b", "cat grooming").await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(store.transcript("a")[0], ChatMessage::user("dog grooming"));
    assert_eq!(store.transcript("b")[0], ChatMessage::user("cat grooming"));
    assert_eq!(manager.stats().active_sessions, 2);
}

#[tokio::test]
async fn test_reset_session_clears_memory() {
    let store = Arc::new(InMemorySessionStore::default());
    store.append("s1", ChatMessage::user("hello"));
    store.set_intent("s1", ServiceIntent::Handyman);

    let manager = manager_with(
        store.clone(),
        MockRetrievalProvider::new(),
        MockLlmProvider::new(),
    );

    manager.reset_session("s1").await.unwrap();
    assert!(store.transcript("s1").is_empty());
    assert_eq!(store.intent("s1"), None);

    // Unknown sessions are a no-op
    manager.reset_session("never-seen").await.unwrap();
    assert!(manager.transcript("never-seen").unwrap().is_empty());
}
