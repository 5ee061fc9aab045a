mod common;

use common::{DirectMode, Gateway};
use tablegate_core::ContextConfig;
use tablegate_mcp::context::{SCHEMA_END, SCHEMA_START};
use tablegate_mcp::{AgentSettings, ChatMessage, MessageContent, extract_schema_info};

fn config(dir: &std::path::Path, max_tables: usize) -> ContextConfig {
    ContextConfig {
        enabled: true,
        max_tables,
        settings_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn summary_lists_every_table_with_keys() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(true);

    let summary = gw.context(config(dir.path(), 50)).build_schema_summary().await;

    assert!(summary.starts_with("DATABASE SCHEMA INFORMATION:"));
    assert!(summary.contains("Table: orgs"));
    assert!(summary.contains("Table: users"));
    assert!(summary.contains("  - is_active: boolean NOT NULL DEFAULT true"));
    assert!(summary.contains("Primary key: id"));
    assert!(summary.contains("  - org_id → orgs.id"));
}

#[tokio::test]
async fn summary_respects_table_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(true);

    let summary = gw.context(config(dir.path(), 1)).build_schema_summary().await;

    assert!(summary.contains("Table: orgs"));
    assert!(!summary.contains("Table: users"));
    assert!(summary.ends_with("(1 more table(s) not shown)"));
}

#[tokio::test]
async fn summary_restricted_to_enabled_tables() {
    let dir = tempfile::tempdir().unwrap();
    AgentSettings {
        enabled_tables: vec!["users".into()],
    }
    .save(dir.path(), "analyst")
    .unwrap();
    let gw = Gateway::new(true);
    let injector = gw.context(config(dir.path(), 50));

    let restricted = injector.summary_for_agent("analyst").await;
    let unrestricted = injector.summary_for_agent("someone-else").await;

    assert!(restricted.contains("Table: users"));
    assert!(!restricted.contains("Table: orgs"));
    assert!(unrestricted.contains("Table: orgs"));
}

#[tokio::test]
async fn summary_from_managed_client_has_no_relationships() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(true);
    gw.direct().set_mode(DirectMode::Failing);

    let summary = gw.context(config(dir.path(), 50)).build_schema_summary().await;

    assert!(summary.contains("Table: users"));
    assert!(!summary.contains("Relationships:"));
}

#[tokio::test]
async fn inject_appends_block_once() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(true);
    let injector = gw.context(config(dir.path(), 50));
    let mut messages = vec![
        ChatMessage::system("You are a data assistant."),
        ChatMessage::user("How many users are active?"),
    ];

    assert!(injector.inject_schema("analyst", &mut messages).await);
    assert!(!injector.inject_schema("analyst", &mut messages).await);

    let MessageContent::Text(system) = &messages[0].content else {
        panic!("system message should stay plain text");
    };
    assert!(system.starts_with("You are a data assistant.\n\n"));
    assert_eq!(system.matches(SCHEMA_START).count(), 1);
    assert!(system.trim_end().ends_with(SCHEMA_END));
    assert!(extract_schema_info(system).unwrap().contains("Table: users"));
    assert_eq!(
        messages[1].content,
        MessageContent::Text("How many users are active?".into())
    );
}

#[tokio::test]
async fn inject_adds_part_to_multipart_system_message() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(true);
    let injector = gw.context(config(dir.path(), 50));
    let mut messages: Vec<ChatMessage> = serde_json::from_str(
        r#"[{"role":"system","content":[{"type":"text","text":"Be precise."}]}]"#,
    )
    .unwrap();

    assert!(injector.inject_schema("analyst", &mut messages).await);

    let MessageContent::Parts(parts) = &messages[0].content else {
        panic!("system message should stay multipart");
    };
    assert_eq!(parts.len(), 2);
    assert!(parts[1].text.as_deref().unwrap().contains(SCHEMA_START));
}

#[tokio::test]
async fn inject_without_system_message_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(true);
    let injector = gw.context(config(dir.path(), 50));
    let mut messages = vec![ChatMessage::user("hi")];

    assert!(!injector.inject_schema("analyst", &mut messages).await);
    assert_eq!(messages[0].content, MessageContent::Text("hi".into()));
}

#[tokio::test]
async fn unavailable_schema_leaves_session_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let gw = Gateway::new(false);
    gw.managed
        .list_fails
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let injector = gw.context(config(dir.path(), 50));
    let mut messages = vec![ChatMessage::system("You are a data assistant.")];

    assert_eq!(injector.build_schema_summary().await, "");
    assert!(!injector.inject_schema("analyst", &mut messages).await);
    assert_eq!(
        messages[0].content,
        MessageContent::Text("You are a data assistant.".into())
    );
}
