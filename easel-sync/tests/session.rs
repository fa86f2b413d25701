//! Editor sessions: async work re-entering as commands.

use std::sync::Arc;

use async_trait::async_trait;
use easel_core::{
    Action, Command, Document, EditorConfig, EditorContext, EngineAdapter, HeadlessEngine,
    ImageStatus, Object, ObjectProps,
};
use easel_sync::{
    AssetError, AssetResolver, AutosaveConfig, AutosaveHandle, AutosaveState, EditorSession,
    MemoryPersistence, UrlPrefixResolver,
};

struct FailingResolver;

#[async_trait]
impl AssetResolver for FailingResolver {
    async fn resolve(&self, asset_ref: &str) -> Result<String, AssetError> {
        Err(AssetError {
            asset_ref: asset_ref.to_string(),
            reason: "not in library".to_string(),
        })
    }
}

fn session() -> EditorSession {
    let mut doc = Document::new("Session").with_id("s1");
    let page = doc.first_page_id().expect("page").clone();
    doc.add_object(&page, Object::text("Title").with_id("t1"))
        .expect("t1");
    let context = EditorContext::new(
        doc,
        Box::new(EngineAdapter::new(HeadlessEngine)),
        EditorConfig::default(),
    )
    .expect("context");
    EditorSession::new(context)
}

fn image_status(session: &EditorSession, id: &str) -> (ImageStatus, Option<String>) {
    let object = session
        .context()
        .document()
        .find_object(&id.into())
        .expect("image");
    let ObjectProps::Image(props) = &object.props else {
        panic!("expected image");
    };
    (props.status, props.src.clone())
}

fn insert_image(id: &str, asset_ref: &str) -> Command {
    Command::page(Action::Insert {
        object: Box::new(Object::image(asset_ref).with_id(id)),
    })
}

#[tokio::test]
async fn test_resolved_asset_reenters_as_command() {
    let mut session = session()
        .with_resolver(Arc::new(UrlPrefixResolver::new("https://cdn.example/")));

    session.execute(insert_image("i1", "hero.png")).expect("insert");
    assert_eq!(image_status(&session, "i1").0, ImageStatus::Pending);

    let receipt = session
        .next_command()
        .await
        .expect("queued command")
        .expect("resolution applied");
    assert_eq!(receipt.kind, "resolveImage");

    let (status, src) = image_status(&session, "i1");
    assert_eq!(status, ImageStatus::Resolved);
    assert_eq!(src.as_deref(), Some("https://cdn.example/hero.png"));
    assert_eq!(session.context().history().past_len(), 2);
}

#[tokio::test]
async fn test_failed_asset_marks_placeholder() {
    let mut session = session().with_resolver(Arc::new(FailingResolver));

    session.execute(insert_image("i1", "missing.png")).expect("insert");
    session
        .next_command()
        .await
        .expect("queued command")
        .expect("failure applied");

    assert_eq!(image_status(&session, "i1").0, ImageStatus::Failed);
}

#[tokio::test]
async fn test_resolution_for_deleted_placeholder_is_rejected() {
    let mut session = session()
        .with_resolver(Arc::new(UrlPrefixResolver::new("https://cdn.example/")));

    session.execute(insert_image("i1", "hero.png")).expect("insert");
    session.run_instruction("delete i1").expect("delete");

    let result = session.next_command().await.expect("queued command");
    assert!(result.is_err());
    assert!(session.context().document().find_object(&"i1".into()).is_none());
}

#[tokio::test]
async fn test_external_commands_drain_in_order() {
    let mut session = session();
    let sender = session.command_sender();
    sender
        .send(Command::new(
            Action::SetFill {
                color: "#FF0000".to_string(),
            },
            easel_core::Selector::Id("t1".into()),
        ))
        .expect("send");
    sender
        .send(Command::new(Action::Delete, easel_core::Selector::Id("t1".into())))
        .expect("send");

    let results = session.drain_commands();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(session.context().version(), 2);
    assert!(session.drain_commands().is_empty());
}

#[tokio::test]
async fn test_session_changes_reach_autosave() {
    let store = Arc::new(MemoryPersistence::new());
    let autosave = AutosaveHandle::spawn(store.clone(), AutosaveConfig::default());
    let mut session = session().with_autosave(autosave);

    session
        .run_instruction("change t1 color to blue")
        .expect("instruction");
    assert!(session.undo().expect("undo"));

    let status = session.autosave().expect("autosave").flush().await;
    assert_eq!(status.state, AutosaveState::Saved);
    assert_eq!(status.saved_version, Some(session.context().version()));
    assert_eq!(store.saved_versions(), vec![2]);

    session.shutdown().await;
}
