//! End-to-end flows through `EditorContext` with the headless engine.

use easel_core::{
    Action, Bounds, Command, Document, EditorConfig, EditorContext, EditorError, EngineAdapter,
    HeadlessEngine, ImageStatus, Object, ObjectId, ObjectProps, SceneAdapter, Selector, ShapeKind,
};
use serde_json::json;

fn context_with(doc: Document) -> EditorContext {
    EditorContext::new(
        doc,
        Box::new(EngineAdapter::new(HeadlessEngine)),
        EditorConfig::default(),
    )
    .expect("context")
}

fn single_text_document() -> Document {
    let mut doc = Document::new("Flow");
    let page = doc.first_page_id().expect("page").clone();
    doc.add_object(&page, Object::text("Hello").with_id("t1").with_fill("#000000"))
        .expect("t1");
    doc
}

fn fill_of(ctx: &EditorContext, id: &str) -> String {
    ctx.document()
        .find_object(&id.into())
        .and_then(Object::fill)
        .expect("fill")
        .to_string()
}

#[test]
fn test_change_color_undo_redo_scenario() {
    let mut ctx = context_with(single_text_document());

    let receipts = ctx
        .run_instruction("change t1 color to blue")
        .expect("instruction");
    assert_eq!(receipts.len(), 1);
    assert_eq!(fill_of(&ctx, "t1"), "#0000FF");
    assert_eq!(ctx.version(), 1);
    assert_eq!(ctx.history().past_len(), 1);

    assert!(ctx.undo().expect("undo"));
    assert_eq!(fill_of(&ctx, "t1"), "#000000");
    assert_eq!(ctx.history().future_len(), 1);

    assert!(ctx.redo().expect("redo"));
    assert_eq!(fill_of(&ctx, "t1"), "#0000FF");
    assert_eq!(ctx.history().future_len(), 0);
}

#[test]
fn test_missing_target_leaves_document_untouched() {
    let mut ctx = context_with(single_text_document());
    let before = ctx.document().clone();

    let result = ctx.execute(Command::new(
        Action::SetFill {
            color: "#FF0000".to_string(),
        },
        Selector::Id("ghost".into()),
    ));

    assert!(matches!(result, Err(EditorError::TargetNotFound(_))));
    assert_eq!(ctx.version(), 0);
    assert_eq!(ctx.history().past_len(), 0);
    assert_eq!(ctx.document(), &before);
}

#[test]
fn test_unparseable_instruction_is_rejected() {
    let mut ctx = context_with(single_text_document());
    let result = ctx.run_instruction("sing a song");
    assert!(matches!(result, Err(EditorError::UnsupportedCommand(_))));
    assert_eq!(ctx.version(), 0);
}

#[test]
fn test_one_changed_object_among_many_costs_one_update() {
    let mut doc = Document::new("Crowded");
    let page = doc.first_page_id().expect("page").clone();
    for i in 0..100 {
        doc.add_object(&page, Object::text(format!("item {i}")).with_id(format!("o{i}")))
            .expect("add");
    }
    doc.add_object(&page, Object::shape(ShapeKind::Rect).with_id("target"))
        .expect("target");

    let adapter = EngineAdapter::new(HeadlessEngine);
    let mut ctx = EditorContext::new(doc, Box::new(adapter), EditorConfig::default())
        .expect("context");
    let renders = ctx.adapter().stats().full_renders;

    ctx.execute(Command::new(
        Action::SetFill {
            color: "#00FF00".to_string(),
        },
        Selector::Id("target".into()),
    ))
    .expect("fill");

    let stats = ctx.adapter().stats();
    assert_eq!(stats.full_renders, renders);
    assert_eq!(stats.updated_objects, 1);
    assert_eq!(stats.setter_calls, 1);
}

#[test]
fn test_engine_drag_reenters_as_command() {
    let mut ctx = context_with(single_text_document());
    ctx.handle_native_event(&json!({"event": "moved", "id": "t1", "x": 40.0, "y": 60.0}))
        .expect("event");

    let results = ctx.sync_engine_events();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());

    let moved = ctx.document().find_object(&"t1".into()).expect("t1");
    assert_eq!((moved.bounds.x, moved.bounds.y), (40.0, 60.0));
    assert_eq!(ctx.history().past_len(), 1);

    ctx.undo().expect("undo");
    let back = ctx.document().find_object(&"t1".into()).expect("t1");
    assert_eq!((back.bounds.x, back.bounds.y), (0.0, 0.0));
}

#[test]
fn test_rejected_engine_drag_snaps_back() {
    let mut ctx = context_with(single_text_document());
    ctx.handle_native_event(&json!({"event": "moved", "id": "t1", "x": -50.0, "y": 10.0}))
        .expect("event");

    let results = ctx.sync_engine_events();
    assert!(results[0].is_err());
    assert_eq!(ctx.version(), 0);

    let scene = ctx.adapter().snapshot().expect("snapshot");
    let node = scene.find_object(&"t1".into()).expect("t1");
    assert_eq!(node.bounds.x, 0.0);
}

#[test]
fn test_selection_events_update_selection_without_commands() {
    let mut ctx = context_with(single_text_document());
    ctx.handle_native_event(&json!({"event": "selectionChanged", "ids": ["t1"]}))
        .expect("event");
    assert!(ctx.sync_engine_events().is_empty());
    assert_eq!(ctx.selection(), vec![ObjectId::from("t1")]);

    ctx.run_instruction("make it red").expect("instruction");
    assert_eq!(fill_of(&ctx, "t1"), "#FF0000");
}

#[test]
fn test_image_two_phase_commit() {
    let mut ctx = context_with(single_text_document());
    ctx.execute(Command::page(Action::Insert {
        object: Box::new(Object::image("hero-photo").with_id("i1")),
    }))
    .expect("placeholder");

    let pending = ctx.take_pending_assets();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].asset_ref, "hero-photo");

    ctx.execute(Command::new(
        Action::ResolveImage {
            src: "https://cdn.example/hero.png".to_string(),
        },
        Selector::Id("i1".into()),
    ))
    .expect("resolve");

    let image = ctx.document().find_object(&"i1".into()).expect("i1");
    let ObjectProps::Image(props) = &image.props else {
        panic!("expected image");
    };
    assert_eq!(props.status, ImageStatus::Resolved);
    assert_eq!(props.src.as_deref(), Some("https://cdn.example/hero.png"));
    assert_eq!(ctx.history().past_len(), 2);
}

#[test]
fn test_resolution_without_placeholder_is_rejected() {
    let mut ctx = context_with(single_text_document());
    let result = ctx.execute(Command::new(
        Action::ResolveImage {
            src: "https://cdn.example/x.png".to_string(),
        },
        Selector::Id("t1".into()),
    ));
    assert!(matches!(result, Err(EditorError::TargetNotFound(_))));
}

#[test]
fn test_compound_instruction_stops_at_first_rejection() {
    let mut ctx = context_with(single_text_document());
    let result = ctx.run_instruction("make t1 red and delete it");
    assert!(matches!(result, Err(EditorError::TargetNotFound(_))));
    assert_eq!(fill_of(&ctx, "t1"), "#FF0000");
    assert_eq!(ctx.history().past_len(), 1);
}

#[test]
fn test_group_then_ungroup_round_trips_through_history() {
    let mut doc = single_text_document();
    let page = doc.first_page_id().expect("page").clone();
    doc.add_object(
        &page,
        Object::shape(ShapeKind::Ellipse)
            .with_id("s1")
            .with_z_index(1)
            .with_bounds(Bounds::new(50.0, 50.0, 20.0, 20.0)),
    )
    .expect("s1");
    let mut ctx = context_with(doc);
    let original = ctx.document().clone();

    ctx.run_instruction("group t1 and s1").expect("group");
    let page = ctx.document().page(&page).expect("page");
    assert_eq!(page.objects.len(), 1);

    ctx.undo().expect("undo");
    assert!(ctx.document().same_content(&original));
}

#[test]
fn test_history_limit_drops_oldest() {
    let mut ctx = EditorContext::new(
        single_text_document(),
        Box::new(EngineAdapter::new(HeadlessEngine)),
        EditorConfig { history_limit: 2 },
    )
    .expect("context");
    for color in ["red", "green", "blue"] {
        ctx.run_instruction(&format!("make t1 {color}"))
            .expect("instruction");
    }
    assert_eq!(ctx.history().past_len(), 2);
    ctx.undo().expect("undo");
    ctx.undo().expect("undo");
    assert!(!ctx.undo().expect("exhausted"));
    assert_eq!(fill_of(&ctx, "t1"), "#FF0000");
}
