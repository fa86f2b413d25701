//! Property tests for the command pipeline.

use easel_core::{
    Action, Bounds, Command, Document, EditorConfig, EditorContext, EngineAdapter,
    HeadlessEngine, Object, Selector, ShapeKind,
};
use proptest::prelude::*;

const IDS: [&str; 4] = ["t1", "t2", "s1", "s2"];

fn base_document() -> Document {
    let mut doc = Document::new("Property");
    let page = doc.first_page_id().expect("page").clone();
    doc.add_object(&page, Object::text("one").with_id("t1").with_z_index(0))
        .expect("t1");
    doc.add_object(
        &page,
        Object::text("two")
            .with_id("t2")
            .with_z_index(1)
            .with_bounds(Bounds::new(0.0, 200.0, 300.0, 80.0)),
    )
    .expect("t2");
    doc.add_object(
        &page,
        Object::shape(ShapeKind::Rect)
            .with_id("s1")
            .with_z_index(2)
            .with_bounds(Bounds::new(100.0, 100.0, 60.0, 60.0)),
    )
    .expect("s1");
    doc.add_object(
        &page,
        Object::shape(ShapeKind::Ellipse)
            .with_id("s2")
            .with_z_index(3)
            .with_bounds(Bounds::new(300.0, 300.0, 40.0, 40.0)),
    )
    .expect("s2");
    doc
}

fn arb_color() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["#FF0000", "#00FF00", "#0000FF", "#123456"]).prop_map(String::from)
}

fn arb_id() -> impl Strategy<Value = &'static str> {
    prop::sample::select(IDS.to_vec())
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        (arb_id(), arb_color()).prop_map(|(id, color)| Command::new(
            Action::SetFill { color },
            Selector::Id(id.into())
        )),
        (arb_id(), -50i32..50, -50i32..50).prop_map(|(id, dx, dy)| Command::new(
            Action::MoveBy {
                dx: f64::from(dx),
                dy: f64::from(dy)
            },
            Selector::Id(id.into())
        )),
        (arb_id(), 0i32..400, 0i32..400).prop_map(|(id, x, y)| Command::new(
            Action::MoveTo {
                x: f64::from(x),
                y: f64::from(y)
            },
            Selector::Id(id.into())
        )),
        (arb_id(), 1i32..500, 1i32..500).prop_map(|(id, w, h)| Command::new(
            Action::Resize {
                width: f64::from(w),
                height: f64::from(h)
            },
            Selector::Id(id.into())
        )),
        arb_id().prop_map(|id| Command::new(Action::Delete, Selector::Id(id.into()))),
        arb_id().prop_map(|id| Command::new(Action::BringToFront, Selector::Id(id.into()))),
        arb_id().prop_map(|id| Command::new(Action::SendToBack, Selector::Id(id.into()))),
        (arb_id(), arb_id()).prop_map(|(a, b)| Command::new(
            Action::Group,
            Selector::Ids(vec![a.into(), b.into()])
        )),
        Just(Command::new(Action::Ungroup, Selector::TypeOrdinal {
            object_type: easel_core::ObjectType::Group,
            index: 0
        })),
        arb_color().prop_map(|color| Command::page(Action::SetBackground { color })),
    ]
}

proptest! {
    #[test]
    fn undo_all_restores_original(commands in prop::collection::vec(arb_command(), 1..20)) {
        let original = base_document();
        let mut ctx = EditorContext::new(
            original.clone(),
            Box::new(EngineAdapter::new(HeadlessEngine)),
            EditorConfig { history_limit: 64 },
        )
        .expect("context");

        let mut applied = 0;
        for command in commands {
            if ctx.execute(command).is_ok() {
                applied += 1;
            }
        }
        prop_assert_eq!(ctx.history().past_len(), applied);

        for _ in 0..applied {
            prop_assert!(ctx.undo().expect("undo"));
        }
        prop_assert!(ctx.document().same_content(&original));
        prop_assert_eq!(ctx.version(), 2 * applied as u64);
    }

    #[test]
    fn rejected_commands_never_bump_version(id in "[a-z]{3,8}") {
        let mut ctx = EditorContext::new(
            base_document(),
            Box::new(EngineAdapter::new(HeadlessEngine)),
            EditorConfig::default(),
        )
        .expect("context");
        let result = ctx.execute(Command::new(
            Action::SetText { text: "x".to_string() },
            Selector::Id(id.as_str().into()),
        ));
        prop_assert!(result.is_err());
        prop_assert_eq!(ctx.version(), 0);
        prop_assert_eq!(ctx.history().past_len(), 0);
    }

    #[test]
    fn scene_tracks_document_after_every_command(commands in prop::collection::vec(arb_command(), 1..12)) {
        let mut ctx = EditorContext::new(
            base_document(),
            Box::new(EngineAdapter::new(HeadlessEngine)),
            EditorConfig::default(),
        )
        .expect("context");
        for command in commands {
            let _ = ctx.execute(command);
            let scene = ctx.adapter().snapshot().expect("snapshot");
            prop_assert_eq!(scene.pages(), ctx.document().pages());
        }
    }
}
