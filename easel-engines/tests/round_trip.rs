//! Translation properties shared by every engine.

use easel_core::{
    AdapterRegistry, Bounds, Document, Engine, ImageStatus, Object, ObjectProps, SceneAdapter,
    ShapeKind,
};
use easel_engines::{default_registry, FabricEngine, KonvaEngine};
use proptest::prelude::*;

fn arb_bounds() -> impl Strategy<Value = Bounds> {
    (0u16..1000, 0u16..1000, 1u16..500, 1u16..500).prop_map(|(x, y, w, h)| {
        Bounds::new(f64::from(x), f64::from(y), f64::from(w), f64::from(h))
    })
}

fn arb_leaf() -> impl Strategy<Value = Object> {
    let text = ("[a-zA-Z ]{0,16}", any::<bool>()).prop_map(|(content, bound)| {
        let object = Object::text(content).with_role("body");
        if bound {
            object.with_binding("field")
        } else {
            object
        }
    });
    let image = ("[a-z]{1,8}", any::<bool>()).prop_map(|(asset, resolved)| {
        let mut object = Object::image(asset);
        if let ObjectProps::Image(props) = &mut object.props {
            if resolved {
                props.status = ImageStatus::Resolved;
                props.src = Some("https://cdn.example/a.png".to_string());
            }
        }
        object
    });
    let shape = prop::sample::select(vec![ShapeKind::Rect, ShapeKind::Ellipse, ShapeKind::Line])
        .prop_map(Object::shape);
    prop_oneof![text, image, shape]
}

fn arb_object() -> impl Strategy<Value = Object> {
    prop_oneof![
        3 => (arb_leaf(), arb_bounds()).prop_map(|(o, b)| o.with_bounds(b)),
        1 => prop::collection::vec((arb_leaf(), arb_bounds()), 1..3).prop_map(|children| {
            Object::group(children.into_iter().map(|(o, b)| o.with_bounds(b)).collect())
        }),
    ]
}

fn arb_document() -> impl Strategy<Value = Document> {
    prop::collection::vec(arb_object(), 0..8).prop_map(|objects| {
        let mut doc = Document::new("Generated");
        let page = doc.first_page_id().expect("page").clone();
        for (z, object) in objects.into_iter().enumerate() {
            let z = i32::try_from(z).expect("small");
            doc.add_object(&page, object.with_z_index(z)).expect("add");
        }
        doc
    })
}

fn stable<E: Engine>(engine: &E, doc: &Document) -> bool {
    let scene = engine.from_canonical(doc);
    let back = engine.to_canonical(&scene).expect("to canonical");
    engine.from_canonical(&back) == scene
}

proptest! {
    #[test]
    fn fabric_translation_is_stable(doc in arb_document()) {
        prop_assert!(stable(&FabricEngine::new(), &doc));
    }

    #[test]
    fn konva_translation_is_stable(doc in arb_document()) {
        prop_assert!(stable(&KonvaEngine::new(), &doc));
    }

    #[test]
    fn fabric_translation_is_lossless(doc in arb_document()) {
        let engine = FabricEngine::new();
        let back = engine.to_canonical(&engine.from_canonical(&doc)).expect("to canonical");
        prop_assert!(back.same_content(&doc));
    }

    #[test]
    fn every_registered_adapter_mirrors_the_document(doc in arb_document()) {
        let registry: AdapterRegistry = default_registry();
        let page = doc.first_page_id().expect("page").clone();
        for name in registry.names() {
            let mut adapter = registry.create(name).expect("registered");
            adapter.load(&doc, &page);
            let snapshot = adapter.snapshot().expect("snapshot");
            prop_assert_eq!(snapshot.object_ids().len(), doc.object_ids().len());
        }
    }
}
