//! Konva-style engine: a stage with one layer per page and a node tree.
//!
//! Nodes follow Konva's `toJSON()` shape (`className`, `attrs`, `children`).
//! The canonical id lives in `attrs.id` and the role in `attrs.name`.
//! Konva has no notion of data bindings, so bindings are dropped on the way in.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use easel_core::{
    Bounds, Document, Engine, EngineEvent, Field, FontWeight, GroupProps, ImageProps, ImageStatus,
    Object, ObjectId, ObjectProps, Page, PageId, ShapeKind, ShapeProps, TextAlign, TextProps,
    TranslationError,
};

use super::{log_dropped, SceneHeader};

const NAME: &str = "konva";

/// Stroke width for lines that carry no width of their own.
const LINE_STROKE_WIDTH: f64 = 2.0;

/// Native scene: a Konva stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KonvaStage {
    /// Document-level data.
    pub header: SceneHeader,
    /// One layer per page, in page order.
    pub children: Vec<KonvaLayer>,
}

/// A Konva layer holding one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KonvaLayer {
    /// Layer attributes: `id`, `name`, `width`, `height`, `fill`.
    pub attrs: LayerAttrs,
    /// Top-level nodes in canonical order.
    pub children: Vec<KonvaNode>,
}

/// Page attributes of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerAttrs {
    /// Canonical page id.
    pub id: String,
    /// Page name.
    pub name: String,
    /// Page width.
    pub width: f64,
    /// Page height.
    pub height: f64,
    /// Background color.
    pub fill: String,
}

/// A Konva node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KonvaNode {
    /// `Text`, `Image`, `Rect`, `Ellipse`, `Line` or `Group`.
    pub class_name: String,
    /// Konva attributes.
    #[serde(default)]
    pub attrs: Map<String, Value>,
    /// Group members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<KonvaNode>,
}

impl KonvaNode {
    fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            attrs: Map::new(),
            children: Vec::new(),
        }
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    fn str_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    fn num_attr(&self, key: &str) -> Option<f64> {
        self.attrs.get(key).and_then(Value::as_f64)
    }

    /// Canonical id from `attrs.id`.
    #[must_use]
    pub fn canonical_id(&self) -> Option<&str> {
        self.str_attr("id")
    }

    /// Canonical bounds, undoing the ellipse center convention and any
    /// pending `scaleX`/`scaleY` from a transformer.
    fn bounds(&self) -> Bounds {
        let num = |key: &str| self.num_attr(key).unwrap_or(0.0);
        let scale_x = self.num_attr("scaleX").unwrap_or(1.0);
        let scale_y = self.num_attr("scaleY").unwrap_or(1.0);
        match self.class_name.as_str() {
            "Ellipse" => {
                let (rx, ry) = (num("radiusX") * scale_x, num("radiusY") * scale_y);
                Bounds::new(num("x") - rx, num("y") - ry, rx * 2.0, ry * 2.0)
            }
            "Line" => {
                let points: Vec<f64> = self
                    .attrs
                    .get("points")
                    .and_then(Value::as_array)
                    .map(|p| p.iter().filter_map(Value::as_f64).collect())
                    .unwrap_or_default();
                // Konva draws points relative to the node position.
                match points.as_slice() {
                    [x1, y1, x2, y2, ..] => Bounds::new(
                        num("x") + x1.min(*x2) * scale_x,
                        num("y") + y1.min(*y2) * scale_y,
                        (x2 - x1).abs() * scale_x,
                        (y2 - y1).abs() * scale_y,
                    ),
                    _ => Bounds::new(0.0, 0.0, 0.0, 0.0),
                }
            }
            _ => Bounds::new(
                num("x"),
                num("y"),
                num("width") * scale_x,
                num("height") * scale_y,
            ),
        }
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.attrs.remove("scaleX");
        self.attrs.remove("scaleY");
        match self.class_name.as_str() {
            "Ellipse" => {
                self.set("x", bounds.x + bounds.width / 2.0);
                self.set("y", bounds.y + bounds.height / 2.0);
                self.set("radiusX", bounds.width / 2.0);
                self.set("radiusY", bounds.height / 2.0);
            }
            "Line" => {
                self.attrs.remove("x");
                self.attrs.remove("y");
                self.set(
                    "points",
                    json!([
                        bounds.x,
                        bounds.y,
                        bounds.x + bounds.width,
                        bounds.y + bounds.height
                    ]),
                );
            }
            _ => {
                self.set("x", bounds.x);
                self.set("y", bounds.y);
                self.set("width", bounds.width);
                self.set("height", bounds.height);
            }
        }
    }
}

/// Konva engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct KonvaEngine;

impl KonvaEngine {
    /// Create the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn layer_mut<'a>(
        scene: &'a mut KonvaStage,
        page: &PageId,
    ) -> Result<&'a mut KonvaLayer, TranslationError> {
        scene
            .children
            .iter_mut()
            .find(|l| l.attrs.id == page.as_str())
            .ok_or_else(|| TranslationError::PageNotFound {
                engine: NAME,
                id: page.clone(),
            })
    }

    fn node_mut<'a>(
        scene: &'a mut KonvaStage,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<&'a mut KonvaNode, TranslationError> {
        find_node_mut(&mut Self::layer_mut(scene, page)?.children, id)
            .ok_or_else(|| TranslationError::NodeNotFound {
                engine: NAME,
                id: id.clone(),
            })
    }
}

/// Depth-first search through groups.
fn find_node_mut<'a>(nodes: &'a mut [KonvaNode], id: &ObjectId) -> Option<&'a mut KonvaNode> {
    for node in nodes {
        if node.canonical_id() == Some(id.as_str()) {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Translate a canonical object into a Konva node.
///
/// Bindings have no Konva counterpart and are dropped with a warning.
#[must_use]
pub fn object_to_native(object: &Object) -> KonvaNode {
    if object.bindings.is_some() {
        log_dropped(&TranslationError::UnsupportedField {
            engine: NAME,
            field: "bindings",
        });
    }
    let mut node = match &object.props {
        ObjectProps::Text(text) => {
            let mut node = KonvaNode::new("Text");
            node.set("text", text.text.clone());
            node.set("fontFamily", text.font_family.clone());
            node.set("fontSize", text.font_size);
            node.set(
                "fontStyle",
                match text.font_weight {
                    FontWeight::Normal => "normal",
                    FontWeight::Bold => "bold",
                },
            );
            node.set(
                "align",
                match text.align {
                    TextAlign::Left => "left",
                    TextAlign::Center => "center",
                    TextAlign::Right => "right",
                },
            );
            node.set("fill", text.fill.clone());
            node.set("opacity", text.opacity);
            node
        }
        ObjectProps::Image(image) => {
            let mut node = KonvaNode::new("Image");
            node.set("assetRef", image.asset_ref.clone());
            if let Some(src) = &image.src {
                node.set("src", src.clone());
            }
            node.set(
                "imageStatus",
                serde_json::to_value(image.status).unwrap_or(Value::Null),
            );
            node.set("opacity", image.opacity);
            node
        }
        ObjectProps::Shape(shape) => {
            let mut node = KonvaNode::new(match shape.shape {
                ShapeKind::Rect => "Rect",
                ShapeKind::Ellipse => "Ellipse",
                ShapeKind::Line => "Line",
            });
            node.set("fill", shape.fill.clone());
            if shape.shape == ShapeKind::Line {
                set_line_stroke(&mut node, shape);
            } else {
                if let Some(stroke) = &shape.stroke {
                    node.set("stroke", stroke.clone());
                }
                node.set("strokeWidth", shape.stroke_width);
            }
            if shape.shape == ShapeKind::Rect {
                node.set("cornerRadius", shape.corner_radius);
            }
            node.set("opacity", shape.opacity);
            node
        }
        ObjectProps::Group(group) => {
            let mut node = KonvaNode::new("Group");
            node.children = group.children.iter().map(object_to_native).collect();
            node
        }
    };
    node.set("id", object.id.to_string());
    if let Some(role) = &object.role {
        node.set("name", role.clone());
    }
    node.set("zIndex", object.z_index);
    node.set_bounds(object.bounds);
    node
}

/// Konva lines paint only their stroke. Lines without their own stroke are
/// drawn in the fill color at [`LINE_STROKE_WIDTH`]; the flags keep the
/// canonical values recoverable.
fn set_line_stroke(node: &mut KonvaNode, shape: &ShapeProps) {
    match &shape.stroke {
        Some(stroke) => node.set("stroke", stroke.clone()),
        None => {
            node.set("stroke", shape.fill.clone());
            node.set("strokeFromFill", true);
        }
    }
    if shape.stroke_width > 0.0 {
        node.set("strokeWidth", shape.stroke_width);
    } else {
        node.set("strokeWidth", LINE_STROKE_WIDTH);
        node.set("defaultStrokeWidth", true);
    }
}

fn flag_attr(node: &KonvaNode, key: &str) -> bool {
    node.attrs.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Translate a Konva node back into a canonical object.
///
/// # Errors
///
/// Returns [`TranslationError::UnknownNode`] for classes with no canonical
/// counterpart.
pub fn native_to_object(node: &KonvaNode) -> Result<Object, TranslationError> {
    let opacity = node.num_attr("opacity").unwrap_or(1.0);
    let text_attr = |key: &str| node.str_attr(key).map(str::to_string);
    let props = match node.class_name.as_str() {
        "Text" => {
            let defaults = TextProps::default();
            ObjectProps::Text(TextProps {
                text: text_attr("text").unwrap_or_default(),
                font_family: text_attr("fontFamily").unwrap_or(defaults.font_family),
                font_size: node.num_attr("fontSize").unwrap_or(defaults.font_size),
                font_weight: if node.str_attr("fontStyle") == Some("bold") {
                    FontWeight::Bold
                } else {
                    FontWeight::Normal
                },
                fill: text_attr("fill").unwrap_or(defaults.fill),
                align: match node.str_attr("align") {
                    Some("center") => TextAlign::Center,
                    Some("right") => TextAlign::Right,
                    _ => TextAlign::Left,
                },
                opacity,
            })
        }
        "Image" => {
            let src = text_attr("src");
            let status = node
                .attrs
                .get("imageStatus")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or(if src.is_some() {
                    ImageStatus::Resolved
                } else {
                    ImageStatus::Pending
                });
            ObjectProps::Image(ImageProps {
                asset_ref: text_attr("assetRef").unwrap_or_default(),
                src,
                status,
                opacity,
            })
        }
        kind @ ("Rect" | "Ellipse" | "Line") => {
            let shape = match kind {
                "Ellipse" => ShapeKind::Ellipse,
                "Line" => ShapeKind::Line,
                _ => ShapeKind::Rect,
            };
            ObjectProps::Shape(ShapeProps {
                shape,
                fill: text_attr("fill").unwrap_or_else(|| ShapeProps::default().fill),
                stroke: if flag_attr(node, "strokeFromFill") {
                    None
                } else {
                    text_attr("stroke")
                },
                stroke_width: if flag_attr(node, "defaultStrokeWidth") {
                    0.0
                } else {
                    node.num_attr("strokeWidth").unwrap_or(0.0)
                },
                corner_radius: node.num_attr("cornerRadius").unwrap_or(0.0),
                opacity,
            })
        }
        "Group" => ObjectProps::Group(GroupProps {
            children: nodes_to_objects(&node.children),
        }),
        other => {
            return Err(TranslationError::UnknownNode {
                engine: NAME,
                kind: other.to_string(),
            })
        }
    };
    let id = node.canonical_id().map_or_else(
        || {
            tracing::debug!(class = %node.class_name, "Adopting Konva node without canonical id");
            ObjectId::new()
        },
        ObjectId::from,
    );
    let z_index = node
        .attrs
        .get("zIndex")
        .and_then(Value::as_i64)
        .and_then(|z| i32::try_from(z).ok())
        .unwrap_or(0);
    Ok(Object {
        id,
        role: text_attr("name"),
        bounds: node.bounds(),
        z_index,
        props,
        bindings: None,
    })
}

fn nodes_to_objects(nodes: &[KonvaNode]) -> Vec<Object> {
    nodes
        .iter()
        .filter_map(|node| native_to_object(node).map_err(|e| log_dropped(&e)).ok())
        .collect()
}

/// Konva events the editor listens to. Targets are serialized nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum KonvaEvent {
    Dragend { target: KonvaNode },
    Transformend { target: KonvaNode },
    Textchange { target: KonvaNode },
    Select {
        #[serde(default)]
        ids: Vec<String>,
    },
    #[serde(other)]
    Other,
}

fn target_id(target: &KonvaNode) -> Result<ObjectId, TranslationError> {
    target
        .canonical_id()
        .map(ObjectId::from)
        .ok_or_else(|| TranslationError::Malformed {
            engine: NAME,
            reason: "event target has no attrs.id".to_string(),
        })
}

impl Engine for KonvaEngine {
    type Scene = KonvaStage;

    fn name(&self) -> &'static str {
        NAME
    }

    fn from_canonical(&self, doc: &Document) -> Self::Scene {
        KonvaStage {
            header: SceneHeader::from_document(doc),
            children: doc
                .pages()
                .iter()
                .map(|page| KonvaLayer {
                    attrs: LayerAttrs {
                        id: page.id.to_string(),
                        name: page.name.clone(),
                        width: page.width,
                        height: page.height,
                        fill: page.background.clone(),
                    },
                    children: page.objects.iter().map(object_to_native).collect(),
                })
                .collect(),
        }
    }

    fn to_canonical(&self, scene: &Self::Scene) -> Result<Document, TranslationError> {
        let pages = scene
            .children
            .iter()
            .map(|layer| Page {
                id: PageId::from(layer.attrs.id.as_str()),
                name: layer.attrs.name.clone(),
                width: layer.attrs.width,
                height: layer.attrs.height,
                background: layer.attrs.fill.clone(),
                objects: nodes_to_objects(&layer.children),
            })
            .collect();
        scene.header.clone().into_document(NAME, pages)
    }

    fn insert_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        index: usize,
        object: &Object,
    ) -> Result<(), TranslationError> {
        let children = &mut Self::layer_mut(scene, page)?.children;
        let at = index.min(children.len());
        children.insert(at, object_to_native(object));
        Ok(())
    }

    fn remove_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<(), TranslationError> {
        let children = &mut Self::layer_mut(scene, page)?.children;
        let index = children
            .iter()
            .position(|n| n.canonical_id() == Some(id.as_str()))
            .ok_or_else(|| TranslationError::NodeNotFound {
                engine: NAME,
                id: id.clone(),
            })?;
        children.remove(index);
        Ok(())
    }

    fn set_field(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        object: &Object,
        field: Field,
    ) -> Result<(), TranslationError> {
        let node = Self::node_mut(scene, page, &object.id)?;
        match field {
            Field::Bounds => node.set_bounds(object.bounds),
            Field::ZIndex => node.set("zIndex", object.z_index),
            Field::Role => match &object.role {
                Some(role) => node.set("name", role.clone()),
                None => {
                    node.attrs.remove("name");
                }
            },
            Field::Bindings => log_dropped(&TranslationError::UnsupportedField {
                engine: NAME,
                field: "bindings",
            }),
            Field::Props => {
                let bounds = node.bounds();
                let mut fresh = object_to_native(object);
                for key in ["id", "name", "zIndex"] {
                    match node.attrs.get(key) {
                        Some(value) => fresh.set(key, value.clone()),
                        None => {
                            fresh.attrs.remove(key);
                        }
                    }
                }
                fresh.set_bounds(bounds);
                *node = fresh;
            }
        }
        Ok(())
    }

    fn set_background(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        background: &str,
    ) -> Result<(), TranslationError> {
        Self::layer_mut(scene, page)?.attrs.fill = background.to_string();
        Ok(())
    }

    #[allow(clippy::float_cmp)] // Sizes are compared against values Konva echoed back
    fn capture_event(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        raw: &serde_json::Value,
    ) -> Result<Option<EngineEvent>, TranslationError> {
        let event: KonvaEvent =
            serde_json::from_value(raw.clone()).map_err(|e| TranslationError::Malformed {
                engine: NAME,
                reason: e.to_string(),
            })?;
        match event {
            KonvaEvent::Dragend { target } | KonvaEvent::Transformend { target } => {
                let id = target_id(&target)?;
                let node = Self::node_mut(scene, page, &id)?;
                let before = node.bounds();
                for (key, value) in target.attrs {
                    node.attrs.insert(key, value);
                }
                let bounds = node.bounds();
                node.set_bounds(bounds);
                if bounds.width == before.width && bounds.height == before.height {
                    Ok(Some(EngineEvent::Moved {
                        id,
                        x: bounds.x,
                        y: bounds.y,
                    }))
                } else {
                    Ok(Some(EngineEvent::Resized { id, bounds }))
                }
            }
            KonvaEvent::Textchange { target } => {
                let id = target_id(&target)?;
                let text = target.str_attr("text").unwrap_or_default().to_string();
                Self::node_mut(scene, page, &id)?.set("text", text.clone());
                Ok(Some(EngineEvent::TextEdited { id, text }))
            }
            KonvaEvent::Select { ids } => Ok(Some(EngineEvent::SelectionChanged {
                ids: ids.into_iter().map(ObjectId::from).collect(),
            })),
            KonvaEvent::Other => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, PageId) {
        let mut doc = Document::new("Konva");
        let page = doc.first_page_id().expect("page").clone();
        doc.add_object(
            &page,
            Object::text("Hello")
                .with_id("t1")
                .with_role("headline")
                .with_binding("title"),
        )
        .expect("t1");
        doc.add_object(
            &page,
            Object::shape(ShapeKind::Ellipse)
                .with_id("e1")
                .with_bounds(Bounds::new(100.0, 100.0, 60.0, 40.0)),
        )
        .expect("e1");
        doc.add_object(
            &page,
            Object::shape(ShapeKind::Line)
                .with_id("l1")
                .with_bounds(Bounds::new(0.0, 500.0, 300.0, 0.0)),
        )
        .expect("l1");
        (doc, page)
    }

    #[test]
    fn test_bindings_are_dropped() {
        let (doc, _) = sample();
        let engine = KonvaEngine::new();
        let back = engine
            .to_canonical(&engine.from_canonical(&doc))
            .expect("to canonical");
        let text = back.find_object(&"t1".into()).expect("t1");
        assert_eq!(text.bindings, None);
        assert_eq!(text.role.as_deref(), Some("headline"));
    }

    #[test]
    fn test_ellipse_uses_center_and_radii() {
        let (doc, _) = sample();
        let scene = KonvaEngine::new().from_canonical(&doc);
        let ellipse = &scene.children[0].children[1];
        assert_eq!(ellipse.num_attr("x"), Some(130.0));
        assert_eq!(ellipse.num_attr("radiusY"), Some(20.0));
        assert_eq!(ellipse.bounds(), Bounds::new(100.0, 100.0, 60.0, 40.0));
    }

    #[test]
    fn test_line_round_trips_through_points() {
        let (doc, _) = sample();
        let engine = KonvaEngine::new();
        let back = engine
            .to_canonical(&engine.from_canonical(&doc))
            .expect("to canonical");
        assert_eq!(
            back.find_object(&"l1".into()).expect("l1").bounds,
            Bounds::new(0.0, 500.0, 300.0, 0.0)
        );
    }

    #[test]
    fn test_transformend_applies_scale() {
        let (doc, page) = sample();
        let engine = KonvaEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "transformend",
                    "target": {"className": "Ellipse", "attrs": {"id": "e1", "scaleX": 2.0}}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::Resized {
                id: "e1".into(),
                bounds: Bounds::new(70.0, 100.0, 120.0, 40.0)
            })
        );
        let node = &scene.children[0].children[1];
        assert_eq!(node.num_attr("scaleX"), None);
        assert_eq!(node.num_attr("radiusX"), Some(60.0));
    }

    #[test]
    fn test_dragend_is_move() {
        let (doc, page) = sample();
        let engine = KonvaEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "dragend",
                    "target": {"className": "Text", "attrs": {"id": "t1", "x": 12.0, "y": 34.0}}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::Moved {
                id: "t1".into(),
                x: 12.0,
                y: 34.0
            })
        );
    }

    #[test]
    fn test_dragend_on_line_offsets_points() {
        let (doc, page) = sample();
        let engine = KonvaEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "dragend",
                    "target": {"className": "Line", "attrs": {"id": "l1", "x": 50, "y": 20}}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::Moved {
                id: "l1".into(),
                x: 50.0,
                y: 520.0
            })
        );
        let node = &scene.children[0].children[2];
        assert_eq!(node.num_attr("x"), None);
        assert_eq!(node.attrs.get("points"), Some(&json!([50.0, 520.0, 350.0, 520.0])));
        assert_eq!(node.bounds(), Bounds::new(50.0, 520.0, 300.0, 0.0));
    }

    #[test]
    fn test_line_is_stroked_with_fill_by_default() {
        let (doc, _) = sample();
        let engine = KonvaEngine::new();
        let scene = engine.from_canonical(&doc);
        let line = &scene.children[0].children[2];
        assert_eq!(line.str_attr("stroke"), line.str_attr("fill"));
        assert_eq!(line.num_attr("strokeWidth"), Some(LINE_STROKE_WIDTH));

        let back = engine.to_canonical(&scene).expect("to canonical");
        let ObjectProps::Shape(shape) = &back.find_object(&"l1".into()).expect("l1").props else {
            panic!("expected shape");
        };
        assert_eq!(shape.stroke, None);
        assert!(shape.stroke_width.abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_keeps_explicit_stroke() {
        let mut line = Object::shape(ShapeKind::Line).with_id("l2");
        if let ObjectProps::Shape(shape) = &mut line.props {
            shape.stroke = Some("#FF0000".to_string());
            shape.stroke_width = 5.0;
        }
        let node = object_to_native(&line);
        assert_eq!(node.str_attr("stroke"), Some("#FF0000"));
        assert_eq!(node.num_attr("strokeWidth"), Some(5.0));
        assert_eq!(native_to_object(&node).expect("back").props, line.props);
    }

    #[test]
    fn test_events_reach_grouped_children() {
        let mut doc = Document::new("Grouped");
        let page = doc.first_page_id().expect("page").clone();
        let child = Object::text("Inside")
            .with_id("c1")
            .with_bounds(Bounds::new(10.0, 10.0, 100.0, 20.0));
        doc.add_object(&page, Object::group(vec![child]).with_id("g1"))
            .expect("g1");
        let engine = KonvaEngine::new();
        let mut scene = engine.from_canonical(&doc);

        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "textchange",
                    "target": {"className": "Text", "attrs": {"id": "c1", "text": "Edited"}}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::TextEdited {
                id: "c1".into(),
                text: "Edited".to_string()
            })
        );
        let grouped = &scene.children[0].children[0].children[0];
        assert_eq!(grouped.str_attr("text"), Some("Edited"));

        let mut moved = doc.find_object(&"c1".into()).expect("c1").clone();
        moved.bounds = Bounds::new(40.0, 10.0, 100.0, 20.0);
        engine
            .set_field(&mut scene, &page, &moved, Field::Bounds)
            .expect("bounds");
        let grouped = &scene.children[0].children[0].children[0];
        assert_eq!(grouped.num_attr("x"), Some(40.0));
    }

    #[test]
    fn test_props_setter_keeps_identity_and_geometry() {
        let (doc, page) = sample();
        let engine = KonvaEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let mut recolored = doc.find_object(&"e1".into()).expect("e1").clone();
        if let ObjectProps::Shape(shape) = &mut recolored.props {
            shape.fill = "#FF0000".to_string();
        }
        engine
            .set_field(&mut scene, &page, &recolored, Field::Props)
            .expect("props");
        let node = &scene.children[0].children[1];
        assert_eq!(node.str_attr("fill"), Some("#FF0000"));
        assert_eq!(node.canonical_id(), Some("e1"));
        assert_eq!(node.bounds(), Bounds::new(100.0, 100.0, 60.0, 40.0));
    }

    #[test]
    fn test_unknown_class_is_dropped() {
        let (doc, _) = sample();
        let engine = KonvaEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let mut star = KonvaNode::new("Star");
        star.set("id", "star1");
        scene.children[0].children.push(star);
        let back = engine.to_canonical(&scene).expect("to canonical");
        assert!(back.find_object(&"star1".into()).is_none());
    }
}
