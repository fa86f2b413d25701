//! Fabric.js-style engine: one flat canvas of objects per page.
//!
//! Canonical metadata rides in each object's `data` bag, which Fabric
//! serializes untouched. Images that have not resolved yet are drawn as plain
//! rects flagged with `data.placeholder` and read back as images.

use serde::{Deserialize, Serialize};

use easel_core::{
    Binding, Bounds, Document, Engine, EngineEvent, Field, FontWeight, GroupProps, ImageProps,
    ImageStatus, Object, ObjectId, ObjectProps, Page, PageId, ShapeKind, ShapeProps, TextAlign,
    TextProps, TranslationError,
};

use super::{log_dropped, SceneHeader};

const NAME: &str = "fabric";

/// Fill used for unresolved image placeholders.
pub const PLACEHOLDER_FILL: &str = "#E0E0E0";

/// Native scene: every page as a Fabric canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricProject {
    /// Document-level data.
    pub header: SceneHeader,
    /// One canvas per page, in page order.
    pub canvases: Vec<FabricCanvas>,
}

/// A Fabric canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricCanvas {
    /// Canonical page id.
    pub page_id: String,
    /// Page name.
    pub name: String,
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
    /// Canvas background.
    pub background_color: String,
    /// Objects in canonical order; hosts stack by `data.zIndex`.
    pub objects: Vec<FabricObject>,
}

/// Canonical metadata stored on a Fabric object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricData {
    /// Canonical object id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    /// Semantic role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Canonical z-index.
    #[serde(default)]
    pub z_index: i32,
    /// Bound template field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    /// Asset reference of an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
    /// Resolution state of an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_status: Option<ImageStatus>,
    /// Marks a rect standing in for an unresolved image.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

/// A Fabric object as serialized by `canvas.toJSON(['data'])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricObject {
    /// Fabric class: `textbox`, `image`, `rect`, `ellipse`, `line` or `group`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Opacity.
    #[serde(default = "full_opacity")]
    pub opacity: f64,
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Stroke color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    /// Stroke width.
    #[serde(default)]
    pub stroke_width: f64,
    /// Horizontal radius (corner radius for rects).
    #[serde(default)]
    pub rx: f64,
    /// Vertical radius (corner radius for rects).
    #[serde(default)]
    pub ry: f64,
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// `normal` or `bold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    /// `left`, `center` or `right`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Group members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<FabricObject>,
    /// Canonical metadata.
    #[serde(default)]
    pub data: FabricData,
}

const fn full_opacity() -> f64 {
    1.0
}

impl FabricObject {
    fn shell(kind: &str, object: &Object) -> Self {
        Self {
            kind: kind.to_string(),
            left: object.bounds.x,
            top: object.bounds.y,
            width: object.bounds.width,
            height: object.bounds.height,
            opacity: 1.0,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            rx: 0.0,
            ry: 0.0,
            text: None,
            font_family: None,
            font_size: None,
            font_weight: None,
            text_align: None,
            src: None,
            objects: Vec::new(),
            data: FabricData {
                canonical_id: Some(object.id.to_string()),
                role: object.role.clone(),
                z_index: object.z_index,
                binding: object.bindings.as_ref().map(|b| b.field.clone()),
                ..FabricData::default()
            },
        }
    }

    /// Canonical id carried in `data`, if any.
    #[must_use]
    pub fn canonical_id(&self) -> Option<&str> {
        self.data.canonical_id.as_deref()
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.top, self.width, self.height)
    }
}

/// Fabric engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FabricEngine;

impl FabricEngine {
    /// Create the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn canvas_mut<'a>(
        scene: &'a mut FabricProject,
        page: &PageId,
    ) -> Result<&'a mut FabricCanvas, TranslationError> {
        scene
            .canvases
            .iter_mut()
            .find(|c| c.page_id == page.as_str())
            .ok_or_else(|| TranslationError::PageNotFound {
                engine: NAME,
                id: page.clone(),
            })
    }

    fn node_mut<'a>(
        scene: &'a mut FabricProject,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<&'a mut FabricObject, TranslationError> {
        find_object_mut(&mut Self::canvas_mut(scene, page)?.objects, id)
            .ok_or_else(|| TranslationError::NodeNotFound {
                engine: NAME,
                id: id.clone(),
            })
    }
}

/// Translate a canonical object into a Fabric object.
#[must_use]
pub fn object_to_native(object: &Object) -> FabricObject {
    match &object.props {
        ObjectProps::Text(text) => {
            let mut node = FabricObject::shell("textbox", object);
            node.text = Some(text.text.clone());
            node.font_family = Some(text.font_family.clone());
            node.font_size = Some(text.font_size);
            node.font_weight = Some(weight_name(text.font_weight).to_string());
            node.text_align = Some(align_name(text.align).to_string());
            node.fill = Some(text.fill.clone());
            node.opacity = text.opacity;
            node
        }
        ObjectProps::Image(image) => {
            let resolved = image.status == ImageStatus::Resolved;
            let mut node = FabricObject::shell(if resolved { "image" } else { "rect" }, object);
            if !resolved {
                node.fill = Some(PLACEHOLDER_FILL.to_string());
                node.data.placeholder = true;
            }
            node.src.clone_from(&image.src);
            node.opacity = image.opacity;
            node.data.asset_ref = Some(image.asset_ref.clone());
            node.data.image_status = Some(image.status);
            node
        }
        ObjectProps::Shape(shape) => {
            let kind = match shape.shape {
                ShapeKind::Rect => "rect",
                ShapeKind::Ellipse => "ellipse",
                ShapeKind::Line => "line",
            };
            let mut node = FabricObject::shell(kind, object);
            node.fill = Some(shape.fill.clone());
            node.stroke.clone_from(&shape.stroke);
            node.stroke_width = shape.stroke_width;
            node.opacity = shape.opacity;
            match shape.shape {
                ShapeKind::Rect => {
                    node.rx = shape.corner_radius;
                    node.ry = shape.corner_radius;
                }
                ShapeKind::Ellipse => {
                    node.rx = object.bounds.width / 2.0;
                    node.ry = object.bounds.height / 2.0;
                }
                ShapeKind::Line => {}
            }
            node
        }
        ObjectProps::Group(group) => {
            let mut node = FabricObject::shell("group", object);
            node.objects = group.children.iter().map(object_to_native).collect();
            node
        }
    }
}

/// Depth-first search through groups.
fn find_object_mut<'a>(
    objects: &'a mut [FabricObject],
    id: &ObjectId,
) -> Option<&'a mut FabricObject> {
    for object in objects {
        if object.canonical_id() == Some(id.as_str()) {
            return Some(object);
        }
        if let Some(found) = find_object_mut(&mut object.objects, id) {
            return Some(found);
        }
    }
    None
}

/// Translate a Fabric object back into a canonical object.
///
/// Objects created natively (without `data.canonicalId`) get a fresh id.
///
/// # Errors
///
/// Returns [`TranslationError::UnknownNode`] for Fabric classes with no
/// canonical counterpart.
pub fn native_to_object(node: &FabricObject) -> Result<Object, TranslationError> {
    let props = match node.kind.as_str() {
        "textbox" | "text" | "i-text" => {
            let defaults = TextProps::default();
            ObjectProps::Text(TextProps {
                text: node.text.clone().unwrap_or_default(),
                font_family: node.font_family.clone().unwrap_or(defaults.font_family),
                font_size: node.font_size.unwrap_or(defaults.font_size),
                font_weight: parse_weight(node.font_weight.as_deref()),
                fill: node.fill.clone().unwrap_or(defaults.fill),
                align: parse_align(node.text_align.as_deref()),
                opacity: node.opacity,
            })
        }
        "image" => ObjectProps::Image(image_props(node, ImageStatus::Resolved)),
        "rect" if node.data.placeholder => {
            ObjectProps::Image(image_props(node, ImageStatus::Pending))
        }
        "rect" | "ellipse" | "line" => {
            let shape = match node.kind.as_str() {
                "ellipse" => ShapeKind::Ellipse,
                "line" => ShapeKind::Line,
                _ => ShapeKind::Rect,
            };
            ObjectProps::Shape(ShapeProps {
                shape,
                fill: node.fill.clone().unwrap_or_else(|| ShapeProps::default().fill),
                stroke: node.stroke.clone(),
                stroke_width: node.stroke_width,
                corner_radius: if shape == ShapeKind::Rect { node.rx } else { 0.0 },
                opacity: node.opacity,
            })
        }
        "group" => ObjectProps::Group(GroupProps {
            children: nodes_to_objects(&node.objects),
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
            tracing::debug!(kind = %node.kind, "Adopting Fabric object without canonical id");
            ObjectId::new()
        },
        ObjectId::from,
    );
    Ok(Object {
        id,
        role: node.data.role.clone(),
        bounds: node.bounds(),
        z_index: node.data.z_index,
        props,
        bindings: node
            .data
            .binding
            .clone()
            .map(|field| Binding { field }),
    })
}

fn nodes_to_objects(nodes: &[FabricObject]) -> Vec<Object> {
    nodes
        .iter()
        .filter_map(|node| native_to_object(node).map_err(|e| log_dropped(&e)).ok())
        .collect()
}

fn image_props(node: &FabricObject, fallback: ImageStatus) -> ImageProps {
    ImageProps {
        asset_ref: node.data.asset_ref.clone().unwrap_or_default(),
        src: node.src.clone(),
        status: node.data.image_status.unwrap_or(fallback),
        opacity: node.opacity,
    }
}

const fn weight_name(weight: FontWeight) -> &'static str {
    match weight {
        FontWeight::Normal => "normal",
        FontWeight::Bold => "bold",
    }
}

fn parse_weight(value: Option<&str>) -> FontWeight {
    match value {
        Some("bold" | "700" | "800" | "900") => FontWeight::Bold,
        _ => FontWeight::Normal,
    }
}

const fn align_name(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
    }
}

fn parse_align(value: Option<&str>) -> TextAlign {
    match value {
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        _ => TextAlign::Left,
    }
}

/// Subset of a Fabric event target the editor reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FabricTarget {
    #[serde(default)]
    data: FabricData,
    left: Option<f64>,
    top: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    #[serde(default = "full_opacity")]
    scale_x: f64,
    #[serde(default = "full_opacity")]
    scale_y: f64,
    text: Option<String>,
}

impl FabricTarget {
    fn id(&self) -> Result<ObjectId, TranslationError> {
        self.data
            .canonical_id
            .as_deref()
            .map(ObjectId::from)
            .ok_or_else(|| TranslationError::Malformed {
                engine: NAME,
                reason: "event target has no data.canonicalId".to_string(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum FabricEvent {
    #[serde(rename = "object:modified")]
    ObjectModified { target: FabricTarget },
    #[serde(rename = "text:changed")]
    TextChanged { target: FabricTarget },
    #[serde(rename = "selection:created", alias = "selection:updated")]
    SelectionSet {
        #[serde(default)]
        selected: Vec<FabricTarget>,
    },
    #[serde(rename = "selection:cleared")]
    SelectionCleared,
    #[serde(other)]
    Other,
}

impl Engine for FabricEngine {
    type Scene = FabricProject;

    fn name(&self) -> &'static str {
        NAME
    }

    fn from_canonical(&self, doc: &Document) -> Self::Scene {
        FabricProject {
            header: SceneHeader::from_document(doc),
            canvases: doc
                .pages()
                .iter()
                .map(|page| FabricCanvas {
                    page_id: page.id.to_string(),
                    name: page.name.clone(),
                    width: page.width,
                    height: page.height,
                    background_color: page.background.clone(),
                    objects: page.objects.iter().map(object_to_native).collect(),
                })
                .collect(),
        }
    }

    fn to_canonical(&self, scene: &Self::Scene) -> Result<Document, TranslationError> {
        let pages = scene
            .canvases
            .iter()
            .map(|canvas| Page {
                id: PageId::from(canvas.page_id.as_str()),
                name: canvas.name.clone(),
                width: canvas.width,
                height: canvas.height,
                background: canvas.background_color.clone(),
                objects: nodes_to_objects(&canvas.objects),
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
        let objects = &mut Self::canvas_mut(scene, page)?.objects;
        let at = index.min(objects.len());
        objects.insert(at, object_to_native(object));
        Ok(())
    }

    fn remove_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<(), TranslationError> {
        let objects = &mut Self::canvas_mut(scene, page)?.objects;
        let index = objects
            .iter()
            .position(|o| o.canonical_id() == Some(id.as_str()))
            .ok_or_else(|| TranslationError::NodeNotFound {
                engine: NAME,
                id: id.clone(),
            })?;
        objects.remove(index);
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
        let fresh = object_to_native(object);
        match field {
            Field::Bounds => {
                node.left = fresh.left;
                node.top = fresh.top;
                node.width = fresh.width;
                node.height = fresh.height;
                if node.kind == "ellipse" {
                    node.rx = fresh.rx;
                    node.ry = fresh.ry;
                }
            }
            Field::ZIndex => node.data.z_index = fresh.data.z_index,
            Field::Role => node.data.role = fresh.data.role,
            Field::Bindings => node.data.binding = fresh.data.binding,
            Field::Props => {
                let (left, top, width, height) = (node.left, node.top, node.width, node.height);
                let identity = node.data.clone();
                *node = fresh;
                node.left = left;
                node.top = top;
                node.width = width;
                node.height = height;
                node.data.canonical_id = identity.canonical_id;
                node.data.role = identity.role;
                node.data.z_index = identity.z_index;
                node.data.binding = identity.binding;
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
        Self::canvas_mut(scene, page)?.background_color = background.to_string();
        Ok(())
    }

    #[allow(clippy::float_cmp)] // Sizes are compared against values Fabric echoed back
    fn capture_event(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        raw: &serde_json::Value,
    ) -> Result<Option<EngineEvent>, TranslationError> {
        let event: FabricEvent =
            serde_json::from_value(raw.clone()).map_err(|e| TranslationError::Malformed {
                engine: NAME,
                reason: e.to_string(),
            })?;
        match event {
            FabricEvent::ObjectModified { target } => {
                let id = target.id()?;
                let node = Self::node_mut(scene, page, &id)?;
                let bounds = Bounds::new(
                    target.left.unwrap_or(node.left),
                    target.top.unwrap_or(node.top),
                    target.width.unwrap_or(node.width) * target.scale_x,
                    target.height.unwrap_or(node.height) * target.scale_y,
                );
                let resized = bounds.width != node.width || bounds.height != node.height;
                node.left = bounds.x;
                node.top = bounds.y;
                node.width = bounds.width;
                node.height = bounds.height;
                Ok(Some(if resized {
                    EngineEvent::Resized { id, bounds }
                } else {
                    EngineEvent::Moved {
                        id,
                        x: bounds.x,
                        y: bounds.y,
                    }
                }))
            }
            FabricEvent::TextChanged { target } => {
                let id = target.id()?;
                let text = target.text.clone().unwrap_or_default();
                Self::node_mut(scene, page, &id)?.text = Some(text.clone());
                Ok(Some(EngineEvent::TextEdited { id, text }))
            }
            FabricEvent::SelectionSet { selected } => Ok(Some(EngineEvent::SelectionChanged {
                ids: selected
                    .iter()
                    .filter_map(|t| t.data.canonical_id.as_deref().map(ObjectId::from))
                    .collect(),
            })),
            FabricEvent::SelectionCleared => {
                Ok(Some(EngineEvent::SelectionChanged { ids: Vec::new() }))
            }
            FabricEvent::Other => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (Document, PageId) {
        let mut doc = Document::new("Fabric");
        let page = doc.first_page_id().expect("page").clone();
        doc.add_object(
            &page,
            Object::text("Sale")
                .with_id("t1")
                .with_role("headline")
                .with_binding("title"),
        )
        .expect("t1");
        doc.add_object(&page, Object::image("logo").with_id("i1"))
            .expect("i1");
        doc.add_object(
            &page,
            Object::shape(ShapeKind::Ellipse)
                .with_id("s1")
                .with_bounds(Bounds::new(10.0, 10.0, 40.0, 20.0)),
        )
        .expect("s1");
        (doc, page)
    }

    #[test]
    fn test_translation_is_lossless() {
        let (doc, _) = sample();
        let engine = FabricEngine::new();
        let back = engine
            .to_canonical(&engine.from_canonical(&doc))
            .expect("to canonical");
        assert!(back.same_content(&doc));
    }

    #[test]
    fn test_pending_image_is_placeholder_rect() {
        let (doc, _) = sample();
        let scene = FabricEngine::new().from_canonical(&doc);
        let node = &scene.canvases[0].objects[1];
        assert_eq!(node.kind, "rect");
        assert!(node.data.placeholder);
        assert_eq!(node.fill.as_deref(), Some(PLACEHOLDER_FILL));
        assert_eq!(node.data.asset_ref.as_deref(), Some("logo"));
    }

    #[test]
    fn test_ellipse_radii_follow_bounds() {
        let (doc, _) = sample();
        let scene = FabricEngine::new().from_canonical(&doc);
        let ellipse = &scene.canvases[0].objects[2];
        assert_eq!((ellipse.rx, ellipse.ry), (20.0, 10.0));
    }

    #[test]
    fn test_unknown_class_is_dropped() {
        let (doc, _) = sample();
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let mut path = scene.canvases[0].objects[0].clone();
        path.kind = "path".to_string();
        path.data.canonical_id = Some("p1".to_string());
        scene.canvases[0].objects.push(path);
        let back = engine.to_canonical(&scene).expect("to canonical");
        assert!(back.find_object(&"p1".into()).is_none());
        assert_eq!(back.pages()[0].objects.len(), 3);
    }

    #[test]
    fn test_set_field_touches_only_that_field() {
        let (doc, page) = sample();
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let moved = doc
            .find_object(&"t1".into())
            .expect("t1")
            .clone()
            .with_role("subtitle")
            .with_bounds(Bounds::new(300.0, 300.0, 10.0, 10.0));
        engine
            .set_field(&mut scene, &page, &moved, Field::Role)
            .expect("set role");
        let node = &scene.canvases[0].objects[0];
        assert_eq!(node.data.role.as_deref(), Some("subtitle"));
        assert_eq!(node.left, 0.0);
    }

    #[test]
    fn test_object_modified_without_resize_is_move() {
        let (doc, page) = sample();
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "object:modified",
                    "target": {"data": {"canonicalId": "s1"}, "left": 50.0, "top": 60.0}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::Moved {
                id: "s1".into(),
                x: 50.0,
                y: 60.0
            })
        );
        assert_eq!(scene.canvases[0].objects[2].left, 50.0);
    }

    #[test]
    fn test_modified_grouped_child_is_found() {
        let mut doc = Document::new("Fabric");
        let page = doc.first_page_id().expect("page").clone();
        let child = Object::shape(ShapeKind::Rect)
            .with_id("c1")
            .with_bounds(Bounds::new(10.0, 10.0, 40.0, 20.0));
        doc.add_object(&page, Object::group(vec![child]).with_id("g1"))
            .expect("g1");
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "object:modified",
                    "target": {"data": {"canonicalId": "c1"}, "left": 30.0, "top": 10.0}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::Moved {
                id: "c1".into(),
                x: 30.0,
                y: 10.0
            })
        );
        assert_eq!(scene.canvases[0].objects[0].objects[0].left, 30.0);
    }

    #[test]
    fn test_scaled_object_is_resize() {
        let (doc, page) = sample();
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let event = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({
                    "type": "object:modified",
                    "target": {"data": {"canonicalId": "s1"}, "scaleX": 2.0}
                }),
            )
            .expect("capture");
        assert_eq!(
            event,
            Some(EngineEvent::Resized {
                id: "s1".into(),
                bounds: Bounds::new(10.0, 10.0, 80.0, 20.0)
            })
        );
    }

    #[test]
    fn test_selection_and_ignored_events() {
        let (doc, page) = sample();
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let selected = engine
            .capture_event(
                &mut scene,
                &page,
                &json!({"type": "selection:updated", "selected": [{"data": {"canonicalId": "t1"}}]}),
            )
            .expect("capture");
        assert_eq!(
            selected,
            Some(EngineEvent::SelectionChanged {
                ids: vec!["t1".into()]
            })
        );
        let ignored = engine
            .capture_event(&mut scene, &page, &json!({"type": "mouse:over"}))
            .expect("capture");
        assert_eq!(ignored, None);
    }

    #[test]
    fn test_event_without_canonical_id_is_malformed() {
        let (doc, page) = sample();
        let engine = FabricEngine::new();
        let mut scene = engine.from_canonical(&doc);
        let result = engine.capture_event(
            &mut scene,
            &page,
            &json!({"type": "text:changed", "target": {"text": "x"}}),
        );
        assert!(matches!(result, Err(TranslationError::Malformed { .. })));
    }
}
