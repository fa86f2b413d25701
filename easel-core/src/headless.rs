//! Headless engine whose native scene is the canonical document itself.
//!
//! Used for server-side editing where nothing is drawn, and as the reference
//! engine for exercising the pipeline without a real renderer. Native events
//! are serialized [`EngineEvent`]s.

use crate::adapter::{Engine, Field};
use crate::document::{find_in_mut, Document, Page, PageId};
use crate::error::TranslationError;
use crate::event::EngineEvent;
use crate::object::{Object, ObjectId, ObjectProps};

const NAME: &str = "headless";

/// Identity engine over [`Document`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessEngine;

impl HeadlessEngine {
    fn page_mut<'a>(
        scene: &'a mut Option<Document>,
        page: &PageId,
    ) -> Result<&'a mut Page, TranslationError> {
        scene
            .as_mut()
            .and_then(|doc| doc.pages_mut().iter_mut().find(|p| &p.id == page))
            .ok_or_else(|| TranslationError::PageNotFound {
                engine: NAME,
                id: page.clone(),
            })
    }

    fn node_mut<'a>(
        scene: &'a mut Option<Document>,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<&'a mut Object, TranslationError> {
        find_in_mut(&mut Self::page_mut(scene, page)?.objects, id)
            .ok_or_else(|| TranslationError::NodeNotFound {
                engine: NAME,
                id: id.clone(),
            })
    }
}

impl Engine for HeadlessEngine {
    type Scene = Option<Document>;

    fn name(&self) -> &'static str {
        NAME
    }

    fn from_canonical(&self, doc: &Document) -> Self::Scene {
        Some(doc.clone())
    }

    fn to_canonical(&self, scene: &Self::Scene) -> Result<Document, TranslationError> {
        scene.clone().ok_or_else(|| TranslationError::Malformed {
            engine: NAME,
            reason: "no document loaded".to_string(),
        })
    }

    fn insert_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        index: usize,
        object: &Object,
    ) -> Result<(), TranslationError> {
        let objects = &mut Self::page_mut(scene, page)?.objects;
        let at = index.min(objects.len());
        objects.insert(at, object.clone());
        Ok(())
    }

    fn remove_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<(), TranslationError> {
        let objects = &mut Self::page_mut(scene, page)?.objects;
        let index = objects
            .iter()
            .position(|o| &o.id == id)
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
        match field {
            Field::Bounds => node.bounds = object.bounds,
            Field::ZIndex => node.z_index = object.z_index,
            Field::Props => node.props = object.props.clone(),
            Field::Role => node.role.clone_from(&object.role),
            Field::Bindings => node.bindings.clone_from(&object.bindings),
        }
        Ok(())
    }

    fn set_background(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        background: &str,
    ) -> Result<(), TranslationError> {
        Self::page_mut(scene, page)?.background = background.to_string();
        Ok(())
    }

    fn capture_event(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        raw: &serde_json::Value,
    ) -> Result<Option<EngineEvent>, TranslationError> {
        let event: EngineEvent =
            serde_json::from_value(raw.clone()).map_err(|e| TranslationError::Malformed {
                engine: NAME,
                reason: e.to_string(),
            })?;
        match &event {
            EngineEvent::Moved { id, x, y } => {
                let node = Self::node_mut(scene, page, id)?;
                node.bounds.x = *x;
                node.bounds.y = *y;
            }
            EngineEvent::Resized { id, bounds } => {
                Self::node_mut(scene, page, id)?.bounds = *bounds;
            }
            EngineEvent::TextEdited { id, text } => {
                if let ObjectProps::Text(props) = &mut Self::node_mut(scene, page, id)?.props {
                    props.text.clone_from(text);
                }
            }
            EngineEvent::SelectionChanged { .. } => {}
        }
        Ok(Some(event))
    }
}
