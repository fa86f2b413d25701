//! Adapter abstraction over rendering engines.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        SceneAdapter (object safe)           │
//! ├─────────────────────────────────────────────┤
//! │        EngineAdapter<E: Engine>             │
//! ├──────────────────────┬──────────────────────┤
//! │ fabric (flat list)   │ konva (stage tree)   │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! An [`Engine`] owns a native scene type and knows how to translate it to
//! and from the canonical [`Document`], and how to patch single nodes.
//! [`EngineAdapter`] wraps an engine into the live handle the editor holds,
//! and [`AdapterRegistry`] picks one by name at runtime.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::document::{Document, PageId};
use crate::error::{EditorError, EditorResult, TranslationError};
use crate::event::EngineEvent;
use crate::object::{Object, ObjectId};

/// An object field that changed between two reconciled states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    /// Position and size.
    Bounds,
    /// Stacking order.
    ZIndex,
    /// Variant-specific properties.
    Props,
    /// Semantic role.
    Role,
    /// Template binding.
    Bindings,
}

/// One targeted native operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PatchOp {
    /// Construct a node tagged with the object id and insert it.
    Insert {
        /// Target page.
        page: PageId,
        /// Position among the page's top-level nodes.
        index: usize,
        /// Object to construct.
        object: Object,
    },
    /// Destroy the node for an object.
    Remove {
        /// Page holding the node.
        page: PageId,
        /// Object whose node is destroyed.
        id: ObjectId,
    },
    /// Call the setters for the changed fields only.
    Update {
        /// Page holding the node.
        page: PageId,
        /// Next canonical state of the object.
        object: Object,
        /// Fields whose setters must run.
        fields: Vec<Field>,
    },
    /// Change a page background.
    SetBackground {
        /// Target page.
        page: PageId,
        /// New `#RRGGBB` color.
        background: String,
    },
}

/// Ordered list of native operations produced by reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenePatch {
    /// Operations in application order.
    pub ops: Vec<PatchOp>,
}

impl ScenePatch {
    /// Whether the patch does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Call-count instrumentation for a live adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterStats {
    /// Full scene renders (initial load, reload, page switch).
    pub full_renders: usize,
    /// Nodes constructed by patches.
    pub inserts: usize,
    /// Nodes destroyed by patches.
    pub removes: usize,
    /// Objects that received at least one setter call.
    pub updated_objects: usize,
    /// Individual setter calls.
    pub setter_calls: usize,
}

/// A rendering engine: native scene type plus bidirectional translation.
///
/// Implementations must tag every node they create with the canonical id and
/// satisfy `from_canonical(to_canonical(from_canonical(d))) == from_canonical(d)`.
pub trait Engine: Send + 'static {
    /// Engine-specific native scene.
    type Scene: Clone + Default + PartialEq + fmt::Debug + Serialize + Send;

    /// Registry name.
    fn name(&self) -> &'static str;

    /// Build a native scene for the whole document.
    ///
    /// Fields the engine cannot represent are dropped and logged.
    fn from_canonical(&self, doc: &Document) -> Self::Scene;

    /// Read a native scene back into a canonical document.
    ///
    /// Nodes without a canonical counterpart are dropped and logged.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] only if the scene is structurally unusable.
    fn to_canonical(&self, scene: &Self::Scene) -> Result<Document, TranslationError>;

    /// Construct and insert a top-level node.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the page does not exist.
    fn insert_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        index: usize,
        object: &Object,
    ) -> Result<(), TranslationError>;

    /// Destroy a top-level node.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the node does not exist.
    fn remove_node(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        id: &ObjectId,
    ) -> Result<(), TranslationError>;

    /// Run the native setter for one field of `object`.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the node does not exist.
    fn set_field(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        object: &Object,
        field: Field,
    ) -> Result<(), TranslationError>;

    /// Change a page background.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the page does not exist.
    fn set_background(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        background: &str,
    ) -> Result<(), TranslationError>;

    /// Translate a raw engine event into a canonical event, updating the
    /// native scene to match what the engine now shows.
    ///
    /// Returns `Ok(None)` for events the editor does not care about.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the event payload is malformed.
    fn capture_event(
        &self,
        scene: &mut Self::Scene,
        page: &PageId,
        raw: &serde_json::Value,
    ) -> Result<Option<EngineEvent>, TranslationError>;
}

/// The live, object-safe handle the editing pipeline talks to.
pub trait SceneAdapter: Send {
    /// Name of the underlying engine.
    fn engine_name(&self) -> &'static str;

    /// Render `doc` from scratch and show `page` (`fromCanonical`).
    fn load(&mut self, doc: &Document, page: &PageId);

    /// Translate the live scene back (`toCanonical`).
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the scene is structurally unusable.
    fn snapshot(&self) -> Result<Document, TranslationError>;

    /// Apply a reconciliation patch (`applyDiff`).
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the live scene has drifted from the
    /// reconciler's view; the caller reloads the scene.
    fn apply_patch(&mut self, patch: &ScenePatch) -> Result<(), TranslationError>;

    /// Show another page.
    fn show_page(&mut self, doc: &Document, page: &PageId);

    /// Currently selected canonical ids (`getSelection`).
    fn selection(&self) -> Vec<ObjectId>;

    /// Replace the selection (`setSelection`).
    fn set_selection(&mut self, ids: &[ObjectId]);

    /// Feed a raw event emitted by the native engine.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationError`] if the payload is malformed.
    fn handle_native_event(&mut self, raw: &serde_json::Value) -> Result<(), TranslationError>;

    /// Take the canonical events captured since the last call.
    fn drain_events(&mut self) -> Vec<EngineEvent>;

    /// The native scene as JSON, for shipping to the real renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn native_json(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Call-count instrumentation.
    fn stats(&self) -> AdapterStats;

    /// Reset the instrumentation counters.
    fn reset_stats(&mut self);
}

/// Generic live adapter over any [`Engine`].
#[derive(Debug)]
pub struct EngineAdapter<E: Engine> {
    engine: E,
    scene: E::Scene,
    active_page: Option<PageId>,
    selection: Vec<ObjectId>,
    events: Vec<EngineEvent>,
    stats: AdapterStats,
}

impl<E: Engine> EngineAdapter<E> {
    /// Wrap an engine with an empty scene.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            scene: E::Scene::default(),
            active_page: None,
            selection: Vec::new(),
            events: Vec::new(),
            stats: AdapterStats::default(),
        }
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The native scene.
    #[must_use]
    pub fn scene(&self) -> &E::Scene {
        &self.scene
    }

    /// Mutable native scene, for hosts that mirror engine state directly.
    pub fn scene_mut(&mut self) -> &mut E::Scene {
        &mut self.scene
    }
}

impl<E: Engine> SceneAdapter for EngineAdapter<E> {
    fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    fn load(&mut self, doc: &Document, page: &PageId) {
        self.scene = self.engine.from_canonical(doc);
        self.active_page = Some(page.clone());
        self.selection.clear();
        self.events.clear();
        self.stats.full_renders += 1;
        tracing::debug!(
            engine = self.engine.name(),
            document = %doc.id,
            version = doc.version(),
            "Full scene render"
        );
    }

    fn snapshot(&self) -> Result<Document, TranslationError> {
        self.engine.to_canonical(&self.scene)
    }

    fn apply_patch(&mut self, patch: &ScenePatch) -> Result<(), TranslationError> {
        for op in &patch.ops {
            match op {
                PatchOp::Insert {
                    page,
                    index,
                    object,
                } => {
                    self.engine
                        .insert_node(&mut self.scene, page, *index, object)?;
                    self.stats.inserts += 1;
                }
                PatchOp::Remove { page, id } => {
                    self.engine.remove_node(&mut self.scene, page, id)?;
                    self.selection.retain(|s| s != id);
                    self.stats.removes += 1;
                }
                PatchOp::Update {
                    page,
                    object,
                    fields,
                } => {
                    for field in fields {
                        self.engine
                            .set_field(&mut self.scene, page, object, *field)?;
                        self.stats.setter_calls += 1;
                    }
                    self.stats.updated_objects += 1;
                }
                PatchOp::SetBackground { page, background } => {
                    self.engine
                        .set_background(&mut self.scene, page, background)?;
                    self.stats.setter_calls += 1;
                }
            }
        }
        Ok(())
    }

    fn show_page(&mut self, doc: &Document, page: &PageId) {
        // Page switches re-render everything on purpose.
        self.load(doc, page);
    }

    fn selection(&self) -> Vec<ObjectId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, ids: &[ObjectId]) {
        self.selection = ids.to_vec();
    }

    fn handle_native_event(&mut self, raw: &serde_json::Value) -> Result<(), TranslationError> {
        let Some(page) = self.active_page.clone() else {
            return Ok(());
        };
        if let Some(event) = self.engine.capture_event(&mut self.scene, &page, raw)? {
            if let EngineEvent::SelectionChanged { ids } = &event {
                self.selection.clone_from(ids);
            }
            tracing::trace!(engine = self.engine.name(), ?event, "Captured engine event");
            self.events.push(event);
        }
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn native_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.scene)
    }

    fn stats(&self) -> AdapterStats {
        self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = AdapterStats::default();
    }
}

/// Factory producing a fresh live adapter.
pub type AdapterFactory = Box<dyn Fn() -> Box<dyn SceneAdapter> + Send + Sync>;

/// Maps engine names to adapter factories.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn SceneAdapter> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            tracing::debug!(engine = %name, "Replaced adapter factory");
        }
    }

    /// Register an [`Engine`] constructed by `make`.
    pub fn register_engine<E, F>(&mut self, name: impl Into<String>, make: F)
    where
        E: Engine,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.register(name, move || {
            Box::new(EngineAdapter::new(make())) as Box<dyn SceneAdapter>
        });
    }

    /// Create a live adapter for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::UnknownEngine`] if nothing is registered under `name`.
    pub fn create(&self, name: &str) -> EditorResult<Box<dyn SceneAdapter>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| EditorError::UnknownEngine {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("engines", &self.names())
            .finish()
    }
}
