//! Headless reconciliation between the canonical document and a live scene.
//!
//! The [`Reconciler`] keeps a mirror of the document as last pushed to the
//! adapter. Each commit is diffed against the mirror by object id:
//!
//! - ids only in the mirror are removed,
//! - ids only in the next document are inserted at their index,
//! - ids in both get setter calls for the changed fields only.
//!
//! A change of the page set (or a reordering the id diff cannot express)
//! falls back to a full reload.

use std::collections::{HashMap, HashSet};

use crate::adapter::{Field, PatchOp, ScenePatch};
use crate::document::{Document, Page};
use crate::object::{Object, ObjectId};

/// How to bring the live scene up to date.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Apply targeted native operations.
    Patch(ScenePatch),
    /// Re-render the whole scene.
    Reload,
}

/// Id-based differ that remembers what the scene currently shows.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    mirror: Option<Document>,
}

impl Reconciler {
    /// Create a reconciler with nothing mirrored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the scene was fully rendered from `doc`.
    pub fn prime(&mut self, doc: &Document) {
        self.mirror = Some(doc.clone());
    }

    /// Whether a mirror is held.
    #[must_use]
    pub fn is_primed(&self) -> bool {
        self.mirror.is_some()
    }

    /// Diff `next` against the mirror and adopt it as the new mirror.
    pub fn diff(&mut self, next: &Document) -> Reconciliation {
        let result = match &self.mirror {
            Some(previous) => diff_documents(previous, next),
            None => Reconciliation::Reload,
        };
        self.mirror = Some(next.clone());
        if let Reconciliation::Patch(patch) = &result {
            tracing::trace!(ops = patch.len(), version = next.version(), "Reconciled");
        } else {
            tracing::debug!(version = next.version(), "Reconciliation requires reload");
        }
        result
    }

    /// Patch re-pushing every field of `id` from `doc`, used to snap the scene
    /// back after an engine-originated edit was rejected.
    #[must_use]
    pub fn resync(&self, doc: &Document, id: &ObjectId) -> Option<ScenePatch> {
        let mut loc = doc.locate(id)?;
        let mut top = id.clone();
        while let Some(parent) = loc.parent.clone() {
            top = parent;
            loc = doc.locate(&top)?;
        }
        let object = doc.find_object(&top)?.clone();
        Some(ScenePatch {
            ops: vec![PatchOp::Update {
                page: loc.page,
                object,
                fields: vec![
                    Field::Bounds,
                    Field::ZIndex,
                    Field::Props,
                    Field::Role,
                    Field::Bindings,
                ],
            }],
        })
    }
}

#[allow(clippy::float_cmp)] // Page sizes are copied, never computed
fn diff_documents(previous: &Document, next: &Document) -> Reconciliation {
    let same_pages = previous.pages().len() == next.pages().len()
        && previous
            .pages()
            .iter()
            .zip(next.pages())
            .all(|(a, b)| a.id == b.id && a.width == b.width && a.height == b.height);
    if !same_pages {
        return Reconciliation::Reload;
    }
    let mut patch = ScenePatch::default();
    for (before, after) in previous.pages().iter().zip(next.pages()) {
        if !diff_page(before, after, &mut patch.ops) {
            return Reconciliation::Reload;
        }
    }
    Reconciliation::Patch(patch)
}

/// Append ops for one page; `false` if surviving objects were reordered.
fn diff_page(before: &Page, after: &Page, ops: &mut Vec<PatchOp>) -> bool {
    let old: HashMap<&ObjectId, &Object> = before.objects.iter().map(|o| (&o.id, o)).collect();
    let new_ids: HashSet<&ObjectId> = after.objects.iter().map(|o| &o.id).collect();

    let kept: Vec<&ObjectId> = before
        .objects
        .iter()
        .map(|o| &o.id)
        .filter(|id| new_ids.contains(id))
        .collect();
    let surviving: Vec<&ObjectId> = after
        .objects
        .iter()
        .map(|o| &o.id)
        .filter(|id| old.contains_key(id))
        .collect();
    if kept != surviving {
        return false;
    }

    for object in &before.objects {
        if !new_ids.contains(&object.id) {
            ops.push(PatchOp::Remove {
                page: after.id.clone(),
                id: object.id.clone(),
            });
        }
    }
    for (index, object) in after.objects.iter().enumerate() {
        match old.get(&object.id) {
            None => ops.push(PatchOp::Insert {
                page: after.id.clone(),
                index,
                object: object.clone(),
            }),
            Some(previous) if *previous != object => ops.push(PatchOp::Update {
                page: after.id.clone(),
                object: object.clone(),
                fields: changed_fields(previous, object),
            }),
            Some(_) => {}
        }
    }
    if before.background != after.background {
        ops.push(PatchOp::SetBackground {
            page: after.id.clone(),
            background: after.background.clone(),
        });
    }
    true
}

fn changed_fields(previous: &Object, next: &Object) -> Vec<Field> {
    let mut fields = Vec::new();
    if previous.bounds != next.bounds {
        fields.push(Field::Bounds);
    }
    if previous.z_index != next.z_index {
        fields.push(Field::ZIndex);
    }
    if previous.props != next.props {
        fields.push(Field::Props);
    }
    if previous.role != next.role {
        fields.push(Field::Role);
    }
    if previous.bindings != next.bindings {
        fields.push(Field::Bindings);
    }
    fields
}
