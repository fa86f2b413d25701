//! The canonical document: pages of objects plus the version counter.
//!
//! [`Document::apply_edit`] is the single mutation entry point. The executor
//! and the history manager express every change as a list of [`Edit`]s, and
//! each applied edit returns its exact inverse.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::object::{is_hex_color, Object, ObjectId, ObjectType};

string_id!(
    /// Unique identifier for a document.
    DocumentId
);

string_id!(
    /// Unique identifier for a page.
    PageId
);

/// Default page width in pixels.
pub const DEFAULT_PAGE_WIDTH: f64 = 1080.0;

/// Default page height in pixels.
pub const DEFAULT_PAGE_HEIGHT: f64 = 1080.0;

/// What the document is edited for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    /// Static design.
    #[default]
    Design,
    /// Slide deck.
    Presentation,
    /// Storyboard for video.
    Video,
}

/// Descriptive metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Human readable title.
    pub title: String,
    /// Creation time in milliseconds since epoch.
    #[serde(default)]
    pub created_at: u64,
    /// Time of the last committed mutation in milliseconds since epoch.
    #[serde(default)]
    pub updated_at: u64,
    /// Free-form extra data from generators.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A page of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Unique identifier.
    pub id: PageId,
    /// Display name.
    pub name: String,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Background color as `#RRGGBB`.
    pub background: String,
    /// Top-level objects in insertion order.
    pub objects: Vec<Object>,
}

impl Page {
    /// Create an empty white page.
    #[must_use]
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: PageId::new(),
            name: name.into(),
            width,
            height,
            background: "#FFFFFF".to_string(),
            objects: Vec::new(),
        }
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<PageId>) -> Self {
        self.id = id.into();
        self
    }

    /// Add an object during construction.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the object is malformed or one of its
    /// ids is already used on this page.
    pub fn with_object(mut self, object: Object) -> Result<Self, ValidationError> {
        object.validate()?;
        let existing: HashSet<&ObjectId> = self.all_ids().into_iter().collect();
        for id in object.subtree_ids() {
            if existing.contains(id) {
                return Err(ValidationError::DuplicateId(id.clone()));
            }
        }
        self.objects.push(object);
        Ok(self)
    }

    /// Ids of every object on this page, including group children.
    #[must_use]
    pub fn all_ids(&self) -> Vec<&ObjectId> {
        self.objects.iter().flat_map(Object::subtree_ids).collect()
    }

    /// Objects in paint order (ascending z-index, insertion order for ties),
    /// descending into groups.
    #[must_use]
    pub fn paint_order(&self) -> Vec<&Object> {
        let mut out = Vec::new();
        collect_paint_order(&self.objects, &mut out);
        out
    }

    /// Find an object on this page by id.
    #[must_use]
    pub fn find(&self, id: &ObjectId) -> Option<&Object> {
        find_in(&self.objects, id)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let valid_size = |v: f64| v.is_finite() && v > 0.0;
        if !valid_size(self.width) || !valid_size(self.height) {
            return Err(ValidationError::InvalidPage {
                id: self.id.clone(),
                reason: "dimensions must be positive".to_string(),
            });
        }
        if !is_hex_color(&self.background) {
            return Err(ValidationError::InvalidPage {
                id: self.id.clone(),
                reason: "background must be a #RRGGBB color".to_string(),
            });
        }
        self.objects.iter().try_for_each(Object::validate)
    }
}

/// A primitive, invertible document mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum Edit {
    /// Insert an object into a page or group at `index`.
    Insert {
        /// Target page.
        page: PageId,
        /// Parent group, or `None` for the page itself.
        parent: Option<ObjectId>,
        /// Position in the parent's object list.
        index: usize,
        /// The object (with its subtree).
        object: Object,
    },
    /// Remove an object (and its subtree).
    Remove {
        /// Page holding the object.
        page: PageId,
        /// Object to remove.
        id: ObjectId,
    },
    /// Replace an object in place, keeping its position.
    Replace {
        /// Page holding the object.
        page: PageId,
        /// New value; its id names the object to replace.
        object: Object,
    },
    /// Change a page background.
    SetBackground {
        /// Target page.
        page: PageId,
        /// New `#RRGGBB` color.
        background: String,
    },
}

impl Edit {
    /// Page the edit applies to.
    #[must_use]
    pub fn page(&self) -> &PageId {
        match self {
            Self::Insert { page, .. }
            | Self::Remove { page, .. }
            | Self::Replace { page, .. }
            | Self::SetBackground { page, .. } => page,
        }
    }
}

/// Where an object lives inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Owning page.
    pub page: PageId,
    /// Parent group, if nested.
    pub parent: Option<ObjectId>,
    /// Position in the parent's object list.
    pub index: usize,
}

/// The canonical, engine-agnostic document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier.
    pub id: DocumentId,
    /// Pages in order.
    pages: Vec<Page>,
    /// Editing mode.
    #[serde(default)]
    pub mode: DocumentMode,
    /// Descriptive metadata.
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// Incremented on every committed mutation.
    #[serde(default)]
    version: u64,
    /// Reference to an external brand kit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_kit_ref: Option<String>,
}

impl Document {
    /// Create a blank document with a single default page.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            pages: vec![Page::new("Page 1", DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)],
            mode: DocumentMode::Design,
            metadata: DocumentMetadata {
                title: title.into(),
                created_at: now_ms(),
                updated_at: 0,
                extra: serde_json::Map::new(),
            },
            version: 0,
            brand_kit_ref: None,
        }
    }

    /// Create a document from pages.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if any invariant is violated.
    pub fn from_pages(
        id: impl Into<DocumentId>,
        title: impl Into<String>,
        pages: Vec<Page>,
    ) -> Result<Self, ValidationError> {
        let doc = Self {
            id: id.into(),
            pages,
            mode: DocumentMode::Design,
            metadata: DocumentMetadata {
                title: title.into(),
                created_at: now_ms(),
                updated_at: 0,
                extra: serde_json::Map::new(),
            },
            version: 0,
            brand_kit_ref: None,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = id.into();
        self
    }

    /// Current version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// All pages.
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Page by id.
    #[must_use]
    pub fn page(&self, id: &PageId) -> Option<&Page> {
        self.pages.iter().find(|p| &p.id == id)
    }

    /// Id of the first page.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoPages`] for an empty document.
    pub fn first_page_id(&self) -> Result<&PageId, ValidationError> {
        self.pages
            .first()
            .map(|p| &p.id)
            .ok_or(ValidationError::NoPages)
    }

    /// Append a page during construction.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the page is invalid or reuses an id.
    pub fn add_page(&mut self, page: Page) -> Result<(), ValidationError> {
        page.validate()?;
        if self.page(&page.id).is_some() {
            return Err(ValidationError::DuplicatePage(page.id));
        }
        let existing: HashSet<&ObjectId> = self.object_ids().into_iter().collect();
        for id in page.all_ids() {
            if existing.contains(id) {
                return Err(ValidationError::DuplicateId(id.clone()));
            }
        }
        self.pages.push(page);
        Ok(())
    }

    /// Add an object to a page during construction (no version bump).
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the object is malformed, the page is
    /// unknown, or an id collides.
    pub fn add_object(&mut self, page: &PageId, object: Object) -> Result<(), ValidationError> {
        let index = self
            .page(page)
            .map(|p| p.objects.len())
            .ok_or_else(|| ValidationError::UnknownPage(page.clone()))?;
        self.apply_edit(&Edit::Insert {
            page: page.clone(),
            parent: None,
            index,
            object,
        })
        .map(|_| ())
    }

    /// Ids of every object in the document.
    #[must_use]
    pub fn object_ids(&self) -> Vec<&ObjectId> {
        self.pages.iter().flat_map(Page::all_ids).collect()
    }

    /// Find an object anywhere in the document.
    #[must_use]
    pub fn find_object(&self, id: &ObjectId) -> Option<&Object> {
        self.pages.iter().find_map(|p| p.find(id))
    }

    /// Locate an object anywhere in the document.
    #[must_use]
    pub fn locate(&self, id: &ObjectId) -> Option<ObjectLocation> {
        self.pages.iter().find_map(|p| {
            locate_in(&p.objects, id, None).map(|(parent, index)| ObjectLocation {
                page: p.id.clone(),
                parent,
                index,
            })
        })
    }

    /// Objects of the given type on a page, in paint order.
    #[must_use]
    pub fn objects_of_type(&self, page: &PageId, object_type: ObjectType) -> Vec<&Object> {
        self.page(page)
            .map(|p| {
                p.paint_order()
                    .into_iter()
                    .filter(|o| o.object_type() == object_type)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check every invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pages.is_empty() {
            return Err(ValidationError::NoPages);
        }
        let mut page_ids = HashSet::new();
        let mut object_ids = HashSet::new();
        for page in &self.pages {
            if !page_ids.insert(&page.id) {
                return Err(ValidationError::DuplicatePage(page.id.clone()));
            }
            page.validate()?;
            for id in page.all_ids() {
                if !object_ids.insert(id) {
                    return Err(ValidationError::DuplicateId(id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Whether content equals `other`, ignoring the version counter and the
    /// update timestamp.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.pages == other.pages
            && self.mode == other.mode
            && self.metadata.title == other.metadata.title
            && self.metadata.created_at == other.metadata.created_at
            && self.metadata.extra == other.metadata.extra
            && self.brand_kit_ref == other.brand_kit_ref
    }

    /// Apply one edit and return its inverse.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] and leaves the document unchanged if the
    /// edit would break an invariant or addresses a missing page/object.
    pub fn apply_edit(&mut self, edit: &Edit) -> Result<Edit, ValidationError> {
        match edit {
            Edit::Insert {
                page,
                parent,
                index,
                object,
            } => {
                object.validate()?;
                let taken: HashSet<&ObjectId> = self.object_ids().into_iter().collect();
                if let Some(dup) = object.subtree_ids().into_iter().find(|id| taken.contains(id)) {
                    return Err(ValidationError::DuplicateId(dup.clone()));
                }
                let list = self.container_mut(page, parent.as_ref())?;
                let at = (*index).min(list.len());
                list.insert(at, object.clone());
                Ok(Edit::Remove {
                    page: page.clone(),
                    id: object.id.clone(),
                })
            }
            Edit::Remove { page, id } => {
                let (parent, index) = self
                    .page(page)
                    .and_then(|p| locate_in(&p.objects, id, None))
                    .ok_or_else(|| ValidationError::UnknownObject(id.clone()))?;
                let list = self.container_mut(page, parent.as_ref())?;
                let object = list.remove(index);
                Ok(Edit::Insert {
                    page: page.clone(),
                    parent,
                    index,
                    object,
                })
            }
            Edit::Replace { page, object } => {
                object.validate()?;
                let current = self
                    .page(page)
                    .and_then(|p| p.find(&object.id))
                    .ok_or_else(|| ValidationError::UnknownObject(object.id.clone()))?;
                let own: HashSet<&ObjectId> = current.subtree_ids().into_iter().collect();
                let taken: HashSet<&ObjectId> = self
                    .object_ids()
                    .into_iter()
                    .filter(|id| !own.contains(id))
                    .collect();
                if let Some(dup) = object.subtree_ids().into_iter().find(|id| taken.contains(id)) {
                    return Err(ValidationError::DuplicateId(dup.clone()));
                }
                let slot = self
                    .pages
                    .iter_mut()
                    .find(|p| &p.id == page)
                    .and_then(|p| find_in_mut(&mut p.objects, &object.id))
                    .ok_or_else(|| ValidationError::UnknownObject(object.id.clone()))?;
                let previous = std::mem::replace(slot, object.clone());
                Ok(Edit::Replace {
                    page: page.clone(),
                    object: previous,
                })
            }
            Edit::SetBackground { page, background } => {
                if !is_hex_color(background) {
                    return Err(ValidationError::InvalidPage {
                        id: page.clone(),
                        reason: "background must be a #RRGGBB color".to_string(),
                    });
                }
                let target = self
                    .pages
                    .iter_mut()
                    .find(|p| &p.id == page)
                    .ok_or_else(|| ValidationError::UnknownPage(page.clone()))?;
                let previous = std::mem::replace(&mut target.background, background.clone());
                Ok(Edit::SetBackground {
                    page: page.clone(),
                    background: previous,
                })
            }
        }
    }

    /// Regenerate ids that occur more than once, keeping the first occurrence.
    ///
    /// Returns the `(old, new)` pairs that were rewritten.
    pub fn repair_duplicate_ids(&mut self) -> Vec<(ObjectId, ObjectId)> {
        let mut seen = HashSet::new();
        let mut repaired = Vec::new();
        for page in &mut self.pages {
            for object in &mut page.objects {
                repair_subtree(object, &mut seen, &mut repaired);
            }
        }
        repaired
    }

    pub(crate) fn pages_mut(&mut self) -> &mut Vec<Page> {
        &mut self.pages
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
        self.metadata.updated_at = now_ms();
    }

    /// Serialize the document to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a document from JSON (without validating it).
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn container_mut(
        &mut self,
        page: &PageId,
        parent: Option<&ObjectId>,
    ) -> Result<&mut Vec<Object>, ValidationError> {
        let page = self
            .pages
            .iter_mut()
            .find(|p| &p.id == page)
            .ok_or_else(|| ValidationError::UnknownPage(page.clone()))?;
        match parent {
            None => Ok(&mut page.objects),
            Some(parent_id) => {
                let group = find_in_mut(&mut page.objects, parent_id)
                    .ok_or_else(|| ValidationError::UnknownObject(parent_id.clone()))?;
                let group_id = group.id.clone();
                group
                    .children_mut()
                    .ok_or(ValidationError::NotAGroup(group_id))
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Current time in milliseconds since epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Millisecond timestamps fit in u64
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn find_in<'a>(objects: &'a [Object], id: &ObjectId) -> Option<&'a Object> {
    objects.iter().find_map(|o| {
        if &o.id == id {
            Some(o)
        } else {
            find_in(o.children(), id)
        }
    })
}

/// Depth-first lookup through groups.
pub(crate) fn find_in_mut<'a>(
    objects: &'a mut [Object],
    id: &ObjectId,
) -> Option<&'a mut Object> {
    for object in objects {
        if &object.id == id {
            return Some(object);
        }
        if let Some(children) = object.children_mut() {
            if let Some(found) = find_in_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn locate_in(
    objects: &[Object],
    id: &ObjectId,
    parent: Option<&ObjectId>,
) -> Option<(Option<ObjectId>, usize)> {
    for (index, object) in objects.iter().enumerate() {
        if &object.id == id {
            return Some((parent.cloned(), index));
        }
        if let Some(found) = locate_in(object.children(), id, Some(&object.id)) {
            return Some(found);
        }
    }
    None
}

fn collect_paint_order<'a>(objects: &'a [Object], out: &mut Vec<&'a Object>) {
    let mut ordered: Vec<&Object> = objects.iter().collect();
    // sort_by_key is stable, so ties keep insertion order
    ordered.sort_by_key(|o| o.z_index);
    for object in ordered {
        out.push(object);
        collect_paint_order(object.children(), out);
    }
}

fn repair_subtree(
    object: &mut Object,
    seen: &mut HashSet<ObjectId>,
    repaired: &mut Vec<(ObjectId, ObjectId)>,
) {
    if !seen.insert(object.id.clone()) {
        let fresh = ObjectId::new();
        repaired.push((object.id.clone(), fresh.clone()));
        object.id = fresh.clone();
        seen.insert(fresh);
    }
    if let Some(children) = object.children_mut() {
        for child in children {
            repair_subtree(child, seen, repaired);
        }
    }
}
