//! Command execution against the canonical document.
//!
//! A command is resolved against the live document, turned into primitive
//! [`Edit`]s on a working copy, and only handed back when every edit
//! succeeded. The caller swaps the working copy in; a rejected command never
//! touches the live document.

use std::collections::HashSet;

use crate::command::{Action, Command, Selector, TargetPolicy};
use crate::document::{Document, Edit, PageId};
use crate::error::{EditorError, EditorResult, ValidationError};
use crate::object::{Bounds, ImageStatus, Object, ObjectId, ObjectProps};

/// Outcome of a successful command, not yet committed.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The mutated working copy.
    pub document: Document,
    /// Edits in application order.
    pub op: Vec<Edit>,
    /// Inverse edits in undo order.
    pub inverse: Vec<Edit>,
    /// Objects the command touched.
    pub affected: Vec<ObjectId>,
}

struct Transaction {
    doc: Document,
    op: Vec<Edit>,
    inverse: Vec<Edit>,
}

impl Transaction {
    fn new(doc: &Document) -> Self {
        Self {
            doc: doc.clone(),
            op: Vec::new(),
            inverse: Vec::new(),
        }
    }

    fn apply(&mut self, edit: Edit) -> Result<(), ValidationError> {
        let inverse = self.doc.apply_edit(&edit)?;
        self.op.push(edit);
        self.inverse.push(inverse);
        Ok(())
    }

    fn replace(&mut self, object: Object) -> Result<(), ValidationError> {
        let page = self
            .doc
            .locate(&object.id)
            .map(|loc| loc.page)
            .ok_or_else(|| ValidationError::UnknownObject(object.id.clone()))?;
        self.apply(Edit::Replace { page, object })
    }

    fn object(&self, id: &ObjectId) -> Result<Object, ValidationError> {
        self.doc
            .find_object(id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownObject(id.clone()))
    }

    fn finish(self, affected: Vec<ObjectId>) -> Execution {
        let mut inverse = self.inverse;
        inverse.reverse();
        Execution {
            document: self.doc,
            op: self.op,
            inverse,
            affected,
        }
    }
}

/// Resolve a selector to object ids.
///
/// Ids resolve across the whole document; roles and type ordinals resolve on
/// `page` in paint order, descending into groups.
///
/// # Errors
///
/// Returns [`EditorError::TargetNotFound`] when nothing matches.
pub fn resolve(doc: &Document, page: &PageId, selector: &Selector) -> EditorResult<Vec<ObjectId>> {
    let not_found = || EditorError::TargetNotFound(selector.to_string());
    let matches: Vec<ObjectId> = match selector {
        Selector::Id(id) => doc
            .find_object(id)
            .map(|o| vec![o.id.clone()])
            .unwrap_or_default(),
        Selector::Ids(ids) => {
            let mut seen = HashSet::new();
            ids.iter()
                .filter(|id| doc.find_object(id).is_some() && seen.insert(*id))
                .cloned()
                .collect()
        }
        Selector::Role(role) => doc
            .page(page)
            .ok_or_else(|| ValidationError::UnknownPage(page.clone()))?
            .paint_order()
            .into_iter()
            .filter(|o| o.role.as_deref() == Some(role.as_str()))
            .map(|o| o.id.clone())
            .collect(),
        Selector::TypeOrdinal { object_type, index } => doc
            .objects_of_type(page, *object_type)
            .get(*index)
            .map(|o| vec![o.id.clone()])
            .unwrap_or_default(),
        Selector::Page => Vec::new(),
    };
    if matches.is_empty() {
        return Err(not_found());
    }
    Ok(matches)
}

/// Run `command` against a working copy of `doc`.
///
/// # Errors
///
/// Returns [`EditorError::TargetNotFound`] if the selector matches nothing and
/// [`EditorError::Validation`] if the resulting document would be invalid.
/// `doc` is never modified.
pub fn execute(doc: &Document, page: &PageId, command: &Command) -> EditorResult<Execution> {
    if doc.page(page).is_none() {
        return Err(ValidationError::UnknownPage(page.clone()).into());
    }
    let mut tx = Transaction::new(doc);

    let targets = match command.action.target_policy() {
        TargetPolicy::Page => Vec::new(),
        TargetPolicy::First => {
            let mut found = resolve(doc, page, &command.target)?;
            found.truncate(1);
            found
        }
        TargetPolicy::Batch => drop_nested(doc, resolve(doc, page, &command.target)?),
    };

    let affected = match &command.action {
        Action::SetFill { color } => map_targets(&mut tx, &targets, command, |o| {
            Ok(for_each_leaf(o, &mut |props| match props {
                ObjectProps::Text(t) => {
                    t.fill.clone_from(color);
                    true
                }
                ObjectProps::Shape(s) => {
                    s.fill.clone_from(color);
                    true
                }
                ObjectProps::Image(_) | ObjectProps::Group(_) => false,
            }))
        })?,
        Action::SetText { text } => map_targets(&mut tx, &targets, command, |o| {
            Ok(match &mut o.props {
                ObjectProps::Text(t) => {
                    t.text.clone_from(text);
                    true
                }
                _ => false,
            })
        })?,
        Action::SetFontSize { size } => {
            if !(size.is_finite() && *size > 0.0) {
                return Err(invalid_argument("font size must be positive"));
            }
            map_targets(&mut tx, &targets, command, |o| {
                Ok(for_each_leaf(o, &mut |props| match props {
                    ObjectProps::Text(t) => {
                        t.font_size = *size;
                        true
                    }
                    _ => false,
                }))
            })?
        }
        Action::MoveBy { dx, dy } => map_targets(&mut tx, &targets, command, |o| {
            o.translate(*dx, *dy);
            Ok(true)
        })?,
        Action::MoveTo { x, y } => map_targets(&mut tx, &targets, command, |o| {
            o.translate(x - o.bounds.x, y - o.bounds.y);
            Ok(true)
        })?,
        Action::Resize { width, height } => map_targets(&mut tx, &targets, command, |o| {
            let mut bounds = o.bounds;
            bounds.width = *width;
            bounds.height = *height;
            set_bounds(o, bounds);
            Ok(true)
        })?,
        Action::SetBounds { bounds } => map_targets(&mut tx, &targets, command, |o| {
            set_bounds(o, *bounds);
            Ok(true)
        })?,
        Action::Scale { factor } => {
            if !(factor.is_finite() && *factor > 0.0) {
                return Err(invalid_argument("scale factor must be positive"));
            }
            map_targets(&mut tx, &targets, command, |o| {
                scale_about_center(o, *factor);
                Ok(true)
            })?
        }
        Action::SetOpacity { opacity } => {
            if !(0.0..=1.0).contains(opacity) {
                return Err(invalid_argument("opacity must be within 0..=1"));
            }
            map_targets(&mut tx, &targets, command, |o| {
                Ok(for_each_leaf(o, &mut |props| {
                    match props {
                        ObjectProps::Text(t) => t.opacity = *opacity,
                        ObjectProps::Image(i) => i.opacity = *opacity,
                        ObjectProps::Shape(s) => s.opacity = *opacity,
                        ObjectProps::Group(_) => return false,
                    }
                    true
                }))
            })?
        }
        Action::Delete => {
            for id in &targets {
                let page = tx
                    .doc
                    .locate(id)
                    .map(|loc| loc.page)
                    .ok_or_else(|| ValidationError::UnknownObject(id.clone()))?;
                tx.apply(Edit::Remove {
                    page,
                    id: id.clone(),
                })?;
            }
            targets
        }
        Action::BringToFront => restack(&mut tx, &targets, true)?,
        Action::SendToBack => restack(&mut tx, &targets, false)?,
        Action::Group => group(&mut tx, &targets)?,
        Action::Ungroup => ungroup(&mut tx, &targets)?,
        Action::SetBackground { color } => {
            tx.apply(Edit::SetBackground {
                page: page.clone(),
                background: color.clone(),
            })?;
            Vec::new()
        }
        Action::Insert { object } => insert_on_top(&mut tx, page, object)?,
        Action::ResolveImage { src } => {
            settle_image(&mut tx, &targets, command, ImageStatus::Resolved, Some(src.as_str()))?
        }
        Action::ImageFailed => settle_image(&mut tx, &targets, command, ImageStatus::Failed, None)?,
    };

    if matches!(
        command.action,
        Action::MoveBy { .. }
            | Action::MoveTo { .. }
            | Action::Resize { .. }
            | Action::SetBounds { .. }
            | Action::Scale { .. }
    ) {
        fit_ancestors(&mut tx, &affected)?;
    }

    tracing::debug!(
        action = command.kind(),
        target = %command.target,
        edits = tx.op.len(),
        affected = affected.len(),
        "Command planned"
    );
    Ok(tx.finish(affected))
}

fn invalid_argument(reason: &str) -> EditorError {
    ValidationError::InvalidArgument(reason.to_string()).into()
}

/// Apply `mutate` to a copy of each target, replacing those it applies to.
fn map_targets(
    tx: &mut Transaction,
    targets: &[ObjectId],
    command: &Command,
    mut mutate: impl FnMut(&mut Object) -> Result<bool, ValidationError>,
) -> EditorResult<Vec<ObjectId>> {
    let mut affected = Vec::new();
    for id in targets {
        let mut object = tx.object(id)?;
        if mutate(&mut object)? {
            tx.replace(object)?;
            affected.push(id.clone());
        }
    }
    if affected.is_empty() {
        let first = targets
            .first()
            .cloned()
            .ok_or_else(|| EditorError::TargetNotFound(command.target.to_string()))?;
        let object_type = tx.object(&first)?.object_type();
        return Err(ValidationError::InvalidProperty {
            id: first,
            reason: format!("{} does not apply to {object_type}", command.kind()),
        }
        .into());
    }
    Ok(affected)
}

/// Run `f` on the props of every non-group object in the subtree.
fn for_each_leaf(object: &mut Object, f: &mut impl FnMut(&mut ObjectProps) -> bool) -> bool {
    match &mut object.props {
        ObjectProps::Group(group) => {
            let mut any = false;
            for child in &mut group.children {
                any |= for_each_leaf(child, f);
            }
            any
        }
        props => f(props),
    }
}

fn set_bounds(object: &mut Object, bounds: Bounds) {
    let old = object.bounds;
    if matches!(object.props, ObjectProps::Group(_)) && old.width > 0.0 && old.height > 0.0 {
        let sx = bounds.width / old.width;
        let sy = bounds.height / old.height;
        if let Some(children) = object.children_mut() {
            for child in children {
                child.scale_about(sx, sy, (old.x, old.y));
                child.translate(bounds.x - old.x, bounds.y - old.y);
            }
        }
    }
    object.bounds = bounds;
}

/// Refit every group above `ids` to the union of its children.
fn fit_ancestors(tx: &mut Transaction, ids: &[ObjectId]) -> Result<(), ValidationError> {
    for id in ids {
        let mut parent = tx.doc.locate(id).and_then(|loc| loc.parent);
        while let Some(group_id) = parent {
            let mut group = tx.object(&group_id)?;
            let fitted = group
                .children()
                .iter()
                .map(|c| c.bounds)
                .reduce(|a, b| a.union(&b));
            if let Some(bounds) = fitted.filter(|b| *b != group.bounds) {
                group.bounds = bounds;
                tx.replace(group)?;
            }
            parent = tx.doc.locate(&group_id).and_then(|loc| loc.parent);
        }
    }
    Ok(())
}

fn scale_about_center(object: &mut Object, factor: f64) {
    let b = object.bounds;
    object.scale_about(factor, factor, (b.x + b.width / 2.0, b.y + b.height / 2.0));
    let dx = (-object.bounds.x).max(0.0);
    let dy = (-object.bounds.y).max(0.0);
    if dx > 0.0 || dy > 0.0 {
        object.translate(dx, dy);
    }
}

/// Remove targets nested inside other targets.
fn drop_nested(doc: &Document, targets: Vec<ObjectId>) -> Vec<ObjectId> {
    let set: HashSet<ObjectId> = targets.iter().cloned().collect();
    targets
        .into_iter()
        .filter(|id| {
            let mut parent = doc.locate(id).and_then(|loc| loc.parent);
            while let Some(ancestor) = parent {
                if set.contains(&ancestor) {
                    return false;
                }
                parent = doc.locate(&ancestor).and_then(|loc| loc.parent);
            }
            true
        })
        .collect()
}

/// Siblings of a scope in paint order (stable by z-index).
fn scope_order(
    doc: &Document,
    page: &PageId,
    parent: Option<&ObjectId>,
) -> Result<Vec<Object>, ValidationError> {
    let list: &[Object] = match parent {
        None => {
            &doc.page(page)
                .ok_or_else(|| ValidationError::UnknownPage(page.clone()))?
                .objects
        }
        Some(id) => doc
            .find_object(id)
            .ok_or_else(|| ValidationError::UnknownObject(id.clone()))?
            .children(),
    };
    let mut ordered: Vec<Object> = list.to_vec();
    ordered.sort_by_key(|o| o.z_index);
    Ok(ordered)
}

/// Assign z-indices `0..n` following `order`, replacing only changed objects.
fn renumber(tx: &mut Transaction, order: &[ObjectId]) -> Result<(), ValidationError> {
    for (position, id) in order.iter().enumerate() {
        let z = i32::try_from(position).unwrap_or(i32::MAX);
        let object = tx.object(id)?;
        if object.z_index != z {
            tx.replace(object.with_z_index(z))?;
        }
    }
    Ok(())
}

fn restack(tx: &mut Transaction, targets: &[ObjectId], to_front: bool) -> EditorResult<Vec<ObjectId>> {
    let Some(id) = targets.first() else {
        return Ok(Vec::new());
    };
    let loc = tx
        .doc
        .locate(id)
        .ok_or_else(|| ValidationError::UnknownObject(id.clone()))?;
    let mut order: Vec<ObjectId> = scope_order(&tx.doc, &loc.page, loc.parent.as_ref())?
        .into_iter()
        .map(|o| o.id)
        .filter(|sibling| sibling != id)
        .collect();
    if to_front {
        order.push(id.clone());
    } else {
        order.insert(0, id.clone());
    }
    renumber(tx, &order)?;
    Ok(vec![id.clone()])
}

fn group(tx: &mut Transaction, targets: &[ObjectId]) -> EditorResult<Vec<ObjectId>> {
    if targets.len() < 2 {
        return Err(invalid_argument("grouping needs at least two objects"));
    }
    let locations = targets
        .iter()
        .map(|id| {
            tx.doc
                .locate(id)
                .ok_or_else(|| ValidationError::UnknownObject(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (page, parent) = (locations[0].page.clone(), locations[0].parent.clone());
    if locations
        .iter()
        .any(|loc| loc.page != page || loc.parent != parent)
    {
        return Err(invalid_argument("only siblings can be grouped"));
    }

    let members: HashSet<&ObjectId> = targets.iter().collect();
    let scope = scope_order(&tx.doc, &page, parent.as_ref())?;
    let children: Vec<Object> = scope
        .iter()
        .filter(|o| members.contains(&o.id))
        .enumerate()
        .map(|(z, o)| o.clone().with_z_index(i32::try_from(z).unwrap_or(i32::MAX)))
        .collect();
    let group = Object::group(children);

    // The group takes the paint position of its topmost member.
    let topmost = scope.iter().rposition(|o| members.contains(&o.id));
    let mut order = Vec::with_capacity(scope.len());
    for (position, object) in scope.iter().enumerate() {
        if Some(position) == topmost {
            order.push(group.id.clone());
        } else if !members.contains(&object.id) {
            order.push(object.id.clone());
        }
    }
    let group_z = order
        .iter()
        .position(|id| id == &group.id)
        .and_then(|p| i32::try_from(p).ok())
        .unwrap_or(0);
    let insert_at = locations.iter().map(|loc| loc.index).min().unwrap_or(0);

    for id in targets {
        tx.apply(Edit::Remove {
            page: page.clone(),
            id: id.clone(),
        })?;
    }
    let group_id = group.id.clone();
    tx.apply(Edit::Insert {
        page,
        parent,
        index: insert_at,
        object: group.with_z_index(group_z),
    })?;
    renumber(tx, &order)?;
    Ok(vec![group_id])
}

fn ungroup(tx: &mut Transaction, targets: &[ObjectId]) -> EditorResult<Vec<ObjectId>> {
    let Some(id) = targets.first() else {
        return Ok(Vec::new());
    };
    let group = tx.object(id)?;
    if !matches!(group.props, ObjectProps::Group(_)) {
        return Err(ValidationError::NotAGroup(id.clone()).into());
    }
    let loc = tx
        .doc
        .locate(id)
        .ok_or_else(|| ValidationError::UnknownObject(id.clone()))?;

    let mut kids: Vec<&Object> = group.children().iter().collect();
    kids.sort_by_key(|o| o.z_index);
    let mut order = Vec::new();
    for sibling in scope_order(&tx.doc, &loc.page, loc.parent.as_ref())? {
        if &sibling.id == id {
            order.extend(kids.iter().map(|k| k.id.clone()));
        } else {
            order.push(sibling.id);
        }
    }

    tx.apply(Edit::Remove {
        page: loc.page.clone(),
        id: id.clone(),
    })?;
    let mut released = Vec::new();
    for (offset, child) in group.children().iter().enumerate() {
        let z = order
            .iter()
            .position(|o| o == &child.id)
            .and_then(|p| i32::try_from(p).ok())
            .unwrap_or(0);
        tx.apply(Edit::Insert {
            page: loc.page.clone(),
            parent: loc.parent.clone(),
            index: loc.index + offset,
            object: child.clone().with_z_index(z),
        })?;
        released.push(child.id.clone());
    }
    renumber(tx, &order)?;
    Ok(released)
}

fn insert_on_top(tx: &mut Transaction, page: &PageId, object: &Object) -> EditorResult<Vec<ObjectId>> {
    let objects = &tx
        .doc
        .page(page)
        .ok_or_else(|| ValidationError::UnknownPage(page.clone()))?
        .objects;
    let z = objects.iter().map(|o| o.z_index + 1).max().unwrap_or(0);
    let index = objects.len();
    let id = object.id.clone();
    tx.apply(Edit::Insert {
        page: page.clone(),
        parent: None,
        index,
        object: object.clone().with_z_index(z),
    })?;
    Ok(vec![id])
}

fn settle_image(
    tx: &mut Transaction,
    targets: &[ObjectId],
    command: &Command,
    status: ImageStatus,
    src: Option<&str>,
) -> EditorResult<Vec<ObjectId>> {
    let not_placeholder = || EditorError::TargetNotFound(format!("image placeholder {}", command.target));
    let id = targets.first().ok_or_else(not_placeholder)?;
    let mut object = tx.object(id)?;
    match &mut object.props {
        ObjectProps::Image(image) if image.status == ImageStatus::Pending => {
            image.status = status;
            image.src = src.map(str::to_string);
        }
        _ => return Err(not_placeholder()),
    }
    tx.replace(object)?;
    Ok(vec![id.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectType, ShapeKind};

    fn fixture() -> (Document, PageId) {
        let mut doc = Document::new("Exec");
        let page = doc.first_page_id().expect("page").clone();
        doc.add_object(
            &page,
            Object::text("Title")
                .with_id("t1")
                .with_role("headline")
                .with_z_index(0),
        )
        .expect("t1");
        doc.add_object(
            &page,
            Object::text("Body")
                .with_id("t2")
                .with_z_index(1)
                .with_bounds(Bounds::new(0.0, 200.0, 400.0, 100.0)),
        )
        .expect("t2");
        doc.add_object(
            &page,
            Object::shape(ShapeKind::Rect)
                .with_id("s1")
                .with_z_index(2)
                .with_bounds(Bounds::new(100.0, 100.0, 50.0, 50.0)),
        )
        .expect("s1");
        (doc, page)
    }

    fn run(doc: &Document, page: &PageId, action: Action, target: Selector) -> EditorResult<Execution> {
        execute(doc, page, &Command::new(action, target))
    }

    #[test]
    fn test_resolve_by_type_ordinal() {
        let (doc, page) = fixture();
        let selector = Selector::TypeOrdinal {
            object_type: ObjectType::Text,
            index: 1,
        };
        assert_eq!(resolve(&doc, &page, &selector).expect("found"), vec!["t2".into()]);
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let (doc, page) = fixture();
        let result = run(
            &doc,
            &page,
            Action::SetFill {
                color: "#0000FF".to_string(),
            },
            Selector::Id("t9".into()),
        );
        assert!(matches!(result, Err(EditorError::TargetNotFound(_))));
    }

    #[test]
    fn test_first_policy_touches_one_object() {
        let (doc, page) = fixture();
        let exec = run(
            &doc,
            &page,
            Action::SetText {
                text: "Hi".to_string(),
            },
            Selector::TypeOrdinal {
                object_type: ObjectType::Text,
                index: 0,
            },
        )
        .expect("execute");
        assert_eq!(exec.affected, vec![ObjectId::from("t1")]);
    }

    #[test]
    fn test_batch_policy_touches_all_matches() {
        let (doc, page) = fixture();
        let exec = run(
            &doc,
            &page,
            Action::MoveBy { dx: 10.0, dy: 0.0 },
            Selector::Ids(vec!["t1".into(), "s1".into()]),
        )
        .expect("execute");
        assert_eq!(exec.affected.len(), 2);
        assert_eq!(
            exec.document.find_object(&"s1".into()).expect("s1").bounds.x,
            110.0
        );
    }

    #[test]
    fn test_negative_move_rejected() {
        let (doc, page) = fixture();
        let result = run(
            &doc,
            &page,
            Action::MoveTo { x: -5.0, y: 0.0 },
            Selector::Id("t1".into()),
        );
        assert!(matches!(
            result,
            Err(EditorError::Validation(ValidationError::NegativeBounds(_)))
        ));
    }

    #[test]
    fn test_fill_on_image_is_invalid() {
        let (mut doc, page) = fixture();
        doc.add_object(&page, Object::image("asset-1").with_id("i1"))
            .expect("image");
        let result = run(
            &doc,
            &page,
            Action::SetFill {
                color: "#FF0000".to_string(),
            },
            Selector::Id("i1".into()),
        );
        assert!(matches!(
            result,
            Err(EditorError::Validation(ValidationError::InvalidProperty { .. }))
        ));
    }

    #[test]
    fn test_inverse_restores_document() {
        let (doc, page) = fixture();
        let exec = run(&doc, &page, Action::Delete, Selector::Ids(vec!["t1".into(), "s1".into()]))
            .expect("delete");
        let mut restored = exec.document.clone();
        for edit in &exec.inverse {
            restored.apply_edit(edit).expect("inverse");
        }
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_group_renumbers_scope() {
        let (doc, page) = fixture();
        let exec = run(
            &doc,
            &page,
            Action::Group,
            Selector::Ids(vec!["t1".into(), "t2".into()]),
        )
        .expect("group");
        let group_id = exec.affected[0].clone();
        let page_objects = &exec.document.page(&page).expect("page").objects;
        assert_eq!(page_objects.len(), 2);
        let group = exec.document.find_object(&group_id).expect("group");
        assert_eq!(group.children().len(), 2);
        assert_eq!(group.z_index, 0);
        assert_eq!(exec.document.find_object(&"s1".into()).expect("s1").z_index, 1);
    }

    #[test]
    fn test_ungroup_restores_flat_scope() {
        let (doc, page) = fixture();
        let grouped = run(
            &doc,
            &page,
            Action::Group,
            Selector::Ids(vec!["t1".into(), "t2".into()]),
        )
        .expect("group");
        let group_id = grouped.affected[0].clone();
        let exec = run(&grouped.document, &page, Action::Ungroup, Selector::Id(group_id))
            .expect("ungroup");
        assert_eq!(exec.affected.len(), 2);
        let mut zs: Vec<(String, i32)> = exec
            .document
            .page(&page)
            .expect("page")
            .objects
            .iter()
            .map(|o| (o.id.to_string(), o.z_index))
            .collect();
        zs.sort();
        assert_eq!(
            zs,
            vec![
                ("s1".to_string(), 2),
                ("t1".to_string(), 0),
                ("t2".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_send_to_back() {
        let (doc, page) = fixture();
        let exec = run(&doc, &page, Action::SendToBack, Selector::Id("s1".into()))
            .expect("restack");
        let s1 = exec.document.find_object(&"s1".into()).expect("s1");
        assert_eq!(s1.z_index, 0);
        let t2 = exec.document.find_object(&"t2".into()).expect("t2");
        assert_eq!(t2.z_index, 2);
    }

    #[test]
    fn test_resolve_image_requires_placeholder() {
        let (doc, page) = fixture();
        let result = run(
            &doc,
            &page,
            Action::ResolveImage {
                src: "https://cdn/x.png".to_string(),
            },
            Selector::Id("t1".into()),
        );
        assert!(matches!(result, Err(EditorError::TargetNotFound(_))));
    }

    #[test]
    fn test_insert_goes_on_top() {
        let (doc, page) = fixture();
        let exec = run(
            &doc,
            &page,
            Action::Insert {
                object: Box::new(Object::text("New").with_id("t3")),
            },
            Selector::Page,
        )
        .expect("insert");
        let t3 = exec.document.find_object(&"t3".into()).expect("t3");
        assert_eq!(t3.z_index, 3);
    }

    fn grouped_fixture() -> (Document, PageId) {
        let mut doc = Document::new("Grouped");
        let page = doc.first_page_id().expect("page").clone();
        let group = Object::group(vec![
            Object::shape(ShapeKind::Rect)
                .with_id("a")
                .with_bounds(Bounds::new(0.0, 0.0, 50.0, 50.0)),
            Object::shape(ShapeKind::Rect)
                .with_id("b")
                .with_bounds(Bounds::new(100.0, 100.0, 50.0, 50.0)),
        ])
        .with_id("g1");
        doc.add_object(&page, group).expect("g1");
        (doc, page)
    }

    #[test]
    fn test_moving_child_refits_group() {
        let (doc, page) = grouped_fixture();
        let exec = run(
            &doc,
            &page,
            Action::MoveBy { dx: 100.0, dy: 0.0 },
            Selector::Id("b".into()),
        )
        .expect("move");
        let group = exec.document.find_object(&"g1".into()).expect("g1");
        assert_eq!(group.bounds, Bounds::new(0.0, 0.0, 250.0, 150.0));
        assert_eq!(exec.affected, vec![ObjectId::from("b")]);

        let mut restored = exec.document.clone();
        for edit in &exec.inverse {
            restored.apply_edit(edit).expect("inverse");
        }
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_resizing_child_refits_group() {
        let (doc, page) = grouped_fixture();
        let exec = run(
            &doc,
            &page,
            Action::Resize {
                width: 10.0,
                height: 10.0,
            },
            Selector::Id("b".into()),
        )
        .expect("resize");
        let group = exec.document.find_object(&"g1".into()).expect("g1");
        assert_eq!(group.bounds, Bounds::new(0.0, 0.0, 110.0, 110.0));
    }

    #[test]
    fn test_scale_keeps_origin_non_negative() {
        let (doc, page) = fixture();
        let exec = run(&doc, &page, Action::Scale { factor: 2.0 }, Selector::Id("t1".into()))
            .expect("scale");
        let t1 = exec.document.find_object(&"t1".into()).expect("t1");
        assert_eq!(t1.bounds, Bounds::new(0.0, 0.0, 200.0, 200.0));
    }
}
