//! Canonical objects - the building blocks of pages.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

string_id!(
    /// Unique identifier for an object, stable across engines and sessions.
    ObjectId
);

/// Axis-aligned placement of an object in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// X position (pixels from left).
    pub x: f64,
    /// Y position (pixels from top).
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

impl Bounds {
    /// Create bounds from position and size.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether every component is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Whether every component is zero or positive.
    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.width >= 0.0 && self.height >= 0.0
    }

    /// Bounds shifted by the given offset.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Smallest bounds containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self::new(x, y, right - x, bottom - y)
    }
}

/// The variant of an object, as used by type-ordinal selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Text block.
    Text,
    /// Raster or vector image.
    Image,
    /// Geometric shape.
    Shape,
    /// Container of other objects.
    Group,
}

impl ObjectType {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Shape => "shape",
            Self::Group => "group",
        }
    }

    /// Recognise a noun (singular or plural, with common synonyms).
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "text" | "texts" | "textbox" | "label" | "labels" => Some(Self::Text),
            "image" | "images" | "picture" | "pictures" | "photo" | "photos" => Some(Self::Image),
            "shape" | "shapes" | "rectangle" | "rect" | "box" | "circle" | "ellipse" => {
                Some(Self::Shape)
            }
            "group" | "groups" => Some(Self::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text font weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
}

/// Text content and styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    /// Text content.
    pub text: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Font weight.
    #[serde(default)]
    pub font_weight: FontWeight,
    /// Text color as `#RRGGBB`.
    pub fill: String,
    /// Alignment.
    #[serde(default)]
    pub align: TextAlign,
    /// Opacity in `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Inter".to_string(),
            font_size: 32.0,
            font_weight: FontWeight::Normal,
            fill: "#000000".to_string(),
            align: TextAlign::Left,
            opacity: 1.0,
        }
    }
}

/// Resolution state of an image's source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Waiting for the asset resolver; rendered as a placeholder.
    #[default]
    Pending,
    /// Source URL is known.
    Resolved,
    /// The asset could not be resolved.
    Failed,
}

/// Image source and styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    /// Opaque reference handed to the asset resolver.
    pub asset_ref: String,
    /// Resolved URL, once known.
    #[serde(default)]
    pub src: Option<String>,
    /// Resolution state.
    #[serde(default)]
    pub status: ImageStatus,
    /// Opacity in `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

/// Geometric primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Rectangle (optionally rounded).
    #[default]
    Rect,
    /// Ellipse inscribed in the bounds.
    Ellipse,
    /// Line from the top-left to the bottom-right corner.
    Line,
}

impl ShapeKind {
    /// Recognise a shape noun.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "rectangle" | "rect" | "box" | "square" | "shape" => Some(Self::Rect),
            "circle" | "ellipse" | "oval" => Some(Self::Ellipse),
            "line" | "divider" => Some(Self::Line),
            _ => None,
        }
    }
}

/// Shape styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProps {
    /// Primitive.
    pub shape: ShapeKind,
    /// Fill color as `#RRGGBB`.
    pub fill: String,
    /// Stroke color, if stroked.
    #[serde(default)]
    pub stroke: Option<String>,
    /// Stroke width in pixels.
    #[serde(default)]
    pub stroke_width: f64,
    /// Corner radius for rectangles.
    #[serde(default)]
    pub corner_radius: f64,
    /// Opacity in `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for ShapeProps {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Rect,
            fill: "#CCCCCC".to_string(),
            stroke: None,
            stroke_width: 0.0,
            corner_radius: 0.0,
            opacity: 1.0,
        }
    }
}

/// Group children. Children keep absolute page coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupProps {
    /// Grouped objects in stacking order.
    pub children: Vec<Object>,
}

/// Variant-specific properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectProps {
    /// Text block.
    Text(TextProps),
    /// Image.
    Image(ImageProps),
    /// Shape.
    Shape(ShapeProps),
    /// Group.
    Group(GroupProps),
}

impl ObjectProps {
    /// The variant tag.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::Text(_) => ObjectType::Text,
            Self::Image(_) => ObjectType::Image,
            Self::Shape(_) => ObjectType::Shape,
            Self::Group(_) => ObjectType::Group,
        }
    }
}

/// Data binding of an object to a template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Bound field name.
    pub field: String,
}

/// A canonical object with placement and variant-specific content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// Unique identifier.
    pub id: ObjectId,
    /// Optional semantic tag such as `headline`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Position and size.
    pub bounds: Bounds,
    /// Stacking order within the parent scope.
    #[serde(default)]
    pub z_index: i32,
    /// Variant content.
    pub props: ObjectProps,
    /// Template binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Binding>,
}

impl Object {
    /// Create a new object with a generated id and default bounds.
    #[must_use]
    pub fn new(props: ObjectProps) -> Self {
        Self {
            id: ObjectId::new(),
            role: None,
            bounds: Bounds::default(),
            z_index: 0,
            props,
            bindings: None,
        }
    }

    /// Create a text object.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ObjectProps::Text(TextProps {
            text: text.into(),
            ..TextProps::default()
        }))
    }

    /// Create an image object awaiting resolution of `asset_ref`.
    #[must_use]
    pub fn image(asset_ref: impl Into<String>) -> Self {
        Self::new(ObjectProps::Image(ImageProps {
            asset_ref: asset_ref.into(),
            src: None,
            status: ImageStatus::Pending,
            opacity: 1.0,
        }))
    }

    /// Create a shape object.
    #[must_use]
    pub fn shape(shape: ShapeKind) -> Self {
        Self::new(ObjectProps::Shape(ShapeProps {
            shape,
            ..ShapeProps::default()
        }))
    }

    /// Create a group from children; bounds enclose the children.
    #[must_use]
    pub fn group(children: Vec<Object>) -> Self {
        let bounds = children
            .iter()
            .map(|c| c.bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self::new(ObjectProps::Group(GroupProps { children })).with_bounds(bounds)
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ObjectId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the semantic role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the stacking order.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Bind to a template field.
    #[must_use]
    pub fn with_binding(mut self, field: impl Into<String>) -> Self {
        self.bindings = Some(Binding {
            field: field.into(),
        });
        self
    }

    /// Set the text fill (text objects only; ignored otherwise).
    #[must_use]
    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        match &mut self.props {
            ObjectProps::Text(t) => t.fill = fill.into(),
            ObjectProps::Shape(s) => s.fill = fill.into(),
            ObjectProps::Image(_) | ObjectProps::Group(_) => {}
        }
        self
    }

    /// Variant of this object.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        self.props.object_type()
    }

    /// Fill color for text and shapes.
    #[must_use]
    pub fn fill(&self) -> Option<&str> {
        match &self.props {
            ObjectProps::Text(t) => Some(&t.fill),
            ObjectProps::Shape(s) => Some(&s.fill),
            ObjectProps::Image(_) | ObjectProps::Group(_) => None,
        }
    }

    /// Children of a group; empty for other variants.
    #[must_use]
    pub fn children(&self) -> &[Object] {
        match &self.props {
            ObjectProps::Group(g) => &g.children,
            _ => &[],
        }
    }

    /// Mutable children of a group.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Object>> {
        match &mut self.props {
            ObjectProps::Group(g) => Some(&mut g.children),
            _ => None,
        }
    }

    /// Visit this object and all descendants depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Object)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Ids of this object and all descendants.
    #[must_use]
    pub fn subtree_ids(&self) -> Vec<&ObjectId> {
        let mut ids = Vec::new();
        self.walk(&mut |o| ids.push(&o.id));
        ids
    }

    /// Move this object and all descendants.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.bounds = self.bounds.translated(dx, dy);
        if let Some(children) = self.children_mut() {
            for child in children {
                child.translate(dx, dy);
            }
        }
    }

    /// Scale this object (and descendants) relative to `origin`.
    pub fn scale_about(&mut self, sx: f64, sy: f64, origin: (f64, f64)) {
        let b = self.bounds;
        self.bounds = Bounds::new(
            origin.0 + (b.x - origin.0) * sx,
            origin.1 + (b.y - origin.1) * sy,
            b.width * sx,
            b.height * sy,
        );
        match &mut self.props {
            ObjectProps::Text(t) => t.font_size *= sx.min(sy),
            ObjectProps::Group(g) => {
                for child in &mut g.children {
                    child.scale_about(sx, sy, origin);
                }
            }
            ObjectProps::Image(_) | ObjectProps::Shape(_) => {}
        }
    }

    /// Check bounds and property ranges of this object and its descendants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.bounds.is_finite() {
            return Err(ValidationError::NonFiniteBounds(self.id.clone()));
        }
        if !self.bounds.is_non_negative() {
            return Err(ValidationError::NegativeBounds(self.id.clone()));
        }
        let invalid = |reason: &str| ValidationError::InvalidProperty {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        let opacity_ok = |o: f64| (0.0..=1.0).contains(&o);
        match &self.props {
            ObjectProps::Text(t) => {
                if !(t.font_size.is_finite() && t.font_size > 0.0) {
                    return Err(invalid("font size must be positive"));
                }
                if !is_hex_color(&t.fill) {
                    return Err(invalid("fill must be a #RRGGBB color"));
                }
                if !opacity_ok(t.opacity) {
                    return Err(invalid("opacity must be within 0..=1"));
                }
            }
            ObjectProps::Shape(s) => {
                if !is_hex_color(&s.fill) {
                    return Err(invalid("fill must be a #RRGGBB color"));
                }
                if !(s.stroke_width.is_finite() && s.stroke_width >= 0.0) {
                    return Err(invalid("stroke width must be non-negative"));
                }
                if !opacity_ok(s.opacity) {
                    return Err(invalid("opacity must be within 0..=1"));
                }
            }
            ObjectProps::Image(i) => {
                if i.status == ImageStatus::Resolved && i.src.is_none() {
                    return Err(invalid("resolved image without src"));
                }
                if !opacity_ok(i.opacity) {
                    return Err(invalid("opacity must be within 0..=1"));
                }
            }
            ObjectProps::Group(g) => {
                for child in &g.children {
                    child.validate()?;
                }
            }
        }
        Ok(())
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// Whether `value` is a `#RRGGBB` color.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalise `#rgb` / `#rrggbb` (any case) to upper-case `#RRGGBB`.
#[must_use]
pub fn normalize_hex_color(value: &str) -> Option<String> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(format!("#{}", hex.to_ascii_uppercase())),
        3 => {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            Some(format!("#{}", expanded.to_ascii_uppercase()))
        }
        _ => None,
    }
}
