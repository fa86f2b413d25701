//! # Command Parser
//!
//! Turns free-text instructions into [`Command`]s.
//!
//! ```text
//! "change t1 color to blue and make it bigger"
//!   -> tokens: [change] [t1] [color] [to] [blue] <and> [make] [it] [bigger]
//!   -> clauses matched against the rule table
//!   -> [SetFill #0000FF @ id t1, Scale 1.25 @ selection]
//! ```
//!
//! Rules are token patterns. When several rules match a clause, the one with
//! the most literal tokens wins; ties go to the rule declared first. A clause
//! no rule matches makes the whole instruction [`EditorError::UnsupportedCommand`].

use std::collections::HashMap;

use crate::command::{Action, Command, Direction, Selector};
use crate::document::{Document, PageId};
use crate::error::{EditorError, EditorResult};
use crate::object::{normalize_hex_color, Object, ObjectId, ObjectType, ShapeKind};

/// Pixels moved by a directional nudge without an amount.
pub const DEFAULT_NUDGE: f64 = 10.0;

/// Factor applied by "bigger"; "smaller" applies its reciprocal.
pub const SCALE_STEP: f64 = 1.25;

const MAX_TARGET_TOKENS: usize = 8;
const ARTICLES: &[&str] = &["the", "a", "an"];
const SEPARATORS: &[&str] = &["and", "then"];
const SELECTION_WORDS: &[&str] = &[
    "this", "it", "selected", "selection", "them", "these", "those", "that",
];
const GENERIC_NOUNS: &[&str] = &[
    "object", "objects", "item", "items", "element", "elements", "one", "ones",
];

/// Live document facts the parser resolves words against.
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    /// Current selection, captured into `Selector::Ids`.
    pub selection: Vec<ObjectId>,
    ids: HashMap<String, ObjectId>,
    roles: HashMap<String, String>,
    type_counts: HashMap<ObjectType, usize>,
}

impl ParseContext {
    /// Gather ids (whole document), roles and type counts (active page).
    #[must_use]
    pub fn from_document(doc: &Document, page: &PageId, selection: &[ObjectId]) -> Self {
        let ids = doc
            .object_ids()
            .into_iter()
            .map(|id| (id.as_str().to_lowercase(), id.clone()))
            .collect();
        let mut roles = HashMap::new();
        let mut type_counts = HashMap::new();
        if let Some(page) = doc.page(page) {
            for object in page.paint_order() {
                if let Some(role) = &object.role {
                    roles.insert(role.to_lowercase(), role.clone());
                }
                *type_counts.entry(object.object_type()).or_insert(0) += 1;
            }
        }
        Self {
            selection: selection.to_vec(),
            ids,
            roles,
            type_counts,
        }
    }

    /// Known roles (lower-cased).
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    fn id(&self, word: &str) -> Option<&ObjectId> {
        self.ids.get(word)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word {
        norm: String,
        raw: String,
        filler: bool,
    },
    Quoted(String),
    Separator(String),
}

impl Token {
    fn word(&self) -> Option<&str> {
        match self {
            Self::Word {
                norm,
                filler: false,
                ..
            } => Some(norm),
            _ => None,
        }
    }

    fn raw(&self) -> &str {
        match self {
            Self::Word { raw, .. } | Self::Quoted(raw) | Self::Separator(raw) => raw,
        }
    }

    const fn is_filler(&self) -> bool {
        matches!(self, Self::Word { filler: true, .. })
    }

    const fn is_separator(&self) -> bool {
        matches!(self, Self::Separator(_))
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    let mut quoted = false;
    for c in input.chars() {
        if matches!(c, '"' | '\u{201C}' | '\u{201D}') {
            if quoted {
                tokens.push(Token::Quoted(std::mem::take(&mut buffer)));
            } else {
                push_words(&std::mem::take(&mut buffer), &mut tokens);
            }
            quoted = !quoted;
        } else {
            buffer.push(c);
        }
    }
    if quoted {
        tokens.push(Token::Quoted(buffer));
    } else {
        push_words(&buffer, &mut tokens);
    }
    tokens
}

fn push_words(text: &str, tokens: &mut Vec<Token>) {
    for raw in text.replace(';', " ; ").split_whitespace() {
        if raw == ";" {
            tokens.push(Token::Separator(raw.to_string()));
            continue;
        }
        let norm: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '#' | '.' | '-' | '_' | '%'))
            .collect();
        let norm = norm.trim_end_matches('.').to_string();
        if norm.is_empty() {
            continue;
        }
        if SEPARATORS.contains(&norm.as_str()) {
            tokens.push(Token::Separator(raw.to_string()));
        } else {
            tokens.push(Token::Word {
                filler: ARTICLES.contains(&norm.as_str()),
                norm,
                raw: raw.to_string(),
            });
        }
    }
}

fn skip_fillers(tokens: &[Token]) -> &[Token] {
    let start = tokens
        .iter()
        .position(|t| !t.is_filler())
        .unwrap_or(tokens.len());
    &tokens[start..]
}

fn join_raw(tokens: &[Token]) -> String {
    tokens.iter().map(Token::raw).collect::<Vec<_>>().join(" ")
}

/// Pattern element of a rule.
#[derive(Debug, Clone, Copy)]
enum Pat {
    /// One exact word (counts towards specificity).
    Lit(&'static str),
    /// One of the words (counts towards specificity).
    AnyOf(&'static [&'static str]),
    /// Optionally one of the words.
    Opt(&'static [&'static str]),
    Target,
    Color,
    OptColor,
    Number,
    Direction,
    Dimensions,
    Shape,
    /// A quoted segment only.
    Quoted,
    /// A quoted segment, or every remaining token.
    Text,
}

impl Pat {
    const fn is_literal(self) -> bool {
        matches!(self, Self::Lit(_) | Self::AnyOf(_))
    }
}

#[derive(Debug, Clone, Default)]
struct Captures {
    target: Option<Selector>,
    color: Option<String>,
    numbers: Vec<f64>,
    text: Option<String>,
    direction: Option<Direction>,
    dimensions: Option<(f64, f64)>,
    shape: Option<ShapeKind>,
    words: Vec<String>,
}

#[derive(Debug)]
struct Rule {
    name: &'static str,
    pattern: &'static [Pat],
    build: fn(&Captures) -> Option<Action>,
}

impl Rule {
    fn specificity(&self) -> usize {
        self.pattern.iter().filter(|p| p.is_literal()).count()
    }
}

const CHANGE: &[&str] = &["change", "set", "make", "turn", "paint", "color", "colour"];
const SET: &[&str] = &["change", "set", "make"];
const FILL_WORDS: &[&str] = &["color", "colour", "fill"];
const TEXT_WORDS: &[&str] = &["text", "content", "copy", "wording"];
const MOVE: &[&str] = &["move", "nudge", "shift"];
const ADD: &[&str] = &["add", "insert", "create"];

static RULES: &[Rule] = &[
    Rule {
        name: "set-color",
        pattern: &[
            Pat::AnyOf(CHANGE),
            Pat::Target,
            Pat::Opt(FILL_WORDS),
            Pat::Opt(&["to", "into"]),
            Pat::Color,
        ],
        build: build_fill,
    },
    Rule {
        name: "set-color-of",
        pattern: &[
            Pat::AnyOf(&["change", "set"]),
            Pat::AnyOf(FILL_WORDS),
            Pat::Lit("of"),
            Pat::Target,
            Pat::Opt(&["to"]),
            Pat::Color,
        ],
        build: build_fill,
    },
    Rule {
        name: "set-text",
        pattern: &[
            Pat::AnyOf(&["change", "set", "update", "replace"]),
            Pat::Target,
            Pat::AnyOf(TEXT_WORDS),
            Pat::AnyOf(&["to", "with"]),
            Pat::Text,
        ],
        build: build_text,
    },
    Rule {
        name: "set-text-quoted",
        pattern: &[
            Pat::AnyOf(&["change", "set", "update", "replace", "rename"]),
            Pat::Target,
            Pat::AnyOf(&["to", "with"]),
            Pat::Quoted,
        ],
        build: build_text,
    },
    Rule {
        name: "set-text-of",
        pattern: &[
            Pat::AnyOf(&["change", "set", "update"]),
            Pat::AnyOf(TEXT_WORDS),
            Pat::Lit("of"),
            Pat::Target,
            Pat::AnyOf(&["to", "with"]),
            Pat::Text,
        ],
        build: build_text,
    },
    Rule {
        name: "font-size-of",
        pattern: &[
            Pat::AnyOf(SET),
            Pat::Opt(&["font", "text"]),
            Pat::Lit("size"),
            Pat::Opt(&["of"]),
            Pat::Target,
            Pat::Opt(&["to"]),
            Pat::Number,
        ],
        build: build_font_size,
    },
    Rule {
        name: "font-size",
        pattern: &[
            Pat::AnyOf(SET),
            Pat::Target,
            Pat::Opt(&["font", "text"]),
            Pat::Lit("size"),
            Pat::Opt(&["to"]),
            Pat::Number,
        ],
        build: build_font_size,
    },
    Rule {
        name: "move-direction-amount",
        pattern: &[
            Pat::AnyOf(MOVE),
            Pat::Target,
            Pat::Direction,
            Pat::Opt(&["by"]),
            Pat::Number,
        ],
        build: build_move_by,
    },
    Rule {
        name: "move-amount-direction",
        pattern: &[Pat::AnyOf(MOVE), Pat::Target, Pat::Number, Pat::Direction],
        build: build_move_by,
    },
    Rule {
        name: "move-direction",
        pattern: &[Pat::AnyOf(MOVE), Pat::Target, Pat::Direction],
        build: build_move_by,
    },
    Rule {
        name: "move-to",
        pattern: &[
            Pat::AnyOf(&["move", "place", "put", "position"]),
            Pat::Target,
            Pat::AnyOf(&["to", "at"]),
            Pat::Number,
            Pat::Number,
        ],
        build: build_move_to,
    },
    Rule {
        name: "resize",
        pattern: &[
            Pat::Lit("resize"),
            Pat::Target,
            Pat::Opt(&["to"]),
            Pat::Dimensions,
        ],
        build: build_resize,
    },
    Rule {
        name: "set-size",
        pattern: &[
            Pat::AnyOf(SET),
            Pat::Target,
            Pat::Lit("size"),
            Pat::Opt(&["to"]),
            Pat::Dimensions,
        ],
        build: build_resize,
    },
    Rule {
        name: "scale-comparative",
        pattern: &[
            Pat::Lit("make"),
            Pat::Target,
            Pat::AnyOf(&["bigger", "larger", "smaller", "tinier"]),
        ],
        build: build_scale_step,
    },
    Rule {
        name: "scale-verb",
        pattern: &[
            Pat::AnyOf(&["enlarge", "grow", "shrink"]),
            Pat::Target,
        ],
        build: build_scale_step,
    },
    Rule {
        name: "scale-by",
        pattern: &[
            Pat::Lit("scale"),
            Pat::Target,
            Pat::Opt(&["by", "to"]),
            Pat::Number,
        ],
        build: build_scale_by,
    },
    Rule {
        name: "opacity-of",
        pattern: &[
            Pat::AnyOf(&["change", "set"]),
            Pat::AnyOf(&["opacity", "transparency"]),
            Pat::Opt(&["of"]),
            Pat::Target,
            Pat::Opt(&["to"]),
            Pat::Number,
        ],
        build: build_opacity,
    },
    Rule {
        name: "opacity",
        pattern: &[
            Pat::AnyOf(SET),
            Pat::Target,
            Pat::Lit("opacity"),
            Pat::Opt(&["to"]),
            Pat::Number,
        ],
        build: build_opacity,
    },
    Rule {
        name: "delete",
        pattern: &[Pat::AnyOf(&["delete", "remove", "erase"]), Pat::Target],
        build: |_| Some(Action::Delete),
    },
    Rule {
        name: "bring-to-front",
        pattern: &[
            Pat::AnyOf(&["bring", "move"]),
            Pat::Target,
            Pat::Opt(&["to"]),
            Pat::AnyOf(&["front", "top"]),
        ],
        build: |_| Some(Action::BringToFront),
    },
    Rule {
        name: "send-to-back",
        pattern: &[
            Pat::AnyOf(&["send", "move", "push"]),
            Pat::Target,
            Pat::Opt(&["to"]),
            Pat::AnyOf(&["back", "bottom"]),
        ],
        build: |_| Some(Action::SendToBack),
    },
    Rule {
        name: "group",
        pattern: &[Pat::Lit("group"), Pat::Target],
        build: |_| Some(Action::Group),
    },
    Rule {
        name: "ungroup",
        pattern: &[Pat::Lit("ungroup"), Pat::Target],
        build: |_| Some(Action::Ungroup),
    },
    Rule {
        name: "page-background",
        pattern: &[
            Pat::AnyOf(&["change", "set", "make", "turn", "paint"]),
            Pat::Opt(&["page"]),
            Pat::Lit("background"),
            Pat::Opt(FILL_WORDS),
            Pat::Opt(&["to"]),
            Pat::Color,
        ],
        build: |caps| {
            Some(Action::SetBackground {
                color: caps.color.clone()?,
            })
        },
    },
    Rule {
        name: "add-text",
        pattern: &[
            Pat::AnyOf(&["add", "insert", "create", "write"]),
            Pat::Opt(&["new"]),
            Pat::AnyOf(&["text", "textbox", "heading", "title", "label", "caption"]),
            Pat::Opt(&["saying", "reading", "says", "with", "that"]),
            Pat::Text,
        ],
        build: |caps| {
            Some(Action::Insert {
                object: Box::new(Object::text(caps.text.clone()?)),
            })
        },
    },
    Rule {
        name: "add-shape",
        pattern: &[
            Pat::AnyOf(&["add", "insert", "create", "draw"]),
            Pat::Opt(&["new"]),
            Pat::OptColor,
            Pat::Shape,
        ],
        build: |caps| {
            let mut shape = Object::shape(caps.shape?);
            if let Some(color) = &caps.color {
                shape = shape.with_fill(color.clone());
            }
            Some(Action::Insert {
                object: Box::new(shape),
            })
        },
    },
    Rule {
        name: "add-image",
        pattern: &[
            Pat::AnyOf(ADD),
            Pat::AnyOf(&["image", "picture", "photo"]),
            Pat::Opt(&["of", "from"]),
            Pat::Text,
        ],
        build: |caps| {
            Some(Action::Insert {
                object: Box::new(Object::image(caps.text.clone()?)),
            })
        },
    },
];

fn build_fill(caps: &Captures) -> Option<Action> {
    Some(Action::SetFill {
        color: caps.color.clone()?,
    })
}

fn build_text(caps: &Captures) -> Option<Action> {
    Some(Action::SetText {
        text: caps.text.clone()?,
    })
}

fn build_font_size(caps: &Captures) -> Option<Action> {
    Some(Action::SetFontSize {
        size: *caps.numbers.first()?,
    })
}

fn build_move_by(caps: &Captures) -> Option<Action> {
    let amount = caps.numbers.first().copied().unwrap_or(DEFAULT_NUDGE);
    let (dx, dy) = caps.direction?.delta(amount);
    Some(Action::MoveBy { dx, dy })
}

fn build_move_to(caps: &Captures) -> Option<Action> {
    match caps.numbers.as_slice() {
        [x, y] => Some(Action::MoveTo { x: *x, y: *y }),
        _ => None,
    }
}

fn build_resize(caps: &Captures) -> Option<Action> {
    let (width, height) = caps.dimensions?;
    Some(Action::Resize { width, height })
}

fn build_scale_step(caps: &Captures) -> Option<Action> {
    let factor = match caps.words.last()?.as_str() {
        "bigger" | "larger" | "enlarge" | "grow" => SCALE_STEP,
        "smaller" | "tinier" | "shrink" => 1.0 / SCALE_STEP,
        _ => return None,
    };
    Some(Action::Scale { factor })
}

fn build_scale_by(caps: &Captures) -> Option<Action> {
    Some(Action::Scale {
        factor: *caps.numbers.first()?,
    })
}

fn build_opacity(caps: &Captures) -> Option<Action> {
    let value = *caps.numbers.first()?;
    // Bare numbers above one are percentages.
    let opacity = if value > 1.0 { value / 100.0 } else { value };
    Some(Action::SetOpacity { opacity })
}

/// Parse a CSS color name or hex literal to upper-case `#RRGGBB`.
#[must_use]
pub fn parse_color(word: &str) -> Option<String> {
    let named = match word {
        "black" => "#000000",
        "white" => "#FFFFFF",
        "red" => "#FF0000",
        "green" => "#008000",
        "lime" => "#00FF00",
        "blue" => "#0000FF",
        "navy" => "#000080",
        "yellow" => "#FFFF00",
        "orange" => "#FFA500",
        "purple" => "#800080",
        "pink" => "#FFC0CB",
        "gray" | "grey" => "#808080",
        "teal" => "#008080",
        "brown" => "#A52A2A",
        "gold" => "#FFD700",
        _ => return normalize_hex_color(word),
    };
    Some(named.to_string())
}

fn parse_number(word: &str) -> Option<f64> {
    let finite = |v: f64| v.is_finite().then_some(v);
    if let Some(percent) = word.strip_suffix('%') {
        return percent.parse::<f64>().ok().and_then(finite).map(|v| v / 100.0);
    }
    let digits = word
        .strip_suffix("px")
        .or_else(|| word.strip_suffix("pt"))
        .unwrap_or(word);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        return None;
    }
    digits.parse::<f64>().ok().and_then(finite)
}

fn parse_ordinal(word: &str) -> Option<usize> {
    let position = match word {
        "first" | "1st" => 1,
        "second" | "2nd" => 2,
        "third" | "3rd" => 3,
        "fourth" | "4th" => 4,
        "fifth" | "5th" => 5,
        "sixth" | "6th" => 6,
        "seventh" | "7th" => 7,
        "eighth" | "8th" => 8,
        "ninth" | "9th" => 9,
        "tenth" | "10th" => 10,
        _ => return None,
    };
    Some(position - 1)
}

fn parse_dimensions(word: &str) -> Option<(f64, f64)> {
    let (w, h) = word.split_once('x')?;
    Some((parse_number(w)?, parse_number(h)?))
}

fn parse_target(tokens: &[Token], ctx: &ParseContext) -> Option<Selector> {
    let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.is_filler()).collect();
    if tokens.iter().any(|t| t.is_separator()) {
        let mut ids = Vec::new();
        for piece in tokens.split(|t| t.is_separator()) {
            match piece {
                [single] => ids.push(ctx.id(single.word()?)?.clone()),
                _ => return None,
            }
        }
        return Some(Selector::Ids(ids));
    }
    let words = tokens
        .iter()
        .map(|t| t.word())
        .collect::<Option<Vec<&str>>>()?;
    if words.len() >= 2 {
        if let Some(ids) = words
            .iter()
            .map(|w| ctx.id(w).cloned())
            .collect::<Option<Vec<_>>>()
        {
            return Some(Selector::Ids(ids));
        }
    }
    match words.as_slice() {
        [word] => single_target(word, ctx),
        [first, second] => pair_target(first, second, ctx),
        _ => None,
    }
}

fn single_target(word: &str, ctx: &ParseContext) -> Option<Selector> {
    if SELECTION_WORDS.contains(&word) {
        return Some(Selector::Ids(ctx.selection.clone()));
    }
    if let Some(id) = ctx.id(word) {
        return Some(Selector::Id(id.clone()));
    }
    if let Some(role) = ctx.roles.get(word) {
        return Some(Selector::Role(role.clone()));
    }
    ObjectType::from_word(word).map(|object_type| Selector::TypeOrdinal {
        object_type,
        index: 0,
    })
}

fn pair_target(first: &str, second: &str, ctx: &ParseContext) -> Option<Selector> {
    let noun = ObjectType::from_word(second);
    if SELECTION_WORDS.contains(&first) && (noun.is_some() || GENERIC_NOUNS.contains(&second)) {
        return Some(Selector::Ids(ctx.selection.clone()));
    }
    if let Some(object_type) = noun {
        if let Some(index) = parse_ordinal(first) {
            return Some(Selector::TypeOrdinal { object_type, index });
        }
        if first == "last" {
            let count = ctx.type_counts.get(&object_type).copied().unwrap_or(0);
            return Some(Selector::TypeOrdinal {
                object_type,
                index: count.checked_sub(1)?,
            });
        }
        if let Some(role) = ctx.roles.get(first) {
            return Some(Selector::Role(role.clone()));
        }
    }
    if let Some(object_type) = ObjectType::from_word(first) {
        if let Some(id) = ctx.id(second) {
            return Some(Selector::Id(id.clone()));
        }
        let n = second.parse::<usize>().ok()?;
        return Some(Selector::TypeOrdinal {
            object_type,
            index: n.checked_sub(1)?,
        });
    }
    None
}

/// How far an unquoted free-text capture may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSpan {
    /// Stop at the first clause separator.
    Clause,
    /// Swallow separators too, e.g. "add text salt and pepper".
    Instruction,
}

fn matches(
    pats: &[Pat],
    tokens: &[Token],
    ctx: &ParseContext,
    span: TextSpan,
    caps: &mut Captures,
) -> bool {
    let Some((pat, rest)) = pats.split_first() else {
        return skip_fillers(tokens).is_empty();
    };
    if let Pat::Text = pat {
        let trimmed = skip_fillers(tokens);
        if let Some((Token::Quoted(text), tail)) = trimmed.split_first() {
            return capture(rest, tail, ctx, span, caps, |c| c.text = Some(text.clone()));
        }
        let crosses_clause = trimmed.iter().any(Token::is_separator);
        let reachable = span == TextSpan::Instruction || !crosses_clause;
        if rest.is_empty() && !trimmed.is_empty() && reachable {
            caps.text = Some(join_raw(tokens).trim().to_string());
            return true;
        }
        return false;
    }
    let tokens = skip_fillers(tokens);
    let Some((head, tail)) = tokens.split_first() else {
        // Only optional elements may match nothing.
        return match pat {
            Pat::Opt(_) | Pat::OptColor => matches(rest, tokens, ctx, span, caps),
            _ => false,
        };
    };
    match pat {
        Pat::Lit(word) => head.word() == Some(*word) && matches(rest, tail, ctx, span, caps),
        Pat::AnyOf(words) => match head.word() {
            Some(w) if words.contains(&w) => {
                capture(rest, tail, ctx, span, caps, |c| c.words.push(w.to_string()))
            }
            _ => false,
        },
        Pat::Opt(words) => {
            (head.word().is_some_and(|w| words.contains(&w)) && matches(rest, tail, ctx, span, caps))
                || matches(rest, tokens, ctx, span, caps)
        }
        Pat::Target => {
            for len in (1..=tokens.len().min(MAX_TARGET_TOKENS)).rev() {
                if let Some(selector) = parse_target(&tokens[..len], ctx) {
                    if capture(rest, &tokens[len..], ctx, span, caps, |c| c.target = Some(selector)) {
                        return true;
                    }
                }
            }
            false
        }
        Pat::Color | Pat::OptColor => {
            let parsed = head.word().and_then(parse_color);
            let matched = parsed.is_some_and(|color| {
                capture(rest, tail, ctx, span, caps, |c| c.color = Some(color))
            });
            matched || (matches!(pat, Pat::OptColor) && matches(rest, tokens, ctx, span, caps))
        }
        Pat::Number => head
            .word()
            .and_then(parse_number)
            .is_some_and(|n| capture(rest, tail, ctx, span, caps, |c| c.numbers.push(n))),
        Pat::Direction => head
            .word()
            .and_then(Direction::from_word)
            .is_some_and(|d| capture(rest, tail, ctx, span, caps, |c| c.direction = Some(d))),
        Pat::Shape => head
            .word()
            .and_then(ShapeKind::from_word)
            .is_some_and(|s| capture(rest, tail, ctx, span, caps, |c| c.shape = Some(s))),
        Pat::Dimensions => {
            if let Some(dims) = head.word().and_then(parse_dimensions) {
                if capture(rest, tail, ctx, span, caps, |c| c.dimensions = Some(dims)) {
                    return true;
                }
            }
            match tokens {
                [w, by, h, after @ ..] if matches!(by.word(), Some("x" | "by")) => {
                    match (w.word().and_then(parse_number), h.word().and_then(parse_number)) {
                        (Some(w), Some(h)) => {
                            capture(rest, after, ctx, span, caps, |c| c.dimensions = Some((w, h)))
                        }
                        _ => false,
                    }
                }
                _ => false,
            }
        }
        Pat::Quoted => match head {
            Token::Quoted(text) => capture(rest, tail, ctx, span, caps, |c| c.text = Some(text.clone())),
            _ => false,
        },
        Pat::Text => false,
    }
}

/// Record a capture and continue; roll the capture back if the rest fails.
fn capture(
    rest: &[Pat],
    tail: &[Token],
    ctx: &ParseContext,
    span: TextSpan,
    caps: &mut Captures,
    set: impl FnOnce(&mut Captures),
) -> bool {
    let saved = caps.clone();
    set(caps);
    if matches(rest, tail, ctx, span, caps) {
        true
    } else {
        *caps = saved;
        false
    }
}

/// Rule-table parser from instructions to commands.
#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    rules: &'static [Rule],
}

impl CommandParser {
    /// Create a parser with the built-in rule table.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: RULES }
    }

    /// Rule names in declaration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// Parse an instruction into one command per clause.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::UnsupportedCommand`] if the instruction is empty
    /// or any clause matches no rule.
    pub fn parse(&self, input: &str, ctx: &ParseContext) -> EditorResult<Vec<Command>> {
        let tokens = tokenize(input);
        if skip_fillers(&tokens).iter().all(Token::is_separator) {
            return Err(EditorError::UnsupportedCommand(input.trim().to_string()));
        }
        // Free text ends at a separator unless splitting leaves a clause
        // that matches nothing.
        self.parse_tokens(input, &tokens, ctx, TextSpan::Clause)
            .or_else(|e| {
                self.parse_tokens(input, &tokens, ctx, TextSpan::Instruction)
                    .map_err(|_| e)
            })
    }

    fn parse_tokens(
        &self,
        input: &str,
        tokens: &[Token],
        ctx: &ParseContext,
        span: TextSpan,
    ) -> EditorResult<Vec<Command>> {
        let mut ends: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_separator())
            .map(|(i, _)| i)
            .collect();
        ends.push(tokens.len());

        let mut commands = Vec::new();
        let mut start = 0;
        while start < tokens.len() {
            let clause_is_empty = |end: usize| {
                tokens[start..end]
                    .iter()
                    .all(|t| t.is_filler() || t.is_separator())
            };
            // Prefer the longest clause so lists like "t1 and t2" stay whole.
            let found = ends.iter().rev().filter(|&&end| end > start).find_map(|&end| {
                self.parse_clause(&tokens[start..end], ctx, span)
                    .map(|c| (end, c))
            });
            match found {
                Some((end, command)) => {
                    commands.push(command);
                    start = end + 1;
                }
                None => {
                    let end = ends
                        .iter()
                        .copied()
                        .find(|&end| end >= start)
                        .unwrap_or(tokens.len());
                    if clause_is_empty(end) {
                        start = end + 1;
                        continue;
                    }
                    let clause = join_raw(&tokens[start..end]);
                    tracing::debug!(%clause, "No rule matched");
                    return Err(EditorError::UnsupportedCommand(clause));
                }
            }
        }
        if commands.is_empty() {
            return Err(EditorError::UnsupportedCommand(input.trim().to_string()));
        }
        Ok(commands)
    }

    fn parse_clause(
        &self,
        tokens: &[Token],
        ctx: &ParseContext,
        span: TextSpan,
    ) -> Option<Command> {
        let mut best: Option<(usize, &Rule, Captures)> = None;
        for rule in self.rules {
            let mut caps = Captures::default();
            if !matches(rule.pattern, tokens, ctx, span, &mut caps) {
                continue;
            }
            let specificity = rule.specificity();
            if best.as_ref().map_or(true, |(s, _, _)| specificity > *s) {
                best = Some((specificity, rule, caps));
            }
        }
        let (_, rule, caps) = best?;
        let action = (rule.build)(&caps)?;
        let target = caps.target.unwrap_or(Selector::Page);
        tracing::trace!(rule = rule.name, %target, "Clause matched");
        Some(Command::new(action, target).with_source_text(join_raw(tokens)))
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}
