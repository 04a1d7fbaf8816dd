use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer frame offset from the composition origin.
pub type Frame = i64;

// ---------------------------------------------------------------------------
// OverlayId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OverlayId(pub u64);

impl OverlayId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// Axis-aligned box in composition pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

// ---------------------------------------------------------------------------
// OverlayKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKind {
    Video,
    Image,
    Text,
    Sound,
    Sticker,
    Shape,
    Caption,
    Template,
    LocalDirectory,
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlayKind::Video => "video",
            OverlayKind::Image => "image",
            OverlayKind::Text => "text",
            OverlayKind::Sound => "sound",
            OverlayKind::Sticker => "sticker",
            OverlayKind::Shape => "shape",
            OverlayKind::Caption => "caption",
            OverlayKind::Template => "template",
            OverlayKind::LocalDirectory => "local-directory",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub src: String,
    /// Offset into the source media, in frames.
    #[serde(default)]
    pub video_start_time: Frame,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub src: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 48.0,
            font_family: "Inter".to_string(),
            color: "#ffffff".to_string(),
            font_weight: None,
            text_align: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub content: String,
    #[serde(default)]
    pub styles: TextStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoundContent {
    pub src: String,
    /// Offset into the source audio, in frames.
    #[serde(default)]
    pub start_from_sound: Frame,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StickerContent {
    pub template_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShapeContent {
    pub shape: String,
    pub fill: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionLine {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionContent {
    #[serde(default)]
    pub captions: Vec<CaptionLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContent {
    pub template_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalDirectoryContent {
    pub path: String,
}

fn default_volume() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// OverlayContent
// ---------------------------------------------------------------------------

/// Type-specific payload. The `type` tag lands beside the overlay's timing
/// fields in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlayContent {
    Video(VideoContent),
    Image(ImageContent),
    Text(TextContent),
    Sound(SoundContent),
    Sticker(StickerContent),
    Shape(ShapeContent),
    Caption(CaptionContent),
    Template(TemplateContent),
    LocalDirectory(LocalDirectoryContent),
}

impl OverlayContent {
    pub fn kind(&self) -> OverlayKind {
        match self {
            OverlayContent::Video(_) => OverlayKind::Video,
            OverlayContent::Image(_) => OverlayKind::Image,
            OverlayContent::Text(_) => OverlayKind::Text,
            OverlayContent::Sound(_) => OverlayKind::Sound,
            OverlayContent::Sticker(_) => OverlayKind::Sticker,
            OverlayContent::Shape(_) => OverlayKind::Shape,
            OverlayContent::Caption(_) => OverlayKind::Caption,
            OverlayContent::Template(_) => OverlayKind::Template,
            OverlayContent::LocalDirectory(_) => OverlayKind::LocalDirectory,
        }
    }

    /// Empty payload of the given kind, for placeholders.
    pub fn blank(kind: OverlayKind) -> Self {
        match kind {
            OverlayKind::Video => OverlayContent::Video(VideoContent {
                src: String::new(),
                video_start_time: 0,
                volume: default_volume(),
            }),
            OverlayKind::Image => OverlayContent::Image(ImageContent { src: String::new() }),
            OverlayKind::Text => OverlayContent::Text(TextContent {
                content: String::new(),
                styles: TextStyle::default(),
            }),
            OverlayKind::Sound => OverlayContent::Sound(SoundContent {
                src: String::new(),
                start_from_sound: 0,
                volume: default_volume(),
            }),
            OverlayKind::Sticker => OverlayContent::Sticker(StickerContent {
                template_id: String::new(),
            }),
            OverlayKind::Shape => OverlayContent::Shape(ShapeContent {
                shape: "rectangle".to_string(),
                fill: "#ffffff".to_string(),
            }),
            OverlayKind::Caption => OverlayContent::Caption(CaptionContent { captions: vec![] }),
            OverlayKind::Template => OverlayContent::Template(TemplateContent {
                template_id: String::new(),
            }),
            OverlayKind::LocalDirectory => OverlayContent::LocalDirectory(LocalDirectoryContent {
                path: String::new(),
            }),
        }
    }

    /// Offset into the source media, for media-bearing payloads.
    pub fn media_offset(&self) -> Option<Frame> {
        match self {
            OverlayContent::Video(v) => Some(v.video_start_time),
            OverlayContent::Sound(s) => Some(s.start_from_sound),
            OverlayContent::Image(_)
            | OverlayContent::Text(_)
            | OverlayContent::Sticker(_)
            | OverlayContent::Shape(_)
            | OverlayContent::Caption(_)
            | OverlayContent::Template(_)
            | OverlayContent::LocalDirectory(_) => None,
        }
    }

    /// Advance the media offset by `frames`. No-op for payloads without one.
    pub fn advance_media_offset(&mut self, frames: Frame) {
        match self {
            OverlayContent::Video(v) => v.video_start_time += frames,
            OverlayContent::Sound(s) => s.start_from_sound += frames,
            OverlayContent::Image(_)
            | OverlayContent::Text(_)
            | OverlayContent::Sticker(_)
            | OverlayContent::Shape(_)
            | OverlayContent::Caption(_)
            | OverlayContent::Template(_)
            | OverlayContent::LocalDirectory(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// OverlayDraft
// ---------------------------------------------------------------------------

/// An overlay that has not been given an id yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDraft {
    pub from: Frame,
    pub duration_in_frames: Frame,
    pub row: usize,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(flatten)]
    pub content: OverlayContent,
}

impl OverlayDraft {
    pub fn new(content: OverlayContent, from: Frame, duration_in_frames: Frame, row: usize) -> Self {
        Self {
            from,
            duration_in_frames,
            row,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            content,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.left = bounds.left;
        self.top = bounds.top;
        self.width = bounds.width;
        self.height = bounds.height;
        self
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub id: OverlayId,
    pub from: Frame,
    pub duration_in_frames: Frame,
    pub row: usize,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(flatten)]
    pub content: OverlayContent,
}

impl Overlay {
    pub fn from_draft(id: OverlayId, draft: OverlayDraft) -> Self {
        Self {
            id,
            from: draft.from,
            duration_in_frames: draft.duration_in_frames,
            row: draft.row,
            left: draft.left,
            top: draft.top,
            width: draft.width,
            height: draft.height,
            rotation: draft.rotation,
            content: draft.content,
        }
    }

    pub fn to_draft(&self) -> OverlayDraft {
        OverlayDraft {
            from: self.from,
            duration_in_frames: self.duration_in_frames,
            row: self.row,
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
            content: self.content.clone(),
        }
    }

    pub fn kind(&self) -> OverlayKind {
        self.content.kind()
    }

    /// Exclusive end frame.
    pub fn end(&self) -> Frame {
        self.from.saturating_add(self.duration_in_frames)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.left = bounds.left;
        self.top = bounds.top;
        self.width = bounds.width;
        self.height = bounds.height;
    }

    /// True if `frame` lies strictly inside the interval, excluding both edges.
    pub fn contains_interior(&self, frame: Frame) -> bool {
        self.from < frame && frame < self.end()
    }

    /// Media offset converted to seconds at `fps`.
    pub fn media_offset_seconds(&self, fps: f64) -> Option<f64> {
        if fps <= 0.0 {
            return None;
        }
        self.content.media_offset().map(|f| f as f64 / fps)
    }
}

/// Half-open interval intersection: `[a_from, a_end)` vs `[b_from, b_end)`.
pub fn intervals_overlap(a_from: Frame, a_end: Frame, b_from: Frame, b_end: Frame) -> bool {
    a_from < b_end && b_from < a_end
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
