//! Outliner block tree shared by workflow sources and generated output

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Horizontal alignment of a block's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// How a block renders its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Bullet,
    Numbered,
    Document,
}

impl ViewType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "bullet" => Some(Self::Bullet),
            "numbered" => Some(Self::Numbered),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Numbered => "numbered",
            Self::Document => "document",
        }
    }
}

/// One outliner block, recursively
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Node {
    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_type: Option<ViewType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,

    /// Host-specific properties carried through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, serde_json::Value>,
}

impl Node {
    /// A childless block with the given text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Copy heading, alignment, view type, open state and props from `props`
    pub fn apply_props(&mut self, props: NodeProps) {
        if props.heading.is_some() {
            self.heading = props.heading;
        }
        if props.text_align.is_some() {
            self.text_align = props.text_align;
        }
        if props.view_type.is_some() {
            self.view_type = props.view_type;
        }
        if props.open.is_some() {
            self.open = props.open;
        }
        self.props.extend(props.extra);
    }

    /// True when the text is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Block attributes a command asked to set on the block being evaluated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeProps {
    pub heading: Option<u8>,
    pub text_align: Option<TextAlign>,
    pub view_type: Option<ViewType>,
    pub open: Option<bool>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeProps {
    pub fn is_empty(&self) -> bool {
        self.heading.is_none()
            && self.text_align.is_none()
            && self.view_type.is_none()
            && self.open.is_none()
            && self.extra.is_empty()
    }
}
