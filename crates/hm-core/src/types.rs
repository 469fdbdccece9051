//! Engine rule type definitions
//!
//! These types map directly to the JSON rule shape the filtering engine
//! accepts for dynamic header-modification rules.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::RuleId;

/// URL filter matching every URL.
pub const MATCH_ALL_FILTER: &str = "*://*/*";

// =============================================================================
// Resource Types
// =============================================================================

bitflags::bitflags! {
    /// Resource type mask for a rule condition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceType: u16 {
        const MAIN_FRAME = 1 << 0;
        const SUB_FRAME = 1 << 1;
        const STYLESHEET = 1 << 2;
        const SCRIPT = 1 << 3;
        const IMAGE = 1 << 4;
        const FONT = 1 << 5;
        const OBJECT = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const OTHER = 1 << 9;
        const PING = 1 << 10;
        const CSP_REPORT = 1 << 11;
        const MEDIA = 1 << 12;
    }
}

/// Resource types every translated rule applies to. Not user-configurable.
pub const TARGET_RESOURCE_TYPES: ResourceType = ResourceType::MAIN_FRAME
    .union(ResourceType::SUB_FRAME)
    .union(ResourceType::STYLESHEET)
    .union(ResourceType::SCRIPT)
    .union(ResourceType::IMAGE)
    .union(ResourceType::FONT)
    .union(ResourceType::OBJECT)
    .union(ResourceType::XMLHTTPREQUEST)
    .union(ResourceType::WEBSOCKET)
    .union(ResourceType::OTHER);

/// Engine names, in the order they are emitted.
const RESOURCE_TYPE_NAMES: [(ResourceType, &str); 13] = [
    (ResourceType::MAIN_FRAME, "main_frame"),
    (ResourceType::SUB_FRAME, "sub_frame"),
    (ResourceType::STYLESHEET, "stylesheet"),
    (ResourceType::SCRIPT, "script"),
    (ResourceType::IMAGE, "image"),
    (ResourceType::FONT, "font"),
    (ResourceType::OBJECT, "object"),
    (ResourceType::XMLHTTPREQUEST, "xmlhttprequest"),
    (ResourceType::WEBSOCKET, "websocket"),
    (ResourceType::OTHER, "other"),
    (ResourceType::PING, "ping"),
    (ResourceType::CSP_REPORT, "csp_report"),
    (ResourceType::MEDIA, "media"),
];

impl ResourceType {
    /// Parse a single engine resource type name.
    pub fn from_engine_name(s: &str) -> Option<Self> {
        RESOURCE_TYPE_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(ty, _)| *ty)
    }

    /// Engine names of the set bits, in canonical order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        RESOURCE_TYPE_NAMES
            .iter()
            .filter(move |(ty, _)| self.contains(*ty))
            .map(|(_, name)| *name)
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for name in self.names() {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamesVisitor;

        impl<'de> Visitor<'de> for NamesVisitor {
            type Value = ResourceType;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of resource type names")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut mask = ResourceType::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    let ty = ResourceType::from_engine_name(&name).ok_or_else(|| {
                        de::Error::custom(format!("unknown resource type: {name}"))
                    })?;
                    mask |= ty;
                }
                Ok(mask)
            }
        }

        deserializer.deserialize_seq(NamesVisitor)
    }
}

// =============================================================================
// Rule Condition
// =============================================================================

/// URL filter plus resource type scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: ResourceType,
}

impl RuleCondition {
    /// Condition for a declared domain pattern. Blank patterns match all URLs.
    pub fn for_pattern(pattern: &str) -> Self {
        let trimmed = pattern.trim();
        let url_filter = if trimmed.is_empty() {
            MATCH_ALL_FILTER
        } else {
            trimmed
        };
        Self {
            url_filter: url_filter.to_string(),
            resource_types: TARGET_RESOURCE_TYPES,
        }
    }

    #[inline]
    pub fn matches_all(&self) -> bool {
        self.url_filter == MATCH_ALL_FILTER
    }
}

// =============================================================================
// Rule Action
// =============================================================================

/// Header mutation applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOperation {
    Set,
    Remove,
}

/// A single request header mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderAction {
    pub header: String,
    pub operation: HeaderOperation,
    /// Absent for `remove`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl HeaderAction {
    pub fn set(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            operation: HeaderOperation::Set,
            value: Some(value.into()),
        }
    }

    pub fn remove(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            operation: HeaderOperation::Remove,
            value: None,
        }
    }
}

/// Engine action. Only header modification is produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    #[serde(rename_all = "camelCase")]
    ModifyHeaders { request_headers: Vec<HeaderAction> },
}

impl RuleAction {
    pub fn modify_header(action: HeaderAction) -> Self {
        Self::ModifyHeaders {
            request_headers: vec![action],
        }
    }

    /// Request header mutations carried by this action.
    pub fn request_headers(&self) -> &[HeaderAction] {
        match self {
            Self::ModifyHeaders { request_headers } => request_headers,
        }
    }
}

// =============================================================================
// Engine Rule
// =============================================================================

/// Engine-native rule derived from one declared rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineRule {
    pub id: RuleId,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}
