//! Structural token catalog.
//!
//! Every kind carries a stable numeric code. Downstream consumers persist
//! these codes, so they must never change between releases. Code `1` is
//! reserved by the consumer for end-of-file and is never assigned here.

use once_cell::sync::Lazy;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// A structural token kind.
///
/// The discriminant is the stable code emitted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum TokenKind {
    FOR_BEGIN = 47,
    FOR_END = 2,
    BREAK = 3,
    CONTINUE = 4,
    CLASS_BEGIN = 5,
    CLASS_END = 6,
    DO_BEGIN = 7,
    DO_END = 8,
    FUNCTION_BEGIN = 9,
    FUNCTION_END = 10,
    VARDEF = 11,
    IF_BEGIN = 12,
    IF_END = 13,
    ELSE = 14,
    GOTO = 15,
    INLINE_HTML = 16,
    INTERFACE_BEGIN = 17,
    INTERFACE_END = 18,
    NAMESPACE = 19,
    NAMESPACE_USE = 20,
    RETURN = 21,
    SWITCH_BEGIN = 22,
    SWITCH_END = 23,
    THROW = 24,
    TRAIT_BEGIN = 25,
    TRAIT_END = 26,
    TRY = 27,
    CATCH_BEGIN = 28,
    CATCH_END = 29,
    FINALLY = 30,
    WHILE_BEGIN = 31,
    WHILE_END = 32,
    CASE = 33,
    TRAIT_USE = 34,
    ASSIGN = 35,
    /// Conditional (`?:`) expression.
    TERNARY = 36,
    NEW_CLASS = 37,
    IN_CLASS_BEGIN = 38,
    IN_CLASS_END = 39,
    NEW_ARRAY = 40,
    /// Call expression.
    APPLY = 41,
    ECHO = 42,
    UNSET = 43,
    ISSET = 44,
    EVAL = 45,
    YIELD = 46,
}

static BY_CODE: Lazy<HashMap<u16, TokenKind>> =
    Lazy::new(|| TokenKind::ALL.iter().map(|k| (k.code(), *k)).collect());

static BY_NAME: Lazy<HashMap<&'static str, TokenKind>> =
    Lazy::new(|| TokenKind::ALL.iter().map(|k| (k.name(), *k)).collect());

impl TokenKind {
    /// All kinds in catalog order.
    pub const ALL: [TokenKind; 46] = [
        TokenKind::FOR_BEGIN,
        TokenKind::FOR_END,
        TokenKind::BREAK,
        TokenKind::CONTINUE,
        TokenKind::CLASS_BEGIN,
        TokenKind::CLASS_END,
        TokenKind::DO_BEGIN,
        TokenKind::DO_END,
        TokenKind::FUNCTION_BEGIN,
        TokenKind::FUNCTION_END,
        TokenKind::VARDEF,
        TokenKind::IF_BEGIN,
        TokenKind::IF_END,
        TokenKind::ELSE,
        TokenKind::GOTO,
        TokenKind::INLINE_HTML,
        TokenKind::INTERFACE_BEGIN,
        TokenKind::INTERFACE_END,
        TokenKind::NAMESPACE,
        TokenKind::NAMESPACE_USE,
        TokenKind::RETURN,
        TokenKind::SWITCH_BEGIN,
        TokenKind::SWITCH_END,
        TokenKind::THROW,
        TokenKind::TRAIT_BEGIN,
        TokenKind::TRAIT_END,
        TokenKind::TRY,
        TokenKind::CATCH_BEGIN,
        TokenKind::CATCH_END,
        TokenKind::FINALLY,
        TokenKind::WHILE_BEGIN,
        TokenKind::WHILE_END,
        TokenKind::CASE,
        TokenKind::TRAIT_USE,
        TokenKind::ASSIGN,
        TokenKind::TERNARY,
        TokenKind::NEW_CLASS,
        TokenKind::IN_CLASS_BEGIN,
        TokenKind::IN_CLASS_END,
        TokenKind::NEW_ARRAY,
        TokenKind::APPLY,
        TokenKind::ECHO,
        TokenKind::UNSET,
        TokenKind::ISSET,
        TokenKind::EVAL,
        TokenKind::YIELD,
    ];

    /// Stable wire code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Upper-snake name, as used in the `key` field of emitted tokens.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::FOR_BEGIN => "FOR_BEGIN",
            TokenKind::FOR_END => "FOR_END",
            TokenKind::BREAK => "BREAK",
            TokenKind::CONTINUE => "CONTINUE",
            TokenKind::CLASS_BEGIN => "CLASS_BEGIN",
            TokenKind::CLASS_END => "CLASS_END",
            TokenKind::DO_BEGIN => "DO_BEGIN",
            TokenKind::DO_END => "DO_END",
            TokenKind::FUNCTION_BEGIN => "FUNCTION_BEGIN",
            TokenKind::FUNCTION_END => "FUNCTION_END",
            TokenKind::VARDEF => "VARDEF",
            TokenKind::IF_BEGIN => "IF_BEGIN",
            TokenKind::IF_END => "IF_END",
            TokenKind::ELSE => "ELSE",
            TokenKind::GOTO => "GOTO",
            TokenKind::INLINE_HTML => "INLINE_HTML",
            TokenKind::INTERFACE_BEGIN => "INTERFACE_BEGIN",
            TokenKind::INTERFACE_END => "INTERFACE_END",
            TokenKind::NAMESPACE => "NAMESPACE",
            TokenKind::NAMESPACE_USE => "NAMESPACE_USE",
            TokenKind::RETURN => "RETURN",
            TokenKind::SWITCH_BEGIN => "SWITCH_BEGIN",
            TokenKind::SWITCH_END => "SWITCH_END",
            TokenKind::THROW => "THROW",
            TokenKind::TRAIT_BEGIN => "TRAIT_BEGIN",
            TokenKind::TRAIT_END => "TRAIT_END",
            TokenKind::TRY => "TRY",
            TokenKind::CATCH_BEGIN => "CATCH_BEGIN",
            TokenKind::CATCH_END => "CATCH_END",
            TokenKind::FINALLY => "FINALLY",
            TokenKind::WHILE_BEGIN => "WHILE_BEGIN",
            TokenKind::WHILE_END => "WHILE_END",
            TokenKind::CASE => "CASE",
            TokenKind::TRAIT_USE => "TRAIT_USE",
            TokenKind::ASSIGN => "ASSIGN",
            TokenKind::TERNARY => "TERNARY",
            TokenKind::NEW_CLASS => "NEW_CLASS",
            TokenKind::IN_CLASS_BEGIN => "IN_CLASS_BEGIN",
            TokenKind::IN_CLASS_END => "IN_CLASS_END",
            TokenKind::NEW_ARRAY => "NEW_ARRAY",
            TokenKind::APPLY => "APPLY",
            TokenKind::ECHO => "ECHO",
            TokenKind::UNSET => "UNSET",
            TokenKind::ISSET => "ISSET",
            TokenKind::EVAL => "EVAL",
            TokenKind::YIELD => "YIELD",
        }
    }

    /// Reverse lookup by wire code.
    pub fn from_code(code: u16) -> Option<Self> {
        BY_CODE.get(&code).copied()
    }

    /// Reverse lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }

    /// Number of kinds in the catalog.
    pub fn count() -> usize {
        Self::ALL.len()
    }

    /// Size of the code space seen by consumers: every kind plus the
    /// reserved end-of-file code.
    pub fn amount() -> usize {
        Self::count() + 1
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Serialized as `{"key": NAME, "value": CODE}`.
impl Serialize for TokenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TokenKind", 2)?;
        state.serialize_field("key", self.name())?;
        state.serialize_field("value", &self.code())?;
        state.end()
    }
}

/// The code → name table, serialized as a JSON object in catalog order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mapping;

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TokenKind::count()))?;
        for kind in TokenKind::ALL {
            map.serialize_entry(&kind.code(), kind.name())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn code_one_is_reserved() {
        assert!(TokenKind::from_code(1).is_none());
        assert!(TokenKind::ALL.iter().all(|k| k.code() != 1));
    }

    #[test]
    fn codes_cover_two_through_amount() {
        let codes: HashSet<u16> = TokenKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), TokenKind::count());
        let expected: HashSet<u16> = (2..=TokenKind::count() as u16 + 1).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn stable_codes() {
        assert_eq!(TokenKind::FOR_BEGIN.code(), 47);
        assert_eq!(TokenKind::FOR_END.code(), 2);
        assert_eq!(TokenKind::INLINE_HTML.code(), 16);
        assert_eq!(TokenKind::ASSIGN.code(), 35);
        assert_eq!(TokenKind::YIELD.code(), 46);
    }

    #[test]
    fn reverse_lookups_agree() {
        for kind in TokenKind::ALL {
            assert_eq!(TokenKind::from_code(kind.code()), Some(kind));
            assert_eq!(TokenKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(TokenKind::from_name("for_begin"), None);
    }

    #[test]
    fn amount_reserves_end_of_file() {
        assert_eq!(TokenKind::count(), 46);
        assert_eq!(TokenKind::amount(), 47);
    }

    #[test]
    fn serializes_as_key_value() {
        let json = serde_json::to_string(&TokenKind::APPLY).unwrap();
        assert_eq!(json, r#"{"key":"APPLY","value":41}"#);
    }

    #[test]
    fn mapping_is_catalog_ordered_object() {
        let json = serde_json::to_string(&Mapping).unwrap();
        assert!(json.starts_with(r#"{"47":"FOR_BEGIN","2":"FOR_END","3":"BREAK""#));

        let parsed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), TokenKind::count());
        assert!(!parsed.contains_key("1"));
        let names: HashSet<&str> = parsed.values().filter_map(|v| v.as_str()).collect();
        assert_eq!(names.len(), TokenKind::count());
    }
}
