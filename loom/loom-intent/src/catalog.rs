//! The frozen intent catalog.
//!
//! Intent identifiers are part of the external interface: consumers select
//! from them by name and artifacts carry them verbatim. New identifiers may
//! be appended; existing ones never change meaning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every test intent the generator can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    HappyPath,
    RequiredFieldMissing,
    RequiredArgMissing,
    NullNotAllowed,
    TypeViolation,
    UnexpectedArgument,
    UnionNoMatch,
    ResourceNotFound,
    FormatInvalidPathParam,
    HeaderMissing,
    HeaderEnumMismatch,
    EnumMismatch,
    StringTooShort,
    StringTooLong,
    PatternMismatch,
    FormatInvalid,
    NumberTooSmall,
    NumberTooLarge,
    NotMultipleOf,
    BoundaryMinMinusOne,
    BoundaryMaxPlusOne,
    BoundaryMinLengthMinusOne,
    BoundaryMaxLengthPlusOne,
    BoundaryMinItemsMinusOne,
    BoundaryMaxItemsPlusOne,
    ArrayTooShort,
    ArrayTooLong,
    ArrayNotUnique,
    ArrayItemTypeViolation,
    AdditionalPropertyNotAllowed,
    ObjectValueTypeViolation,
    EmptyString,
    WhitespaceOnly,
    SqlInjection,
    XssInjection,
    CommandInjection,
    HeaderInjection,
    PathTraversal,
}

/// Intent categories, used for expected-status selection and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Functional,
    Structure,
    Type,
    Constraint,
    Resource,
    Robustness,
    Security,
}

impl IntentKind {
    /// All catalog entries, in catalog order.
    pub const ALL: &'static [IntentKind] = &[
        IntentKind::HappyPath,
        IntentKind::RequiredFieldMissing,
        IntentKind::RequiredArgMissing,
        IntentKind::NullNotAllowed,
        IntentKind::TypeViolation,
        IntentKind::UnexpectedArgument,
        IntentKind::UnionNoMatch,
        IntentKind::ResourceNotFound,
        IntentKind::FormatInvalidPathParam,
        IntentKind::HeaderMissing,
        IntentKind::HeaderEnumMismatch,
        IntentKind::EnumMismatch,
        IntentKind::StringTooShort,
        IntentKind::StringTooLong,
        IntentKind::PatternMismatch,
        IntentKind::FormatInvalid,
        IntentKind::NumberTooSmall,
        IntentKind::NumberTooLarge,
        IntentKind::NotMultipleOf,
        IntentKind::BoundaryMinMinusOne,
        IntentKind::BoundaryMaxPlusOne,
        IntentKind::BoundaryMinLengthMinusOne,
        IntentKind::BoundaryMaxLengthPlusOne,
        IntentKind::BoundaryMinItemsMinusOne,
        IntentKind::BoundaryMaxItemsPlusOne,
        IntentKind::ArrayTooShort,
        IntentKind::ArrayTooLong,
        IntentKind::ArrayNotUnique,
        IntentKind::ArrayItemTypeViolation,
        IntentKind::AdditionalPropertyNotAllowed,
        IntentKind::ObjectValueTypeViolation,
        IntentKind::EmptyString,
        IntentKind::WhitespaceOnly,
        IntentKind::SqlInjection,
        IntentKind::XssInjection,
        IntentKind::CommandInjection,
        IntentKind::HeaderInjection,
        IntentKind::PathTraversal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::HappyPath => "HAPPY_PATH",
            IntentKind::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            IntentKind::RequiredArgMissing => "REQUIRED_ARG_MISSING",
            IntentKind::NullNotAllowed => "NULL_NOT_ALLOWED",
            IntentKind::TypeViolation => "TYPE_VIOLATION",
            IntentKind::UnexpectedArgument => "UNEXPECTED_ARGUMENT",
            IntentKind::UnionNoMatch => "UNION_NO_MATCH",
            IntentKind::ResourceNotFound => "RESOURCE_NOT_FOUND",
            IntentKind::FormatInvalidPathParam => "FORMAT_INVALID_PATH_PARAM",
            IntentKind::HeaderMissing => "HEADER_MISSING",
            IntentKind::HeaderEnumMismatch => "HEADER_ENUM_MISMATCH",
            IntentKind::EnumMismatch => "ENUM_MISMATCH",
            IntentKind::StringTooShort => "STRING_TOO_SHORT",
            IntentKind::StringTooLong => "STRING_TOO_LONG",
            IntentKind::PatternMismatch => "PATTERN_MISMATCH",
            IntentKind::FormatInvalid => "FORMAT_INVALID",
            IntentKind::NumberTooSmall => "NUMBER_TOO_SMALL",
            IntentKind::NumberTooLarge => "NUMBER_TOO_LARGE",
            IntentKind::NotMultipleOf => "NOT_MULTIPLE_OF",
            IntentKind::BoundaryMinMinusOne => "BOUNDARY_MIN_MINUS_ONE",
            IntentKind::BoundaryMaxPlusOne => "BOUNDARY_MAX_PLUS_ONE",
            IntentKind::BoundaryMinLengthMinusOne => "BOUNDARY_MIN_LENGTH_MINUS_ONE",
            IntentKind::BoundaryMaxLengthPlusOne => "BOUNDARY_MAX_LENGTH_PLUS_ONE",
            IntentKind::BoundaryMinItemsMinusOne => "BOUNDARY_MIN_ITEMS_MINUS_ONE",
            IntentKind::BoundaryMaxItemsPlusOne => "BOUNDARY_MAX_ITEMS_PLUS_ONE",
            IntentKind::ArrayTooShort => "ARRAY_TOO_SHORT",
            IntentKind::ArrayTooLong => "ARRAY_TOO_LONG",
            IntentKind::ArrayNotUnique => "ARRAY_NOT_UNIQUE",
            IntentKind::ArrayItemTypeViolation => "ARRAY_ITEM_TYPE_VIOLATION",
            IntentKind::AdditionalPropertyNotAllowed => "ADDITIONAL_PROPERTY_NOT_ALLOWED",
            IntentKind::ObjectValueTypeViolation => "OBJECT_VALUE_TYPE_VIOLATION",
            IntentKind::EmptyString => "EMPTY_STRING",
            IntentKind::WhitespaceOnly => "WHITESPACE_ONLY",
            IntentKind::SqlInjection => "SQL_INJECTION",
            IntentKind::XssInjection => "XSS_INJECTION",
            IntentKind::CommandInjection => "COMMAND_INJECTION",
            IntentKind::HeaderInjection => "HEADER_INJECTION",
            IntentKind::PathTraversal => "PATH_TRAVERSAL",
        }
    }

    /// The category an intent belongs to.
    pub fn category(&self) -> IntentCategory {
        use IntentKind::*;
        match self {
            HappyPath => IntentCategory::Functional,
            RequiredFieldMissing | RequiredArgMissing | UnexpectedArgument
            | AdditionalPropertyNotAllowed | HeaderMissing => IntentCategory::Structure,
            TypeViolation | NullNotAllowed | ArrayItemTypeViolation | ObjectValueTypeViolation
            | UnionNoMatch => IntentCategory::Type,
            EnumMismatch | StringTooShort | StringTooLong | PatternMismatch | FormatInvalid
            | FormatInvalidPathParam | NumberTooSmall | NumberTooLarge | NotMultipleOf
            | BoundaryMinMinusOne | BoundaryMaxPlusOne | BoundaryMinLengthMinusOne
            | BoundaryMaxLengthPlusOne | BoundaryMinItemsMinusOne | BoundaryMaxItemsPlusOne
            | ArrayTooShort | ArrayTooLong | ArrayNotUnique | HeaderEnumMismatch => {
                IntentCategory::Constraint
            }
            ResourceNotFound => IntentCategory::Resource,
            EmptyString | WhitespaceOnly => IntentCategory::Robustness,
            SqlInjection | XssInjection | CommandInjection | HeaderInjection | PathTraversal => {
                IntentCategory::Security
            }
        }
    }

    /// Intents that target a request header.
    pub fn is_header_intent(&self) -> bool {
        matches!(
            self,
            IntentKind::HeaderMissing | IntentKind::HeaderEnumMismatch | IntentKind::HeaderInjection
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or(())
    }
}
