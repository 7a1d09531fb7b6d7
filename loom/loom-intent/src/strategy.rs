//! Dialect-aware intent generation.
//!
//! Produces the total, stable intent order for one operation:
//! happy path first, then required-field removals in declaration order
//! (depth-first through nested objects), then the per-property constraint
//! block, then dialect-specific parameter passes, then security fuzzing.
//! The order is part of the external contract: downstream payloads and
//! rendered test cases inherit it verbatim.

use crate::{Intent, IntentCategory, IntentKind, IntentSelection, TargetPath};
use loom_core::{ObjectSchema, Operation, Schema, SourceDialect, StringConstraints};
use std::collections::HashSet;

/// Generate the ordered intent list for one operation.
pub fn generate_intents(
    op: &Operation,
    dialect: SourceDialect,
    selection: &IntentSelection,
) -> Vec<Intent> {
    let mut gen = Generator {
        op,
        dialect,
        selection,
        intents: Vec::new(),
        seen: HashSet::new(),
    };
    gen.run();
    gen.intents
}

struct Generator<'a> {
    op: &'a Operation,
    dialect: SourceDialect,
    selection: &'a IntentSelection,
    intents: Vec<Intent>,
    seen: HashSet<(IntentKind, String)>,
}

impl<'a> Generator<'a> {
    fn run(&mut self) {
        self.emit(
            IntentKind::HappyPath,
            TargetPath::body_root(),
            None,
            None,
            "Valid request",
        );

        let body = self.op.body_schema().and_then(Schema::as_object).cloned();

        if let Some(obj) = &body {
            self.required_pass(obj, &[]);
            self.property_pass(obj, &[]);
            self.root_structure(obj);
        }

        if self.dialect == SourceDialect::HttpContract {
            self.query_pass();
            self.header_pass();
            self.path_pass();
        }

        if let Some(obj) = &body {
            self.security_pass(obj, &[]);
        }
    }

    // ==================== Passes ====================

    /// One removal intent per required property, declaration order,
    /// depth-first through nested objects.
    fn required_pass(&mut self, obj: &ObjectSchema, base: &[String]) {
        for (name, schema) in &obj.properties {
            let path = child_path(base, name);
            if obj.is_required(name) {
                let kind = self.required_kind(base.is_empty());
                self.emit(
                    kind,
                    TargetPath::Body(path.clone()),
                    Some(name.clone()),
                    None,
                    "",
                );
            }
            if let Schema::Object(child) = schema {
                self.required_pass(child, &path);
            }
        }
    }

    fn required_kind(&self, top_level: bool) -> IntentKind {
        match self.dialect {
            SourceDialect::HttpContract => IntentKind::RequiredFieldMissing,
            // Removing a top-level argument violates the call contract;
            // removing a nested field violates the value's schema.
            _ if top_level => IntentKind::RequiredArgMissing,
            _ => IntentKind::RequiredFieldMissing,
        }
    }

    /// The per-property constraint block, declaration order, depth-first.
    fn property_pass(&mut self, obj: &ObjectSchema, base: &[String]) {
        for (name, schema) in &obj.properties {
            let path = child_path(base, name);
            self.property_intents(name, schema, &path);

            match schema {
                Schema::Object(child) => self.property_pass(child, &path),
                Schema::Array { items, .. } => {
                    if let Schema::Object(child) = items.as_ref() {
                        let item_path = array_item_path(base, name);
                        self.property_pass(child, &item_path);
                    }
                }
                _ => {}
            }
        }
    }

    fn property_intents(&mut self, name: &str, schema: &Schema, path: &[String]) {
        let target = || TargetPath::Body(path.to_vec());
        let field = || Some(name.to_string());

        self.emit(IntentKind::TypeViolation, target(), field(), None, "");
        if !schema.nullable() {
            self.emit(IntentKind::NullNotAllowed, target(), field(), None, "");
        }

        match schema {
            Schema::String(c) => self.string_intents(name, c, path),
            Schema::Integer(c) | Schema::Number(c) => {
                if let Some(min) = c.lower_bound() {
                    self.emit(
                        IntentKind::BoundaryMinMinusOne,
                        target(),
                        field(),
                        None,
                        format!("Boundary: {} - 1", min),
                    );
                }
                if let Some(max) = c.upper_bound() {
                    self.emit(
                        IntentKind::BoundaryMaxPlusOne,
                        target(),
                        field(),
                        None,
                        format!("Boundary: {} + 1", max),
                    );
                }
                if let Some(m) = c.multiple_of {
                    self.emit(
                        IntentKind::NotMultipleOf,
                        target(),
                        field(),
                        None,
                        format!("Multiple of: {}", m),
                    );
                }
            }
            Schema::Enum(e) => {
                self.emit(
                    IntentKind::EnumMismatch,
                    target(),
                    field(),
                    None,
                    format!("Value not in enum of {} members", e.values.len()),
                );
            }
            Schema::Array { constraints, .. } => {
                if constraints.min_items.unwrap_or(0) > 0 {
                    self.emit(
                        IntentKind::BoundaryMinItemsMinusOne,
                        target(),
                        field(),
                        None,
                        format!("Items: {} - 1", constraints.min_items.unwrap_or(0)),
                    );
                }
                if constraints.max_items.unwrap_or(0) > 0 {
                    self.emit(
                        IntentKind::BoundaryMaxItemsPlusOne,
                        target(),
                        field(),
                        None,
                        format!("Items: {} + 1", constraints.max_items.unwrap_or(0)),
                    );
                }
                if constraints.unique_items {
                    self.emit(IntentKind::ArrayNotUnique, target(), field(), None, "");
                }
                self.emit(IntentKind::ArrayItemTypeViolation, target(), field(), None, "");
            }
            Schema::Union { variants } => {
                // A one-variant union collapses to that variant upstream;
                // nothing to mismatch against.
                if variants.len() > 1 {
                    self.emit(IntentKind::UnionNoMatch, target(), field(), None, "");
                }
            }
            Schema::Object(o) => {
                if !o.additional_allowed {
                    self.emit(
                        IntentKind::AdditionalPropertyNotAllowed,
                        target(),
                        field(),
                        None,
                        "",
                    );
                }
            }
            _ => {}
        }
    }

    fn string_intents(&mut self, name: &str, c: &StringConstraints, path: &[String]) {
        let target = || TargetPath::Body(path.to_vec());
        let field = || Some(name.to_string());

        if let Some(format) = &c.format {
            self.emit(
                IntentKind::FormatInvalid,
                target(),
                field(),
                None,
                format!("Format: {}", format.as_str()),
            );
        }
        if let Some(pattern) = &c.pattern {
            self.emit(
                IntentKind::PatternMismatch,
                target(),
                field(),
                None,
                format!("Pattern: {}", pattern),
            );
        }
        if c.min_len.unwrap_or(0) > 0 {
            self.emit(
                IntentKind::BoundaryMinLengthMinusOne,
                target(),
                field(),
                None,
                format!("Len: {} - 1", c.min_len.unwrap_or(0)),
            );
        }
        if let Some(max) = c.max_len {
            self.emit(
                IntentKind::BoundaryMaxLengthPlusOne,
                target(),
                field(),
                None,
                format!("Len: {} + 1", max),
            );
        }
        if c.min_len.unwrap_or(0) > 0 {
            self.emit(IntentKind::EmptyString, target(), field(), None, "");
        }
        if c.is_free_text() {
            self.emit(IntentKind::WhitespaceOnly, target(), field(), None, "");
        }
    }

    /// Root-level structural limits on the body object.
    fn root_structure(&mut self, obj: &ObjectSchema) {
        if obj.additional_allowed {
            return;
        }
        match self.dialect {
            SourceDialect::HttpContract => {
                self.emit(
                    IntentKind::AdditionalPropertyNotAllowed,
                    TargetPath::body_root(),
                    None,
                    None,
                    "",
                );
            }
            _ => {
                self.emit(
                    IntentKind::UnexpectedArgument,
                    TargetPath::body_root(),
                    None,
                    None,
                    "",
                );
            }
        }
    }

    fn query_pass(&mut self) {
        let params = self.op.query_params.clone();
        for param in &params {
            if param.required {
                self.emit(
                    IntentKind::RequiredFieldMissing,
                    TargetPath::QueryParam(param.name.clone()),
                    Some(param.name.clone()),
                    None,
                    "",
                );
            }
            // A plain string query value cannot violate its own type; only
            // typed and enumerated parameters can.
            let type_testable = matches!(
                param.schema,
                Schema::Integer(_) | Schema::Number(_) | Schema::Boolean | Schema::Enum(_)
            );
            if type_testable {
                self.emit(
                    IntentKind::TypeViolation,
                    TargetPath::QueryParam(param.name.clone()),
                    Some(param.name.clone()),
                    None,
                    "",
                );
            }
        }
    }

    fn header_pass(&mut self) {
        let headers = self.op.headers.clone();
        for header in &headers {
            let target = || TargetPath::Header(header.name.clone());
            if header.required {
                self.emit(
                    IntentKind::HeaderMissing,
                    target(),
                    Some(header.name.clone()),
                    None,
                    "",
                );
            }
            match &header.schema {
                Schema::Enum(_) => {
                    self.emit(
                        IntentKind::HeaderEnumMismatch,
                        target(),
                        Some(header.name.clone()),
                        None,
                        "",
                    );
                }
                Schema::String(_) => {
                    self.emit(
                        IntentKind::HeaderInjection,
                        target(),
                        Some(header.name.clone()),
                        None,
                        "CRLF injection",
                    );
                }
                _ => {}
            }
        }
    }

    fn path_pass(&mut self) {
        let params = self.op.path_params.clone();
        for param in &params {
            if param.required {
                self.emit(
                    IntentKind::ResourceNotFound,
                    TargetPath::PathParam(param.name.clone()),
                    Some(param.name.clone()),
                    None,
                    "Valid format, nonexistent resource",
                );
            }
            if let Schema::String(c) = &param.schema {
                if c.format.is_some() {
                    self.emit(
                        IntentKind::FormatInvalidPathParam,
                        TargetPath::PathParam(param.name.clone()),
                        Some(param.name.clone()),
                        None,
                        "Invalid format",
                    );
                }
            }
        }
    }

    /// Security fuzzing on free-text strings, after everything else.
    fn security_pass(&mut self, obj: &ObjectSchema, base: &[String]) {
        for (name, schema) in &obj.properties {
            let path = child_path(base, name);
            if let Schema::String(c) = schema {
                if security_applicable(c) {
                    for kind in [
                        IntentKind::SqlInjection,
                        IntentKind::XssInjection,
                        IntentKind::CommandInjection,
                    ] {
                        self.emit(
                            kind,
                            TargetPath::Body(path.clone()),
                            Some(name.clone()),
                            None,
                            "",
                        );
                    }
                }
            }
            if let Schema::Object(child) = schema {
                self.security_pass(child, &path);
            }
        }
    }

    // ==================== Emission ====================

    fn emit(
        &mut self,
        kind: IntentKind,
        target: TargetPath,
        field: Option<String>,
        expected: Option<u16>,
        description: impl Into<String>,
    ) {
        if !self.selection.allows(kind) {
            return;
        }
        // Deduplicate by (intent, target); the first emission wins.
        if !self.seen.insert((kind, target.to_string())) {
            return;
        }
        let expected_status = expected.unwrap_or_else(|| self.expected_status(kind));
        self.intents.push(Intent {
            operation_id: self.op.id.clone(),
            intent: kind,
            category: kind.category(),
            target,
            field,
            expected_status,
            description: description.into(),
        });
    }

    /// Deterministic expected-status selection.
    fn expected_status(&self, kind: IntentKind) -> u16 {
        if kind == IntentKind::HappyPath {
            return self.op.first_success_status();
        }

        match self.dialect {
            SourceDialect::HttpContract => {
                if kind.category() == IntentCategory::Resource {
                    return 404;
                }
                if kind.is_header_intent() {
                    return 400;
                }
                // First declared validation error; 404 is a resource
                // semantic, never a validation one.
                if let Some(status) = self
                    .op
                    .errors
                    .iter()
                    .map(|r| r.status)
                    .find(|s| (400..=422).contains(s) && *s != 404)
                {
                    return status;
                }
                if !self.op.errors.is_empty() {
                    return 400;
                }
                422
            }
            // The function dialects use the synthetic convention of the
            // source runtimes: contract breaches raise a type error (400),
            // value constraint breaches a value error (422).
            _ => match kind.category() {
                IntentCategory::Structure => 400,
                _ => 422,
            },
        }
    }
}

fn child_path(base: &[String], name: &str) -> Vec<String> {
    let mut path = base.to_vec();
    path.push(name.to_string());
    path
}

fn array_item_path(base: &[String], name: &str) -> Vec<String> {
    let mut path = base.to_vec();
    path.push(format!("{}[]", name));
    path
}

/// Whether injection fuzzing is meaningful for a string: open enough to
/// accept the payload, with no strict format or pattern gate in front.
fn security_applicable(c: &StringConstraints) -> bool {
    if c.pattern.is_some() {
        return false;
    }
    if let Some(format) = &c.format {
        if format.is_strict() {
            return false;
        }
    }
    c.max_len.map_or(true, |max| max >= 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::{
        HttpMethod, NumberConstraints, ObjectConstraints, OperationKind, Parameter, Response,
        StringFormat,
    };

    fn user_post_operation() -> Operation {
        Operation {
            id: "create_user".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Post,
                path: "/users".into(),
            },
            path_params: vec![],
            query_params: vec![],
            headers: vec![],
            body: Some(Parameter::new(
                "body",
                true,
                Schema::Object(ObjectSchema {
                    properties: vec![
                        (
                            "email".into(),
                            Schema::String(StringConstraints {
                                max_len: Some(255),
                                format: Some(StringFormat::Email),
                                ..Default::default()
                            }),
                        ),
                        (
                            "age".into(),
                            Schema::Integer(NumberConstraints {
                                min: Some(0.0),
                                max: Some(150.0),
                                ..Default::default()
                            }),
                        ),
                    ],
                    required: vec!["email".into(), "age".into()],
                    additional_allowed: true,
                    constraints: ObjectConstraints::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(201, None)],
            errors: vec![Response::new(422, None)],
            description: String::new(),
            metadata: Default::default(),
        }
    }

    /// The exact order contract for a POST with a string and an int field.
    #[test]
    fn test_http_post_intent_order() {
        let op = user_post_operation();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());

        let got: Vec<(IntentKind, String)> = intents
            .iter()
            .map(|i| (i.intent, i.target.to_string()))
            .collect();

        let expected = vec![
            (IntentKind::HappyPath, "body".to_string()),
            (IntentKind::RequiredFieldMissing, "body.email".to_string()),
            (IntentKind::RequiredFieldMissing, "body.age".to_string()),
            (IntentKind::TypeViolation, "body.email".to_string()),
            (IntentKind::NullNotAllowed, "body.email".to_string()),
            (IntentKind::FormatInvalid, "body.email".to_string()),
            (IntentKind::BoundaryMaxLengthPlusOne, "body.email".to_string()),
            (IntentKind::TypeViolation, "body.age".to_string()),
            (IntentKind::NullNotAllowed, "body.age".to_string()),
            (IntentKind::BoundaryMinMinusOne, "body.age".to_string()),
            (IntentKind::BoundaryMaxPlusOne, "body.age".to_string()),
            (IntentKind::SqlInjection, "body.email".to_string()),
            (IntentKind::XssInjection, "body.email".to_string()),
            (IntentKind::CommandInjection, "body.email".to_string()),
        ];
        assert_eq!(got, expected);

        assert_eq!(intents[0].expected_status, 201);
        // Declared 422 drives every validation expectation.
        assert!(intents[1..].iter().all(|i| i.expected_status == 422));
    }

    #[test]
    fn test_http_get_with_path_param() {
        let op = Operation {
            id: "get_user".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Get,
                path: "/users/{user_id}".into(),
            },
            path_params: vec![Parameter::new(
                "user_id",
                true,
                Schema::String(StringConstraints {
                    format: Some(StringFormat::Uuid),
                    ..Default::default()
                }),
            )],
            query_params: vec![],
            headers: vec![],
            body: None,
            successes: vec![Response::new(200, None)],
            errors: vec![Response::new(404, None)],
            description: String::new(),
            metadata: Default::default(),
        };

        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let kinds: Vec<IntentKind> = intents.iter().map(|i| i.intent).collect();
        assert_eq!(
            kinds,
            vec![
                IntentKind::HappyPath,
                IntentKind::ResourceNotFound,
                IntentKind::FormatInvalidPathParam,
            ]
        );
        assert_eq!(intents[0].expected_status, 200);
        assert_eq!(intents[1].expected_status, 404);
        // Only 404 is declared, which is not a validation status.
        assert_eq!(intents[2].expected_status, 400);
    }

    #[test]
    fn test_function_enum_mismatch() {
        let op = Operation {
            id: "create_user".into(),
            kind: OperationKind::Function {
                is_async: false,
                module_hint: None,
            },
            path_params: vec![],
            query_params: vec![],
            headers: vec![],
            body: Some(Parameter::new(
                "body",
                true,
                Schema::Object(ObjectSchema {
                    properties: vec![
                        ("name".into(), Schema::string()),
                        (
                            "status".into(),
                            Schema::Enum(loom_core::EnumSchema {
                                values: vec![
                                    serde_json::json!("Active"),
                                    serde_json::json!("Inactive"),
                                    serde_json::json!("Pending"),
                                ],
                                base_type: loom_core::EnumBase::Str,
                                named_type: Some("Status".into()),
                            }),
                        ),
                    ],
                    required: vec!["name".into()],
                    additional_allowed: false,
                    constraints: ObjectConstraints::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(200, None)],
            errors: vec![],
            description: String::new(),
            metadata: Default::default(),
        };

        let intents = generate_intents(&op, SourceDialect::DynamicSource, &IntentSelection::all());

        let enum_intent = intents
            .iter()
            .find(|i| i.intent == IntentKind::EnumMismatch)
            .expect("enum mismatch present");
        assert_eq!(enum_intent.target.to_string(), "body.status");
        assert_eq!(enum_intent.expected_status, 422);

        // Top-level removal is the argument contract, not a field schema.
        let required = intents
            .iter()
            .find(|i| i.intent == IntentKind::RequiredArgMissing)
            .expect("required arg intent present");
        assert_eq!(required.field.as_deref(), Some("name"));
        assert_eq!(required.expected_status, 400);

        // The synthetic body is closed.
        assert!(intents
            .iter()
            .any(|i| i.intent == IntentKind::UnexpectedArgument));
    }

    #[test]
    fn test_empty_selection_still_yields_happy_path() {
        let op = user_post_operation();
        let empty: [&str; 0] = [];
        let sel = IntentSelection::from_names(&empty).unwrap();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &sel);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].intent, IntentKind::HappyPath);
    }

    #[test]
    fn test_no_required_fields_no_removals() {
        let mut op = user_post_operation();
        if let Some(p) = &mut op.body {
            if let Schema::Object(o) = &mut p.schema {
                o.required.clear();
            }
        }
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        assert!(intents
            .iter()
            .all(|i| i.intent != IntentKind::RequiredFieldMissing));
        assert!(intents.iter().any(|i| i.intent == IntentKind::TypeViolation));
    }

    #[test]
    fn test_zero_item_bounds_trigger_nothing() {
        let op = Operation {
            id: "op".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Post,
                path: "/x".into(),
            },
            path_params: vec![],
            query_params: vec![],
            headers: vec![],
            body: Some(Parameter::new(
                "body",
                true,
                Schema::Object(ObjectSchema {
                    properties: vec![(
                        "tags".into(),
                        Schema::Array {
                            items: Box::new(Schema::string()),
                            constraints: loom_core::ArrayConstraints {
                                min_items: Some(0),
                                max_items: Some(0),
                                unique_items: false,
                            },
                        },
                    )],
                    required: vec![],
                    additional_allowed: true,
                    constraints: ObjectConstraints::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(200, None)],
            errors: vec![],
            description: String::new(),
            metadata: Default::default(),
        };

        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        assert!(intents.iter().all(|i| {
            i.intent != IntentKind::BoundaryMinItemsMinusOne
                && i.intent != IntentKind::BoundaryMaxItemsPlusOne
        }));
    }

    #[test]
    fn test_single_variant_union_collapses() {
        let op = Operation {
            id: "op".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Post,
                path: "/x".into(),
            },
            path_params: vec![],
            query_params: vec![],
            headers: vec![],
            body: Some(Parameter::new(
                "body",
                true,
                Schema::Object(ObjectSchema {
                    properties: vec![(
                        "v".into(),
                        Schema::Union {
                            variants: vec![Schema::string()],
                        },
                    )],
                    required: vec![],
                    additional_allowed: true,
                    constraints: ObjectConstraints::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(200, None)],
            errors: vec![],
            description: String::new(),
            metadata: Default::default(),
        };

        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        assert!(intents.iter().all(|i| i.intent != IntentKind::UnionNoMatch));
    }

    #[test]
    fn test_strict_format_skips_security() {
        let mut op = user_post_operation();
        if let Some(p) = &mut op.body {
            if let Schema::Object(o) = &mut p.schema {
                o.properties[0].1 = Schema::String(StringConstraints {
                    format: Some(StringFormat::Uuid),
                    ..Default::default()
                });
            }
        }
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        assert!(intents.iter().all(|i| i.intent != IntentKind::SqlInjection));
    }
}
