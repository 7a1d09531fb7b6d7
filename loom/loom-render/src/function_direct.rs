//! Direct function-call test renderer (pytest unit tests).

use crate::common::{banner, py_literal, sanitize_ident};
use crate::RenderError;
use loom_payload::Payload;
use loom_core::{Operation, OperationKind, Schema};

pub fn render(op: &Operation, payloads: &[Payload]) -> Result<String, RenderError> {
    let OperationKind::Function {
        is_async,
        module_hint,
    } = &op.kind
    else {
        return Err(RenderError::UnsupportedSchema {
            operation_id: op.id.clone(),
            detail: "HTTP operation given to the function renderer".to_string(),
        });
    };

    for payload in payloads {
        if !payload.body.is_object() {
            return Err(RenderError::UnsupportedSchema {
                operation_id: op.id.clone(),
                detail: "function call payload is not a keyword-argument object".to_string(),
            });
        }
    }

    let fn_name = sanitize_ident(&op.id);
    let module = module_hint.as_deref().unwrap_or("module_under_test");
    let enum_args = enum_typed_arguments(op);

    let mut out = String::new();
    out.push_str(&banner("#"));
    out.push_str("import pytest\n");
    if *is_async {
        out.push_str("import asyncio\n");
    }
    let mut imports = vec![op.id.clone()];
    imports.extend(enum_args.iter().map(|(_, ty)| ty.clone()));
    imports.dedup();
    out.push_str(&format!("from {} import {}\n\n", module, imports.join(", ")));

    if !enum_args.is_empty() {
        // Happy-path cases convert raw enum strings to the declared enum
        // type at call time; negative cases pass the raw value through.
        out.push_str("ENUM_ARGS = {\n");
        for (arg, ty) in &enum_args {
            out.push_str(&format!("    \"{}\": {},\n", arg, ty));
        }
        out.push_str("}\n\n");
    }

    out.push_str("\n@pytest.mark.parametrize(\n");
    out.push_str("    \"intent, kwargs, expected_status\",\n    [\n");
    for (i, payload) in payloads.iter().enumerate() {
        out.push_str("        pytest.param(\n");
        out.push_str(&format!("            \"{}\",\n", payload.intent.as_str()));
        out.push_str(&format!("            {},\n", py_literal(&payload.body)));
        out.push_str(&format!("            {},\n", payload.expected_status));
        out.push_str(&format!(
            "            id=\"{:02}_{}\",\n",
            i,
            payload.intent.as_str()
        ));
        out.push_str("        ),\n");
    }
    out.push_str("    ],\n)\n");

    out.push_str(&format!(
        "def test_{}(intent, kwargs, expected_status):\n",
        fn_name
    ));
    let call = if *is_async {
        format!("asyncio.run({}(**call_kwargs))", op.id)
    } else {
        format!("{}(**call_kwargs)", op.id)
    };
    out.push_str("    if expected_status == 200:\n");
    out.push_str("        call_kwargs = dict(kwargs)\n");
    if !enum_args.is_empty() {
        out.push_str("        for name, enum_type in ENUM_ARGS.items():\n");
        out.push_str("            if name in call_kwargs and isinstance(call_kwargs[name], str):\n");
        out.push_str("                call_kwargs[name] = enum_type(call_kwargs[name])\n");
    }
    out.push_str(&format!("        {}\n", call));
    out.push_str("    else:\n");
    out.push_str("        call_kwargs = dict(kwargs)\n");
    out.push_str("        with pytest.raises((TypeError, ValueError)):\n");
    out.push_str(&format!("            {}\n", call));

    Ok(out)
}

/// Top-level arguments whose schema is a named enum.
fn enum_typed_arguments(op: &Operation) -> Vec<(String, String)> {
    let Some(Schema::Object(obj)) = op.body_schema() else {
        return Vec::new();
    };
    obj.properties
        .iter()
        .filter_map(|(name, schema)| match schema {
            Schema::Enum(e) => e
                .named_type
                .as_ref()
                .map(|ty| (name.clone(), ty.clone())),
            _ => None,
        })
        .collect()
}
