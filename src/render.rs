//! Pydantic rendering boundary.
//!
//! The engine speaks neutral type names (`string`, `integer`, `list<A | B>`,
//! class names); this module is the one place that knows Python spelling.
//! Swapping the target schema library means swapping this module.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::infer::def::{Definition, INDENT};

static PRIMITIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(string|integer|float|boolean|null)\b").expect("static regex"));

/// Rewrite a neutral type expression into Python typing syntax.
///
/// Primitive tokens are substituted word-wise (class names are capitalized,
/// so they never collide with the lowercase primitives), then the generic
/// brackets are swapped: `list<BType | string>` becomes `list[BType | str]`.
pub fn python_type(expr: &str) -> String {
    let mapped = PRIMITIVE.replace_all(expr, |caps: &regex::Captures<'_>| match &caps[1] {
        "string" => "str",
        "integer" => "int",
        "boolean" => "bool",
        "null" => "None",
        _ => "float",
    });
    mapped.replace('<', "[").replace('>', "]")
}

/// Render a full module: import prelude plus one class per definition, in
/// emission order, separated by two blank lines.
pub fn render_module(defs: &[Definition]) -> String {
    if defs.is_empty() {
        return String::new();
    }
    let prelude = if defs.iter().any(Definition::uses_alias) {
        "from pydantic import BaseModel, Field"
    } else {
        "from pydantic import BaseModel"
    };
    let blocks: Vec<String> = defs.iter().map(render_class).collect();
    format!("{prelude}\n\n\n{}\n", blocks.join("\n\n\n"))
}

fn render_class(def: &Definition) -> String {
    let mut lines = vec![format!("class {}(BaseModel):", def.name)];
    if def.lines.is_empty() {
        lines.push(format!("{INDENT}pass"));
    }
    for field in &def.lines {
        let ty = python_type(&field.type_name);
        match &field.alias {
            Some(orig) => lines.push(format!(
                "{INDENT}{}: {ty} = Field(alias=\"{orig}\")",
                field.ident
            )),
            None => lines.push(format!("{INDENT}{}: {ty}", field.ident)),
        }
    }
    lines.join("\n")
}
