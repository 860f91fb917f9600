// F-string lowering: measure with snprintf(NULL, 0, ...), malloc,
// format, track the buffer in the string pool, yield the pointer.

use btrc_ast::{Expr, ExprKind, FStringPart};

use super::expressions::lower_expr;
use super::statements::quick_text;
use super::types::format_spec_for_type;
use super::IrGenerator;
use crate::ir::IrExpr;

/// See STRINGY_METHODS in calls.rs — same heuristic for untyped
/// interpolations.
const STRINGY_METHODS: &[&str] = &[
    "toString", "str", "trim", "toUpper", "toLower", "substring", "replace", "repeat", "reverse",
    "capitalize", "join", "split",
];

pub fn lower_fstring(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::FString { parts } = &node.kind else {
        return IrExpr::lit("\"\"");
    };
    gen.use_helper("__btrc_str_track");

    let mut fmt_parts = Vec::new();
    let mut args: Vec<IrExpr> = Vec::new();

    for part in parts {
        match part {
            FStringPart::Text(text) => {
                // Escape for a printf format string.
                let escaped = text
                    .replace('\\', "\\\\")
                    .replace('%', "%%")
                    .replace('"', "\\\"")
                    .replace('\n', "\\n")
                    .replace('\t', "\\t");
                fmt_parts.push(escaped);
            }
            FStringPart::Expr(e) => {
                let arg_type = gen.node_type(e.id);
                let mut ir_arg = lower_expr(gen, e);
                let mut fmt = format_spec_for_type(arg_type.as_ref());

                if arg_type.is_none() {
                    match &e.kind {
                        ExprKind::StringLiteral { .. } | ExprKind::FString { .. } => fmt = "%s",
                        ExprKind::Call { callee, .. } => {
                            if let ExprKind::FieldAccess { field, .. } = &callee.kind {
                                if STRINGY_METHODS.contains(&field.as_str()) {
                                    fmt = "%s";
                                }
                            }
                        }
                        _ => {}
                    }
                }

                if arg_type.as_ref().is_some_and(|t| t.base == "bool") {
                    ir_arg = IrExpr::Ternary {
                        condition: Box::new(ir_arg),
                        true_expr: Box::new(IrExpr::lit("\"true\"")),
                        false_expr: Box::new(IrExpr::lit("\"false\"")),
                    };
                    fmt = "%s";
                }

                fmt_parts.push(fmt.to_string());
                args.push(ir_arg);
            }
        }
    }

    let fmt_str = fmt_parts.join("");

    // No interpolations → plain string literal.
    if args.is_empty() {
        return IrExpr::lit(format!("\"{}\"", fmt_str));
    }

    let tmp = gen.fresh_temp("__fstr");
    let len_var = format!("{}_len", tmp);
    let buf_var = format!("{}_buf", tmp);
    let args_text: Vec<String> = args.iter().map(quick_text).collect();
    let args_text = args_text.join(", ");

    IrExpr::raw(format!(
        "({{ int {len} = snprintf(NULL, 0, \"{fmt}\", {args}); \
         char* {buf} = __btrc_str_track((char*)malloc({len} + 1)); \
         snprintf({buf}, {len} + 1, \"{fmt}\", {args}); {buf}; }})",
        len = len_var,
        buf = buf_var,
        fmt = fmt_str,
        args = args_text,
    ))
}
