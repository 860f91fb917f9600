// Expression lowering: AST expr → IrExpr. Dispatch lives here; the
// operator/call/field/collection specifics live in sibling modules.

use btrc_ast::*;

use super::{calls, classes, collections, fields, fstrings, lambdas, operators, threads};
use super::IrGenerator;
use crate::ir::IrExpr;

pub fn lower_expr(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    match &node.kind {
        ExprKind::IntLiteral { raw } => {
            // btrc octal 0o17 → C octal 017
            if let Some(rest) = raw.strip_prefix("0o").or_else(|| raw.strip_prefix("0O")) {
                IrExpr::lit(format!("0{}", rest))
            } else {
                IrExpr::lit(raw.clone())
            }
        }
        ExprKind::FloatLiteral { raw } => IrExpr::lit(raw.clone()),
        // Parser keeps the quotes; C shares the literal syntax.
        ExprKind::StringLiteral { raw } => IrExpr::lit(raw.clone()),
        ExprKind::CharLiteral { raw } => IrExpr::lit(raw.clone()),
        ExprKind::BoolLiteral { value } => IrExpr::lit(if *value { "true" } else { "false" }),
        ExprKind::NullLiteral => IrExpr::lit("NULL"),
        ExprKind::Identifier { name } => lower_identifier(gen, name),
        ExprKind::SelfExpr | ExprKind::SuperExpr => IrExpr::var("self"),
        ExprKind::Binary { .. } => operators::lower_binary(gen, node),
        ExprKind::Unary { .. } => operators::lower_unary(gen, node),
        ExprKind::Call { .. } => calls::lower_call(gen, node),
        ExprKind::FieldAccess { .. } => fields::lower_field_access(gen, node),
        ExprKind::Index { .. } => fields::lower_index(gen, node),
        ExprKind::Assign { .. } => fields::lower_assign(gen, node),
        ExprKind::Cast { target_type, expr } => {
            let c = gen.ctype(Some(target_type));
            IrExpr::cast(c, lower_expr(gen, expr))
        }
        ExprKind::Sizeof(operand) => match operand {
            SizeofOperand::Type(t) => {
                let c = gen.ctype(Some(t));
                IrExpr::Sizeof(c)
            }
            SizeofOperand::Expr(e) => {
                let inner = lower_expr(gen, e);
                IrExpr::Sizeof(super::statements::quick_text(&inner))
            }
        },
        ExprKind::Ternary {
            condition,
            true_expr,
            false_expr,
        } => IrExpr::Ternary {
            condition: Box::new(lower_expr(gen, condition)),
            true_expr: Box::new(lower_expr(gen, true_expr)),
            false_expr: Box::new(lower_expr(gen, false_expr)),
        },
        ExprKind::New { .. } => classes::lower_new_expr(gen, node),
        ExprKind::ListLiteral { .. } => collections::lower_list_literal(gen, node),
        ExprKind::MapLiteral { .. } => collections::lower_map_literal(gen, node),
        ExprKind::TupleLiteral { .. } => lower_tuple(gen, node),
        ExprKind::BraceInit { elements } => {
            if elements.is_empty() {
                // Analyzer may have annotated with a collection type.
                if let Some(t) = gen.node_type(node.id) {
                    if super::types::is_collection_type(Some(&t)) {
                        let mangled = super::types::mangle_generic_type(&t.base, &t.generic_args);
                        return IrExpr::call(format!("{}_new", mangled), vec![]);
                    }
                }
                return IrExpr::lit("NULL");
            }
            let elems: Vec<String> = elements
                .iter()
                .map(|e| {
                    let ir = lower_expr(gen, e);
                    super::statements::quick_text(&ir)
                })
                .collect();
            IrExpr::raw(format!("{{{}}}", elems.join(", ")))
        }
        ExprKind::FString { .. } => fstrings::lower_fstring(gen, node),
        ExprKind::Lambda(_) => lambdas::lower_lambda(gen, node),
        ExprKind::Spawn { .. } => threads::lower_spawn(gen, node),
    }
}

/// Identifiers render to variable references, except enum values,
/// which become `<EnumName>_<Value>`.
fn lower_identifier(gen: &mut IrGenerator, name: &str) -> IrExpr {
    for (enum_name, values) in &gen.analyzed.enum_table {
        if values.iter().any(|v| v == name) {
            return IrExpr::lit(format!("{}_{}", enum_name, name));
        }
    }
    IrExpr::var(name)
}

/// Tuple literal → C compound literal with designated initializers.
fn lower_tuple(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::TupleLiteral { elements } = &node.kind else {
        return IrExpr::lit("0");
    };
    let mangled = match gen.node_type(node.id) {
        Some(t) if !t.generic_args.is_empty() => super::types::mangle_tuple_type(&t),
        _ => format!(
            "btrc_Tuple_{}",
            vec!["int"; elements.len()].join("_")
        ),
    };
    let elems: Vec<IrExpr> = elements.iter().map(|e| lower_expr(gen, e)).collect();
    let field_inits: Vec<String> = elems
        .iter()
        .enumerate()
        .map(|(i, e)| format!("._{} = {}", i, super::statements::quick_text(e)))
        .collect();
    IrExpr::raw(format!("({}){{{}}}", mangled, field_inits.join(", ")))
}
