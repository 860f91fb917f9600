// Operator lowering: binary and unary expressions → IR.

use btrc_ast::{Expr, ExprKind};

use super::expressions::lower_expr;
use super::types::{is_numeric_type, is_string_type};
use super::IrGenerator;
use crate::ir::IrExpr;

/// Magic-method names for overloadable operators on class types.
const OP_MAGIC: &[(&str, &str)] = &[
    ("+", "__add__"),
    ("-", "__sub__"),
    ("*", "__mul__"),
    ("/", "__div__"),
    ("%", "__mod__"),
    ("==", "__eq__"),
    ("!=", "__ne__"),
    ("<", "__lt__"),
    (">", "__gt__"),
    ("<=", "__le__"),
    (">=", "__ge__"),
];

pub fn lower_binary(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Binary { op, left, right } = &node.kind else {
        return IrExpr::lit("0");
    };

    let left_type = gen.node_type(left.id);
    let l = lower_expr(gen, left);
    let r = lower_expr(gen, right);

    // String concatenation: a + b → __btrc_str_track(__btrc_strcat(a, b))
    if op == "+" && is_string_type(left_type.as_ref()) {
        gen.use_helper("__btrc_strcat");
        gen.use_helper("__btrc_str_track");
        let cat = IrExpr::call_helper("__btrc_strcat", vec![l, r]);
        return IrExpr::call_helper("__btrc_str_track", vec![cat]);
    }

    // String comparison: a == b → strcmp(a, b) == 0
    if (op == "==" || op == "!=") && is_string_type(left_type.as_ref()) {
        let cmp = IrExpr::call("strcmp", vec![l, r]);
        return IrExpr::binop(cmp, op.clone(), IrExpr::lit("0"));
    }

    // Division and modulo trap on zero divisors.
    if op == "/" && is_numeric_type(left_type.as_ref()) {
        let helper = if matches!(
            left_type.as_ref().map(|t| t.base.as_str()),
            Some("float") | Some("double")
        ) {
            "__btrc_div_double"
        } else {
            "__btrc_div_int"
        };
        gen.use_helper(helper);
        return IrExpr::call_helper(helper, vec![l, r]);
    }
    if op == "%" && is_numeric_type(left_type.as_ref()) {
        gen.use_helper("__btrc_mod_int");
        return IrExpr::call_helper("__btrc_mod_int", vec![l, r]);
    }

    // Null coalescing: a ?? b → (a != NULL ? a : b)
    if op == "??" {
        return IrExpr::Ternary {
            condition: Box::new(IrExpr::binop(l.clone(), "!=", IrExpr::lit("NULL"))),
            true_expr: Box::new(l),
            false_expr: Box::new(r),
        };
    }

    // Operator overloading: a + b → ClassName___add__(a, b)
    if let Some(lt) = &left_type {
        if let Some(cls_info) = gen.analyzed.class_table.get(&lt.base) {
            if let Some((_, magic)) = OP_MAGIC.iter().find(|(o, _)| o == op) {
                if cls_info.methods.contains_key(*magic) {
                    return IrExpr::call(format!("{}_{}", lt.base, magic), vec![l, r]);
                }
            }
        }
    }

    IrExpr::binop(l, op.clone(), r)
}

pub fn lower_unary(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Unary {
        op,
        operand,
        prefix,
    } = &node.kind
    else {
        return IrExpr::lit("0");
    };

    let operand_type = gen.node_type(operand.id);
    let inner = lower_expr(gen, operand);

    match op.as_str() {
        "&" => IrExpr::AddressOf(Box::new(inner)),
        "*" => IrExpr::Deref(Box::new(inner)),
        "-" if *prefix => {
            // Operator overloading: -obj with __neg__
            if let Some(t) = &operand_type {
                if let Some(cls_info) = gen.analyzed.class_table.get(&t.base) {
                    if cls_info.methods.contains_key("__neg__") {
                        return IrExpr::call(format!("{}___neg__", t.base), vec![inner]);
                    }
                }
            }
            IrExpr::UnaryOp {
                op: op.clone(),
                operand: Box::new(inner),
                prefix: *prefix,
            }
        }
        _ => IrExpr::UnaryOp {
            op: op.clone(),
            operand: Box::new(inner),
            prefix: *prefix,
        },
    }
}
