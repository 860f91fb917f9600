// Collection literal lowering: list and map literals → statement
// expressions that build the container.

use btrc_ast::{Expr, ExprKind};

use super::expressions::lower_expr;
use super::types::mangle_generic_type;
use super::IrGenerator;
use crate::ir::{CType, IrExpr, IrStmt};

/// `[a, b, c]` →
/// `({ btrc_List_int* __list_n = btrc_List_int_new(); ...push...; __list_n; })`
pub fn lower_list_literal(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::ListLiteral { elements } = &node.kind else {
        return IrExpr::lit("0");
    };

    let mangled = match gen.node_type(node.id) {
        Some(t) if !t.generic_args.is_empty() => {
            gen.register_instance("List", &t.generic_args);
            mangle_generic_type("List", &t.generic_args)
        }
        _ => "btrc_List_int".to_string(),
    };

    let tmp = gen.fresh_temp("__list");
    let mut stmts = vec![IrStmt::VarDecl {
        c_type: CType::new(format!("{}*", mangled)),
        name: tmp.clone(),
        init: Some(IrExpr::call(format!("{}_new", mangled), vec![])),
    }];
    for elem in elements {
        let ir_elem = lower_expr(gen, elem);
        stmts.push(IrStmt::ExprStmt {
            expr: IrExpr::call(format!("{}_push", mangled), vec![IrExpr::var(&tmp), ir_elem]),
        });
    }

    IrExpr::StmtExpr {
        stmts,
        result: Box::new(IrExpr::var(tmp)),
    }
}

/// `{k: v, ...}` → Map_new() plus puts, in a statement expression.
pub fn lower_map_literal(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::MapLiteral { entries } = &node.kind else {
        return IrExpr::lit("0");
    };

    let mangled = match gen.node_type(node.id) {
        Some(t) if !t.generic_args.is_empty() => {
            gen.register_instance("Map", &t.generic_args);
            mangle_generic_type("Map", &t.generic_args)
        }
        _ => "btrc_Map_string_int".to_string(),
    };

    if entries.is_empty() {
        return IrExpr::call(format!("{}_new", mangled), vec![]);
    }

    let tmp = gen.fresh_temp("__map");
    let mut stmts = vec![IrStmt::VarDecl {
        c_type: CType::new(format!("{}*", mangled)),
        name: tmp.clone(),
        init: Some(IrExpr::call(format!("{}_new", mangled), vec![])),
    }];
    for entry in entries {
        let k = lower_expr(gen, &entry.key);
        let v = lower_expr(gen, &entry.value);
        stmts.push(IrStmt::ExprStmt {
            expr: IrExpr::call(
                format!("{}_put", mangled),
                vec![IrExpr::var(&tmp), k, v],
            ),
        });
    }

    IrExpr::StmtExpr {
        stmts,
        result: Box::new(IrExpr::var(tmp)),
    }
}
