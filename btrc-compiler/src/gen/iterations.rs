// Iteration lowering: for-in over collections/strings, range(), and
// C-style for loops.

use btrc_ast::*;

use super::expressions::lower_expr;
use super::statements::{lower_block, quick_text};
use super::IrGenerator;
use crate::ir::{CType, IrBlock, IrExpr, IrStmt};

pub fn lower_for_in(gen: &mut IrGenerator, node: &ForInStmt) -> Vec<IrStmt> {
    // range() loops get a dedicated C for header.
    if let ExprKind::Call { callee, args } = &node.iterable.kind {
        if matches!(&callee.kind, ExprKind::Identifier { name } if name == "range") {
            return lower_range_for(gen, &node.var_name, args, &node.body);
        }
    }

    let iter_type = gen.node_type(node.iterable.id);
    let ir_iter = lower_expr(gen, &node.iterable);
    let it = quick_text(&ir_iter);

    match iter_type.as_ref().map(|t| t.base.as_str()) {
        // List iteration: index loop with the element bound up front.
        Some("List") => {
            let idx = gen.fresh_temp("__i");
            let elem_c = elem_ctype(gen, iter_type.as_ref(), 0);
            let mut body = lower_block(gen, &node.body);
            body.stmts.insert(
                0,
                IrStmt::VarDecl {
                    c_type: CType::new(elem_c),
                    name: node.var_name.clone(),
                    init: Some(IrExpr::Index {
                        obj: Box::new(IrExpr::field(ir_iter.clone(), "data", true)),
                        index: Box::new(IrExpr::var(&idx)),
                    }),
                },
            );
            vec![IrStmt::For {
                init: format!("int {} = 0", idx),
                condition: format!("{} < {}->len", idx, it),
                update: format!("{}++", idx),
                body,
            }]
        }
        // Map iteration: occupancy-guarded walk over the capacity.
        Some("Map") => {
            let idx = gen.fresh_temp("__i");
            let k_c = elem_ctype(gen, iter_type.as_ref(), 0);
            let mut body = lower_block(gen, &node.body);

            if let Some(var2) = &node.var_name2 {
                let v_c = elem_ctype(gen, iter_type.as_ref(), 1);
                body.stmts.insert(
                    0,
                    IrStmt::VarDecl {
                        c_type: CType::new(v_c),
                        name: var2.clone(),
                        init: Some(IrExpr::Index {
                            obj: Box::new(IrExpr::field(ir_iter.clone(), "values", true)),
                            index: Box::new(IrExpr::var(&idx)),
                        }),
                    },
                );
            }
            body.stmts.insert(
                0,
                IrStmt::VarDecl {
                    c_type: CType::new(k_c),
                    name: node.var_name.clone(),
                    init: Some(IrExpr::Index {
                        obj: Box::new(IrExpr::field(ir_iter.clone(), "keys", true)),
                        index: Box::new(IrExpr::var(&idx)),
                    }),
                },
            );
            body.stmts.insert(0, occupancy_skip(&ir_iter, &idx));
            vec![IrStmt::For {
                init: format!("int {} = 0", idx),
                condition: format!("{} < {}->cap", idx, it),
                update: format!("{}++", idx),
                body,
            }]
        }
        Some("Set") => {
            let idx = gen.fresh_temp("__i");
            let elem_c = elem_ctype(gen, iter_type.as_ref(), 0);
            let mut body = lower_block(gen, &node.body);
            body.stmts.insert(
                0,
                IrStmt::VarDecl {
                    c_type: CType::new(elem_c),
                    name: node.var_name.clone(),
                    init: Some(IrExpr::Index {
                        obj: Box::new(IrExpr::field(ir_iter.clone(), "keys", true)),
                        index: Box::new(IrExpr::var(&idx)),
                    }),
                },
            );
            body.stmts.insert(0, occupancy_skip(&ir_iter, &idx));
            vec![IrStmt::For {
                init: format!("int {} = 0", idx),
                condition: format!("{} < {}->cap", idx, it),
                update: format!("{}++", idx),
                body,
            }]
        }
        // String iteration: for c in s → until the NUL terminator.
        Some("string") => {
            let idx = gen.fresh_temp("__i");
            let mut body = lower_block(gen, &node.body);
            body.stmts.insert(
                0,
                IrStmt::VarDecl {
                    c_type: CType::new("char"),
                    name: node.var_name.clone(),
                    init: Some(IrExpr::Index {
                        obj: Box::new(ir_iter.clone()),
                        index: Box::new(IrExpr::var(&idx)),
                    }),
                },
            );
            vec![IrStmt::For {
                init: format!("int {} = 0", idx),
                condition: format!("{}[{}] != '\\0'", it, idx),
                update: format!("{}++", idx),
                body,
            }]
        }
        // Fallback: assume list-like data/len shape.
        _ => {
            let idx = gen.fresh_temp("__i");
            let mut body = lower_block(gen, &node.body);
            body.stmts.insert(
                0,
                IrStmt::VarDecl {
                    c_type: CType::new("int"),
                    name: node.var_name.clone(),
                    init: Some(IrExpr::raw(format!("{}[{}]", it, idx))),
                },
            );
            vec![IrStmt::For {
                init: format!("int {} = 0", idx),
                condition: format!("{} < {}_len", idx, it),
                update: format!("{}++", idx),
                body,
            }]
        }
    }
}

fn elem_ctype(gen: &mut IrGenerator, t: Option<&TypeExpr>, idx: usize) -> String {
    match t.and_then(|t| t.generic_args.get(idx)) {
        Some(arg) => {
            let arg = arg.clone();
            gen.ctype(Some(&arg))
        }
        None => "int".to_string(),
    }
}

/// `if (!it->occupied[i]) continue;`
fn occupancy_skip(ir_iter: &IrExpr, idx: &str) -> IrStmt {
    IrStmt::If {
        condition: IrExpr::UnaryOp {
            op: "!".to_string(),
            operand: Box::new(IrExpr::Index {
                obj: Box::new(IrExpr::field(ir_iter.clone(), "occupied", true)),
                index: Box::new(IrExpr::var(idx)),
            }),
            prefix: true,
        },
        then_block: IrBlock::new(vec![IrStmt::Continue]),
        else_block: None,
    }
}

/// for x in range(...) → C for loop. The three-argument form gets a
/// direction-sensitive condition.
fn lower_range_for(
    gen: &mut IrGenerator,
    var_name: &str,
    args: &[Expr],
    body: &Block,
) -> Vec<IrStmt> {
    let texts: Vec<String> = args
        .iter()
        .map(|a| {
            let ir = lower_expr(gen, a);
            quick_text(&ir)
        })
        .collect();
    let body = lower_block(gen, body);

    match texts.as_slice() {
        [end] => vec![IrStmt::For {
            init: format!("int {} = 0", var_name),
            condition: format!("{} < {}", var_name, end),
            update: format!("{}++", var_name),
            body,
        }],
        [start, end] => vec![IrStmt::For {
            init: format!("int {} = {}", var_name, start),
            condition: format!("{} < {}", var_name, end),
            update: format!("{}++", var_name),
            body,
        }],
        [start, end, step, ..] => vec![IrStmt::For {
            init: format!("int {} = {}", var_name, start),
            condition: format!(
                "({} > 0 ? {} < {} : {} > {})",
                step, var_name, end, var_name, end
            ),
            update: format!("{} += {}", var_name, step),
            body,
        }],
        [] => vec![IrStmt::For {
            init: format!("int {} = 0", var_name),
            condition: format!("{} < 0", var_name),
            update: format!("{}++", var_name),
            body,
        }],
    }
}

pub fn lower_c_for(gen: &mut IrGenerator, node: &CForStmt) -> IrStmt {
    let init_text = match &node.init {
        Some(ForInit::Var(vd)) => {
            let c_type = match &vd.ty {
                Some(t) => gen.ctype(Some(t)),
                None => "int".to_string(),
            };
            match &vd.initializer {
                Some(init) => {
                    let ir = lower_expr(gen, init);
                    format!("{} {} = {}", c_type, vd.name, quick_text(&ir))
                }
                None => format!("{} {}", c_type, vd.name),
            }
        }
        Some(ForInit::Expr(e)) => {
            let ir = lower_expr(gen, e);
            quick_text(&ir)
        }
        None => String::new(),
    };

    let cond_text = match &node.condition {
        Some(c) => {
            let ir = lower_expr(gen, c);
            quick_text(&ir)
        }
        None => "1".to_string(),
    };
    let update_text = match &node.update {
        Some(u) => {
            let ir = lower_expr(gen, u);
            quick_text(&ir)
        }
        None => String::new(),
    };

    IrStmt::For {
        init: init_text,
        condition: cond_text,
        update: update_text,
        body: lower_block(gen, &node.body),
    }
}
