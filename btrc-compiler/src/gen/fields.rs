// Field access, indexing, and assignment lowering → IR.

use btrc_ast::{Expr, ExprKind};

use super::expressions::lower_expr;
use super::types::{
    is_collection_type, is_generic_class_type, is_string_type, mangle_generic_type,
};
use super::IrGenerator;
use crate::ir::IrExpr;

pub fn lower_field_access(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::FieldAccess {
        obj: obj_node,
        field,
        optional,
        arrow,
    } = &node.kind
    else {
        return IrExpr::lit("0");
    };

    let obj_type = gen.node_type(obj_node.id);

    // Rich enum variant tag: Color.RGB → Color_RGB_TAG
    if let ExprKind::Identifier { name } = &obj_node.kind {
        if gen.analyzed.rich_enum_table.contains_key(name) {
            return IrExpr::var(format!("{}_{}_TAG", name, field));
        }
        // Static reference on a class name: ClassName.field
        if gen.analyzed.class_table.contains_key(name) {
            return IrExpr::var(format!("{}_{}", name, field));
        }
    }

    let obj = lower_expr(gen, obj_node);

    // String length: s.len → (int)strlen(s)
    if is_string_type(obj_type.as_ref()) && matches!(field.as_str(), "len" | "length") {
        return IrExpr::cast("int", IrExpr::call("strlen", vec![obj]));
    }

    // Collection length: list.len → list->len
    if (is_collection_type(obj_type.as_ref())
        || is_generic_class_type(obj_type.as_ref(), &gen.analyzed.class_table))
        && matches!(field.as_str(), "len" | "length" | "size")
    {
        return IrExpr::field(obj, "len", true);
    }

    // Property access on class instances.
    if let Some(t) = &obj_type {
        if let Some(cls_info) = gen.analyzed.class_table.get(&t.base) {
            let callee_prefix = if !t.generic_args.is_empty() && !cls_info.generic_params.is_empty()
            {
                mangle_generic_type(&t.base, &t.generic_args)
            } else {
                t.base.clone()
            };
            if cls_info.properties.contains_key(field) {
                // self.prop inside the class → backing field directly
                if matches!(obj_node.kind, ExprKind::SelfExpr) {
                    return IrExpr::field(obj, format!("_prop_{}", field), true);
                }
                return IrExpr::call(format!("{}_get_{}", callee_prefix, field), vec![obj]);
            }
        }
    }

    if *optional {
        // a?.b → (a != NULL ? a->b : 0)
        let access = IrExpr::field(obj.clone(), field.clone(), true);
        return IrExpr::Ternary {
            condition: Box::new(IrExpr::binop(obj, "!=", IrExpr::lit("NULL"))),
            true_expr: Box::new(access),
            false_expr: Box::new(IrExpr::lit("0")),
        };
    }

    // Arrow when the receiver is a pointer or class instance.
    let mut use_arrow = *arrow;
    if let Some(t) = &obj_type {
        if t.pointer_depth > 0
            || gen.analyzed.class_table.contains_key(&t.base)
            || is_collection_type(Some(t))
        {
            use_arrow = true;
        }
    }

    IrExpr::field(obj, field.clone(), use_arrow)
}

pub fn lower_index(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Index {
        obj: obj_node,
        index,
    } = &node.kind
    else {
        return IrExpr::lit("0");
    };

    let obj_type = gen.node_type(obj_node.id);
    let obj = lower_expr(gen, obj_node);
    let index = lower_expr(gen, index);

    if is_collection_type(obj_type.as_ref())
        || is_generic_class_type(obj_type.as_ref(), &gen.analyzed.class_table)
    {
        let t = obj_type.as_ref().map(|t| (t.base.clone(), t.generic_args.clone()));
        if let Some((base, args)) = t {
            let mangled = mangle_generic_type(&base, &args);
            return IrExpr::call(format!("{}_get", mangled), vec![obj, index]);
        }
    }
    IrExpr::Index {
        obj: Box::new(obj),
        index: Box::new(index),
    }
}

pub fn lower_assign(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Assign { op, target, value } = &node.kind else {
        return IrExpr::lit("0");
    };

    // Property setter: obj.prop = value → ClassName_set_prop(obj, value)
    if op == "=" {
        if let ExprKind::FieldAccess {
            obj: obj_node,
            field,
            ..
        } = &target.kind
        {
            let obj_type = gen.node_type(obj_node.id);
            if let Some(t) = &obj_type {
                let prefix_and_prop = gen.analyzed.class_table.get(&t.base).map(|cls_info| {
                    let prefix =
                        if !t.generic_args.is_empty() && !cls_info.generic_params.is_empty() {
                            mangle_generic_type(&t.base, &t.generic_args)
                        } else {
                            t.base.clone()
                        };
                    (prefix, cls_info.properties.contains_key(field))
                });
                if let Some((prefix, true)) = prefix_and_prop {
                    let obj = lower_expr(gen, obj_node);
                    let val = lower_expr(gen, value);
                    // self.prop = value inside the class → backing field
                    if matches!(obj_node.kind, ExprKind::SelfExpr) {
                        let backing = IrExpr::field(obj, format!("_prop_{}", field), true);
                        return IrExpr::binop(backing, "=", val);
                    }
                    return IrExpr::call(format!("{}_set_{}", prefix, field), vec![obj, val]);
                }
            }
        }

        // Collection index assignment: list[i] = v → mangled_set(list, i, v)
        if let ExprKind::Index {
            obj: obj_node,
            index,
        } = &target.kind
        {
            let obj_type = gen.node_type(obj_node.id);
            if is_collection_type(obj_type.as_ref())
                || is_generic_class_type(obj_type.as_ref(), &gen.analyzed.class_table)
            {
                if let Some(t) = obj_type {
                    let mangled = mangle_generic_type(&t.base, &t.generic_args);
                    let obj = lower_expr(gen, obj_node);
                    let idx = lower_expr(gen, index);
                    let val = lower_expr(gen, value);
                    return IrExpr::call(format!("{}_set", mangled), vec![obj, idx, val]);
                }
            }
        }

        // Empty {} / [] assigned to a collection-typed target → _new()
        let empty_literal = matches!(
            &value.kind,
            ExprKind::BraceInit { elements } if elements.is_empty()
        ) || matches!(
            &value.kind,
            ExprKind::ListLiteral { elements } if elements.is_empty()
        ) || matches!(
            &value.kind,
            ExprKind::MapLiteral { entries } if entries.is_empty()
        );
        if empty_literal {
            let target_type = gen.node_type(target.id);
            if is_collection_type(target_type.as_ref()) {
                if let Some(t) = target_type {
                    let mangled = mangle_generic_type(&t.base, &t.generic_args);
                    let tgt = lower_expr(gen, target);
                    return IrExpr::binop(
                        tgt,
                        "=",
                        IrExpr::call(format!("{}_new", mangled), vec![]),
                    );
                }
            }
        }
    }

    let target_type = gen.node_type(target.id);
    let tgt = lower_expr(gen, target);
    let val = lower_expr(gen, value);

    // String += → target = __btrc_str_track(__btrc_strcat(target, value))
    if op == "+=" && is_string_type(target_type.as_ref()) {
        gen.use_helper("__btrc_strcat");
        gen.use_helper("__btrc_str_track");
        let cat = IrExpr::call_helper("__btrc_strcat", vec![tgt.clone(), val]);
        let tracked = IrExpr::call_helper("__btrc_str_track", vec![cat]);
        return IrExpr::binop(tgt, "=", tracked);
    }

    IrExpr::binop(tgt, op.clone(), val)
}
