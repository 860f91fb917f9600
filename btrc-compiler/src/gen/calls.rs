// Call lowering: function calls, constructors, print, Mutex, and the
// `keep` annotation bookkeeping.

use btrc_ast::{Expr, ExprKind, FStringPart, Param};

use super::expressions::lower_expr;
use super::methods;
use super::statements::quick_text;
use super::types::{format_spec_for_type, is_string_type};
use super::IrGenerator;
use crate::ir::{IrExpr, IrStmt};

pub fn lower_call(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Call { callee, args } = &node.kind else {
        return IrExpr::lit("0");
    };

    // Method call: obj.method(args)
    if matches!(callee.kind, ExprKind::FieldAccess { .. }) {
        return methods::lower_method_call(gen, node);
    }

    if let ExprKind::Identifier { name } = &callee.kind {
        // Mutex(val) constructor → __btrc_mutex_val_create(boxed val)
        if name == "Mutex" {
            return lower_mutex_constructor(gen, args);
        }

        // Constructor call: ClassName(args)
        if gen.analyzed.class_table.contains_key(name) {
            return lower_constructor_call(gen, name, args);
        }

        // Built-ins
        match name.as_str() {
            "print" => return lower_print(gen, args),
            "printf" => {
                let ir_args = args.iter().map(|a| lower_expr(gen, a)).collect();
                return IrExpr::call("printf", ir_args);
            }
            "sizeof" => {
                if let Some(first) = args.first() {
                    let inner = lower_expr(gen, first);
                    return IrExpr::Sizeof(quick_text(&inner));
                }
                return IrExpr::Sizeof("void".to_string());
            }
            "len" => {
                if let Some(first) = args.first() {
                    let arg_type = gen.node_type(first.id);
                    let ir = lower_expr(gen, first);
                    if is_string_type(arg_type.as_ref()) {
                        return IrExpr::cast("int", IrExpr::call("strlen", vec![ir]));
                    }
                    return IrExpr::field(ir, "len", true);
                }
            }
            _ => {}
        }

        let mut ir_args: Vec<IrExpr> = args.iter().map(|a| lower_expr(gen, a)).collect();

        // Captured lambda call: bypass the function pointer and call
        // the implementation directly with the environment appended.
        if let Some((fn_name, env_var)) = gen.fn_ptr_envs.get(name).cloned() {
            ir_args.push(IrExpr::cast("void*", IrExpr::raw(format!("&{}", env_var))));
            return IrExpr::call(fn_name, ir_args);
        }

        // Fill default parameter values for missing trailing args.
        let params = gen
            .analyzed
            .function_table
            .get(name)
            .map(|f| f.params.clone());
        if let Some(params) = params {
            fill_defaults(gen, &params, &mut ir_args);
        }

        return IrExpr::call(name.clone(), ir_args);
    }

    // Generic/complex callee
    let ir_args = args.iter().map(|a| lower_expr(gen, a)).collect();
    let callee_ir = lower_expr(gen, callee);
    IrExpr::call(quick_text(&callee_ir), ir_args)
}

/// Append defaults (or zero) for trailing parameters not supplied.
pub(crate) fn fill_defaults(gen: &mut IrGenerator, params: &[Param], ir_args: &mut Vec<IrExpr>) {
    if ir_args.len() >= params.len() {
        return;
    }
    for p in params.iter().skip(ir_args.len()) {
        match &p.default {
            Some(d) => ir_args.push(lower_expr(gen, d)),
            None => ir_args.push(IrExpr::lit("0")),
        }
    }
}

/// ClassName(args) → ClassName_new(args). Generic constructors get
/// patched to the mangled `_new` by the var-decl lowering, which
/// knows the declared instance type.
fn lower_constructor_call(gen: &mut IrGenerator, class_name: &str, args: &[Expr]) -> IrExpr {
    let mut ir_args: Vec<IrExpr> = args.iter().map(|a| lower_expr(gen, a)).collect();
    let ctor_params = gen
        .analyzed
        .class_table
        .get(class_name)
        .and_then(|c| c.constructor.as_ref())
        .map(|ctor| ctor.params.clone());
    if let Some(params) = ctor_params {
        fill_defaults(gen, &params, &mut ir_args);
    }
    IrExpr::call(format!("{}_new", class_name), ir_args)
}

// ==================== keep annotation ====================

/// Indices of parameters carrying the `keep` annotation for this
/// call's target (function, constructor, or method).
pub fn keep_param_indices(gen: &IrGenerator, node: &Expr) -> Vec<usize> {
    let ExprKind::Call { callee, .. } = &node.kind else {
        return Vec::new();
    };

    let params: Option<Vec<Param>> = match &callee.kind {
        ExprKind::FieldAccess { obj, field, .. } => {
            // Instance method via the receiver's type, or static via
            // the class name.
            let from_instance = gen
                .node_type(obj.id)
                .and_then(|t| gen.analyzed.class_table.get(&t.base))
                .and_then(|c| c.methods.get(field))
                .map(|m| m.params.clone());
            from_instance.or_else(|| {
                if let ExprKind::Identifier { name } = &obj.kind {
                    gen.analyzed
                        .class_table
                        .get(name)
                        .and_then(|c| c.methods.get(field))
                        .map(|m| m.params.clone())
                } else {
                    None
                }
            })
        }
        ExprKind::Identifier { name } => {
            if let Some(info) = gen.analyzed.class_table.get(name) {
                info.constructor.as_ref().map(|c| c.params.clone())
            } else {
                gen.analyzed
                    .function_table
                    .get(name)
                    .map(|f| f.params.clone())
            }
        }
        _ => None,
    };

    match params {
        Some(params) => params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.keep)
            .map(|(i, _)| i)
            .collect(),
        None => Vec::new(),
    }
}

/// Emit `arg->__rc++` statements for args passed to `keep` params.
/// Only class-type arguments have `__rc`; local identifier arguments
/// are also registered into the current managed scope so scope exit
/// drops the extra reference.
pub fn emit_keep_rc_increments(gen: &mut IrGenerator, node: &Expr) -> Vec<IrStmt> {
    let keep_indices = keep_param_indices(gen, node);
    if keep_indices.is_empty() {
        return Vec::new();
    }
    let ExprKind::Call { args, .. } = &node.kind else {
        return Vec::new();
    };

    let mut stmts = Vec::new();
    for idx in keep_indices {
        let Some(ast_arg) = args.get(idx) else {
            continue;
        };
        let Some(arg_type) = gen.node_type(ast_arg.id) else {
            continue;
        };
        if !gen.analyzed.class_table.contains_key(&arg_type.base) {
            continue;
        }
        let arg_ir = lower_expr(gen, ast_arg);
        stmts.push(IrStmt::ExprStmt {
            expr: IrExpr::UnaryOp {
                op: "++".to_string(),
                operand: Box::new(IrExpr::field(arg_ir, "__rc", true)),
                prefix: false,
            },
        });
        if let ExprKind::Identifier { name } = &ast_arg.kind {
            let class_name = managed_class_name(gen, &arg_type);
            gen.register_managed_var(name, &class_name);
        }
    }
    stmts
}

/// The class name used for managed-scope bookkeeping: mangled for
/// generic instances, plain otherwise.
pub(crate) fn managed_class_name(gen: &IrGenerator, t: &btrc_ast::TypeExpr) -> String {
    if !t.generic_args.is_empty() {
        if let Some(info) = gen.analyzed.class_table.get(&t.base) {
            if !info.generic_params.is_empty() {
                return super::types::mangle_generic_type(&t.base, &t.generic_args);
            }
        }
    }
    t.base.clone()
}

/// Does this call target a function/method whose return is `keep`?
pub fn has_keep_return(gen: &IrGenerator, node: &Expr) -> bool {
    let ExprKind::Call { callee, .. } = &node.kind else {
        return false;
    };
    match &callee.kind {
        ExprKind::FieldAccess { obj, field, .. } => {
            let from_instance = gen
                .node_type(obj.id)
                .and_then(|t| gen.analyzed.class_table.get(&t.base))
                .and_then(|c| c.methods.get(field))
                .map(|m| m.keep_return);
            from_instance
                .or_else(|| {
                    if let ExprKind::Identifier { name } = &obj.kind {
                        gen.analyzed
                            .class_table
                            .get(name)
                            .and_then(|c| c.methods.get(field))
                            .map(|m| m.keep_return)
                    } else {
                        None
                    }
                })
                .unwrap_or(false)
        }
        ExprKind::Identifier { name } => {
            // Constructor calls always return rc=1, never keep.
            if gen.analyzed.class_table.contains_key(name) {
                return false;
            }
            gen.analyzed
                .function_table
                .get(name)
                .map(|f| f.keep_return)
                .unwrap_or(false)
        }
        _ => false,
    }
}

// ==================== print ====================

/// Method names assumed to return strings when the type table has no
/// entry. A heuristic fallback only — the resolver is the primary
/// source of truth.
const STRINGY_METHODS: &[&str] = &[
    "toString", "str", "trim", "toUpper", "toLower", "substring", "replace", "repeat", "reverse",
    "capitalize", "join", "split",
];

/// print(a, b, …) → printf("<spec> <spec>\n", a', b', …)
fn lower_print(gen: &mut IrGenerator, args: &[Expr]) -> IrExpr {
    if args.is_empty() {
        return IrExpr::call("printf", vec![IrExpr::lit("\"\\n\"")]);
    }

    let mut parts = Vec::new();
    let mut ir_args = Vec::new();
    for arg in args {
        let arg_type = gen.node_type(arg.id);
        let mut ir_arg = lower_expr(gen, arg);
        let mut fmt = format_spec_for_type(arg_type.as_ref());

        // Untyped but clearly string-producing → %s.
        if arg_type.is_none() {
            match &arg.kind {
                ExprKind::StringLiteral { .. } | ExprKind::FString { .. } => fmt = "%s",
                ExprKind::Call { callee, .. } => {
                    if let ExprKind::FieldAccess { field, .. } = &callee.kind {
                        if STRINGY_METHODS.contains(&field.as_str()) {
                            fmt = "%s";
                        }
                    }
                    if let ExprKind::Identifier { name } = &callee.kind {
                        if name == "toString" || name == "str" {
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

        // F-string literal with a single text part prints directly.
        if let ExprKind::FString { parts: fparts } = &arg.kind {
            if fparts.len() == 1 && matches!(fparts[0], FStringPart::Text(_)) {
                fmt = "%s";
            }
        }

        parts.push(fmt.to_string());
        ir_args.push(ir_arg);
    }

    let fmt_str = format!("\"{}\\n\"", parts.join(" "));
    let mut call_args = vec![IrExpr::lit(fmt_str)];
    call_args.extend(ir_args);
    IrExpr::call("printf", call_args)
}

// ==================== Mutex ====================

const MUTEX_PRIMITIVES: &[&str] = &["int", "float", "double", "char", "bool", "short", "long"];

/// Mutex(val) → __btrc_mutex_val_create(boxed val)
fn lower_mutex_constructor(gen: &mut IrGenerator, args: &[Expr]) -> IrExpr {
    gen.use_helper("__btrc_mutex_val_create");
    if !gen.module.includes.iter().any(|i| i == "pthread.h") {
        gen.module.includes.push("pthread.h".to_string());
    }
    let Some(first) = args.first() else {
        return IrExpr::call_helper("__btrc_mutex_val_create", vec![IrExpr::lit("NULL")]);
    };
    let arg_type = gen.node_type(first.id);
    let val = lower_expr(gen, first);
    let boxed = match arg_type {
        Some(t) if MUTEX_PRIMITIVES.contains(&t.base.as_str()) && t.generic_args.is_empty() => {
            IrExpr::cast("void*", IrExpr::cast("intptr_t", val))
        }
        _ => IrExpr::cast("void*", val),
    };
    IrExpr::call_helper("__btrc_mutex_val_create", vec![boxed])
}
