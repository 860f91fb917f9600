// Method call lowering: obj.method(args) → the appropriate C call.

use btrc_ast::{Expr, ExprKind, TypeExpr};

use super::calls::fill_defaults;
use super::expressions::lower_expr;
use super::types::{is_collection_type, is_string_type, mangle_generic_type, type_to_c};
use super::IrGenerator;
use crate::ir::IrExpr;

/// String methods that map directly to runtime helpers.
const STRING_METHODS: &[(&str, &str)] = &[
    ("trim", "__btrc_trim"),
    ("toUpper", "__btrc_toUpper"),
    ("toLower", "__btrc_toLower"),
    ("substring", "__btrc_substring"),
    ("charAt", "__btrc_charAt"),
    ("indexOf", "__btrc_indexOf"),
    ("lastIndexOf", "__btrc_lastIndexOf"),
    ("replace", "__btrc_replace"),
    ("repeat", "__btrc_repeat"),
    ("reverse", "__btrc_reverse"),
    ("isEmpty", "__btrc_isEmpty"),
    ("removePrefix", "__btrc_removePrefix"),
    ("removeSuffix", "__btrc_removeSuffix"),
    ("startsWith", "__btrc_startsWith"),
    ("endsWith", "__btrc_endsWith"),
    ("contains", "__btrc_strContains"),
    ("capitalize", "__btrc_capitalize"),
    ("title", "__btrc_title"),
    ("swapCase", "__btrc_swapCase"),
    ("padLeft", "__btrc_padLeft"),
    ("padRight", "__btrc_padRight"),
    ("center", "__btrc_center"),
    ("lstrip", "__btrc_lstrip"),
    ("rstrip", "__btrc_rstrip"),
    ("count", "__btrc_count"),
    ("find", "__btrc_find"),
    ("isDigit", "__btrc_isDigitStr"),
    ("isAlpha", "__btrc_isAlphaStr"),
    ("isBlank", "__btrc_isBlank"),
    ("isUpper", "__btrc_isUpper"),
    ("isLower", "__btrc_isLower"),
    ("isAlnum", "__btrc_isAlnumStr"),
    ("zfill", "__btrc_zfill"),
];

/// String methods returning fresh strings (wrapped in str_track).
const STRING_TRACK_METHODS: &[&str] = &[
    "trim", "toUpper", "toLower", "substring", "replace", "repeat", "reverse", "removePrefix",
    "removeSuffix", "capitalize", "title", "swapCase", "padLeft", "padRight", "center", "lstrip",
    "rstrip", "zfill",
];

/// Numeric parse methods: (C function, optional cast).
const STRING_CONVERSIONS: &[(&str, &str, Option<&str>)] = &[
    ("toInt", "atoi", None),
    ("toFloat", "atof", Some("float")),
    ("toDouble", "atof", None),
    ("toLong", "atol", None),
];

pub fn lower_method_call(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Call { callee, args } = &node.kind else {
        return IrExpr::lit("0");
    };
    let ExprKind::FieldAccess {
        obj: obj_node,
        field: method_name,
        ..
    } = &callee.kind
    else {
        return IrExpr::lit("0");
    };

    // Rich enum constructor: Color.RGB(255, 0, 0) → Color_RGB(...)
    if let ExprKind::Identifier { name } = &obj_node.kind {
        if gen.analyzed.rich_enum_table.contains_key(name) {
            let ir_args = args.iter().map(|a| lower_expr(gen, a)).collect();
            return IrExpr::call(format!("{}_{}", name, method_name), ir_args);
        }
        // Static method call: ClassName.method(args)
        if gen.analyzed.class_table.contains_key(name) {
            let mut ir_args: Vec<IrExpr> = args.iter().map(|a| lower_expr(gen, a)).collect();
            let params = gen
                .analyzed
                .class_table
                .get(name)
                .and_then(|c| c.methods.get(method_name))
                .map(|m| m.params.clone());
            if let Some(params) = params {
                fill_defaults(gen, &params, &mut ir_args);
            }
            return IrExpr::call(format!("{}_{}", name, method_name), ir_args);
        }
    }

    // Inside a method body `self` may predate type recording; the
    // generator's class context fills the gap.
    let obj_type = gen.node_type(obj_node.id).or_else(|| {
        if matches!(obj_node.kind, ExprKind::SelfExpr) {
            gen.current_class.clone().map(TypeExpr::named)
        } else {
            None
        }
    });
    let obj = lower_expr(gen, obj_node);
    let ir_args: Vec<IrExpr> = args.iter().map(|a| lower_expr(gen, a)).collect();

    if is_string_type(obj_type.as_ref()) {
        // split/join route through the List<string> monomorph: the
        // list struct and push are only in scope from its raw section.
        if method_name == "split" {
            let string_arg = [TypeExpr::named("string")];
            gen.register_instance("List", &string_arg);
            let mangled = mangle_generic_type("List", &string_arg);
            let mut call_args = vec![obj];
            call_args.extend(ir_args);
            return IrExpr::call(format!("{}_split", mangled), call_args);
        }
        if method_name == "join" {
            // sep.join(list) — the receiver is the separator.
            let string_arg = [TypeExpr::named("string")];
            gen.register_instance("List", &string_arg);
            let mangled = mangle_generic_type("List", &string_arg);
            gen.use_helper("__btrc_str_track");
            let mut call_args = ir_args;
            call_args.push(obj);
            let join = IrExpr::call(format!("{}_join", mangled), call_args);
            return IrExpr::call_helper("__btrc_str_track", vec![join]);
        }
        if let Some((_, helper)) = STRING_METHODS
            .iter()
            .find(|(m, _)| m == method_name)
        {
            return lower_string_method(gen, obj, method_name, helper, ir_args);
        }
        if let Some(special) = lower_string_special(gen, &obj, method_name, &ir_args) {
            return special;
        }
        if let Some((_, c_func, cast_to)) = STRING_CONVERSIONS
            .iter()
            .find(|(m, _, _)| m == method_name)
        {
            let call = IrExpr::call(*c_func, vec![obj]);
            return match cast_to {
                Some(c) => IrExpr::cast(*c, call),
                None => call,
            };
        }
    }

    if method_name == "toString" {
        return lower_to_string(gen, obj, obj_type.as_ref());
    }

    // Thread<T>.join() → unbox __btrc_thread_join
    if obj_type.as_ref().is_some_and(|t| t.base == "Thread") {
        if method_name == "join" {
            return lower_thread_join(gen, obj, obj_type.as_ref());
        }
        return IrExpr::call(format!("__btrc_thread_{}", method_name), vec![obj]);
    }

    // Mutex methods route to helpers.
    if obj_type.as_ref().is_some_and(|t| t.base == "Mutex") {
        let helper = format!("__btrc_mutex_{}", method_name);
        gen.use_helper(&helper);
        let mut margs = vec![obj];
        margs.extend(ir_args);
        return IrExpr::call_helper(helper, margs);
    }

    // Collection methods (List, Map, Set).
    if is_collection_type(obj_type.as_ref()) {
        if let Some(t) = &obj_type {
            return lower_collection_method(gen, obj, t, method_name, ir_args);
        }
    }

    // User class method: obj.method(args) → ClassName_method(obj, args)
    if let Some(t) = &obj_type {
        if let Some(cls_info) = gen.analyzed.class_table.get(&t.base) {
            let callee_prefix = if !t.generic_args.is_empty() && !cls_info.generic_params.is_empty()
            {
                mangle_generic_type(&t.base, &t.generic_args)
            } else {
                t.base.clone()
            };
            // Property getter invoked as a method.
            if cls_info.properties.contains_key(method_name) {
                return IrExpr::call(format!("{}_get_{}", callee_prefix, method_name), vec![obj]);
            }
            let mut call_args = vec![obj];
            call_args.extend(ir_args);
            return IrExpr::call(format!("{}_{}", callee_prefix, method_name), call_args);
        }
    }

    // Fallback: member function pointer.
    let arrow = obj_type.as_ref().is_some_and(|t| t.pointer_depth > 0);
    let obj_text = super::statements::quick_text(&obj);
    let sep = if arrow { "->" } else { "." };
    IrExpr::call(format!("{}{}{}", obj_text, sep, method_name), ir_args)
}

fn lower_string_method(
    gen: &mut IrGenerator,
    obj: IrExpr,
    method: &str,
    helper: &str,
    args: Vec<IrExpr>,
) -> IrExpr {
    gen.use_helper(helper);
    let mut call_args = vec![obj];
    call_args.extend(args);
    let call = IrExpr::call_helper(helper, call_args);
    if STRING_TRACK_METHODS.contains(&method) {
        gen.use_helper("__btrc_str_track");
        return IrExpr::call_helper("__btrc_str_track", vec![call]);
    }
    call
}

/// String methods that expand inline instead of calling a helper.
fn lower_string_special(
    gen: &mut IrGenerator,
    obj: &IrExpr,
    method: &str,
    args: &[IrExpr],
) -> Option<IrExpr> {
    match method {
        "equals" => {
            let mut cmp_args = vec![obj.clone()];
            cmp_args.extend(args.to_vec());
            let cmp = IrExpr::call("strcmp", cmp_args);
            Some(IrExpr::binop(cmp, "==", IrExpr::lit("0")))
        }
        "byteLen" | "len" | "length" => Some(IrExpr::cast(
            "int",
            IrExpr::call("strlen", vec![obj.clone()]),
        )),
        "charLen" => {
            gen.use_helper("__btrc_charLen");
            Some(IrExpr::call_helper("__btrc_charLen", vec![obj.clone()]))
        }
        _ => None,
    }
}

fn lower_to_string(gen: &mut IrGenerator, obj: IrExpr, obj_type: Option<&TypeExpr>) -> IrExpr {
    let base = obj_type.map(|t| t.base.as_str()).unwrap_or("int");

    // bool → val ? "true" : "false"
    if base == "bool" {
        return IrExpr::Ternary {
            condition: Box::new(obj),
            true_expr: Box::new(IrExpr::lit("\"true\"")),
            false_expr: Box::new(IrExpr::lit("\"false\"")),
        };
    }
    // Enum → EnumName_toString(val)
    if gen.analyzed.enum_table.contains_key(base) {
        return IrExpr::call(format!("{}_toString", base), vec![obj]);
    }
    if gen.analyzed.rich_enum_table.contains_key(base) {
        return IrExpr::call(format!("{}_toString", base), vec![obj]);
    }

    let helper = match base {
        "long" => "__btrc_longToString",
        "float" => "__btrc_floatToString",
        "double" => "__btrc_doubleToString",
        "char" => "__btrc_charToString",
        _ => "__btrc_intToString",
    };
    gen.use_helper(helper);
    gen.use_helper("__btrc_str_track");
    let call = IrExpr::call_helper(helper, vec![obj]);
    IrExpr::call_helper("__btrc_str_track", vec![call])
}

fn lower_thread_join(gen: &mut IrGenerator, obj: IrExpr, obj_type: Option<&TypeExpr>) -> IrExpr {
    gen.use_helper("__btrc_thread_join");
    let join = IrExpr::call_helper("__btrc_thread_join", vec![obj]);
    let Some(ret) = obj_type.and_then(|t| t.generic_args.first()) else {
        return join;
    };
    if ret.base == "void" {
        return join;
    }
    let c = type_to_c(Some(ret), &mut gen.fn_ptr_typedefs);
    let primitive = matches!(
        ret.base.as_str(),
        "int" | "float" | "double" | "char" | "bool" | "short" | "long"
    ) && ret.pointer_depth == 0
        && ret.generic_args.is_empty();
    if primitive {
        IrExpr::cast(c, IrExpr::cast("intptr_t", join))
    } else {
        let c = gen.ctype(Some(ret));
        IrExpr::cast(c, join)
    }
}

fn lower_collection_method(
    gen: &mut IrGenerator,
    obj: IrExpr,
    obj_type: &TypeExpr,
    method: &str,
    args: Vec<IrExpr>,
) -> IrExpr {
    let mangled = mangle_generic_type(&obj_type.base, &obj_type.generic_args);

    if matches!(method, "size" | "length" | "len") {
        return IrExpr::field(obj, "len", true);
    }
    if method == "isEmpty" {
        return IrExpr::binop(IrExpr::field(obj, "len", true), "==", IrExpr::lit("0"));
    }

    // keys()/values()/toList() produce List instances the
    // monomorphizer must also emit.
    match (obj_type.base.as_str(), method) {
        ("Map", "keys") => {
            if let Some(k) = obj_type.generic_args.first() {
                gen.register_instance("List", &[k.clone()]);
            }
        }
        ("Map", "values") => {
            if let Some(v) = obj_type.generic_args.get(1) {
                gen.register_instance("List", &[v.clone()]);
            }
        }
        ("Set", "toList") => {
            if let Some(e) = obj_type.generic_args.first() {
                gen.register_instance("List", &[e.clone()]);
            }
        }
        _ => {}
    }

    let mut call_args = vec![obj];
    call_args.extend(args);
    IrExpr::call(format!("{}_{}", mangled, method), call_args)
}

