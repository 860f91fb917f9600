// User-defined generic class monomorphization: struct + complete
// method set per concrete instantiation, with type parameters
// substituted throughout. Method bodies are pre-rendered into raw
// sections so they precede ordinary function definitions.

use btrc_ast::TypeExpr;
use btrc_resolver::{ClassInfo, MethodInfo};
use indexmap::{IndexMap, IndexSet};

use super::super::statements::lower_block;
use super::super::types::{
    is_collection_type, is_generic_class_type, mangle_generic_type, resolve_type,
};
use super::super::IrGenerator;
use crate::emitter::render_function_def;
use crate::ir::{CType, IrBlock, IrExpr, IrFunctionDef, IrParam, IrStmt, IrStructDef, IrStructField};

pub(crate) fn emit_user_generic_instance(
    gen: &mut IrGenerator,
    seen: &mut IndexSet<String>,
    base: &str,
    args: &[TypeExpr],
) {
    let Some(cls_info) = gen.analyzed.class_table.get(base).cloned() else {
        return;
    };
    let mangled = mangle_generic_type(base, args);

    let mut type_map = IndexMap::new();
    for (i, gp) in cls_info.generic_params.iter().enumerate() {
        if let Some(a) = args.get(i) {
            type_map.insert(gp.clone(), a.clone());
        }
    }

    // Transitive dependencies: resolving a field/method type can name
    // another generic instance (ListNode<string> out of a
    // List<string>-shaped class). Emit those first so their statics
    // precede this instance's method bodies.
    for fd in cls_info.fields.values() {
        let resolved = resolve_type(&fd.ty, &type_map);
        ensure_resolved_deps(gen, seen, &resolved);
    }
    for m in cls_info.methods.values() {
        if let Some(rt) = &m.return_type {
            ensure_resolved_deps(gen, seen, &resolve_type(rt, &type_map));
        }
        for p in &m.params {
            ensure_resolved_deps(gen, seen, &resolve_type(&p.ty, &type_map));
        }
    }

    // Struct with resolved field types; __rc leads for ARC.
    let mut fields = vec![IrStructField {
        c_type: CType::new("int"),
        name: "__rc".to_string(),
    }];
    let saved_map = std::mem::replace(&mut gen.type_map, type_map);
    for (name, fd) in &cls_info.fields {
        let c = gen.ctype(Some(&fd.ty));
        fields.push(IrStructField {
            c_type: CType::new(c),
            name: name.clone(),
        });
    }
    for (pname, prop) in &cls_info.properties {
        let c = gen.ctype(Some(&prop.ty));
        fields.push(IrStructField {
            c_type: CType::new(c),
            name: format!("_prop_{}", pname),
        });
    }
    gen.module.struct_defs.push(IrStructDef {
        name: mangled.clone(),
        fields,
    });

    // Methods lower under the substitution context; rendered text
    // goes into raw sections.
    let saved_class = gen.current_class.replace(base.to_string());

    let mut rendered = Vec::new();
    rendered.push(emit_generic_ctor_init(gen, &mangled, &cls_info));
    rendered.push(emit_generic_new(gen, &mangled, &cls_info));
    rendered.push(emit_generic_destructor(gen, &mangled, &cls_info));
    if cls_info.is_cyclable {
        emit_generic_visit(gen, &mangled, &cls_info);
    }

    let uses_free_as_dtor = cls_info.methods.contains_key("free");
    for (mname, method) in &cls_info.methods {
        if mname == "__del__" || (uses_free_as_dtor && mname == "free") {
            continue;
        }
        rendered.push(emit_generic_method(gen, &mangled, method));
    }
    for (pname, prop) in &cls_info.properties {
        rendered.extend(emit_generic_property(gen, &mangled, pname, prop));
    }

    gen.current_class = saved_class;
    gen.type_map = saved_map;

    gen.module.raw_sections.push(rendered.join("\n"));
}

fn ensure_resolved_deps(gen: &mut IrGenerator, seen: &mut IndexSet<String>, t: &TypeExpr) {
    if !t.generic_args.is_empty() {
        let is_builtin = matches!(t.base.as_str(), "List" | "Map" | "Set");
        let is_user_generic = gen
            .analyzed
            .class_table
            .get(&t.base)
            .is_some_and(|c| !c.generic_params.is_empty());
        if is_builtin || is_user_generic {
            super::ensure_instance(gen, seen, &t.base, &t.generic_args);
        }
    }
    for arg in &t.generic_args {
        ensure_resolved_deps(gen, seen, arg);
    }
}

fn generic_params_ir(gen: &mut IrGenerator, method: &MethodInfo) -> Vec<IrParam> {
    method
        .params
        .iter()
        .map(|p| IrParam {
            c_type: CType::new(gen.ctype(Some(&p.ty))),
            name: p.name.clone(),
        })
        .collect()
}

fn emit_generic_ctor_init(gen: &mut IrGenerator, mangled: &str, cls_info: &ClassInfo) -> String {
    let mut params = vec![IrParam {
        c_type: CType::new(format!("{}*", mangled)),
        name: "self".to_string(),
    }];
    let mut body = Vec::new();

    for (fname, fd) in &cls_info.fields {
        if let Some(init) = &fd.initializer {
            let resolved = resolve_type(&fd.ty, &gen.type_map);
            let value = super::super::classes::lower_field_init(gen, &resolved, init);
            body.push(IrStmt::Assign {
                target: IrExpr::field(IrExpr::var("self"), fname.clone(), true),
                value,
            });
        }
    }

    if let Some(ctor) = &cls_info.constructor {
        params.extend(generic_params_ir(gen, ctor));
        if let Some(b) = &ctor.body {
            let block = lower_block(gen, b);
            body.extend(block.stmts);
        }
    }

    render_function_def(&IrFunctionDef {
        name: format!("{}_init", mangled),
        return_type: CType::new("void"),
        params,
        body: IrBlock::new(body),
        is_static: true,
        source_line: None,
    })
}

fn emit_generic_new(gen: &mut IrGenerator, mangled: &str, cls_info: &ClassInfo) -> String {
    let ctor_params = cls_info
        .constructor
        .as_ref()
        .map(|c| generic_params_ir(gen, c))
        .unwrap_or_default();

    let body = vec![
        IrStmt::VarDecl {
            c_type: CType::new(format!("{}*", mangled)),
            name: "self".to_string(),
            init: Some(IrExpr::cast(
                format!("{}*", mangled),
                IrExpr::call("malloc", vec![IrExpr::raw(format!("sizeof({})", mangled))]),
            )),
        },
        IrStmt::ExprStmt {
            expr: IrExpr::call(
                "memset",
                vec![
                    IrExpr::var("self"),
                    IrExpr::lit("0"),
                    IrExpr::raw(format!("sizeof({})", mangled)),
                ],
            ),
        },
        IrStmt::ExprStmt {
            expr: IrExpr::call(
                format!("{}_init", mangled),
                std::iter::once(IrExpr::var("self"))
                    .chain(ctor_params.iter().map(|p| IrExpr::var(&p.name)))
                    .collect(),
            ),
        },
        IrStmt::Assign {
            target: IrExpr::field(IrExpr::var("self"), "__rc", true),
            value: IrExpr::lit("1"),
        },
        IrStmt::Return {
            value: Some(IrExpr::var("self")),
        },
    ];

    render_function_def(&IrFunctionDef {
        name: format!("{}_new", mangled),
        return_type: CType::new(format!("{}*", mangled)),
        params: ctor_params,
        body: IrBlock::new(body),
        is_static: true,
        source_line: None,
    })
}

/// A method literally named `free` serves as the destructor;
/// otherwise `destroy` is generated with automatic field releases.
fn emit_generic_destructor(gen: &mut IrGenerator, mangled: &str, cls_info: &ClassInfo) -> String {
    let (dtor_name, user_body) = if let Some(free_m) = cls_info.methods.get("free") {
        (format!("{}_free", mangled), free_m.body.clone())
    } else {
        (
            format!("{}_destroy", mangled),
            cls_info.methods.get("__del__").and_then(|m| m.body.clone()),
        )
    };

    let mut body = Vec::new();
    if let Some(b) = &user_body {
        let block = lower_block(gen, b);
        body.extend(block.stmts);
    }

    for (fname, fd) in &cls_info.fields {
        let resolved = resolve_type(&fd.ty, &gen.type_map);
        if resolved.pointer_depth > 1 || resolved.is_array {
            continue;
        }
        if is_collection_type(Some(&resolved)) {
            let field_mangled = mangle_generic_type(&resolved.base, &resolved.generic_args);
            let fa = IrExpr::field(IrExpr::var("self"), fname.clone(), true);
            body.push(IrStmt::If {
                condition: IrExpr::binop(fa.clone(), "!=", IrExpr::lit("NULL")),
                then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                    expr: IrExpr::call(format!("{}_free", field_mangled), vec![fa]),
                }]),
                else_block: None,
            });
        } else if is_generic_class_type(Some(&resolved), &gen.analyzed.class_table) {
            let field_mangled = mangle_generic_type(&resolved.base, &resolved.generic_args);
            let dtor = super::super::arc::destroy_fn_for_managed(gen, &field_mangled);
            body.push(field_release(fname, &dtor));
        } else if gen.analyzed.class_table.contains_key(&resolved.base) {
            let dtor = super::super::arc::destroy_fn_for_managed(gen, &resolved.base);
            body.push(field_release(fname, &dtor));
        }
    }

    body.push(IrStmt::ExprStmt {
        expr: IrExpr::call("free", vec![IrExpr::var("self")]),
    });

    render_function_def(&IrFunctionDef {
        name: dtor_name,
        return_type: CType::new("void"),
        params: vec![IrParam {
            c_type: CType::new(format!("{}*", mangled)),
            name: "self".to_string(),
        }],
        body: IrBlock::new(body),
        is_static: true,
        source_line: None,
    })
}

fn field_release(field_name: &str, destroy_fn: &str) -> IrStmt {
    let fa = IrExpr::field(IrExpr::var("self"), field_name, true);
    IrStmt::If {
        condition: IrExpr::binop(fa.clone(), "!=", IrExpr::lit("NULL")),
        then_block: IrBlock::new(vec![IrStmt::If {
            condition: IrExpr::binop(
                IrExpr::UnaryOp {
                    op: "--".to_string(),
                    operand: Box::new(IrExpr::field(fa.clone(), "__rc", true)),
                    prefix: true,
                },
                "<=",
                IrExpr::lit("0"),
            ),
            then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                expr: IrExpr::call(destroy_fn, vec![fa]),
            }]),
            else_block: None,
        }]),
        else_block: None,
    }
}

fn emit_generic_visit(gen: &mut IrGenerator, mangled: &str, cls_info: &ClassInfo) {
    let mut lines = vec![
        format!(
            "static void {}_visit(void* __obj, void (*__cb)(void*)) {{",
            mangled
        ),
        format!("    {}* self = ({}*)__obj;", mangled, mangled),
    ];
    for (fname, fd) in &cls_info.fields {
        let resolved = resolve_type(&fd.ty, &gen.type_map);
        if resolved.pointer_depth > 1 || resolved.is_array {
            continue;
        }
        let is_class = gen.analyzed.class_table.contains_key(&resolved.base)
            && !is_collection_type(Some(&resolved));
        if is_class {
            lines.push(format!(
                "    if (self->{} != NULL) __cb((void*)self->{});",
                fname, fname
            ));
        }
    }
    lines.push("}".to_string());
    gen.module.raw_sections.push(lines.join("\n"));
}

fn emit_generic_method(gen: &mut IrGenerator, mangled: &str, method: &MethodInfo) -> String {
    let mut params = Vec::new();
    if !method.is_static {
        params.push(IrParam {
            c_type: CType::new(format!("{}*", mangled)),
            name: "self".to_string(),
        });
    }
    params.extend(generic_params_ir(gen, method));
    let ret_type = gen.ctype(method.return_type.as_ref());

    let saved_keep = gen.current_fn_keep_return;
    gen.current_fn_keep_return = method.keep_return;
    let body = match &method.body {
        Some(b) => lower_block(gen, b),
        None => IrBlock::default(),
    };
    gen.current_fn_keep_return = saved_keep;

    render_function_def(&IrFunctionDef {
        name: format!("{}_{}", mangled, method.name),
        return_type: CType::new(ret_type),
        params,
        body,
        is_static: true,
        source_line: None,
    })
}

fn emit_generic_property(
    gen: &mut IrGenerator,
    mangled: &str,
    pname: &str,
    prop: &btrc_resolver::PropertyInfo,
) -> Vec<String> {
    let prop_type = gen.ctype(Some(&prop.ty));
    let backing = format!("_prop_{}", pname);
    let mut out = Vec::new();

    if prop.has_getter {
        let body = match &prop.getter_body {
            Some(b) => lower_block(gen, b),
            None => IrBlock::new(vec![IrStmt::Return {
                value: Some(IrExpr::field(IrExpr::var("self"), backing.clone(), true)),
            }]),
        };
        out.push(render_function_def(&IrFunctionDef {
            name: format!("{}_get_{}", mangled, pname),
            return_type: CType::new(prop_type.clone()),
            params: vec![IrParam {
                c_type: CType::new(format!("{}*", mangled)),
                name: "self".to_string(),
            }],
            body,
            is_static: true,
            source_line: None,
        }));
    }
    if prop.has_setter {
        let body = match &prop.setter_body {
            Some(b) => lower_block(gen, b),
            None => IrBlock::new(vec![IrStmt::Assign {
                target: IrExpr::field(IrExpr::var("self"), backing, true),
                value: IrExpr::var("value"),
            }]),
        };
        out.push(render_function_def(&IrFunctionDef {
            name: format!("{}_set_{}", mangled, pname),
            return_type: CType::new("void"),
            params: vec![
                IrParam {
                    c_type: CType::new(format!("{}*", mangled)),
                    name: "self".to_string(),
                },
                IrParam {
                    c_type: CType::new(prop_type),
                    name: "value".to_string(),
                },
            ],
            body,
            is_static: true,
            source_line: None,
        }));
    }
    out
}
