// Class member lowering: constructor, destructor, methods,
// properties, inherited-method wrappers, cycle visit functions.

use btrc_ast::*;
use btrc_resolver::ClassInfo;

use super::classes::{ancestor_chain, lower_field_init};
use super::statements::lower_block;
use super::types::{is_collection_type, is_generic_class_type, mangle_generic_type};
use super::IrGenerator;
use crate::ir::{CType, IrBlock, IrExpr, IrFunctionDef, IrParam, IrStmt};

/// ClassName_init(self, ...) and ClassName_new(...).
pub fn emit_constructor(gen: &mut IrGenerator, decl: &ClassDecl, cls_info: &ClassInfo) {
    let name = &decl.name;
    let ctor = cls_info.constructor.clone();

    let ctor_params: Vec<IrParam> = ctor
        .as_ref()
        .map(|c| {
            c.params
                .iter()
                .map(|p| IrParam {
                    c_type: CType::new(gen.ctype(Some(&p.ty))),
                    name: p.name.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let mut init_params = vec![IrParam {
        c_type: CType::new(format!("{}*", name)),
        name: "self".to_string(),
    }];
    init_params.extend(ctor_params.clone());

    let mut init_body = Vec::new();

    // Field defaults, ancestors first, then the user constructor body.
    for ancestor in ancestor_chain(gen, cls_info) {
        let Some(parent) = gen.analyzed.class_table.get(&ancestor).cloned() else {
            continue;
        };
        for (fname, fd) in &parent.fields {
            if let Some(init) = &fd.initializer {
                let value = lower_field_init(gen, &fd.ty, init);
                init_body.push(IrStmt::Assign {
                    target: IrExpr::field(IrExpr::var("self"), fname.clone(), true),
                    value,
                });
            }
        }
    }
    for member in &decl.members {
        if let ClassMember::Field(f) = member {
            if let Some(init) = &f.initializer {
                let value = lower_field_init(gen, &f.ty, init);
                init_body.push(IrStmt::Assign {
                    target: IrExpr::field(IrExpr::var("self"), f.name.clone(), true),
                    value,
                });
            }
        }
    }

    if let Some(ctor) = &ctor {
        if let Some(body) = &ctor.body {
            let user_block = lower_block(gen, body);
            init_body.extend(user_block.stmts);
        }
    }

    gen.module.function_defs.push(IrFunctionDef {
        name: format!("{}_init", name),
        return_type: CType::new("void"),
        params: init_params,
        body: IrBlock::new(init_body),
        is_static: false,
        source_line: Some(decl.line),
    });

    // _new: malloc + zero + init + rc birth + return.
    let new_body = vec![
        IrStmt::VarDecl {
            c_type: CType::new(format!("{}*", name)),
            name: "self".to_string(),
            init: Some(IrExpr::cast(
                format!("{}*", name),
                IrExpr::call("malloc", vec![IrExpr::raw(format!("sizeof({})", name))]),
            )),
        },
        IrStmt::ExprStmt {
            expr: IrExpr::call(
                "memset",
                vec![
                    IrExpr::var("self"),
                    IrExpr::lit("0"),
                    IrExpr::raw(format!("sizeof({})", name)),
                ],
            ),
        },
        IrStmt::ExprStmt {
            expr: IrExpr::call(
                format!("{}_init", name),
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

    gen.module.function_defs.push(IrFunctionDef {
        name: format!("{}_new", name),
        return_type: CType::new(format!("{}*", name)),
        params: ctor_params,
        body: IrBlock::new(new_body),
        is_static: false,
        source_line: Some(decl.line),
    });
}

/// ClassName_destroy(self): optional __del__ body, owned-field
/// releases, destroyed-tracking hook, free(self).
pub fn emit_destructor(gen: &mut IrGenerator, decl: &ClassDecl, cls_info: &ClassInfo) {
    let name = &decl.name;
    let mut body = Vec::new();

    if let Some(dtor) = cls_info.methods.get("__del__").cloned() {
        if let Some(b) = &dtor.body {
            let block = lower_block(gen, b);
            body.extend(block.stmts);
        }
    }

    // Release owned fields. Class types are single pointers in the
    // analyzer; skip double-pointers and raw arrays.
    let mut has_class_field_releases = false;
    for (fname, fd) in &cls_info.fields {
        if fd.ty.pointer_depth > 1 || fd.ty.is_array {
            continue;
        }
        if is_collection_type(Some(&fd.ty)) {
            let mangled = mangle_generic_type(&fd.ty.base, &fd.ty.generic_args);
            let fa = IrExpr::field(IrExpr::var("self"), fname.clone(), true);
            body.push(IrStmt::If {
                condition: IrExpr::binop(fa.clone(), "!=", IrExpr::lit("NULL")),
                then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                    expr: IrExpr::call(format!("{}_free", mangled), vec![fa]),
                }]),
                else_block: None,
            });
        } else if is_generic_class_type(Some(&fd.ty), &gen.analyzed.class_table) {
            let mangled = mangle_generic_type(&fd.ty.base, &fd.ty.generic_args);
            let dtor = super::arc::destroy_fn_for_managed(gen, &mangled);
            body.push(emit_field_release(fname, &dtor));
            has_class_field_releases = true;
        } else if gen.analyzed.class_table.contains_key(&fd.ty.base) {
            let dtor = super::arc::destroy_fn_for_managed(gen, &fd.ty.base);
            body.push(emit_field_release(fname, &dtor));
            has_class_field_releases = true;
        }
    }

    // Cascading destructors can free objects whose locals are still
    // non-NULL; record them while phased release is tracking. The
    // __btrc_tracking flag is only ever set during phased release, so
    // this is free otherwise.
    if has_class_field_releases {
        gen.use_helper("__btrc_destroyed_tracking");
        body.push(IrStmt::If {
            condition: IrExpr::var("__btrc_tracking"),
            then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                expr: IrExpr::Call {
                    callee: "__btrc_mark_destroyed".to_string(),
                    helper_ref: "__btrc_destroyed_tracking".to_string(),
                    args: vec![IrExpr::var("self")],
                },
            }]),
            else_block: None,
        });
    }

    body.push(IrStmt::ExprStmt {
        expr: IrExpr::call("free", vec![IrExpr::var("self")]),
    });

    gen.module.function_defs.push(IrFunctionDef {
        name: format!("{}_destroy", name),
        return_type: CType::new("void"),
        params: vec![IrParam {
            c_type: CType::new(format!("{}*", name)),
            name: "self".to_string(),
        }],
        body: IrBlock::new(body),
        is_static: false,
        source_line: Some(decl.line),
    });
}

/// `if (self->f) { if (--self->f->__rc <= 0) destroy(self->f); }`
fn emit_field_release(field_name: &str, destroy_fn: &str) -> IrStmt {
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

/// Cycle-collector visitor: invokes the callback on every class-typed
/// field. Registered with __btrc_suspect during phased release.
pub fn emit_visit_fn(gen: &mut IrGenerator, name: &str, cls_info: &ClassInfo) {
    let mut lines = vec![
        format!("static void {}_visit(void* __obj, void (*__cb)(void*)) {{", name),
        format!("    {}* self = ({}*)__obj;", name, name),
    ];
    for (fname, fd) in &cls_info.fields {
        if fd.ty.pointer_depth > 1 || fd.ty.is_array {
            continue;
        }
        if gen.analyzed.class_table.contains_key(&fd.ty.base) && fd.ty.generic_args.is_empty() {
            lines.push(format!(
                "    if (self->{} != NULL) __cb((void*)self->{});",
                fname, fname
            ));
        }
    }
    lines.push("}".to_string());
    gen.module.raw_sections.push(lines.join("\n"));
}

/// ClassName_methodname(self, ...) as a free function. Static methods
/// omit the self parameter.
pub fn emit_method(gen: &mut IrGenerator, decl: &ClassDecl, method: &MethodDecl) {
    let name = &decl.name;
    let mut params = Vec::new();
    if !method.is_static {
        params.push(IrParam {
            c_type: CType::new(format!("{}*", name)),
            name: "self".to_string(),
        });
    }
    for p in &method.params {
        params.push(IrParam {
            c_type: CType::new(gen.ctype(Some(&p.ty))),
            name: p.name.clone(),
        });
    }

    let ret_type = gen.ctype(method.return_type.as_ref());

    let saved_keep = gen.current_fn_keep_return;
    gen.current_fn_keep_return = method.keep_return;
    let body = match &method.body {
        Some(b) => lower_block(gen, b),
        None => IrBlock::default(),
    };
    gen.current_fn_keep_return = saved_keep;

    gen.module.function_defs.push(IrFunctionDef {
        name: format!("{}_{}", name, method.name),
        return_type: CType::new(ret_type),
        params,
        body,
        is_static: false,
        source_line: Some(method.line),
    });
}

/// Getter/setter functions for a property. Auto accessors read/write
/// the `_prop_<name>` backing field.
pub fn emit_property(gen: &mut IrGenerator, decl: &ClassDecl, prop: &PropertyDecl) {
    let name = &decl.name;
    let prop_type = gen.ctype(Some(&prop.ty));
    let backing = format!("_prop_{}", prop.name);

    if prop.has_getter {
        let body = match &prop.getter_body {
            Some(b) => {
                gen.push_managed_scope();
                let block = lower_block(gen, b);
                gen.pop_managed_scope();
                block
            }
            None => IrBlock::new(vec![IrStmt::Return {
                value: Some(IrExpr::field(IrExpr::var("self"), backing.clone(), true)),
            }]),
        };
        gen.module.function_defs.push(IrFunctionDef {
            name: format!("{}_get_{}", name, prop.name),
            return_type: CType::new(prop_type.clone()),
            params: vec![IrParam {
                c_type: CType::new(format!("{}*", name)),
                name: "self".to_string(),
            }],
            body,
            is_static: false,
            source_line: Some(decl.line),
        });
    }

    if prop.has_setter {
        let body = match &prop.setter_body {
            Some(b) => {
                gen.push_managed_scope();
                let block = lower_block(gen, b);
                gen.pop_managed_scope();
                block
            }
            None => IrBlock::new(vec![IrStmt::Assign {
                target: IrExpr::field(IrExpr::var("self"), backing, true),
                value: IrExpr::var("value"),
            }]),
        };
        gen.module.function_defs.push(IrFunctionDef {
            name: format!("{}_set_{}", name, prop.name),
            return_type: CType::new("void"),
            params: vec![
                IrParam {
                    c_type: CType::new(format!("{}*", name)),
                    name: "self".to_string(),
                },
                IrParam {
                    c_type: CType::new(prop_type),
                    name: "value".to_string(),
                },
            ],
            body,
            is_static: false,
            source_line: Some(decl.line),
        });
    }
}

/// Wrapper functions for inherited methods not overridden:
/// `C_m(self, ...) { return P_m((P*)self, ...); }` for every ancestor.
pub fn emit_inherited_methods(
    gen: &mut IrGenerator,
    decl: &ClassDecl,
    cls_info: &ClassInfo,
    mut own_methods: Vec<String>,
) {
    let mut parent_name = cls_info.parent.clone();
    while let Some(pname) = parent_name {
        let Some(parent_info) = gen.analyzed.class_table.get(&pname).cloned() else {
            break;
        };
        for (mname, method) in &parent_info.methods {
            if own_methods.iter().any(|m| m == mname)
                || mname == "__del__"
                || mname == &pname
            {
                continue;
            }
            own_methods.push(mname.clone());

            let mut params = vec![IrParam {
                c_type: CType::new(format!("{}*", decl.name)),
                name: "self".to_string(),
            }];
            let mut call_args = vec![IrExpr::cast(format!("{}*", pname), IrExpr::var("self"))];
            for p in &method.params {
                params.push(IrParam {
                    c_type: CType::new(gen.ctype(Some(&p.ty))),
                    name: p.name.clone(),
                });
                call_args.push(IrExpr::var(&p.name));
            }
            let ret_type = gen.ctype(method.return_type.as_ref());
            let call = IrExpr::call(format!("{}_{}", pname, mname), call_args);
            let body = if ret_type == "void" {
                IrBlock::new(vec![IrStmt::ExprStmt { expr: call }])
            } else {
                IrBlock::new(vec![IrStmt::Return { value: Some(call) }])
            };
            gen.module.function_defs.push(IrFunctionDef {
                name: format!("{}_{}", decl.name, mname),
                return_type: CType::new(ret_type),
                params,
                body,
                is_static: false,
                source_line: Some(decl.line),
            });
        }
        parent_name = parent_info.parent.clone();
    }
}
