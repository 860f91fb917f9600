// Class lowering: ClassDecl → struct + ctor/dtor/method function defs.

use btrc_ast::*;
use btrc_resolver::ClassInfo;

use super::class_members;
use super::expressions::lower_expr;
use super::types::{is_collection_type, mangle_generic_type};
use super::IrGenerator;
use crate::ir::{CType, IrExpr, IrStructDef, IrStructField};

/// Plain struct (not class) definition.
pub fn emit_struct_decl(gen: &mut IrGenerator, decl: &StructDecl) {
    let fields = decl
        .fields
        .iter()
        .map(|f| IrStructField {
            c_type: CType::new(gen.ctype(Some(&f.ty))),
            name: f.name.clone(),
        })
        .collect();
    gen.module.struct_defs.push(IrStructDef {
        name: decl.name.clone(),
        fields,
    });
}

/// A class: struct + constructor + destructor + methods + accessors.
pub fn emit_class_decl(gen: &mut IrGenerator, decl: &ClassDecl) {
    let Some(cls_info) = gen.analyzed.class_table.get(&decl.name).cloned() else {
        return;
    };

    gen.current_class = Some(decl.name.clone());

    emit_class_struct(gen, decl, &cls_info);
    class_members::emit_constructor(gen, decl, &cls_info);
    class_members::emit_destructor(gen, decl, &cls_info);
    if cls_info.is_cyclable {
        class_members::emit_visit_fn(gen, &decl.name, &cls_info);
    }

    let mut own_methods: Vec<String> = Vec::new();
    for member in &decl.members {
        match member {
            ClassMember::Method(m) if m.name != decl.name && m.name != "__del__" => {
                class_members::emit_method(gen, decl, m);
                own_methods.push(m.name.clone());
            }
            ClassMember::Property(p) => {
                class_members::emit_property(gen, decl, p);
            }
            _ => {}
        }
    }

    // Accessor wrappers for inherited methods not overridden.
    if cls_info
        .parent
        .as_ref()
        .is_some_and(|p| gen.analyzed.class_table.contains_key(p))
    {
        class_members::emit_inherited_methods(gen, decl, &cls_info, own_methods);
    }

    gen.current_class = None;
}

/// Ancestor chain fields (root first), then own fields, then property
/// backing fields. `__rc` leads every class struct so release code is
/// layout-agnostic.
fn emit_class_struct(gen: &mut IrGenerator, decl: &ClassDecl, cls_info: &ClassInfo) {
    let mut fields = vec![IrStructField {
        c_type: CType::new("int"),
        name: "__rc".to_string(),
    }];

    for ancestor in ancestor_chain(gen, cls_info) {
        let Some(parent) = gen.analyzed.class_table.get(&ancestor).cloned() else {
            continue;
        };
        for (name, fd) in &parent.fields {
            fields.push(IrStructField {
                c_type: CType::new(gen.ctype(Some(&fd.ty))),
                name: name.clone(),
            });
        }
    }

    for member in &decl.members {
        match member {
            ClassMember::Field(f) => {
                fields.push(IrStructField {
                    c_type: CType::new(gen.ctype(Some(&f.ty))),
                    name: f.name.clone(),
                });
            }
            ClassMember::Property(p) => {
                fields.push(IrStructField {
                    c_type: CType::new(gen.ctype(Some(&p.ty))),
                    name: format!("_prop_{}", p.name),
                });
            }
            _ => {}
        }
    }

    gen.module.struct_defs.push(IrStructDef {
        name: decl.name.clone(),
        fields,
    });
}

/// Parents from the root of the hierarchy down to the immediate one.
pub(crate) fn ancestor_chain(gen: &IrGenerator, cls_info: &ClassInfo) -> Vec<String> {
    let mut chain = Vec::new();
    let mut parent = cls_info.parent.clone();
    while let Some(p) = parent {
        if !gen.analyzed.class_table.contains_key(&p) || chain.contains(&p) {
            break;
        }
        chain.push(p.clone());
        parent = gen.analyzed.class_table.get(&p).and_then(|i| i.parent.clone());
    }
    chain.reverse();
    chain
}

/// Field initializer lowering with collection-literal awareness.
pub(crate) fn lower_field_init(gen: &mut IrGenerator, ty: &TypeExpr, init: &Expr) -> IrExpr {
    let empty = match &init.kind {
        ExprKind::BraceInit { elements } => elements.is_empty(),
        ExprKind::ListLiteral { elements } => elements.is_empty(),
        ExprKind::MapLiteral { entries } => entries.is_empty(),
        _ => false,
    };
    if empty && is_collection_type(Some(ty)) {
        let mangled = mangle_generic_type(&ty.base, &ty.generic_args);
        return IrExpr::call(format!("{}_new", mangled), vec![]);
    }
    lower_expr(gen, init)
}

/// `new ClassName(args)` → `ClassName_new(args)` (mangled for generic
/// instantiations).
pub fn lower_new_expr(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::New { ty, args } = &node.kind else {
        return IrExpr::lit("0");
    };
    let ty = if gen.type_map.is_empty() {
        ty.clone()
    } else {
        super::types::resolve_type(ty, &gen.type_map)
    };
    let type_name = if ty.generic_args.is_empty() {
        ty.base.clone()
    } else {
        gen.register_instance(&ty.base, &ty.generic_args);
        mangle_generic_type(&ty.base, &ty.generic_args)
    };
    let ir_args = args.iter().map(|a| lower_expr(gen, a)).collect();
    IrExpr::call(format!("{}_new", type_name), ir_args)
}
