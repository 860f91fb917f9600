// Enum lowering: EnumDecl and RichEnumDecl → IR.

use btrc_ast::*;

use super::expressions::lower_expr;
use super::statements::quick_text;
use super::IrGenerator;
use crate::ir::{
    CType, IrBlock, IrCase, IrEnumDef, IrEnumValue, IrExpr, IrFunctionDef, IrParam, IrStmt,
    IrStructDef, IrStructField,
};

pub fn emit_enum_decls(gen: &mut IrGenerator) {
    let decls = gen.analyzed.program.declarations.clone();
    for decl in &decls {
        match decl {
            Decl::Enum(e) => emit_enum(gen, e),
            Decl::RichEnum(e) => emit_rich_enum(gen, e),
            _ => {}
        }
    }
}

/// Simple enum: C enum plus a `toString` switch over the variants.
fn emit_enum(gen: &mut IrGenerator, decl: &EnumDecl) {
    let values = decl
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let value = match &v.value {
                Some(e) => {
                    let ir = lower_expr(gen, e);
                    Some(quick_text(&ir))
                }
                None => Some(i.to_string()),
            };
            IrEnumValue {
                name: format!("{}_{}", decl.name, v.name),
                value,
            }
        })
        .collect();
    gen.module.enum_defs.push(IrEnumDef {
        name: decl.name.clone(),
        values,
    });

    let mut cases: Vec<IrCase> = decl
        .values
        .iter()
        .map(|v| IrCase {
            value: Some(IrExpr::lit(format!("{}_{}", decl.name, v.name))),
            body: vec![IrStmt::Return {
                value: Some(IrExpr::lit(format!("\"{}\"", v.name))),
            }],
        })
        .collect();
    cases.push(IrCase {
        value: None,
        body: vec![IrStmt::Return {
            value: Some(IrExpr::lit("\"unknown\"")),
        }],
    });

    gen.module.function_defs.push(IrFunctionDef {
        name: format!("{}_toString", decl.name),
        return_type: CType::new("const char*"),
        params: vec![IrParam {
            c_type: CType::new(decl.name.clone()),
            name: "val".to_string(),
        }],
        is_static: true,
        source_line: None,
        body: IrBlock::new(vec![IrStmt::Switch {
            value: IrExpr::var("val"),
            cases,
        }]),
    });
}

/// Rich enum: tag enum + per-variant data structs + tagged union +
/// one constructor per variant + `toString` on the tag.
fn emit_rich_enum(gen: &mut IrGenerator, decl: &RichEnumDecl) {
    let name = &decl.name;

    let tag_values = decl
        .variants
        .iter()
        .enumerate()
        .map(|(i, v)| IrEnumValue {
            name: format!("{}_{}_TAG", name, v.name),
            value: Some(i.to_string()),
        })
        .collect();
    gen.module.enum_defs.push(IrEnumDef {
        name: format!("{}_Tag", name),
        values: tag_values,
    });

    // Data structs for variants carrying parameters.
    for v in &decl.variants {
        if v.params.is_empty() {
            continue;
        }
        let struct_name = format!("{}_{}_Data", name, v.name);
        gen.module
            .forward_decls
            .push(format!("typedef struct {} {};", struct_name, struct_name));
        let fields = v
            .params
            .iter()
            .map(|p| IrStructField {
                c_type: CType::new(gen.ctype(Some(&p.ty))),
                name: p.name.clone(),
            })
            .collect();
        gen.module.struct_defs.push(IrStructDef {
            name: struct_name,
            fields,
        });
    }

    // Wrapping struct: tag + anonymous union of variant data.
    // IrStructDef cannot express unions; keep as raw C text. The
    // typedef goes in the forward block so by-value signatures can
    // name the (then-incomplete) type early.
    gen.module
        .forward_decls
        .push(format!("typedef struct {} {};", name, name));
    let union_fields: Vec<String> = decl
        .variants
        .iter()
        .filter(|v| !v.params.is_empty())
        .map(|v| format!("        {}_{}_Data {};", name, v.name, v.name))
        .collect();
    if union_fields.is_empty() {
        gen.module.raw_sections.push(format!(
            "struct {} {{\n    {}_Tag tag;\n}};",
            name, name
        ));
    } else {
        gen.module.raw_sections.push(format!(
            "struct {} {{\n    {}_Tag tag;\n    union {{\n{}\n    }} data;\n}};",
            name,
            name,
            union_fields.join("\n")
        ));
    }

    // One constructor per variant, returning the wrapping value.
    for v in &decl.variants {
        let params: Vec<IrParam> = v
            .params
            .iter()
            .map(|p| IrParam {
                c_type: CType::new(gen.ctype(Some(&p.ty))),
                name: p.name.clone(),
            })
            .collect();

        let mut body = vec![
            IrStmt::VarDecl {
                c_type: CType::new(name.clone()),
                name: "c".to_string(),
                init: None,
            },
            IrStmt::Assign {
                target: IrExpr::field(IrExpr::var("c"), "tag", false),
                value: IrExpr::lit(format!("{}_{}_TAG", name, v.name)),
            },
        ];
        for p in &v.params {
            body.push(IrStmt::Assign {
                target: IrExpr::field(
                    IrExpr::field(IrExpr::field(IrExpr::var("c"), "data", false), &v.name, false),
                    p.name.clone(),
                    false,
                ),
                value: IrExpr::var(&p.name),
            });
        }
        body.push(IrStmt::Return {
            value: Some(IrExpr::var("c")),
        });

        gen.module.function_defs.push(IrFunctionDef {
            name: format!("{}_{}", name, v.name),
            return_type: CType::new(name.clone()),
            params,
            is_static: true,
            source_line: None,
            body: IrBlock::new(body),
        });
    }

    // toString on the tag.
    let mut cases: Vec<IrCase> = decl
        .variants
        .iter()
        .map(|v| IrCase {
            value: Some(IrExpr::lit(format!("{}_{}_TAG", name, v.name))),
            body: vec![IrStmt::Return {
                value: Some(IrExpr::lit(format!("\"{}\"", v.name))),
            }],
        })
        .collect();
    cases.push(IrCase {
        value: None,
        body: vec![IrStmt::Return {
            value: Some(IrExpr::lit("\"unknown\"")),
        }],
    });

    gen.module.function_defs.push(IrFunctionDef {
        name: format!("{}_toString", name),
        return_type: CType::new("const char*"),
        params: vec![IrParam {
            c_type: CType::new(name.clone()),
            name: "val".to_string(),
        }],
        is_static: true,
        source_line: None,
        body: IrBlock::new(vec![IrStmt::Switch {
            value: IrExpr::field(IrExpr::var("val"), "tag", false),
            cases,
        }]),
    });
}
