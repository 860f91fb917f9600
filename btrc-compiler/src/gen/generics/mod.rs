// Generic monomorphization: one struct + method set per concrete
// (base, type-args) instance, de-duplicated on mangled name.
//
// Emission is a worklist: lowering user-generic bodies can discover
// transitive instances (a List<string>-like class with a ListNode<T>
// field needs ListNode<string>), which are appended to the working
// instance table and emitted before their dependents.

use btrc_ast::TypeExpr;
use indexmap::IndexSet;

use super::types::{is_concrete_instance, mangle_generic_type};
use super::IrGenerator;

mod lists;
mod maps;
mod sets;
mod user;

pub fn emit_generic_instances(gen: &mut IrGenerator) {
    let mut seen: IndexSet<String> = IndexSet::new();
    loop {
        let mut work = Vec::new();
        for (base, instances) in &gen.generic_instances {
            for args in instances {
                if !is_concrete_instance(args) {
                    continue;
                }
                let mangled = mangle_generic_type(base, args);
                if !seen.contains(&mangled) {
                    work.push((base.clone(), args.clone()));
                }
            }
        }
        if work.is_empty() {
            break;
        }
        for (base, args) in work {
            ensure_instance(gen, &mut seen, &base, &args);
        }
    }
}

/// Emit one instance (and its dependencies) if not already emitted.
pub(crate) fn ensure_instance(
    gen: &mut IrGenerator,
    seen: &mut IndexSet<String>,
    base: &str,
    args: &[TypeExpr],
) {
    if args.is_empty() || !is_concrete_instance(args) {
        return;
    }
    let mangled = mangle_generic_type(base, args);
    if !seen.insert(mangled.clone()) {
        return;
    }
    // Transitive discoveries must land in the instance table too, so
    // forward decls exist even for instances found mid-emission.
    gen.register_instance(base, args);
    let fwd = format!("typedef struct {} {};", mangled, mangled);
    if !gen.module.forward_decls.contains(&fwd)
        && base != "Thread"
        && base != "Mutex"
        && base != "Tuple"
    {
        gen.module.forward_decls.push(fwd);
    }

    match base {
        "List" => lists::emit_list_instance(gen, seen, args),
        "Map" => maps::emit_map_instance(gen, seen, args),
        "Set" => sets::emit_set_instance(gen, seen, args),
        // Opaque handles, no struct to monomorphize.
        "Thread" | "Mutex" | "Tuple" | "__fn_ptr" => {}
        _ => user::emit_user_generic_instance(gen, seen, base, args),
    }
}

/// String-aware comparison helpers for element types.
pub(crate) fn eq_expr(elem_c: &str, a: &str, b: &str) -> String {
    if elem_c == "char*" {
        format!("strcmp({}, {}) == 0", a, b)
    } else {
        format!("{} == {}", a, b)
    }
}

pub(crate) fn gt_expr(elem_c: &str, a: &str, b: &str) -> String {
    if elem_c == "char*" {
        format!("strcmp({}, {}) > 0", a, b)
    } else {
        format!("{} > {}", a, b)
    }
}

pub(crate) fn lt_expr(elem_c: &str, a: &str, b: &str) -> String {
    if elem_c == "char*" {
        format!("strcmp({}, {}) < 0", a, b)
    } else {
        format!("{} < {}", a, b)
    }
}
