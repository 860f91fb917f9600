// Type utilities for IR generation: btrc TypeExpr → C type string,
// name mangling, printf format selection.

use btrc_ast::TypeExpr;
use btrc_resolver::ClassInfo;
use indexmap::IndexMap;

/// Primitive btrc types → C type strings.
pub const PRIMITIVE_MAP: &[(&str, &str)] = &[
    ("int", "int"),
    ("float", "float"),
    ("double", "double"),
    ("bool", "bool"),
    ("char", "char"),
    ("string", "char*"),
    ("void", "void"),
    ("long", "long"),
    ("short", "short"),
    ("byte", "unsigned char"),
    ("uint", "unsigned int"),
    ("size_t", "size_t"),
];

/// Built-in generic collection types.
pub const BUILTIN_GENERICS: &[&str] = &["List", "Map", "Set"];

pub fn primitive_c(base: &str) -> Option<&'static str> {
    PRIMITIVE_MAP
        .iter()
        .find(|(b, _)| *b == base)
        .map(|(_, c)| *c)
}

/// Convert a btrc TypeExpr to a C type string.
///
/// Function-pointer types go through `fn_ptr_typedefs`, an interning
/// map owned by the generator (typedef text is flushed into forward
/// declarations after lowering).
pub fn type_to_c(t: Option<&TypeExpr>, fn_ptr_typedefs: &mut IndexMap<String, String>) -> String {
    let Some(t) = t else {
        return "void".to_string();
    };
    let base = t.base.as_str();

    if base == "__fn_ptr" && !t.generic_args.is_empty() {
        return fn_ptr_typedef_name(t, fn_ptr_typedefs);
    }

    // Thread<T> is an opaque handle, not a struct.
    if base == "Thread" {
        return "__btrc_thread_t*".to_string();
    }
    if base == "Mutex" {
        return "__btrc_mutex_t*".to_string();
    }

    let prefix = if t.is_const { "const " } else { "" };

    let mut c = if t.generic_args.is_empty() {
        match primitive_c(base) {
            Some(p) => p.to_string(),
            // User class/struct → struct name; classes are used as
            // pointers (see below).
            None => base.to_string(),
        }
    } else if base == "Tuple" {
        mangle_tuple_type(t)
    } else {
        format!("{}*", mangle_generic_type(base, &t.generic_args))
    };

    c.push_str(&"*".repeat(t.pointer_depth));
    if t.is_array {
        c.push('*');
    }

    format!("{}{}", prefix, c)
}

/// Like `type_to_c`, but user classes get their pointer star (classes
/// are always heap-allocated in emitted code).
pub fn type_to_c_with_classes(
    t: Option<&TypeExpr>,
    class_table: &IndexMap<String, ClassInfo>,
    fn_ptr_typedefs: &mut IndexMap<String, String>,
) -> String {
    let c = type_to_c(t, fn_ptr_typedefs);
    if let Some(t) = t {
        if t.generic_args.is_empty()
            && t.pointer_depth == 0
            && !t.is_array
            && class_table.contains_key(&t.base)
        {
            return format!("{}*", c);
        }
    }
    c
}

/// Get/create a typedef name for a function pointer type:
/// `__fn_ptr(ret, p1, p2)` → `__btrc_fn_<mangled>` with
/// `typedef ret (*__btrc_fn_<mangled>)(p1, p2);` interned.
pub fn fn_ptr_typedef_name(
    t: &TypeExpr,
    fn_ptr_typedefs: &mut IndexMap<String, String>,
) -> String {
    let ret_type = match t.generic_args.first() {
        Some(r) => type_to_c(Some(r), fn_ptr_typedefs),
        None => "void".to_string(),
    };
    let param_types: Vec<String> = t.generic_args[1..]
        .iter()
        .map(|a| type_to_c(Some(a), fn_ptr_typedefs))
        .collect();
    let parts: Vec<String> = t.generic_args.iter().map(mangle_type_name).collect();
    let mangled = format!("__btrc_fn_{}", parts.join("_"));
    if !fn_ptr_typedefs.contains_key(&mangled) {
        let params_str = if param_types.is_empty() {
            "void".to_string()
        } else {
            param_types.join(", ")
        };
        fn_ptr_typedefs.insert(
            mangled.clone(),
            format!("typedef {} (*{})({});", ret_type, mangled, params_str),
        );
    }
    mangled
}

/// Mangle a generic type to a C-safe name: `List<int>` → `btrc_List_int`.
pub fn mangle_generic_type(base: &str, args: &[TypeExpr]) -> String {
    let parts: Vec<String> = args.iter().map(mangle_type_name).collect();
    format!("btrc_{}_{}", base, parts.join("_"))
}

/// Mangle a single type for use in C identifiers.
pub fn mangle_type_name(t: &TypeExpr) -> String {
    if !t.generic_args.is_empty() {
        let inner: Vec<String> = t.generic_args.iter().map(mangle_type_name).collect();
        return format!("{}_{}", t.base, inner.join("_"));
    }
    let mut name = t.base.clone();
    if t.pointer_depth > 0 {
        name.push_str(&"p".repeat(t.pointer_depth));
    }
    name
}

/// Mangle a tuple type: `(int, string)` → `btrc_Tuple_int_string`.
pub fn mangle_tuple_type(t: &TypeExpr) -> String {
    if t.generic_args.is_empty() {
        return "btrc_Tuple".to_string();
    }
    let parts: Vec<String> = t.generic_args.iter().map(mangle_type_name).collect();
    format!("btrc_Tuple_{}", parts.join("_"))
}

pub fn is_string_type(t: Option<&TypeExpr>) -> bool {
    match t {
        Some(t) => t.base == "string" && t.generic_args.is_empty() && t.pointer_depth == 0,
        None => false,
    }
}

pub fn is_numeric_type(t: Option<&TypeExpr>) -> bool {
    match t {
        Some(t) => matches!(
            t.base.as_str(),
            "int" | "float" | "double" | "long" | "short" | "byte" | "uint"
        ),
        None => false,
    }
}

/// Built-in collection with generic args (List, Map, Set).
pub fn is_collection_type(t: Option<&TypeExpr>) -> bool {
    match t {
        Some(t) => BUILTIN_GENERICS.contains(&t.base.as_str()) && !t.generic_args.is_empty(),
        None => false,
    }
}

/// A registered user generic class instance type.
pub fn is_generic_class_type(t: Option<&TypeExpr>, class_table: &IndexMap<String, ClassInfo>) -> bool {
    match t {
        Some(t) if !t.generic_args.is_empty() => class_table
            .get(&t.base)
            .is_some_and(|info| !info.generic_params.is_empty()),
        _ => false,
    }
}

/// Fully resolved: no single-uppercase-letter bases anywhere.
pub fn is_concrete_type(t: &TypeExpr) -> bool {
    let base = &t.base;
    if base.len() == 1 && base.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    t.generic_args.iter().all(is_concrete_type)
}

pub fn is_concrete_instance(args: &[TypeExpr]) -> bool {
    args.iter().all(is_concrete_type)
}

/// printf format specifier for a type.
pub fn format_spec_for_type(t: Option<&TypeExpr>) -> &'static str {
    let Some(t) = t else {
        // Most untracked expressions are int.
        return "%d";
    };
    if t.pointer_depth > 0 {
        return "%s";
    }
    match t.base.as_str() {
        "int" | "short" | "byte" | "uint" => "%d",
        "long" => "%ld",
        "float" | "double" => "%f",
        "char" => "%c",
        "string" => "%s",
        // Needs val ? "true" : "false" wrapping at the call site.
        "bool" => "%s",
        _ => "%d",
    }
}

/// Replace generic type parameters with concrete types.
pub fn resolve_type(t: &TypeExpr, type_map: &IndexMap<String, TypeExpr>) -> TypeExpr {
    if t.generic_args.is_empty() {
        if let Some(concrete) = type_map.get(&t.base) {
            let mut r = concrete.clone();
            r.pointer_depth += t.pointer_depth;
            return r;
        }
        return t.clone();
    }
    let mut r = t.clone();
    r.generic_args = t
        .generic_args
        .iter()
        .map(|a| resolve_type(a, type_map))
        .collect();
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(base: &str) -> TypeExpr {
        TypeExpr::named(base)
    }

    #[test]
    fn test_primitive_mapping() {
        let mut fp = IndexMap::new();
        assert_eq!(type_to_c(Some(&t("int")), &mut fp), "int");
        assert_eq!(type_to_c(Some(&t("string")), &mut fp), "char*");
        assert_eq!(type_to_c(Some(&t("byte")), &mut fp), "unsigned char");
        assert_eq!(type_to_c(None, &mut fp), "void");
    }

    #[test]
    fn test_generic_mangling() {
        let list_int = TypeExpr::generic("List", vec![t("int")]);
        assert_eq!(mangle_generic_type("List", &list_int.generic_args), "btrc_List_int");

        let nested = TypeExpr::generic("Map", vec![t("string"), list_int]);
        assert_eq!(
            mangle_generic_type("Map", &nested.generic_args),
            "btrc_Map_string_List_int"
        );
    }

    #[test]
    fn test_mangling_injective() {
        // Distinct instantiations must never collide.
        let a = TypeExpr::generic("Map", vec![t("string"), t("int")]);
        let b = TypeExpr::generic("Map", vec![t("int"), t("string")]);
        let c = TypeExpr::generic("List", vec![TypeExpr::generic("List", vec![t("int")])]);
        let d = TypeExpr::generic("List", vec![t("int")]);
        let mangled: Vec<String> = [&a, &b, &c, &d]
            .iter()
            .map(|x| mangle_generic_type(&x.base, &x.generic_args))
            .collect();
        for i in 0..mangled.len() {
            for j in i + 1..mangled.len() {
                assert_ne!(mangled[i], mangled[j]);
            }
        }
    }

    #[test]
    fn test_fn_ptr_typedef_interning() {
        let mut fp = IndexMap::new();
        let fn_ty = TypeExpr::generic("__fn_ptr", vec![t("int"), t("int")]);
        let name = fn_ptr_typedef_name(&fn_ty, &mut fp);
        assert_eq!(name, "__btrc_fn_int_int");
        assert_eq!(fp.len(), 1);
        assert_eq!(fp[0], "typedef int (*__btrc_fn_int_int)(int);");
        // Interned: second request does not duplicate.
        fn_ptr_typedef_name(&fn_ty, &mut fp);
        assert_eq!(fp.len(), 1);
    }

    #[test]
    fn test_concrete_detection() {
        assert!(is_concrete_type(&t("int")));
        assert!(!is_concrete_type(&t("T")));
        let part = TypeExpr::generic("List", vec![t("T")]);
        assert!(!is_concrete_type(&part));
        let full = TypeExpr::generic("List", vec![t("string")]);
        assert!(is_concrete_type(&full));
    }

    #[test]
    fn test_format_specs() {
        assert_eq!(format_spec_for_type(Some(&t("int"))), "%d");
        assert_eq!(format_spec_for_type(Some(&t("long"))), "%ld");
        assert_eq!(format_spec_for_type(Some(&t("double"))), "%f");
        assert_eq!(format_spec_for_type(Some(&t("bool"))), "%s");
        assert_eq!(format_spec_for_type(None), "%d");
        let mut ptr = t("int");
        ptr.pointer_depth = 1;
        assert_eq!(format_spec_for_type(Some(&ptr)), "%s");
    }

    #[test]
    fn test_resolve_type_substitution() {
        let mut map = IndexMap::new();
        map.insert("T".to_string(), t("string"));
        let node = TypeExpr::generic("ListNode", vec![t("T")]);
        let resolved = resolve_type(&node, &map);
        assert_eq!(resolved.generic_args[0].base, "string");
    }
}
