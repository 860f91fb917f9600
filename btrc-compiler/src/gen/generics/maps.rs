// Map<K, V> monomorphization: open addressing with linear probing.

use btrc_ast::TypeExpr;
use indexmap::IndexSet;

use super::super::types::{mangle_generic_type, type_to_c};
use super::super::IrGenerator;
use super::lists::pointered;
use crate::ir::{CType, IrStructDef, IrStructField};

pub(crate) fn emit_map_instance(gen: &mut IrGenerator, seen: &mut IndexSet<String>, args: &[TypeExpr]) {
    if args.len() < 2 {
        return;
    }
    let k_type = args[0].clone();
    let v_type = args[1].clone();
    let k_c = type_to_c(Some(&k_type), &mut gen.fn_ptr_typedefs);
    let k_c = pointered(gen, &k_type, k_c);
    let v_c = type_to_c(Some(&v_type), &mut gen.fn_ptr_typedefs);
    let v_c = pointered(gen, &v_type, v_c);
    let mangled = mangle_generic_type("Map", args);

    gen.module.struct_defs.push(IrStructDef {
        name: mangled.clone(),
        fields: vec![
            IrStructField {
                c_type: CType::new(format!("{}*", k_c)),
                name: "keys".to_string(),
            },
            IrStructField {
                c_type: CType::new(format!("{}*", v_c)),
                name: "values".to_string(),
            },
            IrStructField {
                c_type: CType::new("bool*"),
                name: "occupied".to_string(),
            },
            IrStructField {
                c_type: CType::new("int"),
                name: "len".to_string(),
            },
            IrStructField {
                c_type: CType::new("int"),
                name: "cap".to_string(),
            },
        ],
    });

    // keys()/values() return list instances; emit them first so the
    // method bodies below can call their statics.
    super::ensure_instance(gen, seen, "List", &[k_type.clone()]);
    super::ensure_instance(gen, seen, "List", &[v_type.clone()]);

    emit_map_methods(gen, &mangled, &k_c, &v_c, &k_type, &v_type);
}

fn emit_map_methods(
    gen: &mut IrGenerator,
    name: &str,
    k_c: &str,
    v_c: &str,
    k_type: &TypeExpr,
    v_type: &TypeExpr,
) {
    let is_str_key = k_type.base == "string" && k_type.generic_args.is_empty();
    let hash_fn = if is_str_key {
        "__btrc_hash_str(key)"
    } else {
        "(unsigned int)(key)"
    };
    let eq_fn = if is_str_key {
        "strcmp(m->keys[idx], key) == 0"
    } else {
        "m->keys[idx] == key"
    };
    if is_str_key {
        gen.use_helper("__btrc_hash_str");
    }

    let k_list = mangle_generic_type("List", std::slice::from_ref(k_type));
    let v_list = mangle_generic_type("List", std::slice::from_ref(v_type));

    let methods = format!(
        r#"static void {name}_put({name}* m, {k} key, {v} value);
static void {name}_resize({name}* m);
static {name}* {name}_new(void) {{
    {name}* m = ({name}*)malloc(sizeof({name}));
    m->cap = 16; m->len = 0;
    m->keys = ({k}*)calloc(m->cap, sizeof({k}));
    m->values = ({v}*)calloc(m->cap, sizeof({v}));
    m->occupied = (bool*)calloc(m->cap, sizeof(bool));
    return m;
}}
static void {name}_resize({name}* m) {{
    int old_cap = m->cap;
    {k}* old_k = m->keys; {v}* old_v = m->values; bool* old_o = m->occupied;
    m->cap *= 2; m->len = 0;
    m->keys = ({k}*)calloc(m->cap, sizeof({k}));
    m->values = ({v}*)calloc(m->cap, sizeof({v}));
    m->occupied = (bool*)calloc(m->cap, sizeof(bool));
    for (int i = 0; i < old_cap; i++) {{
        if (old_o[i]) {{ {name}_put(m, old_k[i], old_v[i]); }}
    }}
    free(old_k); free(old_v); free(old_o);
}}
static void {name}_put({name}* m, {k} key, {v} value) {{
    if (m->len * 4 >= m->cap * 3) {name}_resize(m);
    unsigned int h = {hash} % (unsigned int)m->cap;
    int idx = (int)h;
    while (m->occupied[idx]) {{
        if ({eq}) {{ m->values[idx] = value; return; }}
        idx = (idx + 1) % m->cap;
    }}
    m->keys[idx] = key; m->values[idx] = value; m->occupied[idx] = true; m->len++;
}}
static {v} {name}_get({name}* m, {k} key) {{
    unsigned int h = {hash} % (unsigned int)m->cap;
    int idx = (int)h;
    for (int i = 0; i < m->cap; i++) {{
        if (!m->occupied[idx]) {{ fprintf(stderr, "Key not found\n"); exit(1); }}
        if ({eq}) return m->values[idx];
        idx = (idx + 1) % m->cap;
    }}
    fprintf(stderr, "Key not found\n"); exit(1);
    return ({v}){{0}};
}}
static bool {name}_has({name}* m, {k} key) {{
    unsigned int h = {hash} % (unsigned int)m->cap;
    int idx = (int)h;
    for (int i = 0; i < m->cap; i++) {{
        if (!m->occupied[idx]) return false;
        if ({eq}) return true;
        idx = (idx + 1) % m->cap;
    }}
    return false;
}}
static bool {name}_contains({name}* m, {k} key) {{ return {name}_has(m, key); }}
static void {name}_free({name}* m) {{ free(m->keys); free(m->values); free(m->occupied); free(m); }}
static int {name}_size({name}* m) {{ return m->len; }}
static bool {name}_isEmpty({name}* m) {{ return m->len == 0; }}
static {v} {name}_getOrDefault({name}* m, {k} key, {v} fallback) {{
    unsigned int h = {hash} % (unsigned int)m->cap;
    int idx = (int)h;
    for (int i = 0; i < m->cap; i++) {{
        if (!m->occupied[idx]) return fallback;
        if ({eq}) return m->values[idx];
        idx = (idx + 1) % m->cap;
    }}
    return fallback;
}}
static void {name}_remove({name}* m, {k} key) {{
    unsigned int h = {hash} % (unsigned int)m->cap;
    int idx = (int)h;
    for (int i = 0; i < m->cap; i++) {{
        if (!m->occupied[idx]) return;
        if ({eq}) {{ m->occupied[idx] = false; m->len--; return; }}
        idx = (idx + 1) % m->cap;
    }}
}}
static void {name}_clear({name}* m) {{
    memset(m->occupied, 0, sizeof(bool) * m->cap);
    m->len = 0;
}}
static void {name}_putIfAbsent({name}* m, {k} key, {v} value) {{
    if (!{name}_has(m, key)) {name}_put(m, key, value);
}}
static bool {name}_containsValue({name}* m, {v} value) {{
    for (int i = 0; i < m->cap; i++) {{
        if (m->occupied[i] && m->values[i] == value) return true;
    }}
    return false;
}}
static void {name}_set({name}* m, {k} key, {v} value) {{ {name}_put(m, key, value); }}
static void {name}_merge({name}* m, {name}* other) {{
    for (int i = 0; i < other->cap; i++) {{
        if (other->occupied[i]) {name}_put(m, other->keys[i], other->values[i]);
    }}
}}
static {k_list}* {name}_keys({name}* m) {{
    {k_list}* r = {k_list}_new();
    for (int i = 0; i < m->cap; i++) {{
        if (m->occupied[i]) {k_list}_push(r, m->keys[i]);
    }}
    return r;
}}
static {v_list}* {name}_values({name}* m) {{
    {v_list}* r = {v_list}_new();
    for (int i = 0; i < m->cap; i++) {{
        if (m->occupied[i]) {v_list}_push(r, m->values[i]);
    }}
    return r;
}}"#,
        name = name,
        k = k_c,
        v = v_c,
        hash = hash_fn,
        eq = eq_fn,
        k_list = k_list,
        v_list = v_list,
    );

    gen.module.raw_sections.push(methods);
}
