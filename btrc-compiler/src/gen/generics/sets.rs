// Set<T> monomorphization: same open-addressing policy as Map.

use btrc_ast::TypeExpr;
use indexmap::IndexSet;

use super::super::types::{mangle_generic_type, type_to_c};
use super::super::IrGenerator;
use super::lists::pointered;
use crate::ir::{CType, IrStructDef, IrStructField};

pub(crate) fn emit_set_instance(gen: &mut IrGenerator, seen: &mut IndexSet<String>, args: &[TypeExpr]) {
    let Some(elem_type) = args.first().cloned() else {
        return;
    };
    let elem_c = type_to_c(Some(&elem_type), &mut gen.fn_ptr_typedefs);
    let elem_c = pointered(gen, &elem_type, elem_c);
    let mangled = mangle_generic_type("Set", args);

    gen.module.struct_defs.push(IrStructDef {
        name: mangled.clone(),
        fields: vec![
            IrStructField {
                c_type: CType::new(format!("{}*", elem_c)),
                name: "keys".to_string(),
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

    super::ensure_instance(gen, seen, "List", &[elem_type.clone()]);
    emit_set_methods(gen, &mangled, &elem_c, &elem_type);
}

fn emit_set_methods(gen: &mut IrGenerator, name: &str, elem_c: &str, elem_type: &TypeExpr) {
    let is_str = elem_type.base == "string" && elem_type.generic_args.is_empty();
    let hash_fn = if is_str {
        "__btrc_hash_str(key)"
    } else {
        "(unsigned int)(key)"
    };
    let eq_fn = if is_str {
        "strcmp(s->keys[idx], key) == 0"
    } else {
        "s->keys[idx] == key"
    };
    if is_str {
        gen.use_helper("__btrc_hash_str");
    }

    let list_name = mangle_generic_type("List", std::slice::from_ref(elem_type));

    let methods = format!(
        r#"static void {name}_add({name}* s, {elem} key);
static void {name}_resize({name}* s);
static {name}* {name}_new(void) {{
    {name}* s = ({name}*)malloc(sizeof({name}));
    s->cap = 16; s->len = 0;
    s->keys = ({elem}*)calloc(s->cap, sizeof({elem}));
    s->occupied = (bool*)calloc(s->cap, sizeof(bool));
    return s;
}}
static void {name}_resize({name}* s) {{
    int old_cap = s->cap;
    {elem}* old_k = s->keys; bool* old_o = s->occupied;
    s->cap *= 2; s->len = 0;
    s->keys = ({elem}*)calloc(s->cap, sizeof({elem}));
    s->occupied = (bool*)calloc(s->cap, sizeof(bool));
    for (int i = 0; i < old_cap; i++) {{
        if (old_o[i]) {{ {name}_add(s, old_k[i]); }}
    }}
    free(old_k); free(old_o);
}}
static void {name}_add({name}* s, {elem} key) {{
    if (s->len * 4 >= s->cap * 3) {name}_resize(s);
    unsigned int h = {hash} % (unsigned int)s->cap;
    int idx = (int)h;
    while (s->occupied[idx]) {{
        if ({eq}) return;
        idx = (idx + 1) % s->cap;
    }}
    s->keys[idx] = key; s->occupied[idx] = true; s->len++;
}}
static bool {name}_contains({name}* s, {elem} key) {{
    unsigned int h = {hash} % (unsigned int)s->cap;
    int idx = (int)h;
    for (int i = 0; i < s->cap; i++) {{
        if (!s->occupied[idx]) return false;
        if ({eq}) return true;
        idx = (idx + 1) % s->cap;
    }}
    return false;
}}
static bool {name}_has({name}* s, {elem} key) {{ return {name}_contains(s, key); }}
static void {name}_free({name}* s) {{ free(s->keys); free(s->occupied); free(s); }}
static int {name}_size({name}* s) {{ return s->len; }}
static bool {name}_isEmpty({name}* s) {{ return s->len == 0; }}
static void {name}_remove({name}* s, {elem} key) {{
    unsigned int h = {hash} % (unsigned int)s->cap;
    int idx = (int)h;
    for (int i = 0; i < s->cap; i++) {{
        if (!s->occupied[idx]) return;
        if ({eq}) {{ s->occupied[idx] = false; s->len--; return; }}
        idx = (idx + 1) % s->cap;
    }}
}}
static void {name}_clear({name}* s) {{
    memset(s->occupied, 0, sizeof(bool) * s->cap);
    s->len = 0;
}}
static void {name}_forEach({name}* s, void (*fn)({elem})) {{
    for (int i = 0; i < s->cap; i++) {{
        if (s->occupied[i]) fn(s->keys[i]);
    }}
}}
static {name}* {name}_filter({name}* s, bool (*pred)({elem})) {{
    {name}* r = {name}_new();
    for (int i = 0; i < s->cap; i++) {{
        if (s->occupied[i] && pred(s->keys[i])) {name}_add(r, s->keys[i]);
    }}
    return r;
}}
static {list}* {name}_toList({name}* s) {{
    {list}* r = {list}_new();
    for (int i = 0; i < s->cap; i++) {{
        if (s->occupied[i]) {list}_push(r, s->keys[i]);
    }}
    return r;
}}
static bool {name}_any({name}* s, bool (*pred)({elem})) {{
    for (int i = 0; i < s->cap; i++) {{
        if (s->occupied[i] && pred(s->keys[i])) return true;
    }}
    return false;
}}
static bool {name}_all({name}* s, bool (*pred)({elem})) {{
    for (int i = 0; i < s->cap; i++) {{
        if (s->occupied[i] && !pred(s->keys[i])) return false;
    }}
    return true;
}}
static {name}* {name}_intersect({name}* a, {name}* b) {{
    {name}* r = {name}_new();
    for (int i = 0; i < a->cap; i++) {{
        if (a->occupied[i] && {name}_contains(b, a->keys[i])) {name}_add(r, a->keys[i]);
    }}
    return r;
}}
static {name}* {name}_unite({name}* a, {name}* b) {{
    {name}* r = {name}_new();
    for (int i = 0; i < a->cap; i++) {{
        if (a->occupied[i]) {name}_add(r, a->keys[i]);
    }}
    for (int i = 0; i < b->cap; i++) {{
        if (b->occupied[i]) {name}_add(r, b->keys[i]);
    }}
    return r;
}}
static {name}* {name}_subtract({name}* a, {name}* b) {{
    {name}* r = {name}_new();
    for (int i = 0; i < a->cap; i++) {{
        if (a->occupied[i] && !{name}_contains(b, a->keys[i])) {name}_add(r, a->keys[i]);
    }}
    return r;
}}"#,
        name = name,
        elem = elem_c,
        hash = hash_fn,
        eq = eq_fn,
        list = list_name,
    );

    gen.module.raw_sections.push(methods);
}
