// List<T> monomorphization: struct + methods.

use btrc_ast::TypeExpr;
use indexmap::IndexSet;

use super::super::types::type_to_c;
use super::super::IrGenerator;
use super::{eq_expr, gt_expr, lt_expr};
use crate::ir::{CType, IrStructDef, IrStructField};

pub(crate) fn emit_list_instance(gen: &mut IrGenerator, _seen: &mut IndexSet<String>, args: &[TypeExpr]) {
    let Some(elem_type) = args.first() else {
        return;
    };
    let elem_c = type_to_c(Some(elem_type), &mut gen.fn_ptr_typedefs);
    let elem_c = pointered(gen, elem_type, elem_c);
    let mangled = super::super::types::mangle_generic_type("List", args);

    gen.module.struct_defs.push(IrStructDef {
        name: mangled.clone(),
        fields: vec![
            IrStructField {
                c_type: CType::new(format!("{}*", elem_c)),
                name: "data".to_string(),
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

    emit_list_methods(gen, &mangled, &elem_c, elem_type);
}

/// Classes appear as pointers inside containers.
pub(crate) fn pointered(gen: &IrGenerator, t: &TypeExpr, c: String) -> String {
    if t.generic_args.is_empty()
        && t.pointer_depth == 0
        && gen.analyzed.class_table.contains_key(&t.base)
    {
        format!("{}*", c)
    } else {
        c
    }
}

fn emit_list_methods(gen: &mut IrGenerator, name: &str, elem_c: &str, elem_type: &TypeExpr) {
    gen.use_helper("__btrc_safe_realloc");
    let eq = |a: &str, b: &str| eq_expr(elem_c, a, b);
    let gt = |a: &str, b: &str| gt_expr(elem_c, a, b);
    let lt = |a: &str, b: &str| lt_expr(elem_c, a, b);

    let mut methods = format!(
        r#"static {name}* {name}_new(void) {{
    {name}* l = ({name}*)malloc(sizeof({name}));
    l->data = ({elem}*)malloc(sizeof({elem}) * 8);
    l->len = 0; l->cap = 8;
    return l;
}}
static void {name}_push({name}* l, {elem} val) {{
    if (l->len >= l->cap) {{
        l->cap *= 2;
        l->data = ({elem}*)__btrc_safe_realloc(l->data, sizeof({elem}) * l->cap);
    }}
    l->data[l->len++] = val;
}}
static {elem} {name}_pop({name}* l) {{
    if (l->len <= 0) {{ fprintf(stderr, "pop from empty list\n"); exit(1); }}
    return l->data[--l->len];
}}
static {elem} {name}_get({name}* l, int i) {{
    if (i < 0 || i >= l->len) {{ fprintf(stderr, "index %d out of bounds (len %d)\n", i, l->len); exit(1); }}
    return l->data[i];
}}
static void {name}_set({name}* l, int i, {elem} val) {{
    if (i < 0 || i >= l->len) {{ fprintf(stderr, "index %d out of bounds (len %d)\n", i, l->len); exit(1); }}
    l->data[i] = val;
}}
static void {name}_free({name}* l) {{ free(l->data); free(l); }}
static void {name}_remove({name}* l, int idx) {{
    for (int i = idx; i < l->len - 1; i++) l->data[i] = l->data[i+1];
    l->len--;
}}
static void {name}_removeAt({name}* l, int idx) {{
    for (int i = idx; i < l->len - 1; i++) l->data[i] = l->data[i+1];
    l->len--;
}}
static int {name}_size({name}* l) {{ return l->len; }}
static bool {name}_isEmpty({name}* l) {{ return l->len == 0; }}
static bool {name}_contains({name}* l, {elem} val) {{
    for (int i = 0; i < l->len; i++) if ({eq_iv}) return true;
    return false;
}}
static int {name}_indexOf({name}* l, {elem} val) {{
    for (int i = 0; i < l->len; i++) if ({eq_iv}) return i;
    return -1;
}}
static int {name}_lastIndexOf({name}* l, {elem} val) {{
    for (int i = l->len - 1; i >= 0; i--) if ({eq_iv}) return i;
    return -1;
}}
static void {name}_reverse({name}* l) {{
    for (int i = 0, j = l->len - 1; i < j; i++, j--) {{
        {elem} tmp = l->data[i]; l->data[i] = l->data[j]; l->data[j] = tmp;
    }}
}}
static {name}* {name}_reversed({name}* l) {{
    {name}* r = {name}_new();
    for (int i = l->len - 1; i >= 0; i--) {name}_push(r, l->data[i]);
    return r;
}}
static void {name}_clear({name}* l) {{ l->len = 0; }}
static {elem} {name}_first({name}* l) {{ return l->data[0]; }}
static {elem} {name}_last({name}* l) {{ return l->data[l->len - 1]; }}
static {name}* {name}_slice({name}* l, int start, int end) {{
    {name}* r = {name}_new();
    if (start < 0) start = l->len + start;
    if (end < 0) end = l->len + end;
    if (start < 0) start = 0;
    if (end > l->len) end = l->len;
    for (int i = start; i < end; i++) {name}_push(r, l->data[i]);
    return r;
}}
static {name}* {name}_take({name}* l, int n) {{ return {name}_slice(l, 0, n); }}
static {name}* {name}_drop({name}* l, int n) {{ return {name}_slice(l, n, l->len); }}
static void {name}_insert({name}* l, int idx, {elem} val) {{
    {name}_push(l, val);
    for (int i = l->len - 1; i > idx; i--) l->data[i] = l->data[i-1];
    l->data[idx] = val;
}}
static void {name}_sort({name}* l) {{
    for (int i = 1; i < l->len; i++) {{
        {elem} key = l->data[i]; int j = i - 1;
        while (j >= 0 && {gt_jkey}) {{ l->data[j+1] = l->data[j]; j--; }}
        l->data[j+1] = key;
    }}
}}
static void {name}_extend({name}* l, {name}* other) {{
    for (int i = 0; i < other->len; i++) {name}_push(l, other->data[i]);
}}
static int {name}_findIndex({name}* l, bool (*pred)({elem})) {{
    for (int i = 0; i < l->len; i++) if (pred(l->data[i])) return i;
    return -1;
}}
static {name}* {name}_filter({name}* l, bool (*pred)({elem})) {{
    {name}* r = {name}_new();
    for (int i = 0; i < l->len; i++) if (pred(l->data[i])) {name}_push(r, l->data[i]);
    return r;
}}
static void {name}_forEach({name}* l, void (*fn)({elem})) {{
    for (int i = 0; i < l->len; i++) fn(l->data[i]);
}}
static {name}* {name}_map({name}* l, {elem} (*fn)({elem})) {{
    {name}* r = {name}_new();
    for (int i = 0; i < l->len; i++) {name}_push(r, fn(l->data[i]));
    return r;
}}
static {elem} {name}_reduce({name}* l, {elem} init, {elem} (*fn)({elem}, {elem})) {{
    {elem} acc = init;
    for (int i = 0; i < l->len; i++) acc = fn(acc, l->data[i]);
    return acc;
}}
static {name}* {name}_copy({name}* l) {{
    {name}* r = {name}_new();
    for (int i = 0; i < l->len; i++) {name}_push(r, l->data[i]);
    return r;
}}
static {elem} {name}_min({name}* l) {{
    {elem} m = l->data[0];
    for (int i = 1; i < l->len; i++) if ({lt_im}) m = l->data[i];
    return m;
}}
static {elem} {name}_max({name}* l) {{
    {elem} m = l->data[0];
    for (int i = 1; i < l->len; i++) if ({gt_im}) m = l->data[i];
    return m;
}}
static bool {name}_any({name}* l, bool (*pred)({elem})) {{
    for (int i = 0; i < l->len; i++) if (pred(l->data[i])) return true;
    return false;
}}
static bool {name}_all({name}* l, bool (*pred)({elem})) {{
    for (int i = 0; i < l->len; i++) if (!pred(l->data[i])) return false;
    return true;
}}
static int {name}_count({name}* l, {elem} val) {{
    int c = 0;
    for (int i = 0; i < l->len; i++) if ({eq_iv}) c++;
    return c;
}}
static void {name}_fill({name}* l, {elem} val) {{
    for (int i = 0; i < l->len; i++) l->data[i] = val;
}}
static void {name}_removeAll({name}* l, {elem} val) {{
    int w = 0;
    for (int i = 0; i < l->len; i++) {{
        if (!({eq_iv})) l->data[w++] = l->data[i];
    }}
    l->len = w;
}}
static void {name}_swap({name}* l, int i, int j) {{
    {elem} tmp = l->data[i]; l->data[i] = l->data[j]; l->data[j] = tmp;
}}
static {name}* {name}_sorted({name}* l) {{
    {name}* r = {name}_copy(l);
    {name}_sort(r);
    return r;
}}
static {name}* {name}_distinct({name}* l) {{
    {name}* r = {name}_new();
    for (int i = 0; i < l->len; i++) {{
        if (!{name}_contains(r, l->data[i])) {name}_push(r, l->data[i]);
    }}
    return r;
}}
"#,
        name = name,
        elem = elem_c,
        eq_iv = eq("l->data[i]", "val"),
        gt_jkey = gt("l->data[j]", "key"),
        lt_im = lt("l->data[i]", "m"),
        gt_im = gt("l->data[i]", "m"),
    );

    // Numeric element types additionally get sum().
    if matches!(elem_c, "int" | "float" | "double" | "long") {
        methods.push_str(&format!(
            r#"static {elem} {name}_sum({name}* l) {{
    {elem} s = 0;
    for (int i = 0; i < l->len; i++) s += l->data[i];
    return s;
}}
"#,
            name = name,
            elem = elem_c,
        ));
    }

    // List<string> additionally gets join(sep) and the split builder
    // (string.split returns this instance, so it lives here where the
    // struct and push are already in scope).
    if elem_type.base == "string" && elem_type.generic_args.is_empty() {
        gen.use_helper("__btrc_strdup");
        methods.push_str(&format!(
            r#"static char* {name}_join({name}* l, const char* sep) {{
    if (l->len == 0) return __btrc_strdup("");
    int total = 0;
    int seplen = (int)strlen(sep);
    for (int i = 0; i < l->len; i++) total += (int)strlen(l->data[i]);
    total += seplen * (l->len - 1);
    char* buf = (char*)malloc(total + 1);
    buf[0] = '\0';
    for (int i = 0; i < l->len; i++) {{
        if (i > 0) strcat(buf, sep);
        strcat(buf, l->data[i]);
    }}
    return buf;
}}
static {name}* {name}_split(const char* s, const char* sep) {{
    {name}* r = {name}_new();
    size_t seplen = strlen(sep);
    if (seplen == 0) {{ {name}_push(r, __btrc_strdup(s)); return r; }}
    const char* start = s;
    const char* p;
    while ((p = strstr(start, sep)) != NULL) {{
        size_t n = (size_t)(p - start);
        char* piece = (char*)malloc(n + 1);
        memcpy(piece, start, n);
        piece[n] = '\0';
        {name}_push(r, piece);
        start = p + seplen;
    }}
    {name}_push(r, __btrc_strdup(start));
    return r;
}}
"#,
            name = name,
        ));
    }

    gen.module.raw_sections.push(methods.trim().to_string());
}
