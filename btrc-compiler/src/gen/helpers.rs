// Runtime helper registry: named C source fragments grouped into
// categories with category dependencies. A helper reaches the output
// only when referenced (directly, or transitively through category
// dependency) — see optimizer.rs for the elimination side.

use super::IrGenerator;
use crate::ir::IrHelperDecl;
use indexmap::IndexSet;

fn helper(category: &str, name: &str, c_source: &str, depends_on: &[&str]) -> IrHelperDecl {
    IrHelperDecl {
        category: category.to_string(),
        name: name.to_string(),
        c_source: c_source.trim_start_matches('\n').to_string(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

/// Register the used runtime helpers into the module. The same
/// name-or-category retention rule as the optimizer applies, so a
/// later optimize() pass is a no-op on what is collected here.
pub fn collect_helpers(gen: &mut IrGenerator) {
    let registry = registry();

    let mut used_cats: IndexSet<String> = registry
        .iter()
        .filter(|h| gen.used_helpers.contains(&h.name))
        .map(|h| h.category.clone())
        .collect();

    let mut worklist: Vec<String> = used_cats.iter().cloned().collect();
    while let Some(cat) = worklist.pop() {
        for h in registry.iter().filter(|h| h.category == cat) {
            for dep in &h.depends_on {
                if used_cats.insert(dep.clone()) {
                    worklist.push(dep.clone());
                }
            }
        }
    }

    for h in registry {
        if gen.used_helpers.contains(&h.name) || used_cats.contains(&h.category) {
            gen.module.helper_decls.push(h);
        }
    }
}

/// The full helper registry, in emission order: every entry's
/// dependencies appear before it.
pub fn registry() -> Vec<IrHelperDecl> {
    let mut helpers = Vec::new();

    // ---- alloc ----
    helpers.push(helper(
        "alloc",
        "__btrc_safe_malloc",
        r#"
static void* __btrc_safe_malloc(size_t n) {
    void* p = malloc(n);
    if (!p) { fprintf(stderr, "out of memory\n"); exit(1); }
    return p;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "alloc",
        "__btrc_safe_realloc",
        r#"
static void* __btrc_safe_realloc(void* p, size_t n) {
    void* r = realloc(p, n);
    if (!r) { fprintf(stderr, "out of memory\n"); exit(1); }
    return r;
}
"#,
        &[],
    ));

    // ---- destroyed-tracking ----
    helpers.push(helper(
        "destroyed-tracking",
        "__btrc_destroyed_tracking",
        r#"
static int __btrc_tracking = 0;
static void* __btrc_destroyed_set[1024];
static int __btrc_destroyed_count = 0;
static int __btrc_is_destroyed(void* p) {
    for (int i = 0; i < __btrc_destroyed_count; i++) {
        if (__btrc_destroyed_set[i] == p) return 1;
    }
    return 0;
}
static void __btrc_mark_destroyed(void* p) {
    if (__btrc_destroyed_count < 1024) {
        __btrc_destroyed_set[__btrc_destroyed_count++] = p;
    }
}
"#,
        &[],
    ));

    // ---- cycle ----
    helpers.push(helper(
        "cycle",
        "__btrc_suspect_buf",
        r#"
typedef void (*__btrc_visit_fn)(void*, void (*)(void*));
typedef void (*__btrc_destroy_fn)(void*);
typedef struct {
    void* obj;
    __btrc_visit_fn visit;
    __btrc_destroy_fn destroy;
} __btrc_suspect_entry;
static __btrc_suspect_entry __btrc_suspect_buf[256];
static int __btrc_suspect_count = 0;
static void __btrc_suspect(void* obj, __btrc_visit_fn visit, __btrc_destroy_fn destroy) {
    for (int i = 0; i < __btrc_suspect_count; i++) {
        if (__btrc_suspect_buf[i].obj == obj) return;
    }
    if (__btrc_suspect_count < 256) {
        __btrc_suspect_buf[__btrc_suspect_count].obj = obj;
        __btrc_suspect_buf[__btrc_suspect_count].visit = visit;
        __btrc_suspect_buf[__btrc_suspect_count].destroy = destroy;
        __btrc_suspect_count++;
    }
}
"#,
        &["destroyed-tracking"],
    ));
    // Trial deletion: objects carry their refcount as the first int
    // member, so *(int*)obj reads __rc for any suspect.
    helpers.push(helper(
        "cycle",
        "__btrc_collect_cycles",
        r#"
static int __btrc_suspect_index(void* obj) {
    for (int i = 0; i < __btrc_suspect_count; i++) {
        if (__btrc_suspect_buf[i].obj == obj) return i;
    }
    return -1;
}
static void __btrc_cycle_dec(void* child) {
    if (__btrc_suspect_index(child) >= 0 && !__btrc_is_destroyed(child)) {
        (*(int*)child)--;
    }
}
static void __btrc_cycle_restore(void* child) {
    if (__btrc_suspect_index(child) >= 0 && !__btrc_is_destroyed(child)) {
        (*(int*)child)++;
    }
}
static void __btrc_collect_cycles(void) {
    for (int i = 0; i < __btrc_suspect_count; i++) {
        if (!__btrc_is_destroyed(__btrc_suspect_buf[i].obj)) {
            __btrc_suspect_buf[i].visit(__btrc_suspect_buf[i].obj, __btrc_cycle_dec);
        }
    }
    for (int i = 0; i < __btrc_suspect_count; i++) {
        void* obj = __btrc_suspect_buf[i].obj;
        if (!__btrc_is_destroyed(obj) && *(int*)obj <= 0) {
            __btrc_suspect_buf[i].destroy(obj);
        }
    }
    for (int i = 0; i < __btrc_suspect_count; i++) {
        void* obj = __btrc_suspect_buf[i].obj;
        if (!__btrc_is_destroyed(obj)) {
            __btrc_suspect_buf[i].visit(obj, __btrc_cycle_restore);
        }
    }
    __btrc_suspect_count = 0;
    __btrc_destroyed_count = 0;
}
"#,
        &["destroyed-tracking"],
    ));

    // ---- string ----
    helpers.push(helper(
        "string",
        "__btrc_strdup",
        r#"
static char* __btrc_strdup(const char* s) {
    size_t n = strlen(s);
    char* r = (char*)__btrc_safe_malloc(n + 1);
    memcpy(r, s, n + 1);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_str_track",
        r#"
static char** __btrc_str_pool = NULL;
static int __btrc_str_pool_len = 0;
static int __btrc_str_pool_cap = 0;
static void __btrc_str_pool_drain(void) {
    for (int i = 0; i < __btrc_str_pool_len; i++) free(__btrc_str_pool[i]);
    free(__btrc_str_pool);
    __btrc_str_pool = NULL;
    __btrc_str_pool_len = 0;
    __btrc_str_pool_cap = 0;
}
static char* __btrc_str_track(char* s) {
    if (!s) return s;
    if (__btrc_str_pool_len >= __btrc_str_pool_cap) {
        if (!__btrc_str_pool) atexit(__btrc_str_pool_drain);
        __btrc_str_pool_cap = __btrc_str_pool_cap ? __btrc_str_pool_cap * 2 : 64;
        __btrc_str_pool = (char**)__btrc_safe_realloc(__btrc_str_pool, sizeof(char*) * __btrc_str_pool_cap);
    }
    __btrc_str_pool[__btrc_str_pool_len++] = s;
    return s;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_strcat",
        r#"
static char* __btrc_strcat(const char* a, const char* b) {
    size_t la = strlen(a), lb = strlen(b);
    char* r = (char*)__btrc_safe_malloc(la + lb + 1);
    memcpy(r, a, la);
    memcpy(r + la, b, lb + 1);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_trim",
        r#"
static char* __btrc_trim(const char* s) {
    while (*s && isspace((unsigned char)*s)) s++;
    size_t n = strlen(s);
    while (n > 0 && isspace((unsigned char)s[n - 1])) n--;
    char* r = (char*)__btrc_safe_malloc(n + 1);
    memcpy(r, s, n);
    r[n] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_lstrip",
        r#"
static char* __btrc_lstrip(const char* s) {
    while (*s && isspace((unsigned char)*s)) s++;
    return __btrc_strdup(s);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_rstrip",
        r#"
static char* __btrc_rstrip(const char* s) {
    size_t n = strlen(s);
    while (n > 0 && isspace((unsigned char)s[n - 1])) n--;
    char* r = (char*)__btrc_safe_malloc(n + 1);
    memcpy(r, s, n);
    r[n] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_toUpper",
        r#"
static char* __btrc_toUpper(const char* s) {
    char* r = __btrc_strdup(s);
    for (char* p = r; *p; p++) *p = (char)toupper((unsigned char)*p);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_toLower",
        r#"
static char* __btrc_toLower(const char* s) {
    char* r = __btrc_strdup(s);
    for (char* p = r; *p; p++) *p = (char)tolower((unsigned char)*p);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_substring",
        r#"
static char* __btrc_substring(const char* s, int start, int end) {
    int n = (int)strlen(s);
    if (start < 0) start = 0;
    if (end > n) end = n;
    if (end < start) end = start;
    char* r = (char*)__btrc_safe_malloc((size_t)(end - start) + 1);
    memcpy(r, s + start, (size_t)(end - start));
    r[end - start] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_charAt",
        r#"
static char __btrc_charAt(const char* s, int i) {
    int n = (int)strlen(s);
    if (i < 0 || i >= n) { fprintf(stderr, "charAt index %d out of bounds\n", i); exit(1); }
    return s[i];
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_indexOf",
        r#"
static int __btrc_indexOf(const char* s, const char* needle) {
    const char* p = strstr(s, needle);
    return p ? (int)(p - s) : -1;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_lastIndexOf",
        r#"
static int __btrc_lastIndexOf(const char* s, const char* needle) {
    int best = -1;
    const char* p = s;
    while ((p = strstr(p, needle)) != NULL) {
        best = (int)(p - s);
        p++;
    }
    return best;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_find",
        r#"
static int __btrc_find(const char* s, const char* needle) {
    const char* p = strstr(s, needle);
    return p ? (int)(p - s) : -1;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_count",
        r#"
static int __btrc_count(const char* s, const char* needle) {
    if (!*needle) return 0;
    int c = 0;
    size_t step = strlen(needle);
    const char* p = s;
    while ((p = strstr(p, needle)) != NULL) {
        c++;
        p += step;
    }
    return c;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_replace",
        r#"
static char* __btrc_replace(const char* s, const char* from, const char* to) {
    if (!*from) return __btrc_strdup(s);
    size_t from_len = strlen(from), to_len = strlen(to);
    size_t cap = strlen(s) + 1;
    size_t len = 0;
    char* r = (char*)__btrc_safe_malloc(cap);
    while (*s) {
        if (strncmp(s, from, from_len) == 0) {
            while (len + to_len + 1 > cap) {
                cap *= 2;
                r = (char*)__btrc_safe_realloc(r, cap);
            }
            memcpy(r + len, to, to_len);
            len += to_len;
            s += from_len;
        } else {
            if (len + 2 > cap) {
                cap *= 2;
                r = (char*)__btrc_safe_realloc(r, cap);
            }
            r[len++] = *s++;
        }
    }
    r[len] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_repeat",
        r#"
static char* __btrc_repeat(const char* s, int times) {
    if (times < 0) times = 0;
    size_t n = strlen(s);
    char* r = (char*)__btrc_safe_malloc(n * (size_t)times + 1);
    r[0] = '\0';
    for (int i = 0; i < times; i++) memcpy(r + n * (size_t)i, s, n + 1);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_reverse",
        r#"
static char* __btrc_reverse(const char* s) {
    size_t n = strlen(s);
    char* r = (char*)__btrc_safe_malloc(n + 1);
    for (size_t i = 0; i < n; i++) r[i] = s[n - 1 - i];
    r[n] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isEmpty",
        r#"
static bool __btrc_isEmpty(const char* s) { return s[0] == '\0'; }
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isBlank",
        r#"
static bool __btrc_isBlank(const char* s) {
    for (; *s; s++) if (!isspace((unsigned char)*s)) return false;
    return true;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_startsWith",
        r#"
static bool __btrc_startsWith(const char* s, const char* prefix) {
    return strncmp(s, prefix, strlen(prefix)) == 0;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_endsWith",
        r#"
static bool __btrc_endsWith(const char* s, const char* suffix) {
    size_t n = strlen(s), m = strlen(suffix);
    if (m > n) return false;
    return strcmp(s + n - m, suffix) == 0;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_strContains",
        r#"
static bool __btrc_strContains(const char* s, const char* needle) {
    return strstr(s, needle) != NULL;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_removePrefix",
        r#"
static char* __btrc_removePrefix(const char* s, const char* prefix) {
    size_t m = strlen(prefix);
    if (strncmp(s, prefix, m) == 0) return __btrc_strdup(s + m);
    return __btrc_strdup(s);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_removeSuffix",
        r#"
static char* __btrc_removeSuffix(const char* s, const char* suffix) {
    size_t n = strlen(s), m = strlen(suffix);
    if (m <= n && strcmp(s + n - m, suffix) == 0) {
        char* r = (char*)__btrc_safe_malloc(n - m + 1);
        memcpy(r, s, n - m);
        r[n - m] = '\0';
        return r;
    }
    return __btrc_strdup(s);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_capitalize",
        r#"
static char* __btrc_capitalize(const char* s) {
    char* r = __btrc_strdup(s);
    if (r[0]) r[0] = (char)toupper((unsigned char)r[0]);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_title",
        r#"
static char* __btrc_title(const char* s) {
    char* r = __btrc_strdup(s);
    int at_start = 1;
    for (char* p = r; *p; p++) {
        if (isspace((unsigned char)*p)) {
            at_start = 1;
        } else {
            *p = at_start ? (char)toupper((unsigned char)*p) : (char)tolower((unsigned char)*p);
            at_start = 0;
        }
    }
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_swapCase",
        r#"
static char* __btrc_swapCase(const char* s) {
    char* r = __btrc_strdup(s);
    for (char* p = r; *p; p++) {
        if (isupper((unsigned char)*p)) *p = (char)tolower((unsigned char)*p);
        else if (islower((unsigned char)*p)) *p = (char)toupper((unsigned char)*p);
    }
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_padLeft",
        r#"
static char* __btrc_padLeft(const char* s, int width, char fill) {
    int n = (int)strlen(s);
    if (width <= n) return __btrc_strdup(s);
    char* r = (char*)__btrc_safe_malloc((size_t)width + 1);
    memset(r, fill, (size_t)(width - n));
    memcpy(r + width - n, s, (size_t)n + 1);
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_padRight",
        r#"
static char* __btrc_padRight(const char* s, int width, char fill) {
    int n = (int)strlen(s);
    if (width <= n) return __btrc_strdup(s);
    char* r = (char*)__btrc_safe_malloc((size_t)width + 1);
    memcpy(r, s, (size_t)n);
    memset(r + n, fill, (size_t)(width - n));
    r[width] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_center",
        r#"
static char* __btrc_center(const char* s, int width, char fill) {
    int n = (int)strlen(s);
    if (width <= n) return __btrc_strdup(s);
    int left = (width - n) / 2;
    int right = width - n - left;
    char* r = (char*)__btrc_safe_malloc((size_t)width + 1);
    memset(r, fill, (size_t)left);
    memcpy(r + left, s, (size_t)n);
    memset(r + left + n, fill, (size_t)right);
    r[width] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_zfill",
        r#"
static char* __btrc_zfill(const char* s, int width) {
    return __btrc_padLeft(s, width, '0');
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isDigitStr",
        r#"
static bool __btrc_isDigitStr(const char* s) {
    if (!*s) return false;
    for (; *s; s++) if (!isdigit((unsigned char)*s)) return false;
    return true;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isAlphaStr",
        r#"
static bool __btrc_isAlphaStr(const char* s) {
    if (!*s) return false;
    for (; *s; s++) if (!isalpha((unsigned char)*s)) return false;
    return true;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isAlnumStr",
        r#"
static bool __btrc_isAlnumStr(const char* s) {
    if (!*s) return false;
    for (; *s; s++) if (!isalnum((unsigned char)*s)) return false;
    return true;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isUpper",
        r#"
static bool __btrc_isUpper(const char* s) {
    bool any = false;
    for (; *s; s++) {
        if (islower((unsigned char)*s)) return false;
        if (isupper((unsigned char)*s)) any = true;
    }
    return any;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_isLower",
        r#"
static bool __btrc_isLower(const char* s) {
    bool any = false;
    for (; *s; s++) {
        if (isupper((unsigned char)*s)) return false;
        if (islower((unsigned char)*s)) any = true;
    }
    return any;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_charLen",
        r#"
static int __btrc_charLen(const char* s) {
    int n = 0;
    for (; *s; s++) if (((unsigned char)*s & 0xC0) != 0x80) n++;
    return n;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "string",
        "__btrc_intToString",
        r#"
static char* __btrc_intToString(int v) {
    char buf[32];
    snprintf(buf, sizeof buf, "%d", v);
    return __btrc_strdup(buf);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_longToString",
        r#"
static char* __btrc_longToString(long v) {
    char buf[32];
    snprintf(buf, sizeof buf, "%ld", v);
    return __btrc_strdup(buf);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_floatToString",
        r#"
static char* __btrc_floatToString(float v) {
    char buf[64];
    snprintf(buf, sizeof buf, "%f", (double)v);
    return __btrc_strdup(buf);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_doubleToString",
        r#"
static char* __btrc_doubleToString(double v) {
    char buf[64];
    snprintf(buf, sizeof buf, "%f", v);
    return __btrc_strdup(buf);
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "string",
        "__btrc_charToString",
        r#"
static char* __btrc_charToString(char c) {
    char* r = (char*)__btrc_safe_malloc(2);
    r[0] = c;
    r[1] = '\0';
    return r;
}
"#,
        &["alloc"],
    ));

    // ---- math ----
    helpers.push(helper(
        "math",
        "__btrc_div_int",
        r#"
static int __btrc_div_int(int a, int b) {
    if (b == 0) { fprintf(stderr, "division by zero\n"); exit(1); }
    return a / b;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "math",
        "__btrc_div_double",
        r#"
static double __btrc_div_double(double a, double b) {
    if (b == 0.0) { fprintf(stderr, "division by zero\n"); exit(1); }
    return a / b;
}
"#,
        &[],
    ));
    helpers.push(helper(
        "math",
        "__btrc_mod_int",
        r#"
static int __btrc_mod_int(int a, int b) {
    if (b == 0) { fprintf(stderr, "modulo by zero\n"); exit(1); }
    return a % b;
}
"#,
        &[],
    ));

    // ---- hash ----
    helpers.push(helper(
        "hash",
        "__btrc_hash_str",
        r#"
static unsigned int __btrc_hash_str(const char* s) {
    unsigned int h = 2166136261u;
    for (; *s; s++) {
        h ^= (unsigned char)*s;
        h *= 16777619u;
    }
    return h;
}
"#,
        &[],
    ));

    // ---- trycatch ----
    helpers.push(helper(
        "trycatch",
        "__btrc_trycatch_globals",
        r#"
static jmp_buf* __btrc_try_stack = NULL;
static int __btrc_try_top = -1;
static int __btrc_try_cap = 8;
static const char* __btrc_error_msg = NULL;
"#,
        &[],
    ));
    helpers.push(helper(
        "trycatch",
        "__btrc_throw",
        r#"
static void __btrc_throw(const char* msg) {
    __btrc_error_msg = msg;
    if (__btrc_try_top >= 0) {
        longjmp(__btrc_try_stack[__btrc_try_top--], 1);
    }
    fprintf(stderr, "Uncaught exception: %s\n", msg);
    exit(1);
}
"#,
        &[],
    ));

    // ---- thread ----
    helpers.push(helper(
        "thread",
        "__btrc_thread_spawn",
        r#"
struct __btrc_thread {
    pthread_t handle;
};
static __btrc_thread_t* __btrc_thread_spawn(void* (*fn)(void*), void* arg) {
    __btrc_thread_t* t = (__btrc_thread_t*)__btrc_safe_malloc(sizeof(__btrc_thread_t));
    if (pthread_create(&t->handle, NULL, fn, arg) != 0) {
        fprintf(stderr, "thread spawn failed\n");
        exit(1);
    }
    return t;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "thread",
        "__btrc_thread_join",
        r#"
static void* __btrc_thread_join(__btrc_thread_t* t) {
    void* result = NULL;
    pthread_join(t->handle, &result);
    free(t);
    return result;
}
"#,
        &[],
    ));

    // ---- mutex ----
    helpers.push(helper(
        "mutex",
        "__btrc_mutex_val_create",
        r#"
struct __btrc_mutex {
    pthread_mutex_t mu;
    void* val;
};
static __btrc_mutex_t* __btrc_mutex_val_create(void* val) {
    __btrc_mutex_t* m = (__btrc_mutex_t*)__btrc_safe_malloc(sizeof(__btrc_mutex_t));
    pthread_mutex_init(&m->mu, NULL);
    m->val = val;
    return m;
}
"#,
        &["alloc"],
    ));
    helpers.push(helper(
        "mutex",
        "__btrc_mutex_lock",
        r#"
static void __btrc_mutex_lock(__btrc_mutex_t* m) { pthread_mutex_lock(&m->mu); }
"#,
        &[],
    ));
    helpers.push(helper(
        "mutex",
        "__btrc_mutex_unlock",
        r#"
static void __btrc_mutex_unlock(__btrc_mutex_t* m) { pthread_mutex_unlock(&m->mu); }
"#,
        &[],
    ));
    helpers.push(helper(
        "mutex",
        "__btrc_mutex_get",
        r#"
static intptr_t __btrc_mutex_get(__btrc_mutex_t* m) { return (intptr_t)m->val; }
"#,
        &[],
    ));
    helpers.push(helper(
        "mutex",
        "__btrc_mutex_set",
        r#"
static void __btrc_mutex_set(__btrc_mutex_t* m, intptr_t val) { m->val = (void*)val; }
"#,
        &[],
    ));

    helpers
}
