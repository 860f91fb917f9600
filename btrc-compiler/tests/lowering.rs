// End-to-end lowering tests: btrc source → emitted C text.
// These pin the observable shape of the translation for the core
// language scenarios.

use btrc_compiler::{generate_ir, optimize, CEmitter};
use btrc_resolver::{AnalyzedProgram, Analyzer};

fn analyze(source: &str) -> AnalyzedProgram {
    let mut parser = btrc_parser::Parser::new(source).unwrap();
    let program = parser.parse().unwrap();
    let analyzed = Analyzer::new("test.btrc").analyze(program);
    assert!(
        analyzed.errors.is_empty(),
        "resolver errors: {:#?}",
        analyzed.errors
    );
    analyzed
}

fn compile(source: &str) -> String {
    let analyzed = analyze(source);
    let module = generate_ir(&analyzed, false, "test.btrc");
    let module = optimize(module);
    CEmitter::new().emit(&module)
}

#[test]
fn test_integer_arithmetic() {
    let c = compile("int main() { int a = 10; int b = 20; print(a + b); return 0; }");
    assert!(c.contains("int main(void) {"), "c was:\n{}", c);
    assert!(c.contains("int a = 10;"));
    assert!(c.contains("printf(\"%d\\n\", (a + b));"));
    assert!(c.contains("return 0;"));
}

#[test]
fn test_string_concat_with_arc_tracking() {
    let c = compile("int main() { string s = \"a\"; s = s + \"b\"; print(s); return 0; }");
    assert!(c.contains("char* s = \"a\";"));
    assert!(c.contains("__btrc_str_track(__btrc_strcat(s, \"b\"))"));
    assert!(c.contains("printf(\"%s\\n\", s);"));
    // The helpers themselves must be present in the output.
    assert!(c.contains("static char* __btrc_strcat(const char* a, const char* b)"));
    assert!(c.contains("static char* __btrc_str_track(char* s)"));
}

#[test]
fn test_list_methods_and_iteration() {
    let c = compile(
        "int main() { List<int> xs = [3, 1, 2]; xs.sort(); for x in xs { print(x); } return 0; }",
    );
    assert!(c.contains("struct btrc_List_int {"));
    assert!(c.contains("btrc_List_int_push"));
    assert!(c.contains("btrc_List_int_sort(xs);"));
    // For-in lowers to an index loop binding the element up front.
    assert!(c.contains("xs->len"));
    assert!(c.contains("xs->data["));
}

#[test]
fn test_map_shape_and_rehash_policy() {
    let c = compile(
        "int main() {\n\
         \x20   Map<int, int> m = {};\n\
         \x20   for i in range(0, 100) { m.put(i, i * i); }\n\
         \x20   print(m.len);\n\
         \x20   return 0;\n\
         }",
    );
    assert!(c.contains("struct btrc_Map_int_int {"));
    assert!(c.contains("m->cap = 16;"));
    assert!(c.contains("m->len * 4 >= m->cap * 3"));
    assert!(c.contains("btrc_Map_int_int_put(m, i,"));
    assert!(c.contains("printf(\"%d\\n\", m->len);"));
}

#[test]
fn test_string_keyed_map_uses_hash_helper() {
    let c = compile(
        "int main() { Map<string, int> m = {}; m.put(\"k\", 1); print(m.get(\"k\")); return 0; }",
    );
    assert!(c.contains("__btrc_hash_str(key)"));
    assert!(c.contains("strcmp(m->keys[idx], key) == 0"));
    assert!(c.contains("static unsigned int __btrc_hash_str(const char* s)"));
}

#[test]
fn test_inheritance_static_dispatch() {
    let c = compile(
        "class A { A() {} public int f() { return 1; } }\n\
         class B extends A { B() {} public int f() { return 2; } }\n\
         int main() { B b = B(); print(b.f()); return 0; }",
    );
    assert!(c.contains("int B_f(B* self)"));
    assert!(c.contains("printf(\"%d\\n\", B_f(b));"));
    // Managed local released before returning.
    assert!(c.contains("--b->__rc"));
    assert!(c.contains("B_destroy(b)"));
}

#[test]
fn test_inherited_method_wrapper() {
    let c = compile(
        "class A { A() {} public int g() { return 7; } }\n\
         class B extends A { B() {} }\n\
         int main() { B b = B(); print(b.g()); return 0; }",
    );
    // Accessor wrapper casts through the ancestor.
    assert!(c.contains("int B_g(B* self)"));
    assert!(c.contains("A_g(((A*)self))"));
}

#[test]
fn test_try_catch_throw() {
    let c = compile(
        "int main() { try { throw \"x\"; } catch (string e) { print(e); } return 0; }",
    );
    assert!(c.contains("setjmp(__btrc_try_stack[__btrc_try_top]) == 0"));
    assert!(c.contains("__btrc_throw(\"x\");"));
    assert!(c.contains("const char* e = __btrc_error_msg;"));
    assert!(c.contains("Uncaught exception"));
    assert!(c.contains("#include <setjmp.h>"));
}

#[test]
fn test_class_struct_layout() {
    let c = compile(
        "class Point {\n\
         \x20   public int x = 0;\n\
         \x20   public int y = 0;\n\
         \x20   Point(int x, int y) { self.x = x; self.y = y; }\n\
         }\n\
         int main() { Point p = Point(1, 2); print(p.x); return 0; }",
    );
    // __rc leads the struct; _new births the count at 1.
    assert!(c.contains("struct Point {\n    int __rc;\n    int x;\n    int y;\n};"));
    assert!(c.contains("Point* Point_new(int x, int y)"));
    assert!(c.contains("self->__rc = 1;"));
    assert!(c.contains("memset(self, 0, sizeof(Point));"));
    assert!(c.contains("void Point_init(Point* self, int x, int y)"));
}

#[test]
fn test_enum_lowering() {
    let c = compile(
        "enum Color { RED, GREEN, BLUE }\n\
         int main() { Color c = RED; print(c.toString()); return 0; }",
    );
    assert!(c.contains("Color_RED = 0"));
    assert!(c.contains("const char* Color_toString(Color val)"));
    assert!(c.contains("return \"unknown\";"));
    assert!(c.contains("Color_toString(c)"));
}

#[test]
fn test_rich_enum_tagged_union() {
    let c = compile(
        "enum Shape { Circle(double r), Dot }\n\
         int main() { Shape s = Shape.Circle(2.0); print(s.toString()); return 0; }",
    );
    assert!(c.contains("Shape_Circle_TAG = 0"));
    // The wrapping struct must carry the tag and the variant union
    // exactly — a misplaced substitution here still leaves the loose
    // fragments intact, so pin the whole body.
    assert!(c.contains(
        "struct Shape {\n    Shape_Tag tag;\n    union {\n        Shape_Circle_Data Circle;\n    } data;\n};"
    ));
    assert!(c.contains("Shape Shape_Circle(double r)"));
    assert!(c.contains("switch (val.tag)"));
}

#[test]
fn test_user_generic_with_transitive_instance() {
    let c = compile(
        "class Node<T> {\n\
         \x20   public T value = 0;\n\
         \x20   public Node<T> next = null;\n\
         \x20   Node(T v) { self.value = v; }\n\
         }\n\
         class Stack<T> {\n\
         \x20   public Node<T> head = null;\n\
         \x20   Stack() {}\n\
         \x20   public void push(T v) {\n\
         \x20       Node<T> n = new Node<T>(v);\n\
         \x20       n.next = self.head;\n\
         \x20       self.head = n;\n\
         \x20   }\n\
         }\n\
         int main() { Stack<int> s = Stack(); s.push(1); return 0; }",
    );
    // Transitive Node<int> discovered from Stack<int>'s field.
    assert!(c.contains("struct btrc_Node_int {"), "c was:\n{}", c);
    assert!(c.contains("struct btrc_Stack_int {"));
    assert!(c.contains("btrc_Stack_int_push"));
    assert!(c.contains("btrc_Node_int_new"));
    // Instance structs carry the refcount first.
    assert!(c.contains("typedef struct btrc_Node_int btrc_Node_int;"));
    // Generic constructor patched via the declared type.
    assert!(c.contains("btrc_Stack_int_new()"));
}

#[test]
fn test_fstring_lowering() {
    let c = compile("int main() { int a = 1; string s = f\"a is {a}\"; print(s); return 0; }");
    assert!(c.contains("snprintf(NULL, 0, \"a is %d\", a)"));
    assert!(c.contains("__btrc_str_track((char*)malloc("));
}

#[test]
fn test_optional_chaining_and_null_coalescing() {
    let c = compile(
        "class P { public int v = 3; P() {} }\n\
         int main() { P p = P(); P q = p ?? p; print(q.v); return 0; }",
    );
    assert!(c.contains("((p != NULL) ? p : p)"));
}

#[test]
fn test_division_traps() {
    let c = compile("int main() { int a = 7; int b = 2; print(a / b); print(a % b); return 0; }");
    assert!(c.contains("__btrc_div_int(a, b)"));
    assert!(c.contains("__btrc_mod_int(a, b)"));
    assert!(c.contains("division by zero"));
}

#[test]
fn test_octal_passthrough() {
    let c = compile("int main() { int x = 0o17; print(x); return 0; }");
    assert!(c.contains("int x = 017;"));
}

#[test]
fn test_cyclable_class_gets_phased_release() {
    // Phased release fires on scope exit; a trailing return takes the
    // simple return-path release instead, so exercise a void function.
    let c = compile(
        "class Node { public Node next = null; Node() {} }\n\
         void build() { Node a = Node(); }\n\
         int main() { build(); return 0; }",
    );
    assert!(c.contains("__btrc_tracking = 1;"));
    assert!(c.contains("__btrc_suspect(a, (__btrc_visit_fn)Node_visit, (__btrc_destroy_fn)Node_destroy)"));
    assert!(c.contains("__btrc_collect_cycles()"));
    assert!(c.contains("static void Node_visit(void* __obj, void (*__cb)(void*))"));
    assert!(c.contains("__btrc_is_destroyed"));
}

#[test]
fn test_non_cyclable_simple_release() {
    let c = compile(
        "class Leaf { public int v = 0; Leaf() {} }\n\
         int main() { Leaf x = Leaf(); return 0; }",
    );
    assert!(c.contains("--x->__rc"));
    assert!(!c.contains("__btrc_collect_cycles"));
}

#[test]
fn test_keep_parameter_increments_refcount() {
    let c = compile(
        "class P { P() {} }\n\
         void hold(keep P p) { }\n\
         int main() { P p = P(); hold(p); return 0; }",
    );
    assert!(c.contains("p->__rc++"));
}

#[test]
fn test_release_statement() {
    let c = compile(
        "class P { P() {} }\n\
         int main() { P p = P(); release p; return 0; }",
    );
    assert!(c.contains("--p->__rc"));
    assert!(c.contains("p = NULL;"));
}

#[test]
fn test_properties() {
    let c = compile(
        "class Rect {\n\
         \x20   public int w = 2;\n\
         \x20   Rect() {}\n\
         \x20   property int area { get { return self.w * self.w; } }\n\
         \x20   property int tag;\n\
         }\n\
         int main() { Rect r = Rect(); print(r.area); r.tag = 5; print(r.tag); return 0; }",
    );
    assert!(c.contains("int Rect_get_area(Rect* self)"));
    assert!(c.contains("Rect_get_area(r)"));
    assert!(c.contains("Rect_set_tag(r, 5)"));
    assert!(c.contains("_prop_tag"));
}

#[test]
fn test_spawn_thread_wrapper() {
    let c = compile("int main() { Thread<int> t = spawn(() => 41); print(t.join()); return 0; }");
    assert!(c.contains("static void* __btrc_spawn_wrapper_1(void* __arg)"));
    assert!(c.contains("return ((void*)((intptr_t)41));"));
    assert!(c.contains("__btrc_thread_spawn((void*(*)(void*))__btrc_spawn_wrapper_1, NULL)"));
    assert!(c.contains("((int)((intptr_t)__btrc_thread_join(t)))"));
    assert!(c.contains("#include <pthread.h>"));
}

#[test]
fn test_string_methods_route_through_helpers() {
    let c = compile(
        "int main() { string s = \"  hi  \"; print(s.trim()); print(s.contains(\"h\")); return 0; }",
    );
    assert!(c.contains("__btrc_str_track(__btrc_trim(s))"));
    assert!(c.contains("__btrc_strContains(s, \"h\")"));
}

#[test]
fn test_main_void_upgraded_and_return_supplied() {
    let c = compile("void main() { print(1); }");
    assert!(c.contains("int main(void) {"));
    assert!(c.contains("return 0;"));
}

#[test]
fn test_for_in_map_and_string() {
    let c = compile(
        "int main() {\n\
         \x20   Map<string, int> m = {};\n\
         \x20   m.put(\"a\", 1);\n\
         \x20   for k, v in m { print(k); print(v); }\n\
         \x20   string s = \"ab\";\n\
         \x20   for ch in s { print(ch); }\n\
         \x20   return 0;\n\
         }",
    );
    assert!(c.contains("btrc_Map_string_int_put(m, \"a\", 1);"));
    // Map iteration walks the capacity with an occupancy guard.
    assert!(c.contains("< m->cap"));
    assert!(c.contains("m->occupied["));
    assert!(c.contains("m->keys["));
    assert!(c.contains("m->values["));
    assert!(c.contains("continue;"));
    // String iteration runs to the NUL terminator.
    assert!(c.contains("!= '\\0'"));
}

#[test]
fn test_lowering_is_deterministic() {
    use pretty_assertions::assert_eq;
    let source = "int main() { List<int> xs = [1]; Map<string, int> m = {}; print(xs.len); return 0; }";
    let a = compile(source);
    let b = compile(source);
    assert_eq!(a, b);
}
