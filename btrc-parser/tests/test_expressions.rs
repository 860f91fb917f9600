use btrc_ast::*;
use btrc_parser::Parser;

fn parse_stmts(body: &str) -> Vec<Stmt> {
    let source = format!("void run() {{ {} }}", body);
    let mut parser = Parser::new(&source).unwrap();
    let program = parser.parse().unwrap();
    let Decl::Function(f) = &program.declarations[0] else {
        panic!("expected function");
    };
    f.body.clone().unwrap().statements
}

fn first_expr(body: &str) -> Expr {
    match parse_stmts(body).into_iter().next().unwrap() {
        Stmt::Expr(e) => e,
        Stmt::VarDecl(v) => v.initializer.unwrap(),
        other => panic!("expected expression, got {:?}", other),
    }
}

#[test]
fn test_null_coalescing_binds_looser_than_equality() {
    let e = first_expr("x = a ?? b == c;");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op, right, .. } = value.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, "??");
    assert!(matches!(right.kind, ExprKind::Binary { ref op, .. } if op == "=="));
}

#[test]
fn test_optional_chaining() {
    let e = first_expr("x = a?.b;");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(
        value.kind,
        ExprKind::FieldAccess { optional: true, .. }
    ));
}

#[test]
fn test_arrow_field_access() {
    let e = first_expr("x = p->y;");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::FieldAccess { arrow: true, .. }));
}

#[test]
fn test_cast_and_grouping() {
    let e = first_expr("x = (int)y;");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Cast { .. }));

    // (y) is grouping, not a cast.
    let e = first_expr("x = (y);");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Identifier { .. }));
}

#[test]
fn test_list_and_map_literals() {
    let e = first_expr("List<int> xs = [1, 2, 3];");
    assert!(matches!(e.kind, ExprKind::ListLiteral { ref elements } if elements.len() == 3));

    let e = first_expr("Map<string, int> m = {\"a\": 1, \"b\": 2};");
    assert!(matches!(e.kind, ExprKind::MapLiteral { ref entries } if entries.len() == 2));

    let e = first_expr("Map<string, int> m = {};");
    assert!(matches!(e.kind, ExprKind::BraceInit { ref elements } if elements.is_empty()));
}

#[test]
fn test_fstring_parts_and_escapes() {
    let e = first_expr("string s = f\"a {x} b {{literal}} {y + 1}\";");
    let ExprKind::FString { parts } = e.kind else {
        panic!("expected f-string");
    };
    // "a ", {x}, " b {literal} ", {y + 1}
    assert_eq!(parts.len(), 4);
    assert!(matches!(&parts[0], FStringPart::Text(t) if t == "a "));
    assert!(matches!(&parts[1], FStringPart::Expr(_)));
    assert!(matches!(&parts[2], FStringPart::Text(t) if t == " b {literal} "));
    assert!(
        matches!(&parts[3], FStringPart::Expr(e) if matches!(e.kind, ExprKind::Binary { .. }))
    );
}

#[test]
fn test_lambda_forms() {
    let e = first_expr("x = (int a) => a * 2;");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Lambda(lambda) = value.kind else {
        panic!("expected lambda");
    };
    assert_eq!(lambda.params.len(), 1);
    assert!(matches!(lambda.body, LambdaBody::Expr(_)));

    let e = first_expr("x = int function(int a, int b) { return a + b; };");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Lambda(lambda) = value.kind else {
        panic!("expected lambda");
    };
    assert_eq!(lambda.return_type.as_ref().unwrap().base, "int");
    assert!(matches!(lambda.body, LambdaBody::Block(_)));
}

#[test]
fn test_spawn_and_new() {
    let e = first_expr("x = spawn(() => 42);");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Spawn { .. }));

    let e = first_expr("x = new Point(1, 2);");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::New { ref args, .. } if args.len() == 2));
}

#[test]
fn test_for_in_variants() {
    let stmts = parse_stmts("for x in xs { } for k, v in m { } parallel for i in ys { }");
    assert_eq!(stmts.len(), 3);
    assert!(matches!(&stmts[0], Stmt::ForIn(f) if f.var_name2.is_none() && !f.is_parallel));
    assert!(matches!(&stmts[1], Stmt::ForIn(f) if f.var_name2.is_some()));
    assert!(matches!(&stmts[2], Stmt::ForIn(f) if f.is_parallel));
}

#[test]
fn test_try_catch_finally() {
    let stmts = parse_stmts(
        "try { throw \"x\"; } catch (string e) { print(e); } finally { print(1); }",
    );
    let Stmt::TryCatch(t) = &stmts[0] else {
        panic!("expected try/catch");
    };
    assert_eq!(t.catch_var.as_deref(), Some("e"));
    assert_eq!(t.catch_type.as_ref().unwrap().base, "string");
    assert!(t.finally_block.is_some());
}

#[test]
fn test_release_and_delete() {
    let stmts = parse_stmts("release x; delete y;");
    assert!(matches!(&stmts[0], Stmt::Release { .. }));
    assert!(matches!(&stmts[1], Stmt::Delete { .. }));
}

#[test]
fn test_octal_literal_preserved() {
    let e = first_expr("int x = 0o17;");
    assert!(matches!(e.kind, ExprKind::IntLiteral { ref raw } if raw == "0o17"));
}
