#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(source: &str) -> Program {
        parse_source(source).unwrap_or_else(|errs| panic!("parse failed for {source:?}: {errs:?}"))
    }

    fn first_expr(source: &str) -> Expr {
        match parse_str(source).body.remove(0).node {
            Stmt::Expr(e) => e.node,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_function_with_docstring_and_defaults() {
        let src = "def add(a, b=2, *rest, key=None, **opts):\n    \"\"\"Add things.\"\"\"\n    return a + b\n";
        let program = parse_str(src);
        let Stmt::FunctionDef(def) = &program.body[0].node else {
            panic!("expected def");
        };
        assert_eq!(def.name, "add");
        let kinds: Vec<ParamKind> = def.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::Normal,
                ParamKind::Normal,
                ParamKind::VarArgs,
                ParamKind::KeywordOnly,
                ParamKind::VarKeywords
            ]
        );
        assert_eq!(def.doc.as_ref().map(|d| d.text.as_str()), Some("Add things."));
    }

    #[test]
    fn test_module_docstring() {
        let program = parse_str("'''Module doc.'''\nx = 1\n");
        assert_eq!(program.doc.map(|d| d.text), Some("Module doc.".to_string()));
    }

    #[test]
    fn test_decorated_class_span_starts_at_decorator() {
        let src = "@skip('later')\nclass T(unittest.TestCase):\n    def test_x(self):\n        pass\n";
        let program = parse_str(src);
        let stmt = &program.body[0];
        assert_eq!(stmt.span.start, 0);
        let Stmt::ClassDef(class) = &stmt.node else {
            panic!("expected class");
        };
        assert_eq!(class.decorators.len(), 1);
        assert_eq!(class.bases.len(), 1);
        assert_eq!(class.body.len(), 1);
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 ** 2 parses as 1 + (2 * (3 ** 2))
        let Expr::Binary(_, BinaryOp::Add, rhs) = first_expr("1 + 2 * 3 ** 2\n") else {
            panic!("expected addition at the root");
        };
        let Expr::Binary(_, BinaryOp::Mul, pow) = rhs.node else {
            panic!("expected multiplication");
        };
        assert!(matches!(pow.node, Expr::Binary(_, BinaryOp::Pow, _)));

        // -2 ** 2 parses as -(2 ** 2)
        let Expr::Unary(UnaryOp::Neg, inner) = first_expr("-2 ** 2\n") else {
            panic!("expected negation at the root");
        };
        assert!(matches!(inner.node, Expr::Binary(_, BinaryOp::Pow, _)));
    }

    #[test]
    fn test_chained_comparison_and_membership() {
        let Expr::Compare(_, links) = first_expr("a < b <= c not in d is not e\n") else {
            panic!("expected comparison");
        };
        let ops: Vec<CompareOp> = links.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![CompareOp::Lt, CompareOp::LtEq, CompareOp::NotIn, CompareOp::IsNot]);
    }

    #[test]
    fn test_for_target_stops_before_in() {
        let program = parse_str("for k, v in items:\n    pass\nelse:\n    pass\n");
        let Stmt::For(for_stmt) = &program.body[0].node else {
            panic!("expected for");
        };
        assert!(matches!(for_stmt.target.node, Expr::Tuple(ref items) if items.len() == 2));
        assert_eq!(for_stmt.orelse.len(), 1);
    }

    #[test]
    fn test_assignment_forms() {
        let program = parse_str("a = b = 1\nx, *y = 1, 2, 3\nn += 1\nc: int = 3\nd: str\n");
        assert!(matches!(&program.body[0].node, Stmt::Assign(a) if a.targets.len() == 2));
        assert!(matches!(&program.body[1].node, Stmt::Assign(a) if matches!(a.targets[0].node, Expr::Tuple(_))));
        assert!(matches!(&program.body[2].node, Stmt::AugAssign(a) if a.op == BinaryOp::Add));
        assert!(matches!(&program.body[3].node, Stmt::Assign(_)));
        assert!(matches!(&program.body[4].node, Stmt::Pass));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errs = parse_source("f() = 1\n").unwrap_err();
        assert!(errs[0].message.contains("cannot assign to function call"));
        let errs = parse_source("1 += 2\n").unwrap_err();
        assert!(errs[0].message.contains("augmented assignment"));
    }

    #[test]
    fn test_try_except_else_finally() {
        let src = "try:\n    x()\nexcept (A, B) as e:\n    pass\nexcept:\n    raise\nelse:\n    y = 1\nfinally:\n    z = 2\n";
        let program = parse_str(src);
        let Stmt::Try(try_stmt) = &program.body[0].node else {
            panic!("expected try");
        };
        assert_eq!(try_stmt.handlers.len(), 2);
        assert_eq!(try_stmt.handlers[0].name.as_deref(), Some("e"));
        assert!(try_stmt.handlers[1].kind.is_none());
        assert_eq!(try_stmt.orelse.len(), 1);
        assert_eq!(try_stmt.finalbody.len(), 1);
    }

    #[test]
    fn test_try_without_handlers_is_an_error() {
        let errs = parse_source("try:\n    pass\nx = 1\n").unwrap_err();
        assert!(errs[0].message.contains("'except' or 'finally'"));
    }

    #[test]
    fn test_imports() {
        let program = parse_str("import os.path as p, sys\nfrom .pkg import (a, b as c,)\nfrom m import *\n");
        assert!(matches!(&program.body[0].node, Stmt::Import(aliases) if aliases.len() == 2));
        let Stmt::ImportFrom(from) = &program.body[1].node else {
            panic!("expected from-import");
        };
        assert_eq!(from.level, 1);
        assert_eq!(
            from.names,
            ImportNames::List(vec![("a".to_string(), None), ("b".to_string(), Some("c".to_string()))])
        );
        assert!(matches!(&program.body[2].node, Stmt::ImportFrom(f) if f.names == ImportNames::Star));
    }

    #[test]
    fn test_comprehensions_and_displays() {
        assert!(matches!(
            first_expr("[x * 2 for x in xs if x]\n"),
            Expr::Comprehension(c) if c.kind == ComprehensionKind::List && c.clauses[0].conditions.len() == 1
        ));
        assert!(matches!(first_expr("{k: v for k, v in d}\n"), Expr::Comprehension(c) if matches!(c.kind, ComprehensionKind::Dict(_))));
        assert!(matches!(first_expr("{1, 2}\n"), Expr::Set(items) if items.len() == 2));
        assert!(matches!(first_expr("{}\n"), Expr::Dict(entries) if entries.is_empty()));
        assert!(matches!(first_expr("(1,)\n"), Expr::Tuple(items) if items.len() == 1));
        assert!(matches!(first_expr("sum(x for x in xs)\n"), Expr::Call(_, args) if args.len() == 1));
    }

    #[test]
    fn test_slices() {
        let Expr::Subscript(_, index) = first_expr("xs[1:-1:2]\n") else {
            panic!("expected subscript");
        };
        let Expr::Slice(slice) = index.node else {
            panic!("expected slice");
        };
        assert!(slice.lower.is_some() && slice.upper.is_some() && slice.step.is_some());
        assert!(matches!(first_expr("xs[::]\n"), Expr::Subscript(_, i) if matches!(i.node, Expr::Slice(_))));
    }

    #[test]
    fn test_call_arguments() {
        let Expr::Call(_, args) = first_expr("f(1, *a, key=2, **kw)\n") else {
            panic!("expected call");
        };
        assert!(matches!(args[0], CallArg::Positional(_)));
        assert!(matches!(args[1], CallArg::Star(_)));
        assert!(matches!(args[2], CallArg::Keyword(ref n, _) if n == "key"));
        assert!(matches!(args[3], CallArg::DoubleStar(_)));
        let errs = parse_source("f(a=1, 2)\n").unwrap_err();
        assert!(errs[0].message.contains("positional argument follows keyword argument"));
    }

    #[test]
    fn test_lambda_and_conditional() {
        assert!(matches!(first_expr("lambda x, y=1: x + y\n"), Expr::Lambda(l) if l.params.len() == 2));
        assert!(matches!(first_expr("a if b else c\n"), Expr::Conditional { .. }));
    }

    #[test]
    fn test_fstring_and_implicit_concatenation() {
        let Expr::FString(parts) = first_expr("f'{name!r}: ' 'tail'\n") else {
            panic!("expected f-string");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], FStringPart::Expr { conversion: Some('r'), .. }));
        assert_eq!(parts[1], FStringPart::Literal(": tail".to_string()));
        assert_eq!(first_expr("'a' \"b\"\n"), Expr::Str("ab".to_string()));
    }

    #[test]
    fn test_single_line_suites_and_semicolons() {
        let program = parse_str("if x: a = 1; b = 2\nwhile y: break\n");
        let Stmt::If(if_stmt) = &program.body[0].node else {
            panic!("expected if");
        };
        assert_eq!(if_stmt.body.len(), 2);
        assert!(matches!(&program.body[1].node, Stmt::While(_)));
    }

    #[test]
    fn test_elif_chain_nests() {
        let program = parse_str("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");
        let Stmt::If(if_stmt) = &program.body[0].node else {
            panic!("expected if");
        };
        let Stmt::If(nested) = &if_stmt.orelse[0].node else {
            panic!("expected nested if");
        };
        assert_eq!(nested.orelse.len(), 1);
    }

    #[test]
    fn test_missing_indented_block() {
        let errs = parse_source("def f():\nreturn 1\n").unwrap_err();
        assert_eq!(errs[0].exception_name(), "IndentationError");
        assert!(errs[0].message.contains("expected an indented block"));
    }

    #[test]
    fn test_unexpected_indent() {
        let errs = parse_source("x = 1\n    y = 2\n").unwrap_err();
        assert!(errs[0].message.contains("unexpected indent"));
    }

    #[test]
    fn test_with_statement() {
        let program = parse_str("with self.assertRaises(ValueError) as cm, open(p):\n    pass\n");
        let Stmt::With(with) = &program.body[0].node else {
            panic!("expected with");
        };
        assert_eq!(with.items.len(), 2);
        assert!(with.items[0].target.is_some());
    }
}
