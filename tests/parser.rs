#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;
    use rox as lox;

    use lox::ast::{ExprKind, NodeIds, Stmt, StmtKind};
    use lox::ast_printer::AstPrinter;
    use lox::error::ParseError;
    use lox::parser::Parser;
    use lox::scanner::Scanner;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<ParseError>) {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        assert!(errors.is_empty(), "unexpected scan errors: {:?}", errors);

        let mut ids = NodeIds::new();
        Parser::new(&tokens, &mut ids).parse()
    }

    /// Parse a program that must be error free and print every statement.
    fn print(source: &str) -> Vec<String> {
        let (statements, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(
            print("-123 * (45.67);"),
            vec!["(; (* (- 123.0) (group 45.67)))"]
        );
        assert_eq!(
            print("1 + 2 * 3 - 4 / 2;"),
            vec!["(; (- (+ 1.0 (* 2.0 3.0)) (/ 4.0 2.0)))"]
        );
        assert_eq!(
            print("a == b < c or d and !e;"),
            vec!["(; (or (== a (< b c)) (and d (! e))))"]
        );
    }

    #[test]
    fn test_ternary_is_right_associative() {
        assert_eq!(
            print("a ? b : c ? d : e;"),
            vec!["(; (?: a b (?: c d e)))"]
        );
        assert_eq!(
            print("x = a or b ? 1 : 2;"),
            vec!["(; (= x (?: (or a b) 1.0 2.0)))"]
        );
    }

    #[test]
    fn test_assignment_targets() {
        assert_eq!(print("a = b = 3;"), vec!["(; (= a (= b 3.0)))"]);
        assert_eq!(
            print("obj.field.x = 1;"),
            vec!["(; (= (. (. obj field) x) 1.0))"]
        );
    }

    #[test]
    fn test_invalid_assignment_target_does_not_unwind() {
        let (statements, errors) = parse("1 + 2 = 3; print 4;");

        assert_eq!(errors, vec![ParseError::InvalidAssignmentTarget { line: 1 }]);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_calls_and_properties() {
        assert_eq!(
            print("f(1, \"two\")(x).y;"),
            vec!["(; (. (call (call f 1.0 two) x) y))"]
        );
    }

    #[test]
    fn test_for_is_desugared_into_while() {
        assert_eq!(
            print("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
        assert_eq!(print("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            print("fun add(a, b) { return a + b; } var f = fun (x) { return x; };"),
            vec![
                "(fun add (a b) (block (return (+ a b))))",
                "(var f (fun (x) (block (return x))))",
            ]
        );
        assert_eq!(
            print("class B < A { init(n) { this.n = n; } class make() { return B(1); } }"),
            vec![
                "(class B < A (static make () (block (return (call B 1.0)))) \
                 (method init (n) (block (; (= (. this n) n)))))"
            ]
        );
    }

    #[test]
    fn test_class_statement_shape() {
        let (statements, _) = parse("class A { a() {} b() {} class c() {} }");

        let StmtKind::Class {
            name,
            superclass,
            methods,
            static_methods,
        } = &statements[0].kind
        else {
            panic!("expected a class declaration");
        };

        assert_eq!(name.lexeme, "A");
        assert!(superclass.is_none());
        assert_eq!(methods.len(), 2);
        assert_eq!(static_methods.len(), 1);
    }

    #[test]
    fn test_node_ids_are_unique() {
        let (statements, _) = parse("a; a;");

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Expression(expr) => {
                    assert!(matches!(expr.kind, ExprKind::Variable(_)));
                    expr.id
                }
                _ => panic!("expected expression statements"),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_break_outside_loop() {
        let (_, errors) = parse("break;");
        assert_eq!(errors, vec![ParseError::BreakStatementOutsideLoop { line: 1 }]);

        // A function body is not inside the enclosing loop.
        let (_, errors) = parse("while (true) { fun f() { break; } }");
        assert_eq!(errors, vec![ParseError::BreakStatementOutsideLoop { line: 1 }]);

        let (_, errors) = parse("while (true) { if (x) break; }");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_missing_left_operand() {
        let (statements, errors) = parse("* 3;\nprint 1;");

        assert_eq!(
            errors,
            vec![ParseError::MissingLeftOperand {
                line: 1,
                operator: "*".into()
            }]
        );
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_recovers_and_reports_several_errors() {
        let (statements, errors) = parse("var = 1;\nprint ;\nprint 3;");

        assert_eq!(
            errors,
            vec![
                ParseError::InvalidToken {
                    line: 1,
                    found: "'='".into(),
                    message: "Expected variable name.".into(),
                },
                ParseError::ExpectedExpression {
                    line: 2,
                    found: "';'".into(),
                },
            ]
        );
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_missing_semicolon_at_end() {
        let (_, errors) = parse("print 1");

        assert_eq!(
            errors,
            vec![ParseError::InvalidToken {
                line: 1,
                found: "end".into(),
                message: "Expected ';' after value.".into(),
            }]
        );
    }

    #[test]
    fn test_super_is_reserved() {
        let (_, errors) = parse("super.x;");

        assert!(matches!(errors[..], [ParseError::InvalidToken { line: 1, .. }]));
    }

    #[test]
    fn test_too_many_arguments_is_not_fatal() {
        let args = vec!["1"; 256].join(", ");
        let (statements, errors) = parse(&format!("f({});", args));

        assert_eq!(errors, vec![ParseError::TooManyArguments { line: 1 }]);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_too_many_parameters_is_not_fatal() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let (statements, errors) = parse(&format!("fun f({}) {{}}", params.join(", ")));

        assert_eq!(errors, vec![ParseError::TooManyParameters { line: 1 }]);
        assert_eq!(statements.len(), 1);

        match &statements[0].kind {
            StmtKind::Function(decl) => assert_eq!(decl.params.len(), 256),
            other => panic!("expected a function declaration, got {:?}", other),
        }
    }
}
