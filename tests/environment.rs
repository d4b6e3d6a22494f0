#[cfg(test)]
mod environment_tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use rox as lox;

    use lox::environment::{self, Environment};
    use lox::error::{InternalError, Interrupt, RuntimeError};
    use lox::value::Value;

    #[test]
    fn test_assign_then_get_in_same_scope() {
        let mut env = Environment::new();
        env.define("a", Some(Value::Number(1.0)));

        env.assign("a", Value::String("two".into()), 1).unwrap();

        assert_eq!(env.get("a", 1).unwrap(), Value::String("two".into()));
    }

    #[test]
    fn test_get_walks_enclosing_frames() {
        let global = Environment::new().shared();
        global.borrow_mut().define("a", Some(Value::Bool(true)));

        let inner = Environment::with_enclosing(Rc::clone(&global));

        assert_eq!(inner.get("a", 1).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_assign_through_child_is_visible_in_parent() {
        let global = Environment::new().shared();
        global.borrow_mut().define("a", Some(Value::Nil));

        let mut inner = Environment::with_enclosing(Rc::clone(&global));
        inner.assign("a", Value::Number(3.0), 1).unwrap();

        assert_eq!(global.borrow().get("a", 1).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_undeclared_and_undefined_are_distinct() {
        let mut env = Environment::new();
        env.define("declared", None);

        assert!(matches!(
            env.get("missing", 4),
            Err(RuntimeError::UndeclaredVariable { line: 4, .. })
        ));
        assert!(matches!(
            env.get("declared", 5),
            Err(RuntimeError::UndefinedVariable { line: 5, .. })
        ));
        assert!(matches!(
            env.assign("missing", Value::Nil, 6),
            Err(RuntimeError::UndeclaredVariable { line: 6, .. })
        ));

        // Assigning gives the slot a value.
        env.assign("declared", Value::Number(1.0), 7).unwrap();
        assert_eq!(env.get("declared", 7).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_get_at_only_looks_at_one_frame() {
        let outer = Environment::new().shared();
        outer.borrow_mut().define("x", Some(Value::Number(1.0)));

        let middle = Environment::with_enclosing(Rc::clone(&outer)).shared();
        middle.borrow_mut().define("x", Some(Value::Number(2.0)));

        let inner = Environment::with_enclosing(Rc::clone(&middle)).shared();

        assert_eq!(
            environment::get_at(&inner, 1, "x", 1).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            environment::get_at(&inner, 2, "x", 1).unwrap(),
            Value::Number(1.0)
        );

        // Nothing named `x` lives in the innermost frame itself.
        assert!(matches!(
            environment::get_at(&inner, 0, "x", 1),
            Err(Interrupt::Internal(
                InternalError::LocalVariableNotFoundAtExpectedDepth { depth: 0, .. }
            ))
        ));
    }

    #[test]
    fn test_assign_at_writes_exact_frame() {
        let outer = Environment::new().shared();
        outer.borrow_mut().define("x", Some(Value::Number(1.0)));

        let inner = Environment::with_enclosing(Rc::clone(&outer)).shared();
        inner.borrow_mut().define("x", Some(Value::Number(2.0)));

        environment::assign_at(&inner, 1, "x", Value::Number(10.0)).unwrap();

        assert_eq!(outer.borrow().get("x", 1).unwrap(), Value::Number(10.0));
        assert_eq!(inner.borrow().get("x", 1).unwrap(), Value::Number(2.0));

        assert_eq!(
            environment::assign_at(&inner, 5, "x", Value::Nil),
            Err(InternalError::LocalVariableNotFoundAtExpectedDepth {
                name: "x".into(),
                depth: 5
            })
        );
    }

    #[test]
    fn test_frames_outlive_their_creator() {
        let captured = {
            let global = Environment::new().shared();
            let block = Environment::with_enclosing(global).shared();
            block.borrow_mut().define("kept", Some(Value::Number(7.0)));
            block
        };

        assert_eq!(
            environment::get_at(&captured, 0, "kept", 1).unwrap(),
            Value::Number(7.0)
        );
    }
}
