// ABOUTME: Environment chain managing variable bindings and lexical scopes

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope: a mutable name→value table plus a link to the scope it
/// was opened inside. Child scopes share ownership of their parent, so a
/// closure keeps its whole ancestor chain alive.
#[derive(Debug)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a root environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    /// Creates a child environment chained to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Unconditional insert into THIS scope; shadows without complaint.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.values.borrow_mut().insert(name.into(), value);
    }

    /// Look up a name here, then outward through the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.get(name),
            None => None,
        }
    }

    /// Overwrite the innermost existing binding. Returns false when no scope
    /// in the chain knows the name.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.values.borrow().contains_key(name) {
            self.values.borrow_mut().insert(name.to_string(), value);
            return true;
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => false,
        }
    }

    /// Read from the scope exactly `distance` links out. No fallthrough: the
    /// resolver has already decided where the binding lives.
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(distance)
            .and_then(|scope| scope.values.borrow().get(name).cloned())
    }

    /// Write into the scope exactly `distance` links out.
    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) -> bool {
        match self.ancestor(distance) {
            Some(scope) => {
                scope.values.borrow_mut().insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn ancestor(self: &Rc<Self>, distance: usize) -> Option<Rc<Environment>> {
        let mut scope = Rc::clone(self);
        for _ in 0..distance {
            let next = scope.enclosing.as_ref().map(Rc::clone)?;
            scope = next;
        }
        Some(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let env = Environment::new();
        env.define("x", Value::Int(42));

        match env.get("x") {
            Some(Value::Int(n)) => assert_eq!(n, 42),
            other => panic!("Expected Int(42), got {:?}", other),
        }
    }

    #[test]
    fn test_get_missing_name() {
        let env = Environment::new();
        assert!(env.get("missing").is_none());
    }

    #[test]
    fn test_child_shadows_parent() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));

        let child = Environment::with_enclosing(parent.clone());
        child.define("x", Value::Int(2));

        assert_eq!(child.get("x"), Some(Value::Int(2)));
        assert_eq!(parent.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_assign_walks_outward() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));

        let child = Environment::with_enclosing(parent.clone());
        assert!(child.assign("x", Value::Int(5)));
        assert_eq!(parent.get("x"), Some(Value::Int(5)));
    }

    #[test]
    fn test_assign_unknown_name_fails() {
        let env = Environment::new();
        assert!(!env.assign("ghost", Value::None));
    }

    #[test]
    fn test_get_at_skips_inner_shadow() {
        let root = Environment::new();
        root.define("x", Value::Int(1));
        let mid = Environment::with_enclosing(root);
        mid.define("x", Value::Int(2));
        let leaf = Environment::with_enclosing(mid);

        assert_eq!(leaf.get_at(1, "x"), Some(Value::Int(2)));
        assert_eq!(leaf.get_at(2, "x"), Some(Value::Int(1)));
        // No fallthrough: the leaf scope itself has no binding.
        assert_eq!(leaf.get_at(0, "x"), None);
    }

    #[test]
    fn test_assign_at_targets_exact_scope() {
        let root = Environment::new();
        root.define("x", Value::Int(1));
        let leaf = Environment::with_enclosing(root.clone());
        leaf.define("x", Value::Int(2));

        assert!(leaf.assign_at(1, "x", Value::Int(9)));
        assert_eq!(root.get("x"), Some(Value::Int(9)));
        assert_eq!(leaf.get_at(0, "x"), Some(Value::Int(2)));
    }

    #[test]
    fn test_ancestor_past_root_fails() {
        let env = Environment::new();
        assert_eq!(env.get_at(3, "x"), None);
        assert!(!env.assign_at(1, "x", Value::None));
    }
}
