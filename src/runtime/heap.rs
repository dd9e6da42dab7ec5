//! The default object runtime.
//!
//! Objects live behind `Rc`, so the strong count is the reference count the
//! interpreter's ownership rules are about. The heap keeps its own strong
//! references to the nil/true/false singletons and only `Weak` references to
//! everything else, which lets it report objects that outlive a run.

use std::io::Write;
use std::rc::{Rc, Weak};

use log::{debug, warn};

use crate::runtime::object_runtime::ObjectRuntime;
use crate::runtime::runtime_error::ObjectError;

/// A strong, owning reference to a heap object.
pub type ObjRef = Rc<Object>;

#[derive(Debug, PartialEq)]
pub enum Object {
    /// A plain instance; the receiver of a top-level program is one of these.
    Plain,
    Nil,
    Bool(bool),
    Str(String),
    Number(i64),
}

impl Object {
    pub fn class_name(&self) -> &'static str {
        match self {
            Object::Plain => "Object",
            Object::Nil => "Nil",
            Object::Bool(true) => "True",
            Object::Bool(false) => "False",
            Object::Str(_) => "String",
            Object::Number(_) => "Number",
        }
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Plain => write!(f, "#<Object>"),
            Object::Nil => write!(f, "nil"),
            Object::Bool(b) => write!(f, "{}", b),
            Object::Str(s) => write!(f, "{}", s),
            Object::Number(n) => write!(f, "{}", n),
        }
    }
}

const INITIAL_SWEEP: usize = 64;

/// Object runtime writing `print` output to `out`.
///
/// Creating a heap sets up the runtime for a run and dropping it tears the
/// runtime down again.
pub struct Heap<W: Write> {
    nil: ObjRef,
    true_obj: ObjRef,
    false_obj: ObjRef,
    out: W,
    allocated: Vec<Weak<Object>>,
    next_sweep: usize,
}

impl Heap<std::io::Stdout> {
    pub fn stdout() -> Self {
        Heap::new(std::io::stdout())
    }
}

impl<W: Write> Heap<W> {
    pub fn new(out: W) -> Self {
        debug!("object runtime initialised");
        Self {
            nil: Rc::new(Object::Nil),
            true_obj: Rc::new(Object::Bool(true)),
            false_obj: Rc::new(Object::Bool(false)),
            out,
            allocated: Vec::new(),
            next_sweep: INITIAL_SWEEP,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Number of allocated objects that are still referenced somewhere.
    /// Singletons are not counted.
    pub fn live_objects(&self) -> usize {
        self.allocated
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn alloc(&mut self, object: Object) -> ObjRef {
        if self.allocated.len() >= self.next_sweep {
            self.allocated.retain(|w| w.strong_count() > 0);
            self.next_sweep = (self.allocated.len() * 2).max(INITIAL_SWEEP);
        }

        let obj = Rc::new(object);
        self.allocated.push(Rc::downgrade(&obj));
        obj
    }

    fn expect_args(method: &str, expected: usize, args: &[ObjRef]) -> Result<(), ObjectError> {
        if args.len() != expected {
            return Err(ObjectError::Arity {
                method: method.to_string(),
                expected,
                got: args.len(),
            });
        }
        Ok(())
    }

    fn print(&mut self, args: &[ObjRef]) -> Result<ObjRef, ObjectError> {
        if args.is_empty() {
            writeln!(self.out)?;
        }
        for arg in args {
            writeln!(self.out, "{}", arg)?;
        }
        self.out.flush()?;
        Ok(self.nil())
    }
}

impl<W: Write> ObjectRuntime for Heap<W> {
    type Handle = ObjRef;

    fn new_self(&mut self) -> ObjRef {
        self.alloc(Object::Plain)
    }

    fn nil(&self) -> ObjRef {
        Rc::clone(&self.nil)
    }

    fn boolean(&self, value: bool) -> ObjRef {
        if value {
            Rc::clone(&self.true_obj)
        } else {
            Rc::clone(&self.false_obj)
        }
    }

    fn new_string(&mut self, text: &str) -> ObjRef {
        self.alloc(Object::Str(text.to_string()))
    }

    fn new_number(&mut self, value: i64) -> ObjRef {
        self.alloc(Object::Number(value))
    }

    fn number_value(&self, handle: &ObjRef) -> Result<i64, ObjectError> {
        match **handle {
            Object::Number(n) => Ok(n),
            ref other => Err(ObjectError::type_error("Number", other.class_name())),
        }
    }

    fn is_true(&self, handle: &ObjRef) -> bool {
        !matches!(**handle, Object::Nil | Object::Bool(false))
    }

    fn call(
        &mut self,
        receiver: &ObjRef,
        method: &str,
        args: &[ObjRef],
    ) -> Result<ObjRef, ObjectError> {
        match method {
            "print" => self.print(args),
            "to_s" => {
                Self::expect_args(method, 0, args)?;
                Ok(self.new_string(&receiver.to_string()))
            }
            "class" => {
                Self::expect_args(method, 0, args)?;
                Ok(self.new_string(receiver.class_name()))
            }
            "==" => {
                Self::expect_args(method, 1, args)?;
                let equal = match (&**receiver, &*args[0]) {
                    (Object::Plain, Object::Plain) => Rc::ptr_eq(receiver, &args[0]),
                    (a, b) => a == b,
                };
                Ok(self.boolean(equal))
            }
            _ => Err(ObjectError::MethodNotFound {
                class: receiver.class_name().to_string(),
                method: method.to_string(),
            }),
        }
    }
}

impl<W: Write> Drop for Heap<W> {
    fn drop(&mut self) {
        let live = self.live_objects();
        if live > 0 {
            warn!("object runtime torn down with {} live objects", live);
        }
        debug!("object runtime destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap() -> Heap<Vec<u8>> {
        Heap::new(Vec::new())
    }

    fn output(heap: &Heap<Vec<u8>>) -> String {
        String::from_utf8(heap.output().clone()).unwrap()
    }

    #[test]
    fn test_print_writes_each_argument_and_returns_nil() {
        let mut heap = heap();
        let receiver = heap.new_self();
        let a = heap.new_string("hi");
        let b = heap.new_number(32);

        let result = heap.call(&receiver, "print", &[a, b]).unwrap();

        assert_eq!(*result, Object::Nil);
        assert_eq!(output(&heap), "hi\n32\n");
    }

    #[test]
    fn test_truthiness() {
        let mut heap = heap();
        assert!(!heap.is_true(&heap.nil()));
        assert!(!heap.is_true(&heap.boolean(false)));
        assert!(heap.is_true(&heap.boolean(true)));

        let zero = heap.new_number(0);
        let empty = heap.new_string("");
        assert!(heap.is_true(&zero));
        assert!(heap.is_true(&empty));
    }

    #[test]
    fn test_singletons_are_shared() {
        let heap = heap();
        assert!(Rc::ptr_eq(&heap.nil(), &heap.nil()));
        assert!(Rc::ptr_eq(&heap.boolean(true), &heap.boolean(true)));
        assert!(!Rc::ptr_eq(&heap.boolean(true), &heap.boolean(false)));
    }

    #[test]
    fn test_releasing_singleton_copies_keeps_them_alive() {
        let heap = heap();
        for _ in 0..5 {
            drop(heap.nil());
        }
        // heap's own reference
        assert_eq!(Rc::strong_count(&heap.nil), 1);
    }

    #[test]
    fn test_to_s_and_class() {
        let mut heap = heap();
        let n = heap.new_number(7);

        let s = heap.call(&n, "to_s", &[]).unwrap();
        assert_eq!(*s, Object::Str("7".into()));

        let class = heap.call(&n, "class", &[]).unwrap();
        assert_eq!(*class, Object::Str("Number".into()));

        let nil = heap.nil();
        let class = heap.call(&nil, "class", &[]).unwrap();
        assert_eq!(*class, Object::Str("Nil".into()));
    }

    #[test]
    fn test_equality() {
        let mut heap = heap();
        let a = heap.new_number(3);
        let b = heap.new_number(3);
        let c = heap.new_string("3");

        assert_eq!(*heap.call(&a, "==", &[b]).unwrap(), Object::Bool(true));
        assert_eq!(*heap.call(&a, "==", &[c]).unwrap(), Object::Bool(false));

        let me = heap.new_self();
        let other = heap.new_self();
        assert_eq!(*heap.call(&me, "==", &[me.clone()]).unwrap(), Object::Bool(true));
        assert_eq!(*heap.call(&me, "==", &[other]).unwrap(), Object::Bool(false));
    }

    #[test]
    fn test_unknown_method() {
        let mut heap = heap();
        let receiver = heap.new_self();
        let err = heap.call(&receiver, "fly", &[]).unwrap_err();
        assert!(matches!(err, ObjectError::MethodNotFound { ref method, .. } if method == "fly"));
        assert_eq!(err.to_string(), "undefined method 'fly' for Object");
    }

    #[test]
    fn test_arity_mismatch() {
        let mut heap = heap();
        let receiver = heap.new_self();
        let arg = heap.nil();
        let err = heap.call(&receiver, "to_s", &[arg]).unwrap_err();
        assert!(matches!(
            err,
            ObjectError::Arity {
                expected: 0,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_number_value_type_error() {
        let mut heap = heap();
        let s = heap.new_string("x");
        let err = heap.number_value(&s).unwrap_err();
        assert!(matches!(err, ObjectError::TypeError { expected: "Number", .. }));
    }

    #[test]
    fn test_live_objects_tracks_drops() {
        let mut heap = heap();
        let a = heap.new_string("a");
        let b = heap.new_number(1);
        let _nil = heap.nil();
        assert_eq!(heap.live_objects(), 2);

        let a2 = a.clone();
        drop(a);
        assert_eq!(heap.live_objects(), 2);
        drop(a2);
        drop(b);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn test_sweep_prunes_dead_entries() {
        let mut heap = heap();
        for i in 0..1000 {
            heap.new_number(i);
        }
        assert!(heap.allocated.len() <= INITIAL_SWEEP * 2);
        assert_eq!(heap.live_objects(), 0);
    }
}
