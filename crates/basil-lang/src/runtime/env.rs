use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::TraceFrame;
use crate::runtime::value::Value;
use crate::syntax::position::Position;

/// Chained name→value map implementing lexical scope: lookup walks outward
/// through the parents, assignment always writes the current table. The
/// global table is the unique chain root.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, Value>,
    parent: Option<Rc<RefCell<SymbolTable>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<RefCell<SymbolTable>>) -> Self {
        Self { symbols: FxHashMap::default(), parent: Some(parent) }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.symbols.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.symbols.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) {
        self.symbols.remove(name);
    }
}

/// One call-stack entry: the display name of the executing scope plus where
/// in the parent it was entered. Contexts chain toward the program root and
/// exist purely for traceback rendering.
#[derive(Debug)]
pub struct Context {
    pub display_name: String,
    pub parent: Option<Rc<Context>>,
    pub parent_entry_pos: Option<Position>,
}

impl Context {
    pub fn root(display_name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self { display_name: display_name.into(), parent: None, parent_entry_pos: None })
    }

    pub fn child(self: &Rc<Self>, display_name: impl Into<String>, entry: Position) -> Rc<Self> {
        Rc::new(Self {
            display_name: display_name.into(),
            parent: Some(Rc::clone(self)),
            parent_entry_pos: Some(entry),
        })
    }

    /// Call frames from this context out to the root, returned root-first
    /// so the rendered traceback reads top-down into the error site.
    pub fn traceback(&self, error_pos: &Position) -> Vec<TraceFrame> {
        let mut frames = Vec::new();
        let mut pos = error_pos.clone();
        let mut ctx = Some(self);

        while let Some(current) = ctx {
            frames.push(TraceFrame {
                source_name: Rc::clone(&pos.source_name),
                line: pos.line,
                scope: current.display_name.clone(),
            });
            match (&current.parent, &current.parent_entry_pos) {
                (Some(parent), Some(entry)) => {
                    pos = entry.clone();
                    ctx = Some(parent);
                }
                _ => ctx = None,
            }
        }

        frames.reverse();
        frames
    }
}

/// The two parallel chains every evaluation runs against: the SymbolTable
/// chain is *lexical* (captured at closure definition), the Context chain
/// is the *call stack* (threaded through call sites).
#[derive(Debug, Clone)]
pub struct Environment {
    pub symbols: Rc<RefCell<SymbolTable>>,
    pub context: Rc<Context>,
}

impl Environment {
    pub fn new(symbols: Rc<RefCell<SymbolTable>>, context: Rc<Context>) -> Self {
        Self { symbols, context }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
