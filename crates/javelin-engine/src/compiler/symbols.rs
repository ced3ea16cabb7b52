//! Lexical scopes of a method body
//!
//! Every local gets a fixed slot relative to the frame base. Slots are
//! reused once their scope closes; the high-water mark becomes the program's
//! `stack_slot_count`.

use crate::types::Type;

/// A local variable or parameter
#[derive(Debug, Clone)]
pub(super) struct Symbol {
    pub name: String,
    pub ty: Type,
    pub offset: usize,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: Vec<Symbol>,
    first_free: usize,
}

/// Stack of scopes mirroring the block structure
#[derive(Debug)]
pub(super) struct SymbolTable {
    scopes: Vec<Scope>,
    next_free_relative_stack_pos: usize,
    max_slots: usize,
}

impl SymbolTable {
    /// Table with slot 0 reserved for the receiver
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            next_free_relative_stack_pos: 1,
            max_slots: 1,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope {
            symbols: Vec::new(),
            first_free: self.next_free_relative_stack_pos,
        });
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            if let Some(scope) = self.scopes.pop() {
                self.next_free_relative_stack_pos = scope.first_free;
            }
        }
    }

    /// Declare a name in the innermost scope
    ///
    /// Fails with the existing symbol when the name is already visible.
    pub fn declare(&mut self, name: &str, ty: Type) -> Result<usize, Symbol> {
        if let Some(existing) = self.lookup(name) {
            return Err(existing.clone());
        }
        let offset = self.reserve();
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.push(Symbol {
                name: name.to_string(),
                ty,
                offset,
            });
        }
        Ok(offset)
    }

    /// Hidden slot for a compiler temporary, released with its scope
    pub fn reserve(&mut self) -> usize {
        let offset = self.next_free_relative_stack_pos;
        self.next_free_relative_stack_pos += 1;
        self.max_slots = self.max_slots.max(self.next_free_relative_stack_pos);
        offset
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.symbols.iter().rev())
            .find(|symbol| symbol.name == name)
    }

    /// Frame size needed by everything declared so far
    pub fn stack_slot_count(&self) -> usize {
        self.max_slots
    }
}
