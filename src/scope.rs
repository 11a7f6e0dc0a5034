use std::collections::HashMap;

use crate::expr::ClassExpr;
use crate::registry::ImportBinding;
use crate::span::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

/// Where a declaration (or a reference) lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclScope {
    Module,
    Function(FunctionId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeEntry {
    pub name: String,
    pub init: ClassExpr,
    pub declared_at: DeclScope,
    /// Span of the binding identifier.
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub usize);

/// Per-file arena of single-assignment declarations plus the import
/// bindings used to verify utility function provenance.
///
/// Block scopes inside a function are flattened into the function. When a
/// name is declared twice in the same scope the first declaration wins.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    arena: Vec<ScopeEntry>,
    index: HashMap<(String, DeclScope), EntryId>,
    imports: Vec<ImportBinding>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, entry: ScopeEntry) -> EntryId {
        let key = (entry.name.clone(), entry.declared_at);
        if let Some(existing) = self.index.get(&key) {
            return *existing;
        }
        let id = EntryId(self.arena.len());
        self.arena.push(entry);
        self.index.insert(key, id);
        id
    }

    pub fn add_import(&mut self, binding: ImportBinding) {
        self.imports.push(binding);
    }

    pub fn imports(&self) -> &[ImportBinding] {
        &self.imports
    }

    pub fn entry(&self, id: EntryId) -> &ScopeEntry {
        &self.arena[id.0]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// A reference made from `from` resolves to a declaration in the same
    /// function, falling back to module level. Locals of other functions
    /// are never visible.
    pub fn resolve(&self, name: &str, from: DeclScope) -> Option<EntryId> {
        let local = match from {
            DeclScope::Function(_) => self.index.get(&(name.to_string(), from)),
            DeclScope::Module => None,
        };
        local
            .or_else(|| self.index.get(&(name.to_string(), DeclScope::Module)))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, text: &str, declared_at: DeclScope) -> ScopeEntry {
        ScopeEntry {
            name: name.to_string(),
            init: ClassExpr::string(text, SourceSpan::new(0, text.len() as u32 + 2)),
            declared_at,
            span: SourceSpan::new(0, name.len() as u32),
        }
    }

    #[test]
    fn test_module_level_resolves_everywhere() {
        let mut table = ScopeTable::new();
        let id = table.declare(entry("base", "flex", DeclScope::Module));
        assert_eq!(table.resolve("base", DeclScope::Module), Some(id));
        assert_eq!(table.resolve("base", DeclScope::Function(FunctionId(3))), Some(id));
    }

    #[test]
    fn test_function_locals_stay_in_their_function() {
        let mut table = ScopeTable::new();
        let f = DeclScope::Function(FunctionId(0));
        let g = DeclScope::Function(FunctionId(1));
        let id = table.declare(entry("styles", "p-4", f));
        assert_eq!(table.resolve("styles", f), Some(id));
        assert_eq!(table.resolve("styles", g), None);
        assert_eq!(table.resolve("styles", DeclScope::Module), None);
    }

    #[test]
    fn test_local_shadows_module() {
        let mut table = ScopeTable::new();
        let f = DeclScope::Function(FunctionId(0));
        let module = table.declare(entry("c", "flex", DeclScope::Module));
        let local = table.declare(entry("c", "grid", f));
        assert_eq!(table.resolve("c", f), Some(local));
        assert_eq!(table.resolve("c", DeclScope::Module), Some(module));
    }

    #[test]
    fn test_first_declaration_wins() {
        let mut table = ScopeTable::new();
        let first = table.declare(entry("c", "flex", DeclScope::Module));
        let second = table.declare(entry("c", "grid", DeclScope::Module));
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }
}
