use crate::{
    error::{CompileError, Result},
    options::GenOptions,
    resolver::Resolver,
    scope::Scope,
    types::{FileId, SchemaTree},
};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// State of one generation run: the tree, the options and the scope cache.
///
/// A file's scope is built the first time it is asked for and shared by
/// every file that includes it afterwards.
pub struct Session<'t> {
    tree:     &'t SchemaTree,
    options:  GenOptions,
    scopes:   HashMap<FileId, Rc<Scope>>,
    building: HashSet<FileId>,
}

impl<'t> Session<'t> {
    pub fn new(tree: &'t SchemaTree, options: GenOptions) -> Session<'t> {
        Session {
            tree,
            options,
            scopes: HashMap::new(),
            building: HashSet::new(),
        }
    }

    pub fn tree(&self) -> &'t SchemaTree {
        self.tree
    }

    pub fn options(&self) -> &GenOptions {
        &self.options
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.options)
    }

    pub fn scope(&mut self, file: FileId) -> Result<Rc<Scope>> {
        if let Some(scope) = self.scopes.get(&file) {
            return Ok(Rc::clone(scope));
        }
        if !self.building.insert(file) {
            let path = self.tree.file(file).map(|f| f.path.clone()).unwrap_or_default();
            return Err(CompileError::CyclicInclude(path));
        }
        let built = Scope::build(self, file);
        self.building.remove(&file);
        let scope = Rc::new(built?);
        self.scopes.insert(file, Rc::clone(&scope));
        Ok(scope)
    }

    pub fn cached(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileNode, IncludeNode, StructKind, StructNode, FieldNode, Requiredness, TypeNode};

    #[test]
    fn include_cycle_is_reported() {
        let file = |path: &str, other: usize| FileNode {
            path: path.to_string(),
            includes: vec![IncludeNode { path: format!("{}.thrift", other), file: FileId(other) }],
            structs: vec![StructNode {
                name:   format!("S{}", other),
                kind:   StructKind::Struct,
                fields: vec![FieldNode::new(1, "x", TypeNode::included(0, &format!("S{}", 1 - other)), Requiredness::Default)],
            }],
            ..Default::default()
        };
        let tree = SchemaTree { files: vec![file("a.thrift", 1), file("b.thrift", 0)] };
        let mut session = Session::new(&tree, GenOptions::default());
        assert!(matches!(session.scope(FileId(0)), Err(CompileError::CyclicInclude(_))));
        assert_eq!(session.cached(), 0);
    }

    #[test]
    fn unknown_file() {
        let tree = SchemaTree::default();
        let mut session = Session::new(&tree, GenOptions::default());
        assert!(matches!(session.scope(FileId(3)), Err(CompileError::UnknownFile(FileId(3)))));
    }
}
