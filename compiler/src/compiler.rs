use crate::{
    error::{CompileError, Diagnostic, Result},
    gen_rust::{generate_file, GeneratedFile},
    options::GenOptions,
    session::Session,
    types::{FileId, SchemaTree},
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Output of one generation run.
#[derive(Debug)]
pub struct Generation {
    /// One entry per file, includes before the files including them.
    pub files:       Vec<GeneratedFile>,
    /// Declarations dropped under [`ErrorPolicy::Continue`](crate::options::ErrorPolicy::Continue).
    pub diagnostics: Vec<Diagnostic>,
}

/// Files reachable from `roots` in post order: every file comes after all
/// the files it includes, and each file appears once. Empty `roots` means
/// every file of the tree.
pub fn include_order(tree: &SchemaTree, roots: &[FileId]) -> Result<Vec<FileId>> {
    fn visit(
        tree: &SchemaTree,
        file: FileId,
        visited: &mut HashSet<FileId>,
        on_stack: &mut Vec<FileId>,
        order: &mut Vec<FileId>,
    ) -> Result<()> {
        if visited.contains(&file) {
            return Ok(());
        }
        let node = tree.file(file).ok_or(CompileError::UnknownFile(file))?;
        if on_stack.contains(&file) {
            return Err(CompileError::CyclicInclude(node.path.clone()));
        }
        on_stack.push(file);
        for include in &node.includes {
            visit(tree, include.file, visited, on_stack, order)?;
        }
        on_stack.pop();
        visited.insert(file);
        order.push(file);
        Ok(())
    }

    let roots: Vec<FileId> = match roots {
        [] => tree.file_ids().collect(),
        roots => roots.to_vec(),
    };
    let mut visited = HashSet::new();
    let mut on_stack = Vec::new();
    let mut order = Vec::new();
    for root in roots {
        visit(tree, root, &mut visited, &mut on_stack, &mut order)?;
    }
    Ok(order)
}

/// Generates every file reachable from `roots` with one shared scope cache.
#[tracing::instrument(level = "debug", skip_all, fields(roots = roots.len()))]
pub fn generate_all(tree: &SchemaTree, roots: &[FileId], options: GenOptions) -> Result<Generation> {
    let order = include_order(tree, roots)?;
    let mut session = Session::new(tree, options);
    let mut files = Vec::with_capacity(order.len());
    let mut diagnostics = Vec::new();
    for file in order {
        files.push(generate_file(&mut session, file, &mut diagnostics)?);
    }
    tracing::debug!(
        files = files.len(),
        scopes = session.cached(),
        diagnostics = diagnostics.len(),
        "generation finished"
    );
    Ok(Generation { files, diagnostics })
}

impl Generation {
    /// Generated files plus the `mod.rs` files that declare them, as
    /// `(relative path, contents)` sorted by path. The top-level `mod.rs`
    /// lists the first segment of every module path.
    pub fn output_files(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut leaves: BTreeMap<String, &GeneratedFile> = BTreeMap::new();
        let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for file in &self.files {
            if leaves.insert(file.module_path.clone(), file).is_some() {
                return Err(CompileError::DuplicateDeclaration(format!("module {}", file.module_path)));
            }
            let segments: Vec<&str> = file.module_path.split("::").collect();
            for depth in 0..segments.len() {
                children
                    .entry(segments[..depth].join("::"))
                    .or_default()
                    .insert(segments[depth].to_string());
            }
        }

        let mut outputs = Vec::new();
        for (parent, names) in &children {
            if leaves.contains_key(parent) {
                return Err(CompileError::DuplicateDeclaration(format!(
                    "module {} is both a file and a directory",
                    parent
                )));
            }
            let mut path: PathBuf = parent.split("::").filter(|s| !s.is_empty()).collect();
            path.push("mod.rs");
            let mut lines = vec!["// Generated by bthrift. Do not edit.".to_string()];
            lines.extend(names.iter().map(|name| format!("pub mod {};", name)));
            outputs.push((path, lines.join("\n") + "\n"));
        }
        for file in leaves.values() {
            outputs.push((file.output_path(), file.code.clone()));
        }
        outputs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(outputs)
    }

    /// Writes [`output_files`](Self::output_files) below `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (relative, code) in self.output_files()? {
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, code)?;
            tracing::debug!(path = %path.display(), "wrote");
            written.push(path);
        }
        Ok(written)
    }
}
