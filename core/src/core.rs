use crate::{
    error::{Error, ErrorKind},
    imports::{self, ImportDelta},
    mocks, parsing,
    rewriter,
    suite::{self, receiver_info},
    visitor::Visitor,
};
use std::path::{Path, PathBuf};

/// The option set the core consumes. `diff`, `dry_run`, `paths`, and `write`
/// are interpreted by the caller; the rest steer the rewrite itself.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Default)]
#[remain::sorted]
pub struct Detestify {
    pub diff: bool,
    pub dry_run: bool,
    pub paths: Vec<PathBuf>,
    pub preserve_messages: bool,
    pub stdlib_only: bool,
    pub verbose: bool,
    pub write: bool,
}

pub struct LightContext<'a> {
    pub opts: &'a Detestify,
    pub println: &'a dyn Fn(&dyn AsRef<str>),
}

#[derive(Debug)]
pub struct Rewritten {
    pub contents: String,
    pub changed: bool,
}

/// Rewrites one file's worth of source text: parse, lift suites, annotate
/// mocks, replace assertion calls, reconcile imports, verify that the result
/// still parses, and regroup the import block. The input text is never
/// touched on error.
pub fn rewrite(context: &LightContext, path: &Path, contents: &str) -> Result<Rewritten, Error> {
    let tree = parsing::parse(contents)
        .map_err(|error| Error::new(ErrorKind::Parse, format!("{}: {error}", path.display())))?;
    if let Some((line, column)) = parsing::error_position(&tree) {
        return Err(Error::parse(path, line, column));
    }

    let mut imports = ImportDelta::new();
    let mut edits = Vec::new();

    let suites = suite::rewrite_suites(context, path, contents, &tree, &mut imports, &mut edits)?;
    mocks::annotate(contents, &tree, &suites.removed, &mut edits);

    let root = tree.root_node();
    for declaration in parsing::named_non_comment_children(root) {
        let kind_id = declaration.kind_id();
        if kind_id != *parsing::FUNCTION_DECLARATION_KIND
            && kind_id != *parsing::METHOD_DECLARATION_KIND
        {
            continue;
        }
        if suites.removed.iter().any(|span| {
            span.start <= declaration.start_byte() && declaration.end_byte() <= span.end
        }) {
            continue;
        }
        if kind_id == *parsing::METHOD_DECLARATION_KIND && is_lifted(declaration, contents, &suites.types)
        {
            // Already walked by the suite rewriter, with the receiver bound.
            continue;
        }
        let Some(body) = declaration.child_by_field_id(*parsing::BODY_FIELD) else {
            continue;
        };
        Visitor::new(context, path, contents, None, &mut imports, &mut edits)
            .transform_block(body)?;
    }

    imports::reconcile(contents, &tree, &imports, &mut edits);

    if edits.is_empty() {
        return Ok(Rewritten {
            contents: contents.to_owned(),
            changed: false,
        });
    }

    #[cfg(debug_assertions)]
    imports::assert_registered(contents, &tree, &imports, &edits);

    let mut output =
        rewriter::apply(contents, edits).map_err(|error| Error::synthesis(path, error))?;

    // Parse closure: the rewritten text must re-parse cleanly, or the file is
    // left alone and the failure surfaced.
    let reparsed = parsing::parse(&output).map_err(|error| Error::synthesis(path, error))?;
    if let Some((line, column)) = parsing::error_position(&reparsed) {
        return Err(Error::synthesis(
            path,
            format!("rewritten source fails to parse at {line}:{column}"),
        ));
    }

    match imports::group_imports(&output) {
        Ok(grouped) => output = grouped,
        Err(error) => {
            // Fall back to the ungrouped text.
            log::warn!("{}: failed to group imports: {error}", path.display());
        }
    }

    if !output.ends_with('\n') {
        output.push('\n');
    }

    let changed = output != contents;
    Ok(Rewritten {
        contents: output,
        changed,
    })
}

fn is_lifted(declaration: tree_sitter::Node, source: &str, suite_types: &[String]) -> bool {
    receiver_info(declaration, source)
        .is_some_and(|(_, receiver_type)| suite_types.contains(&receiver_type))
        && declaration
            .child_by_field_id(*parsing::NAME_FIELD)
            .is_some_and(|name| parsing::node_text(name, source).starts_with("Test"))
}
