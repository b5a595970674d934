//! Import bookkeeping. Rewriting passes record the standard-library (and
//! go-cmp) paths their replacements reference in an [`ImportDelta`]; once per
//! file, [`reconcile`] folds the delta into the file's import declaration and
//! drops every testify path wholesale.

use crate::{
    parsing::{
        self, node_text, IMPORT_DECLARATION_KIND, IMPORT_SPEC_KIND, IMPORT_SPEC_LIST_KIND,
        NAME_FIELD, PACKAGE_CLAUSE_KIND, PATH_FIELD,
    },
    rewriter::Edit,
    util,
};
use anyhow::{bail, Result};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Tree};

pub(crate) const TESTIFY_PREFIX: &str = "github.com/stretchr/testify";

pub(crate) const CMP: &str = "github.com/google/go-cmp/cmp";
pub(crate) const ERRORS: &str = "errors";
pub(crate) const MATH: &str = "math";
pub(crate) const SLICES: &str = "slices";
pub(crate) const STRINGS: &str = "strings";
pub(crate) const TESTING: &str = "testing";

/// Qualifier-to-path pairs for every package the synthesizer can reference.
/// The grouping pass uses these to recover from a missing registration.
const KNOWN_QUALIFIERS: &[(&str, &str)] = &[
    ("cmp", CMP),
    ("errors", ERRORS),
    ("math", MATH),
    ("slices", SLICES),
    ("strings", STRINGS),
    ("testing", TESTING),
];

static QUALIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b(cmp|errors|math|slices|strings|testing)\.").unwrap()
});

/// The set of paths to add to a file's imports, accumulated while replacement
/// statements are synthesized. Removal needs no accumulator: every path under
/// [`TESTIFY_PREFIX`] is removed unconditionally.
#[derive(Debug, Default)]
pub(crate) struct ImportDelta {
    to_add: IndexSet<&'static str>,
}

impl ImportDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &'static str) {
        self.to_add.insert(path);
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.to_add.iter().copied()
    }

    #[cfg(debug_assertions)]
    pub fn contains(&self, path: &str) -> bool {
        self.to_add.contains(path)
    }
}

/// Debug-build enforcement of the reconciliation invariant: every known
/// qualifier appearing in a replacement must be covered by the delta or by an
/// import the file already had. In release builds a violation is instead
/// repaired by [`group_imports`].
#[cfg(debug_assertions)]
pub(crate) fn assert_registered(source: &str, tree: &Tree, delta: &ImportDelta, edits: &[Edit]) {
    let root = tree.root_node();
    let mut existing = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind_id() == *IMPORT_DECLARATION_KIND {
            existing.extend(
                entries_of_declaration(child, source)
                    .into_iter()
                    .map(|entry| entry.path),
            );
        }
    }
    for edit in edits {
        for captures in QUALIFIER_RE.captures_iter(&edit.replacement) {
            let Some(qualifier) = captures.get(1) else {
                continue;
            };
            let Some(&(_, path)) = KNOWN_QUALIFIERS
                .iter()
                .find(|(known, _)| *known == qualifier.as_str())
            else {
                continue;
            };
            debug_assert!(
                delta.contains(path) || existing.iter().any(|existing| existing == path),
                "`{path}` was synthesized into a replacement but never registered"
            );
        }
    }
}

#[derive(Clone, Debug)]
struct ImportEntry {
    alias: Option<String>,
    path: String,
}

impl ImportEntry {
    fn bare(path: impl Into<String>) -> Self {
        Self {
            alias: None,
            path: path.into(),
        }
    }

    /// The name under which the package is referenced: its alias if it has
    /// one, else the last path segment.
    fn effective_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| self.path.rsplit('/').next().unwrap_or(&self.path))
    }

    fn render(&self) -> String {
        let alias = self
            .alias
            .as_ref()
            .map(|alias| format!("{alias} "))
            .unwrap_or_default();
        format!("\t{alias}\"{}\"\n", self.path)
    }
}

/// Replaces the file's import declaration(s) with a single parenthesized
/// declaration holding exactly the surviving paths plus the delta, sorted
/// lexicographically. A no-op when nothing is added and no testify path was
/// present, so untouched files stay byte-identical.
pub(crate) fn reconcile(source: &str, tree: &Tree, delta: &ImportDelta, edits: &mut Vec<Edit>) {
    let root = tree.root_node();
    let mut package_clause = None;
    let mut declarations = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind_id() == *PACKAGE_CLAUSE_KIND {
            package_clause = Some(child);
        } else if child.kind_id() == *IMPORT_DECLARATION_KIND {
            declarations.push(child);
        }
    }

    let mut removed_any = false;
    let mut entries = Vec::new();
    for declaration in &declarations {
        for entry in entries_of_declaration(*declaration, source) {
            if entry.path.starts_with(TESTIFY_PREFIX) {
                removed_any = true;
            } else if !entries
                .iter()
                .any(|existing: &ImportEntry| existing.path == entry.path)
            {
                entries.push(entry);
            }
        }
    }

    if delta.is_empty() && !removed_any {
        return;
    }

    for path in delta.iter() {
        if !entries.iter().any(|entry| entry.path == path) {
            entries.push(ImportEntry::bare(path));
        }
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    if entries.is_empty() {
        for declaration in &declarations {
            edits.push(Edit::new(removal_span(source, *declaration), ""));
        }
        return;
    }

    let block = render_block(entries.iter());
    if let Some((first, rest)) = declarations.split_first() {
        edits.push(Edit::new(first.byte_range(), block));
        for declaration in rest {
            edits.push(Edit::new(removal_span(source, *declaration), ""));
        }
    } else if let Some(package_clause) = package_clause {
        edits.push(Edit::insert(
            package_clause.end_byte(),
            format!("\n\n{block}"),
        ));
    }
}

/// Regroups the (already reconciled) import declaration the way goimports
/// would: standard library first, then external packages, each sorted, the
/// groups separated by a blank line. Also adds any known qualifier the code
/// references but the import set lacks; in debug builds that situation is a
/// programming defect and asserted against upstream.
pub(crate) fn group_imports(contents: &str) -> Result<String> {
    let tree = parsing::parse(contents)?;
    if parsing::error_position(&tree).is_some() {
        bail!("refusing to group imports in a source that fails to parse");
    }
    let root = tree.root_node();
    let mut cursor = root.walk();
    let Some(declaration) = root
        .named_children(&mut cursor)
        .find(|child| child.kind_id() == *IMPORT_DECLARATION_KIND)
    else {
        return Ok(contents.to_owned());
    };
    let mut entries = entries_of_declaration(declaration, contents);
    if entries.is_empty() {
        return Ok(contents.to_owned());
    }

    for qualifier in referenced_qualifiers(contents, declaration.end_byte()) {
        let Some(&(_, path)) = KNOWN_QUALIFIERS
            .iter()
            .find(|(known, _)| *known == qualifier)
        else {
            continue;
        };
        if entries.iter().any(|entry| entry.effective_name() == qualifier) {
            continue;
        }
        entries.push(ImportEntry::bare(path));
    }

    let (mut std_entries, mut external): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|entry| !is_external(&entry.path));
    std_entries.sort_by(|a, b| a.path.cmp(&b.path));
    external.sort_by(|a, b| a.path.cmp(&b.path));

    let mut block = String::from("import (\n");
    for entry in &std_entries {
        block += &entry.render();
    }
    if !std_entries.is_empty() && !external.is_empty() {
        block += "\n";
    }
    for entry in &external {
        block += &entry.render();
    }
    block += ")";

    let mut grouped = String::with_capacity(contents.len());
    grouped += &contents[..declaration.start_byte()];
    grouped += &block;
    grouped += &contents[declaration.end_byte()..];
    Ok(grouped)
}

fn entries_of_declaration(declaration: Node, source: &str) -> Vec<ImportEntry> {
    let mut specs = Vec::new();
    for child in parsing::named_non_comment_children(declaration) {
        if child.kind_id() == *IMPORT_SPEC_KIND {
            specs.push(child);
        } else if child.kind_id() == *IMPORT_SPEC_LIST_KIND {
            specs.extend(
                parsing::named_non_comment_children(child)
                    .into_iter()
                    .filter(|spec| spec.kind_id() == *IMPORT_SPEC_KIND),
            );
        }
    }
    specs
        .into_iter()
        .filter_map(|spec| {
            let path = spec.child_by_field_id(*PATH_FIELD)?;
            let path = node_text(path, source)
                .trim_matches(|c| c == '"' || c == '`')
                .to_owned();
            let alias = spec
                .child_by_field_id(*NAME_FIELD)
                .map(|name| node_text(name, source).to_owned());
            Some(ImportEntry { alias, path })
        })
        .collect()
}

fn render_block<'entries>(entries: impl Iterator<Item = &'entries ImportEntry>) -> String {
    let mut block = String::from("import (\n");
    for entry in entries {
        block += &entry.render();
    }
    block += ")";
    block
}

/// The whole lines of a declaration, including the trailing newline and one
/// following blank line.
fn removal_span(source: &str, declaration: Node) -> std::ops::Range<usize> {
    util::whole_lines(source, declaration.start_byte(), declaration.end_byte())
}

/// Known package qualifiers referenced after `offset`, with line comments
/// stripped so commentary does not fabricate imports.
fn referenced_qualifiers(contents: &str, offset: usize) -> IndexSet<&str> {
    let mut qualifiers = IndexSet::new();
    for line in contents[offset..].lines() {
        let code = line.split("//").next().unwrap_or_default();
        for captures in QUALIFIER_RE.captures_iter(code) {
            if let Some(qualifier) = captures.get(1) {
                qualifiers.insert(qualifier.as_str());
            }
        }
    }
    qualifiers
}

fn is_external(path: &str) -> bool {
    path.split('/').next().is_some_and(|host| host.contains('.'))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rewriter;

    fn reconciled(source: &str, to_add: &[&'static str]) -> String {
        let tree = parsing::parse(source).unwrap();
        let mut delta = ImportDelta::new();
        for path in to_add {
            delta.add(path);
        }
        let mut edits = Vec::new();
        reconcile(source, &tree, &delta, &mut edits);
        rewriter::apply(source, edits).unwrap()
    }

    #[test]
    fn testify_paths_are_removed_wholesale() {
        let source = "package p\n\nimport (\n\t\"testing\"\n\n\t\"github.com/stretchr/testify/assert\"\n\t\"github.com/stretchr/testify/require\"\n)\n";
        assert_eq!(
            "package p\n\nimport (\n\t\"testing\"\n)\n",
            reconciled(source, &[])
        );
    }

    #[test]
    fn added_paths_are_merged_and_sorted() {
        let source =
            "package p\n\nimport (\n\t\"testing\"\n\n\t\"github.com/stretchr/testify/assert\"\n)\n";
        assert_eq!(
            "package p\n\nimport (\n\t\"errors\"\n\t\"github.com/google/go-cmp/cmp\"\n\t\"testing\"\n)\n",
            reconciled(source, &[CMP, ERRORS])
        );
    }

    #[test]
    fn aliases_survive_reconciliation() {
        let source = "package p\n\nimport (\n\tgocmp \"github.com/google/go-cmp/cmp\"\n\n\t\"github.com/stretchr/testify/assert\"\n)\n";
        assert_eq!(
            "package p\n\nimport (\n\tgocmp \"github.com/google/go-cmp/cmp\"\n)\n",
            reconciled(source, &[])
        );
    }

    #[test]
    fn a_declaration_is_inserted_after_the_package_clause_when_none_exists() {
        let source = "package p\n\nfunc f() {}\n";
        assert_eq!(
            "package p\n\nimport (\n\t\"errors\"\n)\n\nfunc f() {}\n",
            reconciled(source, &[ERRORS])
        );
    }

    #[test]
    fn an_empty_final_set_removes_the_declaration() {
        let source = "package p\n\nimport \"github.com/stretchr/testify/assert\"\n\nfunc f() {}\n";
        assert_eq!("package p\n\nfunc f() {}\n", reconciled(source, &[]));
    }

    #[test]
    fn untouched_files_are_left_byte_identical() {
        let source = "package p\n\nimport (\n\t\"zzz.example.com/x\"\n\t\"testing\"\n)\n";
        assert_eq!(source, reconciled(source, &[]));
    }

    #[test]
    fn grouping_splits_standard_library_from_external() {
        let source = "package p\n\nimport (\n\t\"github.com/google/go-cmp/cmp\"\n\t\"testing\"\n)\n\nfunc f() { _ = cmp.Diff; _ = testing.T{} }\n";
        let grouped = group_imports(source).unwrap();
        assert!(
            grouped.contains(
                "import (\n\t\"testing\"\n\n\t\"github.com/google/go-cmp/cmp\"\n)"
            ),
            "{grouped}"
        );
    }

    #[test]
    fn grouping_recovers_a_missing_known_import() {
        let source = "package p\n\nimport (\n\t\"testing\"\n)\n\nfunc f(t *testing.T) {\n\tif !strings.Contains(\"a\", \"b\") {\n\t\tt.Errorf(\"no\")\n\t}\n}\n";
        let grouped = group_imports(source).unwrap();
        assert!(grouped.contains("\t\"strings\"\n"), "{grouped}");
    }

    #[test]
    fn grouping_ignores_qualifiers_in_line_comments() {
        let source =
            "package p\n\nimport (\n\t\"testing\"\n)\n\nfunc f(t *testing.T) {\n\t// math.Abs would do\n}\n";
        let grouped = group_imports(source).unwrap();
        assert!(!grouped.contains("\"math\""), "{grouped}");
    }
}
