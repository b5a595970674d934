//! Mock translation is out of scope; this pass only marks the places a human
//! has to revisit. Struct declarations embedding `mock.Mock` and statements
//! invoking mock machinery get a leading TODO comment, at statement
//! granularity, and the code itself is left functionally intact.

use crate::{
    parsing::{
        capture_index, embedded_qualified_field, node_text, BLOCK_KIND, COMMUNICATION_CASE_KIND,
        DEFAULT_CASE_KIND, EXPRESSION_CASE_KIND, IDENTIFIER_KIND, SELECTOR_CALL_QUERY,
        TYPE_CASE_KIND, TYPE_STRUCT_QUERY,
    },
    rewriter::Edit,
    util,
};
use std::{collections::BTreeSet, ops::Range};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor, Tree};

/// The closed set of `testify/mock` method names worth flagging.
const MOCK_METHODS: &[&str] = &[
    "AssertCalled",
    "AssertExpectations",
    "AssertNotCalled",
    "AssertNumberOfCalls",
    "Called",
    "On",
    "Once",
    "Return",
    "Run",
    "Times",
    "Twice",
];

/// Qualifiers whose methods collide with the set above but are never mocks
/// (`t.Run` subtests, `suite.Run` bootstraps, assertion packages).
const SKIPPED_OPERANDS: &[&str] = &["assert", "require", "suite", "t"];

const TYPE_COMMENT: &str =
    "// TODO: replace this testify mock with a hand-written fake implementing the mocked interface.";
const CALL_COMMENT: &str = "// TODO: testify mock call; rewrite against a hand-written fake.";

pub(crate) fn annotate(source: &str, tree: &Tree, removed: &[Range<usize>], edits: &mut Vec<Edit>) {
    let mut offsets = BTreeSet::new();
    annotate_mock_types(source, tree, &mut offsets, edits);
    annotate_mock_calls(source, tree, removed, &mut offsets, edits);
}

fn annotate_mock_types(
    source: &str,
    tree: &Tree,
    offsets: &mut BTreeSet<usize>,
    edits: &mut Vec<Edit>,
) {
    let struct_index = capture_index(&TYPE_STRUCT_QUERY, "struct");
    let declaration_index = capture_index(&TYPE_STRUCT_QUERY, "declaration");

    let mut cursor = QueryCursor::new();
    let mut query_matches =
        cursor.matches(&TYPE_STRUCT_QUERY, tree.root_node(), source.as_bytes());
    while let Some(query_match) = query_matches.next() {
        let (mut struct_type, mut declaration) = (None, None);
        for capture in query_match.captures {
            if u32::from(capture.index) == struct_index {
                struct_type = Some(capture.node);
            } else if u32::from(capture.index) == declaration_index {
                declaration = Some(capture.node);
            }
        }
        let (Some(struct_type), Some(declaration)) = (struct_type, declaration) else {
            continue;
        };
        if embedded_qualified_field(struct_type, source, "mock", "Mock").is_none() {
            continue;
        }
        push_comment(source, declaration, TYPE_COMMENT, offsets, edits);
    }
}

fn annotate_mock_calls(
    source: &str,
    tree: &Tree,
    removed: &[Range<usize>],
    offsets: &mut BTreeSet<usize>,
    edits: &mut Vec<Edit>,
) {
    let operand_index = capture_index(&SELECTOR_CALL_QUERY, "operand");
    let method_index = capture_index(&SELECTOR_CALL_QUERY, "method");

    let mut cursor = QueryCursor::new();
    let mut query_matches =
        cursor.matches(&SELECTOR_CALL_QUERY, tree.root_node(), source.as_bytes());
    while let Some(query_match) = query_matches.next() {
        let (mut operand, mut method) = (None, None);
        for capture in query_match.captures {
            if u32::from(capture.index) == operand_index {
                operand = Some(capture.node);
            } else if u32::from(capture.index) == method_index {
                method = Some(capture.node);
            }
        }
        let (Some(operand), Some(method)) = (operand, method) else {
            continue;
        };
        if !MOCK_METHODS.contains(&node_text(method, source)) {
            continue;
        }
        if operand.kind_id() == *IDENTIFIER_KIND
            && SKIPPED_OPERANDS.contains(&node_text(operand, source))
        {
            continue;
        }
        let Some(statement) = enclosing_statement(method) else {
            continue;
        };
        if removed
            .iter()
            .any(|span| span.start <= statement.start_byte() && statement.end_byte() <= span.end)
        {
            continue;
        }
        push_comment(source, statement, CALL_COMMENT, offsets, edits);
    }
}

/// Ascends to the node sitting directly inside a block (or a switch/select
/// case). `None` when the call is not inside a function at all.
fn enclosing_statement(mut node: Node<'_>) -> Option<Node<'_>> {
    loop {
        let parent = node.parent()?;
        let parent_kind = parent.kind_id();
        if parent_kind == *BLOCK_KIND
            || parent_kind == *EXPRESSION_CASE_KIND
            || parent_kind == *TYPE_CASE_KIND
            || parent_kind == *COMMUNICATION_CASE_KIND
            || parent_kind == *DEFAULT_CASE_KIND
        {
            return Some(node);
        }
        node = parent;
    }
}

fn push_comment(
    source: &str,
    node: Node,
    comment: &str,
    offsets: &mut BTreeSet<usize>,
    edits: &mut Vec<Edit>,
) {
    let offset = util::line_start(source, node.start_byte());
    // One comment per statement, however many mock calls are chained in it,
    // and none at all on a rerun over already-annotated output.
    if already_annotated(source, offset, comment) || !offsets.insert(offset) {
        return;
    }
    let indent = util::line_indent(source, node.start_byte());
    edits.push(Edit::insert(offset, format!("{indent}{comment}\n")));
}

fn already_annotated(source: &str, line_offset: usize, comment: &str) -> bool {
    let Some(previous_end) = line_offset.checked_sub(1) else {
        return false;
    };
    let previous_start = util::line_start(source, previous_end);
    source[previous_start..previous_end].trim_start() == comment
}
