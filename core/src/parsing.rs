use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use tree_sitter::{Language, Node, Parser, Query, Tree};

// To future editors of this file: Tree-sitter Playground has been super helpful
// for debugging: https://tree-sitter.github.io/tree-sitter/playground

static LANGUAGE: Lazy<Language> = Lazy::new(|| Language::from(tree_sitter_go::LANGUAGE));

const SELECTOR_CALL_SOURCE: &str = r"
(call_expression
    function: (selector_expression
        operand: (_) @operand
        field: (field_identifier) @method
    )
) @call
";

const TYPE_STRUCT_SOURCE: &str = r"
(type_declaration
    (type_spec
        name: (type_identifier) @name
        type: (struct_type) @struct
    )
) @declaration
";

pub(crate) static SELECTOR_CALL_QUERY: Lazy<Query> = Lazy::new(|| valid_query(SELECTOR_CALL_SOURCE));
pub(crate) static TYPE_STRUCT_QUERY: Lazy<Query> = Lazy::new(|| valid_query(TYPE_STRUCT_SOURCE));

fn valid_query(source: &str) -> Query {
    #[allow(clippy::unwrap_used)]
    Query::new(&LANGUAGE, source).unwrap()
}

pub(crate) fn capture_index(query: &Query, name: &str) -> u32 {
    #[allow(clippy::unwrap_used)]
    query.capture_index_for_name(name).unwrap()
}

pub(crate) static ALTERNATIVE_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("alternative"));
pub(crate) static ARGUMENTS_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("arguments"));
pub(crate) static BODY_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("body"));
pub(crate) static CONSEQUENCE_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("consequence"));
pub(crate) static FIELD_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("field"));
pub(crate) static FUNCTION_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("function"));
pub(crate) static NAME_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("name"));
pub(crate) static OPERAND_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("operand"));
pub(crate) static OPERATOR_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("operator"));
pub(crate) static PACKAGE_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("package"));
pub(crate) static PATH_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("path"));
pub(crate) static RECEIVER_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("receiver"));
pub(crate) static TYPE_FIELD: Lazy<u16> = Lazy::new(|| valid_field_id("type"));

fn valid_field_id(field_name: &str) -> u16 {
    #[allow(clippy::unwrap_used)]
    LANGUAGE.field_id_for_name(field_name).unwrap().into()
}

pub(crate) static BLOCK_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("block"));
pub(crate) static CALL_EXPRESSION_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("call_expression"));
pub(crate) static COMMENT_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("comment"));
pub(crate) static COMMUNICATION_CASE_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("communication_case"));
pub(crate) static COMPOSITE_LITERAL_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("composite_literal"));
pub(crate) static DEFAULT_CASE_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("default_case"));
pub(crate) static EXPRESSION_CASE_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("expression_case"));
pub(crate) static EXPRESSION_STATEMENT_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("expression_statement"));
pub(crate) static EXPRESSION_SWITCH_STATEMENT_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("expression_switch_statement"));
pub(crate) static FIELD_DECLARATION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("field_declaration"));
pub(crate) static FIELD_DECLARATION_LIST_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("field_declaration_list"));
pub(crate) static FOR_STATEMENT_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("for_statement"));
pub(crate) static FUNCTION_DECLARATION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("function_declaration"));
pub(crate) static IDENTIFIER_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("identifier"));
pub(crate) static IF_STATEMENT_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("if_statement"));
pub(crate) static IMPORT_DECLARATION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("import_declaration"));
pub(crate) static IMPORT_SPEC_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("import_spec"));
pub(crate) static IMPORT_SPEC_LIST_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("import_spec_list"));
pub(crate) static INT_LITERAL_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("int_literal"));
pub(crate) static INTERPRETED_STRING_LITERAL_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("interpreted_string_literal"));
pub(crate) static LABELED_STATEMENT_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("labeled_statement"));
pub(crate) static LABEL_NAME_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("label_name"));
pub(crate) static METHOD_DECLARATION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("method_declaration"));
pub(crate) static PACKAGE_CLAUSE_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("package_clause"));
pub(crate) static PARAMETER_DECLARATION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("parameter_declaration"));
pub(crate) static PARENTHESIZED_EXPRESSION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("parenthesized_expression"));
pub(crate) static POINTER_TYPE_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("pointer_type"));
pub(crate) static QUALIFIED_TYPE_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("qualified_type"));
pub(crate) static RAW_STRING_LITERAL_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("raw_string_literal"));
pub(crate) static SELECTOR_EXPRESSION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("selector_expression"));
pub(crate) static SELECT_STATEMENT_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("select_statement"));
pub(crate) static STRUCT_TYPE_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("struct_type"));
pub(crate) static TYPE_CASE_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("type_case"));
pub(crate) static TYPE_DECLARATION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("type_declaration"));
pub(crate) static TYPE_IDENTIFIER_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("type_identifier"));
pub(crate) static TYPE_SPEC_KIND: Lazy<u16> = Lazy::new(|| non_zero_kind_id("type_spec"));
pub(crate) static TYPE_SWITCH_STATEMENT_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("type_switch_statement"));
pub(crate) static UNARY_EXPRESSION_KIND: Lazy<u16> =
    Lazy::new(|| non_zero_kind_id("unary_expression"));

fn non_zero_kind_id(kind: &str) -> u16 {
    let kind_id = LANGUAGE.id_for_node_kind(kind, true);
    assert_ne!(0, kind_id);
    kind_id
}

pub(crate) fn parse(contents: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&LANGUAGE)
        .with_context(|| "Failed to load Go grammar")?;
    // https://github.com/tree-sitter/tree-sitter/issues/255
    parser
        .parse(contents, None)
        .ok_or_else(|| anyhow!("Unspecified error"))
}

/// Returns the one-based line and column of the first error or missing node, if
/// any. Tree-sitter recovers from malformed input rather than failing, so this
/// is the parse-failure check.
pub(crate) fn error_position(tree: &Tree) -> Option<(usize, usize)> {
    fn find_error(node: Node) -> Option<Node> {
        if !node.has_error() {
            return None;
        }
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children = node.children(&mut cursor).collect::<Vec<_>>();
        children.into_iter().find_map(find_error).or(Some(node))
    }
    find_error(tree.root_node()).map(|node| {
        let point = node.start_position();
        (point.row + 1, point.column + 1)
    })
}

pub(crate) fn node_text<'source>(node: Node, source: &'source str) -> &'source str {
    source.get(node.byte_range()).unwrap_or_default()
}

pub(crate) fn named_non_comment_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind_id() != *COMMENT_KIND)
        .collect()
}

/// The named, non-comment arguments of a call expression.
pub(crate) fn arguments(call: Node<'_>) -> Option<Vec<Node<'_>>> {
    call.child_by_field_id(*ARGUMENTS_FIELD)
        .map(named_non_comment_children)
}

/// Finds an embedded field of the qualified form `package.Name` (possibly
/// behind a pointer) in a struct type's field declaration list.
pub(crate) fn embedded_qualified_field<'tree>(
    struct_type: Node<'tree>,
    source: &str,
    package: &str,
    name: &str,
) -> Option<Node<'tree>> {
    let list = named_non_comment_children(struct_type)
        .into_iter()
        .find(|child| child.kind_id() == *FIELD_DECLARATION_LIST_KIND)?;
    named_non_comment_children(list)
        .into_iter()
        .filter(|field| field.kind_id() == *FIELD_DECLARATION_KIND)
        .find(|field| {
            if field.child_by_field_id(*NAME_FIELD).is_some() {
                return false;
            }
            let Some(mut ty) = field.child_by_field_id(*TYPE_FIELD) else {
                return false;
            };
            if ty.kind_id() == *POINTER_TYPE_KIND {
                let Some(inner) = ty.named_child(0) else {
                    return false;
                };
                ty = inner;
            }
            ty.kind_id() == *QUALIFIED_TYPE_KIND
                && ty
                    .child_by_field_id(*PACKAGE_FIELD)
                    .is_some_and(|node| node_text(node, source) == package)
                && ty
                    .child_by_field_id(*NAME_FIELD)
                    .is_some_and(|node| node_text(node, source) == name)
        })
}
