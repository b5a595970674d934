//! Lifts testify suites into free test functions: the suite struct loses its
//! embedded `suite.Suite`, each `Test*` method becomes `func TestX(t
//! *testing.T)` with receiver-based assertions routed through the regular
//! synthesizer, and the `suite.Run` bootstrap disappears.

use crate::{
    core::LightContext,
    error::Error,
    imports::{self, ImportDelta},
    parsing::{
        arguments, embedded_qualified_field, named_non_comment_children, node_text,
        CALL_EXPRESSION_KIND, EXPRESSION_STATEMENT_KIND, FIELD_DECLARATION_KIND,
        FIELD_DECLARATION_LIST_KIND, FIELD_FIELD, FUNCTION_DECLARATION_KIND, FUNCTION_FIELD,
        IDENTIFIER_KIND, METHOD_DECLARATION_KIND, NAME_FIELD, OPERAND_FIELD,
        PARAMETER_DECLARATION_KIND, POINTER_TYPE_KIND, RECEIVER_FIELD, SELECTOR_EXPRESSION_KIND,
        STRUCT_TYPE_KIND, TYPE_DECLARATION_KIND, TYPE_FIELD, TYPE_IDENTIFIER_KIND, TYPE_SPEC_KIND,
        BODY_FIELD,
    },
    rewriter::Edit,
    util,
    visitor::Visitor,
};
use std::{ops::Range, path::Path};
use tree_sitter::{Node, Tree};

pub(crate) struct SuiteRewrite {
    /// Names of the struct types that embed `suite.Suite`.
    pub types: Vec<String>,
    /// Byte ranges of declarations removed whole (bootstrap functions); the
    /// driver and the mock annotator must not touch anything inside them.
    pub removed: Vec<Range<usize>>,
}

pub(crate) fn rewrite_suites(
    context: &LightContext,
    path: &Path,
    source: &str,
    tree: &Tree,
    imports: &mut ImportDelta,
    edits: &mut Vec<Edit>,
) -> Result<SuiteRewrite, Error> {
    let root = tree.root_node();

    let types = rewrite_suite_types(root, source, edits);
    if types.is_empty() {
        return Ok(SuiteRewrite {
            types,
            removed: Vec::new(),
        });
    }

    lift_test_methods(context, path, source, root, &types, imports, edits)?;
    let removed = remove_bootstraps(source, root, edits);

    Ok(SuiteRewrite { types, removed })
}

/// Finds struct types embedding `suite.Suite`, deletes the embedded field,
/// and collapses the struct body to `struct{}` when nothing else remains.
fn rewrite_suite_types(root: Node, source: &str, edits: &mut Vec<Edit>) -> Vec<String> {
    let mut types = Vec::new();
    for declaration in named_non_comment_children(root) {
        if declaration.kind_id() != *TYPE_DECLARATION_KIND {
            continue;
        }
        for spec in named_non_comment_children(declaration) {
            if spec.kind_id() != *TYPE_SPEC_KIND {
                continue;
            }
            let (Some(name), Some(ty)) = (
                spec.child_by_field_id(*NAME_FIELD),
                spec.child_by_field_id(*TYPE_FIELD),
            ) else {
                continue;
            };
            if ty.kind_id() != *STRUCT_TYPE_KIND {
                continue;
            }
            let Some(embedded) = embedded_qualified_field(ty, source, "suite", "Suite") else {
                continue;
            };
            types.push(node_text(name, source).to_owned());

            let fields = named_non_comment_children(ty)
                .into_iter()
                .find(|child| child.kind_id() == *FIELD_DECLARATION_LIST_KIND)
                .map(|list| {
                    named_non_comment_children(list)
                        .into_iter()
                        .filter(|field| field.kind_id() == *FIELD_DECLARATION_KIND)
                        .count()
                })
                .unwrap_or_default();
            if fields == 1 {
                edits.push(Edit::new(ty.byte_range(), "struct{}"));
            } else {
                edits.push(Edit::new(
                    util::whole_lines(source, embedded.start_byte(), embedded.end_byte()),
                    "",
                ));
            }
        }
    }
    types
}

fn lift_test_methods(
    context: &LightContext,
    path: &Path,
    source: &str,
    root: Node,
    types: &[String],
    imports: &mut ImportDelta,
    edits: &mut Vec<Edit>,
) -> Result<(), Error> {
    for declaration in named_non_comment_children(root) {
        if declaration.kind_id() != *METHOD_DECLARATION_KIND {
            continue;
        }
        let Some((receiver_name, receiver_type)) = receiver_info(declaration, source) else {
            continue;
        };
        if !types.contains(&receiver_type) {
            continue;
        }
        let Some(name) = declaration.child_by_field_id(*NAME_FIELD) else {
            continue;
        };
        let name = node_text(name, source);
        if !name.starts_with("Test") {
            // Helper methods keep their receiver; only tests are lifted.
            continue;
        }
        let Some(body) = declaration.child_by_field_id(*BODY_FIELD) else {
            continue;
        };

        edits.push(Edit::new(
            declaration.start_byte()..body.start_byte(),
            format!("func {name}(t *testing.T) "),
        ));
        imports.add(imports::TESTING);

        let edits_before = edits.len();
        Visitor::new(
            context,
            path,
            source,
            receiver_name.as_deref(),
            imports,
            edits,
        )
        .transform_block(body)?;
        let replaced = edits[edits_before..]
            .iter()
            .map(|edit| edit.start..edit.end)
            .collect::<Vec<_>>();

        if let Some(receiver) = receiver_name {
            rewrite_receiver(body, &receiver, &replaced, source, edits);
        }
    }
    Ok(())
}

/// Rewrites remaining uses of the receiver identifier to the test handle:
/// `s.T()` collapses to `t`, and a bare `s` becomes `t`. Subtrees already
/// replaced by the assertion walk are left alone.
fn rewrite_receiver(
    node: Node,
    receiver: &str,
    replaced: &[Range<usize>],
    source: &str,
    edits: &mut Vec<Edit>,
) {
    let mut spans = Vec::new();
    receiver_spans(node, receiver, source, &mut spans);
    for span in spans {
        if replaced
            .iter()
            .any(|replaced| replaced.start <= span.start && span.end <= replaced.end)
        {
            continue;
        }
        edits.push(Edit::new(span, "t"));
    }
}

/// The byte ranges within `node`'s subtree that denote the receiver — `s.T()`
/// calls and bare `s` identifiers — each of which reads as the test handle
/// after lifting.
pub(crate) fn receiver_spans(
    node: Node,
    receiver: &str,
    source: &str,
    spans: &mut Vec<Range<usize>>,
) {
    if node.kind_id() == *CALL_EXPRESSION_KIND && is_receiver_t_call(node, receiver, source) {
        spans.push(node.byte_range());
        return;
    }
    if node.kind_id() == *IDENTIFIER_KIND && node_text(node, source) == receiver {
        spans.push(node.byte_range());
        return;
    }
    for child in named_non_comment_children(node) {
        receiver_spans(child, receiver, source, spans);
    }
}

pub(crate) fn is_receiver_t_call(call: Node, receiver: &str, source: &str) -> bool {
    let Some(function) = call.child_by_field_id(*FUNCTION_FIELD) else {
        return false;
    };
    function.kind_id() == *SELECTOR_EXPRESSION_KIND
        && function
            .child_by_field_id(*OPERAND_FIELD)
            .is_some_and(|operand| {
                operand.kind_id() == *IDENTIFIER_KIND && node_text(operand, source) == receiver
            })
        && function
            .child_by_field_id(*FIELD_FIELD)
            .is_some_and(|field| node_text(field, source) == "T")
        && arguments(call).is_some_and(|args| args.is_empty())
}

/// Removes `suite.Run(t, new(S))` bootstraps. A function whose body consists
/// solely of such calls is removed whole; otherwise only the statements go.
fn remove_bootstraps(source: &str, root: Node, edits: &mut Vec<Edit>) -> Vec<Range<usize>> {
    let mut removed = Vec::new();
    for declaration in named_non_comment_children(root) {
        if declaration.kind_id() != *FUNCTION_DECLARATION_KIND {
            continue;
        }
        let Some(body) = declaration.child_by_field_id(*BODY_FIELD) else {
            continue;
        };
        let statements = named_non_comment_children(body);
        let bootstraps = statements
            .iter()
            .copied()
            .filter(|statement| is_suite_run(*statement, source))
            .collect::<Vec<_>>();
        if bootstraps.is_empty() {
            continue;
        }
        if bootstraps.len() == statements.len() {
            edits.push(Edit::new(
                util::whole_lines(source, declaration.start_byte(), declaration.end_byte()),
                "",
            ));
            removed.push(declaration.byte_range());
        } else {
            for statement in bootstraps {
                edits.push(Edit::new(
                    util::whole_lines(source, statement.start_byte(), statement.end_byte()),
                    "",
                ));
            }
        }
    }
    removed
}

fn is_suite_run(statement: Node, source: &str) -> bool {
    if statement.kind_id() != *EXPRESSION_STATEMENT_KIND {
        return false;
    }
    let Some(call) = named_non_comment_children(statement).into_iter().next() else {
        return false;
    };
    if call.kind_id() != *CALL_EXPRESSION_KIND {
        return false;
    }
    let Some(function) = call.child_by_field_id(*FUNCTION_FIELD) else {
        return false;
    };
    function.kind_id() == *SELECTOR_EXPRESSION_KIND
        && function
            .child_by_field_id(*OPERAND_FIELD)
            .is_some_and(|operand| {
                operand.kind_id() == *IDENTIFIER_KIND && node_text(operand, source) == "suite"
            })
        && function
            .child_by_field_id(*FIELD_FIELD)
            .is_some_and(|field| node_text(field, source) == "Run")
}

/// The name (if any) and type name of a method's receiver. `None` for exotic
/// receivers (generics, anonymous types).
pub(crate) fn receiver_info(method: Node, source: &str) -> Option<(Option<String>, String)> {
    let receiver = method.child_by_field_id(*RECEIVER_FIELD)?;
    let parameter = named_non_comment_children(receiver)
        .into_iter()
        .find(|child| child.kind_id() == *PARAMETER_DECLARATION_KIND)?;
    let name = parameter
        .child_by_field_id(*NAME_FIELD)
        .map(|name| node_text(name, source).to_owned());
    let mut ty = parameter.child_by_field_id(*TYPE_FIELD)?;
    if ty.kind_id() == *POINTER_TYPE_KIND {
        ty = ty.named_child(0)?;
    }
    if ty.kind_id() != *TYPE_IDENTIFIER_KIND {
        return None;
    }
    Some((name, node_text(ty, source).to_owned()))
}
