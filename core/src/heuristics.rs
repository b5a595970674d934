//! Purely syntactic heuristics consulted by the synthesizer. No type checker
//! is involved; everything here keys on literal shapes and lexical names.

use crate::{
    parsing::{
        node_text, CALL_EXPRESSION_KIND, COMPOSITE_LITERAL_KIND, FIELD_FIELD, FUNCTION_FIELD,
        IDENTIFIER_KIND, INTERPRETED_STRING_LITERAL_KIND, OPERAND_FIELD, QUALIFIED_TYPE_KIND,
        RAW_STRING_LITERAL_KIND, SELECTOR_EXPRESSION_KIND, TYPE_FIELD, TYPE_IDENTIFIER_KIND,
        NAME_FIELD,
    },
    util,
};
use tree_sitter::Node;

/// Lexical tokens that suggest an identifier names a record or collection.
const COLLECTION_TOKENS: &[&str] = &["actual", "expected", "items", "users"];

/// Identifier names too generic to contribute a diagnostic context prefix.
const GENERIC_EXPECTED_NAMES: &[&str] = &["exp", "expected", "want"];

/// Whether an equality assertion should compare via a structural diff rather
/// than `!=`. True when either operand is a composite literal, a getter-style
/// call, or an identifier whose name suggests structured data.
pub(crate) fn wants_structural_diff(expected: Node, actual: Node, source: &str) -> bool {
    [expected, actual].iter().any(|&operand| {
        if operand.kind_id() == *COMPOSITE_LITERAL_KIND {
            return true;
        }
        if let Some(name) = callee_name(operand, source) {
            // A call named `get*` probably returns a record.
            return util::strip_get_prefix(name) != name;
        }
        if operand.kind_id() == *IDENTIFIER_KIND {
            let name = node_text(operand, source).to_lowercase();
            return COLLECTION_TOKENS.iter().any(|token| name.contains(token));
        }
        false
    })
}

/// Whether a containment operand is a string: a string literal, or a call into
/// the `fmt` package. Everything else is treated as a sequence.
pub(crate) fn container_is_string(container: Node, source: &str) -> bool {
    if container.kind_id() == *INTERPRETED_STRING_LITERAL_KIND
        || container.kind_id() == *RAW_STRING_LITERAL_KIND
    {
        return true;
    }
    if container.kind_id() != *CALL_EXPRESSION_KIND {
        return false;
    }
    let Some(function) = container.child_by_field_id(*FUNCTION_FIELD) else {
        return false;
    };
    function.kind_id() == *SELECTOR_EXPRESSION_KIND
        && function
            .child_by_field_id(*OPERAND_FIELD)
            .is_some_and(|operand| {
                operand.kind_id() == *IDENTIFIER_KIND && node_text(operand, source) == "fmt"
            })
}

/// A short identifier under which to bind a call operand's result, derived
/// from the callee name.
pub(crate) fn binding_hint(call: Node, source: &str) -> String {
    let Some(name) = callee_name(call, source) else {
        return "value".to_owned();
    };
    if name.to_lowercase().contains("error") {
        return "err".to_owned();
    }
    let stripped = util::strip_get_prefix(name);
    if stripped.is_empty() {
        "value".to_owned()
    } else {
        util::decapitalize(stripped)
    }
}

/// A human-readable prefix for structural-diff mismatch headings, e.g. `user `
/// for `assert.Equal(t, expected, getUser())`. Empty when nothing suitable is
/// found.
pub(crate) fn context_prefix(expected: Node, actual: Node, source: &str) -> String {
    if let Some(name) = callee_name(actual, source) {
        let stripped = util::strip_get_prefix(name);
        if stripped != name && !stripped.is_empty() {
            return format!("{} ", util::decapitalize(stripped));
        }
    }
    if expected.kind_id() == *COMPOSITE_LITERAL_KIND {
        if let Some(name) = composite_type_name(expected, source) {
            return format!("{} ", util::decapitalize(name));
        }
    }
    if expected.kind_id() == *IDENTIFIER_KIND {
        let name = node_text(expected, source);
        if !GENERIC_EXPECTED_NAMES.contains(&name) {
            return format!("{name} ");
        }
    }
    String::new()
}

/// The lexical name of a call's callee: the identifier itself, or the member
/// name of a selector. `None` for non-calls and exotic callees.
pub(crate) fn callee_name<'source>(call: Node, source: &'source str) -> Option<&'source str> {
    if call.kind_id() != *CALL_EXPRESSION_KIND {
        return None;
    }
    let function = call.child_by_field_id(*FUNCTION_FIELD)?;
    if function.kind_id() == *IDENTIFIER_KIND {
        Some(node_text(function, source))
    } else if function.kind_id() == *SELECTOR_EXPRESSION_KIND {
        function
            .child_by_field_id(*FIELD_FIELD)
            .map(|field| node_text(field, source))
    } else {
        None
    }
}

fn composite_type_name<'source>(literal: Node, source: &'source str) -> Option<&'source str> {
    let ty = literal.child_by_field_id(*TYPE_FIELD)?;
    if ty.kind_id() == *TYPE_IDENTIFIER_KIND {
        Some(node_text(ty, source))
    } else if ty.kind_id() == *QUALIFIED_TYPE_KIND {
        ty.child_by_field_id(*NAME_FIELD)
            .map(|name| node_text(name, source))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parsing;
    use tree_sitter::Tree;

    // Each helper parses `assert.Equal(t, <expected>, <actual>)` and applies
    // the heuristic under test to the operand nodes, returning an owned
    // result so no tree outlives its function.

    fn parsed(expected: &str, actual: &str) -> (String, Tree) {
        let source =
            format!("package p\n\nfunc f() {{\n\tassert.Equal(t, {expected}, {actual})\n}}\n");
        let tree = parsing::parse(&source).unwrap();
        (source, tree)
    }

    fn first_call<'tree>(tree: &'tree Tree) -> Node<'tree> {
        fn find(node: Node<'_>) -> Option<Node<'_>> {
            if node.kind_id() == *parsing::CALL_EXPRESSION_KIND {
                return Some(node);
            }
            let mut cursor = node.walk();
            let children = node.children(&mut cursor).collect::<Vec<_>>();
            children.into_iter().find_map(find)
        }
        find(tree.root_node()).unwrap()
    }

    fn structural_diff_of(expected: &str, actual: &str) -> bool {
        let (source, tree) = parsed(expected, actual);
        let args = parsing::arguments(first_call(&tree)).unwrap();
        wants_structural_diff(args[1], args[2], &source)
    }

    fn container_is_string_of(container: &str) -> bool {
        let (source, tree) = parsed(container, "x");
        let args = parsing::arguments(first_call(&tree)).unwrap();
        container_is_string(args[1], &source)
    }

    fn binding_hint_of(call: &str) -> String {
        let (source, tree) = parsed("1", call);
        let args = parsing::arguments(first_call(&tree)).unwrap();
        binding_hint(args[2], &source)
    }

    fn context_prefix_of(expected: &str, actual: &str) -> String {
        let (source, tree) = parsed(expected, actual);
        let args = parsing::arguments(first_call(&tree)).unwrap();
        context_prefix(args[1], args[2], &source)
    }

    #[test]
    fn structural_diff_choice() {
        const TESTS: &[(&str, &str, bool)] = &[
            ("1", "x", false),
            ("expected", "x", true),
            ("want", "users", true),
            ("User{Name: \"x\"}", "u", true),
            ("want", "getUser()", true),
            ("want", "fetchUser()", false),
        ];
        for &(expected, actual, wanted) in TESTS {
            assert_eq!(
                wanted,
                structural_diff_of(expected, actual),
                "{expected} / {actual}"
            );
        }
    }

    #[test]
    fn string_containers() {
        const TESTS: &[(&str, bool)] = &[
            (r#""hello world""#, true),
            ("`raw`", true),
            (r#"fmt.Sprintf("%d", n)"#, true),
            ("xs", false),
            ("getLines()", false),
        ];
        for &(container, wanted) in TESTS {
            assert_eq!(wanted, container_is_string_of(container), "{container}");
        }
    }

    #[test]
    fn binding_hints() {
        const TESTS: &[(&str, &str)] = &[
            ("getUser()", "user"),
            ("GetConfig()", "config"),
            ("loadError()", "err"),
            ("svc.GetUser()", "user"),
            ("build()", "build"),
            ("get()", "value"),
        ];
        for &(call, wanted) in TESTS {
            assert_eq!(wanted, binding_hint_of(call), "{call}");
        }
    }

    #[test]
    fn context_prefixes() {
        const TESTS: &[(&str, &str, &str)] = &[
            ("expected", "getUser()", "user "),
            ("User{Name: \"x\"}", "u", "user "),
            ("wantUser", "u", "wantUser "),
            ("expected", "u", ""),
            ("want", "fetchUser()", ""),
        ];
        for &(expected, actual, wanted) in TESTS {
            assert_eq!(
                wanted,
                context_prefix_of(expected, actual),
                "{expected} / {actual}"
            );
        }
    }
}
