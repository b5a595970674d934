use crate::parsing::{
    arguments, node_text, CALL_EXPRESSION_KIND, EXPRESSION_STATEMENT_KIND, FIELD_FIELD,
    FUNCTION_FIELD, IDENTIFIER_KIND, INTERPRETED_STRING_LITERAL_KIND, OPERAND_FIELD,
    SELECTOR_EXPRESSION_KIND,
};
use heck::ToKebabCase;
use if_chain::if_chain;
use std::fmt;
use strum_macros::EnumIter;
use tree_sitter::Node;

/// The assertion methods the rewriter recognizes. Anything else is out of
/// scope and left untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter)]
#[remain::sorted]
pub enum AssertionKind {
    Contains,
    Empty,
    Equal,
    Error,
    ErrorAs,
    ErrorIs,
    False,
    Greater,
    GreaterOrEqual,
    InDelta,
    InEpsilon,
    Len,
    Less,
    LessOrEqual,
    Nil,
    NoError,
    NotContains,
    NotEmpty,
    NotEqual,
    NotNil,
    True,
}

impl AssertionKind {
    pub(crate) fn from_method(name: &str) -> Option<Self> {
        let kind = match name {
            "Contains" => Self::Contains,
            "Empty" => Self::Empty,
            "Equal" => Self::Equal,
            "Error" => Self::Error,
            "ErrorAs" => Self::ErrorAs,
            "ErrorIs" => Self::ErrorIs,
            "False" => Self::False,
            "Greater" => Self::Greater,
            "GreaterOrEqual" => Self::GreaterOrEqual,
            "InDelta" => Self::InDelta,
            "InEpsilon" => Self::InEpsilon,
            "Len" => Self::Len,
            "Less" => Self::Less,
            "LessOrEqual" => Self::LessOrEqual,
            "Nil" => Self::Nil,
            "NoError" => Self::NoError,
            "NotContains" => Self::NotContains,
            "NotEmpty" => Self::NotEmpty,
            "NotEqual" => Self::NotEqual,
            "NotNil" => Self::NotNil,
            "True" => Self::True,
            _ => return None,
        };
        Some(kind)
    }

    /// The number of operands the family requires, excluding the test handle
    /// and any trailing message operands.
    pub(crate) fn operand_count(self) -> usize {
        match self {
            Self::Empty
            | Self::Error
            | Self::False
            | Self::Nil
            | Self::NoError
            | Self::NotEmpty
            | Self::NotNil
            | Self::True => 1,
            Self::Contains
            | Self::Equal
            | Self::ErrorAs
            | Self::ErrorIs
            | Self::Greater
            | Self::GreaterOrEqual
            | Self::Len
            | Self::Less
            | Self::LessOrEqual
            | Self::NotContains
            | Self::NotEqual => 2,
            Self::InDelta | Self::InEpsilon => 3,
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_kebab_case())
    }
}

/// A recognized assertion call, reduced to the pieces the synthesizer needs.
pub(crate) struct Assertion<'tree> {
    pub kind: AssertionKind,
    pub fatal: bool,
    /// The test handle, already rendered as source text (`t`, `tb`, ...).
    pub handle: String,
    pub operands: Vec<Node<'tree>>,
    /// A literal message extracted from the first trailing operand, without
    /// its quotes. Only populated when message preservation is on.
    pub message: Option<String>,
}

/// Decides whether `statement` is an in-scope assertion call.
///
/// Recognition is strictly syntactic: the statement must wrap a call whose
/// function is `assert.M` or `require.M` — no alias resolution is performed —
/// or, when `receiver` names a lifted suite method's receiver, `r.M`,
/// `r.Assert().M`, or `r.Require().M`.
pub(crate) fn classify_statement<'tree>(
    statement: Node<'tree>,
    source: &str,
    receiver: Option<&str>,
    preserve_messages: bool,
) -> Option<Assertion<'tree>> {
    if statement.kind_id() != *EXPRESSION_STATEMENT_KIND {
        return None;
    }
    let call = crate::parsing::named_non_comment_children(statement)
        .into_iter()
        .next()?;
    if call.kind_id() != *CALL_EXPRESSION_KIND {
        return None;
    }
    let function = call.child_by_field_id(*FUNCTION_FIELD)?;
    if function.kind_id() != *SELECTOR_EXPRESSION_KIND {
        return None;
    }
    let operand = function.child_by_field_id(*OPERAND_FIELD)?;
    let method = function.child_by_field_id(*FIELD_FIELD)?;
    let kind = AssertionKind::from_method(node_text(method, source))?;
    let count = kind.operand_count();
    let args = arguments(call)?;

    if operand.kind_id() == *IDENTIFIER_KIND {
        let qualifier = node_text(operand, source);
        if qualifier == "assert" || qualifier == "require" {
            // Arity below the minimum is not an error; the call stays as is.
            if args.len() < 1 + count {
                return None;
            }
            return Some(Assertion {
                kind,
                fatal: qualifier == "require",
                handle: render_handle(args[0], source, receiver),
                operands: args[1..1 + count].to_vec(),
                message: message_operand(args.get(1 + count).copied(), source, preserve_messages),
            });
        }
        if receiver == Some(qualifier) {
            if args.len() < count {
                return None;
            }
            return Some(Assertion {
                kind,
                fatal: false,
                handle: "t".to_owned(),
                operands: args[..count].to_vec(),
                message: message_operand(args.get(count).copied(), source, preserve_messages),
            });
        }
        return None;
    }

    // s.Require().Equal(...) and s.Assert().Equal(...) inside suite methods.
    if_chain! {
        if let Some(receiver) = receiver;
        if operand.kind_id() == *CALL_EXPRESSION_KIND;
        if arguments(operand).is_some_and(|chain_args| chain_args.is_empty());
        if let Some(inner) = operand.child_by_field_id(*FUNCTION_FIELD);
        if inner.kind_id() == *SELECTOR_EXPRESSION_KIND;
        if let Some(inner_operand) = inner.child_by_field_id(*OPERAND_FIELD);
        if inner_operand.kind_id() == *IDENTIFIER_KIND;
        if node_text(inner_operand, source) == receiver;
        if let Some(chain) = inner.child_by_field_id(*FIELD_FIELD);
        let chain_name = node_text(chain, source);
        if chain_name == "Require" || chain_name == "Assert";
        if args.len() >= count;
        then {
            return Some(Assertion {
                kind,
                fatal: chain_name == "Require",
                handle: "t".to_owned(),
                operands: args[..count].to_vec(),
                message: message_operand(args.get(count).copied(), source, preserve_messages),
            });
        }
    }

    None
}

/// The test-handle operand as source text. In a lifted suite method, a handle
/// spelled via the receiver (`s.T()`, or `s` itself) reads as `t`.
fn render_handle(node: Node, source: &str, receiver: Option<&str>) -> String {
    if let Some(receiver) = receiver {
        if crate::suite::is_receiver_t_call(node, receiver, source)
            || (node.kind_id() == *IDENTIFIER_KIND && node_text(node, source) == receiver)
        {
            return "t".to_owned();
        }
    }
    node_text(node, source).to_owned()
}

/// Only the first trailing operand is considered, and only when it is a string
/// literal token. Non-literal messages are discarded.
fn message_operand(node: Option<Node>, source: &str, preserve_messages: bool) -> Option<String> {
    if !preserve_messages {
        return None;
    }
    let node = node?;
    if node.kind_id() != *INTERPRETED_STRING_LITERAL_KIND {
        return None;
    }
    let text = node_text(node, source);
    text.strip_prefix('"')
        .and_then(|text| text.strip_suffix('"'))
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parsing::{self, BLOCK_KIND};
    use strum::IntoEnumIterator;

    /// A lifetime-free summary of a classified statement.
    #[derive(Debug, Eq, PartialEq)]
    struct Classified {
        kind: AssertionKind,
        fatal: bool,
        handle: String,
        operands: usize,
        message: Option<String>,
    }

    fn classify_body(
        body: &str,
        receiver: Option<&str>,
        preserve_messages: bool,
    ) -> Option<Classified> {
        let source = format!("package p\n\nfunc f() {{\n\t{body}\n}}\n");
        let tree = parsing::parse(&source).unwrap();
        let mut cursor = tree.root_node().walk();
        let block = tree
            .root_node()
            .named_children(&mut cursor)
            .find_map(|child| child.child_by_field_id(*parsing::BODY_FIELD))
            .unwrap();
        assert_eq!(*BLOCK_KIND, block.kind_id());
        let statement = parsing::named_non_comment_children(block)
            .into_iter()
            .next()
            .unwrap();
        classify_statement(statement, &source, receiver, preserve_messages).map(|assertion| {
            Classified {
                kind: assertion.kind,
                fatal: assertion.fatal,
                handle: assertion.handle,
                operands: assertion.operands.len(),
                message: assertion.message,
            }
        })
    }

    #[test]
    fn method_names_map_to_kinds() {
        const TESTS: &[(&str, Option<AssertionKind>)] = &[
            ("Equal", Some(AssertionKind::Equal)),
            ("NotEqual", Some(AssertionKind::NotEqual)),
            ("ErrorIs", Some(AssertionKind::ErrorIs)),
            ("InEpsilon", Some(AssertionKind::InEpsilon)),
            ("Equalf", None),
            ("Same", None),
            ("", None),
        ];
        for &(name, expected) in TESTS {
            assert_eq!(expected, AssertionKind::from_method(name), "{name:?}");
        }
    }

    #[test]
    fn every_kind_has_an_operand_count() {
        for kind in AssertionKind::iter() {
            assert!((1..=3).contains(&kind.operand_count()), "{kind}");
        }
    }

    #[test]
    fn package_qualified_calls_are_classified() {
        let classified = classify_body("assert.Equal(t, 1, x)", None, false).unwrap();
        assert_eq!(AssertionKind::Equal, classified.kind);
        assert!(!classified.fatal);
        assert_eq!("t", classified.handle);
        assert_eq!(2, classified.operands);

        let classified = classify_body("require.NoError(t, err)", None, false).unwrap();
        assert_eq!(AssertionKind::NoError, classified.kind);
        assert!(classified.fatal);
    }

    #[test]
    fn underflow_and_foreign_calls_are_ignored() {
        assert_eq!(None, classify_body("assert.Equal(t, 1)", None, false));
        assert_eq!(None, classify_body("verify.Equal(t, 1, x)", None, false));
        assert_eq!(None, classify_body("t.Log(x)", None, false));
    }

    #[test]
    fn receiver_calls_require_a_receiver_context() {
        assert_eq!(None, classify_body("s.Equal(1, x)", None, false));

        let classified = classify_body("s.Equal(1, x)", Some("s"), false).unwrap();
        assert_eq!(AssertionKind::Equal, classified.kind);
        assert!(!classified.fatal);
        assert_eq!("t", classified.handle);

        let classified = classify_body("s.Require().NoError(err)", Some("s"), false).unwrap();
        assert_eq!(AssertionKind::NoError, classified.kind);
        assert!(classified.fatal);

        let classified = classify_body("s.Assert().True(ok)", Some("s"), false).unwrap();
        assert_eq!(AssertionKind::True, classified.kind);
        assert!(!classified.fatal);
    }

    #[test]
    fn only_literal_messages_are_extracted() {
        assert_eq!(
            Some("counter".to_owned()),
            classify_body(r#"assert.Equal(t, 1, x, "counter")"#, None, true)
                .unwrap()
                .message
        );
        assert_eq!(
            None,
            classify_body("assert.Equal(t, 1, x, msg)", None, true)
                .unwrap()
                .message
        );
        assert_eq!(
            None,
            classify_body(r#"assert.Equal(t, 1, x, "counter")"#, None, false)
                .unwrap()
                .message
        );
    }
}
