//! Builds the replacement statement for each recognized assertion. Every
//! replacement is a conditional-failure block of the shape
//!
//! ```go
//! if <cond> { t.Errorf(...) }
//! ```
//!
//! optionally preceded by an initializer binding a call result so the
//! condition and the diagnostic do not evaluate it twice.

use crate::{
    classify::{Assertion, AssertionKind},
    core::Detestify,
    error::Error,
    heuristics,
    imports::{self, ImportDelta},
    parsing::{
        node_text, CALL_EXPRESSION_KIND, COMPOSITE_LITERAL_KIND, IDENTIFIER_KIND,
        INT_LITERAL_KIND, OPERAND_FIELD, OPERATOR_FIELD, PARENTHESIZED_EXPRESSION_KIND,
        SELECTOR_EXPRESSION_KIND, UNARY_EXPRESSION_KIND,
    },
    suite, util,
};
use std::path::Path;
use tree_sitter::Node;

struct Pieces {
    init: Option<String>,
    cond: String,
    format: String,
    args: Vec<String>,
    /// Structural-diff replacements join a preserved message with a bare
    /// space instead of `": "`.
    structural: bool,
}

/// Renders operand expressions back to source text. In a lifted suite method,
/// receiver mentions inside an operand read as the test handle.
struct Renderer<'a> {
    source: &'a str,
    receiver: Option<&'a str>,
}

impl Renderer<'_> {
    fn text(&self, node: Node) -> Result<String, String> {
        let text = node_text(node, self.source);
        if text.is_empty() {
            return Err("malformed operand".to_owned());
        }
        let Some(receiver) = self.receiver else {
            return Ok(text.to_owned());
        };
        let mut spans = Vec::new();
        suite::receiver_spans(node, receiver, self.source, &mut spans);
        let base = node.start_byte();
        let mut rendered = String::with_capacity(text.len());
        let mut offset = 0;
        for span in spans {
            rendered += &text[offset..span.start - base];
            rendered += "t";
            offset = span.end - base;
        }
        rendered += &text[offset..];
        Ok(rendered)
    }

    /// Like [`Self::text`], but parenthesizes composite literals, which may
    /// not appear bare in an `if` condition.
    fn cond_text(&self, node: Node) -> Result<String, String> {
        let rendered = self.text(node)?;
        if node.kind_id() == *COMPOSITE_LITERAL_KIND {
            Ok(format!("({rendered})"))
        } else {
            Ok(rendered)
        }
    }

    /// `!expr`, parenthesizing anything that does not bind tighter than `!`.
    fn negate(&self, node: Node) -> Result<String, String> {
        let rendered = self.text(node)?;
        let atomic = [
            *IDENTIFIER_KIND,
            *SELECTOR_EXPRESSION_KIND,
            *CALL_EXPRESSION_KIND,
            *PARENTHESIZED_EXPRESSION_KIND,
        ]
        .contains(&node.kind_id());
        if atomic {
            Ok(format!("!{rendered}"))
        } else {
            Ok(format!("!({rendered})"))
        }
    }

    /// Binds a call-expression operand through an initializer so that the
    /// condition and the diagnostic share a single evaluation. Non-call
    /// operands are used in place.
    fn bind_call(
        &self,
        node: Node,
        hint: impl FnOnce(Node) -> String,
    ) -> Result<(Option<String>, String), String> {
        let rendered = self.text(node)?;
        if node.kind_id() == *CALL_EXPRESSION_KIND {
            let name = hint(node);
            Ok((Some(format!("{name} := {rendered}")), name))
        } else {
            Ok((None, rendered))
        }
    }
}

pub(crate) fn synthesize(
    assertion: &Assertion<'_>,
    statement: Node<'_>,
    source: &str,
    path: &Path,
    receiver: Option<&str>,
    opts: &Detestify,
    imports: &mut ImportDelta,
) -> Result<String, Error> {
    let renderer = Renderer { source, receiver };
    let pieces = build(assertion, &renderer, source, opts, imports)
        .map_err(|message| Error::synthesis(path, message))?;

    let mut format = pieces.format;
    if let Some(message) = &assertion.message {
        let message = util::escape_percents(message);
        format = if pieces.structural {
            format!("{message} {format}")
        } else {
            format!("{message}: {format}")
        };
    }

    let indent = util::line_indent(source, statement.start_byte());
    let method = if assertion.fatal { "Fatalf" } else { "Errorf" };
    let init = pieces
        .init
        .map(|init| format!("{init}; "))
        .unwrap_or_default();
    let args = pieces
        .args
        .iter()
        .map(|arg| format!(", {arg}"))
        .collect::<String>();
    Ok(format!(
        "if {init}{cond} {{\n{indent}\t{handle}.{method}(\"{format}\"{args})\n{indent}}}",
        cond = pieces.cond,
        handle = assertion.handle,
    ))
}

#[allow(clippy::too_many_lines)]
fn build(
    assertion: &Assertion<'_>,
    renderer: &Renderer<'_>,
    source: &str,
    opts: &Detestify,
    imports: &mut ImportDelta,
) -> Result<Pieces, String> {
    let operands = &assertion.operands;

    let pieces = match assertion.kind {
        AssertionKind::Equal => {
            let (expected, actual) = (operands[0], operands[1]);
            if !opts.stdlib_only && heuristics::wants_structural_diff(expected, actual, source) {
                imports.add(imports::CMP);
                let context = heuristics::context_prefix(expected, actual, source);
                Pieces {
                    init: Some(format!(
                        "diff := cmp.Diff({}, {})",
                        renderer.text(expected)?,
                        renderer.text(actual)?
                    )),
                    cond: r#"diff != """#.to_owned(),
                    format: format!("{context}mismatch (-want +got):\\n%s"),
                    args: vec!["diff".to_owned()],
                    structural: true,
                }
            } else {
                Pieces {
                    init: Some(format!("got := {}", renderer.text(actual)?)),
                    cond: format!("got != {}", renderer.cond_text(expected)?),
                    format: "got %v, want %v".to_owned(),
                    args: vec!["got".to_owned(), renderer.text(expected)?],
                    structural: false,
                }
            }
        }
        AssertionKind::NotEqual => {
            let (unexpected, actual) = (operands[0], operands[1]);
            Pieces {
                init: Some(format!("got := {}", renderer.text(actual)?)),
                cond: format!("got == {}", renderer.cond_text(unexpected)?),
                format: "got %v, want not %v".to_owned(),
                args: vec!["got".to_owned(), renderer.text(unexpected)?],
                structural: false,
            }
        }
        AssertionKind::True => Pieces {
            init: None,
            cond: renderer.negate(operands[0])?,
            format: "expected true, got false".to_owned(),
            args: Vec::new(),
            structural: false,
        },
        AssertionKind::False => Pieces {
            init: None,
            cond: renderer.cond_text(operands[0])?,
            format: "expected false, got true".to_owned(),
            args: Vec::new(),
            structural: false,
        },
        AssertionKind::Nil => {
            let (init, value) =
                renderer.bind_call(operands[0], |call| heuristics::binding_hint(call, source))?;
            Pieces {
                init,
                cond: format!("{value} != nil"),
                format: "expected nil, got %v".to_owned(),
                args: vec![value],
                structural: false,
            }
        }
        AssertionKind::NotNil => {
            let (init, value) =
                renderer.bind_call(operands[0], |call| heuristics::binding_hint(call, source))?;
            Pieces {
                init,
                cond: format!("{value} == nil"),
                format: "expected non-nil value".to_owned(),
                args: Vec::new(),
                structural: false,
            }
        }
        AssertionKind::Empty => Pieces {
            init: Some(format!("got := {}", renderer.text(operands[0])?)),
            cond: "len(got) != 0".to_owned(),
            format: "expected empty, got length %d".to_owned(),
            args: vec!["len(got)".to_owned()],
            structural: false,
        },
        AssertionKind::NotEmpty => Pieces {
            init: Some(format!("got := {}", renderer.text(operands[0])?)),
            cond: "len(got) == 0".to_owned(),
            format: "expected non-empty value".to_owned(),
            args: Vec::new(),
            structural: false,
        },
        AssertionKind::Error => Pieces {
            init: None,
            cond: format!("{} == nil", renderer.text(operands[0])?),
            format: "expected error, got nil".to_owned(),
            args: Vec::new(),
            structural: false,
        },
        AssertionKind::NoError => {
            let (init, err) = renderer.bind_call(operands[0], |_| "err".to_owned())?;
            Pieces {
                init,
                cond: format!("{err} != nil"),
                format: "unexpected error: %v".to_owned(),
                args: vec![err],
                structural: false,
            }
        }
        AssertionKind::ErrorIs => {
            imports.add(imports::ERRORS);
            let (err, target) = (renderer.text(operands[0])?, renderer.text(operands[1])?);
            Pieces {
                init: None,
                cond: format!("!errors.Is({err}, {target})"),
                format: "expected error to be %v, got %v".to_owned(),
                args: vec![target, err],
                structural: false,
            }
        }
        AssertionKind::ErrorAs => {
            imports.add(imports::ERRORS);
            let (err, target) = (renderer.text(operands[0])?, renderer.text(operands[1])?);
            // The unwrapping applies only to the format argument, not to the
            // condition.
            let unwrapped = renderer.text(unwrap_address_of(operands[1], source))?;
            Pieces {
                init: None,
                cond: format!("!errors.As({err}, {target})"),
                format: "expected error to be assignable to %T".to_owned(),
                args: vec![unwrapped],
                structural: false,
            }
        }
        AssertionKind::Contains | AssertionKind::NotContains => {
            let expect_contains = assertion.kind == AssertionKind::Contains;
            let bang = if expect_contains { "!" } else { "" };
            let (container, element) = (renderer.text(operands[0])?, renderer.text(operands[1])?);
            if heuristics::container_is_string(operands[0], source) {
                imports.add(imports::STRINGS);
                Pieces {
                    init: None,
                    cond: format!("{bang}strings.Contains({container}, {element})"),
                    format: if expect_contains {
                        "expected %q to contain %q".to_owned()
                    } else {
                        "expected %q to not contain %q".to_owned()
                    },
                    args: vec![container, element],
                    structural: false,
                }
            } else {
                imports.add(imports::SLICES);
                Pieces {
                    init: None,
                    cond: format!("{bang}slices.Contains({container}, {element})"),
                    format: if expect_contains {
                        "expected slice to contain %v".to_owned()
                    } else {
                        "expected slice to not contain %v".to_owned()
                    },
                    args: vec![element],
                    structural: false,
                }
            }
        }
        AssertionKind::Len => {
            let length = operands[1];
            let init = Some(format!("got := {}", renderer.text(operands[0])?));
            if length.kind_id() == *INT_LITERAL_KIND {
                // Inline the literal into the format string for a tighter
                // diagnostic.
                let literal = renderer.text(length)?;
                Pieces {
                    init,
                    cond: format!("len(got) != {literal}"),
                    format: format!("got length %d, want {literal}"),
                    args: vec!["len(got)".to_owned()],
                    structural: false,
                }
            } else {
                Pieces {
                    init,
                    cond: format!("len(got) != {}", renderer.text(length)?),
                    format: "got length %d, want %v".to_owned(),
                    args: vec!["len(got)".to_owned(), renderer.text(length)?],
                    structural: false,
                }
            }
        }
        AssertionKind::Greater
        | AssertionKind::GreaterOrEqual
        | AssertionKind::Less
        | AssertionKind::LessOrEqual => {
            let (claimed, negated) = match assertion.kind {
                AssertionKind::Greater => (">", "<="),
                AssertionKind::GreaterOrEqual => (">=", "<"),
                AssertionKind::Less => ("<", ">="),
                _ => ("<=", ">"),
            };
            let (lhs, rhs) = (renderer.text(operands[0])?, renderer.text(operands[1])?);
            Pieces {
                init: None,
                cond: format!("{lhs} {negated} {rhs}"),
                format: format!("expected %v {claimed} %v"),
                args: vec![lhs, rhs],
                structural: false,
            }
        }
        AssertionKind::InDelta => {
            imports.add(imports::MATH);
            let (expected, actual, delta) = (
                renderer.text(operands[0])?,
                renderer.text(operands[1])?,
                renderer.text(operands[2])?,
            );
            Pieces {
                init: None,
                cond: format!("math.Abs({expected} - {actual}) > {delta}"),
                format: "expected %v to be within delta %v of %v".to_owned(),
                args: vec![actual, delta, expected],
                structural: false,
            }
        }
        AssertionKind::InEpsilon => {
            imports.add(imports::MATH);
            let (expected, actual, epsilon) = (
                renderer.text(operands[0])?,
                renderer.text(operands[1])?,
                renderer.text(operands[2])?,
            );
            Pieces {
                init: None,
                cond: format!(
                    "math.Abs({expected} - {actual}) / math.Abs({expected}) > {epsilon}"
                ),
                format: "expected %v to be within epsilon %v of %v".to_owned(),
                args: vec![actual, epsilon, expected],
                structural: false,
            }
        }
    };
    Ok(pieces)
}

fn unwrap_address_of<'tree>(node: Node<'tree>, source: &str) -> Node<'tree> {
    if node.kind_id() == *UNARY_EXPRESSION_KIND
        && node
            .child_by_field_id(*OPERATOR_FIELD)
            .is_some_and(|operator| node_text(operator, source) == "&")
    {
        if let Some(operand) = node.child_by_field_id(*OPERAND_FIELD) {
            return operand;
        }
    }
    node
}
