//! Walks block statements and splices replacement statements over recognized
//! assertion calls. The walk recurses into nested blocks (`if`/`else` chains,
//! `for`, `switch`, `type switch`, `select`, labeled and bare blocks) but
//! never into expression positions: a call used as an argument is out of
//! scope, and so is the body of a function literal.

use crate::{
    classify,
    core::LightContext,
    error::Error,
    imports::ImportDelta,
    parsing::{
        named_non_comment_children, BLOCK_KIND, COMMUNICATION_CASE_KIND, CONSEQUENCE_FIELD,
        ALTERNATIVE_FIELD, BODY_FIELD, DEFAULT_CASE_KIND, EXPRESSION_CASE_KIND,
        EXPRESSION_STATEMENT_KIND, EXPRESSION_SWITCH_STATEMENT_KIND, FOR_STATEMENT_KIND,
        IF_STATEMENT_KIND, LABELED_STATEMENT_KIND, LABEL_NAME_KIND, SELECT_STATEMENT_KIND,
        TYPE_CASE_KIND, TYPE_SWITCH_STATEMENT_KIND,
    },
    rewriter::Edit,
    synthesize,
};
use std::path::Path;
use tree_sitter::Node;

pub(crate) struct Visitor<'context, 'source> {
    context: &'context LightContext<'context>,
    path: &'context Path,
    source: &'source str,
    /// Set while walking a lifted suite method's body; enables classification
    /// of `s.Equal(...)`-style calls.
    receiver: Option<&'context str>,
    imports: &'context mut ImportDelta,
    edits: &'context mut Vec<Edit>,
}

impl<'context, 'source> Visitor<'context, 'source> {
    pub fn new(
        context: &'context LightContext<'context>,
        path: &'context Path,
        source: &'source str,
        receiver: Option<&'context str>,
        imports: &'context mut ImportDelta,
        edits: &'context mut Vec<Edit>,
    ) -> Self {
        Self {
            context,
            path,
            source,
            receiver,
            imports,
            edits,
        }
    }

    pub fn transform_block(&mut self, block: Node<'source>) -> Result<(), Error> {
        debug_assert_eq!(*BLOCK_KIND, block.kind_id());
        for statement in named_non_comment_children(block) {
            self.transform_statement(statement)?;
        }
        Ok(())
    }

    fn transform_statement(&mut self, statement: Node<'source>) -> Result<(), Error> {
        let kind_id = statement.kind_id();

        if kind_id == *EXPRESSION_STATEMENT_KIND {
            let Some(assertion) = classify::classify_statement(
                statement,
                self.source,
                self.receiver,
                self.context.opts.preserve_messages,
            ) else {
                return Ok(());
            };
            let replacement = synthesize::synthesize(
                &assertion,
                statement,
                self.source,
                self.path,
                self.receiver,
                self.context.opts,
                self.imports,
            )?;
            self.trace(statement, assertion.kind);
            self.edits
                .push(Edit::new(statement.byte_range(), replacement));
            return Ok(());
        }

        if kind_id == *IF_STATEMENT_KIND {
            if let Some(consequence) = statement.child_by_field_id(*CONSEQUENCE_FIELD) {
                self.transform_block(consequence)?;
            }
            if let Some(alternative) = statement.child_by_field_id(*ALTERNATIVE_FIELD) {
                if alternative.kind_id() == *BLOCK_KIND {
                    self.transform_block(alternative)?;
                } else {
                    // An `else if` chain.
                    self.transform_statement(alternative)?;
                }
            }
            return Ok(());
        }

        if kind_id == *FOR_STATEMENT_KIND {
            if let Some(body) = statement.child_by_field_id(*BODY_FIELD) {
                self.transform_block(body)?;
            }
            return Ok(());
        }

        if kind_id == *EXPRESSION_SWITCH_STATEMENT_KIND
            || kind_id == *TYPE_SWITCH_STATEMENT_KIND
            || kind_id == *SELECT_STATEMENT_KIND
        {
            for case in named_non_comment_children(statement) {
                let case_kind = case.kind_id();
                if case_kind != *EXPRESSION_CASE_KIND
                    && case_kind != *TYPE_CASE_KIND
                    && case_kind != *COMMUNICATION_CASE_KIND
                    && case_kind != *DEFAULT_CASE_KIND
                {
                    continue;
                }
                // A case's named children mix its guarding expressions with
                // its statements; only statement kinds match below.
                for child in named_non_comment_children(case) {
                    self.transform_statement(child)?;
                }
            }
            return Ok(());
        }

        if kind_id == *LABELED_STATEMENT_KIND {
            for child in named_non_comment_children(statement) {
                if child.kind_id() != *LABEL_NAME_KIND {
                    self.transform_statement(child)?;
                }
            }
            return Ok(());
        }

        if kind_id == *BLOCK_KIND {
            return self.transform_block(statement);
        }

        Ok(())
    }

    fn trace(&self, statement: Node, kind: classify::AssertionKind) {
        let line = statement.start_position().row + 1;
        log::debug!("{}:{}: rewrote {} assertion", self.path.display(), line, kind);
        if self.context.opts.verbose {
            (self.context.println)(&format!(
                "{}:{}: rewrote {} assertion",
                self.path.display(),
                line,
                kind
            ));
        }
    }
}
