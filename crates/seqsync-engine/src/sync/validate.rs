//! Semantic warnings.
//!
//! These run on the projected model after every cycle. They never block a
//! sync; the host shows them next to parse diagnostics.

use std::collections::BTreeSet;
use std::ops::Range;

use seqsync_syntax::{Diagnostic, LineIndex};

use crate::models::{ActionContent, ModelTree, SourceMap};

/// Check `model` against `text`, whose byte ranges `spans` describes.
pub fn semantic_warnings(model: &ModelTree, spans: &SourceMap, text: &str) -> Vec<Diagnostic> {
    let index = LineIndex::new(text);
    let mut active: BTreeSet<&str> = BTreeSet::new();
    let mut declared: BTreeSet<&str> = BTreeSet::new();
    let mut warnings = Vec::new();

    for id in model.preorder() {
        let Some(content) = model.get(id) else {
            continue;
        };
        let mut warn = |message: String| {
            let range = spans.get(id).map_or(0..0, |range| first_line(text, range));
            warnings.push(Diagnostic::warning(message, index.span(range)));
        };

        match content {
            ActionContent::Activation {
                target,
                active: true,
            } => {
                active.insert(target.as_str());
            }
            ActionContent::Activation {
                target,
                active: false,
            } => {
                if !active.remove(target.as_str()) {
                    warn(format!("`{target}` is deactivated but not active"));
                }
            }
            ActionContent::Participant { name, alias, .. } => {
                let handle = alias.as_deref().unwrap_or(name);
                if !declared.insert(handle) {
                    warn(format!("participant `{handle}` is declared more than once"));
                }
            }
            _ => {}
        }
    }

    if !warnings.is_empty() {
        log::debug!("{} semantic warnings", warnings.len());
    }
    warnings
}

/// `range` cut to its first line, without the line break.
fn first_line(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = text.get(range.clone()).unwrap_or_default();
    let line = slice.lines().next().unwrap_or_default();
    range.start..range.start + line.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::identity::IdentityManager;
    use crate::sync::projector::project;
    use pretty_assertions::assert_eq;
    use seqsync_syntax::ast::Diagram;
    use seqsync_syntax::{Severity, parse};

    fn warnings(text: &str) -> Vec<Diagnostic> {
        let diagram = Diagram::lower(&parse(text).syntax(), text);
        let projection = project(&diagram, &mut IdentityManager::default()).unwrap();
        semantic_warnings(&projection.model, &projection.source_map, text)
    }

    #[test]
    fn balanced_activation_is_fine() {
        assert!(warnings("activate A\nA -> B\ndeactivate A\n").is_empty());
    }

    #[test]
    fn deactivating_an_inactive_participant_warns() {
        let found = warnings("A -> B\ndeactivate A\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Warning);
        assert_eq!(found[0].message, "`A` is deactivated but not active");
        assert_eq!((found[0].span.line, found[0].span.column), (2, 1));
        assert_eq!(found[0].span.len, "deactivate A".len());
    }

    #[test]
    fn second_deactivation_warns() {
        let found = warnings("activate A\ndeactivate A\ndeactivate A\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span.line, 3);
    }

    #[test]
    fn duplicate_declarations_warn() {
        let found = warnings("participant A\nactor \"Alice\" as A\nparticipant B\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "participant `A` is declared more than once");
    }
}
