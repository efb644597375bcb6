//! Control blocks.
//!
//! ```text
//! alt ok              BLOCK
//!   A -> B              BRANCH
//! else failed
//!   A -> C              BRANCH (starts with ELSE_KW)
//! end
//! ```

use super::{Scope, finish_line, statements, text};
use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind;

/// Parse a control block from its keyword through its `end`.
///
/// A block still open at `@enduml` or end of input is closed there and the
/// opening keyword is reported.
pub(super) fn block(p: &mut Parser<'_, '_>) {
    let m = p.start();
    let open = p.current_span();
    let keyword = p.current_text();
    let allows_else = matches!(
        p.current(),
        SyntaxKind::ALT_KW | SyntaxKind::PAR_KW | SyntaxKind::CRITICAL_KW | SyntaxKind::GROUP_KW
    );
    p.bump();
    text(p);
    p.eat(SyntaxKind::NEWLINE);

    let mut branch = p.start();
    loop {
        statements(p, Scope::Branch);
        match p.current() {
            SyntaxKind::ELSE_KW => {
                branch.complete(p, SyntaxKind::BRANCH);
                branch = p.start();
                if !allows_else {
                    p.error(format!("`else` is not allowed in a `{keyword}` block"));
                }
                p.bump();
                text(p);
                p.eat(SyntaxKind::NEWLINE);
            }
            SyntaxKind::END_KW => {
                branch.complete(p, SyntaxKind::BRANCH);
                p.bump();
                finish_line(p);
                break;
            }
            _ => {
                branch.complete(p, SyntaxKind::BRANCH);
                p.error_at(open, format!("unclosed `{keyword}` block: expected `end`"));
                break;
            }
        }
    }

    m.complete(p, SyntaxKind::BLOCK);
}
