//! Arrow glyph classification.
//!
//! Every arrow the lexer accepts maps to exactly one [`Arrow`], and every
//! [`Arrow`] has exactly one canonical glyph:
//!
//! | glyph  | direction     | sync  | style  |
//! |--------|---------------|-------|--------|
//! | `->`   | left to right | sync  | solid  |
//! | `-->`  | left to right | sync  | dashed |
//! | `->>`  | left to right | async | solid  |
//! | `-->>` | left to right | async | dashed |
//! | `<-`   | right to left | sync  | solid  |
//! | `<--`  | right to left | sync  | dashed |
//! | `<<-`  | right to left | async | solid  |
//! | `<<--` | right to left | async | dashed |

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Synchronicity {
    Sync,
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// A classified message arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arrow {
    pub direction: Direction,
    pub sync: Synchronicity,
    pub style: LineStyle,
}

impl Arrow {
    /// `->`
    pub const SYNC: Arrow = Arrow {
        direction: Direction::LeftToRight,
        sync: Synchronicity::Sync,
        style: LineStyle::Solid,
    };

    /// `-->`
    pub const REPLY: Arrow = Arrow {
        direction: Direction::LeftToRight,
        sync: Synchronicity::Sync,
        style: LineStyle::Dashed,
    };

    /// Classify an arrow glyph. Returns `None` for anything the lexer would
    /// not produce as an `ARROW` token.
    pub fn from_glyph(glyph: &str) -> Option<Arrow> {
        let (direction, body) = if let Some(rest) = glyph.strip_prefix('<') {
            (Direction::RightToLeft, rest)
        } else {
            (Direction::LeftToRight, glyph)
        };

        let (sync, dashes) = match direction {
            Direction::LeftToRight => {
                if let Some(d) = body.strip_suffix(">>") {
                    (Synchronicity::Async, d)
                } else {
                    (Synchronicity::Sync, body.strip_suffix('>')?)
                }
            }
            Direction::RightToLeft => {
                if let Some(d) = body.strip_prefix('<') {
                    (Synchronicity::Async, d)
                } else {
                    (Synchronicity::Sync, body)
                }
            }
        };

        let style = match dashes {
            "-" => LineStyle::Solid,
            "--" => LineStyle::Dashed,
            _ => return None,
        };

        Some(Arrow {
            direction,
            sync,
            style,
        })
    }

    /// The canonical glyph for this arrow.
    pub fn glyph(&self) -> &'static str {
        match (self.direction, self.sync, self.style) {
            (Direction::LeftToRight, Synchronicity::Sync, LineStyle::Solid) => "->",
            (Direction::LeftToRight, Synchronicity::Sync, LineStyle::Dashed) => "-->",
            (Direction::LeftToRight, Synchronicity::Async, LineStyle::Solid) => "->>",
            (Direction::LeftToRight, Synchronicity::Async, LineStyle::Dashed) => "-->>",
            (Direction::RightToLeft, Synchronicity::Sync, LineStyle::Solid) => "<-",
            (Direction::RightToLeft, Synchronicity::Sync, LineStyle::Dashed) => "<--",
            (Direction::RightToLeft, Synchronicity::Async, LineStyle::Solid) => "<<-",
            (Direction::RightToLeft, Synchronicity::Async, LineStyle::Dashed) => "<<--",
        }
    }

    /// Dashed arrows conventionally draw a return message.
    pub fn is_return(&self) -> bool {
        self.style == LineStyle::Dashed
    }
}

impl Default for Arrow {
    fn default() -> Self {
        Arrow::SYNC
    }
}

impl std::fmt::Display for Arrow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.glyph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("->", Direction::LeftToRight, Synchronicity::Sync, LineStyle::Solid)]
    #[case("-->", Direction::LeftToRight, Synchronicity::Sync, LineStyle::Dashed)]
    #[case("->>", Direction::LeftToRight, Synchronicity::Async, LineStyle::Solid)]
    #[case("-->>", Direction::LeftToRight, Synchronicity::Async, LineStyle::Dashed)]
    #[case("<-", Direction::RightToLeft, Synchronicity::Sync, LineStyle::Solid)]
    #[case("<--", Direction::RightToLeft, Synchronicity::Sync, LineStyle::Dashed)]
    #[case("<<-", Direction::RightToLeft, Synchronicity::Async, LineStyle::Solid)]
    #[case("<<--", Direction::RightToLeft, Synchronicity::Async, LineStyle::Dashed)]
    fn classifies_every_glyph(
        #[case] glyph: &str,
        #[case] direction: Direction,
        #[case] sync: Synchronicity,
        #[case] style: LineStyle,
    ) {
        let arrow = Arrow::from_glyph(glyph).unwrap();
        assert_eq!(
            arrow,
            Arrow {
                direction,
                sync,
                style
            }
        );
        assert_eq!(arrow.glyph(), glyph);
    }

    #[rstest]
    #[case("-")]
    #[case(">")]
    #[case("--->")]
    #[case("<->")]
    #[case("")]
    fn rejects_non_arrows(#[case] glyph: &str) {
        assert_eq!(Arrow::from_glyph(glyph), None);
    }

    #[test]
    fn dashed_arrows_are_returns() {
        assert!(Arrow::REPLY.is_return());
        assert!(!Arrow::SYNC.is_return());
    }
}
