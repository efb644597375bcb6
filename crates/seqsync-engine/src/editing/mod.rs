/*!
 * # Editing
 *
 * Everything that changes the model or the text in response to one side
 * of the sync.
 *
 * ## Model direction
 *
 * - **`commands`**: the GUI's `Cmd` enum, compiled into a `Patch` against
 *   the current model. Validation rejects content the text form could not
 *   carry (line breaks in names, `end note` inside a note body, ...).
 * - **`regenerate`**: the pure model → text function. Text is always fully
 *   regenerated in this direction; there is nothing to diff.
 *
 * ## Shared
 *
 * - **`patch`**: `PatchOp`/`Patch`, the only sanctioned way one model
 *   snapshot becomes the next, and `apply_patch`.
 * - **`cursor`**: carries the caret and selection across a rewrite, by
 *   identity where possible and through an xi-rope `Delta` otherwise.
 * - **`history`**: bounded undo/redo over model snapshots.
 */

pub mod commands;
pub mod cursor;
pub mod history;
pub mod patch;
pub mod regenerate;

pub use commands::{Cmd, Compiled, compile};
pub use cursor::{CaretAnchor, CursorTracker, SelectionAnchor, text_delta};
pub use history::History;
pub use patch::{Patch, PatchOp, apply_patch};
pub use regenerate::{FormatOptions, Regenerated, regenerate};
