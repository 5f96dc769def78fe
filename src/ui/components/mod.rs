mod input;
mod key_result;
mod notes_editor;

pub use key_result::KeyResult;
pub use notes_editor::{NotesEditor, NotesEvent};
