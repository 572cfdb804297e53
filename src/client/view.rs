//! Plain-text rendering of transcript changes for line-oriented front-ends

use crate::conversation::{Role, Transcript};

/// Text to print to bring a terminal showing `prev` up to date with `next`.
///
/// Assistant entries are printed with a label when they first appear and
/// then only the newly-streamed suffix. User entries are skipped; the user
/// typed them already.
pub fn render_delta(prev: &Transcript, next: &Transcript) -> String {
    let mut out = String::new();

    for (index, message) in next.iter().enumerate() {
        match prev.get(index) {
            Some(old) if old == message => {}
            Some(old) if old.role == message.role && message.content.starts_with(&old.content) => {
                out.push_str(&message.content[old.content.len()..]);
            }
            _ => {
                if message.role == Role::User {
                    continue;
                }
                out.push_str("\nassistant: ");
                out.push_str(&message.content);
            }
        }
    }

    out
}
