//! Prompt assembly for the generation stage.
//!
//! ```text
//! <instructions>
//!
//! Context:
//! <chunk 1> (Source: ...)
//!
//! <chunk 2> (Source: ...)
//!
//! Recent conversation:
//! User: ...
//! Assistant: ...
//!
//! Question: <query>
//!
//! Answer:
//! ```

use mandate_kb_core::models::{DocumentChunk, Turn};

const INSTRUCTIONS: &str = "You are an assistant for the Khoisan Voice initiative. \
Answer in a warm, conversational tone, as if talking with a friend, and address the question directly. \
Use the context below and cite sources the way they appear in it. \
Avoid stiff, formal or promotional language. \
If the context does not contain the answer, say you don't have that specific information and suggest what you do know that might help. \
Keep it to three to five sentences and end with a question that invites the user to keep talking.";

/// Build the single prompt sent to the generation backend.
pub fn build_prompt<'a>(
    query: &str,
    docs: &[DocumentChunk],
    history: impl IntoIterator<Item = &'a Turn>,
) -> String {
    let context = docs
        .iter()
        .map(|d| format!("{} {}", d.text, d.citation()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let transcript = history
        .into_iter()
        .map(|t| format!("{}: {}", t.role.label(), t.content))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + context.len() + transcript.len() + query.len() + 64);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(&context);
    if !transcript.is_empty() {
        prompt.push_str("\n\nRecent conversation:\n");
        prompt.push_str(&transcript);
    }
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(query);
    prompt.push_str("\n\nAnswer:");
    prompt
}
