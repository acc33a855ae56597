//! Prompt template for document-grounded answers

use crate::providers::ScoredChunk;

/// Instructional template with `{context}` and `{input}` slots
pub const ANSWER_TEMPLATE: &str = r#"You are a friendly and professional assistant. The user has attached a document (PDF, text, spreadsheet, CSV or Word) and asks questions about it, sometimes requesting a summary.

Follow these steps:
Step 1: Read the context carefully and note its main topics and keywords.
Step 2: Understand the question, then answer it from the context only. Do not invent facts that the context does not support.

Keep a friendly, professional tone.

<context>
{context}
</context>

Question: {input}"#;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Retrieved chunk texts joined by blank lines, best match first
    pub fn build_context(results: &[ScoredChunk]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Fill the template; slot markers inside `context` or `input` stay literal
    pub fn build_answer_prompt(input: &str, context: &str) -> String {
        let (head, rest) = ANSWER_TEMPLATE
            .split_once("{context}")
            .unwrap_or((ANSWER_TEMPLATE, ""));
        let (middle, tail) = rest.split_once("{input}").unwrap_or((rest, ""));
        format!("{head}{context}{middle}{input}{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use std::path::PathBuf;

    fn scored(content: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                content: content.to_string(),
                record_index: 0,
                chunk_index: 0,
                start: 0,
                end: content.len(),
                source: PathBuf::from("doc.txt"),
                locator: None,
            },
            score,
        }
    }

    #[test]
    fn test_context_joins_chunks() {
        let context = PromptBuilder::build_context(&[scored("first \n", 0.9), scored("second", 0.5)]);
        assert_eq!(context, "first\n\nsecond");
    }

    #[test]
    fn test_prompt_fills_both_slots() {
        let prompt = PromptBuilder::build_answer_prompt("What is it?", "It is a memo.");
        assert!(prompt.contains("<context>\nIt is a memo.\n</context>"));
        assert!(prompt.ends_with("Question: What is it?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{input}"));
    }

    #[test]
    fn test_placeholders_in_context_not_expanded() {
        let prompt = PromptBuilder::build_answer_prompt("q", "literal {input} text");
        assert!(prompt.contains("literal {input} text"));
        assert!(prompt.ends_with("Question: q"));
    }
}
