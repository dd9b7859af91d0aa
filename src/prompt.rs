use crate::chunking::Chunk;
use crate::error::{RagError, Result};
use log::warn;

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// Separator placed between chunk texts in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Default upper bound on the context block, in characters
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 30_000;

pub const DEFAULT_TEMPLATE: &str = "You are a helpful assistant that answers questions based on the provided context.

Context: {context}
Question: {question}

Answer: Provide a clear and concise answer based only on the context above. If the context doesn't contain enough information to answer the question, say so.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Context,
    Question,
}

/// A prompt with one `{context}` and one `{question}` slot.
///
/// The template is split into segments up front, so placeholder-like text
/// inside a chunk or a question is never substituted a second time.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    max_context_chars: usize,
}

impl PromptTemplate {
    pub fn new(template: &str) -> Result<Self> {
        let segments = parse_segments(template);

        for (placeholder, segment) in [
            (CONTEXT_PLACEHOLDER, Segment::Context),
            (QUESTION_PLACEHOLDER, Segment::Question),
        ] {
            let count = segments.iter().filter(|s| **s == segment).count();
            if count != 1 {
                return Err(RagError::InvalidConfig(format!(
                    "Prompt template must contain {} exactly once, found {}",
                    placeholder, count
                )));
            }
        }

        Ok(PromptTemplate {
            segments,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        })
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Build the full prompt from retrieved chunks, in retrieval order
    pub fn assemble(&self, chunks: &[Chunk], question: &str) -> String {
        let context = assemble_context(chunks, self.max_context_chars);
        self.render(&context, question)
    }

    /// Substitute both slots
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut prompt = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => prompt.push_str(text),
                Segment::Context => prompt.push_str(context),
                Segment::Question => prompt.push_str(question),
            }
        }
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        PromptTemplate {
            segments: parse_segments(DEFAULT_TEMPLATE),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

fn parse_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;

    loop {
        let next = [
            (CONTEXT_PLACEHOLDER, Segment::Context),
            (QUESTION_PLACEHOLDER, Segment::Question),
        ]
        .into_iter()
        .filter_map(|(placeholder, segment)| {
            rest.find(placeholder)
                .map(|position| (position, placeholder.len(), segment))
        })
        .min_by_key(|(position, _, _)| *position);

        match next {
            Some((position, length, segment)) => {
                if position > 0 {
                    segments.push(Segment::Text(rest[..position].to_string()));
                }
                segments.push(segment);
                rest = &rest[position + length..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest.to_string()));
                }
                return segments;
            }
        }
    }
}

/// Join chunk texts with blank lines.
///
/// The top-ranked chunk is always kept; lower-ranked chunks that would push
/// the block past `max_chars` are dropped.
pub fn assemble_context(chunks: &[Chunk], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0;

    for (rank, chunk) in chunks.iter().enumerate() {
        let separator = if rank == 0 { 0 } else { CONTEXT_SEPARATOR.len() };
        let length = chunk.text.chars().count();

        if rank > 0 && used + separator + length > max_chars {
            warn!(
                "Context budget of {} characters reached; dropping {} lower-ranked chunks",
                max_chars,
                chunks.len() - rank
            );
            break;
        }

        if rank > 0 {
            context.push_str(CONTEXT_SEPARATOR);
        }
        context.push_str(&chunk.text);
        used += separator + length;
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_id: "Company_sample.txt".to_string(),
            offset: 0,
        }
    }

    #[test]
    fn test_default_template_is_valid() {
        assert!(PromptTemplate::new(DEFAULT_TEMPLATE).is_ok());

        let default = PromptTemplate::default();
        assert_eq!(
            DEFAULT_TEMPLATE
                .replace(CONTEXT_PLACEHOLDER, "CTX")
                .replace(QUESTION_PLACEHOLDER, "Q?"),
            default.render("CTX", "Q?")
        );
    }

    #[test]
    fn test_assemble_joins_chunks_in_retrieval_order() {
        let template = PromptTemplate::default();
        let chunks = vec![
            chunk("Our sustainability goal is net-zero by 2030."),
            chunk("The engineering team ships every week."),
        ];

        let prompt = template.assemble(&chunks, "What are our sustainability goals?");

        assert!(prompt.contains(
            "Context: Our sustainability goal is net-zero by 2030.\n\nThe engineering team ships every week.\nQuestion: What are our sustainability goals?"
        ));
        assert!(prompt.contains("doesn't contain enough information"));
    }

    #[test]
    fn test_assemble_is_pure() {
        let template = PromptTemplate::default();
        let chunks = vec![chunk("a"), chunk("b")];

        assert_eq!(
            template.assemble(&chunks, "q"),
            template.assemble(&chunks, "q")
        );
    }

    #[test]
    fn test_placeholders_in_inputs_are_not_substituted() {
        let template = PromptTemplate::new("C={context};Q={question}").unwrap();
        let prompt = template.assemble(&[chunk("literal {question}")], "why {context}?");

        assert_eq!(prompt, "C=literal {question};Q=why {context}?");
    }

    #[test]
    fn test_template_needs_each_placeholder_once() {
        assert!(matches!(
            PromptTemplate::new("Only {question}"),
            Err(RagError::InvalidConfig(_))
        ));
        assert!(matches!(
            PromptTemplate::new("{context} {context} {question}"),
            Err(RagError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_context_budget_drops_lowest_ranked_chunks() {
        let chunks = vec![chunk("aaaa"), chunk("bbbb"), chunk("cccc")];

        assert_eq!(assemble_context(&chunks, 10), "aaaa\n\nbbbb");
        assert_eq!(assemble_context(&chunks, 100), "aaaa\n\nbbbb\n\ncccc");
        // The best chunk survives even a budget it exceeds
        assert_eq!(assemble_context(&chunks, 2), "aaaa");
        assert_eq!(assemble_context(&[], 10), "");
    }
}
