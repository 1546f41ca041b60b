//! Prompts used for question generation, answering and judging.

/// Collection of prompts used by the LLM-backed capabilities.
pub struct Prompts;

impl Prompts {
    /// System prompt for question synthesis.
    pub fn question_system() -> &'static str {
        "Generate questions based on the given context."
    }

    /// User prompt for question synthesis. Placeholders: `{context}`, `{n}`.
    pub fn question_user() -> &'static str {
        "Context: {context}\n\nGenerate {n} questions:"
    }

    /// System prompt for answering.
    pub fn answer_system() -> &'static str {
        "Answer the question based on the given context."
    }

    /// User prompt for answering. Placeholders: `{context}`, `{question}`.
    pub fn answer_user() -> &'static str {
        "Context: {context}\n\nQuestion: {question}"
    }

    /// Prompt for grading a generated answer against a reference answer.
    /// Placeholders: `{reference}`, `{generated}`.
    pub fn answer_judge() -> &'static str {
        r#"You are an expert judge comparing a candidate answer with a reference answer to the same question.

Reference Answer:
{reference}

Candidate Answer:
{generated}

Rate how well the candidate answer agrees with the reference answer in content and correctness:
1 = contradicts or misses the reference entirely
3 = partially agrees, with omissions or minor errors
5 = fully agrees with the reference

Respond in JSON format:
{
    "score": <1-5>,
    "explanation": "<brief explanation>"
}

Respond with only the JSON, no other text."#
    }
}
