//! Question and answer generation.
//!
//! Both capabilities degrade instead of failing: a question generator that
//! cannot reach its model returns no questions, an answer generator returns
//! an empty answer.

use crate::llm::{LlmClient, Prompts};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Synthesizes evaluation questions from document text.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Up to `n` distinct questions about `context`. Empty on failure.
    async fn generate(&self, context: &str, n: usize) -> Vec<String>;
}

/// Answers a question from a context string.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// An answer to `question` using only `context`. Empty on failure.
    async fn generate(&self, question: &str, context: &str) -> String;
}

/// Question generator backed by a chat completion model.
#[derive(Clone)]
pub struct LlmQuestionGenerator {
    client: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(&self, context: &str, n: usize) -> Vec<String> {
        if n == 0 {
            return Vec::new();
        }

        let prompt = Prompts::question_user()
            .replace("{n}", &n.to_string())
            .replace("{context}", context);

        match self
            .client
            .complete(Some(Prompts::question_system()), &prompt)
            .await
        {
            Ok(reply) => {
                let questions = parse_questions(&reply, n);
                debug!("Generated {} of {} requested questions", questions.len(), n);
                questions
            }
            Err(e) => {
                warn!("Question generation failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Answer generator backed by a chat completion model.
#[derive(Clone)]
pub struct LlmAnswerGenerator {
    client: LlmClient,
}

impl LlmAnswerGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, question: &str, context: &str) -> String {
        let prompt = Prompts::answer_user()
            .replace("{question}", question)
            .replace("{context}", context);

        match self
            .client
            .complete(Some(Prompts::answer_system()), &prompt)
            .await
        {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                warn!("Answer generation failed: {}", e);
                String::new()
            }
        }
    }
}

/// Turn a model reply into at most `n` distinct questions, one per line.
///
/// List markers such as `1.`, `2)`, `-`, `*` and `Q3:` are removed; blank
/// lines and case-insensitive duplicates are dropped.
pub fn parse_questions(reply: &str, n: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut questions = Vec::new();

    for line in reply.lines() {
        let question = strip_list_marker(line.trim());
        if question.is_empty() {
            continue;
        }
        if seen.insert(question.to_lowercase()) {
            questions.push(question.to_string());
        }
        if questions.len() == n {
            break;
        }
    }

    questions
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    let without_q = line
        .strip_prefix('Q')
        .or_else(|| line.strip_prefix('q'))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(line);

    let digits = without_q
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(without_q.len());

    if digits > 0 {
        let rest = &without_q[digits..];
        if let Some(rest) = rest
            .strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))
            .or_else(|| rest.strip_prefix(':'))
        {
            return rest.trim();
        }
    }

    line.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LlmClient {
        LlmClient::new(LlmConfig {
            api_base: server.uri(),
            api_key: "test".to_string(),
            model: "gpt-4".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    #[test]
    fn test_parse_numbered_questions() {
        let reply = "1. What does the fox do?\n2) Who is lazy?\n\nQ3: Why test?";
        assert_eq!(
            parse_questions(reply, 10),
            vec!["What does the fox do?", "Who is lazy?", "Why test?"]
        );
    }

    #[test]
    fn test_parse_bullets_and_duplicates() {
        let reply = "- What is Rust?\n* what is rust?\n• Who made it?";
        assert_eq!(parse_questions(reply, 10), vec!["What is Rust?", "Who made it?"]);
    }

    #[test]
    fn test_parse_truncates_to_n() {
        let reply = "A?\nB?\nC?\nD?";
        assert_eq!(parse_questions(reply, 2), vec!["A?", "B?"]);
    }

    #[test]
    fn test_parse_keeps_leading_numbers_that_are_not_markers() {
        assert_eq!(
            parse_questions("1991 was the release year of what?", 1),
            vec!["1991 was the release year of what?"]
        );
    }

    #[tokio::test]
    async fn test_question_generator_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("Generate 2 questions"))
            .respond_with(completion("1. What does the fox do?\n2. Who is lazy?"))
            .mount(&server)
            .await;

        let generator = LlmQuestionGenerator::new(client_for(&server));
        let questions = generator.generate("The fox jumps.", 2).await;
        assert_eq!(questions, vec!["What does the fox do?", "Who is lazy?"]);
    }

    #[tokio::test]
    async fn test_question_generator_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let generator = LlmQuestionGenerator::new(client_for(&server));
        assert!(generator.generate("text", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_answer_generator_trims_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Question: What does the fox do?"))
            .respond_with(completion("  The fox jumps.  \n"))
            .mount(&server)
            .await;

        let generator = LlmAnswerGenerator::new(client_for(&server));
        let answer = generator
            .generate("What does the fox do?", "The fox jumps.")
            .await;
        assert_eq!(answer, "The fox jumps.");
    }

    #[tokio::test]
    async fn test_answer_generator_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let generator = LlmAnswerGenerator::new(client_for(&server));
        assert_eq!(generator.generate("q", "c").await, "");
    }
}
