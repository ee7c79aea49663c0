//! Data Assistant - free-text questions about the processed dataset
//!
//! The assistant grounds each question with a bounded summary of the data
//! (see [`crate::context`]) and sends it to an [`Answerer`] with a fixed
//! analyst instruction. The answer text is returned exactly as received.

use crate::context::{build_context, ColumnRoles};
use crate::error::Result;
use crate::llm::Answerer;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Questions offered when the operator has not typed one.
pub const SUGGESTED_QUESTIONS: [&str; 5] = [
    "How many total records are in the dataset?",
    "What is the exact count and percentage for each Cadre level?",
    "How many unmapped designations are there?",
    "What is the most common Cadre level?",
    "What percentage of staff is at the District Level?",
];

/// Response from the data assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text, unmodified
    pub text: String,

    /// Context that was sent with the question
    pub context: String,
}

pub struct DataAssistant {
    answerer: Box<dyn Answerer>,
    roles: ColumnRoles,
}

impl DataAssistant {
    pub fn new(answerer: Box<dyn Answerer>, roles: ColumnRoles) -> Self {
        Self { answerer, roles }
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    /// Answer a question in one sentence using counts from `df`.
    pub async fn ask(&self, df: &DataFrame, question: &str) -> Result<Answer> {
        let context = build_context(df, question, &self.roles);
        let prompt = analyst_prompt(&context, question);

        info!("Asking about {} rows: {}", df.height(), question);
        let text = self.answerer.answer(&prompt).await?;
        Ok(Answer { text, context })
    }

    /// Ask for follow-up questions to a previous question.
    pub async fn follow_up_questions(&self, df: &DataFrame, question: &str) -> Result<Answer> {
        let follow_up = format!(
            "Based on the previous analysis about '{}', what are 3 relevant follow-up questions we could ask about this data?",
            question
        );
        self.ask(df, &follow_up).await
    }
}

pub fn analyst_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are an expert Operational data analyst who has more than 15 years of experience in Polio Program internationally. Answer the following question using the provided data:

Context:
{context}

Question: {question}

Requirements for your answer:
1. Give ONLY the exact answer with specific numbers
2. For questions about "most" or "highest", give the specific name and count
3. Format: "[Name/Value] with [count] records" or similar
4. If asking about a specific column, give values from that column only
5. Do not mention other columns unless specifically asked
6. Do not explain methodology
7. Keep response to one sentence
8. If data isn't available, say "Data not available"

Examples:
Q: "Which district has most data?"
A: "Karachi South with 1,234 records."

Q: "What is the total count?"
A: "The dataset contains 5,678 total records."

Answer the question directly and concisely."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WranglerError;
    use async_trait::async_trait;
    use polars::prelude::*;
    use std::sync::{Arc, Mutex};

    struct Recording {
        prompts: Arc<Mutex<Vec<String>>>,
        reply: std::result::Result<String, String>,
    }

    #[async_trait]
    impl Answerer for Recording {
        async fn answer(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(WranglerError::Llm)
        }
    }

    fn staff() -> DataFrame {
        df![
            "district_name" => ["Thatta", "Thatta", "Badin"],
            "designation_title" => ["UCMO", "TCO", "UCMO"],
        ]
        .unwrap()
    }

    #[tokio::test]
    async fn test_ask_passes_answer_through() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let assistant = DataAssistant::new(
            Box::new(Recording {
                prompts: prompts.clone(),
                reply: Ok("  Thatta with 2 records.\n".to_string()),
            }),
            ColumnRoles::default(),
        );

        let answer = assistant.ask(&staff(), "Which district has most records?").await.unwrap();

        assert_eq!(answer.text, "  Thatta with 2 records.\n");
        assert!(answer.context.contains("Thatta: 2 records"));
        let sent = prompts.lock().unwrap();
        assert!(sent[0].contains("Question: Which district has most records?"));
        assert!(sent[0].contains("Keep response to one sentence"));
        assert!(sent[0].contains(&answer.context));
    }

    #[tokio::test]
    async fn test_ask_surfaces_collaborator_error() {
        let assistant = DataAssistant::new(
            Box::new(Recording {
                prompts: Arc::new(Mutex::new(Vec::new())),
                reply: Err("quota exceeded".to_string()),
            }),
            ColumnRoles::default(),
        );
        let err = assistant.ask(&staff(), "How many?").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_follow_up_prompt() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let assistant = DataAssistant::new(
            Box::new(Recording {
                prompts: prompts.clone(),
                reply: Ok("1. ...".to_string()),
            }),
            ColumnRoles::default(),
        );
        assistant
            .follow_up_questions(&staff(), "What is the most common Cadre level?")
            .await
            .unwrap();
        assert!(prompts.lock().unwrap()[0]
            .contains("Based on the previous analysis about 'What is the most common Cadre level?'"));
    }
}
