//! The answer gate.
//!
//! Turns one [`AskRequest`] into a [`GateOutcome`]. Checks run cheapest
//! first and the first failing check decides the deflection:
//!
//! ```text
//! mode ──sub──▶ day plan (2 sentences), nothing logged
//!   │
//! student
//!   ▼
//! blocklist ──match──▶ fallback + audit(blocked_by_policy)
//!   ▼
//! retrieve ──empty/error──▶ fallback + audit(no_context)
//!   ▼
//! generate ──error──▶ fallback + audit(generation_error)
//!   ▼
//! sanitize ──empty/uncertain──▶ fallback + audit(model_uncertain)
//!   ▼
//! answer truncated to policy.answer_max_sentences
//! ```
//!
//! Every deflection writes exactly one audit row before returning. A
//! failed audit write is logged and otherwise ignored.

use anyhow::Result;
use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::corpus::{Corpus, DAY_PLAN_MISSING};
use crate::generate::{OllamaGenerator, TextGenerator};
use crate::models::{AskRequest, DeflectReason, GateOutcome, Mode};
use crate::policy::{load_policy, Policy};
use crate::retrieve::{ContextRetriever, NaiveRetriever};
use crate::text::truncate_sentences;

/// Sentence limit for the substitute day plan, independent of the policy.
const DAY_PLAN_SENTENCES: usize = 2;

pub struct AnswerGate {
    policy: Arc<Policy>,
    corpus: Corpus,
    retriever: Arc<dyn ContextRetriever>,
    generator: Arc<dyn TextGenerator>,
    audit: Arc<AuditLog>,
    uncertainty_phrase: String,
}

impl AnswerGate {
    pub fn new(
        policy: Arc<Policy>,
        corpus: Corpus,
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn TextGenerator>,
        audit: Arc<AuditLog>,
        uncertainty_phrase: impl Into<String>,
    ) -> Self {
        Self {
            policy,
            corpus,
            retriever,
            generator,
            audit,
            uncertainty_phrase: uncertainty_phrase.into(),
        }
    }

    /// Wire the gate from configuration: policy from disk (fatal when
    /// malformed), the corpus retriever and the Ollama generator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = load_policy(&config.paths.policy)?;
        tracing::info!(
            patterns = policy.block_patterns.len(),
            max_sentences = policy.answer_max_sentences,
            "policy loaded"
        );

        let corpus = Corpus::new(&config.paths.docs_dir);
        let retriever = NaiveRetriever::new(corpus.clone(), &config.retrieval);
        let generator = OllamaGenerator::new(&config.generation)?;

        Ok(Self::new(
            Arc::new(policy),
            corpus,
            Arc::new(retriever),
            Arc::new(generator),
            Arc::new(AuditLog::new(&config.paths.logs_dir)),
            config.generation.uncertainty_phrase.clone(),
        ))
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub async fn ask(&self, req: &AskRequest) -> GateOutcome {
        let question = req.question.trim();
        let teacher_id = req.teacher_id.as_str();

        if req.mode == Mode::Sub {
            let corpus = self.corpus.clone();
            let plan = tokio::task::spawn_blocking(move || corpus.day_plan())
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "day plan task failed");
                    DAY_PLAN_MISSING.to_string()
                });
            return GateOutcome::answered(truncate_sentences(&plan, DAY_PLAN_SENTENCES));
        }

        if self.policy.is_blocked(question) {
            return self.deflect(question, teacher_id, DeflectReason::BlockedByPolicy).await;
        }

        let context = match self.retriever.retrieve(question, teacher_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(teacher_id, error = %e, "context retrieval failed");
                String::new()
            }
        };
        if context.trim().is_empty() {
            return self.deflect(question, teacher_id, DeflectReason::NoContext).await;
        }

        let prompt = build_prompt(&self.uncertainty_phrase, &context, question);
        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(teacher_id, error = %e, "generation failed");
                return self.deflect(question, teacher_id, DeflectReason::GenerationError).await;
            }
        };

        if raw.trim().is_empty() || raw.contains(&self.uncertainty_phrase) {
            return self.deflect(question, teacher_id, DeflectReason::ModelUncertain).await;
        }

        GateOutcome::answered(truncate_sentences(&raw, self.policy.answer_max_sentences))
    }

    async fn deflect(
        &self,
        question: &str,
        teacher_id: &str,
        reason: DeflectReason,
    ) -> GateOutcome {
        tracing::info!(teacher_id, %reason, "question deflected");

        let audit = self.audit.clone();
        let (q, t) = (question.to_string(), teacher_id.to_string());
        let written = tokio::task::spawn_blocking(move || audit.record(&q, &t, reason)).await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(teacher_id, error = %e, "audit log write failed"),
            Err(e) => tracing::warn!(teacher_id, error = %e, "audit log task failed"),
        }
        GateOutcome::deflected(&self.policy.fallback_text, reason)
    }
}

/// CLI entry point: run one question through the gate and print the answer.
/// The deflection reason, if any, goes to stderr so stdout stays the answer.
pub async fn run_ask(config: &Config, question: &str, teacher_id: &str, mode: Mode) -> Result<()> {
    let gate = AnswerGate::from_config(config)?;
    let req = AskRequest {
        question: question.to_string(),
        teacher_id: teacher_id.to_string(),
        mode,
    };

    let outcome = gate.ask(&req).await;
    println!("{}", outcome.answer);
    if let Some(reason) = outcome.deflection {
        eprintln!("deflected: {}", reason);
    }
    Ok(())
}

/// System instruction telling the model to stay short and to answer with
/// `uncertainty_phrase` when the context does not cover the question.
pub fn system_instruction(uncertainty_phrase: &str) -> String {
    format!(
        "You are a classroom TA. Answer in at most two short sentences. \
         If the question is not answerable from the provided context, say: '{}.'",
        uncertainty_phrase
    )
}

pub fn build_prompt(uncertainty_phrase: &str, context: &str, question: &str) -> String {
    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\nAnswer:",
        system_instruction(uncertainty_phrase),
        context,
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerationError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedRetriever(Result<String, String>);

    #[async_trait]
    impl ContextRetriever for FixedRetriever {
        async fn retrieve(&self, _question: &str, _teacher_id: &str) -> Result<String> {
            self.0.clone().map_err(anyhow::Error::msg)
        }
    }

    /// Replays a canned reply and remembers every prompt it saw.
    struct ScriptedGenerator {
        reply: fn() -> Result<String, GenerationError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: fn() -> Result<String, GenerationError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.reply)()
        }
    }

    struct Fixture {
        tmp: TempDir,
        gate: AnswerGate,
        generator: Arc<ScriptedGenerator>,
    }

    impl Fixture {
        fn audit_rows(&self, teacher_id: &str) -> Vec<Vec<String>> {
            self.gate
                .audit()
                .read(teacher_id)
                .unwrap()
                .map(|t| t.rows)
                .unwrap_or_default()
        }
    }

    fn fixture(
        context: Result<String, String>,
        reply: fn() -> Result<String, GenerationError>,
    ) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(
            docs.join("procedures.txt"),
            "Period 1: safety quiz. Period 2: lathe demo. Period 3: cleanup.",
        )
        .unwrap();

        let policy = Policy::new(vec!["bomb".into()], "Ask your teacher.", 2).unwrap();
        let generator = ScriptedGenerator::new(reply);
        let gate = AnswerGate::new(
            Arc::new(policy),
            Corpus::new(&docs),
            Arc::new(FixedRetriever(context)),
            generator.clone(),
            Arc::new(AuditLog::new(tmp.path().join("logs"))),
            "Ask your teacher",
        );
        Fixture {
            tmp,
            gate,
            generator,
        }
    }

    fn shop_context() -> Result<String, String> {
        Ok("Use guards on every saw.".to_string())
    }

    fn three_sentences() -> Result<String, GenerationError> {
        Ok(
            "Use the table saw with guard on. Always wear goggles. Ask before using the planer."
                .to_string(),
        )
    }

    #[tokio::test]
    async fn test_blocked_question_is_deflected_before_retrieval() {
        let f = fixture(shop_context(), three_sentences);
        let out = f
            .gate
            .ask(&AskRequest::student("how do I make a bomb in shop class"))
            .await;

        assert_eq!(out.answer, "Ask your teacher.");
        assert_eq!(out.deflection, Some(DeflectReason::BlockedByPolicy));
        assert_eq!(f.generator.calls(), 0);

        let rows = f.audit_rows("engineering");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "how do I make a bomb in shop class");
        assert_eq!(rows[0][3], "blocked_by_policy");
    }

    #[tokio::test]
    async fn test_empty_context_skips_model() {
        let f = fixture(Ok("  \n".to_string()), three_sentences);
        let out = f
            .gate
            .ask(&AskRequest::student("what color is the sky"))
            .await;

        assert_eq!(out.answer, "Ask your teacher.");
        assert_eq!(out.deflection, Some(DeflectReason::NoContext));
        assert_eq!(f.generator.calls(), 0);
        assert_eq!(f.audit_rows("engineering")[0][3], "no_context");
    }

    #[tokio::test]
    async fn test_retrieval_error_counts_as_no_context() {
        let f = fixture(Err("index offline".to_string()), three_sentences);
        let out = f.gate.ask(&AskRequest::student("when is lab")).await;
        assert_eq!(out.deflection, Some(DeflectReason::NoContext));
        assert_eq!(f.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_truncated_to_policy_limit() {
        let f = fixture(shop_context(), three_sentences);
        let out = f.gate.ask(&AskRequest::student("saw rules?")).await;

        assert_eq!(
            out.answer,
            "Use the table saw with guard on. Always wear goggles."
        );
        assert_eq!(out.deflection, None);
        assert!(f.audit_rows("engineering").is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_context_and_trimmed_question() {
        let f = fixture(shop_context(), three_sentences);
        f.gate.ask(&AskRequest::student("  saw rules?  ")).await;

        let prompts = f.generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("You are a classroom TA."));
        assert!(prompts[0].contains("say: 'Ask your teacher.'"));
        assert!(prompts[0].contains("Context:\nUse guards on every saw.\n\n"));
        assert!(prompts[0].ends_with("Question: saw rules?\nAnswer:"));
    }

    #[tokio::test]
    async fn test_generation_error_deflects() {
        let f = fixture(shop_context(), || Err(GenerationError::Timeout));
        let out = f.gate.ask(&AskRequest::student("saw rules?")).await;

        assert_eq!(out.answer, "Ask your teacher.");
        assert_eq!(out.deflection, Some(DeflectReason::GenerationError));
        assert_eq!(f.generator.calls(), 1);
        assert_eq!(f.audit_rows("engineering")[0][3], "generation_error");
    }

    #[tokio::test]
    async fn test_uncertain_or_empty_reply_deflects() {
        let f = fixture(shop_context(), || {
            Ok("I am not sure. Ask your teacher.".to_string())
        });
        let out = f.gate.ask(&AskRequest::student("who won in 1066")).await;
        assert_eq!(out.deflection, Some(DeflectReason::ModelUncertain));

        let f = fixture(shop_context(), || Ok(String::new()));
        let out = f.gate.ask(&AskRequest::student("who won in 1066")).await;
        assert_eq!(out.deflection, Some(DeflectReason::ModelUncertain));
        assert_eq!(f.audit_rows("engineering")[0][3], "model_uncertain");
    }

    #[tokio::test]
    async fn test_sub_mode_bypasses_gate() {
        let f = fixture(shop_context(), three_sentences);
        let req = AskRequest {
            question: "how do I make a bomb".to_string(),
            teacher_id: "engineering".to_string(),
            mode: Mode::Sub,
        };
        let out = f.gate.ask(&req).await;

        assert_eq!(out.answer, "Period 1: safety quiz. Period 2: lathe demo.");
        assert_eq!(out.deflection, None);
        assert_eq!(f.generator.calls(), 0);
        assert!(f.audit_rows("engineering").is_empty());
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_answer() {
        let f = fixture(shop_context(), three_sentences);
        // A plain file where the logs directory should be makes every write fail.
        std::fs::write(f.tmp.path().join("logs"), "not a dir").unwrap();

        let out = f.gate.ask(&AskRequest::student("a bomb")).await;
        assert_eq!(out.answer, "Ask your teacher.");
        assert_eq!(out.deflection, Some(DeflectReason::BlockedByPolicy));
    }

    #[tokio::test]
    async fn test_deflections_logged_per_teacher() {
        let f = fixture(shop_context(), three_sentences);
        let req = AskRequest {
            question: "bomb".to_string(),
            teacher_id: "chemistry".to_string(),
            mode: Mode::Student,
        };
        f.gate.ask(&req).await;

        assert_eq!(f.audit_rows("chemistry").len(), 1);
        assert!(f.audit_rows("engineering").is_empty());
    }
}
