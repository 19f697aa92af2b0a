//! Classroom answer policy.
//!
//! The policy is a JSON document loaded once at startup:
//!
//! ```json
//! {
//!   "block_patterns": ["bomb", "weapon", "cheat(ing)? on"],
//!   "fallback_text": "Ask your teacher.",
//!   "answer_max_sentences": 2
//! }
//! ```
//!
//! Patterns are compiled into a single alternation so a question is tested
//! once. A missing or malformed policy aborts startup; there is no reload
//! path.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct PolicyFile {
    block_patterns: Vec<String>,
    fallback_text: String,
    answer_max_sentences: usize,
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub block_patterns: Vec<String>,
    pub fallback_text: String,
    pub answer_max_sentences: usize,
    blocklist: Option<Regex>,
}

impl Policy {
    /// Validate and compile a policy.
    pub fn new(
        block_patterns: Vec<String>,
        fallback_text: impl Into<String>,
        answer_max_sentences: usize,
    ) -> Result<Self> {
        if answer_max_sentences == 0 {
            bail!("policy answer_max_sentences must be >= 1");
        }

        for pattern in &block_patterns {
            Regex::new(pattern)
                .with_context(|| format!("invalid block pattern: '{}'", pattern))?;
        }

        let blocklist = if block_patterns.is_empty() {
            None
        } else {
            Some(Regex::new(&block_patterns.join("|"))?)
        };

        Ok(Self {
            block_patterns,
            fallback_text: fallback_text.into(),
            answer_max_sentences,
            blocklist,
        })
    }

    /// Case-sensitive search for any block pattern anywhere in `question`.
    pub fn is_blocked(&self, question: &str) -> bool {
        self.blocklist
            .as_ref()
            .is_some_and(|re| re.is_match(question))
    }
}

pub fn parse_policy(content: &str) -> Result<Policy> {
    let file: PolicyFile =
        serde_json::from_str(content).with_context(|| "Failed to parse policy file")?;
    Policy::new(
        file.block_patterns,
        file.fallback_text,
        file.answer_max_sentences,
    )
}

pub fn load_policy(path: &Path) -> Result<Policy> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file: {}", path.display()))?;
    parse_policy(&content).with_context(|| format!("Invalid policy: {}", path.display()))
}

/// CLI entry point: load the policy the server would use and summarize it.
pub fn run_check(config: &Config) -> Result<()> {
    let policy = load_policy(&config.paths.policy)?;

    println!("policy:               {}", config.paths.policy.display());
    println!("block patterns:       {}", policy.block_patterns.len());
    for pattern in &policy.block_patterns {
        println!("  {}", pattern);
    }
    println!("fallback text:        {}", policy.fallback_text);
    println!("answer max sentences: {}", policy.answer_max_sentences);
    println!("model:                {} @ {}", config.generation.model, config.generation.base_url);
    println!("Policy OK.");
    Ok(())
}
