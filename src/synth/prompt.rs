//! Prompt Construction
//!
//! Builds the synthesis prompt for one generation unit: member sources
//! with their extracted symbols, followed by documentation of already
//! generated dependency units as context.
//!
//! Context is budgeted: dependency docs share a fixed fraction of the
//! unit budget split evenly between them, and oversized member sources
//! are truncated at line boundaries. A dependency whose generation
//! failed contributes a short note instead of silently vanishing.

use crate::ai::TokenCounter;
use crate::analyzer::parser::{Language, Symbol};
use crate::constants::budget::CONTEXT_FRACTION;

/// One member file prepared for prompting
#[derive(Debug)]
pub struct MemberContext {
    pub path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    pub content: String,
}

/// Documentation of one dependency unit, or a marker that it failed
#[derive(Debug)]
pub struct DependencyContext {
    /// Member paths of the dependency unit
    pub members: Vec<String>,
    /// None when the dependency unit failed to generate
    pub doc_text: Option<String>,
}

/// Builds unit prompts within a token budget
pub struct PromptBuilder {
    budget: usize,
    counter: TokenCounter,
}

impl PromptBuilder {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            counter: TokenCounter::default(),
        }
    }

    /// Render the full prompt for one unit
    pub fn build(
        &self,
        members: &[MemberContext],
        dependencies: &[DependencyContext],
        oversized: bool,
    ) -> String {
        let mut prompt = String::with_capacity(4096);

        prompt.push_str(
            "You are a senior engineer writing reference documentation for a codebase.\n\
             Document the following source files: purpose, public interface, and how\n\
             they relate to their dependencies. Output Markdown only.\n\n",
        );

        prompt.push_str("## Files to document\n\n");
        for member in members {
            prompt.push_str(&format!(
                "### {} ({})\n\n",
                member.path,
                member.language.name()
            ));
            if !member.symbols.is_empty() {
                prompt.push_str("Declared symbols: ");
                let listed: Vec<String> = member
                    .symbols
                    .iter()
                    .map(|s| format!("{} ({})", s.name, s.kind.name()))
                    .collect();
                prompt.push_str(&listed.join(", "));
                prompt.push_str("\n\n");
            }

            let content = if oversized {
                // Oversized units split the budget evenly across members
                let per_member = self.budget / members.len().max(1);
                self.counter.truncate_to(&member.content, per_member)
            } else {
                member.content.clone()
            };
            prompt.push_str(&format!(
                "```{}\n{}\n```\n\n",
                member.language.name(),
                content.trim_end()
            ));
        }

        if !dependencies.is_empty() {
            prompt.push_str("## Context: documentation of dependencies\n\n");
            let per_dep = self.context_budget(dependencies.len());
            for dep in dependencies {
                prompt.push_str(&format!("### {}\n\n", dep.members.join(", ")));
                match &dep.doc_text {
                    Some(text) => {
                        prompt.push_str(self.counter.truncate_to(text, per_dep).trim_end());
                        prompt.push_str("\n\n");
                    }
                    None => {
                        prompt.push_str(
                            "Documentation for this dependency could not be generated; \
                             document the files above without it.\n\n",
                        );
                    }
                }
            }
        }

        prompt.push_str(
            "## Instructions\n\n\
             - Write one section per file, titled with its path\n\
             - Describe what each exported symbol does and when to use it\n\
             - Note relationships to the dependency context where relevant\n\
             - Be precise and concrete; do not invent behavior\n",
        );

        prompt
    }

    /// Token allowance for each dependency doc
    fn context_budget(&self, dep_count: usize) -> usize {
        let total = (self.budget as f64 * CONTEXT_FRACTION) as usize;
        (total / dep_count.max(1)).max(1)
    }
}
