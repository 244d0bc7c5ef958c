//! Research prompt templates
//!
//! System prompts are constants so that test doubles can tell the three call
//! shapes apart. User prompts are built per call.

use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;

use super::state::SearchResult;

/// Longest slice of page content put into a single prompt
const MAX_CONTENT_CHARS: usize = 12_000;

/// Prompt templates for the research loop
pub struct ResearchPrompts;

impl ResearchPrompts {
    pub const QUERY_GENERATION_SYSTEM: &'static str = "You are a research planner. \
        You turn a research question into focused, distinct web search queries.";

    pub const RELEVANCE_SYSTEM: &'static str = "You are a researcher. For each query, \
        search the web and then evaluate if the result is relevant and will help answer the query.";

    pub const LEARNING_SYSTEM: &'static str = "You are a researcher. You extract the key \
        finding from a web page and propose follow-up questions for deeper research.";

    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    pub fn query_generation(question: &str, n: usize) -> String {
        format!(
            "For context, today's date is {date}.\n\n\
             Generate {n} search queries for the following query: {question}",
            date = Self::current_date(),
        )
    }

    /// `existing_urls` is listed so the model also sees the dedup rule
    pub fn relevance(question: &str, candidate: &SearchResult, existing_urls: &HashSet<String>) -> String {
        let mut urls: Vec<&str> = existing_urls.iter().map(String::as_str).collect();
        urls.sort_unstable();

        format!(
            "Evaluate whether the search result is relevant and will help answer the following query: {question}. \
             If the page already exists in the existing results, mark it as irrelevant.\n\n\
             <search_result>\n{result}\n</search_result>\n\n\
             <existing_results>\n{existing}\n</existing_results>",
            result = Self::result_json(candidate),
            existing = urls.join("\n"),
        )
    }

    pub fn learning(question: &str, result: &SearchResult) -> String {
        format!(
            "The user is researching \"{question}\". The following search result was deemed relevant.\n\
             Generate a learning and follow-up questions from the search result.\n\n\
             <search_result>\n{result}\n</search_result>",
            result = Self::result_json(result),
        )
    }

    /// Question for the next recursion level: root goal, what has been
    /// searched so far, and where the last finding points.
    pub fn follow_up(root_question: &str, completed_queries: &[String], follow_ups: &[String]) -> String {
        format!(
            "Overall research goal: {root_question}\n\n\
             Previous research queries:\n{completed}\n\n\
             Follow-up research directions:\n{directions}",
            completed = completed_queries.join("\n"),
            directions = follow_ups.join("\n"),
        )
    }

    fn result_json(result: &SearchResult) -> String {
        let content: String = result.content.chars().take(MAX_CONTENT_CHARS).collect();
        json!({
            "title": result.title,
            "url": result.url,
            "content": content,
        })
        .to_string()
    }
}
