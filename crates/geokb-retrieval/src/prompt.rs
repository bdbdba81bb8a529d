//! Answer prompt assembly from expanded retrieval results.

use chrono::NaiveDate;

use crate::types::ExpandedChunk;

/// Prompt template with `{search_results}`, `{cur_date}` and `{question}`
/// placeholders.
pub const RAG_PROMPT: &str = "# The following contents are the search results related to the user's message:
{search_results}
In the search results I provide to you, each result is formatted as [document X begin]...[document X end], where X represents the numerical index of each article. Please cite the context at the end of the relevant sentence when appropriate. Use the citation format [citation:X] in the corresponding part of your answer. If a sentence is derived from multiple contexts, list all relevant citation numbers, such as [citation:3][citation:5]. Be sure not to cluster all citations at the end; instead, include them in the corresponding parts of the answer.
When responding, please keep the following points in mind:
- Today is {cur_date}.
- Not all content in the search results is closely related to the user's question. You need to evaluate and filter the search results based on the question.
- If all the search results are irrelevant, please answer the question by yourself professionally and concisely.
- Your answer should synthesize information from multiple relevant documents and avoid repeatedly citing the same document.
- Unless the user requests otherwise, your response should be in the same language as the user's question.
# The user's message is:
{question}";

/// Number the documents by rank, starting at 0.
#[must_use]
pub fn format_documents(docs: &[ExpandedChunk]) -> String {
    docs.iter()
        .enumerate()
        .map(|(n, doc)| format!("[document {n} begin]{}[document {n} end]", doc.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn build_prompt(question: &str, docs: &[ExpandedChunk], today: NaiveDate) -> String {
    RAG_PROMPT
        .replace("{search_results}", &format_documents(docs))
        .replace("{cur_date}", &today.to_string())
        .replace("{question}", question)
}
