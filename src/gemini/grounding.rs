use tracing::warn;

use super::types::{GenerateContentResponse, GroundingChunk, QueryResult, Source};

const SNIPPET_CHARS: usize = 300;

pub fn extract_query_result(response: &GenerateContentResponse) -> QueryResult {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let answer = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty());

    if answer.is_none() {
        warn!("Gemini returned empty answer (safety filter or empty response)");
    }

    let sources = candidate
        .and_then(|c| c.grounding_metadata.as_ref())
        .and_then(|m| m.grounding_chunks.as_ref())
        .map(|chunks| chunks.iter().filter_map(chunk_to_source).collect())
        .unwrap_or_default();

    QueryResult { answer, sources }
}

fn chunk_to_source(chunk: &GroundingChunk) -> Option<Source> {
    let ctx = chunk.retrieved_context.as_ref()?;
    let snippet = ctx
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(truncate_snippet);
    let title = ctx.title.clone().filter(|t| !t.is_empty());
    if title.is_none() && snippet.is_none() {
        return None;
    }
    Some(Source {
        title: title.unwrap_or_default(),
        uri: ctx.uri.clone().filter(|u| !u.is_empty()),
        snippet,
    })
}

fn truncate_snippet(text: &str) -> String {
    if text.len() <= SNIPPET_CHARS {
        return text.to_string();
    }
    let end = text.floor_char_boundary(SNIPPET_CHARS);
    format!("{}…", &text[..end])
}
