//! Language-aware reranking and diverse selection of search candidates

use std::collections::HashSet;

use crate::retrieval::config::RetrieverConfig;
use crate::retrieval::language::language_bonus;
use crate::retrieval::types::CandidateRow;

/// A candidate with its final ranking score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub row: CandidateRow,
    pub language: Option<String>,
    pub score: f64,
}

/// Add the language bonus to every candidate and sort by score, highest
/// first. Equal scores keep their search order.
pub fn rerank(
    candidates: Vec<CandidateRow>,
    preferred: &[String],
    config: &RetrieverConfig,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|row| {
            let language = row.effective_language();
            let score = row.similarity + language_bonus(language.as_deref(), preferred, config);
            ScoredCandidate {
                row,
                language,
                score,
            }
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Chunks and documents that fresh selection must not return again
#[derive(Debug, Default)]
pub struct Exclusions {
    pub chunk_ids: HashSet<String>,
    pub document_ids: HashSet<String>,
}

/// Greedy pick of up to `top_k` candidates from a score-sorted list.
///
/// The primary pass takes at most one chunk per document and per
/// translation group; candidates that collide go to an overflow list. If the
/// primary pass falls short, the overflow is scanned in order and admits
/// chunks from documents not used yet, ignoring translation groups. The
/// result is in score order.
pub fn select_diverse(
    sorted: Vec<ScoredCandidate>,
    top_k: usize,
    exclusions: &Exclusions,
) -> Vec<ScoredCandidate> {
    let mut used_documents: HashSet<String> = exclusions.document_ids.clone();
    let mut used_groups: HashSet<String> = HashSet::new();
    let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(top_k);
    let mut overflow: Vec<ScoredCandidate> = Vec::new();

    for candidate in sorted {
        if selected.len() >= top_k {
            break;
        }
        if exclusions.chunk_ids.contains(&candidate.row.chunk_id) {
            continue;
        }

        let group = translation_group(&candidate.row);
        let document_taken = used_documents.contains(&candidate.row.document_id);
        let group_taken = group.is_some_and(|g| used_groups.contains(g));
        if document_taken || group_taken {
            overflow.push(candidate);
            continue;
        }

        used_documents.insert(candidate.row.document_id.clone());
        if let Some(group) = group {
            used_groups.insert(group.to_string());
        }
        selected.push(candidate);
    }

    if selected.len() < top_k {
        for candidate in overflow {
            if selected.len() >= top_k {
                break;
            }
            if used_documents.insert(candidate.row.document_id.clone()) {
                selected.push(candidate);
            }
        }
        selected.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    selected
}

fn translation_group(row: &CandidateRow) -> Option<&str> {
    row.translation_group_id
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
}

/// Existing pins first, then new ids in selection order, without
/// duplicates, truncated to `pin_limit`.
pub fn merge_pins(existing: &[String], selected: &[String], pin_limit: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(pin_limit);
    for id in existing.iter().chain(selected) {
        if merged.len() >= pin_limit {
            break;
        }
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }
    merged
}
