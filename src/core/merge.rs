//! Folding several per-document analyses into the single result that gets stored.
//!
//! The backend analyses each uploaded document separately. Before the result is
//! written to the store the analyses are merged field by field so the user sees one
//! tender summary.

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};

use super::{
    AnalysisResult,
    TenderError,
};

const REQUIRED_DOCUMENTS: &str = "required_documents";
const AVK5_REQUIRED: &str = "avk5_required";
const ADDITIONAL_REQUIREMENTS: &str = "additional_requirements";
const FILENAME: &str = "filename";

const TEXT_FIELDS: &[&str] = &[
    "title",
    "issuer",
    "deadline",
    "budget",
    "location",
    "project_type",
    "technical_specs",
    "payment_terms",
    "resource_requirements",
    "timeline_feasibility",
    "profitability",
];

// Placeholder the analysis model writes when a field was not found in the document.
const NOT_SPECIFIED: &str = "не вказано";

/// One document's analysis as returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub status: String,
    pub source: String,
    pub analysis: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<RawAnalysis>,
}

impl UploadResponse {
    pub fn merged(&self) -> Result<AnalysisResult, TenderError> {
        merge_analyses(&self.files)
    }
}

fn is_informative(text: &str) -> bool {
    !text.trim().is_empty() && !text.to_lowercase().contains(NOT_SPECIFIED)
}

fn fields(analysis: &Value) -> Option<&Map<String, Value>> {
    analysis.as_object()
}

pub fn merge_analyses(raw: &[RawAnalysis]) -> Result<AnalysisResult, TenderError> {
    let (first, rest) = raw
        .split_first()
        .ok_or_else(|| TenderError::Custom("No analyses to merge".to_string()))?;

    if rest.is_empty() {
        let mut merged = fields(&first.analysis).cloned().unwrap_or_default();
        merged.insert(FILENAME.to_string(), Value::String(first.source.clone()));
        return Ok(Value::Object(merged));
    }

    let analyses: Vec<&Map<String, Value>> =
        raw.iter().filter_map(|r| fields(&r.analysis)).collect();
    let mut merged = Map::new();

    for key in TEXT_FIELDS {
        let values: Vec<Option<&Value>> = analyses.iter().map(|a| a.get(*key)).collect();
        let picked = values
            .iter()
            .flatten()
            .find(|v| v.as_str().is_some_and(is_informative))
            .copied()
            .or_else(|| values.first().copied().flatten());
        if let Some(value) = picked {
            merged.insert(key.to_string(), value.clone());
        }
    }

    let mut documents: Vec<Value> = Vec::new();
    let listed = analyses
        .iter()
        .filter_map(|a| a.get(REQUIRED_DOCUMENTS))
        .filter_map(Value::as_array)
        .flatten();
    for doc in listed {
        if !documents.contains(doc) {
            documents.push(doc.clone());
        }
    }
    merged.insert(REQUIRED_DOCUMENTS.to_string(), Value::Array(documents));

    let avk5 =
        analyses.iter().any(|a| a.get(AVK5_REQUIRED).and_then(Value::as_bool).unwrap_or(false));
    merged.insert(AVK5_REQUIRED.to_string(), Value::Bool(avk5));

    let mut extras = Map::new();
    let all_extras =
        analyses.iter().filter_map(|a| a.get(ADDITIONAL_REQUIREMENTS)).filter_map(Value::as_object);
    for extra in all_extras {
        extras.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if !extras.is_empty() {
        merged.insert(ADDITIONAL_REQUIREMENTS.to_string(), Value::Object(extras));
    }

    let filenames: Vec<&str> = raw.iter().map(|r| r.source.as_str()).collect();
    merged.insert(FILENAME.to_string(), Value::String(filenames.join("; ")));

    Ok(Value::Object(merged))
}
