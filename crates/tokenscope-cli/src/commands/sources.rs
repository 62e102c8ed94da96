use serde::Serialize;
use serde_json::Value;
use tokenscope_core::{Orchestrator, SourceSnapshot};

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceSnapshot>,
    allow_mocks: bool,
}

pub fn run(orchestrator: &Orchestrator) -> Result<Value, CliError> {
    Ok(serde_json::to_value(SourcesResponseData {
        sources: orchestrator.sources(),
        allow_mocks: orchestrator.allow_mocks(),
    })?)
}
