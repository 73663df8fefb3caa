//! Validate command - structural checks on a definition file

use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use tracing::info;

use crate::domain::validation::Validator;

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Workflow definition (JSON)
    pub definition: PathBuf,
}

pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = super::init()?;
    let definition = super::read_definition(&args.definition)?;

    Validator::new(config.validator).validate_definition(&definition)?;
    info!(name = %definition.name, "Definition is valid");

    super::print_json(&json!({
        "valid": true,
        "name": definition.name,
        "steps": definition.step_count(),
        "input_fields": definition.input_schema.len(),
        "output_fields": definition.output_schema.len(),
    }))
}
