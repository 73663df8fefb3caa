//! Compare command - classified differences between two definitions

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::domain::comparison::{compare_definitions, summarize_comparison};

#[derive(Args, Clone)]
pub struct CompareArgs {
    /// Definition to compare from (JSON)
    pub from: PathBuf,

    /// Definition to compare to (JSON)
    pub to: PathBuf,
}

pub async fn run(args: CompareArgs) -> anyhow::Result<()> {
    super::init()?;
    let from = super::read_definition(&args.from)?;
    let to = super::read_definition(&args.to)?;

    let differences = compare_definitions(&from, &to);
    let summary = summarize_comparison(&differences);

    super::print_json(&json!({
        "differences": differences,
        "summary": summary,
    }))
}
