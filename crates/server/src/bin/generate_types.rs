use std::{env, fs, path::PathBuf};

use anyhow::Context;
use db::models::generated_code::{CreateHistoryRecord, HistoryRecord};
use services::services::{
    catalog::Component,
    code_generation::{ErrorResponse, GenerateCodeRequest, GenerateCodeResponse},
};
use ts_rs::TS;

fn generate_types_content() -> String {
    let decls = [
        Component::decl(),
        GenerateCodeRequest::decl(),
        GenerateCodeResponse::decl(),
        ErrorResponse::decl(),
        HistoryRecord::decl(),
        CreateHistoryRecord::decl(),
    ];

    let mut out = String::from(
        "// This file was generated by `cargo run --bin generate-types`. Do not edit.\n\n",
    );
    for decl in decls {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }
    out
}

fn main() -> anyhow::Result<()> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/types.ts"));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    fs::write(&path, generate_types_content())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
