//! services/api/src/bin/openapi.rs
//!
//! Dumps the OpenAPI document for the screening API. Writes to the path given
//! as the first argument (default `openapi.json`), or to stdout for `-`.

use api_lib::web::rest::ApiDoc;
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let document = ApiDoc::openapi().to_pretty_json()?;

    if target == "-" {
        let mut out = std::io::stdout().lock();
        out.write_all(document.as_bytes())?;
        out.write_all(b"\n")?;
    } else {
        std::fs::write(&target, document)?;
        let paths = ApiDoc::openapi().paths.paths.len();
        eprintln!("Wrote OpenAPI document ({} paths) to {}", paths, target);
    }
    Ok(())
}
