//! Export the facade's OpenAPI specification to a JSON file.
//!
//! Usage:
//!   cargo run --bin export_openapi
//!   cargo run --bin export_openapi -- --output docs/openapi.json

use brokerd::facade::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let spec = ApiDoc::openapi();

    let args: Vec<String> = std::env::args().collect();
    let output_path = if args.len() > 2 && args[1] == "--output" {
        Some(args[2].as_str())
    } else {
        None
    };

    let json = spec.to_pretty_json().expect("failed to serialize OpenAPI spec");

    match output_path {
        Some(path) => {
            std::fs::write(path, &json).expect("failed to write file");
            eprintln!("OpenAPI spec exported to: {}", path);
        }
        None => println!("{}", json),
    }
}
