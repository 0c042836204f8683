//! Serialize a single resource with no options.
//!
//! Run with `cargo run --example helloworld`.

use jsonapi_marshal::{serialize, Registry, ResourceBuilder, SerializeOptions};
use serde::Serialize;

#[derive(Serialize)]
struct Greeting {
    id: Option<String>,
    message: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = Registry::new();
    registry.register(
        ResourceBuilder::new(
            "greeting",
            "/greetings",
            |id| Greeting { id, message: None },
            |g| &g.id,
        )
        .attribute("message", |g| &g.message, |g| &mut g.message),
    )?;

    let greeting = Greeting {
        id: Some("abc-123".into()),
        message: Some("Hello, world!".into()),
    };

    let document = serialize(&registry, &greeting, &SerializeOptions::new())?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
