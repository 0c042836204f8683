//! Serialize a post with its author and comments as a compound document.
//!
//! Run with `cargo run --example blog`.

use jsonapi_marshal::{
    serialize, JsonApiVersion, Registry, RelationshipOptions, ResourceBuilder, SerializeOptions,
};
use serde::Serialize;
use serde_json::{json, Map};

#[derive(Clone, Default, Serialize)]
struct Person {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    name: Option<String>,
    bio: Option<String>,
}

#[derive(Default, Serialize)]
struct Comment {
    id: Option<String>,
    author: Option<Person>,
    content: Option<String>,
}

#[derive(Default, Serialize)]
struct Post {
    id: Option<String>,
    title: Option<String>,
    author: Option<Person>,
    comments: Option<Vec<Comment>>,
}

fn register(registry: &mut Registry) -> Result<(), jsonapi_marshal::RegistryError> {
    registry
        .register(
            ResourceBuilder::new(
                "person",
                "/people",
                |user_id| Person {
                    user_id,
                    ..Default::default()
                },
                |p| &p.user_id,
            )
            .identity_field("userId")
            .attribute("name", |p| &p.name, |p| &mut p.name)
            .attribute("bio", |p| &p.bio, |p| &mut p.bio),
        )?
        .register(
            ResourceBuilder::new(
                "comment",
                "/comments",
                |id| Comment {
                    id,
                    ..Default::default()
                },
                |c| &c.id,
            )
            .to_one("author", |c| c.author.as_ref(), |c, a| c.author = Some(a))
            .attribute("content", |c| &c.content, |c| &mut c.content),
        )?
        .register(
            ResourceBuilder::new(
                "post",
                "/posts",
                |id| Post {
                    id,
                    ..Default::default()
                },
                |p| &p.id,
            )
            .attribute("title", |p| &p.title, |p| &mut p.title)
            .to_one("author", |p| p.author.as_ref(), |p, a| p.author = Some(a))
            .to_many_with(
                "comments",
                |p| p.comments.as_deref(),
                |p, c| p.comments = Some(c),
                RelationshipOptions::new().self_link().related_link(),
            ),
        )?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = Registry::new();
    register(&mut registry)?;

    let author = Person {
        user_id: Some("def-456".into()),
        name: Some("Drew".into()),
        bio: Some("is our writer".into()),
    };
    let post = Post {
        id: Some("abc-123".into()),
        title: Some("My Post".into()),
        author: Some(author.clone()),
        comments: Some(vec![
            Comment {
                id: Some("jkl-098".into()),
                content: Some("Cool post!".into()),
                author: Some(Person {
                    user_id: Some("ghi-789".into()),
                    name: Some("Steve".into()),
                    bio: None,
                }),
            },
            Comment {
                id: Some("mno-765".into()),
                content: Some("Thanks!".into()),
                author: Some(author),
            },
        ]),
    };

    let mut meta = Map::new();
    meta.insert("maintainer".into(), json!("Drew"));
    let options = SerializeOptions::new()
        .base_url("http://example.com")
        .include(["author", "comments", "comments.author"])
        .fields("person", ["name"])
        .version(JsonApiVersion::V1_1)
        .meta(meta);

    let document = serialize(&registry, &post, &options)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
