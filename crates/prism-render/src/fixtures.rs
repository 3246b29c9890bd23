//! Shared test model: posts, comments, authors.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeZone, Utc};
use prism_core::{
    Association, DescriptorRegistry, FragmentPolicy, ObjectRef, ResourceDescriptor, Serializable,
};
use serde_json::{json, Value};

pub fn t(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

pub struct Post {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub comments: Vec<ObjectRef>,
    pub author: Option<ObjectRef>,
}

impl Serializable for Post {
    fn type_name(&self) -> &'static str {
        "Post"
    }

    fn identity(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }

    fn attribute(&self, name: &str) -> anyhow::Result<Value> {
        match name {
            "title" => Ok(json!(self.title)),
            other => anyhow::bail!("Post has no attribute '{other}'"),
        }
    }

    fn association(&self, name: &str) -> anyhow::Result<Association> {
        match name {
            "comments" => Ok(Association::Many(self.comments.clone())),
            "author" => Ok(Association::One(self.author.clone())),
            other => anyhow::bail!("Post has no association '{other}'"),
        }
    }
}

pub struct Comment {
    pub id: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
    pub author: Option<ObjectRef>,
}

impl Serializable for Comment {
    fn type_name(&self) -> &'static str {
        "Comment"
    }

    fn identity(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }

    fn attribute(&self, name: &str) -> anyhow::Result<Value> {
        match name {
            "body" => Ok(json!(self.body)),
            other => anyhow::bail!("Comment has no attribute '{other}'"),
        }
    }

    fn association(&self, name: &str) -> anyhow::Result<Association> {
        match name {
            "author" => Ok(Association::One(self.author.clone())),
            other => anyhow::bail!("Comment has no association '{other}'"),
        }
    }
}

pub struct Author {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub posts: RwLock<Vec<ObjectRef>>,
}

impl Serializable for Author {
    fn type_name(&self) -> &'static str {
        "Author"
    }

    fn identity(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }

    fn attribute(&self, name: &str) -> anyhow::Result<Value> {
        match name {
            "name" => Ok(json!(self.name)),
            other => anyhow::bail!("Author has no attribute '{other}'"),
        }
    }

    fn association(&self, name: &str) -> anyhow::Result<Association> {
        match name {
            "posts" => Ok(Association::Many(
                self.posts.read().map(|p| p.clone()).unwrap_or_default(),
            )),
            other => anyhow::bail!("Author has no association '{other}'"),
        }
    }
}

pub fn registry() -> DescriptorRegistry {
    let mut registry = DescriptorRegistry::new();
    registry.register(
        ResourceDescriptor::builder("Post")
            .attribute("title")
            .has_many("comments", "Comment")
            .has_one("author", "Author")
            .policy(FragmentPolicy::enabled())
            .build(),
    );
    registry.register(
        ResourceDescriptor::builder("Comment")
            .attribute("body")
            .has_one("author", "Author")
            .policy(FragmentPolicy::enabled())
            .build(),
    );
    registry.register(
        ResourceDescriptor::builder("Author")
            .attribute("name")
            .has_many("posts", "Post")
            .policy(FragmentPolicy::enabled())
            .build(),
    );
    registry
}

pub fn author(id: &str, name: &str) -> Arc<Author> {
    Arc::new(Author {
        id: id.to_string(),
        name: name.to_string(),
        updated_at: t(0),
        posts: RwLock::new(Vec::new()),
    })
}

pub fn comment(id: &str, body: &str, author: Option<ObjectRef>) -> ObjectRef {
    Arc::new(Comment {
        id: id.to_string(),
        body: body.to_string(),
        updated_at: t(0),
        author,
    })
}

pub fn post_with(
    id: &str,
    title: &str,
    updated_at: DateTime<Utc>,
    comments: Vec<ObjectRef>,
    author: Option<ObjectRef>,
) -> ObjectRef {
    Arc::new(Post {
        id: id.to_string(),
        title: title.to_string(),
        updated_at,
        comments,
        author,
    })
}

pub fn post() -> ObjectRef {
    post_with("1", "hello", t(0), Vec::new(), None)
}
