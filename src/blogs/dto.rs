use serde::Deserialize;

use crate::store::{BlogChanges, NewBlog};

/// Body of both create and update. On update, empty fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlogRequest {
    pub title: String,
    pub description: String,
    pub author: String,
    pub image: String,
}

impl BlogRequest {
    pub fn is_complete(&self) -> bool {
        [&self.title, &self.description, &self.author, &self.image]
            .iter()
            .all(|f| !f.trim().is_empty())
    }

    pub fn into_new_blog(self, user_id: i64) -> NewBlog {
        NewBlog {
            title: self.title,
            description: self.description,
            author: self.author,
            image: self.image,
            user_id,
        }
    }

    pub fn into_changes(self) -> BlogChanges {
        BlogChanges {
            title: Some(self.title),
            description: Some(self.description),
            author: Some(self.author),
            image: Some(self.image),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub search: String,
}
