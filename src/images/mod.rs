/// Bookmarked images
///
/// Images are bookmarked by URL; the bytes themselves are never fetched.
/// Each image carries a cached like count maintained by [`LikeManager`].

pub mod likes;
pub mod store;

pub use likes::LikeManager;
pub use store::ImageStore;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Image record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub description: String,
    pub created: NaiveDate,
    /// Cached size of the liked-by relation
    pub total_likes: i64,
}

impl Image {
    /// Canonical detail path for this image
    pub fn absolute_url(&self) -> String {
        format!("/images/detail/{}/{}", self.id, self.slug)
    }
}

/// Bookmark creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImageRequest {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Derived from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url() {
        let image = Image {
            id: 7,
            user_id: Some(1),
            title: "Red Fox".to_string(),
            slug: "red-fox".to_string(),
            url: "https://example.com/fox.jpg".to_string(),
            description: String::new(),
            created: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total_likes: 0,
        };
        assert_eq!(image.absolute_url(), "/images/detail/7/red-fox");
    }
}
