//! WordPress REST API (`/wp-json/wp/v2`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::{clamp_per_page, decode_json, ensure_success, header_u64, trim_base};
use crate::{IntegrationError, Page};

const DEFAULT_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WpPost {
    id: u64,
    slug: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    link: String,
    title: Rendered,
    excerpt: Option<Rendered>,
    content: Option<Rendered>,
}

/// A blog post with rendered HTML fields flattened to strings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlogPost {
    pub id: u64,
    pub slug: String,
    pub date: String,
    pub link: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
}

impl From<WpPost> for BlogPost {
    fn from(post: WpPost) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            date: post.date,
            link: post.link,
            title: post.title.rendered,
            excerpt: post.excerpt.map(|r| r.rendered).unwrap_or_default(),
            content: post.content.map(|r| r.rendered).unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct WordPressClient {
    http: Client,
    base_url: String,
}

impl WordPressClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: format!("{}/wp-json/wp/v2", trim_base(base_url)),
        }
    }

    pub async fn list_posts(&self, query: &PostQuery) -> Result<Page<BlogPost>, IntegrationError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = clamp_per_page(query.per_page, DEFAULT_PER_PAGE);

        let mut params: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }

        debug!(page, per_page, "listing wordpress posts");
        let response = self
            .http
            .get(format!("{}/posts", self.base_url))
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let total = header_u64(&response, "x-wp-total");
        let total_pages = header_u64(&response, "x-wp-totalpages");
        let posts: Vec<WpPost> = decode_json(response).await?;

        Ok(Page {
            items: posts.into_iter().map(BlogPost::from).collect(),
            page,
            per_page,
            total,
            total_pages,
        })
    }

    /// WordPress answers an unknown slug with an empty list, not a 404.
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<BlogPost, IntegrationError> {
        let response = self
            .http
            .get(format!("{}/posts", self.base_url))
            .query(&[("slug", slug)])
            .send()
            .await?;
        let posts: Vec<WpPost> = decode_json(ensure_success(response).await?).await?;

        posts
            .into_iter()
            .next()
            .map(BlogPost::from)
            .ok_or_else(|| IntegrationError::NotFound(format!("post {slug}")))
    }
}
