//! Record extraction from a parsed WXR tree
//!
//! The parsed element tree is generic; this module gives it meaning. Channel
//! declarations become author, category and tag records, and `<item>` elements
//! are classified by `wp:post_type` into attachments, posts and pages, with
//! comments collected from every classified item. Each record type carries the
//! fields its import phase needs and nothing else; items of unrecognized post
//! types (menus, revisions, custom types) are ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::PreviewCounts;
use crate::utils::slugify;
use crate::wxr::{Element, text_of};

/// Author declared in the channel header
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorRecord {
    /// Login name, the key posts reference via `dc:creator`
    pub login: String,
    /// Email address, may be empty in anonymized exports
    pub email: String,
    /// Human-readable name, may be empty
    pub display_name: String,
}

/// Category declared in the channel header
///
/// Source hierarchy (`wp:category_parent`) is intentionally not carried;
/// categories import as a flat list.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryRecord {
    /// Display name from `wp:cat_name`
    pub name: String,
    /// URL-safe name from `wp:category_nicename`
    pub nicename: String,
}

/// Tag declared in the channel header
#[derive(Clone, Debug, PartialEq)]
pub struct TagRecord {
    /// URL-safe name from `wp:tag_slug`
    pub slug: String,
    /// Display name from `wp:tag_name`
    pub name: String,
}

/// Attachment item (uploaded file)
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentRecord {
    /// Source-side post id, referenced by `_thumbnail_id` metadata
    pub source_id: String,
    /// Attachment title, may be empty
    pub title: String,
    /// Original file URL from `wp:attachment_url`, may be empty
    pub url: String,
}

/// Category or tag reference attached to a post or page
#[derive(Clone, Debug, PartialEq)]
pub struct TaxonomyRef {
    /// Resolution key, see [`ExtractedDocument::from_root`] for derivation
    pub slug: String,
    /// Display name as written on the item
    pub name: String,
}

/// Post or page item
#[derive(Clone, Debug, PartialEq)]
pub struct PostRecord {
    /// Source-side post id, referenced by comments and featured images
    pub source_id: String,
    pub title: String,
    /// Body HTML from `content:encoded`, carried verbatim
    pub content: String,
    /// Summary HTML from `excerpt:encoded`, carried verbatim
    pub excerpt: String,
    /// Raw source status string (`draft`, `future`, `publish`, ...)
    pub status: String,
    /// Login of the authoring user from `dc:creator`
    pub author_login: String,
    /// Publication instant, `None` when absent or unparseable
    pub published_at: Option<DateTime<Utc>>,
    /// Category references, resolved against the Categories map
    pub categories: Vec<TaxonomyRef>,
    /// Tag references, denormalized against the tag table
    pub tags: Vec<TaxonomyRef>,
    /// Source-side attachment id of the featured image, from `_thumbnail_id`
    pub thumbnail_source_id: Option<String>,
}

/// Comment attached to an item
#[derive(Clone, Debug, PartialEq)]
pub struct CommentRecord {
    /// Source-side comment id, referenced by replies
    pub source_id: String,
    /// Source-side id of the item this comment belongs to
    pub post_source_id: String,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    /// True only for comments marked approved in the source
    pub approved: bool,
    /// Source-side id of the parent comment, `None` for top-level comments
    pub parent_source_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Everything extractable from one WXR document, grouped by kind
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedDocument {
    pub authors: Vec<AuthorRecord>,
    pub categories: Vec<CategoryRecord>,
    pub tags: Vec<TagRecord>,
    pub attachments: Vec<AttachmentRecord>,
    pub posts: Vec<PostRecord>,
    pub pages: Vec<PostRecord>,
    pub comments: Vec<CommentRecord>,
}

impl ExtractedDocument {
    /// Extract all records from a parsed document root
    ///
    /// Taxonomy references on items resolve later against run-scoped maps,
    /// so their keys must be derived the same way on both sides:
    /// category references key on the slugified display name (nicename
    /// attribute as fallback for empty text), tag references key on the
    /// nicename attribute (slugified text as fallback), matching how the
    /// channel-level declarations are keyed during import.
    pub fn from_root(root: &Element) -> Result<Self> {
        let channel = root
            .child("channel")
            .ok_or_else(|| crate::error::Error::Parse("document has no channel element".into()))?;

        let mut doc = Self::default();

        for author in channel.children_named("wp:author") {
            doc.authors.push(AuthorRecord {
                login: text_of(author, "wp:author_login"),
                email: text_of(author, "wp:author_email"),
                display_name: text_of(author, "wp:author_display_name"),
            });
        }

        for category in channel.children_named("wp:category") {
            doc.categories.push(CategoryRecord {
                name: text_of(category, "wp:cat_name"),
                nicename: text_of(category, "wp:category_nicename"),
            });
        }

        for tag in channel.children_named("wp:tag") {
            doc.tags.push(TagRecord {
                slug: text_of(tag, "wp:tag_slug"),
                name: text_of(tag, "wp:tag_name"),
            });
        }

        for item in channel.children_named("item") {
            let source_id = text_of(item, "wp:post_id");
            match text_of(item, "wp:post_type").as_str() {
                "attachment" => {
                    doc.attachments.push(AttachmentRecord {
                        source_id: source_id.clone(),
                        title: text_of(item, "title"),
                        url: text_of(item, "wp:attachment_url"),
                    });
                }
                "post" => doc.posts.push(extract_post(item, &source_id)),
                "page" => doc.pages.push(extract_post(item, &source_id)),
                _ => continue,
            }
            doc.comments
                .extend(item.children_named("wp:comment").map(|comment| {
                    extract_comment(comment, &source_id)
                }));
        }

        Ok(doc)
    }

    /// Shallow per-kind counts for previewing a document before import
    pub fn preview_counts(&self) -> PreviewCounts {
        PreviewCounts {
            authors: self.authors.len() as u64,
            categories: self.categories.len() as u64,
            tags: self.tags.len() as u64,
            attachments: self.attachments.len() as u64,
            posts: self.posts.len() as u64,
            pages: self.pages.len() as u64,
            comments: self.comments.len() as u64,
        }
    }
}

fn extract_post(item: &Element, source_id: &str) -> PostRecord {
    let mut categories = Vec::new();
    let mut tags = Vec::new();

    for reference in item.children_named("category") {
        let name = reference.text().trim().to_string();
        let nicename = reference.attr("nicename").unwrap_or_default();
        match reference.attr("domain") {
            Some("category") => {
                let slug = non_empty(slugify(&name)).unwrap_or_else(|| nicename.to_string());
                categories.push(TaxonomyRef { slug, name });
            }
            Some("post_tag") => {
                let slug = non_empty(nicename.to_string()).unwrap_or_else(|| slugify(&name));
                tags.push(TaxonomyRef { slug, name });
            }
            _ => {}
        }
    }

    let item_meta = meta(item);

    PostRecord {
        source_id: source_id.to_string(),
        title: text_of(item, "title"),
        content: text_of(item, "content:encoded"),
        excerpt: text_of(item, "excerpt:encoded"),
        status: text_of(item, "wp:status"),
        author_login: text_of(item, "dc:creator"),
        published_at: parse_date(&text_of(item, "wp:post_date_gmt"))
            .or_else(|| parse_date(&text_of(item, "wp:post_date"))),
        categories,
        tags,
        thumbnail_source_id: item_meta.get("_thumbnail_id").cloned(),
    }
}

fn extract_comment(comment: &Element, post_source_id: &str) -> CommentRecord {
    let parent = text_of(comment, "wp:comment_parent");
    CommentRecord {
        source_id: text_of(comment, "wp:comment_id"),
        post_source_id: post_source_id.to_string(),
        author_name: text_of(comment, "wp:comment_author"),
        author_email: text_of(comment, "wp:comment_author_email"),
        content: text_of(comment, "wp:comment_content"),
        approved: text_of(comment, "wp:comment_approved") == "1",
        parent_source_id: non_empty(parent).filter(|p| p != "0"),
        created_at: parse_date(&text_of(comment, "wp:comment_date_gmt"))
            .or_else(|| parse_date(&text_of(comment, "wp:comment_date"))),
    }
}

/// Flatten an item's `wp:postmeta` children into a key/value map
///
/// Duplicate keys keep the last value, matching how WordPress itself reads
/// repeated meta rows.
pub fn meta(item: &Element) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for entry in item.children_named("wp:postmeta") {
        let key = text_of(entry, "wp:meta_key");
        if key.is_empty() {
            continue;
        }
        map.insert(key, text_of(entry, "wp:meta_value"));
    }
    map
}

/// Parse the `YYYY-MM-DD HH:MM:SS` timestamps WXR uses, treating them as UTC
///
/// WordPress writes `0000-00-00 00:00:00` for drafts that were never
/// scheduled; that and every other unparseable value map to `None`.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
