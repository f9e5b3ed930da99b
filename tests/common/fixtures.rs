//! WXR fixtures and test content generators

use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Full site export covering every record kind
///
/// Two authors (one without an email address), two categories, two tags
/// (one without an explicit slug), four posts spanning every status mapping,
/// one page with a threaded comment, and one attachment that was never
/// uploaded (no URL), so the whole document imports without any network.
///
/// Comment 102 replies to an id that never appears in the document and must
/// be flattened to top-level.
pub const FULL_SITE_EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:content="http://purl.org/rss/1.0/modules/content/"
    xmlns:excerpt="http://wordpress.org/export/1.2/excerpt/"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:wp="http://wordpress.org/export/1.2/">
  <channel>
    <title>Field Notes</title>
    <wp:author>
      <wp:author_login><![CDATA[walt]]></wp:author_login>
      <wp:author_email><![CDATA[walt@fieldnotes.example]]></wp:author_email>
      <wp:author_display_name><![CDATA[Walt Harper]]></wp:author_display_name>
    </wp:author>
    <wp:author>
      <wp:author_login><![CDATA[vera]]></wp:author_login>
      <wp:author_email><![CDATA[]]></wp:author_email>
      <wp:author_display_name><![CDATA[Vera Stone]]></wp:author_display_name>
    </wp:author>
    <wp:category>
      <wp:cat_name><![CDATA[Trail Guides]]></wp:cat_name>
      <wp:category_nicename><![CDATA[trail-guides]]></wp:category_nicename>
    </wp:category>
    <wp:category>
      <wp:cat_name><![CDATA[Gear]]></wp:cat_name>
      <wp:category_nicename><![CDATA[gear]]></wp:category_nicename>
    </wp:category>
    <wp:tag>
      <wp:tag_slug><![CDATA[hiking]]></wp:tag_slug>
      <wp:tag_name><![CDATA[Hiking]]></wp:tag_name>
    </wp:tag>
    <wp:tag>
      <wp:tag_name><![CDATA[Camp Cooking]]></wp:tag_name>
    </wp:tag>
    <item>
      <title>Ridge Traverse</title>
      <dc:creator><![CDATA[walt]]></dc:creator>
      <content:encoded><![CDATA[<p>Start before dawn.</p>]]></content:encoded>
      <excerpt:encoded><![CDATA[An alpine day out]]></excerpt:encoded>
      <wp:post_id>10</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
      <wp:post_date_gmt><![CDATA[2023-06-10 08:00:00]]></wp:post_date_gmt>
      <category domain="category" nicename="trail-guides"><![CDATA[Trail Guides]]></category>
      <category domain="post_tag" nicename="hiking"><![CDATA[Hiking]]></category>
      <wp:comment>
        <wp:comment_id>100</wp:comment_id>
        <wp:comment_author><![CDATA[Sam]]></wp:comment_author>
        <wp:comment_author_email><![CDATA[sam@example.com]]></wp:comment_author_email>
        <wp:comment_content><![CDATA[Did this last summer, great route]]></wp:comment_content>
        <wp:comment_approved><![CDATA[1]]></wp:comment_approved>
        <wp:comment_parent>0</wp:comment_parent>
        <wp:comment_date_gmt><![CDATA[2023-06-11 09:00:00]]></wp:comment_date_gmt>
      </wp:comment>
      <wp:comment>
        <wp:comment_id>101</wp:comment_id>
        <wp:comment_author><![CDATA[Tess]]></wp:comment_author>
        <wp:comment_content><![CDATA[How much water did you carry?]]></wp:comment_content>
        <wp:comment_approved><![CDATA[0]]></wp:comment_approved>
        <wp:comment_parent>100</wp:comment_parent>
      </wp:comment>
      <wp:comment>
        <wp:comment_id>102</wp:comment_id>
        <wp:comment_author><![CDATA[Uma]]></wp:comment_author>
        <wp:comment_content><![CDATA[Replying to a deleted comment]]></wp:comment_content>
        <wp:comment_approved><![CDATA[1]]></wp:comment_approved>
        <wp:comment_parent>999</wp:comment_parent>
      </wp:comment>
    </item>
    <item>
      <title>Stove Comparison</title>
      <dc:creator><![CDATA[vera]]></dc:creator>
      <content:encoded><![CDATA[<p>Three stoves, one winner.</p>]]></content:encoded>
      <wp:post_id>11</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
      <wp:post_date_gmt><![CDATA[2023-07-02 12:30:00]]></wp:post_date_gmt>
      <category domain="category" nicename="gear"><![CDATA[Gear]]></category>
      <category domain="post_tag"><![CDATA[Camp Cooking]]></category>
    </item>
    <item>
      <title>Winter Draft</title>
      <dc:creator><![CDATA[walt]]></dc:creator>
      <content:encoded><![CDATA[Notes for the snow season]]></content:encoded>
      <wp:post_id>12</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[draft]]></wp:status>
      <wp:post_date_gmt><![CDATA[0000-00-00 00:00:00]]></wp:post_date_gmt>
    </item>
    <item>
      <title>Spring Opener</title>
      <dc:creator><![CDATA[walt]]></dc:creator>
      <content:encoded><![CDATA[Season kickoff announcement]]></content:encoded>
      <wp:post_id>13</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[future]]></wp:status>
      <wp:post_date_gmt><![CDATA[2032-04-01 06:00:00]]></wp:post_date_gmt>
    </item>
    <item>
      <title>Trailhead Directions</title>
      <dc:creator><![CDATA[walt]]></dc:creator>
      <content:encoded><![CDATA[<p>Park at the north lot.</p>]]></content:encoded>
      <wp:post_id>20</wp:post_id>
      <wp:post_type><![CDATA[page]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
      <wp:post_date_gmt><![CDATA[2023-01-05 10:00:00]]></wp:post_date_gmt>
      <wp:comment>
        <wp:comment_id>103</wp:comment_id>
        <wp:comment_author><![CDATA[Vic]]></wp:comment_author>
        <wp:comment_content><![CDATA[The lot fills up by eight]]></wp:comment_content>
        <wp:comment_approved><![CDATA[1]]></wp:comment_approved>
        <wp:comment_parent>0</wp:comment_parent>
      </wp:comment>
      <wp:comment>
        <wp:comment_id>104</wp:comment_id>
        <wp:comment_author><![CDATA[Wes]]></wp:comment_author>
        <wp:comment_content><![CDATA[Confirmed, arrive early]]></wp:comment_content>
        <wp:comment_approved><![CDATA[1]]></wp:comment_approved>
        <wp:comment_parent>103</wp:comment_parent>
      </wp:comment>
    </item>
    <item>
      <title>Scan Without File</title>
      <wp:post_id>30</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
    </item>
  </channel>
</rss>
"#;

/// Export that is not a WXR document at all
pub const BROKEN_EXPORT: &str = "<rss><channel><title>Unclosed";

/// Generate an export with attachments served by a local media host
///
/// # Arguments
/// * `base` - Base URL of the mock media server
///
/// Contains a large image (gets all three derivatives), a small image
/// (narrower than every derivative target), a PDF (not an importable image
/// type, skipped before any request), an image the server answers 404 for,
/// and two posts whose `_thumbnail_id` point at the large image and at the
/// missing one.
pub fn media_export(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:content="http://purl.org/rss/1.0/modules/content/"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:wp="http://wordpress.org/export/1.2/">
  <channel>
    <title>Media Archive</title>
    <item>
      <title>Summit Panorama</title>
      <wp:post_id>40</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{base}/media/panorama.png]]></wp:attachment_url>
    </item>
    <item>
      <title>Map Thumbnail</title>
      <wp:post_id>41</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{base}/media/map-thumb.png]]></wp:attachment_url>
    </item>
    <item>
      <title>Permit Form</title>
      <wp:post_id>42</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{base}/media/permit.pdf]]></wp:attachment_url>
    </item>
    <item>
      <title>Deleted Photo</title>
      <wp:post_id>43</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{base}/media/gone.jpg]]></wp:attachment_url>
    </item>
    <item>
      <title>Gallery Post</title>
      <dc:creator><![CDATA[walt]]></dc:creator>
      <content:encoded><![CDATA[<p>Views from the top.</p>]]></content:encoded>
      <wp:post_id>50</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
      <wp:postmeta>
        <wp:meta_key><![CDATA[_thumbnail_id]]></wp:meta_key>
        <wp:meta_value><![CDATA[40]]></wp:meta_value>
      </wp:postmeta>
    </item>
    <item>
      <title>Orphaned Cover</title>
      <dc:creator><![CDATA[walt]]></dc:creator>
      <content:encoded><![CDATA[<p>The cover photo is gone.</p>]]></content:encoded>
      <wp:post_id>51</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
      <wp:postmeta>
        <wp:meta_key><![CDATA[_thumbnail_id]]></wp:meta_key>
        <wp:meta_value><![CDATA[43]]></wp:meta_value>
      </wp:postmeta>
    </item>
  </channel>
</rss>
"#
    )
}

/// Generate an export with a single attachment the server answers slowly
///
/// Used by cancellation tests; the delay keeps the media phase running long
/// enough for a cancel request to land mid-download.
pub fn slow_export(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:wp="http://wordpress.org/export/1.2/">
  <channel>
    <title>Slow Archive</title>
    <item>
      <title>Huge Panorama</title>
      <wp:post_id>60</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{base}/slow/huge.png]]></wp:attachment_url>
    </item>
  </channel>
</rss>
"#
    )
}

/// Generate PNG bytes for a solid-color image of the given dimensions
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([70, 110, 60]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    bytes.into_inner()
}

