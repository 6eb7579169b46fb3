//! `sitemap.xml` for the public frontend.

use chrono::{DateTime, Utc};
use salvo::http::header::HOST;
use salvo::prelude::*;

use crate::error::ApiError;
use crate::state::AppState;

const STATIC_PAGES: [(&str, &str, &str); 5] = [
    ("/", "daily", "1.0"),
    ("/recipes", "daily", "0.9"),
    ("/stories", "weekly", "0.8"),
    ("/privacy", "monthly", "0.3"),
    ("/terms", "monthly", "0.3"),
];

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn base_url(req: &Request, configured: Option<&str>) -> String {
    if let Some(url) = configured {
        return url.to_owned();
    }
    let host = req
        .headers()
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(ToString::to_string))
        .unwrap_or_else(|| "localhost".to_owned());
    format!("{}://{host}", req.scheme())
}

#[derive(Debug)]
struct Entry<'a> {
    path: &'a str,
    lastmod: Option<DateTime<Utc>>,
    changefreq: &'a str,
    priority: &'a str,
}

fn render(base: &str, entries: &[Entry<'_>]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape(&format!("{base}{}", entry.path))));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod.format("%Y-%m-%d")));
        }
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", entry.changefreq));
        xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Static pages, then published recipes, then published stories.
#[handler]
pub(crate) async fn sitemap(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let recipes = state.store.published_recipe_slugs().await?;
    let stories = state.store.published_story_ids().await?;

    let recipe_paths: Vec<(String, DateTime<Utc>)> = recipes
        .into_iter()
        .map(|(slug, updated)| (format!("/recipe/{slug}"), updated))
        .collect();
    let story_paths: Vec<(String, DateTime<Utc>)> = stories
        .into_iter()
        .map(|(id, updated)| (format!("/stories/{id}"), updated))
        .collect();

    let mut entries: Vec<Entry<'_>> = STATIC_PAGES
        .iter()
        .map(|&(path, changefreq, priority)| Entry {
            path,
            lastmod: None,
            changefreq,
            priority,
        })
        .collect();
    entries.extend(recipe_paths.iter().map(|(path, updated)| Entry {
        path,
        lastmod: Some(*updated),
        changefreq: "weekly",
        priority: "0.8",
    }));
    entries.extend(story_paths.iter().map(|(path, updated)| Entry {
        path,
        lastmod: Some(*updated),
        changefreq: "monthly",
        priority: "0.7",
    }));

    let base = base_url(req, state.config.public_base_url.as_deref());
    res.render(Text::Xml(render(&base, &entries)));
    Ok(())
}
