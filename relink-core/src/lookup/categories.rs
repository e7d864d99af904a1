//! Folder → content category mapping, per site.

use crate::models::CategoryConfig;
use crate::snapshot::CorpusSnapshot;
use relink_types::SiteId;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    content_root: String,
    by_site: HashMap<SiteId, Vec<CategoryConfig>>,
}

impl CategoryIndex {
    pub fn build(snapshot: &CorpusSnapshot, content_root: &str) -> Self {
        let by_site = snapshot
            .sites()
            .iter()
            .map(|site| {
                let categories = site
                    .categories
                    .iter()
                    .map(|c| CategoryConfig {
                        name: c.name.clone(),
                        folder: c.folder.trim_matches('/').to_string(),
                    })
                    .collect();
                (site.id.clone(), categories)
            })
            .collect();

        Self {
            content_root: content_root.trim_matches('/').to_string(),
            by_site,
        }
    }

    /// Category whose folder is the longest segment-aligned prefix of `path`
    ///
    /// `path` may be given with or without the content root in front.
    pub fn category_for(&self, site: &SiteId, path: &str) -> Option<&str> {
        let path = path.trim_matches('/');
        let path = strip_segment_prefix(path, &self.content_root).unwrap_or(path);

        self.by_site
            .get(site)?
            .iter()
            .filter(|c| strip_segment_prefix(path, &c.folder).is_some())
            .max_by_key(|c| c.folder.len())
            .map(|c| c.name.as_str())
    }

    pub fn folder_for(&self, site: &SiteId, category: &str) -> Option<&str> {
        self.by_site
            .get(site)?
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.folder.as_str())
    }

    /// Every category folder of a site, in template order
    pub fn folders(&self, site: &SiteId) -> Vec<&str> {
        self.by_site
            .get(site)
            .map(|categories| categories.iter().map(|c| c.folder.as_str()).collect())
            .unwrap_or_default()
    }
}

fn strip_segment_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;

    fn index() -> CategoryIndex {
        let snapshot = CorpusSnapshot::new(
            vec![
                Site::new("a", "one")
                    .with_category("page", "pages")
                    .with_category("resource", "resources")
                    .with_category("video", "resources/video"),
                Site::new("b", "two").with_category("page", "lectures"),
            ],
            vec![],
        )
        .unwrap();
        CategoryIndex::build(&snapshot, "content")
    }

    #[test]
    fn test_longest_prefix_wins() {
        let index = index();
        let site = SiteId::new("a");
        assert_eq!(index.category_for(&site, "content/resources/cat"), Some("resource"));
        assert_eq!(index.category_for(&site, "/resources/video/lec1"), Some("video"));
        assert_eq!(index.category_for(&site, "pages"), Some("page"));
    }

    #[test]
    fn test_prefix_must_be_segment_aligned() {
        let index = index();
        assert_eq!(index.category_for(&SiteId::new("a"), "resourcesx/cat"), None);
    }

    #[test]
    fn test_mapping_is_per_site() {
        let index = index();
        assert_eq!(index.category_for(&SiteId::new("b"), "pages/x"), None);
        assert_eq!(index.folder_for(&SiteId::new("b"), "page"), Some("lectures"));
        assert_eq!(
            index.folders(&SiteId::new("a")),
            vec!["pages", "resources", "resources/video"]
        );
        assert!(index.folders(&SiteId::new("missing")).is_empty());
    }
}
