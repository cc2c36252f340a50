//! Link target classification.

use flare_core::LinkTarget;

const DOCUMENT_EXTENSIONS: &[&str] = &[".htm", ".html"];

/// Classify an `href`; `None` for targets with nothing to link to
pub fn classify_href(href: &str) -> Option<LinkTarget> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let lower = href.to_ascii_lowercase();

    if let Some(anchor) = href.strip_prefix('#') {
        return (!anchor.is_empty()).then(|| LinkTarget::Anchor(anchor.to_string()));
    }
    if lower.starts_with("javascript:") {
        return None;
    }
    if lower.starts_with("mailto:") {
        return Some(LinkTarget::Email(href[7..].to_string()));
    }
    if href.contains("://") || lower.starts_with("www.") || lower.starts_with("tel:") {
        return Some(LinkTarget::External(href.to_string()));
    }

    let href = href.replace('\\', "/");
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment).filter(|f| !f.is_empty())),
        None => (href.as_str(), None),
    };
    let lower_path = path.to_ascii_lowercase();
    match DOCUMENT_EXTENSIONS.iter().find(|ext| lower_path.ends_with(*ext)) {
        Some(ext) => Some(LinkTarget::Document {
            path: path[..path.len() - ext.len()].to_string(),
            fragment: fragment.map(str::to_string),
        }),
        None => Some(LinkTarget::File(href.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_links_drop_extension() {
        assert_eq!(
            classify_href("guide.htm"),
            Some(LinkTarget::Document {
                path: "guide".to_string(),
                fragment: None
            })
        );
        let target = classify_href("../Setup/Install.HTML#prereq").unwrap();
        assert_eq!(target.href(".adoc"), "../Setup/Install.adoc#prereq");
        assert_eq!(target.href(".md"), "../Setup/Install.md#prereq");
    }

    #[test]
    fn test_other_targets() {
        assert_eq!(classify_href("#top"), Some(LinkTarget::Anchor("top".to_string())));
        assert_eq!(classify_href("#"), None);
        assert_eq!(
            classify_href("https://example.com/a.htm"),
            Some(LinkTarget::External("https://example.com/a.htm".to_string()))
        );
        assert_eq!(
            classify_href("mailto:docs@example.com"),
            Some(LinkTarget::Email("docs@example.com".to_string()))
        );
        assert_eq!(
            classify_href("files\\manual.pdf"),
            Some(LinkTarget::File("files/manual.pdf".to_string()))
        );
        assert_eq!(classify_href("javascript:void(0)"), None);
    }
}
