//! Image extraction and block/inline placement.

use flare_core::{ConversionOptions, Image};

use crate::node::Element;
use crate::utilities::{file_name, parse_css_length};

/// Images at or below this size (px) are icons and stay in the sentence
pub const INLINE_SIZE_LIMIT: u32 = 36;

/// Paragraph text longer than this keeps images inline
pub const INLINE_TEXT_THRESHOLD: usize = 5;

const INLINE_CLASS_HINTS: &[&str] = &["iconinline", "inline", "icon"];

const ICON_PATH_HINTS: &[&str] = &["/icons/", "/icon/"];

/// Build an [`Image`] from an `<img>` element
pub fn image_from_element(img: &Element, options: &ConversionOptions) -> Image {
    let size = |attr: &str| {
        img.attr(attr)
            .and_then(parse_css_length)
            .or_else(|| img.style_property(attr).and_then(parse_css_length))
    };
    let src = img.attr_trimmed("src").unwrap_or_default();

    Image {
        src: rewrite_src(src, options),
        alt: img.attr_trimmed("alt").unwrap_or_default().to_string(),
        title: img.attr_trimmed("title").map(str::to_string),
        width: size("width"),
        height: size("height"),
        class: img.attr_trimmed("class").map(str::to_string),
    }
}

/// Point the source at the images directory when images are extracted
pub fn rewrite_src(src: &str, options: &ConversionOptions) -> String {
    let src = src.replace('\\', "/");
    if !options.extract_images || src.is_empty() || src.starts_with("data:") || src.contains("://") {
        return src;
    }
    let directory = options.images_directory.trim().trim_end_matches('/');
    format!("{}/{}", directory, file_name(&src))
}

/// Whether an image belongs in running text.
///
/// `surrounding_text` is the number of visible characters in the enclosing
/// paragraph, the image itself excluded.
pub fn is_inline(image: &Image, surrounding_text: usize) -> bool {
    let class_hint = image.class.as_deref().is_some_and(|class| {
        class.split_whitespace().any(|c| {
            let c = c.to_ascii_lowercase();
            INLINE_CLASS_HINTS.iter().any(|hint| c.contains(hint))
        })
    });
    let small = [image.width, image.height]
        .iter()
        .flatten()
        .any(|&px| px <= INLINE_SIZE_LIMIT);
    let src = image.src.to_ascii_lowercase();
    let icon_path = ICON_PATH_HINTS.iter().any(|hint| src.contains(hint));

    class_hint || small || icon_path || surrounding_text > INLINE_TEXT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_core::OutputFormat;

    fn img(attrs: Vec<(&str, &str)>) -> Image {
        let options = ConversionOptions::new(OutputFormat::Asciidoc);
        image_from_element(&Element::with_attrs("img", attrs), &options)
    }

    #[test]
    fn test_lone_screenshot_is_block() {
        let image = img(vec![("src", "Images/dialog.png"), ("width", "640")]);
        assert!(!is_inline(&image, 0));
    }

    #[test]
    fn test_inline_hints() {
        assert!(is_inline(&img(vec![("src", "a.png"), ("class", "IconInline")]), 0));
        assert!(is_inline(&img(vec![("src", "a.png"), ("width", "16")]), 0));
        assert!(is_inline(&img(vec![("src", "a.png"), ("style", "height: 24px")]), 0));
        assert!(is_inline(&img(vec![("src", "Resources/Icons/save.png")]), 0));
        assert!(is_inline(&img(vec![("src", "big.png")]), 12));
        assert!(!is_inline(&img(vec![("src", "big.png")]), 5));
    }

    #[test]
    fn test_attributes_carried() {
        let image = img(vec![("src", "a.png"), ("alt", "Save"), ("title", "Save dialog"), ("width", "120px")]);
        assert_eq!(image.alt, "Save");
        assert_eq!(image.title.as_deref(), Some("Save dialog"));
        assert_eq!(image.width, Some(120));
    }

    #[test]
    fn test_extracted_images_are_rewritten() {
        let mut options = ConversionOptions::new(OutputFormat::Asciidoc);
        options.extract_images = true;
        options.images_directory = "assets/".to_string();
        assert_eq!(rewrite_src("../Resources/Images/Dialog.png", &options), "assets/Dialog.png");
        assert_eq!(rewrite_src("https://cdn.example.com/a.png", &options), "https://cdn.example.com/a.png");
    }
}
