use std::collections::BTreeSet;

use flare_convert::{convert_document, preprocess, ConversionOptions, ConversionService, ConvertContext, OutputFormat};
use flare_core::Block;
use proptest::prelude::*;

const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet", "kilo", "lima",
];

const WRAPPERS: &[&str] = &[
    "p", "div", "span", "em", "strong", "b", "i", "code", "section", "blockquote", "h2", "x-widget", "font",
];

const LIST_TAGS: &[(&str, &str)] = &[
    ("<ol>", "</ol>"),
    ("<ul>", "</ul>"),
    (r#"<ol style="list-style-type: lower-alpha">"#, "</ol>"),
    (r#"<ol type="i">"#, "</ol>"),
    (r#"<ol start="3">"#, "</ol>"),
    (r#"<ul class="continue">"#, "</ul>"),
];

const ITEM_TEXT: &[&str] = &["alpha", "bravo charlie", "Pick one:", "delta echo:", "1. foxtrot", "b) golf"];

fn word() -> impl Strategy<Value = String> {
    prop::sample::select(WORDS).prop_map(str::to_string)
}

/// Arbitrary nesting of wrappers, lists and tables around words
fn markup() -> impl Strategy<Value = String> {
    word().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            (prop::sample::select(WRAPPERS), prop::collection::vec(inner.clone(), 1..4))
                .prop_map(|(tag, children)| format!("<{tag}>{}</{tag}>", children.join(" "))),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|items| {
                let items: String = items.iter().map(|i| format!("<li>{i}</li>")).collect();
                format!("<ul>{items}</ul>")
            }),
            prop::collection::vec(inner, 1..3).prop_map(|cells| {
                let cells: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
                format!("<table><tr>{cells}</tr></table>")
            }),
        ]
    })
}

/// Nested lists with mixed marker styles and flattened sub-steps
fn list_markup() -> impl Strategy<Value = String> {
    let leaf = prop::sample::select(ITEM_TEXT).prop_map(str::to_string);
    let list = leaf.prop_recursive(4, 32, 3, |inner| {
        (
            prop::sample::select(LIST_TAGS),
            prop::collection::vec((prop::sample::select(ITEM_TEXT), prop::option::of(inner)), 1..4),
        )
            .prop_map(|((open, close), items)| {
                let items: String = items
                    .into_iter()
                    .map(|(text, nested)| format!("<li>{}{}</li>", text, nested.unwrap_or_default()))
                    .collect();
                format!("{open}{items}{close}")
            })
    });
    prop::collection::vec(prop_oneof![list, prop::sample::select(ITEM_TEXT).prop_map(|t| format!("<p>{t}</p>"))], 1..5)
        .prop_map(|parts| parts.concat())
}

fn words_of(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn check_depths(blocks: &[Block], expected: usize) -> Result<(), String> {
    for block in blocks {
        match block {
            Block::List(list) => {
                if list.depth != expected {
                    return Err(format!("list at depth {} where {} was expected", list.depth, expected));
                }
                for item in &list.items {
                    check_depths(&item.content, expected + 1)?;
                }
            }
            Block::Document(children)
            | Block::BlockQuote(children)
            | Block::Admonition { content: children, .. }
            | Block::Collapsible { content: children, .. } => check_depths(children, expected)?,
            _ => {}
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_no_words_lost(html in markup()) {
        let service = ConversionService::new();
        let expected = words_of(&html);
        for format in [OutputFormat::Asciidoc, OutputFormat::WritersideMarkdown, OutputFormat::Zendesk] {
            let result = service.convert(&html, &ConversionOptions::new(format)).unwrap();
            prop_assert_eq!(&words_of(&result.content), &expected, "{} output:\n{}", format, result.content);
        }
    }

    #[test]
    fn test_nested_list_depth_is_parent_plus_one(html in list_markup()) {
        let options = ConversionOptions::new(OutputFormat::Asciidoc);
        let preprocessed = preprocess(&html, &options).unwrap();
        let mut ctx = ConvertContext::new(&options);
        let document = convert_document(&preprocessed.root, &mut ctx);
        let Block::Document(blocks) = &document else {
            panic!("expected document");
        };
        prop_assert!(check_depths(blocks, 0).is_ok(), "{:?}", check_depths(blocks, 0));
    }

    #[test]
    fn test_output_is_stable_under_post_processing(html in list_markup()) {
        let options = ConversionOptions::new(OutputFormat::Asciidoc);
        let content = ConversionService::new().convert(&html, &options).unwrap().content;
        prop_assert_eq!(flare_core::postprocess::asciidoc(&content), content);
    }
}
