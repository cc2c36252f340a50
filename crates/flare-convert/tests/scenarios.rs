use flare_convert::{
    BatchOutcome, ConversionError, ConversionOptions, ConversionService, OutputFormat, ValidationStrictness,
};
use flare_core::validate::{auto_fix, validate, Severity, ValidationOptions};

fn convert(html: &str, format: OutputFormat) -> String {
    ConversionService::new()
        .convert(html, &ConversionOptions::new(format))
        .unwrap()
        .content
}

fn adoc(html: &str) -> String {
    convert(html, OutputFormat::Asciidoc)
}

#[test]
fn test_two_item_ordered_list() {
    assert_eq!(adoc("<ol><li>A</li><li>B</li></ol>"), ". A\n. B\n");
}

#[test]
fn test_nested_lower_alpha_list() {
    let out = adoc(
        r#"<ol>
            <li>Open the settings.</li>
            <li>Pick a mode:
                <ol style="list-style-type: lower-alpha">
                    <li>Fast</li>
                    <li>Safe</li>
                </ol>
            </li>
        </ol>"#,
    );
    assert_eq!(out, ". Open the settings.\n. Pick a mode:\n[loweralpha]\n.. Fast\n.. Safe\n");
}

#[test]
fn test_nested_list_ignores_literal_numbers() {
    let out = adoc(r#"<ol><li>Start<ol style="list-style-type: lower-alpha"><li>1. first</li></ol></li></ol>"#);
    let nested = out.lines().find(|l| l.starts_with("..")).unwrap();
    assert!(nested.starts_with(".. "), "{out}");
    assert!(!out.contains("\n. 1."), "{out}");
}

#[test]
fn test_sibling_alpha_list_is_nested() {
    let out = adoc(
        r#"<ol><li>Install</li><li>Configure</li></ol><ol style="list-style-type: lower-alpha"><li>Network</li><li>Storage</li></ol>"#,
    );
    assert_eq!(out, ". Install\n. Configure\n[loweralpha]\n.. Network\n.. Storage\n");
}

#[test]
fn test_lone_image_is_block_with_blank_lines() {
    let out = adoc(r#"<p>Before</p><p><img src="Images/dialog.png"></p><p>After</p>"#);
    assert_eq!(out, "Before\n\nimage::Images/dialog.png[]\n\nAfter\n");
}

#[test]
fn test_icon_image_stays_inline() {
    let out = adoc(r#"<p>Click <img class="IconInline" src="Images/save.png" width="16"> to continue</p>"#);
    assert_eq!(out.lines().count(), 1, "{out}");
    assert!(out.starts_with("Click image:Images/save.png["), "{out}");
    assert!(out.ends_with("] to continue\n"), "{out}");
}

#[test]
fn test_document_link_extension_rewritten() {
    let html = r#"<p>Read the <a href="guide.htm">guide</a>.</p>"#;
    let asciidoc = adoc(html);
    assert!(asciidoc.contains("guide.adoc"), "{asciidoc}");
    assert!(!asciidoc.contains(".htm"), "{asciidoc}");

    let markdown = convert(html, OutputFormat::WritersideMarkdown);
    assert!(markdown.contains("(guide.md)"), "{markdown}");

    let zendesk = convert(html, OutputFormat::Zendesk);
    assert!(zendesk.contains("href=\"guide.html\""), "{zendesk}");
}

#[test]
fn test_in_page_anchor_preserved() {
    let out = adoc(r##"<h2 id="setup">Setup</h2><p>See <a href="#setup">setup</a>.</p>"##);
    assert!(out.contains("[[setup]]"), "{out}");
    assert!(out.contains("<<setup,setup>>"), "{out}");
}

#[test]
fn test_orphaned_continuation_validate_and_fix() {
    let text = "Intro paragraph.\n\n+\n\nNext paragraph.\n";
    let strict = ValidationOptions {
        strictness: ValidationStrictness::Strict,
        ..Default::default()
    };

    let report = validate(text, &strict);
    let orphaned: Vec<_> = report.iter().filter(|i| i.rule == "orphaned-continuation").collect();
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0].severity, Severity::Warning);

    let fixed = auto_fix(text, &strict);
    assert!(!fixed.content.lines().any(|l| l.trim() == "+"));
    assert_eq!(
        fixed
            .remaining_issues
            .iter()
            .filter(|i| i.rule == "orphaned-continuation")
            .count(),
        0
    );
}

#[test]
fn test_emphasis_boundary_in_every_format() {
    let html = "<p>The <em>panel</em> is not showing</p>";

    let asciidoc = adoc(html);
    assert!(asciidoc.contains("_panel_ is not showing"), "{asciidoc}");

    let markdown = convert(html, OutputFormat::WritersideMarkdown);
    assert!(markdown.contains("panel_ is not showing") || markdown.contains("panel* is not showing"), "{markdown}");

    let zendesk = convert(html, OutputFormat::Zendesk);
    assert!(zendesk.contains("<em>panel</em> is not showing"), "{zendesk}");

    for out in [asciidoc, markdown, zendesk] {
        assert!(!out.contains("panelis"));
        assert!(!out.contains("  is"));
    }
}

#[test]
fn test_emphasis_inside_word_uses_unconstrained_marks() {
    let out = adoc("<p>re<b>con</b>figure</p>");
    assert_eq!(out, "re**con**figure\n");
}

#[test]
fn test_excluded_document_single_vs_batch() {
    let html = r#"<html><body><div madcap:conditions="Default.Deprecated"><p>Old topic</p></div></body></html>"#;
    let service = ConversionService::new();
    let options = ConversionOptions::new(OutputFormat::Asciidoc);

    match service.convert(html, &options) {
        Err(ConversionError::ExcludedContent { condition, .. }) => assert_eq!(condition, "Default.Deprecated"),
        other => panic!("expected exclusion error, got {other:?}"),
    }

    let outcome = service.convert_batch_item("Topics/Old.htm", html, &options).unwrap();
    assert!(matches!(
        outcome,
        BatchOutcome::Skipped { ref source_name, .. } if source_name == "Topics/Old.htm"
    ));
}

#[test]
fn test_unsupported_format_rejected() {
    let err = ConversionOptions::for_format("docbook").unwrap_err();
    assert_eq!(err.to_string(), "Unsupported format: docbook");

    let json = r#"{"format": "pdf"}"#;
    assert!(serde_json::from_str::<ConversionOptions>(json).is_err());
}

#[test]
fn test_options_from_request_json() {
    let json = r#"{
        "format": "asciidoc",
        "inputType": "madcap",
        "variableOptions": {"variableMode": "reference"},
        "asciidocOptions": {"enableValidation": true, "validationStrictness": "lenient"}
    }"#;
    let options: ConversionOptions = serde_json::from_str(json).unwrap();
    assert_eq!(options.format, OutputFormat::Asciidoc);
    assert!(options.asciidoc_options.enable_validation);
    assert_eq!(options.asciidoc_options.validation_strictness, ValidationStrictness::Lenient);
}

#[test]
fn test_admonitions_per_format() {
    let html = r#"<p class="Warning">Unplug the device first.</p>"#;
    assert_eq!(adoc(html), "WARNING: Unplug the device first.\n");

    let markdown = convert(html, OutputFormat::WritersideMarkdown);
    assert!(markdown.contains("> Unplug the device first."), "{markdown}");
    assert!(markdown.contains("{style=\"warning\"}"), "{markdown}");

    let zendesk = convert(html, OutputFormat::Zendesk);
    assert!(zendesk.contains("callout-warning"), "{zendesk}");
}

#[test]
fn test_multi_paragraph_list_item_uses_continuation() {
    let out = adoc("<ol><li><p>Open the file.</p><p>It may take a while.</p></li><li><p>Save.</p></li></ol>");
    assert_eq!(out, ". Open the file.\n+\nIt may take a while.\n. Save.\n");
}

#[test]
fn test_single_line_items_have_no_continuation() {
    let out = adoc("<ul><li>One</li><li>Two</li></ul>");
    assert!(!out.contains('+'), "{out}");
}

#[test]
fn test_table_with_header_and_spans() {
    let html = r#"<table>
        <thead><tr><th>Setting</th><th>Value</th></tr></thead>
        <tbody><tr><td colspan="2">None</td></tr></tbody>
    </table>"#;
    let out = adoc(html);
    assert!(out.contains("options=\"header\""), "{out}");
    assert!(out.contains("2+|None"), "{out}");

    let result = ConversionService::new()
        .convert(html, &ConversionOptions::new(OutputFormat::WritersideMarkdown))
        .unwrap();
    assert!(result.metadata.warnings.iter().any(|w| w.contains("Merged table cells")));
}

#[test]
fn test_headings_never_indented() {
    let out = adoc("<ul><li>Item<h3>Inside</h3></li></ul><h2>   Spaced</h2>");
    for line in out.lines().filter(|l| l.trim_start().starts_with("==")) {
        assert!(!line.starts_with(' '), "{out}");
    }
}

#[test]
fn test_malformed_markup_degrades_with_output() {
    let result = ConversionService::new()
        .convert("<p>Unclosed <b>bold<ul><li>item", &ConversionOptions::new(OutputFormat::Asciidoc))
        .unwrap();
    assert!(result.content.contains("Unclosed"));
    assert!(result.content.contains("item"));
}

#[test]
fn test_huge_list_start_does_not_panic() {
    let out = adoc(r#"<ol start="4294967295"><li>a</li></ol><ol><li>b</li></ol>"#);
    assert!(out.contains("[start=4294967295]\n. a\n"), "{out}");
    assert!(out.contains(". b"), "{out}");
}

#[test]
fn test_deep_nesting_warns_in_asciidoc() {
    let mut html = String::new();
    for level in 0..7 {
        html.push_str(&format!("<ul><li>L{level}"));
    }
    for _ in 0..7 {
        html.push_str("</li></ul>");
    }

    let result = ConversionService::new()
        .convert(&html, &ConversionOptions::new(OutputFormat::Asciidoc))
        .unwrap();
    assert!(result.content.contains("**** L3\n***** L4\n"), "{}", result.content);
    assert!(result.metadata.warnings.iter().any(|w| w.contains("nested deeper than 5 levels")));

    let markdown = ConversionService::new()
        .convert(&html, &ConversionOptions::new(OutputFormat::WritersideMarkdown))
        .unwrap();
    assert!(markdown.metadata.warnings.is_empty(), "{:?}", markdown.metadata.warnings);
}

#[test]
fn test_image_words_in_prose_and_code_survive_validation() {
    let mut options = ConversionOptions::new(OutputFormat::Asciidoc);
    options.asciidoc_options.enable_validation = true;
    options.asciidoc_options.auto_fix = true;

    let result = ConversionService::new()
        .convert(
            "<p>Run <code>docker pull myimage:latest</code> first.</p><p>Tag the image:latest build.</p>",
            &options,
        )
        .unwrap();
    assert!(result.content.contains("docker pull myimage:latest"), "{}", result.content);
    assert!(result.content.contains("Tag the image:latest build."), "{}", result.content);
    assert!(result.metadata.errors.is_empty(), "{:?}", result.metadata.errors);
    assert!(!result.metadata.warnings.iter().any(|w| w.contains("inline-image-spacing")));
}

#[test]
fn test_nested_table_survives() {
    let out = adoc("<table><tr><td><p>Outer</p><table><tr><td>x</td><td>y</td></tr></table></td></tr></table>");
    assert!(out.contains("!===\n!x !y\n!==="), "{out}");
    assert!(!out.contains("\\|"), "{out}");
}

#[test]
fn test_malformed_markup_reported_as_warning() {
    let result = ConversionService::new()
        .convert("<p>unclosed <b>bold", &ConversionOptions::new(OutputFormat::Asciidoc))
        .unwrap();
    assert_eq!(result.content, "unclosed *bold*\n");
    assert!(result.metadata.warnings.iter().any(|w| w.starts_with("Malformed markup repaired")));
}
