// Unit tests for contact-href matching and email extraction

use pretty_assertions::assert_eq;

use super::*;

fn anchor(index: usize, href: &str) -> AnchorInfo {
    AnchorInfo {
        index,
        href: href.to_string(),
        visible: true,
    }
}

#[test]
fn test_contact_paths_match() {
    assert!(is_contact_href("/contact"));
    assert!(is_contact_href("/contact-us/"));
    assert!(is_contact_href("https://example.com/support"));
    assert!(is_contact_href("/help/center"));
    assert!(is_contact_href("/company/contactus?ref=footer"));
}

#[test]
fn test_non_contact_paths_do_not_match() {
    assert!(!is_contact_href("/about"));
    assert!(!is_contact_href("/products"));
    assert!(!is_contact_href(""));
}

#[test]
fn test_pseudo_links_are_excluded() {
    assert!(!is_contact_href("#contact"));
    assert!(!is_contact_href("javascript:void(0)"));
    assert!(!is_contact_href("tel:+15551234567"));
    assert!(!is_contact_href("mailto:contact@example.com"));
}

#[test]
fn test_social_hosts_are_excluded() {
    assert!(!is_contact_href("https://facebook.com/acme/contact"));
    assert!(!is_contact_href("https://www.linkedin.com/company/acme/contact"));
    assert!(!is_contact_href("https://twitter.com/acme/support"));
    // The same path on the site's own host still matches.
    assert!(is_contact_href("https://acme.com/contact"));
}

#[test]
fn test_mailto_extraction_strips_query() {
    let anchors = vec![anchor(0, "mailto:Info@Example.com?subject=Hi")];
    assert_eq!(extract_emails(&anchors, ""), vec!["info@example.com"]);
}

#[test]
fn test_body_text_extraction() {
    let emails = extract_emails(&[], "Reach us at sales@example.com or SUPPORT@EXAMPLE.COM.");
    assert_eq!(emails, vec!["sales@example.com", "support@example.com"]);
}

#[test]
fn test_extraction_dedups_preserving_discovery_order() {
    let anchors = vec![
        anchor(0, "mailto:first@example.com"),
        anchor(1, "https://example.com/contact"),
        anchor(2, "mailto:second@example.com"),
    ];
    let body = "Write to first@example.com or third@example.com";
    assert_eq!(
        extract_emails(&anchors, body),
        vec![
            "first@example.com",
            "second@example.com",
            "third@example.com"
        ]
    );
}

#[test]
fn test_non_mailto_anchors_contribute_nothing() {
    let anchors = vec![anchor(0, "/contact"), anchor(1, "https://example.com")];
    assert!(extract_emails(&anchors, "no addresses here").is_empty());
}
