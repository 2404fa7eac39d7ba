//! Reference resolution against the inherited `xml:base`, following
//! [RFC 3986](https://www.ietf.org/rfc/rfc3986) section 5.
//!
//! RDF/XML documents frequently carry no usable base (stdin, string buffers),
//! so resolution here is deliberately lenient: when the base is absent or not
//! an IRI, references pass through unchanged instead of failing the parse.

use oxiri::Iri;

/// Resolves `reference` against `base`.
///
/// Follows RFC 3986 reference resolution, including dot-segment removal and
/// fragment replacement. An empty or unparseable base, or a reference the
/// resolution algorithm rejects, yields the reference verbatim.
pub fn resolve(base: &str, reference: &str) -> String {
    match Iri::parse(base) {
        Ok(base) => base
            .resolve(reference)
            .map(Iri::into_inner)
            .unwrap_or_else(|_| reference.to_owned()),
        Err(_) => reference.to_owned(),
    }
}

/// Computes the base in effect for an element carrying `xml:base`.
///
/// The attribute value is itself resolved against the inherited base, and any
/// fragment it carries is discarded: fragments never participate in further
/// resolution.
pub fn resolve_base(parent_base: &str, xml_base: &str) -> String {
    let mut base = resolve(parent_base, xml_base);
    if let Some(position) = base.find('#') {
        base.truncate(position);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_references_pass_through() {
        assert_eq!(
            "http://other.org/x",
            resolve("http://example.org/dir/file", "http://other.org/x")
        );
        assert_eq!("mailto:foo@example.org", resolve("http://example.org/", "mailto:foo@example.org"));
    }

    #[test]
    fn empty_reference_strips_fragment() {
        assert_eq!(
            "http://example.org/dir/file",
            resolve("http://example.org/dir/file#frag", "")
        );
    }

    #[test]
    fn fragment_reference_replaces_fragment() {
        assert_eq!(
            "http://example.org/dir/file#new",
            resolve("http://example.org/dir/file#old", "#new")
        );
    }

    #[test]
    fn relative_merge_and_dot_segments() {
        assert_eq!(
            "http://example.org/dir/other",
            resolve("http://example.org/dir/file", "other")
        );
        assert_eq!(
            "http://example.org/other",
            resolve("http://example.org/dir/file", "../other")
        );
        assert_eq!(
            "http://example.org/a/c",
            resolve("http://example.org/a/b/", "../c")
        );
        assert_eq!(
            "http://example.org/root",
            resolve("http://example.org/dir/file", "/root")
        );
        assert_eq!(
            "http://other.org/x",
            resolve("http://user@example.org:8080/dir/file", "//other.org/x")
        );
    }

    #[test]
    fn unusable_base_passes_reference_through() {
        assert_eq!("other", resolve("", "other"));
        assert_eq!("#frag", resolve("not an iri", "#frag"));
        assert_eq!("http://example.org/x", resolve("", "http://example.org/x"));
    }

    #[test]
    fn xml_base_fragments_are_discarded() {
        assert_eq!(
            "http://example.org/doc",
            resolve_base("", "http://example.org/doc#frag")
        );
        assert_eq!(
            "http://example.org/a/doc",
            resolve_base("http://example.org/a/b", "doc")
        );
    }
}
