use oxigraph::io::RdfFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RDF serializations the service reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RdfSyntax {
    Turtle,
    NTriples,
    NQuads,
    TriG,
    RdfXml,
    N3,
    JsonLd,
}

struct SyntaxEntry {
    syntax: RdfSyntax,
    media_type: &'static str,
    aliases: &'static [&'static str],
    extensions: &'static [&'static str],
}

const SYNTAX_TABLE: &[SyntaxEntry] = &[
    SyntaxEntry {
        syntax: RdfSyntax::Turtle,
        media_type: "text/turtle",
        aliases: &["application/x-turtle", "application/turtle"],
        extensions: &["ttl"],
    },
    SyntaxEntry {
        syntax: RdfSyntax::NTriples,
        media_type: "application/n-triples",
        aliases: &["text/plain"],
        extensions: &["nt"],
    },
    SyntaxEntry {
        syntax: RdfSyntax::NQuads,
        media_type: "application/n-quads",
        aliases: &["text/x-nquads", "text/nquads"],
        extensions: &["nq"],
    },
    SyntaxEntry {
        syntax: RdfSyntax::TriG,
        media_type: "application/trig",
        aliases: &["application/x-trig"],
        extensions: &["trig"],
    },
    SyntaxEntry {
        syntax: RdfSyntax::RdfXml,
        media_type: "application/rdf+xml",
        aliases: &["text/rdf+xml"],
        extensions: &["rdf", "owl", "xml"],
    },
    SyntaxEntry {
        syntax: RdfSyntax::N3,
        media_type: "text/n3",
        aliases: &["text/rdf+n3"],
        extensions: &["n3"],
    },
    SyntaxEntry {
        syntax: RdfSyntax::JsonLd,
        media_type: "application/ld+json",
        aliases: &[],
        extensions: &["jsonld"],
    },
];

impl RdfSyntax {
    /// Every syntax, in table order.
    pub fn all() -> impl Iterator<Item = RdfSyntax> {
        SYNTAX_TABLE.iter().map(|entry| entry.syntax)
    }

    fn entry(self) -> &'static SyntaxEntry {
        SYNTAX_TABLE
            .iter()
            .find(|entry| entry.syntax == self)
            .unwrap_or(&SYNTAX_TABLE[0])
    }

    /// Canonical media type, used for `Content-Type` headers.
    pub fn media_type(self) -> &'static str {
        self.entry().media_type
    }

    /// File extensions for this syntax, preferred one first.
    pub fn extensions(self) -> &'static [&'static str] {
        self.entry().extensions
    }

    /// Looks up a syntax by media type.
    ///
    /// Matching ignores ASCII case, surrounding whitespace and any media type
    /// parameters (`text/turtle; charset=utf-8` is Turtle).
    pub fn from_media_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or("").trim();
        if essence.is_empty() {
            return None;
        }
        SYNTAX_TABLE
            .iter()
            .find(|entry| {
                entry.media_type.eq_ignore_ascii_case(essence)
                    || entry
                        .aliases
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(essence))
            })
            .map(|entry| entry.syntax)
    }

    /// Looks up a syntax by file extension, with or without the leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim().trim_start_matches('.');
        SYNTAX_TABLE
            .iter()
            .find(|entry| {
                entry
                    .extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(extension))
            })
            .map(|entry| entry.syntax)
    }

    /// The oxigraph format backing this syntax, if the linked oxigraph build
    /// can handle it.
    pub fn format(self) -> Option<RdfFormat> {
        RdfFormat::from_media_type(self.media_type())
    }

    /// Chooses the syntax for a payload: a recognized declared media type
    /// wins, otherwise the file extension decides.
    pub fn resolve(declared: Option<&str>, extension: Option<&str>) -> Option<Self> {
        declared
            .and_then(Self::from_media_type)
            .or_else(|| extension.and_then(Self::from_extension))
    }
}

impl fmt::Display for RdfSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_lookup_ignores_case_and_parameters() {
        assert_eq!(
            RdfSyntax::from_media_type("Text/Turtle; charset=UTF-8"),
            Some(RdfSyntax::Turtle)
        );
        assert_eq!(
            RdfSyntax::from_media_type("application/rdf+xml"),
            Some(RdfSyntax::RdfXml)
        );
        assert_eq!(
            RdfSyntax::from_media_type("text/rdf+n3"),
            Some(RdfSyntax::N3)
        );
        assert_eq!(RdfSyntax::from_media_type("application/json"), None);
        assert_eq!(RdfSyntax::from_media_type(""), None);
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(RdfSyntax::from_extension("TTL"), Some(RdfSyntax::Turtle));
        assert_eq!(RdfSyntax::from_extension(".owl"), Some(RdfSyntax::RdfXml));
        assert_eq!(RdfSyntax::from_extension("jsonld"), Some(RdfSyntax::JsonLd));
        assert_eq!(RdfSyntax::from_extension("txt"), None);
    }

    #[test]
    fn declared_type_beats_extension_and_unknown_falls_back() {
        assert_eq!(
            RdfSyntax::resolve(Some("application/n-triples"), Some("ttl")),
            Some(RdfSyntax::NTriples)
        );
        assert_eq!(
            RdfSyntax::resolve(Some("application/x-unknown"), Some("ttl")),
            Some(RdfSyntax::Turtle)
        );
        assert_eq!(RdfSyntax::resolve(None, None), None);
        assert_eq!(RdfSyntax::resolve(Some("text/html"), Some("html")), None);
    }

    #[test]
    fn every_syntax_maps_to_an_oxigraph_format() {
        for syntax in RdfSyntax::all() {
            assert!(syntax.format().is_some(), "{syntax} has no format");
        }
    }
}
