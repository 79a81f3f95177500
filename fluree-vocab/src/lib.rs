//! RDF Vocabulary Constants for Fluree generation plans
//!
//! This crate provides a centralized location for the vocabulary IRIs used
//! by the SOURCE / ITERATOR / TEMPLATE generation layer.
//!
//! # Organization
//!
//! Constants are organized by vocabulary:
//! - `xsd` - XSD vocabulary (http://www.w3.org/2001/XMLSchema#)
//! - `media_types` - IANA media type references used as literal datatypes
//! - `st` - SPARQL-Template functions (http://ns.inria.fr/sparql-template/)
//! - `iter` - SPARQL-Generate iterator functions (http://w3id.org/sparql-generate/iter/)

/// XSD vocabulary constants
pub mod xsd {
    /// xsd:string IRI
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

    /// xsd:integer IRI
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

    /// xsd:long IRI
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";

    /// xsd:int IRI
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";

    /// xsd:short IRI
    pub const SHORT: &str = "http://www.w3.org/2001/XMLSchema#short";

    /// xsd:byte IRI
    pub const BYTE: &str = "http://www.w3.org/2001/XMLSchema#byte";

    /// xsd:nonNegativeInteger IRI
    pub const NON_NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";

    /// xsd:positiveInteger IRI
    pub const POSITIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#positiveInteger";

    /// xsd:decimal IRI
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

    /// xsd:double IRI
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

    /// xsd:boolean IRI
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

    /// Check whether a datatype belongs to the integer family
    ///
    /// Used when an argument position accepts "an integer" regardless of
    /// which XSD integer subtype the literal was written with.
    #[inline]
    pub fn is_integer_family(datatype_iri: &str) -> bool {
        matches!(
            datatype_iri,
            INTEGER | LONG | INT | SHORT | BYTE | NON_NEGATIVE_INTEGER | POSITIVE_INTEGER
        )
    }
}

/// IANA media type references
///
/// Fetched documents are typed with a datatype IRI of the form
/// `https://www.iana.org/assignments/media-types/<type>/<subtype>`. The same
/// IRI shape is the only accepted encoding for ACCEPT clauses.
pub mod media_types {
    /// Prefix of every media type datatype IRI
    pub const IANA_PREFIX: &str = "https://www.iana.org/assignments/media-types/";

    /// Accept header meaning "anything"
    pub const ANY: &str = "*/*";

    /// application/json
    pub const APPLICATION_JSON: &str = "application/json";

    /// Datatype IRI of JSON documents
    pub const APPLICATION_JSON_IRI: &str =
        "https://www.iana.org/assignments/media-types/application/json";

    /// text/plain
    pub const TEXT_PLAIN: &str = "text/plain";

    /// text/csv
    pub const TEXT_CSV: &str = "text/csv";

    /// application/xml
    pub const APPLICATION_XML: &str = "application/xml";

    /// text/html
    pub const TEXT_HTML: &str = "text/html";

    /// text/turtle
    pub const TEXT_TURTLE: &str = "text/turtle";

    /// Check whether a datatype IRI is an IANA media type reference
    #[inline]
    pub fn is_media_type_iri(datatype_iri: &str) -> bool {
        datatype_iri.starts_with(IANA_PREFIX)
    }
}

/// SPARQL-Template function IRIs
pub mod st {
    /// Namespace
    pub const NS: &str = "http://ns.inria.fr/sparql-template/";

    /// st:format - positional string formatting
    pub const FORMAT: &str = "http://ns.inria.fr/sparql-template/format";

    /// st:incr - increase the template indentation
    pub const INCR: &str = "http://ns.inria.fr/sparql-template/incr";

    /// st:decr - decrease the template indentation
    pub const DECR: &str = "http://ns.inria.fr/sparql-template/decr";
}

/// SPARQL-Generate iterator function IRIs
pub mod iter {
    /// Namespace
    pub const NS: &str = "http://w3id.org/sparql-generate/iter/";

    /// iter:JSONSurfer - streaming JSONPath iterator
    pub const JSON_SURFER: &str = "http://w3id.org/sparql-generate/iter/JSONSurfer";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_family() {
        assert!(xsd::is_integer_family(xsd::INTEGER));
        assert!(xsd::is_integer_family(xsd::INT));
        assert!(!xsd::is_integer_family(xsd::DECIMAL));
        assert!(!xsd::is_integer_family(xsd::STRING));
    }

    #[test]
    fn test_media_type_iri() {
        assert!(media_types::is_media_type_iri(media_types::APPLICATION_JSON_IRI));
        assert_eq!(
            format!("{}{}", media_types::IANA_PREFIX, media_types::APPLICATION_JSON),
            media_types::APPLICATION_JSON_IRI
        );
        assert!(!media_types::is_media_type_iri(xsd::STRING));
    }
}
