//! SOURCE clause: bind a variable to the content of a fetched document
//!
//! ```text
//! SOURCE <http://ex.org/doc.json> ACCEPT <https://www.iana.org/assignments/media-types/application/json> AS ?doc
//! ```
//!
//! The bound literal's datatype records the document's media type (see
//! [`media_type_datatype`]). Resolution failures leave the variable
//! explicitly absent instead of failing the run.

use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::fetch::LookUpRequest;
use crate::term::{media_type_datatype, Term, TermPattern, Var};
use fluree_vocab::{media_types, xsd};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

static MEDIA_TYPE_IRI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://www\.iana\.org/assignments/media-types/(.+)$").expect("valid regex")
});

/// Media type named by an IANA media type IRI
///
/// `https://www.iana.org/assignments/media-types/application/json` gives
/// `application/json`.
pub fn media_type_of(iri: &str) -> Option<&str> {
    MEDIA_TYPE_IRI
        .captures(iri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn accept_from_term(term: &Term) -> Result<String> {
    term.as_iri()
        .and_then(media_type_of)
        .map(str::to_string)
        .ok_or_else(|| {
            GenerateError::InvalidMediaType(format!(
                "expected an IANA media type IRI in ACCEPT, got {term}"
            ))
        })
}

/// An executable SOURCE clause
#[derive(Debug, Clone)]
pub struct SourcePlan {
    node: TermPattern,
    accept: Option<TermPattern>,
    var: Var,
}

impl SourcePlan {
    /// Create a SOURCE clause
    ///
    /// A constant location must be an IRI and a constant ACCEPT must be an
    /// IANA media type IRI.
    pub fn new(node: TermPattern, accept: Option<TermPattern>, var: Var) -> Result<Self> {
        if let TermPattern::Const(term) = &node {
            if !term.is_iri() {
                return Err(GenerateError::Configuration(format!(
                    "SOURCE location must be an IRI or a variable, got {term}"
                )));
            }
        }
        if let Some(TermPattern::Const(term)) = &accept {
            accept_from_term(term)?;
        }
        Ok(Self { node, accept, var })
    }

    /// The variable this clause binds
    pub fn var(&self) -> &Var {
        &self.var
    }

    /// Accept value sent to the fetcher for this binding
    fn accept_for(&self, binding: &Binding) -> Result<String> {
        match self.accept.as_ref().and_then(|a| a.resolve(binding)) {
            Some(term) => accept_from_term(term),
            None => Ok(media_types::ANY.to_string()),
        }
    }

    /// Resolve the document for one input binding
    ///
    /// Returns the input binding extended with the variable, bound to the
    /// document content or absent when it could not be resolved.
    pub async fn exec(&self, binding: &Binding, ctx: &ExecutionContext<'_>) -> Result<Binding> {
        let absent = || binding.extend(self.var.clone(), None);

        let Some(location) = self.node.resolve(binding) else {
            debug!(var = %self.var, node = %self.node, "SOURCE location unbound");
            return Ok(absent());
        };
        let Some(location) = location.as_iri() else {
            return Err(GenerateError::Configuration(format!(
                "SOURCE location must be an IRI, got {location}"
            )));
        };
        let request = LookUpRequest::new(location, self.accept_for(binding)?);

        let Some(stream) = ctx.fetcher.open(&request).await else {
            info!(request = %request, var = %self.var, "no document found, leaving variable unbound");
            return Ok(absent());
        };
        let media_type = stream.media_type().map(str::to_string);

        let read = tokio::task::spawn_blocking(move || stream.read_to_string()).await;
        let content = match read {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                warn!(request = %request, error = %e, "error reading document, leaving variable unbound");
                return Ok(absent());
            }
            Err(e) => {
                return Err(GenerateError::Internal(format!(
                    "document read task failed: {e}"
                )))
            }
        };

        let datatype = media_type_datatype(media_type.as_deref());
        let term = if &*datatype == xsd::STRING {
            Term::string(content)
        } else {
            Term::typed(content, datatype)
        };
        debug!(request = %request, datatype = %term.datatype().unwrap_or_default(), "bound SOURCE document");
        Ok(binding.bind(self.var.clone(), term))
    }
}
