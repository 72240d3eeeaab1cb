//! Resolving a classifier's type name against the owner's catalog

use folio_domain::document_type::name_key;
use folio_domain::DocumentType;

/// How a proposed name matched a candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeMatch<'a> {
    /// Equal after trimming and lowercasing
    Exact(&'a DocumentType),
    /// One name contains the other
    Fuzzy(&'a DocumentType),
    /// Nothing matched
    NoMatch,
}

impl<'a> TypeMatch<'a> {
    /// The matched type, if any
    pub fn document_type(&self) -> Option<&'a DocumentType> {
        match self {
            TypeMatch::Exact(ty) | TypeMatch::Fuzzy(ty) => Some(ty),
            TypeMatch::NoMatch => None,
        }
    }
}

/// Match `name` against `candidates` in catalog order
///
/// Exact equality wins over containment; among containment matches the first
/// candidate wins. An empty name never matches.
///
/// # Examples
///
/// ```
/// use folio_domain::{DocumentType, OwnerId};
/// use folio_ingest::matching::{match_type, TypeMatch};
///
/// let types = vec![DocumentType::new(OwnerId::from("o"), "Purchase Order", vec![])];
/// assert!(matches!(match_type("purchase order ", &types), TypeMatch::Exact(_)));
/// assert!(matches!(match_type("Order", &types), TypeMatch::Fuzzy(_)));
/// assert!(matches!(match_type("Invoice", &types), TypeMatch::NoMatch));
/// ```
pub fn match_type<'a>(name: &str, candidates: &'a [DocumentType]) -> TypeMatch<'a> {
    let wanted = name_key(name);
    if wanted.is_empty() {
        return TypeMatch::NoMatch;
    }

    if let Some(ty) = candidates.iter().find(|t| t.name_key() == wanted) {
        return TypeMatch::Exact(ty);
    }

    candidates
        .iter()
        .find(|t| {
            let key = t.name_key();
            !key.is_empty() && (key.contains(&wanted) || wanted.contains(&key))
        })
        .map_or(TypeMatch::NoMatch, TypeMatch::Fuzzy)
}
