//! Client-side route table.
//!
//! The static host answers every unknown path with the entry document, so
//! these paths are resolved by the dashboard itself.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`, redirects to the transaction summary
    Root,
    /// `/transactions`
    TransactionSummary,
    /// `/transactions/:externalId`
    TransactionDetail { external_id: String },
    /// `/cash-flows`
    CashFlowSummary,
    /// `/cash-flows/:cashFlowId`
    CashFlowDetail { cash_flow_id: String },
    NotFound,
}

impl Route {
    /// Resolves a request path. Query strings, fragments and trailing
    /// slashes are ignored.
    pub fn recognize(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Root,
            ["transactions"] => Self::TransactionSummary,
            ["transactions", id] => match decode(id) {
                Some(external_id) => Self::TransactionDetail { external_id },
                None => Self::NotFound,
            },
            ["cash-flows"] => Self::CashFlowSummary,
            ["cash-flows", id] => match decode(id) {
                Some(cash_flow_id) => Self::CashFlowDetail { cash_flow_id },
                None => Self::NotFound,
            },
            _ => Self::NotFound,
        }
    }

    /// Path for this route, with identifiers percent-encoded.
    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::TransactionSummary => "/transactions".to_string(),
            Self::TransactionDetail { external_id } => {
                format!("/transactions/{}", urlencoding::encode(external_id))
            }
            Self::CashFlowSummary => "/cash-flows".to_string(),
            Self::CashFlowDetail { cash_flow_id } => {
                format!("/cash-flows/{}", urlencoding::encode(cash_flow_id))
            }
            Self::NotFound => "/404".to_string(),
        }
    }

    /// Route to navigate to instead of this one, if any.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::Root => Some(Self::TransactionSummary),
            _ => None,
        }
    }

    /// Follows redirects to the route that is actually rendered.
    pub fn resolve(path: &str) -> Self {
        let route = Self::recognize(path);
        route.redirect().unwrap_or(route)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::TransactionSummary => "transaction-summary",
            Self::TransactionDetail { .. } => "transaction-detail",
            Self::CashFlowSummary => "cash-flow-summary",
            Self::CashFlowDetail { .. } => "cash-flow-detail",
            Self::NotFound => "not-found",
        }
    }
}

/// Percent-decodes a path segment. Segments that do not decode to UTF-8
/// match no route.
fn decode(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
