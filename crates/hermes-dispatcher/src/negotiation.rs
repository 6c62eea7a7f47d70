//! Content negotiation.
//!
//! Reduces the caller's accept list and the handler's produces list to the
//! one media type the response is written in. Producer order wins over caller
//! order.

use hermes_core::{Accept, MediaType, RouteError};

/// Picks the response media type.
///
/// - a declared `Accept` with no valid entry: not acceptable
/// - no `Accept` header, produces contains `*/*`, or produces is empty: `*/*`
/// - accept contains `*/*`: the first produced type
/// - otherwise: the first produced type compatible with any accepted type.
///   Where the produced entry is a partial wildcard (`text/*`) and the
///   accepted one is concrete, the concrete type is returned.
///
/// No overlap yields [`RouteError::NotAcceptable`]. Selection normally rules
/// this out before negotiation runs.
///
/// # Example
///
/// ```
/// use hermes_core::{Accept, MediaType};
/// use hermes_dispatcher::negotiate;
///
/// let json = MediaType::json();
/// let text = MediaType::text_plain();
///
/// let accept = Accept::from(vec![MediaType::wildcard()]);
/// let chosen = negotiate(&accept, &[json.clone(), text.clone()]).unwrap();
/// assert_eq!(chosen, json);
///
/// let accept = Accept::from(vec![text, json.clone()]);
/// let chosen = negotiate(&accept, &[json.clone()]).unwrap();
/// assert_eq!(chosen, json);
///
/// assert!(negotiate(&Accept::Any, &[json]).unwrap().is_wildcard());
/// ```
pub fn negotiate(accept: &Accept, produces: &[MediaType]) -> Result<MediaType, RouteError> {
    let not_acceptable = || RouteError::NotAcceptable {
        accept: accept.to_string(),
    };

    let accepted = match accept {
        Accept::Listed(types) if types.is_empty() => return Err(not_acceptable()),
        Accept::Any => return Ok(MediaType::wildcard()),
        Accept::Listed(types) => types,
    };

    if produces.is_empty() || produces.iter().any(MediaType::is_wildcard) {
        return Ok(MediaType::wildcard());
    }

    if accepted.iter().any(MediaType::is_wildcard) {
        return Ok(produces[0].clone());
    }

    for produced in produces {
        if let Some(a) = accepted.iter().find(|a| produced.is_compatible(a)) {
            let chosen = if a.specificity() > produced.specificity() {
                a
            } else {
                produced
            };
            return Ok(chosen.clone());
        }
    }

    Err(not_acceptable())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<MediaType> {
        items.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn accept(items: &[&str]) -> Accept {
        Accept::from(list(items))
    }

    #[test]
    fn test_wildcard_accept_takes_first_produced() {
        let chosen = negotiate(
            &accept(&["*/*"]),
            &list(&["application/json", "text/plain"]),
        )
        .unwrap();
        assert_eq!(chosen.essence(), "application/json");
    }

    #[test]
    fn test_producer_order_wins() {
        let chosen = negotiate(
            &accept(&["text/plain", "application/json"]),
            &list(&["application/json"]),
        )
        .unwrap();
        assert_eq!(chosen.essence(), "application/json");

        let chosen = negotiate(
            &accept(&["text/plain", "application/json"]),
            &list(&["application/json", "text/plain"]),
        )
        .unwrap();
        assert_eq!(chosen.essence(), "application/json");
    }

    #[test]
    fn test_defaults_to_wildcard() {
        assert!(negotiate(&Accept::Any, &list(&["application/json"]))
            .unwrap()
            .is_wildcard());
        assert!(negotiate(&accept(&["text/plain"]), &list(&["*/*"]))
            .unwrap()
            .is_wildcard());
        assert!(negotiate(&accept(&["text/plain"]), &[]).unwrap().is_wildcard());
    }

    #[test]
    fn test_declared_accept_without_valid_entries() {
        let err =
            negotiate(&Accept::Listed(Vec::new()), &list(&["application/json"])).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::NOT_ACCEPTABLE);

        let err = negotiate(&Accept::Listed(Vec::new()), &list(&["*/*"])).unwrap_err();
        assert!(matches!(err, RouteError::NotAcceptable { .. }));
    }

    #[test]
    fn test_partial_wildcards() {
        let chosen = negotiate(&accept(&["text/*"]), &list(&["image/png", "text/html"])).unwrap();
        assert_eq!(chosen.essence(), "text/html");

        let chosen = negotiate(&accept(&["text/csv"]), &list(&["text/*"])).unwrap();
        assert_eq!(chosen.essence(), "text/csv");
    }

    #[test]
    fn test_no_overlap_is_not_acceptable() {
        let err = negotiate(
            &accept(&["text/csv", "image/png"]),
            &list(&["application/json"]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RouteError::NotAcceptable {
                accept: "text/csv, image/png".into()
            }
        );
    }

    #[test]
    fn test_parameters_kept_on_produced_type() {
        let chosen = negotiate(
            &accept(&["application/json"]),
            &list(&["application/json; charset=utf-8"]),
        )
        .unwrap();
        assert_eq!(chosen.param("charset"), Some("utf-8"));
    }
}
