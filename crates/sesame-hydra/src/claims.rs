//! Scope-based claim filtering

use std::collections::HashMap;

use sesame_core::types::Claim;

/// Reduce `claims` to those the granted scopes authorize disclosing.
///
/// Pure set intersection: a claim survives iff some requested scope lists
/// its name in `scope_map`. Unknown scopes are ignored. The role list is
/// treated like any other claim, gated by whichever scope lists the
/// `roles` claim name.
pub fn filter_claims(
    scope_map: &HashMap<String, Vec<String>>,
    claims: &Claim,
    requested_scopes: &[String],
) -> Claim {
    let mut details = HashMap::with_capacity(claims.details.len());
    let mut keep_roles = false;

    for scope in requested_scopes {
        let Some(expected) = scope_map.get(scope) else {
            continue;
        };
        for name in expected {
            if name == "roles" {
                keep_roles = true;
            }
            if let Some(value) = claims.details.get(name) {
                details.insert(name.clone(), value.clone());
            }
        }
    }

    Claim {
        details,
        roles: if keep_roles {
            claims.roles.clone()
        } else {
            Vec::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_map(entries: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(scope, claims)| {
                (
                    scope.to_string(),
                    claims.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect()
    }

    fn input_claims() -> Claim {
        let mut claim = Claim::default();
        claim.details.insert("family_name".to_string(), "Dupont".to_string());
        claim.details.insert("name".to_string(), "Jean".to_string());
        claim
            .details
            .insert("email".to_string(), "jean.dupont@example.com".to_string());
        claim
    }

    #[test]
    fn one_scope_discloses_only_its_claims() {
        let map = scope_map(&[("profile", &["name"])]);
        let result = filter_claims(&map, &input_claims(), &["profile".to_string()]);

        let mut expected = HashMap::new();
        expected.insert("name".to_string(), "Jean".to_string());
        assert_eq!(result.details, expected);
    }

    #[test]
    fn scopes_union_their_claims() {
        let map = scope_map(&[("profile", &["name"]), ("email", &["email"])]);
        let result = filter_claims(
            &map,
            &input_claims(),
            &["profile".to_string(), "email".to_string()],
        );

        let mut expected = HashMap::new();
        expected.insert("name".to_string(), "Jean".to_string());
        expected.insert("email".to_string(), "jean.dupont@example.com".to_string());
        assert_eq!(result.details, expected);
    }

    #[test]
    fn unknown_scopes_are_ignored() {
        let map = scope_map(&[("profile", &["name"])]);
        let result = filter_claims(
            &map,
            &input_claims(),
            &["profile".to_string(), "address".to_string()],
        );
        assert_eq!(result.details.len(), 1);
    }

    #[test]
    fn no_requested_scope_discloses_nothing() {
        let map = scope_map(&[("profile", &["name"])]);
        let result = filter_claims(&map, &input_claims(), &[]);
        assert!(result.details.is_empty());
        assert!(result.roles.is_empty());
    }

    #[test]
    fn roles_are_gated_by_their_scope() {
        let map = scope_map(&[("profile", &["name"]), ("roles", &["roles"])]);
        let mut claims = input_claims();
        claims.roles = vec!["admin".to_string()];

        let without = filter_claims(&map, &claims, &["profile".to_string()]);
        assert!(without.roles.is_empty());

        let with = filter_claims(
            &map,
            &claims,
            &["profile".to_string(), "roles".to_string()],
        );
        assert_eq!(with.roles, vec!["admin".to_string()]);
    }
}
