//! Authorization gate
//!
//! A pure predicate over a principal's capability set and a tool policy.
//! Nothing here performs I/O; identity-provider calls live in
//! [`crate::TokenValidator`].

use fprime_types::{
    AuthorizationDecision, AuthorizationPolicy, DecisionReason, PrincipalCapabilities,
};

/// Decide whether `capabilities` satisfy `policy`.
///
/// A `RequireGroup` policy against a token whose groups claim was omitted
/// denies with [`DecisionReason::MissingClaim`], so the overage case is
/// distinguishable from a plain non-member ([`DecisionReason::NotMember`]).
pub fn authorize(
    capabilities: &PrincipalCapabilities,
    policy: &AuthorizationPolicy,
) -> AuthorizationDecision {
    match policy {
        AuthorizationPolicy::Public => AuthorizationDecision::allow(),
        AuthorizationPolicy::RequireGroup(id) => match &capabilities.groups {
            Some(groups) if groups.contains(id) => AuthorizationDecision::allow(),
            Some(_) => AuthorizationDecision::deny(DecisionReason::NotMember),
            None => AuthorizationDecision::deny(DecisionReason::MissingClaim),
        },
        AuthorizationPolicy::RequireRole(name) => {
            if capabilities.roles.contains(name) {
                AuthorizationDecision::allow()
            } else {
                AuthorizationDecision::deny(DecisionReason::NotMember)
            }
        }
        AuthorizationPolicy::RequireAny(policies) => {
            let mut claim_missing = false;
            for sub in policies {
                let decision = authorize(capabilities, sub);
                if decision.allowed() {
                    return decision;
                }
                claim_missing |= decision.reason() == DecisionReason::MissingClaim;
            }
            if claim_missing {
                AuthorizationDecision::deny(DecisionReason::MissingClaim)
            } else {
                AuthorizationDecision::deny(DecisionReason::NotMember)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_allows_anyone() {
        let caps = PrincipalCapabilities::without_groups_claim(Vec::<String>::new());
        assert!(authorize(&caps, &AuthorizationPolicy::Public).allowed());
    }

    #[test]
    fn test_group_membership() {
        let caps = PrincipalCapabilities::new(["g-1"], Vec::<String>::new());
        assert!(authorize(&caps, &AuthorizationPolicy::group("g-1")).allowed());

        let denied = authorize(&caps, &AuthorizationPolicy::group("g-2"));
        assert_eq!(denied.reason(), DecisionReason::NotMember);
    }

    #[test]
    fn test_omitted_groups_claim_is_distinguishable() {
        let caps = PrincipalCapabilities::without_groups_claim(Vec::<String>::new());
        let decision = authorize(&caps, &AuthorizationPolicy::group("g-1"));
        assert!(!decision.allowed());
        assert_eq!(decision.reason(), DecisionReason::MissingClaim);
    }

    #[test]
    fn test_role_rescues_group_overage() {
        let caps = PrincipalCapabilities::without_groups_claim(["FPrime.Member"]);
        let policy = AuthorizationPolicy::RequireAny(vec![
            AuthorizationPolicy::group("g-1"),
            AuthorizationPolicy::role("FPrime.Member"),
        ]);
        assert!(authorize(&caps, &policy).allowed());
    }

    #[test]
    fn test_require_any_reason() {
        let caps = PrincipalCapabilities::without_groups_claim(Vec::<String>::new());
        let policy = AuthorizationPolicy::RequireAny(vec![
            AuthorizationPolicy::role("r"),
            AuthorizationPolicy::group("g"),
        ]);
        assert_eq!(authorize(&caps, &policy).reason(), DecisionReason::MissingClaim);

        let empty = AuthorizationPolicy::RequireAny(vec![]);
        assert_eq!(authorize(&caps, &empty).reason(), DecisionReason::NotMember);
    }
}
