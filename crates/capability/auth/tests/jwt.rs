use devhub_auth::{JwtManager, TokenError, TokenVerifier};

#[test]
fn jwt_issue_and_verify() {
    let jwt = JwtManager::new("secret".to_string(), Some("django".to_string()));
    let token = jwt.issue_token("alice", 3600).expect("token");
    let principal = jwt.verify(&token).expect("principal");
    assert_eq!(principal.username, "alice");
}

#[test]
fn wrong_secret_is_invalid() {
    let issuer = JwtManager::new("secret".to_string(), None);
    let verifier = JwtManager::new("other".to_string(), None);
    let token = issuer.issue_token("alice", 3600).expect("token");
    assert!(matches!(verifier.verify(&token), Err(TokenError::TokenInvalid)));
}

#[test]
fn issuer_mismatch_is_invalid() {
    let issuer = JwtManager::new("secret".to_string(), Some("someone-else".to_string()));
    let verifier = JwtManager::new("secret".to_string(), Some("django".to_string()));
    let token = issuer.issue_token("alice", 3600).expect("token");
    assert!(matches!(verifier.verify(&token), Err(TokenError::TokenInvalid)));
}

#[test]
fn garbage_is_invalid() {
    let verifier = JwtManager::new("secret".to_string(), None);
    assert!(matches!(verifier.verify("not-a-jwt"), Err(TokenError::TokenInvalid)));
}
