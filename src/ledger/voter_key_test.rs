use super::VoterKey;

#[test]
fn test_derive_is_stable() {
    assert_eq!(VoterKey::derive("s", "u1"), VoterKey::derive("s", "u1"));
}

#[test]
fn test_derive_hides_the_identifier() {
    let key = VoterKey::derive("s", "alice@example.com");

    assert_eq!(key.as_str().len(), 64);
    assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!key.as_str().contains("alice"));
}

#[test]
fn test_derive_depends_on_secret_and_identifier() {
    assert_ne!(VoterKey::derive("a", "u1"), VoterKey::derive("b", "u1"));
    assert_ne!(VoterKey::derive("a", "u1"), VoterKey::derive("a", "u2"));
    // moving bytes between secret and identifier changes the key
    assert_ne!(VoterKey::derive("ab", "c"), VoterKey::derive("a", "bc"));
}
