//! describe(bind(describe(x))) == describe(x)

use casc_configurator::{ConfigurationContext, ConfiguratorRegistry};
use casc_secrets::Secret;
use casc_test_utils::{context_with, fixture_registry, UsernamePasswordCredentials};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn roundtrip(
    registry: &ConfiguratorRegistry,
    ctx: &ConfigurationContext,
    creds: &UsernamePasswordCredentials,
) {
    let first = registry.describe(creds, ctx).unwrap().unwrap();
    let rebound: UsernamePasswordCredentials = registry.bind(&first, ctx).unwrap();
    let second = registry.describe(&rebound, ctx).unwrap().unwrap();
    assert_eq!(second, first);
}

// Printable text, biased towards reference syntax
fn literal() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ -~]{0,16}",
        "[a-z ]{0,4}(\\^?\\$\\{[a-z0-9:-]{0,6}\\}?)[a-z ]{0,4}",
    ]
}

fn username() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,11}"
}

prop_compose! {
    fn literal_credentials()(
        id in proptest::option::of("[a-z0-9-]{1,8}"),
        username in username(),
        password in literal(),
        description in proptest::option::of(literal()),
    ) -> UsernamePasswordCredentials {
        UsernamePasswordCredentials {
            id,
            username,
            password: Secret::new(password),
            description,
        }
    }
}

proptest! {
    #[test]
    fn literal_credentials_roundtrip(creds in literal_credentials()) {
        roundtrip(&fixture_registry(), &context_with(&[]), &creds);
    }

    #[test]
    fn referenced_password_roundtrip(
        username in username(),
        key in "[a-z_]{1,8}",
        value in "[ -~]{0,16}",
    ) {
        let ctx = context_with(&[(key.as_str(), value.as_str())]);
        let creds = UsernamePasswordCredentials {
            id: None,
            username,
            password: Secret::from_reference(value.clone(), format!("${{{key}}}")),
            description: None,
        };
        roundtrip(&fixture_registry(), &ctx, &creds);

        let exported = fixture_registry().describe(&creds, &ctx).unwrap().unwrap();
        let expected = format!("${{{key}}}");
        prop_assert_eq!(
            exported.get_path("password").and_then(|n| n.as_scalar()).map(|s| s.value()),
            Some(expected.as_str())
        );
    }
}

#[test]
fn escaped_description_roundtrip() {
    let ctx = context_with(&[("HOME", "/root")]);
    let registry = fixture_registry();
    let doc = casc_model::parse("username: u\npassword: x\ndescription: \"^${HOME}\"\n").unwrap();

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(creds.description.as_deref(), Some("${HOME}"));
    roundtrip(&registry, &ctx, &creds);
    assert_eq!(registry.describe(&creds, &ctx).unwrap().unwrap(), doc);
}

#[test]
fn credential_fixture_roundtrip() {
    let ctx = context_with(&[("db_pw", "hunter2")]);
    let registry = fixture_registry();
    let doc = casc_model::parse(
        "id: deploy\nusername: some-user\npassword: \"${SECRET:db_pw}\"\ndescription: deploy key\n",
    )
    .unwrap();

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    roundtrip(&registry, &ctx, &creds);
    assert_eq!(registry.describe(&creds, &ctx).unwrap().unwrap(), doc);
}
