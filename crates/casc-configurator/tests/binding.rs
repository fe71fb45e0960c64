//! End-to-end binding and export through the registry

use casc_configurator::{
    BinderConfig, ConfigurationContext, ConfiguratorError, ConfiguratorRegistry, ExportPolicy,
    ResourceConfigurator, TypeToken,
};
use casc_model::{Mapping, Node, NodePath};
use casc_secrets::{Secret, SecretError, SecretResolver};
use casc_test_utils::{
    context_with, credentials, fixture_registry, init_tracing, yaml, CountingSource,
    InternalSetting, LegacyExportable, RotatingSource, UsernamePasswordCredentials, WriteOnlyToken,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn credential_binds_with_revealed_secret_and_exports_reference() {
    init_tracing();
    let registry = fixture_registry();
    let ctx = context_with(&[("db_pw", "hunter2")]);
    let doc = yaml("username: some-user\npassword: \"${SECRET:db_pw}\"\n");

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(creds.username, "some-user");
    assert_eq!(creds.password.expose(), "hunter2");

    let exported = registry.describe(&creds, &ctx).unwrap().unwrap();
    assert_eq!(exported, doc);
    assert_eq!(
        exported.get_path("password"),
        Some(&Node::from("${SECRET:db_pw}"))
    );
}

#[test]
fn plaintext_policy_exports_revealed_value() {
    let registry = fixture_registry();
    let ctx = context_with(&[("db_pw", "hunter2")]).with_export_policy(ExportPolicy::Plaintext);
    let doc = yaml("username: some-user\npassword: \"${db_pw}\"\n");

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    let exported = registry.describe(&creds, &ctx).unwrap().unwrap();
    assert_eq!(exported.get_path("password"), Some(&Node::from("hunter2")));
}

#[test]
fn interpolated_secret_exports_whole_template() {
    let registry = fixture_registry();
    let ctx = context_with(&[("suffix", "2024")]);
    let doc = yaml("username: svc\npassword: \"pw-${suffix}\"\ndescription: ci account\n");

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(creds.password.expose(), "pw-2024");
    assert_eq!(registry.describe(&creds, &ctx).unwrap().unwrap(), doc);
}

#[test]
fn literal_password_exports_literal() {
    let registry = fixture_registry();
    let ctx = context_with(&[]);
    let creds = credentials("some-user", "plain");

    let exported = registry.describe(&creds, &ctx).unwrap().unwrap();
    assert_eq!(exported, yaml("username: some-user\npassword: plain\n"));
}

#[test]
fn literal_reference_syntax_survives_export_and_rebind() {
    let registry = fixture_registry();
    let ctx = context_with(&[]);
    let creds = UsernamePasswordCredentials {
        id: None,
        username: "svc".to_string(),
        password: Secret::new("p${x}"),
        description: Some("costs ${5}".to_string()),
    };

    let exported = registry.describe(&creds, &ctx).unwrap().unwrap();
    assert_eq!(
        exported,
        yaml("username: svc\npassword: \"p^${x}\"\ndescription: \"costs ^${5}\"\n")
    );
    let rebound: UsernamePasswordCredentials = registry.bind(&exported, &ctx).unwrap();
    assert_eq!(rebound, creds);
}

#[test]
fn escaped_reference_exports_escaped() {
    let registry = fixture_registry();
    let ctx = context_with(&[("db_pw", "hunter2")]);
    let doc = yaml(
        "username: u\npassword: \"${db_pw}\"\ndescription: \"^${db_pw} rotates monthly\"\n",
    );

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(creds.description.as_deref(), Some("${db_pw} rotates monthly"));
    assert_eq!(creds.password.origin(), Some("${db_pw}"));
    assert_eq!(registry.describe(&creds, &ctx).unwrap().unwrap(), doc);
}

#[test]
fn plaintext_export_escapes_revealed_values() {
    let registry = fixture_registry();
    let ctx = context_with(&[("db_pw", "a${b}")]).with_export_policy(ExportPolicy::Plaintext);
    let creds: UsernamePasswordCredentials = registry
        .bind(&yaml("username: u\npassword: \"${db_pw}\"\n"), &ctx)
        .unwrap();

    let exported = registry.describe(&creds, &ctx).unwrap().unwrap();
    assert_eq!(exported.get_path("password"), Some(&Node::from("a^${b}")));
    let rebound: UsernamePasswordCredentials = registry.bind(&exported, &ctx).unwrap();
    assert_eq!(rebound.password.expose(), "a${b}");
}

#[test]
fn literal_password_equal_to_resolved_username_stays_literal() {
    let registry = fixture_registry();
    let ctx = context_with(&[("user", "admin")]);
    let doc = yaml("username: \"${user}\"\npassword: admin\n");

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(creds.username, "admin");
    assert_eq!(creds.password.origin(), None);

    let exported = registry.describe(&creds, &ctx).unwrap().unwrap();
    assert_eq!(exported.get_path("password"), Some(&Node::from("admin")));
}

#[test]
fn referenced_password_equal_to_literal_username_keeps_reference() {
    let registry = fixture_registry();
    let ctx = context_with(&[("user", "admin")]);
    let doc = yaml("username: admin\npassword: \"${user}\"\n");

    let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(creds.password.origin(), Some("${user}"));
    assert_eq!(registry.describe(&creds, &ctx).unwrap().unwrap(), doc);
}

#[test]
fn rotated_secret_is_seen_by_the_next_bind() {
    let source = Arc::new(RotatingSource::new(&[("db_user", "svc"), ("db_pw", "hunter2")]));
    let ctx = ConfigurationContext::new(SecretResolver::from_sources(vec![source.clone()]));
    let registry = fixture_registry();
    let doc = yaml("username: \"${db_user}\"\npassword: \"${db_pw}\"\n");

    let first: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(first.password.expose(), "hunter2");
    assert_eq!(source.reveals(), 2);

    source.rotate("db_pw", "hunter3");
    let second: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
    assert_eq!(second.username, "svc");
    assert_eq!(second.password.expose(), "hunter3");
    assert_eq!(source.reveals(), 4);

    // export reveals nothing
    let exported = registry.describe(&second, &ctx).unwrap().unwrap();
    assert_eq!(exported.get_path("password"), Some(&Node::from("${db_pw}")));
    assert_eq!(source.reveals(), 4);
}

#[test]
fn exportable_type_without_schema_fails_discovery() {
    let registry = fixture_registry();
    let err = registry
        .bind::<LegacyExportable>(&yaml("anything: 1\n"), &context_with(&[]))
        .unwrap_err();
    match err {
        ConfiguratorError::SchemaDiscovery { type_id, path } => {
            assert_eq!(type_id, "legacy");
            assert!(path.is_root());
        }
        other => panic!("expected SchemaDiscovery, got {other:?}"),
    }
}

#[test]
fn schemaless_type_describes_to_none() {
    let registry = fixture_registry();
    assert_eq!(registry.describe(&LegacyExportable, &context_with(&[])).unwrap(), None);
}

#[test]
fn empty_mapping_fails_schema_binding() {
    let registry = fixture_registry();
    let err = registry
        .bind::<UsernamePasswordCredentials>(&Node::Mapping(Mapping::new()), &context_with(&[]))
        .unwrap_err();
    match err {
        ConfiguratorError::SchemaBinding { type_id, source, .. } => {
            assert_eq!(type_id, "usernamePassword");
            assert!(source.to_string().contains("username"));
        }
        other => panic!("expected SchemaBinding, got {other:?}"),
    }
}

#[test]
fn blank_username_fails_model_construction() {
    let registry = fixture_registry();
    let err = registry
        .bind::<UsernamePasswordCredentials>(
            &yaml("username: \"  \"\npassword: x\n"),
            &context_with(&[]),
        )
        .unwrap_err();
    assert!(matches!(err, ConfiguratorError::ModelConstruction { .. }));
    assert!(!err.is_configuration_error());
}

#[test]
fn unresolved_secret_reports_scalar_path() {
    let registry = fixture_registry();
    let ctx = context_with(&[]).with_root("credentials[0]".parse().unwrap());
    let err = registry
        .bind::<UsernamePasswordCredentials>(
            &yaml("username: u\npassword: \"${missing}\"\n"),
            &ctx,
        )
        .unwrap_err();

    assert_eq!(
        err.path().map(ToString::to_string).as_deref(),
        Some("credentials[0].password")
    );
    assert!(matches!(
        err,
        ConfiguratorError::Secret {
            source: SecretError::Unresolved { .. },
            ..
        }
    ));
}

#[test]
fn failing_source_aborts_bind() {
    let failing = Arc::new(CountingSource::failing());
    let after = Arc::new(CountingSource::default());
    let ctx = ConfigurationContext::new(SecretResolver::from_sources(vec![
        failing.clone(),
        after.clone(),
    ]));

    let err = fixture_registry()
        .bind::<UsernamePasswordCredentials>(
            &yaml("username: u\npassword: \"${db_pw:-fallback}\"\n"),
            &ctx,
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ConfiguratorError::Secret {
            source: SecretError::Source { .. },
            ..
        }
    ));
    assert_eq!(failing.calls(), 1);
    assert_eq!(after.calls(), 0);
}

#[test]
fn write_only_value_binds_but_declines_export() {
    let registry = fixture_registry();
    let ctx = context_with(&[("tok", "abc")]);

    let token: WriteOnlyToken = registry.bind(&yaml("token: \"${tok}\"\n"), &ctx).unwrap();
    assert_eq!(token.token.expose(), "abc");
    assert_eq!(registry.describe(&token, &ctx).unwrap(), None);
}

#[test]
fn non_exportable_type_is_unsupported_by_default() {
    let registry = fixture_registry();
    let err = registry
        .bind::<InternalSetting>(&yaml("value: x\n"), &context_with(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfiguratorError::UnsupportedType { ref type_id } if type_id == "internalSetting"));
}

#[test]
fn custom_predicate_binds_non_exportable_type() {
    let registry = ConfiguratorRegistry::builder()
        .register_with(ResourceConfigurator::<InternalSetting>::new(), |token, c| {
            *token == c.target()
        })
        .build()
        .unwrap();

    let setting: InternalSetting = registry
        .bind(&yaml("value: x\n"), &context_with(&[]))
        .unwrap();
    assert_eq!(setting.value, "x");
    // Not exportable, so describe declines even though a schema exists
    assert_eq!(registry.describe(&setting, &context_with(&[])).unwrap(), None);
}

#[test]
fn bind_named_dispatches_by_type_id() {
    let registry = fixture_registry();
    let ctx = context_with(&[]);

    let erased = registry
        .bind_named("usernamePassword", &yaml("username: a\npassword: b\n"), &ctx)
        .unwrap();
    let creds = erased.downcast::<UsernamePasswordCredentials>().unwrap();
    assert_eq!(creds.username, "a");

    let err = registry
        .bind_named("nope", &yaml("a: 1\n"), &ctx)
        .unwrap_err();
    assert!(matches!(err, ConfiguratorError::UnsupportedType { .. }));
}

#[test]
fn bind_token_matches_generic_bind() {
    let registry = fixture_registry();
    let token = TypeToken::of::<UsernamePasswordCredentials>();
    assert!(registry.lookup(&token).is_some());

    let erased = registry
        .bind_token(&token, &yaml("username: a\npassword: b\n"), &context_with(&[]))
        .unwrap();
    assert!(erased.is::<UsernamePasswordCredentials>());
}

#[test]
fn document_sections_bind_with_root_paths() {
    let registry = fixture_registry();
    let doc = yaml(
        r#"
credentials:
  - username: alice
    password: "${alice_pw}"
  - username: bob
    password: "${bob_pw}"
"#,
    );
    let base = context_with(&[("alice_pw", "a1"), ("bob_pw", "b2")]);

    let items = doc.get_path("credentials").and_then(Node::as_sequence).unwrap();
    let bound: Vec<UsernamePasswordCredentials> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let ctx = base.clone().with_root(NodePath::root().key("credentials").index(i));
            registry.bind(item, &ctx).unwrap()
        })
        .collect();

    let passwords: Vec<_> = bound.iter().map(|c| c.password.expose()).collect();
    assert_eq!(passwords, vec!["a1", "b2"]);
}

#[test]
fn context_from_binder_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("db_pw"), "from-mount\n").unwrap();
    let config_path = dir.path().join("binder.toml");
    std::fs::write(
        &config_path,
        format!(
            "[[secret_sources]]\nkind = \"directory\"\npath = {:?}\n",
            dir.path().to_string_lossy()
        ),
    )
    .unwrap();

    let config = BinderConfig::load(&config_path).unwrap();
    let ctx = ConfigurationContext::from_config(&config).unwrap();
    let creds: UsernamePasswordCredentials = fixture_registry()
        .bind(&yaml("username: u\npassword: \"${db_pw}\"\n"), &ctx)
        .unwrap();
    assert_eq!(creds.password.expose(), "from-mount");
}

#[test]
fn concurrent_binds_keep_origins_apart() {
    let registry = Arc::new(fixture_registry());
    let ctx = Arc::new(context_with(&[("a", "shared"), ("b", "shared")]));

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|key| {
            let registry = Arc::clone(&registry);
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || {
                (0..50)
                    .map(|_| {
                        let doc = yaml(&format!("username: u\npassword: \"${{{key}}}\"\n"));
                        let creds: UsernamePasswordCredentials = registry.bind(&doc, &ctx).unwrap();
                        creds.password.origin().map(str::to_string)
                    })
                    .all(|origin| origin.as_deref() == Some(&format!("${{{key}}}")[..]))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
