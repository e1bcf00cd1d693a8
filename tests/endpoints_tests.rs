use cert_watch::endpoints::{load_endpoints_from_path, parse_endpoints_str};
use cert_watch::types::Endpoint;
use std::io::Write;

#[test]
fn parse_names_comments_and_duplicates() {
    let input = r#"
        # production
        example.com:443          Example
        mail.example.com:993     Mail (IMAPS)   # legacy
        example.com:443          Example
        # blank line follows

        [::1]:8443
    "#;

    let eps = parse_endpoints_str(input);
    assert_eq!(
        eps,
        vec![
            Endpoint::new("example.com:443", "Example"),
            Endpoint::new("mail.example.com:993", "Mail (IMAPS)"),
            Endpoint::new("example.com:443", "Example"),
            Endpoint::new("[::1]:8443", "[::1]:8443"),
        ]
    );
}

#[test]
fn empty_input_is_an_empty_registry() {
    assert!(parse_endpoints_str("\n  # nothing here\n").is_empty());
}

#[test]
fn load_text_and_json_files() {
    let dir = std::env::temp_dir().join(format!("cert-watch-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let txt = dir.join("endpoints.txt");
    std::fs::File::create(&txt)
        .unwrap()
        .write_all(b"a.test:443 Alpha\nb.test:443\n")
        .unwrap();
    let reg = load_endpoints_from_path(&txt).expect("load text");
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.endpoints()[0].display_name, "Alpha");

    let json = dir.join("endpoints.json");
    std::fs::write(
        &json,
        r#"[{"hostport": "c.test:443", "name": "Gamma"}, {"hostport": "c.test:443", "name": "Gamma"}]"#,
    )
    .unwrap();
    let reg = load_endpoints_from_path(&json).expect("load json");
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.endpoints()[1], Endpoint::new("c.test:443", "Gamma"));

    std::fs::write(&json, "{not json").unwrap();
    assert!(load_endpoints_from_path(&json).is_err());

    assert!(load_endpoints_from_path(dir.join("missing.txt")).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn load_yaml_list_and_domains_block() {
    let dir = std::env::temp_dir().join(format!("cert-watch-yaml-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let widget = dir.join("widget.yaml");
    std::fs::write(
        &widget,
        "domains:\n  - hostport: a.test:443\n    name: Alpha\n  - hostport: b.test:8443\n    name: Beta\n",
    )
    .unwrap();
    let reg = load_endpoints_from_path(&widget).expect("load domains block");
    assert_eq!(
        reg.endpoints(),
        &[
            Endpoint::new("a.test:443", "Alpha"),
            Endpoint::new("b.test:8443", "Beta"),
        ]
    );

    let list = dir.join("endpoints.yml");
    std::fs::write(&list, "- hostport: c.test:443\n  name: Gamma\n").unwrap();
    let reg = load_endpoints_from_path(&list).expect("load yaml list");
    assert_eq!(reg.endpoints(), &[Endpoint::new("c.test:443", "Gamma")]);

    let json = dir.join("widget.json");
    std::fs::write(&json, r#"{"domains": [{"hostport": "d.test:443", "name": "Delta"}]}"#).unwrap();
    let reg = load_endpoints_from_path(&json).expect("load json domains block");
    assert_eq!(reg.len(), 1);

    std::fs::write(&list, "domains: [unterminated\n").unwrap();
    assert!(load_endpoints_from_path(&list).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
