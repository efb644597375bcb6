/// Generates one round-trip test per .puml file in fixtures/.
/// Each gets its own name in the runner; the body lives in tests/roundtrip.rs.
fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let dest = std::path::Path::new(&out_dir).join("roundtrip_tests.rs");

    let mut code = String::from(
        r#"mod fixtures {
    use super::roundtrip_test;
"#,
    );

    let mut entries: Vec<_> = std::fs::read_dir("fixtures")
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "puml") {
            let name = path.file_stem().unwrap().to_str().unwrap();
            code.push_str(&format!(
                r#"
    #[test]
    fn {name}() {{
        roundtrip_test("{name}");
    }}
"#
            ));
        }
    }

    code.push_str("}\n");
    std::fs::write(&dest, code).unwrap();

    println!("cargo::rerun-if-changed=fixtures");
}
