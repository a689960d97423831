#[test]
fn passio_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/passio_error_pass.rs");
    t.pass("tests/ui/passio_error_wrapped_cause.rs");
}
